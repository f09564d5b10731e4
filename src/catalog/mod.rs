//! Catalog: table schemas, row counts and live secondary indexes
//!
//! The planner never reads the registry directly. It plans against a
//! [`CatalogSnapshot`], an immutable view that cannot change underneath a
//! planning call.

mod registry;

pub use registry::{
    CatalogRegistry, CatalogSnapshot, IndexDescriptor, IndexKind, PendingDrop, TableEntry,
};
