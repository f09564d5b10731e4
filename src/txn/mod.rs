//! Transaction layer: visibility of uncommitted, transaction-local rows

mod local_storage;

pub use local_storage::{
    LocalTableStorage, TransactionId, TransactionLocalState, TransactionManager, VisibilityOracle,
};
