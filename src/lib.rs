//! joinplan: physical join selection for an analytical query optimizer
//!
//! Lowers logical comparison joins into exactly one executable join operator:
//! cross product, hash join, index join, piecewise merge join or nested-loop
//! join.
//!
//! ## Architecture
//! - Catalog: copy-on-write snapshots of tables and live secondary indexes
//! - Transactions: which tables hold uncommitted transaction-local rows
//! - Optimizer: statistics propagation + heuristic cardinality estimates
//! - Planner: postorder lowering, index-join eligibility, strategy selection,
//!   operator construction
//!
//! ```ignore
//! let snapshot = registry.snapshot();
//! let local = txn_manager.local_state(txn_id)?;
//! let config = PlannerConfig::default();
//! let generator = PhysicalPlanGenerator::new(&config, &snapshot, &local);
//! let physical = generator.create_plan(logical)?;
//! println!("{}", physical);
//! ```

pub mod catalog;
pub mod config;
pub mod optimizer;
pub mod plan;
pub mod planner;
pub mod txn;
pub mod types;

mod error;

pub use catalog::{CatalogRegistry, CatalogSnapshot, IndexDescriptor, IndexKind};
pub use config::PlannerConfig;
pub use error::{PlanError, Result};
pub use plan::{JoinCondition, JoinType, LogicalPlan, PhysicalJoin, PhysicalPlan};
pub use planner::PhysicalPlanGenerator;
pub use txn::{TransactionLocalState, TransactionManager, VisibilityOracle};
