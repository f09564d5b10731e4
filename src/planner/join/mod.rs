//! Physical join selection: eligibility, strategy choice, construction
pub mod constructor;
pub mod eligibility;
pub mod selector;

pub use constructor::build_join;
pub use eligibility::{index_for_side, is_index_join_shape, JoinSide};
pub use selector::{select_join_strategy, validate_conditions, JoinStrategy, SelectionContext};
