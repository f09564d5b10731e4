//! Plan representations: bound expressions, logical and physical operators

pub mod expression;
pub mod filter;
pub mod logical;
pub mod physical;

pub use expression::{BoundColumnRef, ComparisonType, Expression};
pub use filter::{ConstantFilter, FilterPropagateResult, TableFilterSet};
pub use logical::{
    JoinCondition, JoinDefinition, JoinType, LogicalComparisonJoin, LogicalFilter, LogicalGet,
    LogicalPlan,
};
pub use physical::{
    IndexJoin, JoinOperator, PhysicalFilter, PhysicalJoin, PhysicalPlan, PhysicalTableScan,
};
