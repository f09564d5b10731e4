//! Optimizer support: statistics propagation and cardinality estimation

pub mod cardinality;
pub mod statistics;

pub use cardinality::{CardinalityEstimator, HeuristicEstimator};
pub use statistics::{BaseStatistics, ColumnStatisticsProvider, StatisticsPropagator};
