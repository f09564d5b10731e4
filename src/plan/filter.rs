//! Residual table filters pushed into scans

use crate::optimizer::statistics::BaseStatistics;
use crate::plan::expression::ComparisonType;
use crate::types::{ColumnId, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of checking a filter against column statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPropagateResult {
    /// Every row passes
    FilterAlwaysTrue,
    /// No row passes
    FilterAlwaysFalse,
    NoPruningPossible,
}

/// `column <comparison> constant`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantFilter {
    pub comparison: ComparisonType,
    pub constant: Value,
}

impl ConstantFilter {
    pub fn new(comparison: ComparisonType, constant: Value) -> Self {
        Self {
            comparison,
            constant,
        }
    }

    /// Decide the filter from a column's value range alone, when possible
    pub fn check_statistics(&self, stats: &BaseStatistics) -> FilterPropagateResult {
        use ComparisonType::*;
        use FilterPropagateResult::*;

        let (min, max) = match (&stats.min, &stats.max) {
            (Some(min), Some(max)) => (min, max),
            _ => return NoPruningPossible,
        };
        let (min_cmp, max_cmp) = match (
            min.partial_cmp(&self.constant),
            max.partial_cmp(&self.constant),
        ) {
            (Some(a), Some(b)) => (a, b),
            _ => return NoPruningPossible,
        };

        let result = match self.comparison {
            Equal => {
                if min_cmp == Ordering::Equal && max_cmp == Ordering::Equal {
                    FilterAlwaysTrue
                } else if min_cmp == Ordering::Greater || max_cmp == Ordering::Less {
                    FilterAlwaysFalse
                } else {
                    NoPruningPossible
                }
            }
            NotEqual => {
                if min_cmp == Ordering::Greater || max_cmp == Ordering::Less {
                    FilterAlwaysTrue
                } else if min_cmp == Ordering::Equal && max_cmp == Ordering::Equal {
                    FilterAlwaysFalse
                } else {
                    NoPruningPossible
                }
            }
            LessThan => {
                if max_cmp == Ordering::Less {
                    FilterAlwaysTrue
                } else if min_cmp != Ordering::Less {
                    FilterAlwaysFalse
                } else {
                    NoPruningPossible
                }
            }
            LessThanOrEqual => {
                if max_cmp != Ordering::Greater {
                    FilterAlwaysTrue
                } else if min_cmp == Ordering::Greater {
                    FilterAlwaysFalse
                } else {
                    NoPruningPossible
                }
            }
            GreaterThan => {
                if min_cmp == Ordering::Greater {
                    FilterAlwaysTrue
                } else if max_cmp != Ordering::Greater {
                    FilterAlwaysFalse
                } else {
                    NoPruningPossible
                }
            }
            GreaterThanOrEqual => {
                if min_cmp != Ordering::Less {
                    FilterAlwaysTrue
                } else if max_cmp == Ordering::Less {
                    FilterAlwaysFalse
                } else {
                    NoPruningPossible
                }
            }
        };

        // NULLs never satisfy a comparison
        if result == FilterAlwaysTrue && stats.can_have_null {
            NoPruningPossible
        } else {
            result
        }
    }
}

impl fmt::Display for ConstantFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.comparison, self.constant)
    }
}

/// Filters attached to a table scan, keyed by table column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableFilterSet {
    filters: BTreeMap<ColumnId, Vec<ConstantFilter>>,
}

impl TableFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_filter(&mut self, column: ColumnId, filter: ConstantFilter) {
        self.filters.entry(column).or_default().push(filter);
    }

    pub fn with_filter(mut self, column: ColumnId, filter: ConstantFilter) -> Self {
        self.push_filter(column, filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Total number of filters over all columns
    pub fn len(&self) -> usize {
        self.filters.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnId, &ConstantFilter)> {
        self.filters
            .iter()
            .flat_map(|(col, filters)| filters.iter().map(move |f| (*col, f)))
    }

    /// Combine the statistics verdicts of every filter (conjunction)
    pub fn check_statistics<F>(&self, mut column_stats: F) -> FilterPropagateResult
    where
        F: FnMut(ColumnId) -> Option<BaseStatistics>,
    {
        let mut all_true = true;
        for (column, filters) in &self.filters {
            let stats = match column_stats(*column) {
                Some(stats) => stats,
                None => {
                    all_true = false;
                    continue;
                }
            };
            for filter in filters {
                match filter.check_statistics(&stats) {
                    FilterPropagateResult::FilterAlwaysFalse => {
                        return FilterPropagateResult::FilterAlwaysFalse
                    }
                    FilterPropagateResult::FilterAlwaysTrue => {}
                    FilterPropagateResult::NoPruningPossible => all_true = false,
                }
            }
        }
        if all_true {
            FilterPropagateResult::FilterAlwaysTrue
        } else {
            FilterPropagateResult::NoPruningPossible
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FilterPropagateResult::*;

    fn stats(min: i64, max: i64) -> BaseStatistics {
        BaseStatistics::range(Value::Integer(min), Value::Integer(max), false)
    }

    fn filter(cmp: ComparisonType, v: i64) -> ConstantFilter {
        ConstantFilter::new(cmp, Value::Integer(v))
    }

    #[test]
    fn test_equality_pruning() {
        let s = stats(10, 20);
        assert_eq!(filter(ComparisonType::Equal, 5).check_statistics(&s), FilterAlwaysFalse);
        assert_eq!(filter(ComparisonType::Equal, 15).check_statistics(&s), NoPruningPossible);
        assert_eq!(
            filter(ComparisonType::Equal, 7).check_statistics(&stats(7, 7)),
            FilterAlwaysTrue
        );
        assert_eq!(filter(ComparisonType::NotEqual, 30).check_statistics(&s), FilterAlwaysTrue);
    }

    #[test]
    fn test_range_pruning() {
        let s = stats(10, 20);
        assert_eq!(filter(ComparisonType::LessThan, 10).check_statistics(&s), FilterAlwaysFalse);
        assert_eq!(filter(ComparisonType::LessThan, 21).check_statistics(&s), FilterAlwaysTrue);
        assert_eq!(
            filter(ComparisonType::LessThanOrEqual, 20).check_statistics(&s),
            FilterAlwaysTrue
        );
        assert_eq!(
            filter(ComparisonType::GreaterThan, 20).check_statistics(&s),
            FilterAlwaysFalse
        );
        assert_eq!(
            filter(ComparisonType::GreaterThanOrEqual, 10).check_statistics(&s),
            FilterAlwaysTrue
        );
        assert_eq!(
            filter(ComparisonType::GreaterThan, 15).check_statistics(&s),
            NoPruningPossible
        );
    }

    #[test]
    fn test_nulls_block_always_true() {
        let s = BaseStatistics::range(Value::Integer(1), Value::Integer(2), true);
        assert_eq!(filter(ComparisonType::LessThan, 5).check_statistics(&s), NoPruningPossible);
        assert_eq!(filter(ComparisonType::LessThan, 0).check_statistics(&s), FilterAlwaysFalse);
        assert_eq!(
            filter(ComparisonType::Equal, 1).check_statistics(&BaseStatistics::unknown()),
            NoPruningPossible
        );
    }

    #[test]
    fn test_filter_set() {
        let set = TableFilterSet::new()
            .with_filter(ColumnId(0), filter(ComparisonType::GreaterThan, 0))
            .with_filter(ColumnId(0), filter(ComparisonType::LessThan, 100))
            .with_filter(ColumnId(1), filter(ComparisonType::Equal, 3));
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());

        let verdict = set.check_statistics(|col| match col.0 {
            0 => Some(stats(1, 50)),
            _ => Some(stats(3, 3)),
        });
        assert_eq!(verdict, FilterAlwaysTrue);

        let verdict = set.check_statistics(|col| match col.0 {
            0 => Some(stats(1, 50)),
            _ => Some(stats(4, 9)),
        });
        assert_eq!(verdict, FilterAlwaysFalse);

        assert_eq!(set.check_statistics(|_| None), NoPruningPossible);
    }
}
