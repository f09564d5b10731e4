/// Cardinality estimation for logical subplans
///
/// Estimates are heuristic row counts. They only need to order subplans
/// sensibly; nothing downstream relies on their exactness. Each operator is
/// estimated from its own parameters and the estimates of its inputs, so a
/// bottom-up walk touches every node once.
use crate::catalog::CatalogSnapshot;
use crate::optimizer::statistics::StatisticsPropagator;
use crate::plan::expression::Expression;
use crate::plan::filter::{ConstantFilter, FilterPropagateResult};
use crate::plan::logical::{JoinCondition, JoinType, LogicalGet, LogicalPlan};
use crate::types::Cardinality;
use tracing::trace;

/// Fraction of rows assumed to survive a filter that statistics can't decide
pub const DEFAULT_FILTER_SELECTIVITY: f64 = 0.2;

/// Supplies row-count estimates one operator at a time
pub trait CardinalityEstimator {
    fn estimate_get(&self, get: &LogicalGet) -> Cardinality;

    /// Rows surviving `predicates` out of `input` rows
    fn estimate_filter(&self, predicates: &[Expression], input: Cardinality) -> Cardinality;

    fn estimate_join(
        &self,
        join_type: JoinType,
        conditions: &[JoinCondition],
        left: Cardinality,
        right: Cardinality,
    ) -> Cardinality;

    /// Estimate a whole subtree
    fn estimate(&self, plan: &LogicalPlan) -> Cardinality {
        match plan {
            LogicalPlan::Get(get) => self.estimate_get(get),
            LogicalPlan::Filter(filter) => {
                let input = self.estimate(&filter.child);
                self.estimate_filter(&filter.predicates, input)
            }
            LogicalPlan::ComparisonJoin(join) => match join.children.as_slice() {
                [left, right] => self.estimate_join(
                    join.join_type,
                    &join.conditions,
                    self.estimate(left),
                    self.estimate(right),
                ),
                _ => 0,
            },
        }
    }
}

/// Estimator driven by catalog row counts and column statistics
pub struct HeuristicEstimator<'a> {
    catalog: &'a CatalogSnapshot,
    statistics: StatisticsPropagator<'a>,
}

impl<'a> HeuristicEstimator<'a> {
    pub fn new(catalog: &'a CatalogSnapshot) -> Self {
        Self {
            catalog,
            statistics: StatisticsPropagator::new(catalog),
        }
    }

    /// Verdict of one `expr <cmp> constant` predicate against propagated
    /// statistics. Any other predicate shape can't be pruned.
    fn check_predicate(&self, predicate: &Expression) -> FilterPropagateResult {
        let Expression::Comparison(cmp) = predicate else {
            return FilterPropagateResult::NoPruningPossible;
        };
        let (expr, comparison, constant) = match (&cmp.left, &cmp.right) {
            (Expression::Constant(_), Expression::Constant(_)) => {
                return FilterPropagateResult::NoPruningPossible
            }
            (expr, Expression::Constant(value)) => (expr, cmp.comparison, value),
            (Expression::Constant(value), expr) => (expr, cmp.comparison.flip(), value),
            _ => return FilterPropagateResult::NoPruningPossible,
        };
        match self.statistics.propagate(expr) {
            Some(stats) => ConstantFilter::new(comparison, constant.clone()).check_statistics(&stats),
            None => FilterPropagateResult::NoPruningPossible,
        }
    }
}

fn apply_selectivity(rows: Cardinality) -> Cardinality {
    (rows as f64 * DEFAULT_FILTER_SELECTIVITY).ceil() as Cardinality
}

impl CardinalityEstimator for HeuristicEstimator<'_> {
    fn estimate_get(&self, get: &LogicalGet) -> Cardinality {
        // No statistics: 0, which never wins a ratio test
        let base = self.catalog.row_count(get.table).unwrap_or(0);
        let estimate = if get.table_filters.is_empty() {
            base
        } else {
            let verdict = get.table_filters.check_statistics(|column| {
                self.catalog.column_statistics(get.table, column).cloned()
            });
            match verdict {
                FilterPropagateResult::FilterAlwaysFalse => 0,
                FilterPropagateResult::FilterAlwaysTrue => base,
                FilterPropagateResult::NoPruningPossible => apply_selectivity(base),
            }
        };
        trace!(operator = "GET", table = %get.table_name, estimate, "estimated cardinality");
        estimate
    }

    fn estimate_filter(&self, predicates: &[Expression], input: Cardinality) -> Cardinality {
        let mut all_true = !predicates.is_empty();
        let mut estimate = None;
        for predicate in predicates {
            match self.check_predicate(predicate) {
                FilterPropagateResult::FilterAlwaysFalse => {
                    estimate = Some(0);
                    break;
                }
                FilterPropagateResult::FilterAlwaysTrue => {}
                FilterPropagateResult::NoPruningPossible => all_true = false,
            }
        }
        let estimate = estimate.unwrap_or(if all_true {
            input
        } else {
            apply_selectivity(input)
        });
        trace!(operator = "FILTER", input, estimate, "estimated cardinality");
        estimate
    }

    fn estimate_join(
        &self,
        join_type: JoinType,
        conditions: &[JoinCondition],
        left: Cardinality,
        right: Cardinality,
    ) -> Cardinality {
        let estimate = if conditions.is_empty() {
            left.saturating_mul(right)
        } else {
            left.max(right)
        };
        trace!(operator = "COMPARISON_JOIN", %join_type, left, right, estimate, "estimated cardinality");
        estimate
    }
}
