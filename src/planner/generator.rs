//! Physical plan generator
//!
//! Lowers a logical plan bottom-up. A join's inputs are lowered first; their
//! estimates feed the join's own estimate and its classification. Nothing is
//! revisited.

use super::join::{build_join, select_join_strategy, JoinStrategy, SelectionContext};
use crate::catalog::CatalogSnapshot;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::optimizer::cardinality::{CardinalityEstimator, HeuristicEstimator};
use crate::plan::logical::{LogicalComparisonJoin, LogicalPlan};
use crate::plan::physical::{PhysicalFilter, PhysicalPlan, PhysicalTableScan};
use crate::txn::VisibilityOracle;
use tracing::debug;

/// Converts logical plans into physical plans for one planning call
pub struct PhysicalPlanGenerator<'a> {
    config: &'a PlannerConfig,
    catalog: &'a CatalogSnapshot,
    oracle: &'a dyn VisibilityOracle,
    estimator: Box<dyn CardinalityEstimator + 'a>,
}

impl<'a> PhysicalPlanGenerator<'a> {
    /// Generator using the catalog-driven heuristic estimator
    pub fn new(
        config: &'a PlannerConfig,
        catalog: &'a CatalogSnapshot,
        oracle: &'a dyn VisibilityOracle,
    ) -> Self {
        Self {
            config,
            catalog,
            oracle,
            estimator: Box::new(HeuristicEstimator::new(catalog)),
        }
    }

    /// Replace the cardinality estimator
    pub fn with_estimator(mut self, estimator: impl CardinalityEstimator + 'a) -> Self {
        self.estimator = Box::new(estimator);
        self
    }

    /// Lower `plan` and everything below it.
    ///
    /// Every node is estimated exactly once, from its lowered inputs.
    pub fn create_plan(&self, plan: LogicalPlan) -> Result<PhysicalPlan> {
        match plan {
            LogicalPlan::Get(get) => {
                let estimated_cardinality = self.estimator.estimate_get(&get);
                Ok(PhysicalPlan::TableScan(PhysicalTableScan {
                    table: get.table,
                    table_name: get.table_name,
                    column_ids: get.column_ids,
                    table_filters: get.table_filters,
                    estimated_cardinality,
                }))
            }
            LogicalPlan::Filter(filter) => {
                let child = self.create_plan(*filter.child)?;
                let estimated_cardinality = self
                    .estimator
                    .estimate_filter(&filter.predicates, child.estimated_cardinality());
                Ok(PhysicalPlan::Filter(PhysicalFilter {
                    predicates: filter.predicates,
                    child: Box::new(child),
                    estimated_cardinality,
                }))
            }
            LogicalPlan::ComparisonJoin(join) => self.plan_comparison_join(join),
        }
    }

    fn plan_comparison_join(&self, join: LogicalComparisonJoin) -> Result<PhysicalPlan> {
        let (definition, left, right) = join.into_parts()?;

        let left = self.create_plan(left)?;
        let right = self.create_plan(right)?;
        let left_card = left.estimated_cardinality();
        let right_card = right.estimated_cardinality();
        let estimated_cardinality = self.estimator.estimate_join(
            definition.join_type,
            &definition.conditions,
            left_card,
            right_card,
        );

        let ctx = SelectionContext {
            config: self.config,
            catalog: self.catalog,
            oracle: self.oracle,
        };
        let strategy =
            select_join_strategy(&definition, &left, &right, left_card, right_card, ctx)?;

        match &strategy {
            JoinStrategy::IndexJoin {
                indexed_side,
                index,
            } => debug!(
                strategy = strategy.name(),
                side = ?indexed_side,
                index = %index.name,
                left_card,
                right_card,
                "selected join strategy"
            ),
            _ => debug!(
                strategy = strategy.name(),
                conditions = definition.conditions.len(),
                left_card,
                right_card,
                "selected join strategy"
            ),
        }

        let join = build_join(definition, left, right, strategy, estimated_cardinality)?;
        Ok(PhysicalPlan::Join(join))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogRegistry, IndexKind};
    use crate::plan::expression::{ComparisonType, Expression};
    use crate::plan::logical::{JoinCondition, JoinType, LogicalGet};
    use crate::plan::physical::PhysicalJoin;
    use crate::types::Cardinality;
    use std::cell::Cell;
    use crate::txn::TransactionLocalState;
    use crate::types::{ColumnDef, ColumnId, ColumnType, TableId, TableSchema};

    fn registry() -> CatalogRegistry {
        let registry = CatalogRegistry::new();
        for (id, name, rows) in [(1, "a", 1_000_000), (2, "b", 100), (3, "c", 5_000)] {
            registry
                .create_table(TableSchema::new(
                    TableId(id),
                    name,
                    vec![
                        ColumnDef::new("x", ColumnType::Integer, 0),
                        ColumnDef::new("y", ColumnType::Integer, 1),
                    ],
                ))
                .unwrap();
            registry.set_row_count(TableId(id), rows).unwrap();
        }
        registry
            .create_index("a_x_idx", "a", "x", IndexKind::Art)
            .unwrap();
        registry
    }

    fn get(id: u32, name: &str) -> LogicalPlan {
        LogicalPlan::get(TableId(id), name, vec![ColumnId(0), ColumnId(1)])
    }

    fn eq(l: (u32, u32), r: (u32, u32)) -> JoinCondition {
        JoinCondition::new(
            Expression::column(TableId(l.0), ColumnId(l.1), format!("t{}.c{}", l.0, l.1)),
            ComparisonType::Equal,
            Expression::column(TableId(r.0), ColumnId(r.1), format!("t{}.c{}", r.0, r.1)),
        )
    }

    #[test]
    fn test_nested_joins_lowered_bottom_up() {
        let registry = registry();
        let snap = registry.snapshot();
        let config = PlannerConfig::default();
        let oracle = TransactionLocalState::empty();
        let generator = PhysicalPlanGenerator::new(&config, &snap, &oracle);

        // (a JOIN b ON a.x = b.x) JOIN c ON b.y = c.y
        let inner = LogicalPlan::join(JoinType::Inner, get(1, "a"), get(2, "b"), vec![eq((1, 0), (2, 0))]);
        let outer = LogicalPlan::join(JoinType::Inner, inner, get(3, "c"), vec![eq((2, 1), (3, 1))]);

        let plan = generator.create_plan(outer).unwrap();
        let top = plan.as_join().unwrap();
        assert!(matches!(top, PhysicalJoin::HashJoin(_)));
        assert_eq!(plan.estimated_cardinality(), 1_000_000);

        let below = top.operator().left.as_join().unwrap();
        assert!(matches!(below, PhysicalJoin::IndexJoin(_)));
    }

    #[test]
    fn test_custom_estimator() {
        struct Constant(Cardinality);
        impl CardinalityEstimator for Constant {
            fn estimate_get(&self, _get: &LogicalGet) -> Cardinality {
                self.0
            }
            fn estimate_filter(&self, _predicates: &[Expression], _input: Cardinality) -> Cardinality {
                self.0
            }
            fn estimate_join(
                &self,
                _join_type: JoinType,
                _conditions: &[JoinCondition],
                _left: Cardinality,
                _right: Cardinality,
            ) -> Cardinality {
                self.0
            }
        }

        let registry = registry();
        let snap = registry.snapshot();
        let config = PlannerConfig::default();
        let oracle = TransactionLocalState::empty();
        let generator =
            PhysicalPlanGenerator::new(&config, &snap, &oracle).with_estimator(Constant(10));

        // Equal estimates: the 1% test fails, hash join
        let plan = LogicalPlan::join(JoinType::Inner, get(1, "a"), get(2, "b"), vec![eq((1, 0), (2, 0))]);
        let plan = generator.create_plan(plan).unwrap();
        assert_eq!(plan.name(), "HASH_JOIN");
    }

    struct Counting<'a> {
        inner: HeuristicEstimator<'a>,
        calls: &'a Cell<usize>,
    }

    impl CardinalityEstimator for Counting<'_> {
        fn estimate_get(&self, get: &LogicalGet) -> Cardinality {
            self.calls.set(self.calls.get() + 1);
            self.inner.estimate_get(get)
        }
        fn estimate_filter(&self, predicates: &[Expression], input: Cardinality) -> Cardinality {
            self.calls.set(self.calls.get() + 1);
            self.inner.estimate_filter(predicates, input)
        }
        fn estimate_join(
            &self,
            join_type: JoinType,
            conditions: &[JoinCondition],
            left: Cardinality,
            right: Cardinality,
        ) -> Cardinality {
            self.calls.set(self.calls.get() + 1);
            self.inner.estimate_join(join_type, conditions, left, right)
        }
    }

    #[test]
    fn test_each_node_estimated_once() {
        let registry = registry();
        let snap = registry.snapshot();
        let config = PlannerConfig::default();
        let oracle = TransactionLocalState::empty();
        let calls = Cell::new(0);
        let generator = PhysicalPlanGenerator::new(&config, &snap, &oracle).with_estimator(Counting {
            inner: HeuristicEstimator::new(&snap),
            calls: &calls,
        });

        // Left-deep chain of 50 cross products over 51 scans
        let mut plan = get(2, "b");
        for _ in 0..50 {
            plan = LogicalPlan::join(JoinType::Inner, plan, get(2, "b"), vec![]);
        }
        let plan = plan.filter(vec![]);

        let physical = generator.create_plan(plan).unwrap();
        assert_eq!(calls.get(), 102);
        assert_eq!(physical.name(), "FILTER");
        // 100^51 saturates
        assert_eq!(physical.children()[0].estimated_cardinality(), u64::MAX);
    }

    #[test]
    fn test_filter_above_scan_blocks_index() {
        let registry = registry();
        let snap = registry.snapshot();
        let config = PlannerConfig::for_testing();
        let oracle = TransactionLocalState::empty();
        let generator = PhysicalPlanGenerator::new(&config, &snap, &oracle);

        let filtered = get(1, "a").filter(vec![Expression::compare(
            ComparisonType::GreaterThan,
            Expression::column(TableId(1), ColumnId(1), "a.y"),
            Expression::constant(crate::types::Value::Integer(0)),
        )]);
        let plan = LogicalPlan::join(JoinType::Inner, filtered, get(2, "b"), vec![eq((1, 0), (2, 0))]);
        let plan = generator.create_plan(plan).unwrap();
        assert_eq!(plan.name(), "HASH_JOIN");
        assert_eq!(plan.children()[0].name(), "FILTER");
    }
}
