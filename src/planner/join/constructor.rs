//! Physical join construction
//!
//! Materializes the operator picked by the selector. Both inputs move into
//! the new node. An index join on the left input puts the driving (right)
//! input first, swaps the condition's operands and swaps the projection maps
//! so that every index join reads `driving = indexed` with the indexed scan
//! as second child.

use super::eligibility::JoinSide;
use super::selector::JoinStrategy;
use crate::error::{PlanError, Result};
use crate::plan::logical::{JoinCondition, JoinDefinition};
use crate::plan::physical::{IndexJoin, JoinOperator, PhysicalJoin, PhysicalPlan};
use crate::types::Cardinality;

/// Build the physical operator for `strategy`, taking ownership of both inputs
pub fn build_join(
    join: JoinDefinition,
    left: PhysicalPlan,
    right: PhysicalPlan,
    strategy: JoinStrategy<'_>,
    estimated_cardinality: Cardinality,
) -> Result<PhysicalJoin> {
    let JoinDefinition {
        join_type,
        conditions,
        left_projection_map,
        right_projection_map,
    } = join;

    let operator = |conditions: Vec<JoinCondition>,
                    left: PhysicalPlan,
                    right: PhysicalPlan,
                    left_projection_map: Vec<usize>,
                    right_projection_map: Vec<usize>| JoinOperator {
        join_type,
        conditions,
        left: Box::new(left),
        right: Box::new(right),
        left_projection_map,
        right_projection_map,
        estimated_cardinality,
    };

    let built = match strategy {
        JoinStrategy::CrossProduct => PhysicalJoin::CrossProduct(operator(
            conditions,
            left,
            right,
            left_projection_map,
            right_projection_map,
        )),
        JoinStrategy::HashJoin => PhysicalJoin::HashJoin(operator(
            conditions,
            left,
            right,
            left_projection_map,
            right_projection_map,
        )),
        JoinStrategy::MergeJoin => PhysicalJoin::MergeJoin(operator(
            conditions,
            left,
            right,
            left_projection_map,
            right_projection_map,
        )),
        JoinStrategy::NestedLoopJoin => PhysicalJoin::NestedLoopJoin(operator(
            conditions,
            left,
            right,
            left_projection_map,
            right_projection_map,
        )),
        JoinStrategy::IndexJoin {
            indexed_side,
            index,
        } => {
            let indexed = match indexed_side {
                JoinSide::Left => &left,
                JoinSide::Right => &right,
            };
            let column_ids = indexed
                .as_table_scan()
                .map(|scan| scan.column_ids.clone())
                .ok_or_else(|| {
                    PlanError::internal(format!(
                        "index join on '{}' requires a table scan input, got {}",
                        index.name,
                        indexed.name()
                    ))
                })?;

            let join = match indexed_side {
                JoinSide::Left => operator(
                    conditions.into_iter().map(JoinCondition::flipped).collect(),
                    right,
                    left,
                    right_projection_map,
                    left_projection_map,
                ),
                JoinSide::Right => operator(
                    conditions,
                    left,
                    right,
                    left_projection_map,
                    right_projection_map,
                ),
            };

            PhysicalJoin::IndexJoin(IndexJoin {
                join,
                index: index.clone(),
                column_ids,
                lhs_first: indexed_side == JoinSide::Right,
            })
        }
    };

    Ok(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{IndexDescriptor, IndexKind};
    use crate::plan::expression::{ComparisonType, Expression};
    use crate::plan::filter::TableFilterSet;
    use crate::plan::logical::JoinType;
    use crate::plan::physical::PhysicalTableScan;
    use crate::types::{ColumnId, TableId};

    fn scan(id: u32, name: &str) -> PhysicalPlan {
        PhysicalPlan::TableScan(PhysicalTableScan {
            table: TableId(id),
            table_name: name.into(),
            column_ids: vec![ColumnId(0), ColumnId(id)],
            table_filters: TableFilterSet::new(),
            estimated_cardinality: 0,
        })
    }

    fn index_on(table: u32) -> IndexDescriptor {
        IndexDescriptor {
            name: format!("t{}_idx", table),
            table: TableId(table),
            column: ColumnId(0),
            column_name: "x".into(),
            kind: IndexKind::Art,
        }
    }

    fn definition() -> JoinDefinition {
        JoinDefinition {
            join_type: JoinType::Inner,
            conditions: vec![JoinCondition::new(
                Expression::column(TableId(1), ColumnId(0), "a.x"),
                ComparisonType::Equal,
                Expression::column(TableId(2), ColumnId(0), "b.y"),
            )],
            left_projection_map: vec![0, 1],
            right_projection_map: vec![1],
        }
    }

    #[test]
    fn test_left_index_join_swaps() {
        let index = index_on(1);
        let strategy = JoinStrategy::IndexJoin {
            indexed_side: JoinSide::Left,
            index: &index,
        };
        let join = build_join(definition(), scan(1, "a"), scan(2, "b"), strategy, 100).unwrap();

        let PhysicalJoin::IndexJoin(ij) = &join else {
            panic!("expected index join");
        };
        assert!(!ij.lhs_first);
        assert_eq!(ij.index.name, "t1_idx");
        assert_eq!(ij.column_ids, vec![ColumnId(0), ColumnId(1)]);
        // Driving input first
        assert_eq!(ij.join.left.as_table_scan().unwrap().table_name, "b");
        assert_eq!(ij.join.right.as_table_scan().unwrap().table_name, "a");
        assert_eq!(ij.join.conditions[0].to_string(), "b.y = a.x");
        assert_eq!(ij.join.left_projection_map, vec![1]);
        assert_eq!(ij.join.right_projection_map, vec![0, 1]);

        // Reversing the swap gives back the logical join
        assert_eq!(join.original_conditions(), definition().conditions);
        let (l, r) = join.original_projection_maps();
        assert_eq!(l, &[0, 1]);
        assert_eq!(r, &[1]);
    }

    #[test]
    fn test_right_index_join_keeps_order() {
        let index = index_on(2);
        let strategy = JoinStrategy::IndexJoin {
            indexed_side: JoinSide::Right,
            index: &index,
        };
        let join = build_join(definition(), scan(1, "a"), scan(2, "b"), strategy, 100).unwrap();

        let PhysicalJoin::IndexJoin(ij) = &join else {
            panic!("expected index join");
        };
        assert!(ij.lhs_first);
        assert_eq!(ij.column_ids, vec![ColumnId(0), ColumnId(2)]);
        assert_eq!(ij.join.conditions, definition().conditions);
        assert_eq!(ij.join.left.as_table_scan().unwrap().table_name, "a");
    }

    #[test]
    fn test_general_variants_preserve_inputs() {
        for strategy in [
            JoinStrategy::CrossProduct,
            JoinStrategy::HashJoin,
            JoinStrategy::MergeJoin,
            JoinStrategy::NestedLoopJoin,
        ] {
            let join = build_join(definition(), scan(1, "a"), scan(2, "b"), strategy, 7).unwrap();
            assert!(!join.is_swapped());
            assert_eq!(join.conditions(), definition().conditions.as_slice());
            assert_eq!(join.operator().left_projection_map, vec![0, 1]);
            assert_eq!(join.operator().right_projection_map, vec![1]);
            assert_eq!(join.operator().left.as_table_scan().unwrap().table_name, "a");
            assert_eq!(join.operator().estimated_cardinality, 7);
        }
    }

    #[test]
    fn test_index_join_without_scan_is_internal() {
        let index = index_on(1);
        let not_a_scan = PhysicalPlan::Join(
            build_join(
                JoinDefinition {
                    conditions: vec![],
                    ..definition()
                },
                scan(1, "a"),
                scan(3, "c"),
                JoinStrategy::CrossProduct,
                0,
            )
            .unwrap(),
        );
        let strategy = JoinStrategy::IndexJoin {
            indexed_side: JoinSide::Left,
            index: &index,
        };
        let err = build_join(definition(), not_a_scan, scan(2, "b"), strategy, 0).unwrap_err();
        assert!(err.is_internal());
    }
}
