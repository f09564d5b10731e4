/// Index-join eligibility
///
/// A join side may be probed through an index only when every one of these
/// holds:
/// 1. its physical input is a bare table scan;
/// 2. the join is a single, inner, non-null-aware equality;
/// 3. the scan has no residual filters (index probes can't post-filter);
/// 4. the table has no transaction-local rows (indexes can't see them);
/// 5. some live index is bound to exactly the column this side compares.
use crate::catalog::{CatalogSnapshot, IndexDescriptor};
use crate::plan::logical::{JoinDefinition, JoinType};
use crate::plan::physical::PhysicalPlan;
use crate::txn::VisibilityOracle;
use tracing::debug;

/// One input of a binary join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

/// Whether the join's predicate shape allows an index join at all
pub fn is_index_join_shape(join: &JoinDefinition) -> bool {
    match join.conditions.as_slice() {
        [cond] => {
            join.join_type == JoinType::Inner && cond.is_equality() && !cond.null_values_are_equal
        }
        _ => false,
    }
}

/// The index `side` can be probed through, or `None` when that side is not
/// eligible. Pure: reads the plan, the catalog snapshot and the oracle only.
pub fn index_for_side<'a>(
    join: &JoinDefinition,
    side: JoinSide,
    plan: &PhysicalPlan,
    catalog: &'a CatalogSnapshot,
    oracle: &dyn VisibilityOracle,
) -> Option<&'a IndexDescriptor> {
    let scan = plan.as_table_scan()?;

    if !is_index_join_shape(join) {
        return None;
    }
    if scan.has_filters() {
        debug!(table = %scan.table_name, ?side, "index join rejected: scan has table filters");
        return None;
    }
    if oracle.has_local_storage(scan.table) {
        debug!(
            table = %scan.table_name,
            ?side,
            "index join rejected: transaction-local storage present"
        );
        return None;
    }

    let cond = &join.conditions[0];
    let operand = match side {
        JoinSide::Left => &cond.left,
        JoinSide::Right => &cond.right,
    };
    let column = operand.as_column_ref()?;
    if column.table != scan.table {
        return None;
    }

    catalog
        .indexes_for_table(scan.table)
        .find(|index| index.column == column.column)
}
