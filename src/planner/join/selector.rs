/// Join strategy selection
///
/// Decision order, first match wins:
/// ```ignore
/// no conditions                      → CrossProduct
/// any `=` condition
///   left side index-eligible  && (force || |R| < ratio·|L|) → IndexJoin(left)
///   right side index-eligible && (force || |L| < ratio·|R|) → IndexJoin(right)
///   otherwise                                               → HashJoin
/// no `=` condition
///   single condition, no `<>`        → MergeJoin
///   otherwise                        → NestedLoopJoin
/// ```
/// The left side is always tried first. When both sides qualify the left one
/// wins without comparing against the right; this is a fixed precedence.
use super::eligibility::{index_for_side, JoinSide};
use crate::catalog::{CatalogSnapshot, IndexDescriptor};
use crate::config::PlannerConfig;
use crate::error::{PlanError, Result};
use crate::plan::logical::JoinDefinition;
use crate::plan::physical::PhysicalPlan;
use crate::txn::VisibilityOracle;
use crate::types::Cardinality;
use tracing::{debug, warn};

/// Physical join operator class chosen for a logical join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStrategy<'a> {
    CrossProduct,
    HashJoin,
    /// Probe `index` on the `indexed_side` input, driven by the other input
    IndexJoin {
        indexed_side: JoinSide,
        index: &'a IndexDescriptor,
    },
    MergeJoin,
    NestedLoopJoin,
}

impl JoinStrategy<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            JoinStrategy::CrossProduct => "cross_product",
            JoinStrategy::HashJoin => "hash_join",
            JoinStrategy::IndexJoin { .. } => "index_join",
            JoinStrategy::MergeJoin => "merge_join",
            JoinStrategy::NestedLoopJoin => "nested_loop_join",
        }
    }
}

/// Read-only inputs for one planning call
#[derive(Clone, Copy)]
pub struct SelectionContext<'a> {
    pub config: &'a PlannerConfig,
    pub catalog: &'a CatalogSnapshot,
    pub oracle: &'a dyn VisibilityOracle,
}

/// Reject condition sets no correct upstream planner produces
pub fn validate_conditions(join: &JoinDefinition) -> Result<()> {
    for (i, cond) in join.conditions.iter().enumerate() {
        if cond.null_values_are_equal && !cond.is_equality() {
            warn!(condition = i, comparison = %cond.comparison, "null-aware condition on non-equality");
            return Err(PlanError::internal(format!(
                "join condition {} ({}) is null-aware but its comparison is '{}'; \
                 only '=' may treat NULLs as equal",
                i, cond, cond.comparison
            )));
        }
    }
    Ok(())
}

/// Choose the physical operator class for `join`.
///
/// `left`/`right` are the already lowered inputs and `left_card`/`right_card`
/// their estimated row counts. Only malformed conditions produce an error;
/// any heuristic shortfall falls back to a more general operator.
pub fn select_join_strategy<'a>(
    join: &JoinDefinition,
    left: &PhysicalPlan,
    right: &PhysicalPlan,
    left_card: Cardinality,
    right_card: Cardinality,
    ctx: SelectionContext<'a>,
) -> Result<JoinStrategy<'a>> {
    validate_conditions(join)?;

    if join.conditions.is_empty() {
        return Ok(JoinStrategy::CrossProduct);
    }

    if join.has_equality() {
        let left_index = index_for_side(join, JoinSide::Left, left, ctx.catalog, ctx.oracle);
        let right_index = index_for_side(join, JoinSide::Right, right, ctx.catalog, ctx.oracle);

        if let Some(index) = left_index {
            if ctx.config.force_index_join || ctx.config.passes_index_ratio(right_card, left_card) {
                return Ok(JoinStrategy::IndexJoin {
                    indexed_side: JoinSide::Left,
                    index,
                });
            }
        }
        if let Some(index) = right_index {
            if ctx.config.force_index_join || ctx.config.passes_index_ratio(left_card, right_card) {
                return Ok(JoinStrategy::IndexJoin {
                    indexed_side: JoinSide::Right,
                    index,
                });
            }
        }
        if left_index.is_some() || right_index.is_some() {
            debug!(left_card, right_card, "index available but ratio test failed");
        }
        return Ok(JoinStrategy::HashJoin);
    }

    if join.conditions.len() == 1 && !join.has_inequality() {
        Ok(JoinStrategy::MergeJoin)
    } else {
        Ok(JoinStrategy::NestedLoopJoin)
    }
}
