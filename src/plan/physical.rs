//! Physical operators
//!
//! A physical plan is a strict tree: every operator owns its children.

use crate::catalog::IndexDescriptor;
use crate::plan::expression::Expression;
use crate::plan::filter::TableFilterSet;
use crate::plan::logical::{JoinCondition, JoinType};
use crate::types::{Cardinality, ColumnId, TableId};
use std::fmt;

/// Sequential scan of a base table
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalTableScan {
    pub table: TableId,
    pub table_name: String,
    pub column_ids: Vec<ColumnId>,
    pub table_filters: TableFilterSet,
    pub estimated_cardinality: Cardinality,
}

impl PhysicalTableScan {
    pub fn has_filters(&self) -> bool {
        !self.table_filters.is_empty()
    }
}

/// Filter over an arbitrary input
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalFilter {
    pub predicates: Vec<Expression>,
    pub child: Box<PhysicalPlan>,
    pub estimated_cardinality: Cardinality,
}

/// Inputs and parameters shared by every join operator
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOperator {
    pub join_type: JoinType,
    /// Conditions in the operator's operand order
    pub conditions: Vec<JoinCondition>,
    /// First child
    pub left: Box<PhysicalPlan>,
    /// Second child
    pub right: Box<PhysicalPlan>,
    pub left_projection_map: Vec<usize>,
    pub right_projection_map: Vec<usize>,
    pub estimated_cardinality: Cardinality,
}

/// Index nested-loop join.
///
/// `join.left` is always the driving (outer) input and `join.right` the
/// indexed table scan; every condition reads `driving_expr = indexed_column`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexJoin {
    pub join: JoinOperator,
    /// Index probed for every driving row
    pub index: IndexDescriptor,
    /// Columns fetched from the indexed table
    pub column_ids: Vec<ColumnId>,
    /// True when the logical left input is the driving side (no swap happened)
    pub lhs_first: bool,
}

/// Physical join operator
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalJoin {
    /// Cartesian product, no conditions
    CrossProduct(JoinOperator),
    /// Hash join; supports any condition mix including null-aware equality
    HashJoin(JoinOperator),
    /// Index probe join; single non-null-aware equality condition
    IndexJoin(IndexJoin),
    /// Piecewise merge join on a single range predicate
    MergeJoin(JoinOperator),
    /// Nested-loop join; evaluates every predicate for every pair
    NestedLoopJoin(JoinOperator),
}

impl PhysicalJoin {
    pub fn operator(&self) -> &JoinOperator {
        match self {
            PhysicalJoin::CrossProduct(op)
            | PhysicalJoin::HashJoin(op)
            | PhysicalJoin::MergeJoin(op)
            | PhysicalJoin::NestedLoopJoin(op) => op,
            PhysicalJoin::IndexJoin(index_join) => &index_join.join,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PhysicalJoin::CrossProduct(_) => "CROSS_PRODUCT",
            PhysicalJoin::HashJoin(_) => "HASH_JOIN",
            PhysicalJoin::IndexJoin(_) => "INDEX_JOIN",
            PhysicalJoin::MergeJoin(_) => "PIECEWISE_MERGE_JOIN",
            PhysicalJoin::NestedLoopJoin(_) => "NESTED_LOOP_JOIN",
        }
    }

    pub fn join_type(&self) -> JoinType {
        self.operator().join_type
    }

    pub fn conditions(&self) -> &[JoinCondition] {
        &self.operator().conditions
    }

    /// Whether operands and children were swapped relative to the logical join
    pub fn is_swapped(&self) -> bool {
        matches!(self, PhysicalJoin::IndexJoin(ij) if !ij.lhs_first)
    }

    /// Conditions in the logical join's operand order
    pub fn original_conditions(&self) -> Vec<JoinCondition> {
        let conditions = self.conditions().iter().cloned();
        if self.is_swapped() {
            conditions.map(JoinCondition::flipped).collect()
        } else {
            conditions.collect()
        }
    }

    /// (left, right) projection maps in the logical join's side order
    pub fn original_projection_maps(&self) -> (&[usize], &[usize]) {
        let op = self.operator();
        if self.is_swapped() {
            (op.right_projection_map.as_slice(), op.left_projection_map.as_slice())
        } else {
            (op.left_projection_map.as_slice(), op.right_projection_map.as_slice())
        }
    }
}

/// Physical plan tree
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicalPlan {
    TableScan(PhysicalTableScan),
    Filter(PhysicalFilter),
    Join(PhysicalJoin),
}

impl PhysicalPlan {
    /// The scan itself when this node is a bare table scan
    pub fn as_table_scan(&self) -> Option<&PhysicalTableScan> {
        match self {
            PhysicalPlan::TableScan(scan) => Some(scan),
            _ => None,
        }
    }

    pub fn as_join(&self) -> Option<&PhysicalJoin> {
        match self {
            PhysicalPlan::Join(join) => Some(join),
            _ => None,
        }
    }

    pub fn estimated_cardinality(&self) -> Cardinality {
        match self {
            PhysicalPlan::TableScan(scan) => scan.estimated_cardinality,
            PhysicalPlan::Filter(filter) => filter.estimated_cardinality,
            PhysicalPlan::Join(join) => join.operator().estimated_cardinality,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PhysicalPlan::TableScan(_) => "TABLE_SCAN",
            PhysicalPlan::Filter(_) => "FILTER",
            PhysicalPlan::Join(join) => join.name(),
        }
    }

    pub fn children(&self) -> Vec<&PhysicalPlan> {
        match self {
            PhysicalPlan::TableScan(_) => Vec::new(),
            PhysicalPlan::Filter(filter) => vec![filter.child.as_ref()],
            PhysicalPlan::Join(join) => {
                let op = join.operator();
                vec![op.left.as_ref(), op.right.as_ref()]
            }
        }
    }

    /// One-line description of this node, without children
    fn describe(&self) -> String {
        match self {
            PhysicalPlan::TableScan(scan) => {
                let mut out = format!("{} {}", self.name(), scan.table_name);
                if scan.has_filters() {
                    let filters: Vec<String> = scan
                        .table_filters
                        .iter()
                        .map(|(col, f)| format!("{} {}", col, f))
                        .collect();
                    out.push_str(&format!(" filters=[{}]", filters.join(" AND ")));
                }
                out
            }
            PhysicalPlan::Filter(filter) => {
                let preds: Vec<String> = filter.predicates.iter().map(|p| p.to_string()).collect();
                format!("{} {}", self.name(), preds.join(" AND "))
            }
            PhysicalPlan::Join(join) => {
                let conds: Vec<String> = join.conditions().iter().map(|c| c.to_string()).collect();
                let mut out = format!("{} {}", join.name(), join.join_type());
                if !conds.is_empty() {
                    out.push_str(&format!(" {}", conds.join(" AND ")));
                }
                if let PhysicalJoin::IndexJoin(ij) = join {
                    out.push_str(&format!(" index={}", ij.index.name));
                }
                out
            }
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{}{} (~{} rows)",
            "  ".repeat(depth),
            self.describe(),
            self.estimated_cardinality()
        )?;
        for child in self.children() {
            child.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for PhysicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

impl From<PhysicalJoin> for PhysicalPlan {
    fn from(join: PhysicalJoin) -> Self {
        PhysicalPlan::Join(join)
    }
}
