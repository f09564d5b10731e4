//! Logical operators handed to physical planning

use crate::error::{PlanError, Result};
use crate::plan::expression::{ComparisonType, Expression};
use crate::plan::filter::TableFilterSet;
use crate::types::{ColumnId, TableId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Join semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
    Semi,
    Anti,
    Mark,
    Single,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Outer => "OUTER",
            JoinType::Semi => "SEMI",
            JoinType::Anti => "ANTI",
            JoinType::Mark => "MARK",
            JoinType::Single => "SINGLE",
        };
        f.write_str(name)
    }
}

/// One comparison predicate between the left and right join inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinCondition {
    /// Operand evaluated on the left input
    pub left: Expression,
    /// Operand evaluated on the right input
    pub right: Expression,
    pub comparison: ComparisonType,
    /// `IS NOT DISTINCT FROM`: NULL matches NULL. Only valid with `Equal`.
    pub null_values_are_equal: bool,
}

impl JoinCondition {
    pub fn new(left: Expression, comparison: ComparisonType, right: Expression) -> Self {
        Self {
            left,
            right,
            comparison,
            null_values_are_equal: false,
        }
    }

    /// `left IS NOT DISTINCT FROM right`
    pub fn not_distinct_from(left: Expression, right: Expression) -> Self {
        Self {
            left,
            right,
            comparison: ComparisonType::Equal,
            null_values_are_equal: true,
        }
    }

    pub fn is_equality(&self) -> bool {
        self.comparison == ComparisonType::Equal
    }

    /// Same predicate with operands swapped
    pub fn flipped(self) -> Self {
        Self {
            left: self.right,
            right: self.left,
            comparison: self.comparison.flip(),
            null_values_are_equal: self.null_values_are_equal,
        }
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.null_values_are_equal {
            write!(f, "{} IS NOT DISTINCT FROM {}", self.left, self.right)
        } else {
            write!(f, "{} {} {}", self.left, self.comparison, self.right)
        }
    }
}

/// Base table scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalGet {
    pub table: TableId,
    pub table_name: String,
    /// Columns produced by the scan, in output order
    pub column_ids: Vec<ColumnId>,
    /// Filters pushed into the scan
    pub table_filters: TableFilterSet,
}

/// Filter on top of an arbitrary input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalFilter {
    pub predicates: Vec<Expression>,
    pub child: Box<LogicalPlan>,
}

/// Join node with comparison conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalComparisonJoin {
    pub join_type: JoinType,
    /// Conjunction of predicates. Order is significant and kept as-is.
    pub conditions: Vec<JoinCondition>,
    /// Binary operator; anything but two children is a malformed plan
    pub children: Vec<LogicalPlan>,
    /// Left input columns kept in the output (empty = all)
    pub left_projection_map: Vec<usize>,
    /// Right input columns kept in the output (empty = all)
    pub right_projection_map: Vec<usize>,
}

/// A comparison join without its inputs
#[derive(Debug, Clone, PartialEq)]
pub struct JoinDefinition {
    pub join_type: JoinType,
    pub conditions: Vec<JoinCondition>,
    pub left_projection_map: Vec<usize>,
    pub right_projection_map: Vec<usize>,
}

impl JoinDefinition {
    pub fn has_equality(&self) -> bool {
        self.conditions.iter().any(JoinCondition::is_equality)
    }

    pub fn has_inequality(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.comparison == ComparisonType::NotEqual)
    }
}

impl LogicalComparisonJoin {
    /// Split into the join definition and exactly two inputs
    pub fn into_parts(self) -> Result<(JoinDefinition, LogicalPlan, LogicalPlan)> {
        let children: [LogicalPlan; 2] = self.children.try_into().map_err(|c: Vec<_>| {
            PlanError::internal(format!(
                "comparison join requires exactly 2 children, got {}",
                c.len()
            ))
        })?;
        let [left, right] = children;
        let definition = JoinDefinition {
            join_type: self.join_type,
            conditions: self.conditions,
            left_projection_map: self.left_projection_map,
            right_projection_map: self.right_projection_map,
        };
        Ok((definition, left, right))
    }
}

/// Logical plan tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalPlan {
    Get(LogicalGet),
    Filter(LogicalFilter),
    ComparisonJoin(LogicalComparisonJoin),
}

impl LogicalPlan {
    /// Scan of `column_ids` from a table, without filters
    pub fn get(table: TableId, table_name: impl Into<String>, column_ids: Vec<ColumnId>) -> Self {
        LogicalPlan::Get(LogicalGet {
            table,
            table_name: table_name.into(),
            column_ids,
            table_filters: TableFilterSet::new(),
        })
    }

    /// Scan with pushed-down filters
    pub fn get_filtered(
        table: TableId,
        table_name: impl Into<String>,
        column_ids: Vec<ColumnId>,
        table_filters: TableFilterSet,
    ) -> Self {
        LogicalPlan::Get(LogicalGet {
            table,
            table_name: table_name.into(),
            column_ids,
            table_filters,
        })
    }

    pub fn filter(self, predicates: Vec<Expression>) -> Self {
        LogicalPlan::Filter(LogicalFilter {
            predicates,
            child: Box::new(self),
        })
    }

    /// Binary comparison join keeping every column of both inputs
    pub fn join(
        join_type: JoinType,
        left: LogicalPlan,
        right: LogicalPlan,
        conditions: Vec<JoinCondition>,
    ) -> Self {
        LogicalPlan::ComparisonJoin(LogicalComparisonJoin {
            join_type,
            conditions,
            children: vec![left, right],
            left_projection_map: Vec::new(),
            right_projection_map: Vec::new(),
        })
    }

    /// Set projection maps on a join node; other nodes are returned unchanged
    pub fn with_projection_maps(mut self, left: Vec<usize>, right: Vec<usize>) -> Self {
        if let LogicalPlan::ComparisonJoin(join) = &mut self {
            join.left_projection_map = left;
            join.right_projection_map = right;
        }
        self
    }

    pub fn children(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::Get(_) => Vec::new(),
            LogicalPlan::Filter(filter) => vec![filter.child.as_ref()],
            LogicalPlan::ComparisonJoin(join) => join.children.iter().collect(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogicalPlan::Get(_) => "GET",
            LogicalPlan::Filter(_) => "FILTER",
            LogicalPlan::ComparisonJoin(_) => "COMPARISON_JOIN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(id: u32, name: &str) -> LogicalPlan {
        LogicalPlan::get(TableId(id), name, vec![ColumnId(0), ColumnId(1)])
    }

    fn col(table: u32, column: u32, name: &str) -> Expression {
        Expression::column(TableId(table), ColumnId(column), name)
    }

    #[test]
    fn test_condition_flip() {
        let cond = JoinCondition::new(col(1, 0, "a.x"), ComparisonType::LessThan, col(2, 0, "b.y"));
        let flipped = cond.clone().flipped();
        assert_eq!(flipped.to_string(), "b.y > a.x");
        assert_eq!(flipped.flipped(), cond);
    }

    #[test]
    fn test_not_distinct_display() {
        let cond = JoinCondition::not_distinct_from(col(1, 0, "a.x"), col(2, 0, "b.y"));
        assert!(cond.is_equality());
        assert_eq!(cond.to_string(), "a.x IS NOT DISTINCT FROM b.y");
    }

    #[test]
    fn test_into_parts() {
        let plan = LogicalPlan::join(JoinType::Inner, scan(1, "a"), scan(2, "b"), vec![])
            .with_projection_maps(vec![1], vec![0]);
        let LogicalPlan::ComparisonJoin(join) = plan else {
            panic!("expected join");
        };
        let (def, left, right) = join.into_parts().unwrap();
        assert_eq!(def.left_projection_map, vec![1]);
        assert_eq!(def.right_projection_map, vec![0]);
        assert_eq!(left.name(), "GET");
        assert_eq!(right.name(), "GET");
    }

    #[test]
    fn test_non_binary_join_is_internal_error() {
        let join = LogicalComparisonJoin {
            join_type: JoinType::Inner,
            conditions: vec![],
            children: vec![scan(1, "a"), scan(2, "b"), scan(3, "c")],
            left_projection_map: vec![],
            right_projection_map: vec![],
        };
        let err = join.into_parts().unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_definition_classification() {
        let def = JoinDefinition {
            join_type: JoinType::Inner,
            conditions: vec![
                JoinCondition::new(col(1, 0, "a.x"), ComparisonType::NotEqual, col(2, 0, "b.y")),
                JoinCondition::new(col(1, 1, "a.z"), ComparisonType::Equal, col(2, 1, "b.w")),
            ],
            left_projection_map: vec![],
            right_projection_map: vec![],
        };
        assert!(def.has_equality());
        assert!(def.has_inequality());
    }
}
