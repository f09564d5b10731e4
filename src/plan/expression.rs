//! Bound expressions
//!
//! Expressions reaching the planner are already bound: every column reference
//! names its table and column id.

use crate::types::{ColumnId, TableId, Value};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonType {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

impl ComparisonType {
    /// Operator to use when the two operands trade places (`a < b` ⇔ `b > a`)
    pub fn flip(self) -> Self {
        match self {
            ComparisonType::LessThan => ComparisonType::GreaterThan,
            ComparisonType::GreaterThan => ComparisonType::LessThan,
            ComparisonType::LessThanOrEqual => ComparisonType::GreaterThanOrEqual,
            ComparisonType::GreaterThanOrEqual => ComparisonType::LessThanOrEqual,
            other => other,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonType::Equal => "=",
            ComparisonType::NotEqual => "<>",
            ComparisonType::LessThan => "<",
            ComparisonType::GreaterThan => ">",
            ComparisonType::LessThanOrEqual => "<=",
            ComparisonType::GreaterThanOrEqual => ">=",
        }
    }
}

impl fmt::Display for ComparisonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Reference to a column of a base table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundColumnRef {
    pub table: TableId,
    pub column: ColumnId,
    /// Display name, usually `table.column`
    pub name: String,
}

/// Scalar function call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpression {
    pub name: String,
    pub children: Vec<Expression>,
}

/// Binary comparison used as a filter predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonExpression {
    pub comparison: ComparisonType,
    pub left: Expression,
    pub right: Expression,
}

/// Bound expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    ColumnRef(BoundColumnRef),
    Constant(Value),
    Function(FunctionExpression),
    Comparison(Box<ComparisonExpression>),
}

impl Expression {
    pub fn column(table: TableId, column: ColumnId, name: impl Into<String>) -> Self {
        Expression::ColumnRef(BoundColumnRef {
            table,
            column,
            name: name.into(),
        })
    }

    pub fn constant(value: Value) -> Self {
        Expression::Constant(value)
    }

    pub fn function(name: impl Into<String>, children: Vec<Expression>) -> Self {
        Expression::Function(FunctionExpression {
            name: name.into(),
            children,
        })
    }

    pub fn compare(comparison: ComparisonType, left: Expression, right: Expression) -> Self {
        Expression::Comparison(Box::new(ComparisonExpression {
            comparison,
            left,
            right,
        }))
    }

    /// The column this expression is, if it is a bare column reference
    pub fn as_column_ref(&self) -> Option<&BoundColumnRef> {
        match self {
            Expression::ColumnRef(col) => Some(col),
            _ => None,
        }
    }

    /// Direct children, left to right
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::ColumnRef(_) | Expression::Constant(_) => Vec::new(),
            Expression::Function(func) => func.children.iter().collect(),
            Expression::Comparison(cmp) => vec![&cmp.left, &cmp.right],
        }
    }

    /// Postorder fold.
    ///
    /// Children are folded left to right, then `f` sees the node together
    /// with the folded results of its children. Every node is visited once.
    pub fn fold<T, F>(&self, f: &mut F) -> T
    where
        F: FnMut(&Expression, Vec<T>) -> T,
    {
        let children = self
            .children()
            .into_iter()
            .map(|child| child.fold(f))
            .collect();
        f(self, children)
    }

    /// Tables referenced anywhere in the expression
    pub fn referenced_tables(&self) -> AHashSet<TableId> {
        self.fold(&mut |node: &Expression, children: Vec<AHashSet<TableId>>| {
            let mut tables: AHashSet<TableId> = children.into_iter().flatten().collect();
            if let Expression::ColumnRef(col) = node {
                tables.insert(col.table);
            }
            tables
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::ColumnRef(col) => f.write_str(&col.name),
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Function(func) => {
                write!(f, "{}(", func.name)?;
                for (i, child) in func.children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Expression::Comparison(cmp) => {
                write!(f, "{} {} {}", cmp.left, cmp.comparison, cmp.right)
            }
        }
    }
}
