/// Expression statistics propagation
///
/// Statistics flow bottom-up through an expression tree in a single
/// [`Expression::fold`]: column references read catalog statistics,
/// constants produce point statistics, and each function call hands its
/// children's (optional) statistics to the function's registered callback.
/// A function without a callback, or any child without statistics the
/// callback needs, yields `None`.
use crate::catalog::CatalogSnapshot;
use crate::plan::expression::{BoundColumnRef, Expression};
use crate::types::Value;
use ahash::AHashMap;

/// Value range and null information for an expression or column
#[derive(Debug, Clone, PartialEq)]
pub struct BaseStatistics {
    /// Smallest non-null value, when known
    pub min: Option<Value>,
    /// Largest non-null value, when known
    pub max: Option<Value>,
    /// Whether NULL may appear
    pub can_have_null: bool,
}

impl BaseStatistics {
    /// Statistics with nothing known
    pub fn unknown() -> Self {
        Self {
            min: None,
            max: None,
            can_have_null: true,
        }
    }

    pub fn range(min: Value, max: Value, can_have_null: bool) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            can_have_null,
        }
    }

    /// Statistics of a single constant
    pub fn from_constant(value: &Value) -> Self {
        if value.is_null() {
            return Self {
                min: None,
                max: None,
                can_have_null: true,
            };
        }
        Self::range(value.clone(), value.clone(), false)
    }

    /// Integer bounds, when both are integers
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        let min = self.min.as_ref()?.as_integer()?;
        let max = self.max.as_ref()?.as_integer()?;
        Some((min, max))
    }
}

/// Callback computing a function's result statistics from its inputs
pub type StatisticsCallback = fn(&[Option<BaseStatistics>]) -> Option<BaseStatistics>;

/// Source of per-column statistics
pub trait ColumnStatisticsProvider {
    fn column_statistics(&self, column: &BoundColumnRef) -> Option<BaseStatistics>;
}

impl ColumnStatisticsProvider for CatalogSnapshot {
    fn column_statistics(&self, column: &BoundColumnRef) -> Option<BaseStatistics> {
        CatalogSnapshot::column_statistics(self, column.table, column.column).cloned()
    }
}

/// Propagates statistics through expression trees
pub struct StatisticsPropagator<'a> {
    columns: &'a dyn ColumnStatisticsProvider,
    functions: AHashMap<String, StatisticsCallback>,
}

impl<'a> StatisticsPropagator<'a> {
    /// Create a propagator with the built-in function callbacks registered
    pub fn new(columns: &'a dyn ColumnStatisticsProvider) -> Self {
        let mut propagator = Self {
            columns,
            functions: AHashMap::new(),
        };
        propagator.register_function("+", add_statistics);
        propagator.register_function("-", subtract_statistics);
        propagator.register_function("abs", abs_statistics);
        propagator
    }

    /// Register (or replace) the statistics callback of a function
    pub fn register_function(&mut self, name: &str, callback: StatisticsCallback) {
        self.functions.insert(name.to_string(), callback);
    }

    /// Statistics of `expr`, computed once per node, bottom-up
    pub fn propagate(&self, expr: &Expression) -> Option<BaseStatistics> {
        expr.fold(&mut |node: &Expression, children: Vec<Option<BaseStatistics>>| match node {
            Expression::ColumnRef(col) => self.columns.column_statistics(col),
            Expression::Constant(value) => Some(BaseStatistics::from_constant(value)),
            Expression::Function(func) => self
                .functions
                .get(&func.name)
                .and_then(|callback| callback(&children)),
            // Boolean results carry no range worth tracking
            Expression::Comparison(_) => None,
        })
    }
}

fn binary_integer_inputs(
    inputs: &[Option<BaseStatistics>],
) -> Option<((i64, i64), (i64, i64), bool)> {
    match inputs {
        [Some(lhs), Some(rhs)] => Some((
            lhs.integer_range()?,
            rhs.integer_range()?,
            lhs.can_have_null || rhs.can_have_null,
        )),
        _ => None,
    }
}

fn add_statistics(inputs: &[Option<BaseStatistics>]) -> Option<BaseStatistics> {
    let ((lmin, lmax), (rmin, rmax), nulls) = binary_integer_inputs(inputs)?;
    // Overflow means the range can't be bounded
    let min = lmin.checked_add(rmin)?;
    let max = lmax.checked_add(rmax)?;
    Some(BaseStatistics::range(Value::Integer(min), Value::Integer(max), nulls))
}

fn subtract_statistics(inputs: &[Option<BaseStatistics>]) -> Option<BaseStatistics> {
    let ((lmin, lmax), (rmin, rmax), nulls) = binary_integer_inputs(inputs)?;
    let min = lmin.checked_sub(rmax)?;
    let max = lmax.checked_sub(rmin)?;
    Some(BaseStatistics::range(Value::Integer(min), Value::Integer(max), nulls))
}

fn abs_statistics(inputs: &[Option<BaseStatistics>]) -> Option<BaseStatistics> {
    let input = match inputs {
        [Some(input)] => input,
        _ => return None,
    };
    let (min, max) = input.integer_range()?;
    let (new_min, new_max) = if min >= 0 {
        (min, max)
    } else if max <= 0 {
        (max.checked_neg()?, min.checked_neg()?)
    } else {
        (0, min.checked_neg()?.max(max))
    };
    Some(BaseStatistics::range(
        Value::Integer(new_min),
        Value::Integer(new_max),
        input.can_have_null,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnId, TableId};

    struct FixedColumns;

    impl ColumnStatisticsProvider for FixedColumns {
        fn column_statistics(&self, column: &BoundColumnRef) -> Option<BaseStatistics> {
            match column.column.0 {
                0 => Some(BaseStatistics::range(Value::Integer(-5), Value::Integer(10), false)),
                1 => Some(BaseStatistics::range(Value::Integer(1), Value::Integer(3), true)),
                _ => None,
            }
        }
    }

    fn col(id: u32) -> Expression {
        Expression::column(TableId(1), ColumnId(id), format!("t.c{}", id))
    }

    #[test]
    fn test_column_and_constant() {
        let propagator = StatisticsPropagator::new(&FixedColumns);
        let stats = propagator.propagate(&col(0)).unwrap();
        assert_eq!(stats.integer_range(), Some((-5, 10)));

        let stats = propagator
            .propagate(&Expression::constant(Value::Integer(7)))
            .unwrap();
        assert_eq!(stats.integer_range(), Some((7, 7)));
        assert!(!stats.can_have_null);
    }

    #[test]
    fn test_add_and_subtract() {
        let propagator = StatisticsPropagator::new(&FixedColumns);

        let sum = Expression::function("+", vec![col(0), col(1)]);
        let stats = propagator.propagate(&sum).unwrap();
        assert_eq!(stats.integer_range(), Some((-4, 13)));
        assert!(stats.can_have_null);

        let diff = Expression::function("-", vec![col(0), col(1)]);
        assert_eq!(
            propagator.propagate(&diff).unwrap().integer_range(),
            Some((-8, 9))
        );
    }

    #[test]
    fn test_abs_of_nested_expression() {
        let propagator = StatisticsPropagator::new(&FixedColumns);
        // abs(c0 - 20) with c0 in [-5, 10] -> [-25, -10] -> [10, 25]
        let expr = Expression::function(
            "abs",
            vec![Expression::function(
                "-",
                vec![col(0), Expression::constant(Value::Integer(20))],
            )],
        );
        assert_eq!(
            propagator.propagate(&expr).unwrap().integer_range(),
            Some((10, 25))
        );

        let straddling = Expression::function("abs", vec![col(0)]);
        assert_eq!(
            propagator.propagate(&straddling).unwrap().integer_range(),
            Some((0, 10))
        );
    }

    #[test]
    fn test_missing_statistics_yield_none() {
        let mut propagator = StatisticsPropagator::new(&FixedColumns);

        // Unknown column
        assert!(propagator.propagate(&col(9)).is_none());
        // Unknown function
        assert!(propagator
            .propagate(&Expression::function("random", vec![]))
            .is_none());
        // Known function, child without statistics
        assert!(propagator
            .propagate(&Expression::function("+", vec![col(0), col(9)]))
            .is_none());

        fn always_zero(_: &[Option<BaseStatistics>]) -> Option<BaseStatistics> {
            Some(BaseStatistics::from_constant(&Value::Integer(0)))
        }
        propagator.register_function("random", always_zero);
        assert!(propagator
            .propagate(&Expression::function("random", vec![]))
            .is_some());
    }

    #[test]
    fn test_overflow_gives_up() {
        let propagator = StatisticsPropagator::new(&FixedColumns);
        let expr = Expression::function(
            "+",
            vec![
                Expression::constant(Value::Integer(i64::MAX)),
                Expression::constant(Value::Integer(1)),
            ],
        );
        assert!(propagator.propagate(&expr).is_none());
    }
}
