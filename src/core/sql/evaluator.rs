use std::cmp::Ordering;
use crate::core::error::{DbError, EvalError, ExecutionError};
use crate::core::types::{ColumnIndex, Value};
use super::lexer::Operator;
use super::{Expression, LogicalOperator};

/// 在执行前检查表达式引用的列都存在
pub fn validate_expression(expr: &Expression, columns: &ColumnIndex) -> Result<(), DbError> {
    for name in expr.referenced_columns() {
        columns.resolve(name)?;
    }
    Ok(())
}

/// 对值表达式求值。条件表达式的结果没有对应的 `Value`，返回 `NotAValue`。
pub fn evaluate(expr: &Expression, row: &[Value], columns: &ColumnIndex) -> Result<Value, DbError> {
    match expr {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Column(name) => {
            let index = columns.resolve(name)?;
            row.get(index).cloned().ok_or_else(|| {
                ExecutionError::ColumnCountMismatch {
                    expected: columns.len(),
                    actual: row.len(),
                }
                .into()
            })
        }
        _ => Err(EvalError::NotAValue.into()),
    }
}

/// 对条件表达式求值。涉及 NULL 或无法比较的比较结果为 false。
pub fn evaluate_predicate(expr: &Expression, row: &[Value], columns: &ColumnIndex) -> Result<bool, DbError> {
    match expr {
        Expression::Comparison { operator, left, right } => {
            let left = evaluate(left, row, columns)?;
            let right = evaluate(right, row, columns)?;
            Ok(left.compare(&right).map_or(false, |ordering| matches(*operator, ordering)))
        }
        Expression::Logical { operator: LogicalOperator::And, left, right } => {
            Ok(evaluate_predicate(left, row, columns)? && evaluate_predicate(right, row, columns)?)
        }
        Expression::Logical { operator: LogicalOperator::Or, left, right } => {
            Ok(evaluate_predicate(left, row, columns)? || evaluate_predicate(right, row, columns)?)
        }
        Expression::Not(inner) => Ok(!evaluate_predicate(inner, row, columns)?),
        Expression::IsNull { expr, negated } => {
            let is_null = evaluate(expr, row, columns)?.is_null();
            Ok(is_null != *negated)
        }
        Expression::Literal(_) | Expression::Column(_) => Err(EvalError::NotAPredicate.into()),
    }
}

fn matches(operator: Operator, ordering: Ordering) -> bool {
    match operator {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Ne => ordering != Ordering::Equal,
        Operator::Lt => ordering == Ordering::Less,
        Operator::Le => ordering != Ordering::Greater,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Ge => ordering != Ordering::Less,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Table;

    fn setup() -> (ColumnIndex, Vec<Value>) {
        let table = Table::new("t", ["id", "name", "score"]);
        let row = vec![Value::Integer(1), Value::Text("a".to_string()), Value::Float(10.0)];
        (table.column_index(), row)
    }

    fn cmp(operator: Operator, column: &str, value: Value) -> Expression {
        Expression::comparison(operator, Expression::column(column), Expression::literal(value))
    }

    #[test]
    fn test_evaluate_column_and_literal() {
        let (columns, row) = setup();
        assert_eq!(evaluate(&Expression::column("NAME"), &row, &columns).unwrap(), Value::Text("a".to_string()));
        assert_eq!(
            evaluate(&Expression::literal(Value::Integer(7)), &row, &columns).unwrap(),
            Value::Integer(7)
        );
    }

    #[test]
    fn test_unknown_column_fails() {
        let (columns, row) = setup();
        let err = evaluate(&Expression::column("age"), &row, &columns).unwrap_err();
        assert!(matches!(err, DbError::Eval(EvalError::UnknownColumn(ref name)) if name == "age"));

        let predicate = cmp(Operator::Eq, "age", Value::Integer(1));
        assert!(validate_expression(&predicate, &columns).is_err());
        assert!(validate_expression(&cmp(Operator::Eq, "id", Value::Integer(1)), &columns).is_ok());
    }

    #[test]
    fn test_comparisons() {
        let (columns, row) = setup();
        let check = |expr: Expression| evaluate_predicate(&expr, &row, &columns).unwrap();
        assert!(check(cmp(Operator::Gt, "score", Value::Integer(6))));
        assert!(check(cmp(Operator::Le, "score", Value::Float(10.0))));
        assert!(check(cmp(Operator::Ne, "id", Value::Integer(2))));
        assert!(check(cmp(Operator::Lt, "name", Value::Text("b".to_string()))));
        assert!(!check(cmp(Operator::Eq, "name", Value::Text("A".to_string()))));
        assert!(!check(cmp(Operator::Ge, "id", Value::Float(1.5))));
    }

    #[test]
    fn test_null_never_satisfies_comparisons() {
        let columns = Table::new("t", ["a"]).column_index();
        let row = vec![Value::Null];
        for operator in [Operator::Eq, Operator::Ne, Operator::Lt, Operator::Le, Operator::Gt, Operator::Ge] {
            assert!(!evaluate_predicate(&cmp(operator, "a", Value::Integer(1)), &row, &columns).unwrap());
            assert!(!evaluate_predicate(&cmp(operator, "a", Value::Null), &row, &columns).unwrap());
        }
        let is_null = Expression::IsNull { expr: Box::new(Expression::column("a")), negated: false };
        assert!(evaluate_predicate(&is_null, &row, &columns).unwrap());
    }

    #[test]
    fn test_logical_operators() {
        let (columns, row) = setup();
        let yes = cmp(Operator::Eq, "id", Value::Integer(1));
        let no = cmp(Operator::Eq, "id", Value::Integer(2));
        let check = |expr: Expression| evaluate_predicate(&expr, &row, &columns).unwrap();
        assert!(!check(Expression::logical(LogicalOperator::And, yes.clone(), no.clone())));
        assert!(check(Expression::logical(LogicalOperator::Or, no.clone(), yes.clone())));
        assert!(check(Expression::not(no)));
        assert!(!check(Expression::not(yes)));
    }

    #[test]
    fn test_predicate_in_value_position_fails() {
        let (columns, row) = setup();
        let predicate = cmp(Operator::Eq, "id", Value::Integer(1));
        assert!(matches!(
            evaluate(&predicate, &row, &columns),
            Err(DbError::Eval(EvalError::NotAValue))
        ));
        let nested = cmp(Operator::Eq, "id", Value::Integer(1));
        let comparison = Expression::comparison(Operator::Eq, nested, Expression::literal(Value::Integer(1)));
        assert!(matches!(
            evaluate_predicate(&comparison, &row, &columns),
            Err(DbError::Eval(EvalError::NotAValue))
        ));
    }

    #[test]
    fn test_value_in_predicate_position_fails() {
        let (columns, row) = setup();
        for expr in [Expression::column("id"), Expression::literal(Value::Integer(1))] {
            assert!(matches!(
                evaluate_predicate(&expr, &row, &columns),
                Err(DbError::Eval(EvalError::NotAPredicate))
            ));
            let negated = Expression::not(expr);
            assert!(evaluate_predicate(&negated, &row, &columns).is_err());
        }
    }

    #[test]
    fn test_short_row_fails() {
        let (columns, _) = setup();
        let row = vec![Value::Integer(1)];
        let err = evaluate(&Expression::column("score"), &row, &columns).unwrap_err();
        assert!(matches!(
            err,
            DbError::Execution(ExecutionError::ColumnCountMismatch { expected: 3, actual: 1 })
        ));
    }
}
