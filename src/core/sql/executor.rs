use std::cmp::Ordering;
use std::collections::HashSet;
use crate::core::error::{DbError, ExecutionError};
use crate::core::types::{ColumnIndex, Row, Table, Value};
use super::evaluator::{evaluate, evaluate_predicate, validate_expression};
use super::{Assignment, Expression, OrderBy, Projection, SortDirection, Statement};

/// 语句的执行结果：查询返回新表，修改语句返回受影响的行数
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Select(Table),
    Affected(usize),
}

/// 在给定的表上执行一条语句。
///
/// 所有列引用在修改任何一行之前检查完毕；失败时表保持原样。
pub fn execute(statement: &Statement, table: &mut Table) -> Result<ExecutionResult, DbError> {
    if !statement.table().eq_ignore_ascii_case(&table.name) {
        return Err(DbError::table_not_found(statement.table()));
    }

    match statement {
        Statement::Insert { columns, values, .. } => {
            insert(table, columns.as_deref(), values).map(ExecutionResult::Affected)
        }
        Statement::Update { assignments, predicate, .. } => {
            update(table, assignments, predicate.as_ref()).map(ExecutionResult::Affected)
        }
        Statement::Delete { predicate, .. } => {
            delete(table, predicate.as_ref()).map(ExecutionResult::Affected)
        }
        Statement::Select { projection, predicate, order_by, .. } => {
            select(table, projection, predicate.as_ref(), order_by).map(ExecutionResult::Select)
        }
    }
}

fn insert(table: &mut Table, columns: Option<&[String]>, values: &[Value]) -> Result<usize, DbError> {
    let row = match columns {
        None => values.to_vec(),
        Some(columns) => {
            if columns.len() != values.len() {
                return Err(ExecutionError::ColumnCountMismatch {
                    expected: columns.len(),
                    actual: values.len(),
                }
                .into());
            }
            let index = table.column_index();
            // 未列出的列为 NULL
            let mut row = vec![Value::Null; table.columns.len()];
            let mut seen = HashSet::new();
            for (name, value) in columns.iter().zip(values) {
                let position = index.resolve(name)?;
                if !seen.insert(position) {
                    return Err(ExecutionError::DuplicateColumn(name.clone()).into());
                }
                row[position] = value.clone();
            }
            row
        }
    };

    table.insert_row(row)?;
    Ok(1)
}

fn delete(table: &mut Table, predicate: Option<&Expression>) -> Result<usize, DbError> {
    let index = table.column_index();
    let hits = matching_rows(&table.rows, predicate, &index)?;

    let rows = std::mem::take(&mut table.rows);
    let before = rows.len();
    table.rows = rows
        .into_iter()
        .zip(hits)
        .filter_map(|(row, hit)| if hit { None } else { Some(row) })
        .collect();
    Ok(before - table.rows.len())
}

fn update(table: &mut Table, assignments: &[Assignment], predicate: Option<&Expression>) -> Result<usize, DbError> {
    let index = table.column_index();

    let mut targets = Vec::with_capacity(assignments.len());
    let mut seen = HashSet::new();
    for assignment in assignments {
        let position = index.resolve(&assignment.column)?;
        if !seen.insert(position) {
            return Err(ExecutionError::DuplicateColumn(assignment.column.clone()).into());
        }
        validate_expression(&assignment.value, &index)?;
        targets.push((position, &assignment.value));
    }
    let hits = matching_rows(&table.rows, predicate, &index)?;

    // 先基于原始行计算出所有新值，再统一写入
    let mut changes: Vec<(usize, Vec<(usize, Value)>)> = Vec::new();
    for (row_index, (row, hit)) in table.rows.iter().zip(&hits).enumerate() {
        if !*hit {
            continue;
        }
        let new_values = targets
            .iter()
            .map(|&(position, expr)| -> Result<(usize, Value), DbError> {
                Ok((position, evaluate(expr, row, &index)?))
            })
            .collect::<Result<Vec<_>, DbError>>()?;
        changes.push((row_index, new_values));
    }

    let touched = changes.len();
    for (row_index, new_values) in changes {
        for (position, value) in new_values {
            table.rows[row_index][position] = value;
        }
    }
    Ok(touched)
}

fn select(
    table: &Table,
    projection: &Projection,
    predicate: Option<&Expression>,
    order_by: &[OrderBy],
) -> Result<Table, DbError> {
    let index = table.column_index();

    let positions: Vec<usize> = match projection {
        Projection::All => (0..table.columns.len()).collect(),
        Projection::Columns(names) => names
            .iter()
            .map(|name| index.resolve(name))
            .collect::<Result<_, _>>()?,
    };
    let sort_keys = order_by
        .iter()
        .map(|key| -> Result<(usize, SortDirection), DbError> {
            Ok((index.resolve(&key.column)?, key.direction))
        })
        .collect::<Result<Vec<_>, DbError>>()?;
    let hits = matching_rows(&table.rows, predicate, &index)?;

    let mut selected: Vec<&Row> = table
        .rows
        .iter()
        .zip(hits)
        .filter_map(|(row, hit)| hit.then_some(row))
        .collect();

    // sort_by 是稳定排序，键相同的行保持原有顺序
    if !sort_keys.is_empty() {
        selected.sort_by(|a, b| compare_rows(a, b, &sort_keys));
    }

    let mut result = Table::new(
        table.name.clone(),
        positions.iter().map(|&p| table.columns[p].name.clone()),
    );
    result.rows = selected
        .into_iter()
        .map(|row| positions.iter().map(|&p| row[p].clone()).collect())
        .collect();
    Ok(result)
}

fn compare_rows(a: &Row, b: &Row, keys: &[(usize, SortDirection)]) -> Ordering {
    for &(position, direction) in keys {
        let ordering = a[position].sort_cmp(&b[position]);
        let ordering = match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// 对每一行求条件的值；没有条件时所有行都命中
fn matching_rows(rows: &[Row], predicate: Option<&Expression>, index: &ColumnIndex) -> Result<Vec<bool>, DbError> {
    match predicate {
        None => Ok(vec![true; rows.len()]),
        Some(predicate) => {
            validate_expression(predicate, index)?;
            rows.iter()
                .map(|row| evaluate_predicate(predicate, row, index))
                .collect()
        }
    }
}
