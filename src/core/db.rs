use std::path::PathBuf;
use tracing::debug;
use crate::core::error::DbError;
use crate::core::storage::{Storage, StorageOptions, file::FileStorage, memory::MemoryStorage};
use crate::core::sql::{self, ExecutionResult, SqlParser, Statement};

pub enum StorageType {
    File(PathBuf, StorageOptions),
    Memory,
}

// 错误显示模式
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ErrorDisplayMode {
    #[default]
    Brief,    // 简略错误信息
    Detailed, // 详细错误信息
}

/// 语句执行的调用方：解析、加载表、执行，修改成功后再持久化
pub struct Database {
    storage: Box<dyn Storage>,
    sql_parser: SqlParser,
    error_mode: ErrorDisplayMode,
}

impl Database {
    pub fn new(storage_type: StorageType) -> Self {
        let storage: Box<dyn Storage> = match storage_type {
            StorageType::File(path, options) => Box::new(FileStorage::with_options(path, options)),
            StorageType::Memory => Box::new(MemoryStorage::new()),
        };
        Self::with_storage(storage)
    }

    pub fn with_storage(storage: Box<dyn Storage>) -> Self {
        Database {
            storage,
            sql_parser: SqlParser::new(),
            error_mode: ErrorDisplayMode::default(),
        }
    }

    pub fn set_error_mode(&mut self, mode: ErrorDisplayMode) {
        self.error_mode = mode;
    }

    pub fn error_mode(&self) -> ErrorDisplayMode {
        self.error_mode
    }

    // 根据当前模式格式化错误信息
    pub fn format_error(&self, error: &DbError) -> String {
        match self.error_mode {
            ErrorDisplayMode::Brief => error.brief_message(),
            ErrorDisplayMode::Detailed => error.detailed_message(),
        }
    }

    pub fn execute_sql(&mut self, sql: &str) -> Result<ExecutionResult, DbError> {
        let statement = self.sql_parser.parse(sql)?;
        self.execute_statement(&statement)
    }

    pub fn execute_statement(&mut self, statement: &Statement) -> Result<ExecutionResult, DbError> {
        let table_name = statement.table();
        let mut table = self.storage.load(table_name)?;
        let result = sql::execute(statement, &mut table)?;

        // 只有执行成功的修改语句才写回
        match &result {
            ExecutionResult::Affected(count) => {
                debug!(table = table_name, affected = *count, "语句执行完成");
                self.storage.persist(table_name, &table)?;
            }
            ExecutionResult::Select(selected) => {
                debug!(table = table_name, rows = selected.rows.len(), "查询执行完成");
            }
        }
        Ok(result)
    }

    /// 依次执行以分号分隔的多条语句，遇到第一个错误即停止
    pub fn execute_batch(&mut self, text: &str) -> Result<Vec<ExecutionResult>, DbError> {
        split_statements(text)
            .into_iter()
            .map(|statement| self.execute_sql(&statement))
            .collect()
    }

    pub fn list_tables(&self) -> Result<Vec<String>, DbError> {
        self.storage.list_tables()
    }
}

/// 按分号拆分语句，忽略引号中的分号和 `--` 注释中的分号，丢弃空语句
pub fn split_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut in_comment = false;

    for c in text.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
            }
            current.push(c);
            continue;
        }
        match c {
            '\'' => {
                in_string = !in_string;
                current.push(c);
            }
            '-' if !in_string && current.ends_with('-') => {
                in_comment = true;
                current.push(c);
            }
            ';' if !in_string => {
                statements.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    statements.push(current);

    statements
        .into_iter()
        .filter(|s| !is_blank(s))
        .map(|s| s.trim().to_string())
        .collect()
}

// 只有空白和注释的语句视为空
fn is_blank(statement: &str) -> bool {
    statement
        .lines()
        .map(|line| line.split("--").next().unwrap_or(""))
        .all(|code| code.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ExecutionError;
    use crate::core::storage::memory::MemoryStorage;
    use crate::core::types::{Table, Value};

    fn database() -> Database {
        let mut storage = MemoryStorage::new();
        let mut table = Table::new("t", ["id", "name"]);
        table.insert_row(vec![Value::Integer(1), Value::Text("a".to_string())]).unwrap();
        storage.add_table(table);
        Database::with_storage(Box::new(storage))
    }

    #[test]
    fn test_mutation_is_persisted() {
        let mut db = database();
        assert_eq!(
            db.execute_sql("INSERT INTO t (id, name) VALUES (2, 'b')").unwrap(),
            ExecutionResult::Affected(1)
        );
        match db.execute_sql("SELECT name FROM t ORDER BY id DESC").unwrap() {
            ExecutionResult::Select(result) => assert_eq!(result.rows[0], vec![Value::Text("b".to_string())]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_failed_statement_changes_nothing() {
        let mut db = database();
        assert!(db.execute_sql("UPDATE t SET name = 'z', missing = 1").is_err());
        match db.execute_sql("SELECT * FROM t").unwrap() {
            ExecutionResult::Select(result) => {
                assert_eq!(result.rows, vec![vec![Value::Integer(1), Value::Text("a".to_string())]])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_table() {
        let mut db = database();
        let err = db.execute_sql("DELETE FROM other").unwrap_err();
        assert!(matches!(err, DbError::Execution(ExecutionError::TableNotFound(_))));
        assert_eq!(db.format_error(&err), "Error: Invalid table");
        db.set_error_mode(ErrorDisplayMode::Detailed);
        assert!(db.format_error(&err).contains("other"));
    }

    #[test]
    fn test_execute_batch_stops_at_first_error() {
        let mut db = database();
        let results = db.execute_batch("DELETE FROM t WHERE id = 1; SELECT * FROM t;");
        assert_eq!(results.unwrap().len(), 2);

        let err = db
            .execute_batch("INSERT INTO t VALUES (5, 'e'); SELEC * FROM t; INSERT INTO t VALUES (6, 'f')")
            .unwrap_err();
        assert!(matches!(err, DbError::Syntax(_)));
        assert_eq!(db.storage.load("t").unwrap().rows.len(), 1);
    }

    #[test]
    fn test_split_statements() {
        let parts = split_statements("SELECT * FROM t WHERE a = 'x;y'; -- note; here\nDELETE FROM t;;  ");
        assert_eq!(parts, vec!["SELECT * FROM t WHERE a = 'x;y'", "-- note; here\nDELETE FROM t"]);
        assert!(split_statements("  ; -- only a comment").is_empty());
    }
}
