pub mod core;
pub mod cli;

pub use crate::core::db::{Database, ErrorDisplayMode, StorageType};
pub use crate::core::error::DbError;
pub use crate::core::sql::{ExecutionResult, OutputFormat, Statement, TableFormatter};
pub use crate::core::storage::StorageOptions;
pub use crate::core::types::{Table, Value};

use std::path::PathBuf;

/// 执行SQL语句的统一接口
///
/// # 参数
/// * `folder` - 存放表文件的目录
/// * `sql_statement` - 要执行的SQL语句
/// * `options` - 表文件的分隔符与扩展名
///
/// # 返回值
/// SELECT 返回表头和数据行（以分隔符连接），INSERT / UPDATE / DELETE 返回空列表
pub fn execute_sql(
    folder: impl Into<PathBuf>,
    sql_statement: &str,
    options: StorageOptions,
) -> Result<Vec<String>, DbError> {
    let delimiter = options.delimiter;
    let mut db = Database::new(StorageType::File(folder.into(), options));

    match db.execute_sql(sql_statement)? {
        ExecutionResult::Select(table) => Ok(TableFormatter::format_csv(&table, delimiter)),
        ExecutionResult::Affected(_) => Ok(Vec::new()),
    }
}
