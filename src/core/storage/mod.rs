pub mod file;
pub mod memory;

use crate::core::error::DbError;
use crate::core::types::Table;

/// 表文件的格式配置
#[derive(Debug, Clone, PartialEq)]
pub struct StorageOptions {
    pub delimiter: char,
    pub extension: String,
}

impl Default for StorageOptions {
    fn default() -> Self {
        StorageOptions {
            delimiter: ',',
            extension: "csv".to_string(),
        }
    }
}

/// 表的加载与持久化。整张表是持久化的最小单位。
pub trait Storage {
    /// 读取整张表，表不存在时返回 `TableNotFound`
    fn load(&self, table_name: &str) -> Result<Table, DbError>;

    /// 用给定的表整体替换已持久化的内容
    fn persist(&mut self, table_name: &str, table: &Table) -> Result<(), DbError>;

    fn list_tables(&self) -> Result<Vec<String>, DbError>;
}
