use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;
use crate::core::error::DbError;
use crate::core::types::{Table, Value};
use super::{Storage, StorageOptions};

/// 以分隔符文本文件保存表：每张表一个文件，第一行是列名，其余每行一条记录
pub struct FileStorage {
    base_dir: PathBuf,
    options: StorageOptions,
}

impl FileStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self::with_options(base_dir, StorageOptions::default())
    }

    pub fn with_options(base_dir: impl Into<PathBuf>, options: StorageOptions) -> Self {
        FileStorage {
            base_dir: base_dir.into(),
            options,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn options(&self) -> &StorageOptions {
        &self.options
    }

    // 获取表文件路径，表名不能跳出数据目录
    fn table_path(&self, table_name: &str) -> Result<PathBuf, DbError> {
        let invalid = table_name.is_empty()
            || table_name.contains(['/', '\\'])
            || table_name == "."
            || table_name == "..";
        if invalid {
            return Err(DbError::table_not_found(table_name));
        }
        Ok(self.base_dir.join(format!("{}.{}", table_name, self.options.extension)))
    }

    fn parse_table(&self, table_name: &str, content: &str) -> Result<Table, DbError> {
        let delimiter = self.options.delimiter;
        let mut lines = content.lines();
        let header = lines
            .next()
            .ok_or_else(|| DbError::Storage(format!("表 {} 的文件为空", table_name)))?;

        let mut table = Table::new(table_name, header.split(delimiter));
        for (line_number, line) in lines.enumerate() {
            let row: Vec<Value> = line.split(delimiter).map(Value::from_cell).collect();
            if row.len() != table.columns.len() {
                // 行号从 1 开始，表头是第 1 行
                return Err(DbError::Storage(format!(
                    "表 {} 第 {} 行有 {} 个字段, 期望 {} 个",
                    table_name,
                    line_number + 2,
                    row.len(),
                    table.columns.len()
                )));
            }
            table.rows.push(row);
        }
        Ok(table)
    }

    fn encode_cell(&self, table_name: &str, cell: String) -> Result<String, DbError> {
        if cell.contains(self.options.delimiter) || cell.contains(['\n', '\r']) {
            return Err(DbError::Storage(format!(
                "表 {} 中的值 {:?} 包含分隔符或换行，无法写入",
                table_name, cell
            )));
        }
        Ok(cell)
    }

    fn encode_table(&self, table_name: &str, table: &Table) -> Result<String, DbError> {
        let separator = self.options.delimiter.to_string();
        let header = table
            .column_names()
            .into_iter()
            .map(|name| self.encode_cell(table_name, name))
            .collect::<Result<Vec<_>, _>>()?;

        let mut content = header.join(separator.as_str());
        content.push('\n');
        for row in &table.rows {
            let cells = row
                .iter()
                .map(|value| self.encode_cell(table_name, value.to_cell()))
                .collect::<Result<Vec<_>, _>>()?;
            content.push_str(&cells.join(separator.as_str()));
            content.push('\n');
        }
        Ok(content)
    }
}

impl Storage for FileStorage {
    fn load(&self, table_name: &str) -> Result<Table, DbError> {
        let path = self.table_path(table_name)?;
        if !path.is_file() {
            return Err(DbError::table_not_found(table_name));
        }

        let content = fs::read_to_string(&path)?;
        let table = self.parse_table(table_name, &content)?;
        debug!(table = table_name, rows = table.rows.len(), path = %path.display(), "加载表");
        Ok(table)
    }

    fn persist(&mut self, table_name: &str, table: &Table) -> Result<(), DbError> {
        let path = self.table_path(table_name)?;
        let content = self.encode_table(table_name, table)?;

        // 先写入同目录下的临时文件，再原子地替换原文件
        let mut temp = NamedTempFile::new_in(&self.base_dir)?;
        temp.write_all(content.as_bytes())?;
        temp.flush()?;
        temp.persist(&path).map_err(|e| DbError::IoError(e.error))?;

        debug!(table = table_name, rows = table.rows.len(), path = %path.display(), "持久化表");
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let path = entry?.path();
            let matches_extension = path
                .extension()
                .map_or(false, |ext| ext == self.options.extension.as_str());
            if path.is_file() && matches_extension {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
