use clap::ValueEnum;
use serde_json::{Map, Number, Value as JsonValue};
use crate::core::error::DbError;
use crate::core::types::{Table, Value};

/// 查询结果的输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// 表头加数据行，以分隔符连接
    #[default]
    Csv,
    /// 对齐的表格
    Table,
    /// 以列名为键的 JSON 对象数组
    Json,
}

pub struct TableFormatter;

impl TableFormatter {
    /// 按指定格式渲染查询结果，返回输出的各行
    pub fn render(table: &Table, format: OutputFormat, delimiter: char) -> Result<Vec<String>, DbError> {
        match format {
            OutputFormat::Csv => Ok(Self::format_csv(table, delimiter)),
            OutputFormat::Table => Ok(Self::format_table(table).lines().map(str::to_string).collect()),
            OutputFormat::Json => Ok(vec![Self::format_json(table)?]),
        }
    }

    /// 第一行是列名，之后每行一条记录，NULL 输出为空字段
    pub fn format_csv(table: &Table, delimiter: char) -> Vec<String> {
        let separator = delimiter.to_string();
        let mut lines = Vec::with_capacity(table.rows.len() + 1);
        lines.push(table.column_names().join(separator.as_str()));
        for row in &table.rows {
            let cells: Vec<String> = row.iter().map(Value::to_cell).collect();
            lines.push(cells.join(separator.as_str()));
        }
        lines
    }

    /// 以列名为键的 JSON 对象数组。数值（包括能解析为数值的文本）输出为 JSON 数字，
    /// 重复的列名依次加上 `_2`、`_3` 后缀。
    pub fn format_json(table: &Table) -> Result<String, DbError> {
        let keys = Self::json_keys(&table.column_names());
        let records: Vec<JsonValue> = table
            .rows
            .iter()
            .map(|row| {
                let object: Map<String, JsonValue> = keys
                    .iter()
                    .cloned()
                    .zip(row.iter().map(Self::json_value))
                    .collect();
                JsonValue::Object(object)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&records)?)
    }

    fn json_keys(names: &[String]) -> Vec<String> {
        let mut keys: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            let mut key = name.clone();
            let mut suffix = 2;
            while keys.contains(&key) {
                key = format!("{}_{}", name, suffix);
                suffix += 1;
            }
            keys.push(key);
        }
        keys
    }

    fn json_value(value: &Value) -> JsonValue {
        let number = match value {
            Value::Null => return JsonValue::Null,
            Value::Text(text) => match Value::parse_number(text) {
                Some(number) => number,
                None => return JsonValue::String(text.clone()),
            },
            other => other.clone(),
        };
        match number {
            Value::Integer(n) => JsonValue::from(n),
            Value::Float(f) => Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number),
            _ => JsonValue::Null,
        }
    }

    /// 格式化表格输出
    /// 每列宽度取列中最长内容，至少3个字符，左右各留1个空格，内容左对齐
    pub fn format_table(table: &Table) -> String {
        let headers = table.column_names();
        let rows: Vec<Vec<String>> = table
            .rows
            .iter()
            .map(|row| row.iter().map(Value::to_cell).collect())
            .collect();

        let mut max_widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < max_widths.len() {
                    max_widths[i] = max_widths[i].max(cell.chars().count());
                }
            }
        }
        for width in &mut max_widths {
            *width = (*width).max(3);
        }

        let mut result = String::new();
        result.push_str(&Self::format_row(&headers, &max_widths));
        result.push('\n');

        // 分隔线
        let mut separator = String::from("|");
        for width in &max_widths {
            separator.push(' ');
            separator.push_str(&"-".repeat(*width));
            separator.push_str(" |");
        }
        result.push_str(&separator);
        result.push('\n');

        for row in &rows {
            result.push_str(&Self::format_row(row, &max_widths));
            result.push('\n');
        }
        result
    }

    /// 格式化单行数据
    fn format_row(cells: &[String], widths: &[usize]) -> String {
        let mut row_line = String::from("|");
        for (cell, width) in cells.iter().zip(widths) {
            let padding = width - cell.chars().count();
            row_line.push(' ');
            row_line.push_str(cell);
            row_line.push_str(&" ".repeat(padding + 1));
            row_line.push('|');
        }
        row_line
    }
}
