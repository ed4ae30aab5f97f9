use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use crate::core::error::{DbError, ExecutionError};

/// 单元格的值。表文件中读出的值一律为 `Text`，数值类型在比较时才解析。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

/// 比较时解析出的数值
#[derive(Debug, Clone, Copy, PartialEq)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(n) => n as f64,
            Numeric::Float(f) => f,
        }
    }

    fn compare(self, other: Numeric) -> Option<Ordering> {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => Some(a.cmp(&b)),
            (Numeric::Int(a), Numeric::Float(b)) => int_float_cmp(a, b),
            (Numeric::Float(a), Numeric::Int(b)) => int_float_cmp(b, a).map(Ordering::reverse),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

// 整数与整值浮点数按 i128 精确比较，避免大整数转成 f64 后丢失精度
fn int_float_cmp(a: i64, b: f64) -> Option<Ordering> {
    if b.fract() == 0.0 && b.abs() < 1e38 {
        Some(i128::from(a).cmp(&(b as i128)))
    } else {
        (a as f64).partial_cmp(&b)
    }
}

/// 判断文本是否符合数字字面量的格式：可选负号、数字、可选的一个小数点加数字
pub fn is_numeric_literal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(int_part) && frac_part.map_or(true, all_digits)
}

impl Value {
    /// 按数字字面量的规则解析文本：含小数点为 Float，否则为 Integer。
    /// 超出 i64 范围的整数按 Float 解析。
    pub fn parse_number(text: &str) -> Option<Value> {
        if !is_numeric_literal(text) {
            return None;
        }
        if !text.contains('.') {
            if let Ok(n) = text.parse::<i64>() {
                return Some(Value::Integer(n));
            }
        }
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float)
    }

    /// 从表文件中的字段构造值，空字段即 NULL
    pub fn from_cell(cell: &str) -> Value {
        if cell.is_empty() {
            Value::Null
        } else {
            Value::Text(cell.to_string())
        }
    }

    /// 写回表文件时的字段文本
    pub fn to_cell(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Value::Integer(n) => Some(Numeric::Int(*n)),
            Value::Float(f) => Some(Numeric::Float(*f)),
            Value::Text(s) => match Value::parse_number(s) {
                Some(Value::Integer(n)) => Some(Numeric::Int(n)),
                Some(Value::Float(f)) => Some(Numeric::Float(f)),
                _ => None,
            },
            Value::Null => None,
        }
    }

    /// 比较两个值。
    ///
    /// 两边都能解析为数值时按数值比较（混合时整数提升为浮点数）；两边都是文本时按字典序比较；
    /// 涉及 NULL 或类型无法对齐时返回 `None`，调用方把它当作“不满足”。
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return a.compare(b);
        }
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// ORDER BY 使用的全序：先按类别排（NULL、数值、非数值文本），同类之间再按 `compare`
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        self.sort_rank()
            .cmp(&other.sort_rank())
            .then_with(|| self.compare(other).unwrap_or(Ordering::Equal))
    }

    fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            _ if self.numeric().is_some() => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            // 总是保留小数点，重新读入时仍是 Float
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{}.0", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
            Value::Null => write!(f, "NULL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub index: usize,
}

pub type Row = Vec<Value>;

/// 列名到位置的映射，列名匹配不区分大小写
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new(columns: &[Column]) -> Self {
        let positions = columns
            .iter()
            .map(|col| (col.name.to_lowercase(), col.index))
            .collect();
        ColumnIndex { positions }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(&name.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Result<usize, DbError> {
        self.get(name).ok_or_else(|| DbError::unknown_column(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new<S: Into<String>>(name: impl Into<String>, column_names: impl IntoIterator<Item = S>) -> Self {
        let columns = column_names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Column { name: name.into(), index })
            .collect();
        Table {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self) -> ColumnIndex {
        ColumnIndex::new(&self.columns)
    }

    pub fn validate_row(&self, row: &[Value]) -> Result<(), DbError> {
        if row.len() != self.columns.len() {
            return Err(ExecutionError::ColumnCountMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            }
            .into());
        }
        Ok(())
    }

    pub fn insert_row(&mut self, row: Row) -> Result<(), DbError> {
        self.validate_row(&row)?;
        self.rows.push(row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_comparison_promotes_integers() {
        assert_eq!(Value::Integer(10).compare(&Value::Float(6.5)), Some(Ordering::Greater));
        assert_eq!(Value::Float(2.0).compare(&Value::Integer(2)), Some(Ordering::Equal));
        assert_eq!(Value::Text("10.0".into()).compare(&Value::Integer(6)), Some(Ordering::Greater));
    }

    #[test]
    fn test_text_comparison_is_case_sensitive() {
        let lower = Value::Text("apple".into());
        let upper = Value::Text("Apple".into());
        assert_eq!(lower.compare(&upper), Some(Ordering::Greater));
        assert_eq!(upper.compare(&Value::Text("Apple".into())), Some(Ordering::Equal));
    }

    #[test]
    fn test_numeric_looking_text_compares_numerically() {
        let ten = Value::Text("10".into());
        let nine = Value::Text("9".into());
        assert_eq!(ten.compare(&nine), Some(Ordering::Greater));
    }

    #[test]
    fn test_null_and_mismatched_are_unordered() {
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert_eq!(Value::Null.compare(&Value::Integer(1)), None);
        assert_eq!(Value::Text("abc".into()).compare(&Value::Integer(1)), None);
    }

    #[test]
    fn test_sort_cmp_is_total() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Integer(3),
            Value::Null,
            Value::Float(1.5),
            Value::Text("a".into()),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Float(1.5),
                Value::Integer(3),
                Value::Text("a".into()),
                Value::Text("b".into()),
            ]
        );
    }

    #[test]
    fn test_sort_cmp_mixed_text_cells_is_deterministic() {
        let cells = ["9", "10", "1a", "", "-2.5", "b"];
        let expected: Vec<Value> = ["", "-2.5", "9", "10", "1a", "b"]
            .into_iter()
            .map(Value::from_cell)
            .collect();
        // 同一组值，不同的初始顺序
        for shift in 0..cells.len() {
            let mut values: Vec<Value> = cells
                .iter()
                .cycle()
                .skip(shift)
                .take(cells.len())
                .map(|cell| Value::from_cell(cell))
                .collect();
            values.sort_by(|a, b| a.sort_cmp(b));
            assert_eq!(values, expected);
            values.reverse();
            values.sort_by(|a, b| a.sort_cmp(b));
            assert_eq!(values, expected);
        }
    }

    #[test]
    fn test_sort_cmp_is_transitive_on_numeric_text() {
        let nine = Value::from_cell("9");
        let ten = Value::from_cell("10");
        let mixed = Value::from_cell("1a");
        assert_eq!(nine.sort_cmp(&ten), Ordering::Less);
        assert_eq!(ten.sort_cmp(&mixed), Ordering::Less);
        assert_eq!(nine.sort_cmp(&mixed), Ordering::Less);
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        let big = Value::Integer(9_007_199_254_740_993);
        let float = Value::Float(9_007_199_254_740_992.0);
        assert_eq!(big.compare(&float), Some(Ordering::Greater));
        assert_eq!(float.compare(&big), Some(Ordering::Less));
    }

    #[test]
    fn test_large_numbers_stay_numeric() {
        assert_eq!(
            Value::parse_number("100000000000000000000"),
            Some(Value::Float(1e20))
        );
        assert_eq!(Value::Float(1e20).to_cell(), "100000000000000000000.0");
        let cell = Value::from_cell(&Value::Float(1e20).to_cell());
        assert_eq!(cell.compare(&Value::Integer(5)), Some(Ordering::Greater));
        assert_eq!(
            Value::from_cell("99999999999999999999").compare(&Value::Integer(5)),
            Some(Ordering::Greater)
        );
        let huge = format!("{}.0", "9".repeat(400));
        assert_eq!(Value::parse_number(&huge), None);
    }

    #[test]
    fn test_cells_round_trip() {
        assert_eq!(Value::from_cell(""), Value::Null);
        assert_eq!(Value::from_cell("10.0").to_cell(), "10.0");
        assert_eq!(Value::Float(10.0).to_cell(), "10.0");
        assert_eq!(Value::Null.to_cell(), "");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(Value::parse_number("42"), Some(Value::Integer(42)));
        assert_eq!(Value::parse_number("-3.5"), Some(Value::Float(-3.5)));
        assert_eq!(Value::parse_number("1.2.3"), None);
        assert_eq!(Value::parse_number("1e5"), None);
        assert_eq!(Value::parse_number("."), None);
    }

    #[test]
    fn test_insert_row_checks_width() {
        let mut table = Table::new("t", ["id", "name"]);
        assert!(table.insert_row(vec![Value::Integer(1)]).is_err());
        assert!(table.insert_row(vec![Value::Integer(1), Value::Null]).is_ok());
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_column_lookup_ignores_case() {
        let table = Table::new("t", ["Id", "Name"]);
        let index = table.column_index();
        assert_eq!(index.get("ID"), Some(0));
        assert_eq!(index.get("name"), Some(1));
        assert!(index.resolve("age").is_err());
    }
}
