use std::io;
use thiserror::Error;

/// 词法错误：非法字符、未闭合的字符串、格式错误的数字
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("词法错误: 位置 {position} 处的字符串未闭合")]
    UnterminatedString { position: usize },

    #[error("词法错误: 位置 {position} 处的未知字符 '{ch}'")]
    UnexpectedChar { ch: char, position: usize },

    #[error("词法错误: 位置 {position} 处的数字格式错误 '{text}'")]
    MalformedNumber { text: String, position: usize },
}

impl LexError {
    pub fn position(&self) -> usize {
        match self {
            LexError::UnterminatedString { position }
            | LexError::UnexpectedChar { position, .. }
            | LexError::MalformedNumber { position, .. } => *position,
        }
    }
}

/// 语法错误，携带期望内容、实际 token 和位置
#[derive(Error, Debug, Clone, PartialEq)]
#[error("语法错误: 位置 {position} 期望 {expected}, 实际 {found}")]
pub struct SyntaxError {
    pub expected: String,
    pub found: String,
    pub position: usize,
}

impl SyntaxError {
    pub fn new(expected: impl Into<String>, found: impl Into<String>, position: usize) -> Self {
        SyntaxError {
            expected: expected.into(),
            found: found.into(),
            position,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("列 {0} 不存在")]
    UnknownColumn(String),

    #[error("条件表达式不能作为值使用")]
    NotAValue,

    #[error("值表达式不能作为条件使用")]
    NotAPredicate,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("表 {0} 不存在")]
    TableNotFound(String),

    #[error("列数不匹配: 期望 {expected}, 实际 {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("列 {0} 重复出现")]
    DuplicateColumn(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO错误: {0}")]
    IoError(#[from] io::Error),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("{0}")]
    Lex(#[from] LexError),

    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    #[error("{0}")]
    Eval(#[from] EvalError),

    #[error("{0}")]
    Execution(#[from] ExecutionError),
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

impl DbError {
    pub fn table_not_found(name: &str) -> Self {
        ExecutionError::TableNotFound(name.to_string()).into()
    }

    pub fn unknown_column(name: &str) -> Self {
        EvalError::UnknownColumn(name.to_string()).into()
    }

    // 获取详细的错误信息
    pub fn detailed_message(&self) -> String {
        match self {
            DbError::IoError(err) => format!("IO错误: {}", err),
            DbError::Serialization(msg) => format!("序列化错误: {}", msg),
            DbError::Storage(msg) => format!("存储错误: {}", msg),
            DbError::Lex(err) => err.to_string(),
            DbError::Syntax(err) => err.to_string(),
            DbError::Eval(err) => format!("求值错误: {}", err),
            DbError::Execution(err) => format!("执行错误: {}", err),
        }
    }

    // 获取简略的错误信息
    pub fn brief_message(&self) -> String {
        match self {
            DbError::IoError(_) => "Error: IO error".to_string(),
            DbError::Serialization(_) => "Error: Serialization error".to_string(),
            DbError::Storage(_) => "Error: Storage error".to_string(),
            DbError::Lex(_) => "Error: Lexical error".to_string(),
            DbError::Syntax(_) => "Error: Syntax error".to_string(),
            DbError::Eval(EvalError::UnknownColumn(_)) => "Error: Invalid column".to_string(),
            DbError::Eval(_) => "Error: Evaluation error".to_string(),
            DbError::Execution(ExecutionError::TableNotFound(_)) => {
                "Error: Invalid table".to_string()
            }
            DbError::Execution(_) => "Error: Execution error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brief_message_hides_details() {
        let err = DbError::table_not_found("clients");
        assert_eq!(err.brief_message(), "Error: Invalid table");
        assert!(err.detailed_message().contains("clients"));
    }

    #[test]
    fn test_syntax_error_carries_position() {
        let err: DbError = SyntaxError::new("FROM", "WHERE", 9).into();
        assert!(err.to_string().contains('9'));
        assert!(err.to_string().contains("FROM"));
        assert_eq!(err.brief_message(), "Error: Syntax error");
    }
}
