mod lexer;
mod parser;
mod evaluator;
mod executor;
mod formatter;

pub use lexer::{tokenize, Keyword, Lexer, Operator, Punctuation, Token, TokenKind};
pub use parser::{parse, Parser};
pub use evaluator::{evaluate, evaluate_predicate, validate_expression};
pub use executor::{execute, ExecutionResult};
pub use formatter::{OutputFormat, TableFormatter};

use crate::core::error::DbError;
use crate::core::types::Value;

// SQL语句类型
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert {
        table: String,
        // None 表示按表中列的顺序给出全部值
        columns: Option<Vec<String>>,
        values: Vec<Value>,
    },
    Update {
        table: String,
        assignments: Vec<Assignment>,
        predicate: Option<Expression>,
    },
    Delete {
        table: String,
        predicate: Option<Expression>,
    },
    Select {
        table: String,
        projection: Projection,
        predicate: Option<Expression>,
        order_by: Vec<OrderBy>,
    },
}

impl Statement {
    /// 语句操作的表名
    pub fn table(&self) -> &str {
        match self {
            Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. }
            | Statement::Select { table, .. } => table,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// 表达式树，子节点独占所有权
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Column(String),
    Not(Box<Expression>),
    Comparison {
        operator: Operator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        operator: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    IsNull {
        expr: Box<Expression>,
        negated: bool,
    },
}

impl Expression {
    pub fn column(name: &str) -> Self {
        Expression::Column(name.to_string())
    }

    pub fn literal(value: Value) -> Self {
        Expression::Literal(value)
    }

    pub fn comparison(operator: Operator, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn logical(operator: LogicalOperator, left: Expression, right: Expression) -> Self {
        Expression::Logical {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(expr: Expression) -> Self {
        Expression::Not(Box::new(expr))
    }

    /// 结果为布尔值的表达式（可作为 WHERE 条件）
    pub fn is_predicate(&self) -> bool {
        !matches!(self, Expression::Literal(_) | Expression::Column(_))
    }

    /// 引用到的所有列名
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_columns(&mut names);
        names
    }

    fn collect_columns<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Literal(_) => {}
            Expression::Column(name) => names.push(name),
            Expression::Not(expr) | Expression::IsNull { expr, .. } => expr.collect_columns(names),
            Expression::Comparison { left, right, .. } | Expression::Logical { left, right, .. } => {
                left.collect_columns(names);
                right.collect_columns(names);
            }
        }
    }
}

// SQL解析器：词法分析 + 语法分析
#[derive(Debug, Default)]
pub struct SqlParser;

impl SqlParser {
    pub fn new() -> Self {
        SqlParser
    }

    pub fn parse(&self, sql: &str) -> Result<Statement, DbError> {
        let tokens = tokenize(sql)?;
        parse(tokens)
    }
}
