use crate::core::error::{DbError, SyntaxError};
use crate::core::types::Value;
use super::lexer::{Keyword, Punctuation, Token, TokenKind};
use super::{Assignment, Expression, LogicalOperator, OrderBy, Projection, SortDirection, Statement};

/// 把 token 序列解析为一条语句
pub fn parse(tokens: Vec<Token>) -> Result<Statement, DbError> {
    Parser::new(tokens).parse()
}

/// 递归下降解析器。WHERE 条件的优先级从低到高依次为 OR、AND、NOT、比较、基本表达式。
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // 保证序列以 Eof 结尾，peek 永远有值
        if !matches!(tokens.last(), Some(Token { kind: TokenKind::Eof, .. })) {
            let end = tokens.last().map_or(0, |t| t.position + t.kind.to_string().len());
            tokens.push(Token::new(TokenKind::Eof, end));
        }
        Parser { tokens, position: 0 }
    }

    pub fn parse(&mut self) -> Result<Statement, DbError> {
        let statement = match self.peek().kind {
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert()?,
            TokenKind::Keyword(Keyword::Update) => self.parse_update()?,
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete()?,
            TokenKind::Keyword(Keyword::Select) => self.parse_select()?,
            _ => return Err(self.error("SELECT、INSERT、UPDATE 或 DELETE")),
        };

        // 允许一个结尾分号
        self.next_if_punct(Punctuation::Semicolon);
        if self.peek().kind != TokenKind::Eof {
            return Err(self.error("语句结尾"));
        }
        Ok(statement)
    }

    fn parse_insert(&mut self) -> Result<Statement, DbError> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.next_identifier("表名")?;

        let columns = if self.next_if_punct(Punctuation::LParen) {
            let columns = self.parse_identifier_list("列名")?;
            self.expect_punct(Punctuation::RParen)?;
            Some(columns)
        } else {
            None
        };

        self.expect_keyword(Keyword::Values)?;
        let values_position = self.peek().position;
        self.expect_punct(Punctuation::LParen)?;
        let mut values = vec![self.parse_value()?];
        while self.next_if_punct(Punctuation::Comma) {
            values.push(self.parse_value()?);
        }
        self.expect_punct(Punctuation::RParen)?;

        if let Some(columns) = &columns {
            if columns.len() != values.len() {
                return Err(SyntaxError::new(
                    format!("{} 个值", columns.len()),
                    format!("{} 个值", values.len()),
                    values_position,
                )
                .into());
            }
        }

        Ok(Statement::Insert { table, columns, values })
    }

    fn parse_value(&mut self) -> Result<Value, DbError> {
        let token = self.peek().clone();
        let value = match &token.kind {
            TokenKind::Number(text) => Value::parse_number(text)
                .ok_or_else(|| SyntaxError::new("数值", text.as_str(), token.position))?,
            TokenKind::String(s) => Value::Text(s.clone()),
            TokenKind::Keyword(Keyword::Null) => Value::Null,
            _ => return Err(self.error("值")),
        };
        self.next();
        Ok(value)
    }

    fn parse_update(&mut self) -> Result<Statement, DbError> {
        self.expect_keyword(Keyword::Update)?;
        let table = self.next_identifier("表名")?;
        self.expect_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.next_identifier("列名")?;
            self.expect_operator_eq()?;
            let value = self.parse_operand()?;
            assignments.push(Assignment { column, value });

            if !self.next_if_punct(Punctuation::Comma) {
                break;
            }
        }

        let predicate = self.parse_where()?;
        Ok(Statement::Update { table, assignments, predicate })
    }

    fn parse_delete(&mut self) -> Result<Statement, DbError> {
        self.expect_keyword(Keyword::Delete)?;
        self.expect_keyword(Keyword::From)?;
        let table = self.next_identifier("表名")?;
        let predicate = self.parse_where()?;
        Ok(Statement::Delete { table, predicate })
    }

    fn parse_select(&mut self) -> Result<Statement, DbError> {
        self.expect_keyword(Keyword::Select)?;

        let projection = if self.next_if_punct(Punctuation::Asterisk) {
            Projection::All
        } else {
            Projection::Columns(self.parse_identifier_list("列名或 *")?)
        };

        self.expect_keyword(Keyword::From)?;
        let table = self.next_identifier("表名")?;
        let predicate = self.parse_where()?;
        let order_by = self.parse_order_by()?;

        Ok(Statement::Select { table, projection, predicate, order_by })
    }

    fn parse_identifier_list(&mut self, what: &str) -> Result<Vec<String>, DbError> {
        let mut names = vec![self.next_identifier(what)?];
        while self.next_if_punct(Punctuation::Comma) {
            names.push(self.next_identifier("列名")?);
        }
        Ok(names)
    }

    fn parse_order_by(&mut self) -> Result<Vec<OrderBy>, DbError> {
        if !self.next_if_keyword(Keyword::Order) {
            return Ok(Vec::new());
        }
        self.expect_keyword(Keyword::By)?;

        let mut keys = Vec::new();
        loop {
            let column = self.next_identifier("排序列名")?;
            let direction = if self.next_if_keyword(Keyword::Desc) {
                SortDirection::Desc
            } else {
                self.next_if_keyword(Keyword::Asc);
                SortDirection::Asc
            };
            keys.push(OrderBy { column, direction });

            if !self.next_if_punct(Punctuation::Comma) {
                break;
            }
        }
        Ok(keys)
    }

    fn parse_where(&mut self) -> Result<Option<Expression>, DbError> {
        if !self.next_if_keyword(Keyword::Where) {
            return Ok(None);
        }
        let position = self.peek().position;
        let predicate = self.parse_or()?;
        Self::require_predicate(&predicate, position)?;
        Ok(Some(predicate))
    }

    fn parse_or(&mut self) -> Result<Expression, DbError> {
        let position = self.peek().position;
        let mut left = self.parse_and()?;
        while self.next_if_keyword(Keyword::Or) {
            Self::require_predicate(&left, position)?;
            let right_position = self.peek().position;
            let right = self.parse_and()?;
            Self::require_predicate(&right, right_position)?;
            left = Expression::logical(LogicalOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, DbError> {
        let position = self.peek().position;
        let mut left = self.parse_not()?;
        while self.next_if_keyword(Keyword::And) {
            Self::require_predicate(&left, position)?;
            let right_position = self.peek().position;
            let right = self.parse_not()?;
            Self::require_predicate(&right, right_position)?;
            left = Expression::logical(LogicalOperator::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expression, DbError> {
        if self.next_if_keyword(Keyword::Not) {
            let position = self.peek().position;
            let inner = self.parse_not()?;
            Self::require_predicate(&inner, position)?;
            return Ok(Expression::not(inner));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, DbError> {
        let position = self.peek().position;
        let left = self.parse_primary()?;

        match self.peek().kind {
            TokenKind::Keyword(Keyword::Is) => {
                self.next();
                Self::require_value(&left, position)?;
                let negated = self.next_if_keyword(Keyword::Not);
                self.expect_keyword(Keyword::Null)?;
                Ok(Expression::IsNull { expr: Box::new(left), negated })
            }
            TokenKind::Operator(operator) => {
                self.next();
                Self::require_value(&left, position)?;
                let right = self.parse_operand()?;
                Ok(Expression::comparison(operator, left, right))
            }
            _ => Ok(left),
        }
    }

    /// 值表达式：字面量、列引用或括号中的值
    fn parse_operand(&mut self) -> Result<Expression, DbError> {
        let position = self.peek().position;
        let operand = self.parse_primary()?;
        Self::require_value(&operand, position)?;
        Ok(operand)
    }

    fn parse_primary(&mut self) -> Result<Expression, DbError> {
        match &self.peek().kind {
            TokenKind::Number(_) | TokenKind::String(_) | TokenKind::Keyword(Keyword::Null) => {
                Ok(Expression::Literal(self.parse_value()?))
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.next();
                Ok(Expression::Column(name))
            }
            TokenKind::Punctuation(Punctuation::LParen) => {
                self.next();
                let expr = self.parse_or()?;
                self.expect_punct(Punctuation::RParen)?;
                Ok(expr)
            }
            _ => Err(self.error("表达式")),
        }
    }

    fn require_predicate(expr: &Expression, position: usize) -> Result<(), DbError> {
        if expr.is_predicate() {
            Ok(())
        } else {
            Err(SyntaxError::new("条件表达式", Self::describe(expr), position).into())
        }
    }

    fn require_value(expr: &Expression, position: usize) -> Result<(), DbError> {
        if expr.is_predicate() {
            Err(SyntaxError::new("值或列名", Self::describe(expr), position).into())
        } else {
            Ok(())
        }
    }

    fn describe(expr: &Expression) -> String {
        match expr {
            Expression::Literal(value) => value.to_string(),
            Expression::Column(name) => name.clone(),
            _ => "条件表达式".to_string(),
        }
    }

    fn error(&self, expected: &str) -> DbError {
        let token = self.peek();
        SyntaxError::new(expected, token.kind.to_string(), token.position).into()
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), DbError> {
        if self.next_if_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(keyword.as_str()))
        }
    }

    fn expect_punct(&mut self, punct: Punctuation) -> Result<(), DbError> {
        if self.next_if_punct(punct) {
            Ok(())
        } else {
            Err(self.error(punct.as_str()))
        }
    }

    fn expect_operator_eq(&mut self) -> Result<(), DbError> {
        match self.peek().kind {
            TokenKind::Operator(super::Operator::Eq) => {
                self.next();
                Ok(())
            }
            _ => Err(self.error("=")),
        }
    }

    fn next_identifier(&mut self, what: &str) -> Result<String, DbError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.next();
                Ok(name)
            }
            _ => Err(self.error(what)),
        }
    }

    fn next_if_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek().kind == TokenKind::Keyword(keyword) {
            self.next();
            true
        } else {
            false
        }
    }

    fn next_if_punct(&mut self, punct: Punctuation) -> bool {
        if self.peek().kind == TokenKind::Punctuation(punct) {
            self.next();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> &Token {
        // new() 保证至少有一个 Eof
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }
}
