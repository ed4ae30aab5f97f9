use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;
use crate::core::error::{DbError, LexError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    From,
    Where,
    Order,
    By,
    Asc,
    Desc,
    And,
    Or,
    Not,
    Is,
    Null,
}

impl Keyword {
    /// 关键字匹配不区分大小写
    pub fn from_word(word: &str) -> Option<Keyword> {
        let keyword = match word.to_uppercase().as_str() {
            "SELECT" => Keyword::Select,
            "INSERT" => Keyword::Insert,
            "INTO" => Keyword::Into,
            "VALUES" => Keyword::Values,
            "UPDATE" => Keyword::Update,
            "SET" => Keyword::Set,
            "DELETE" => Keyword::Delete,
            "FROM" => Keyword::From,
            "WHERE" => Keyword::Where,
            "ORDER" => Keyword::Order,
            "BY" => Keyword::By,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "IS" => Keyword::Is,
            "NULL" => Keyword::Null,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::Insert => "INSERT",
            Keyword::Into => "INTO",
            Keyword::Values => "VALUES",
            Keyword::Update => "UPDATE",
            Keyword::Set => "SET",
            Keyword::Delete => "DELETE",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Order => "ORDER",
            Keyword::By => "BY",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
        }
    }
}

/// 比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq, // =
    Ne, // <> 或 !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punctuation {
    LParen,
    RParen,
    Comma,
    Asterisk,
    Semicolon,
}

impl Punctuation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Punctuation::LParen => "(",
            Punctuation::RParen => ")",
            Punctuation::Comma => ",",
            Punctuation::Asterisk => "*",
            Punctuation::Semicolon => ";",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    Number(String),
    String(String),
    Operator(Operator),
    Punctuation(Punctuation),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(kw) => write!(f, "{}", kw.as_str()),
            TokenKind::Identifier(name) => write!(f, "{}", name),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "'{}'", s),
            TokenKind::Operator(op) => write!(f, "{}", op.as_str()),
            TokenKind::Punctuation(p) => write!(f, "{}", p.as_str()),
            TokenKind::Eof => write!(f, "语句结尾"),
        }
    }
}

/// 词法单元，`position` 是它在语句文本中的字节偏移
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize) -> Self {
        Token { kind, position }
    }
}

/// 对一条语句做一次从头开始的扫描，产出以 `Eof` 结尾的 token 序列
pub fn tokenize(input: &str) -> Result<Vec<Token>, DbError> {
    Lexer::new(input).collect()
}

/// 惰性的词法分析器，每次迭代产出一个 token，`Eof` 之后结束
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().peekable(),
            finished: false,
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    // 当前位置之后第二个字符
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next().map(|(_, c)| c)
    }

    fn next_if(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('-') if self.peek_second() == Some('-') => {
                    while let Some((_, c)) = self.chars.next() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }

    fn read_word(&mut self, start: usize) -> TokenKind {
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.chars.next();
            } else {
                break;
            }
        }
        let word = &self.input[start..self.offset()];
        match Keyword::from_word(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(word.to_string()),
        }
    }

    fn read_number(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut seen_dot = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.chars.next();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.chars.next();
                if !self.peek_char().map_or(false, |d| d.is_ascii_digit()) {
                    return Err(self.malformed_number(start));
                }
            } else if c.is_alphanumeric() || c == '_' || c == '.' {
                return Err(self.malformed_number(start));
            } else {
                break;
            }
        }
        Ok(TokenKind::Number(self.input[start..self.offset()].to_string()))
    }

    fn malformed_number(&mut self, start: usize) -> LexError {
        // 吞掉剩余的数字/字母，让错误信息包含完整的非法字面量
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.chars.next();
            } else {
                break;
            }
        }
        LexError::MalformedNumber {
            text: self.input[start..self.offset()].to_string(),
            position: start,
        }
    }

    fn read_string(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\'')) => {
                    // '' 表示字符串中的单引号
                    if self.next_if('\'') {
                        value.push('\'');
                    } else {
                        return Ok(TokenKind::String(value));
                    }
                }
                Some((_, c)) => value.push(c),
                None => return Err(LexError::UnterminatedString { position: start }),
            }
        }
    }

    fn scan(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();

        let (start, c) = match self.chars.next() {
            Some(pair) => pair,
            None => return Ok(Token::new(TokenKind::Eof, self.input.len())),
        };

        let kind = match c {
            c if c.is_alphabetic() || c == '_' => self.read_word(start),
            c if c.is_ascii_digit() => self.read_number(start)?,
            '-' if self.peek_char().map_or(false, |d| d.is_ascii_digit()) => {
                self.read_number(start)?
            }
            '\'' => self.read_string(start)?,
            '=' => TokenKind::Operator(Operator::Eq),
            '<' if self.next_if('=') => TokenKind::Operator(Operator::Le),
            '<' if self.next_if('>') => TokenKind::Operator(Operator::Ne),
            '<' => TokenKind::Operator(Operator::Lt),
            '>' if self.next_if('=') => TokenKind::Operator(Operator::Ge),
            '>' => TokenKind::Operator(Operator::Gt),
            '!' if self.next_if('=') => TokenKind::Operator(Operator::Ne),
            '(' => TokenKind::Punctuation(Punctuation::LParen),
            ')' => TokenKind::Punctuation(Punctuation::RParen),
            ',' => TokenKind::Punctuation(Punctuation::Comma),
            '*' => TokenKind::Punctuation(Punctuation::Asterisk),
            ';' => TokenKind::Punctuation(Punctuation::Semicolon),
            other => return Err(LexError::UnexpectedChar { ch: other, position: start }),
        };
        Ok(Token::new(kind, start))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, DbError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.scan();
        // 出错或到达 Eof 后不再产出
        if matches!(&result, Err(_) | Ok(Token { kind: TokenKind::Eof, .. })) {
            self.finished = true;
        }
        Some(result.map_err(DbError::from))
    }
}
