//! typed argument reader for command handlers

use std::error::Error;
use std::fmt::{self, Display};
use super::lex::Lexer;
use super::token::{Token, TokenKind};

/// Why an argument could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgError {
    /// `idx` counts arguments from 0
    UnexpectedToken { idx: usize, expected: TokenKind, got: TokenKind },
    Unknown,
}

impl Display for ArgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgError::UnexpectedToken { idx, expected, got } => {
                write!(f, "Unexcepted token for arg {} : Excepted {}, got {}", idx, expected, got)
            }
            ArgError::Unknown => write!(f, "Unexcepted error"),
        }
    }
}

impl Error for ArgError {}

/// Pulls the arguments that follow a command header.
///
/// Each argument is one separator followed by one token of the asked kind.
pub struct ArgReader<'l, 'a> {
    lexer: &'l mut Lexer<'a>,
    idx: usize,
    ended: bool,
}

impl<'l, 'a> ArgReader<'l, 'a> {
    pub fn new(lexer: &'l mut Lexer<'a>) -> Self {
        ArgReader { lexer, idx: 0, ended: false }
    }

    /// True once a line terminator was consumed while looking for an argument.
    pub fn ended(&self) -> bool {
        self.ended
    }

    fn pull(&mut self, expected: TokenKind) -> Result<Token<'a>, ArgError> {
        let token = self.lexer.next_token();
        if token.is_terminal() {
            self.ended = true;
        }
        if token.kind() != expected {
            return Err(ArgError::UnexpectedToken { idx: self.idx, expected, got: token.kind() });
        }
        Ok(token)
    }

    pub fn expect(&mut self, kind: TokenKind) -> Result<Token<'a>, ArgError> {
        match kind {
            TokenKind::Str
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Boolean
            | TokenKind::Identifier => {}
            _ => return Err(ArgError::Unknown),
        }
        self.pull(TokenKind::Separator)?;
        let token = self.pull(kind)?;
        self.idx += 1;
        Ok(token)
    }

    pub fn int(&mut self) -> Result<i32, ArgError> {
        match self.expect(TokenKind::Int)? {
            Token::Int { value, .. } => Ok(value),
            _ => Err(ArgError::Unknown),
        }
    }

    pub fn float(&mut self) -> Result<f32, ArgError> {
        match self.expect(TokenKind::Float)? {
            Token::Float { value, .. } => Ok(value),
            _ => Err(ArgError::Unknown),
        }
    }

    pub fn boolean(&mut self) -> Result<bool, ArgError> {
        match self.expect(TokenKind::Boolean)? {
            Token::Boolean { value, .. } => Ok(value),
            _ => Err(ArgError::Unknown),
        }
    }

    pub fn identifier(&mut self) -> Result<&'a str, ArgError> {
        Ok(self.expect(TokenKind::Identifier)?.text())
    }

    pub fn string(&mut self) -> Result<String, ArgError> {
        self.expect(TokenKind::Str)?.unescaped().ok_or(ArgError::Unknown)
    }
}
