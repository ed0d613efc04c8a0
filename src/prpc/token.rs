//! prpc tokens
//! tokens borrow the line they were scanned from

use std::fmt::{self, Display};

/// Message id of a command header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgId {
    Number(u32),
    /// `*`, no reply is sent
    Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Error,
    Eol,
    Eof,
    Separator,
    Str,
    Int,
    Float,
    Boolean,
    Identifier,
    Command,
}

impl TokenKind {
    /// Name used in error replies.
    pub fn wire_name(&self) -> &'static str {
        match self {
            TokenKind::Error => "TOKEN_ERROR",
            TokenKind::Eol => "TOKEN_EOL",
            TokenKind::Eof => "TOKEN_EOF",
            TokenKind::Separator => "TOKEN_SEPARATOR",
            TokenKind::Str => "TOKEN_STRING",
            TokenKind::Int => "TOKEN_INT",
            TokenKind::Float => "TOKEN_FLOAT",
            TokenKind::Boolean => "TOKEN_BOOLEAN",
            TokenKind::Identifier => "TOKEN_IDENTIFIER",
            TokenKind::Command => "TOKEN_COMMAND",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// One token, `text` is the slice of the line it covers.
///
/// For strings `text` is the raw content between the quotes, escapes still in
/// place, see [`Token::unescaped`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    Error { text: &'a str },
    Eol { text: &'a str },
    Eof,
    Separator { text: &'a str },
    Str { text: &'a str },
    Int { text: &'a str, value: i32 },
    Float { text: &'a str, value: f32 },
    Boolean { text: &'a str, value: bool },
    Identifier { text: &'a str },
    Command { text: &'a str, id: MsgId, name: &'a str },
}

impl<'a> Token<'a> {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Error { .. } => TokenKind::Error,
            Token::Eol { .. } => TokenKind::Eol,
            Token::Eof => TokenKind::Eof,
            Token::Separator { .. } => TokenKind::Separator,
            Token::Str { .. } => TokenKind::Str,
            Token::Int { .. } => TokenKind::Int,
            Token::Float { .. } => TokenKind::Float,
            Token::Boolean { .. } => TokenKind::Boolean,
            Token::Identifier { .. } => TokenKind::Identifier,
            Token::Command { .. } => TokenKind::Command,
        }
    }

    pub fn text(&self) -> &'a str {
        match *self {
            Token::Eof => "",
            Token::Error { text }
            | Token::Eol { text }
            | Token::Separator { text }
            | Token::Str { text }
            | Token::Int { text, .. }
            | Token::Float { text, .. }
            | Token::Boolean { text, .. }
            | Token::Identifier { text }
            | Token::Command { text, .. } => text,
        }
    }

    /// Ends a line: nothing after it belongs to the same request.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Token::Error { .. } | Token::Eol { .. } | Token::Eof)
    }

    /// String content with `["` and `[]` resolved, `None` for other kinds.
    pub fn unescaped(&self) -> Option<String> {
        match self {
            Token::Str { text } => {
                let mut out = String::with_capacity(text.len());
                let mut chars = text.chars().peekable();
                while let Some(c) = chars.next() {
                    match (c, chars.peek()) {
                        ('[', Some(&escaped)) if escaped == '"' || escaped == ']' => {
                            out.push(escaped);
                            chars.next();
                        }
                        _ => out.push(c),
                    }
                }
                Some(out)
            }
            _ => None,
        }
    }
}
