//! prpc reply builder
//!
//! Replies are `<id>:<word>[ <arg>]*`. Everything is written into a caller
//! buffer: output that does not fit is cut, and the content is always
//! followed by a NUL as long as the buffer is not empty.

use std::fmt::{self, Write};
use super::parse::ArgError;

/// Typed reply argument.
///
/// `Str` is written with `"` as `["` and `]` as `[]`. Trailing `[`
/// characters cannot be carried and are left out.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Identifier(String),
    Str(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Identifier(name) => f.write_str(name),
            Arg::Str(text) => {
                // the wire has no escape for `[` itself, a trailing one would
                // read as `["` and leave the string open, so it is dropped
                f.write_char('"')?;
                for c in text.trim_end_matches('[').chars() {
                    match c {
                        '"' => f.write_str("[\"")?,
                        ']' => f.write_str("[]")?,
                        _ => f.write_char(c)?,
                    }
                }
                f.write_char('"')
            }
            Arg::Int(value) => write!(f, "{}", value),
            Arg::Float(value) => write!(f, "{:.6}", value),
            Arg::Boolean(value) => f.write_str(if *value { "yes" } else { "no" }),
        }
    }
}

/// What a handler answers.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Ok,
    Error(&'static str),
    Result(Vec<Arg>),
    Status(ArgError),
}

impl From<ArgError> for Reply {
    fn from(err: ArgError) -> Self {
        Reply::Status(err)
    }
}

/// Bounded writer over a reply buffer.
pub struct Response<'b> {
    buf: &'b mut [u8],
    len: usize,
    truncated: bool,
}

impl<'b> Response<'b> {
    pub fn new(buf: &'b mut [u8]) -> Self {
        if let Some(first) = buf.first_mut() {
            *first = 0;
        }
        Response { buf, len: 0, truncated: false }
    }

    /// Bytes written so far, the NUL not included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    // room for content, one byte is kept for the NUL
    fn capacity(&self) -> usize {
        self.buf.len().saturating_sub(1)
    }

    pub fn push_str(&mut self, s: &str) {
        let room = self.capacity() - self.len;
        let n = s.len().min(room);
        if n < s.len() {
            self.truncated = true;
        }
        self.buf[self.len..self.len + n].copy_from_slice(&s.as_bytes()[..n]);
        self.len += n;
        if self.len < self.buf.len() {
            self.buf[self.len] = 0;
        }
    }

    pub fn message(&mut self, id: u32, word: &str, args: &[Arg]) {
        let _ = write!(self, "{}:{}", id, word);
        for arg in args {
            let _ = write!(self, " {}", arg);
        }
    }

    pub fn ok(&mut self, id: u32) {
        self.message(id, "ok", &[]);
    }

    pub fn error(&mut self, id: u32, text: &str) {
        self.message(id, "error", &[Arg::Str(text.to_string())]);
    }

    pub fn result(&mut self, id: u32, args: &[Arg]) {
        self.message(id, "result", args);
    }

    pub fn error_status(&mut self, id: u32, err: &ArgError) {
        self.error(id, &err.to_string());
    }

    pub fn reply(&mut self, id: u32, reply: &Reply) {
        match reply {
            Reply::Ok => self.ok(id),
            Reply::Error(text) => self.error(id, text),
            Reply::Result(args) => self.result(id, args),
            Reply::Status(err) => self.error_status(id, err),
        }
    }

    /// Content length, the buffer holds a NUL right after it.
    pub fn finish(self) -> usize {
        self.len
    }
}

impl Write for Response<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // a full buffer is not an error, the rest is dropped
        self.push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::logger::init_logger;
    use crate::prpc::lex::Lexer;
    use crate::prpc::token::TokenKind;

    fn set_env() {
        let _ = init_logger();
    }

    fn render(reply: impl FnOnce(&mut Response)) -> String {
        let mut buf = [0xffu8; 128];
        let mut out = Response::new(&mut buf);
        reply(&mut out);
        let n = out.finish();
        assert_eq!(buf[n], 0);
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn test_standard_replies() {
        set_env();
        assert_eq!(render(|r| r.ok(3)), "3:ok");
        assert_eq!(render(|r| r.error(4, "Value is above 255")), "4:error \"Value is above 255\"");
        assert_eq!(
            render(|r| r.result(5, &[Arg::Boolean(true), Arg::Int(-3), Arg::Float(1.5), Arg::Identifier("ch".into())])),
            "5:result yes -3 1.500000 ch"
        );
        assert_eq!(render(|r| r.result(6, &[Arg::Str("a\"b]".into())])), "6:result \"a[\"b[]\"");
    }

    #[test]
    fn test_strings_scan_back() {
        set_env();
        for text in ["plain", "a\"b", "x]y", "[", "a[b", "[\"", "[]", "[[\"", "\"\"", "end]"] {
            let wire = Arg::Str(text.to_string()).to_string();
            let token = Lexer::new(&wire).next_token();
            assert_eq!(token.kind(), TokenKind::Str, "{:?} -> {:?}", text, wire);
            assert_eq!(token.unescaped().unwrap(), text.trim_end_matches('['));
        }

        let wire = Arg::Str("a[".to_string()).to_string();
        assert_eq!(wire, "\"a\"");
        let mut lexer = Lexer::new(&wire);
        assert_eq!(lexer.next_token().unescaped().unwrap(), "a");
        assert_eq!(lexer.next_token().kind(), TokenKind::Eof);
    }

    #[test]
    fn test_status_text() {
        set_env();
        let err = ArgError::UnexpectedToken { idx: 0, expected: TokenKind::Int, got: TokenKind::Eof };
        assert_eq!(
            render(|r| r.error_status(9, &err)),
            "9:error \"Unexcepted token for arg 0 : Excepted TOKEN_INT, got TOKEN_EOF\""
        );
        assert_eq!(render(|r| r.reply(9, &Reply::Status(ArgError::Unknown))), "9:error \"Unexcepted error\"");
    }

    #[test]
    fn test_truncation() {
        set_env();
        for size in 0..12 {
            let mut buf = vec![0xffu8; size];
            let mut out = Response::new(&mut buf);
            out.error(1, "Channel is above 512");
            let truncated = out.truncated();
            let n = out.finish();
            assert!(n < size.max(1));
            assert!(truncated);
            if size > 0 {
                assert_eq!(buf[n], 0);
                assert_eq!(&buf[..n], &b"1:error \"Channel is above 512\""[..n]);
            }
        }
    }
}
