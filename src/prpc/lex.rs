//! prpc line scanner
//!
//! Single pass, longest match. On a tie the earlier class wins, in this order:
//! string, command header, float, integer, boolean, identifier. So `12` is an
//! integer while `12abc` is an identifier, and `yes` is a boolean while
//! `yesterday` is an identifier. The scanner keeps no state besides its
//! cursor, so scanning can resume from any position it handed out.

use super::token::{MsgId, Token};

const NUL: u8 = 0;

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Lexer { line, pos: 0 }
    }

    /// Byte offset of the next token.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Scan one token and move past it. At the end of input the cursor stays
    /// put and every further call yields `Eof` again.
    pub fn next_token(&mut self) -> Token<'a> {
        let bytes = &self.line.as_bytes()[self.pos..];
        let (token, len) = scan(&self.line[self.pos..], bytes);
        self.pos += len;
        token
    }
}

fn scan<'a>(rest: &'a str, bytes: &[u8]) -> (Token<'a>, usize) {
    let first = match bytes.first() {
        None | Some(&NUL) => return (Token::Eof, 0),
        Some(&b) => b,
    };

    if first == b'"' {
        if let Some(len) = string_len(bytes) {
            return (Token::Str { text: &rest[1..len - 1] }, len);
        }
        return error(rest);
    }

    let ident = run_len(bytes, is_ident);

    if let Some((len, id_end)) = command_len(bytes) {
        let text = &rest[..len];
        let id = match &rest[..id_end] {
            "*" => MsgId::Notify,
            digits => match digits.parse::<u32>() {
                Ok(id) => MsgId::Number(id),
                Err(_) => return (Token::Error { text }, len),
            },
        };
        return (Token::Command { text, id, name: &rest[id_end + 1..len] }, len);
    }

    if let Some(len) = float_len(bytes).filter(|len| *len >= ident) {
        let text = &rest[..len];
        return match text.parse::<f32>() {
            Ok(value) => (Token::Float { text, value }, len),
            Err(_) => (Token::Error { text }, len),
        };
    }

    if let Some(len) = int_len(bytes).filter(|len| *len >= ident) {
        let text = &rest[..len];
        return match text.parse::<i32>() {
            Ok(value) => (Token::Int { text, value }, len),
            // does not fit, refuse rather than wrap
            Err(_) => (Token::Error { text }, len),
        };
    }

    if ident > 0 {
        let text = &rest[..ident];
        if text.eq_ignore_ascii_case("yes") {
            return (Token::Boolean { text, value: true }, ident);
        }
        if text.eq_ignore_ascii_case("no") {
            return (Token::Boolean { text, value: false }, ident);
        }
        return (Token::Identifier { text }, ident);
    }

    let blank = run_len(bytes, |b| b == b' ' || b == b'\t');
    if blank > 0 {
        return (Token::Separator { text: &rest[..blank] }, blank);
    }

    let eol = run_len(bytes, |b| b == b'\r' || b == b'\n');
    if eol > 0 {
        return (Token::Eol { text: &rest[..eol] }, eol);
    }

    error(rest)
}

// one whole character, the cursor must stay on a char boundary
fn error(rest: &str) -> (Token<'_>, usize) {
    let len = rest.chars().next().map_or(1, char::len_utf8);
    (Token::Error { text: &rest[..len] }, len)
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'/')
}

fn run_len(bytes: &[u8], accept: impl Fn(u8) -> bool) -> usize {
    bytes.iter().take_while(|b| accept(**b)).count()
}

fn digits_len(bytes: &[u8]) -> usize {
    run_len(bytes, |b| b.is_ascii_digit())
}

// -?[0-9]+
fn int_len(bytes: &[u8]) -> Option<usize> {
    let sign = usize::from(bytes.first() == Some(&b'-'));
    match digits_len(&bytes[sign..]) {
        0 => None,
        n => Some(sign + n),
    }
}

// -?[0-9]+.[0-9]+
fn float_len(bytes: &[u8]) -> Option<usize> {
    let whole = int_len(bytes)?;
    if bytes.get(whole) != Some(&b'.') {
        return None;
    }
    match digits_len(&bytes[whole + 1..]) {
        0 => None,
        n => Some(whole + 1 + n),
    }
}

// (digits|*):identifier, returns the length and the offset of the ':'
fn command_len(bytes: &[u8]) -> Option<(usize, usize)> {
    let id_end = if bytes.first() == Some(&b'*') { 1 } else { digits_len(bytes) };
    if id_end == 0 || bytes.get(id_end) != Some(&b':') {
        return None;
    }
    match run_len(&bytes[id_end + 1..], is_ident) {
        0 => None,
        name => Some((id_end + 1 + name, id_end)),
    }
}

// "..." with `["` and `[]` escapes, must close before the end of the line
fn string_len(bytes: &[u8]) -> Option<usize> {
    let mut i = 1;
    loop {
        match *bytes.get(i)? {
            b'"' => return Some(i + 1),
            b'[' if matches!(bytes.get(i + 1), Some(b'"') | Some(b']')) => i += 2,
            b'\r' | b'\n' | NUL => return None,
            _ => i += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::logger::init_logger;
    use crate::prpc::token::TokenKind;

    fn set_env() {
        let _ = init_logger();
    }

    fn kinds(line: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(line);
        let mut out = vec![];
        loop {
            let token = lexer.next_token();
            out.push(token.kind());
            if token.is_terminal() {
                return out;
            }
        }
    }

    fn first(line: &str) -> Token<'_> {
        Lexer::new(line).next_token()
    }

    #[test]
    fn test_literals() {
        set_env();
        assert_eq!(first("\"abc\""), Token::Str { text: "abc" });
        assert_eq!(first("-12.50"), Token::Float { text: "-12.50", value: -12.5 });
        assert_eq!(first("42"), Token::Int { text: "42", value: 42 });
        assert_eq!(first("-7"), Token::Int { text: "-7", value: -7 });
        assert_eq!(first("yes"), Token::Boolean { text: "yes", value: true });
        assert_eq!(first("no"), Token::Boolean { text: "no", value: false });
        assert_eq!(first("dmx/out_1.a-b"), Token::Identifier { text: "dmx/out_1.a-b" });
        assert_eq!(
            first("3:set"),
            Token::Command { text: "3:set", id: MsgId::Number(3), name: "set" }
        );
        assert_eq!(
            first("*:hello"),
            Token::Command { text: "*:hello", id: MsgId::Notify, name: "hello" }
        );
    }

    #[test]
    fn test_longest_match() {
        set_env();
        assert_eq!(first("12abc").kind(), TokenKind::Identifier);
        assert_eq!(first("yesterday").kind(), TokenKind::Identifier);
        assert_eq!(first("nope").kind(), TokenKind::Identifier);
        assert_eq!(first("1.5.6").kind(), TokenKind::Identifier);
        assert_eq!(first("1.").kind(), TokenKind::Identifier);
        assert_eq!(first("-").kind(), TokenKind::Identifier);
        assert_eq!(first("1.5 ").kind(), TokenKind::Float);
        assert_eq!(first("10 ").kind(), TokenKind::Int);
    }

    #[test]
    fn test_string_escapes() {
        set_env();
        let token = first("\"say [\"hi[\" [] [x\"");
        assert_eq!(token.text(), "say [\"hi[\" [] [x");
        assert_eq!(token.unescaped().unwrap(), "say \"hi\" ] [x");

        assert_eq!(first("\"open").kind(), TokenKind::Error);
        assert_eq!(first("\"split\nline\"").kind(), TokenKind::Error);
    }

    #[test]
    fn test_overflow_is_an_error() {
        set_env();
        assert_eq!(first("2147483647").kind(), TokenKind::Int);
        assert_eq!(first("-2147483648").kind(), TokenKind::Int);
        assert_eq!(first("2147483648"), Token::Error { text: "2147483648" });
        assert_eq!(first("99999999999:set").kind(), TokenKind::Error);
    }

    #[test]
    fn test_full_line() {
        use TokenKind::*;
        set_env();
        assert_eq!(
            kinds("1:set 10 \t200\r\n"),
            vec![Command, Separator, Int, Separator, Int, Eol]
        );
        assert_eq!(kinds("2:has set"), vec![Command, Separator, Identifier, Eof]);
        assert_eq!(kinds("x\0garbage"), vec![Identifier, Eof]);
        assert_eq!(kinds("1:set #"), vec![Command, Separator, Error]);
        assert_eq!(kinds(""), vec![Eof]);
    }

    #[test]
    fn test_cursor_is_restartable() {
        set_env();
        let line = "5:fade 1 2";
        let mut lexer = Lexer::new(line);
        lexer.next_token();
        let mark = lexer.clone();
        let a = lexer.next_token();
        let mut again = mark;
        assert_eq!(again.next_token(), a);
        assert_eq!(again.pos(), lexer.pos());

        let mut end = Lexer::new("7");
        end.next_token();
        assert_eq!(end.next_token(), Token::Eof);
        assert_eq!(end.next_token(), Token::Eof);
        assert_eq!(end.pos(), 1);
    }

    #[test]
    fn test_error_keeps_char_boundary() {
        set_env();
        let mut lexer = Lexer::new("é1");
        assert_eq!(lexer.next_token(), Token::Error { text: "é" });
        assert_eq!(lexer.next_token().kind(), TokenKind::Int);
    }
}
