//! Longest-match, single-pass, ASCII-oriented tokenizer (§4.1).
mod error;
mod token;

pub use error::LexError;
pub use token::{Token, TokenKind};

use log::{debug, trace};

/// Runs the lexer to completion, returning every token produced (terminated
/// by an implicit EOF) and every diagnostic encountered along the way.
///
/// Illegal bytes and unterminated comments/char literals are *not* fatal:
/// per §4.1 the lexer records a diagnostic and keeps going, matching the
/// "skip one byte and continue" tolerant behavior.
pub fn lex(source: &str) -> (Vec<Token>, Vec<LexError>) {
    debug!("lexing {} bytes of source", source.len());
    let mut lexer = Lexer::new(source);
    lexer.run();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("const", TokenKind::Const),
    ("var", TokenKind::Var),
    ("print", TokenKind::Print),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("func", TokenKind::Func),
    ("return", TokenKind::Return),
    // Reserved but unused by the grammar (§6): still lexed as keywords so
    // they can never be used as a NAME, even though no production consumes
    // them.
    ("enum", TokenKind::Enum),
    ("let", TokenKind::Let),
    ("match", TokenKind::Match),
    ("import", TokenKind::Import),
    ("struct", TokenKind::Struct),
];

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            tokens: vec![],
            errors: vec![],
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn run(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.advance();
                }
                b'/' if self.peek_at(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => self.block_comment(),
                b'0'..=b'9' => self.number(),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.ident_or_keyword(),
                b'\'' => self.char_literal(),
                b'+' => self.emit_single(TokenKind::Plus),
                b'-' => self.emit_single(TokenKind::Minus),
                b'*' => self.emit_single(TokenKind::Star),
                b'/' => self.emit_single(TokenKind::Slash),
                b',' => self.emit_single(TokenKind::Comma),
                b';' => self.emit_single(TokenKind::Semi),
                b'(' => self.emit_single(TokenKind::LParen),
                b')' => self.emit_single(TokenKind::RParen),
                b'{' => self.emit_single(TokenKind::LBrace),
                b'}' => self.emit_single(TokenKind::RBrace),
                b'<' => self.emit_maybe_eq(TokenKind::Lt, TokenKind::Le),
                b'>' => self.emit_maybe_eq(TokenKind::Gt, TokenKind::Ge),
                b'=' => self.emit_maybe_eq(TokenKind::Assign, TokenKind::EqEq),
                b'!' => self.emit_maybe_eq(TokenKind::Not, TokenKind::Ne),
                b'&' if self.peek_at(1) == Some(b'&') => {
                    self.emit_two(TokenKind::AndAnd);
                }
                b'|' if self.peek_at(1) == Some(b'|') => {
                    self.emit_two(TokenKind::OrOr);
                }
                other => {
                    let line = self.line;
                    self.errors.push(LexError::new(
                        line,
                        format!("Illegal character {:?}", other as char),
                    ));
                    self.advance();
                }
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            line: self.line,
        });
    }

    fn emit_single(&mut self, kind: TokenKind) {
        let line = self.line;
        self.advance();
        self.tokens.push(Token { kind, line });
    }

    fn emit_two(&mut self, kind: TokenKind) {
        let line = self.line;
        self.advance();
        self.advance();
        self.tokens.push(Token { kind, line });
    }

    /// `<`/`>`/`=`/`!` followed by a trailing `=` become the two-char
    /// relational/equality operator; otherwise the bare one-char operator.
    fn emit_maybe_eq(&mut self, bare: TokenKind, with_eq: TokenKind) {
        let line = self.line;
        self.advance();
        if self.peek() == Some(b'=') {
            self.advance();
            self.tokens.push(Token { kind: with_eq, line });
        } else {
            self.tokens.push(Token { kind: bare, line });
        }
    }

    fn line_comment(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.advance();
        }
    }

    fn block_comment(&mut self) {
        let start_line = self.line;
        self.advance();
        self.advance();
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b'*'), Some(b'/')) => {
                    self.advance();
                    self.advance();
                    return;
                }
                (Some(_), _) => {
                    self.advance();
                }
                (None, _) => {
                    self.errors.push(LexError::new(
                        start_line,
                        "Unterminated block comment".to_string(),
                    ));
                    return;
                }
            }
        }
    }

    /// `FLOAT` is matched before `INTEGER`: digits, a dot, then more digits
    /// (§4.1); a bare `digits.` with no trailing digit is just an integer
    /// followed by whatever `.` turns out to be (no other use of `.` exists,
    /// so a trailing dot with no digits after it is lexed as INTEGER then an
    /// illegal-character diagnostic for the dot).
    fn number(&mut self) {
        let line = self.line;
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.advance();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.advance();
            }
            let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
            let value: f64 = text.parse().unwrap();
            self.tokens.push(Token {
                kind: TokenKind::Float(value),
                line,
            });
        } else {
            let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
            let value: i64 = text.parse().unwrap_or(i64::MAX);
            self.tokens.push(Token {
                kind: TokenKind::Integer(value),
                line,
            });
        }
    }

    fn ident_or_keyword(&mut self) {
        let line = self.line;
        let start = self.pos;
        while matches!(self.peek(), Some(b'a'..=b'z'|b'A'..=b'Z'|b'0'..=b'9'|b'_')) {
            self.advance();
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        let kind = KEYWORDS
            .iter()
            .find(|(kw, _)| *kw == text)
            .map(|(_, kind)| kind.clone())
            .unwrap_or_else(|| TokenKind::Name(text.to_string()));
        trace!("ident_or_keyword -> {kind:?} at line {line}");
        self.tokens.push(Token { kind, line });
    }

    /// `'c'`, `'\xHH'`, or `'\` followed by one of `abfnrtv'` (§4.1).
    fn char_literal(&mut self) {
        let line = self.line;
        self.advance(); // opening quote

        let value = match self.peek() {
            Some(b'\\') => {
                self.advance();
                match self.peek() {
                    Some(b'x') => {
                        self.advance();
                        let hi = self.advance();
                        let lo = self.advance();
                        match (hi, lo) {
                            (Some(hi), Some(lo)) => {
                                let s = format!("{}{}", hi as char, lo as char);
                                u8::from_str_radix(&s, 16).ok().map(|v| v as char)
                            }
                            _ => None,
                        }
                    }
                    Some(esc @ (b'a' | b'b' | b'f' | b'n' | b'r' | b't' | b'v' | b'\'')) => {
                        self.advance();
                        Some(match esc {
                            b'a' => '\x07',
                            b'b' => '\x08',
                            b'f' => '\x0c',
                            b'n' => '\n',
                            b'r' => '\r',
                            b't' => '\t',
                            b'v' => '\x0b',
                            b'\'' => '\'',
                            _ => unreachable!(),
                        })
                    }
                    _ => None,
                }
            }
            Some(b) if b != b'\'' => {
                self.advance();
                Some(b as char)
            }
            _ => None,
        };

        let Some(value) = value else {
            self.errors
                .push(LexError::new(line, "Unterminated char literal".to_string()));
            return;
        };

        if self.peek() != Some(b'\'') {
            self.errors
                .push(LexError::new(line, "Unterminated char literal".to_string()));
            return;
        }
        self.advance(); // closing quote

        self.tokens.push(Token {
            kind: TokenKind::Char(value),
            line,
        });
    }
}
