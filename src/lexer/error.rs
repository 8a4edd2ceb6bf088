use crate::diagnostic::Diagnostic;
use std::error::Error;
use std::fmt::Display;

/// Illegal character, unterminated block comment, unterminated char literal
/// (§7). Mirrors `typechecker::error::TypeError`'s shape, simplified to a
/// single source file's line numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError(Diagnostic);

impl LexError {
    pub fn new(line: usize, message: String) -> Self {
        Self(Diagnostic::new(line, message))
    }

    pub fn line(&self) -> usize {
        self.0.line
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Error for LexError {}
