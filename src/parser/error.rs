use crate::diagnostic::Diagnostic;
use std::error::Error;
use std::fmt::Display;

/// Unexpected token (§7); the only parse-error kind the grammar produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(Diagnostic);

impl ParseError {
    pub fn new(line: usize, message: String) -> Self {
        Self(Diagnostic::new(line, message))
    }

    pub fn line(&self) -> usize {
        self.0.line
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Error for ParseError {}
