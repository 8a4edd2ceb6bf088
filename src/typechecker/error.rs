use crate::diagnostic::Diagnostic;
use std::error::Error;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub struct TypeError(Diagnostic);

impl TypeError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self(Diagnostic::new(line, message.into()))
    }

    pub fn line(&self) -> usize {
        self.0.line
    }

    pub fn message(&self) -> &str {
        &self.0.message
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Error for TypeError {}
