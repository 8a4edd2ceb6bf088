use std::error::Error;
use std::fmt::Display;

/// A structural invariant of a type-checked AST being violated at run time
/// (§7) — e.g. a `return` reached outside of a function call frame. Division
/// by zero is *not* a runtime error — §4.4.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for RuntimeError {}
