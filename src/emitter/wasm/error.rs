use std::error::Error;
use std::fmt::Display;

/// A top-level `var`/`const` initializer that isn't foldable to a literal
/// before code generation — rejected rather than silently miscompiled
/// (§9 open question (c)).
#[derive(Debug, Clone, PartialEq)]
pub struct WasmEmitError {
    pub message: String,
}

impl WasmEmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for WasmEmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for WasmEmitError {}
