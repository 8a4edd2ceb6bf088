use std::collections::HashMap;

use crate::ast::PType;

#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub p_type: PType,
    pub mutable: bool,
}

#[derive(Debug, Clone)]
pub struct FuncSig {
    pub params: Vec<PType>,
    pub return_type: PType,
}

/// Lexically-scoped symbol table: a stack of frames searched innermost
/// first, plus a separate function table (§4.3 "Environment").
#[derive(Debug, Default)]
pub struct TypeScope {
    frames: Vec<HashMap<String, Binding>>,
    functions: HashMap<String, FuncSig>,
}

impl TypeScope {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
            functions: HashMap::new(),
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn declare(&mut self, name: &str, binding: Binding) {
        self.frames
            .last_mut()
            .expect("at least one frame")
            .insert(name.to_string(), binding);
    }

    pub fn contains_in_current_frame(&self, name: &str) -> bool {
        self.frames
            .last()
            .map(|frame| frame.contains_key(name))
            .unwrap_or(false)
    }

    pub fn lookup(&self, name: &str) -> Option<Binding> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .copied()
    }

    pub fn declare_function(&mut self, name: &str, sig: FuncSig) {
        self.functions.insert(name.to_string(), sig);
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FuncSig> {
        self.functions.get(name)
    }
}

/// Tracks what kind of construct currently encloses the node being checked,
/// used to validate `break`/`continue`/`return` placement (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    While,
    If,
    Else,
    CompoundExpr,
}
