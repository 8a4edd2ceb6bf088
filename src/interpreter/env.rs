use std::collections::HashMap;

use crate::ast::Literal;

pub type Value = Literal;

/// (a) a stack of name→value frames, (b) swapped out wholesale on function
/// call/return, (c) a global frame populated before `main` runs (§4.4).
#[derive(Debug, Default)]
pub struct Env {
    globals: HashMap<String, Value>,
    locals: Vec<HashMap<String, Value>>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_block(&mut self) {
        self.locals.push(HashMap::new());
    }

    pub fn pop_block(&mut self) {
        self.locals.pop();
    }

    /// Declares a new binding. At top level (no open local frame) this lands
    /// directly in the globals frame, matching "bindings created in the
    /// outermost frame migrate into the globals frame" (§4.4).
    pub fn declare(&mut self, name: &str, value: Value) {
        match self.locals.last_mut() {
            Some(frame) => {
                frame.insert(name.to_string(), value);
            }
            None => {
                self.globals.insert(name.to_string(), value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.locals
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }

    pub fn set(&mut self, name: &str, value: Value) {
        for frame in self.locals.iter_mut().rev() {
            if frame.contains_key(name) {
                frame.insert(name.to_string(), value);
                return;
            }
        }
        self.globals.insert(name.to_string(), value);
    }

    /// Swaps in a fresh scope stack for a function call, returning the
    /// caller's stack to be restored on return.
    pub fn enter_call(&mut self, params: HashMap<String, Value>) -> Vec<HashMap<String, Value>> {
        std::mem::replace(&mut self.locals, vec![params])
    }

    pub fn exit_call(&mut self, saved: Vec<HashMap<String, Value>>) {
        self.locals = saved;
    }
}
