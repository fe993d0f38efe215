//! Variable bindings for DIL evaluation

use indexmap::IndexMap;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

/// Where an expression is being evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Top-level statements; program bindings are visible
    Program,
    /// A field default inside a class template; no bindings are visible
    ClassDefaults,
}

/// Program-level bindings, in first-definition order
#[derive(Debug, Default)]
pub struct Scope {
    bindings: IndexMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any previous binding (`let`)
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Replace an existing binding (`name = expr;`)
    pub fn rebind(&mut self, name: &str, value: Value) -> EvalResult<()> {
        match self.bindings.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(EvalError::undefined_var(name)),
        }
    }

    /// Resolve an identifier in this scope
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Check if a binding exists
    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Drop a binding, returning its last value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.shift_remove(name)
    }
}
