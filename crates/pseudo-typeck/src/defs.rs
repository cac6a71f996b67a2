//! Definition index: the inference state of every function and method.
//!
//! A definition starts `Unresolved` holding its syntax node, becomes
//! `InProgress` while its body is being translated, and ends `Resolved`
//! holding the finished IR. Seeing `InProgress` again means the body
//! reached itself before the return type was known.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use pseudo_syntax::FunctionDef;

use crate::hierarchy::{SharedSignature, Signature};
use crate::ir;

/// Identifies one function or method body.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DefKey {
    Function(String),
    /// A method, keyed by the class whose body implements it.
    Method { class: String, name: String },
}

impl DefKey {
    pub fn method(class: &str, name: &str) -> Self {
        DefKey::Method {
            class: class.to_string(),
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DefKey::Function(name) | DefKey::Method { name, .. } => name,
        }
    }

    pub fn class(&self) -> Option<&str> {
        match self {
            DefKey::Function(_) => None,
            DefKey::Method { class, .. } => Some(class),
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, DefKey::Method { name, .. } if name == "__init__")
    }
}

impl fmt::Display for DefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefKey::Function(name) => write!(f, "{}", name),
            DefKey::Method { class, name } => write!(f, "{}#{}", class, name),
        }
    }
}

/// A finished function, method or constructor.
#[derive(Clone, Debug, PartialEq)]
pub enum Routine {
    Function(ir::FunctionDefinition),
    Method(ir::MethodDefinition),
    Constructor(ir::Constructor),
}

#[derive(Debug)]
pub enum DefState {
    Unresolved(FunctionDef),
    InProgress,
    Resolved(Routine),
}

/// The coarse phase of a definition, without its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Unresolved,
    InProgress,
    Resolved,
}

#[derive(Debug, Default)]
pub struct DefinitionIndex {
    states: FxHashMap<DefKey, DefState>,
    /// Free function signatures; method signatures live in the hierarchy.
    functions: FxHashMap<String, SharedSignature>,
}

impl DefinitionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a free function and return its placeholder signature.
    pub fn declare_function(&mut self, def: FunctionDef) -> SharedSignature {
        let sig = Signature::placeholder(def.args.args.len());
        self.functions.insert(def.name.clone(), Rc::clone(&sig));
        self.states
            .insert(DefKey::Function(def.name.clone()), DefState::Unresolved(def));
        sig
    }

    /// Register the body of a method written in `class`.
    pub fn declare_method(&mut self, class: &str, def: FunctionDef) {
        let key = DefKey::method(class, &def.name);
        self.states.insert(key, DefState::Unresolved(def));
    }

    pub fn function(&self, name: &str) -> Option<&SharedSignature> {
        self.functions.get(name)
    }

    pub fn is_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn is_declared(&self, key: &DefKey) -> bool {
        self.states.contains_key(key)
    }

    pub fn phase(&self, key: &DefKey) -> Option<Phase> {
        self.states.get(key).map(|state| match state {
            DefState::Unresolved(_) => Phase::Unresolved,
            DefState::InProgress => Phase::InProgress,
            DefState::Resolved(_) => Phase::Resolved,
        })
    }

    /// Move an unresolved definition to `InProgress`, handing back its
    /// syntax node. `None` if it was not unresolved.
    pub fn begin(&mut self, key: &DefKey) -> Option<FunctionDef> {
        let state = self.states.get_mut(key)?;
        if !matches!(state, DefState::Unresolved(_)) {
            return None;
        }
        match std::mem::replace(state, DefState::InProgress) {
            DefState::Unresolved(def) => {
                debug!(definition = %key, "inferring");
                Some(def)
            }
            _ => unreachable!("checked above"),
        }
    }

    pub fn finish(&mut self, key: &DefKey, routine: Routine) {
        debug!(definition = %key, "resolved");
        self.states.insert(key.clone(), DefState::Resolved(routine));
    }

    /// Take a finished definition out of the index.
    pub fn take_resolved(&mut self, key: &DefKey) -> Option<Routine> {
        match self.states.remove(key)? {
            DefState::Resolved(routine) => Some(routine),
            other => {
                self.states.insert(key.clone(), other);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pseudo_syntax::build::{def, int, ret};
    use pseudo_syntax::StmtKind;

    fn raw(name: &str, params: &[&str]) -> FunctionDef {
        match def(name, params, vec![ret(int(1))]).kind {
            StmtKind::FunctionDef(f) => f,
            _ => unreachable!(),
        }
    }

    #[test]
    fn phases_advance_once() {
        let mut defs = DefinitionIndex::new();
        let sig = defs.declare_function(raw("f", &["a", "b"]));
        assert_eq!(sig.borrow().params.len(), 2);
        let key = DefKey::Function("f".into());
        assert_eq!(defs.phase(&key), Some(Phase::Unresolved));

        let body = defs.begin(&key).unwrap();
        assert_eq!(body.name, "f");
        assert_eq!(defs.phase(&key), Some(Phase::InProgress));
        assert!(defs.begin(&key).is_none());
        assert!(defs.take_resolved(&key).is_none());
        assert_eq!(defs.phase(&key), Some(Phase::InProgress));
    }

    #[test]
    fn method_keys_render_with_class() {
        assert_eq!(DefKey::method("Point", "norm").to_string(), "Point#norm");
        assert!(DefKey::method("Point", "__init__").is_constructor());
    }
}
