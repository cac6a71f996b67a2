//! The translation context threaded through every recursive call.

use std::rc::Rc;

use crate::defs::DefKey;
use crate::env::ScopeId;
use crate::hierarchy::SharedSignature;

/// Where the walk currently is. Nested constructs derive a new context
/// instead of mutating this one.
#[derive(Clone, Debug)]
pub(crate) struct Ctx {
    /// Innermost scope; loop and handler variables live here.
    pub scope: ScopeId,
    /// The scope that owns new locals: a definition body or the module.
    pub body_scope: ScopeId,
    /// The definition being translated, `None` in main.
    pub key: Option<DefKey>,
    pub sig: Option<SharedSignature>,
    /// The class whose method body is being translated.
    pub class: Option<String>,
    /// The statement is the last one of its definition body.
    pub is_last: bool,
    pub in_loop: bool,
}

impl Ctx {
    pub fn module() -> Self {
        Ctx {
            scope: ScopeId::MODULE,
            body_scope: ScopeId::MODULE,
            key: None,
            sig: None,
            class: None,
            is_last: false,
            in_loop: false,
        }
    }

    /// The context of a definition body opened in `scope`.
    pub fn body(scope: ScopeId, key: &DefKey, sig: &SharedSignature) -> Self {
        Ctx {
            scope,
            body_scope: scope,
            key: Some(key.clone()),
            sig: Some(Rc::clone(sig)),
            class: key.class().map(str::to_string),
            is_last: false,
            in_loop: false,
        }
    }

    pub fn in_scope(&self, scope: ScopeId) -> Self {
        Ctx {
            scope,
            ..self.clone()
        }
    }

    pub fn last(&self, is_last: bool) -> Self {
        Ctx {
            is_last,
            ..self.clone()
        }
    }

    pub fn looping(&self) -> Self {
        Ctx {
            in_loop: true,
            is_last: false,
            ..self.clone()
        }
    }

    /// Name of the enclosing definition, for messages.
    pub fn name(&self) -> String {
        match &self.key {
            Some(key) => key.to_string(),
            None => "global scope".to_string(),
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.key.as_ref().is_some_and(DefKey::is_constructor)
    }
}
