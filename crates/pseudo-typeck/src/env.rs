//! Type environment: an arena of scopes linked by parent pointers.
//!
//! Scope 0 is the module scope. Function bodies, loops and comprehensions
//! open child scopes; a lazily translated definition opens its scope under
//! the module scope rather than under its caller, so a body never sees the
//! locals of whoever triggered its inference. Scopes are opened and closed
//! in LIFO order, which lets the arena be truncated back to a mark.

use rustc_hash::FxHashMap;

use crate::ty::Ty;

/// Index of a scope in the arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The module scope.
    pub const MODULE: ScopeId = ScopeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct Scope {
    bindings: FxHashMap<String, Ty>,
    parent: Option<ScopeId>,
}

/// A chain-of-scopes environment mapping names to pseudo-types.
#[derive(Debug)]
pub struct TypeEnv {
    scopes: Vec<Scope>,
}

impl TypeEnv {
    /// Create an environment holding only the empty module scope.
    pub fn new() -> Self {
        TypeEnv {
            scopes: vec![Scope::default()],
        }
    }

    /// Look up a name, walking outward from `scope`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Ty> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            if let Some(ty) = s.bindings.get(name) {
                return Some(ty);
            }
            current = s.parent;
        }
        None
    }

    /// Look up a name in `scope` only.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<&Ty> {
        self.scopes[scope.index()].bindings.get(name)
    }

    /// The scope that binds `name` as a local of `scope`'s body.
    ///
    /// The module scope only counts when `scope` is the module scope
    /// itself: a function body sees module names but does not own them.
    pub fn resolve_local(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == ScopeId::MODULE && scope != ScopeId::MODULE {
                return None;
            }
            let s = &self.scopes[id.index()];
            if s.bindings.contains_key(name) {
                return Some(id);
            }
            current = s.parent;
        }
        None
    }

    /// Bind `name` in `scope`, shadowing any outer binding.
    pub fn define(&mut self, scope: ScopeId, name: impl Into<String>, ty: Ty) {
        self.scopes[scope.index()].bindings.insert(name.into(), ty);
    }

    /// Rebind `name` in the nearest scope that already binds it, or define
    /// it in `scope` when no enclosing scope does.
    pub fn assign(&mut self, scope: ScopeId, name: &str, ty: Ty) {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &mut self.scopes[id.index()];
            if let Some(slot) = s.bindings.get_mut(name) {
                *slot = ty;
                return;
            }
            current = s.parent;
        }
        self.define(scope, name.to_string(), ty);
    }

    /// Open a child scope of `parent` holding `bindings`.
    pub fn child(&mut self, parent: ScopeId, bindings: impl IntoIterator<Item = (String, Ty)>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            bindings: bindings.into_iter().collect(),
            parent: Some(parent),
        });
        id
    }

    /// The arena size, to be handed back to [`TypeEnv::discard`].
    pub fn mark(&self) -> usize {
        self.scopes.len()
    }

    /// Drop every scope opened since `mark`.
    ///
    /// # Panics
    ///
    /// Panics if asked to drop the module scope.
    pub fn discard(&mut self, mark: usize) {
        assert!(mark >= 1, "cannot discard the module scope");
        self.scopes.truncate(mark);
    }

    /// Number of live scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents() {
        let mut env = TypeEnv::new();
        env.define(ScopeId::MODULE, "k", Ty::int());
        let inner = env.child(ScopeId::MODULE, [("x".to_string(), Ty::string())]);
        assert_eq!(env.lookup(inner, "k"), Some(&Ty::int()));
        assert_eq!(env.lookup(inner, "x"), Some(&Ty::string()));
        assert_eq!(env.lookup(ScopeId::MODULE, "x"), None);
        assert_eq!(env.lookup_local(inner, "k"), None);
    }

    #[test]
    fn assign_rebinds_nearest() {
        let mut env = TypeEnv::new();
        env.define(ScopeId::MODULE, "xs", Ty::list(Ty::Hole));
        let inner = env.child(ScopeId::MODULE, []);
        env.assign(inner, "xs", Ty::list(Ty::int()));
        env.assign(inner, "fresh", Ty::boolean());
        assert_eq!(env.lookup_local(ScopeId::MODULE, "xs"), Some(&Ty::list(Ty::int())));
        assert_eq!(env.lookup_local(inner, "fresh"), Some(&Ty::boolean()));
    }

    #[test]
    fn module_names_are_not_body_locals() {
        let mut env = TypeEnv::new();
        env.define(ScopeId::MODULE, "total", Ty::int());
        let body = env.child(ScopeId::MODULE, [("n".to_string(), Ty::int())]);
        let inner = env.child(body, []);
        assert_eq!(env.resolve_local(inner, "n"), Some(body));
        assert_eq!(env.resolve_local(inner, "total"), None);
        assert_eq!(env.resolve_local(ScopeId::MODULE, "total"), Some(ScopeId::MODULE));
    }

    #[test]
    fn discard_truncates_to_mark() {
        let mut env = TypeEnv::new();
        let mark = env.mark();
        let a = env.child(ScopeId::MODULE, []);
        env.child(a, []);
        assert_eq!(env.depth(), 3);
        env.discard(mark);
        assert_eq!(env.depth(), 1);
    }
}
