//! Class hierarchy, method signature tables and the attribute index.
//!
//! Single inheritance only: a class names at most one base, declared
//! earlier. A subclass starts from a copy of its base's method table whose
//! entries point at the same signature cells, so inferring an inherited or
//! overridden method through any class of the chain updates it for all of
//! them.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ty::{Ty, EXCEPTION};

/// A function or method signature that inference fills in place.
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub params: Vec<Ty>,
    pub ret: Ty,
}

/// A signature cell shared by every class of a hierarchy that sees the
/// method.
pub type SharedSignature = Rc<RefCell<Signature>>;

impl Signature {
    /// A cell with `arity` unresolved parameters and an unresolved return.
    pub fn placeholder(arity: usize) -> SharedSignature {
        Rc::new(RefCell::new(Signature {
            params: vec![Ty::Hole; arity],
            ret: Ty::Hole,
        }))
    }

    /// The signature as a `Function` pseudo-type.
    pub fn to_ty(&self) -> Ty {
        Ty::function(self.params.clone(), self.ret.clone())
    }

    /// Whether the return slot has been fixed.
    pub fn has_return(&self) -> bool {
        self.ret != Ty::Hole
    }
}

/// A method as seen from one class.
#[derive(Clone, Debug)]
pub struct MethodEntry {
    pub sig: SharedSignature,
    /// The class whose body implements the method.
    pub defined_in: String,
}

/// One instance attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct AttrEntry {
    pub name: String,
    pub ty: Ty,
    pub is_public: bool,
}

#[derive(Debug)]
struct ClassInfo {
    base: Option<String>,
    subclasses: Vec<String>,
    methods: FxHashMap<String, MethodEntry>,
    /// Methods written in this class, in declaration order.
    own_methods: Vec<String>,
    /// Attributes first assigned through this class, in first-seen order.
    attrs: Vec<AttrEntry>,
}

/// Classes and custom exceptions of one module.
#[derive(Debug, Default)]
pub struct Hierarchy {
    classes: FxHashMap<String, ClassInfo>,
    /// Custom exception -> its custom base, `None` for `Exception` itself.
    exceptions: FxHashMap<String, Option<String>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Classes ────────────────────────────────────────────────────────

    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Register a class deriving from `base`, which must be declared.
    pub fn declare_class(&mut self, name: &str, base: Option<&str>) {
        let methods = match base {
            Some(base) => {
                let info = self
                    .classes
                    .get_mut(base)
                    .expect("base class should be declared before its subclasses");
                info.subclasses.push(name.to_string());
                info.methods.clone()
            }
            None => FxHashMap::default(),
        };
        self.classes.insert(
            name.to_string(),
            ClassInfo {
                base: base.map(str::to_string),
                subclasses: Vec::new(),
                methods,
                own_methods: Vec::new(),
                attrs: Vec::new(),
            },
        );
    }

    /// Register a method written in `class` and return its signature cell.
    ///
    /// An override of an inherited method with the same arity keeps the
    /// inherited cell; constructors and arity-changing overrides get a
    /// fresh one.
    pub fn declare_method(&mut self, class: &str, method: &str, arity: usize) -> SharedSignature {
        let info = self
            .classes
            .get_mut(class)
            .expect("methods are declared on declared classes");
        let sig = match info.methods.get(method) {
            Some(inherited)
                if method != "__init__" && inherited.sig.borrow().params.len() == arity =>
            {
                Rc::clone(&inherited.sig)
            }
            _ => Signature::placeholder(arity),
        };
        info.methods.insert(
            method.to_string(),
            MethodEntry {
                sig: Rc::clone(&sig),
                defined_in: class.to_string(),
            },
        );
        info.own_methods.push(method.to_string());
        sig
    }

    pub fn method(&self, class: &str, method: &str) -> Option<&MethodEntry> {
        self.classes.get(class)?.methods.get(method)
    }

    /// Every method visible on `class`, sorted by name.
    pub fn methods(&self, class: &str) -> Vec<(&str, &MethodEntry)> {
        let mut methods: Vec<_> = self
            .classes
            .get(class)
            .map(|info| info.methods.iter().map(|(n, e)| (n.as_str(), e)).collect())
            .unwrap_or_default();
        methods.sort_by(|a, b| a.0.cmp(b.0));
        methods
    }

    /// Methods written in `class` itself, in declaration order.
    pub fn own_methods(&self, class: &str) -> &[String] {
        self.classes
            .get(class)
            .map(|info| info.own_methods.as_slice())
            .unwrap_or_default()
    }

    pub fn base(&self, class: &str) -> Option<&str> {
        self.classes.get(class)?.base.as_deref()
    }

    pub fn subclasses(&self, class: &str) -> &[String] {
        self.classes
            .get(class)
            .map(|info| info.subclasses.as_slice())
            .unwrap_or_default()
    }

    /// Whether `sub` is `base` or inherits from it.
    pub fn is_subclass(&self, sub: &str, base: &str) -> bool {
        let mut current = Some(sub);
        while let Some(class) = current {
            if class == base {
                return true;
            }
            current = self.base(class);
        }
        false
    }

    /// The nearest class both `a` and `b` inherit from.
    pub fn common_ancestor(&self, a: &str, b: &str) -> Option<&str> {
        let mut current = Some(a);
        while let Some(class) = current {
            if self.is_subclass(b, class) {
                return self.classes.get_key_value(class).map(|(k, _)| k.as_str());
            }
            current = self.base(class);
        }
        None
    }

    // ── Attributes ─────────────────────────────────────────────────────

    /// Find an attribute on `class` or its ancestors, with its owner.
    pub fn attr(&self, class: &str, name: &str) -> Option<(&str, &AttrEntry)> {
        let mut current = Some(class);
        while let Some(owner) = current {
            let (key, info) = self.classes.get_key_value(owner)?;
            if let Some(entry) = info.attrs.iter().find(|a| a.name == name) {
                return Some((key.as_str(), entry));
            }
            current = info.base.as_deref();
        }
        None
    }

    /// Register a new attribute on `class`.
    pub fn register_attr(&mut self, class: &str, name: &str, ty: Ty, is_public: bool) {
        if let Some(info) = self.classes.get_mut(class) {
            info.attrs.push(AttrEntry {
                name: name.to_string(),
                ty,
                is_public,
            });
        }
    }

    /// Update an attribute registered on `owner`.
    pub fn update_attr(&mut self, owner: &str, name: &str, ty: Ty, make_public: bool) {
        let entry = self
            .classes
            .get_mut(owner)
            .and_then(|info| info.attrs.iter_mut().find(|a| a.name == name));
        if let Some(entry) = entry {
            entry.ty = ty;
            entry.is_public |= make_public;
        }
    }

    /// Attributes first assigned through `class` itself.
    pub fn own_attrs(&self, class: &str) -> &[AttrEntry] {
        self.classes
            .get(class)
            .map(|info| info.attrs.as_slice())
            .unwrap_or_default()
    }

    // ── Exceptions ─────────────────────────────────────────────────────

    /// Register a custom exception deriving from `base` (`Exception` or a
    /// custom exception).
    pub fn declare_exception(&mut self, name: &str, base: &str) {
        let base = (base != EXCEPTION).then(|| base.to_string());
        self.exceptions.insert(name.to_string(), base);
    }

    /// `Exception` or a declared custom exception.
    pub fn is_exception(&self, name: &str) -> bool {
        name == EXCEPTION || self.exceptions.contains_key(name)
    }

    pub fn is_custom_exception(&self, name: &str) -> bool {
        self.exceptions.contains_key(name)
    }

    /// Whether a handler for `handler` catches a raised `raised`.
    ///
    /// `Exception` catches everything; a custom exception catches itself
    /// and the custom exceptions derived from it.
    pub fn catches(&self, handler: &str, raised: &str) -> bool {
        if handler == EXCEPTION {
            return true;
        }
        let mut current = Some(raised);
        while let Some(name) = current {
            if name == handler {
                return true;
            }
            current = self.exceptions.get(name).and_then(|b| b.as_deref());
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> Hierarchy {
        let mut h = Hierarchy::new();
        h.declare_class("Shape", None);
        h.declare_method("Shape", "area", 0);
        h.declare_method("Shape", "scale", 1);
        h.declare_class("Square", Some("Shape"));
        h.declare_class("Circle", Some("Shape"));
        h
    }

    #[test]
    fn override_shares_the_signature_cell() {
        let mut h = shapes();
        let own = h.declare_method("Square", "area", 0);
        let base = h.method("Shape", "area").unwrap();
        assert!(Rc::ptr_eq(&own, &base.sig));
        assert_eq!(h.method("Square", "area").unwrap().defined_in, "Square");

        own.borrow_mut().ret = Ty::float();
        assert_eq!(h.method("Shape", "area").unwrap().sig.borrow().ret, Ty::float());
        assert_eq!(h.method("Circle", "area").unwrap().sig.borrow().ret, Ty::float());
    }

    #[test]
    fn arity_changing_override_is_separate() {
        let mut h = shapes();
        let own = h.declare_method("Square", "scale", 2);
        assert!(!Rc::ptr_eq(&own, &h.method("Shape", "scale").unwrap().sig));
    }

    #[test]
    fn ancestry() {
        let h = shapes();
        assert!(h.is_subclass("Square", "Shape"));
        assert!(!h.is_subclass("Shape", "Square"));
        assert_eq!(h.common_ancestor("Square", "Circle"), Some("Shape"));
        assert_eq!(h.common_ancestor("Square", "Shape"), Some("Shape"));
        assert_eq!(h.subclasses("Shape"), ["Square".to_string(), "Circle".to_string()]);
    }

    #[test]
    fn attributes_resolve_through_bases() {
        let mut h = shapes();
        h.register_attr("Shape", "name", Ty::string(), false);
        let (owner, entry) = h.attr("Square", "name").unwrap();
        assert_eq!(owner, "Shape");
        assert!(!entry.is_public);
        h.update_attr("Shape", "name", Ty::string(), true);
        assert!(h.attr("Circle", "name").unwrap().1.is_public);
        assert!(h.own_attrs("Square").is_empty());
    }

    #[test]
    fn exception_handlers_catch_descendants() {
        let mut h = Hierarchy::new();
        h.declare_exception("ParseError", "Exception");
        h.declare_exception("EmptyInput", "ParseError");
        assert!(h.catches("Exception", "EmptyInput"));
        assert!(h.catches("ParseError", "EmptyInput"));
        assert!(!h.catches("EmptyInput", "ParseError"));
    }
}
