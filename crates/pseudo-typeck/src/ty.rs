//! Pseudo-type representation.
//!
//! A pseudo-type is either an atom (`Int`, `String`, a user class name, ...)
//! or a parametric constructor applied to parameters (`List[Int]`,
//! `Function[Int, Float]`). Parameters may still be unresolved holes while
//! inference is in progress. Three further forms (`Any`, `Number` and the
//! generic placeholders `@t`/`@k`/`@v`) only appear inside standard API
//! signatures and never describe a value.

use std::fmt;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeSeq, Serializer};

/// A generic placeholder declared by an API signature, bound from the
/// receiver's own parametric type at check time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Generic {
    /// Element type of a `List`, `Set` or `Array`.
    T,
    /// Key type of a `Dictionary`.
    K,
    /// Value type of a `Dictionary`.
    V,
}

impl Generic {
    pub fn name(self) -> &'static str {
        match self {
            Generic::T => "@t",
            Generic::K => "@k",
            Generic::V => "@v",
        }
    }
}

/// A pseudo-type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A named atom: a builtin scalar, `Void`, or a user class.
    Atom(String),
    List(Box<Ty>),
    Dictionary(Box<Ty>, Box<Ty>),
    Set(Box<Ty>),
    /// A fixed-length homogeneous sequence.
    Array(Box<Ty>, usize),
    /// A heterogeneous fixed-length sequence.
    Tuple(Vec<Ty>),
    /// Parameter types followed by the return type.
    Function(Vec<Ty>, Box<Ty>),
    /// A slot whose type is not inferred yet.
    Hole,
    /// Signature-only: accepts any argument.
    Any,
    /// Signature-only: accepts `Int` or `Float`.
    Number,
    /// Signature-only: a receiver-bound placeholder.
    Generic(Generic),
}

pub const INT: &str = "Int";
pub const FLOAT: &str = "Float";
pub const STRING: &str = "String";
pub const BOOLEAN: &str = "Boolean";
pub const VOID: &str = "Void";
pub const REGEXP: &str = "Regexp";
pub const REGEXP_MATCH: &str = "RegexpMatch";
pub const EXCEPTION: &str = "Exception";

impl Ty {
    pub fn atom(name: impl Into<String>) -> Ty {
        Ty::Atom(name.into())
    }

    pub fn int() -> Ty {
        Ty::atom(INT)
    }

    pub fn float() -> Ty {
        Ty::atom(FLOAT)
    }

    pub fn string() -> Ty {
        Ty::atom(STRING)
    }

    pub fn boolean() -> Ty {
        Ty::atom(BOOLEAN)
    }

    pub fn void() -> Ty {
        Ty::atom(VOID)
    }

    pub fn list(elem: Ty) -> Ty {
        Ty::List(Box::new(elem))
    }

    pub fn dictionary(key: Ty, value: Ty) -> Ty {
        Ty::Dictionary(Box::new(key), Box::new(value))
    }

    pub fn set(elem: Ty) -> Ty {
        Ty::Set(Box::new(elem))
    }

    pub fn array(elem: Ty, len: usize) -> Ty {
        Ty::Array(Box::new(elem), len)
    }

    pub fn function(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Function(params, Box::new(ret))
    }

    /// The head constructor of a parametric type, or the atom itself.
    ///
    /// This is the key used to dispatch into the standard API tables.
    pub fn general_type(&self) -> &str {
        match self {
            Ty::Atom(name) => name,
            Ty::List(_) => "List",
            Ty::Dictionary(..) => "Dictionary",
            Ty::Set(_) => "Set",
            Ty::Array(..) => "Array",
            Ty::Tuple(_) => "Tuple",
            Ty::Function(..) => "Function",
            Ty::Hole => "?",
            Ty::Any => "Any",
            Ty::Number => "Number",
            Ty::Generic(g) => g.name(),
        }
    }

    pub fn is_atom(&self, name: &str) -> bool {
        matches!(self, Ty::Atom(n) if n == name)
    }

    pub fn is_number(&self) -> bool {
        self.is_atom(INT) || self.is_atom(FLOAT)
    }

    /// Whether any slot, at any depth, is still unresolved.
    pub fn has_holes(&self) -> bool {
        match self {
            Ty::Hole => true,
            Ty::List(t) | Ty::Set(t) | Ty::Array(t, _) => t.has_holes(),
            Ty::Dictionary(k, v) => k.has_holes() || v.has_holes(),
            Ty::Tuple(ts) => ts.iter().any(Ty::has_holes),
            Ty::Function(ps, r) => ps.iter().any(Ty::has_holes) || r.has_holes(),
            Ty::Atom(_) | Ty::Any | Ty::Number | Ty::Generic(_) => false,
        }
    }

    /// The return slot of a `Function`, `None` for any other type.
    pub fn return_type(&self) -> Option<&Ty> {
        match self {
            Ty::Function(_, ret) => Some(ret),
            _ => None,
        }
    }

    /// Element type produced by iterating a value of this type.
    pub fn element_type(&self) -> Option<Ty> {
        match self {
            Ty::List(t) | Ty::Set(t) | Ty::Array(t, _) => Some((**t).clone()),
            Ty::Dictionary(k, _) => Some((**k).clone()),
            Ty::Atom(name) if name == STRING => Some(Ty::string()),
            _ => None,
        }
    }

    /// Fill this type's holes from `evidence`, slot by slot.
    ///
    /// Resolved slots are kept even where the evidence disagrees; the
    /// checker is responsible for rejecting such pairs.
    pub fn fill_holes(&self, evidence: &Ty) -> Ty {
        match (self, evidence) {
            (Ty::Hole, _) => evidence.clone(),
            (Ty::List(a), Ty::List(b)) => Ty::list(a.fill_holes(b)),
            (Ty::Set(a), Ty::Set(b)) => Ty::set(a.fill_holes(b)),
            (Ty::Array(a, n), Ty::Array(b, _)) => Ty::array(a.fill_holes(b), *n),
            (Ty::Dictionary(k1, v1), Ty::Dictionary(k2, v2)) => {
                Ty::dictionary(k1.fill_holes(k2), v1.fill_holes(v2))
            }
            (Ty::Tuple(a), Ty::Tuple(b)) if a.len() == b.len() => {
                Ty::Tuple(a.iter().zip(b).map(|(x, y)| x.fill_holes(y)).collect())
            }
            (Ty::Function(p1, r1), Ty::Function(p2, r2)) if p1.len() == p2.len() => Ty::function(
                p1.iter().zip(p2).map(|(x, y)| x.fill_holes(y)).collect(),
                r1.fill_holes(r2),
            ),
            _ => self.clone(),
        }
    }

    /// Replace generic placeholders with their bindings.
    ///
    /// Unbound placeholders are left in place.
    pub fn substitute(&self, generics: &Generics) -> Ty {
        match self {
            Ty::Generic(g) => generics.get(*g).cloned().unwrap_or(Ty::Generic(*g)),
            Ty::List(t) => Ty::list(t.substitute(generics)),
            Ty::Set(t) => Ty::set(t.substitute(generics)),
            Ty::Array(t, n) => Ty::array(t.substitute(generics), *n),
            Ty::Dictionary(k, v) => Ty::dictionary(k.substitute(generics), v.substitute(generics)),
            Ty::Tuple(ts) => Ty::Tuple(ts.iter().map(|t| t.substitute(generics)).collect()),
            Ty::Function(ps, r) => Ty::function(
                ps.iter().map(|p| p.substitute(generics)).collect(),
                r.substitute(generics),
            ),
            other => other.clone(),
        }
    }
}

/// Bindings of the generic placeholders for one signature check.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Generics {
    t: Option<Ty>,
    k: Option<Ty>,
    v: Option<Ty>,
}

impl Generics {
    /// Bind the placeholders from a receiver's own parametric type:
    /// `List[Int]` binds `@t = Int`, `Dictionary[String, Float]` binds
    /// `@k = String, @v = Float`.
    pub fn from_receiver(receiver: &Ty) -> Self {
        match receiver {
            Ty::List(t) | Ty::Set(t) | Ty::Array(t, _) => Generics {
                t: Some((**t).clone()),
                ..Generics::default()
            },
            Ty::Dictionary(k, v) => Generics {
                k: Some((**k).clone()),
                v: Some((**v).clone()),
                ..Generics::default()
            },
            _ => Generics::default(),
        }
    }

    pub fn get(&self, generic: Generic) -> Option<&Ty> {
        match generic {
            Generic::T => self.t.as_ref(),
            Generic::K => self.k.as_ref(),
            Generic::V => self.v.as_ref(),
        }
    }

    pub fn bind(&mut self, generic: Generic, ty: Ty) {
        let slot = match generic {
            Generic::T => &mut self.t,
            Generic::K => &mut self.k,
            Generic::V => &mut self.v,
        };
        *slot = Some(ty);
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_none() && self.k.is_none() && self.v.is_none()
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

fn write_params(f: &mut fmt::Formatter<'_>, head: &str, params: &[&Ty]) -> fmt::Result {
    write!(f, "{}[", head)?;
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", p)?;
    }
    write!(f, "]")
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Atom(name) => write!(f, "{}", name),
            Ty::List(t) => write_params(f, "List", &[t]),
            Ty::Set(t) => write_params(f, "Set", &[t]),
            Ty::Dictionary(k, v) => write_params(f, "Dictionary", &[k, v]),
            Ty::Array(t, n) => write!(f, "Array[{}, {}]", t, n),
            Ty::Tuple(ts) => write_params(f, "Tuple", &ts.iter().collect::<Vec<_>>()),
            Ty::Function(ps, r) => {
                let mut all: Vec<&Ty> = ps.iter().collect();
                all.push(r);
                write_params(f, "Function", &all)
            }
            Ty::Hole => write!(f, "?"),
            Ty::Any | Ty::Number | Ty::Generic(_) => write!(f, "{}", self.general_type()),
        }
    }
}

/// The IR form: atoms are strings, parametric types are
/// `[head, params...]`, holes are `null`.
impl Serialize for Ty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let head = self.general_type();
        match self {
            Ty::Hole => serializer.serialize_none(),
            Ty::Atom(_) | Ty::Any | Ty::Number | Ty::Generic(_) => serializer.serialize_str(head),
            Ty::Array(t, n) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(head)?;
                seq.serialize_element(t)?;
                seq.serialize_element(n)?;
                seq.end()
            }
            Ty::List(t) | Ty::Set(t) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(head)?;
                seq.serialize_element(t)?;
                seq.end()
            }
            Ty::Dictionary(k, v) => {
                let mut seq = serializer.serialize_seq(Some(3))?;
                seq.serialize_element(head)?;
                seq.serialize_element(k)?;
                seq.serialize_element(v)?;
                seq.end()
            }
            Ty::Tuple(ts) => {
                let mut seq = serializer.serialize_seq(Some(ts.len() + 1))?;
                seq.serialize_element(head)?;
                for t in ts {
                    seq.serialize_element(t)?;
                }
                seq.end()
            }
            Ty::Function(ps, r) => {
                let mut seq = serializer.serialize_seq(Some(ps.len() + 2))?;
                seq.serialize_element(head)?;
                for p in ps {
                    seq.serialize_element(p)?;
                }
                seq.serialize_element(r)?;
                seq.end()
            }
        }
    }
}

// ── Parsing ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pseudo-type `{input}`: {reason}")]
pub struct ParseTyError {
    pub input: String,
    pub reason: String,
}

/// Parses the rendered form back: `List[@t]`, `Dictionary[String, Int]`,
/// `Array[Int, 3]`, `Function[Int, Void]`, `Number`, `?`.
impl FromStr for Ty {
    type Err = ParseTyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| ParseTyError {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        let mut parser = TyParser { src: s, pos: 0 };
        let ty = parser.ty().map_err(|r| fail(&r))?;
        parser.skip_ws();
        if parser.pos != s.len() {
            return Err(fail("trailing input"));
        }
        Ok(ty)
    }
}

struct TyParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> TyParser<'a> {
    fn skip_ws(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> &'a str {
        self.skip_ws();
        let rest = &self.src[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '@' || c == '?'))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn params(&mut self) -> Result<Vec<Ty>, String> {
        let mut params = Vec::new();
        if !self.eat('[') {
            return Ok(params);
        }
        loop {
            params.push(self.ty()?);
            if self.eat(']') {
                return Ok(params);
            }
            if !self.eat(',') {
                return Err("expected `,` or `]`".to_string());
            }
        }
    }

    fn ty(&mut self) -> Result<Ty, String> {
        let head = self.word();
        let one = |mut ps: Vec<Ty>, head: &str| -> Result<Ty, String> {
            if ps.len() != 1 {
                return Err(format!("{} takes one parameter", head));
            }
            Ok(ps.remove(0))
        };
        match head {
            "" => Err("expected a type".to_string()),
            "?" => Ok(Ty::Hole),
            "Any" => Ok(Ty::Any),
            "Number" => Ok(Ty::Number),
            "@t" => Ok(Ty::Generic(Generic::T)),
            "@k" => Ok(Ty::Generic(Generic::K)),
            "@v" => Ok(Ty::Generic(Generic::V)),
            "List" => Ok(Ty::list(one(self.params()?, head)?)),
            "Set" => Ok(Ty::set(one(self.params()?, head)?)),
            "Dictionary" => {
                let mut ps = self.params()?;
                if ps.len() != 2 {
                    return Err("Dictionary takes two parameters".to_string());
                }
                let v = ps.remove(1);
                Ok(Ty::dictionary(ps.remove(0), v))
            }
            "Array" => {
                if !self.eat('[') {
                    return Err("Array takes an element type and a length".to_string());
                }
                let elem = self.ty()?;
                if !self.eat(',') {
                    return Err("Array takes an element type and a length".to_string());
                }
                let len = self
                    .word()
                    .parse::<usize>()
                    .map_err(|_| "Array length must be an integer".to_string())?;
                if !self.eat(']') {
                    return Err("expected `]`".to_string());
                }
                Ok(Ty::array(elem, len))
            }
            "Tuple" => Ok(Ty::Tuple(self.params()?)),
            "Function" => {
                let mut ps = self.params()?;
                let ret = ps.pop().ok_or("Function needs a return type")?;
                Ok(Ty::function(ps, ret))
            }
            atom if atom.starts_with(|c: char| c.is_alphabetic()) => Ok(Ty::atom(atom)),
            other => Err(format!("unexpected `{}`", other)),
        }
    }
}
