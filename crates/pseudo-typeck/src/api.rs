//! Standard API tables.
//!
//! The tables say which source-level functions, methods and operators the
//! translator recognizes and how each one expands into a canonical
//! standard call. They are plain data: a backend can start from
//! [`ApiTables::standard`] and swap entries (see `config`) without touching
//! the translator.
//!
//! Signatures are written in the rendered pseudo-type form. The last type
//! is the return type; a leading `*` on the only parameter makes the
//! signature variadic. `@t`, `@k` and `@v` are bound from the receiver.

use std::collections::BTreeMap;

use crate::ty::{ParseTyError, Ty, FLOAT, INT, STRING};

/// Namespace of the builtin free functions.
pub const GLOBAL: &str = "global";

/// How one recognized call expands into IR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// A `standard_call` of `namespace:function` with the call's arguments.
    Call { namespace: String, function: String },
    /// A `standard_method_call` of `message`, typed against `ty`'s
    /// signatures. The first argument is the receiver.
    Method { ty: String, message: String },
    /// Like `Method`, but the first argument becomes the sole argument and
    /// the second the receiver: `sep.join(items)` is `items.join(sep)`.
    Swapped { ty: String, message: String },
    /// `length` of any sized receiver.
    Length,
    /// `re.compile`: a string literal becomes a regex literal.
    Regex,
}

impl Expansion {
    pub fn call(namespace: &str, function: &str) -> Self {
        Expansion::Call {
            namespace: namespace.to_string(),
            function: function.to_string(),
        }
    }

    pub fn method(ty: &str, message: &str) -> Self {
        Expansion::Method {
            ty: ty.to_string(),
            message: message.to_string(),
        }
    }

    pub fn swapped(ty: &str, message: &str) -> Self {
        Expansion::Swapped {
            ty: ty.to_string(),
            message: message.to_string(),
        }
    }
}

/// A table entry: one expansion, or one per accepted arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiEntry {
    Fixed(Expansion),
    ByArity(BTreeMap<usize, Expansion>),
}

impl ApiEntry {
    /// The expansion for a call with `arity` arguments (receiver excluded).
    pub fn select(&self, arity: usize) -> Option<&Expansion> {
        match self {
            ApiEntry::Fixed(expansion) => Some(expansion),
            ApiEntry::ByArity(by_arity) => by_arity.get(&arity),
        }
    }
}

impl From<Expansion> for ApiEntry {
    fn from(expansion: Expansion) -> Self {
        ApiEntry::Fixed(expansion)
    }
}

/// A typed signature of a canonical standard function or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSignature {
    pub params: Vec<Ty>,
    pub ret: Ty,
    /// The single parameter repeats for every argument.
    pub variadic: bool,
}

impl ApiSignature {
    /// Parse a signature from its rendered types, return type last.
    pub fn parse<S: AsRef<str>>(types: &[S]) -> Result<Self, ParseTyError> {
        let Some((ret, params)) = types.split_last() else {
            return Err(ParseTyError {
                input: String::new(),
                reason: "a signature needs at least a return type".to_string(),
            });
        };
        let mut variadic = false;
        let mut parsed = Vec::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            let p = p.as_ref();
            match p.strip_prefix('*') {
                Some(rest) if i == 0 && params.len() == 1 => {
                    variadic = true;
                    parsed.push(rest.parse()?);
                }
                Some(_) => {
                    return Err(ParseTyError {
                        input: p.to_string(),
                        reason: "only a lone parameter can be variadic".to_string(),
                    })
                }
                None => parsed.push(p.parse()?),
            }
        }
        Ok(ApiSignature {
            params: parsed,
            ret: ret.as_ref().parse()?,
            variadic,
        })
    }

    /// `Param Param -> Ret`, for suggestions.
    pub fn describe(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                if self.variadic {
                    format!("*{}", p)
                } else {
                    p.to_string()
                }
            })
            .collect();
        format!("{} -> {}", params.join(" "), self.ret).trim_start().to_string()
    }
}

/// The complete set of standard API tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiTables {
    /// namespace -> source function name -> entry.
    pub functions: BTreeMap<String, BTreeMap<String, ApiEntry>>,
    /// general type -> source method name -> entry.
    pub methods: BTreeMap<String, BTreeMap<String, ApiEntry>>,
    /// general type -> operator symbol -> message, for operators that are
    /// not primitive on that type.
    pub operators: BTreeMap<String, BTreeMap<String, String>>,
    /// namespace or general type -> canonical name -> signature.
    pub signatures: BTreeMap<String, BTreeMap<String, ApiSignature>>,
}

impl Default for ApiTables {
    fn default() -> Self {
        Self::standard()
    }
}

impl ApiTables {
    /// Tables with no entries at all.
    pub fn empty() -> Self {
        ApiTables {
            functions: BTreeMap::new(),
            methods: BTreeMap::new(),
            operators: BTreeMap::new(),
            signatures: BTreeMap::new(),
        }
    }

    pub fn function(&self, namespace: &str, name: &str) -> Option<&ApiEntry> {
        self.functions.get(namespace)?.get(name)
    }

    pub fn method(&self, ty: &str, name: &str) -> Option<&ApiEntry> {
        self.methods.get(ty)?.get(name)
    }

    pub fn operator_message(&self, ty: &str, op: &str) -> Option<&str> {
        self.operators.get(ty)?.get(op).map(String::as_str)
    }

    pub fn signature(&self, owner: &str, name: &str) -> Option<&ApiSignature> {
        self.signatures.get(owner)?.get(name)
    }

    /// Whether `namespace` is an importable library namespace.
    pub fn is_library(&self, namespace: &str) -> bool {
        namespace != GLOBAL && self.functions.contains_key(namespace)
    }

    /// Whether values of this general type have standard methods.
    pub fn has_methods(&self, ty: &str) -> bool {
        self.methods.contains_key(ty)
    }

    pub fn library_names(&self) -> Vec<&str> {
        self.functions
            .keys()
            .map(String::as_str)
            .filter(|ns| *ns != GLOBAL)
            .collect()
    }

    /// One `name signature` line per known method or function, for hints.
    pub fn describe(&self, table: &BTreeMap<String, BTreeMap<String, ApiEntry>>, owner: &str) -> String {
        let Some(entries) = table.get(owner) else {
            return String::new();
        };
        let mut lines = Vec::new();
        for (name, entry) in entries {
            let expansions: Vec<&Expansion> = match entry {
                ApiEntry::Fixed(e) => vec![e],
                ApiEntry::ByArity(by_arity) => by_arity.values().collect(),
            };
            for expansion in expansions {
                let sig = match expansion {
                    Expansion::Call {
                        namespace,
                        function,
                    } => self.signature(namespace, function).map(ApiSignature::describe),
                    Expansion::Method { ty, message } | Expansion::Swapped { ty, message } => {
                        self.signature(ty, message).map(ApiSignature::describe)
                    }
                    Expansion::Length => Some("-> Int".to_string()),
                    Expansion::Regex => Some("String -> Regexp".to_string()),
                };
                lines.push(format!("  {} {}", name, sig.unwrap_or_default()));
            }
        }
        lines.join("\n")
    }

    /// The default tables.
    pub fn standard() -> Self {
        let mut api = ApiTables::empty();

        // ── Free functions ──
        api.add_function(GLOBAL, "print", Expansion::call("io", "display"));
        api.add_function(GLOBAL, "input", Expansion::call("io", "read"));
        api.add_function(GLOBAL, "str", Expansion::call(GLOBAL, "to_string"));
        api.add_function(GLOBAL, "int", Expansion::call(GLOBAL, "to_int"));
        api.add_function(GLOBAL, "float", Expansion::call(GLOBAL, "to_float"));
        api.add_function(GLOBAL, "exit", Expansion::call(GLOBAL, "exit"));
        api.add_function(GLOBAL, "len", Expansion::Length);

        api.add_function_by_arity(
            "math",
            "log",
            [(1, Expansion::call("math", "ln")), (2, Expansion::call("math", "log"))],
        );
        for f in ["sin", "cos", "tan", "sqrt"] {
            api.add_function("math", f, Expansion::call("math", f));
        }

        api.add_function("re", "match", Expansion::method("Regexp", "match"));
        api.add_function("re", "sub", Expansion::method("Regexp", "replace"));
        api.add_function("re", "compile", Expansion::Regex);
        api.add_function("re", "escape", Expansion::call("regexp", "escape"));

        // ── Methods ──
        api.add_method("String", "split", Expansion::method("String", "split"));
        api.add_method("String", "find", Expansion::method("String", "find"));
        api.add_method("String", "upper", Expansion::method("String", "to_upper"));
        api.add_method("String", "lower", Expansion::method("String", "to_lower"));
        api.add_method("String", "join", Expansion::swapped("List", "join"));

        api.add_method("List", "append", Expansion::method("List", "push"));
        api.add_method("List", "pop", Expansion::method("List", "pop"));
        api.add_method("List", "remove", Expansion::method("List", "remove"));
        api.add_method_by_arity(
            "List",
            "insert",
            [
                (1, Expansion::method("List", "insert")),
                (2, Expansion::method("List", "insert_at")),
            ],
        );

        api.add_method("Dictionary", "keys", Expansion::method("Dictionary", "keys"));
        api.add_method("Dictionary", "values", Expansion::method("Dictionary", "values"));

        api.add_method("Set", "add", Expansion::method("Set", "add"));
        api.add_method("Set", "remove", Expansion::method("Set", "remove"));
        api.add_method("Set", "union", Expansion::method("Set", "union"));
        api.add_method("Set", "intersection", Expansion::method("Set", "intersection"));

        api.add_method("Array", "index", Expansion::method("Array", "index"));
        api.add_method("Array", "count", Expansion::method("Array", "count"));
        api.methods.entry("Tuple".to_string()).or_default();

        api.add_method("Regexp", "match", Expansion::method("Regexp", "match"));
        api.add_method("Regexp", "sub", Expansion::method("Regexp", "replace"));
        api.add_method("RegexpMatch", "group", Expansion::method("RegexpMatch", "group"));

        // ── Operators ──
        for (op, message) in [("+", "concat"), ("*", "repeat"), ("%", "c_format")] {
            api.add_operator("String", op, message);
        }
        for (op, message) in [("+", "push_many"), ("*", "repeat")] {
            api.add_operator("List", op, message);
        }
        for (op, message) in [("|", "union"), ("&", "intersection"), ("^", "symmetric_diff"), ("-", "diff")] {
            api.add_operator("Set", op, message);
        }

        // ── Signatures ──
        let signatures: &[(&str, &str, &[&str])] = &[
            (GLOBAL, "to_string", &["Any", "String"]),
            (GLOBAL, "to_int", &["Any", "Int"]),
            (GLOBAL, "to_float", &["Any", "Float"]),
            (GLOBAL, "exit", &["Int", "Void"]),
            ("io", "display", &["*Any", "Void"]),
            ("io", "read", &["String"]),
            ("io", "read_file", &["String", "String"]),
            ("io", "write_file", &["String", "String", "Void"]),
            ("math", "ln", &["Number", "Float"]),
            ("math", "log", &["Number", "Number", "Float"]),
            ("math", "sin", &["Number", "Float"]),
            ("math", "cos", &["Number", "Float"]),
            ("math", "tan", &["Number", "Float"]),
            ("math", "sqrt", &["Number", "Float"]),
            ("regexp", "compile", &["String", "Regexp"]),
            ("regexp", "escape", &["String", "String"]),
            ("String", "split", &["String", "List[String]"]),
            ("String", "find", &["String", "Int"]),
            ("String", "to_upper", &["String"]),
            ("String", "to_lower", &["String"]),
            ("String", "concat", &["String", "String"]),
            ("String", "repeat", &["Int", "String"]),
            ("String", "c_format", &["Any", "String"]),
            ("String", "length", &["Int"]),
            ("String", "slice", &["Int", "Int", "String"]),
            ("String", "slice_from", &["Int", "String"]),
            ("String", "slice_to", &["Int", "String"]),
            ("List", "push", &["@t", "Void"]),
            ("List", "pop", &["@t"]),
            ("List", "remove", &["@t", "Void"]),
            ("List", "insert", &["@t", "Void"]),
            ("List", "insert_at", &["@t", "Int", "Void"]),
            ("List", "join", &["String", "String"]),
            ("List", "push_many", &["List[@t]", "List[@t]"]),
            ("List", "repeat", &["Int", "List[@t]"]),
            ("List", "length", &["Int"]),
            ("List", "slice", &["Int", "Int", "List[@t]"]),
            ("List", "slice_from", &["Int", "List[@t]"]),
            ("List", "slice_to", &["Int", "List[@t]"]),
            ("Dictionary", "keys", &["List[@k]"]),
            ("Dictionary", "values", &["List[@v]"]),
            ("Dictionary", "length", &["Int"]),
            ("Set", "add", &["@t", "Void"]),
            ("Set", "remove", &["@t", "Void"]),
            ("Set", "union", &["Set[@t]", "Set[@t]"]),
            ("Set", "intersection", &["Set[@t]", "Set[@t]"]),
            ("Set", "symmetric_diff", &["Set[@t]", "Set[@t]"]),
            ("Set", "diff", &["Set[@t]", "Set[@t]"]),
            ("Set", "length", &["Int"]),
            ("Array", "index", &["@t", "Int"]),
            ("Array", "count", &["@t", "Int"]),
            ("Array", "length", &["Int"]),
            ("Tuple", "length", &["Int"]),
            ("Regexp", "match", &["String", "RegexpMatch"]),
            ("Regexp", "replace", &["String", "String", "String"]),
            ("RegexpMatch", "group", &["Int", "String"]),
            ("RegexpMatch", "has_match", &["Boolean"]),
        ];
        for &(owner, name, types) in signatures {
            let sig = ApiSignature::parse(types).expect("builtin signatures should parse");
            api.add_signature(owner, name, sig);
        }

        api
    }

    pub fn add_function(&mut self, namespace: &str, name: &str, expansion: Expansion) {
        self.functions
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), expansion.into());
    }

    pub fn add_function_by_arity(
        &mut self,
        namespace: &str,
        name: &str,
        by_arity: impl IntoIterator<Item = (usize, Expansion)>,
    ) {
        self.functions
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), ApiEntry::ByArity(by_arity.into_iter().collect()));
    }

    pub fn add_method(&mut self, ty: &str, name: &str, expansion: Expansion) {
        self.methods
            .entry(ty.to_string())
            .or_default()
            .insert(name.to_string(), expansion.into());
    }

    pub fn add_method_by_arity(
        &mut self,
        ty: &str,
        name: &str,
        by_arity: impl IntoIterator<Item = (usize, Expansion)>,
    ) {
        self.methods
            .entry(ty.to_string())
            .or_default()
            .insert(name.to_string(), ApiEntry::ByArity(by_arity.into_iter().collect()));
    }

    pub fn add_operator(&mut self, ty: &str, op: &str, message: &str) {
        self.operators
            .entry(ty.to_string())
            .or_default()
            .insert(op.to_string(), message.to_string());
    }

    pub fn add_signature(&mut self, owner: &str, name: &str, sig: ApiSignature) {
        self.signatures
            .entry(owner.to_string())
            .or_default()
            .insert(name.to_string(), sig);
    }
}

// ── Operator typing ────────────────────────────────────────────────────

fn numeric(left: &Ty, right: &Ty) -> Option<Ty> {
    match (left, right) {
        (Ty::Atom(l), Ty::Atom(r)) if l == INT && r == INT => Some(Ty::int()),
        _ if left.is_number() && right.is_number() => Some(Ty::float()),
        _ => None,
    }
}

/// Two containers of one constructor whose holes fill each other.
fn same_container(left: &Ty, right: &Ty, head: &str) -> Option<Ty> {
    if left.general_type() != head || right.general_type() != head {
        return None;
    }
    let merged = left.fill_holes(right);
    (merged == right.fill_holes(left)).then_some(merged)
}

fn is_sequence(ty: &Ty) -> bool {
    matches!(ty, Ty::List(_)) || ty.is_atom(STRING)
}

/// Result type of `left op right`, or `None` when the operand types do not
/// support the operator.
///
/// Only `Int` and `Float` results stay primitive; every other result is
/// expressed as a standard method call through the operator table.
pub fn binary_result(op: &str, left: &Ty, right: &Ty) -> Option<Ty> {
    match op {
        "+" => numeric(left, right)
            .or_else(|| (left.is_atom(STRING) && right.is_atom(STRING)).then(Ty::string))
            .or_else(|| same_container(left, right, "List")),
        "-" => numeric(left, right).or_else(|| same_container(left, right, "Set")),
        "*" => numeric(left, right).or_else(|| match (left, right) {
            (l, r) if l.is_atom(INT) && is_sequence(r) => Some(r.clone()),
            (l, r) if r.is_atom(INT) && is_sequence(l) => Some(l.clone()),
            _ => None,
        }),
        "/" | "**" => numeric(left, right),
        "%" => match (left, right) {
            (l, r) if l.is_atom(INT) && r.is_atom(INT) => Some(Ty::int()),
            (l, r) if l.is_atom(STRING) && r.is_atom(STRING) => Some(Ty::string()),
            (l, Ty::Array(elem, _)) if l.is_atom(STRING) && elem.is_atom(STRING) => Some(Ty::string()),
            _ => None,
        },
        "|" | "&" | "^" => same_container(left, right, "Set"),
        _ => None,
    }
}

/// Whether `op` is an arithmetic or set operator the translator handles.
pub fn is_supported_operator(op: &str) -> bool {
    matches!(op, "+" | "-" | "*" | "/" | "**" | "%" | "|" | "&" | "^")
}

/// Whether a result of this type is produced by a primitive operator.
pub fn is_primitive_result(ty: &Ty) -> bool {
    ty.is_atom(INT) || ty.is_atom(FLOAT)
}
