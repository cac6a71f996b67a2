//! The typed intermediate representation.
//!
//! Every node serializes as a mapping with a `type` tag and, for value and
//! statement nodes, the node's `pseudo_type`. Node categories are closed
//! enums so every consumer matches them exhaustively.

use serde::Serialize;

use crate::ty::Ty;

/// A translated module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "module")]
pub struct Module {
    /// Library namespaces actually used, in first-use order.
    pub dependencies: Vec<String>,
    pub constants: Vec<Constant>,
    pub definitions: Vec<Definition>,
    pub main: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "constant")]
pub struct Constant {
    pub constant: String,
    pub init: Expr,
    pub pseudo_type: Ty,
}

// ── Definitions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Definition {
    Function(FunctionDefinition),
    Class(ClassDefinition),
    Exception(CustomException),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "function_definition")]
pub struct FunctionDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub block: Vec<Stmt>,
    pub pseudo_type: Ty,
    pub return_type: Ty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "method_definition")]
pub struct MethodDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub block: Vec<Stmt>,
    pub pseudo_type: Ty,
    pub return_type: Ty,
    /// The class the body was written in.
    pub this: Expr,
    /// Methods whose name starts with `_` are private.
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "constructor")]
pub struct Constructor {
    pub name: String,
    pub params: Vec<String>,
    pub block: Vec<Stmt>,
    pub pseudo_type: Ty,
    pub return_type: Ty,
    pub this: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "class_definition")]
pub struct ClassDefinition {
    pub name: String,
    pub base: Option<String>,
    /// Attributes first assigned in this class's own methods.
    pub attrs: Vec<ClassAttr>,
    pub methods: Vec<MethodDefinition>,
    pub constructor: Option<Constructor>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "class_attr")]
pub struct ClassAttr {
    pub name: String,
    pub pseudo_type: Ty,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "custom_exception")]
pub struct CustomException {
    pub name: String,
    /// `None` when deriving directly from `Exception`.
    pub base: Option<String>,
}

// ── Expressions ────────────────────────────────────────────────────────

/// A typed expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    #[serde(flatten)]
    pub kind: ExprKind,
    pub pseudo_type: Ty,
}

impl Expr {
    pub fn new(kind: ExprKind, pseudo_type: Ty) -> Self {
        Expr { kind, pseudo_type }
    }

    pub fn int(value: i64) -> Self {
        Expr::new(ExprKind::Int { value }, Ty::int())
    }

    pub fn local(name: impl Into<String>, pseudo_type: Ty) -> Self {
        Expr::new(ExprKind::Local { name: name.into() }, pseudo_type)
    }

    pub fn typename(name: &str) -> Self {
        Expr::new(
            ExprKind::Typename {
                name: name.to_string(),
            },
            Ty::atom(name),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExprKind {
    Int {
        value: i64,
    },
    Float {
        value: f64,
    },
    String {
        value: String,
    },
    Boolean {
        value: bool,
    },
    Null,
    /// A compiled regular expression literal.
    Regex {
        value: String,
    },
    Local {
        name: String,
    },
    This,
    Typename {
        name: String,
    },
    /// An attribute of the receiver inside a method body.
    InstanceVariable {
        name: String,
    },
    Attr {
        object: Box<Expr>,
        attr: String,
    },
    Index {
        sequence: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        message: String,
        args: Vec<Expr>,
    },
    ThisMethodCall {
        message: String,
        args: Vec<Expr>,
    },
    StandardCall {
        namespace: String,
        function: String,
        args: Vec<Expr>,
    },
    StandardMethodCall {
        receiver: Box<Expr>,
        message: String,
        args: Vec<Expr>,
    },
    NewInstance {
        class: Box<Expr>,
        params: Vec<Expr>,
    },
    BinaryOp {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: String,
        value: Box<Expr>,
    },
    Comparison {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    List {
        elements: Vec<Expr>,
    },
    Set {
        elements: Vec<Expr>,
    },
    Tuple {
        elements: Vec<Expr>,
    },
    Array {
        elements: Vec<Expr>,
    },
    Dictionary {
        pairs: Vec<Pair>,
    },
    /// `map` / `filter_map` over a sequence, from a list comprehension.
    StandardIterableCall {
        function: String,
        sequences: Box<Sequence>,
        iterators: Box<Iterators>,
        #[serde(skip_serializing_if = "Option::is_none")]
        test: Option<Box<Expr>>,
        block: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "pair")]
pub struct Pair {
    pub key: Expr,
    pub value: Expr,
}

// ── Iteration ──────────────────────────────────────────────────────────

/// What a loop or comprehension iterates over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Sequence {
    ForSequence { sequence: Expr },
    ForSequenceWithIndex { sequence: Expr },
    ForSequenceWithItems { sequence: Expr },
    ForSequenceZip { sequences: Vec<Expr> },
}

/// The loop variables bound on each iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Iterators {
    ForIterator { iterator: Expr },
    ForIteratorWithIndex { index: Expr, iterator: Expr },
    ForIteratorWithItems { key: Expr, value: Expr },
    ForIteratorZip { iterators: Vec<Expr> },
}

// ── Statements ─────────────────────────────────────────────────────────

/// A statement in a block: either a bare expression or a statement node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Stmt {
    Expr(Expr),
    Node(Statement),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    #[serde(flatten)]
    pub kind: StmtKind,
    pub pseudo_type: Ty,
}

impl Statement {
    /// A statement node whose own type is `Void`.
    pub fn void(kind: StmtKind) -> Self {
        Statement {
            kind,
            pseudo_type: Ty::void(),
        }
    }
}

impl From<Statement> for Stmt {
    fn from(statement: Statement) -> Self {
        Stmt::Node(statement)
    }
}

impl From<Expr> for Stmt {
    fn from(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StmtKind {
    LocalAssignment {
        local: String,
        value: Expr,
        value_type: Ty,
    },
    InstanceAssignment {
        name: String,
        value: Expr,
        value_type: Ty,
    },
    AttrAssignment {
        attr: Expr,
        value: Expr,
        value_type: Ty,
    },
    IndexAssignment {
        sequence: Expr,
        index: Expr,
        value: Expr,
        value_type: Ty,
    },
    ExplicitReturn {
        value: Expr,
    },
    /// A return in tail position of its body.
    ImplicitReturn {
        value: Expr,
    },
    IfStatement {
        test: Expr,
        block: Vec<Stmt>,
        otherwise: Option<Box<Statement>>,
    },
    ElseifStatement {
        test: Expr,
        block: Vec<Stmt>,
        otherwise: Option<Box<Statement>>,
    },
    ElseStatement {
        block: Vec<Stmt>,
    },
    WhileStatement {
        test: Expr,
        block: Vec<Stmt>,
    },
    ForStatement {
        sequences: Sequence,
        iterators: Iterators,
        block: Vec<Stmt>,
    },
    ForRangeStatement {
        start: Expr,
        end: Expr,
        step: Expr,
        index: Expr,
        block: Vec<Stmt>,
    },
    TryStatement {
        block: Vec<Stmt>,
        handlers: Vec<ExceptionHandler>,
    },
    ThrowStatement {
        exception: String,
        value: Expr,
    },
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "exception_handler")]
pub struct ExceptionHandler {
    pub exception: String,
    /// `true` for handlers of the builtin `Exception`, which catch every
    /// exception including custom ones.
    pub is_builtin: bool,
    pub instance: Option<String>,
    pub block: Vec<Stmt>,
    pub pseudo_type: Ty,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expression_statement_serializes_bare() {
        let stmt = Stmt::from(Expr::int(3));
        assert_eq!(
            serde_json::to_value(&stmt).unwrap(),
            json!({"type": "int", "value": 3, "pseudo_type": "Int"})
        );
    }

    #[test]
    fn unit_statements_carry_void() {
        let stmt = Stmt::from(Statement::void(StmtKind::Break));
        assert_eq!(
            serde_json::to_value(&stmt).unwrap(),
            json!({"type": "break", "pseudo_type": "Void"})
        );
    }

    #[test]
    fn if_chain_nests_otherwise() {
        let stmt = Statement::void(StmtKind::IfStatement {
            test: Expr::new(ExprKind::Boolean { value: true }, Ty::boolean()),
            block: vec![],
            otherwise: Some(Box::new(Statement::void(StmtKind::ElseStatement { block: vec![] }))),
        });
        assert_eq!(
            serde_json::to_value(&stmt).unwrap(),
            json!({
                "type": "if_statement",
                "test": {"type": "boolean", "value": true, "pseudo_type": "Boolean"},
                "block": [],
                "otherwise": {"type": "else_statement", "block": [], "pseudo_type": "Void"},
                "pseudo_type": "Void"
            })
        );
    }

    #[test]
    fn definitions_are_tagged() {
        let exc = Definition::Exception(CustomException {
            name: "Oops".into(),
            base: None,
        });
        assert_eq!(
            serde_json::to_value(&exc).unwrap(),
            json!({"type": "custom_exception", "name": "Oops", "base": null})
        );
    }
}
