//! Constructor helpers for assembling trees by hand.
//!
//! Every helper produces a node at `1:0`; chain [`Expr::at`] or
//! [`Stmt::at`] to place it elsewhere when a position matters.

use pseudo_common::Pos;

use crate::ast::*;

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            pos: Pos::new(1, 0),
        }
    }

    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.pos = Pos::new(line, col);
        self
    }
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Stmt {
            kind,
            pos: Pos::new(1, 0),
        }
    }

    pub fn at(mut self, line: u32, col: u32) -> Self {
        self.pos = Pos::new(line, col);
        self
    }
}

pub fn module(body: Vec<Stmt>) -> Module {
    Module { body }
}

// ── Expressions ────────────────────────────────────────────────────────

pub fn int(value: i64) -> Expr {
    Expr::new(ExprKind::Int { value })
}

pub fn float(value: f64) -> Expr {
    Expr::new(ExprKind::Float { value })
}

pub fn string(value: &str) -> Expr {
    Expr::new(ExprKind::Str {
        value: value.to_string(),
    })
}

pub fn boolean(value: bool) -> Expr {
    Expr::new(ExprKind::Bool { value })
}

pub fn none() -> Expr {
    Expr::new(ExprKind::NoneLit)
}

pub fn name(id: &str) -> Expr {
    Expr::new(ExprKind::Name { id: id.to_string() })
}

pub fn attr(value: Expr, attr: &str) -> Expr {
    Expr::new(ExprKind::Attribute {
        value: Box::new(value),
        attr: attr.to_string(),
    })
}

pub fn call(func: Expr, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        func: Box::new(func),
        args,
        keywords: Vec::new(),
    })
}

/// `value.message(args)`.
pub fn method(value: Expr, message: &str, args: Vec<Expr>) -> Expr {
    call(attr(value, message), args)
}

pub fn call_kw(func: Expr, args: Vec<Expr>, keywords: Vec<(&str, Expr)>) -> Expr {
    Expr::new(ExprKind::Call {
        func: Box::new(func),
        args,
        keywords: keywords
            .into_iter()
            .map(|(arg, value)| Keyword {
                arg: Some(arg.to_string()),
                value,
            })
            .collect(),
    })
}

pub fn binop(left: Expr, op: BinOp, right: Expr) -> Expr {
    Expr::new(ExprKind::BinOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::new(ExprKind::UnaryOp {
        op,
        operand: Box::new(operand),
    })
}

pub fn boolop(op: BoolOp, values: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::BoolOp { op, values })
}

/// A comparison chain: `left op0 c0 op1 c1 ...`.
pub fn compare(left: Expr, rest: Vec<(CmpOp, Expr)>) -> Expr {
    let (ops, comparators) = rest.into_iter().unzip();
    Expr::new(ExprKind::Compare {
        left: Box::new(left),
        ops,
        comparators,
    })
}

pub fn cmp(left: Expr, op: CmpOp, right: Expr) -> Expr {
    compare(left, vec![(op, right)])
}

pub fn list(elts: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::List { elts })
}

pub fn tuple(elts: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Tuple { elts })
}

pub fn set(elts: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Set { elts })
}

pub fn dict(pairs: Vec<(Expr, Expr)>) -> Expr {
    let (keys, values) = pairs.into_iter().unzip();
    Expr::new(ExprKind::Dict { keys, values })
}

pub fn index(value: Expr, idx: Expr) -> Expr {
    Expr::new(ExprKind::Subscript {
        value: Box::new(value),
        slice: Box::new(Slice::Index { value: idx }),
    })
}

pub fn slice(value: Expr, lower: Option<Expr>, upper: Option<Expr>) -> Expr {
    Expr::new(ExprKind::Subscript {
        value: Box::new(value),
        slice: Box::new(Slice::Slice {
            lower,
            upper,
            step: None,
        }),
    })
}

pub fn list_comp(elt: Expr, target: Expr, iter: Expr, ifs: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::ListComp {
        elt: Box::new(elt),
        generators: vec![Comprehension { target, iter, ifs }],
    })
}

pub fn lambda(params: &[&str], body: Expr) -> Expr {
    Expr::new(ExprKind::Lambda {
        args: params_of(params),
        body: Box::new(body),
    })
}

// ── Statements ─────────────────────────────────────────────────────────

pub fn expr(value: Expr) -> Stmt {
    Stmt::new(StmtKind::Expr { value })
}

pub fn assign(target: Expr, value: Expr) -> Stmt {
    Stmt::new(StmtKind::Assign {
        targets: vec![target],
        value,
    })
}

/// `id = value`.
pub fn let_(id: &str, value: Expr) -> Stmt {
    assign(name(id), value)
}

pub fn aug_assign(target: Expr, op: BinOp, value: Expr) -> Stmt {
    Stmt::new(StmtKind::AugAssign { target, op, value })
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::new(StmtKind::Return { value: Some(value) })
}

pub fn ret_none() -> Stmt {
    Stmt::new(StmtKind::Return { value: None })
}

pub fn if_(test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::If { test, body, orelse })
}

pub fn while_(test: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::While {
        test,
        body,
        orelse: Vec::new(),
    })
}

pub fn for_(target: Expr, iter: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::For {
        target,
        iter,
        body,
        orelse: Vec::new(),
    })
}

pub fn def(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::FunctionDef(FunctionDef {
        name: name.to_string(),
        args: params_of(params),
        body,
        decorators: Vec::new(),
    }))
}

pub fn class(name: &str, base: Option<&str>, body: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::ClassDef(ClassDef {
        name: name.to_string(),
        bases: base.map(|b| vec![self::name(b)]).unwrap_or_default(),
        body,
        decorators: Vec::new(),
    }))
}

pub fn import(module: &str) -> Stmt {
    Stmt::new(StmtKind::Import {
        names: vec![Alias {
            name: module.to_string(),
            asname: None,
        }],
    })
}

pub fn try_(body: Vec<Stmt>, handlers: Vec<ExceptHandler>) -> Stmt {
    Stmt::new(StmtKind::Try {
        body,
        handlers,
        orelse: Vec::new(),
        finalbody: Vec::new(),
    })
}

pub fn handler(exception: Option<&str>, instance: Option<&str>, body: Vec<Stmt>) -> ExceptHandler {
    ExceptHandler {
        type_: exception.map(name),
        name: instance.map(str::to_string),
        body,
        pos: Pos::new(1, 0),
    }
}

pub fn raise(exc: Expr) -> Stmt {
    Stmt::new(StmtKind::Raise {
        exc: Some(exc),
        cause: None,
    })
}

pub fn with_(context: Expr, var: Option<&str>, body: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::With {
        items: vec![WithItem {
            context_expr: context,
            optional_vars: var.map(name),
        }],
        body,
    })
}

pub fn pass() -> Stmt {
    Stmt::new(StmtKind::Pass)
}

pub fn break_() -> Stmt {
    Stmt::new(StmtKind::Break)
}

pub fn continue_() -> Stmt {
    Stmt::new(StmtKind::Continue)
}

fn params_of(params: &[&str]) -> Arguments {
    Arguments {
        args: params
            .iter()
            .map(|p| Arg {
                name: p.to_string(),
                pos: Pos::new(1, 0),
            })
            .collect(),
        ..Arguments::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_builds_attribute_call() {
        let e = method(name("xs"), "append", vec![int(1)]).at(3, 4);
        assert_eq!(e.pos, Pos::new(3, 4));
        let ExprKind::Call { func, args, .. } = e.kind else {
            panic!("expected a call");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(func.kind, ExprKind::Attribute { ref attr, .. } if attr == "append"));
    }

    #[test]
    fn compare_unzips_chain() {
        let e = compare(int(1), vec![(CmpOp::Lt, int(2)), (CmpOp::Lt, int(3))]);
        let ExprKind::Compare { ops, comparators, .. } = e.kind else {
            panic!("expected a comparison");
        };
        assert_eq!(ops, vec![CmpOp::Lt, CmpOp::Lt]);
        assert_eq!(comparators.len(), 2);
    }
}
