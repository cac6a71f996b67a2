//! Expressions: literals, names, attributes, subscripts, operators and
//! container literals.

use tracing::trace;

use pseudo_syntax as ast;

use crate::api::{binary_result, is_primitive_result, is_supported_operator};
use crate::check::{compatible, unify};
use crate::error::{Located, Result, TranslateError};
use crate::ir::{self, ExprKind};
use crate::ty::{Ty, BOOLEAN, FLOAT, INT, REGEXP_MATCH, STRING};

use super::ctx::Ctx;
use super::Translator;

/// Types with a `length`.
pub(crate) fn is_sized(ty: &Ty) -> bool {
    matches!(
        ty,
        Ty::List(_) | Ty::Dictionary(..) | Ty::Set(_) | Ty::Array(..) | Ty::Tuple(_)
    ) || ty.is_atom(STRING)
}

const COMPARABLE: [&str; 3] = [INT, FLOAT, STRING];

fn boxed(expr: ir::Expr) -> Box<ir::Expr> {
    Box::new(expr)
}

impl Translator<'_> {
    pub(super) fn translate_expr(&mut self, expr: &ast::Expr, ctx: &Ctx) -> Result<ir::Expr> {
        self.translate_expr_kind(expr, ctx).located(expr.pos)
    }

    fn translate_expr_kind(&mut self, expr: &ast::Expr, ctx: &Ctx) -> Result<ir::Expr> {
        use ast::ExprKind as E;
        match &expr.kind {
            E::Int { value } => Ok(ir::Expr::int(*value)),
            E::Float { value } => Ok(ir::Expr::new(ExprKind::Float { value: *value }, Ty::float())),
            E::Str { value } => Ok(string(value)),
            E::Bool { value } => Ok(ir::Expr::new(ExprKind::Boolean { value: *value }, Ty::boolean())),
            E::NoneLit => Ok(ir::Expr::new(ExprKind::Null, Ty::void())),
            E::Name { id } => self.translate_name(id, ctx),
            E::Attribute { value, attr } => self.translate_attribute(value, attr, ctx),
            E::Call { func, args, keywords } => self.translate_call(func, args, keywords, expr.pos, ctx),
            E::BinOp { left, op, right } => {
                let left = self.translate_expr(left, ctx)?;
                let right = self.translate_expr(right, ctx)?;
                self.binary(op.symbol(), left, right)
            }
            E::UnaryOp { op, operand } => self.translate_unary(*op, operand, ctx),
            E::BoolOp { op, values } => {
                let mut operands = Vec::with_capacity(values.len());
                for value in values {
                    let node = self.translate_expr(value, ctx)?;
                    operands.push(self.testable(node)?);
                }
                let mut operands = operands.into_iter();
                let Some(first) = operands.next() else {
                    return Err(TranslateError::not_translatable(format!("an empty {}", op.symbol())));
                };
                Ok(operands.fold(first, |left, right| {
                    ir::Expr::new(
                        ExprKind::BinaryOp {
                            op: op.symbol().to_string(),
                            left: boxed(left),
                            right: boxed(right),
                        },
                        Ty::boolean(),
                    )
                }))
            }
            E::Compare {
                left,
                ops,
                comparators,
            } => self.translate_compare(left, ops, comparators, ctx),
            E::List { elts } => {
                let (elements, elem) = self.homogeneous(elts, "list", ctx)?;
                Ok(ir::Expr::new(ExprKind::List { elements }, Ty::list(elem)))
            }
            E::Set { elts } => {
                let (elements, elem) = self.homogeneous(elts, "set", ctx)?;
                Ok(ir::Expr::new(ExprKind::Set { elements }, Ty::set(elem)))
            }
            E::Dict { keys, values } => self.translate_dict(keys, values, ctx),
            E::Tuple { elts } => self.translate_tuple(elts, ctx),
            E::Subscript { value, slice } => self.translate_subscript(value, slice, ctx),
            E::ListComp { elt, generators } => self.translate_list_comp(elt, generators, ctx),
            E::SetComp { .. }
            | E::DictComp { .. }
            | E::GeneratorExp { .. }
            | E::Lambda { .. }
            | E::IfExp { .. }
            | E::Starred { .. } => Err(TranslateError::not_translatable(format!(
                "{} is not supported",
                expr.kind.describe()
            ))),
        }
    }

    // ── Names ──────────────────────────────────────────────────────────

    pub(super) fn translate_name(&mut self, id: &str, ctx: &Ctx) -> Result<ir::Expr> {
        if let Some(ty) = self.env.lookup(ctx.scope, id) {
            let kind = if id == "self" && ctx.class.is_some() {
                ExprKind::This
            } else {
                ExprKind::Local { name: id.to_string() }
            };
            return Ok(ir::Expr::new(kind, ty.clone()));
        }
        if let Some(sig) = self.defs.function(id) {
            return Ok(ir::Expr::local(id, sig.borrow().to_ty()));
        }
        if self.hierarchy.is_class(id) || self.hierarchy.is_exception(id) {
            return Ok(ir::Expr::typename(id));
        }
        if self.imports.contains(id) {
            return Err(TranslateError::type_check(format!(
                "module {} can be used only to call its functions",
                id
            ))
            .with_suggestion(format!("{}.function(..)", id)));
        }
        Err(TranslateError::type_check(format!("{} is not defined", id)))
    }

    // ── Attributes ─────────────────────────────────────────────────────

    fn translate_attribute(&mut self, value: &ast::Expr, attr: &str, ctx: &Ctx) -> Result<ir::Expr> {
        if let ast::ExprKind::Name { id } = &value.kind {
            if self.imports.contains(id) && self.env.lookup(ctx.scope, id).is_none() {
                return Err(TranslateError::not_translatable(format!(
                    "{}.{} can be used only as a call",
                    id, attr
                )));
            }
        }
        let object = self.translate_expr(value, ctx)?;
        let class = object.pseudo_type.general_type().to_string();
        let Some((_, entry)) = self.hierarchy.attr(&class, attr) else {
            return Err(self.unknown_attr_error(&object.pseudo_type, attr));
        };
        let ty = entry.ty.clone();
        let kind = match object.kind {
            ExprKind::This => ExprKind::InstanceVariable {
                name: attr.to_string(),
            },
            _ => ExprKind::Attr {
                object: boxed(object),
                attr: attr.to_string(),
            },
        };
        Ok(ir::Expr::new(kind, ty))
    }

    pub(super) fn unknown_attr_error(&self, ty: &Ty, attr: &str) -> TranslateError {
        let general = ty.general_type();
        let mut err = TranslateError::type_check(format!("can't infer the type of {}#{}", ty, attr));
        if self.api.has_methods(general) {
            err = err.with_suggestion(format!(
                "known {} methods:\n{}",
                general,
                self.api.describe(&self.api.methods, general)
            ));
        } else if self.hierarchy.is_class(general) {
            let names: Vec<&str> = self.hierarchy.methods(general).into_iter().map(|(n, _)| n).collect();
            err = err.with_suggestion(format!("{} has the methods: {}", general, names.join(" ")));
        }
        err
    }

    // ── Operators ──────────────────────────────────────────────────────

    /// `left op right`: a primitive `binary_op` for numeric results, a
    /// standard method call through the operator table otherwise.
    pub(super) fn binary(&self, op: &str, left: ir::Expr, right: ir::Expr) -> Result<ir::Expr> {
        if !is_supported_operator(op) {
            return Err(TranslateError::not_translatable(format!("operator {} is not supported", op)));
        }
        let Some(result) = binary_result(op, &left.pseudo_type, &right.pseudo_type) else {
            return Err(TranslateError::type_check(format!(
                "unsupported operand types for {}: {} and {}",
                op, left.pseudo_type, right.pseudo_type
            ))
            .with_wrong_type(right.pseudo_type.clone()));
        };
        if is_primitive_result(&result) {
            return Ok(ir::Expr::new(
                ExprKind::BinaryOp {
                    op: op.to_string(),
                    left: boxed(left),
                    right: boxed(right),
                },
                result,
            ));
        }

        let (receiver, mut arg) = if op == "*" && left.pseudo_type.is_atom(INT) {
            (right, left)
        } else {
            (left, right)
        };
        let owner = receiver.pseudo_type.general_type().to_string();
        let Some(message) = self.api.operator_message(&owner, op).map(str::to_string) else {
            return Err(TranslateError::type_check(format!("{} doesn't support {}", owner, op)));
        };
        if op == "%" && arg.pseudo_type.is_atom(STRING) {
            arg = ir::Expr::new(
                ExprKind::Array { elements: vec![arg] },
                Ty::array(Ty::string(), 1),
            );
        }
        trace!(operator = op, owner = %owner, message = %message, "operator expansion");
        Ok(ir::Expr::new(
            ExprKind::StandardMethodCall {
                receiver: boxed(receiver),
                message,
                args: vec![arg],
            },
            result,
        ))
    }

    fn translate_unary(&mut self, op: ast::UnaryOp, operand: &ast::Expr, ctx: &Ctx) -> Result<ir::Expr> {
        match op {
            ast::UnaryOp::USub => match &operand.kind {
                ast::ExprKind::Int { value } => Ok(ir::Expr::int(-value)),
                ast::ExprKind::Float { value } => {
                    Ok(ir::Expr::new(ExprKind::Float { value: -value }, Ty::float()))
                }
                _ => {
                    let value = self.translate_expr(operand, ctx)?;
                    if !value.pseudo_type.is_number() {
                        return Err(TranslateError::type_check(format!(
                            "unary - expects a number, not {}",
                            value.pseudo_type
                        ))
                        .with_wrong_type(value.pseudo_type));
                    }
                    let ty = value.pseudo_type.clone();
                    Ok(ir::Expr::new(
                        ExprKind::UnaryOp {
                            op: "-".to_string(),
                            value: boxed(value),
                        },
                        ty,
                    ))
                }
            },
            ast::UnaryOp::UAdd => {
                let value = self.translate_expr(operand, ctx)?;
                if !value.pseudo_type.is_number() {
                    return Err(TranslateError::type_check(format!(
                        "unary + expects a number, not {}",
                        value.pseudo_type
                    )));
                }
                Ok(value)
            }
            ast::UnaryOp::Not => {
                let value = self.translate_expr(operand, ctx)?;
                let test = self.testable(value)?;
                Ok(ir::Expr::new(
                    ExprKind::UnaryOp {
                        op: "not".to_string(),
                        value: boxed(test),
                    },
                    Ty::boolean(),
                ))
            }
            ast::UnaryOp::Invert => Err(TranslateError::not_translatable("operator ~ is not supported")),
        }
    }

    /// Comparison chains fold into conjunctions from the right:
    /// `a < b < c` is `(a < b) and (b < c)`.
    fn translate_compare(
        &mut self,
        left: &ast::Expr,
        ops: &[ast::CmpOp],
        comparators: &[ast::Expr],
        ctx: &Ctx,
    ) -> Result<ir::Expr> {
        let mut operands = Vec::with_capacity(comparators.len() + 1);
        operands.push(self.translate_expr(left, ctx)?);
        for comparator in comparators {
            operands.push(self.translate_expr(comparator, ctx)?);
        }

        let mut comparisons = Vec::with_capacity(ops.len());
        for (i, op) in ops.iter().enumerate() {
            use ast::CmpOp as C;
            if !matches!(op, C::Eq | C::NotEq | C::Lt | C::LtE | C::Gt | C::GtE) {
                return Err(TranslateError::not_translatable(format!(
                    "comparison operator {} is not supported",
                    op.symbol()
                ))
                .at(comparators[i].pos));
            }
            let (l, r) = (&operands[i], &operands[i + 1]);
            confirm_comparable(&l.pseudo_type, &r.pseudo_type).located(comparators[i].pos)?;
            comparisons.push(ir::Expr::new(
                ExprKind::Comparison {
                    op: op.symbol().to_string(),
                    left: boxed(l.clone()),
                    right: boxed(r.clone()),
                },
                Ty::boolean(),
            ));
        }

        let last = comparisons
            .pop()
            .ok_or_else(|| TranslateError::not_translatable("empty comparison"))?;
        Ok(comparisons.into_iter().rev().fold(last, |right, left| {
            ir::Expr::new(
                ExprKind::BinaryOp {
                    op: "and".to_string(),
                    left: boxed(left),
                    right: boxed(right),
                },
                Ty::boolean(),
            )
        }))
    }

    /// Coerce a condition to `Boolean`.
    pub(super) fn testable(&self, node: ir::Expr) -> Result<ir::Expr> {
        let ty = node.pseudo_type.clone();
        let zero = ir::Expr::int(0);
        if ty.is_atom(BOOLEAN) {
            Ok(node)
        } else if is_sized(&ty) {
            let length = ir::Expr::new(
                ExprKind::StandardMethodCall {
                    receiver: boxed(node),
                    message: "length".to_string(),
                    args: vec![],
                },
                Ty::int(),
            );
            Ok(greater(length, zero))
        } else if ty.is_number() {
            Ok(greater(node, zero))
        } else if ty.is_atom(REGEXP_MATCH) {
            Ok(ir::Expr::new(
                ExprKind::StandardMethodCall {
                    receiver: boxed(node),
                    message: "has_match".to_string(),
                    args: vec![],
                },
                Ty::boolean(),
            ))
        } else {
            Err(TranslateError::type_check(format!(
                "expected a Boolean or RegexpMatch test, not {}",
                ty
            ))
            .with_wrong_type(ty))
        }
    }

    // ── Containers ─────────────────────────────────────────────────────

    fn homogeneous(&mut self, elts: &[ast::Expr], kind: &str, ctx: &Ctx) -> Result<(Vec<ir::Expr>, Ty)> {
        let mut elements = Vec::with_capacity(elts.len());
        let mut elem = Ty::Hole;
        for elt in elts {
            let node = self.translate_expr(elt, ctx)?;
            elem = compatible(&node.pseudo_type, &elem, &self.hierarchy).ok_or_else(|| {
                TranslateError::type_check(format!("can't use different types in a {}", kind))
                    .with_wrong_type(node.pseudo_type.clone())
                    .at(elt.pos)
            })?;
            elements.push(node);
        }
        Ok((elements, elem))
    }

    fn translate_dict(&mut self, keys: &[ast::Expr], values: &[ast::Expr], ctx: &Ctx) -> Result<ir::Expr> {
        let mut pairs = Vec::with_capacity(keys.len());
        let (mut key_ty, mut value_ty) = (Ty::Hole, Ty::Hole);
        for (k, v) in keys.iter().zip(values) {
            let key = self.translate_expr(k, ctx)?;
            let value = self.translate_expr(v, ctx)?;
            key_ty = unify(&key_ty, &key.pseudo_type, &self.hierarchy).ok_or_else(|| {
                TranslateError::type_check("can't use different types for keys of a dictionary")
                    .with_wrong_type(key.pseudo_type.clone())
                    .at(k.pos)
            })?;
            value_ty = unify(&value_ty, &value.pseudo_type, &self.hierarchy).ok_or_else(|| {
                TranslateError::type_check("can't use different types for values of a dictionary")
                    .with_wrong_type(value.pseudo_type.clone())
                    .at(v.pos)
            })?;
            pairs.push(ir::Pair { key, value });
        }
        Ok(ir::Expr::new(
            ExprKind::Dictionary { pairs },
            Ty::dictionary(key_ty, value_ty),
        ))
    }

    /// A tuple whose elements happen to share one type is a fixed-length
    /// array; otherwise it stays heterogeneous.
    fn translate_tuple(&mut self, elts: &[ast::Expr], ctx: &Ctx) -> Result<ir::Expr> {
        let mut elements = Vec::with_capacity(elts.len());
        for elt in elts {
            elements.push(self.translate_expr(elt, ctx)?);
        }
        let common = elements.iter().try_fold(Ty::Hole, |acc, e| {
            compatible(&acc, &e.pseudo_type, &self.hierarchy)
        });
        match common {
            Some(elem) if !elements.is_empty() && !elem.has_holes() => {
                let ty = Ty::array(elem, elements.len());
                Ok(ir::Expr::new(ExprKind::Array { elements }, ty))
            }
            _ => {
                let ty = Ty::Tuple(elements.iter().map(|e| e.pseudo_type.clone()).collect());
                Ok(ir::Expr::new(ExprKind::Tuple { elements }, ty))
            }
        }
    }

    // ── Subscripts ─────────────────────────────────────────────────────

    fn translate_subscript(&mut self, value: &ast::Expr, slice: &ast::Slice, ctx: &Ctx) -> Result<ir::Expr> {
        let sequence = self.translate_expr(value, ctx)?;
        match slice {
            ast::Slice::Index { value: index } => {
                let index_node = self.translate_expr(index, ctx)?;
                let ty = self.index_type(&sequence.pseudo_type, &index_node, index)?;
                Ok(ir::Expr::new(
                    ExprKind::Index {
                        sequence: boxed(sequence),
                        index: boxed(index_node),
                    },
                    ty,
                ))
            }
            ast::Slice::Slice { lower, upper, step } => {
                if step.is_some() {
                    return Err(TranslateError::not_translatable("slice steps are not supported"));
                }
                let owner = sequence.pseudo_type.general_type().to_string();
                if owner != STRING && owner != "List" {
                    return Err(TranslateError::type_check(format!(
                        "only String and List can be sliced, not {}",
                        sequence.pseudo_type
                    ))
                    .with_wrong_type(sequence.pseudo_type.clone()));
                }
                let (message, bounds) = match (lower, upper) {
                    (Some(lo), Some(hi)) => ("slice", vec![lo, hi]),
                    (Some(lo), None) => ("slice_from", vec![lo]),
                    (None, Some(hi)) => ("slice_to", vec![hi]),
                    (None, None) => {
                        return Err(TranslateError::not_translatable("a[:] is not supported"))
                    }
                };
                let mut args = vec![sequence];
                for bound in bounds {
                    args.push(self.translate_expr(bound, ctx)?);
                }
                self.standard_method(&owner, message, args, ctx)
            }
        }
    }

    /// The element type read by `sequence[index]`.
    pub(super) fn index_type(&self, sequence: &Ty, index: &ir::Expr, source: &ast::Expr) -> Result<Ty> {
        let non_int = || {
            TranslateError::type_check(format!(
                "a non Int index for {}: {}",
                sequence, index.pseudo_type
            ))
            .with_wrong_type(index.pseudo_type.clone())
        };
        match sequence {
            Ty::Atom(name) if name == STRING => {
                index.pseudo_type.is_atom(INT).then(Ty::string).ok_or_else(non_int)
            }
            Ty::List(elem) | Ty::Array(elem, _) => {
                index.pseudo_type.is_atom(INT).then(|| (**elem).clone()).ok_or_else(non_int)
            }
            Ty::Dictionary(key, value) => match compatible(&index.pseudo_type, key, &self.hierarchy) {
                Some(_) => Ok((**value).clone()),
                None => Err(TranslateError::type_check(format!(
                    "a non {} index for {}: {}",
                    key, sequence, index.pseudo_type
                ))
                .with_wrong_type(index.pseudo_type.clone())),
            },
            Ty::Tuple(elems) => {
                let ast::ExprKind::Int { value } = source.kind else {
                    return Err(TranslateError::type_check(format!(
                        "only literal Int indices are supported for {}",
                        sequence
                    ))
                    .with_suggestion("the element type of a heterogeneous tuple depends on the index"));
                };
                usize::try_from(value)
                    .ok()
                    .and_then(|i| elems.get(i).cloned())
                    .ok_or_else(|| {
                        TranslateError::type_check(format!("{} has only {} elements", sequence, elems.len()))
                    })
            }
            other => Err(TranslateError::type_check(format!(
                "[] can be used only on String, List, Array, Dictionary or Tuple, not {}",
                other
            ))
            .with_wrong_type(other.clone())),
        }
    }
}

pub(super) fn string(value: &str) -> ir::Expr {
    ir::Expr::new(
        ExprKind::String {
            value: value.to_string(),
        },
        Ty::string(),
    )
}

fn greater(left: ir::Expr, right: ir::Expr) -> ir::Expr {
    ir::Expr::new(
        ExprKind::Comparison {
            op: ">".to_string(),
            left: boxed(left),
            right: boxed(right),
        },
        Ty::boolean(),
    )
}

fn confirm_comparable(left: &Ty, right: &Ty) -> Result<()> {
    match left {
        Ty::Atom(name) if left == right && COMPARABLE.contains(&name.as_str()) => Ok(()),
        _ => Err(TranslateError::type_check(format!("{} not comparable with {}", left, right))
            .with_suggestion(format!("comparable types: {}", COMPARABLE.join(" ")))
            .with_wrong_type(right.clone())),
    }
}
