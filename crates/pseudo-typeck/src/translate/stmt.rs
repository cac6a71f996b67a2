//! Statements: assignments, returns, conditionals, loops, exceptions and
//! file blocks.

use pseudo_syntax as ast;

use crate::api::Expansion;
use crate::check::{compatible, unify};
use crate::env::ScopeId;
use crate::error::{Located, Result, TranslateError};
use crate::hierarchy::Hierarchy;
use crate::ir::{self, ExprKind, Statement, StmtKind};
use crate::ty::{Ty, EXCEPTION, INT, STRING};

use super::ctx::Ctx;
use super::{name_case, naming_error, NameCase, Translator};

const FILE_BLOCK_FORMS: &str =
    "with open(path, 'r') as f:\n    text = f.read()\n\nwith open(path, 'w') as f:\n    f.write(text)";

/// A container slot receiving `value`: holes take the value's type,
/// resolved slots must accept it.
fn store(slot: &Ty, value: &Ty, h: &Hierarchy) -> Option<Ty> {
    if slot.has_holes() {
        unify(slot, value, h)
    } else {
        compatible(value, slot, h).map(|_| slot.clone())
    }
}

impl Translator<'_> {
    pub(super) fn translate_stmt(&mut self, stmt: &ast::Stmt, ctx: &Ctx) -> Result<Option<ir::Stmt>> {
        self.translate_stmt_kind(stmt, ctx).located(stmt.pos)
    }

    fn translate_stmt_kind(&mut self, stmt: &ast::Stmt, ctx: &Ctx) -> Result<Option<ir::Stmt>> {
        use ast::StmtKind as S;
        let node: ir::Stmt = match &stmt.kind {
            S::Expr { value } => self.translate_expr(value, ctx)?.into(),
            S::Assign { targets, value } => {
                let [target] = targets.as_slice() else {
                    return Err(TranslateError::not_translatable("chained assignment is not supported")
                        .with_example("a = 0\nb = 0", "a = b = 0"));
                };
                let value = self.translate_expr(value, ctx)?;
                self.assign(target, value, ctx)?.into()
            }
            S::AugAssign { target, op, value } => {
                let current = self.translate_expr(target, ctx)?;
                let value = self.translate_expr(value, ctx)?;
                let combined = self.binary(op.symbol(), current, value)?;
                self.assign(target, combined, ctx)?.into()
            }
            S::Return { value } => self.translate_return(value.as_ref(), ctx)?.into(),
            S::If { test, body, orelse } => self.translate_if(test, body, orelse, ctx, false)?.into(),
            S::While { test, body, orelse } => {
                if !orelse.is_empty() {
                    return Err(TranslateError::not_translatable("while .. else is not supported"));
                }
                let test = self.translate_expr(test, ctx)?;
                let test = self.testable(test)?;
                let block = self.translate_block(body, &ctx.looping())?;
                Statement::void(StmtKind::WhileStatement { test, block }).into()
            }
            S::For {
                target,
                iter,
                body,
                orelse,
            } => {
                if !orelse.is_empty() {
                    return Err(TranslateError::not_translatable("for .. else is not supported"));
                }
                self.translate_for(target, iter, body, ctx)?.into()
            }
            S::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                if !orelse.is_empty() || !finalbody.is_empty() {
                    return Err(TranslateError::not_translatable("try .. else and try .. finally are not supported"));
                }
                self.translate_try(body, handlers, ctx)?.into()
            }
            S::Raise { exc, cause } => {
                if cause.is_some() {
                    return Err(TranslateError::not_translatable("raise .. from is not supported"));
                }
                let Some(exc) = exc else {
                    return Err(TranslateError::not_translatable("a bare raise is not supported"));
                };
                self.translate_raise(exc, ctx)?.into()
            }
            S::With { items, body } => self.translate_with(items, body, ctx)?,
            S::Break | S::Continue if !ctx.in_loop => {
                return Err(TranslateError::not_translatable(format!(
                    "{} outside of a loop",
                    stmt.kind.describe()
                )))
            }
            S::Break => Statement::void(StmtKind::Break).into(),
            S::Continue => Statement::void(StmtKind::Continue).into(),
            S::Pass => return Ok(None),
            S::FunctionDef(_) | S::ClassDef(_) => {
                return Err(TranslateError::not_translatable(format!(
                    "a nested {} is not supported",
                    stmt.kind.describe()
                ))
                .with_suggestion("move the definition to the top level"))
            }
            S::Import { .. } | S::ImportFrom { .. } => {
                return Err(TranslateError::not_translatable("imports can be only on top"))
            }
            S::Global { .. } | S::Nonlocal { .. } | S::Delete { .. } => {
                return Err(TranslateError::not_translatable(format!(
                    "{} is not supported",
                    stmt.kind.describe()
                )))
            }
        };
        Ok(Some(node))
    }

    /// The scope owning `name` as a local of the body being translated.
    pub(super) fn local_owner(&self, name: &str, ctx: &Ctx) -> Option<ScopeId> {
        if ctx.body_scope == ScopeId::MODULE {
            return self
                .env
                .resolve_local(ctx.scope, name)
                .or_else(|| self.env.lookup_local(ScopeId::MODULE, name).map(|_| ScopeId::MODULE));
        }
        self.env.resolve_local(ctx.scope, name)
    }

    // ── Assignment ─────────────────────────────────────────────────────

    fn assign(&mut self, target: &ast::Expr, value: ir::Expr, ctx: &Ctx) -> Result<Statement> {
        let value_type = value.pseudo_type.clone();
        match &target.kind {
            ast::ExprKind::Name { id } => {
                if self.constant_names.contains(id) {
                    return Err(TranslateError::type_check("you can't override a constant")
                        .with_example(format!("{} = ..", id), format!("{} = ..\n{} = ..", id, id))
                        .at(target.pos));
                }
                if name_case(id) != NameCase::Snake {
                    return Err(naming_error(id).at(target.pos));
                }
                match self.local_owner(id, ctx) {
                    Some(owner) => {
                        let old = self.env.lookup_local(owner, id).cloned().unwrap_or(Ty::Hole);
                        let Some(ty) = unify(&old, &value_type, &self.hierarchy) else {
                            return Err(TranslateError::type_check(format!(
                                "can't change the type of variable {} in {} from {} to {}",
                                id,
                                ctx.name(),
                                old,
                                value_type
                            ))
                            .with_wrong_type(value_type)
                            .at(target.pos));
                        };
                        self.env.define(owner, id.clone(), ty);
                    }
                    None => self.env.define(ctx.body_scope, id.clone(), value_type.clone()),
                }
                Ok(Statement::void(StmtKind::LocalAssignment {
                    local: id.clone(),
                    value,
                    value_type,
                }))
            }
            ast::ExprKind::Attribute { value: object, attr } => {
                let object = self.translate_expr(object, ctx)?;
                let through_this = matches!(object.kind, ExprKind::This);
                let class = object.pseudo_type.general_type().to_string();
                if !self.hierarchy.is_class(&class) {
                    return Err(TranslateError::type_check(format!(
                        "can't assign the attribute {} of {}",
                        attr, object.pseudo_type
                    ))
                    .at(target.pos));
                }

                let existing = self
                    .hierarchy
                    .attr(&class, attr)
                    .map(|(owner, entry)| (owner.to_string(), entry.ty.clone()));
                let ty = match existing {
                    Some((owner, old)) => {
                        let Some(ty) = unify(&old, &value_type, &self.hierarchy) else {
                            return Err(TranslateError::type_check(format!(
                                "can't change the type of {}#{} from {} to {}",
                                class, attr, old, value_type
                            ))
                            .with_wrong_type(value_type)
                            .at(target.pos));
                        };
                        self.hierarchy.update_attr(&owner, attr, ty.clone(), !through_this);
                        ty
                    }
                    None if through_this => {
                        self.hierarchy.register_attr(&class, attr, value_type.clone(), false);
                        value_type.clone()
                    }
                    None => return Err(self.unknown_attr_error(&object.pseudo_type, attr).at(target.pos)),
                };

                let kind = if through_this {
                    StmtKind::InstanceAssignment {
                        name: attr.clone(),
                        value,
                        value_type,
                    }
                } else {
                    StmtKind::AttrAssignment {
                        attr: ir::Expr::new(
                            ExprKind::Attr {
                                object: Box::new(object),
                                attr: attr.clone(),
                            },
                            ty,
                        ),
                        value,
                        value_type,
                    }
                };
                Ok(Statement::void(kind))
            }
            ast::ExprKind::Subscript { value: sequence, slice } => {
                let ast::Slice::Index { value: index } = slice.as_ref() else {
                    return Err(TranslateError::not_translatable("slice assignment is not supported"));
                };
                let sequence = self.translate_expr(sequence, ctx)?;
                let index = self.translate_expr(index, ctx)?;
                let sequence = self.store_at(sequence, &index, &value_type, ctx)?;
                Ok(Statement::void(StmtKind::IndexAssignment {
                    sequence,
                    index,
                    value,
                    value_type,
                }))
            }
            ast::ExprKind::Tuple { .. } | ast::ExprKind::List { .. } => Err(TranslateError::not_translatable(
                "unpacking assignment is not supported",
            )
            .with_example("a = t[0]\nb = t[1]", "a, b = t")),
            other => Err(TranslateError::not_translatable(format!(
                "assignment to a {} is not supported",
                other.describe()
            ))),
        }
    }

    /// Check `sequence[index] = value`, filling holes of the sequence.
    fn store_at(&mut self, sequence: ir::Expr, index: &ir::Expr, value: &Ty, ctx: &Ctx) -> Result<ir::Expr> {
        let seq_ty = sequence.pseudo_type.clone();
        let mismatch = |what: &str| {
            TranslateError::type_check(format!("can't store {} {} in {}", what, value, seq_ty))
                .with_wrong_type(value.clone())
        };
        let refined = match &seq_ty {
            Ty::List(elem) => {
                if !index.pseudo_type.is_atom(INT) {
                    return Err(TranslateError::type_check(format!("a non Int index for {}", seq_ty))
                        .with_wrong_type(index.pseudo_type.clone()));
                }
                Ty::list(store(elem, value, &self.hierarchy).ok_or_else(|| mismatch("a value of type"))?)
            }
            Ty::Array(elem, len) => {
                if !index.pseudo_type.is_atom(INT) {
                    return Err(TranslateError::type_check(format!("a non Int index for {}", seq_ty))
                        .with_wrong_type(index.pseudo_type.clone()));
                }
                Ty::array(
                    store(elem, value, &self.hierarchy).ok_or_else(|| mismatch("a value of type"))?,
                    *len,
                )
            }
            Ty::Dictionary(key, val) => Ty::dictionary(
                store(key, &index.pseudo_type, &self.hierarchy).ok_or_else(|| {
                    TranslateError::type_check(format!("can't use a {} key for {}", index.pseudo_type, seq_ty))
                        .with_wrong_type(index.pseudo_type.clone())
                })?,
                store(val, value, &self.hierarchy).ok_or_else(|| mismatch("a value of type"))?,
            ),
            Ty::Atom(name) if name == STRING => {
                return Err(TranslateError::type_check("String is immutable")
                    .with_suggestion("build a new String instead"))
            }
            Ty::Tuple(_) => return Err(TranslateError::type_check(format!("{} is immutable", seq_ty))),
            other => {
                return Err(TranslateError::type_check(format!("[]= can't be used on {}", other))
                    .with_wrong_type(other.clone()))
            }
        };
        Ok(if refined != seq_ty {
            self.refine(sequence, refined, ctx)
        } else {
            sequence
        })
    }

    // ── Return ─────────────────────────────────────────────────────────

    fn translate_return(&mut self, value: Option<&ast::Expr>, ctx: &Ctx) -> Result<Statement> {
        let Some(sig) = ctx.sig.clone() else {
            return Err(TranslateError::not_translatable("return outside of a function"));
        };
        if ctx.is_constructor() && value.is_some() {
            return Err(TranslateError::type_check(format!(
                "{} is a constructor and can't return a value",
                ctx.name()
            )));
        }
        let node = match value {
            Some(v) => self.translate_expr(v, ctx)?,
            None => ir::Expr::new(ExprKind::Null, Ty::void()),
        };
        let ty = node.pseudo_type.clone();

        if !ctx.is_constructor() {
            let current = sig.borrow().ret.clone();
            let merged = current.fill_holes(&ty);
            if current != Ty::Hole && merged != ty.fill_holes(&current) {
                return Err(TranslateError::type_check(format!(
                    "expected {} return type for {}",
                    current,
                    ctx.name()
                ))
                .with_wrong_type(ty));
            }
            sig.borrow_mut().ret = merged;
        }

        let kind = if ctx.is_last {
            StmtKind::ImplicitReturn { value: node }
        } else {
            StmtKind::ExplicitReturn { value: node }
        };
        Ok(Statement { kind, pseudo_type: ty })
    }

    // ── Conditionals ───────────────────────────────────────────────────

    fn translate_if(
        &mut self,
        test: &ast::Expr,
        body: &[ast::Stmt],
        orelse: &[ast::Stmt],
        ctx: &Ctx,
        is_elif: bool,
    ) -> Result<Statement> {
        let test = self.translate_expr(test, ctx)?;
        let test = self.testable(test)?;
        let block = self.translate_block(body, ctx)?;
        let otherwise = match orelse {
            [] => None,
            [
                ast::Stmt {
                    kind: ast::StmtKind::If { test, body, orelse },
                    pos,
                },
            ] => Some(Box::new(
                self.translate_if(test, body, orelse, ctx, true).located(*pos)?,
            )),
            _ => Some(Box::new(Statement::void(StmtKind::ElseStatement {
                block: self.translate_block(orelse, ctx)?,
            }))),
        };
        let kind = if is_elif {
            StmtKind::ElseifStatement { test, block, otherwise }
        } else {
            StmtKind::IfStatement { test, block, otherwise }
        };
        Ok(Statement::void(kind))
    }

    // ── Exceptions ─────────────────────────────────────────────────────

    fn translate_try(&mut self, body: &[ast::Stmt], handlers: &[ast::ExceptHandler], ctx: &Ctx) -> Result<Statement> {
        let inner = ctx.last(false);
        let block = self.translate_block(body, &inner)?;
        let mut caught: Vec<String> = Vec::new();
        let mut out = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let exception = match &handler.type_ {
                None => EXCEPTION.to_string(),
                Some(ast::Expr {
                    kind: ast::ExprKind::Name { id },
                    ..
                }) if self.hierarchy.is_exception(id) => id.clone(),
                Some(ast::Expr {
                    kind: ast::ExprKind::Name { id },
                    pos,
                }) => {
                    return Err(TranslateError::type_check(format!("{} is not an exception", id))
                        .with_suggestion("declare it with `class Name(Exception): pass`")
                        .at(*pos))
                }
                Some(other) => {
                    return Err(TranslateError::not_translatable("a handler catches exactly one named exception")
                        .at(other.pos))
                }
            };
            if let Some(earlier) = caught.iter().find(|c| self.hierarchy.catches(c, &exception)) {
                return Err(TranslateError::type_check(format!(
                    "{} is already caught by the {} handler",
                    exception, earlier
                ))
                .at(handler.pos));
            }

            let instance_ty = Ty::atom(exception.as_str());
            let bindings = handler.name.iter().map(|n| (n.clone(), instance_ty.clone()));
            let mark = self.env.mark();
            let scope = self.env.child(ctx.scope, bindings);
            let handled = self.translate_block(&handler.body, &inner.in_scope(scope));
            self.env.discard(mark);

            out.push(ir::ExceptionHandler {
                is_builtin: exception == EXCEPTION,
                exception: exception.clone(),
                instance: handler.name.clone(),
                block: handled.located(handler.pos)?,
                pseudo_type: instance_ty,
            });
            caught.push(exception);
        }
        Ok(Statement::void(StmtKind::TryStatement { block, handlers: out }))
    }

    fn translate_raise(&mut self, exc: &ast::Expr, ctx: &Ctx) -> Result<Statement> {
        match &exc.kind {
            ast::ExprKind::Call { func, args, keywords } if keywords.is_empty() => {
                let ast::ExprKind::Name { id } = &func.kind else {
                    return Err(TranslateError::not_translatable("only `raise Name(message)` is supported"));
                };
                if !self.hierarchy.is_exception(id) {
                    return Err(TranslateError::type_check(format!("{} is not an exception", id))
                        .with_suggestion("declare it with `class Name(Exception): pass`")
                        .at(func.pos));
                }
                let [message] = args.as_slice() else {
                    return Err(TranslateError::type_check(format!(
                        "{} expects one String message, not {} args",
                        id,
                        args.len()
                    )));
                };
                let value = self.translate_expr(message, ctx)?;
                if !value.pseudo_type.is_atom(STRING) {
                    return Err(TranslateError::type_check(format!(
                        "{} expects a String message, not {}",
                        id, value.pseudo_type
                    ))
                    .with_wrong_type(value.pseudo_type)
                    .at(message.pos));
                }
                Ok(Statement::void(StmtKind::ThrowStatement {
                    exception: id.clone(),
                    value,
                }))
            }
            _ => Err(TranslateError::not_translatable("only `raise Name(message)` is supported")
                .with_example("raise ValueError(\"bad input\")", "raise ValueError")),
        }
    }

    // ── File blocks ────────────────────────────────────────────────────

    fn translate_with(&mut self, items: &[ast::WithItem], body: &[ast::Stmt], ctx: &Ctx) -> Result<ir::Stmt> {
        let unsupported = || {
            TranslateError::not_translatable("only reading or writing a whole file is supported in with")
                .with_suggestion(FILE_BLOCK_FORMS)
        };
        let [item] = items else {
            return Err(unsupported());
        };
        let (ast::ExprKind::Call { func, args, keywords }, Some(var)) =
            (&item.context_expr.kind, &item.optional_vars)
        else {
            return Err(unsupported());
        };
        let (ast::ExprKind::Name { id: opener }, ast::ExprKind::Name { id: file }) = (&func.kind, &var.kind) else {
            return Err(unsupported());
        };
        let [path, mode] = args.as_slice() else {
            return Err(unsupported());
        };
        let ast::ExprKind::Str { value: mode } = &mode.kind else {
            return Err(unsupported().at(mode.pos));
        };
        if opener != "open" || !keywords.is_empty() {
            return Err(unsupported());
        }
        let [stmt] = body else {
            return Err(unsupported());
        };

        let file_call = |expr: &ast::Expr, message: &str| -> Option<Vec<ast::Expr>> {
            let ast::ExprKind::Call { func, args, keywords } = &expr.kind else {
                return None;
            };
            let ast::ExprKind::Attribute { value, attr } = &func.kind else {
                return None;
            };
            let is_file = matches!(&value.kind, ast::ExprKind::Name { id } if id == file);
            (is_file && attr == message && keywords.is_empty()).then(|| args.clone())
        };

        match (mode.as_str(), &stmt.kind) {
            ("r", ast::StmtKind::Assign { targets, value }) if targets.len() == 1 => {
                if !matches!(file_call(value, "read"), Some(args) if args.is_empty()) {
                    return Err(unsupported().at(stmt.pos));
                }
                let path = self.translate_expr(path, ctx)?;
                let read = self.expand(&Expansion::call("io", "read_file"), "open", vec![path], ctx)?;
                Ok(self.assign(&targets[0], read, ctx).located(stmt.pos)?.into())
            }
            ("w", ast::StmtKind::Expr { value }) => {
                let Some(written) = file_call(value, "write") else {
                    return Err(unsupported().at(stmt.pos));
                };
                let [text] = written.as_slice() else {
                    return Err(unsupported().at(stmt.pos));
                };
                let path = self.translate_expr(path, ctx)?;
                let text = self.translate_expr(text, ctx)?;
                Ok(self
                    .expand(&Expansion::call("io", "write_file"), "open", vec![path, text], ctx)
                    .located(stmt.pos)?
                    .into())
            }
            _ => Err(unsupported()),
        }
    }
}
