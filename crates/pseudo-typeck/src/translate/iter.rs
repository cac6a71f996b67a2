//! Loop heads shared by `for` statements and list comprehensions.

use pseudo_syntax as ast;

use crate::error::{Result, TranslateError};
use crate::ir::{self, ExprKind, Iterators, Sequence, Statement, StmtKind};
use crate::ty::{Ty, INT};

use super::ctx::Ctx;
use super::{name_case, naming_error, NameCase, Translator};

/// What a loop iterates over, with the variables it binds.
enum LoopHead {
    Range {
        start: ir::Expr,
        end: ir::Expr,
        step: ir::Expr,
        index: String,
    },
    Iterate {
        sequences: Sequence,
        iterators: Iterators,
        bindings: Vec<(String, Ty)>,
    },
}

impl LoopHead {
    fn bindings(&self) -> Vec<(String, Ty)> {
        match self {
            LoopHead::Range { index, .. } => vec![(index.clone(), Ty::int())],
            LoopHead::Iterate { bindings, .. } => bindings.clone(),
        }
    }
}

/// The names of a `for a, b in ..` target.
fn target_names(target: &ast::Expr) -> Option<Vec<&str>> {
    let ast::ExprKind::Tuple { elts } = &target.kind else {
        return None;
    };
    elts.iter()
        .map(|e| match &e.kind {
            ast::ExprKind::Name { id } => Some(id.as_str()),
            _ => None,
        })
        .collect()
}

fn single_name(target: &ast::Expr) -> Option<&str> {
    match &target.kind {
        ast::ExprKind::Name { id } => Some(id.as_str()),
        _ => None,
    }
}

fn not_iterable(ty: &Ty) -> TranslateError {
    TranslateError::type_check(format!("expected an iterable type, not {}", ty)).with_wrong_type(ty.clone())
}

impl Translator<'_> {
    pub(super) fn translate_for(
        &mut self,
        target: &ast::Expr,
        iter: &ast::Expr,
        body: &[ast::Stmt],
        ctx: &Ctx,
    ) -> Result<Statement> {
        let head = self.loop_head(target, iter, ctx)?;
        let mark = self.env.mark();
        let scope = self.env.child(ctx.scope, head.bindings());
        let block = self.translate_block(body, &ctx.in_scope(scope).looping());
        self.env.discard(mark);
        let block = block?;

        let kind = match head {
            LoopHead::Range {
                start,
                end,
                step,
                index,
            } => StmtKind::ForRangeStatement {
                start,
                end,
                step,
                index: ir::Expr::local(index, Ty::int()),
                block,
            },
            LoopHead::Iterate {
                sequences,
                iterators,
                ..
            } => StmtKind::ForStatement {
                sequences,
                iterators,
                block,
            },
        };
        Ok(Statement::void(kind))
    }

    /// `[elt for target in iter if test]` as `map` or `filter_map`.
    pub(super) fn translate_list_comp(
        &mut self,
        elt: &ast::Expr,
        generators: &[ast::Comprehension],
        ctx: &Ctx,
    ) -> Result<ir::Expr> {
        let [generator] = generators else {
            return Err(TranslateError::not_translatable(
                "only one for clause is supported in a list comprehension",
            ));
        };
        if generator.ifs.len() > 1 {
            return Err(TranslateError::not_translatable(
                "only one if clause is supported in a list comprehension",
            )
            .at(generator.ifs[1].pos));
        }
        let LoopHead::Iterate {
            sequences,
            iterators,
            bindings,
        } = self.loop_head(&generator.target, &generator.iter, ctx)?
        else {
            return Err(TranslateError::not_translatable("range is not supported in a list comprehension")
                .with_suggestion("use a for loop")
                .at(generator.iter.pos));
        };

        let mark = self.env.mark();
        let scope = self.env.child(ctx.scope, bindings);
        let inner = ctx.in_scope(scope);
        let translated = self.comprehension_parts(elt, generator.ifs.first(), &inner);
        self.env.discard(mark);
        let (block, test) = translated?;

        let ty = Ty::list(block.pseudo_type.clone());
        let function = if test.is_some() { "filter_map" } else { "map" };
        Ok(ir::Expr::new(
            ExprKind::StandardIterableCall {
                function: function.to_string(),
                sequences: Box::new(sequences),
                iterators: Box::new(iterators),
                test: test.map(Box::new),
                block: Box::new(block),
            },
            ty,
        ))
    }

    fn comprehension_parts(
        &mut self,
        elt: &ast::Expr,
        test: Option<&ast::Expr>,
        ctx: &Ctx,
    ) -> Result<(ir::Expr, Option<ir::Expr>)> {
        let test = match test {
            Some(test) => {
                let node = self.translate_expr(test, ctx)?;
                Some(self.testable(node)?)
            }
            None => None,
        };
        Ok((self.translate_expr(elt, ctx)?, test))
    }

    // ── Loop heads ─────────────────────────────────────────────────────

    fn loop_head(&mut self, target: &ast::Expr, iter: &ast::Expr, ctx: &Ctx) -> Result<LoopHead> {
        let head = match &iter.kind {
            ast::ExprKind::Call { func, args, keywords } if keywords.is_empty() => match &func.kind {
                ast::ExprKind::Name { id } if self.is_builtin_iterator(id, ctx) => match id.as_str() {
                    "range" => self.range_head(target, args, ctx)?,
                    "enumerate" => self.enumerate_head(target, args, ctx)?,
                    _ => self.zip_head(target, args, ctx)?,
                },
                ast::ExprKind::Attribute { value, attr } if attr == "items" && args.is_empty() => {
                    self.items_head(target, value, ctx)?
                }
                _ => self.plain_head(target, iter, ctx)?,
            },
            _ => self.plain_head(target, iter, ctx)?,
        };
        for (name, _) in head.bindings() {
            self.check_loop_variable(&name, target, ctx)?;
        }
        Ok(head)
    }

    fn is_builtin_iterator(&self, id: &str, ctx: &Ctx) -> bool {
        matches!(id, "range" | "enumerate" | "zip")
            && self.env.lookup(ctx.scope, id).is_none()
            && !self.defs.is_function(id)
    }

    fn check_loop_variable(&self, name: &str, target: &ast::Expr, ctx: &Ctx) -> Result<()> {
        if name_case(name) != NameCase::Snake {
            return Err(naming_error(name).at(target.pos));
        }
        if self.constant_names.contains(name) || self.env.lookup(ctx.scope, name).is_some() {
            let owner = match self.local_owner(name, ctx) {
                Some(_) => ctx.name(),
                None => "global scope".to_string(),
            };
            return Err(TranslateError::type_check(format!(
                "the loop variable {} shadows a variable of {}",
                name, owner
            ))
            .with_suggestion("rename the loop variable")
            .at(target.pos));
        }
        Ok(())
    }

    fn range_head(&mut self, target: &ast::Expr, args: &[ast::Expr], ctx: &Ctx) -> Result<LoopHead> {
        let Some(index) = single_name(target) else {
            return Err(TranslateError::not_translatable("range binds a single loop variable")
                .with_example("for i in range(n):", "for i, j in range(n):")
                .at(target.pos));
        };
        let roles: &[&str] = match args.len() {
            1 => &["end"],
            2 => &["start", "end"],
            3 => &["start", "end", "step"],
            n => {
                return Err(TranslateError::type_check(format!(
                    "range expects 1 to 3 args, not {}",
                    n
                )))
            }
        };
        let mut bounds = Vec::with_capacity(3);
        for (arg, role) in args.iter().zip(roles) {
            let node = self.translate_expr(arg, ctx)?;
            if !node.pseudo_type.is_atom(INT) {
                return Err(TranslateError::type_check(format!("expected Int for range {}", role))
                    .with_wrong_type(node.pseudo_type)
                    .at(arg.pos));
            }
            bounds.push(node);
        }
        let mut bounds = bounds.into_iter();
        let (start, end, step) = match (bounds.next(), bounds.next(), bounds.next()) {
            (Some(end), None, None) => (ir::Expr::int(0), end, ir::Expr::int(1)),
            (Some(start), Some(end), step) => (start, end, step.unwrap_or_else(|| ir::Expr::int(1))),
            _ => return Err(TranslateError::type_check("range expects 1 to 3 args, not 0")),
        };
        Ok(LoopHead::Range {
            start,
            end,
            step,
            index: index.to_string(),
        })
    }

    fn enumerate_head(&mut self, target: &ast::Expr, args: &[ast::Expr], ctx: &Ctx) -> Result<LoopHead> {
        let names = target_names(target).filter(|n| n.len() == 2).ok_or_else(|| {
            TranslateError::not_translatable("enumerate binds an index and a value")
                .with_example("for i, x in enumerate(xs):", "for p in enumerate(xs):")
                .at(target.pos)
        })?;
        let [arg] = args else {
            return Err(TranslateError::type_check(format!(
                "enumerate expects 1 arg, not {}",
                args.len()
            )));
        };
        let sequence = self.translate_expr(arg, ctx)?;
        let (index, value) = (names[0], names[1]);

        if let Ty::Dictionary(key, val) = &sequence.pseudo_type {
            let (key, val) = ((**key).clone(), (**val).clone());
            return Ok(items(sequence, index, key, value, val));
        }
        let elem = sequence
            .pseudo_type
            .element_type()
            .ok_or_else(|| not_iterable(&sequence.pseudo_type).at(arg.pos))?;
        Ok(LoopHead::Iterate {
            sequences: Sequence::ForSequenceWithIndex { sequence },
            iterators: Iterators::ForIteratorWithIndex {
                index: ir::Expr::local(index, Ty::int()),
                iterator: ir::Expr::local(value, elem.clone()),
            },
            bindings: vec![(index.to_string(), Ty::int()), (value.to_string(), elem)],
        })
    }

    fn zip_head(&mut self, target: &ast::Expr, args: &[ast::Expr], ctx: &Ctx) -> Result<LoopHead> {
        if args.len() < 2 {
            return Err(TranslateError::type_check(format!(
                "zip expects at least 2 args, not {}",
                args.len()
            )));
        }
        let names = target_names(target)
            .filter(|n| n.len() == args.len())
            .ok_or_else(|| {
                TranslateError::type_check(format!(
                    "zip of {} sequences binds {} loop variables",
                    args.len(),
                    args.len()
                ))
                .at(target.pos)
            })?;

        let mut sequences = Vec::with_capacity(args.len());
        let mut iterators = Vec::with_capacity(args.len());
        let mut bindings = Vec::with_capacity(args.len());
        for (arg, name) in args.iter().zip(names) {
            let sequence = self.translate_expr(arg, ctx)?;
            let elem = sequence
                .pseudo_type
                .element_type()
                .ok_or_else(|| not_iterable(&sequence.pseudo_type).at(arg.pos))?;
            iterators.push(ir::Expr::local(name, elem.clone()));
            bindings.push((name.to_string(), elem));
            sequences.push(sequence);
        }
        Ok(LoopHead::Iterate {
            sequences: Sequence::ForSequenceZip { sequences },
            iterators: Iterators::ForIteratorZip { iterators },
            bindings,
        })
    }

    fn items_head(&mut self, target: &ast::Expr, receiver: &ast::Expr, ctx: &Ctx) -> Result<LoopHead> {
        let sequence = self.translate_expr(receiver, ctx)?;
        let Ty::Dictionary(key, val) = &sequence.pseudo_type else {
            return Err(self.unknown_attr_error(&sequence.pseudo_type, "items"));
        };
        let (key, val) = ((**key).clone(), (**val).clone());
        let names = target_names(target).filter(|n| n.len() == 2).ok_or_else(|| {
            TranslateError::not_translatable(".items() binds a key and a value")
                .with_example("for k, v in d.items():", "for kv in d.items():")
                .at(target.pos)
        })?;
        Ok(items(sequence, names[0], key, names[1], val))
    }

    fn plain_head(&mut self, target: &ast::Expr, iter: &ast::Expr, ctx: &Ctx) -> Result<LoopHead> {
        let Some(name) = single_name(target) else {
            return Err(TranslateError::not_translatable(
                "several loop variables need enumerate, zip or .items()",
            )
            .at(target.pos));
        };
        let sequence = self.translate_expr(iter, ctx)?;
        let elem = sequence
            .pseudo_type
            .element_type()
            .ok_or_else(|| not_iterable(&sequence.pseudo_type).at(iter.pos))?;
        Ok(LoopHead::Iterate {
            sequences: Sequence::ForSequence { sequence },
            iterators: Iterators::ForIterator {
                iterator: ir::Expr::local(name, elem.clone()),
            },
            bindings: vec![(name.to_string(), elem)],
        })
    }
}

fn items(sequence: ir::Expr, key: &str, key_ty: Ty, value: &str, value_ty: Ty) -> LoopHead {
    LoopHead::Iterate {
        sequences: Sequence::ForSequenceWithItems { sequence },
        iterators: Iterators::ForIteratorWithItems {
            key: ir::Expr::local(key, key_ty.clone()),
            value: ir::Expr::local(value, value_ty.clone()),
        },
        bindings: vec![(key.to_string(), key_ty), (value.to_string(), value_ty)],
    }
}
