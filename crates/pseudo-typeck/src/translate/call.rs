//! Call resolution.
//!
//! A call is tried against, in order: the builtin free functions, library
//! functions of an imported namespace, methods of the receiver (standard
//! methods for builtin types, user methods for classes), user functions,
//! constructors, and finally any value of a resolved `Function` type.
//! Reaching an unresolved user definition translates it on the spot.

use std::rc::Rc;

use tracing::trace;

use pseudo_common::Pos;
use pseudo_syntax as ast;

use crate::api::{ApiEntry, Expansion, GLOBAL};
use crate::check::{check_params, check_signature};
use crate::defs::{DefKey, Phase};
use crate::error::{Result, TranslateError};
use crate::hierarchy::SharedSignature;
use crate::ir::{self, ExprKind};
use crate::ty::{Ty, REGEXP, STRING};

use super::ctx::Ctx;
use super::expr::is_sized;
use super::Translator;

/// Builtins that only make sense as the head of a construct.
const CONSTRUCT_ONLY: [(&str, &str); 4] = [
    ("range", "a for loop"),
    ("enumerate", "a for loop"),
    ("zip", "a for loop"),
    ("open", "a with statement"),
];

impl Translator<'_> {
    pub(super) fn translate_call(
        &mut self,
        func: &ast::Expr,
        args: &[ast::Expr],
        keywords: &[ast::Keyword],
        pos: Pos,
        ctx: &Ctx,
    ) -> Result<ir::Expr> {
        if let Some(keyword) = keywords.first() {
            return Err(TranslateError::not_translatable("keyword arguments are not supported")
                .at(keyword.value.pos));
        }
        if let Some(starred) = args.iter().find(|a| matches!(a.kind, ast::ExprKind::Starred { .. })) {
            return Err(TranslateError::not_translatable("*args in calls are not supported").at(starred.pos));
        }

        match &func.kind {
            ast::ExprKind::Name { id } => self.call_name(id, args, pos, ctx),
            ast::ExprKind::Attribute { value, attr } => self.call_attribute(value, attr, args, pos, ctx),
            _ => {
                let callee = self.translate_expr(func, ctx)?;
                self.call_value(callee, args, ctx)
            }
        }
    }

    fn translate_args(&mut self, args: &[ast::Expr], ctx: &Ctx) -> Result<Vec<ir::Expr>> {
        args.iter().map(|arg| self.translate_expr(arg, ctx)).collect()
    }

    fn call_name(&mut self, id: &str, args: &[ast::Expr], pos: Pos, ctx: &Ctx) -> Result<ir::Expr> {
        if let Some(entry) = self.api.function(GLOBAL, id).cloned() {
            let nodes = self.translate_args(args, ctx)?;
            let expansion = select(&entry, id, nodes.len())?;
            return self.expand(&expansion, id, nodes, ctx);
        }
        if self.env.lookup(ctx.scope, id).is_some() {
            let callee = self.translate_name(id, ctx)?;
            return self.call_value(callee, args, ctx);
        }
        if let Some(sig) = self.defs.function(id).map(Rc::clone) {
            let nodes = self.translate_args(args, ctx)?;
            let types = arg_types(&nodes);
            let ret = self.infer(&DefKey::Function(id.to_string()), &sig, &types, pos)?;
            let function = ir::Expr::local(id, sig.borrow().to_ty());
            return Ok(ir::Expr::new(
                ExprKind::Call {
                    function: Box::new(function),
                    args: nodes,
                },
                ret,
            ));
        }
        if self.hierarchy.is_class(id) {
            return self.new_instance(id, args, pos, ctx);
        }
        if self.hierarchy.is_exception(id) {
            return Err(TranslateError::not_translatable(format!(
                "exception {} can be created only in a raise statement",
                id
            ))
            .with_example(format!("raise {}(\"message\")", id), format!("e = {}(\"message\")", id)));
        }
        if let Some((_, construct)) = CONSTRUCT_ONLY.iter().find(|(name, _)| *name == id) {
            return Err(TranslateError::not_translatable(format!(
                "{} can be used only in {}",
                id, construct
            )));
        }
        Err(TranslateError::type_check(format!("{} is not defined", id)))
    }

    fn call_attribute(
        &mut self,
        value: &ast::Expr,
        attr: &str,
        args: &[ast::Expr],
        pos: Pos,
        ctx: &Ctx,
    ) -> Result<ir::Expr> {
        if let ast::ExprKind::Name { id } = &value.kind {
            if self.env.lookup(ctx.scope, id).is_none() && self.api.is_library(id) {
                return self.library_call(id, attr, args, ctx);
            }
            if id == "self" {
                if let Some(class) = ctx.class.clone() {
                    return self.this_method_call(&class, attr, args, pos, ctx);
                }
            }
        }

        let receiver = self.translate_expr(value, ctx)?;
        let general = receiver.pseudo_type.general_type().to_string();
        if self.hierarchy.is_class(&general) {
            let (key, sig) = self.method_of(&general, attr)?;
            let nodes = self.translate_args(args, ctx)?;
            let ret = self.infer(&key, &sig, &arg_types(&nodes), pos)?;
            return Ok(ir::Expr::new(
                ExprKind::MethodCall {
                    receiver: Box::new(receiver),
                    message: attr.to_string(),
                    args: nodes,
                },
                ret,
            ));
        }

        let Some(entry) = self.api.method(&general, attr).cloned() else {
            return Err(self.unknown_attr_error(&receiver.pseudo_type, attr));
        };
        let mut nodes = vec![receiver];
        nodes.extend(self.translate_args(args, ctx)?);
        let name = format!("{}#{}", general, attr);
        let expansion = select(&entry, &name, nodes.len() - 1)?;
        self.expand(&expansion, &name, nodes, ctx)
    }

    fn library_call(&mut self, namespace: &str, function: &str, args: &[ast::Expr], ctx: &Ctx) -> Result<ir::Expr> {
        if !self.imports.contains(namespace) {
            return Err(TranslateError::type_check(format!(
                "module {} not imported: impossible to use {}.{}",
                namespace, namespace, function
            ))
            .with_suggestion(format!("add `import {}` at the top of the file", namespace)));
        }
        let Some(entry) = self.api.function(namespace, function).cloned() else {
            return Err(TranslateError::type_check(format!(
                "{}.{} is not supported",
                namespace, function
            ))
            .with_suggestion(format!(
                "supported functions of {}:\n{}",
                namespace,
                self.api.describe(&self.api.functions, namespace)
            )));
        };
        self.use_dependency(namespace);
        let nodes = self.translate_args(args, ctx)?;
        let name = format!("{}.{}", namespace, function);
        let expansion = select(&entry, &name, nodes.len())?;
        self.expand(&expansion, &name, nodes, ctx)
    }

    fn this_method_call(
        &mut self,
        class: &str,
        message: &str,
        args: &[ast::Expr],
        pos: Pos,
        ctx: &Ctx,
    ) -> Result<ir::Expr> {
        let (key, sig) = self.method_of(class, message)?;
        let nodes = self.translate_args(args, ctx)?;
        let ret = self.infer(&key, &sig, &arg_types(&nodes), pos)?;
        Ok(ir::Expr::new(
            ExprKind::ThisMethodCall {
                message: message.to_string(),
                args: nodes,
            },
            ret,
        ))
    }

    /// The definition implementing `class#method` and its shared cell.
    fn method_of(&self, class: &str, method: &str) -> Result<(DefKey, SharedSignature)> {
        match self.hierarchy.method(class, method) {
            Some(entry) => Ok((DefKey::method(&entry.defined_in, method), Rc::clone(&entry.sig))),
            None => Err(self.unknown_attr_error(&Ty::atom(class), method)),
        }
    }

    /// `C(args)`: infer the constructor with the call's arguments and every
    /// method that needs no call-site evidence.
    fn new_instance(&mut self, class: &str, args: &[ast::Expr], pos: Pos, ctx: &Ctx) -> Result<ir::Expr> {
        let nodes = self.translate_args(args, ctx)?;
        if self.hierarchy.method(class, "__init__").is_some() {
            let (key, sig) = self.method_of(class, "__init__")?;
            self.infer(&key, &sig, &arg_types(&nodes), pos)?;
        } else if !nodes.is_empty() {
            return Err(TranslateError::type_check(format!(
                "constructor of {} didn't expect {} arguments",
                class,
                nodes.len()
            )));
        }

        let pure: Vec<(DefKey, SharedSignature)> = self
            .hierarchy
            .methods(class)
            .into_iter()
            .filter(|(name, entry)| *name != "__init__" && entry.sig.borrow().params.is_empty())
            .map(|(name, entry)| (DefKey::method(&entry.defined_in, name), Rc::clone(&entry.sig)))
            .collect();
        for (key, sig) in pure {
            if self.defs.phase(&key) == Some(Phase::Unresolved) {
                self.infer(&key, &sig, &[], pos)?;
            }
        }

        Ok(ir::Expr::new(
            ExprKind::NewInstance {
                class: Box::new(ir::Expr::typename(class)),
                params: nodes,
            },
            Ty::atom(class),
        ))
    }

    /// Call a value of a resolved `Function` type.
    fn call_value(&mut self, callee: ir::Expr, args: &[ast::Expr], ctx: &Ctx) -> Result<ir::Expr> {
        let Ty::Function(params, ret) = callee.pseudo_type.clone() else {
            return Err(TranslateError::type_check(format!(
                "only Function[..] type is callable, not {}",
                callee.pseudo_type
            ))
            .with_wrong_type(callee.pseudo_type));
        };
        if ret.has_holes() || params.iter().any(Ty::has_holes) {
            return Err(TranslateError::type_check(format!(
                "can't infer the type of a call to {}",
                callee.pseudo_type
            )));
        }
        let nodes = self.translate_args(args, ctx)?;
        check_params(&params, &arg_types(&nodes), &callee.pseudo_type.to_string(), &self.hierarchy)?;
        Ok(ir::Expr::new(
            ExprKind::Call {
                function: Box::new(callee),
                args: nodes,
            },
            *ret,
        ))
    }

    // ── Standard API expansion ─────────────────────────────────────────

    /// Expand a table entry over already translated arguments; for
    /// method expansions the receiver comes first.
    pub(super) fn expand(&mut self, expansion: &Expansion, name: &str, mut nodes: Vec<ir::Expr>, ctx: &Ctx) -> Result<ir::Expr> {
        trace!(call = name, expansion = ?expansion, "standard api");
        match expansion {
            Expansion::Call {
                namespace,
                function,
            } => {
                let sig = self
                    .api
                    .signature(namespace, function)
                    .ok_or_else(|| missing_signature(namespace, function))?;
                let found = check_signature(sig, name, None, &arg_types(&nodes), &self.hierarchy)?;
                Ok(ir::Expr::new(
                    ExprKind::StandardCall {
                        namespace: namespace.clone(),
                        function: function.clone(),
                        args: nodes,
                    },
                    found.ret,
                ))
            }
            Expansion::Method { ty, message } => {
                if nodes.is_empty() {
                    return Err(arity_error(name, 0));
                }
                let receiver = nodes.remove(0);
                self.standard_method_on(ty, message, receiver, nodes, ctx)
            }
            Expansion::Swapped { ty, message } => {
                if nodes.len() != 2 {
                    return Err(arity_error(name, nodes.len().saturating_sub(1)));
                }
                let receiver = nodes.remove(1);
                self.standard_method_on(ty, message, receiver, nodes, ctx)
            }
            Expansion::Length => {
                let [receiver] = <[ir::Expr; 1]>::try_from(nodes).map_err(|n| arity_error(name, n.len()))?;
                if !is_sized(&receiver.pseudo_type) {
                    return Err(TranslateError::type_check(format!(
                        "{} expects a String, List, Dictionary, Set, Array or Tuple, not {}",
                        name, receiver.pseudo_type
                    ))
                    .with_wrong_type(receiver.pseudo_type));
                }
                Ok(ir::Expr::new(
                    ExprKind::StandardMethodCall {
                        receiver: Box::new(receiver),
                        message: "length".to_string(),
                        args: vec![],
                    },
                    Ty::int(),
                ))
            }
            Expansion::Regex => {
                let [pattern] = <[ir::Expr; 1]>::try_from(nodes).map_err(|n| arity_error(name, n.len()))?;
                self.to_regexp(pattern)
            }
        }
    }

    /// `args[0].message(args[1..])` against `owner`'s signatures.
    pub(super) fn standard_method(
        &mut self,
        owner: &str,
        message: &str,
        mut args: Vec<ir::Expr>,
        ctx: &Ctx,
    ) -> Result<ir::Expr> {
        let receiver = args.remove(0);
        self.standard_method_on(owner, message, receiver, args, ctx)
    }

    fn standard_method_on(
        &mut self,
        owner: &str,
        message: &str,
        receiver: ir::Expr,
        args: Vec<ir::Expr>,
        ctx: &Ctx,
    ) -> Result<ir::Expr> {
        let receiver = if owner == REGEXP && receiver.pseudo_type.is_atom(STRING) {
            self.to_regexp(receiver)?
        } else {
            receiver
        };
        if receiver.pseudo_type.general_type() != owner {
            return Err(TranslateError::type_check(format!(
                "{}#{} expects a {} receiver, not {}",
                owner, message, owner, receiver.pseudo_type
            ))
            .with_wrong_type(receiver.pseudo_type));
        }

        let sig = self
            .api
            .signature(owner, message)
            .ok_or_else(|| missing_signature(owner, message))?;
        let name = format!("{}#{}", owner, message);
        let found = check_signature(
            sig,
            &name,
            Some(&receiver.pseudo_type),
            &arg_types(&args),
            &self.hierarchy,
        )?;
        let receiver = match found.refined_receiver {
            Some(refined) => self.refine(receiver, refined, ctx),
            None => receiver,
        };
        Ok(ir::Expr::new(
            ExprKind::StandardMethodCall {
                receiver: Box::new(receiver),
                message: message.to_string(),
                args,
            },
            found.ret,
        ))
    }

    /// A `Regexp` from a pattern: literals compile to a regex node.
    fn to_regexp(&self, pattern: ir::Expr) -> Result<ir::Expr> {
        if let ExprKind::String { value } = &pattern.kind {
            return Ok(ir::Expr::new(
                ExprKind::Regex { value: value.clone() },
                Ty::atom(REGEXP),
            ));
        }
        if pattern.pseudo_type.is_atom(REGEXP) {
            return Ok(pattern);
        }
        if !pattern.pseudo_type.is_atom(STRING) {
            return Err(TranslateError::type_check(format!(
                "a regular expression pattern must be a String, not {}",
                pattern.pseudo_type
            ))
            .with_wrong_type(pattern.pseudo_type));
        }
        Ok(ir::Expr::new(
            ExprKind::StandardCall {
                namespace: "regexp".to_string(),
                function: "compile".to_string(),
                args: vec![pattern],
            },
            Ty::atom(REGEXP),
        ))
    }

    /// Record what a call taught us about a receiver with holes: the
    /// binding it came from is rebound, and the node is retyped.
    pub(super) fn refine(&mut self, mut node: ir::Expr, ty: Ty, ctx: &Ctx) -> ir::Expr {
        match &node.kind {
            ExprKind::Local { name } => self.env.assign(ctx.scope, name, ty.clone()),
            ExprKind::InstanceVariable { name } => {
                if let Some(class) = &ctx.class {
                    self.refine_attr(class, name, &ty);
                }
            }
            ExprKind::Attr { object, attr } => {
                let class = object.pseudo_type.general_type().to_string();
                self.refine_attr(&class, attr, &ty);
            }
            _ => {}
        }
        trace!(from = %node.pseudo_type, to = %ty, "refined");
        node.pseudo_type = ty;
        node
    }

    fn refine_attr(&mut self, class: &str, name: &str, ty: &Ty) {
        let owner = self.hierarchy.attr(class, name).map(|(owner, _)| owner.to_string());
        if let Some(owner) = owner {
            self.hierarchy.update_attr(&owner, name, ty.clone(), false);
        }
    }
}

fn arg_types(nodes: &[ir::Expr]) -> Vec<Ty> {
    nodes.iter().map(|n| n.pseudo_type.clone()).collect()
}

fn select(entry: &ApiEntry, name: &str, arity: usize) -> Result<Expansion> {
    entry.select(arity).cloned().ok_or_else(|| match entry {
        ApiEntry::ByArity(by_arity) => {
            let accepted: Vec<String> = by_arity.keys().map(usize::to_string).collect();
            TranslateError::type_check(format!(
                "{} expects {} args, not {}",
                name,
                accepted.join(" or "),
                arity
            ))
        }
        ApiEntry::Fixed(_) => arity_error(name, arity),
    })
}

fn arity_error(name: &str, arity: usize) -> TranslateError {
    TranslateError::type_check(format!("{} can't be called with {} args", name, arity))
}

fn missing_signature(owner: &str, name: &str) -> TranslateError {
    TranslateError::type_check(format!("{}:{} has no signature in the api tables", owner, name))
}
