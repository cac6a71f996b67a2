//! The translator: syntax tree in, typed IR out.
//!
//! Translation runs in three passes over one module:
//!
//! 1. The top-level pass registers imports, constants, functions, classes
//!    and custom exceptions, and queues every other statement for main.
//!    Function and method bodies are stored untranslated.
//! 2. Functions without parameters are translated right away; they need
//!    no evidence from a call site.
//! 3. Main is translated. Every call reaching an unresolved definition
//!    translates that definition with the call's argument types.
//!
//! Definitions are then emitted in source order. A definition that no call
//! ever reached has no types and fails the unit.

mod call;
mod ctx;
mod expr;
mod iter;
mod stmt;

use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::debug;

use pseudo_common::Pos;
use pseudo_syntax as ast;

use crate::api::ApiTables;
use crate::check::check_params;
use crate::defs::{DefKey, DefinitionIndex, Phase, Routine};
use crate::env::{ScopeId, TypeEnv};
use crate::error::{Located, Result, TranslateError};
use crate::hierarchy::{Hierarchy, SharedSignature};
use crate::ir;
use crate::ty::{Ty, EXCEPTION};

use ctx::Ctx;

/// A top-level definition, in source order.
#[derive(Debug, Clone)]
enum TopDef {
    Function { name: String, pos: Pos },
    Class { name: String, base: Option<String>, pos: Pos },
    Exception { name: String, base: Option<String> },
}

/// How an assigned name is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NameCase {
    Snake,
    Screaming,
    Mixed,
}

pub(crate) fn name_case(name: &str) -> NameCase {
    let lower = name.chars().any(char::is_lowercase);
    let upper = name.chars().any(char::is_uppercase);
    match (lower, upper) {
        (_, false) => NameCase::Snake,
        (false, true) => NameCase::Screaming,
        (true, true) => NameCase::Mixed,
    }
}

pub(crate) fn naming_error(name: &str) -> TranslateError {
    TranslateError::type_check(format!(
        "{} is neither snake_case nor SCREAMING_SNAKE_CASE: use snake_case for variables and SCREAMING_SNAKE_CASE for constants",
        name
    ))
    .with_suggestion("example:\ns = 2 # local\nK = 2 # constant")
}

/// Translates one module. Owns every mutable table of the run.
pub struct Translator<'a> {
    api: &'a ApiTables,
    env: TypeEnv,
    hierarchy: Hierarchy,
    defs: DefinitionIndex,
    order: Vec<TopDef>,
    constants: Vec<ir::Constant>,
    constant_names: FxHashSet<String>,
    imports: FxHashSet<String>,
    /// Imported namespaces in first-use order.
    dependencies: Vec<String>,
    main: Vec<ast::Stmt>,
}

impl<'a> Translator<'a> {
    pub fn new(api: &'a ApiTables) -> Self {
        Translator {
            api,
            env: TypeEnv::new(),
            hierarchy: Hierarchy::new(),
            defs: DefinitionIndex::new(),
            order: Vec::new(),
            constants: Vec::new(),
            constant_names: FxHashSet::default(),
            imports: FxHashSet::default(),
            dependencies: Vec::new(),
            main: Vec::new(),
        }
    }

    /// Translate `module`, consuming the translator.
    pub fn translate(mut self, module: &ast::Module) -> Result<ir::Module> {
        self.declare_top_level(module)?;
        self.translate_pure_functions()?;
        let main_stmts = std::mem::take(&mut self.main);
        let main = self.translate_block(&main_stmts, &Ctx::module())?;
        let definitions = self.collect_definitions()?;
        Ok(ir::Module {
            dependencies: self.dependencies,
            constants: self.constants,
            definitions,
            main,
        })
    }

    // ── Top-level pass ─────────────────────────────────────────────────

    fn declare_top_level(&mut self, module: &ast::Module) -> Result<()> {
        for stmt in &module.body {
            match &stmt.kind {
                ast::StmtKind::Import { names } => self.declare_import(names).located(stmt.pos)?,
                ast::StmtKind::ImportFrom { module, .. } => {
                    return Err(TranslateError::not_translatable(format!(
                        "from {} import .. is not supported",
                        module
                    ))
                    .with_suggestion(format!("use `import {}` and call `{}.name(..)`", module, module))
                    .at(stmt.pos));
                }
                ast::StmtKind::FunctionDef(def) => {
                    check_definition(def).located(stmt.pos)?;
                    self.defs.declare_function(def.clone());
                    self.order.push(TopDef::Function {
                        name: def.name.clone(),
                        pos: stmt.pos,
                    });
                }
                ast::StmtKind::ClassDef(class) => self.declare_class(class, stmt.pos)?,
                ast::StmtKind::Assign { targets, value } if targets.len() == 1 => {
                    let ast::ExprKind::Name { id } = &targets[0].kind else {
                        self.main.push(stmt.clone());
                        continue;
                    };
                    match name_case(id) {
                        NameCase::Snake => self.main.push(stmt.clone()),
                        NameCase::Mixed => return Err(naming_error(id).at(targets[0].pos)),
                        NameCase::Screaming => self.declare_constant(id, value).located(targets[0].pos)?,
                    }
                }
                _ => self.main.push(stmt.clone()),
            }
        }
        Ok(())
    }

    fn declare_import(&mut self, names: &[ast::Alias]) -> Result<()> {
        if !self.order.is_empty() || !self.main.is_empty() {
            return Err(TranslateError::not_translatable("imports can be only on top"));
        }
        for alias in names {
            if let Some(asname) = &alias.asname {
                return Err(TranslateError::not_translatable(format!(
                    "import {} as {} is not supported",
                    alias.name, asname
                ))
                .with_suggestion(format!("use `import {}`", alias.name)));
            }
            if !self.api.is_library(&alias.name) {
                return Err(TranslateError::not_translatable(format!(
                    "module {} is not supported",
                    alias.name
                ))
                .with_suggestion(format!(
                    "supported modules: {}",
                    self.api.library_names().join(" ")
                )));
            }
            self.imports.insert(alias.name.clone());
        }
        Ok(())
    }

    fn declare_constant(&mut self, name: &str, value: &ast::Expr) -> Result<()> {
        if self.constant_names.contains(name) {
            return Err(TranslateError::type_check("you can't override a constant")
                .with_example(format!("{} = ..", name), format!("{} = ..\n{} = ..", name, name)));
        }
        if !self.main.is_empty() {
            return Err(
                TranslateError::not_translatable("constants must be initialized before all other top level code")
                    .with_example("K = 2\ndef ..", "def ..\nK = 2"),
            );
        }
        if !value.kind.is_literal() {
            return Err(TranslateError::not_translatable(
                "You can initialize constants only with literals",
            )
            .with_example("K = [2, 4]", "K = [2, x]")
            .at(value.pos));
        }
        let init = self.translate_expr(value, &Ctx::module())?;
        debug!(constant = name, pseudo_type = %init.pseudo_type, "constant");
        self.env.define(ScopeId::MODULE, name, init.pseudo_type.clone());
        self.constant_names.insert(name.to_string());
        self.constants.push(ir::Constant {
            constant: name.to_string(),
            pseudo_type: init.pseudo_type.clone(),
            init,
        });
        Ok(())
    }

    fn declare_class(&mut self, class: &ast::ClassDef, pos: Pos) -> Result<()> {
        if !class.decorators.is_empty() {
            return Err(TranslateError::not_translatable(format!(
                "decorators on class {} are not supported",
                class.name
            ))
            .at(pos));
        }

        let base = match class.bases.as_slice() {
            [] => None,
            [base] => match &base.kind {
                ast::ExprKind::Name { id } if self.hierarchy.is_exception(id) => {
                    debug!(exception = %class.name, base = %id, "custom exception");
                    self.hierarchy.declare_exception(&class.name, id);
                    self.order.push(TopDef::Exception {
                        name: class.name.clone(),
                        base: (id != EXCEPTION).then(|| id.clone()),
                    });
                    return Ok(());
                }
                ast::ExprKind::Name { id } if self.hierarchy.is_class(id) => Some(id.clone()),
                _ => return Err(single_inheritance_error().at(base.pos)),
            },
            [_, second, ..] => return Err(single_inheritance_error().at(second.pos)),
        };

        self.hierarchy.declare_class(&class.name, base.as_deref());
        for member in &class.body {
            match &member.kind {
                ast::StmtKind::FunctionDef(def) => {
                    if def.args.args.first().map(|a| a.name.as_str()) != Some("self") {
                        return Err(TranslateError::not_translatable(format!(
                            "only methods with a self argument are supported (class {})",
                            class.name
                        ))
                        .with_suggestion("example: def method_name(self, x):")
                        .at(member.pos));
                    }
                    check_definition(def).located(member.pos)?;
                    if self.hierarchy.own_methods(&class.name).contains(&def.name) {
                        return Err(TranslateError::type_check(format!(
                            "{}#{} is already defined",
                            class.name, def.name
                        ))
                        .with_suggestion("rename one of the methods")
                        .at(member.pos));
                    }
                    self.hierarchy
                        .declare_method(&class.name, &def.name, def.args.args.len() - 1);
                    self.defs.declare_method(&class.name, def.clone());
                }
                ast::StmtKind::Pass => {}
                other => {
                    return Err(TranslateError::not_translatable(format!(
                        "only methods are supported in classes, not {}",
                        other.describe()
                    ))
                    .at(member.pos))
                }
            }
        }
        self.order.push(TopDef::Class {
            name: class.name.clone(),
            base,
            pos,
        });
        Ok(())
    }

    // ── Definitions ────────────────────────────────────────────────────

    fn translate_pure_functions(&mut self) -> Result<()> {
        let pure: Vec<(DefKey, SharedSignature, Pos)> = self
            .order
            .iter()
            .filter_map(|def| match def {
                TopDef::Function { name, pos } => {
                    let sig = self.defs.function(name)?;
                    sig.borrow()
                        .params
                        .is_empty()
                        .then(|| (DefKey::Function(name.clone()), Rc::clone(sig), *pos))
                }
                _ => None,
            })
            .collect();
        for (key, sig, pos) in pure {
            if self.defs.phase(&key) == Some(Phase::Unresolved) {
                self.infer(&key, &sig, &[], pos)?;
            }
        }
        Ok(())
    }

    /// The return type of calling `key` with `args`, translating its body
    /// first if no call reached it yet.
    pub(crate) fn infer(&mut self, key: &DefKey, sig: &SharedSignature, args: &[Ty], pos: Pos) -> Result<Ty> {
        let name = key.to_string();
        let checked = {
            let current = sig.borrow();
            check_params(&current.params, args, &name, &self.hierarchy).located(pos)?
        };

        match self.defs.phase(key) {
            Some(Phase::Resolved) => {
                sig.borrow_mut().params = checked;
                return Ok(sig.borrow().ret.clone());
            }
            Some(Phase::InProgress) => {
                if !sig.borrow().has_return() {
                    return Err(recursion_error(key.name()).at(pos));
                }
                sig.borrow_mut().params = checked;
                return Ok(sig.borrow().ret.clone());
            }
            Some(Phase::Unresolved) => {}
            None => return Err(TranslateError::type_check(format!("{} is not defined", name)).at(pos)),
        }

        let def = self
            .defs
            .begin(key)
            .expect("an unresolved definition can begin");
        sig.borrow_mut().params = checked.clone();

        let skip = usize::from(key.class().is_some());
        let params: Vec<String> = def.args.args.iter().skip(skip).map(|a| a.name.clone()).collect();
        let mut bindings: Vec<(String, Ty)> = params.iter().cloned().zip(checked).collect();
        if let Some(class) = key.class() {
            bindings.push(("self".to_string(), Ty::atom(class)));
        }

        let mark = self.env.mark();
        let scope = self.env.child(ScopeId::MODULE, bindings);
        let block = self.translate_body(&def.body, &Ctx::body(scope, key, sig));
        self.env.discard(mark);
        let block = block?;

        if key.is_constructor() {
            let class = key.class().unwrap_or_default();
            sig.borrow_mut().ret = Ty::atom(class);
        } else if !sig.borrow().has_return() {
            sig.borrow_mut().ret = Ty::void();
        }

        let signature = sig.borrow().clone();
        let pseudo_type = signature.to_ty();
        let return_type = signature.ret;
        let routine = match key {
            DefKey::Function(name) => Routine::Function(ir::FunctionDefinition {
                name: name.clone(),
                params,
                block,
                pseudo_type,
                return_type: return_type.clone(),
            }),
            DefKey::Method { class, name } if key.is_constructor() => Routine::Constructor(ir::Constructor {
                name: name.clone(),
                params,
                block,
                pseudo_type,
                return_type: return_type.clone(),
                this: ir::Expr::typename(class),
            }),
            DefKey::Method { class, name } => Routine::Method(ir::MethodDefinition {
                name: name.clone(),
                params,
                block,
                pseudo_type,
                return_type: return_type.clone(),
                this: ir::Expr::typename(class),
                is_public: !name.starts_with('_'),
            }),
        };
        self.defs.finish(key, routine);
        Ok(return_type)
    }

    fn collect_definitions(&mut self) -> Result<Vec<ir::Definition>> {
        let order = std::mem::take(&mut self.order);
        let mut definitions = Vec::with_capacity(order.len());
        for def in order {
            match def {
                TopDef::Function { name, pos } => {
                    let key = DefKey::Function(name);
                    match self.defs.take_resolved(&key) {
                        Some(Routine::Function(f)) => definitions.push(ir::Definition::Function(f)),
                        _ => return Err(cant_infer_error(&key).at(pos)),
                    }
                }
                TopDef::Exception { name, base } => {
                    definitions.push(ir::Definition::Exception(ir::CustomException { name, base }))
                }
                TopDef::Class { name, base, pos } => {
                    let mut methods = Vec::new();
                    let mut constructor = None;
                    for method in self.hierarchy.own_methods(&name).to_vec() {
                        let key = DefKey::method(&name, &method);
                        match self.defs.take_resolved(&key) {
                            Some(Routine::Method(m)) => methods.push(m),
                            Some(Routine::Constructor(c)) => constructor = Some(c),
                            _ => return Err(cant_infer_error(&key).at(pos)),
                        }
                    }
                    let attrs = self
                        .hierarchy
                        .own_attrs(&name)
                        .iter()
                        .map(|attr| ir::ClassAttr {
                            name: attr.name.clone(),
                            pseudo_type: attr.ty.clone(),
                            is_public: attr.is_public,
                        })
                        .collect();
                    definitions.push(ir::Definition::Class(ir::ClassDefinition {
                        name,
                        base,
                        attrs,
                        methods,
                        constructor,
                    }));
                }
            }
        }
        Ok(definitions)
    }

    // ── Blocks ─────────────────────────────────────────────────────────

    /// Translate a definition body; its final statement is in tail
    /// position.
    fn translate_body(&mut self, stmts: &[ast::Stmt], ctx: &Ctx) -> Result<Vec<ir::Stmt>> {
        let mut out = Vec::with_capacity(stmts.len());
        for (i, stmt) in stmts.iter().enumerate() {
            let ctx = ctx.last(i + 1 == stmts.len());
            if let Some(node) = self.translate_stmt(stmt, &ctx)? {
                out.push(node);
            }
        }
        Ok(out)
    }

    /// Translate a nested block. Only its final statement inherits the
    /// tail position of the enclosing statement.
    fn translate_block(&mut self, stmts: &[ast::Stmt], ctx: &Ctx) -> Result<Vec<ir::Stmt>> {
        let mut out = Vec::with_capacity(stmts.len());
        for (i, stmt) in stmts.iter().enumerate() {
            let ctx = ctx.last(ctx.is_last && i + 1 == stmts.len());
            if let Some(node) = self.translate_stmt(stmt, &ctx)? {
                out.push(node);
            }
        }
        Ok(out)
    }

    /// Record a use of an imported namespace.
    fn use_dependency(&mut self, namespace: &str) {
        if !self.dependencies.iter().any(|d| d == namespace) {
            self.dependencies.push(namespace.to_string());
        }
    }
}

/// Reject definition forms outside the translatable subset.
fn check_definition(def: &ast::FunctionDef) -> Result<()> {
    let unsupported = if !def.decorators.is_empty() {
        Some("decorators")
    } else if def.args.vararg.is_some() {
        Some("*args")
    } else if def.args.kwarg.is_some() {
        Some("**kwargs")
    } else if !def.args.kwonlyargs.is_empty() || !def.args.kw_defaults.is_empty() {
        Some("keyword-only arguments")
    } else if !def.args.defaults.is_empty() {
        Some("default arguments")
    } else {
        None
    };
    match unsupported {
        Some(what) => Err(TranslateError::not_translatable(format!(
            "{} in {} are not supported",
            what, def.name
        ))),
        None => Ok(()),
    }
}

fn single_inheritance_error() -> TranslateError {
    TranslateError::not_translatable("only single inheritance from an already defined class is supported")
}

fn recursion_error(name: &str) -> TranslateError {
    TranslateError::type_check(format!("please move recursion in a next branch in {}", name))
        .with_suggestion("a recursive call can be inferred only after a branch that returns without recursing")
        .with_example(
            "def countdown(n):\n    if n == 0:\n        return 0\n    else:\n        return countdown(n - 1)",
            "def countdown(n):\n    if n > 0:\n        return countdown(n - 1)\n    ..",
        )
}

fn cant_infer_error(key: &DefKey) -> TranslateError {
    TranslateError::type_check(format!("cannot infer the types of {}", key))
        .with_suggestion("types are inferred from calls: call it at least once")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_name_case() {
        assert_eq!(name_case("total_count"), NameCase::Snake);
        assert_eq!(name_case("_x1"), NameCase::Snake);
        assert_eq!(name_case("MAX_SIZE"), NameCase::Screaming);
        assert_eq!(name_case("maxSize"), NameCase::Mixed);
    }
}
