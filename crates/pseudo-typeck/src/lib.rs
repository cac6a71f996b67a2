//! Pseudo translator core: type inference over a dynamically typed syntax
//! tree and translation into a typed IR.
//!
//! Every expression of the input tree is assigned a pseudo-type. Calls are
//! resolved against the standard API tables or against user definitions,
//! which are inferred lazily from the argument types of their first call.
//! The result is a single [`ir::Module`]; the first violation of the
//! supported subset aborts the unit with a [`TranslateError`].
//!
//! # Architecture
//!
//! - [`ty`]: pseudo-types (`Int`, `List[String]`, `Function[Int, Int]`, ...)
//! - [`env`]: arena of scopes mapping names to pseudo-types
//! - [`api`]: standard function, method and operator tables
//! - [`check`]: compatibility, unification and signature matching
//! - [`hierarchy`]: classes, shared method signatures, attributes, exceptions
//! - [`defs`]: per-definition inference state
//! - [`translate`]: the translator driving all of the above
//! - [`ir`]: the typed output tree
//! - [`error`], [`diagnostics`]: structured errors and their rendering
//! - [`config`]: API table overrides read from TOML

pub mod api;
pub mod check;
pub mod config;
pub mod defs;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod hierarchy;
pub mod ir;
pub mod translate;
pub mod ty;

pub use api::ApiTables;
pub use config::{ApiOverrides, ConfigError, TranslateOptions};
pub use error::{ErrorKind, Result, TranslateError};
pub use translate::Translator;
pub use ty::Ty;

use pseudo_syntax::Module;

/// Translate `module` with the standard API tables.
///
/// `source` is the text the tree was parsed from; errors carry the
/// offending line.
pub fn translate(module: &Module, source: &str) -> Result<ir::Module> {
    translate_with(module, &TranslateOptions::new(source))
}

/// Translate `module` with explicit options.
pub fn translate_with(module: &Module, options: &TranslateOptions) -> Result<ir::Module> {
    let result = Translator::new(&options.api).translate(module);
    match &options.source {
        Some(source) => result.map_err(|e| e.with_source(source)),
        None => result,
    }
}
