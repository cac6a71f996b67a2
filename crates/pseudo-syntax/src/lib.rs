//! Syntax tree consumed by the pseudo translator.
//!
//! The tree mirrors the node vocabulary produced by front-end parsers of
//! the source language: a module of statements, function and class
//! definitions, assignments, calls, attribute access, literals,
//! control flow, comprehensions and exception constructs. Every node
//! carries the [`Pos`] it started at.
//!
//! The translator never parses text itself. A tree arrives either as JSON
//! (every type here is `serde`-deserializable, tagged by `"node"`) or is
//! assembled directly with the helpers in [`build`].

pub mod ast;
pub mod build;

pub use ast::*;
pub use pseudo_common::Pos;

/// Deserialize a module tree from its JSON form.
pub fn from_json(json: &str) -> serde_json::Result<Module> {
    serde_json::from_str(json)
}
