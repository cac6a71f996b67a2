//! Shared types for the pseudo translator: source positions and the
//! line index used to slice source lines for diagnostics.

pub mod span;

pub use span::{LineIndex, Pos};
