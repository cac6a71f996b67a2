//! Translation errors.
//!
//! Every fatal condition becomes one [`TranslateError`]. The first error
//! aborts the unit; there is no recovery. Construction goes through the
//! two kind constructors and the `with_*` builders so raise sites stay on
//! one line where possible.

use std::fmt;

use pseudo_common::{LineIndex, Pos};

use crate::ty::Ty;

/// The two classes of user-facing failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Syntax or a feature outside the translatable subset.
    NotTranslatable,
    /// Arity or type mismatches, undefined names, naming violations.
    TypeCheck,
}

impl ErrorKind {
    /// Stable diagnostic code.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::NotTranslatable => "P0001",
            ErrorKind::TypeCheck => "P0002",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotTranslatable => write!(f, "not translatable"),
            ErrorKind::TypeCheck => write!(f, "type check error"),
        }
    }
}

/// A structured translation failure.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TranslateError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Pos>,
    /// The offending source line, filled in from the source text.
    pub source_line: Option<String>,
    pub suggestion: Option<String>,
    pub right: Option<String>,
    pub wrong: Option<String>,
    /// The type that was rejected, when one was.
    pub wrong_type: Option<Ty>,
}

/// Result alias used throughout the translator.
pub type Result<T, E = TranslateError> = std::result::Result<T, E>;

impl TranslateError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        TranslateError {
            kind,
            message: message.into(),
            location: None,
            source_line: None,
            suggestion: None,
            right: None,
            wrong: None,
            wrong_type: None,
        }
    }

    pub fn not_translatable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotTranslatable, message)
    }

    pub fn type_check(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeCheck, message)
    }

    /// Attach a location unless one is already set.
    ///
    /// Inner raise sites know the most precise position, so the first
    /// location wins.
    pub fn at(mut self, pos: Pos) -> Self {
        if self.location.is_none() {
            self.location = Some(pos);
        }
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_example(mut self, right: impl Into<String>, wrong: impl Into<String>) -> Self {
        self.right = Some(right.into());
        self.wrong = Some(wrong.into());
        self
    }

    pub fn with_wrong_type(mut self, ty: Ty) -> Self {
        self.wrong_type = Some(ty);
        self
    }

    /// Fill `source_line` from the source text at the error's location.
    pub fn with_source(mut self, source: &str) -> Self {
        if self.source_line.is_none() {
            if let Some(pos) = self.location {
                self.source_line = LineIndex::new(source)
                    .line(source, pos.line)
                    .map(str::to_string);
            }
        }
        self
    }
}

/// Short-hand for attaching a position to every error of a result.
pub(crate) trait Located<T> {
    fn located(self, pos: Pos) -> Result<T>;
}

impl<T> Located<T> for Result<T> {
    fn located(self, pos: Pos) -> Result<T> {
        self.map_err(|e| e.at(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_location_wins() {
        let err = TranslateError::type_check("x is not defined")
            .at(Pos::new(3, 4))
            .at(Pos::new(1, 0));
        assert_eq!(err.location, Some(Pos::new(3, 4)));
    }

    #[test]
    fn source_line_is_sliced() {
        let source = "a = 1\nb = c\n";
        let err = TranslateError::type_check("c is not defined")
            .at(Pos::new(2, 4))
            .with_source(source);
        assert_eq!(err.source_line.as_deref(), Some("b = c"));
    }

    #[test]
    fn display_names_the_kind() {
        let err = TranslateError::not_translatable("lambda is not supported");
        assert_eq!(err.to_string(), "not translatable: lambda is not supported");
    }
}
