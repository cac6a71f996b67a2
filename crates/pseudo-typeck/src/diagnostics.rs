//! Ariadne-based rendering of translation errors.
//!
//! Rendering is kept out of the translator: an error is structured data
//! and callers choose whether to print it against the source text or as
//! plain lines.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use pseudo_common::LineIndex;

use crate::error::TranslateError;

/// The byte range of the token starting at the error's location, never
/// empty while the source is not.
fn error_span(error: &TranslateError, source: &str) -> Range<usize> {
    let len = source.len();
    let start = error
        .location
        .and_then(|pos| LineIndex::new(source).offset(pos))
        .map(|offset| offset as usize)
        .unwrap_or(0)
        .min(len);
    let word = source[start..]
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(len - start);
    let end = (start + word.max(1)).min(len);
    start..end
}

/// Render `error` against `source` with a labeled snippet.
///
/// The output is colorless so it is stable in snapshots. The suggestion
/// becomes the help text and right/wrong examples become notes.
pub fn render(error: &TranslateError, source: &str) -> String {
    let span = error_span(error, source);
    let label = match &error.wrong_type {
        Some(ty) => format!("found {}", ty),
        None => error.kind.to_string(),
    };

    let mut builder = Report::build(ReportKind::Error, span.clone())
        .with_code(error.kind.code())
        .with_message(&error.message)
        .with_config(Config::default().with_color(false))
        .with_label(Label::new(span).with_message(label).with_color(Color::Red));

    if let Some(suggestion) = &error.suggestion {
        builder.set_help(suggestion);
    }
    if let Some(right) = &error.right {
        builder.add_note(format!("right:\n{}", right));
    }
    if let Some(wrong) = &error.wrong {
        builder.add_note(format!("wrong:\n{}", wrong));
    }

    let mut buf = Vec::new();
    builder
        .finish()
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output is valid UTF-8")
}

/// Render `error` without source text.
pub fn render_plain(error: &TranslateError) -> String {
    let mut out = format!("[{}] {}", error.kind.code(), error);
    if let Some(pos) = error.location {
        out.push_str(&format!("\n  at {}", pos));
    }
    if let Some(line) = &error.source_line {
        out.push_str(&format!("\n  | {}", line));
    }
    if let Some(suggestion) = &error.suggestion {
        out.push_str(&format!("\n  help: {}", suggestion));
    }
    if let Some(right) = &error.right {
        out.push_str(&format!("\n  right:\n{}", indent(right)));
    }
    if let Some(wrong) = &error.wrong {
        out.push_str(&format!("\n  wrong:\n{}", indent(wrong)));
    }
    out
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
