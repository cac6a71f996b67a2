use std::fmt;

use serde::{Deserialize, Serialize};

/// A position in the original source text.
///
/// Lines are 1-based and columns are 0-based byte offsets into the line,
/// which is what front-end parsers for the source language report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
}

impl Pos {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Pre-computed index of line start positions.
///
/// Constructed once per source file, then used to map (line, column)
/// pairs to byte offsets and to slice single lines out of the source for
/// error snippets.
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line. The first entry is always 0.
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    /// Build a line index by scanning the source text for newline characters.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self {
            line_starts,
            len: source.len() as u32,
        }
    }

    /// Convert a [`Pos`] back to a byte offset, clamped to the source length.
    ///
    /// Returns `None` when the line does not exist.
    pub fn offset(&self, pos: Pos) -> Option<u32> {
        let line_idx = (pos.line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(line_idx)?;
        let end = self.line_end(line_idx);
        Some((start + pos.col).min(end))
    }

    /// Return the text of a 1-based line, without its trailing newline.
    pub fn line<'a>(&self, source: &'a str, line: u32) -> Option<&'a str> {
        let line_idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(line_idx)? as usize;
        let end = self.line_end(line_idx) as usize;
        source.get(start..end).map(|l| l.trim_end_matches('\r'))
    }

    fn line_end(&self, line_idx: usize) -> u32 {
        match self.line_starts.get(line_idx + 1) {
            Some(next) => next - 1,
            None => self.len,
        }
    }
}
