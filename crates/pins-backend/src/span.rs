//! Source locations
//!
//! Every AST node and every emitted instruction carries a `Span`.
//! Lines and columns are 1-based; a span of all zeros marks
//! compiler-synthesized code with no source counterpart.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A range in the source text, from `line:column` to `end_line:end_column`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Span {
    /// Create a span covering `line:column` to `end_line:end_column`
    pub fn new(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    /// Create a span that starts and ends at the same position
    pub fn point(line: u32, column: u32) -> Self {
        Self::new(line, column, line, column)
    }

    /// Span for synthesized instructions (program prologue)
    pub fn dummy() -> Self {
        Self::default()
    }

    pub fn is_dummy(&self) -> bool {
        *self == Self::dummy()
    }

    pub fn is_point(&self) -> bool {
        self.line == self.end_line && self.column == self.end_column
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_point() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(
                f,
                "{}:{}-{}:{}",
                self.line, self.column, self.end_line, self.end_column
            )
        }
    }
}
