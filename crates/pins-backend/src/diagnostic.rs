//! Diagnostics for user-facing code generation errors
//!
//! Every error caused by the user's program (as opposed to a defect in an
//! earlier phase) is reported as a `Diagnostic` tied to a source location.

pub mod error_codes;

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic schema version
pub const DIAG_VERSION: u32 = 1;

/// A user-facing error with its source location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic schema version
    pub diag_version: u32,
    /// Error code (e.g., "CG0001")
    pub code: String,
    /// Main diagnostic message
    pub message: String,
    /// File path
    pub file: String,
    /// Line number (1-based, 0 when there is no source location)
    pub line: u32,
    /// Column number (1-based, 0 when there is no source location)
    pub column: u32,
    /// Length of the offending text on its first line
    pub length: u32,
    /// Source line string
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub snippet: String,
    /// Short label for caret range
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub label: String,
    /// Additional notes (optional)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    /// Suggested fix (optional)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic with code
    pub fn error_with_code(code: impl Into<String>, message: impl Into<String>, span: Span) -> Self {
        let length = if span.end_line == span.line {
            span.end_column.saturating_sub(span.column) + 1
        } else {
            1
        };
        Self {
            diag_version: DIAG_VERSION,
            code: code.into(),
            message: message.into(),
            file: "<unknown>".to_string(),
            line: span.line,
            column: span.column,
            length: if span.is_dummy() { 0 } else { length },
            snippet: String::new(),
            label: String::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    /// Set the file path
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Set the snippet (source line)
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Set the label (caret description)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Add a help message
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Format as human-readable string
    pub fn to_human_string(&self) -> String {
        let mut output = String::new();

        // Header: error[CG0001]: illegal integer value
        output.push_str(&format!("error[{}]: {}\n", self.code, self.message));

        // Location: --> path/to/file.pins:12:9
        if self.line > 0 {
            output.push_str(&format!(
                "  --> {}:{}:{}\n",
                self.file, self.line, self.column
            ));
        } else {
            output.push_str(&format!("  --> {}\n", self.file));
        }

        // Snippet with caret
        if !self.snippet.is_empty() {
            output.push_str("   |\n");
            output.push_str(&format!("{:>2} | {}\n", self.line, self.snippet));

            if self.length > 0 && self.column > 0 {
                let padding = " ".repeat(self.column as usize - 1);
                let carets = "^".repeat(self.length as usize);
                output.push_str(&format!("   | {}{}", padding, carets));

                if !self.label.is_empty() {
                    output.push_str(&format!(" {}", self.label));
                }
                output.push('\n');
            }
        }

        for note in &self.notes {
            output.push_str(&format!("   = note: {}\n", note));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!("   = help: {}\n", help));
        }

        output
    }

    /// Format as JSON string
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(
                f,
                "[{}] {}:{}: {}",
                self.code, self.line, self.column, self.message
            )
        } else {
            write!(f, "[{}] {}", self.code, self.message)
        }
    }
}
