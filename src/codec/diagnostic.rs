//! Diagnostic types for CNL parsing.
//!
//! Structural and grammar mismatches never abort a parse and never surface as
//! validation errors; they become low-severity diagnostics so a host UI can
//! highlight unparsed lines without blocking saves.

use serde::{Deserialize, Serialize};

/// Non-fatal information produced while compiling CNL text.
///
/// Distinct from [`ErrorRecord`](crate::validate::ErrorRecord)s, which report
/// schema violations in an otherwise well-formed operation stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseDiagnostic {
    /// A line that matched no statement grammar and was dropped or treated as
    /// inert content.
    SkippedLine {
        /// 1-based line number in the source text
        line: usize,
        text: String,
        reason: String,
    },

    /// A warning about the parse (e.g., a missing mindmap directive)
    Warning(String),

    /// An informational message about the parse
    Info(String),
}

impl ParseDiagnostic {
    pub fn skipped(line: usize, text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SkippedLine {
            line,
            text: text.into(),
            reason: reason.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning(message.into())
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::Info(message.into())
    }

    pub fn is_skipped_line(&self) -> bool {
        matches!(self, Self::SkippedLine { .. })
    }
}

impl std::fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SkippedLine { line, text, reason } => {
                write!(f, "Skipped line {line} ({reason}): {text}")
            }
            Self::Warning(msg) => write!(f, "Warning: {msg}"),
            Self::Info(msg) => write!(f, "Info: {msg}"),
        }
    }
}
