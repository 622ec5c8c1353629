//! Error handling for CodeQuilt decoding
//!
//! This module provides the fatal error type, the result alias used by every
//! decoder stage, and the CLI-facing diagnostic representation of warnings.

use std::fmt;

use serde::Serialize;

/// Number of characters shown on each side of an error position.
const CONTEXT_RADIUS: usize = 12;

/// Fatal decode error. Any of these aborts the decode and no output is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Header segment is malformed (missing brackets, bad field, bad key, bad base64)
    HeaderFormat {
        position: usize,
        message: String,
        context: String,
    },
    /// Body text matched none of the lexer rules, or a literal was malformed
    Lex {
        position: usize,
        message: String,
        context: String,
    },
    /// Semantic-token parameter list or body block is structurally broken
    Parse {
        position: usize,
        message: String,
        context: String,
    },
    /// A macro template rejected its invocation (arity, level code, missing body)
    Macro {
        name: String,
        message: String,
        position: usize,
        context: String,
    },
    /// Unresolved dictionary reference under the strict policy
    UnresolvedReference {
        key: String,
        position: usize,
        context: String,
    },
    /// IO error (for file operations)
    Io { message: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::HeaderFormat {
                position,
                message,
                context,
            } => write!(
                f,
                "Header format error at offset {}: {} (near \"{}\")",
                position, message, context
            ),
            DecodeError::Lex {
                position,
                message,
                context,
            } => write!(
                f,
                "Lex error at offset {}: {} (near \"{}\")",
                position, message, context
            ),
            DecodeError::Parse {
                position,
                message,
                context,
            } => write!(
                f,
                "Parse error at offset {}: {} (near \"{}\")",
                position, message, context
            ),
            DecodeError::Macro {
                name,
                message,
                position,
                context,
            } => {
                write!(f, "Macro error in {} at offset {}: {}", name, position, message)?;
                if !context.is_empty() {
                    write!(f, " (near \"{}\")", context)?;
                }
                Ok(())
            }
            DecodeError::UnresolvedReference {
                key,
                position,
                context,
            } => write!(
                f,
                "Unresolved reference '{}' at offset {} (near \"{}\")",
                key, position, context
            ),
            DecodeError::Io { message } => write!(f, "IO error: {}", message),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for decode operations
pub type DecodeResult<T> = Result<T, DecodeError>;

// Convenience constructors for errors
impl DecodeError {
    pub fn header_at(source: &str, position: usize, message: impl Into<String>) -> Self {
        DecodeError::HeaderFormat {
            position,
            message: message.into(),
            context: context_window(source, position),
        }
    }

    pub fn lex_at(source: &str, position: usize, message: impl Into<String>) -> Self {
        DecodeError::Lex {
            position,
            message: message.into(),
            context: context_window(source, position),
        }
    }

    pub fn parse_at(source: &str, position: usize, message: impl Into<String>) -> Self {
        DecodeError::Parse {
            position,
            message: message.into(),
            context: context_window(source, position),
        }
    }

    /// Macro error without a context window; the session fills it in
    /// through `with_source`
    pub fn macro_error(name: impl Into<String>, position: usize, message: impl Into<String>) -> Self {
        DecodeError::Macro {
            name: name.into(),
            message: message.into(),
            position,
            context: String::new(),
        }
    }

    /// Fill the context window of a macro error from the text its offset points into
    pub fn with_source(self, source: &str) -> Self {
        match self {
            DecodeError::Macro {
                name,
                message,
                position,
                context,
            } if context.is_empty() => DecodeError::Macro {
                name,
                message,
                position,
                context: context_window(source, position),
            },
            other => other,
        }
    }

    /// Byte offset of the failure in the document, when the error has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            DecodeError::HeaderFormat { position, .. }
            | DecodeError::Lex { position, .. }
            | DecodeError::Parse { position, .. }
            | DecodeError::Macro { position, .. }
            | DecodeError::UnresolvedReference { position, .. } => Some(*position),
            DecodeError::Io { .. } => None,
        }
    }

    /// Shift the offset of a positioned error by `base` bytes.
    ///
    /// Stages that work on a slice of the document report slice-relative
    /// offsets; the session rebases them onto the whole document. Header
    /// errors are left alone since the header starts the document.
    pub fn rebased(self, base: usize) -> Self {
        match self {
            DecodeError::Lex {
                position,
                message,
                context,
            } => DecodeError::Lex {
                position: position + base,
                message,
                context,
            },
            DecodeError::Parse {
                position,
                message,
                context,
            } => DecodeError::Parse {
                position: position + base,
                message,
                context,
            },
            DecodeError::Macro {
                name,
                message,
                position,
                context,
            } => DecodeError::Macro {
                name,
                message,
                position: position + base,
                context,
            },
            DecodeError::UnresolvedReference {
                key,
                position,
                context,
            } => DecodeError::UnresolvedReference {
                key,
                position: position + base,
                context,
            },
            other => other,
        }
    }
}

/// Render the characters around `position` for an error message.
///
/// `position` is a byte offset; the window is clamped to char boundaries and
/// control characters are escaped so the window stays on one line.
pub fn context_window(source: &str, position: usize) -> String {
    let position = position.min(source.len());
    let before: Vec<(usize, char)> = source[..position].char_indices().collect();
    let start = before
        .len()
        .checked_sub(CONTEXT_RADIUS)
        .map(|i| before[i].0)
        .unwrap_or(0);
    let end = source[position..]
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map(|(i, _)| position + i)
        .unwrap_or(source.len());
    source[start..end].escape_debug().to_string()
}

// =============================================================================
// Unified CLI Diagnostic System
// =============================================================================

/// Severity level for CLI diagnostics (determines coloring).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Problems that degrade the output (placeholders were emitted)
    Error,
    /// Suspicious input that was still decoded
    Warning,
    /// Informational (cyan) - e.g., long literal, formatter fallback
    Info,
}

/// Unified diagnostic type for CLI output.
#[derive(Debug, Clone, Serialize)]
pub struct CliDiagnostic {
    pub severity: DiagnosticSeverity,
    /// Warning kind as string (e.g., "unresolved reference")
    pub kind: String,
    pub message: String,
    /// Location context (e.g., "d99", "offset 42", "header")
    pub location: Option<String>,
}

impl CliDiagnostic {
    /// Create a new diagnostic.
    pub fn new(
        severity: DiagnosticSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind: kind.into(),
            message: message.into(),
            location: None,
        }
    }

    /// Add location context.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Get ANSI color code for this diagnostic's severity.
    pub fn color_code(&self) -> &'static str {
        match self.severity {
            DiagnosticSeverity::Error => "\x1b[31m",   // red
            DiagnosticSeverity::Warning => "\x1b[33m", // yellow
            DiagnosticSeverity::Info => "\x1b[36m",    // cyan
        }
    }
}

impl fmt::Display for CliDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref loc) = self.location {
            write!(f, "[{}] {}: {}", self.kind, loc, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}
