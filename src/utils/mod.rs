//! Utility modules
//!
//! This module contains utilities and helpers:
//! - Error types, result types and CLI diagnostics
//! - The external formatter collaborator

pub mod error;
pub mod formatter;

// Re-export commonly used items
pub use error::{CliDiagnostic, DecodeError, DecodeResult, DiagnosticSeverity};
pub use formatter::{FormatterConfig, FormatterError};
