//! # CodeQuilt
//!
//! Decoder from the compact CodeQuilt notation to Python source.
//!
//! A CodeQuilt document is a bracketed header followed by `|||` and a body of
//! single-character keyword and operator tokens, numbered dictionary
//! references, explicit indent/dedent markers and semantic tokens that expand
//! into whole Python idioms.
//!
//! ## Example
//!
//! ```rust
//! use codequilt::decode;
//!
//! let source = decode("[V:1.0;D:[d0=value]]|||d0N").unwrap();
//! assert_eq!(source, "value\n");
//! ```
//!
//! ## Modules
//!
//! - `core::cq2py`: header resolver, lexer, parser, macro templates, emitter
//! - `data`: the fixed-token table and the shared corpus
//! - `utils`: errors, diagnostics and the external formatter

pub mod core;
pub mod data;
pub mod utils;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use crate::core::cq2py::{
    decode, decode_with_diagnostics, decode_with_options, parse_header, DecodeOptions,
    DecodeOutput, DecodeWarning, Decoder, Header, MacroRegistry, SemanticName, Token,
    UnresolvedPolicy, WarningKind,
};
pub use crate::core::cq2py::engine::tokenize;
pub use crate::utils::error::{CliDiagnostic, DecodeError, DecodeResult, DiagnosticSeverity};
pub use crate::utils::formatter::FormatterConfig;
