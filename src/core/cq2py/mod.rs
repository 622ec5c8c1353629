//! CodeQuilt to Python decoder
//!
//! A document is `header "|||" body`. The header is resolved once into
//! dictionaries and options, then the body is drained token by token through
//! the lexer, the structural parser and the macro expander into the emitter.
//! An optional external formatter runs once over the finished text.

pub mod context;
pub mod emitter;
pub mod engine;
pub mod header;
pub mod literal;

pub use context::{DecodeOptions, DecodeSession, UnresolvedPolicy};
pub use engine::{MacroRegistry, SemanticName, SemanticToken, Template, Token, TokenList};
pub use header::{Header, HeaderSettings, OptionValue, SUPPORTED_VERSION};

use serde::Serialize;

use crate::utils::error::{CliDiagnostic, DecodeError, DecodeResult, DiagnosticSeverity};
use crate::utils::formatter;

/// Separator between the header and the body
pub const DOCUMENT_SEPARATOR: &str = "|||";

// =============================================================================
// Warning System
// =============================================================================

/// Kind of recoverable condition met while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Header version differs from the supported one
    VersionMismatch,
    /// A `D` value is not a valid Python identifier
    InvalidIdentifier,
    /// A reference had no dictionary entry; a placeholder was emitted
    UnresolvedReference,
    /// Dedent at indent level zero was ignored
    DedentBelowZero,
    /// Semantic token with no registered template was skipped
    UnknownSemanticToken,
    /// Literal longer than the configured threshold
    LongLiteral,
    /// External formatter failed; output is unformatted
    FormatterUnavailable,
    /// Header field that the decoder does not know
    UnknownHeaderField,
    /// Header option with an unusable value
    InvalidOption,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningKind::VersionMismatch => write!(f, "version mismatch"),
            WarningKind::InvalidIdentifier => write!(f, "invalid identifier"),
            WarningKind::UnresolvedReference => write!(f, "unresolved reference"),
            WarningKind::DedentBelowZero => write!(f, "dedent below zero"),
            WarningKind::UnknownSemanticToken => write!(f, "unknown semantic token"),
            WarningKind::LongLiteral => write!(f, "long literal"),
            WarningKind::FormatterUnavailable => write!(f, "formatter unavailable"),
            WarningKind::UnknownHeaderField => write!(f, "unknown header field"),
            WarningKind::InvalidOption => write!(f, "invalid option"),
        }
    }
}

/// A recoverable condition; decoding continued past it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeWarning {
    pub kind: WarningKind,
    pub message: String,
    /// Location context (e.g., "d99", "offset 42", "header")
    pub location: Option<String>,
}

impl DecodeWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        DecodeWarning {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn severity(&self) -> DiagnosticSeverity {
        match self.kind {
            WarningKind::UnresolvedReference => DiagnosticSeverity::Error,
            WarningKind::VersionMismatch
            | WarningKind::InvalidIdentifier
            | WarningKind::DedentBelowZero
            | WarningKind::UnknownSemanticToken
            | WarningKind::UnknownHeaderField
            | WarningKind::InvalidOption => DiagnosticSeverity::Warning,
            WarningKind::LongLiteral | WarningKind::FormatterUnavailable => DiagnosticSeverity::Info,
        }
    }

    /// Unresolved reference, reported with the placeholder that replaced it
    pub fn unresolved(key: &str, placeholder: &str) -> Self {
        DecodeWarning::new(
            WarningKind::UnresolvedReference,
            format!("no dictionary entry for '{}', emitted {}", key, placeholder),
        )
        .with_location(key.to_string())
    }

    pub fn dedent_below_zero(offset: usize) -> Self {
        DecodeWarning::new(
            WarningKind::DedentBelowZero,
            "dedent at indent level zero ignored",
        )
        .with_location(format!("offset {}", offset))
    }

    pub fn unknown_semantic(name: SemanticName, offset: usize) -> Self {
        DecodeWarning::new(
            WarningKind::UnknownSemanticToken,
            format!("no template registered for {}, token skipped", name),
        )
        .with_location(format!("offset {}", offset))
    }
}

impl std::fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref loc) = self.location {
            write!(f, "[{}] {}: {}", self.kind, loc, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}

impl From<DecodeWarning> for CliDiagnostic {
    fn from(warning: DecodeWarning) -> Self {
        let mut diag = CliDiagnostic::new(
            warning.severity(),
            warning.kind.to_string(),
            warning.message,
        );
        if let Some(loc) = warning.location {
            diag = diag.with_location(loc);
        }
        diag
    }
}

/// Record a warning and mirror it to the log
pub(crate) fn record(warnings: &mut Vec<DecodeWarning>, warning: DecodeWarning) {
    match warning.severity() {
        DiagnosticSeverity::Info => log::info!("{}", warning),
        _ => log::warn!("{}", warning),
    }
    warnings.push(warning);
}

/// Decoded source plus the warnings met on the way
#[derive(Debug, Clone, Serialize)]
pub struct DecodeOutput {
    pub content: String,
    pub warnings: Vec<DecodeWarning>,
}

// =============================================================================
// Decoder
// =============================================================================

/// Decoder configured with options and a macro registry.
///
/// A decoder holds no per-document state, so one instance can decode any
/// number of documents, from any number of threads.
#[derive(Debug, Clone)]
pub struct Decoder<'r> {
    options: DecodeOptions,
    registry: &'r MacroRegistry,
}

impl Default for Decoder<'static> {
    fn default() -> Self {
        Decoder::new(DecodeOptions::default())
    }
}

impl Decoder<'static> {
    /// Decoder using the standard template set
    pub fn new(options: DecodeOptions) -> Self {
        Decoder {
            options,
            registry: MacroRegistry::standard_ref(),
        }
    }
}

impl<'r> Decoder<'r> {
    /// Decoder using a custom template set
    pub fn with_registry(options: DecodeOptions, registry: &'r MacroRegistry) -> Self {
        Decoder { options, registry }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode a full document
    pub fn decode(&self, input: &str) -> DecodeResult<DecodeOutput> {
        let (header_text, body, body_offset) = split_document(input)?;

        let (header, mut warnings) = parse_header(header_text)?;
        let settings = header.settings(&mut warnings);
        log::debug!(
            "header resolved: version {}, {} identifiers, {} literals, {} imports",
            header.version,
            header.dynamic.len(),
            header.literals.len(),
            header.imports.len()
        );

        let mut session =
            DecodeSession::new(&header, &settings, &self.options, self.registry, body, warnings)
                .with_origin(body_offset);
        session.check_literal_lengths();
        session.run().map_err(|e| e.rebased(body_offset))?;
        let (mut content, mut warnings) = session.finish();

        if self.options.emit_imports && !header.imports.is_empty() {
            content.insert_str(0, &header::render_imports(&header.imports));
        }

        if let Some(ref config) = self.options.formatter {
            match formatter::run_formatter(&content, config) {
                Ok(formatted) => content = formatted,
                Err(failure) => record(
                    &mut warnings,
                    DecodeWarning::new(
                        WarningKind::FormatterUnavailable,
                        format!("{}; returning unformatted output", failure),
                    )
                    .with_location(config.effective_command()),
                ),
            }
        }

        Ok(DecodeOutput { content, warnings })
    }
}

/// Split a document at the first `|||` into header, body and body offset
fn split_document(input: &str) -> DecodeResult<(&str, &str, usize)> {
    let sep = input.find(DOCUMENT_SEPARATOR).ok_or_else(|| {
        DecodeError::header_at(
            input,
            input.len(),
            format!("missing '{}' separator between header and body", DOCUMENT_SEPARATOR),
        )
    })?;
    let body_offset = sep + DOCUMENT_SEPARATOR.len();
    Ok((&input[..sep], &input[body_offset..], body_offset))
}

/// Parse a header segment `[...]` into a `Header` and its warnings
pub fn parse_header(text: &str) -> DecodeResult<(Header, Vec<DecodeWarning>)> {
    header::parse(text)
}

/// Decode a document with default options
pub fn decode(input: &str) -> DecodeResult<String> {
    decode_with_diagnostics(input).map(|out| out.content)
}

/// Decode a document with custom options
pub fn decode_with_options(input: &str, options: DecodeOptions) -> DecodeResult<String> {
    Decoder::new(options).decode(input).map(|out| out.content)
}

/// Decode a document and return the warnings alongside the content
pub fn decode_with_diagnostics(input: &str) -> DecodeResult<DecodeOutput> {
    Decoder::default().decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_document() {
        let (header, body, offset) = split_document("[V:1.0]|||d0N").unwrap();
        assert_eq!(header, "[V:1.0]");
        assert_eq!(body, "d0N");
        assert_eq!(offset, 10);
    }

    #[test]
    fn test_split_uses_first_separator() {
        let (_, body, _) = split_document("[V:1.0]|||${a ||| b}").unwrap();
        assert_eq!(body, "${a ||| b}");
    }

    #[test]
    fn test_missing_separator() {
        let err = split_document("[V:1.0]d0N").unwrap_err();
        assert!(matches!(err, DecodeError::HeaderFormat { position: 10, .. }));
        assert!(err.to_string().contains("near \"[V:1.0]d0N\""));
    }

    #[test]
    fn test_warning_severity_mapping() {
        let w = DecodeWarning::unresolved("d9", "__UNKNOWN_DYNAMIC_d9__");
        let diag: CliDiagnostic = w.into();
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.kind, "unresolved reference");
        assert_eq!(diag.location.as_deref(), Some("d9"));

        let long = DecodeWarning::new(WarningKind::LongLiteral, "long");
        assert_eq!(long.severity(), DiagnosticSeverity::Info);
    }

    #[test]
    fn test_warning_display() {
        let w = DecodeWarning::dedent_below_zero(4);
        assert_eq!(
            w.to_string(),
            "[dedent below zero] offset 4: dedent at indent level zero ignored"
        );
    }

    #[test]
    fn test_body_errors_are_document_relative() {
        let err = decode("[V:1.0]|||d0 `").unwrap_err();
        assert_eq!(err.position(), Some(13));
    }
}
