//! Header resolver
//!
//! Parses the bracketed header segment:
//!
//! ```text
//! header := "[" field (";" field)* "]"
//! field  := key ":" value
//! list   := "[" entry ("," entry)* "]"
//! ```
//!
//! `V` is required. `D` and `X` are `key=value` lists, `X` values are base64.
//! `O` entries are bare flags or `key=value`. `I` is a plain list and `C` is
//! captured after a format check.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::{record, DecodeWarning, WarningKind};
use crate::utils::error::{DecodeError, DecodeResult};

/// Notation version this decoder implements
pub const SUPPORTED_VERSION: &str = "1.0";

/// Default literal-length warning threshold (`lth`)
pub const DEFAULT_LITERAL_THRESHOLD: usize = 80;

/// Default logger object used by `LOG` and `TRYLOG` (`log`)
pub const DEFAULT_LOGGER: &str = "logger";

const MAX_INDENT_WIDTH: usize = 16;

lazy_static! {
    static ref DYNAMIC_KEY_RE: Regex = Regex::new(r"^d[0-9]+$").expect("valid regex");
    static ref LITERAL_KEY_RE: Regex = Regex::new(r"^l[0-9]+$").expect("valid regex");
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[^\W\d]\w*$").expect("valid regex");
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Returns true if `name` can be used as a Python identifier
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name) && !PYTHON_KEYWORDS.contains(&name)
}

/// Value of an `O` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag,
    Value(String),
}

impl OptionValue {
    pub fn as_value(&self) -> Option<&str> {
        match self {
            OptionValue::Flag => None,
            OptionValue::Value(v) => Some(v),
        }
    }
}

/// Resolved header. Built once per decode and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: String,
    /// Optional `lang` field; only `python` output exists
    pub lang: Option<String>,
    /// `dK` -> identifier
    pub dynamic: IndexMap<String, String>,
    /// `lK` -> decoded literal content
    pub literals: IndexMap<String, String>,
    pub options: IndexMap<String, OptionValue>,
    pub imports: Vec<String>,
    pub checksum: Option<String>,
}

/// Decode settings taken from the header options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSettings {
    pub literal_threshold: usize,
    pub keep_comments: bool,
    /// `ind` override of the indent width
    pub indent_width: Option<usize>,
    pub logger: String,
    pub strict: bool,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        HeaderSettings {
            literal_threshold: DEFAULT_LITERAL_THRESHOLD,
            keep_comments: false,
            indent_width: None,
            logger: DEFAULT_LOGGER.to_string(),
            strict: false,
        }
    }
}

impl Header {
    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    /// Interpret the recognized options. Unusable values keep the default
    /// and raise an `InvalidOption` warning.
    pub fn settings(&self, warnings: &mut Vec<DecodeWarning>) -> HeaderSettings {
        let mut settings = HeaderSettings::default();

        for (key, value) in &self.options {
            match (key.as_str(), value) {
                ("lth", OptionValue::Value(v)) => match v.parse::<usize>() {
                    Ok(n) => settings.literal_threshold = n,
                    Err(_) => invalid_option(warnings, key, v, "expected a non-negative integer"),
                },
                ("cmt", OptionValue::Value(v)) => match v.as_str() {
                    "keep" => settings.keep_comments = true,
                    "drop" | "strip" => settings.keep_comments = false,
                    _ => invalid_option(warnings, key, v, "expected 'keep' or 'drop'"),
                },
                ("ind", OptionValue::Value(v)) => match v.parse::<usize>() {
                    Ok(n) if (1..=MAX_INDENT_WIDTH).contains(&n) => settings.indent_width = Some(n),
                    _ => invalid_option(
                        warnings,
                        key,
                        v,
                        &format!("expected an integer between 1 and {}", MAX_INDENT_WIDTH),
                    ),
                },
                ("log", OptionValue::Value(v)) => {
                    if is_identifier(v) {
                        settings.logger = v.clone();
                    } else {
                        invalid_option(warnings, key, v, "expected an identifier");
                    }
                }
                ("strict", OptionValue::Flag) => settings.strict = true,
                ("strict", OptionValue::Value(v)) => match v.as_str() {
                    "true" | "1" | "yes" => settings.strict = true,
                    "false" | "0" | "no" => settings.strict = false,
                    _ => invalid_option(warnings, key, v, "expected a boolean"),
                },
                ("lth" | "cmt" | "ind" | "log", OptionValue::Flag) => {
                    invalid_option(warnings, key, "", "a value is required")
                }
                _ => log::debug!("ignoring unrecognized header option '{}'", key),
            }
        }

        settings
    }
}

fn invalid_option(warnings: &mut Vec<DecodeWarning>, key: &str, value: &str, reason: &str) {
    record(
        warnings,
        DecodeWarning::new(
            WarningKind::InvalidOption,
            format!("option {}={:?} ignored: {}", key, value, reason),
        )
        .with_location("header"),
    );
}

/// Header error pointing at the start of `part`, a slice of `src`
fn error_at(src: &str, part: &str, message: impl Into<String>) -> DecodeError {
    let offset = (part.as_ptr() as usize)
        .saturating_sub(src.as_ptr() as usize)
        .min(src.len());
    DecodeError::header_at(src, offset, message)
}

/// Parse a header segment into a `Header` and any warnings.
///
/// Error positions are byte offsets into `src`.
pub fn parse(src: &str) -> DecodeResult<(Header, Vec<DecodeWarning>)> {
    let text = src.trim();
    let inner = text
        .strip_prefix('[')
        .ok_or_else(|| error_at(src, text, "header must start with '['"))?
        .strip_suffix(']')
        .ok_or_else(|| error_at(src, &text[text.len()..], "header must end with ']'"))?;

    let mut header = Header::default();
    let mut warnings = Vec::new();
    let mut version = None;
    let mut seen: Vec<&str> = Vec::new();

    for field in split_top_level(inner, ';') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let (key, value) = field.split_once(':').ok_or_else(|| {
            error_at(src, field, format!("field '{}' lacks a key:value separator", field))
        })?;
        let key = key.trim();
        let value = value.trim();

        let canonical = canonical_field(key);
        if let Some(name) = canonical {
            if seen.contains(&name) {
                return Err(error_at(src, key, format!("duplicate header field '{}'", key)));
            }
            seen.push(name);
        }

        match canonical {
            Some("V") => version = Some(value.to_string()),
            Some("lang") => header.lang = Some(value.to_string()),
            Some("D") => {
                for (k, v) in parse_pairs(src, key, value, &DYNAMIC_KEY_RE)? {
                    if !is_identifier(v) {
                        record(
                            &mut warnings,
                            DecodeWarning::new(
                                WarningKind::InvalidIdentifier,
                                format!("'{}' is not a valid Python identifier", v),
                            )
                            .with_location(k),
                        );
                    }
                    header.dynamic.insert(k.to_string(), v.to_string());
                }
            }
            Some("X") => {
                for (k, v) in parse_pairs(src, key, value, &LITERAL_KEY_RE)? {
                    let decoded = decode_literal(src, k, v)?;
                    header.literals.insert(k.to_string(), decoded);
                }
            }
            Some("O") => header.options = parse_options(src, key, value)?,
            Some("I") => {
                header.imports = list_entries(src, key, value)?
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            }
            Some("C") => header.checksum = Some(parse_checksum(src, value)?),
            _ => record(
                &mut warnings,
                DecodeWarning::new(
                    WarningKind::UnknownHeaderField,
                    format!("unknown header field '{}' ignored", key),
                )
                .with_location("header"),
            ),
        }
    }

    header.version = version.ok_or_else(|| error_at(src, text, "missing required field 'V'"))?;
    if header.version != SUPPORTED_VERSION {
        record(
            &mut warnings,
            DecodeWarning::new(
                WarningKind::VersionMismatch,
                format!(
                    "document version {} differs from supported version {}",
                    header.version, SUPPORTED_VERSION
                ),
            )
            .with_location("header"),
        );
    }

    Ok((header, warnings))
}

/// Map a field key, including the earlier long-form aliases, to its short form
fn canonical_field(key: &str) -> Option<&'static str> {
    match key {
        "V" | "v" => Some("V"),
        "D" | "dict" => Some("D"),
        "X" | "lit_dict" => Some("X"),
        "O" | "opts" => Some("O"),
        "I" | "imports" => Some("I"),
        "C" | "checksum" => Some("C"),
        "lang" => Some("lang"),
        _ => None,
    }
}

/// Split on `sep` at bracket depth zero
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Non-empty, trimmed entries of a bracketed list value
fn list_entries<'t>(src: &str, field: &str, value: &'t str) -> DecodeResult<Vec<&'t str>> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| {
            error_at(src, value, format!("field '{}' must be a bracketed list", field))
        })?;
    Ok(split_top_level(inner, ',')
        .into_iter()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect())
}

fn parse_pairs<'t>(
    src: &str,
    field: &str,
    value: &'t str,
    key_re: &Regex,
) -> DecodeResult<Vec<(&'t str, &'t str)>> {
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for entry in list_entries(src, field, value)? {
        let (k, v) = entry.split_once('=').ok_or_else(|| {
            error_at(
                src,
                entry,
                format!("entry '{}' in field '{}' is not key=value", entry, field),
            )
        })?;
        let k = k.trim();
        if !key_re.is_match(k) {
            return Err(error_at(
                src,
                k,
                format!("invalid key '{}' in field '{}'", k, field),
            ));
        }
        if pairs.iter().any(|(existing, _)| *existing == k) {
            return Err(error_at(src, k, format!("duplicate key '{}'", k)));
        }
        pairs.push((k, v.trim()));
    }
    Ok(pairs)
}

/// Base64 with missing padding restored, then UTF-8
fn decode_literal(src: &str, key: &str, encoded: &str) -> DecodeResult<String> {
    let mut padded = encoded.trim_end_matches('=').to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    let bytes = STANDARD.decode(padded.as_bytes()).map_err(|e| {
        error_at(src, encoded, format!("literal {} is not valid base64: {}", key, e))
    })?;
    String::from_utf8(bytes)
        .map_err(|_| error_at(src, encoded, format!("literal {} is not valid UTF-8", key)))
}

fn parse_options(src: &str, field: &str, value: &str) -> DecodeResult<IndexMap<String, OptionValue>> {
    let mut options = IndexMap::new();
    for entry in list_entries(src, field, value)? {
        let (key, value) = match entry.split_once('=') {
            Some((k, v)) => (k.trim(), OptionValue::Value(v.trim().to_string())),
            None => (entry, OptionValue::Flag),
        };
        if key.is_empty() {
            return Err(error_at(src, entry, format!("option '{}' has no name", entry)));
        }
        options.insert(key.to_string(), value);
    }
    Ok(options)
}

/// `algo-hash`; the hash is not checked against the body
fn parse_checksum(src: &str, value: &str) -> DecodeResult<String> {
    match value.split_once('-') {
        Some((algo, hash)) if !algo.is_empty() && !hash.is_empty() => Ok(value.to_string()),
        _ => Err(error_at(
            src,
            value,
            format!("checksum '{}' must have the form algo-hash", value),
        )),
    }
}

/// Python import lines for the `I` list, followed by a blank line
pub fn render_imports(imports: &[String]) -> String {
    let mut out = String::new();
    for entry in imports {
        if entry.starts_with("from ") || entry.starts_with("import ") {
            out.push_str(entry);
        } else if let Some((module, alias)) = entry.split_once(" as ") {
            out.push_str(&format!("import {} as {}", module.trim(), alias.trim()));
        } else {
            out.push_str("import ");
            out.push_str(entry);
        }
        out.push('\n');
    }
    out.push('\n');
    out
}
