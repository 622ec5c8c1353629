//! WASM bindings for codequilt
//!
//! This module provides JavaScript-accessible functions for CodeQuilt decoding.
//! The external formatter is never run here.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "wasm")]
use crate::utils::error::CliDiagnostic;

/// Decode options (exposed to WASM)
#[cfg(feature = "wasm")]
#[derive(Serialize, Deserialize, Default)]
pub struct WasmDecodeOptions {
    /// Fail on unresolved references instead of emitting placeholders
    #[serde(default)]
    pub strict: bool,
    /// Spaces per indent level
    #[serde(default)]
    pub indent_width: Option<usize>,
    /// Emit the header's import list
    #[serde(default = "default_true")]
    pub emit_imports: bool,
}

#[cfg(feature = "wasm")]
fn default_true() -> bool {
    true
}

/// Decode result with diagnostics
#[cfg(feature = "wasm")]
#[derive(Serialize)]
pub struct DecodeResultJs {
    /// The decoded Python source
    pub output: String,
    /// Whether decoding succeeded
    pub success: bool,
    /// Error message if decoding failed
    pub error: Option<String>,
    /// Byte offset of the error, when it has one
    pub position: Option<usize>,
    /// Warnings met while decoding
    pub warnings: Vec<CliDiagnostic>,
}

/// Safely serialize a value to JsValue, returning an error object on failure.
#[cfg(feature = "wasm")]
fn to_js_value<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
        let error_obj = DecodeResultJs {
            output: String::new(),
            success: false,
            error: Some(format!("Serialization error: {}", e)),
            position: None,
            warnings: vec![],
        };
        serde_wasm_bindgen::to_value(&error_obj).unwrap_or(JsValue::NULL)
    })
}

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Decode a CodeQuilt document to Python source
///
/// # Returns
/// Python source, or an empty string if decoding failed
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "decode")]
pub fn decode_wasm(input: &str) -> String {
    crate::decode(input).unwrap_or_default()
}

/// Decode with options, returning output, error and warnings
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "decodeWithOptions")]
pub fn decode_with_options_wasm(input: &str, options: JsValue) -> JsValue {
    let opts: WasmDecodeOptions = serde_wasm_bindgen::from_value(options).unwrap_or_default();

    let mut decode_opts = crate::DecodeOptions::new().with_imports(opts.emit_imports);
    if opts.strict {
        decode_opts = decode_opts.with_unresolved(crate::UnresolvedPolicy::Fail);
    }
    if let Some(width) = opts.indent_width {
        decode_opts = decode_opts.with_indent_width(width);
    }

    let result = match crate::Decoder::new(decode_opts).decode(input) {
        Ok(out) => DecodeResultJs {
            output: out.content,
            success: true,
            error: None,
            position: None,
            warnings: out.warnings.into_iter().map(Into::into).collect(),
        },
        Err(e) => DecodeResultJs {
            output: String::new(),
            success: false,
            position: e.position(),
            error: Some(e.to_string()),
            warnings: vec![],
        },
    };

    to_js_value(&result)
}

/// Split a notation body into tokens, rendered back in notation form
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "tokenize")]
pub fn tokenize_wasm(body: &str) -> JsValue {
    let tokens: Result<Vec<String>, String> = crate::tokenize(body)
        .map(|tokens| tokens.iter().map(|t| t.to_string()).collect())
        .map_err(|e| e.to_string());
    to_js_value(&tokens)
}

/// Get version information
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = "getVersion")]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
