//! Constant data used by the decoder
//!
//! - `maps`: the fixed-token table, the shared corpus and the log level codes

pub mod maps;

pub use maps::{corpus_entry, fixed_token, FixedToken, TokenClass, CORPUS, FIXED_TOKENS, LOG_LEVELS};
