//! Token engine: lexer, structural parser and macro templates.
//!
//! # Architecture
//!
//! ```text
//! Notation body
//!        │
//!        ▼
//!    ┌───────────────┐
//!    │     Lexer     │  one token per call
//!    └───────────────┘
//!        │  NAME(
//!        ▼
//!    ┌───────────────┐
//!    │    Parser     │  params and {body}, recursing into the lexer
//!    └───────────────┘
//!        │
//!        ▼
//!    ┌───────────────┐
//!    │ MacroRegistry │  SemanticName -> template
//!    └───────────────┘
//!        │
//!        ▼
//!    Decode session / emitter
//! ```

pub mod lexer;
pub mod macros;
pub mod parser;
pub mod token;

pub use lexer::{tokenize, Lexer};
pub use macros::{MacroRegistry, Template};
pub use token::{SemanticName, SemanticToken, Token, TokenList};
