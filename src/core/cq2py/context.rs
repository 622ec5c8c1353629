//! Decode options and the per-document decode session.
//!
//! The session drains the body token by token. Each token is resolved to
//! Python text and written through the emitter; semantic tokens are handed
//! to their template in the macro registry, which calls back into the session
//! to resolve parameters and emit body blocks.

use super::emitter::Emitter;
use super::engine::lexer::Lexer;
use super::engine::macros::MacroRegistry;
use super::engine::token::{SemanticToken, Token, TokenList};
use super::header::{Header, HeaderSettings};
use super::literal::{quote_bytes, quote_str};
use super::{record, DecodeWarning, WarningKind};
use crate::data::maps::{corpus_entry, fixed_token, FixedToken, TokenClass};
use crate::utils::error::{context_window, DecodeError, DecodeResult};
use crate::utils::formatter::FormatterConfig;

// =============================================================================
// Decode Options
// =============================================================================

/// What to do with a reference that has no dictionary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnresolvedPolicy {
    /// Emit `__UNKNOWN_<KIND>_<key>__` and record a warning
    #[default]
    Placeholder,
    /// Abort with `DecodeError::UnresolvedReference`
    Fail,
}

/// Options for CodeQuilt decoding
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Policy for unresolved references; the header's `strict` option forces `Fail`
    /// Default: Placeholder
    pub unresolved: UnresolvedPolicy,

    /// Spaces per indent level, unless the header sets `ind`
    /// Default: 4
    pub indent_width: usize,

    /// Emit the header's `I` list as import lines
    /// Default: true
    pub emit_imports: bool,

    /// External formatter run over the finished output
    /// Default: None
    pub formatter: Option<FormatterConfig>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            unresolved: UnresolvedPolicy::Placeholder,
            indent_width: 4,
            emit_imports: true,
            formatter: None,
        }
    }
}

impl DecodeOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on any unresolved reference
    pub fn strict() -> Self {
        Self {
            unresolved: UnresolvedPolicy::Fail,
            ..Self::default()
        }
    }

    pub fn with_unresolved(mut self, policy: UnresolvedPolicy) -> Self {
        self.unresolved = policy;
        self
    }

    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    pub fn with_imports(mut self, emit: bool) -> Self {
        self.emit_imports = emit;
        self
    }

    pub fn with_formatter(mut self, config: FormatterConfig) -> Self {
        self.formatter = Some(config);
        self
    }
}

// =============================================================================
// Decode Session
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum RefKind {
    Corpus,
    Dynamic,
    Literal,
}

impl RefKind {
    fn tag(self) -> &'static str {
        match self {
            RefKind::Corpus => "CORPUS",
            RefKind::Dynamic => "DYNAMIC",
            RefKind::Literal => "LITERAL",
        }
    }
}

/// Outcome of a dictionary lookup
enum Resolved {
    Value(String),
    Placeholder(String),
}

/// State of one decode call. Owned by that call and dropped when it returns.
pub struct DecodeSession<'a> {
    header: &'a Header,
    registry: &'a MacroRegistry,
    /// Body text, for error context windows
    body: &'a str,
    emitter: Emitter,
    warnings: Vec<DecodeWarning>,
    policy: UnresolvedPolicy,
    literal_threshold: usize,
    keep_comments: bool,
    logger: String,
    /// Body offset of the token being emitted
    position: usize,
    /// Document offset of the body, added to warning locations
    origin: usize,
}

impl<'a> DecodeSession<'a> {
    pub fn new(
        header: &'a Header,
        settings: &HeaderSettings,
        options: &DecodeOptions,
        registry: &'a MacroRegistry,
        body: &'a str,
        warnings: Vec<DecodeWarning>,
    ) -> Self {
        let policy = if settings.strict {
            UnresolvedPolicy::Fail
        } else {
            options.unresolved
        };
        DecodeSession {
            header,
            registry,
            body,
            emitter: Emitter::new(settings.indent_width.unwrap_or(options.indent_width)),
            warnings,
            policy,
            literal_threshold: settings.literal_threshold,
            keep_comments: settings.keep_comments,
            logger: settings.logger.clone(),
            position: 0,
            origin: 0,
        }
    }

    /// Set the document offset of the body so warning locations point into
    /// the whole document
    pub fn with_origin(mut self, origin: usize) -> Self {
        self.origin = origin;
        self
    }

    /// Document offset of the token being emitted
    fn location(&self) -> usize {
        self.origin + self.position
    }

    /// Drain the whole body through the emitter
    pub fn run(&mut self) -> DecodeResult<()> {
        let mut lexer = Lexer::new(self.body);
        let mut count = 0usize;
        while let Some(token) = lexer.next_token()? {
            self.position = lexer.token_start();
            self.emit_token(&token)?;
            count += 1;
        }
        log::debug!("emitted {} top-level tokens", count);
        Ok(())
    }

    /// Output text and warnings
    pub fn finish(self) -> (String, Vec<DecodeWarning>) {
        (self.emitter.finish(), self.warnings)
    }

    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    pub fn emitter_mut(&mut self) -> &mut Emitter {
        &mut self.emitter
    }

    /// Logger object name used by logging templates
    pub fn logger(&self) -> &str {
        &self.logger
    }

    pub fn warn(&mut self, warning: DecodeWarning) {
        record(&mut self.warnings, warning);
    }

    /// Warn about header literals longer than the `lth` threshold
    pub fn check_literal_lengths(&mut self) {
        let header = self.header;
        for (key, value) in &header.literals {
            let len = value.chars().count();
            if len > self.literal_threshold {
                self.warn(long_literal(len, self.literal_threshold).with_location(key.clone()));
            }
        }
    }

    /// Resolve one token and write it through the emitter
    pub fn emit_token(&mut self, token: &Token) -> DecodeResult<()> {
        match token {
            Token::CorpusRef(key) => {
                let text = self.resolve_reference(RefKind::Corpus, key)?;
                self.emitter.write(&text, TokenClass::Word);
            }
            Token::DynamicRef(key) => {
                let text = self.resolve_reference(RefKind::Dynamic, key)?;
                self.emitter.write(&text, TokenClass::Word);
            }
            Token::LiteralRef(key) => {
                let text = self.resolve_reference(RefKind::Literal, key)?;
                self.emitter.write(&text, TokenClass::Word);
            }
            Token::Fixed(c) => match fixed_token(*c) {
                Some(FixedToken::Text(text, class)) => self.emitter.write(text, class),
                Some(FixedToken::Newline) => self.emitter.newline(),
                Some(FixedToken::Indent) => self.emitter.indent(),
                Some(FixedToken::Dedent) => {
                    if !self.emitter.dedent() {
                        self.warn(DecodeWarning::dedent_below_zero(self.location()));
                    }
                }
                None => {
                    return Err(DecodeError::lex_at(
                        self.body,
                        self.position,
                        format!("'{}' is not a fixed token", c),
                    ))
                }
            },
            Token::Semantic(sem) => self.expand(sem)?,
            Token::EscapeHatch(raw) => self.emitter.write_verbatim(raw),
            Token::NumberLiteral(text) => self.emitter.write(text, TokenClass::Word),
            Token::StringLiteral(content) => {
                self.check_inline_literal(content);
                self.emitter.write(&quote_str(content), TokenClass::Word);
            }
            Token::BytesLiteral(bytes) => self.emitter.write(&quote_bytes(bytes), TokenClass::Word),
            Token::BooleanLiteral(true) => self.emitter.write("True", TokenClass::Word),
            Token::BooleanLiteral(false) => self.emitter.write("False", TokenClass::Word),
            Token::NullLiteral => self.emitter.write("None", TokenClass::Word),
            Token::DecoratorPrefix => self.emitter.write("@", TokenClass::Prefix),
            Token::Comment(inner) => self.emit_comment(inner)?,
            Token::Bare(word) => self.emitter.write(word, TokenClass::Word),
        }
        Ok(())
    }

    /// Emit the tokens of a body block, tracking each token's offset
    pub fn emit_tokens(&mut self, tokens: &TokenList) -> DecodeResult<()> {
        let saved = self.position;
        for (offset, token) in tokens.spanned() {
            self.position = offset;
            self.emit_token(token)?;
        }
        self.position = saved;
        Ok(())
    }

    /// Write a complete statement line, leaving the line open
    pub fn write_statement(&mut self, text: &str) {
        self.emitter.write_verbatim(text);
    }

    /// Run `f` one indent level deeper on a fresh line, then restore the level
    pub fn block<F>(&mut self, f: F) -> DecodeResult<()>
    where
        F: FnOnce(&mut Self) -> DecodeResult<()>,
    {
        let level = self.emitter.indent_level();
        self.emitter.ensure_newline();
        self.emitter.set_indent_level(level + 1);
        let result = f(self);
        self.emitter.set_indent_level(level);
        result
    }

    /// Emit a body block, writing `pass` if it produced no code
    pub fn emit_block_body(&mut self, body: &TokenList) -> DecodeResult<()> {
        let mark = self.emitter.statements();
        self.emit_tokens(body)?;
        if self.emitter.statements() == mark {
            self.emitter.ensure_newline();
            self.write_statement("pass");
        }
        Ok(())
    }

    /// Resolve a semantic-token parameter to Python text
    pub fn resolve_param(&mut self, sem: &SemanticToken, token: &Token) -> DecodeResult<String> {
        let text = match token {
            Token::CorpusRef(key) => self.resolve_reference(RefKind::Corpus, key)?,
            Token::DynamicRef(key) => self.resolve_reference(RefKind::Dynamic, key)?,
            Token::LiteralRef(key) => self.resolve_reference(RefKind::Literal, key)?,
            Token::Fixed(c) => match fixed_token(*c) {
                Some(FixedToken::Text(text, _)) => text.to_string(),
                _ => {
                    return Err(DecodeError::macro_error(
                        sem.name.as_str(),
                        sem.offset,
                        format!("layout token '{}' cannot be a parameter", c),
                    ))
                }
            },
            Token::EscapeHatch(raw) => raw.clone(),
            Token::NumberLiteral(text) | Token::Bare(text) => text.clone(),
            Token::StringLiteral(content) => {
                self.check_inline_literal(content);
                quote_str(content)
            }
            Token::BytesLiteral(bytes) => quote_bytes(bytes),
            Token::BooleanLiteral(true) => "True".to_string(),
            Token::BooleanLiteral(false) => "False".to_string(),
            Token::NullLiteral => "None".to_string(),
            Token::Semantic(_) | Token::DecoratorPrefix | Token::Comment(_) => {
                return Err(DecodeError::macro_error(
                    sem.name.as_str(),
                    sem.offset,
                    format!("a {} cannot be a parameter", token.describe()),
                ))
            }
        };
        Ok(text)
    }

    /// Resolve every token of `params`
    pub fn resolve_params(
        &mut self,
        sem: &SemanticToken,
        params: &[Token],
    ) -> DecodeResult<Vec<String>> {
        params.iter().map(|p| self.resolve_param(sem, p)).collect()
    }

    fn expand(&mut self, sem: &SemanticToken) -> DecodeResult<()> {
        let Some(template) = self.registry.get(sem.name) else {
            self.warn(DecodeWarning::unknown_semantic(sem.name, self.origin + sem.offset));
            return Ok(());
        };

        log::debug!("expanding {} at offset {}", sem.name, sem.offset);
        let saved = self.position;
        self.position = sem.offset;
        let result = template(self, sem).map_err(|e| e.with_source(self.body));
        self.position = saved;
        result
    }

    fn resolve_reference(&mut self, kind: RefKind, key: &str) -> DecodeResult<String> {
        Ok(match self.lookup(kind, key)? {
            Resolved::Value(value) if matches!(kind, RefKind::Literal) => quote_str(&value),
            Resolved::Value(value) | Resolved::Placeholder(value) => value,
        })
    }

    /// Dictionary lookup with the unresolved-reference policy applied
    fn lookup(&mut self, kind: RefKind, key: &str) -> DecodeResult<Resolved> {
        let found = match kind {
            RefKind::Corpus => corpus_entry(key).map(str::to_string),
            RefKind::Dynamic => self.header.dynamic.get(key).cloned(),
            RefKind::Literal => self.header.literals.get(key).cloned(),
        };
        if let Some(value) = found {
            return Ok(Resolved::Value(value));
        }

        match self.policy {
            UnresolvedPolicy::Fail => Err(DecodeError::UnresolvedReference {
                key: key.to_string(),
                position: self.position,
                context: context_window(self.body, self.position),
            }),
            UnresolvedPolicy::Placeholder => {
                let placeholder = format!("__UNKNOWN_{}_{}__", kind.tag(), key);
                self.warn(
                    DecodeWarning::unresolved(key, &placeholder)
                        .with_location(format!("{} at offset {}", key, self.location())),
                );
                Ok(Resolved::Placeholder(placeholder))
            }
        }
    }

    fn emit_comment(&mut self, inner: &Token) -> DecodeResult<()> {
        if !self.keep_comments {
            return Ok(());
        }
        let text = match inner {
            Token::StringLiteral(content) => content.clone(),
            Token::LiteralRef(key) => match self.lookup(RefKind::Literal, key)? {
                Resolved::Value(value) | Resolved::Placeholder(value) => value,
            },
            other => {
                return Err(DecodeError::lex_at(
                    self.body,
                    self.position,
                    format!("a {} cannot be a comment", other.describe()),
                ))
            }
        };

        if text.is_empty() {
            self.emitter.comment("#");
            return Ok(());
        }
        for line in text.lines() {
            self.emitter.comment(format!("# {}", line).trim_end());
        }
        Ok(())
    }

    fn check_inline_literal(&mut self, content: &str) {
        let len = content.chars().count();
        if len > self.literal_threshold {
            let warning = long_literal(len, self.literal_threshold)
                .with_location(format!("offset {}", self.location()));
            self.warn(warning);
        }
    }
}

fn long_literal(len: usize, threshold: usize) -> DecodeWarning {
    DecodeWarning::new(
        WarningKind::LongLiteral,
        format!("literal of {} characters exceeds threshold {}", len, threshold),
    )
}
