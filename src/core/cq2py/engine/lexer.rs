//! CodeQuilt body lexer
//!
//! Converts the notation body into tokens, one token per call, with a single
//! forward-only cursor. At each position the rules are tried in a fixed order:
//!
//! 1. dictionary reference `[cdl]\d+`
//! 2. known semantic-token name followed by `(` (handed to the structural parser)
//! 3. escape hatch `${...}`
//! 4. number literal
//! 5. `t` / `f` / `n` literals
//! 6. quoted string literal
//! 7. byte string literal
//! 8. comment marker, then single-character fixed token
//! 9. decorator prefix `@`
//!
//! Whitespace between tokens carries no meaning and is skipped.

use lazy_static::lazy_static;
use regex::Regex;

use super::parser;
use super::token::{SemanticName, Token};
use crate::data::maps::fixed_token;
use crate::utils::error::{DecodeError, DecodeResult};

lazy_static! {
    static ref REFERENCE_RE: Regex = Regex::new(r"^[cdl][0-9]+").expect("valid regex");
    static ref LITERAL_REF_RE: Regex = Regex::new(r"^l[0-9]+").expect("valid regex");
    static ref SEMANTIC_RE: Regex = Regex::new(r"^([A-Z][A-Z_]+)\(").expect("valid regex");
    static ref NUMBER_RE: Regex = Regex::new(r"^[+-]?[0-9]+(?:\.[0-9]+)?").expect("valid regex");
    static ref BARE_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").expect("valid regex");
}

/// The CodeQuilt lexer.
///
/// The lexer is the explicit parser state: the structural parser receives it
/// by `&mut` and advances the same cursor while it recurses into parameter
/// lists and body blocks.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    /// Start offset of the most recently returned token
    token_start: usize,
    /// The previous token ends an operand, so a sign is a binary operator
    after_operand: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer over a notation body
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            token_start: 0,
            after_operand: false,
        }
    }

    /// Current cursor offset
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn token_start(&self) -> usize {
        self.token_start
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub(crate) fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn advance(&mut self, bytes: usize) {
        self.pos += bytes;
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    pub(crate) fn lex_error(&self, position: usize, message: impl Into<String>) -> DecodeError {
        DecodeError::lex_at(self.src, position, message)
    }

    pub(crate) fn parse_error(&self, position: usize, message: impl Into<String>) -> DecodeError {
        DecodeError::parse_at(self.src, position, message)
    }

    /// Read the next token, or `None` at end of input
    pub fn next_token(&mut self) -> DecodeResult<Option<Token>> {
        let token = self.lex_token()?;
        self.after_operand = token.as_ref().is_some_and(Token::is_operand);
        Ok(token)
    }

    fn lex_token(&mut self) -> DecodeResult<Option<Token>> {
        self.skip_whitespace();
        self.token_start = self.pos;
        let start = self.pos;
        let rest = self.rest();

        let Some(c) = self.peek_char() else {
            return Ok(None);
        };

        if let Some(m) = REFERENCE_RE.find(rest) {
            let key = m.as_str().to_string();
            self.advance(m.end());
            return Ok(Some(match c {
                'c' => Token::CorpusRef(key),
                'd' => Token::DynamicRef(key),
                _ => Token::LiteralRef(key),
            }));
        }

        if let Some(caps) = SEMANTIC_RE.captures(rest) {
            // Unknown names fall through to fixed-token handling
            if let Some(name) = SemanticName::from_name(&caps[1]) {
                self.advance(caps[0].len());
                let token = parser::parse_semantic(self, name, start)?;
                // Nested lexing moved token_start; report the name's offset
                self.token_start = start;
                return Ok(Some(token));
            }
        }

        if c == '$' {
            return self.lex_escape_hatch().map(Some);
        }

        let binary_sign = self.after_operand && matches!(c, '+' | '-');
        if !binary_sign {
            if let Some(m) = NUMBER_RE.find(rest) {
                let text = m.as_str().to_string();
                self.advance(m.end());
                return Ok(Some(Token::NumberLiteral(text)));
            }
        }

        match c {
            't' => {
                self.bump();
                return Ok(Some(Token::BooleanLiteral(true)));
            }
            'f' => {
                self.bump();
                return Ok(Some(Token::BooleanLiteral(false)));
            }
            'n' => {
                self.bump();
                return Ok(Some(Token::NullLiteral));
            }
            '\'' | '"' => {
                let text = self.lex_string()?;
                return Ok(Some(Token::StringLiteral(text)));
            }
            'b' if matches!(self.peek_nth(1), Some('\'') | Some('"')) => {
                self.bump();
                let bytes = self.lex_quoted(start, true)?;
                return Ok(Some(Token::BytesLiteral(bytes)));
            }
            '#' => return self.lex_comment().map(Some),
            _ => {}
        }

        if fixed_token(c).is_some() {
            self.bump();
            return Ok(Some(Token::Fixed(c)));
        }

        if c == '@' {
            self.bump();
            return Ok(Some(Token::DecoratorPrefix));
        }

        Err(self.lex_error(start, format!("unrecognized input '{}'", c)))
    }

    /// Read one token in semantic-token parameter position.
    ///
    /// Plain words that are not references, `t`/`f`/`n`, fixed tokens or
    /// semantic names become `Token::Bare`, so `TRYLOG(c1,e)` can bind `e`.
    pub(crate) fn next_param_token(&mut self) -> DecodeResult<Option<Token>> {
        self.skip_whitespace();
        let rest = self.rest();

        if let Some(m) = BARE_RE.find(rest) {
            let word = m.as_str();
            let after = rest[m.end()..].chars().next();
            let single = if word.chars().count() == 1 {
                word.chars().next()
            } else {
                None
            };

            let ordinary = REFERENCE_RE.find(word).map(|r| r.end() == word.len()) == Some(true)
                || matches!(single, Some('t') | Some('f') | Some('n'))
                || single.and_then(fixed_token).is_some()
                || matches!(after, Some('\'') | Some('"') | Some('('));

            if !ordinary {
                self.token_start = self.pos;
                self.after_operand = true;
                let token = Token::Bare(word.to_string());
                self.advance(m.end());
                return Ok(Some(token));
            }
        }

        self.next_token()
    }

    /// `${ raw }` with `\{`, `\}` and `\\` escapes; braces nest
    fn lex_escape_hatch(&mut self) -> DecodeResult<Token> {
        let start = self.pos;
        self.bump();
        if self.peek_char() != Some('{') {
            return Err(self.lex_error(start, "expected '{' after escape-hatch marker '$'"));
        }
        self.bump();

        let mut raw = String::new();
        let mut depth = 1usize;
        loop {
            let Some(c) = self.bump() else {
                return Err(self.lex_error(start, "unterminated escape hatch"));
            };
            match c {
                '\\' => match self.peek_char() {
                    Some(next @ ('{' | '}' | '\\')) => {
                        self.bump();
                        raw.push(next);
                    }
                    _ => raw.push('\\'),
                },
                '{' => {
                    depth += 1;
                    raw.push(c);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Token::EscapeHatch(raw));
                    }
                    raw.push(c);
                }
                _ => raw.push(c),
            }
        }
    }

    fn lex_string(&mut self) -> DecodeResult<String> {
        let bytes = self.lex_quoted(self.pos, false)?;
        // Only whole chars were pushed, so the buffer is valid UTF-8
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a quoted literal starting at the opening quote. Errors about the
    /// literal as a whole are reported at `start`.
    ///
    /// `bytes` additionally enables `\xHH` escapes.
    fn lex_quoted(&mut self, start: usize, bytes: bool) -> DecodeResult<Vec<u8>> {
        let Some(quote) = self.bump() else {
            return Err(self.lex_error(start, "expected quote"));
        };

        let mut buf = Vec::new();
        let mut utf8 = [0u8; 4];
        loop {
            let Some(c) = self.bump() else {
                return Err(self.lex_error(start, "unterminated string literal"));
            };
            if c == quote {
                return Ok(buf);
            }
            if c != '\\' {
                buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                continue;
            }

            let escape_pos = self.pos - 1;
            let Some(e) = self.bump() else {
                return Err(self.lex_error(start, "unterminated string literal"));
            };
            let decoded = match e {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                'b' => '\u{8}',
                'f' => '\u{c}',
                '\\' => '\\',
                '\'' => '\'',
                '"' => '"',
                'u' => {
                    let code = self.read_hex(4, escape_pos)?;
                    char::from_u32(code).ok_or_else(|| {
                        self.lex_error(escape_pos, format!("invalid \\u escape {:04x}", code))
                    })?
                }
                'x' if bytes => {
                    let byte = self.read_hex(2, escape_pos)?;
                    buf.push(byte as u8);
                    continue;
                }
                other => {
                    return Err(self.lex_error(
                        escape_pos,
                        format!("unknown escape sequence '\\{}'", other),
                    ))
                }
            };
            buf.extend_from_slice(decoded.encode_utf8(&mut utf8).as_bytes());
        }
    }

    fn read_hex(&mut self, digits: usize, escape_pos: usize) -> DecodeResult<u32> {
        let mut value = 0u32;
        for _ in 0..digits {
            let digit = self
                .peek_char()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.lex_error(escape_pos, "malformed hex escape"))?;
            self.bump();
            value = value * 16 + digit;
        }
        Ok(value)
    }

    /// `#` followed by a quoted string or a literal reference
    fn lex_comment(&mut self) -> DecodeResult<Token> {
        let start = self.pos;
        self.bump();
        let inner = match self.peek_char() {
            Some('\'') | Some('"') => Token::StringLiteral(self.lex_string()?),
            _ => match LITERAL_REF_RE.find(self.rest()) {
                Some(m) => {
                    let key = m.as_str().to_string();
                    self.advance(m.end());
                    Token::LiteralRef(key)
                }
                None => {
                    return Err(self.lex_error(
                        start,
                        "comment marker must be followed by a string or literal reference",
                    ))
                }
            },
        };
        Ok(Token::Comment(Box::new(inner)))
    }

    /// Tokenize the entire body
    pub fn tokenize(mut self) -> DecodeResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Convenience function to tokenize a notation body
pub fn tokenize(body: &str) -> DecodeResult<Vec<Token>> {
    Lexer::new(body).tokenize()
}
