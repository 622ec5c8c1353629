//! CodeQuilt token definitions.
//!
//! The lexer turns the notation body into a stream of these tokens. Semantic
//! tokens own their parameter and body tokens, so a token is a tree with no
//! cycles.

use std::fmt;

/// The closed vocabulary of semantic-token names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticName {
    /// `LOG(level, fmt, args...)`
    Log,
    /// `ATTR(obj, attr, value)`
    Attr,
    /// `GUARD(var)`
    Guard,
    /// `TRYLOG(exc, name){body}`
    TryLog,
    /// `DEFAULT(var, value)`
    Default,
    /// `WITH(expr, name){body}`
    With,
    /// `MAIN(){body}`
    Main,
}

impl SemanticName {
    pub const ALL: [SemanticName; 7] = [
        SemanticName::Log,
        SemanticName::Attr,
        SemanticName::Guard,
        SemanticName::TryLog,
        SemanticName::Default,
        SemanticName::With,
        SemanticName::Main,
    ];

    /// Resolve a notation name like `TRYLOG`
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|n| n.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticName::Log => "LOG",
            SemanticName::Attr => "ATTR",
            SemanticName::Guard => "GUARD",
            SemanticName::TryLog => "TRYLOG",
            SemanticName::Default => "DEFAULT",
            SemanticName::With => "WITH",
            SemanticName::Main => "MAIN",
        }
    }

    /// Whether a `{...}` body block may follow the closing parenthesis.
    pub fn accepts_body(&self) -> bool {
        matches!(
            self,
            SemanticName::TryLog | SemanticName::With | SemanticName::Main
        )
    }
}

impl fmt::Display for SemanticName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed semantic-token invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticToken {
    pub name: SemanticName,
    pub params: Vec<Token>,
    pub body: Option<TokenList>,
    /// Byte offset of the name in the body text
    pub offset: usize,
}

/// A single CodeQuilt token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Shared corpus reference like `c12`
    CorpusRef(String),
    /// Per-document identifier reference like `d3`
    DynamicRef(String),
    /// Per-document literal reference like `l0`
    LiteralRef(String),
    /// Single-character keyword, operator or layout marker
    Fixed(char),
    /// Named multi-statement template
    Semantic(SemanticToken),
    /// Raw Python copied to the output unchanged (already unescaped)
    EscapeHatch(String),
    /// Number text exactly as written, sign included
    NumberLiteral(String),
    /// Decoded string content (escapes already processed)
    StringLiteral(String),
    /// Decoded byte content
    BytesLiteral(Vec<u8>),
    BooleanLiteral(bool),
    NullLiteral,
    /// `@`
    DecoratorPrefix,
    /// `#` followed by a string literal or a literal reference
    Comment(Box<Token>),
    /// Plain word, only produced in semantic-token parameter position
    Bare(String),
}

impl Token {
    /// Returns true if this is the fixed token `c`
    pub fn is_fixed(&self, c: char) -> bool {
        matches!(self, Token::Fixed(f) if *f == c)
    }

    /// Returns the semantic token if this is one
    pub fn as_semantic(&self) -> Option<&SemanticToken> {
        match self {
            Token::Semantic(sem) => Some(sem),
            _ => None,
        }
    }

    /// Returns true if the token ends an operand, so a following `+`/`-`
    /// is a binary operator rather than a sign
    pub fn is_operand(&self) -> bool {
        match self {
            Token::Fixed(c) => matches!(c, ')' | ']' | '}'),
            Token::CorpusRef(_)
            | Token::DynamicRef(_)
            | Token::LiteralRef(_)
            | Token::EscapeHatch(_)
            | Token::NumberLiteral(_)
            | Token::StringLiteral(_)
            | Token::BytesLiteral(_)
            | Token::BooleanLiteral(_)
            | Token::NullLiteral
            | Token::Bare(_) => true,
            Token::Semantic(_) | Token::DecoratorPrefix | Token::Comment(_) => false,
        }
    }

    /// Short human name of the variant, for error messages
    pub fn describe(&self) -> &'static str {
        match self {
            Token::CorpusRef(_) => "corpus reference",
            Token::DynamicRef(_) => "dynamic reference",
            Token::LiteralRef(_) => "literal reference",
            Token::Fixed(_) => "fixed token",
            Token::Semantic(_) => "semantic token",
            Token::EscapeHatch(_) => "escape hatch",
            Token::NumberLiteral(_) => "number",
            Token::StringLiteral(_) => "string",
            Token::BytesLiteral(_) => "bytes",
            Token::BooleanLiteral(_) => "boolean",
            Token::NullLiteral => "null",
            Token::DecoratorPrefix => "decorator",
            Token::Comment(_) => "comment",
            Token::Bare(_) => "bare word",
        }
    }
}

fn write_notation_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\'' => f.write_str("\\'")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("'")
}

impl fmt::Display for Token {
    /// Renders the token back in notation form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::CorpusRef(key) | Token::DynamicRef(key) | Token::LiteralRef(key) => {
                f.write_str(key)
            }
            Token::Fixed(c) => write!(f, "{}", c),
            Token::Semantic(sem) => {
                write!(f, "{}(", sem.name)?;
                for (i, param) in sem.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", param)?;
                }
                f.write_str(")")?;
                if let Some(ref body) = sem.body {
                    write!(f, "{{{}}}", body)?;
                }
                Ok(())
            }
            Token::EscapeHatch(raw) => {
                f.write_str("${")?;
                for c in raw.chars() {
                    if matches!(c, '{' | '}' | '\\') {
                        f.write_str("\\")?;
                    }
                    write!(f, "{}", c)?;
                }
                f.write_str("}")
            }
            Token::NumberLiteral(text) => f.write_str(text),
            Token::StringLiteral(s) => write_notation_string(f, s),
            Token::BytesLiteral(bytes) => {
                f.write_str("b'")?;
                for &b in bytes {
                    match b {
                        b'\\' => f.write_str("\\\\")?,
                        b'\'' => f.write_str("\\'")?,
                        0x20..=0x7e => write!(f, "{}", b as char)?,
                        _ => write!(f, "\\x{:02x}", b)?,
                    }
                }
                f.write_str("'")
            }
            Token::BooleanLiteral(true) => f.write_str("t"),
            Token::BooleanLiteral(false) => f.write_str("f"),
            Token::NullLiteral => f.write_str("n"),
            Token::DecoratorPrefix => f.write_str("@"),
            Token::Comment(inner) => write!(f, "#{}", inner),
            Token::Bare(name) => f.write_str(name),
        }
    }
}

/// Tokens of a semantic-token body, each with its offset in the body text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TokenList {
    tokens: Vec<Token>,
    offsets: Vec<usize>,
}

impl TokenList {
    pub fn new() -> Self {
        TokenList::default()
    }

    pub fn push(&mut self, token: Token, offset: usize) {
        self.tokens.push(token);
        self.offsets.push(offset);
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens paired with their start offsets
    pub fn spanned(&self) -> impl Iterator<Item = (usize, &Token)> + '_ {
        self.offsets.iter().copied().zip(&self.tokens)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl fmt::Display for TokenList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TokenList {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_names() {
        assert_eq!(SemanticName::from_name("TRYLOG"), Some(SemanticName::TryLog));
        assert_eq!(SemanticName::from_name("LOG"), Some(SemanticName::Log));
        assert_eq!(SemanticName::from_name("Log"), None);
        assert_eq!(SemanticName::from_name("FOO"), None);
        for name in SemanticName::ALL {
            assert_eq!(SemanticName::from_name(name.as_str()), Some(name));
        }
    }

    #[test]
    fn test_accepts_body() {
        assert!(SemanticName::TryLog.accepts_body());
        assert!(SemanticName::Main.accepts_body());
        assert!(!SemanticName::Log.accepts_body());
        assert!(!SemanticName::Attr.accepts_body());
    }

    #[test]
    fn test_token_display() {
        assert_eq!(format!("{}", Token::DynamicRef("d3".into())), "d3");
        assert_eq!(format!("{}", Token::Fixed('N')), "N");
        assert_eq!(format!("{}", Token::StringLiteral("it's\n".into())), "'it\\'s\\n'");
        assert_eq!(format!("{}", Token::BytesLiteral(vec![b'a', 0])), "b'a\\x00'");
        assert_eq!(format!("{}", Token::EscapeHatch("{x}".into())), "${\\{x\\}}");
        assert_eq!(format!("{}", Token::BooleanLiteral(false)), "f");
    }

    #[test]
    fn test_semantic_display() {
        let mut body = TokenList::new();
        body.push(
            Token::Semantic(SemanticToken {
                name: SemanticName::Log,
                params: vec![Token::Bare("i".into()), Token::LiteralRef("l0".into())],
                body: None,
                offset: 13,
            }),
            13,
        );
        let sem = Token::Semantic(SemanticToken {
            name: SemanticName::TryLog,
            params: vec![Token::CorpusRef("c1".into()), Token::Bare("e".into())],
            body: Some(body),
            offset: 0,
        });
        assert_eq!(format!("{}", sem), "TRYLOG(c1,e){LOG(i,l0)}");
    }
}
