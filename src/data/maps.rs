//! Static lookup tables shared by every decode session.
//!
//! Both tables are compile-time `phf` maps: immutable, process-wide, and never
//! mutated after startup.

use phf::phf_map;

/// Spacing class of an emitted unit.
///
/// The emitter decides whether to insert a space between two units from the
/// classes of the previous and next unit alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    /// Identifiers, keywords, numbers, string literals
    Word,
    /// Binary and unary operators
    Operator,
    /// `(`, `[`, `{`
    Open,
    /// `)`, `]`, `}`
    Close,
    /// `,` and `;`
    Comma,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// Decorator `@`
    Prefix,
}

/// Meaning of a single-character fixed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedToken {
    /// A lexical fragment written to the output
    Text(&'static str, TokenClass),
    /// End the current line
    Newline,
    /// Increase the indent level of the next line
    Indent,
    /// Decrease the indent level of the next line
    Dedent,
}

impl FixedToken {
    /// Returns true for newline / indent / dedent
    pub fn is_structural(&self) -> bool {
        !matches!(self, FixedToken::Text(..))
    }
}

use FixedToken::{Dedent, Indent, Newline, Text};
use TokenClass::{Close, Colon, Comma, Dot, Open, Operator, Word};

/// Single notation characters and their Python rendering.
pub static FIXED_TOKENS: phf::Map<char, FixedToken> = phf_map! {
    // Layout
    'N' => Newline,
    'I' => Indent,
    'U' => Dedent,

    // Keywords
    'A' => Text("await", Word),
    'B' => Text("break", Word),
    'C' => Text("class", Word),
    'D' => Text("def", Word),
    'F' => Text("for", Word),
    'H' => Text("from", Word),
    'J' => Text("continue", Word),
    'K' => Text("else", Word),
    'M' => Text("import", Word),
    'P' => Text("pass", Word),
    'Q' => Text("raise", Word),
    'R' => Text("return", Word),
    'S' => Text("async", Word),
    'T' => Text("try", Word),
    'V' => Text("with", Word),
    'W' => Text("while", Word),
    'X' => Text("except", Word),
    'Y' => Text("finally", Word),
    'Z' => Text("elif", Word),
    '?' => Text("if", Word),

    // Comparison shorthands
    'E' => Text("==", Operator),
    'G' => Text(">=", Operator),
    'L' => Text("<=", Operator),
    '!' => Text("!=", Operator),

    // Operators
    '+' => Text("+", Operator),
    '-' => Text("-", Operator),
    '*' => Text("*", Operator),
    '/' => Text("/", Operator),
    '%' => Text("%", Operator),
    '=' => Text("=", Operator),
    '<' => Text("<", Operator),
    '>' => Text(">", Operator),
    '&' => Text("&", Operator),
    '|' => Text("|", Operator),
    '^' => Text("^", Operator),
    '~' => Text("~", Operator),

    // Delimiters
    '(' => Text("(", Open),
    '[' => Text("[", Open),
    '{' => Text("{", Open),
    ')' => Text(")", Close),
    ']' => Text("]", Close),
    '}' => Text("}", Close),
    ',' => Text(",", Comma),
    ';' => Text(";", Comma),
    ':' => Text(":", Colon),
    '.' => Text(".", Dot),
};

/// Shared corpus of common Python identifiers and keywords, keyed `c<n>`.
pub static CORPUS: phf::Map<&'static str, &'static str> = phf_map! {
    "c0" => "self",
    "c1" => "Exception",
    "c2" => "print",
    "c3" => "len",
    "c4" => "range",
    "c5" => "str",
    "c6" => "int",
    "c7" => "float",
    "c8" => "list",
    "c9" => "dict",
    "c10" => "set",
    "c11" => "tuple",
    "c12" => "isinstance",
    "c13" => "ValueError",
    "c14" => "TypeError",
    "c15" => "KeyError",
    "c16" => "IndexError",
    "c17" => "open",
    "c18" => "enumerate",
    "c19" => "zip",
    "c20" => "super",
    "c21" => "__init__",
    "c22" => "cls",
    "c23" => "logger",
    "c24" => "logging",
    "c25" => "os",
    "c26" => "sys",
    "c27" => "json",
    "c28" => "re",
    "c29" => "in",
    "c30" => "not",
    "c31" => "and",
    "c32" => "or",
    "c33" => "is",
    "c34" => "as",
    "c35" => "lambda",
    "c36" => "yield",
    "c37" => "global",
    "c38" => "nonlocal",
    "c39" => "del",
    "c40" => "assert",
    "c41" => "__name__",
    "c42" => "args",
    "c43" => "kwargs",
    "c44" => "append",
    "c45" => "get",
    "c46" => "items",
    "c47" => "keys",
    "c48" => "values",
    "c49" => "join",
    "c50" => "split",
    "c51" => "format",
    "c52" => "strip",
    "c53" => "RuntimeError",
    "c54" => "AttributeError",
    "c55" => "NotImplementedError",
    "c56" => "staticmethod",
    "c57" => "classmethod",
    "c58" => "property",
    "c59" => "sorted",
    "c60" => "min",
    "c61" => "max",
    "c62" => "sum",
    "c63" => "any",
    "c64" => "all",
    "c65" => "map",
    "c66" => "filter",
    "c67" => "bool",
    "c68" => "object",
    "c69" => "type",
    "c70" => "hasattr",
    "c71" => "getattr",
    "c72" => "setattr",
    "c73" => "path",
    "c74" => "read",
    "c75" => "write",
    "c76" => "close",
    "c77" => "result",
    "c78" => "data",
    "c79" => "value",
    "c80" => "name",
    "c81" => "OSError",
    "c82" => "StopIteration",
    "c83" => "dataclass",
    "c84" => "Optional",
    "c85" => "typing",
};

/// Logging level codes accepted by the `LOG` template, plus the full names.
pub static LOG_LEVELS: phf::Map<&'static str, &'static str> = phf_map! {
    "d" => "debug",
    "i" => "info",
    "w" => "warning",
    "e" => "error",
    "c" => "critical",
    "x" => "exception",
    "debug" => "debug",
    "info" => "info",
    "warning" => "warning",
    "error" => "error",
    "critical" => "critical",
    "exception" => "exception",
};

/// Look up a fixed token by its notation character.
pub fn fixed_token(c: char) -> Option<FixedToken> {
    FIXED_TOKENS.get(&c).copied()
}

/// Look up a corpus entry by its `c<n>` key.
pub fn corpus_entry(key: &str) -> Option<&'static str> {
    CORPUS.get(key).copied()
}
