//! Indentation-aware output sink.
//!
//! The notation drops all original whitespace, so the emitter reconstructs
//! it: indentation comes from explicit indent/dedent tokens, and intra-line
//! spacing comes from a small table over the classes of adjacent units. The
//! class of the last emitted unit is tracked as state instead of re-reading
//! the output buffer.

use crate::data::maps::TokenClass;

/// Decide whether a space separates `prev` and `next` on the same line.
pub fn needs_space(prev: TokenClass, next: TokenClass) -> bool {
    use TokenClass::*;

    match (prev, next) {
        (Open | Dot | Prefix, _) => false,
        (_, Close | Comma | Dot) => false,

        (Word, Word | Operator) => true,
        (Word, _) => false,

        (Operator, Operator) => false,
        (Operator, _) => true,

        (Close, Word | Operator) => true,
        (Close, _) => false,

        (Comma, _) => true,

        (Colon, Colon) => false,
        (Colon, _) => true,
    }
}

/// Class of a raw character at the edge of verbatim text
fn char_class(c: char) -> TokenClass {
    match c {
        '(' | '[' | '{' => TokenClass::Open,
        ')' | ']' | '}' => TokenClass::Close,
        ',' | ';' => TokenClass::Comma,
        ':' => TokenClass::Colon,
        '.' => TokenClass::Dot,
        '@' => TokenClass::Prefix,
        c if c.is_alphanumeric() || matches!(c, '_' | '\'' | '"') => TokenClass::Word,
        _ => TokenClass::Operator,
    }
}

/// Indentation- and spacing-aware text sink.
#[derive(Debug)]
pub struct Emitter {
    out: String,
    indent_level: usize,
    indent_unit: String,
    /// True right after a newline, until the first write of the line
    needs_indent: bool,
    /// Class of the last unit on the current line; `None` at line start
    last: Option<TokenClass>,
    /// A comment ends the current line; the next write starts a new one
    line_closed: bool,
    /// Code units written so far, comments excluded
    statements: usize,
}

impl Emitter {
    pub fn new(indent_width: usize) -> Self {
        Emitter {
            out: String::new(),
            indent_level: 0,
            indent_unit: " ".repeat(indent_width),
            needs_indent: true,
            last: None,
            line_closed: false,
            statements: 0,
        }
    }

    pub fn indent_level(&self) -> usize {
        self.indent_level
    }

    /// Number of code units written so far. Comments do not count.
    pub fn statements(&self) -> usize {
        self.statements
    }

    fn prefix_line(&mut self) {
        if self.line_closed {
            self.newline();
        }
        if self.needs_indent {
            for _ in 0..self.indent_level {
                self.out.push_str(&self.indent_unit);
            }
            self.needs_indent = false;
        }
    }

    /// Write one unit of the given class, spacing it from the previous unit
    pub fn write(&mut self, text: &str, class: TokenClass) {
        if text.is_empty() {
            return;
        }
        self.prefix_line();
        if let Some(prev) = self.last {
            if needs_space(prev, class) {
                self.out.push(' ');
            }
        }
        self.out.push_str(text);
        self.last = Some(class);
        self.statements += 1;
    }

    /// Write raw text, spacing it only at its outer edges.
    ///
    /// Line breaks inside `text` are copied as-is and do not receive the
    /// indent prefix.
    pub fn write_verbatim(&mut self, text: &str) {
        let (Some(first), Some(last)) = (text.chars().next(), text.chars().last()) else {
            return;
        };
        self.prefix_line();
        if let Some(prev) = self.last {
            if needs_space(prev, char_class(first)) {
                self.out.push(' ');
            }
        }
        self.out.push_str(text);
        if !text.trim().is_empty() {
            self.statements += 1;
        }
        if last == '\n' {
            self.needs_indent = true;
            self.last = None;
        } else {
            self.last = Some(char_class(last));
        }
    }

    /// Write a `#` comment after any code on the current line.
    ///
    /// Nothing else may follow a comment on its line, so the next write
    /// starts a new line.
    pub fn comment(&mut self, text: &str) {
        self.prefix_line();
        if self.last.is_some() {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.last = Some(TokenClass::Word);
        self.line_closed = true;
    }

    pub fn newline(&mut self) {
        self.out.push('\n');
        self.needs_indent = true;
        self.last = None;
        self.line_closed = false;
    }

    /// End the current line unless it is still empty
    pub fn ensure_newline(&mut self) {
        if !self.needs_indent {
            self.newline();
        }
    }

    /// Raise the indent level of subsequent lines
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Lower the indent level of subsequent lines.
    ///
    /// Returns false, leaving the level unchanged, if it is already zero.
    pub fn dedent(&mut self) -> bool {
        if self.indent_level == 0 {
            return false;
        }
        self.indent_level -= 1;
        true
    }

    /// Restore an indent level saved earlier
    pub fn set_indent_level(&mut self, level: usize) {
        self.indent_level = level;
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenClass::*;

    #[test]
    fn test_word_spacing() {
        let mut e = Emitter::new(4);
        e.write("def", Word);
        e.write("foo", Word);
        e.write("(", Open);
        e.write("x", Word);
        e.write(",", Comma);
        e.write("y", Word);
        e.write(")", Close);
        e.write(":", Colon);
        assert_eq!(e.finish(), "def foo(x, y):");
    }

    #[test]
    fn test_operator_spacing() {
        let mut e = Emitter::new(4);
        e.write("x", Word);
        e.write("=", Operator);
        e.write("a", Word);
        e.write(".", Dot);
        e.write("b", Word);
        e.write("[", Open);
        e.write("0", Word);
        e.write("]", Close);
        e.write("*", Operator);
        e.write("*", Operator);
        e.write("2", Word);
        assert_eq!(e.finish(), "x = a.b[0] ** 2");
    }

    #[test]
    fn test_indentation_applies_to_next_line() {
        let mut e = Emitter::new(4);
        e.write("if", Word);
        e.write("x", Word);
        e.write(":", Colon);
        e.indent();
        e.newline();
        e.write("pass", Word);
        e.newline();
        assert!(e.dedent());
        e.write("y", Word);
        assert_eq!(e.finish(), "if x:\n    pass\ny");
    }

    #[test]
    fn test_dedent_at_zero_is_refused() {
        let mut e = Emitter::new(4);
        assert!(!e.dedent());
        assert_eq!(e.indent_level(), 0);
    }

    #[test]
    fn test_indent_width() {
        let mut e = Emitter::new(2);
        e.indent();
        e.indent();
        e.write("x", Word);
        assert_eq!(e.finish(), "    x");
    }

    #[test]
    fn test_ensure_newline() {
        let mut e = Emitter::new(4);
        e.ensure_newline();
        assert_eq!(e.as_str(), "");
        e.write("x", Word);
        e.ensure_newline();
        e.ensure_newline();
        assert_eq!(e.finish(), "x\n");
    }

    #[test]
    fn test_verbatim() {
        let mut e = Emitter::new(4);
        e.indent();
        e.write("return", Word);
        e.write_verbatim("a if b else c");
        e.write(",", Comma);
        e.write("d", Word);
        assert_eq!(e.finish(), "    return a if b else c, d");
    }

    #[test]
    fn test_verbatim_edges() {
        let mut e = Emitter::new(4);
        e.write("x", Word);
        e.write("=", Operator);
        e.write_verbatim("{k: v}");
        e.write("[", Open);
        assert_eq!(e.finish(), "x = {k: v}[");
    }

    #[test]
    fn test_comment_closes_line() {
        let mut e = Emitter::new(4);
        e.comment("# note");
        e.write("x", Word);
        e.write("=", Operator);
        e.write("1", Word);
        e.comment("# one");
        e.newline();
        assert_eq!(e.finish(), "# note\nx = 1 # one\n");
    }

    #[test]
    fn test_comment_keeps_indent() {
        let mut e = Emitter::new(4);
        e.indent();
        e.comment("# a");
        e.comment("# b");
        e.write("pass", Word);
        assert_eq!(e.finish(), "    # a\n    # b\n    pass");
    }

    #[test]
    fn test_statement_count_skips_comments() {
        let mut e = Emitter::new(4);
        e.comment("# todo");
        e.newline();
        e.write_verbatim("  ");
        assert_eq!(e.statements(), 0);
        e.write("pass", Word);
        e.write_verbatim("x");
        assert_eq!(e.statements(), 2);
    }

    #[test]
    fn test_decorator_prefix() {
        let mut e = Emitter::new(4);
        e.write("@", Prefix);
        e.write("property", Word);
        assert_eq!(e.finish(), "@property");
    }

    #[test]
    fn test_class_pair_table() {
        assert!(needs_space(Word, Word));
        assert!(needs_space(Word, Operator));
        assert!(needs_space(Operator, Word));
        assert!(!needs_space(Word, Open));
        assert!(!needs_space(Open, Word));
        assert!(!needs_space(Word, Close));
        assert!(needs_space(Comma, Word));
        assert!(needs_space(Colon, Word));
        assert!(!needs_space(Colon, Close));
        assert!(!needs_space(Dot, Word));
        assert!(needs_space(Operator, Open));
        assert!(!needs_space(Operator, Operator));
    }
}
