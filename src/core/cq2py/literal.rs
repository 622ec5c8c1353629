//! Python literal rendering.
//!
//! Single-line strings use the same minimal quoting as Python's `repr`:
//! single quotes unless the text contains `'` and no `"`. Multi-line strings
//! use triple double quotes so the line structure survives in the source.

use std::fmt::Write;

/// Render string content as a Python string literal
pub fn quote_str(content: &str) -> String {
    if content.contains('\n') {
        quote_triple(content)
    } else {
        quote_single_line(content)
    }
}

fn quote_single_line(content: &str) -> String {
    let quote = if content.contains('\'') && !content.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(content.len() + 2);
    out.push(quote);
    for c in content.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => push_code_escape(&mut out, c),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn quote_triple(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 6);
    out.push_str("\"\"\"");

    let chars: Vec<char> = content.chars().collect();
    let mut run = 0usize;
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => {
                // Break up `"""` runs and never end on a bare quote
                run += 1;
                if run == 3 || i + 1 == chars.len() {
                    out.push_str("\\\"");
                    run = 0;
                } else {
                    out.push('"');
                }
                continue;
            }
            '\n' | '\t' => out.push(c),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => push_code_escape(&mut out, c),
            c => out.push(c),
        }
        run = 0;
    }

    out.push_str("\"\"\"");
    out
}

fn push_code_escape(out: &mut String, c: char) {
    let code = c as u32;
    if code <= 0xff {
        let _ = write!(out, "\\x{:02x}", code);
    } else {
        let _ = write!(out, "\\u{:04x}", code);
    }
}

/// Render bytes as a Python bytes literal
pub fn quote_bytes(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };

    let mut out = String::with_capacity(bytes.len() + 3);
    out.push('b');
    out.push(quote as char);
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", b);
            }
        }
    }
    out.push(quote as char);
    out
}
