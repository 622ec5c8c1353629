//! Structural parser for semantic tokens.
//!
//! Invoked by the lexer once it has consumed `NAME(`. Grammar:
//!
//! ```text
//! semantic := NAME "(" [param (sep param)*] ( ")" [body] | ":" body ")" )
//! sep      := "," | ":"
//! body     := "{" token* "}"
//! ```
//!
//! Parameters are single tokens. Body blocks are token sequences lexed by the
//! same lexer, so semantic tokens nest to any depth. Fixed `{`/`}` tokens inside
//! a body are counted, which lets dict literals appear in bodies.

use super::lexer::Lexer;
use super::token::{SemanticName, SemanticToken, Token, TokenList};
use crate::utils::error::DecodeResult;

/// Parse the remainder of a semantic token whose `NAME(` was consumed.
///
/// `offset` is where the name started, for error reporting.
pub fn parse_semantic(lexer: &mut Lexer<'_>, name: SemanticName, offset: usize) -> DecodeResult<Token> {
    let mut params = Vec::new();

    lexer.skip_whitespace();
    match lexer.peek_char() {
        Some(')') => {
            lexer.bump();
            return finish_after_close(lexer, name, params, offset);
        }
        Some(':') => {
            // Zero-parameter body form: NAME(:{...})
            let colon = lexer.position();
            lexer.bump();
            lexer.skip_whitespace();
            if lexer.peek_char() != Some('{') {
                return Err(lexer.parse_error(colon, format!("expected parameter in {}", name)));
            }
            lexer.bump();
            let body = parse_body(lexer, offset)?;
            expect_close(lexer, name, offset)?;
            return Ok(build(name, params, Some(body), offset));
        }
        _ => {}
    }

    loop {
        lexer.skip_whitespace();
        let param_pos = lexer.position();
        match lexer.peek_char() {
            None => return Err(unterminated_params(lexer, name, offset)),
            Some(c @ (')' | ',' | ':')) => {
                return Err(lexer.parse_error(
                    param_pos,
                    format!("empty parameter in {} (found '{}')", name, c),
                ))
            }
            _ => {}
        }

        let param = lexer
            .next_param_token()?
            .ok_or_else(|| unterminated_params(lexer, name, offset))?;
        params.push(param);

        lexer.skip_whitespace();
        let sep_pos = lexer.position();
        match lexer.bump() {
            Some(')') => return finish_after_close(lexer, name, params, offset),
            Some(',') => continue,
            Some(':') => {
                lexer.skip_whitespace();
                if lexer.peek_char() == Some('{') {
                    lexer.bump();
                    let body = parse_body(lexer, offset)?;
                    expect_close(lexer, name, offset)?;
                    return Ok(build(name, params, Some(body), offset));
                }
            }
            None => return Err(unterminated_params(lexer, name, offset)),
            Some(c) => {
                return Err(lexer.parse_error(
                    sep_pos,
                    format!("expected ',', ':' or ')' after parameter of {}, found '{}'", name, c),
                ))
            }
        }
    }
}

/// After `)`: an optional `{...}` body for names that take one
fn finish_after_close(
    lexer: &mut Lexer<'_>,
    name: SemanticName,
    params: Vec<Token>,
    offset: usize,
) -> DecodeResult<Token> {
    if name.accepts_body() {
        lexer.skip_whitespace();
        if lexer.peek_char() == Some('{') {
            lexer.bump();
            let body = parse_body(lexer, offset)?;
            return Ok(build(name, params, Some(body), offset));
        }
    }
    Ok(build(name, params, None, offset))
}

/// Read tokens up to the `}` matching an already consumed `{`
fn parse_body(lexer: &mut Lexer<'_>, offset: usize) -> DecodeResult<TokenList> {
    let open = lexer.position().saturating_sub(1);
    let mut tokens = TokenList::new();
    let mut depth = 0usize;

    loop {
        lexer.skip_whitespace();
        match lexer.peek_char() {
            None => {
                return Err(lexer.parse_error(
                    open,
                    format!("unterminated body block (semantic token at offset {})", offset),
                ))
            }
            Some('}') if depth == 0 => {
                lexer.bump();
                return Ok(tokens);
            }
            _ => {}
        }

        let token = lexer
            .next_token()?
            .ok_or_else(|| lexer.parse_error(open, "unterminated body block"))?;
        if token.is_fixed('{') {
            depth += 1;
        } else if token.is_fixed('}') {
            depth -= 1;
        }
        tokens.push(token, lexer.token_start());
    }
}

fn expect_close(lexer: &mut Lexer<'_>, name: SemanticName, offset: usize) -> DecodeResult<()> {
    lexer.skip_whitespace();
    let pos = lexer.position();
    match lexer.bump() {
        Some(')') => Ok(()),
        None => Err(unterminated_params(lexer, name, offset)),
        Some(c) => Err(lexer.parse_error(
            pos,
            format!("expected ')' after body block of {}, found '{}'", name, c),
        )),
    }
}

fn unterminated_params(
    lexer: &Lexer<'_>,
    name: SemanticName,
    offset: usize,
) -> crate::utils::error::DecodeError {
    lexer.parse_error(offset, format!("unterminated parameter list for {}", name))
}

fn build(name: SemanticName, params: Vec<Token>, body: Option<TokenList>, offset: usize) -> Token {
    Token::Semantic(SemanticToken {
        name,
        params,
        body,
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;
    use crate::utils::error::DecodeError;

    fn semantic(input: &str) -> SemanticToken {
        match tokenize(input).unwrap().into_iter().next() {
            Some(Token::Semantic(sem)) => sem,
            other => panic!("expected semantic token, got {:?}", other),
        }
    }

    #[test]
    fn test_comma_and_colon_separators() {
        let a = semantic("ATTR(c0,d0,d1)");
        let b = semantic("ATTR(c0:d0:d1)");
        assert_eq!(a.params, b.params);
        assert_eq!(a.params.len(), 3);
    }

    #[test]
    fn test_body_after_close_paren() {
        let sem = semantic("TRYLOG(c1,e){LOG(i,l0)}");
        assert_eq!(sem.name, SemanticName::TryLog);
        assert_eq!(sem.params, vec![Token::CorpusRef("c1".into()), Token::Bare("e".into())]);
        let body = sem.body.expect("body");
        assert_eq!(body.len(), 1);
        let inner = body.as_slice()[0].as_semantic().expect("nested LOG");
        assert_eq!(inner.name, SemanticName::Log);
        assert_eq!(inner.offset, 13);
    }

    #[test]
    fn test_body_token_offsets() {
        let sem = semantic("TRYLOG(c1,e){PN d9}");
        let body = sem.body.expect("body");
        let offsets: Vec<usize> = body.spanned().map(|(offset, _)| offset).collect();
        assert_eq!(offsets, vec![13, 14, 16]);
    }

    #[test]
    fn test_colon_body_form() {
        let sem = semantic("TRYLOG(c1:e:{LOG(i,l0)N})");
        assert_eq!(sem.params.len(), 2);
        assert_eq!(sem.body.expect("body").len(), 2);

        let main = semantic("MAIN(:{d0(l0)})");
        assert!(main.params.is_empty());
        assert_eq!(main.body.expect("body").len(), 4);
    }

    #[test]
    fn test_nested_bodies_and_dict_braces() {
        let sem = semantic("MAIN(){TRYLOG(c1,e){d0={l0:1}}}");
        let body = sem.body.expect("body");
        let inner = body.as_slice()[0].as_semantic().expect("TRYLOG");
        let inner_body = inner.body.as_ref().expect("inner body");
        assert!(inner_body.as_slice().iter().any(|t| t.is_fixed('{')));
        assert!(inner_body.as_slice().iter().any(|t| t.is_fixed('}')));
    }

    #[test]
    fn test_body_only_for_body_templates() {
        // LOG takes no body, so `{` after it is an ordinary token
        let tokens = tokenize("LOG(i,l0){").unwrap();
        assert!(tokens[0].as_semantic().unwrap().body.is_none());
        assert!(tokens[1].is_fixed('{'));
    }

    #[test]
    fn test_unterminated_params() {
        let err = tokenize("N LOG(i,l0").unwrap_err();
        assert!(matches!(err, DecodeError::Parse { position: 2, .. }));
        assert!(err.to_string().contains("unterminated parameter list"));
    }

    #[test]
    fn test_unterminated_body() {
        let err = tokenize("TRYLOG(c1,e){LOG(i,l0)").unwrap_err();
        assert!(err.to_string().contains("unterminated body block"));

        let err = tokenize("MAIN(){d0={l0:1}").unwrap_err();
        assert!(err.to_string().contains("unterminated body block"));
    }

    #[test]
    fn test_missing_close_after_colon_body() {
        let err = tokenize("WITH(d0,d1:{P}N").unwrap_err();
        assert!(matches!(err, DecodeError::Parse { .. }));
        assert!(err.to_string().contains("expected ')'"));
    }

    #[test]
    fn test_bad_separator_and_empty_param() {
        assert!(tokenize("ATTR(c0 d0)").is_err());
        assert!(tokenize("ATTR(c0,,d0)").is_err());
    }
}
