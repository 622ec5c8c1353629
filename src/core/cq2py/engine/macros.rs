//! Semantic-token templates.
//!
//! `MacroRegistry` maps each `SemanticName` to a template function. The
//! standard registry covers the whole vocabulary; a custom registry can
//! replace or remove templates without touching the lexer or the parser.
//!
//! Templates write complete statements through the session and leave the
//! last line open, so a following `N` ends them like any other statement.

use fxhash::FxHashMap;
use lazy_static::lazy_static;

use super::token::{SemanticName, SemanticToken, Token, TokenList};
use crate::core::cq2py::context::DecodeSession;
use crate::data::maps::LOG_LEVELS;
use crate::utils::error::{DecodeError, DecodeResult};

/// Expansion strategy for one semantic token
pub type Template = fn(&mut DecodeSession<'_>, &SemanticToken) -> DecodeResult<()>;

lazy_static! {
    static ref STANDARD: MacroRegistry = MacroRegistry::standard();
}

/// Registry of templates keyed by semantic name
#[derive(Clone, Default)]
pub struct MacroRegistry {
    templates: FxHashMap<SemanticName, Template>,
}

impl std::fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = SemanticName::ALL
            .iter()
            .filter(|name| self.contains(**name))
            .collect();
        f.debug_struct("MacroRegistry").field("templates", &names).finish()
    }
}

impl MacroRegistry {
    /// Registry with no templates
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the standard template for every name
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(SemanticName::Log, expand_log);
        registry.register(SemanticName::Attr, expand_attr);
        registry.register(SemanticName::Guard, expand_guard);
        registry.register(SemanticName::TryLog, expand_trylog);
        registry.register(SemanticName::Default, expand_default);
        registry.register(SemanticName::With, expand_with);
        registry.register(SemanticName::Main, expand_main);
        registry
    }

    /// Shared standard registry
    pub fn standard_ref() -> &'static MacroRegistry {
        &STANDARD
    }

    /// Add or replace a template, returning the previous one
    pub fn register(&mut self, name: SemanticName, template: Template) -> Option<Template> {
        self.templates.insert(name, template)
    }

    pub fn remove(&mut self, name: SemanticName) -> Option<Template> {
        self.templates.remove(&name)
    }

    pub fn get(&self, name: SemanticName) -> Option<Template> {
        self.templates.get(&name).copied()
    }

    pub fn contains(&self, name: SemanticName) -> bool {
        self.templates.contains_key(&name)
    }
}

// =============================================================================
// Invocation checks
// =============================================================================

fn arity(sem: &SemanticToken, expected: usize) -> DecodeResult<()> {
    if sem.params.len() != expected {
        return Err(DecodeError::macro_error(
            sem.name.as_str(),
            sem.offset,
            format!(
                "expected {} parameter{}, found {}",
                expected,
                if expected == 1 { "" } else { "s" },
                sem.params.len()
            ),
        ));
    }
    Ok(())
}

fn min_arity(sem: &SemanticToken, min: usize) -> DecodeResult<()> {
    if sem.params.len() < min {
        return Err(DecodeError::macro_error(
            sem.name.as_str(),
            sem.offset,
            format!(
                "expected at least {} parameters, found {}",
                min,
                sem.params.len()
            ),
        ));
    }
    Ok(())
}

fn required_body(sem: &SemanticToken) -> DecodeResult<&TokenList> {
    sem.body.as_ref().ok_or_else(|| {
        DecodeError::macro_error(sem.name.as_str(), sem.offset, "a body block is required")
    })
}

fn no_body(sem: &SemanticToken) -> DecodeResult<()> {
    if sem.body.is_some() {
        return Err(DecodeError::macro_error(
            sem.name.as_str(),
            sem.offset,
            "does not take a body block",
        ));
    }
    Ok(())
}

/// Map a level code (`i`) or name (`info`) to the logging method name
fn log_level(sem: &SemanticToken, token: &Token) -> DecodeResult<&'static str> {
    let code = match token {
        Token::Bare(code) | Token::StringLiteral(code) => code.as_str(),
        other => {
            return Err(DecodeError::macro_error(
                sem.name.as_str(),
                sem.offset,
                format!("expected a level code, found {}", other.describe()),
            ))
        }
    };
    LOG_LEVELS.get(code).copied().ok_or_else(|| {
        DecodeError::macro_error(
            sem.name.as_str(),
            sem.offset,
            format!("unknown log level '{}'", code),
        )
    })
}

// =============================================================================
// Templates
// =============================================================================

/// `LOG(level, fmt, args...)` -> `logger.level(fmt, args...)`
fn expand_log(s: &mut DecodeSession<'_>, sem: &SemanticToken) -> DecodeResult<()> {
    min_arity(sem, 2)?;
    no_body(sem)?;
    let level = log_level(sem, &sem.params[0])?;
    let args = s.resolve_params(sem, &sem.params[1..])?;
    let line = format!("{}.{}({})", s.logger(), level, args.join(", "));
    s.write_statement(&line);
    Ok(())
}

/// `ATTR(obj, attr, value)` -> `obj.attr = value`
fn expand_attr(s: &mut DecodeSession<'_>, sem: &SemanticToken) -> DecodeResult<()> {
    arity(sem, 3)?;
    no_body(sem)?;
    let p = s.resolve_params(sem, &sem.params)?;
    s.write_statement(&format!("{}.{} = {}", p[0], p[1], p[2]));
    Ok(())
}

fn expand_guard(s: &mut DecodeSession<'_>, sem: &SemanticToken) -> DecodeResult<()> {
    arity(sem, 1)?;
    no_body(sem)?;
    let var = s.resolve_param(sem, &sem.params[0])?;
    s.write_statement(&format!("if {} is None:", var));
    s.block(|s| {
        s.write_statement("return None");
        Ok(())
    })
}

fn expand_trylog(s: &mut DecodeSession<'_>, sem: &SemanticToken) -> DecodeResult<()> {
    arity(sem, 2)?;
    let body = required_body(sem)?;
    let exc = s.resolve_param(sem, &sem.params[0])?;
    let name = s.resolve_param(sem, &sem.params[1])?;

    s.write_statement("try:");
    s.block(|s| s.emit_block_body(body))?;
    s.emitter_mut().ensure_newline();
    s.write_statement(&format!("except {} as {}:", exc, name));
    let handler = format!("{}.error(\"%s\", {}, exc_info=True)", s.logger(), name);
    s.block(|s| {
        s.write_statement(&handler);
        Ok(())
    })
}

fn expand_default(s: &mut DecodeSession<'_>, sem: &SemanticToken) -> DecodeResult<()> {
    arity(sem, 2)?;
    no_body(sem)?;
    let var = s.resolve_param(sem, &sem.params[0])?;
    let value = s.resolve_param(sem, &sem.params[1])?;
    s.write_statement(&format!("if {} is None:", var));
    s.block(|s| {
        s.write_statement(&format!("{} = {}", var, value));
        Ok(())
    })
}

fn expand_with(s: &mut DecodeSession<'_>, sem: &SemanticToken) -> DecodeResult<()> {
    arity(sem, 2)?;
    let body = required_body(sem)?;
    let expr = s.resolve_param(sem, &sem.params[0])?;
    let name = s.resolve_param(sem, &sem.params[1])?;
    s.write_statement(&format!("with {} as {}:", expr, name));
    s.block(|s| s.emit_block_body(body))
}

fn expand_main(s: &mut DecodeSession<'_>, sem: &SemanticToken) -> DecodeResult<()> {
    arity(sem, 0)?;
    let body = required_body(sem)?;
    s.write_statement("if __name__ == \"__main__\":");
    s.block(|s| s.emit_block_body(body))
}
