//! Parameter extraction post-pass
//!
//! Whether `@name` is a parameter or a table-variable reference depends on the
//! token before it, so parameters are collected only after a statement has been
//! fully parsed, over its finalized token range.

use std::collections::HashSet;

use crate::model::{ParameterInfo, Token, TokenType};

/// Keywords after which a variable names a table variable, not a parameter.
const TABLE_VARIABLE_CONTEXT: &[&str] = &["FROM", "JOIN", "INTO"];

/// Classify the token at `index` as a parameter reference.
///
/// `preceding` is the closest non-comment token before `index`. Handles `@name`,
/// `@@name`, and the two-token form where a lone `@` is directly followed by an
/// identifier. Returns `None` for non-variables and table-variable references.
pub fn classify_variable(
    index: usize,
    tokens: &[Token],
    preceding: Option<&Token>,
) -> Option<ParameterInfo> {
    let token = tokens.get(index)?;

    let (full_name, is_system) = match token.token_type {
        TokenType::Variable => (token.text.clone(), false),
        TokenType::GlobalVariable => (token.text.clone(), true),
        TokenType::At => {
            let next = tokens.get(index + 1)?;
            if next.token_type != TokenType::Identifier || !is_adjacent(token, next) {
                return None;
            }
            (format!("@{}", next.text), false)
        }
        _ => return None,
    };

    if preceding.is_some_and(|p| TABLE_VARIABLE_CONTEXT.iter().any(|kw| p.is_word(kw))) {
        return None;
    }

    let name = full_name.trim_start_matches('@').to_string();
    Some(ParameterInfo {
        name,
        full_name,
        is_system,
        line: token.line,
        col: token.col,
    })
}

/// Collect parameters from `tokens[start..=end]`, deduplicated by lowercase full name.
pub fn extract_parameters(tokens: &[Token], start: usize, end: usize) -> Vec<ParameterInfo> {
    let mut parameters = Vec::new();
    if tokens.is_empty() || start > end {
        return parameters;
    }
    let end = end.min(tokens.len() - 1);
    let mut seen = HashSet::new();
    let mut preceding: Option<&Token> = None;

    for index in start..=end {
        let token = &tokens[index];
        if token.is_comment() {
            continue;
        }
        if let Some(param) = classify_variable(index, tokens, preceding) {
            if seen.insert(param.full_name.to_lowercase()) {
                parameters.push(param);
            }
        }
        preceding = Some(token);
    }

    parameters
}

/// `@` and the identifier after it must touch to form one name.
fn is_adjacent(at: &Token, next: &Token) -> bool {
    at.line == next.line && at.col + 1 == next.col
}
