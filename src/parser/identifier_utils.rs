//! Centralized identifier and alias handling for T-SQL parsing.
//!
//! These helpers decide which tokens may act as object names or aliases, and
//! normalize delimited identifiers to their bare form.
//!
//! # Examples
//!
//! ```ignore
//! use crate::parser::identifier_utils::*;
//!
//! assert_eq!(normalize_identifier("[My Table]"), "My Table");
//! assert_eq!(normalize_identifier("\"Col\""), "Col");
//! ```

use crate::model::{Token, TokenType};

/// Words that end a table reference rather than alias it.
const ALIAS_STOP_WORDS: &[&str] = &[
    "ON", "WHERE", "INNER", "LEFT", "RIGHT", "OUTER", "CROSS", "FULL", "JOIN", "APPLY", "GROUP",
    "ORDER", "HAVING", "UNION", "INTERSECT", "EXCEPT", "WITH", "AND", "OR", "NOT", "SET", "FROM",
    "SELECT", "INTO", "WHEN", "THEN", "ELSE", "END", "CASE", "FOR", "OPTION", "OUTPUT", "USING",
    "VALUES", "AS", "OFFSET", "FETCH", "LIMIT", "PIVOT", "UNPIVOT", "TABLESAMPLE", "WINDOW",
    "INSERT", "UPDATE", "DELETE", "MERGE", "CREATE", "ALTER", "DROP", "DECLARE", "EXEC",
    "EXECUTE", "TRUNCATE", "USE", "IF", "WHILE", "BEGIN", "RETURN", "PRINT", "GO",
];

/// Strips brackets `[]` and double quotes `""` from an identifier, unescaping
/// doubled closing delimiters.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_identifier("[MyTable]"), "MyTable");
/// assert_eq!(normalize_identifier("[a]]b]"), "a]b");
/// assert_eq!(normalize_identifier("dbo"), "dbo");
/// ```
pub fn normalize_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if let Some(inner) = trimmed.strip_prefix('[') {
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        return inner.replace("]]", "]");
    }
    if let Some(inner) = trimmed.strip_prefix('"') {
        let inner = inner.strip_suffix('"').unwrap_or(inner);
        return inner.replace("\"\"", "\"");
    }
    trimmed.to_string()
}

/// Check if a word is a keyword that must not be treated as an alias.
pub fn is_alias_keyword(word: &str) -> bool {
    ALIAS_STOP_WORDS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(word))
}

/// Whether the token can name a table, column or schema part.
///
/// Bare keywords qualify only when their category allows it (`date`, `type`, `count`).
pub fn is_name_token(token: &Token) -> bool {
    match token.token_type {
        TokenType::Identifier
        | TokenType::BracketId
        | TokenType::TempTable
        | TokenType::Variable
        | TokenType::SystemProcedure => true,
        TokenType::Keyword => {
            token.keyword_category.is_some_and(|c| c.can_be_identifier())
                && !is_alias_keyword(&token.text)
        }
        _ => false,
    }
}

/// Whether the token can be an alias.
///
/// After an explicit `AS`, string literals and non-clause keywords are accepted too.
pub fn is_alias_token(token: &Token, after_as: bool) -> bool {
    match token.token_type {
        TokenType::Identifier | TokenType::BracketId => !is_alias_keyword(&token.text),
        TokenType::String => after_as,
        TokenType::Keyword => {
            !is_alias_keyword(&token.text)
                && (after_as || token.keyword_category.is_some_and(|c| c.can_be_identifier()))
        }
        _ => false,
    }
}

/// Alias text with delimiters and string quotes removed.
pub fn alias_text(token: &Token) -> String {
    if token.token_type == TokenType::String {
        let inner = token.text.trim_start_matches(['N', 'n']);
        let inner = inner.strip_prefix('\'').unwrap_or(inner);
        let inner = inner.strip_suffix('\'').unwrap_or(inner);
        return inner.replace("''", "'");
    }
    normalize_identifier(&token.text)
}

/// A dotted object name with 1–4 parts (`server.database.schema.name`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualifiedName {
    /// Normalized parts in source order; empty strings stand for omitted parts (`db..t`)
    pub parts: Vec<String>,
}

impl QualifiedName {
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// The last part (object name).
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    fn part_from_end(&self, offset: usize) -> Option<&str> {
        let len = self.parts.len();
        if len > offset {
            Some(self.parts[len - 1 - offset].as_str()).filter(|p| !p.is_empty())
        } else {
            None
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.part_from_end(1)
    }

    pub fn database(&self) -> Option<&str> {
        self.part_from_end(2)
    }

    /// Dotted form with bare parts (`dbo.Orders`).
    pub fn joined(&self) -> String {
        self.parts.join(".")
    }
}
