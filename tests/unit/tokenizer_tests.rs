//! Unit tests for the T-SQL tokenizer

use pretty_assertions::assert_eq;

use rust_sqlscope::model::{KeywordCategory, Token, TokenType};
use rust_sqlscope::parser::{is_keyword, is_statement_starter, keyword_category};
use rust_sqlscope::tokenize;

fn types(tokens: &[Token]) -> Vec<TokenType> {
    tokens.iter().map(|t| t.token_type).collect()
}

/// Char offset of each line's first character (input uses `\n` only).
fn line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, c) in text.chars().enumerate() {
        if c == '\n' {
            offsets.push(i + 1);
        }
    }
    offsets
}

/// Rebuild the source from tokens, taking only whitespace from the original.
fn reconstruct(text: &str, tokens: &[Token]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let offsets = line_offsets(text);
    let mut out = String::new();
    let mut cursor = 0;
    for token in tokens {
        let start = offsets[token.line - 1] + token.col - 1;
        let gap: String = chars[cursor..start].iter().collect();
        assert!(
            gap.chars().all(char::is_whitespace),
            "non-whitespace between tokens: {gap:?}"
        );
        out.push_str(&gap);
        out.push_str(&token.text);
        cursor = start + token.text.chars().count();
    }
    out.extend(chars[cursor..].iter());
    out
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_round_trip_reconstructs_input() {
    let sql = "/* header /* nested */ */\nSELECT TOP (5) e.[First Name], N'caf''e', -1.5, @id, @@ROWCOUNT\n\
FROM dbo.Emp AS e -- trailing\n\tJOIN #work w ON w.id = e.id\nWHERE e.x <> 3 - 2\nGO\n";
    let tokens = tokenize(sql);
    assert_eq!(reconstruct(sql, &tokens), sql);
}

#[test]
fn test_round_trip_with_unterminated_tail() {
    let sql = "SELECT 'abc\n  FROM";
    let tokens = tokenize(sql);
    assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::String));
    assert_eq!(reconstruct(sql, &tokens), sql);
}

// ============================================================================
// Lexical disambiguation
// ============================================================================

#[test]
fn test_escaped_quote_is_one_string() {
    let tokens = tokenize("'it''s'");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token_type, TokenType::String);
    assert_eq!(tokens[0].text, "'it''s'");
}

#[test]
fn test_unary_minus_after_keyword() {
    let tokens = tokenize("SELECT -5");
    assert_eq!(types(&tokens), vec![TokenType::Keyword, TokenType::Number]);
    assert_eq!(tokens[1].text, "-5");
}

#[test]
fn test_binary_minus_after_identifier() {
    let tokens = tokenize("SELECT a - 5");
    assert_eq!(
        types(&tokens),
        vec![
            TokenType::Keyword,
            TokenType::Identifier,
            TokenType::Operator,
            TokenType::Number
        ]
    );
    assert_eq!(tokens[2].text, "-");
    assert_eq!(tokens[3].text, "5");
}

#[test]
fn test_negative_numbers_in_lists() {
    let tokens = tokenize("VALUES (-1, -2.5)");
    let numbers: Vec<&str> = tokens
        .iter()
        .filter(|t| t.token_type == TokenType::Number)
        .map(|t| t.text.as_str())
        .collect();
    assert_eq!(numbers, vec!["-1", "-2.5"]);
}

#[test]
fn test_member_dot_is_not_decimal() {
    let tokens = tokenize("t.col1 + 1.25");
    assert_eq!(tokens[1].token_type, TokenType::Dot);
    assert_eq!(tokens.last().map(|t| t.text.as_str()), Some("1.25"));
}

#[test]
fn test_temp_tables_and_variables() {
    let tokens = tokenize("#local ##global @v @@ERROR");
    assert_eq!(
        types(&tokens),
        vec![
            TokenType::TempTable,
            TokenType::TempTable,
            TokenType::Variable,
            TokenType::GlobalVariable
        ]
    );
    assert_eq!(tokens[1].text, "##global");
}

#[test]
fn test_positions_are_one_indexed() {
    let tokens = tokenize("SELECT\n  a,\r\n  b");
    let positions: Vec<(usize, usize)> = tokens.iter().map(|t| (t.line, t.col)).collect();
    assert_eq!(positions, vec![(1, 1), (2, 3), (2, 4), (3, 3)]);
}

#[test]
fn test_go_is_its_own_type() {
    let tokens = tokenize("SELECT 1\ngo\nSELECT 2");
    assert_eq!(tokens[2].token_type, TokenType::Go);
}

#[test]
fn test_bracket_identifier_keeps_delimiters() {
    let tokens = tokenize("[Order Details].[Unit-Price]");
    assert_eq!(tokens[0].token_type, TokenType::BracketId);
    assert_eq!(tokens[0].text, "[Order Details]");
    assert_eq!(tokens[2].text, "[Unit-Price]");
}

// ============================================================================
// Keyword tables
// ============================================================================

#[test]
fn test_keyword_lookup_is_case_insensitive() {
    assert!(is_keyword("select"));
    assert!(is_keyword("SeLeCt"));
    assert!(!is_keyword("employees"));
    assert_eq!(keyword_category("varchar"), Some(KeywordCategory::Datatype));
    assert!(is_statement_starter("merge"));
    assert!(!is_statement_starter("where"));
}

#[test]
fn test_keyword_tokens_carry_category() {
    let tokens = tokenize("SELECT COUNT(*) FROM t");
    assert_eq!(tokens[0].keyword_category, Some(KeywordCategory::Statement));
    assert_eq!(tokens[1].keyword_category, Some(KeywordCategory::Function));
}
