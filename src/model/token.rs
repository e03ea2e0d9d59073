//! Lexical tokens produced by the tokenizer

use serde::Serialize;

use super::chunk::Position;

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Keyword,
    Identifier,
    /// `[name]` or `"name"` delimited identifier, delimiters included in the text
    BracketId,
    String,
    Number,
    Operator,
    ParenOpen,
    ParenClose,
    Comma,
    Dot,
    Semicolon,
    Star,
    /// Batch separator
    Go,
    /// `@name`
    Variable,
    /// `@@name`
    GlobalVariable,
    /// `#name` / `##name`
    TempTable,
    SystemProcedure,
    Comment,
    LineComment,
    /// A lone `@` not followed by an identifier character
    At,
    /// A lone `#` or `##` not followed by an identifier character
    Hash,
}

impl TokenType {
    /// Comments are skipped by every parser-side navigation helper.
    #[inline]
    pub fn is_comment(self) -> bool {
        matches!(self, TokenType::Comment | TokenType::LineComment)
    }
}

/// Reserved-word category assigned by the keyword tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    Statement,
    Clause,
    Function,
    Datatype,
    Operator,
    Constraint,
    Modifier,
    Misc,
    GlobalVariable,
    SystemProcedure,
}

impl KeywordCategory {
    /// Whether a keyword of this category may stand in for a bare column or table name
    /// (`SELECT name, date, type FROM ...`).
    pub fn can_be_identifier(self) -> bool {
        matches!(
            self,
            KeywordCategory::Function
                | KeywordCategory::Datatype
                | KeywordCategory::Modifier
                | KeywordCategory::Misc
        )
    }
}

/// A single token with the 1-indexed position of its first character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Source text exactly as written (quotes, brackets and prefixes preserved)
    pub text: String,
    pub line: usize,
    pub col: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_category: Option<KeywordCategory>,
}

impl Token {
    pub fn new(token_type: TokenType, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            token_type,
            text: text.into(),
            line,
            col,
            keyword_category: None,
        }
    }

    pub fn with_category(mut self, category: KeywordCategory) -> Self {
        self.keyword_category = Some(category);
        self
    }

    /// Position of the first character.
    #[inline]
    pub fn start(&self) -> Position {
        Position::new(self.line, self.col)
    }

    /// Position of the last character (inclusive).
    ///
    /// Multi-line strings and comments advance the line once per newline, with
    /// `\r\n` counted as a single newline.
    pub fn end(&self) -> Position {
        let mut line = self.line;
        let mut col = self.col;
        let mut first = true;
        let mut chars = self.text.chars().peekable();
        while let Some(c) = chars.next() {
            if first {
                first = false;
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                continue;
            }
            match c {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    line += 1;
                    col = 0;
                }
                '\n' => {
                    line += 1;
                    col = 0;
                }
                _ => col += 1,
            }
        }
        Position::new(line, col)
    }

    /// Case-insensitive text comparison for keyword-shaped tokens.
    #[inline]
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self.token_type, TokenType::Keyword | TokenType::Identifier)
            && self.text.eq_ignore_ascii_case(word)
    }

    #[inline]
    pub fn is_comment(&self) -> bool {
        self.token_type.is_comment()
    }
}
