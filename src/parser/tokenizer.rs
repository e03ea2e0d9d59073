//! Character-level T-SQL tokenizer
//!
//! A small finite-state scanner that never fails: unterminated strings,
//! delimited identifiers and comments at end of input are flushed as
//! best-effort tokens, since the common input is a script being typed.
//!
//! Positions are 1-indexed and point at the first character of each token.
//! `\r\n` advances the line exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::keywords::{is_system_procedure, keyword_category};
use crate::model::{KeywordCategory, Token, TokenType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Normal,
    InString,
    InBracketId,
    InQuotedId,
    InBlockComment,
    InLineComment,
}

/// Two-character operators, matched greedily before single characters.
const TWO_CHAR_OPERATORS: &[&str] = &["<>", "<=", ">=", "!=", "!<", "!>", "::"];

/// Tokenize `text` synchronously.
pub fn tokenize(text: &str) -> Vec<Token> {
    Tokenizer::new(text).tokenize()
}

/// Streaming scanner over the characters of one script.
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    state: LexState,
    buf: String,
    buf_line: usize,
    buf_col: usize,
    comment_depth: usize,
    tokens: Vec<Token>,
    /// Type of the last emitted non-comment token (negative-number context)
    last_significant: Option<TokenType>,
    cancel: Option<Arc<AtomicBool>>,
}

impl Tokenizer {
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        // Rough estimate: one token per five characters
        let capacity = chars.len() / 5 + 1;
        Self {
            chars,
            pos: 0,
            line: 1,
            col: 1,
            state: LexState::Normal,
            buf: String::new(),
            buf_line: 1,
            buf_col: 1,
            comment_depth: 0,
            tokens: Vec::with_capacity(capacity),
            last_significant: None,
            cancel: None,
        }
    }

    /// Stop scanning at the next token boundary once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn tokenize(self) -> Vec<Token> {
        self.tokenize_with_progress(|_| {})
    }

    /// Tokenize, reporting whole-percent progress (0..=100) as it changes.
    pub fn tokenize_with_progress(mut self, mut on_progress: impl FnMut(u8)) -> Vec<Token> {
        let total = self.chars.len();
        let mut reported: u8 = 0;
        on_progress(0);

        while self.pos < total {
            if self.at_token_boundary() && self.is_cancelled() {
                return self.tokens;
            }
            self.step();

            let pct = (self.pos * 100 / total.max(1)) as u8;
            if pct > reported {
                reported = pct;
                on_progress(pct);
            }
        }

        self.finish();
        if reported < 100 {
            on_progress(100);
        }
        self.tokens
    }

    // ========================================================================
    // Character access
    // ========================================================================

    #[inline]
    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Consume one character, keeping line/column in step.
    fn take(&mut self) -> char {
        let c = self.chars[self.pos];
        self.pos += 1;
        match c {
            '\n' => {
                self.line += 1;
                self.col = 1;
            }
            // The following \n performs the line advance
            '\r' if self.peek_char(0) == Some('\n') => self.col += 1,
            '\r' => {
                self.line += 1;
                self.col = 1;
            }
            _ => self.col += 1,
        }
        c
    }

    fn take_into_buf(&mut self) {
        let c = self.take();
        self.buf.push(c);
    }

    fn begin_buf(&mut self) {
        self.buf.clear();
        self.buf_line = self.line;
        self.buf_col = self.col;
    }

    #[inline]
    fn at_token_boundary(&self) -> bool {
        self.state == LexState::Normal && self.buf.is_empty()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn push_token(&mut self, token: Token) {
        if !token.is_comment() {
            self.last_significant = Some(token.token_type);
        }
        self.tokens.push(token);
    }

    fn emit_buf(&mut self, token_type: TokenType) {
        let text = std::mem::take(&mut self.buf);
        self.push_token(Token::new(token_type, text, self.buf_line, self.buf_col));
    }

    /// Emit a token made of the next `len` characters.
    fn emit_chars(&mut self, token_type: TokenType, len: usize) {
        let (line, col) = (self.line, self.col);
        let mut text = String::with_capacity(len);
        for _ in 0..len {
            text.push(self.take());
        }
        self.push_token(Token::new(token_type, text, line, col));
    }

    /// Flush the accumulated word or number, classifying it.
    fn flush_word(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let (token_type, category) = classify_word(&self.buf);
        let text = std::mem::take(&mut self.buf);
        let mut token = Token::new(token_type, text, self.buf_line, self.buf_col);
        token.keyword_category = category;
        self.push_token(token);
    }

    // ========================================================================
    // State machine
    // ========================================================================

    fn step(&mut self) {
        match self.state {
            LexState::Normal => self.step_normal(),
            LexState::InString => self.step_delimited('\'', TokenType::String),
            LexState::InBracketId => self.step_delimited(']', TokenType::BracketId),
            LexState::InQuotedId => self.step_delimited('"', TokenType::BracketId),
            LexState::InBlockComment => self.step_block_comment(),
            LexState::InLineComment => self.step_line_comment(),
        }
    }

    fn step_normal(&mut self) {
        let c = self.chars[self.pos];
        let next = self.peek_char(1);

        if c.is_whitespace() {
            self.flush_word();
            self.take();
            return;
        }

        match c {
            '\'' => {
                if self.buf.eq_ignore_ascii_case("N") {
                    // Unicode prefix: fold N into the string token
                } else {
                    self.flush_word();
                    self.begin_buf();
                }
                self.take_into_buf();
                self.state = LexState::InString;
            }
            '[' => self.begin_delimited(LexState::InBracketId),
            '"' => self.begin_delimited(LexState::InQuotedId),
            '/' if next == Some('*') => {
                self.flush_word();
                self.begin_buf();
                self.take_into_buf();
                self.take_into_buf();
                self.comment_depth = 1;
                self.state = LexState::InBlockComment;
            }
            '-' if next == Some('-') => {
                self.flush_word();
                self.begin_buf();
                self.take_into_buf();
                self.take_into_buf();
                self.state = LexState::InLineComment;
            }
            '-' if self.starts_negative_number() => {
                self.begin_buf();
                self.take_into_buf();
            }
            '.' if self.continues_number() => {
                if self.buf.is_empty() {
                    self.begin_buf();
                }
                self.take_into_buf();
            }
            '.' => {
                self.flush_word();
                self.emit_chars(TokenType::Dot, 1);
            }
            '@' => {
                self.flush_word();
                self.scan_variable();
            }
            '#' if !self.buf.is_empty() => self.take_into_buf(),
            '#' => self.scan_temp_table(),
            '(' => self.emit_punctuation(TokenType::ParenOpen),
            ')' => self.emit_punctuation(TokenType::ParenClose),
            ',' => self.emit_punctuation(TokenType::Comma),
            ';' => self.emit_punctuation(TokenType::Semicolon),
            '*' => self.emit_punctuation(TokenType::Star),
            c if is_ident_char(c) => {
                if self.buf.is_empty() {
                    self.begin_buf();
                }
                self.take_into_buf();
            }
            _ => {
                self.flush_word();
                let len = match next {
                    Some(n) if TWO_CHAR_OPERATORS.iter().any(|op| op_matches(op, c, n)) => 2,
                    _ => 1,
                };
                self.emit_chars(TokenType::Operator, len);
            }
        }
    }

    fn emit_punctuation(&mut self, token_type: TokenType) {
        self.flush_word();
        self.emit_chars(token_type, 1);
    }

    fn begin_delimited(&mut self, state: LexState) {
        self.flush_word();
        self.begin_buf();
        self.take_into_buf();
        self.state = state;
    }

    /// Strings, `[ids]` and `"ids"`: a doubled closing delimiter is an escape.
    fn step_delimited(&mut self, close: char, token_type: TokenType) {
        let c = self.chars[self.pos];
        if c == close {
            if self.peek_char(1) == Some(close) {
                self.take_into_buf();
                self.take_into_buf();
                return;
            }
            self.take_into_buf();
            self.emit_buf(token_type);
            self.state = LexState::Normal;
        } else {
            self.take_into_buf();
        }
    }

    fn step_block_comment(&mut self) {
        let c = self.chars[self.pos];
        let next = self.peek_char(1);
        if c == '/' && next == Some('*') {
            self.comment_depth += 1;
            self.take_into_buf();
            self.take_into_buf();
        } else if c == '*' && next == Some('/') {
            self.comment_depth -= 1;
            self.take_into_buf();
            self.take_into_buf();
            if self.comment_depth == 0 {
                self.emit_buf(TokenType::Comment);
                self.state = LexState::Normal;
            }
        } else {
            self.take_into_buf();
        }
    }

    fn step_line_comment(&mut self) {
        let c = self.chars[self.pos];
        if c == '\n' || c == '\r' {
            // The newline itself is left to the normal state as whitespace
            self.emit_buf(TokenType::LineComment);
            self.state = LexState::Normal;
        } else {
            self.take_into_buf();
        }
    }

    /// `-` begins a number only with an empty buffer, a digit (or `.digit`) next,
    /// and a previous token after which an operand is expected.
    fn starts_negative_number(&self) -> bool {
        if !self.buf.is_empty() {
            return false;
        }
        let digit_follows = match (self.peek_char(1), self.peek_char(2)) {
            (Some(d), _) if d.is_ascii_digit() => true,
            (Some('.'), Some(d)) => d.is_ascii_digit(),
            _ => false,
        };
        digit_follows
            && matches!(
                self.last_significant,
                None | Some(
                    TokenType::Operator
                        | TokenType::Comma
                        | TokenType::ParenOpen
                        | TokenType::Keyword
                        | TokenType::Go
                        | TokenType::Semicolon
                )
            )
    }

    /// `.` is a decimal point when a digit follows and the buffer is empty,
    /// all digits, or a negative number in progress.
    fn continues_number(&self) -> bool {
        if !self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            return false;
        }
        let digits = self.buf.strip_prefix('-').unwrap_or(&self.buf);
        self.buf.is_empty() || digits.chars().all(|c| c.is_ascii_digit())
    }

    fn scan_variable(&mut self) {
        let (line, col) = (self.line, self.col);
        let is_global =
            self.peek_char(1) == Some('@') && self.peek_char(2).is_some_and(is_ident_char);
        let prefix_len = if is_global { 2 } else { 1 };

        if !self.peek_char(prefix_len).is_some_and(is_ident_char) {
            self.emit_chars(TokenType::At, 1);
            return;
        }

        let mut text = String::new();
        for _ in 0..prefix_len {
            text.push(self.take());
        }
        while self
            .peek_char(0)
            .is_some_and(|c| is_ident_char(c) || c == '#' || c == '@')
        {
            text.push(self.take());
        }

        let token = if is_global {
            let token = Token::new(TokenType::GlobalVariable, text, line, col);
            match keyword_category(&token.text) {
                Some(category) => token.with_category(category),
                None => token,
            }
        } else {
            Token::new(TokenType::Variable, text, line, col)
        };
        self.push_token(token);
    }

    fn scan_temp_table(&mut self) {
        let (line, col) = (self.line, self.col);
        let hashes = if self.peek_char(1) == Some('#') { 2 } else { 1 };

        if !self.peek_char(hashes).is_some_and(is_ident_char) {
            self.emit_chars(TokenType::Hash, hashes);
            return;
        }

        let mut text = String::new();
        for _ in 0..hashes {
            text.push(self.take());
        }
        while self
            .peek_char(0)
            .is_some_and(|c| is_ident_char(c) || c == '#')
        {
            text.push(self.take());
        }
        self.push_token(Token::new(TokenType::TempTable, text, line, col));
    }

    /// Flush whatever construct is open at end of input.
    fn finish(&mut self) {
        match self.state {
            LexState::Normal => self.flush_word(),
            LexState::InString => self.emit_buf(TokenType::String),
            LexState::InBracketId | LexState::InQuotedId => self.emit_buf(TokenType::BracketId),
            LexState::InBlockComment => self.emit_buf(TokenType::Comment),
            LexState::InLineComment => self.emit_buf(TokenType::LineComment),
        }
        self.state = LexState::Normal;
    }
}

#[inline]
fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[inline]
fn op_matches(op: &str, first: char, second: char) -> bool {
    let mut chars = op.chars();
    chars.next() == Some(first) && chars.next() == Some(second)
}

/// Classify an accumulated word: number, GO, system procedure, keyword or identifier.
fn classify_word(word: &str) -> (TokenType, Option<KeywordCategory>) {
    let first = word.chars().next().unwrap_or(' ');
    if first.is_ascii_digit() || first == '-' || first == '.' {
        return (TokenType::Number, None);
    }
    if word.eq_ignore_ascii_case("GO") {
        return (TokenType::Go, None);
    }
    if is_system_procedure(word) {
        return (
            TokenType::SystemProcedure,
            Some(KeywordCategory::SystemProcedure),
        );
    }
    match keyword_category(word) {
        Some(category) => (TokenType::Keyword, Some(category)),
        None => (TokenType::Identifier, None),
    }
}
