//! Cursor over the token array shared by all statement handlers.
//!
//! `ParserState` consolidates navigation and token checks so that every
//! statement handler walks the token stream the same way. Comments are skipped
//! transparently: `current()` and `peek()` only ever return non-comment tokens.
//!
//! ## Usage
//!
//! ```ignore
//! let tokens = tokenize("SELECT a FROM t");
//! let mut state = ParserState::new(&tokens);
//! let start = state.mark_chunk_start();
//! assert!(state.consume_keyword("SELECT"));
//! ```

use super::keywords::is_statement_starter;
use super::parameters::extract_parameters;
use crate::model::{ParameterInfo, Span, Token, TokenType};

/// Navigation state over one script's tokens.
pub struct ParserState<'a> {
    tokens: &'a [Token],
    pos: usize,
    last_consumed: Option<usize>,
    chunk_start: usize,
}

impl<'a> ParserState<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        let mut state = Self {
            tokens,
            pos: 0,
            last_consumed: None,
            chunk_start: 0,
        };
        state.skip_comments();
        state
    }

    // ========================================================================
    // Position and state
    // ========================================================================

    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Index of the current (non-comment) token.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Index of the last token consumed by `advance`.
    #[inline]
    pub fn last_consumed(&self) -> Option<usize> {
        self.last_consumed
    }

    #[inline]
    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    #[inline]
    pub fn token(&self, index: usize) -> Option<&'a Token> {
        self.tokens.get(index)
    }

    fn skip_comments(&mut self) {
        while self
            .tokens
            .get(self.pos)
            .is_some_and(|t| t.token_type.is_comment())
        {
            self.pos += 1;
        }
    }

    // ========================================================================
    // Token access
    // ========================================================================

    #[inline]
    pub fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    /// The `n`-th non-comment token after the current one (`peek(0)` is `current()`).
    pub fn peek(&self, n: usize) -> Option<&'a Token> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .filter(|t| !t.is_comment())
            .nth(n)
    }

    /// Consume the current token and return it.
    pub fn advance(&mut self) -> Option<&'a Token> {
        let token = self.current()?;
        self.last_consumed = Some(self.pos);
        self.pos += 1;
        self.skip_comments();
        Some(token)
    }

    // ========================================================================
    // Token type checks
    // ========================================================================

    #[inline]
    pub fn is_type(&self, token_type: TokenType) -> bool {
        self.current().is_some_and(|t| t.token_type == token_type)
    }

    #[inline]
    pub fn peek_is_type(&self, n: usize, token_type: TokenType) -> bool {
        self.peek(n).is_some_and(|t| t.token_type == token_type)
    }

    /// Check if the current token is the keyword `kw` (case-insensitive).
    ///
    /// Bare identifiers match too, for contextual words the keyword tables do not
    /// reserve (`SOURCE`, `TARGET`).
    #[inline]
    pub fn is_keyword(&self, kw: &str) -> bool {
        self.current().is_some_and(|t| t.is_word(kw))
    }

    pub fn peek_is_keyword(&self, n: usize, kw: &str) -> bool {
        self.peek(n).is_some_and(|t| t.is_word(kw))
    }

    pub fn is_any_keyword(&self, keywords: &[&str]) -> bool {
        self.current()
            .is_some_and(|t| keywords.iter().any(|kw| t.is_word(kw)))
    }

    /// Expect a keyword, advancing if found.
    pub fn consume_keyword(&mut self, kw: &str) -> bool {
        if self.is_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Whether the current token starts a new statement (or batch) at paren depth 0.
    ///
    /// `WITH (` is a table hint, not a CTE.
    pub fn is_statement_start(&self) -> bool {
        match self.current() {
            Some(t) if t.token_type == TokenType::Go => true,
            Some(t) if t.token_type == TokenType::Keyword && is_statement_starter(&t.text) => {
                !(t.is_word("WITH") && self.peek_is_type(1, TokenType::ParenOpen)) && !self.after_dot()
            }
            _ => false,
        }
    }

    /// `ELSE` or `END` closing an IF branch or a BEGIN block. Callers skip the `END`
    /// of a CASE they are tracking.
    pub fn is_block_end(&self) -> bool {
        self.current().is_some_and(|t| {
            t.token_type == TokenType::Keyword && (t.is_word("ELSE") || t.is_word("END"))
        }) && !self.after_dot()
    }

    /// The current token follows a `.` (`o.open`, `t.set`), so it is a name part.
    pub fn after_dot(&self) -> bool {
        self.pos > 0
            && self.tokens[..self.pos]
                .iter()
                .rev()
                .find(|t| !t.is_comment())
                .is_some_and(|t| t.token_type == TokenType::Dot)
    }

    // ========================================================================
    // Chunk boundaries
    // ========================================================================

    /// Record the current index as the first token of a chunk.
    pub fn mark_chunk_start(&mut self) -> usize {
        self.chunk_start = self.pos;
        self.chunk_start
    }

    /// Tokens from the marked chunk start through the last consumed token,
    /// comments included.
    pub fn chunk_tokens(&self) -> &'a [Token] {
        match self.last_consumed {
            Some(last) if last >= self.chunk_start => &self.tokens[self.chunk_start..=last],
            _ => &[],
        }
    }

    /// Source span from the token at `start` through the last consumed token.
    pub fn span_from(&self, start: usize) -> Option<Span> {
        let first = self.tokens.get(start)?;
        let end = match self.last_consumed {
            Some(last) if last >= start => self.tokens[last].end(),
            _ => first.end(),
        };
        Some(Span::new(first.start(), end))
    }

    // ========================================================================
    // Skipping helpers
    // ========================================================================

    /// Consume tokens up to the end of the current statement.
    ///
    /// Stops (without consuming) at GO, `;`, a statement-starting keyword at depth 0,
    /// or a `)` that closes a paren opened before the statement. `paren_depth` is the
    /// nesting depth the caller is already inside.
    pub fn consume_until_statement_end(&mut self, paren_depth: usize) {
        let mut depth = paren_depth;
        let mut case_depth = 0usize;
        while let Some(token) = self.current() {
            match token.token_type {
                TokenType::Go | TokenType::Semicolon if depth == 0 => break,
                TokenType::ParenOpen => depth += 1,
                TokenType::ParenClose => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenType::Keyword if depth == 0 => {
                    if token.is_word("CASE") {
                        case_depth += 1;
                    } else if token.is_word("END") && case_depth > 0 {
                        case_depth -= 1;
                    } else if self.is_statement_start() || (case_depth == 0 && self.is_block_end()) {
                        break;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip a parenthesized group, handling nesting.
    ///
    /// Position must be at `(`. Consumes through the matching `)` and returns
    /// `true`; returns `false` if not at `(` or if the group is unterminated (in
    /// which case everything to the end of input has been consumed).
    pub fn skip_paren_contents(&mut self) -> bool {
        if !self.is_type(TokenType::ParenOpen) {
            return false;
        }
        let mut depth = 0usize;
        while let Some(token) = self.advance() {
            match token.token_type {
                TokenType::ParenOpen => depth += 1,
                TokenType::ParenClose => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    /// Consume an optional `TOP (n) [PERCENT] [WITH TIES]` prefix.
    pub fn skip_top_clause(&mut self) -> bool {
        if !self.consume_keyword("TOP") {
            return false;
        }
        if self.is_type(TokenType::ParenOpen) {
            self.skip_paren_contents();
        } else if self.is_type(TokenType::Number) || self.is_type(TokenType::Variable) {
            self.advance();
        }
        self.consume_keyword("PERCENT");
        if self.is_keyword("WITH") && self.peek_is_keyword(1, "TIES") {
            self.advance();
            self.advance();
        }
        true
    }

    // ========================================================================
    // Post-pass extraction
    // ========================================================================

    /// Parameters referenced in `tokens[start..=end]`.
    pub fn extract_parameters(&self, start: usize, end: usize) -> Vec<ParameterInfo> {
        extract_parameters(self.tokens, start, end)
    }
}
