//! INSERT statements
//!
//! ```sql
//! INSERT [TOP (n)] [INTO] target [(c1, c2, ...)] [OUTPUT ...]
//!     { VALUES (...) [, (...)] | SELECT ... | EXEC proc ... | DEFAULT VALUES }
//! ```
//!
//! A column list whose `)` has not been typed yet is recorded as an open-ended
//! span, so a cursor anywhere after the `(` still classifies as inside the list.

use super::base_statement::{create_chunk, finalize_chunk, record_clause, Prelude};
use super::identifier_utils::{is_name_token, normalize_identifier};
use super::scope::ScopeContext;
use super::select_parser::SelectMode;
use super::statement_parser::{ClauseStop, StatementParser};
use crate::model::{Span, StatementChunk, StatementKind, TokenType};

/// Keywords that end an INSERT's OUTPUT clause.
const OUTPUT_STOPS: &[&str] = &["VALUES", "SELECT", "DEFAULT", "EXEC", "EXECUTE"];

/// Keywords that mean a column list was left unterminated.
const COLUMN_LIST_BREAKERS: &[&str] = &["VALUES", "OUTPUT", "DEFAULT", "SELECT", "EXEC"];

impl<'a> StatementParser<'a> {
    pub(super) fn parse_insert(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::Insert;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);

        let head_start = self.state.pos();
        self.state.advance();
        self.state.skip_top_clause();
        self.state.consume_keyword("INTO");
        if let Some(name) = self.parse_qualified_name() {
            self.skip_table_hints();
            let table = self.table_reference(&name, &scope);
            scope.add_table(table.clone());
            chunk.tables.push(table);
        }
        if let Some(span) = self.state.span_from(head_start) {
            record_clause(&mut chunk, "into", span);
        }

        if !self.is_subquery_start() {
            if let Some((columns, span)) = self.parse_column_name_list() {
                chunk.insert_columns = Some(columns);
                chunk.clause_positions.insert("insert_columns".to_string(), span);
            }
        }

        if self.state.is_keyword("OUTPUT") {
            if let Some(span) =
                self.parse_keyword_clause(&mut scope, 1, ClauseStop::keywords(OUTPUT_STOPS))
            {
                record_clause(&mut chunk, "output", span);
            }
        }

        self.parse_insert_source(&mut chunk, &mut scope);
        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }

    /// VALUES / SELECT / EXEC / DEFAULT VALUES
    fn parse_insert_source(&mut self, chunk: &mut StatementChunk, scope: &mut ScopeContext) {
        if self.state.is_keyword("VALUES") {
            if let Some(span) = self.parse_keyword_clause(scope, 1, ClauseStop::keywords(&[])) {
                record_clause(chunk, "values", span);
            }
        } else if self.state.is_any_keyword(&["EXEC", "EXECUTE"]) {
            let start = self.state.pos();
            self.state.advance();
            chunk.exec_procedure = self.parse_exec_target();
            self.state.consume_until_statement_end(0);
            if let Some(span) = self.state.span_from(start) {
                record_clause(chunk, "exec", span);
            }
        } else if self.state.is_keyword("SELECT") {
            self.parse_select_body(chunk, scope, SelectMode::InsertSource);
            self.parse_set_operations(chunk, scope);
        } else if self.state.is_keyword("DEFAULT") && self.state.peek_is_keyword(1, "VALUES") {
            let start = self.state.pos();
            self.state.advance();
            self.state.advance();
            if let Some(span) = self.state.span_from(start) {
                record_clause(chunk, "default_values", span);
            }
        }
    }

    /// `(c1, c2, ...)` column list; the span is open-ended when `)` is missing.
    ///
    /// Returns `None` if not positioned at `(`.
    pub(super) fn parse_column_name_list(&mut self) -> Option<(Vec<String>, Span)> {
        let open_idx = self.state.pos();
        let open = self
            .state
            .current()
            .filter(|t| t.token_type == TokenType::ParenOpen)?
            .start();
        self.state.advance();
        let mut columns = Vec::new();

        let closed = loop {
            let Some(token) = self.state.current() else {
                break false;
            };
            match token.token_type {
                TokenType::ParenClose => {
                    self.state.advance();
                    break true;
                }
                TokenType::Comma => {
                    self.state.advance();
                }
                TokenType::Go | TokenType::Semicolon => break false,
                _ if self.state.is_statement_start()
                    || self.state.is_any_keyword(COLUMN_LIST_BREAKERS) =>
                {
                    break false
                }
                _ if is_name_token(token) => {
                    columns.push(normalize_identifier(&token.text));
                    self.state.advance();
                }
                _ => {
                    self.state.advance();
                }
            }
        };

        let span = match self.state.span_from(open_idx) {
            Some(span) if closed => span,
            _ => Span::open(open),
        };
        Some((columns, span))
    }
}
