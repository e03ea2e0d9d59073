//! MERGE statements
//!
//! ```sql
//! MERGE [TOP (n)] [INTO] target [AS t]
//! USING source [AS s] ON condition
//! WHEN MATCHED [AND cond] THEN UPDATE SET ...
//! WHEN NOT MATCHED [BY TARGET] [AND cond] THEN INSERT (...) VALUES (...)
//! WHEN NOT MATCHED BY SOURCE [AND cond] THEN DELETE
//! [OUTPUT ...] [OPTION (...)];
//! ```
//!
//! Every WHEN clause and action gets its own numbered span (`when_matched_1`,
//! `merge_set_1`, `merge_insert_cols_2`, ...). Inside the body UPDATE, DELETE and
//! INSERT are actions, so only [`MERGE_STATEMENT_BREAKERS`] end a clause early.

use tracing::trace;

use super::base_statement::{
    create_chunk, finalize_chunk, next_clause_number, record_clause, Prelude,
};
use super::keywords::MERGE_STATEMENT_BREAKERS;
use super::scope::ScopeContext;
use super::statement_parser::{ClauseStop, StatementParser};
use crate::model::{Span, StatementChunk, StatementKind};

/// ON condition and WHEN action bodies.
const BODY_STOP: ClauseStop<'static> =
    ClauseStop::keywords(&["WHEN", "OUTPUT", "OPTION"]).with_breakers(MERGE_STATEMENT_BREAKERS);

const CONDITION_STOP: ClauseStop<'static> =
    ClauseStop::keywords(&["THEN", "WHEN"]).with_breakers(MERGE_STATEMENT_BREAKERS);

const OUTPUT_STOP: ClauseStop<'static> =
    ClauseStop::keywords(&["OPTION", "WHEN"]).with_breakers(MERGE_STATEMENT_BREAKERS);

impl<'a> StatementParser<'a> {
    pub(super) fn parse_merge(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::Merge;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);

        let head_start = self.state.pos();
        self.state.advance();
        self.state.skip_top_clause();
        self.state.consume_keyword("INTO");
        if let Some(target) = self.parse_table_source(&mut scope) {
            scope.add_table(target.clone());
            chunk.tables.push(target);
        }
        if let Some(span) = self.state.span_from(head_start) {
            record_clause(&mut chunk, "merge_into", span);
        }

        if self.state.is_keyword("USING") {
            let start = self.state.pos();
            self.state.advance();
            if let Some(source) = self.parse_table_source(&mut scope) {
                scope.add_table(source.clone());
                chunk.tables.push(source);
            }
            if let Some(span) = self.state.span_from(start) {
                record_clause(&mut chunk, "using", span);
            }
        }

        if self.state.is_keyword("ON") {
            if let Some(span) = self.parse_keyword_clause(&mut scope, 1, BODY_STOP) {
                record_clause(&mut chunk, "merge_on", span);
            }
        }

        while self.state.is_keyword("WHEN") {
            self.parse_when_clause(&mut chunk, &mut scope);
        }

        if self.state.is_keyword("OUTPUT") {
            if let Some(span) = self.parse_keyword_clause(&mut scope, 1, OUTPUT_STOP) {
                record_clause(&mut chunk, "output", span);
            }
        }
        if self.state.is_keyword("OPTION") {
            let start = self.state.pos();
            self.state.advance();
            self.state.skip_paren_contents();
            if let Some(span) = self.state.span_from(start) {
                record_clause(&mut chunk, "option", span);
            }
        }

        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }

    /// `WHEN [NOT] MATCHED [BY SOURCE | BY TARGET] [AND cond] THEN action`
    fn parse_when_clause(&mut self, chunk: &mut StatementChunk, scope: &mut ScopeContext) {
        let when_start = self.state.pos();
        self.state.advance();

        let key = if self.state.consume_keyword("NOT") {
            self.state.consume_keyword("MATCHED");
            if self.state.consume_keyword("BY") && self.state.consume_keyword("SOURCE") {
                "when_not_matched_by_source"
            } else {
                // BY TARGET is the default form
                self.state.consume_keyword("TARGET");
                "when_not_matched"
            }
        } else {
            self.state.consume_keyword("MATCHED");
            "when_matched"
        };

        if self.state.is_keyword("AND") {
            self.consume_clause_body(scope, CONDITION_STOP);
        }
        if self.state.consume_keyword("THEN") {
            self.parse_merge_action(chunk, scope);
        }

        let n = next_clause_number(chunk, key);
        if let Some(span) = self.state.span_from(when_start) {
            chunk.clause_positions.insert(format!("{key}_{n}"), span);
        }
        trace!(clause = key, n, "Parsed WHEN clause");
    }

    /// `UPDATE SET ...` | `DELETE` | `INSERT [(cols)] VALUES (...)` | `INSERT DEFAULT VALUES`
    fn parse_merge_action(&mut self, chunk: &mut StatementChunk, scope: &mut ScopeContext) {
        if self.state.is_keyword("UPDATE") {
            let n = next_clause_number(chunk, "merge_set");
            let keyword_count = if self.state.peek_is_keyword(1, "SET") { 2 } else { 1 };
            if let Some(span) = self.parse_keyword_clause(scope, keyword_count, BODY_STOP) {
                insert_numbered(chunk, "merge_set", n, span);
            }
        } else if self.state.is_keyword("DELETE") {
            let n = next_clause_number(chunk, "merge_delete");
            let start = self.state.pos();
            self.state.advance();
            if let Some(span) = self.state.span_from(start) {
                insert_numbered(chunk, "merge_delete", n, span);
            }
        } else if self.state.is_keyword("INSERT") {
            self.state.advance();
            if let Some((columns, span)) = self.parse_column_name_list() {
                let n = next_clause_number(chunk, "merge_insert_cols");
                insert_numbered(chunk, "merge_insert_cols", n, span);
                if chunk.insert_columns.is_none() {
                    chunk.insert_columns = Some(columns);
                }
            }
            if self.state.is_keyword("VALUES") {
                let n = next_clause_number(chunk, "merge_values");
                if let Some(span) = self.parse_keyword_clause(scope, 1, BODY_STOP) {
                    insert_numbered(chunk, "merge_values", n, span);
                }
            } else if self.state.is_keyword("DEFAULT") && self.state.peek_is_keyword(1, "VALUES") {
                let n = next_clause_number(chunk, "merge_values");
                let start = self.state.pos();
                self.state.advance();
                self.state.advance();
                if let Some(span) = self.state.span_from(start) {
                    insert_numbered(chunk, "merge_values", n, span);
                }
            }
        }
    }
}

fn insert_numbered(chunk: &mut StatementChunk, prefix: &str, n: usize, span: Span) {
    chunk.clause_positions.insert(format!("{prefix}_{n}"), span);
}
