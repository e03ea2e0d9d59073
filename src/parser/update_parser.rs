//! UPDATE statements
//!
//! ```sql
//! UPDATE [TOP (n)] target [WITH (hints)] SET ... [OUTPUT ...] [FROM ...] [WHERE ...] [OPTION (...)]
//! ```
//!
//! The target is parsed eagerly but is provisional: with an extended FROM
//! (`UPDATE o SET ... FROM Orders o`) it is only an alias of a FROM table, so it is
//! promoted into `tables` only when no FROM clause follows.

use super::base_statement::{
    create_chunk, finalize_chunk, process_from_result, record_clause, FromMergeOptions, Prelude,
};
use super::scope::ScopeContext;
use super::statement_parser::{ClauseStop, StatementParser};
use crate::model::{StatementChunk, StatementKind, TableReference};

/// Keywords that end the SET assignment list.
const SET_STOPS: &[&str] = &["FROM", "WHERE", "OUTPUT", "OPTION"];

impl<'a> StatementParser<'a> {
    pub(super) fn parse_update(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::Update;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);

        let head_start = self.state.pos();
        self.state.advance();
        self.state.skip_top_clause();
        if let Some(name) = self.parse_qualified_name() {
            self.skip_table_hints();
            chunk.update_target = Some(self.table_reference(&name, &scope));
        }
        if let Some(span) = self.state.span_from(head_start) {
            record_clause(&mut chunk, "update", span);
        }

        if self.state.is_keyword("SET") {
            if let Some(span) =
                self.parse_keyword_clause(&mut scope, 1, ClauseStop::keywords(SET_STOPS))
            {
                record_clause(&mut chunk, "set", span);
            }
        }

        self.parse_dml_tail(&mut chunk, &mut scope);
        let target = chunk.update_target.clone();
        promote_target(&mut chunk, target);
        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }

    /// OUTPUT / FROM / WHERE / OPTION trailing an UPDATE or DELETE, in any order.
    pub(super) fn parse_dml_tail(&mut self, chunk: &mut StatementChunk, scope: &mut ScopeContext) {
        loop {
            if self.state.is_keyword("OUTPUT") {
                let stop = ClauseStop::keywords(&["FROM", "WHERE", "OPTION"]);
                if let Some(span) = self.parse_keyword_clause(scope, 1, stop) {
                    record_clause(chunk, "output", span);
                }
            } else if self.state.is_keyword("FROM") {
                let result = self.parse_from(scope);
                let options = FromMergeOptions {
                    append_tables: false,
                    set_has_from: true,
                };
                process_from_result(chunk, scope, result, options);
            } else if self.state.is_keyword("WHERE") {
                let stop = ClauseStop::keywords(&["OPTION", "OUTPUT"]);
                if let Some(span) = self.parse_keyword_clause(scope, 1, stop) {
                    record_clause(chunk, "where", span);
                }
            } else if self.state.is_keyword("OPTION") {
                let start = self.state.pos();
                self.state.advance();
                self.state.skip_paren_contents();
                if let Some(span) = self.state.span_from(start) {
                    record_clause(chunk, "option", span);
                }
            } else {
                break;
            }
        }
    }
}

/// Without an explicit FROM the provisional target is the real table.
pub(super) fn promote_target(chunk: &mut StatementChunk, target: Option<TableReference>) {
    if chunk.has_from_clause {
        return;
    }
    if let Some(target) = target {
        chunk.tables.push(target);
    }
}
