//! DELETE statements
//!
//! Three forms, told apart by what follows the first name:
//!
//! ```sql
//! DELETE [TOP (n)] [FROM] Orders WHERE ...            -- simple
//! DELETE o FROM Orders o JOIN ... WHERE ...           -- alias target
//! DELETE Orders FROM Orders JOIN ... WHERE ...        -- table target
//! ```
//!
//! As with UPDATE, the first name is captured as `delete_target` and becomes a
//! table only when no FROM clause follows it.

use super::base_statement::{create_chunk, finalize_chunk, record_clause, Prelude};
use super::scope::ScopeContext;
use super::statement_parser::StatementParser;
use super::update_parser::promote_target;
use crate::model::{StatementChunk, StatementKind};

impl<'a> StatementParser<'a> {
    pub(super) fn parse_delete(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::Delete;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);

        let head_start = self.state.pos();
        self.state.advance();
        self.state.skip_top_clause();
        self.state.consume_keyword("FROM");
        if let Some(name) = self.parse_qualified_name() {
            self.skip_table_hints();
            chunk.delete_target = Some(self.table_reference(&name, &scope));
        }
        if let Some(span) = self.state.span_from(head_start) {
            record_clause(&mut chunk, "delete", span);
        }

        self.parse_dml_tail(&mut chunk, &mut scope);
        let target = chunk.delete_target.clone();
        promote_target(&mut chunk, target);
        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }
}
