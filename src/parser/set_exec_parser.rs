//! SET and EXEC statements
//!
//! SET bodies are opaque apart from any `(SELECT ...)` they contain. EXEC captures
//! the (possibly qualified) procedure name; its arguments are consumed to the end
//! of the statement so the parameter post-pass still sees them.

use super::base_statement::{create_chunk, finalize_chunk, record_clause, Prelude};
use super::scope::ScopeContext;
use super::statement_parser::{ClauseStop, StatementParser};
use crate::model::{StatementChunk, StatementKind, TokenType};

impl<'a> StatementParser<'a> {
    pub(super) fn parse_set(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::Set;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);

        if let Some(span) = self.parse_keyword_clause(&mut scope, 1, ClauseStop::keywords(&[])) {
            record_clause(&mut chunk, "set", span);
        }

        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }

    /// `EXEC[UTE] [@ret =] proc args`, `EXEC ('dynamic sql')`, or a bare system
    /// procedure call.
    pub(super) fn parse_exec(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::Exec;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);

        let head_start = self.state.pos();
        if self.state.is_any_keyword(&["EXEC", "EXECUTE"]) {
            self.state.advance();
        }
        if self.state.is_type(TokenType::ParenOpen) {
            self.state.skip_paren_contents();
        } else {
            chunk.exec_procedure = self.parse_exec_target();
        }
        if let Some(span) = self.state.span_from(head_start) {
            record_clause(&mut chunk, "exec", span);
        }

        let args_start = self.state.pos();
        self.state.consume_until_statement_end(0);
        if self.state.pos() > args_start {
            if let Some(span) = self.state.span_from(args_start) {
                record_clause(&mut chunk, "exec_args", span);
            }
        }

        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }

    /// Procedure name after EXEC, skipping a `@ret =` return-value capture.
    pub(super) fn parse_exec_target(&mut self) -> Option<String> {
        if self.state.is_type(TokenType::Variable)
            && self
                .state
                .peek(1)
                .is_some_and(|t| t.token_type == TokenType::Operator && t.text == "=")
        {
            self.state.advance();
            self.state.advance();
        }
        self.parse_qualified_name().map(|name| name.joined())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::StatementKind;
    use crate::parser::parse;

    #[test]
    fn test_exec_captures_qualified_procedure() {
        let result = parse("EXEC @rc = dbo.usp_Load @id = 5, @name = N'x'");
        let chunk = &result.chunks[0];
        assert_eq!(chunk.statement_type, StatementKind::Exec);
        assert_eq!(chunk.exec_procedure.as_deref(), Some("dbo.usp_Load"));
        assert!(chunk.clause_positions.contains_key("exec_args"));
        let names: Vec<&str> = chunk.parameters.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["@rc", "@id", "@name"]);
    }

    #[test]
    fn test_bare_system_procedure() {
        let result = parse("sp_helptext 'dbo.v'");
        assert_eq!(result.chunks[0].statement_type, StatementKind::Exec);
        assert_eq!(result.chunks[0].exec_procedure.as_deref(), Some("sp_helptext"));
    }

    #[test]
    fn test_dynamic_exec_has_no_procedure() {
        let result = parse("EXEC ('SELECT 1')");
        assert_eq!(result.chunks[0].exec_procedure, None);
        assert!(!result.chunks[0].clause_positions.contains_key("exec_args"));
    }

    #[test]
    fn test_set_registers_subqueries() {
        let result = parse("SET @n = (SELECT COUNT(*) FROM Orders o WHERE o.status = 1)");
        let chunk = &result.chunks[0];
        assert_eq!(chunk.statement_type, StatementKind::Set);
        assert_eq!(chunk.subqueries.len(), 1);
        assert_eq!(chunk.subqueries[0].tables[0].name, "Orders");
        assert!(chunk.clause_positions.contains_key("set"));
    }
}
