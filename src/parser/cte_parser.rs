//! Common table expressions
//!
//! ```sql
//! WITH a (x, y) AS (SELECT ...), b AS (SELECT ... FROM a)
//! SELECT ... FROM b
//! ```
//!
//! The CTE list becomes the prelude of the statement that follows it: that
//! statement's chunk starts at `WITH`, carries the CTEs and a `with` span, and its
//! scope knows every CTE name. A CTE is visible inside its own body, so recursive
//! references resolve too.

use tracing::debug;

use super::base_statement::{create_chunk, finalize_chunk, Prelude};
use super::identifier_utils::{is_name_token, normalize_identifier};
use super::scope::ScopeContext;
use super::statement_parser::{LeadingKeyword, StatementParser};
use crate::model::{CteInfo, Span, StatementChunk, StatementKind, TokenType};

impl<'a> StatementParser<'a> {
    /// Positioned at `WITH`; `start` is its token index.
    pub(super) fn parse_with_statement(&mut self, start: usize) -> StatementChunk {
        let mut scope = ScopeContext::new(StatementKind::Select);
        let (ctes, with_span) = self.parse_cte_list(&mut scope);
        let prelude = Prelude {
            start,
            ctes,
            with_span,
        };

        match self.state.current().and_then(LeadingKeyword::from_token) {
            Some(leading) if leading.accepts_cte_prefix() => self.dispatch(leading, scope, prelude),
            _ => {
                // CTE list still being typed, or followed by nothing usable
                let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
                finalize_chunk(&mut chunk, scope, &self.state);
                chunk
            }
        }
    }

    fn parse_cte_list(&mut self, scope: &mut ScopeContext) -> (Vec<CteInfo>, Option<Span>) {
        let with_idx = self.state.pos();
        self.state.advance();

        if self.state.is_keyword("XMLNAMESPACES") {
            self.state.advance();
            self.state.skip_paren_contents();
            if self.state.is_type(TokenType::Comma) {
                self.state.advance();
            }
        }

        let mut ctes = Vec::new();
        while let Some(token) = self.state.current().filter(|t| is_name_token(t)) {
            let name_idx = self.state.pos();
            self.state.advance();
            let name = normalize_identifier(&token.text);
            let explicit = self.parse_name_list();
            scope.add_cte(&name, explicit.clone().unwrap_or_default());

            let mut query = None;
            if self.state.consume_keyword("AS") {
                if self.is_subquery_start() {
                    query = Some(self.parse_subquery(scope));
                } else {
                    self.state.skip_paren_contents();
                }
            }

            let columns = explicit
                .or_else(|| query.as_ref().map(StatementChunk::projected_columns))
                .unwrap_or_default();
            scope.add_cte(&name, columns.clone());
            debug!(name = %name, columns = columns.len(), "Parsed CTE");

            if let Some(span) = self.state.span_from(name_idx) {
                ctes.push(CteInfo {
                    name,
                    columns,
                    query: query.map(Box::new),
                    span,
                });
            }

            if !self.state.is_type(TokenType::Comma) {
                break;
            }
            self.state.advance();
        }

        (ctes, self.state.span_from(with_idx))
    }
}
