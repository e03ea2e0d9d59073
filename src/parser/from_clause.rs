//! FROM clauses: table sources, derived tables, JOIN and APPLY
//!
//! ```sql
//! FROM dbo.Orders o WITH (NOLOCK)
//! INNER JOIN (SELECT id FROM Customers) c ON c.id = o.customer_id
//! CROSS APPLY dbo.fn_lines(o.id) AS l
//! ```

use super::base_statement::{FromClauseResult, JoinSpans};
use super::scope::ScopeContext;
use super::statement_parser::{ClauseStop, StatementParser};
use crate::model::{ColumnInfo, TableReference, TokenType};

/// Words that can begin a join operator.
const JOIN_STARTERS: &[&str] = &["JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER"];

/// Physical join hints between the join type and JOIN.
const JOIN_HINTS: &[&str] = &["LOOP", "HASH", "MERGE", "REMOTE"];

/// Keywords that end an ON condition.
const ON_CLAUSE_STOPS: &[&str] = &[
    "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "OUTER", "WHERE", "GROUP", "HAVING",
    "ORDER", "OPTION", "FOR", "OUTPUT", "WHEN", "OFFSET", "FETCH", "LIMIT",
];

impl<'a> StatementParser<'a> {
    /// Parse `FROM source [, source | join source [ON cond]]...`.
    ///
    /// Positioned at FROM. Derived tables are registered into `scope` directly;
    /// named sources are returned for [`process_from_result`].
    ///
    /// [`process_from_result`]: super::base_statement::process_from_result
    pub(super) fn parse_from(&mut self, scope: &mut ScopeContext) -> FromClauseResult {
        let from_start = self.state.pos();
        self.state.advance();

        let mut result = FromClauseResult::default();
        if let Some(table) = self.parse_table_source(scope) {
            result.tables.push(table);
        }

        loop {
            if self.state.is_type(TokenType::Comma) {
                self.state.advance();
                if let Some(table) = self.parse_table_source(scope) {
                    result.tables.push(table);
                }
                continue;
            }

            if !self.at_join() {
                break;
            }
            let join_start = self.state.pos();
            let Some(is_apply) = self.consume_join_operator() else {
                break;
            };
            if let Some(table) = self.parse_table_source(scope) {
                result.tables.push(table);
            }
            let Some(join) = self.state.span_from(join_start) else {
                break;
            };

            let on = if !is_apply && self.state.is_keyword("ON") {
                self.parse_keyword_clause(scope, 1, ClauseStop::keywords(ON_CLAUSE_STOPS))
            } else {
                None
            };
            result.joins.push(JoinSpans { join, on });
        }

        result.from = self.state.span_from(from_start);
        result
    }

    fn at_join(&self) -> bool {
        self.state
            .current()
            .is_some_and(|t| t.token_type == TokenType::Keyword)
            && self.state.is_any_keyword(JOIN_STARTERS)
    }

    /// Consume a join operator. Returns `Some(true)` for APPLY, `Some(false)` for
    /// JOIN, `None` if the operator is incomplete.
    fn consume_join_operator(&mut self) -> Option<bool> {
        if self.state.is_any_keyword(&["CROSS", "OUTER"]) && self.state.peek_is_keyword(1, "APPLY")
        {
            self.state.advance();
            self.state.advance();
            return Some(true);
        }
        if self.state.is_any_keyword(&["INNER", "LEFT", "RIGHT", "FULL", "CROSS"]) {
            self.state.advance();
        }
        self.state.consume_keyword("OUTER");
        if self.state.is_any_keyword(JOIN_HINTS) {
            self.state.advance();
        }
        self.state.consume_keyword("JOIN").then_some(false)
    }

    /// One table source: a derived table, a parenthesized source, a table variable,
    /// or a (possibly qualified) table / table-valued function, with its alias.
    ///
    /// Derived tables are added to `scope` and yield `None`.
    pub(super) fn parse_table_source(&mut self, scope: &mut ScopeContext) -> Option<TableReference> {
        if self.is_subquery_start() {
            let mut subquery = self.parse_subquery(scope);
            subquery.alias = self.parse_optional_alias();
            if let Some(names) = self.parse_name_list() {
                rename_projection(&mut subquery.columns, names);
            }
            scope.add_subquery(subquery);
            self.skip_pivot();
            return None;
        }

        if self.state.is_type(TokenType::ParenOpen) {
            // (VALUES ...) or a parenthesized join
            self.state.skip_paren_contents();
            self.parse_optional_alias();
            self.parse_name_list();
            self.skip_pivot();
            return None;
        }

        let name = self.parse_qualified_name()?;
        if self.state.is_type(TokenType::ParenOpen) {
            // Table-valued function arguments, or a legacy `t (NOLOCK)` hint
            self.state.skip_paren_contents();
        }
        self.skip_table_hints();
        let alias = self.parse_optional_alias();
        if alias.is_some() {
            self.parse_name_list();
        }
        self.skip_table_hints();
        self.skip_pivot();

        let mut table = self.table_reference(&name, scope);
        table.alias = alias;
        Some(table)
    }

    /// `PIVOT (...) [AS] alias` / `UNPIVOT (...) [AS] alias`
    fn skip_pivot(&mut self) {
        while self.state.is_any_keyword(&["PIVOT", "UNPIVOT"]) {
            self.state.advance();
            self.state.skip_paren_contents();
            self.parse_optional_alias();
        }
    }
}

/// Apply a derived table's column alias list (`AS s(a, b)`) to its projection.
fn rename_projection(columns: &mut Option<Vec<ColumnInfo>>, names: Vec<String>) {
    let Some(columns) = columns.as_mut() else {
        return;
    };
    for (column, name) in columns.iter_mut().filter(|c| !c.is_star).zip(names) {
        column.alias = Some(name);
    }
}
