//! SELECT statements
//!
//! select-list, optional `INTO #temp`, optional FROM, then one pass over the
//! remaining top-level clauses. `UNION`/`INTERSECT`/`EXCEPT` branches continue the
//! same chunk.

use tracing::debug;

use super::base_statement::{
    create_chunk, finalize_chunk, next_clause_number, process_from_result, record_clause,
    FromMergeOptions, Prelude,
};
use super::identifier_utils::{alias_text, is_alias_token, is_name_token, normalize_identifier};
use super::scope::ScopeContext;
use super::statement_parser::{join_tokens, ClauseStop, StatementParser};
use crate::model::{
    ColumnDef, ColumnInfo, StatementChunk, StatementKind, TempTableInfo, Token, TokenType,
};

/// Keywords that end the select-list.
const SELECT_LIST_TERMINATORS: &[&str] = &[
    "FROM", "INTO", "WHERE", "GROUP", "HAVING", "ORDER", "OPTION", "FOR", "OFFSET", "FETCH",
    "LIMIT", "WINDOW",
];

/// Keywords that end a clause body inside a SELECT.
const SELECT_CLAUSE_STOPS: &[&str] = &[
    "WHERE", "GROUP", "HAVING", "ORDER", "OFFSET", "FETCH", "LIMIT", "FOR", "OPTION", "WINDOW",
];

/// What the select body contributes to its chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SelectMode {
    /// A standalone SELECT: may carry `INTO`, owns its FROM tables
    Statement,
    /// The SELECT of `INSERT ... SELECT`: keeps the INSERT target
    InsertSource,
    /// A set-operation branch: appends tables, keeps the first branch's columns
    Branch,
}

impl<'a> StatementParser<'a> {
    pub(super) fn parse_select(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::Select;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
        self.parse_select_body(&mut chunk, &mut scope, SelectMode::Statement);
        self.parse_set_operations(&mut chunk, &mut scope);
        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }

    /// `SELECT [ALL | DISTINCT] [TOP ...] list [INTO t] [FROM ...] clauses...`
    pub(super) fn parse_select_body(
        &mut self,
        chunk: &mut StatementChunk,
        scope: &mut ScopeContext,
        mode: SelectMode,
    ) {
        let select_start = self.state.pos();
        if !self.state.consume_keyword("SELECT") {
            return;
        }
        if !self.state.consume_keyword("DISTINCT") {
            self.state.consume_keyword("ALL");
        }
        self.state.skip_top_clause();

        let columns = self.parse_select_list(scope);
        if let Some(span) = self.state.span_from(select_start) {
            record_clause(chunk, "select", span);
        }
        let projected: Vec<String> = columns
            .iter()
            .filter_map(|c| c.output_name().map(str::to_string))
            .collect();
        if chunk.columns.is_none() {
            chunk.columns = Some(columns);
        }

        if self.state.is_keyword("INTO") && mode == SelectMode::Statement {
            self.parse_select_into(chunk, projected);
        }

        if self.state.is_keyword("FROM") {
            let result = self.parse_from(scope);
            let options = FromMergeOptions {
                append_tables: mode != SelectMode::Statement,
                set_has_from: false,
            };
            process_from_result(chunk, scope, result, options);
        }

        self.parse_select_clauses(chunk, scope);
    }

    /// Items separated by top-level commas, up to a clause keyword.
    fn parse_select_list(&mut self, scope: &mut ScopeContext) -> Vec<ColumnInfo> {
        let mut columns = Vec::new();
        loop {
            let item_start = self.state.pos();
            let mut depth = 0usize;
            let mut case_depth = 0usize;
            while let Some(token) = self.state.current() {
                match token.token_type {
                    TokenType::Go | TokenType::Semicolon => break,
                    TokenType::Comma if depth == 0 => break,
                    TokenType::ParenOpen if self.is_subquery_start() => {
                        let subquery = self.parse_subquery(scope);
                        scope.add_subquery(subquery);
                        continue;
                    }
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
                        } else if self.state.is_any_keyword(SELECT_LIST_TERMINATORS)
                            || self.state.is_statement_start()
                            || self.is_set_operator()
                            || (case_depth == 0 && self.state.is_block_end())
                        {
                            break;
                        }
                    }
                    _ => {}
                }
                self.state.advance();
            }

            if let Some(end) = self.state.last_consumed().filter(|&e| e >= item_start) {
                if let Some(column) = self.column_from_item(item_start, end) {
                    columns.push(column);
                }
            }

            if self.state.is_type(TokenType::Comma) {
                self.state.advance();
            } else {
                break;
            }
        }
        columns
    }

    fn column_from_item(&self, start: usize, end: usize) -> Option<ColumnInfo> {
        let tokens: Vec<&Token> = self.state.tokens()[start..=end]
            .iter()
            .filter(|t| !t.is_comment())
            .collect();
        let (expr, alias) = split_alias(&tokens);
        let first = expr.first().or(tokens.first())?;

        let mut column = ColumnInfo {
            name: String::new(),
            table_qualifier: None,
            alias,
            parent_table: None,
            is_star: false,
            is_expression: false,
            line: first.line,
            col: first.col,
        };
        match column_reference(expr) {
            Some((qualifier, name, is_star)) => {
                column.table_qualifier = qualifier;
                column.name = name;
                column.is_star = is_star;
            }
            None => {
                column.name = join_tokens(expr.iter().copied());
                column.is_expression = true;
            }
        }
        Some(column)
    }

    /// `INTO #temp`: the projected columns become the temp table's schema.
    fn parse_select_into(&mut self, chunk: &mut StatementChunk, projected: Vec<String>) {
        let into_start = self.state.pos();
        self.state.advance();
        if let Some(name) = self.parse_qualified_name() {
            let table = name.name().to_string();
            if table.starts_with('#') {
                let mut info = TempTableInfo::temp_table(&table, self.batch_index, chunk.start_line);
                info.columns = projected
                    .into_iter()
                    .map(|column| ColumnDef::new(column, ""))
                    .collect();
                chunk.is_global_temp = info.is_global;
                chunk.temp_table_name = Some(table.clone());
                debug!(
                    name = %table,
                    columns = info.columns.len(),
                    batch = self.batch_index,
                    "Registered temp table from SELECT INTO"
                );
                self.temp_tables.register(info);
            }
        }
        if let Some(span) = self.state.span_from(into_start) {
            record_clause(chunk, "into", span);
        }
    }

    /// WHERE / GROUP BY / HAVING / ORDER BY / OFFSET / FETCH / LIMIT / FOR / OPTION.
    fn parse_select_clauses(&mut self, chunk: &mut StatementChunk, scope: &mut ScopeContext) {
        let stop = ClauseStop::keywords(SELECT_CLAUSE_STOPS);
        while let Some(token) = self.state.current() {
            if matches!(
                token.token_type,
                TokenType::Go | TokenType::Semicolon | TokenType::ParenClose
            ) || self.is_set_operator()
                || self.state.is_statement_start()
                || self.state.is_block_end()
            {
                break;
            }

            let (key, keyword_count) = if token.is_word("WHERE") {
                ("where", 1)
            } else if token.is_word("GROUP") || token.is_word("ORDER") {
                if !self.state.peek_is_keyword(1, "BY") {
                    return;
                }
                (if token.is_word("GROUP") { "group_by" } else { "order_by" }, 2)
            } else if token.is_word("HAVING") {
                ("having", 1)
            } else if token.is_word("OFFSET") {
                ("offset", 1)
            } else if token.is_word("FETCH") {
                ("fetch", 1)
            } else if token.is_word("LIMIT") {
                ("limit", 1)
            } else if token.is_word("FOR") {
                ("for", 1)
            } else if token.is_word("WINDOW") {
                ("window", 1)
            } else if token.is_word("OPTION") {
                let start = self.state.pos();
                self.state.advance();
                self.state.skip_paren_contents();
                if let Some(span) = self.state.span_from(start) {
                    record_clause(chunk, "option", span);
                }
                continue;
            } else if token.is_word("WITH") {
                // Table hint trailing the FROM clause
                self.state.advance();
                self.state.skip_paren_contents();
                continue;
            } else {
                self.state.advance();
                continue;
            };

            if let Some(span) = self.parse_keyword_clause(scope, keyword_count, stop) {
                record_clause(chunk, key, span);
            }
        }
    }

    /// `UNION [ALL] | INTERSECT | EXCEPT` followed by another SELECT branch.
    pub(super) fn parse_set_operations(
        &mut self,
        chunk: &mut StatementChunk,
        scope: &mut ScopeContext,
    ) {
        while self.is_set_operator() {
            let start = self.state.pos();
            self.state.advance();
            self.state.consume_keyword("ALL");
            let n = next_clause_number(chunk, "set_op");
            if let Some(span) = self.state.span_from(start) {
                chunk.clause_positions.insert(format!("set_op_{n}"), span);
            }

            if self.state.is_keyword("SELECT") {
                self.parse_select_body(chunk, scope, SelectMode::Branch);
            } else if self.is_subquery_start() {
                let branch = self.parse_subquery(scope);
                scope.add_subquery(branch);
            } else {
                break;
            }
        }
    }
}

/// Split a select item into its expression and output alias.
///
/// Handles `expr AS alias`, `expr alias` and `alias = expr`; `@var = expr` is an
/// assignment, not an alias.
fn split_alias<'t>(tokens: &'t [&'t Token]) -> (&'t [&'t Token], Option<String>) {
    let len = tokens.len();

    if len >= 3 && tokens[1].token_type == TokenType::Operator && tokens[1].text == "=" {
        return match tokens[0].token_type {
            TokenType::Identifier | TokenType::BracketId | TokenType::String => {
                (&tokens[2..], Some(alias_text(tokens[0])))
            }
            TokenType::Variable => (&tokens[2..], None),
            _ => (tokens, None),
        };
    }

    if len >= 2 && tokens[len - 1].is_word("AS") {
        return (&tokens[..len - 1], None);
    }

    if len >= 3 && tokens[len - 2].is_word("AS") && is_alias_token(tokens[len - 1], true) {
        return (&tokens[..len - 2], Some(alias_text(tokens[len - 1])));
    }

    if len >= 2
        && is_alias_token(tokens[len - 1], false)
        && allows_implicit_alias(tokens[len - 2])
    {
        return (&tokens[..len - 1], Some(alias_text(tokens[len - 1])));
    }

    (tokens, None)
}

/// Whether `token` can end an expression that is followed by a bare alias.
fn allows_implicit_alias(token: &Token) -> bool {
    match token.token_type {
        TokenType::Identifier
        | TokenType::BracketId
        | TokenType::ParenClose
        | TokenType::Number
        | TokenType::String
        | TokenType::Variable
        | TokenType::GlobalVariable
        | TokenType::TempTable => true,
        TokenType::Keyword => token.is_word("END") || is_name_token(token),
        _ => false,
    }
}

/// `name`, `q.name`, `db.s.t.name`, `*`, or `q.*` as `(qualifier, name, is_star)`.
fn column_reference(expr: &[&Token]) -> Option<(Option<String>, String, bool)> {
    if expr.len() == 1 && expr[0].token_type == TokenType::Star {
        return Some((None, "*".to_string(), true));
    }
    if expr.is_empty() || expr.len() % 2 == 0 {
        return None;
    }

    let last = expr.len() - 1;
    for (i, token) in expr.iter().enumerate() {
        let ok = if i % 2 == 1 {
            token.token_type == TokenType::Dot
        } else if i == last && i > 0 {
            token.token_type == TokenType::Star
                || (is_name_token(token) && token.token_type != TokenType::Variable)
        } else {
            is_name_token(token) && token.token_type != TokenType::Variable
        };
        if !ok {
            return None;
        }
    }

    let is_star = expr[last].token_type == TokenType::Star;
    let name = if is_star {
        "*".to_string()
    } else {
        normalize_identifier(&expr[last].text)
    };
    let qualifier = (last >= 2).then(|| normalize_identifier(&expr[last - 2].text));
    Some((qualifier, name, is_star))
}
