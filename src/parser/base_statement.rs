//! Chunk lifecycle shared by every statement handler
//!
//! Each handler follows the same shape: allocate a chunk when its leading keyword
//! is recognized ([`create_chunk`]), fill it clause by clause, then call
//! [`finalize_chunk`] exactly once. Finalization runs in a fixed order: aliases
//! from tables, then subquery pseudo-aliases, then column parents, then the
//! parameter post-pass.

use crate::model::{ColumnInfo, CteInfo, Span, StatementChunk, TableReference};

use super::parser_state::ParserState;
use super::scope::ScopeContext;

/// Where a chunk begins and what a `WITH` prefix already contributed to it.
#[derive(Debug, Default)]
pub struct Prelude {
    /// Index of the chunk's first token (`WITH` when a CTE prefix is present)
    pub start: usize,
    pub ctes: Vec<CteInfo>,
    pub with_span: Option<Span>,
}

impl Prelude {
    pub fn at(start: usize) -> Self {
        Self {
            start,
            ..Default::default()
        }
    }
}

/// Spans of one JOIN / APPLY source inside a FROM clause.
#[derive(Debug, Clone)]
pub struct JoinSpans {
    pub join: Span,
    pub on: Option<Span>,
}

/// Everything a FROM clause contributed, before it is merged into a chunk.
#[derive(Debug, Clone, Default)]
pub struct FromClauseResult {
    pub tables: Vec<TableReference>,
    pub from: Option<Span>,
    pub joins: Vec<JoinSpans>,
}

/// How [`process_from_result`] merges into the chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FromMergeOptions {
    /// Keep existing tables (INSERT target) instead of replacing them
    pub append_tables: bool,
    /// Mark the chunk as having an explicit FROM (UPDATE/DELETE extended forms)
    pub set_has_from: bool,
}

/// Allocate a chunk for the statement beginning at `prelude.start`.
pub fn create_chunk(
    scope: &ScopeContext,
    state: &ParserState<'_>,
    prelude: Prelude,
    batch_index: usize,
) -> StatementChunk {
    let mut chunk = StatementChunk::new(scope.statement_type, batch_index);
    chunk.token_start_idx = Some(prelude.start);
    if let Some(token) = state.token(prelude.start) {
        chunk.start_line = token.line;
        chunk.start_col = token.col;
        chunk.end_line = token.line;
        chunk.end_col = token.col;
    }
    chunk.ctes = prelude.ctes;
    if let Some(span) = prelude.with_span {
        chunk.clause_positions.insert("with".to_string(), span);
    }
    chunk
}

/// Finalize a chunk: close its token range, then build aliases, merge subqueries,
/// resolve column parents and extract parameters, in that order.
pub fn finalize_chunk(chunk: &mut StatementChunk, scope: ScopeContext, state: &ParserState<'_>) {
    let start = chunk.token_start_idx.unwrap_or(0);
    let end = state
        .last_consumed()
        .filter(|&last| last >= start)
        .unwrap_or(start);
    chunk.token_end_idx = Some(end);
    if let Some(token) = state.token(end) {
        let pos = token.end();
        chunk.end_line = pos.line;
        chunk.end_col = pos.col;
    }

    for table in &chunk.tables {
        if let Some(alias) = &table.alias {
            chunk
                .aliases
                .entry(alias.to_lowercase())
                .or_insert_with(|| table.clone());
        }
    }

    for subquery in scope.subqueries.iter() {
        if let Some(alias) = &subquery.alias {
            chunk
                .aliases
                .entry(alias.to_lowercase())
                .or_insert_with(|| TableReference {
                    name: alias.clone(),
                    alias: Some(alias.clone()),
                    is_subquery: true,
                    columns: Some(subquery.projected_columns()),
                    ..Default::default()
                });
        }
    }
    chunk.subqueries.extend(scope.subqueries.iter().cloned());

    if let Some(mut columns) = chunk.columns.take() {
        for column in columns.iter_mut() {
            column.parent_table = resolve_column_parent(chunk, &scope, column);
        }
        chunk.columns = Some(columns);
    }

    chunk.parameters = state.extract_parameters(start, end);
}

/// Owning table of a column: its qualifier looked up locally then through the
/// enclosing scopes, or the single FROM source for unqualified columns.
fn resolve_column_parent(
    chunk: &StatementChunk,
    scope: &ScopeContext,
    column: &ColumnInfo,
) -> Option<String> {
    match &column.table_qualifier {
        Some(qualifier) => chunk
            .resolve_alias(qualifier)
            .or_else(|| scope.resolve_outer(qualifier))
            .map(parent_name),
        None if column.is_expression => None,
        None => {
            let subquery_sources = chunk.aliases.values().filter(|t| t.is_subquery);
            let mut sources = scope.from_tables.iter().chain(subquery_sources);
            match (sources.next(), sources.next()) {
                (Some(only), None) => Some(parent_name(only)),
                _ => None,
            }
        }
    }
}

fn parent_name(table: &TableReference) -> String {
    if table.is_subquery {
        table.visible_name().to_string()
    } else {
        table.name.clone()
    }
}

/// Merge a FROM clause into the chunk and make its tables visible to the scope.
pub fn process_from_result(
    chunk: &mut StatementChunk,
    scope: &mut ScopeContext,
    result: FromClauseResult,
    options: FromMergeOptions,
) {
    if options.append_tables {
        chunk.tables.extend(result.tables.iter().cloned());
    } else {
        chunk.tables = result.tables.clone();
    }

    if let Some(span) = result.from {
        record_clause(chunk, "from", span);
    }
    for join in result.joins {
        let n = next_clause_number(chunk, "join");
        chunk.clause_positions.insert(format!("join_{n}"), join.join);
        if let Some(on) = join.on {
            chunk.clause_positions.insert(format!("on_{n}"), on);
        }
    }

    scope.from_tables.extend(result.tables.iter().cloned());
    for table in result.tables {
        scope.add_table(table);
    }
    if options.set_has_from {
        chunk.has_from_clause = true;
    }
}

/// Insert a clause span under `key`, or under `key_N` if `key` is already taken
/// (repeated clauses across set-operation branches).
pub fn record_clause(chunk: &mut StatementChunk, key: &str, span: Span) {
    if !chunk.clause_positions.contains_key(key) {
        chunk.clause_positions.insert(key.to_string(), span);
        return;
    }
    let mut n = 2;
    while chunk.clause_positions.contains_key(&format!("{key}_{n}")) {
        n += 1;
    }
    chunk.clause_positions.insert(format!("{key}_{n}"), span);
}

/// Next free suffix for numbered clause keys (`join_1`, `when_matched_2`, ...).
///
/// Only keys of the exact form `prefix_<digits>` count, so `when_not_matched` does
/// not collide with `when_not_matched_by_source`.
pub fn next_clause_number(chunk: &StatementChunk, prefix: &str) -> usize {
    chunk
        .clause_positions
        .keys()
        .filter_map(|key| key.strip_prefix(prefix)?.strip_prefix('_'))
        .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .count()
        + 1
}
