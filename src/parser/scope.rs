//! Per-statement visibility scope
//!
//! A `ScopeContext` collects the tables and subqueries a statement (or a nested
//! subquery) makes visible while it is being parsed. It is created fresh for each
//! statement, handed down as a child scope into subqueries, and discarded once
//! its contents have been copied into the owning chunk.

use std::collections::BTreeMap;

use crate::model::{StatementChunk, StatementKind, TableReference};

/// Tables, subqueries and CTE names visible to one statement or subquery.
#[derive(Debug, Clone)]
pub struct ScopeContext {
    pub statement_type: StatementKind,
    pub tables: Vec<TableReference>,
    /// Tables contributed by FROM / JOIN sources, the only candidates for
    /// unqualified columns
    pub from_tables: Vec<TableReference>,
    pub subqueries: Vec<StatementChunk>,
    /// Lowercase CTE name -> column names
    known_ctes: BTreeMap<String, Vec<String>>,
    /// Tables of enclosing scopes, innermost first (for correlated references)
    outer_tables: Vec<TableReference>,
}

impl ScopeContext {
    pub fn new(statement_type: StatementKind) -> Self {
        Self {
            statement_type,
            tables: Vec::new(),
            from_tables: Vec::new(),
            subqueries: Vec::new(),
            known_ctes: BTreeMap::new(),
            outer_tables: Vec::new(),
        }
    }

    /// A nested scope for a subquery: inherits known CTEs and sees this scope's tables
    /// as outer tables.
    pub fn child(&self, statement_type: StatementKind) -> Self {
        let mut outer_tables = self.tables.clone();
        outer_tables.extend(self.outer_tables.iter().cloned());
        Self {
            statement_type,
            tables: Vec::new(),
            from_tables: Vec::new(),
            subqueries: Vec::new(),
            known_ctes: self.known_ctes.clone(),
            outer_tables,
        }
    }

    pub fn add_table(&mut self, table: TableReference) {
        self.tables.push(table);
    }

    pub fn add_subquery(&mut self, chunk: StatementChunk) {
        self.subqueries.push(chunk);
    }

    pub fn add_cte(&mut self, name: &str, columns: Vec<String>) {
        self.known_ctes.insert(name.to_lowercase(), columns);
    }

    pub fn cte_columns(&self, name: &str) -> Option<&[String]> {
        self.known_ctes
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
    }

    /// Find a table of an enclosing scope by alias or unaliased name.
    pub fn resolve_outer(&self, qualifier: &str) -> Option<&TableReference> {
        self.outer_tables.iter().find(|t| {
            t.visible_name().eq_ignore_ascii_case(qualifier)
                || t.name.eq_ignore_ascii_case(qualifier)
        })
    }
}
