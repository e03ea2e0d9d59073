//! Statement chunks: the structured, partial-tolerant record of one parsed statement

use std::collections::BTreeMap;

use serde::Serialize;

/// A 1-indexed line/column position. Ordered lexicographically (line, then column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    #[inline]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// Source range of a clause. `end` is inclusive of the last covered character.
///
/// An open-ended span (`end == None`) represents a construct that is still being
/// typed, e.g. an INSERT column list whose closing paren has not been written yet.
/// It contains every position at or after its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Option<Position>,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self {
            start,
            end: Some(end.max(start)),
        }
    }

    pub fn open(start: Position) -> Self {
        Self { start, end: None }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos >= self.start && self.end.map_or(true, |end| pos <= end)
    }
}

/// Closed set of statement kinds a chunk can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Set,
    Exec,
    CreateTable,
    CreateView,
    CreateProcedure,
    CreateFunction,
    CreateTrigger,
    CreateIndex,
    Create,
    AlterTable,
    Alter,
    DropTable,
    Drop,
    Declare,
    Truncate,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Merge => "MERGE",
            StatementKind::Set => "SET",
            StatementKind::Exec => "EXEC",
            StatementKind::CreateTable => "CREATE TABLE",
            StatementKind::CreateView => "CREATE VIEW",
            StatementKind::CreateProcedure => "CREATE PROCEDURE",
            StatementKind::CreateFunction => "CREATE FUNCTION",
            StatementKind::CreateTrigger => "CREATE TRIGGER",
            StatementKind::CreateIndex => "CREATE INDEX",
            StatementKind::Create => "CREATE",
            StatementKind::AlterTable => "ALTER TABLE",
            StatementKind::Alter => "ALTER",
            StatementKind::DropTable => "DROP TABLE",
            StatementKind::Drop => "DROP",
            StatementKind::Declare => "DECLARE",
            StatementKind::Truncate => "TRUNCATE",
        }
    }
}

/// A table source visible in a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableReference {
    /// Unbracketed object name (`#name`/`@name` keep their prefix)
    pub name: String,
    pub schema: Option<String>,
    pub database: Option<String>,
    pub alias: Option<String>,
    pub is_subquery: bool,
    /// Known column names (subquery projections, CTE columns, temp-table columns)
    pub columns: Option<Vec<String>>,
}

impl TableReference {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The key this reference is visible under: its alias if it has one, else its name.
    pub fn visible_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A projected or referenced column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    /// Column name, or the expression text for unaliased expressions
    pub name: String,
    /// Qualifier as written (`a` in `a.x`), unbracketed
    pub table_qualifier: Option<String>,
    /// Output alias (`x AS y`, `y = x`)
    pub alias: Option<String>,
    /// Resolved owning table (table name, or subquery alias)
    pub parent_table: Option<String>,
    pub is_star: bool,
    pub is_expression: bool,
    pub line: usize,
    pub col: usize,
}

impl ColumnInfo {
    /// Name this column is projected as, `None` for `*` projections.
    pub fn output_name(&self) -> Option<&str> {
        if self.is_star {
            return None;
        }
        Some(self.alias.as_deref().unwrap_or(&self.name))
    }
}

/// A common table expression defined by a `WITH` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CteInfo {
    pub name: String,
    /// Explicit column list, or the body's projected names
    pub columns: Vec<String>,
    pub query: Option<Box<StatementChunk>>,
    pub span: Span,
}

/// A `@variable` / `@@global` referenced by a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterInfo {
    /// Name without the `@`/`@@` prefix
    pub name: String,
    /// Name as written, including the prefix
    pub full_name: String,
    pub is_system: bool,
    pub line: usize,
    pub col: usize,
}

/// The structured record of one parsed statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementChunk {
    pub statement_type: StatementKind,
    pub tables: Vec<TableReference>,
    /// Lowercase alias -> table (or subquery pseudo-table)
    pub aliases: BTreeMap<String, TableReference>,
    pub columns: Option<Vec<ColumnInfo>>,
    pub subqueries: Vec<StatementChunk>,
    pub ctes: Vec<CteInfo>,
    pub parameters: Vec<ParameterInfo>,
    pub temp_table_name: Option<String>,
    pub is_global_temp: bool,
    pub insert_columns: Option<Vec<String>>,
    pub clause_positions: BTreeMap<String, Span>,
    pub go_batch_index: usize,
    pub token_start_idx: Option<usize>,
    pub token_end_idx: Option<usize>,
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
    /// Alias given to this chunk when it is a derived table / subquery
    pub alias: Option<String>,
    pub update_target: Option<TableReference>,
    pub delete_target: Option<TableReference>,
    pub has_from_clause: bool,
    pub exec_procedure: Option<String>,
    pub ddl_object_name: Option<String>,
    pub ddl_object_schema: Option<String>,
    pub ddl_object_type: Option<String>,
}

impl StatementChunk {
    pub fn new(statement_type: StatementKind, go_batch_index: usize) -> Self {
        Self {
            statement_type,
            tables: Vec::new(),
            aliases: BTreeMap::new(),
            columns: None,
            subqueries: Vec::new(),
            ctes: Vec::new(),
            parameters: Vec::new(),
            temp_table_name: None,
            is_global_temp: false,
            insert_columns: None,
            clause_positions: BTreeMap::new(),
            go_batch_index,
            token_start_idx: None,
            token_end_idx: None,
            start_line: 0,
            start_col: 0,
            end_line: 0,
            end_col: 0,
            alias: None,
            update_target: None,
            delete_target: None,
            has_from_clause: false,
            exec_procedure: None,
            ddl_object_name: None,
            ddl_object_schema: None,
            ddl_object_type: None,
        }
    }

    pub fn start(&self) -> Position {
        Position::new(self.start_line, self.start_col)
    }

    pub fn end(&self) -> Position {
        Position::new(self.end_line, self.end_col)
    }

    /// Whether `pos` lies inside the chunk, or inside one of its open-ended clauses.
    pub fn contains(&self, pos: Position) -> bool {
        (pos >= self.start() && pos <= self.end())
            || self
                .clause_positions
                .values()
                .any(|span| span.is_open() && span.contains(pos))
    }

    /// Names of the columns this statement projects (used for subquery pseudo-tables).
    pub fn projected_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .flatten()
            .filter_map(|c| c.output_name().map(str::to_string))
            .collect()
    }

    /// The clause whose span contains `pos`; the latest-starting (innermost) span wins.
    pub fn clause_at(&self, line: usize, col: usize) -> Option<&str> {
        let pos = Position::new(line, col);
        self.clause_positions
            .iter()
            .filter(|(_, span)| span.contains(pos))
            .max_by_key(|(_, span)| span.start)
            .map(|(name, _)| name.as_str())
    }

    /// Look up a table by alias or (unaliased) name, case-insensitively.
    pub fn resolve_alias(&self, name: &str) -> Option<&TableReference> {
        let key = name.to_lowercase();
        self.aliases.get(&key).or_else(|| {
            self.tables
                .iter()
                .find(|t| t.alias.is_none() && t.name.eq_ignore_ascii_case(name))
        })
    }
}

/// Find the innermost chunk (descending into subqueries and CTE bodies) that contains
/// the cursor position.
pub fn find_chunk_at(chunks: &[StatementChunk], line: usize, col: usize) -> Option<&StatementChunk> {
    let pos = Position::new(line, col);
    let chunk = chunks.iter().rev().find(|c| c.contains(pos))?;
    Some(innermost(chunk, pos))
}

fn innermost(chunk: &StatementChunk, pos: Position) -> &StatementChunk {
    let nested = chunk
        .subqueries
        .iter()
        .chain(chunk.ctes.iter().filter_map(|c| c.query.as_deref()))
        .find(|c| c.contains(pos));
    match nested {
        Some(inner) => innermost(inner, pos),
        None => chunk,
    }
}
