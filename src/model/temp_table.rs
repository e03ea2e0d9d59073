//! Cross-batch registry of temp tables and table variables
//!
//! A registry lives for exactly one `parse` call. DDL handlers mutate it as the
//! script is walked; DROP marks entries instead of removing them so the history
//! stays available for diagnostics.

use std::collections::BTreeMap;

use serde::Serialize;

/// A column declared on a temp table or table variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    /// Type as written, including any length/precision (e.g. `varchar(50)`)
    pub data_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A `#temp`, `##global` table or `@table` variable known to the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TempTableInfo {
    /// Name including its `#`, `##` or `@` prefix
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub created_in_batch: usize,
    pub created_at_line: usize,
    pub is_global: bool,
    pub is_table_variable: bool,
    pub dropped_at_line: Option<usize>,
}

impl TempTableInfo {
    pub fn temp_table(name: impl Into<String>, batch: usize, line: usize) -> Self {
        let name = name.into();
        Self {
            is_global: name.starts_with("##"),
            name,
            columns: Vec::new(),
            created_in_batch: batch,
            created_at_line: line,
            is_table_variable: false,
            dropped_at_line: None,
        }
    }

    pub fn table_variable(name: impl Into<String>, batch: usize, line: usize) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            created_in_batch: batch,
            created_at_line: line,
            is_global: false,
            is_table_variable: true,
            dropped_at_line: None,
        }
    }

    #[inline]
    pub fn is_dropped(&self) -> bool {
        self.dropped_at_line.is_some()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Temp-table registry keyed by lowercase name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TempTableRegistry {
    entries: BTreeMap<String, TempTableInfo>,
}

impl TempTableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-create) an entry. Re-creating a dropped table replaces its history.
    pub fn register(&mut self, info: TempTableInfo) {
        self.entries.insert(info.name.to_lowercase(), info);
    }

    pub fn get(&self, name: &str) -> Option<&TempTableInfo> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TempTableInfo> {
        self.entries.get_mut(&name.to_lowercase())
    }

    /// Entry that is currently usable (registered and not dropped).
    pub fn live(&self, name: &str) -> Option<&TempTableInfo> {
        self.get(name).filter(|info| !info.is_dropped())
    }

    /// Mark an entry as dropped. Returns `false` if the name is unknown.
    pub fn mark_dropped(&mut self, name: &str, line: usize) -> bool {
        match self.get_mut(name) {
            Some(info) => {
                info.dropped_at_line = Some(line);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TempTableInfo> {
        self.entries.values()
    }
}
