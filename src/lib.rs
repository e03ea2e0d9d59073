//! rust-sqlscope: partial-tolerant T-SQL analysis for editor tooling
//!
//! This library tokenizes possibly-incomplete T-SQL and splits it into statement
//! chunks that record tables, aliases, columns, subqueries, CTEs, parameters and
//! the source span of every clause, so a completion layer can tell what is in
//! scope at the cursor.

pub mod error;
pub mod model;
pub mod parser;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;
use walkdir::WalkDir;

pub use error::SqlScopeError;
pub use parser::{parse, tokenize, ParseOptions, ParseResult, ScriptAnalysis};

/// Options for analyzing script files
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Script files, or directories to search for `*.sql`
    pub paths: Vec<PathBuf>,
    /// Descend into subdirectories
    pub recursive: bool,
    pub options: ParseOptions,
    /// Enable verbose output
    pub verbose: bool,
}

/// Parse every script named by `options.paths`
pub fn analyze_scripts(options: &AnalyzeOptions) -> Result<Vec<ScriptAnalysis>> {
    let files = collect_script_files(&options.paths, options.recursive)?;

    if options.verbose {
        info!(files = files.len(), "Found SQL scripts");
    }

    let analyses = parser::parse_script_files(&files, &options.options)?;

    if options.verbose {
        let chunks: usize = analyses.iter().map(|a| a.chunks.len()).sum();
        info!(files = analyses.len(), chunks, "Analyzed SQL scripts");
    }

    Ok(analyses)
}

/// Expand directories to the `*.sql` files inside them, sorted by name. Files are
/// kept as given.
fn collect_script_files(paths: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let max_depth = if recursive { usize::MAX } else { 1 };
        for entry in WalkDir::new(path).max_depth(max_depth).sort_by_file_name() {
            let entry = entry.map_err(|source| SqlScopeError::DirectoryWalkError {
                path: path.clone(),
                source,
            })?;
            if entry.file_type().is_file() && is_sql_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

fn is_sql_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"))
}
