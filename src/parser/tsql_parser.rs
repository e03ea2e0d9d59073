//! T-SQL script parsing entry points
//!
//! `parse` turns a buffer into statement chunks plus the temp-table registry built
//! while walking it. Every call starts from a fresh registry, so parsing the same
//! text twice yields identical results. Script files are decoded, stripped of a
//! BOM and parsed independently of each other.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use encoding_rs::WINDOWS_1252;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::offload::{tokenize_with_timeout, DEFAULT_OFFLOAD_TIMEOUT};
use super::statement_parser::StatementParser;
use super::tokenizer::tokenize;
use crate::error::SqlScopeError;
use crate::model::{StatementChunk, TempTableRegistry, Token};

/// Inputs at least this large are tokenized on a worker by default (1 MiB).
pub const DEFAULT_OFFLOAD_THRESHOLD: usize = 1 << 20;

/// Options controlling how a buffer is tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Tokenize on a worker when the input is at least this many bytes; `None` never offloads
    pub offload_threshold: Option<usize>,
    /// How long to wait for the worker before tokenizing synchronously
    pub offload_timeout: Duration,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            offload_threshold: Some(DEFAULT_OFFLOAD_THRESHOLD),
            offload_timeout: DEFAULT_OFFLOAD_TIMEOUT,
        }
    }
}

impl ParseOptions {
    /// Always tokenize on the calling thread.
    pub fn synchronous() -> Self {
        Self {
            offload_threshold: None,
            ..Self::default()
        }
    }
}

/// Chunks of one buffer and the temp tables its statements declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    pub chunks: Vec<StatementChunk>,
    pub temp_tables: TempTableRegistry,
}

impl ParseResult {
    pub fn into_parts(self) -> (Vec<StatementChunk>, TempTableRegistry) {
        (self.chunks, self.temp_tables)
    }
}

/// Parse a buffer with default options.
pub fn parse(text: &str) -> ParseResult {
    parse_with_options(text, &ParseOptions::default())
}

pub fn parse_with_options(text: &str, options: &ParseOptions) -> ParseResult {
    let tokens = match options.offload_threshold {
        Some(threshold) if text.len() >= threshold => {
            debug!(bytes = text.len(), threshold, "Offloading tokenization");
            tokenize_with_timeout(text, options.offload_timeout)
        }
        _ => tokenize(text),
    };
    parse_tokens(&tokens)
}

/// Parse an already-tokenized buffer.
pub fn parse_tokens(tokens: &[Token]) -> ParseResult {
    let (chunks, temp_tables) = StatementParser::new(tokens).parse_script();
    ParseResult {
        chunks,
        temp_tables,
    }
}

/// Parse result for one script file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptAnalysis {
    pub path: PathBuf,
    pub chunks: Vec<StatementChunk>,
    pub temp_tables: TempTableRegistry,
}

/// Minimum number of files to benefit from parallel processing.
/// Below this threshold, sequential processing is faster due to rayon overhead.
const PARALLEL_THRESHOLD: usize = 8;

/// Parse multiple script files, in parallel for larger sets. Results keep input order.
pub fn parse_script_files(files: &[PathBuf], options: &ParseOptions) -> Result<Vec<ScriptAnalysis>> {
    if files.len() >= PARALLEL_THRESHOLD {
        files
            .par_iter()
            .map(|file| parse_script_file(file, options))
            .collect()
    } else {
        files
            .iter()
            .map(|file| parse_script_file(file, options))
            .collect()
    }
}

/// Parse a single script file
pub fn parse_script_file(path: &Path, options: &ParseOptions) -> Result<ScriptAnalysis> {
    let content = read_script(path)?;

    let ParseResult {
        chunks,
        temp_tables,
    } = parse_with_options(&content, options);
    debug!(
        path = %path.display(),
        chunks = chunks.len(),
        temp_tables = temp_tables.len(),
        "Parsed script file"
    );

    Ok(ScriptAnalysis {
        path: path.to_path_buf(),
        chunks,
        temp_tables,
    })
}

/// Read a script file the way [`parse_script_file`] does: decoded, without a
/// leading BOM.
pub fn read_script(path: &Path) -> Result<String, SqlScopeError> {
    let content = read_script_with_encoding_fallback(path)?;
    match content.strip_prefix('\u{FEFF}') {
        Some(stripped) => Ok(stripped.to_string()),
        None => Ok(content),
    }
}

/// Read a script as UTF-8, falling back to Windows-1252 (common for scripts saved
/// on Windows).
fn read_script_with_encoding_fallback(path: &Path) -> Result<String, SqlScopeError> {
    let bytes = std::fs::read(path).map_err(|source| SqlScopeError::ScriptReadError {
        path: path.to_path_buf(),
        source,
    })?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            let bytes = err.into_bytes();
            let (decoded, _, had_errors) = WINDOWS_1252.decode(&bytes);
            if had_errors {
                Err(SqlScopeError::InvalidEncoding {
                    path: path.to_path_buf(),
                })
            } else {
                debug!(path = %path.display(), "Decoded script as Windows-1252");
                Ok(decoded.into_owned())
            }
        }
    }
}
