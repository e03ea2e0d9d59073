//! Error types for rust-sqlscope
//!
//! Tokenizing and parsing never fail; these cover the I/O and worker faults around them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or analyzing scripts
#[derive(Error, Debug)]
pub enum SqlScopeError {
    #[error("Failed to read SQL script: {path}")]
    ScriptReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SQL script is neither UTF-8 nor Windows-1252: {path}")]
    InvalidEncoding { path: PathBuf },

    #[error("Failed to walk directory: {path}")]
    DirectoryWalkError {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Tokenizer worker failed: {message}")]
    WorkerFailed { message: String },
}
