//! Common test utilities for rust-sqlscope tests

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory of `.sql` scripts for isolated test execution
pub struct ScriptDir {
    /// Kept to prevent temp directory cleanup until ScriptDir is dropped
    _temp_dir: TempDir,
    pub root: PathBuf,
}

impl ScriptDir {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Write a script (creating parent directories) and return its path
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create script directory");
        }
        fs::write(&path, content).expect("Failed to write script");
        path
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

/// File names of analyzed scripts, in result order
pub fn file_names(analyses: &[rust_sqlscope::ScriptAnalysis]) -> Vec<String> {
    analyses
        .iter()
        .map(|a| {
            a.path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect()
}
