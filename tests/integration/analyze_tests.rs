//! Integration tests for analyzing script files and directories

use pretty_assertions::assert_eq;

use rust_sqlscope::model::StatementKind;
use rust_sqlscope::parser::{parse_script_file, parse_script_files};
use rust_sqlscope::{analyze_scripts, AnalyzeOptions, ParseOptions, SqlScopeError};

use crate::common::{file_names, ScriptDir};

// ============================================================================
// Directory expansion
// ============================================================================

#[test]
fn test_directory_is_expanded_to_sorted_sql_files() {
    let dir = ScriptDir::new();
    dir.write("b.sql", "SELECT 2");
    dir.write("a.SQL", "SELECT 1");
    dir.write("notes.txt", "SELECT 3");
    dir.write("nested/c.sql", "SELECT 4");

    let analyses = analyze_scripts(&AnalyzeOptions {
        paths: vec![dir.path().to_path_buf()],
        ..Default::default()
    })
    .unwrap();
    assert_eq!(file_names(&analyses), vec!["a.SQL", "b.sql"]);
}

#[test]
fn test_recursive_includes_subdirectories() {
    let dir = ScriptDir::new();
    dir.write("a.sql", "SELECT 1");
    dir.write("nested/deeper/c.sql", "SELECT 4");

    let analyses = analyze_scripts(&AnalyzeOptions {
        paths: vec![dir.path().to_path_buf()],
        recursive: true,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(file_names(&analyses), vec!["a.sql", "c.sql"]);
}

#[test]
fn test_explicit_files_are_kept_in_order() {
    let dir = ScriptDir::new();
    let second = dir.write("z.sql", "DELETE FROM t");
    let first = dir.write("y.txt", "UPDATE t SET a = 1");

    let analyses = analyze_scripts(&AnalyzeOptions {
        paths: vec![second, first],
        ..Default::default()
    })
    .unwrap();
    assert_eq!(file_names(&analyses), vec!["z.sql", "y.txt"]);
    assert_eq!(analyses[0].chunks[0].statement_type, StatementKind::Delete);
    assert_eq!(analyses[1].chunks[0].statement_type, StatementKind::Update);
}

// ============================================================================
// Per-file parsing
// ============================================================================

#[test]
fn test_temp_tables_do_not_leak_between_files() {
    let dir = ScriptDir::new();
    let create = dir.write("01_create.sql", "CREATE TABLE #shared (id int)");
    let select = dir.write("02_select.sql", "SELECT s.id FROM #shared s");

    let analyses = parse_script_files(&[create, select], &ParseOptions::default()).unwrap();
    assert_eq!(analyses[0].temp_tables.len(), 1);
    assert!(analyses[1].temp_tables.is_empty());
    assert_eq!(analyses[1].chunks[0].aliases["s"].columns, None);
}

#[test]
fn test_parallel_parse_preserves_order() {
    let dir = ScriptDir::new();
    let files: Vec<_> = (0..12)
        .map(|i| dir.write(&format!("script_{i:02}.sql"), format!("SELECT c{i} FROM t{i}")))
        .collect();

    let analyses = parse_script_files(&files, &ParseOptions::default()).unwrap();
    assert_eq!(analyses.len(), 12);
    for (i, analysis) in analyses.iter().enumerate() {
        assert_eq!(analysis.path, files[i]);
        assert_eq!(analysis.chunks[0].tables[0].name, format!("t{i}"));
    }
}

#[test]
fn test_crlf_script_positions() {
    let dir = ScriptDir::new();
    let path = dir.write("crlf.sql", "SELECT a\r\nFROM t\r\nGO\r\nSELECT b\r\nFROM u\r\n");

    let analysis = parse_script_file(&path, &ParseOptions::default()).unwrap();
    assert_eq!(analysis.chunks.len(), 2);
    let second = &analysis.chunks[1];
    assert_eq!((second.start_line, second.start_col), (4, 1));
    assert_eq!((second.end_line, second.end_col), (5, 6));
    assert_eq!(second.go_batch_index, 1);
}

#[test]
fn test_missing_path_is_reported() {
    let dir = ScriptDir::new();
    let missing = dir.path().join("missing.sql");

    let err = analyze_scripts(&AnalyzeOptions {
        paths: vec![missing.clone()],
        ..Default::default()
    })
    .unwrap_err();
    match err.downcast_ref::<SqlScopeError>() {
        Some(SqlScopeError::ScriptReadError { path, .. }) => assert_eq!(path, &missing),
        other => panic!("unexpected error: {other:?}"),
    }
}
