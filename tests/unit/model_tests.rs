//! Unit tests for the chunk model: cursor lookup and serialized shape

use pretty_assertions::assert_eq;
use serde_json::json;

use rust_sqlscope::model::{find_chunk_at, Position, Span, StatementKind};
use rust_sqlscope::{parse, tokenize};

const SCRIPT: &str = "SELECT o.id\nFROM Orders o\nWHERE o.cust IN (SELECT c.id FROM Customers c)\n\nUPDATE t SET x = 1";

#[test]
fn test_find_chunk_at_descends_into_subqueries() {
    let chunks = parse(SCRIPT).chunks;
    let outer = find_chunk_at(&chunks, 2, 3).unwrap();
    assert_eq!(outer.tables[0].name, "Orders");

    let inner = find_chunk_at(&chunks, 3, 40).unwrap();
    assert_eq!(inner.tables[0].name, "Customers");
    assert_eq!(inner.clause_at(3, 40), Some("from"));
}

#[test]
fn test_find_chunk_at_between_statements() {
    let chunks = parse(SCRIPT).chunks;
    assert!(find_chunk_at(&chunks, 4, 1).is_none());
    let update = find_chunk_at(&chunks, 5, 14).unwrap();
    assert_eq!(update.statement_type, StatementKind::Update);
    assert_eq!(update.clause_at(5, 14), Some("set"));
}

#[test]
fn test_clause_spans_are_ordered() {
    let chunks = parse(SCRIPT).chunks;
    let chunk = &chunks[0];
    for span in chunk.clause_positions.values() {
        if let Some(end) = span.end {
            assert!(end >= span.start);
        }
    }
    let select = chunk.clause_positions["select"];
    let from = chunk.clause_positions["from"];
    let where_ = chunk.clause_positions["where"];
    assert!(select.start < from.start && from.start < where_.start);
    assert_eq!(select, Span::new(Position::new(1, 1), Position::new(1, 11)));
}

#[test]
fn test_token_json_shape() {
    let tokens = tokenize("SELECT @id");
    let value = serde_json::to_value(&tokens).unwrap();
    assert_eq!(
        value,
        json!([
            {"type": "keyword", "text": "SELECT", "line": 1, "col": 1, "keyword_category": "statement"},
            {"type": "variable", "text": "@id", "line": 1, "col": 8}
        ])
    );
}

#[test]
fn test_chunk_json_includes_open_span() {
    let result = parse("INSERT INTO t (a,");
    let value = serde_json::to_value(&result.chunks[0]).unwrap();
    assert_eq!(value["statement_type"], json!("insert"));
    assert_eq!(
        value["clause_positions"]["insert_columns"],
        json!({"start": {"line": 1, "col": 15}, "end": null})
    );
}

#[test]
fn test_registry_serializes_as_map() {
    let result = parse("CREATE TABLE #t (id int)");
    let value = serde_json::to_value(&result.temp_tables).unwrap();
    assert_eq!(value["#t"]["columns"], json!([{"name": "id", "data_type": "int"}]));
    assert_eq!(value["#t"]["dropped_at_line"], json!(null));
}
