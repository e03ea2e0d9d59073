//! Unit tests for INSERT, UPDATE, DELETE and MERGE chunks

use pretty_assertions::assert_eq;

use rust_sqlscope::model::{find_chunk_at, StatementKind};
use rust_sqlscope::parse;

// ============================================================================
// INSERT
// ============================================================================

#[test]
fn test_insert_values_with_column_list() {
    let result = parse("INSERT INTO dbo.Orders (id, [Customer Id]) VALUES (1, 2), (3, 4)");
    let chunk = &result.chunks[0];
    assert_eq!(chunk.statement_type, StatementKind::Insert);
    assert_eq!(chunk.tables[0].name, "Orders");
    assert_eq!(chunk.tables[0].schema.as_deref(), Some("dbo"));
    assert_eq!(
        chunk.insert_columns,
        Some(vec!["id".to_string(), "Customer Id".to_string()])
    );
    assert!(!chunk.clause_positions["insert_columns"].is_open());
    assert!(chunk.clause_positions.contains_key("values"));
}

#[test]
fn test_insert_select_keeps_target_table() {
    let result = parse("INSERT INTO Archive (id) SELECT o.id FROM Orders o WHERE o.closed = 1");
    let chunk = &result.chunks[0];
    let names: Vec<&str> = chunk.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Archive", "Orders"]);
    assert_eq!(chunk.aliases["o"].name, "Orders");
    for key in ["into", "insert_columns", "select", "from", "where"] {
        assert!(chunk.clause_positions.contains_key(key), "missing {key}");
    }
}

#[test]
fn test_insert_select_resolves_columns_against_source() {
    let result = parse("INSERT INTO t (a) SELECT x FROM u");
    let chunk = &result.chunks[0];
    let names: Vec<&str> = chunk.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["t", "u"]);
    let columns = chunk.columns.as_ref().unwrap();
    assert_eq!(columns[0].parent_table.as_deref(), Some("u"));
}

#[test]
fn test_insert_select_without_from_leaves_columns_unresolved() {
    let result = parse("INSERT INTO t (a) SELECT x");
    let columns = result.chunks[0].columns.as_ref().unwrap();
    assert_eq!(columns[0].parent_table, None);
}

#[test]
fn test_insert_exec_captures_procedure() {
    let result = parse("INSERT INTO #results EXEC dbo.usp_GetRows @since = '2024-01-01'");
    let chunk = &result.chunks[0];
    assert_eq!(chunk.exec_procedure.as_deref(), Some("dbo.usp_GetRows"));
    assert!(chunk.clause_positions.contains_key("exec"));
    assert_eq!(chunk.parameters[0].full_name, "@since");
}

#[test]
fn test_unterminated_insert_column_list_keeps_cursor_inside() {
    let sql = "INSERT INTO Orders (id, \n";
    let result = parse(sql);
    let chunk = &result.chunks[0];
    let span = &chunk.clause_positions["insert_columns"];
    assert!(span.is_open());
    assert_eq!((span.start.line, span.start.col), (1, 20));

    // Cursor past the end of the typed text
    let found = find_chunk_at(&result.chunks, 2, 5).unwrap();
    assert_eq!(found.statement_type, StatementKind::Insert);
    assert_eq!(found.clause_at(2, 5), Some("insert_columns"));
}

// ============================================================================
// UPDATE
// ============================================================================

#[test]
fn test_simple_update_promotes_target() {
    let result = parse("UPDATE dbo.Orders SET status = 2 WHERE id = @id");
    let chunk = &result.chunks[0];
    assert_eq!(chunk.statement_type, StatementKind::Update);
    assert!(!chunk.has_from_clause);
    assert_eq!(chunk.tables.len(), 1);
    assert_eq!(chunk.tables[0].name, "Orders");
    assert_eq!(chunk.update_target.as_ref().map(|t| t.name.as_str()), Some("Orders"));
    for key in ["update", "set", "where"] {
        assert!(chunk.clause_positions.contains_key(key), "missing {key}");
    }
}

#[test]
fn test_extended_update_uses_from_tables() {
    let sql = "UPDATE o SET o.total = d.amount FROM Orders o JOIN Deltas d ON d.id = o.id WHERE d.amount > 0";
    let result = parse(sql);
    let chunk = &result.chunks[0];
    assert!(chunk.has_from_clause);
    assert_eq!(chunk.update_target.as_ref().map(|t| t.name.as_str()), Some("o"));
    let names: Vec<&str> = chunk.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Orders", "Deltas"]);
    assert_eq!(chunk.aliases["o"].name, "Orders");
}

#[test]
fn test_update_set_subquery() {
    let result = parse("UPDATE t SET x = (SELECT MAX(y) FROM u) WHERE t.id = 1");
    let chunk = &result.chunks[0];
    assert_eq!(chunk.subqueries.len(), 1);
    assert_eq!(chunk.subqueries[0].tables[0].name, "u");
}

// ============================================================================
// DELETE
// ============================================================================

#[test]
fn test_simple_delete() {
    let result = parse("DELETE TOP (10) FROM Logs WHERE created < @cutoff");
    let chunk = &result.chunks[0];
    assert_eq!(chunk.statement_type, StatementKind::Delete);
    assert_eq!(chunk.delete_target.as_ref().map(|t| t.name.as_str()), Some("Logs"));
    assert_eq!(chunk.tables[0].name, "Logs");
    assert!(!chunk.has_from_clause);
}

#[test]
fn test_delete_alias_form() {
    let result = parse("DELETE o FROM Orders o JOIN Customers c ON c.id = o.cust WHERE c.gone = 1");
    let chunk = &result.chunks[0];
    assert!(chunk.has_from_clause);
    assert_eq!(chunk.delete_target.as_ref().map(|t| t.name.as_str()), Some("o"));
    let names: Vec<&str> = chunk.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Orders", "Customers"]);
}

#[test]
fn test_delete_table_form() {
    let result = parse("DELETE Orders FROM Orders JOIN Gone g ON g.id = Orders.id");
    let chunk = &result.chunks[0];
    assert!(chunk.has_from_clause);
    assert_eq!(chunk.tables.len(), 2);
    assert_eq!(chunk.tables[0].name, "Orders");
}

// ============================================================================
// MERGE
// ============================================================================

#[test]
fn test_merge_actions_are_not_new_statements() {
    let sql = "MERGE Target AS t\nUSING Source AS s ON t.id = s.id\n\
WHEN MATCHED THEN UPDATE SET t.v = s.v\n\
WHEN NOT MATCHED THEN INSERT (id, v) VALUES (s.id, s.v)\n\
WHEN NOT MATCHED BY SOURCE THEN DELETE\n\
OUTPUT $action;";
    let result = parse(sql);
    assert_eq!(result.chunks.len(), 1);
    let chunk = &result.chunks[0];
    assert_eq!(chunk.statement_type, StatementKind::Merge);
    let names: Vec<&str> = chunk.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Target", "Source"]);
    assert!(chunk.clause_positions.contains_key("output"));
    assert_eq!(chunk.clause_at(3, 30), Some("merge_set_1"));
}

#[test]
fn test_merge_body_ends_at_real_statement() {
    let result = parse("MERGE t USING s ON t.id = s.id WHEN MATCHED THEN DELETE\nSELECT 1");
    assert_eq!(result.chunks.len(), 2);
    assert_eq!(result.chunks[1].statement_type, StatementKind::Select);
}

// ============================================================================
// SET / EXEC
// ============================================================================

#[test]
fn test_exec_and_set_chunks() {
    let result = parse("SET NOCOUNT ON;\nEXECUTE sys.sp_who2\nSET @x = (SELECT 1)");
    let kinds: Vec<StatementKind> = result.chunks.iter().map(|c| c.statement_type).collect();
    assert_eq!(
        kinds,
        vec![StatementKind::Set, StatementKind::Exec, StatementKind::Set]
    );
    assert_eq!(result.chunks[1].exec_procedure.as_deref(), Some("sys.sp_who2"));
    assert_eq!(result.chunks[2].subqueries.len(), 1);
}
