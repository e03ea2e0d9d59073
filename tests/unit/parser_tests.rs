//! Unit tests for statement chunking and scope resolution

use pretty_assertions::assert_eq;

use rust_sqlscope::model::{ColumnDef, StatementKind, TableReference};
use rust_sqlscope::parse;

// ============================================================================
// Alias and column resolution
// ============================================================================

#[test]
fn test_alias_resolution() {
    let result = parse("SELECT a.x FROM Emp AS a");
    assert_eq!(result.chunks.len(), 1);
    let chunk = &result.chunks[0];
    assert_eq!(chunk.statement_type, StatementKind::Select);
    assert_eq!(
        chunk.tables,
        vec![TableReference {
            alias: Some("a".to_string()),
            ..TableReference::named("Emp")
        }]
    );
    assert_eq!(chunk.aliases["a"].name, "Emp");

    let columns = chunk.columns.as_ref().unwrap();
    assert_eq!(columns[0].name, "x");
    assert_eq!(columns[0].table_qualifier.as_deref(), Some("a"));
    assert_eq!(columns[0].parent_table.as_deref(), Some("Emp"));
}

#[test]
fn test_aliases_are_lowercase_keys() {
    let result = parse("SELECT E.id FROM dbo.Employees E JOIN Dept D ON D.id = E.dept_id");
    let chunk = &result.chunks[0];
    assert!(chunk.aliases.contains_key("e"));
    assert!(chunk.aliases.contains_key("d"));
    assert_eq!(chunk.aliases["e"].schema.as_deref(), Some("dbo"));
    assert!(chunk.clause_positions.contains_key("join_1"));
    assert!(chunk.clause_positions.contains_key("on_1"));
}

#[test]
fn test_unqualified_column_with_several_tables_is_unresolved() {
    let result = parse("SELECT id FROM a, b");
    let columns = result.chunks[0].columns.as_ref().unwrap();
    assert_eq!(columns[0].parent_table, None);
}

#[test]
fn test_unqualified_column_with_one_table_resolves() {
    let result = parse("SELECT id, name FROM Customers");
    let columns = result.chunks[0].columns.as_ref().unwrap();
    assert!(columns
        .iter()
        .all(|c| c.parent_table.as_deref() == Some("Customers")));
}

#[test]
fn test_expression_columns_keep_alias() {
    let result = parse("SELECT COUNT(*) AS n, total = a + b FROM t");
    let columns = result.chunks[0].columns.as_ref().unwrap();
    assert!(columns.iter().all(|c| c.is_expression));
    assert_eq!(columns[0].alias.as_deref(), Some("n"));
    assert_eq!(columns[1].alias.as_deref(), Some("total"));
}

// ============================================================================
// Subqueries
// ============================================================================

#[test]
fn test_subquery_propagation() {
    let result = parse("SELECT * FROM (SELECT 1 AS x) s");
    let chunk = &result.chunks[0];
    assert_eq!(chunk.subqueries.len(), 1);
    assert_eq!(chunk.subqueries[0].alias.as_deref(), Some("s"));
    assert!(chunk.aliases["s"].is_subquery);
    assert_eq!(chunk.aliases["s"].columns, Some(vec!["x".to_string()]));
}

#[test]
fn test_where_subquery_is_registered() {
    let result = parse(
        "SELECT o.id FROM Orders o WHERE o.cust IN (SELECT c.id FROM Customers c WHERE c.vip = 1) ORDER BY o.id",
    );
    let chunk = &result.chunks[0];
    assert_eq!(chunk.subqueries.len(), 1);
    assert_eq!(chunk.subqueries[0].tables[0].name, "Customers");
    for key in ["select", "from", "where", "order_by"] {
        assert!(chunk.clause_positions.contains_key(key), "missing {key}");
    }
}

#[test]
fn test_correlated_subquery_resolves_outer_alias() {
    let result = parse("SELECT (SELECT o.total) AS t FROM Orders o");
    let chunk = &result.chunks[0];
    let inner = &chunk.subqueries[0];
    let columns = inner.columns.as_ref().unwrap();
    assert_eq!(columns[0].table_qualifier.as_deref(), Some("o"));
}

#[test]
fn test_union_branches_share_chunk() {
    let result = parse("SELECT a FROM t1 UNION ALL SELECT b FROM t2 WHERE b > 0");
    assert_eq!(result.chunks.len(), 1);
    let chunk = &result.chunks[0];
    let names: Vec<&str> = chunk.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["t1", "t2"]);
    assert!(chunk.clause_positions.contains_key("set_op_1"));
    assert!(chunk.clause_positions.contains_key("select_2"));
}

// ============================================================================
// Batches and statement boundaries
// ============================================================================

#[test]
fn test_batch_tracking() {
    let result = parse("SELECT 1 GO SELECT 2");
    let batches: Vec<usize> = result.chunks.iter().map(|c| c.go_batch_index).collect();
    assert_eq!(batches, vec![0, 1]);
}

#[test]
fn test_batch_index_is_non_decreasing() {
    let sql = "SELECT 1\nGO\nGO\nSELECT 2; SELECT 3\nGO 2\nSELECT 4";
    let result = parse(sql);
    let batches: Vec<usize> = result.chunks.iter().map(|c| c.go_batch_index).collect();
    assert_eq!(batches, vec![0, 2, 2, 3]);
}

#[test]
fn test_statements_without_semicolons_split() {
    let result = parse("SELECT a FROM t\nUPDATE t SET a = 1\nDELETE FROM t");
    let kinds: Vec<StatementKind> = result.chunks.iter().map(|c| c.statement_type).collect();
    assert_eq!(
        kinds,
        vec![StatementKind::Select, StatementKind::Update, StatementKind::Delete]
    );
    assert!(result
        .chunks
        .windows(2)
        .all(|w| w[0].token_end_idx < w[1].token_start_idx));
}

#[test]
fn test_chunk_range_and_positions() {
    let result = parse("  SELECT a\n  FROM t");
    let chunk = &result.chunks[0];
    assert_eq!((chunk.start_line, chunk.start_col), (1, 3));
    assert_eq!((chunk.end_line, chunk.end_col), (2, 8));
    assert_eq!(chunk.token_start_idx, Some(0));
    assert_eq!(chunk.token_end_idx, Some(3));
}

#[test]
fn test_unknown_leading_tokens_are_skipped() {
    let result = parse("BEGIN TRAN\nSELECT 1\nCOMMIT");
    assert_eq!(result.chunks.len(), 1);
    assert_eq!(result.chunks[0].statement_type, StatementKind::Select);
}

#[test]
fn test_if_else_branches_are_separate_chunks() {
    let result = parse("IF 1 = 1 SELECT 1 ELSE SELECT 2");
    assert_eq!(result.chunks.len(), 2);
    let first = result.chunks[0].columns.as_ref().unwrap();
    let names: Vec<&str> = first.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["1"]);
    assert_eq!((result.chunks[0].end_line, result.chunks[0].end_col), (1, 17));
}

#[test]
fn test_begin_end_block_closes_select() {
    let result = parse("IF @x = 1 BEGIN SELECT a FROM t END ELSE SELECT b FROM u");
    assert_eq!(result.chunks.len(), 2);
    let first = &result.chunks[0];
    assert_eq!((first.end_line, first.end_col), (1, 31));
    assert_eq!(first.tables[0].name, "t");
    assert_eq!(result.chunks[1].tables[0].name, "u");
}

#[test]
fn test_case_expression_inside_if_branch() {
    let sql = "IF @a = 1 SELECT CASE WHEN b = 1 THEN 'y' ELSE 'n' END AS flag FROM t WHERE c = 1 ELSE SELECT 2";
    let result = parse(sql);
    assert_eq!(result.chunks.len(), 2);
    let columns = result.chunks[0].columns.as_ref().unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].alias.as_deref(), Some("flag"));
    assert_eq!(result.chunks[0].tables[0].name, "t");
    assert!(result.chunks[0].clause_positions.contains_key("where"));
}

#[test]
fn test_update_inside_begin_block_stops_at_end() {
    let result = parse("BEGIN UPDATE t SET a = 1 WHERE b = 2 END");
    assert_eq!(result.chunks.len(), 1);
    let chunk = &result.chunks[0];
    assert_eq!(chunk.statement_type, StatementKind::Update);
    assert_eq!((chunk.end_line, chunk.end_col), (1, 36));
}

// ============================================================================
// Temp tables
// ============================================================================

#[test]
fn test_temp_table_lifecycle() {
    let sql = "CREATE TABLE #t (id int)\nGO\nINSERT INTO #t VALUES (1)\nGO\nDROP TABLE #t";
    let result = parse(sql);
    assert_eq!(result.chunks.len(), 3);
    assert_eq!(result.temp_tables.len(), 1);
    let info = result.temp_tables.get("#t").unwrap();
    assert_eq!(info.columns, vec![ColumnDef::new("id", "int")]);
    assert_eq!(info.created_in_batch, 0);
    assert_eq!(info.dropped_at_line, Some(5));
}

#[test]
fn test_temp_table_columns_flow_into_later_statements() {
    let sql = "CREATE TABLE #work (id int, label varchar(20))\nGO\nSELECT w.id FROM #work w";
    let result = parse(sql);
    let select = &result.chunks[1];
    assert_eq!(
        select.aliases["w"].columns,
        Some(vec!["id".to_string(), "label".to_string()])
    );
}

#[test]
fn test_select_into_registers_projection() {
    let result = parse("SELECT id, name AS label INTO #copy FROM People\nSELECT * FROM #copy");
    let info = result.temp_tables.get("#copy").unwrap();
    assert_eq!(info.column_names(), vec!["id", "label"]);
    assert_eq!(result.chunks[0].temp_table_name.as_deref(), Some("#copy"));
    assert_eq!(
        result.chunks[1].tables[0].columns,
        Some(vec!["id".to_string(), "label".to_string()])
    );
}

#[test]
fn test_dropped_temp_table_has_no_columns() {
    let result = parse("CREATE TABLE #t (id int)\nDROP TABLE #t\nSELECT * FROM #t");
    assert_eq!(result.chunks[2].tables[0].columns, None);
}

#[test]
fn test_table_variable_reference_is_not_a_parameter() {
    let result = parse("DECLARE @rows TABLE (id int)\nSELECT r.id FROM @rows r WHERE r.id = @min");
    let select = &result.chunks[1];
    let names: Vec<&str> = select.parameters.iter().map(|p| p.full_name.as_str()).collect();
    assert_eq!(names, vec!["@min"]);
    assert_eq!(select.aliases["r"].columns, Some(vec!["id".to_string()]));
}

// ============================================================================
// Parameters
// ============================================================================

#[test]
fn test_parameters_are_deduplicated_case_insensitively() {
    let result = parse("SELECT * FROM t WHERE a = @Id OR b = @id OR c = @@ROWCOUNT");
    let params = &result.chunks[0].parameters;
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name, "Id");
    assert_eq!(params[0].full_name, "@Id");
    assert!(!params[0].is_system);
    assert!(params[1].is_system);
}

#[test]
fn test_parameters_are_per_chunk() {
    let result = parse("SELECT @a\nSELECT @b");
    assert_eq!(result.chunks[0].parameters[0].full_name, "@a");
    assert_eq!(result.chunks[1].parameters[0].full_name, "@b");
    assert_eq!(result.chunks[1].parameters.len(), 1);
}

// ============================================================================
// Partial input
// ============================================================================

#[test]
fn test_incomplete_statements_do_not_fail() {
    for sql in [
        "SELECT",
        "SELECT a.",
        "SELECT * FROM",
        "SELECT * FROM t WHERE",
        "SELECT * FROM t GROUP",
        "SELECT * FROM (SELECT",
        "INSERT INTO",
        "UPDATE",
        "DELETE FROM t WHERE x IN (",
        "MERGE INTO t USING",
        "CREATE TABLE #",
        "WITH",
        "EXEC",
        "'unterminated",
        "/* open comment",
    ] {
        let result = parse(sql);
        assert!(result.chunks.len() <= 1, "unexpected chunks for {sql:?}");
    }
}

#[test]
fn test_group_without_by_aborts_clause_only() {
    let result = parse("SELECT a FROM t GROUP a");
    let chunk = &result.chunks[0];
    assert_eq!(chunk.tables[0].name, "t");
    assert!(!chunk.clause_positions.contains_key("group_by"));
}

#[test]
fn test_parse_is_idempotent() {
    let sql = "WITH c AS (SELECT id FROM t)\nSELECT * INTO #x FROM c\nGO\nDROP TABLE #x";
    let first = parse(sql);
    let second = parse(sql);
    assert_eq!(first, second);
}
