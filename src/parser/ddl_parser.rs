//! CREATE / ALTER / DROP / DECLARE / TRUNCATE
//!
//! These handlers keep the temp-table registry current as the script is walked:
//! `CREATE TABLE #t` and `DECLARE @t TABLE` register entries, `ALTER TABLE #t`
//! edits their columns in place and `DROP TABLE #t` marks them dropped. Routine
//! headers (`CREATE PROCEDURE ... AS`) end at their `AS`; the body statements that
//! follow are parsed as ordinary statements. Anything not modeled here is consumed
//! to the end of the statement.

use tracing::debug;

use super::base_statement::{create_chunk, finalize_chunk, record_clause, Prelude};
use super::identifier_utils::{is_name_token, normalize_identifier, QualifiedName};
use super::scope::ScopeContext;
use super::statement_parser::{ClauseStop, StatementParser};
use crate::model::{
    ColumnDef, Span, StatementChunk, StatementKind, TempTableInfo, Token, TokenType,
};

/// Words between CREATE and INDEX.
const INDEX_MODIFIERS: &[&str] = &["UNIQUE", "CLUSTERED", "NONCLUSTERED", "COLUMNSTORE"];

/// Table-level items in a column definition list that are not columns.
const CONSTRAINT_STARTERS: &[&str] = &[
    "CONSTRAINT", "PRIMARY", "FOREIGN", "UNIQUE", "CHECK", "DEFAULT", "INDEX", "PERIOD",
];

/// Programmable objects whose header ends at `AS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoutineKind {
    View,
    Procedure,
    Function,
    Trigger,
}

impl RoutineKind {
    fn from_token(token: &Token) -> Option<Self> {
        if token.token_type != TokenType::Keyword && token.token_type != TokenType::Identifier {
            return None;
        }
        match token.text.to_ascii_uppercase().as_str() {
            "VIEW" => Some(RoutineKind::View),
            "PROCEDURE" | "PROC" => Some(RoutineKind::Procedure),
            "FUNCTION" => Some(RoutineKind::Function),
            "TRIGGER" => Some(RoutineKind::Trigger),
            _ => None,
        }
    }

    fn create_kind(self) -> StatementKind {
        match self {
            RoutineKind::View => StatementKind::CreateView,
            RoutineKind::Procedure => StatementKind::CreateProcedure,
            RoutineKind::Function => StatementKind::CreateFunction,
            RoutineKind::Trigger => StatementKind::CreateTrigger,
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            RoutineKind::View => "VIEW",
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Trigger => "TRIGGER",
        }
    }
}

impl<'a> StatementParser<'a> {
    // ========================================================================
    // CREATE
    // ========================================================================

    pub(super) fn parse_create(&mut self, scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        self.state.advance();
        if self.state.is_keyword("OR") && self.state.peek_is_keyword(1, "ALTER") {
            self.state.advance();
            self.state.advance();
        }
        while self.state.is_any_keyword(INDEX_MODIFIERS) {
            self.state.advance();
        }

        if self.state.is_keyword("TABLE") {
            return self.parse_create_table(scope, prelude);
        }
        if self.state.is_keyword("INDEX") {
            return self.parse_create_index(scope, prelude);
        }
        match self.state.current().and_then(RoutineKind::from_token) {
            Some(routine) => {
                self.parse_routine_header(scope, prelude, routine, routine.create_kind(), "create")
            }
            None => self.parse_other_ddl(scope, prelude, StatementKind::Create, "create"),
        }
    }

    fn parse_create_table(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::CreateTable;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
        self.state.advance();

        let mut temp_table = None;
        if let Some(name) = self.parse_qualified_name() {
            self.set_ddl_object(&mut chunk, &name, "TABLE");
            let table = self.table_reference(&name, &scope);
            scope.add_table(table.clone());
            chunk.tables.push(table);

            let table_name = name.name();
            if table_name.starts_with('#') {
                chunk.temp_table_name = Some(table_name.to_string());
                chunk.is_global_temp = table_name.starts_with("##");
                temp_table = Some(TempTableInfo::temp_table(
                    table_name,
                    self.batch_index,
                    chunk.start_line,
                ));
            }
        }

        if let Some((columns, span)) = self.parse_column_definitions() {
            record_clause(&mut chunk, "columns", span);
            if let Some(info) = temp_table.as_mut() {
                info.columns = columns;
            }
        }
        if let Some(info) = temp_table {
            debug!(
                name = %info.name,
                columns = info.columns.len(),
                batch = info.created_in_batch,
                "Registered temp table"
            );
            self.temp_tables.register(info);
        }

        self.finish_ddl(chunk, scope, "create")
    }

    fn parse_create_index(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::CreateIndex;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
        self.state.advance();

        if let Some(name) = self.parse_qualified_name() {
            chunk.ddl_object_name = Some(name.name().to_string());
        }
        chunk.ddl_object_type = Some("INDEX".to_string());
        if self.state.consume_keyword("ON") {
            if let Some(name) = self.parse_qualified_name() {
                let table = self.table_reference(&name, &scope);
                chunk.ddl_object_schema = table.schema.clone();
                scope.add_table(table.clone());
                chunk.tables.push(table);
            }
        }

        self.finish_ddl(chunk, scope, "create")
    }

    /// VIEW / PROCEDURE / FUNCTION / TRIGGER up to the `AS` that opens the body.
    fn parse_routine_header(
        &mut self,
        mut scope: ScopeContext,
        prelude: Prelude,
        routine: RoutineKind,
        kind: StatementKind,
        clause_key: &str,
    ) -> StatementChunk {
        scope.statement_type = kind;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
        self.state.advance();

        if let Some(name) = self.parse_qualified_name() {
            self.set_ddl_object(&mut chunk, &name, routine.type_name());
        }
        if routine == RoutineKind::Trigger && self.state.consume_keyword("ON") {
            if let Some(name) = self.parse_qualified_name() {
                let table = self.table_reference(&name, &scope);
                scope.add_table(table.clone());
                chunk.tables.push(table);
            }
        }
        self.skip_routine_header(routine);

        let start = chunk.token_start_idx.unwrap_or_default();
        if let Some(span) = self.state.span_from(start) {
            record_clause(&mut chunk, clause_key, span);
        }
        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }

    /// Parameters, RETURNS and WITH options, through the body-opening `AS`.
    fn skip_routine_header(&mut self, routine: RoutineKind) {
        let mut depth = 0usize;
        while let Some(token) = self.state.current() {
            match token.token_type {
                TokenType::Go | TokenType::Semicolon if depth == 0 => return,
                TokenType::ParenOpen => depth += 1,
                TokenType::ParenClose => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenType::Keyword if depth == 0 => {
                    if token.is_word("AS") {
                        self.state.advance();
                        return;
                    }
                    if token.is_word("WITH") {
                        self.skip_routine_options();
                        continue;
                    }
                    let trigger_event = routine == RoutineKind::Trigger
                        && self.state.is_any_keyword(&["INSERT", "UPDATE", "DELETE"]);
                    if !trigger_event && self.state.is_statement_start() {
                        return;
                    }
                }
                _ => {}
            }
            self.state.advance();
        }
    }

    /// `WITH SCHEMABINDING, EXECUTE AS OWNER, ...` before the body or trigger events.
    fn skip_routine_options(&mut self) {
        self.state.advance();
        while let Some(token) = self.state.current() {
            if token.token_type == TokenType::Go || token.token_type == TokenType::Semicolon {
                return;
            }
            if self.state.is_any_keyword(&["EXECUTE", "EXEC"]) && self.state.peek_is_keyword(1, "AS")
            {
                self.state.advance();
                self.state.advance();
                self.state.advance();
                continue;
            }
            if self.state.is_any_keyword(&["AS", "FOR", "AFTER", "INSTEAD"]) {
                return;
            }
            self.state.advance();
        }
    }

    // ========================================================================
    // ALTER
    // ========================================================================

    pub(super) fn parse_alter(&mut self, scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        self.state.advance();
        if self.state.is_keyword("TABLE") {
            return self.parse_alter_table(scope, prelude);
        }
        match self.state.current().and_then(RoutineKind::from_token) {
            Some(routine) => {
                self.parse_routine_header(scope, prelude, routine, StatementKind::Alter, "alter")
            }
            None => self.parse_other_ddl(scope, prelude, StatementKind::Alter, "alter"),
        }
    }

    fn parse_alter_table(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::AlterTable;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
        self.state.advance();

        let Some(name) = self.parse_qualified_name() else {
            return self.finish_ddl(chunk, scope, "alter_table");
        };
        self.set_ddl_object(&mut chunk, &name, "TABLE");
        let table = self.table_reference(&name, &scope);
        scope.add_table(table.clone());
        chunk.tables.push(table);
        let table_name = name.name().to_string();

        if self.state.consume_keyword("ADD") {
            let added = self.parse_added_columns();
            if let Some(info) = self.live_temp_table_mut(&table_name) {
                info.columns.extend(added);
                debug!(name = %table_name, columns = info.columns.len(), "Added temp table columns");
            }
        } else if self.state.is_keyword("DROP") && self.state.peek_is_keyword(1, "COLUMN") {
            self.state.advance();
            self.state.advance();
            self.skip_if_exists();
            let dropped = self.parse_dropped_columns();
            if let Some(info) = self.live_temp_table_mut(&table_name) {
                info.columns
                    .retain(|c| !dropped.iter().any(|d| d.eq_ignore_ascii_case(&c.name)));
            }
        } else if self.state.is_keyword("ALTER") && self.state.peek_is_keyword(1, "COLUMN") {
            self.state.advance();
            self.state.advance();
            if let Some(column) = self.parse_column_def() {
                if let Some(info) = self.live_temp_table_mut(&table_name) {
                    let existing = info
                        .columns
                        .iter_mut()
                        .find(|c| c.name.eq_ignore_ascii_case(&column.name));
                    if let Some(existing) = existing {
                        existing.data_type = column.data_type;
                    }
                }
            }
        }

        self.finish_ddl(chunk, scope, "alter_table")
    }

    /// `ADD c1 int, c2 varchar(10), CONSTRAINT ...`
    fn parse_added_columns(&mut self) -> Vec<ColumnDef> {
        let mut added = Vec::new();
        loop {
            if self.state.is_any_keyword(CONSTRAINT_STARTERS) {
                self.skip_definition_item();
            } else if self.state.is_statement_start() {
                break;
            } else if let Some(column) = self.parse_column_def() {
                added.push(column);
            } else {
                break;
            }
            if !self.state.is_type(TokenType::Comma) {
                break;
            }
            self.state.advance();
        }
        added
    }

    fn parse_dropped_columns(&mut self) -> Vec<String> {
        let mut dropped = Vec::new();
        while let Some(token) = self.state.current().filter(|t| is_name_token(t)) {
            dropped.push(normalize_identifier(&token.text));
            self.state.advance();
            if !self.state.is_type(TokenType::Comma) {
                break;
            }
            self.state.advance();
        }
        dropped
    }

    // ========================================================================
    // DROP / TRUNCATE
    // ========================================================================

    pub(super) fn parse_drop(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        self.state.advance();
        if !self.state.is_keyword("TABLE") {
            return self.parse_other_ddl(scope, prelude, StatementKind::Drop, "drop");
        }

        scope.statement_type = StatementKind::DropTable;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
        self.state.advance();
        self.skip_if_exists();
        chunk.ddl_object_type = Some("TABLE".to_string());

        while let Some(name) = self.parse_qualified_name() {
            let table = self.table_reference(&name, &scope);
            if chunk.ddl_object_name.is_none() {
                chunk.ddl_object_name = Some(table.name.clone());
                chunk.ddl_object_schema = table.schema.clone();
            }
            if self.temp_tables.mark_dropped(&table.name, chunk.start_line) {
                debug!(name = %table.name, line = chunk.start_line, "Dropped temp table");
            }
            scope.add_table(table.clone());
            chunk.tables.push(table);
            if !self.state.is_type(TokenType::Comma) {
                break;
            }
            self.state.advance();
        }

        self.finish_ddl(chunk, scope, "drop_table")
    }

    pub(super) fn parse_truncate(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::Truncate;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
        self.state.advance();
        self.state.consume_keyword("TABLE");
        if let Some(name) = self.parse_qualified_name() {
            let table = self.table_reference(&name, &scope);
            scope.add_table(table.clone());
            chunk.tables.push(table);
        }
        self.finish_ddl(chunk, scope, "truncate")
    }

    // ========================================================================
    // DECLARE
    // ========================================================================

    pub(super) fn parse_declare(&mut self, mut scope: ScopeContext, prelude: Prelude) -> StatementChunk {
        scope.statement_type = StatementKind::Declare;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
        self.state.advance();

        loop {
            let Some(variable) = self
                .state
                .current()
                .filter(|t| t.token_type == TokenType::Variable)
            else {
                // DECLARE name CURSOR FOR SELECT ...
                self.state.consume_until_statement_end(0);
                break;
            };
            self.state.advance();
            self.state.consume_keyword("AS");

            if self.state.is_keyword("TABLE") {
                self.state.advance();
                let mut info =
                    TempTableInfo::table_variable(&variable.text, self.batch_index, variable.line);
                if let Some((columns, span)) = self.parse_column_definitions() {
                    record_clause(&mut chunk, "columns", span);
                    info.columns = columns;
                }
                debug!(name = %info.name, columns = info.columns.len(), "Registered table variable");
                self.temp_tables.register(info);
            } else if self.state.is_keyword("CURSOR") {
                self.state.consume_until_statement_end(0);
                break;
            } else {
                self.consume_clause_body(&mut scope, ClauseStop::keywords(&[]).at_comma());
            }

            if !self.state.is_type(TokenType::Comma) {
                break;
            }
            self.state.advance();
        }

        let start = chunk.token_start_idx.unwrap_or_default();
        if let Some(span) = self.state.span_from(start) {
            record_clause(&mut chunk, "declare", span);
        }
        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }

    // ========================================================================
    // Column definitions
    // ========================================================================

    /// `(col type [options], ..., [CONSTRAINT ...])`; the span is open-ended when
    /// the list is unterminated. `None` if not positioned at `(`.
    fn parse_column_definitions(&mut self) -> Option<(Vec<ColumnDef>, Span)> {
        let open_idx = self.state.pos();
        let open = self
            .state
            .current()
            .filter(|t| t.token_type == TokenType::ParenOpen)?
            .start();
        self.state.advance();
        let mut columns = Vec::new();

        let closed = loop {
            let Some(token) = self.state.current() else {
                break false;
            };
            match token.token_type {
                TokenType::ParenClose => {
                    self.state.advance();
                    break true;
                }
                TokenType::Comma => {
                    self.state.advance();
                }
                TokenType::Go | TokenType::Semicolon => break false,
                _ if self.state.is_any_keyword(CONSTRAINT_STARTERS) => self.skip_definition_item(),
                _ if self.state.is_statement_start() => break false,
                _ => match self.parse_column_def() {
                    Some(column) => columns.push(column),
                    None => self.skip_definition_item(),
                },
            }
        };

        let span = match self.state.span_from(open_idx) {
            Some(span) if closed => span,
            _ => Span::open(open),
        };
        Some((columns, span))
    }

    /// `name type [NULL | NOT NULL | IDENTITY(...) | DEFAULT ... | ...]`, or a computed
    /// `name AS expr` (recorded without a type).
    fn parse_column_def(&mut self) -> Option<ColumnDef> {
        let token = self.state.current().filter(|t| is_name_token(t))?;
        self.state.advance();
        let name = normalize_identifier(&token.text);

        if self.state.consume_keyword("AS") {
            self.skip_definition_item();
            return Some(ColumnDef::new(name, ""));
        }
        let data_type = self.parse_data_type();
        self.skip_definition_item();
        Some(ColumnDef::new(name, data_type))
    }

    /// Type name with any length/precision, written compactly (`decimal(10,2)`).
    fn parse_data_type(&mut self) -> String {
        let mut text = match self.parse_qualified_name() {
            Some(name) => name.joined(),
            None => match self.state.current() {
                Some(t) if t.token_type == TokenType::Keyword => {
                    self.state.advance();
                    t.text.clone()
                }
                _ => return String::new(),
            },
        };
        if self.state.is_type(TokenType::ParenOpen) {
            let open = self.state.pos();
            self.state.skip_paren_contents();
            if let Some(end) = self.state.last_consumed().filter(|&end| end >= open) {
                let tokens = &self.state.tokens()[open..=end];
                text.extend(tokens.iter().filter(|t| !t.is_comment()).map(|t| t.text.as_str()));
            }
        }
        text
    }

    /// Consume one definition item up to (not including) the `,` or `)` that ends it.
    fn skip_definition_item(&mut self) {
        let mut depth = 0usize;
        while let Some(token) = self.state.current() {
            match token.token_type {
                TokenType::Go | TokenType::Semicolon if depth == 0 => return,
                TokenType::Comma if depth == 0 => return,
                TokenType::ParenOpen => depth += 1,
                TokenType::ParenClose => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                }
                TokenType::Keyword if depth == 0 => {
                    // ON DELETE CASCADE / ON UPDATE SET NULL are referential actions
                    if token.is_word("ON") && self.state.peek_is_keyword(1, "DELETE")
                        || token.is_word("ON") && self.state.peek_is_keyword(1, "UPDATE")
                    {
                        self.state.advance();
                        self.state.advance();
                        if self.state.is_keyword("SET") {
                            self.state.advance();
                        }
                        continue;
                    }
                    if self.state.is_statement_start() {
                        return;
                    }
                }
                _ => {}
            }
            self.state.advance();
        }
    }

    // ========================================================================
    // Shared
    // ========================================================================

    /// Any other CREATE / ALTER / DROP: record the object kind and name, then
    /// consume the rest of the statement.
    fn parse_other_ddl(
        &mut self,
        mut scope: ScopeContext,
        prelude: Prelude,
        kind: StatementKind,
        clause_key: &str,
    ) -> StatementChunk {
        scope.statement_type = kind;
        let mut chunk = create_chunk(&scope, &self.state, prelude, self.batch_index);
        if let Some(word) = self
            .state
            .current()
            .filter(|t| matches!(t.token_type, TokenType::Keyword | TokenType::Identifier))
        {
            chunk.ddl_object_type = Some(word.text.to_ascii_uppercase());
            self.state.advance();
            self.skip_if_exists();
            if let Some(name) = self.parse_qualified_name() {
                chunk.ddl_object_name = Some(name.name().to_string());
                chunk.ddl_object_schema = name.schema().map(str::to_string);
            }
        }
        self.finish_ddl(chunk, scope, clause_key)
    }

    fn set_ddl_object(&self, chunk: &mut StatementChunk, name: &QualifiedName, object_type: &str) {
        chunk.ddl_object_name = Some(name.name().to_string());
        chunk.ddl_object_schema = name.schema().map(str::to_string);
        chunk.ddl_object_type = Some(object_type.to_string());
    }

    fn skip_if_exists(&mut self) {
        if self.state.is_keyword("IF") && self.state.peek_is_keyword(1, "EXISTS") {
            self.state.advance();
            self.state.advance();
        }
    }

    fn live_temp_table_mut(&mut self, name: &str) -> Option<&mut TempTableInfo> {
        self.temp_tables.get_mut(name).filter(|info| !info.is_dropped())
    }

    /// Consume the rest of the statement, record its span under `clause_key` and
    /// finalize.
    fn finish_ddl(
        &mut self,
        mut chunk: StatementChunk,
        scope: ScopeContext,
        clause_key: &str,
    ) -> StatementChunk {
        self.state.consume_until_statement_end(0);
        let start = chunk.token_start_idx.unwrap_or_default();
        if let Some(span) = self.state.span_from(start) {
            record_clause(&mut chunk, clause_key, span);
        }
        finalize_chunk(&mut chunk, scope, &self.state);
        chunk
    }
}
