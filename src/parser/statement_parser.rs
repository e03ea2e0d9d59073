//! Statement dispatch and the token-walking helpers every handler shares
//!
//! The driver walks the token array statement by statement. Each statement is
//! dispatched on its leading keyword to a handler (`select_parser`,
//! `insert_parser`, ...), all of which are `impl` blocks on [`StatementParser`].
//! Handlers never fail: a missing token ends the clause being parsed and the
//! chunk is returned with whatever was collected.

use tracing::{debug, trace};

use super::base_statement::Prelude;
use super::identifier_utils::{
    alias_text, is_alias_token, is_name_token, normalize_identifier, QualifiedName,
};
use super::keywords::{SET_OPERATORS, STATEMENT_STARTERS};
use super::parser_state::ParserState;
use super::scope::ScopeContext;
use crate::model::{
    Position, Span, StatementChunk, StatementKind, TableReference, TempTableRegistry, Token, TokenType,
};

/// Keyword a statement can begin with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LeadingKeyword {
    Select,
    Insert,
    Update,
    Delete,
    Merge,
    Create,
    Alter,
    Drop,
    Declare,
    Truncate,
    Set,
    Exec,
    With,
}

impl LeadingKeyword {
    pub(super) fn from_token(token: &Token) -> Option<Self> {
        // sp_who / DBCC without EXEC
        if token.token_type == TokenType::SystemProcedure {
            return Some(LeadingKeyword::Exec);
        }
        if token.token_type != TokenType::Keyword {
            return None;
        }
        let keyword = match token.text.to_ascii_uppercase().as_str() {
            "SELECT" => LeadingKeyword::Select,
            "INSERT" => LeadingKeyword::Insert,
            "UPDATE" => LeadingKeyword::Update,
            "DELETE" => LeadingKeyword::Delete,
            "MERGE" => LeadingKeyword::Merge,
            "CREATE" => LeadingKeyword::Create,
            "ALTER" => LeadingKeyword::Alter,
            "DROP" => LeadingKeyword::Drop,
            "DECLARE" => LeadingKeyword::Declare,
            "TRUNCATE" => LeadingKeyword::Truncate,
            "SET" => LeadingKeyword::Set,
            "EXEC" | "EXECUTE" => LeadingKeyword::Exec,
            "WITH" => LeadingKeyword::With,
            _ => return None,
        };
        Some(keyword)
    }

    /// Statements a CTE prefix can be attached to.
    pub(super) fn accepts_cte_prefix(self) -> bool {
        matches!(
            self,
            LeadingKeyword::Select
                | LeadingKeyword::Insert
                | LeadingKeyword::Update
                | LeadingKeyword::Delete
                | LeadingKeyword::Merge
        )
    }
}

/// Where a clause body stops.
///
/// Bodies always stop at GO, `;`, an unmatched `)` and a set operator at depth 0.
#[derive(Debug, Clone, Copy)]
pub(super) struct ClauseStop<'s> {
    /// Keywords that end the clause at depth 0
    pub keywords: &'s [&'s str],
    /// Statement-starting keywords that end the clause at depth 0
    pub breakers: &'s [&'s str],
    pub at_comma: bool,
}

impl<'s> ClauseStop<'s> {
    pub(super) const fn keywords(keywords: &'s [&'s str]) -> Self {
        Self {
            keywords,
            breakers: STATEMENT_STARTERS,
            at_comma: false,
        }
    }

    pub(super) const fn with_breakers(mut self, breakers: &'s [&'s str]) -> Self {
        self.breakers = breakers;
        self
    }

    pub(super) const fn at_comma(mut self) -> Self {
        self.at_comma = true;
        self
    }
}

/// Recursive-descent statement parser over one script's tokens.
pub(crate) struct StatementParser<'a> {
    pub(super) state: ParserState<'a>,
    pub(super) temp_tables: TempTableRegistry,
    pub(super) batch_index: usize,
}

impl<'a> StatementParser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            state: ParserState::new(tokens),
            temp_tables: TempTableRegistry::new(),
            batch_index: 0,
        }
    }

    /// Parse every statement in the script.
    pub fn parse_script(mut self) -> (Vec<StatementChunk>, TempTableRegistry) {
        let mut chunks = Vec::new();

        while let Some(token) = self.state.current() {
            match token.token_type {
                TokenType::Go => self.consume_go(),
                TokenType::Semicolon => {
                    self.state.advance();
                }
                _ => {
                    let before = self.state.pos();
                    if let Some(chunk) = self.parse_statement() {
                        trace!(
                            kind = chunk.statement_type.as_str(),
                            tokens = self.state.chunk_tokens().len(),
                            "Parsed statement"
                        );
                        chunks.push(chunk);
                    } else {
                        trace!(token = %token.text, line = token.line, "Skipping token");
                    }
                    if self.state.pos() == before {
                        self.state.advance();
                    }
                }
            }
        }

        debug!(
            chunks = chunks.len(),
            batches = self.batch_index + 1,
            temp_tables = self.temp_tables.len(),
            "Parsed script"
        );
        (chunks, self.temp_tables)
    }

    /// `GO [count]` ends the current batch.
    fn consume_go(&mut self) {
        let Some(go) = self.state.advance() else {
            return;
        };
        if self
            .state
            .current()
            .is_some_and(|t| t.token_type == TokenType::Number && t.line == go.line)
        {
            self.state.advance();
        }
        self.batch_index += 1;
        debug!(batch = self.batch_index, line = go.line, "Batch separator");
    }

    /// Parse the statement at the current token, if it starts with a known keyword.
    fn parse_statement(&mut self) -> Option<StatementChunk> {
        let token = self.state.current()?;
        let leading = LeadingKeyword::from_token(token)?;
        let start = self.state.mark_chunk_start();
        debug!(
            keyword = %token.text,
            line = token.line,
            batch = self.batch_index,
            "Parsing statement"
        );
        Some(self.dispatch(
            leading,
            ScopeContext::new(StatementKind::Select),
            Prelude::at(start),
        ))
    }

    pub(super) fn dispatch(
        &mut self,
        leading: LeadingKeyword,
        scope: ScopeContext,
        prelude: Prelude,
    ) -> StatementChunk {
        match leading {
            LeadingKeyword::Select => self.parse_select(scope, prelude),
            LeadingKeyword::Insert => self.parse_insert(scope, prelude),
            LeadingKeyword::Update => self.parse_update(scope, prelude),
            LeadingKeyword::Delete => self.parse_delete(scope, prelude),
            LeadingKeyword::Merge => self.parse_merge(scope, prelude),
            LeadingKeyword::Create => self.parse_create(scope, prelude),
            LeadingKeyword::Alter => self.parse_alter(scope, prelude),
            LeadingKeyword::Drop => self.parse_drop(scope, prelude),
            LeadingKeyword::Declare => self.parse_declare(scope, prelude),
            LeadingKeyword::Truncate => self.parse_truncate(scope, prelude),
            LeadingKeyword::Set => self.parse_set(scope, prelude),
            LeadingKeyword::Exec => self.parse_exec(scope, prelude),
            LeadingKeyword::With => self.parse_with_statement(prelude.start),
        }
    }

    // ========================================================================
    // Names and aliases
    // ========================================================================

    /// Parse a dotted name of up to four parts.
    ///
    /// `db..t` yields an empty schema part; a trailing dot (`dbo.` while typing)
    /// yields an empty object name.
    pub(super) fn parse_qualified_name(&mut self) -> Option<QualifiedName> {
        let first = self.state.current().filter(|t| is_name_token(t))?;
        self.state.advance();
        let mut parts = vec![normalize_identifier(&first.text)];

        while self.state.is_type(TokenType::Dot) && parts.len() < 4 {
            self.state.advance();
            if self.state.is_type(TokenType::Dot) {
                parts.push(String::new());
                continue;
            }
            match self.state.current() {
                Some(t) if is_name_token(t) || t.token_type == TokenType::Keyword => {
                    parts.push(normalize_identifier(&t.text));
                    self.state.advance();
                }
                _ => {
                    parts.push(String::new());
                    break;
                }
            }
        }

        Some(QualifiedName { parts })
    }

    /// Build a table reference, attaching known columns of live temp tables,
    /// table variables and CTEs.
    pub(super) fn table_reference(
        &self,
        name: &QualifiedName,
        scope: &ScopeContext,
    ) -> TableReference {
        let table_name = name.name().to_string();
        let columns = if table_name.starts_with('#') || table_name.starts_with('@') {
            self.temp_tables.live(&table_name).map(|t| t.column_names())
        } else if name.part_count() == 1 {
            scope.cte_columns(&table_name).map(<[String]>::to_vec)
        } else {
            None
        };
        TableReference {
            schema: name.schema().map(str::to_string),
            database: name.database().map(str::to_string),
            columns,
            ..TableReference::named(table_name)
        }
    }

    /// `[AS] alias`
    pub(super) fn parse_optional_alias(&mut self) -> Option<String> {
        if self.state.is_keyword("AS") {
            self.state.advance();
            let token = self.state.current().filter(|t| is_alias_token(t, true))?;
            self.state.advance();
            return Some(alias_text(token));
        }
        let token = self.state.current().filter(|t| is_alias_token(t, false))?;
        self.state.advance();
        Some(alias_text(token))
    }

    /// `(a, b, c)` name list; `None` if not at `(`.
    pub(super) fn parse_name_list(&mut self) -> Option<Vec<String>> {
        if !self.state.is_type(TokenType::ParenOpen) {
            return None;
        }
        self.state.advance();
        let mut names = Vec::new();
        while let Some(token) = self.state.current() {
            match token.token_type {
                TokenType::ParenClose => {
                    self.state.advance();
                    break;
                }
                TokenType::Comma => {
                    self.state.advance();
                }
                _ if is_name_token(token) => {
                    names.push(normalize_identifier(&token.text));
                    self.state.advance();
                }
                _ => break,
            }
        }
        Some(names)
    }

    /// `WITH (NOLOCK, ...)` table hints.
    pub(super) fn skip_table_hints(&mut self) {
        if self.state.is_keyword("WITH") && self.state.peek_is_type(1, TokenType::ParenOpen) {
            self.state.advance();
            self.state.skip_paren_contents();
        }
    }

    // ========================================================================
    // Subqueries and clause bodies
    // ========================================================================

    /// At `(` directly followed by SELECT.
    pub(super) fn is_subquery_start(&self) -> bool {
        self.state.is_type(TokenType::ParenOpen) && self.state.peek_is_keyword(1, "SELECT")
    }

    pub(super) fn is_set_operator(&self) -> bool {
        self.state
            .current()
            .is_some_and(|t| t.token_type == TokenType::Keyword)
            && self.state.is_any_keyword(SET_OPERATORS)
    }

    /// Parse `( SELECT ... )` as a nested chunk with its own child scope.
    ///
    /// Positioned at `(`; consumes through the matching `)` when present.
    pub(super) fn parse_subquery(&mut self, scope: &ScopeContext) -> StatementChunk {
        self.state.advance();
        let start = self.state.pos();
        let chunk = self.parse_select(scope.child(StatementKind::Select), Prelude::at(start));
        // Anything the SELECT grammar left behind still belongs to the parentheses
        self.state.consume_until_statement_end(0);
        if self.state.is_type(TokenType::ParenClose) {
            self.state.advance();
        }
        trace!(
            line = chunk.start_line,
            tables = chunk.tables.len(),
            "Parsed subquery"
        );
        chunk
    }

    /// Consume a clause body, parsing any `(SELECT ...)` found at any depth into
    /// `scope`.
    ///
    /// Stop keywords inside a `CASE ... END` expression do not end the body.
    pub(super) fn consume_clause_body(&mut self, scope: &mut ScopeContext, stop: ClauseStop<'_>) {
        let mut depth = 0usize;
        let mut case_depth = 0usize;
        while let Some(token) = self.state.current() {
            match token.token_type {
                TokenType::Go | TokenType::Semicolon => break,
                TokenType::Comma if depth == 0 && stop.at_comma => break,
                TokenType::ParenOpen if self.is_subquery_start() => {
                    let subquery = self.parse_subquery(scope);
                    scope.add_subquery(subquery);
                    continue;
                }
                TokenType::ParenOpen => depth += 1,
                TokenType::ParenClose => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                TokenType::Keyword | TokenType::Identifier if depth == 0 => {
                    if token.is_word("CASE") {
                        case_depth += 1;
                    } else if token.is_word("END") && case_depth > 0 {
                        case_depth -= 1;
                    } else if case_depth == 0
                        && (stop.keywords.iter().any(|kw| token.is_word(kw))
                            || self.is_breaker(stop.breakers)
                            || self.is_set_operator()
                            || self.state.is_block_end())
                    {
                        break;
                    }
                }
                _ => {}
            }
            self.state.advance();
        }
    }

    fn is_breaker(&self, breakers: &[&str]) -> bool {
        let Some(token) = self.state.current() else {
            return false;
        };
        token.token_type == TokenType::Keyword
            && breakers.iter().any(|kw| token.is_word(kw))
            && !(token.is_word("WITH") && self.state.peek_is_type(1, TokenType::ParenOpen))
            && !self.state.after_dot()
    }

    /// Consume `keyword_count` keywords, then the clause body, and return the span
    /// from the first keyword through the body.
    pub(super) fn parse_keyword_clause(
        &mut self,
        scope: &mut ScopeContext,
        keyword_count: usize,
        stop: ClauseStop<'_>,
    ) -> Option<Span> {
        let start = self.state.pos();
        for _ in 0..keyword_count {
            self.state.advance();
        }
        self.consume_clause_body(scope, stop);
        self.state.span_from(start)
    }
}

/// Source text of `tokens`, with a single space wherever the source had a gap.
pub(super) fn join_tokens<'t>(tokens: impl IntoIterator<Item = &'t Token>) -> String {
    let mut text = String::new();
    let mut previous_end = None;
    for token in tokens.into_iter().filter(|t| !t.is_comment()) {
        if let Some(end) = previous_end {
            let Position { line, col } = end;
            if token.line != line || token.col != col + 1 {
                text.push(' ');
            }
        }
        text.push_str(&token.text);
        previous_end = Some(token.end());
    }
    text
}
