//! Data model shared by the tokenizer, the statement parsers and their consumers

mod chunk;
mod temp_table;
mod token;

pub use chunk::{
    find_chunk_at, ColumnInfo, CteInfo, ParameterInfo, Position, Span, StatementChunk,
    StatementKind, TableReference,
};
pub use temp_table::{ColumnDef, TempTableInfo, TempTableRegistry};
pub use token::{KeywordCategory, Token, TokenType};
