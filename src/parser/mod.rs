//! T-SQL tokenizing and statement parsing

pub mod identifier_utils;
pub mod keywords;

mod base_statement;
mod cte_parser;
mod ddl_parser;
mod delete_parser;
mod from_clause;
mod insert_parser;
mod merge_parser;
mod offload;
mod parameters;
mod parser_state;
mod scope;
mod select_parser;
mod set_exec_parser;
mod statement_parser;
mod tokenizer;
mod tsql_parser;
mod update_parser;

pub use keywords::{is_keyword, is_statement_starter, is_system_procedure, keyword_category};
pub use offload::{tokenize_on_worker, tokenize_with_timeout, OffloadHandle, DEFAULT_OFFLOAD_TIMEOUT};
pub use parameters::{classify_variable, extract_parameters};
pub use tokenizer::{tokenize, Tokenizer};
pub use tsql_parser::{
    parse, parse_script_file, parse_script_files, parse_tokens, parse_with_options, read_script,
    ParseOptions, ParseResult, ScriptAnalysis, DEFAULT_OFFLOAD_THRESHOLD,
};
