//! Reserved-word classification tables
//!
//! The tables are built once on first use and never mutated afterwards. When a
//! word appears in more than one category the first category in
//! [`CATEGORY_PRIORITY`] wins (e.g. `LEFT` is a clause keyword, not a function;
//! `ELSE` is a statement keyword, not an operator).

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::KeywordCategory;

const STATEMENT_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "CREATE", "ALTER", "DROP", "DECLARE", "SET",
    "EXEC", "EXECUTE", "TRUNCATE", "WITH", "USE", "IF", "ELSE", "WHILE", "BEGIN", "END", "RETURN",
    "PRINT", "GRANT", "REVOKE", "DENY", "RAISERROR", "THROW", "TRY", "CATCH", "COMMIT",
    "ROLLBACK", "SAVE", "BREAK", "CONTINUE", "GOTO", "WAITFOR", "OPEN", "CLOSE", "DEALLOCATE",
    "BULK", "BACKUP", "RESTORE", "CHECKPOINT", "KILL", "RECONFIGURE", "SHUTDOWN", "REVERT",
    "READTEXT", "WRITETEXT", "UPDATETEXT", "SETUSER",
];

const CLAUSE_KEYWORDS: &[&str] = &[
    "FROM", "WHERE", "GROUP", "BY", "HAVING", "ORDER", "INTO", "VALUES", "JOIN", "INNER", "LEFT",
    "RIGHT", "FULL", "OUTER", "CROSS", "APPLY", "ON", "USING", "UNION", "INTERSECT", "EXCEPT",
    "ALL", "DISTINCT", "TOP", "AS", "OUTPUT", "OPTION", "FOR", "WHEN", "THEN", "MATCHED", "PIVOT",
    "UNPIVOT", "OFFSET", "FETCH", "LIMIT", "TABLESAMPLE", "WINDOW", "BROWSE", "COMPUTE",
];

const FUNCTION_KEYWORDS: &[&str] = &[
    "COUNT", "COUNT_BIG", "SUM", "AVG", "MIN", "MAX", "STDEV", "VAR", "CAST", "CONVERT",
    "TRY_CAST", "TRY_CONVERT", "PARSE", "TRY_PARSE", "COALESCE", "ISNULL", "NULLIF", "IIF",
    "CHOOSE", "GETDATE", "GETUTCDATE", "SYSDATETIME", "SYSUTCDATETIME", "SYSDATETIMEOFFSET",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "SESSION_USER", "SYSTEM_USER", "DATEADD", "DATEDIFF",
    "DATEDIFF_BIG", "DATEPART", "DATENAME", "DATEFROMPARTS", "EOMONTH", "YEAR", "MONTH", "DAY",
    "LEN", "DATALENGTH", "SUBSTRING", "UPPER", "LOWER", "LTRIM", "RTRIM", "TRIM", "REPLACE",
    "REPLICATE", "REVERSE", "STUFF", "CHARINDEX", "PATINDEX", "CONCAT", "CONCAT_WS",
    "STRING_AGG", "STRING_SPLIT", "FORMAT", "QUOTENAME", "SPACE", "STR", "ASCII", "CHAR_LENGTH",
    "UNICODE", "ROUND", "ABS", "CEILING", "FLOOR", "POWER", "SQRT", "SQUARE", "SIGN", "RAND",
    "ROW_NUMBER", "RANK", "DENSE_RANK", "NTILE", "LAG", "LEAD", "FIRST_VALUE", "LAST_VALUE",
    "OVER", "PARTITION", "NEWID", "NEWSEQUENTIALID", "SCOPE_IDENTITY", "IDENT_CURRENT",
    "OBJECT_ID", "OBJECT_NAME", "DB_ID", "DB_NAME", "SCHEMA_NAME", "USER_NAME", "SUSER_SNAME",
    "HOST_NAME", "APP_NAME", "ERROR_MESSAGE", "ERROR_NUMBER", "ERROR_LINE", "ERROR_SEVERITY",
    "ERROR_STATE", "ERROR_PROCEDURE", "JSON_VALUE", "JSON_QUERY", "JSON_MODIFY", "ISJSON",
    "OPENJSON", "OPENQUERY", "OPENROWSET", "OPENXML", "CHECKSUM", "BINARY_CHECKSUM", "HASHBYTES",
    "ISNUMERIC", "ISDATE", "CONTAINS", "FREETEXT", "CONTAINSTABLE", "FREETEXTTABLE", "GROUPING",
];

const DATATYPE_KEYWORDS: &[&str] = &[
    "INT", "INTEGER", "BIGINT", "SMALLINT", "TINYINT", "BIT", "DECIMAL", "DEC", "NUMERIC", "MONEY",
    "SMALLMONEY", "FLOAT", "REAL", "DATE", "DATETIME", "DATETIME2", "DATETIMEOFFSET",
    "SMALLDATETIME", "TIME", "CHAR", "VARCHAR", "NCHAR", "NVARCHAR", "TEXT", "NTEXT", "BINARY",
    "VARBINARY", "IMAGE", "UNIQUEIDENTIFIER", "XML", "SQL_VARIANT", "CURSOR", "TIMESTAMP",
    "ROWVERSION", "HIERARCHYID", "GEOGRAPHY", "GEOMETRY", "SYSNAME",
];

const OPERATOR_KEYWORDS: &[&str] = &[
    "AND", "OR", "NOT", "IN", "IS", "NULL", "LIKE", "BETWEEN", "EXISTS", "ANY", "SOME", "ESCAPE",
    "CASE",
];

const CONSTRAINT_KEYWORDS: &[&str] = &[
    "PRIMARY", "KEY", "FOREIGN", "REFERENCES", "UNIQUE", "CHECK", "DEFAULT", "CONSTRAINT",
    "IDENTITY", "CLUSTERED", "NONCLUSTERED", "CASCADE", "NOCHECK",
];

const MODIFIER_KEYWORDS: &[&str] = &[
    "ASC", "DESC", "NOLOCK", "READUNCOMMITTED", "READCOMMITTED", "REPEATABLEREAD", "SERIALIZABLE",
    "HOLDLOCK", "UPDLOCK", "ROWLOCK", "PAGLOCK", "TABLOCK", "TABLOCKX", "XLOCK", "NOWAIT",
    "READPAST", "RECOMPILE", "TIES", "PERCENT", "COLLATE", "NOCOUNT", "ANSI_NULLS",
    "QUOTED_IDENTIFIER", "XACT_ABORT", "OFF", "ROWS", "ROW", "NEXT", "ONLY", "FIRST", "LAST",
    "PRECEDING", "FOLLOWING", "UNBOUNDED", "CURRENT", "PERSISTED", "SPARSE", "ROWGUIDCOL",
    "MAXDOP", "LOOP", "HASH", "REMOTE", "FORCESEEK", "FORCESCAN", "ENCRYPTION", "SCHEMABINDING",
    "RETURNS", "READONLY", "VARYING", "MAX",
];

const MISC_KEYWORDS: &[&str] = &[
    "TABLE", "VIEW", "PROCEDURE", "PROC", "FUNCTION", "TRIGGER", "INDEX", "SCHEMA", "DATABASE",
    "COLUMN", "ADD", "TRAN", "TRANSACTION", "OF", "TO", "SYNONYM", "SEQUENCE",
    "TYPE", "USER", "LOGIN", "ROLE", "STATISTICS", "EXTERNAL", "IDENTITY_INSERT", "XMLNAMESPACES",
    "RAW", "AUTO", "PATH", "JSON", "ELEMENTS", "ROOT", "INSTEAD", "AFTER",
];

const GLOBAL_VARIABLES: &[&str] = &[
    "@@ROWCOUNT", "@@ERROR", "@@IDENTITY", "@@TRANCOUNT", "@@VERSION", "@@SPID", "@@SERVERNAME",
    "@@SERVICENAME", "@@FETCH_STATUS", "@@DATEFIRST", "@@LANGUAGE", "@@LANGID", "@@LOCK_TIMEOUT",
    "@@MAX_CONNECTIONS", "@@NESTLEVEL", "@@OPTIONS", "@@PROCID", "@@DBTS", "@@CURSOR_ROWS",
    "@@TEXTSIZE", "@@CONNECTIONS", "@@CPU_BUSY", "@@IDLE", "@@IO_BUSY", "@@PACKET_ERRORS",
];

const SYSTEM_PROCEDURES: &[&str] = &[
    "SP_EXECUTESQL", "SP_HELP", "SP_HELPTEXT", "SP_HELPINDEX", "SP_RENAME", "SP_WHO", "SP_WHO2",
    "SP_COLUMNS", "SP_TABLES", "SP_CONFIGURE", "SP_ADDEXTENDEDPROPERTY",
    "SP_UPDATEEXTENDEDPROPERTY", "SP_DROPEXTENDEDPROPERTY", "SP_SPACEUSED", "SP_LOCK",
    "SP_DEPENDS", "SP_GETAPPLOCK", "SP_RELEASEAPPLOCK", "SP_SET_SESSION_CONTEXT",
    "SP_DESCRIBE_FIRST_RESULT_SET", "SP_RECOMPILE", "SP_REFRESHVIEW", "XP_CMDSHELL",
    "XP_FILEEXIST", "XP_READERRORLOG", "DBCC",
];

/// Category tables in first-match-wins order.
const CATEGORY_PRIORITY: &[(KeywordCategory, &[&str])] = &[
    (KeywordCategory::Statement, STATEMENT_KEYWORDS),
    (KeywordCategory::Clause, CLAUSE_KEYWORDS),
    (KeywordCategory::Function, FUNCTION_KEYWORDS),
    (KeywordCategory::Datatype, DATATYPE_KEYWORDS),
    (KeywordCategory::Operator, OPERATOR_KEYWORDS),
    (KeywordCategory::Constraint, CONSTRAINT_KEYWORDS),
    (KeywordCategory::Modifier, MODIFIER_KEYWORDS),
    (KeywordCategory::Misc, MISC_KEYWORDS),
    (KeywordCategory::GlobalVariable, GLOBAL_VARIABLES),
    (KeywordCategory::SystemProcedure, SYSTEM_PROCEDURES),
];

static KEYWORD_TABLE: LazyLock<HashMap<&'static str, KeywordCategory>> = LazyLock::new(|| {
    let mut table = HashMap::with_capacity(512);
    for (category, words) in CATEGORY_PRIORITY {
        for word in *words {
            table.entry(*word).or_insert(*category);
        }
    }
    table
});

static SYSTEM_PROCEDURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:sp|xp)_[A-Za-z0-9_]+$").expect("Invalid system procedure regex")
});

/// Keywords that begin a new statement when seen at paren depth 0.
pub const STATEMENT_STARTERS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "MERGE", "CREATE", "ALTER", "DROP", "DECLARE", "SET",
    "EXEC", "EXECUTE", "TRUNCATE", "WITH", "USE", "IF", "WHILE", "BEGIN", "RETURN", "PRINT",
    "GRANT", "REVOKE", "DENY", "RAISERROR", "THROW", "COMMIT", "ROLLBACK", "WAITFOR", "OPEN",
    "CLOSE", "DEALLOCATE",
];

/// Keywords that genuinely start a new statement inside a MERGE body. UPDATE, DELETE
/// and INSERT are WHEN-clause actions there, not new statements.
pub const MERGE_STATEMENT_BREAKERS: &[&str] = &[
    "SELECT", "CREATE", "ALTER", "DROP", "TRUNCATE", "WITH", "EXEC", "EXECUTE", "DECLARE",
    "MERGE", "SET",
];

/// Set operators that join SELECT branches.
pub const SET_OPERATORS: &[&str] = &["UNION", "INTERSECT", "EXCEPT"];

/// Look up the category of a reserved word (case-insensitive).
pub fn keyword_category(word: &str) -> Option<KeywordCategory> {
    if word.bytes().any(|b| b.is_ascii_lowercase()) {
        KEYWORD_TABLE.get(word.to_ascii_uppercase().as_str()).copied()
    } else {
        KEYWORD_TABLE.get(word).copied()
    }
}

/// Whether `word` is a reserved word of any category.
#[inline]
pub fn is_keyword(word: &str) -> bool {
    keyword_category(word).is_some()
}

/// Whether `word` names a system procedure: a known entry, an `sp_*`/`xp_*` name, or DBCC.
pub fn is_system_procedure(word: &str) -> bool {
    keyword_category(word) == Some(KeywordCategory::SystemProcedure)
        || SYSTEM_PROCEDURE_RE.is_match(word)
}

/// Whether `word` starts a statement at the top level.
#[inline]
pub fn is_statement_starter(word: &str) -> bool {
    STATEMENT_STARTERS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(word))
}
