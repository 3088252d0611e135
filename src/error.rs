use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::ir::Kind;

/// Fatal errors of a schema pass. Any of these aborts the pass and no
/// Document is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("syntax error: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
    #[error("type of `{field}` is not consistent: declared {declared}, found {found}")]
    TypeConsistency {
        field: String,
        declared: Kind,
        found: Kind,
    },
    #[error("unknown type keyword {keyword} for `{field}`")]
    UnknownTypeKeyword { field: String, keyword: String },
    #[error("structural error: {0}")]
    Structural(String),
}

impl SchemaError {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(error: serde_json::Error) -> Self {
        Self::Syntax {
            message: error.to_string(),
            line: error.line(),
            column: error.column(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read type mapping {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid type mapping at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("array template `{template}` has no `{{}}` element placeholder")]
    MissingPlaceholder { template: String },
}

/// Non-fatal findings recorded during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnsupportedKeywordSkip { keyword: String, field: String },
    UnresolvedReference { class: String, field: String, target: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedKeywordSkip { keyword, field } => {
                write!(f, "skipping unsupported keyword `{keyword}` for `{field}`")
            }
            Self::UnresolvedReference { class, field, target } => {
                write!(f, "`{class}.{field}` references `{target}`, which is not declared in this schema")
            }
        }
    }
}
