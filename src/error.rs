use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the compiler
pub type Result<T> = std::result::Result<T, Error>;

/// A position inside a declaration file, used to point at annotation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Error types for the compiler
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {}: {message}", file.display())]
    Parse { file: PathBuf, message: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A malformed `@group`, `@route` or `@code` line.
    #[error("{location}: {owner}: {message}")]
    Directive {
        location: Location,
        owner: String,
        message: String,
    },

    #[error("missing @route directive for {route}")]
    MissingRoute { route: String },

    #[error(
        "invalid method signature for {route}: {reason}; \
         expected fn(&self, ctx, &Request) -> Result<Response, Error>"
    )]
    Signature { route: String, reason: String },

    #[error("recursive schema {chain}; mark one of these structs with @schema to emit a reference")]
    RecursiveSchema { chain: String },

    #[error("unsupported type expression: {ty}")]
    UnsupportedType { ty: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}
