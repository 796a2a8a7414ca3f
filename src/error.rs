//! Crate-wide error taxonomy.
//!
//! Mirrors the kinds (not exception hierarchies) called out in the design:
//! parser/IO failures are fatal and propagate with `Result`; scanner and
//! evaluator are total functions and never produce an `SgrepError` directly,
//! they only accumulate counts on the owning `Engine`.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum SgrepError {
    /// Lexical or syntactic failure while compiling a query.
    Parse {
        file: String,
        line: u32,
        col: u32,
        window: String,
        message: String,
    },
    Lex { message: String },
    Io { path: Option<PathBuf>, message: String },
    /// Counted, non-fatal in the scanner; surfaced here only when a caller
    /// explicitly asks the engine to turn warnings into errors.
    Encoding { message: String },
    IndexCorruption { message: String },
    ResourceExhausted { message: String },
    InvalidOption { message: String },
    Config { message: String },
    /// Indicates a bug: an invariant the implementation itself is supposed
    /// to guarantee was violated.
    LogicInvariant { message: String },
}

impl fmt::Display for SgrepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SgrepError::Parse { file, line, col, window, message } => {
                write!(f, "{file}:{line}:{col}: {message} (near \"{window}\")")
            }
            SgrepError::Lex { message } => write!(f, "lexical error: {message}"),
            SgrepError::Io { path, message } => match path {
                Some(p) => write!(f, "I/O error on {}: {message}", p.display()),
                None => write!(f, "I/O error: {message}"),
            },
            SgrepError::Encoding { message } => write!(f, "encoding warning: {message}"),
            SgrepError::IndexCorruption { message } => write!(f, "corrupt index: {message}"),
            SgrepError::ResourceExhausted { message } => write!(f, "resource exhausted: {message}"),
            SgrepError::InvalidOption { message } => write!(f, "invalid option: {message}"),
            SgrepError::Config { message } => write!(f, "configuration error: {message}"),
            SgrepError::LogicInvariant { message } => write!(f, "internal invariant violated: {message}"),
        }
    }
}

impl std::error::Error for SgrepError {}

impl From<std::io::Error> for SgrepError {
    fn from(e: std::io::Error) -> Self {
        SgrepError::Io { path: None, message: e.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, SgrepError>;
