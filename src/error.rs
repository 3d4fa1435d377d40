//! Error taxonomy for the core.
//!
//! Nothing here is surfaced to the client as a `publishDiagnostics` entry —
//! compile errors flow through [`crate::frontend::Diagnostic`] instead. These
//! variants cover protocol- and buffer-level faults only.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    #[error("position ({line}, {column}) is out of bounds for the buffer")]
    OutOfBounds { line: u32, column: u32 },

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("malformed request params: {0}")]
    InvalidParams(String),

    #[error("uri is not a file:// uri: {0}")]
    UnsupportedUri(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
