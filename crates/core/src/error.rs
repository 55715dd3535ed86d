//! Error types for the pdfprobe inspection engine.
//!
//! Only a handful of these ever reach a caller of the [`crate::api`]
//! functions: a buffer that is too short, a document whose structure could
//! not be recovered at all, an invalid argument or an I/O failure. The
//! remaining variants are used between components, where they are usually
//! turned into `None` plus a diagnostic note.

use thiserror::Error;

use crate::model::ObjectRef;

/// Primary error type for PDF parsing operations.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF object not found: {0}")]
    ObjectNotFound(ObjectRef),

    #[error("input of {len} bytes is too short to be a PDF document")]
    InputTooShort { len: usize },

    #[error("no valid xref table found and no objects could be recovered")]
    NoValidXref,

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
