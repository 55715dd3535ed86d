//! pdfprobe - structural inspection of PDF files.
//!
//! The engine parses cross-reference data, resolves indirect objects on
//! demand and walks the object graph to report on a document's structure. It
//! never renders: content streams are tokenized, not executed.

pub mod analysis;
pub mod api;
pub mod codec;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;
pub mod rewrite;
pub mod utils;
pub mod writer;

pub use bytes::Bytes;
pub use document::DocumentContext;
pub use error::{PdfError, Result};
