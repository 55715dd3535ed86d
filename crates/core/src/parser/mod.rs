//! PDF parsing modules.
//!
//! - `lexer`: primitive tokenizer
//! - `object_parser`: tokens to [`crate::model::PdfValue`], indirect objects
//! - `content`: content stream operators

pub mod content;
pub mod lexer;
pub mod object_parser;

// Re-export main types for convenience
pub use content::{parse_ops, ContentParser};
pub use lexer::{tokenize, Keyword, Lexer, Token};
pub use object_parser::{parse_value, IndirectObject, ObjectParser};
