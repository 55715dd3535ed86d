//! PDF model types.
//!
//! - `objects` - the closed [`PdfValue`] union, streams and references
//! - `content` - content-stream operations

pub mod content;
pub mod objects;

// Re-export main types for convenience
pub use content::{ContentOp, InlineImage, Operand};
pub use objects::{name, Dict, DictExt, Number, ObjectRef, PdfValue, Stream, NULL};
