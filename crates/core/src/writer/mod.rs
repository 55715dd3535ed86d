//! Output formats.
//!
//! - `zip` - STORE-only archives for exported resources
//! - `png` - 1-bit grayscale images
//! - `pdf` - single-revision PDF files for the rewrite tools

pub mod pdf;
pub mod png;
pub mod zip;

pub use pdf::{write_value, PdfWriter};
pub use png::{encode_bilevel, BitPolarity};
pub use zip::{NameDisambiguator, ZipEntry, ZipWriter};
