//! Codec modules for stream decoding and the binary writers.
//!
//! - `checksum`: CRC-32 and Adler-32
//! - `deflate`: stored-block deflate and zlib framing
//! - `filters`: `/Filter` decoding with predictors

pub mod checksum;
pub mod deflate;
pub mod filters;

// Re-export main functions for convenience
pub use checksum::{adler32, crc32, Crc32};
pub use deflate::{deflate_stored, inflate_stored, zlib_stored, zlib_unstored};
pub use filters::{decode, filter_names, FilterOutput, FilterStatus};
