//! Minimal PNG encoder for 1-bit grayscale images.
//!
//! Image data goes into a single IDAT chunk as zlib stored blocks, so no
//! compressor is involved.

use byteorder::{BigEndian, WriteBytesExt};

use crate::codec::checksum::Crc32;
use crate::codec::deflate::zlib_stored;

const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Which source sample value is black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitPolarity {
    /// 0 = black, 1 = white; what PNG grayscale expects.
    ZeroIsBlack,
    OneIsBlack,
}

/// Encode packed 1-bit rows (`ceil(width / 8)` bytes each, MSB first).
///
/// `None` when `data` holds fewer than `height` rows. Bytes past the last
/// row are ignored; bits past `width` are zeroed.
pub fn encode_bilevel(width: u32, height: u32, data: &[u8], polarity: BitPolarity) -> Option<Vec<u8>> {
    let row_bytes = (width as usize).div_ceil(8);
    let image_bytes = row_bytes.checked_mul(height as usize)?;
    if row_bytes == 0 || image_bytes > data.len() {
        return None;
    }
    let pad_mask = match width % 8 {
        0 => 0xFF,
        used => 0xFFu8 << (8 - used),
    };

    let mut raw = Vec::with_capacity(image_bytes + height as usize);
    for row in data[..image_bytes].chunks_exact(row_bytes) {
        raw.push(0); // filter type None
        for (i, &byte) in row.iter().enumerate() {
            let byte = match polarity {
                BitPolarity::ZeroIsBlack => byte,
                BitPolarity::OneIsBlack => !byte,
            };
            let byte = if i + 1 == row_bytes { byte & pad_mask } else { byte };
            raw.push(byte);
        }
    }

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    // bit depth 1, grayscale, deflate, adaptive filtering, no interlace
    ihdr.extend_from_slice(&[1, 0, 0, 0, 0]);

    let mut out = Vec::with_capacity(raw.len() + 64);
    out.extend_from_slice(&SIGNATURE);
    write_chunk(&mut out, b"IHDR", &ihdr);
    write_chunk(&mut out, b"IDAT", &zlib_stored(&raw));
    write_chunk(&mut out, b"IEND", &[]);
    Some(out)
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    let len = u32::try_from(data.len()).unwrap_or(u32::MAX);
    // writes into a Vec cannot fail
    let _ = out.write_u32::<BigEndian>(len);
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc = Crc32::new();
    crc.update(kind);
    crc.update(data);
    let _ = out.write_u32::<BigEndian>(crc.finish());
}
