//! Stored (uncompressed) deflate blocks and their zlib wrapping.
//!
//! Only `BTYPE=00` is produced or accepted. Compressed input goes through
//! [`super::filters`], which uses `flate2`.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use super::checksum::adler32;
use crate::error::{PdfError, Result};

const MAX_STORED: usize = 0xFFFF;

/// Encode `data` as a sequence of stored deflate blocks.
pub fn deflate_stored(data: &[u8]) -> Vec<u8> {
    let blocks = data.len().div_ceil(MAX_STORED).max(1);
    let mut out = Vec::with_capacity(data.len() + blocks * 5);
    let mut chunks = data.chunks(MAX_STORED).peekable();

    if chunks.peek().is_none() {
        write_block(&mut out, &[], true);
        return out;
    }
    while let Some(chunk) = chunks.next() {
        write_block(&mut out, chunk, chunks.peek().is_none());
    }
    out
}

fn write_block(out: &mut Vec<u8>, chunk: &[u8], last: bool) {
    let len = chunk.len() as u16;
    // BFINAL in bit 0, BTYPE=00, padded to the byte boundary
    out.push(u8::from(last));
    // writes into a Vec cannot fail
    let _ = out.write_u16::<LittleEndian>(len);
    let _ = out.write_u16::<LittleEndian>(!len);
    out.extend_from_slice(chunk);
}

/// Wrap stored blocks in a zlib stream (header plus Adler-32 trailer).
pub fn zlib_stored(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 16);
    // CM=8, CINFO=7, FLEVEL=0; FCHECK makes the header a multiple of 31
    out.extend_from_slice(&[0x78, 0x01]);
    out.extend(deflate_stored(data));
    let _ = out.write_u32::<BigEndian>(adler32(data));
    out
}

/// Decode a deflate stream made only of stored blocks.
pub fn inflate_stored(data: &[u8]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(data);
    let mut out = Vec::new();
    loop {
        let header = cursor.read_u8().map_err(|_| PdfError::UnexpectedEof)?;
        let last = header & 1 != 0;
        let btype = (header >> 1) & 0b11;
        if btype != 0 {
            return Err(PdfError::DecodeError(format!(
                "unsupported deflate block type {btype}"
            )));
        }
        let len = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| PdfError::UnexpectedEof)?;
        let nlen = cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| PdfError::UnexpectedEof)?;
        if len != !nlen {
            return Err(PdfError::DecodeError("stored block LEN/NLEN mismatch".into()));
        }
        let start = out.len();
        out.resize(start + usize::from(len), 0);
        cursor
            .read_exact(&mut out[start..])
            .map_err(|_| PdfError::UnexpectedEof)?;
        if last {
            return Ok(out);
        }
    }
}

/// Decode a zlib stream whose body is stored blocks, checking Adler-32.
pub fn zlib_unstored(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 6 {
        return Err(PdfError::UnexpectedEof);
    }
    let (cmf, flg) = (data[0], data[1]);
    if cmf & 0x0F != 8 || (u16::from(cmf) * 256 + u16::from(flg)) % 31 != 0 {
        return Err(PdfError::DecodeError("invalid zlib header".into()));
    }
    if flg & 0x20 != 0 {
        return Err(PdfError::DecodeError("preset dictionaries are not supported".into()));
    }
    let body = &data[2..data.len() - 4];
    let out = inflate_stored(body)?;
    let mut trailer = &data[data.len() - 4..];
    let expected = trailer
        .read_u32::<BigEndian>()
        .map_err(|_| PdfError::UnexpectedEof)?;
    if adler32(&out) != expected {
        return Err(PdfError::DecodeError("Adler-32 mismatch".into()));
    }
    Ok(out)
}
