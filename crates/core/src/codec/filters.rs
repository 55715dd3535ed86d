//! Stream filter decoding.
//!
//! Only `FlateDecode` is decoded, alone or chained with itself, followed by
//! the PNG or TIFF predictor named in `/DecodeParms`. Any other filter leaves
//! the raw bytes untouched so callers can still report stream length.

use flate2::{Decompress, FlushDecompress, Status};
use serde::Serialize;
use tracing::debug;

use crate::model::{Dict, DictExt, PdfValue};

/// Outcome of decoding one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FilterStatus {
    /// No `/Filter`: the data is the raw stream.
    Unfiltered,
    /// Every filter was applied.
    Decoded,
    /// A filter outside the supported set; the data is the raw stream.
    Unsupported(String),
    /// Decoding failed; the data is whatever could be recovered.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FilterOutput {
    pub data: Vec<u8>,
    pub status: FilterStatus,
}

impl FilterOutput {
    /// True when `data` holds fully decoded content.
    pub fn is_decoded(&self) -> bool {
        matches!(self.status, FilterStatus::Unfiltered | FilterStatus::Decoded)
    }

    /// Diagnostic text for anything short of a full decode.
    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            FilterStatus::Unsupported(r) | FilterStatus::Failed(r) => Some(r),
            FilterStatus::Unfiltered | FilterStatus::Decoded => None,
        }
    }
}

/// Filter names of a stream dictionary, in application order.
///
/// Indirect values must already be resolved by the caller.
pub fn filter_names(dict: &Dict) -> Vec<String> {
    match dict.value("Filter").or_else(|| dict.value("F")) {
        Some(PdfValue::Name(n)) => vec![n.clone()],
        Some(PdfValue::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_name().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn is_flate(name: &str) -> bool {
    matches!(name, "FlateDecode" | "Fl")
}

/// Decode parameters for the filter at `index`.
fn decode_parms(dict: &Dict, index: usize) -> Option<&Dict> {
    match dict.value("DecodeParms").or_else(|| dict.value("DP"))? {
        PdfValue::Dict(d) => (index == 0).then_some(d),
        PdfValue::Array(items) => items.get(index).and_then(PdfValue::as_dict),
        _ => None,
    }
}

/// Decode a stream's raw bytes according to its dictionary.
pub fn decode(dict: &Dict, raw: &[u8]) -> FilterOutput {
    let filters = filter_names(dict);
    if filters.is_empty() {
        return FilterOutput {
            data: raw.to_vec(),
            status: FilterStatus::Unfiltered,
        };
    }

    if let Some(other) = filters.iter().find(|f| !is_flate(f)) {
        return FilterOutput {
            data: raw.to_vec(),
            status: FilterStatus::Unsupported(format!("filter /{other} is not decoded")),
        };
    }

    let mut data = raw.to_vec();
    for index in 0..filters.len() {
        data = match inflate(&data) {
            Ok(out) => out,
            Err((partial, reason)) => {
                debug!(%reason, recovered = partial.len(), "flate decode failed");
                return FilterOutput {
                    data: if partial.is_empty() { raw.to_vec() } else { partial },
                    status: FilterStatus::Failed(reason),
                };
            }
        };
        if let Some(parms) = decode_parms(dict, index) {
            data = match apply_predictor(data, parms) {
                Ok(out) => out,
                Err((unchanged, reason)) => {
                    debug!(%reason, "predictor not applied");
                    return FilterOutput {
                        data: unchanged,
                        status: FilterStatus::Failed(reason),
                    };
                }
            };
        }
    }

    FilterOutput {
        data,
        status: FilterStatus::Decoded,
    }
}

/// Inflate zlib data; on failure return the output recovered so far.
fn inflate(data: &[u8]) -> std::result::Result<Vec<u8>, (Vec<u8>, String)> {
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len().saturating_mul(2).max(64));
    loop {
        if out.len() == out.capacity() {
            out.reserve(out.len().max(4096));
        }
        let before_in = decoder.total_in();
        let before_out = decoder.total_out();
        let input = data.get(before_in as usize..).unwrap_or_default();
        match decoder.decompress_vec(input, &mut out, FlushDecompress::Finish) {
            Ok(Status::StreamEnd) => return Ok(out),
            Ok(Status::Ok | Status::BufError) => {
                let progressed =
                    decoder.total_in() != before_in || decoder.total_out() != before_out;
                if !progressed && out.len() < out.capacity() {
                    return Err((out, "truncated FlateDecode data".to_string()));
                }
            }
            Err(e) => {
                let partial = decompress_corrupted(data);
                return Err((partial, format!("corrupt FlateDecode data: {e}")));
            }
        }
    }
}

/// Best-effort zlib decompression for corrupted streams: feed one byte at a
/// time and keep everything produced before the decoder fails.
fn decompress_corrupted(data: &[u8]) -> Vec<u8> {
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut buf = [0u8; 4096];
    let mut i = 0usize;
    while i < data.len() {
        let before_out = decoder.total_out();
        let before_in = decoder.total_in();
        let res = decoder.decompress(&data[i..i + 1], &mut buf, FlushDecompress::None);
        let produced = (decoder.total_out() - before_out) as usize;
        out.extend_from_slice(&buf[..produced]);
        let consumed = (decoder.total_in() - before_in) as usize;
        i += consumed.max(1);
        match res {
            Ok(Status::StreamEnd) | Err(_) => break,
            Ok(_) => {}
        }
    }
    out
}

/// Largest `/Colors` a predictor accepts.
const MAX_COLORS: i64 = 32;

/// Validated `/DecodeParms` predictor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Predictor {
    tiff: bool,
    colors: usize,
    bits: usize,
    /// Bytes per row, not counting the PNG filter-type byte.
    row_bytes: usize,
}

impl Predictor {
    /// `None` when no predictor applies.
    fn from_parms(parms: &Dict) -> std::result::Result<Option<Self>, String> {
        let tiff = match parms.get_i64("Predictor").unwrap_or(1) {
            2 => true,
            p if p >= 10 => false,
            _ => return Ok(None),
        };
        let columns = parms.get_i64("Columns").unwrap_or(1);
        let colors = parms.get_i64("Colors").unwrap_or(1);
        let bits = parms.get_i64("BitsPerComponent").unwrap_or(8);
        if !matches!(bits, 1 | 2 | 4 | 8 | 16) {
            return Err(format!("predictor /BitsPerComponent {bits} is invalid"));
        }
        if !(1..=MAX_COLORS).contains(&colors) {
            return Err(format!("predictor /Colors {colors} is out of range"));
        }
        let columns = usize::try_from(columns)
            .ok()
            .filter(|&c| c > 0)
            .ok_or_else(|| format!("predictor /Columns {columns} is out of range"))?;
        let (colors, bits) = (colors as usize, bits as usize);
        let row_bytes = columns
            .checked_mul(colors)
            .and_then(|n| n.checked_mul(bits))
            .map(|n| n.div_ceil(8))
            .ok_or_else(|| format!("predictor row of {columns} columns overflows"))?;
        Ok(Some(Self {
            tiff,
            colors,
            bits,
            row_bytes,
        }))
    }
}

/// Undo the predictor named in `parms`. On failure the data comes back
/// unchanged with the reason.
fn apply_predictor(
    data: Vec<u8>,
    parms: &Dict,
) -> std::result::Result<Vec<u8>, (Vec<u8>, String)> {
    let predictor = match Predictor::from_parms(parms) {
        Ok(Some(p)) => p,
        Ok(None) => return Ok(data),
        Err(reason) => return Err((data, reason)),
    };
    if data.is_empty() {
        return Ok(data);
    }
    if predictor.row_bytes > data.len() {
        let reason = format!(
            "predictor row of {} bytes exceeds {} bytes of data",
            predictor.row_bytes,
            data.len()
        );
        return Err((data, reason));
    }
    if predictor.tiff {
        if predictor.bits != 8 {
            let reason = format!("TIFF predictor on {}-bit samples is not decoded", predictor.bits);
            return Err((data, reason));
        }
        return Ok(tiff_predictor(data, predictor.row_bytes, predictor.colors));
    }
    let bpp = (predictor.colors * predictor.bits / 8).max(1);
    Ok(png_predictor(&data, predictor.row_bytes, bpp))
}

/// Undo TIFF predictor 2 (horizontal differencing) on 8-bit samples.
fn tiff_predictor(mut data: Vec<u8>, row_bytes: usize, colors: usize) -> Vec<u8> {
    for row in data.chunks_mut(row_bytes) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    data
}

/// Reverse PNG row filters. Each row carries a leading filter-type byte; a
/// short final row is decoded as far as it goes.
fn png_predictor(data: &[u8], row_bytes: usize, bpp: usize) -> Vec<u8> {
    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];
    let mut current_row = vec![0u8; row_bytes];

    for row in data.chunks(row_bytes + 1) {
        let (filter_type, row_data) = (row[0], &row[1..]);
        if row_data.len() < row_bytes {
            debug!(len = row_data.len(), row_bytes, "short final predictor row");
        }
        for (i, &byte) in row_data.iter().enumerate() {
            let left = if i >= bpp { current_row[i - bpp] } else { 0 };
            let above = prev_row[i];
            let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
            let pred = match filter_type {
                1 => left,
                2 => above,
                3 => ((u16::from(left) + u16::from(above)) / 2) as u8,
                4 => paeth_predictor(left, above, upper_left),
                _ => 0,
            };
            current_row[i] = byte.wrapping_add(pred);
        }
        result.extend_from_slice(&current_row[..row_data.len()]);
        std::mem::swap(&mut prev_row, &mut current_row);
    }

    result
}

const fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::*;
    use crate::model::name;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn dict_with(filter: PdfValue) -> Dict {
        let mut d = Dict::new();
        d.insert("Filter".into(), filter);
        d
    }

    #[test]
    fn no_filter_is_unfiltered() {
        let out = decode(&Dict::new(), b"raw");
        assert_eq!(out.status, FilterStatus::Unfiltered);
        assert_eq!(out.data, b"raw");
    }

    #[test]
    fn flate_decodes() {
        let out = decode(&dict_with(name("FlateDecode")), &zlib(b"hello world"));
        assert_eq!(out.status, FilterStatus::Decoded);
        assert_eq!(out.data, b"hello world");
    }

    #[test]
    fn chained_flate_decodes_twice() {
        let twice = zlib(&zlib(b"nested"));
        let out = decode(
            &dict_with(PdfValue::Array(vec![name("Fl"), name("FlateDecode")])),
            &twice,
        );
        assert_eq!(out.data, b"nested");
    }

    #[test]
    fn unsupported_filter_passes_raw_bytes() {
        let out = decode(&dict_with(name("DCTDecode")), b"\xff\xd8jpeg");
        assert!(matches!(out.status, FilterStatus::Unsupported(_)));
        assert_eq!(out.data, b"\xff\xd8jpeg");
        assert!(!out.is_decoded());
    }

    #[test]
    fn truncated_flate_keeps_partial_output() {
        let payload: Vec<u8> = (0..4000u32).map(|i| (i * 7 % 256) as u8).collect();
        let full = zlib(&payload);
        let out = decode(&dict_with(name("FlateDecode")), &full[..full.len() / 2]);
        assert!(matches!(out.status, FilterStatus::Failed(_)));
        assert!(!out.data.is_empty());
        assert!(payload.starts_with(&out.data));
    }

    #[test]
    fn png_up_predictor() {
        // two rows of 3 bytes, second row filtered with Up
        let rows = [0u8, 1, 2, 3, 2, 1, 1, 1];
        let mut dict = dict_with(name("FlateDecode"));
        let mut parms = Dict::new();
        parms.insert("Predictor".into(), PdfValue::from(12));
        parms.insert("Columns".into(), PdfValue::from(3));
        dict.insert("DecodeParms".into(), PdfValue::Dict(parms));
        let out = decode(&dict, &zlib(&rows));
        assert_eq!(out.data, vec![1, 2, 3, 2, 3, 4]);
    }

    fn predictor_dict(entries: &[(&str, i64)]) -> Dict {
        let mut dict = dict_with(name("FlateDecode"));
        let mut parms = Dict::new();
        for (key, value) in entries {
            parms.insert((*key).into(), PdfValue::from(*value));
        }
        dict.insert("DecodeParms".into(), PdfValue::Dict(parms));
        dict
    }

    #[test]
    fn png_short_final_row_is_kept() {
        // second row is one byte short
        let rows = [0u8, 1, 2, 3, 2, 1, 1];
        let dict = predictor_dict(&[("Predictor", 12), ("Columns", 3)]);
        let out = decode(&dict, &zlib(&rows));
        assert_eq!(out.status, FilterStatus::Decoded);
        assert_eq!(out.data, vec![1, 2, 3, 2, 3]);
    }

    #[test]
    fn oversized_columns_fail_without_decoding() {
        let rows = [0u8, 1, 2, 3];
        for columns in [4_611_686_018_427_387_904, i64::MAX, 1_000_000, 0, -3] {
            let dict = predictor_dict(&[("Predictor", 12), ("Columns", columns)]);
            let out = decode(&dict, &zlib(&rows));
            assert!(matches!(out.status, FilterStatus::Failed(_)), "{columns}");
            assert_eq!(out.data, rows, "{columns}");
        }

        let dict = predictor_dict(&[("Predictor", 2), ("Columns", i64::MAX), ("Colors", 4)]);
        assert!(matches!(decode(&dict, &zlib(&rows)).status, FilterStatus::Failed(_)));
    }

    #[test]
    fn invalid_predictor_parameters_fail() {
        let rows = [0u8, 1, 2, 3];
        for parms in [
            [("Predictor", 12), ("Colors", 33), ("BitsPerComponent", 8)],
            [("Predictor", 12), ("Colors", 0), ("BitsPerComponent", 8)],
            [("Predictor", 12), ("Colors", 1), ("BitsPerComponent", 3)],
            [("Predictor", 2), ("Colors", 1), ("BitsPerComponent", 4)],
        ] {
            let out = decode(&predictor_dict(&parms), &zlib(&rows));
            assert!(matches!(out.status, FilterStatus::Failed(_)), "{parms:?}");
            assert_eq!(out.data, rows);
        }
    }

    #[test]
    fn tiff_predictor_accumulates() {
        assert_eq!(tiff_predictor(vec![10, 1, 1, 5, 2, 2], 3, 1), vec![10, 11, 12, 5, 7, 9]);
    }
}
