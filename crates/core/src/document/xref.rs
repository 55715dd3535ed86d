//! Cross-reference parsing.
//!
//! Two decoders share one entry model: the classic `xref` table and the
//! binary cross-reference stream (PDF 1.5+). Both keep entries in the order
//! they were declared; [`XrefSection::sorted`] applies last-writer-wins.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::codec::filters::{self, FilterStatus};
use crate::error::{PdfError, Result};
use crate::model::{Dict, DictExt, ObjectRef, PdfValue};
use crate::parser::lexer::{is_whitespace, Keyword, Lexer, Token};
use crate::parser::object_parser::{stream_end, ObjectParser};
use crate::utils::nunpack;

/// Location of one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum XrefEntry {
    /// Object stored at a byte offset. `offset` is `None` for stream
    /// records with an unknown type.
    InUse { offset: Option<u64>, generation: u32 },
    /// Free-list member.
    Free { next_free: u32, generation: u32 },
    /// Object stored inside an object stream.
    Compressed { container: u32, index: u32 },
}

impl XrefEntry {
    pub const fn is_in_use(&self) -> bool {
        !matches!(self, Self::Free { .. })
    }

    /// Generation an object must carry to match this entry. Compressed
    /// objects always have generation 0.
    pub const fn generation(&self) -> u32 {
        match self {
            Self::InUse { generation, .. } | Self::Free { generation, .. } => *generation,
            Self::Compressed { .. } => 0,
        }
    }
}

/// Which encoding a section used, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum XrefKind {
    Table,
    Stream,
    Unknown,
}

/// One cross-reference section with its trailer.
#[derive(Debug, Clone)]
pub struct XrefSection {
    pub kind: XrefKind,
    /// Byte offset the section was read from.
    pub offset: usize,
    /// The xref stream object itself, for stream sections.
    pub stream_object: Option<ObjectRef>,
    /// Entries in declaration order; an object number may repeat.
    pub entries: Vec<(u32, XrefEntry)>,
    pub trailer: Dict,
    /// Set on the stream half of a hybrid-reference file.
    pub hybrid: bool,
    pub notes: Vec<String>,
}

impl XrefSection {
    fn new(kind: XrefKind, offset: usize) -> Self {
        Self {
            kind,
            offset,
            stream_object: None,
            entries: Vec::new(),
            trailer: Dict::new(),
            hybrid: false,
            notes: Vec::new(),
        }
    }

    /// Entries keyed by object number; later declarations win.
    pub fn sorted(&self) -> BTreeMap<u32, XrefEntry> {
        self.entries.iter().copied().collect()
    }

    /// `/Prev` offset of the previous section.
    pub fn prev(&self) -> Option<usize> {
        self.trailer
            .get_i64("Prev")
            .and_then(|p| usize::try_from(p).ok())
    }

    /// `/XRefStm` offset of a hybrid file's stream section.
    pub fn xref_stm(&self) -> Option<usize> {
        self.trailer
            .get_i64("XRefStm")
            .and_then(|p| usize::try_from(p).ok())
    }
}

/// Read the section at `pos`, whichever form it uses.
pub fn parse_xref_at(data: &[u8], pos: usize) -> Result<XrefSection> {
    if pos >= data.len() {
        return Err(PdfError::SyntaxError(format!(
            "xref offset {pos} beyond end of file ({} bytes)",
            data.len()
        )));
    }
    let mut start = pos;
    while data.get(start).copied().is_some_and(is_whitespace) {
        start += 1;
    }
    if data[start..].starts_with(b"xref") {
        parse_xref_table(data, start)
    } else {
        parse_xref_stream_object(data, start)
    }
}

/// Parse a classic `xref` table at `pos` (pointing at the keyword).
pub fn parse_xref_table(data: &[u8], pos: usize) -> Result<XrefSection> {
    let mut lexer = Lexer::at(data, pos);
    match lexer.next_token() {
        Some((_, Token::Keyword(Keyword::Xref))) => {}
        _ => return Err(PdfError::SyntaxError(format!("no 'xref' keyword at {pos}"))),
    }
    let mut section = XrefSection::new(XrefKind::Table, pos);

    loop {
        let Some((at, token)) = lexer.next_token() else {
            section.notes.push("xref table ends without a trailer".into());
            return Ok(section);
        };
        match token {
            Token::Keyword(Keyword::Trailer) => break,
            Token::Int(first) => {
                let Some((_, Token::Int(count))) = lexer.next_token() else {
                    section
                        .notes
                        .push(format!("malformed xref subsection header at {at}"));
                    return Ok(section);
                };
                if !read_subsection(&mut lexer, &mut section, first, count) {
                    return Ok(section);
                }
            }
            other => {
                section
                    .notes
                    .push(format!("unexpected {other:?} in xref table at {at}"));
                return Ok(section);
            }
        }
    }

    match ObjectParser::at(data, lexer.tell()).parse_object() {
        Ok(PdfValue::Dict(trailer)) => section.trailer = trailer,
        Ok(other) => section
            .notes
            .push(format!("trailer is a {}, not a dictionary", other.type_name())),
        Err(e) => section.notes.push(format!("unreadable trailer: {e}")),
    }
    Ok(section)
}

/// Read `count` entries of a subsection. Returns false if the table broke.
fn read_subsection(
    lexer: &mut Lexer<'_>,
    section: &mut XrefSection,
    first: i64,
    count: i64,
) -> bool {
    let (Ok(mut base), Ok(count)) = (u32::try_from(first), u32::try_from(count)) else {
        section
            .notes
            .push(format!("invalid xref subsection {first} {count}"));
        return false;
    };

    for i in 0..count {
        let fields = (lexer.next_token(), lexer.next_token(), lexer.next_token());
        let (
            Some((_, Token::Int(offset))),
            Some((_, Token::Int(generation))),
            Some((_, Token::Keyword(marker))),
        ) = fields
        else {
            section.notes.push(format!(
                "xref subsection starting at {base} ends after {i} of {count} entries"
            ));
            return false;
        };
        let generation = u32::try_from(generation).unwrap_or(0);
        let offset = u64::try_from(offset).unwrap_or(0);
        let in_use = match marker.as_bytes() {
            b"n" => true,
            b"f" => false,
            other => {
                section.notes.push(format!(
                    "unknown xref marker {:?} for object {}",
                    String::from_utf8_lossy(other),
                    base + i
                ));
                return false;
            }
        };

        // A subsection declared to start at 1 that still opens with the head
        // of the free list really starts at 0.
        if i == 0 && base == 1 && !in_use && offset == 0 && generation == 65535 {
            debug!("xref subsection off by one, shifting to 0");
            base = 0;
        }

        let number = base.saturating_add(i);
        let entry = if in_use {
            XrefEntry::InUse {
                offset: Some(offset),
                generation,
            }
        } else {
            XrefEntry::Free {
                next_free: u32::try_from(offset).unwrap_or(0),
                generation,
            }
        };
        section.entries.push((number, entry));
    }
    true
}

/// Parse the indirect object at `pos` as a cross-reference stream.
fn parse_xref_stream_object(data: &[u8], pos: usize) -> Result<XrefSection> {
    let obj = ObjectParser::at(data, pos).parse_indirect()?;
    let (PdfValue::Dict(dict), Some(start)) = (obj.value, obj.stream_start) else {
        return Err(PdfError::SyntaxError(format!(
            "object {} at {pos} is not an xref stream",
            obj.id
        )));
    };
    let declared = dict.get_i64("Length").and_then(|l| usize::try_from(l).ok());
    let end = stream_end(data, start, declared);
    let mut section = parse_xref_stream(&dict, &data[start..end], pos)?;
    section.stream_object = Some(obj.id);
    Ok(section)
}

/// Decode the records of a cross-reference stream given its dictionary and
/// raw (still filtered) data.
pub fn parse_xref_stream(dict: &Dict, raw: &[u8], offset: usize) -> Result<XrefSection> {
    let widths: Vec<usize> = dict
        .value("W")
        .and_then(PdfValue::as_array)
        .map(|w| {
            w.iter()
                .map(|v| v.as_i64().and_then(|n| usize::try_from(n).ok()).unwrap_or(0))
                .collect()
        })
        .unwrap_or_default();
    let &[w0, w1, w2] = widths.as_slice() else {
        return Err(PdfError::SyntaxError("xref stream /W must have 3 entries".into()));
    };
    if w0 > 8 || w1 > 8 || w2 > 8 {
        return Err(PdfError::SyntaxError(format!(
            "xref stream field widths {widths:?} exceed 8 bytes"
        )));
    }
    let record = w0 + w1 + w2;

    let mut section = XrefSection::new(XrefKind::Stream, offset);
    section.trailer = dict
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "Length" | "Filter" | "DecodeParms" | "W" | "Index"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let size = dict.get_i64("Size").unwrap_or(0).max(0);
    let index: Vec<(i64, i64)> = match dict.value("Index").and_then(PdfValue::as_array) {
        Some(arr) => arr
            .chunks_exact(2)
            .filter_map(|pair| Some((pair[0].as_i64()?, pair[1].as_i64()?)))
            .collect(),
        None => {
            section
                .notes
                .push(format!("xref stream has no /Index; assuming [0 {size}]"));
            vec![(0, size)]
        }
    };

    let decoded = filters::decode(dict, raw);
    match &decoded.status {
        FilterStatus::Unsupported(reason) => {
            section
                .notes
                .push(format!("xref stream not decoded: {reason}"));
            return Ok(section);
        }
        FilterStatus::Failed(reason) => section
            .notes
            .push(format!("xref stream partially decoded: {reason}")),
        FilterStatus::Unfiltered | FilterStatus::Decoded => {}
    }
    let data = decoded.data;

    if record == 0 {
        section.notes.push("xref stream has zero-width records".into());
        return Ok(section);
    }

    let mut records = data.chunks_exact(record);
    let mut unknown_types = 0usize;
    let mut wide_fields = 0usize;
    'subsections: for (first, count) in index {
        let (Ok(first), Ok(count)) = (u32::try_from(first), u32::try_from(count)) else {
            section
                .notes
                .push(format!("invalid xref stream subsection {first} {count}"));
            continue;
        };
        for i in 0..count {
            let Some(rec) = records.next() else {
                section.notes.push(format!(
                    "xref stream data ends inside subsection starting at {first}"
                ));
                break 'subsections;
            };
            let kind = nunpack(&rec[..w0], 1);
            let f1 = nunpack(&rec[w0..w0 + w1], 0);
            let f2 = nunpack(&rec[w0 + w1..], 0);
            let entry = match (kind, u32::try_from(f1), u32::try_from(f2)) {
                (0, Ok(next_free), Ok(generation)) => XrefEntry::Free {
                    next_free,
                    generation,
                },
                (1, _, Ok(generation)) => XrefEntry::InUse {
                    offset: Some(f1),
                    generation,
                },
                (2, Ok(container), Ok(index)) => XrefEntry::Compressed { container, index },
                (0..=2, _, _) => {
                    wide_fields += 1;
                    XrefEntry::InUse {
                        offset: None,
                        generation: 0,
                    }
                }
                _ => {
                    unknown_types += 1;
                    XrefEntry::InUse {
                        offset: None,
                        generation: 0,
                    }
                }
            };
            section.entries.push((first.saturating_add(i), entry));
        }
    }
    if wide_fields > 0 {
        section.notes.push(format!(
            "{wide_fields} xref stream records have fields wider than 32 bits"
        ));
    }
    if unknown_types > 0 {
        section.notes.push(format!(
            "{unknown_types} xref stream records have an unknown type"
        ));
    }

    Ok(section)
}
