//! PDF serializer: objects, a classic xref table and the trailer.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::model::{Dict, Number, ObjectRef, PdfValue};
use crate::parser::lexer::{is_delimiter, is_whitespace};

/// Writes a fresh single-revision file. Object numbers are handed out by
/// [`PdfWriter::alloc`] and may be written in any order.
#[derive(Debug)]
pub struct PdfWriter {
    out: Vec<u8>,
    offsets: BTreeMap<u32, usize>,
    next: u32,
}

impl PdfWriter {
    pub fn new(version: &str) -> Self {
        let mut out = format!("%PDF-{version}\n").into_bytes();
        // binary marker so transfer tools keep the file 8-bit clean
        out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            offsets: BTreeMap::new(),
            next: 1,
        }
    }

    /// Reserve the next object number.
    pub fn alloc(&mut self) -> ObjectRef {
        let id = ObjectRef::new(self.next, 0);
        self.next += 1;
        id
    }

    pub fn object_count(&self) -> usize {
        self.offsets.len()
    }

    /// Write `value` as object `id`. Stream `/Length` is set from the data.
    pub fn write_object(&mut self, id: ObjectRef, value: &PdfValue) {
        self.offsets.insert(id.number, self.out.len());
        self.out
            .extend_from_slice(format!("{} {} obj\n", id.number, id.generation).as_bytes());
        match value {
            PdfValue::Stream(stream) => {
                let mut dict = stream.dict.clone();
                dict.insert("Length".to_string(), PdfValue::from(stream.raw().len()));
                write_dict(&mut self.out, &dict);
                self.out.extend_from_slice(b"\nstream\n");
                self.out.extend_from_slice(stream.raw());
                self.out.extend_from_slice(b"\nendstream");
            }
            other => write_value(&mut self.out, other),
        }
        self.out.extend_from_slice(b"\nendobj\n");
    }

    /// Append the xref table and trailer. `/Size` is filled in.
    pub fn finish(mut self, mut trailer: Dict) -> Vec<u8> {
        let size = self.next.max(self.offsets.keys().last().map_or(0, |n| n + 1));
        let xref = self.out.len();
        self.out
            .extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f\r\n").as_bytes());
        for number in 1..size {
            let line = match self.offsets.get(&number) {
                Some(offset) => format!("{offset:010} 00000 n\r\n"),
                None => "0000000000 00001 f\r\n".to_string(),
            };
            self.out.extend_from_slice(line.as_bytes());
        }
        trailer.insert("Size".to_string(), PdfValue::from(i64::from(size)));
        self.out.extend_from_slice(b"trailer\n");
        write_dict(&mut self.out, &trailer);
        self.out
            .extend_from_slice(format!("\nstartxref\n{xref}\n%%EOF\n").as_bytes());
        self.out
    }
}

/// Serialize one value in PDF syntax.
pub fn write_value(out: &mut Vec<u8>, value: &PdfValue) {
    match value {
        PdfValue::Null => out.extend_from_slice(b"null"),
        PdfValue::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        PdfValue::Number(n) => write_number(out, *n),
        PdfValue::Name(n) => write_name(out, n),
        PdfValue::LiteralString(s) => write_literal(out, s),
        PdfValue::HexString(s) => {
            out.push(b'<');
            out.extend_from_slice(hex::encode(s).as_bytes());
            out.push(b'>');
        }
        PdfValue::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_value(out, item);
            }
            out.push(b']');
        }
        PdfValue::Dict(dict) => write_dict(out, dict),
        // streams only appear as indirect objects; inline, keep the dictionary
        PdfValue::Stream(stream) => write_dict(out, &stream.dict),
        PdfValue::Reference(r) => {
            out.extend_from_slice(format!("{} {} R", r.number, r.generation).as_bytes());
        }
    }
}

fn write_dict(out: &mut Vec<u8>, dict: &Dict) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict {
        write_name(out, key);
        out.push(b' ');
        write_value(out, value);
    }
    out.extend_from_slice(b">>");
}

fn write_number(out: &mut Vec<u8>, n: Number) {
    let mut text = String::new();
    match n {
        Number::Int(i) => {
            let _ = write!(text, "{i}");
        }
        Number::Real(r) if !r.is_finite() => text.push('0'),
        Number::Real(r) => {
            let _ = write!(text, "{r:.6}");
            let trimmed = text.trim_end_matches('0').trim_end_matches('.');
            text = if trimmed.is_empty() || trimmed == "-" {
                "0".to_string()
            } else {
                trimmed.to_string()
            };
        }
    }
    out.extend_from_slice(text.as_bytes());
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &b in name.as_bytes() {
        if b == b'#' || !(0x21..=0x7E).contains(&b) || is_delimiter(b) || is_whitespace(b) {
            out.extend_from_slice(format!("#{b:02X}").as_bytes());
        } else {
            out.push(b);
        }
    }
}

fn write_literal(out: &mut Vec<u8>, s: &[u8]) {
    out.push(b'(');
    for &b in s {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}
