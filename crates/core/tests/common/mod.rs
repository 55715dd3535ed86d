//! In-memory PDF builder shared by the integration tests.
//!
//! Objects are written in call order; each `xref_*` call closes a revision
//! covering the objects written since the previous one, chained by `/Prev`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

pub struct PdfBuilder {
    out: Vec<u8>,
    pending: BTreeMap<u32, usize>,
    compressed: BTreeMap<u32, (u32, u32)>,
    max_number: u32,
    prev: Option<usize>,
}

impl PdfBuilder {
    pub fn new(version: &str) -> Self {
        Self {
            out: format!("%PDF-{version}\n%\u{e2}\u{e3}\n").into_bytes(),
            pending: BTreeMap::new(),
            compressed: BTreeMap::new(),
            max_number: 0,
            prev: None,
        }
    }

    fn begin(&mut self, number: u32) {
        self.pending.insert(number, self.out.len());
        self.max_number = self.max_number.max(number);
        self.out
            .extend_from_slice(format!("{number} 0 obj\n").as_bytes());
    }

    /// `number 0 obj <body> endobj`.
    pub fn object(&mut self, number: u32, body: &str) -> &mut Self {
        self.begin(number);
        self.out.extend_from_slice(body.as_bytes());
        self.out.extend_from_slice(b"\nendobj\n");
        self
    }

    /// A stream object; `dict` is the dictionary body without `<<`/`>>` and
    /// without `/Length`.
    pub fn stream(&mut self, number: u32, dict: &str, data: &[u8]) -> &mut Self {
        self.begin(number);
        self.out
            .extend_from_slice(format!("<<{dict} /Length {}>>\nstream\n", data.len()).as_bytes());
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// An object stream holding `objects`, registered as compressed entries
    /// of the next xref stream.
    pub fn object_stream(&mut self, number: u32, objects: &[(u32, &str)]) -> &mut Self {
        self.packed_objects(number, objects, false)
    }

    /// Same as [`Self::object_stream`], Flate-compressed.
    pub fn object_stream_flate(&mut self, number: u32, objects: &[(u32, &str)]) -> &mut Self {
        self.packed_objects(number, objects, true)
    }

    fn packed_objects(&mut self, number: u32, objects: &[(u32, &str)], flate: bool) -> &mut Self {
        let mut header = String::new();
        let mut body = String::new();
        for (index, (n, text)) in objects.iter().enumerate() {
            header.push_str(&format!("{n} {} ", body.len()));
            body.push_str(text);
            body.push('\n');
            self.compressed.insert(*n, (number, index as u32));
            self.max_number = self.max_number.max(*n);
        }
        let data = format!("{header}{body}");
        let dict = format!("/Type /ObjStm /N {} /First {}", objects.len(), header.len());
        if flate {
            let dict = format!("{dict} /Filter /FlateDecode");
            self.stream(number, &dict, &zlib(data.as_bytes()))
        } else {
            self.stream(number, &dict, data.as_bytes())
        }
    }

    pub fn offset(&self, number: u32) -> Option<usize> {
        self.pending.get(&number).copied()
    }

    /// Raw bytes, e.g. garbage between revisions.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.out.extend_from_slice(bytes);
        self
    }

    fn prev_key(&self) -> String {
        self.prev.map(|p| format!(" /Prev {p}")).unwrap_or_default()
    }

    /// Close a revision with a classic table; `trailer` is extra trailer
    /// body such as `/Root 1 0 R`.
    pub fn xref_table(&mut self, trailer: &str) -> &mut Self {
        let offset = self.out.len();
        let mut rows: BTreeMap<u32, String> = self
            .pending
            .iter()
            .map(|(n, off)| (*n, format!("{off:010} 00000 n\r\n")))
            .collect();
        if self.prev.is_none() {
            rows.insert(0, "0000000000 65535 f\r\n".to_string());
        }
        let mut text = String::from("xref\n");
        for run in runs(rows.keys().copied()) {
            text.push_str(&format!("{} {}\n", run[0], run.len()));
            for n in run {
                text.push_str(&rows[&n]);
            }
        }
        text.push_str(&format!(
            "trailer\n<</Size {}{} {trailer}>>\nstartxref\n{offset}\n%%EOF\n",
            self.max_number + 1,
            self.prev_key()
        ));
        self.out.extend_from_slice(text.as_bytes());
        self.pending.clear();
        self.prev = Some(offset);
        self
    }

    /// Close a revision with a cross-reference stream (`/W [1 4 2]`) stored
    /// as object `number`.
    pub fn xref_stream(&mut self, number: u32, trailer: &str) -> &mut Self {
        let offset = self.out.len();
        self.max_number = self.max_number.max(number);
        let mut rows: BTreeMap<u32, [u64; 3]> = self
            .pending
            .iter()
            .map(|(n, off)| (*n, [1, *off as u64, 0]))
            .collect();
        for (n, (container, index)) in &self.compressed {
            rows.insert(*n, [2, u64::from(*container), u64::from(*index)]);
        }
        rows.insert(number, [1, offset as u64, 0]);
        if self.prev.is_none() {
            rows.insert(0, [0, 0, 65535]);
        }

        let mut data = Vec::new();
        let mut index = String::new();
        for run in runs(rows.keys().copied()) {
            index.push_str(&format!("{} {} ", run[0], run.len()));
            for n in run {
                let [t, f1, f2] = rows[&n];
                data.push(t as u8);
                data.extend_from_slice(&(f1 as u32).to_be_bytes());
                data.extend_from_slice(&(f2 as u16).to_be_bytes());
            }
        }
        let dict = format!(
            "/Type /XRef /Size {} /W [1 4 2] /Index [{}]{} {trailer}",
            self.max_number + 1,
            index.trim_end(),
            self.prev_key()
        );
        self.out.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        self.out
            .extend_from_slice(format!("<<{dict} /Length {}>>\nstream\n", data.len()).as_bytes());
        self.out.extend_from_slice(&data);
        self.out.extend_from_slice(b"\nendstream\nendobj\n");
        self.out
            .extend_from_slice(format!("startxref\n{offset}\n%%EOF\n").as_bytes());
        self.pending.clear();
        self.compressed.clear();
        self.prev = Some(offset);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.out.clone()
    }
}

/// Consecutive runs of object numbers, for xref subsections.
fn runs(numbers: impl Iterator<Item = u32>) -> Vec<Vec<u32>> {
    let mut out: Vec<Vec<u32>> = Vec::new();
    for n in numbers {
        match out.last_mut() {
            Some(run) if run.last().is_some_and(|last| last + 1 == n) => run.push(n),
            _ => out.push(vec![n]),
        }
    }
    out
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Catalog 1, page tree 2, then one page (3 + 2i) and content stream
/// (4 + 2i) per entry of `contents`. Closed with an xref table.
pub fn simple_doc(contents: &[&str]) -> PdfBuilder {
    let mut b = PdfBuilder::new("1.7");
    b.object(1, "<</Type /Catalog /Pages 2 0 R>>");
    let kids: Vec<String> = (0..contents.len())
        .map(|i| format!("{} 0 R", 3 + 2 * i))
        .collect();
    b.object(
        2,
        &format!(
            "<</Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792]>>",
            kids.join(" "),
            contents.len()
        ),
    );
    for (i, content) in contents.iter().enumerate() {
        let page = 3 + 2 * i as u32;
        b.object(
            page,
            &format!("<</Type /Page /Parent 2 0 R /Contents {} 0 R>>", page + 1),
        );
        b.stream(page + 1, "", content.as_bytes());
    }
    b.xref_table("/Root 1 0 R");
    b
}
