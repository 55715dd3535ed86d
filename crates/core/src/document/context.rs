//! Document context: cross-reference loading and indirect object resolution.
//!
//! A [`DocumentContext`] owns the input buffer, every cross-reference revision
//! found by following `/Prev`, and a merged index where the newest revision
//! wins. Objects are parsed lazily and memoized. When the xref chain cannot be
//! read at all, the index is rebuilt by scanning the file for `N G obj`
//! headers.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use once_cell::sync::{Lazy, OnceCell};
use regex::bytes::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::filters::{self, FilterOutput, FilterStatus};
use crate::document::xref::{parse_xref_at, XrefEntry, XrefKind, XrefSection};
use crate::error::{PdfError, Result};
use crate::model::{Dict, DictExt, ObjectRef, PdfValue, Stream, NULL};
use crate::parser::lexer::{Lexer, Token};
use crate::parser::object_parser::{find_bytes, stream_end, ObjectParser};

/// Inputs shorter than this cannot hold a header and an object.
const MIN_LEN: usize = 16;
const MAX_REVISIONS: usize = 512;
const HEADER_WINDOW: usize = 1024;
const TAIL_WINDOWS: [usize; 2] = [4 * 1024, 64 * 1024];
const MAX_TREE_DEPTH: usize = 64;

/// Trailer keys that belong to an xref stream's own dictionary.
const STREAM_ONLY_KEYS: &[&str] = &[
    "Prev", "XRefStm", "Type", "W", "Index", "Length", "Filter", "DecodeParms",
];

static OBJ_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+(\d+)\s+obj\b").expect("static regex"));

thread_local! {
    static RESOLVING: RefCell<FxHashSet<(usize, ObjectRef)>> =
        RefCell::new(FxHashSet::default());
}

/// Marks an object as being resolved on this thread.
struct ResolveGuard {
    key: (usize, ObjectRef),
}

impl ResolveGuard {
    fn enter(ctx: &DocumentContext, id: ObjectRef) -> Option<Self> {
        let key = (std::ptr::from_ref(ctx) as usize, id);
        RESOLVING
            .with(|set| set.borrow_mut().insert(key))
            .then_some(Self { key })
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        RESOLVING.with(|set| {
            set.borrow_mut().remove(&self.key);
        });
    }
}

/// A merged index entry and the revision (0 = oldest) that declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexedEntry {
    pub entry: XrefEntry,
    pub revision: usize,
}

/// Result of [`DocumentContext::resolve_maybe`]: either the value that was
/// passed in, or the shared object a reference pointed to.
#[derive(Debug, Clone)]
pub enum Resolved<'a> {
    Borrowed(&'a PdfValue),
    Shared(Arc<PdfValue>),
}

impl Deref for Resolved<'_> {
    type Target = PdfValue;

    fn deref(&self) -> &PdfValue {
        match self {
            Self::Borrowed(v) => v,
            Self::Shared(v) => v,
        }
    }
}

impl Resolved<'_> {
    pub fn into_shared(self) -> Arc<PdfValue> {
        match self {
            Self::Borrowed(v) => Arc::new(v.clone()),
            Self::Shared(v) => v,
        }
    }
}

/// Objects unpacked from one object stream.
#[derive(Debug, Default)]
struct ObjectStream {
    objects: FxHashMap<u32, Arc<PdfValue>>,
    /// Object numbers in header order.
    order: Vec<u32>,
}

/// Object headers found by scanning the raw file.
#[derive(Debug, Default)]
struct ScanIndex {
    by_ref: FxHashMap<ObjectRef, usize>,
    ordered: Vec<(ObjectRef, usize)>,
}

impl ScanIndex {
    fn new(ordered: Vec<(ObjectRef, usize)>) -> Self {
        // later definitions in the file win
        let by_ref = ordered.iter().copied().collect();
        Self { by_ref, ordered }
    }
}

/// Parsed view of one PDF file.
pub struct DocumentContext {
    data: Bytes,
    version: Option<String>,
    startxref: Option<usize>,
    /// Oldest first; the stream half of a hybrid file precedes its table.
    revisions: Vec<XrefSection>,
    index: BTreeMap<u32, IndexedEntry>,
    kind: XrefKind,
    trailer: Dict,
    reconstructed: bool,
    scan: OnceCell<ScanIndex>,
    cache: Mutex<FxHashMap<ObjectRef, Option<Arc<PdfValue>>>>,
    object_streams: Mutex<FxHashMap<u32, Option<Arc<ObjectStream>>>>,
    notes: Mutex<Vec<String>>,
}

impl std::fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentContext")
            .field("len", &self.data.len())
            .field("version", &self.version)
            .field("revisions", &self.revisions.len())
            .field("objects", &self.index.len())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl DocumentContext {
    /// Load the cross-reference data of `data`.
    ///
    /// Fails only when the input is too short or when neither an xref
    /// section nor a single object header can be found.
    pub fn open(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        if data.len() < MIN_LEN {
            return Err(PdfError::InputTooShort { len: data.len() });
        }

        let mut notes = Vec::new();
        let version = header_version(&data);
        if version.is_none() {
            notes.push(format!("no %PDF- header in the first {HEADER_WINDOW} bytes"));
        }

        let startxref = find_startxref(&data);
        let mut revisions = match startxref {
            Some(pos) => load_chain(&data, pos, &mut notes),
            None => {
                notes.push("startxref not found".to_string());
                Vec::new()
            }
        };

        let scan = OnceCell::new();
        let reconstructed = revisions.iter().all(|s| s.entries.is_empty());
        if reconstructed {
            let objects = scan_objects(&data);
            if objects.is_empty() {
                return Err(PdfError::NoValidXref);
            }
            warn!(objects = objects.len(), "rebuilding cross-reference from object headers");
            notes.push(format!(
                "cross-reference reconstructed from {} object headers",
                objects.len()
            ));
            let index = ScanIndex::new(objects);
            revisions = vec![reconstruct(&data, &index, &mut notes)];
            let _ = scan.set(index);
        }

        let mut index = BTreeMap::new();
        for (revision, section) in revisions.iter().enumerate() {
            for &(number, entry) in &section.entries {
                index.insert(number, IndexedEntry { entry, revision });
            }
        }

        let mut trailer = Dict::new();
        for section in &revisions {
            for (key, value) in &section.trailer {
                if !STREAM_ONLY_KEYS.contains(&key.as_str()) {
                    trailer.insert(key.clone(), value.clone());
                }
            }
        }

        let kind = revisions
            .iter()
            .rev()
            .find(|s| !s.hybrid)
            .map_or(XrefKind::Unknown, |s| s.kind);
        if kind == XrefKind::Unknown {
            notes.push("cross-reference kind unknown".to_string());
        }
        if trailer.value("Encrypt").is_some() {
            notes.push("document is encrypted; strings and streams are not decrypted".to_string());
        }

        debug!(
            revisions = revisions.len(),
            objects = index.len(),
            ?kind,
            "document opened"
        );

        Ok(Self {
            data,
            version,
            startxref,
            revisions,
            index,
            kind,
            trailer,
            reconstructed,
            scan,
            cache: Mutex::new(FxHashMap::default()),
            object_streams: Mutex::new(FxHashMap::default()),
            notes: Mutex::new(notes),
        })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Header version such as `"1.7"`.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub const fn startxref(&self) -> Option<usize> {
        self.startxref
    }

    /// Effective trailer: every revision's trailer keys, newest wins.
    pub const fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Cross-reference sections, oldest first.
    pub fn revisions(&self) -> &[XrefSection] {
        &self.revisions
    }

    /// Number of revisions, not counting the stream half of hybrid files.
    pub fn revision_count(&self) -> usize {
        self.revisions.iter().filter(|s| !s.hybrid).count()
    }

    pub const fn xref_kind(&self) -> XrefKind {
        self.kind
    }

    pub const fn is_reconstructed(&self) -> bool {
        self.reconstructed
    }

    /// Merged index, one entry per object number.
    pub const fn entries(&self) -> &BTreeMap<u32, IndexedEntry> {
        &self.index
    }

    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.index.keys().copied()
    }

    /// References of every object the merged index marks in use.
    pub fn in_use_refs(&self) -> Vec<ObjectRef> {
        self.index
            .iter()
            .filter(|(n, _)| **n != 0)
            .filter_map(|(&number, e)| match e.entry {
                XrefEntry::InUse { generation, .. } => Some(ObjectRef::new(number, generation)),
                XrefEntry::Compressed { .. } => Some(ObjectRef::new(number, 0)),
                XrefEntry::Free { .. } => None,
            })
            .collect()
    }

    /// Objects that carry file structure rather than content: xref streams,
    /// object-stream containers, and anything a trailer key references
    /// directly besides `/Root` and `/Info`.
    pub fn structural_refs(&self) -> BTreeSet<ObjectRef> {
        let mut out: BTreeSet<ObjectRef> = self
            .revisions
            .iter()
            .filter_map(|s| s.stream_object)
            .collect();
        for e in self.index.values() {
            if let XrefEntry::Compressed { container, .. } = e.entry {
                let generation = self
                    .index
                    .get(&container)
                    .map_or(0, |c| c.entry.generation());
                out.insert(ObjectRef::new(container, generation));
            }
        }
        for section in &self.revisions {
            for (key, value) in &section.trailer {
                if key != "Root"
                    && key != "Info"
                    && let Some(r) = value.as_reference()
                {
                    out.insert(r);
                }
            }
        }
        out
    }

    pub fn root(&self) -> Option<ObjectRef> {
        self.trailer.get_ref("Root")
    }

    /// The document catalog, if `/Root` resolves to a dictionary.
    pub fn catalog(&self) -> Option<Arc<PdfValue>> {
        let catalog = self.resolve(self.root()?)?;
        catalog.as_dict().is_some().then_some(catalog)
    }

    /// The `/Info` dictionary.
    pub fn info(&self) -> Option<Arc<PdfValue>> {
        let info = self.resolve_maybe(self.trailer.get("Info")?).into_shared();
        info.as_dict().is_some().then_some(info)
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer.value("Encrypt").is_some()
    }

    /// Structural notes collected while loading and resolving.
    pub fn notes(&self) -> Vec<String> {
        self.notes.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub(crate) fn note(&self, note: impl Into<String>) {
        if let Ok(mut notes) = self.notes.lock() {
            notes.push(note.into());
        }
    }

    /// Resolve an indirect object.
    ///
    /// Returns `None` for object 0, free or unknown numbers, a generation
    /// that does not match the index, unparseable objects, and objects that
    /// are already being resolved further up the stack.
    pub fn resolve(&self, id: ObjectRef) -> Option<Arc<PdfValue>> {
        if id.number == 0 {
            return None;
        }
        if let Ok(cache) = self.cache.lock()
            && let Some(hit) = cache.get(&id)
        {
            return hit.clone();
        }

        let Some(_guard) = ResolveGuard::enter(self, id) else {
            debug!(%id, "reference cycle while resolving");
            return None;
        };
        let value = self.load(id);
        if let Ok(mut cache) = self.cache.lock() {
            cache.entry(id).or_insert_with(|| value.clone());
        }
        value
    }

    /// Follow `value` if it is a reference. Dangling references become null.
    pub fn resolve_maybe<'a>(&self, value: &'a PdfValue) -> Resolved<'a> {
        match value {
            PdfValue::Reference(r) => self
                .resolve(*r)
                .map_or(Resolved::Borrowed(&NULL), Resolved::Shared),
            other => Resolved::Borrowed(other),
        }
    }

    /// `dict[key]` with one reference followed; absent and null give `None`.
    pub fn get<'a>(&self, dict: &'a Dict, key: &str) -> Option<Resolved<'a>> {
        let value = self.resolve_maybe(dict.get(key)?);
        (!value.is_null()).then_some(value)
    }

    /// Decode a stream, resolving indirect `/Filter` and `/DecodeParms`.
    pub fn decode_stream(&self, stream: &Stream) -> FilterOutput {
        let mut dict = Dict::new();
        for key in ["Filter", "F", "DecodeParms", "DP"] {
            if let Some(value) = stream.dict.get(key) {
                let value = match &*self.resolve_maybe(value) {
                    PdfValue::Array(items) => PdfValue::Array(
                        items.iter().map(|i| (*self.resolve_maybe(i)).clone()).collect(),
                    ),
                    other => other.clone(),
                };
                dict.insert(key.to_string(), value);
            }
        }
        filters::decode(&dict, stream.raw())
    }

    /// Leaf entries of a name tree in tree order. Keys are decoded text;
    /// values are returned unresolved.
    pub fn name_tree(&self, root: &PdfValue) -> Vec<(String, PdfValue)> {
        let mut out = Vec::new();
        let mut visited = FxHashSet::default();
        if let Some(r) = root.as_reference() {
            visited.insert(r);
        }
        let mut stack = vec![(self.resolve_maybe(root).into_shared(), 0usize)];

        while let Some((node, depth)) = stack.pop() {
            let Some(dict) = node.dict() else { continue };
            if let Some(names) = self.get(dict, "Names")
                && let Some(items) = names.as_array()
            {
                for pair in items.chunks_exact(2) {
                    let key = match &*self.resolve_maybe(&pair[0]) {
                        PdfValue::Name(n) => n.clone(),
                        other => other.as_text().unwrap_or_default(),
                    };
                    out.push((key, pair[1].clone()));
                }
            }
            if depth >= MAX_TREE_DEPTH {
                debug!(depth, "name tree too deep");
                continue;
            }
            if let Some(kids) = self.get(dict, "Kids")
                && let Some(items) = kids.as_array()
            {
                for kid in items.iter().rev() {
                    if let Some(r) = kid.as_reference()
                        && !visited.insert(r)
                    {
                        continue;
                    }
                    stack.push((self.resolve_maybe(kid).into_shared(), depth + 1));
                }
            }
        }
        out
    }

    fn load(&self, id: ObjectRef) -> Option<Arc<PdfValue>> {
        match self.index.get(&id.number)?.entry {
            XrefEntry::InUse { offset, generation } => {
                if generation != id.generation {
                    debug!(%id, generation, "generation mismatch");
                    return None;
                }
                let direct = offset
                    .and_then(|o| usize::try_from(o).ok())
                    .and_then(|o| self.parse_at(o, id));
                if direct.is_some() {
                    return direct.map(Arc::new);
                }
                let found = self.scan_index().by_ref.get(&id).copied()?;
                let value = self.parse_at(found, id)?;
                self.note(format!("object {id} not at its xref offset; found at {found}"));
                Some(Arc::new(value))
            }
            XrefEntry::Compressed { container, index } => {
                if id.generation != 0 {
                    return None;
                }
                let stream = self.object_stream(container)?;
                stream
                    .objects
                    .get(&id.number)
                    .or_else(|| {
                        let n = stream.order.get(usize::try_from(index).ok()?)?;
                        stream.objects.get(n)
                    })
                    .cloned()
            }
            XrefEntry::Free { .. } => None,
        }
    }

    fn scan_index(&self) -> &ScanIndex {
        self.scan
            .get_or_init(|| ScanIndex::new(scan_objects(&self.data)))
    }

    /// Parse the indirect object whose header sits at `offset`.
    fn parse_at(&self, offset: usize, id: ObjectRef) -> Option<PdfValue> {
        let obj = match ObjectParser::at(&self.data, offset).parse_indirect() {
            Ok(obj) => obj,
            Err(e) => {
                debug!(%id, offset, error = %e, "object parse failed");
                return None;
            }
        };
        if obj.id != id {
            debug!(%id, found = %obj.id, offset, "object header mismatch");
            return None;
        }
        match (obj.value, obj.stream_start) {
            (PdfValue::Dict(dict), Some(start)) => {
                let declared = self.stream_length(&dict);
                let end = stream_end(&self.data, start, declared);
                let raw = self.data.slice(start.min(end)..end);
                Some(PdfValue::Stream(Box::new(Stream::new(dict, raw))))
            }
            (value, _) => Some(value),
        }
    }

    fn stream_length(&self, dict: &Dict) -> Option<usize> {
        let length = match dict.get("Length")? {
            PdfValue::Reference(r) => self.resolve(*r)?.as_i64(),
            other => other.as_i64(),
        };
        length.and_then(|l| usize::try_from(l).ok())
    }

    fn object_stream(&self, container: u32) -> Option<Arc<ObjectStream>> {
        if let Ok(cache) = self.object_streams.lock()
            && let Some(hit) = cache.get(&container)
        {
            return hit.clone();
        }
        let loaded = self.load_object_stream(container).map(Arc::new);
        if let Ok(mut cache) = self.object_streams.lock() {
            cache.insert(container, loaded.clone());
        }
        loaded
    }

    fn load_object_stream(&self, container: u32) -> Option<ObjectStream> {
        let generation = match self.index.get(&container).map(|e| e.entry) {
            Some(XrefEntry::InUse { generation, .. }) => generation,
            _ => {
                self.note(format!("object stream {container} is not an in-use object"));
                return None;
            }
        };
        let value = self.resolve(ObjectRef::new(container, generation))?;
        let Some(stream) = value.as_stream() else {
            self.note(format!("object stream {container} is not a stream"));
            return None;
        };

        let decoded = self.decode_stream(stream);
        if let FilterStatus::Unsupported(reason) | FilterStatus::Failed(reason) = &decoded.status {
            self.note(format!("object stream {container}: {reason}"));
            if matches!(decoded.status, FilterStatus::Unsupported(_)) {
                return None;
            }
        }
        let data = decoded.data;
        let count = stream.dict.get_i64("N").unwrap_or(0);
        let first = stream
            .dict
            .get_i64("First")
            .and_then(|f| usize::try_from(f).ok())?;

        let mut header = ObjectParser::new(&data[..first.min(data.len())]);
        let mut slots = Vec::new();
        for _ in 0..count {
            let (Ok(number), Ok(offset)) = (header.parse_object(), header.parse_object()) else {
                break;
            };
            match (number.as_i64(), offset.as_i64()) {
                (Some(n), Some(o)) => {
                    if let (Ok(n), Ok(o)) = (u32::try_from(n), usize::try_from(o)) {
                        slots.push((n, o));
                    }
                }
                _ => break,
            }
        }

        let mut out = ObjectStream::default();
        for (number, offset) in slots {
            let pos = first.saturating_add(offset);
            if pos >= data.len() {
                continue;
            }
            match ObjectParser::at(&data, pos).parse_object() {
                Ok(value) => {
                    out.objects.insert(number, Arc::new(value));
                    out.order.push(number);
                }
                Err(e) => debug!(container, number, error = %e, "object stream member unparseable"),
            }
        }
        debug!(container, objects = out.objects.len(), "object stream unpacked");
        Some(out)
    }
}

/// Version from a `%PDF-x.y` header near the start of the file.
fn header_version(data: &[u8]) -> Option<String> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let start = find_bytes(window, b"%PDF-")? + 5;
    let version: String = window[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|&b| char::from(b))
        .collect();
    (!version.is_empty()).then_some(version)
}

fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Offset named by the last `startxref` near the end of the file.
fn find_startxref(data: &[u8]) -> Option<usize> {
    for window in TAIL_WINDOWS {
        let base = data.len().saturating_sub(window);
        if let Some(rel) = rfind_bytes(&data[base..], b"startxref") {
            let mut lexer = Lexer::at(data, base + rel + b"startxref".len());
            return match lexer.next_token() {
                Some((_, Token::Int(n))) => usize::try_from(n).ok(),
                _ => None,
            };
        }
    }
    None
}

/// Follow the revision chain from `start`, returning sections oldest first.
fn load_chain(data: &[u8], start: usize, notes: &mut Vec<String>) -> Vec<XrefSection> {
    let mut chain: Vec<XrefSection> = Vec::new();
    let mut visited = FxHashSet::default();
    let mut next = Some(start);

    while let Some(offset) = next.take() {
        if chain.len() >= MAX_REVISIONS {
            notes.push(format!("revision chain cut at {MAX_REVISIONS} sections"));
            break;
        }
        if !visited.insert(offset) {
            notes.push(format!("/Prev loop at offset {offset}"));
            break;
        }
        let section = match parse_xref_at(data, offset) {
            Ok(section) => section,
            Err(e) => {
                let note = if chain.is_empty() {
                    format!("no cross-reference at startxref offset {offset}: {e}")
                } else {
                    format!("broken /Prev at offset {offset}: {e}")
                };
                warn!("{note}");
                notes.push(note);
                break;
            }
        };
        notes.extend(
            section
                .notes
                .iter()
                .map(|n| format!("xref at {}: {n}", section.offset)),
        );
        next = section.prev();
        let hybrid = section.xref_stm();
        chain.push(section);

        if let Some(stm) = hybrid
            && visited.insert(stm)
        {
            match parse_xref_at(data, stm) {
                Ok(mut stream) => {
                    stream.hybrid = true;
                    notes.extend(stream.notes.iter().map(|n| format!("xref at {stm}: {n}")));
                    chain.push(stream);
                }
                Err(e) => notes.push(format!("broken /XRefStm at offset {stm}: {e}")),
            }
        }
    }

    chain.reverse();
    chain
}

/// Every `N G obj` header in the file, in file order.
fn scan_objects(data: &[u8]) -> Vec<(ObjectRef, usize)> {
    OBJ_HEADER
        .captures_iter(data)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let number = std::str::from_utf8(caps.get(1)?.as_bytes()).ok()?.parse().ok()?;
            let generation = std::str::from_utf8(caps.get(2)?.as_bytes()).ok()?.parse().ok()?;
            Some((ObjectRef::new(number, generation), whole.start()))
        })
        .collect()
}

/// Build a synthetic section from scanned object headers.
fn reconstruct(data: &[u8], scan: &ScanIndex, notes: &mut Vec<String>) -> XrefSection {
    let entries = scan
        .ordered
        .iter()
        .map(|&(id, offset)| {
            (
                id.number,
                XrefEntry::InUse {
                    offset: Some(offset as u64),
                    generation: id.generation,
                },
            )
        })
        .collect();

    let mut trailer = find_trailer(data)
        .or_else(|| last_xref_stream_dict(data, scan))
        .unwrap_or_default();
    if trailer.get_ref("Root").is_none() {
        match find_catalog(data, scan) {
            Some(root) => {
                notes.push(format!("no /Root in trailer; using catalog {root}"));
                trailer.insert("Root".to_string(), PdfValue::Reference(root));
            }
            None => notes.push("no document catalog found".to_string()),
        }
    }

    XrefSection {
        kind: XrefKind::Unknown,
        offset: 0,
        stream_object: None,
        entries,
        trailer,
        hybrid: false,
        notes: Vec::new(),
    }
}

/// Dictionary after the last `trailer` keyword.
fn find_trailer(data: &[u8]) -> Option<Dict> {
    let pos = rfind_bytes(data, b"trailer")?;
    match ObjectParser::at(data, pos + b"trailer".len()).parse_object() {
        Ok(PdfValue::Dict(dict)) => Some(dict),
        _ => None,
    }
}

/// Dictionary of the last xref stream object, as a trailer substitute.
fn last_xref_stream_dict(data: &[u8], scan: &ScanIndex) -> Option<Dict> {
    scan.ordered.iter().rev().find_map(|&(_, offset)| {
        let obj = ObjectParser::at(data, offset).parse_indirect().ok()?;
        match obj.value {
            PdfValue::Dict(dict) if dict.has_name("Type", "XRef") => Some(dict),
            _ => None,
        }
    })
}

/// First scanned object whose dictionary has `/Type /Catalog`.
fn find_catalog(data: &[u8], scan: &ScanIndex) -> Option<ObjectRef> {
    scan.ordered.iter().find_map(|&(id, offset)| {
        let obj = ObjectParser::at(data, offset).parse_indirect().ok()?;
        obj.value
            .as_dict()
            .is_some_and(|d| d.has_name("Type", "Catalog"))
            .then_some(id)
    })
}
