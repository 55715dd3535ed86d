//! Document overview, cross-reference dump and content operator dump.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Serialize;

use crate::document::{DocumentContext, PageTree, XrefEntry, XrefKind};
use crate::model::{ContentOp, ObjectRef, PdfValue};
use crate::parser::content::ContentParser;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectCounts {
    pub in_use: usize,
    pub free: usize,
    pub compressed: usize,
    pub total: usize,
}

impl ObjectCounts {
    fn tally<'a>(entries: impl IntoIterator<Item = &'a XrefEntry>) -> Self {
        let mut counts = Self::default();
        for entry in entries {
            match entry {
                XrefEntry::InUse { .. } => counts.in_use += 1,
                XrefEntry::Free { .. } => counts.free += 1,
                XrefEntry::Compressed { .. } => counts.compressed += 1,
            }
            counts.total += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DumpedObject {
    pub id: ObjectRef,
    pub revision: usize,
    pub value: PdfValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub version: Option<String>,
    pub xref_kind: XrefKind,
    pub revision_count: usize,
    pub startxref: Option<usize>,
    /// The xref was rebuilt by scanning for object headers.
    pub reconstructed: bool,
    pub objects: ObjectCounts,
    pub page_count: usize,
    pub trailer_keys: Vec<String>,
    pub encrypted: bool,
    /// Text entries of the `/Info` dictionary.
    pub info: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_dump: Option<Vec<DumpedObject>>,
    /// The dump stopped at `max_objects`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dump_truncated: bool,
}

/// Summary of a document. With `max_objects` set, every in-use object is
/// dumped too, up to that many.
pub fn inspect(ctx: &DocumentContext, tree: &PageTree, max_objects: Option<usize>) -> Inspection {
    let info: BTreeMap<String, String> = ctx
        .info()
        .and_then(|i| {
            i.as_dict().map(|d| {
                d.iter()
                    .filter_map(|(k, v)| Some((k.clone(), ctx.resolve_maybe(v).as_text()?)))
                    .collect()
            })
        })
        .unwrap_or_default();

    let mut dump_truncated = false;
    let object_dump = max_objects.map(|limit| {
        let refs = ctx.in_use_refs();
        dump_truncated = refs.len() > limit;
        refs.into_iter()
            .take(limit)
            .filter_map(|id| {
                let value = ctx.resolve(id)?;
                Some(DumpedObject {
                    id,
                    revision: ctx.entries().get(&id.number).map_or(0, |e| e.revision),
                    value: (*value).clone(),
                })
            })
            .collect()
    });

    Inspection {
        version: ctx.version().map(str::to_string),
        xref_kind: ctx.xref_kind(),
        revision_count: ctx.revision_count(),
        startxref: ctx.startxref(),
        reconstructed: ctx.is_reconstructed(),
        objects: ObjectCounts::tally(ctx.entries().values().map(|e| &e.entry)),
        page_count: tree.len(),
        trailer_keys: ctx.trailer().keys().cloned().collect(),
        encrypted: ctx.is_encrypted(),
        info,
        object_dump,
        dump_truncated,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RevisionSummary {
    pub offset: usize,
    pub kind: XrefKind,
    pub hybrid: bool,
    pub stream_object: Option<ObjectRef>,
    pub entries: ObjectCounts,
    pub trailer_keys: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct XrefRow {
    pub number: u32,
    pub revision: usize,
    #[serde(flatten)]
    pub entry: XrefEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct XrefDump {
    pub kind: XrefKind,
    pub startxref: Option<usize>,
    pub reconstructed: bool,
    /// Oldest first.
    pub revisions: Vec<RevisionSummary>,
    /// The merged index, newest declaration of each object.
    pub entries: Vec<XrefRow>,
}

pub fn xref_dump(ctx: &DocumentContext) -> XrefDump {
    let revisions = ctx
        .revisions()
        .iter()
        .map(|s| RevisionSummary {
            offset: s.offset,
            kind: s.kind,
            hybrid: s.hybrid,
            stream_object: s.stream_object,
            entries: ObjectCounts::tally(s.entries.iter().map(|(_, e)| e)),
            trailer_keys: s.trailer.keys().cloned().collect(),
            notes: s.notes.clone(),
        })
        .collect();
    XrefDump {
        kind: ctx.xref_kind(),
        startxref: ctx.startxref(),
        reconstructed: ctx.is_reconstructed(),
        revisions,
        entries: ctx
            .entries()
            .iter()
            .map(|(&number, e)| XrefRow {
                number,
                revision: e.revision,
                entry: e.entry,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageOps {
    pub page: usize,
    pub truncated: bool,
    /// Operator name to number of uses, over the listed operations.
    pub histogram: BTreeMap<String, usize>,
    pub ops: Vec<ContentOp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpsDump {
    pub max_ops: usize,
    pub pages: Vec<PageOps>,
}

/// Content operations of the given 1-based pages, at most `max_ops` each.
pub fn content_ops(
    ctx: &DocumentContext,
    tree: &PageTree,
    pages: &[usize],
    max_ops: usize,
    notes: &mut Vec<String>,
) -> OpsDump {
    let mut out = Vec::with_capacity(pages.len());
    for &number in pages {
        let Some(page) = tree.get(number) else {
            notes.push(format!("page {number} does not exist"));
            continue;
        };
        let content = page.content(ctx);
        notes.extend(content.notes);

        let mut parser = ContentParser::new(&content.data);
        let ops: Vec<ContentOp> = parser.by_ref().take(max_ops).collect();
        let truncated = ops.len() == max_ops && parser.next().is_some();
        if truncated {
            notes.push(format!("page {number}: stopped after {max_ops} operations"));
        }
        let histogram = ops
            .iter()
            .map(|op| op.operator.clone())
            .counts()
            .into_iter()
            .collect();
        out.push(PageOps {
            page: number,
            truncated,
            histogram,
            ops,
        });
    }
    OpsDump { max_ops, pages: out }
}
