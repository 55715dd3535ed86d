//! Object-graph walkers.
//!
//! Each walker reads a [`DocumentContext`](crate::document::DocumentContext)
//! and produces a serializable summary. Lookups that fail degrade to `None`
//! or a note; no walker fails the analysis.

pub mod annotations;
pub mod attachments;
pub mod fonts;
pub mod forensics;
pub mod images;
pub mod inspect;
pub mod reachability;
pub mod report;
pub mod scan;
pub mod signatures;

use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::document::DocumentContext;
use crate::model::{Dict, DictExt, PdfValue};

pub use annotations::{annotations, Annotation};
pub use attachments::{attachments, Attachment, AttachmentSource};
pub use fonts::{fonts, Embedding, FontInfo};
pub use forensics::{forensics, Finding, ForensicReport};
pub use images::{images, ImageInfo, ImageKind};
pub use inspect::{content_ops, inspect, xref_dump, Inspection, OpsDump, XrefDump};
pub use reachability::{orphans, reachability, walk_refs, Orphan, OrphanReport, Reachability};
pub use report::{Report, Status};
pub use scan::{scan, Likelihood, PageScan, ScanReport};
pub use signatures::{signatures, SignatureField, SignatureInfo, SignatureReport};

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 16;

/// Text of a file specification: a string, or a dictionary's `/UF` or `/F`.
pub(crate) fn filespec_name(ctx: &DocumentContext, value: &PdfValue) -> Option<String> {
    match &*ctx.resolve_maybe(value) {
        PdfValue::Dict(d) => d.get_text("UF").or_else(|| d.get_text("F")),
        other => other.as_text(),
    }
}

/// Entries of one resource category (`/Font`, `/XObject`, ...), unresolved.
pub(crate) fn resource_entries(
    ctx: &DocumentContext,
    resources: &Dict,
    category: &str,
) -> Vec<(String, PdfValue)> {
    ctx.get(resources, category)
        .and_then(|c| c.as_dict().cloned())
        .map(|c| c.into_iter().collect())
        .unwrap_or_default()
}

/// `root` plus the resource dictionaries of every Form XObject reachable
/// from it, each form entered once.
pub(crate) fn resource_dicts(ctx: &DocumentContext, root: Arc<PdfValue>) -> Vec<Arc<PdfValue>> {
    let mut out = Vec::new();
    let mut visited = FxHashSet::default();
    let mut stack = vec![(root, 0usize)];

    while let Some((resources, depth)) = stack.pop() {
        if let Some(dict) = resources.as_dict()
            && depth < MAX_FORM_DEPTH
        {
            for (_, xobject) in resource_entries(ctx, dict, "XObject") {
                if let Some(r) = xobject.as_reference()
                    && !visited.insert(r)
                {
                    continue;
                }
                let form = ctx.resolve_maybe(&xobject);
                let Some(stream) = form.as_stream() else { continue };
                if !stream.dict.has_name("Subtype", "Form") {
                    continue;
                }
                if let Some(inner) = ctx.get(&stream.dict, "Resources") {
                    stack.push((inner.into_shared(), depth + 1));
                }
            }
        }
        out.push(resources);
    }
    out
}

/// Name of a color space: the name itself, or the family of an array form.
pub(crate) fn color_space_name(ctx: &DocumentContext, value: &PdfValue) -> Option<String> {
    match &*ctx.resolve_maybe(value) {
        PdfValue::Name(n) => Some(n.clone()),
        PdfValue::Array(items) => items
            .first()
            .and_then(|f| ctx.resolve_maybe(f).as_name().map(str::to_string)),
        _ => None,
    }
}
