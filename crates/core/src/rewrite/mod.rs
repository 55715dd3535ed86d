//! Tools that write a new PDF from parts of existing ones.
//!
//! Every tool copies objects through a [`Copier`]: each source object that is
//! reached gets a fresh number in the output, and a [`CopyPolicy`] decides
//! which objects and dictionary entries make it across.

pub mod merge;
pub mod sanitize;
pub mod split;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::debug;

use crate::document::{DocumentContext, Page, PageTree, PAGE_INHERITABLE};
use crate::error::{PdfError, Result};
use crate::model::{name, Dict, DictExt, ObjectRef, PdfValue, Stream};
use crate::writer::PdfWriter;

pub use merge::{merge, MergeManifest, MergedPage};
pub use sanitize::{sanitize, Removal, SanitizeManifest};
pub use split::{split, SplitManifest};

/// Header version written when the source declares none.
const DEFAULT_VERSION: &str = "1.7";

/// Decides what a [`Copier`] copies.
pub trait CopyPolicy {
    /// Whether indirect object `id` may be copied. References to refused
    /// objects become `null`.
    fn allow(&mut self, _ctx: &DocumentContext, _id: ObjectRef) -> bool {
        true
    }

    /// Inspect or edit a dictionary (a stream's included) before its values
    /// are copied. Returning `false` replaces it with `null`.
    fn dict(&mut self, _ctx: &DocumentContext, _owner: Option<ObjectRef>, _dict: &mut Dict) -> bool {
        true
    }
}

/// Copies everything it reaches.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepAll;

impl CopyPolicy for KeepAll {}

/// Renumbers and copies the objects reachable from the values it is given.
pub struct Copier<'c, P> {
    ctx: &'c DocumentContext,
    policy: P,
    map: FxHashMap<ObjectRef, ObjectRef>,
    refused: FxHashSet<ObjectRef>,
    pending: Vec<(ObjectRef, ObjectRef)>,
}

impl<'c, P: CopyPolicy> Copier<'c, P> {
    pub fn new(ctx: &'c DocumentContext, policy: P) -> Self {
        Self {
            ctx,
            policy,
            map: FxHashMap::default(),
            refused: FxHashSet::default(),
            pending: Vec::new(),
        }
    }

    /// Route references to `source` to `target`, which the caller writes.
    pub fn seed(&mut self, source: ObjectRef, target: ObjectRef) {
        self.map.insert(source, target);
    }

    /// Number assigned to `id`, queueing the object for copying on first
    /// sight. `None` when the object is refused or does not resolve.
    pub fn reference(&mut self, id: ObjectRef, writer: &mut PdfWriter) -> Option<ObjectRef> {
        if let Some(target) = self.map.get(&id) {
            return Some(*target);
        }
        if self.refused.contains(&id) {
            return None;
        }
        if self.ctx.resolve(id).is_none() || !self.policy.allow(self.ctx, id) {
            debug!(%id, "reference not copied");
            self.refused.insert(id);
            return None;
        }
        let target = writer.alloc();
        self.map.insert(id, target);
        self.pending.push((id, target));
        Some(target)
    }

    /// `value` with every reference renumbered and the policy applied.
    pub fn translate(
        &mut self,
        value: &PdfValue,
        owner: Option<ObjectRef>,
        writer: &mut PdfWriter,
    ) -> PdfValue {
        match value {
            PdfValue::Reference(r) => self
                .reference(*r, writer)
                .map_or(PdfValue::Null, PdfValue::Reference),
            PdfValue::Array(items) => PdfValue::Array(
                items
                    .iter()
                    .map(|item| self.translate(item, owner, writer))
                    .collect(),
            ),
            PdfValue::Dict(dict) => match self.translate_dict(dict, owner, writer) {
                Some(dict) => PdfValue::Dict(dict),
                None => PdfValue::Null,
            },
            PdfValue::Stream(stream) => {
                let mut dict = stream.dict.clone();
                // rewritten from the data by the writer
                dict.shift_remove("Length");
                match self.translate_dict(&dict, owner, writer) {
                    Some(dict) => PdfValue::Stream(Box::new(Stream::new(dict, stream.raw_bytes()))),
                    None => PdfValue::Null,
                }
            }
            scalar => scalar.clone(),
        }
    }

    fn translate_dict(
        &mut self,
        dict: &Dict,
        owner: Option<ObjectRef>,
        writer: &mut PdfWriter,
    ) -> Option<Dict> {
        let mut dict = dict.clone();
        if !self.policy.dict(self.ctx, owner, &mut dict) {
            return None;
        }
        Some(
            dict.iter()
                .map(|(k, v)| (k.clone(), self.translate(v, owner, writer)))
                .collect(),
        )
    }

    /// Write every queued object, following the references they contain.
    pub fn drain(&mut self, writer: &mut PdfWriter) {
        while let Some((source, target)) = self.pending.pop() {
            let Some(value) = self.ctx.resolve(source) else {
                writer.write_object(target, &PdfValue::Null);
                continue;
            };
            let copied = self.translate(&value, Some(source), writer);
            writer.write_object(target, &copied);
        }
    }

    /// Number of source objects given an output number.
    pub fn copied(&self) -> usize {
        self.map.len()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn into_policy(self) -> P {
        self.policy
    }
}

/// Keeps page-tree structure out of a page copy: intermediate `/Pages`
/// nodes and pages that were not selected are refused.
#[derive(Debug, Default)]
pub(crate) struct PageCopyPolicy {
    excluded: FxHashSet<ObjectRef>,
}

impl PageCopyPolicy {
    pub(crate) fn new(tree: &PageTree, selected: &[&Page]) -> Self {
        let keep: FxHashSet<ObjectRef> = selected.iter().filter_map(|p| p.id).collect();
        let excluded = tree
            .pages
            .iter()
            .filter_map(|p| p.id)
            .filter(|id| !keep.contains(id))
            .collect();
        Self { excluded }
    }
}

impl CopyPolicy for PageCopyPolicy {
    fn allow(&mut self, ctx: &DocumentContext, id: ObjectRef) -> bool {
        if self.excluded.contains(&id) {
            return false;
        }
        ctx.resolve(id)
            .is_none_or(|v| !v.dict().is_some_and(|d| d.has_name("Type", "Pages")))
    }
}

/// Copy `selected` pages of one document into `writer` as children of
/// `parent`, inherited attributes materialized. Returns the new page
/// numbers and how many source objects were copied.
pub(crate) fn copy_pages(
    ctx: &DocumentContext,
    tree: &PageTree,
    selected: &[&Page],
    parent: ObjectRef,
    writer: &mut PdfWriter,
) -> (Vec<ObjectRef>, usize) {
    let mut copier = Copier::new(ctx, PageCopyPolicy::new(tree, selected));
    let targets: Vec<ObjectRef> = selected.iter().map(|_| writer.alloc()).collect();
    for (page, target) in selected.iter().zip(&targets) {
        if let Some(id) = page.id {
            copier.seed(id, *target);
        }
    }

    for (page, target) in selected.iter().zip(&targets) {
        let mut dict = page.view.materialize(&PAGE_INHERITABLE);
        dict.shift_remove("Parent");
        let copied = copier.translate(&PdfValue::Dict(dict), page.id, writer);
        let mut copied = match copied {
            PdfValue::Dict(d) => d,
            _ => Dict::new(),
        };
        copied.insert("Type".to_string(), name("Page"));
        copied.insert("Parent".to_string(), PdfValue::Reference(parent));
        writer.write_object(*target, &PdfValue::Dict(copied));
    }
    copier.drain(writer);
    let copied = copier.copied() + selected.iter().filter(|p| p.id.is_none()).count();
    (targets, copied)
}

/// A `/Pages` node listing `kids`.
pub(crate) fn pages_node(kids: &[ObjectRef]) -> PdfValue {
    let mut dict = Dict::new();
    dict.insert("Type".to_string(), name("Pages"));
    dict.insert(
        "Kids".to_string(),
        PdfValue::Array(kids.iter().copied().map(PdfValue::Reference).collect()),
    );
    dict.insert("Count".to_string(), PdfValue::from(kids.len()));
    PdfValue::Dict(dict)
}

pub(crate) fn catalog_node(pages: ObjectRef) -> PdfValue {
    let mut dict = Dict::new();
    dict.insert("Type".to_string(), name("Catalog"));
    dict.insert("Pages".to_string(), PdfValue::Reference(pages));
    PdfValue::Dict(dict)
}

/// `/Info` must be indirect; a direct dictionary is written as an object.
pub(crate) fn indirect_info(info: PdfValue, writer: &mut PdfWriter) -> Option<PdfValue> {
    match info {
        PdfValue::Reference(_) => Some(info),
        PdfValue::Dict(_) => {
            let id = writer.alloc();
            writer.write_object(id, &info);
            Some(PdfValue::Reference(id))
        }
        _ => None,
    }
}

pub(crate) fn output_version(ctx: &DocumentContext) -> &str {
    ctx.version().unwrap_or(DEFAULT_VERSION)
}

/// Encrypted strings and streams would be copied still encrypted under a
/// key the output no longer declares.
pub(crate) fn ensure_plain(ctx: &DocumentContext) -> Result<()> {
    if ctx.is_encrypted() {
        return Err(PdfError::InvalidArgument(
            "encrypted documents cannot be rewritten".to_string(),
        ));
    }
    Ok(())
}

/// One source page and where it landed, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMapping {
    pub source: usize,
    pub output: usize,
}
