//! Object-graph reachability and orphan detection.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::document::DocumentContext;
use crate::model::{DictExt, ObjectRef, PdfValue};

/// Result of walking the graph from the trailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Reachability {
    Known { reachable: BTreeSet<ObjectRef> },
    /// No root could be located, so nothing is known to be unreachable.
    Unknown,
}

impl Reachability {
    pub fn reachable(&self) -> Option<&BTreeSet<ObjectRef>> {
        match self {
            Self::Known { reachable } => Some(reachable),
            Self::Unknown => None,
        }
    }
}

/// Objects reached by a walk, and references that led nowhere.
#[derive(Debug, Default, Clone)]
pub struct Walk {
    pub reached: BTreeSet<ObjectRef>,
    pub dangling: BTreeSet<ObjectRef>,
}

/// Depth-first walk over every reference edge starting at `starts`.
///
/// Dictionary entries are followed only when `follow(key)` holds.
pub fn walk_refs(
    ctx: &DocumentContext,
    starts: impl IntoIterator<Item = ObjectRef>,
    follow: impl Fn(&str) -> bool,
) -> Walk {
    let mut walk = Walk::default();
    let mut seen = BTreeSet::new();
    let mut pending: Vec<ObjectRef> = starts.into_iter().filter(|r| seen.insert(*r)).collect();

    while let Some(id) = pending.pop() {
        let Some(object) = ctx.resolve(id) else {
            walk.dangling.insert(id);
            continue;
        };
        walk.reached.insert(id);

        let mut values: Vec<&PdfValue> = vec![object.as_ref()];
        while let Some(value) = values.pop() {
            match value {
                PdfValue::Reference(r) => {
                    if seen.insert(*r) {
                        pending.push(*r);
                    }
                }
                PdfValue::Array(items) => values.extend(items),
                PdfValue::Dict(dict) => values.extend(
                    dict.iter()
                        .filter(|(k, _)| follow(k))
                        .map(|(_, v)| v),
                ),
                PdfValue::Stream(stream) => values.extend(
                    stream
                        .dict
                        .iter()
                        .filter(|(k, _)| follow(k))
                        .map(|(_, v)| v),
                ),
                _ => {}
            }
        }
    }
    walk
}

fn walk_from_trailer(ctx: &DocumentContext) -> Option<Walk> {
    ctx.catalog()?;
    let starts = ["Root", "Info"]
        .into_iter()
        .filter_map(|key| ctx.trailer().get_ref(key));
    Some(walk_refs(ctx, starts, |_| true))
}

/// Walk from the trailer's `/Root` and `/Info`.
pub fn reachability(ctx: &DocumentContext) -> Reachability {
    walk_from_trailer(ctx).map_or(Reachability::Unknown, |walk| Reachability::Known {
        reachable: walk.reached,
    })
}

/// An in-use object the document never reaches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Orphan {
    pub id: ObjectRef,
    /// Revision (0 = original file) whose xref last declared the object.
    pub revision: usize,
    /// Value kind, e.g. `"dict"` or `"stream"`; `None` if unparseable.
    pub kind: Option<&'static str>,
    /// `/Type` of a dictionary or stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrphanReport {
    pub reachability: &'static str,
    pub object_count: usize,
    pub reachable_count: Option<usize>,
    /// `None` when reachability is unknown, distinct from an empty list.
    pub orphan_count: Option<usize>,
    pub orphans: Option<Vec<Orphan>>,
    pub dangling: Vec<ObjectRef>,
}

/// Compare every in-use object against the reachable set.
pub fn orphans(ctx: &DocumentContext) -> OrphanReport {
    let in_use = ctx.in_use_refs();
    let Some(Walk {
        reached: reachable,
        dangling,
    }) = walk_from_trailer(ctx)
    else {
        return OrphanReport {
            reachability: "unknown",
            object_count: in_use.len(),
            reachable_count: None,
            orphan_count: None,
            orphans: None,
            dangling: Vec::new(),
        };
    };

    let structural = ctx.structural_refs();
    let orphans: Vec<Orphan> = in_use
        .iter()
        .filter(|id| !reachable.contains(id) && !structural.contains(id))
        .map(|&id| {
            let object = ctx.resolve(id);
            Orphan {
                id,
                revision: ctx.entries().get(&id.number).map_or(0, |e| e.revision),
                kind: object.as_deref().map(PdfValue::type_name),
                type_name: object
                    .as_deref()
                    .and_then(PdfValue::dict)
                    .and_then(|d| d.get_name("Type"))
                    .map(str::to_string),
            }
        })
        .collect();

    debug!(orphans = orphans.len(), reachable = reachable.len(), "reachability computed");

    OrphanReport {
        reachability: "known",
        object_count: in_use.len(),
        reachable_count: Some(reachable.len()),
        orphan_count: Some(orphans.len()),
        orphans: Some(orphans),
        dangling: dangling.into_iter().collect(),
    }
}
