//! Removal of active content.

use serde::Serialize;

use crate::document::DocumentContext;
use crate::error::{PdfError, Result};
use crate::model::{Dict, DictExt, ObjectRef, PdfValue};
use crate::rewrite::{ensure_plain, indirect_info, output_version, CopyPolicy, Copier};
use crate::writer::PdfWriter;

/// Action types that run code, open files or send data.
const ACTIVE_ACTIONS: [&str; 6] = [
    "JavaScript",
    "Launch",
    "SubmitForm",
    "GoToR",
    "Rendition",
    "ImportData",
];
/// Keys removed wherever they appear.
const TRIGGER_KEYS: [&str; 2] = ["OpenAction", "AA"];
/// Name-dictionary trees removed.
const NAME_TREES: [&str; 2] = ["JavaScript", "EmbeddedFiles"];

/// Something left out of the sanitized copy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Removal {
    /// Source object that held the item, when it was indirect.
    pub object: Option<ObjectRef>,
    pub item: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizeManifest {
    pub removed: Vec<Removal>,
    pub objects_copied: usize,
    pub source_objects: usize,
}

#[derive(Debug, Default)]
struct SanitizePolicy {
    removed: Vec<Removal>,
}

impl SanitizePolicy {
    fn record(&mut self, owner: Option<ObjectRef>, item: String) {
        self.removed.push(Removal { object: owner, item });
    }
}

impl CopyPolicy for SanitizePolicy {
    fn dict(&mut self, _ctx: &DocumentContext, owner: Option<ObjectRef>, dict: &mut Dict) -> bool {
        if let Some(kind) = dict.get_name("S")
            && ACTIVE_ACTIONS.contains(&kind)
        {
            let item = format!("{kind} action");
            self.record(owner, item);
            return false;
        }
        if dict.has_name("Type", "EmbeddedFile") {
            self.record(owner, "embedded file stream".to_string());
            return false;
        }
        for key in TRIGGER_KEYS {
            if dict.shift_remove(key).is_some() {
                self.record(owner, format!("/{key}"));
            }
        }
        // only a names dictionary carries these as keys
        for key in NAME_TREES {
            if dict.get(key).is_some_and(|v| matches!(v, PdfValue::Dict(_) | PdfValue::Reference(_)))
            {
                dict.shift_remove(key);
                self.record(owner, format!("/Names/{key}"));
            }
        }
        if dict.shift_remove("EF").is_some() {
            self.record(owner, "/EF file payload".to_string());
        }
        true
    }
}

/// Copy of everything reachable from the trailer's `/Root` and `/Info`,
/// without document triggers, JavaScript, embedded files or active actions.
pub fn sanitize(ctx: &DocumentContext) -> Result<(Vec<u8>, SanitizeManifest)> {
    ensure_plain(ctx)?;
    let root = ctx
        .root()
        .filter(|_| ctx.catalog().is_some())
        .ok_or_else(|| PdfError::InvalidArgument("document has no catalog to copy".to_string()))?;

    let mut writer = PdfWriter::new(output_version(ctx));
    let mut copier = Copier::new(ctx, SanitizePolicy::default());
    let catalog = copier
        .reference(root, &mut writer)
        .ok_or_else(|| PdfError::InvalidArgument("document has no catalog to copy".to_string()))?;
    let info = ctx
        .trailer()
        .get("Info")
        .map(|info| copier.translate(info, None, &mut writer));
    copier.drain(&mut writer);
    let info = info.and_then(|i| indirect_info(i, &mut writer));

    let mut trailer = Dict::new();
    trailer.insert("Root".to_string(), PdfValue::Reference(catalog));
    if let Some(info) = info {
        trailer.insert("Info".to_string(), info);
    }
    let objects_copied = copier.copied();
    let mut removed = copier.into_policy().removed;
    removed.sort();
    removed.dedup();

    let manifest = SanitizeManifest {
        removed,
        objects_copied,
        source_objects: ctx.in_use_refs().len(),
    };
    Ok((writer.finish(trailer), manifest))
}
