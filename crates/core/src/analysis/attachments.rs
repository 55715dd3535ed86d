//! Embedded file discovery and integrity checks.

use rustc_hash::FxHashSet;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::analysis::filespec_name;
use crate::codec::filters::FilterStatus;
use crate::document::{DocumentContext, PageTree};
use crate::model::{Dict, DictExt, ObjectRef, PdfValue};

/// Where an attachment was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentSource {
    NameTree,
    Annotation { page: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    /// Name-tree key, or the file name for annotation attachments.
    pub name: String,
    pub source: AttachmentSource,
    /// The file specification object.
    pub object: Option<ObjectRef>,
    /// The embedded file stream.
    pub stream: Option<ObjectRef>,
    pub filename: Option<String>,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    /// `/Params /Size`.
    pub declared_size: Option<i64>,
    /// Length of the decoded payload.
    pub actual_size: Option<usize>,
    /// Whether `/Params /CheckSum` matches the payload's MD5.
    pub checksum_ok: Option<bool>,
    pub sha256: Option<String>,
    pub decode: Option<FilterStatus>,
    #[serde(skip)]
    pub payload: Option<Vec<u8>>,
}

/// Attachments from `/Names /EmbeddedFiles` and `/FileAttachment`
/// annotations. A file specification reached both ways is listed once.
pub fn attachments(
    ctx: &DocumentContext,
    tree: &PageTree,
    notes: &mut Vec<String>,
) -> Vec<Attachment> {
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();

    if let Some(catalog) = ctx.catalog()
        && let Some(names) = catalog.as_dict().and_then(|c| ctx.get(c, "Names"))
        && let Some(files) = names.as_dict().and_then(|n| n.get("EmbeddedFiles"))
    {
        for (name, spec) in ctx.name_tree(files) {
            if let Some(r) = spec.as_reference() {
                seen.insert(r);
            }
            out.extend(describe(ctx, name, AttachmentSource::NameTree, &spec, notes));
        }
    }

    for page in &tree.pages {
        for entry in page.annotations(ctx) {
            let annot = ctx.resolve_maybe(&entry);
            let Some(dict) = annot.as_dict() else { continue };
            if !dict.has_name("Subtype", "FileAttachment") {
                continue;
            }
            let Some(spec) = dict.get("FS") else {
                notes.push(format!("page {}: file attachment without /FS", page.number));
                continue;
            };
            if let Some(r) = spec.as_reference()
                && !seen.insert(r)
            {
                continue;
            }
            let name = filespec_name(ctx, spec).unwrap_or_else(|| "attachment".to_string());
            let source = AttachmentSource::Annotation { page: page.number };
            out.extend(describe(ctx, name, source, spec, notes));
        }
    }
    out
}

fn describe(
    ctx: &DocumentContext,
    name: String,
    source: AttachmentSource,
    spec: &PdfValue,
    notes: &mut Vec<String>,
) -> Option<Attachment> {
    let resolved = ctx.resolve_maybe(spec);
    let Some(dict) = resolved.as_dict() else {
        notes.push(format!("attachment {name}: file specification is not a dictionary"));
        return None;
    };

    let mut attachment = Attachment {
        filename: dict.get_text("UF").or_else(|| dict.get_text("F")),
        description: dict.get_text("Desc"),
        name,
        source,
        object: spec.as_reference(),
        stream: None,
        mime_type: None,
        declared_size: None,
        actual_size: None,
        checksum_ok: None,
        sha256: None,
        decode: None,
        payload: None,
    };

    let Some(ef) = ctx.get(dict, "EF") else {
        notes.push(format!("attachment {}: no /EF stream", attachment.name));
        return Some(attachment);
    };
    let Some(stream_value) = ef.as_dict().and_then(|ef| ef.get("UF").or_else(|| ef.get("F"))) else {
        return Some(attachment);
    };
    attachment.stream = stream_value.as_reference();
    let stream = ctx.resolve_maybe(stream_value);
    let Some(stream) = stream.as_stream() else {
        notes.push(format!("attachment {}: /EF entry is not a stream", attachment.name));
        return Some(attachment);
    };

    attachment.mime_type = stream.dict.get_name("Subtype").map(str::to_string);
    let params = ctx.get(&stream.dict, "Params");
    let params: Option<&Dict> = params.as_ref().and_then(|p| p.as_dict());
    attachment.declared_size = params.and_then(|p| p.get_i64("Size"));

    let decoded = ctx.decode_stream(stream);
    if let Some(reason) = decoded.reason() {
        notes.push(format!("attachment {}: {reason}", attachment.name));
    }
    if !matches!(decoded.status, FilterStatus::Unsupported(_)) {
        let data = decoded.data;
        attachment.actual_size = Some(data.len());
        attachment.sha256 = Some(hex::encode(Sha256::digest(&data)));
        attachment.checksum_ok = params
            .and_then(|p| p.value("CheckSum"))
            .and_then(PdfValue::as_string)
            .map(|sum| sum == md5::compute(&data).0);
        attachment.payload = Some(data);
    }
    attachment.decode = Some(decoded.status);
    Some(attachment)
}
