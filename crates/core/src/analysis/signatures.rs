//! Signature fields of the interactive form.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::debug;

use crate::document::{DocumentContext, InheritedView};
use crate::model::{Dict, DictExt, ObjectRef, PdfValue};

/// Field trees deeper than this are not followed.
const MAX_FIELD_DEPTH: usize = 32;
/// `/P` of a DocMDP transform when the entry is absent.
const DEFAULT_DOCMDP: i64 = 2;

/// The signature dictionary stored in a field's `/V`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureInfo {
    pub object: Option<ObjectRef>,
    pub filter: Option<String>,
    pub sub_filter: Option<String>,
    pub name: Option<String>,
    pub signing_time: Option<String>,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub contact_info: Option<String>,
    pub byte_range: Vec<i64>,
    /// Size of `/Contents` in bytes, padding included.
    pub contents_length: usize,
    /// The two byte ranges start at 0 and end at the end of the file.
    pub covers_whole_file: Option<bool>,
    /// `/P` of a DocMDP transform reference.
    pub docmdp_permissions: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureField {
    /// Fully qualified name: partial names joined with `.`.
    pub name: String,
    pub object: Option<ObjectRef>,
    pub flags: i64,
    pub widgets: usize,
    pub signed: bool,
    pub signature: Option<SignatureInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureReport {
    pub acroform: bool,
    pub sig_flags: Option<i64>,
    pub fields: Vec<SignatureField>,
}

struct Node {
    view: Arc<InheritedView>,
    id: Option<ObjectRef>,
    name: String,
}

/// Every terminal field whose (possibly inherited) `/FT` is `/Sig`.
pub fn signatures(ctx: &DocumentContext, notes: &mut Vec<String>) -> SignatureReport {
    let acroform = ctx
        .catalog()
        .and_then(|c| c.as_dict().and_then(|d| ctx.get(d, "AcroForm")).map(|a| a.into_shared()))
        .filter(|a| a.as_dict().is_some());
    let Some(acroform) = acroform else {
        return SignatureReport {
            acroform: false,
            sig_flags: None,
            fields: Vec::new(),
        };
    };
    let form = acroform.as_dict();
    let sig_flags = form.and_then(|f| ctx.get(f, "SigFlags")).and_then(|f| f.as_i64());
    let roots: Vec<PdfValue> = form
        .and_then(|f| ctx.get(f, "Fields"))
        .and_then(|f| f.as_array().map(<[PdfValue]>::to_vec))
        .unwrap_or_default();

    let mut visited = FxHashSet::default();
    let mut stack: Vec<Node> = Vec::new();
    for field in roots.iter().rev() {
        if let Some(node) = enter(ctx, field, None, "", &mut visited) {
            stack.push(node);
        }
    }

    let mut fields = Vec::new();
    while let Some(node) = stack.pop() {
        let Some(dict) = node.view.dict() else { continue };
        let kids: Vec<PdfValue> = ctx
            .get(dict, "Kids")
            .and_then(|k| k.as_array().map(<[PdfValue]>::to_vec))
            .unwrap_or_default();

        // kids carrying /T are fields; the rest are widget annotations
        let (children, widgets): (Vec<&PdfValue>, Vec<&PdfValue>) = kids
            .iter()
            .partition(|kid| ctx.resolve_maybe(kid).dict().is_some_and(|d| d.value("T").is_some()));

        if !children.is_empty() {
            if node.view.depth() >= MAX_FIELD_DEPTH {
                notes.push(format!("field {:?}: tree deeper than {MAX_FIELD_DEPTH}", node.name));
                continue;
            }
            for kid in children.into_iter().rev() {
                if let Some(child) = enter(ctx, kid, Some(&node.view), &node.name, &mut visited) {
                    stack.push(child);
                }
            }
            continue;
        }

        let is_sig = node.view.get(ctx, "FT").is_some_and(|ft| ft.as_name() == Some("Sig"));
        if !is_sig {
            continue;
        }
        let value = node.view.get(ctx, "V");
        let signature_ref = node
            .view
            .dict()
            .and_then(|d| d.value("V"))
            .and_then(PdfValue::as_reference);
        let signature = value
            .as_ref()
            .and_then(|v| v.as_dict())
            .map(|v| describe(ctx, v, signature_ref));
        if value.is_some() && signature.is_none() {
            notes.push(format!("field {:?}: /V is not a signature dictionary", node.name));
        }
        fields.push(SignatureField {
            flags: node.view.get(ctx, "Ff").and_then(|f| f.as_i64()).unwrap_or(0),
            widgets: widgets.len().max(usize::from(dict.value("Subtype").is_some())),
            signed: signature.is_some(),
            signature,
            object: node.id,
            name: node.name,
        });
    }

    SignatureReport {
        acroform: true,
        sig_flags,
        fields,
    }
}

fn enter(
    ctx: &DocumentContext,
    value: &PdfValue,
    parent: Option<&Arc<InheritedView>>,
    prefix: &str,
    visited: &mut FxHashSet<ObjectRef>,
) -> Option<Node> {
    let id = value.as_reference();
    if let Some(r) = id
        && !visited.insert(r)
    {
        debug!(%r, "field visited twice");
        return None;
    }
    let resolved = ctx.resolve_maybe(value).into_shared();
    let partial = resolved.dict().and_then(|d| d.get_text("T"));
    let name = match (prefix.is_empty(), partial) {
        (_, None) => prefix.to_string(),
        (true, Some(t)) => t,
        (false, Some(t)) => format!("{prefix}.{t}"),
    };
    let view = match parent {
        Some(p) => p.child(resolved),
        None => InheritedView::root(resolved),
    };
    Some(Node { view, id, name })
}

fn describe(ctx: &DocumentContext, sig: &Dict, object: Option<ObjectRef>) -> SignatureInfo {
    let text = |key: &str| ctx.get(sig, key).and_then(|v| v.as_text());
    let name = |key: &str| ctx.get(sig, key).and_then(|v| v.as_name().map(str::to_string));

    let byte_range: Vec<i64> = ctx
        .get(sig, "ByteRange")
        .and_then(|r| r.as_array().map(|items| items.iter().filter_map(PdfValue::as_i64).collect()))
        .unwrap_or_default();
    let covers_whole_file = match byte_range.as_slice() {
        [a, _, c, d] => Some(*a == 0 && c.checked_add(*d) == i64::try_from(ctx.bytes().len()).ok()),
        _ => None,
    };

    SignatureInfo {
        object,
        filter: name("Filter"),
        sub_filter: name("SubFilter"),
        name: text("Name"),
        signing_time: text("M"),
        reason: text("Reason"),
        location: text("Location"),
        contact_info: text("ContactInfo"),
        contents_length: ctx
            .get(sig, "Contents")
            .and_then(|c| c.as_string().map(<[u8]>::len))
            .unwrap_or(0),
        byte_range,
        covers_whole_file,
        docmdp_permissions: docmdp(ctx, sig),
    }
}

fn docmdp(ctx: &DocumentContext, sig: &Dict) -> Option<i64> {
    let references = ctx.get(sig, "Reference")?;
    references.as_array()?.iter().find_map(|r| {
        let r = ctx.resolve_maybe(r);
        let r = r.as_dict()?;
        if r.get_name("TransformMethod") != Some("DocMDP") {
            return None;
        }
        let p = ctx
            .get(r, "TransformParams")
            .and_then(|t| t.as_dict().and_then(|t| t.get_i64("P")))
            .unwrap_or(DEFAULT_DOCMDP);
        Some(p)
    })
}
