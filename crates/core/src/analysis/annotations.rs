//! Page annotation listing.

use serde::Serialize;

use crate::document::{DocumentContext, PageTree};
use crate::model::{DictExt, ObjectRef, PdfValue};

/// Annotation flag bit for "hidden".
const FLAG_HIDDEN: i64 = 1 << 1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub page: usize,
    pub object: Option<ObjectRef>,
    pub subtype: Option<String>,
    pub rect: Option<[f64; 4]>,
    pub contents: Option<String>,
    pub title: Option<String>,
    pub modified: Option<String>,
    pub flags: i64,
    pub hidden: bool,
    /// `/S` of the `/A` action.
    pub action: Option<String>,
    pub uri: Option<String>,
    /// Target of a `/Dest` entry, when it names a page object.
    pub destination: Option<ObjectRef>,
}

/// Every annotation of every page, in page then array order.
pub fn annotations(ctx: &DocumentContext, tree: &PageTree, notes: &mut Vec<String>) -> Vec<Annotation> {
    let mut out = Vec::new();
    for page in &tree.pages {
        for entry in page.annotations(ctx) {
            let value = ctx.resolve_maybe(&entry);
            let Some(dict) = value.as_dict() else {
                notes.push(format!("page {}: annotation entry is not a dictionary", page.number));
                continue;
            };

            let action = ctx.get(dict, "A");
            let action = action.as_ref().and_then(|a| a.as_dict());
            let destination = ctx.get(dict, "Dest").and_then(|d| match &*d {
                PdfValue::Array(items) => items.first().and_then(PdfValue::as_reference),
                _ => None,
            });
            let flags = dict.get_i64("F").unwrap_or(0);

            out.push(Annotation {
                page: page.number,
                object: entry.as_reference(),
                subtype: dict.get_name("Subtype").map(str::to_string),
                rect: ctx.get(dict, "Rect").and_then(|r| r.as_rect()),
                contents: ctx.get(dict, "Contents").and_then(|c| c.as_text()),
                title: ctx.get(dict, "T").and_then(|t| t.as_text()),
                modified: ctx.get(dict, "M").and_then(|m| m.as_text()),
                flags,
                hidden: flags & FLAG_HIDDEN != 0,
                action: action.and_then(|a| a.get_name("S")).map(str::to_string),
                uri: action.and_then(|a| ctx.get(a, "URI")).and_then(|u| u.as_text()),
                destination,
            });
        }
    }
    out
}
