//! Font inventory from page and form resources.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::analysis::{resource_dicts, resource_entries};
use crate::document::{DocumentContext, PageTree};
use crate::model::{Dict, DictExt, ObjectRef, PdfValue};

/// How the font program is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Embedding {
    NotEmbedded,
    /// `/FontFile`
    Type1,
    /// `/FontFile2`
    TrueType,
    /// `/FontFile3`, with its `/Subtype`.
    Program(String),
    /// Glyphs are content streams of the font itself.
    Type3,
}

#[derive(Debug, Clone, Serialize)]
pub struct FontInfo {
    pub object: Option<ObjectRef>,
    pub resource_names: BTreeSet<String>,
    pub base_font: Option<String>,
    pub subtype: Option<String>,
    pub encoding: Option<String>,
    pub embedding: Embedding,
    /// Base font carries a `ABCDEF+` subset tag.
    pub subset: bool,
    pub to_unicode: bool,
    /// `/Subtype` of a Type0 font's descendant.
    pub descendant_subtype: Option<String>,
    pub pages: BTreeSet<usize>,
}

/// Fonts used by each page, directly or through Form XObjects. Indirect
/// fonts are listed once with every page that uses them.
pub fn fonts(ctx: &DocumentContext, tree: &PageTree, notes: &mut Vec<String>) -> Vec<FontInfo> {
    let mut out: Vec<FontInfo> = Vec::new();
    let mut by_ref: FxHashMap<ObjectRef, usize> = FxHashMap::default();

    for page in &tree.pages {
        let Some(resources) = page.resources(ctx) else { continue };
        for dict in resource_dicts(ctx, resources.into_shared()) {
            let Some(dict) = dict.as_dict() else { continue };
            for (name, value) in resource_entries(ctx, dict, "Font") {
                let id = value.as_reference();
                if let Some(slot) = id.and_then(|r| by_ref.get(&r)) {
                    let font = &mut out[*slot];
                    font.resource_names.insert(name);
                    font.pages.insert(page.number);
                    continue;
                }
                let font = ctx.resolve_maybe(&value);
                let Some(font) = font.as_dict() else {
                    notes.push(format!("page {}: font /{name} is not a dictionary", page.number));
                    continue;
                };
                let mut info = describe(ctx, font);
                info.object = id;
                info.resource_names.insert(name);
                info.pages.insert(page.number);
                if let Some(r) = id {
                    by_ref.insert(r, out.len());
                }
                out.push(info);
            }
        }
    }
    out
}

fn describe(ctx: &DocumentContext, font: &Dict) -> FontInfo {
    let subtype = font.get_name("Subtype").map(str::to_string);
    let base_font = font.get_name("BaseFont").map(str::to_string);

    let descendant = (subtype.as_deref() == Some("Type0"))
        .then(|| ctx.get(font, "DescendantFonts"))
        .flatten()
        .and_then(|d| d.as_array().and_then(|a| a.first().cloned()))
        .map(|d| ctx.resolve_maybe(&d).into_shared());
    let descendant_dict = descendant.as_deref().and_then(PdfValue::as_dict);

    let descriptor_owner = descendant_dict.unwrap_or(font);
    let embedding = if subtype.as_deref() == Some("Type3") {
        Embedding::Type3
    } else {
        embedding(ctx, descriptor_owner)
    };

    FontInfo {
        object: None,
        resource_names: BTreeSet::new(),
        subset: base_font.as_deref().is_some_and(is_subset_tag),
        base_font,
        encoding: encoding(ctx, font),
        embedding,
        to_unicode: font.value("ToUnicode").is_some(),
        descendant_subtype: descendant_dict
            .and_then(|d| d.get_name("Subtype"))
            .map(str::to_string),
        subtype,
        pages: BTreeSet::new(),
    }
}

fn embedding(ctx: &DocumentContext, font: &Dict) -> Embedding {
    let Some(descriptor) = ctx.get(font, "FontDescriptor") else {
        return Embedding::NotEmbedded;
    };
    let Some(descriptor) = descriptor.as_dict() else {
        return Embedding::NotEmbedded;
    };
    if descriptor.value("FontFile").is_some() {
        Embedding::Type1
    } else if descriptor.value("FontFile2").is_some() {
        Embedding::TrueType
    } else if let Some(program) = ctx.get(descriptor, "FontFile3") {
        let kind = program
            .dict()
            .and_then(|d| d.get_name("Subtype"))
            .unwrap_or("unknown");
        Embedding::Program(kind.to_string())
    } else {
        Embedding::NotEmbedded
    }
}

fn encoding(ctx: &DocumentContext, font: &Dict) -> Option<String> {
    let encoding = ctx.get(font, "Encoding")?;
    match &*encoding {
        PdfValue::Name(n) => Some(n.clone()),
        PdfValue::Stream(cmap) => Some(
            cmap.dict
                .get_name("CMapName")
                .unwrap_or("embedded CMap")
                .to_string(),
        ),
        PdfValue::Dict(d) => Some(
            d.get_name("BaseEncoding")
                .map_or_else(|| "custom".to_string(), |b| format!("{b} with differences")),
        ),
        _ => None,
    }
}

/// `ABCDEF+Name`: six uppercase letters and a plus sign.
fn is_subset_tag(base_font: &str) -> bool {
    let bytes = base_font.as_bytes();
    bytes.len() > 7 && bytes[6] == b'+' && bytes[..6].iter().all(u8::is_ascii_uppercase)
}
