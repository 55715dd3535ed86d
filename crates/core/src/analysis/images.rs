//! Image inventory and export.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::analysis::{color_space_name, resource_dicts, resource_entries};
use crate::codec::filters::{filter_names, FilterStatus};
use crate::document::{DocumentContext, PageTree};
use crate::model::{Dict, DictExt, InlineImage, ObjectRef, PdfValue};
use crate::parser::content::ContentParser;
use crate::writer::png::{encode_bilevel, BitPolarity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    XObject,
    Inline,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub kind: ImageKind,
    pub object: Option<ObjectRef>,
    pub resource_names: BTreeSet<String>,
    pub pages: BTreeSet<usize>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub bits_per_component: Option<i64>,
    pub color_space: Option<String>,
    pub image_mask: bool,
    pub filters: Vec<String>,
    /// Raw stream length, or inline payload length.
    pub length: usize,
}

/// Image XObjects from page resources (entering Form XObjects) and inline
/// images from page content. At most `max_ops` operations are read per page.
pub fn images(
    ctx: &DocumentContext,
    tree: &PageTree,
    max_ops: usize,
    notes: &mut Vec<String>,
) -> Vec<ImageInfo> {
    let mut out: Vec<ImageInfo> = Vec::new();
    let mut by_ref: FxHashMap<ObjectRef, usize> = FxHashMap::default();

    for page in &tree.pages {
        if let Some(resources) = page.resources(ctx) {
            for dict in resource_dicts(ctx, resources.into_shared()) {
                let Some(dict) = dict.as_dict() else { continue };
                for (name, value) in resource_entries(ctx, dict, "XObject") {
                    let id = value.as_reference();
                    if let Some(slot) = id.and_then(|r| by_ref.get(&r)) {
                        out[*slot].resource_names.insert(name);
                        out[*slot].pages.insert(page.number);
                        continue;
                    }
                    let xobject = ctx.resolve_maybe(&value);
                    let Some(stream) = xobject.as_stream() else { continue };
                    if !stream.dict.has_name("Subtype", "Image") {
                        continue;
                    }
                    let mut info = describe_xobject(ctx, &stream.dict, stream.raw().len());
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

        let content = page.content(ctx);
        notes.extend(content.notes);
        for op in ContentParser::new(&content.data).take(max_ops) {
            if let Some(inline) = op.inline_image() {
                let mut info = describe_inline(ctx, inline);
                info.pages.insert(page.number);
                out.push(info);
            }
        }
    }
    out
}

fn describe_xobject(ctx: &DocumentContext, dict: &Dict, length: usize) -> ImageInfo {
    let mut filter_dict = Dict::new();
    if let Some(f) = ctx.get(dict, "Filter") {
        filter_dict.insert("Filter".to_string(), (*f).clone());
    }
    ImageInfo {
        kind: ImageKind::XObject,
        object: None,
        resource_names: BTreeSet::new(),
        pages: BTreeSet::new(),
        width: ctx.get(dict, "Width").and_then(|v| v.as_i64()),
        height: ctx.get(dict, "Height").and_then(|v| v.as_i64()),
        bits_per_component: ctx.get(dict, "BitsPerComponent").and_then(|v| v.as_i64()),
        color_space: dict.get("ColorSpace").and_then(|cs| color_space_name(ctx, cs)),
        image_mask: dict.value("ImageMask").and_then(PdfValue::as_bool).unwrap_or(false),
        filters: filter_names(&filter_dict),
        length,
    }
}

/// Value of an inline image key under its full or abbreviated name.
fn inline_value<'a>(header: &'a Dict, full: &str, short: &str) -> Option<&'a PdfValue> {
    header.value(full).or_else(|| header.value(short))
}

fn expand_color_space(name: &str) -> &str {
    match name {
        "G" => "DeviceGray",
        "RGB" => "DeviceRGB",
        "CMYK" => "DeviceCMYK",
        "I" => "Indexed",
        other => other,
    }
}

fn expand_filter(name: &str) -> &str {
    match name {
        "AHx" => "ASCIIHexDecode",
        "A85" => "ASCII85Decode",
        "LZW" => "LZWDecode",
        "Fl" => "FlateDecode",
        "RL" => "RunLengthDecode",
        "CCF" => "CCITTFaxDecode",
        "DCT" => "DCTDecode",
        other => other,
    }
}

fn describe_inline(ctx: &DocumentContext, image: &InlineImage) -> ImageInfo {
    let header = &image.header;
    let number = |full, short| inline_value(header, full, short).and_then(PdfValue::as_i64);
    let filters = match inline_value(header, "Filter", "F") {
        Some(PdfValue::Name(n)) => vec![expand_filter(n).to_string()],
        Some(PdfValue::Array(items)) => items
            .iter()
            .filter_map(PdfValue::as_name)
            .map(|n| expand_filter(n).to_string())
            .collect(),
        _ => Vec::new(),
    };
    ImageInfo {
        kind: ImageKind::Inline,
        object: None,
        resource_names: BTreeSet::new(),
        pages: BTreeSet::new(),
        width: number("Width", "W"),
        height: number("Height", "H"),
        bits_per_component: number("BitsPerComponent", "BPC"),
        color_space: inline_value(header, "ColorSpace", "CS")
            .and_then(|cs| color_space_name(ctx, cs))
            .map(|cs| expand_color_space(&cs).to_string()),
        image_mask: inline_value(header, "ImageMask", "IM")
            .and_then(PdfValue::as_bool)
            .unwrap_or(false),
        filters,
        length: image.payload_len,
    }
}

/// An image ready to be written to an archive.
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub file_name: String,
    pub object: ObjectRef,
    pub format: &'static str,
    pub bytes: Vec<u8>,
}

/// Extract an XObject image's payload: JPEG and JPEG 2000 data as stored,
/// 1-bit images as PNG, anything else as decoded samples (or the raw stream
/// when its filter is not decoded). Inline images are not exported.
pub fn export_image(
    ctx: &DocumentContext,
    info: &ImageInfo,
    notes: &mut Vec<String>,
) -> Option<ExportedImage> {
    let id = info.object?;
    let value = ctx.resolve(id)?;
    let stream = value.as_stream()?;
    let stem = format!("image_{}_{}", id.number, id.generation);
    let export = |format: &'static str, ext: &str, bytes: Vec<u8>| ExportedImage {
        file_name: format!("{stem}.{ext}"),
        object: id,
        format,
        bytes,
    };

    match info.filters.as_slice() {
        [only] if only == "DCTDecode" => return Some(export("jpeg", "jpg", stream.raw().to_vec())),
        [only] if only == "JPXDecode" => return Some(export("jpeg2000", "jp2", stream.raw().to_vec())),
        _ => {}
    }

    let decoded = ctx.decode_stream(stream);
    match &decoded.status {
        FilterStatus::Unsupported(reason) => {
            notes.push(format!("image {id}: {reason}; exported undecoded"));
            return Some(export("raw", "bin", stream.raw().to_vec()));
        }
        FilterStatus::Failed(reason) => notes.push(format!("image {id}: {reason}")),
        FilterStatus::Unfiltered | FilterStatus::Decoded => {}
    }

    let bilevel = info.image_mask || info.bits_per_component == Some(1);
    let single_channel = info.image_mask
        || matches!(info.color_space.as_deref(), None | Some("DeviceGray" | "CalGray"));
    if bilevel
        && single_channel
        && let (Some(w), Some(h)) = (info.width, info.height)
        && let (Ok(w), Ok(h)) = (u32::try_from(w), u32::try_from(h))
        && w > 0
        && h > 0
    {
        let polarity = polarity(ctx, &stream.dict);
        if let Some(png) = encode_bilevel(w, h, &decoded.data, polarity) {
            return Some(export("png", "png", png));
        }
        notes.push(format!(
            "image {id}: {w}x{h} exceeds {} bytes of data; exported as samples",
            decoded.data.len()
        ));
    }
    Some(export("samples", "raw", decoded.data))
}

/// `/Decode [1 0]` flips which sample value is dark.
fn polarity(ctx: &DocumentContext, dict: &Dict) -> BitPolarity {
    let inverted = ctx
        .get(dict, "Decode")
        .and_then(|d| {
            let items = d.as_array()?;
            Some(items.first()?.as_f64()? > items.get(1)?.as_f64()?)
        })
        .unwrap_or(false);
    if inverted {
        BitPolarity::OneIsBlack
    } else {
        BitPolarity::ZeroIsBlack
    }
}
