//! Page extraction into a new document.

use serde::Serialize;

use crate::document::{DocumentContext, PageTree};
use crate::error::{PdfError, Result};
use crate::model::{Dict, PdfValue};
use crate::rewrite::{
    catalog_node, copy_pages, ensure_plain, indirect_info, output_version, pages_node, Copier,
    KeepAll, PageMapping,
};
use crate::writer::PdfWriter;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitManifest {
    pub pages: Vec<PageMapping>,
    /// Source objects written to the output.
    pub objects_copied: usize,
    /// In-use objects of the source.
    pub source_objects: usize,
}

/// A new document holding the given 1-based pages in the given order.
///
/// Only objects reachable from those pages are copied, never following
/// `/Parent`, and inherited page attributes are written onto each page.
pub fn split(ctx: &DocumentContext, tree: &PageTree, pages: &[usize]) -> Result<(Vec<u8>, SplitManifest)> {
    ensure_plain(ctx)?;
    let selected = pages
        .iter()
        .map(|&n| {
            tree.get(n).ok_or_else(|| {
                PdfError::InvalidArgument(format!("page {n} is out of range 1-{}", tree.len()))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if selected.is_empty() {
        return Err(PdfError::InvalidArgument("no pages selected".to_string()));
    }

    let mut writer = PdfWriter::new(output_version(ctx));
    let catalog = writer.alloc();
    let root = writer.alloc();
    let (kids, mut objects_copied) = copy_pages(ctx, tree, &selected, root, &mut writer);
    writer.write_object(root, &pages_node(&kids));
    writer.write_object(catalog, &catalog_node(root));

    let mut trailer = Dict::new();
    trailer.insert("Root".to_string(), PdfValue::Reference(catalog));
    if let Some(info) = ctx.trailer().get("Info") {
        let mut copier = Copier::new(ctx, KeepAll);
        let info = copier.translate(info, None, &mut writer);
        copier.drain(&mut writer);
        objects_copied += copier.copied();
        if let Some(info) = indirect_info(info, &mut writer) {
            trailer.insert("Info".to_string(), info);
        }
    }

    let manifest = SplitManifest {
        pages: pages
            .iter()
            .enumerate()
            .map(|(i, &source)| PageMapping { source, output: i + 1 })
            .collect(),
        objects_copied,
        source_objects: ctx.in_use_refs().len(),
    };
    Ok((writer.finish(trailer), manifest))
}
