//! Concatenation of several documents.

use serde::Serialize;
use tracing::debug;

use crate::document::{DocumentContext, PageTree};
use crate::error::{PdfError, Result};
use crate::model::{Dict, PdfValue};
use crate::rewrite::{catalog_node, copy_pages, ensure_plain, pages_node};
use crate::writer::PdfWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergedPage {
    /// 0-based position of the input document.
    pub input: usize,
    pub source_page: usize,
    pub output_page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeManifest {
    pub pages: Vec<MergedPage>,
    /// Source objects copied from each input.
    pub objects_copied: Vec<usize>,
}

/// All pages of every input, in input order. Each input's objects are
/// renumbered into their own range of the output.
pub fn merge(inputs: &[(&DocumentContext, &PageTree)]) -> Result<(Vec<u8>, MergeManifest)> {
    if inputs.is_empty() {
        return Err(PdfError::InvalidArgument("nothing to merge".to_string()));
    }
    for (ctx, _) in inputs {
        ensure_plain(ctx)?;
    }

    let version = inputs
        .iter()
        .filter_map(|(ctx, _)| ctx.version())
        .max_by(|a, b| version_key(a).total_cmp(&version_key(b)))
        .unwrap_or("1.7");
    let mut writer = PdfWriter::new(version);
    let catalog = writer.alloc();
    let root = writer.alloc();

    let mut kids = Vec::new();
    let mut pages = Vec::new();
    let mut objects_copied = Vec::with_capacity(inputs.len());
    for (input, (ctx, tree)) in inputs.iter().enumerate() {
        let selected: Vec<_> = tree.pages.iter().collect();
        let (targets, copied) = copy_pages(ctx, tree, &selected, root, &mut writer);
        debug!(input, pages = targets.len(), copied, "input merged");
        for (page, target) in selected.iter().zip(targets) {
            kids.push(target);
            pages.push(MergedPage {
                input,
                source_page: page.number,
                output_page: kids.len(),
            });
        }
        objects_copied.push(copied);
    }
    if kids.is_empty() {
        return Err(PdfError::InvalidArgument("inputs contain no pages".to_string()));
    }

    writer.write_object(root, &pages_node(&kids));
    writer.write_object(catalog, &catalog_node(root));
    let mut trailer = Dict::new();
    trailer.insert("Root".to_string(), PdfValue::Reference(catalog));
    Ok((writer.finish(trailer), MergeManifest { pages, objects_copied }))
}

/// `"1.7"` as a number for picking the newest header.
fn version_key(version: &str) -> f64 {
    version.parse().unwrap_or(0.0)
}
