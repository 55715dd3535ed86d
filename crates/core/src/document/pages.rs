//! Page tree traversal.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::codec::filters::FilterStatus;
use crate::document::context::{DocumentContext, Resolved};
use crate::document::inherit::InheritedView;
use crate::model::{Dict, DictExt, ObjectRef, PdfValue};

/// A leaf of the page tree.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based position in document order.
    pub number: usize,
    /// `None` for a page dictionary stored directly in `/Kids`.
    pub id: Option<ObjectRef>,
    pub view: Arc<InheritedView>,
}

/// Decoded content of one page.
#[derive(Debug, Default)]
pub struct PageContent {
    pub data: Vec<u8>,
    pub notes: Vec<String>,
}

impl Page {
    pub fn dict(&self) -> Option<&Dict> {
        self.view.dict()
    }

    pub fn media_box(&self, ctx: &DocumentContext) -> Option<[f64; 4]> {
        self.view.get(ctx, "MediaBox").and_then(|b| b.as_rect())
    }

    /// `/CropBox`, defaulting to the media box.
    pub fn crop_box(&self, ctx: &DocumentContext) -> Option<[f64; 4]> {
        self.view
            .get(ctx, "CropBox")
            .and_then(|b| b.as_rect())
            .or_else(|| self.media_box(ctx))
    }

    /// Rotation normalized to 0, 90, 180 or 270.
    pub fn rotate(&self, ctx: &DocumentContext) -> i64 {
        let rotate = self
            .view
            .get(ctx, "Rotate")
            .and_then(|r| r.as_i64())
            .unwrap_or(0);
        (rotate.rem_euclid(360) / 90) * 90
    }

    pub fn resources<'a>(&'a self, ctx: &DocumentContext) -> Option<Resolved<'a>> {
        self.view
            .get(ctx, "Resources")
            .filter(|r| r.as_dict().is_some())
    }

    /// The `/Annots` array, items unresolved.
    pub fn annotations(&self, ctx: &DocumentContext) -> Vec<PdfValue> {
        self.dict()
            .and_then(|d| ctx.get(d, "Annots"))
            .and_then(|a| a.as_array().map(<[PdfValue]>::to_vec))
            .unwrap_or_default()
    }

    /// Concatenated content streams, decoded. Streams with an unsupported
    /// filter are skipped; failed streams contribute what was recovered.
    pub fn content(&self, ctx: &DocumentContext) -> PageContent {
        let mut out = PageContent::default();
        let Some(contents) = self.dict().and_then(|d| ctx.get(d, "Contents")) else {
            return out;
        };
        let parts: Vec<Arc<PdfValue>> = match &*contents {
            PdfValue::Array(items) => items
                .iter()
                .map(|item| ctx.resolve_maybe(item).into_shared())
                .collect(),
            _ => vec![contents.clone().into_shared()],
        };

        for part in parts {
            let Some(stream) = part.as_stream() else {
                out.notes
                    .push(format!("page {}: content entry is not a stream", self.number));
                continue;
            };
            let decoded = ctx.decode_stream(stream);
            match &decoded.status {
                FilterStatus::Unsupported(reason) => {
                    out.notes.push(format!("page {}: {reason}", self.number));
                    continue;
                }
                FilterStatus::Failed(reason) => {
                    out.notes.push(format!("page {}: {reason}", self.number));
                }
                FilterStatus::Unfiltered | FilterStatus::Decoded => {}
            }
            if !out.data.is_empty() {
                out.data.push(b'\n');
            }
            out.data.extend_from_slice(&decoded.data);
        }
        out
    }
}

/// Pages in document order plus anything odd found on the way.
#[derive(Debug, Default)]
pub struct PageTree {
    pub pages: Vec<Page>,
    pub notes: Vec<String>,
}

impl PageTree {
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page by 1-based number.
    pub fn get(&self, number: usize) -> Option<&Page> {
        number.checked_sub(1).and_then(|i| self.pages.get(i))
    }
}

/// Walk `/Root /Pages` depth first, honouring `/Kids` order.
///
/// When the tree yields nothing, every object with `/Type /Page` is taken in
/// object-number order instead.
pub fn page_tree(ctx: &DocumentContext) -> PageTree {
    let mut tree = PageTree::default();
    let Some(catalog) = ctx.catalog() else {
        tree.notes.push("no document catalog".to_string());
        return tree;
    };
    let Some(catalog_dict) = catalog.as_dict() else {
        return tree;
    };
    let Some(root) = catalog_dict.get("Pages") else {
        tree.notes.push("catalog has no /Pages".to_string());
        return tree;
    };

    let mut visited = FxHashSet::default();
    let mut stack: Vec<(PdfValue, Option<Arc<InheritedView>>)> = vec![(root.clone(), None)];

    while let Some((entry, parent)) = stack.pop() {
        let id = entry.as_reference();
        if let Some(r) = id
            && !visited.insert(r)
        {
            tree.notes.push(format!("page tree revisits {r}"));
            continue;
        }
        let node = ctx.resolve_maybe(&entry).into_shared();
        let Some(dict) = node.as_dict() else {
            let what = id.map_or_else(|| "direct node".to_string(), |r| r.to_string());
            tree.notes.push(format!("page tree node {what} is not a dictionary"));
            continue;
        };

        let is_intermediate =
            dict.has_name("Type", "Pages") || (!dict.has_name("Type", "Page") && dict.contains_key("Kids"));
        let kids = is_intermediate
            .then(|| ctx.get(dict, "Kids"))
            .flatten()
            .and_then(|k| k.as_array().map(<[PdfValue]>::to_vec));
        let view = match &parent {
            Some(p) => p.child(Arc::clone(&node)),
            None => InheritedView::root(Arc::clone(&node)),
        };

        if is_intermediate {
            for kid in kids.unwrap_or_default().into_iter().rev() {
                stack.push((kid, Some(Arc::clone(&view))));
            }
        } else {
            tree.pages.push(Page {
                number: tree.pages.len() + 1,
                id,
                view,
            });
        }
    }

    if tree.pages.is_empty() {
        let fallback = scan_page_objects(ctx);
        if !fallback.is_empty() {
            warn!(pages = fallback.len(), "page tree empty; using /Type /Page objects");
            tree.notes.push(format!(
                "page tree yielded no pages; using {} /Type /Page objects",
                fallback.len()
            ));
            tree.pages = fallback;
        }
    } else if let Some(count) = ctx
        .resolve_maybe(root)
        .dict()
        .and_then(|d| d.get_i64("Count"))
        && usize::try_from(count).ok() != Some(tree.pages.len())
    {
        tree.notes.push(format!(
            "page tree /Count {count} but {} pages found",
            tree.pages.len()
        ));
    }

    debug!(pages = tree.pages.len(), "page tree walked");
    tree
}

fn scan_page_objects(ctx: &DocumentContext) -> Vec<Page> {
    ctx.in_use_refs()
        .into_iter()
        .filter_map(|id| {
            let node = ctx.resolve(id)?;
            node.as_dict()
                .is_some_and(|d| d.has_name("Type", "Page"))
                .then_some((id, node))
        })
        .enumerate()
        .map(|(i, (id, node))| Page {
            number: i + 1,
            id: Some(id),
            view: InheritedView::root(node),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(objects: &[&str]) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
        }
        let xref = out.len();
        out.extend(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for o in offsets {
            out.extend(format!("{o:010} 00000 n \n").as_bytes());
        }
        out.extend(format!("trailer\n<< /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n").as_bytes());
        out
    }

    #[test]
    fn test_nested_tree_order_and_inheritance() {
        let pdf = build(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 3 /MediaBox [0 0 612 792] /Rotate 90 >>",
            "<< /Type /Pages /Parent 2 0 R /Kids [4 0 R] /Count 1 /Rotate 180 >>",
            "<< /Type /Page /Parent 3 0 R >>",
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 100] >>",
        ]);
        let ctx = DocumentContext::open(pdf).unwrap();
        let tree = page_tree(&ctx);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.pages[0].id, Some(ObjectRef::new(4, 0)));
        assert_eq!(tree.pages[0].rotate(&ctx), 180);
        assert_eq!(tree.pages[0].media_box(&ctx), Some([0.0, 0.0, 612.0, 792.0]));
        assert_eq!(tree.pages[1].rotate(&ctx), 90);
        assert_eq!(tree.pages[1].crop_box(&ctx), Some([0.0, 0.0, 100.0, 100.0]));
        assert!(tree.notes.iter().any(|n| n.contains("/Count 3")));
    }

    #[test]
    fn test_cyclic_kids_terminate() {
        let pdf = build(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 2 0 R] /Count 1 >>",
            "<< /Type /Page >>",
        ]);
        let ctx = DocumentContext::open(pdf).unwrap();
        let tree = page_tree(&ctx);
        assert_eq!(tree.len(), 1);
        assert!(tree.notes.iter().any(|n| n.contains("revisits")));
    }

    #[test]
    fn test_fallback_to_page_objects() {
        let pdf = build(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [] >>",
            "<< /Type /Page >>",
        ]);
        let ctx = DocumentContext::open(pdf).unwrap();
        let tree = page_tree(&ctx);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(1).and_then(|p| p.id), Some(ObjectRef::new(3, 0)));
    }

    #[test]
    fn test_content_arrays_are_joined() {
        let pdf = build(&[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Contents [4 0 R 5 0 R] >>",
            "<< /Length 3 >>\nstream\nq 1\nendstream",
            "<< /Length 3 >>\nstream\nw Q\nendstream",
        ]);
        let ctx = DocumentContext::open(pdf).unwrap();
        let tree = page_tree(&ctx);
        let content = tree.pages[0].content(&ctx);
        assert_eq!(content.data, b"q 1\nw Q");
        assert!(content.notes.is_empty());
    }
}
