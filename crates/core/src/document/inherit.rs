//! Attribute inheritance along page and form-field trees.

use std::sync::Arc;

use crate::document::context::{DocumentContext, Resolved};
use crate::model::{Dict, PdfValue};

/// Page attributes a page may take from its ancestors.
pub const PAGE_INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Field attributes a terminal field may take from its ancestors.
pub const FIELD_INHERITABLE: [&str; 6] = ["FT", "Ff", "V", "DV", "DA", "Q"];

/// One tree node linked to the chain of nodes above it.
///
/// Lookups try the node first and then each ancestor in turn.
#[derive(Debug)]
pub struct InheritedView {
    node: Arc<PdfValue>,
    parent: Option<Arc<InheritedView>>,
}

impl InheritedView {
    pub fn root(node: Arc<PdfValue>) -> Arc<Self> {
        Arc::new(Self { node, parent: None })
    }

    /// A view of `node` whose ancestors are `self`'s chain.
    pub fn child(self: &Arc<Self>, node: Arc<PdfValue>) -> Arc<Self> {
        Arc::new(Self {
            node,
            parent: Some(Arc::clone(self)),
        })
    }

    pub fn node(&self) -> &Arc<PdfValue> {
        &self.node
    }

    /// The node's own dictionary (a stream's dictionary counts).
    pub fn dict(&self) -> Option<&Dict> {
        self.node.dict()
    }

    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Number of ancestors above this node.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent.as_deref(), |v| v.parent.as_deref()).count()
    }

    /// First non-null value of `key` on this node or an ancestor.
    pub fn get<'a>(&'a self, ctx: &DocumentContext, key: &str) -> Option<Resolved<'a>> {
        let mut level = Some(self);
        while let Some(view) = level {
            if let Some(dict) = view.dict()
                && let Some(value) = ctx.get(dict, key)
            {
                return Some(value);
            }
            level = view.parent.as_deref();
        }
        None
    }

    /// The node's dictionary with every missing key of `keys` filled in from
    /// its ancestors. Values keep their original (possibly indirect) form.
    pub fn materialize(&self, keys: &[&str]) -> Dict {
        let mut out = self.dict().cloned().unwrap_or_default();
        for &key in keys {
            if out.get(key).is_some_and(|v| !v.is_null()) {
                continue;
            }
            let inherited = std::iter::successors(self.parent.as_deref(), |v| v.parent.as_deref())
                .find_map(|v| v.dict()?.get(key).filter(|v| !v.is_null()));
            if let Some(value) = inherited {
                out.insert(key.to_string(), value.clone());
            }
        }
        out
    }
}
