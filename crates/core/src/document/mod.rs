//! Document structure: cross-reference data, object resolution and pages.
//!
//! - `xref` - table and stream cross-reference sections
//! - `context` - revision chain, merged index, lazy object resolution
//! - `pages` - page tree traversal and page content
//! - `inherit` - attribute inheritance along page and field trees

pub mod context;
pub mod inherit;
pub mod pages;
pub mod xref;

pub use context::{DocumentContext, IndexedEntry, Resolved};
pub use inherit::{InheritedView, FIELD_INHERITABLE, PAGE_INHERITABLE};
pub use pages::{page_tree, Page, PageContent, PageTree};
pub use xref::{parse_xref_at, XrefEntry, XrefKind, XrefSection};
