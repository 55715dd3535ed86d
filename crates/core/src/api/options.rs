//! Per-tool option structs.
//!
//! All of them implement `Default` and deserialize from JSON with every
//! field optional, so a configuration file only names what it changes.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{PdfError, Result};

/// Default cap on operations read per page.
pub const DEFAULT_MAX_OPS: usize = 10_000;
/// Default cap on objects in an object dump.
pub const DEFAULT_MAX_OBJECTS: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Dump every in-use object along with the overview.
    pub include_objects: bool,
    pub max_objects: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_objects: false,
            max_objects: DEFAULT_MAX_OBJECTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContentOptions {
    /// Pages to read. `None` means all pages.
    pub pages: Option<PageSelection>,
    /// Operations read per page.
    pub max_ops: usize,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            pages: None,
            max_ops: DEFAULT_MAX_OPS,
        }
    }
}

impl ContentOptions {
    /// The selected 1-based page numbers of a document with `page_count`
    /// pages.
    pub fn page_numbers(&self, page_count: usize) -> Result<Vec<usize>> {
        match &self.pages {
            Some(selection) => selection.resolve(page_count),
            None => Ok((1..=page_count).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Export streams whose filter cannot be decoded as raw `.bin` files.
    pub include_undecoded: bool,
    pub max_ops: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_undecoded: true,
            max_ops: DEFAULT_MAX_OPS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// Pages to keep, in output order. `None` keeps every page.
    pub pages: Option<PageSelection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageRange {
    Single(usize),
    Closed(usize, usize),
    /// `5-`: from a page to the end.
    From(usize),
}

/// 1-based page list such as `"1-3,5,9-"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct PageSelection {
    ranges: Vec<PageRange>,
}

impl PageSelection {
    /// Page numbers in selection order with duplicates removed. Fails when a
    /// page is beyond `page_count`.
    pub fn resolve(&self, page_count: usize) -> Result<Vec<usize>> {
        let mut seen = vec![false; page_count + 1];
        let mut out = Vec::new();
        for range in &self.ranges {
            let (first, last) = match *range {
                PageRange::Single(n) => (n, n),
                PageRange::Closed(a, b) => (a, b),
                PageRange::From(a) => (a, page_count),
            };
            if first > page_count || last > page_count {
                return Err(PdfError::InvalidArgument(format!(
                    "page {} is out of range 1-{page_count}",
                    first.max(last)
                )));
            }
            for n in first..=last {
                if !seen[n] {
                    seen[n] = true;
                    out.push(n);
                }
            }
        }
        Ok(out)
    }
}

fn parse_page(text: &str, whole: &str) -> Result<usize> {
    match text.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(PdfError::InvalidArgument(format!("bad page selection {whole:?}"))),
    }
}

impl FromStr for PageSelection {
    type Err = PdfError;

    fn from_str(s: &str) -> Result<Self> {
        let mut ranges = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let range = match part.split_once('-') {
                None => PageRange::Single(parse_page(part, s)?),
                Some((a, b)) if b.trim().is_empty() => PageRange::From(parse_page(a, s)?),
                Some((a, b)) => {
                    let (a, b) = (parse_page(a, s)?, parse_page(b, s)?);
                    if a > b {
                        return Err(PdfError::InvalidArgument(format!(
                            "bad page selection {s:?}: {a} is after {b}"
                        )));
                    }
                    PageRange::Closed(a, b)
                }
            };
            ranges.push(range);
        }
        if ranges.is_empty() {
            return Err(PdfError::InvalidArgument("empty page selection".to_string()));
        }
        Ok(Self { ranges })
    }
}

impl TryFrom<String> for PageSelection {
    type Error = PdfError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match range {
                PageRange::Single(n) => write!(f, "{n}")?,
                PageRange::Closed(a, b) => write!(f, "{a}-{b}")?,
                PageRange::From(a) => write!(f, "{a}-")?,
            }
        }
        Ok(())
    }
}
