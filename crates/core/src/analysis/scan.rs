//! Scanned-document heuristics.
//!
//! Content streams are walked with a minimal graphics state (CTM and text
//! render mode, saved by `q` and restored by `Q`). Nothing is painted: the
//! walk only counts text-showing operators and measures how much of the
//! media box image draws cover.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::document::{DocumentContext, Page, PageTree};
use crate::model::{ContentOp, DictExt, ObjectRef, PdfValue};
use crate::parser::content::ContentParser;
use crate::utils::{
    apply_matrix_rect, intersect_rect, mult_matrix, rect_area, Matrix, Rect, MATRIX_IDENTITY,
};

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 16;
/// Image coverage at which a page looks like a full-page scan.
const FULL_PAGE: f64 = 0.5;
/// Coverage at which a text-less page might still be a scan.
const PARTIAL_PAGE: f64 = 0.2;
/// Render modes 3 (neither fill nor stroke) and 7 (clip only) paint nothing.
const INVISIBLE_MODES: [i64; 2] = [3, 7];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Likelihood {
    Unlikely,
    Possible,
    Likely,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageScan {
    pub page: usize,
    pub text_ops: usize,
    /// Text shown with an invisible render mode.
    pub invisible_text_ops: usize,
    pub image_draws: usize,
    /// Fraction of the media box covered by images, capped at 1.
    pub image_coverage: f64,
    /// Invisible text over a page image: an OCR text layer.
    pub ocr_layer: bool,
    pub likelihood: Likelihood,
    /// The operation cap was reached before the content ended.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub verdict: Likelihood,
    pub likely_pages: usize,
    pub possible_pages: usize,
    pub ocr_layer_pages: usize,
    pub pages: Vec<PageScan>,
}

#[derive(Debug, Clone, Copy)]
struct GraphicState {
    ctm: Matrix,
    render_mode: i64,
}

/// Walks one page's content, forms included.
struct PageWalker<'c> {
    ctx: &'c DocumentContext,
    media_box: Rect,
    state: GraphicState,
    gstack: Vec<GraphicState>,
    visited: FxHashSet<ObjectRef>,
    remaining: usize,
    truncated: bool,
    text_ops: usize,
    invisible_text_ops: usize,
    image_draws: usize,
    covered: f64,
}

impl<'c> PageWalker<'c> {
    fn new(ctx: &'c DocumentContext, media_box: Rect, max_ops: usize) -> Self {
        Self {
            ctx,
            media_box,
            state: GraphicState {
                ctm: MATRIX_IDENTITY,
                render_mode: 0,
            },
            gstack: Vec::new(),
            visited: FxHashSet::default(),
            remaining: max_ops,
            truncated: false,
            text_ops: 0,
            invisible_text_ops: 0,
            image_draws: 0,
            covered: 0.0,
        }
    }

    fn execute(&mut self, data: &[u8], resources: Option<&Arc<PdfValue>>, depth: usize) {
        for op in ContentParser::new(data) {
            if self.remaining == 0 {
                self.truncated = true;
                return;
            }
            self.remaining -= 1;
            self.dispatch(&op, resources, depth);
        }
    }

    fn dispatch(&mut self, op: &ContentOp, resources: Option<&Arc<PdfValue>>, depth: usize) {
        match op.operator.as_str() {
            "q" => self.gstack.push(self.state),
            "Q" => {
                if let Some(state) = self.gstack.pop() {
                    self.state = state;
                }
            }
            "cm" => {
                if let Some([a, b, c, d, e, f]) = op.numbers().as_deref() {
                    self.state.ctm = mult_matrix((*a, *b, *c, *d, *e, *f), self.state.ctm);
                }
            }
            "Tr" => {
                if let Some(mode) = op.operands.first().and_then(|o| o.as_value()?.as_i64()) {
                    self.state.render_mode = mode;
                }
            }
            "Tj" | "TJ" | "'" | "\"" => {
                self.text_ops += 1;
                if INVISIBLE_MODES.contains(&self.state.render_mode) {
                    self.invisible_text_ops += 1;
                }
            }
            "BI" => self.draw_image(),
            "Do" => {
                if let Some(name) = op.operands.first().and_then(|o| o.as_name()) {
                    self.do_xobject(name, resources, depth);
                }
            }
            _ => {}
        }
    }

    /// Images occupy the unit square in user space.
    fn draw_image(&mut self) {
        self.image_draws += 1;
        let placed = apply_matrix_rect(self.state.ctm, (0.0, 0.0, 1.0, 1.0));
        self.covered += rect_area(intersect_rect(placed, self.media_box));
    }

    fn do_xobject(&mut self, name: &str, resources: Option<&Arc<PdfValue>>, depth: usize) {
        let ctx = self.ctx;
        let Some(xobjects) = resources
            .and_then(|r| r.as_dict())
            .and_then(|r| ctx.get(r, "XObject"))
        else {
            return;
        };
        let Some(entry) = xobjects.as_dict().and_then(|x| x.value(name)) else {
            return;
        };
        let id = entry.as_reference();
        let xobject = ctx.resolve_maybe(entry);
        let Some(stream) = xobject.as_stream() else { return };

        if stream.dict.has_name("Subtype", "Image") {
            self.draw_image();
            return;
        }
        if !stream.dict.has_name("Subtype", "Form") || depth >= MAX_FORM_DEPTH {
            return;
        }
        // a form that invokes itself is entered once per page
        if let Some(id) = id
            && !self.visited.insert(id)
        {
            return;
        }

        let matrix = ctx
            .get(&stream.dict, "Matrix")
            .and_then(|m| {
                let n: Vec<f64> = m.as_array()?.iter().filter_map(PdfValue::as_f64).collect();
                match n.as_slice() {
                    [a, b, c, d, e, f] => Some((*a, *b, *c, *d, *e, *f)),
                    _ => None,
                }
            })
            .unwrap_or(MATRIX_IDENTITY);
        let inner = ctx
            .get(&stream.dict, "Resources")
            .filter(|r| r.as_dict().is_some())
            .map(|r| r.into_shared())
            .or_else(|| resources.cloned());
        let data = ctx.decode_stream(stream).data;

        let saved = (self.state, self.gstack.len());
        self.state.ctm = mult_matrix(matrix, self.state.ctm);
        self.execute(&data, inner.as_ref(), depth + 1);
        self.state = saved.0;
        self.gstack.truncate(saved.1);
    }
}

/// Classify one page from its counts.
pub fn classify(text_ops: usize, invisible_text_ops: usize, coverage: f64) -> (Likelihood, bool) {
    let visible_text = text_ops > invisible_text_ops;
    if coverage >= FULL_PAGE {
        if text_ops == 0 {
            return (Likelihood::Likely, false);
        }
        if !visible_text {
            return (Likelihood::Likely, true);
        }
        return (Likelihood::Possible, false);
    }
    if text_ops == 0 && coverage >= PARTIAL_PAGE {
        return (Likelihood::Possible, false);
    }
    (Likelihood::Unlikely, false)
}

fn scan_page(
    ctx: &DocumentContext,
    page: &Page,
    max_ops: usize,
    notes: &mut Vec<String>,
) -> PageScan {
    let media_box = match page.media_box(ctx) {
        Some([x0, y0, x1, y1]) => (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)),
        None => {
            notes.push(format!("page {}: no usable /MediaBox; coverage not measured", page.number));
            (0.0, 0.0, 0.0, 0.0)
        }
    };
    let content = page.content(ctx);
    notes.extend(content.notes);
    let resources = page.resources(ctx).map(|r| r.into_shared());

    let mut walker = PageWalker::new(ctx, media_box, max_ops);
    walker.execute(&content.data, resources.as_ref(), 0);
    let truncated = walker.truncated;
    if truncated {
        notes.push(format!("page {}: stopped after {max_ops} operations", page.number));
    }

    let area = rect_area(media_box);
    let coverage = if area > 0.0 {
        (walker.covered / area).min(1.0)
    } else {
        0.0
    };
    let (likelihood, ocr_layer) = classify(walker.text_ops, walker.invisible_text_ops, coverage);
    PageScan {
        page: page.number,
        text_ops: walker.text_ops,
        invisible_text_ops: walker.invisible_text_ops,
        image_draws: walker.image_draws,
        image_coverage: coverage,
        ocr_layer,
        likelihood,
        truncated,
    }
}

/// Per-page classification and a document verdict: `Likely` when at least
/// half the pages are likely scans, `Possible` when any page is.
pub fn scan(
    ctx: &DocumentContext,
    tree: &PageTree,
    max_ops: usize,
    notes: &mut Vec<String>,
) -> ScanReport {
    let pages: Vec<PageScan> = tree
        .pages
        .iter()
        .map(|page| scan_page(ctx, page, max_ops, notes))
        .collect();
    let likely_pages = pages.iter().filter(|p| p.likelihood == Likelihood::Likely).count();
    let possible_pages = pages.iter().filter(|p| p.likelihood == Likelihood::Possible).count();

    let verdict = if !pages.is_empty() && likely_pages * 2 >= pages.len() {
        Likelihood::Likely
    } else if likely_pages + possible_pages > 0 {
        Likelihood::Possible
    } else {
        Likelihood::Unlikely
    };
    ScanReport {
        verdict,
        likely_pages,
        possible_pages,
        ocr_layer_pages: pages.iter().filter(|p| p.ocr_layer).count(),
        pages,
    }
}
