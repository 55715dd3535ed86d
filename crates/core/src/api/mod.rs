//! Tool entry points.
//!
//! Each function opens a document from its bytes, runs one analysis and
//! returns a [`Report`]: the result, a status and the diagnostic notes
//! collected on the way. Only a document that cannot be opened at all, or an
//! invalid option, produces an `Err`.
//!
//! # Example
//!
//! ```ignore
//! use pdfprobe_core::api::{forensics, inspect};
//!
//! let pdf_bytes = std::fs::read("document.pdf")?;
//! let report = inspect(pdf_bytes.clone(), None)?;
//! println!("{} pages", report.data.page_count);
//! let findings = forensics(pdf_bytes)?;
//! ```

pub mod options;

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::analysis::{self, images::export_image};
use crate::document::{page_tree, DocumentContext, PageTree};
use crate::error::Result;
use crate::model::ObjectRef;
use crate::rewrite;
use crate::writer::ZipWriter;

pub use crate::analysis::{
    Annotation, Attachment, Finding, FontInfo, ForensicReport, ImageInfo, Inspection,
    Likelihood, OpsDump, OrphanReport, Report, ScanReport, SignatureReport, Status, XrefDump,
};
pub use crate::rewrite::{MergeManifest, SanitizeManifest, SplitManifest};
pub use options::{
    AnalysisOptions, ContentOptions, ExportOptions, PageSelection, SplitOptions,
};

/// An opened document and its page tree.
pub struct Session {
    pub ctx: DocumentContext,
    pub tree: PageTree,
    notes: Vec<String>,
}

impl Session {
    pub fn open(pdf_data: impl Into<Bytes>) -> Result<Self> {
        let ctx = DocumentContext::open(pdf_data)?;
        let tree = page_tree(&ctx);
        debug!(pages = tree.len(), kind = ?ctx.xref_kind(), "document opened");
        Ok(Self {
            ctx,
            notes: tree.notes.clone(),
            tree,
        })
    }

    /// Wrap `data` with every note raised so far, the context's included.
    fn report<T>(mut self, data: T) -> Report<T> {
        let mut notes = self.ctx.notes();
        notes.append(&mut self.notes);
        Report::new(data, notes)
    }
}

/// Output of the tools that produce a file.
#[derive(Debug, Clone)]
pub struct BinaryOutput<M> {
    pub bytes: Vec<u8>,
    pub manifest: Report<M>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationList {
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentList {
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FontList {
    pub fonts: Vec<FontInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageList {
    pub images: Vec<ImageInfo>,
}

/// One archive member and the object it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub object: Option<ObjectRef>,
    pub format: String,
    pub size: u32,
    pub crc32: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveManifest {
    pub entries: Vec<ArchiveEntry>,
    pub skipped: usize,
}

/// Document overview; with `include_objects`, a dump of the objects too.
pub fn inspect(pdf_data: impl Into<Bytes>, options: Option<AnalysisOptions>) -> Result<Report<Inspection>> {
    let options = options.unwrap_or_default();
    let session = Session::open(pdf_data)?;
    let limit = options.include_objects.then_some(options.max_objects);
    let inspection = analysis::inspect(&session.ctx, &session.tree, limit);
    Ok(session.report(inspection))
}

/// Every cross-reference section and the merged index.
pub fn xref(pdf_data: impl Into<Bytes>) -> Result<Report<XrefDump>> {
    let session = Session::open(pdf_data)?;
    let dump = analysis::xref_dump(&session.ctx);
    Ok(session.report(dump))
}

/// Content-stream operations of the selected pages.
pub fn content_ops(pdf_data: impl Into<Bytes>, options: Option<ContentOptions>) -> Result<Report<OpsDump>> {
    let options = options.unwrap_or_default();
    let mut session = Session::open(pdf_data)?;
    let pages = options.page_numbers(session.tree.len())?;
    let dump = analysis::content_ops(
        &session.ctx,
        &session.tree,
        &pages,
        options.max_ops,
        &mut session.notes,
    );
    Ok(session.report(dump))
}

/// Objects not reachable from the trailer.
pub fn orphans(pdf_data: impl Into<Bytes>) -> Result<Report<OrphanReport>> {
    let session = Session::open(pdf_data)?;
    let report = analysis::orphans(&session.ctx);
    Ok(session.report(report))
}

/// Actions, scripts, embedded files and other active content.
pub fn forensics(pdf_data: impl Into<Bytes>) -> Result<Report<ForensicReport>> {
    let session = Session::open(pdf_data)?;
    let report = analysis::forensics(&session.ctx);
    Ok(session.report(report))
}

pub fn annotations(pdf_data: impl Into<Bytes>) -> Result<Report<AnnotationList>> {
    let mut session = Session::open(pdf_data)?;
    let annotations = analysis::annotations(&session.ctx, &session.tree, &mut session.notes);
    Ok(session.report(AnnotationList { annotations }))
}

pub fn attachments(pdf_data: impl Into<Bytes>) -> Result<Report<AttachmentList>> {
    let mut session = Session::open(pdf_data)?;
    let attachments = analysis::attachments(&session.ctx, &session.tree, &mut session.notes);
    Ok(session.report(AttachmentList { attachments }))
}

pub fn fonts(pdf_data: impl Into<Bytes>) -> Result<Report<FontList>> {
    let mut session = Session::open(pdf_data)?;
    let fonts = analysis::fonts(&session.ctx, &session.tree, &mut session.notes);
    Ok(session.report(FontList { fonts }))
}

pub fn images(pdf_data: impl Into<Bytes>, options: Option<ContentOptions>) -> Result<Report<ImageList>> {
    let options = options.unwrap_or_default();
    let mut session = Session::open(pdf_data)?;
    let images = analysis::images(&session.ctx, &session.tree, options.max_ops, &mut session.notes);
    Ok(session.report(ImageList { images }))
}

pub fn signatures(pdf_data: impl Into<Bytes>) -> Result<Report<SignatureReport>> {
    let mut session = Session::open(pdf_data)?;
    let report = analysis::signatures(&session.ctx, &mut session.notes);
    Ok(session.report(report))
}

/// Per-page guess at whether the document is a scan.
pub fn scan(pdf_data: impl Into<Bytes>, options: Option<ContentOptions>) -> Result<Report<ScanReport>> {
    let options = options.unwrap_or_default();
    let mut session = Session::open(pdf_data)?;
    let report = analysis::scan(&session.ctx, &session.tree, options.max_ops, &mut session.notes);
    Ok(session.report(report))
}

/// Embedded files packed into a ZIP archive.
pub fn export_attachments(pdf_data: impl Into<Bytes>) -> Result<BinaryOutput<ArchiveManifest>> {
    let mut session = Session::open(pdf_data)?;
    let found = analysis::attachments(&session.ctx, &session.tree, &mut session.notes);

    let mut zip = ZipWriter::new();
    let mut entries = Vec::new();
    let mut skipped = 0;
    for attachment in found {
        let Some(payload) = attachment.payload else {
            session
                .notes
                .push(format!("attachment {}: no payload to export", attachment.name));
            skipped += 1;
            continue;
        };
        let requested = attachment.filename.as_deref().unwrap_or(&attachment.name);
        let name = zip.add(requested, &payload)?;
        entries.push(archive_entry(&zip, name, attachment.stream, "file"));
    }
    let bytes = zip.finish()?;
    Ok(BinaryOutput {
        bytes,
        manifest: session.report(ArchiveManifest { entries, skipped }),
    })
}

/// Image XObjects packed into a ZIP archive.
pub fn export_images(
    pdf_data: impl Into<Bytes>,
    options: Option<ExportOptions>,
) -> Result<BinaryOutput<ArchiveManifest>> {
    let options = options.unwrap_or_default();
    let mut session = Session::open(pdf_data)?;
    let found = analysis::images(&session.ctx, &session.tree, options.max_ops, &mut session.notes);

    let mut zip = ZipWriter::new();
    let mut entries = Vec::new();
    let mut skipped = 0;
    for info in found.iter().filter(|i| i.object.is_some()) {
        let exported = export_image(&session.ctx, info, &mut session.notes)
            .filter(|e| options.include_undecoded || e.format != "raw");
        let Some(image) = exported else {
            skipped += 1;
            continue;
        };
        let name = zip.add(&image.file_name, &image.bytes)?;
        entries.push(archive_entry(&zip, name, Some(image.object), image.format));
    }
    let bytes = zip.finish()?;
    Ok(BinaryOutput {
        bytes,
        manifest: session.report(ArchiveManifest { entries, skipped }),
    })
}

fn archive_entry(zip: &ZipWriter, name: String, object: Option<ObjectRef>, format: &str) -> ArchiveEntry {
    let (size, crc32) = zip
        .entries()
        .last()
        .map_or((0, 0), |e| (e.size, e.crc32));
    ArchiveEntry {
        name,
        object,
        format: format.to_string(),
        size,
        crc32,
    }
}

/// The selected pages as a new document.
pub fn split(pdf_data: impl Into<Bytes>, options: Option<SplitOptions>) -> Result<BinaryOutput<SplitManifest>> {
    let options = options.unwrap_or_default();
    let session = Session::open(pdf_data)?;
    let pages = match &options.pages {
        Some(selection) => selection.resolve(session.tree.len())?,
        None => (1..=session.tree.len()).collect(),
    };
    let (bytes, manifest) = rewrite::split(&session.ctx, &session.tree, &pages)?;
    Ok(BinaryOutput {
        bytes,
        manifest: session.report(manifest),
    })
}

/// Every page of every input, in order.
pub fn merge<I, B>(inputs: I) -> Result<BinaryOutput<MergeManifest>>
where
    I: IntoIterator<Item = B>,
    B: Into<Bytes>,
{
    let sessions = inputs
        .into_iter()
        .map(Session::open)
        .collect::<Result<Vec<_>>>()?;
    let docs: Vec<(&DocumentContext, &PageTree)> =
        sessions.iter().map(|s| (&s.ctx, &s.tree)).collect();
    let (bytes, manifest) = rewrite::merge(&docs)?;

    let notes = sessions
        .into_iter()
        .enumerate()
        .flat_map(|(i, s)| {
            let report = s.report(());
            report.notes.into_iter().map(move |n| format!("input {i}: {n}"))
        })
        .collect();
    Ok(BinaryOutput {
        bytes,
        manifest: Report::new(manifest, notes),
    })
}

/// A copy without scripts, triggers, embedded files or active actions.
pub fn sanitize(pdf_data: impl Into<Bytes>) -> Result<BinaryOutput<SanitizeManifest>> {
    let session = Session::open(pdf_data)?;
    let (bytes, manifest) = rewrite::sanitize(&session.ctx)?;
    Ok(BinaryOutput {
        bytes,
        manifest: session.report(manifest),
    })
}
