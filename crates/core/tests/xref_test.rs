mod common;

use common::{simple_doc, PdfBuilder};
use pdfprobe_core::document::{page_tree, parse_xref_at, XrefEntry, XrefKind};
use pdfprobe_core::model::{DictExt, ObjectRef, PdfValue};
use pdfprobe_core::{DocumentContext, PdfError};

fn open(data: Vec<u8>) -> DocumentContext {
    DocumentContext::open(data).unwrap()
}

#[test]
fn table_later_subsection_overrides_earlier() {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, "<</Type /Catalog /Pages 2 0 R>>");
    b.object(2, "<</Type /Pages /Kids [] /Count 0>>");
    b.object(3, "(first)");
    let first = b.offset(3).unwrap();
    b.object(3, "(second)");
    let second = b.offset(3).unwrap();
    let mut data = b.build();
    let xref = data.len();
    let table = format!(
        "xref\n0 4\n0000000000 65535 f\r\n{:010} 00000 n\r\n{:010} 00000 n\r\n{first:010} 00000 n\r\n\
         3 1\n{second:010} 00000 n\r\ntrailer\n<</Size 4 /Root 1 0 R>>\nstartxref\n{xref}\n%%EOF\n",
        b.offset(1).unwrap(),
        b.offset(2).unwrap(),
    );
    data.extend_from_slice(table.as_bytes());

    let section = parse_xref_at(&data, xref).unwrap();
    assert_eq!(section.entries.len(), 5);
    assert_eq!(
        section.sorted()[&3],
        XrefEntry::InUse {
            offset: Some(second as u64),
            generation: 0
        }
    );

    let ctx = open(data);
    let value = ctx.resolve(ObjectRef::new(3, 0)).unwrap();
    assert_eq!(value.as_text().as_deref(), Some("second"));
}

#[test]
fn stream_xref_with_narrow_fields() {
    let mut b = PdfBuilder::new("1.5");
    b.object(1, "<</Type /Catalog /Pages 2 0 R>>");
    b.object(2, "<</Type /Pages /Kids [] /Count 0>>");
    let (o1, o2) = (b.offset(1).unwrap(), b.offset(2).unwrap());
    let mut data = b.build();
    let xref = data.len();

    // W [1 2 1]: type, 2-byte offset, 1-byte generation; /Index lists 2 before 0
    let mut records = Vec::new();
    for (t, offset, generation) in [(1u8, o2, 0u8), (0, 0, 255), (1, o1, 0), (1, xref, 0)] {
        records.push(t);
        records.extend_from_slice(&(offset as u16).to_be_bytes());
        records.push(generation);
    }
    let head = format!(
        "4 0 obj\n<</Type /XRef /Size 5 /W [1 2 1] /Index [2 1 0 2 4 1] /Root 1 0 R /Length {}>>\nstream\n",
        records.len()
    );
    data.extend_from_slice(head.as_bytes());
    data.extend_from_slice(&records);
    data.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{xref}\n%%EOF\n").as_bytes());

    let section = parse_xref_at(&data, xref).unwrap();
    assert_eq!(section.kind, XrefKind::Stream);
    let order: Vec<u32> = section.entries.iter().map(|(n, _)| *n).collect();
    assert_eq!(order, vec![2, 0, 1, 4]);
    assert_eq!(
        section.entries[0].1,
        XrefEntry::InUse {
            offset: Some(o2 as u64),
            generation: 0
        }
    );

    let ctx = open(data);
    assert_eq!(ctx.xref_kind(), XrefKind::Stream);
    assert!(ctx.catalog().is_some());
    assert!(ctx.notes().is_empty(), "{:?}", ctx.notes());
}

#[test]
fn incremental_update_overrides_older_revision() {
    let mut b = simple_doc(&["BT (old) Tj ET"]);
    b.stream(4, "", b"BT (new) Tj ET");
    b.object(5, "<</Title (Updated)>>");
    b.xref_table("/Root 1 0 R /Info 5 0 R");
    let ctx = open(b.build());

    assert_eq!(ctx.revision_count(), 2);
    assert_eq!(ctx.entries()[&4].revision, 1);
    assert_eq!(ctx.entries()[&3].revision, 0);
    let content = ctx.resolve(ObjectRef::new(4, 0)).unwrap();
    assert_eq!(content.as_stream().unwrap().raw(), b"BT (new) Tj ET");
    assert_eq!(
        ctx.info().unwrap().dict().unwrap().get_text("Title").as_deref(),
        Some("Updated")
    );
}

#[test]
fn compressed_objects_come_from_their_object_stream() {
    let mut b = PdfBuilder::new("1.5");
    b.object_stream(
        10,
        &[
            (1, "<</Type /Catalog /Pages 2 0 R>>"),
            (2, "<</Type /Pages /Kids [3 0 R] /Count 1>>"),
            (3, "<</Type /Page /Parent 2 0 R /MediaBox [0 0 100 100]>>"),
        ],
    );
    b.xref_stream(11, "/Root 1 0 R");
    let ctx = open(b.build());

    assert_eq!(
        ctx.entries()[&2].entry,
        XrefEntry::Compressed {
            container: 10,
            index: 1
        }
    );
    let tree = page_tree(&ctx);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.pages[0].media_box(&ctx), Some([0.0, 0.0, 100.0, 100.0]));
    let structural = ctx.structural_refs();
    assert!(structural.contains(&ObjectRef::new(10, 0)));
    assert!(structural.contains(&ObjectRef::new(11, 0)));
}

#[test]
fn flate_object_stream_in_incremental_update() {
    let mut b = simple_doc(&["q Q"]);
    b.object_stream_flate(
        10,
        &[
            (5, "<</Title (Packed) /Producer (builder)>>"),
            (6, "[1 2 3]"),
        ],
    );
    b.xref_stream(11, "/Root 1 0 R /Info 5 0 R");
    let ctx = open(b.build());

    assert_eq!(ctx.revision_count(), 2);
    let info = ctx.info().unwrap();
    assert_eq!(info.dict().unwrap().get_text("Title").as_deref(), Some("Packed"));
    let array = ctx.resolve(ObjectRef::new(6, 0)).unwrap();
    assert_eq!(array.as_array().map(<[PdfValue]>::len), Some(3));
    // objects of the first revision still resolve through the table
    assert_eq!(page_tree(&ctx).len(), 1);
}

#[test]
fn reconstructs_when_startxref_is_missing() {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, "<</Type /Catalog /Pages 2 0 R>>");
    b.object(2, "<</Type /Pages /Kids [3 0 R] /Count 1>>");
    b.object(3, "<</Type /Page /Parent 2 0 R>>");
    let ctx = open(b.build());

    assert!(ctx.is_reconstructed());
    assert_eq!(ctx.root(), Some(ObjectRef::new(1, 0)));
    assert_eq!(page_tree(&ctx).len(), 1);
    assert!(!ctx.notes().is_empty());
}

#[test]
fn short_and_garbage_inputs_fail() {
    assert!(matches!(
        DocumentContext::open(b"%PDF-1.4".to_vec()),
        Err(PdfError::InputTooShort { len: 8 })
    ));
    assert!(matches!(
        DocumentContext::open(vec![b'x'; 4096]),
        Err(PdfError::NoValidXref)
    ));
}

#[test]
fn dangling_reference_resolves_to_null() {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, "<</Type /Catalog /Pages 2 0 R /Missing 40 0 R>>");
    b.object(2, "<</Type /Pages /Kids [] /Count 0>>");
    b.xref_table("/Root 1 0 R");
    let ctx = open(b.build());

    let catalog = ctx.catalog().unwrap();
    let dict = catalog.dict().unwrap();
    assert!(ctx.get(dict, "Missing").is_none());
    assert!(ctx.resolve_maybe(&PdfValue::Reference(ObjectRef::new(40, 0))).is_null());
}
