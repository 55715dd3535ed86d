mod common;

use common::{simple_doc, PdfBuilder};
use pdfprobe_core::analysis::{AttachmentSource, Embedding, ImageKind};
use pdfprobe_core::api::{
    self, AnalysisOptions, ContentOptions, ExportOptions, Likelihood, Status,
};
use pdfprobe_core::model::ObjectRef;

/// Two pages over a 200x100 media box:
/// page 1 is a full-page image under invisible text, page 2 is plain text
/// with a small 1-bit image and an inline image. The document also carries
/// a signature field, a link, an embedded file and a subset TrueType font.
fn gallery() -> Vec<u8> {
    let checksum = hex::encode(md5::compute(b"payload").0);
    let mut b = PdfBuilder::new("1.7");
    b.object(
        1,
        "<</Type /Catalog /Pages 2 0 R /Names <</EmbeddedFiles 30 0 R>> \
         /AcroForm <</Fields [10 0 R] /SigFlags 3>>>>",
    );
    b.object(
        2,
        "<</Type /Pages /Kids [3 0 R 5 0 R] /Count 2 /MediaBox [0 0 200 100]>>",
    );
    b.object(
        3,
        "<</Type /Page /Parent 2 0 R /Contents 4 0 R /Annots [11 0 R 12 0 R] \
         /Resources <</XObject <</Im1 7 0 R /Im2 8 0 R>> /Font <</F1 20 0 R>>>>>>",
    );
    b.stream(
        4,
        "",
        b"q 200 0 0 100 0 0 cm /Im1 Do Q BT /F1 10 Tf 3 Tr (hidden text) Tj ET",
    );
    b.object(
        5,
        "<</Type /Page /Parent 2 0 R /Contents 6 0 R \
         /Resources <</XObject <</Im2 8 0 R>> /Font <</F1 20 0 R>>>>>>",
    );
    b.stream(
        6,
        "",
        b"BT /F1 10 Tf (visible) Tj ET q 20 0 0 20 0 0 cm /Im2 Do Q \
          BI /W 2 /H 1 /BPC 8 /CS /G ID \x10\x20 EI",
    );
    b.stream(
        7,
        "/Type /XObject /Subtype /Image /Width 2 /Height 2 /BitsPerComponent 8 \
         /ColorSpace /DeviceGray /Filter /DCTDecode",
        b"\xff\xd8fakejpeg\xff\xd9",
    );
    b.stream(
        8,
        "/Type /XObject /Subtype /Image /Width 8 /Height 2 /BitsPerComponent 1 \
         /ColorSpace /DeviceGray",
        &[0x0f, 0xf0],
    );
    b.object(10, "<</T (approval) /FT /Sig /Kids [11 0 R]>>");
    b.object(
        11,
        "<</Type /Annot /Subtype /Widget /Parent 10 0 R /T (sig1) /V 13 0 R \
         /Rect [0 0 50 20] /F 2>>",
    );
    b.object(
        12,
        "<</Type /Annot /Subtype /Link /Rect [10 10 60 30] \
         /A <</S /URI /URI (https://example.org/)>>>>",
    );
    b.object(
        13,
        "<</Type /Sig /Filter /Adobe.PPKLite /SubFilter /adbe.pkcs7.detached \
         /ByteRange [0 100 200 50] /Contents <00112233> /Reason (Approval) \
         /M (D:20240101000000Z) \
         /Reference [<</TransformMethod /DocMDP /TransformParams <</P 1>>>>]>>",
    );
    b.object(
        20,
        "<</Type /Font /Subtype /TrueType /BaseFont /ABCDEF+Arial /FontDescriptor 21 0 R>>",
    );
    b.object(21, "<</Type /FontDescriptor /FontName /ABCDEF+Arial /FontFile2 22 0 R>>");
    b.stream(22, "", b"glyf");
    b.object(30, "<</Names [(notes.txt) 31 0 R]>>");
    b.object(
        31,
        "<</Type /Filespec /F (notes.txt) /UF (notes.txt) /Desc (Reviewer notes) /EF <</F 32 0 R>>>>",
    );
    b.stream(
        32,
        &format!("/Type /EmbeddedFile /Subtype /text#2Fplain /Params <</Size 7 /CheckSum <{checksum}>>>"),
        b"payload",
    );
    b.object(40, "<</Title (Gallery) /Producer (pdfprobe tests)>>");
    b.xref_table("/Root 1 0 R /Info 40 0 R");
    b.build()
}

#[test]
fn inspect_summarizes_the_document() {
    let report = api::inspect(gallery(), None).unwrap();
    assert_eq!(report.status, Status::Ok, "{:?}", report.notes);
    let data = &report.data;
    assert_eq!(data.version.as_deref(), Some("1.7"));
    assert_eq!(data.page_count, 2);
    assert_eq!(data.revision_count, 1);
    assert_eq!(data.objects.in_use, 19);
    assert_eq!(data.objects.free, 1);
    assert!(!data.encrypted);
    assert_eq!(data.info["Title"], "Gallery");
    assert!(data.object_dump.is_none());

    let options = AnalysisOptions {
        include_objects: true,
        max_objects: 5,
    };
    let report = api::inspect(gallery(), Some(options)).unwrap();
    let dump = report.data.object_dump.as_ref().unwrap();
    assert_eq!(dump.len(), 5);
    assert_eq!(dump[0].id, ObjectRef::new(1, 0));
    assert!(report.data.dump_truncated);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["page_count"], 2);
}

#[test]
fn xref_lists_every_entry() {
    let report = api::xref(gallery()).unwrap();
    assert_eq!(report.data.revisions.len(), 1);
    assert_eq!(report.data.entries.len(), 20);
    assert_eq!(report.data.entries[0].number, 0);
}

#[test]
fn signature_fields_inherit_their_type() {
    let report = api::signatures(gallery()).unwrap();
    let data = &report.data;
    assert!(data.acroform);
    assert_eq!(data.sig_flags, Some(3));
    assert_eq!(data.fields.len(), 1);

    let field = &data.fields[0];
    assert_eq!(field.name, "approval.sig1");
    assert_eq!(field.object, Some(ObjectRef::new(11, 0)));
    assert_eq!(field.widgets, 1);
    assert!(field.signed);

    let sig = field.signature.as_ref().unwrap();
    assert_eq!(sig.object, Some(ObjectRef::new(13, 0)));
    assert_eq!(sig.sub_filter.as_deref(), Some("adbe.pkcs7.detached"));
    assert_eq!(sig.byte_range, vec![0, 100, 200, 50]);
    assert_eq!(sig.contents_length, 4);
    assert_eq!(sig.covers_whole_file, Some(false));
    assert_eq!(sig.reason.as_deref(), Some("Approval"));
    assert_eq!(sig.docmdp_permissions, Some(1));
}

#[test]
fn unsigned_document_has_no_acroform() {
    let report = api::signatures(simple_doc(&["q Q"]).build()).unwrap();
    assert!(!report.data.acroform);
    assert!(report.data.fields.is_empty());
}

#[test]
fn scan_detects_image_pages_and_ocr_layers() {
    let report = api::scan(gallery(), None).unwrap();
    let data = &report.data;
    assert_eq!(data.verdict, Likelihood::Likely);
    assert_eq!(data.likely_pages, 1);
    assert_eq!(data.ocr_layer_pages, 1);

    let first = &data.pages[0];
    assert_eq!(first.likelihood, Likelihood::Likely);
    assert!(first.ocr_layer);
    assert!((first.image_coverage - 1.0).abs() < 1e-9);
    assert_eq!(first.invisible_text_ops, 1);

    let second = &data.pages[1];
    assert_eq!(second.likelihood, Likelihood::Unlikely);
    assert_eq!(second.text_ops, 1);
    assert!(second.image_coverage < 0.05);
    assert!(!second.truncated);
}

#[test]
fn scan_honours_the_operation_cap() {
    let options: ContentOptions = serde_json::from_str(r#"{"max_ops": 3}"#).unwrap();
    let report = api::scan(gallery(), Some(options)).unwrap();
    let first = &report.data.pages[0];
    assert!(first.truncated);
    assert_eq!(first.text_ops, 0);
    assert_eq!(first.likelihood, Likelihood::Likely);
    assert_eq!(report.status, Status::Degraded);
}

#[test]
fn images_are_listed_once_with_every_page() {
    let report = api::images(gallery(), None).unwrap();
    let images = &report.data.images;
    assert_eq!(images.len(), 3);

    assert_eq!(images[0].object, Some(ObjectRef::new(7, 0)));
    assert_eq!(images[0].filters, vec!["DCTDecode".to_string()]);
    assert_eq!(images[1].object, Some(ObjectRef::new(8, 0)));
    assert_eq!(images[1].pages.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(images[1].bits_per_component, Some(1));

    let inline = &images[2];
    assert_eq!(inline.kind, ImageKind::Inline);
    assert_eq!(inline.color_space.as_deref(), Some("DeviceGray"));
    assert_eq!(inline.width, Some(2));
    assert_eq!(inline.length, 2);
}

#[test]
fn exported_images_keep_jpeg_and_encode_bilevel_as_png() {
    let out = api::export_images(gallery(), Some(ExportOptions::default())).unwrap();
    let entries = &out.manifest.data.entries;
    let listed: Vec<(&str, &str)> = entries
        .iter()
        .map(|e| (e.name.as_str(), e.format.as_str()))
        .collect();
    assert_eq!(listed, vec![("image_7_0.jpg", "jpeg"), ("image_8_0.png", "png")]);
    assert_eq!(entries[0].size, 12);
    assert_eq!(out.manifest.data.skipped, 0);
    assert_eq!(&out.bytes[..4], b"PK\x03\x04");
}

#[test]
fn fonts_report_embedding_and_subsets() {
    let report = api::fonts(gallery()).unwrap();
    let fonts = &report.data.fonts;
    assert_eq!(fonts.len(), 1);
    let font = &fonts[0];
    assert_eq!(font.object, Some(ObjectRef::new(20, 0)));
    assert_eq!(font.base_font.as_deref(), Some("ABCDEF+Arial"));
    assert_eq!(font.embedding, Embedding::TrueType);
    assert!(font.subset);
    assert!(!font.to_unicode);
    assert_eq!(font.pages.len(), 2);
}

#[test]
fn annotations_carry_flags_and_actions() {
    let report = api::annotations(gallery()).unwrap();
    let annotations = &report.data.annotations;
    assert_eq!(annotations.len(), 2);

    let widget = &annotations[0];
    assert_eq!(widget.subtype.as_deref(), Some("Widget"));
    assert!(widget.hidden);

    let link = &annotations[1];
    assert_eq!(link.page, 1);
    assert_eq!(link.rect, Some([10.0, 10.0, 60.0, 30.0]));
    assert_eq!(link.action.as_deref(), Some("URI"));
    assert_eq!(link.uri.as_deref(), Some("https://example.org/"));
}

#[test]
fn attachments_are_verified_and_exported() {
    let report = api::attachments(gallery()).unwrap();
    let attachments = &report.data.attachments;
    assert_eq!(attachments.len(), 1);
    let file = &attachments[0];
    assert_eq!(file.name, "notes.txt");
    assert_eq!(file.source, AttachmentSource::NameTree);
    assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
    assert_eq!(file.description.as_deref(), Some("Reviewer notes"));
    assert_eq!(file.declared_size, Some(7));
    assert_eq!(file.actual_size, Some(7));
    assert_eq!(file.checksum_ok, Some(true));

    let out = api::export_attachments(gallery()).unwrap();
    let entries = &out.manifest.data.entries;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "notes.txt");
    assert_eq!(entries[0].object, Some(ObjectRef::new(32, 0)));
    assert_eq!(entries[0].size, 7);
}

#[test]
fn forensics_reports_links_but_no_scripts() {
    let report = api::forensics(gallery()).unwrap();
    let summary = &report.data.summary;
    assert_eq!(summary.get("uri"), Some(&1));
    assert_eq!(summary.get("java_script"), None);
    assert_eq!(summary.get("embedded_file"), Some(&1));
}

#[test]
fn garbage_input_is_an_error() {
    assert!(api::inspect(vec![0u8; 10], None).is_err());
}

#[test]
fn oversized_bilevel_image_is_exported_as_samples() {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, "<</Type /Catalog /Pages 2 0 R>>");
    b.object(2, "<</Type /Pages /Kids [3 0 R] /Count 1>>");
    b.object(
        3,
        "<</Type /Page /Parent 2 0 R /MediaBox [0 0 10 10] \
         /Resources <</XObject <</Im1 4 0 R>>>>>>",
    );
    b.stream(
        4,
        "/Type /XObject /Subtype /Image /Width 4000000000 /Height 4000000000 \
         /BitsPerComponent 1 /ColorSpace /DeviceGray",
        &[0xAA, 0x55],
    );
    b.xref_table("/Root 1 0 R");

    let out = api::export_images(b.build(), None).unwrap();
    let entries = &out.manifest.data.entries;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].format, "samples");
    assert_eq!(entries[0].size, 2);
    assert_eq!(out.manifest.status, Status::Degraded);
    assert!(out.manifest.notes.iter().any(|n| n.contains("exported as samples")));
}
