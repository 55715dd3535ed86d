mod common;

use common::{simple_doc, zlib, PdfBuilder};
use pdfprobe_core::api::{self, ContentOptions, Status};
use pdfprobe_core::model::{Operand, PdfValue};
use pdfprobe_core::parser::{parse_ops, tokenize, Token};

fn string_at(data: &[u8]) -> Vec<u8> {
    match tokenize(data, 0) {
        Some((Token::LiteralString(s), _)) => s,
        other => panic!("expected a literal string, got {other:?}"),
    }
}

#[test]
fn literal_string_escapes() {
    assert_eq!(string_at(br"(Hello \) World)"), b"Hello ) World");
    assert_eq!(string_at(b"(a (nested (twice)) b)"), b"a (nested (twice)) b");
    assert_eq!(string_at(br"(\101\102C\0533)"), b"ABC+3");
    assert_eq!(string_at(b"(split \\\r\nline)"), b"split line");
    assert_eq!(string_at(br"(tab\there\q)"), b"tab\thereq");
}

#[test]
fn hex_strings_and_names() {
    assert_eq!(
        tokenize(b"<48 65 6C6C 6F>", 0),
        Some((Token::HexString(b"Hello".to_vec()), 15))
    );
    assert_eq!(
        tokenize(b"<414>", 0).map(|(t, _)| t),
        Some(Token::HexString(vec![0x41, 0x40]))
    );
    assert_eq!(
        tokenize(b"/Lime#20Green", 0).map(|(t, _)| t),
        Some(Token::Name("Lime Green".to_string()))
    );
}

#[test]
fn operands_are_grouped_with_their_operator() {
    let ops = parse_ops(b"1 0 0 1 50 50 cm", 10);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].operator, "cm");
    assert_eq!(ops[0].numbers(), Some(vec![1.0, 0.0, 0.0, 1.0, 50.0, 50.0]));

    let ops = parse_ops(b"[(A) -120 (B)] TJ /F1 12 Tf % trailing comment\n0.5 g", 10);
    let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
    assert_eq!(operators, ["TJ", "Tf", "g"]);
    assert_eq!(ops[0].operands.len(), 1);
    assert_eq!(ops[1].operands[0].as_name(), Some("F1"));
    assert_eq!(ops[2].operands[0].as_f64(), Some(0.5));
}

#[test]
fn inline_image_payload_is_skipped() {
    // the payload contains bytes that would otherwise tokenize as operators
    let content = b"q BI /W 2 /H 2 /BPC 8 /CS /G ID \x00Q Tj\xff EI Q";
    let ops = parse_ops(content, 10);
    let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
    assert_eq!(operators, ["q", "BI", "Q"]);

    let image = ops[1].inline_image().unwrap();
    assert_eq!(image.payload_len, 6);
    assert_eq!(image.header.get("W"), Some(&PdfValue::from(2)));
    assert_eq!(
        image.header.get("CS").and_then(PdfValue::as_name),
        Some("G")
    );
}

#[test]
fn max_ops_limits_parsing() {
    let content = "0 0 m ".repeat(50);
    assert_eq!(parse_ops(content.as_bytes(), 7).len(), 7);
}

#[test]
fn page_operations_snapshot() {
    let data = simple_doc(&["q 1 0 0 1 50 50 cm /Im1 Do Q", "BT /F1 9 Tf (Hi) Tj ET"]).build();
    let options = ContentOptions {
        pages: Some("2".parse().unwrap()),
        ..Default::default()
    };
    let report = api::content_ops(data, Some(options)).unwrap();
    assert_eq!(report.status, Status::Ok);
    assert_eq!(report.data.pages.len(), 1);

    let page = &report.data.pages[0];
    assert_eq!(page.page, 2);
    assert_eq!(page.histogram["Tf"], 1);
    insta::assert_snapshot!(
        serde_json::to_string(&page.ops).unwrap(),
        @r#"[{"operator":"BT","operands":[]},{"operator":"Tf","operands":["/F1",9]},{"operator":"Tj","operands":["Hi"]},{"operator":"ET","operands":[]}]"#
    );
}

#[test]
fn content_arrays_are_concatenated() {
    let mut b = PdfBuilder::new("1.4");
    b.object(1, "<</Type /Catalog /Pages 2 0 R>>");
    b.object(2, "<</Type /Pages /Kids [3 0 R] /Count 1>>");
    b.object(3, "<</Type /Page /Parent 2 0 R /Contents [4 0 R 5 0 R]>>");
    b.stream(4, "/Filter /FlateDecode", &zlib(b"q 2 0 0 2 0 0"));
    b.stream(5, "", b"cm Q");
    b.xref_table("/Root 1 0 R");

    let report = api::content_ops(b.build(), None).unwrap();
    let ops = &report.data.pages[0].ops;
    let operators: Vec<&str> = ops.iter().map(|op| op.operator.as_str()).collect();
    assert_eq!(operators, ["q", "cm", "Q"]);
    assert!(matches!(ops[1].operands[0], Operand::Value(PdfValue::Number(_))));
}

#[test]
fn truncation_is_reported() {
    let content = "0 0 m ".repeat(20);
    let options = ContentOptions {
        max_ops: 5,
        ..Default::default()
    };
    let report = api::content_ops(simple_doc(&[&content]).build(), Some(options)).unwrap();
    let page = &report.data.pages[0];
    assert!(page.truncated);
    assert_eq!(page.ops.len(), 5);
    assert_eq!(report.status, Status::Degraded);
}
