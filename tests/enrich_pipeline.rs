//! End-to-end enrichment pipeline tests over the library surface.
//!
//! Covers the text-PDF fast path (extract, synthesize, enrich) and the
//! cross-cutting result properties: idempotence, serialization stability,
//! sensitive-value masking, and entity ordering.

use ocr_api::enrich::enrich;
use ocr_api::models::{DocumentClass, OcrOutput};
use ocr_api::ocr::{extract_embedded_text, synthesize_page};

/// Build a single-page PDF whose content stream draws `lines` of text.
fn text_pdf(lines: &[&str]) -> Vec<u8> {
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut stream = String::from("BT /F1 12 Tf 50 740 Td 14 TL\n");
    for line in lines {
        stream.push_str(&format!("({}) Tj T*\n", line));
    }
    stream.push_str("ET");

    let content_id = doc.add_object(Object::Stream(Stream::new(
        dictionary! {},
        stream.into_bytes(),
    )));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Resources" => resources_id,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn enrich_pdf(lines: &[&str]) -> OcrOutput {
    let bytes = text_pdf(lines);
    let texts = extract_embedded_text(&bytes).unwrap();
    assert!(texts.iter().any(|t| !t.trim().is_empty()));
    let pages: Vec<_> = texts.iter().map(|t| synthesize_page(t)).collect();
    enrich(&pages, "eng", 0)
}

#[test]
fn text_pdf_fast_path_reports_full_confidence() {
    let output = enrich_pdf(&["Invoice 12345", "Total: 99.00"]);

    assert_eq!(output.confidence, 100.0);
    assert!(output.metadata.word_count >= 4);
    assert!(output.text.contains("Invoice"));
    assert!(output.text.contains("12345"));
    for block in &output.blocks {
        for word in block
            .paragraphs
            .iter()
            .flat_map(|p| &p.lines)
            .flat_map(|l| &l.words)
        {
            assert_eq!(word.confidence, 100.0);
        }
    }
}

#[test]
fn invoice_classification_from_pdf_text() {
    let output = enrich_pdf(&["Invoice #8801", "Total: 149.95"]);
    assert_eq!(output.structure.document_type, DocumentClass::Invoice);
}

#[test]
fn enrichment_is_byte_for_byte_idempotent() {
    let bytes = text_pdf(&["Report title", "Some body text here."]);
    let texts = extract_embedded_text(&bytes).unwrap();
    let pages: Vec<_> = texts.iter().map(|t| synthesize_page(t)).collect();

    let first = serde_json::to_string(&enrich(&pages, "eng", 7)).unwrap();
    let second = serde_json::to_string(&enrich(&pages, "eng", 7)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn serialize_parse_serialize_round_trip() {
    let output = enrich_pdf(&["Customer: ACME", "Amount due: 12.00"]);
    let first = serde_json::to_string(&output).unwrap();
    let parsed: OcrOutput = serde_json::from_str(&first).unwrap();
    let second = serde_json::to_string(&parsed).unwrap();
    assert_eq!(first, second);
}

#[test]
fn sensitive_values_are_masked_with_last_four() {
    let output = enrich_pdf(&[
        "Card number 4111 1111 1111 9876 was charged.",
        "Applicant SSN 321-54-9870.",
    ]);

    let entities = &output.structure.notable_data.entities;

    let card = entities
        .iter()
        .find(|e| e.entity_type == "credit_card")
        .expect("credit card not detected");
    assert_eq!(card.value, "4111111111119876");
    assert_eq!(card.display_value, "****-****-****-9876");
    assert!(card.display_value.ends_with("9876"));

    let ssn = entities
        .iter()
        .find(|e| e.entity_type == "ssn")
        .expect("ssn not detected");
    assert_eq!(ssn.value, "321-54-9870");
    assert_eq!(ssn.display_value, "***-**-9870");
}

#[test]
fn btw_shape_is_vat_never_iban() {
    let output = enrich_pdf(&["BTW nummer NL862309135B01 staat vast."]);
    let entities = &output.structure.notable_data.entities;

    assert!(entities
        .iter()
        .any(|e| e.entity_type == "vat" && e.value == "NL862309135B01"));
    assert!(!entities.iter().any(|e| e.entity_type == "iban"));
}

#[test]
fn bare_nine_digit_numbers_are_not_routing_numbers() {
    let with_keyword = enrich_pdf(&["ABA routing 021000021 applies."]);
    assert!(with_keyword
        .structure
        .notable_data
        .identifiers
        .iter()
        .any(|e| e.entity_type == "routing_number"));

    let without = enrich_pdf(&["Shipment weighed 021000021 grams."]);
    assert!(!without
        .structure
        .notable_data
        .identifiers
        .iter()
        .any(|e| e.entity_type == "routing_number"));
}

#[test]
fn empty_pdf_text_enriches_to_empty_result() {
    let output = enrich(&[], "eng", 3);
    assert_eq!(output.text, "");
    assert_eq!(output.confidence, 0.0);
    assert_eq!(output.metadata.word_count, 0);
    assert_eq!(output.structure.document_type, DocumentClass::Unknown);
    let json = serde_json::to_string(&output).unwrap();
    let parsed: OcrOutput = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.metadata.processing_time_ms, 3);
}
