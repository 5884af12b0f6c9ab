mod common;

use aidetect::extraction::{extract, extract_pdf_text, extract_pptx_text, ExtractionError, InputMode};
use aidetect::ocr::OcrEngine;

fn no_ocr<'a>() -> Result<&'a dyn OcrEngine, ExtractionError> {
    panic!("OCR requested for a non-image input")
}

#[test]
fn pptx_follows_presentation_order_not_file_names() {
    let bytes = common::pptx(&[
        (3, vec!["Intro", "Agenda"]),
        (1, vec!["Findings"]),
        (2, vec!["Questions?"]),
    ]);
    let text = extract_pptx_text(&bytes).unwrap();
    assert_eq!(text, "Intro\nAgenda\nFindings\nQuestions?");
}

#[test]
fn pptx_escaped_text_is_unescaped() {
    let bytes = common::pptx(&[(1, vec!["R&amp;D &lt;2024&gt;"])]);
    assert_eq!(extract_pptx_text(&bytes).unwrap(), "R&D <2024>");
}

#[test]
fn pptx_without_text_is_empty() {
    let bytes = common::pptx(&[(1, vec![])]);
    assert_eq!(extract_pptx_text(&bytes).unwrap(), "");
}

#[test]
fn pdf_pages_in_order_and_blank_pages_skipped() {
    let bytes = common::pdf(&[Some("Opening remarks"), None, Some("Closing remarks")]);
    let text = extract_pdf_text(&bytes).unwrap();

    let opening = text.find("Opening remarks").expect("first page text");
    let closing = text.find("Closing remarks").expect("third page text");
    assert!(opening < closing);
    assert!(!text.contains("\n\n"));
}

#[test]
fn dispatch_by_mode() {
    let deck = common::pptx(&[(1, vec!["hello deck"])]);
    assert_eq!(extract(InputMode::Pptx, &deck, no_ocr).unwrap(), "hello deck");
    assert_eq!(extract(InputMode::Text, "plain".as_bytes(), no_ocr).unwrap(), "plain");
}
