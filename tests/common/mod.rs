// Fixture builders shared by the integration tests
#![allow(dead_code)]

use aidetect::classifier::{Classification, ClassificationError, TextClassifier};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Classifier that answers from a script, one entry per call in call order.
pub struct Scripted {
    answers: Vec<Option<(&'static str, f32)>>,
    calls: AtomicUsize,
}

impl Scripted {
    pub fn new(answers: Vec<Option<(&'static str, f32)>>) -> Arc<Self> {
        Arc::new(Self {
            answers,
            calls: AtomicUsize::new(0),
        })
    }
}

impl TextClassifier for Scripted {
    fn classify(&self, _text: &str) -> Result<Classification, ClassificationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.answers.get(call).copied().flatten() {
            Some((label, score)) => Ok(Classification::new(label, score)),
            None => Err(ClassificationError::Inference(format!("call {call} failed"))),
        }
    }
}

/// Deterministic classifier keyed on chunk content, safe to call from any
/// thread in any order.
pub fn by_content(text: &str) -> Result<Classification, ClassificationError> {
    let label = if text.chars().filter(|c| c.is_ascii_digit()).count() % 2 == 0 {
        "Real"
    } else {
        "Fake"
    };
    let score = 0.5 + (text.len() % 7) as f32 / 20.0;
    Ok(Classification::new(label, score))
}

fn slide_xml(shapes: &[&str]) -> String {
    let body: String = shapes
        .iter()
        .map(|text| {
            format!("<p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp>")
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:cSld><p:spTree><p:nvGrpSpPr/>{body}</p:spTree></p:cSld></p:sld>"#
    )
}

/// A minimal PPTX. `slides` holds (file number, shape texts) in presentation
/// order, so file numbering and display order can disagree.
pub fn pptx(slides: &[(u32, Vec<&str>)]) -> Vec<u8> {
    let mut ids = String::new();
    let mut rels = String::new();
    for (i, (number, _)) in slides.iter().enumerate() {
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 10));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{number}.xml"/>"#,
            i + 10
        ));
    }
    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#
    );
    let presentation_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
    );

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let mut add = |name: &str, content: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };
        add("ppt/presentation.xml", &presentation);
        add("ppt/_rels/presentation.xml.rels", &presentation_rels);
        for (number, shapes) in slides {
            add(&format!("ppt/slides/slide{number}.xml"), &slide_xml(shapes));
        }
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

/// A PDF with one Courier text line per page; `None` pages have no text.
pub fn pdf(pages: &[Option<&str>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let operations = match page {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
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
