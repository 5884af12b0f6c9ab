// PPTX text extraction: slides in presentation order, top-level text shapes
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use super::ExtractionError;

const PRESENTATION: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

pub fn extract_pptx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(pptx_error)?;

    let slides = slide_paths(&mut archive)?;
    tracing::debug!(slides = slides.len(), "reading slides");

    let mut fragments = Vec::new();
    for path in &slides {
        let xml = read_entry(&mut archive, path)?;
        for text in shape_texts(&xml)? {
            if !text.is_empty() {
                fragments.push(text);
            }
        }
    }

    Ok(fragments.join("\n"))
}

fn pptx_error(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Pptx(e.to_string())
}

fn read_entry(archive: &mut Archive<'_>, name: &str) -> Result<String, ExtractionError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| ExtractionError::Pptx(format!("{name}: {e}")))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Pptx(format!("{name}: {e}")))?;
    Ok(xml)
}

/// Slide part names in the order the presentation lists them. Falls back to
/// slide-number order when the presentation part carries no slide list.
fn slide_paths(archive: &mut Archive<'_>) -> Result<Vec<String>, ExtractionError> {
    let presentation = read_entry(archive, PRESENTATION)?;
    let slide_ids = slide_relationship_ids(&presentation)?;

    if !slide_ids.is_empty() {
        let rels = read_entry(archive, PRESENTATION_RELS)?;
        let targets = relationship_targets(&rels)?;
        return slide_ids
            .iter()
            .map(|id| {
                targets
                    .get(id)
                    .map(|target| resolve_target(target))
                    .ok_or_else(|| {
                        ExtractionError::Pptx(format!("slide relationship {id} not found"))
                    })
            })
            .collect();
    }

    let pattern = Regex::new(r"^ppt/slides/slide(\d+)\.xml$").map_err(pptx_error)?;
    let mut numbered: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = pattern.captures(name)?.get(1)?.as_str().parse().ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

// Targets are relative to ppt/ unless absolute within the package.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target.trim_start_matches("./")),
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ExtractionError> {
    for attr in element.attributes() {
        let attr = attr.map_err(pptx_error)?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value().map_err(pptx_error)?.into_owned()));
        }
    }
    Ok(None)
}

fn slide_relationship_ids(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();
    loop {
        match reader.read_event().map_err(pptx_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                if let Some(id) = attribute(&e, b"r:id")? {
                    ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

fn relationship_targets(xml: &str) -> Result<HashMap<String, String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event().map_err(pptx_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attribute(&e, b"Id")?;
                let target = attribute(&e, b"Target")?;
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Text of each top-level shape (`p:sp` directly under `p:spTree`) that has a
/// text body, in document order. Paragraphs and line breaks become newlines.
pub(crate) fn shape_texts(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut texts = Vec::new();

    let mut current: Option<String> = None;
    let mut has_body = false;
    let mut paragraphs = 0_usize;
    let mut in_text_run = false;

    loop {
        match reader.read_event().map_err(pptx_error)? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                let parent = stack.last().map(Vec::as_slice);
                match name.as_slice() {
                    b"sp" if parent == Some(b"spTree".as_slice()) => {
                        current = Some(String::new());
                        has_body = false;
                        paragraphs = 0;
                    }
                    b"txBody" if current.is_some() => has_body = true,
                    b"p" if has_body => {
                        if let Some(text) = current.as_mut() {
                            if paragraphs > 0 {
                                text.push('\n');
                            }
                        }
                        paragraphs += 1;
                    }
                    b"t" if has_body => in_text_run = true,
                    _ => {}
                }
                stack.push(name);
            }
            Event::Empty(e) if has_body => {
                if let Some(text) = current.as_mut() {
                    match e.local_name().as_ref() {
                        b"br" => text.push('\n'),
                        b"tab" => text.push('\t'),
                        b"p" => {
                            if paragraphs > 0 {
                                text.push('\n');
                            }
                            paragraphs += 1;
                        }
                        _ => {}
                    }
                }
            }
            Event::Text(t) if in_text_run => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&t.unescape().map_err(pptx_error)?);
                }
            }
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                let parent = stack.last().map(Vec::as_slice);
                match name.as_slice() {
                    b"t" => in_text_run = false,
                    b"sp" if parent == Some(b"spTree".as_slice()) => {
                        if let Some(text) = current.take() {
                            if has_body {
                                texts.push(text);
                            }
                        }
                        has_body = false;
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:nvGrpSpPr/>
    <p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:t>Title &amp; more</a:t></a:r></a:p></p:txBody></p:sp>
    <p:sp><p:txBody><a:p><a:r><a:t>line one</a:t></a:r><a:br/><a:r><a:t>line two</a:t></a:r></a:p><a:p><a:r><a:t>second</a:t></a:r></a:p></p:txBody></p:sp>
    <p:pic><p:blipFill/></p:pic>
    <p:grpSp><p:sp><p:txBody><a:p><a:r><a:t>grouped</a:t></a:r></a:p></p:txBody></p:sp></p:grpSp>
    <p:sp><p:spPr/></p:sp>
    <p:sp><p:txBody><a:p/></p:txBody></p:sp>
  </p:spTree></p:cSld>
</p:sld>"#;

    #[test]
    fn top_level_shapes_in_order() {
        let texts = shape_texts(SLIDE).unwrap();
        assert_eq!(
            texts,
            vec![
                "Title & more".to_string(),
                "line one\nline two\nsecond".to_string(),
                String::new(),
            ]
        );
    }

    #[test]
    fn slide_ids_follow_presentation_list() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst>
            <p:sldId id="257" r:id="rId3"/><p:sldId id="256" r:id="rId2"/>
        </p:sldIdLst></p:presentation>"#;
        assert_eq!(slide_relationship_ids(xml).unwrap(), vec!["rId3", "rId2"]);
    }

    #[test]
    fn relationship_targets_resolve_under_ppt() {
        let xml = r#"<Relationships><Relationship Id="rId2" Type="slide" Target="slides/slide1.xml"/></Relationships>"#;
        let targets = relationship_targets(xml).unwrap();
        assert_eq!(resolve_target(&targets["rId2"]), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("/ppt/slides/slide9.xml"), "ppt/slides/slide9.xml");
    }

    #[test]
    fn garbage_is_an_extraction_error() {
        assert!(matches!(
            extract_pptx_text(b"definitely not a zip"),
            Err(ExtractionError::Pptx(_))
        ));
    }
}
