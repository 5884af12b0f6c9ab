// Image text extraction through the OCR engine
use super::ExtractionError;
use crate::ocr::OcrEngine;

/// Decode the image, run OCR and join recognized lines in detection order.
/// Lines that fail recognition are skipped.
pub fn extract_image_text(bytes: &[u8], ocr: &dyn OcrEngine) -> Result<String, ExtractionError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ExtractionError::Image(e.to_string()))?
        .to_rgb8();
    tracing::debug!(width = image.width(), height = image.height(), "running OCR");

    let pages = ocr.recognize(&image)?;

    let mut lines = Vec::new();
    let mut skipped = 0_usize;
    for page in pages {
        for line in page.lines {
            match line {
                Ok(line) => lines.push(line.text),
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(error = %e, "skipping unreadable OCR line");
                }
            }
        }
    }
    if skipped > 0 {
        tracing::info!(skipped, kept = lines.len(), "some OCR lines were unreadable");
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{BBox, OcrError, OcrLine, OcrPage};
    use image::RgbImage;

    struct ScriptedOcr;

    impl OcrEngine for ScriptedOcr {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<OcrPage>, OcrError> {
            let line = |text: &str| {
                Ok(OcrLine {
                    text: text.to_string(),
                    confidence: 0.9,
                    bbox: BBox { x0: 0, y0: 0, x1: 1, y1: 1 },
                })
            };
            Ok(vec![
                OcrPage {
                    lines: vec![
                        line("first"),
                        Err(OcrError::Output("region 2".into())),
                        line("second"),
                    ],
                },
                OcrPage {
                    lines: vec![line("third")],
                },
            ])
        }
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::new(8, 8)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn joins_lines_and_skips_bad_ones() {
        let text = extract_image_text(&png_bytes(), &ScriptedOcr).unwrap();
        assert_eq!(text, "first\nsecond\nthird");
    }

    #[test]
    fn undecodable_image_is_an_error() {
        assert!(matches!(
            extract_image_text(b"nope", &ScriptedOcr),
            Err(ExtractionError::Image(_))
        ));
    }
}
