// OCR engine backed by the oar-ocr PP-OCR pipeline
use image::{ImageFormat, RgbImage};
use oar_ocr::pipeline::{OAROCRBuilder, OAROCR};
use std::path::Path;
use std::sync::Mutex;

use super::{BBox, OcrEngine, OcrError, OcrLine, OcrPage};
use crate::config::Settings;

const REC_INPUT_SHAPE: (usize, usize, usize) = (3, 48, 320);

pub struct OnnxOcrEngine {
    pipeline: Mutex<OAROCR>,
}

impl OnnxOcrEngine {
    pub fn new(settings: &Settings) -> Result<Self, OcrError> {
        let ocr = &settings.ocr;
        let det_path = settings.ocr_path(&ocr.det_model);
        let rec_path = settings.ocr_path(&ocr.rec_model);
        let keys_path = settings.ocr_path(&ocr.keys);
        for required in [&det_path, &rec_path, &keys_path] {
            if !required.exists() {
                return Err(OcrError::MissingModel(required.clone()));
            }
        }

        tracing::info!(
            det = %det_path.display(),
            rec = %rec_path.display(),
            "loading OCR pipeline"
        );
        let pipeline = OAROCRBuilder::new(
            path_string(&det_path),
            path_string(&rec_path),
            path_string(&keys_path),
        )
        .text_detection_batch_size(ocr.det_batch_size)
        .text_recognition_batch_size(ocr.rec_batch_size)
        .text_rec_score_thresh(ocr.rec_score_threshold)
        .text_rec_input_shape(REC_INPUT_SHAPE)
        .build()
        .map_err(|e| OcrError::Runtime(e.to_string()))?;

        Ok(Self {
            pipeline: Mutex::new(pipeline),
        })
    }
}

impl OcrEngine for OnnxOcrEngine {
    fn recognize(&self, image: &RgbImage) -> Result<Vec<OcrPage>, OcrError> {
        // The pipeline reads its input from disk.
        let staged = tempfile::Builder::new()
            .prefix("aidetect-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| OcrError::Staging(e.to_string()))?;
        image
            .save_with_format(staged.path(), ImageFormat::Png)
            .map_err(|e| OcrError::Staging(e.to_string()))?;

        let mut pipeline = self
            .pipeline
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = pipeline
            .predict(staged.path())
            .map_err(|e| OcrError::Runtime(e.to_string()))?;

        let regions = result
            .text_boxes
            .iter()
            .map(|b| region_bbox(b.points.iter().map(|p| (p.x, p.y))))
            .collect();
        let texts = result.rec_texts.iter().map(|t| t.to_string()).collect();
        let lines = assemble_lines(regions, texts, result.rec_scores.clone());
        tracing::debug!(regions = lines.len(), "OCR regions read");

        Ok(vec![OcrPage { lines }])
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Axis-aligned bounds of a detected quadrilateral.
fn region_bbox(points: impl IntoIterator<Item = (f32, f32)>) -> Option<BBox> {
    let mut bounds: Option<(f32, f32, f32, f32)> = None;
    for (x, y) in points {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| BBox {
        x0: x0.max(0.0).floor() as u32,
        y0: y0.max(0.0).floor() as u32,
        x1: x1.max(0.0).ceil() as u32,
        y1: y1.max(0.0).ceil() as u32,
    })
}

/// Pair each detected region with its recognized text and score. A region
/// missing either half, or with a malformed box or score, becomes an error
/// line. Blank recognitions are dropped.
fn assemble_lines(
    regions: Vec<Option<BBox>>,
    texts: Vec<String>,
    scores: Vec<f32>,
) -> Vec<Result<OcrLine, OcrError>> {
    let count = regions.len().max(texts.len()).max(scores.len());
    let mut lines = Vec::with_capacity(count);
    for i in 0..count {
        let bbox = regions.get(i).copied().flatten();
        match (bbox, texts.get(i), scores.get(i).copied()) {
            (Some(bbox), Some(text), Some(confidence)) if confidence.is_finite() => {
                if text.trim().is_empty() {
                    continue;
                }
                lines.push(Ok(OcrLine {
                    text: text.clone(),
                    confidence,
                    bbox,
                }));
            }
            _ => lines.push(Err(OcrError::Output(format!(
                "region {} has no usable recognition result",
                i + 1
            )))),
        }
    }
    lines
}
