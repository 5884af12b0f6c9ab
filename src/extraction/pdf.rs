// PDF text-layer extraction - Pure Rust via lopdf
use lopdf::Document;

use super::ExtractionError;

/// Load a PDF document from memory
pub fn load_pdf(bytes: &[u8]) -> Result<Document, ExtractionError> {
    let document = Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    if document.is_encrypted() {
        return Err(ExtractionError::EncryptedPdf);
    }
    Ok(document)
}

/// Text layer of each page in page order. Pages without a readable text
/// layer contribute nothing.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let document = load_pdf(bytes)?;
    let pages = document.get_pages();
    tracing::debug!(pages = pages.len(), "reading PDF text layer");

    let mut texts = Vec::with_capacity(pages.len());
    for &page_number in pages.keys() {
        match document.extract_text(&[page_number]) {
            Ok(text) => {
                let text = text.trim_end();
                if !text.is_empty() {
                    texts.push(text.to_string());
                }
            }
            Err(e) => {
                tracing::debug!(page = page_number, error = %e, "page has no readable text layer");
            }
        }
    }

    Ok(texts.join("\n"))
}
