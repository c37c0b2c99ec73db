//! PDF text extraction.
//!
//! Each page becomes its own document so retrieval results can cite a page
//! number.

use std::path::Path;

use tracing::{debug, warn};

use super::{file_name, Document, SourceMetadata};
use crate::errors::{AppError, Result};

/// Extract one document per non-empty page, in page order.
///
/// Returns `Ok(None)` if the file does not exist; a PDF that cannot be
/// loaded, or that yields no text at all, is an error the caller may treat
/// as soft.
pub fn load_pdf_file(path: &Path) -> Result<Option<Vec<Document>>> {
    if !path.exists() {
        return Ok(None);
    }

    let doc = lopdf::Document::load(path).map_err(|e| AppError::Ingestion {
        message: format!("failed to load PDF {}: {e}", path.display()),
    })?;

    let file = file_name(path);
    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "extracting text from PDF");

    let mut documents = Vec::new();
    for (&page_no, _) in pages.iter() {
        match doc.extract_text(&[page_no]) {
            Ok(raw) => {
                let text = normalize_whitespace(&raw);
                if text.is_empty() {
                    continue;
                }
                documents.push(Document {
                    text,
                    source: SourceMetadata {
                        file: file.clone(),
                        page: Some(page_no),
                    },
                });
            }
            Err(e) => {
                warn!(page = page_no, error = %e, "failed to extract text from page, skipping");
            }
        }
    }

    if documents.is_empty() {
        return Err(AppError::Ingestion {
            message: format!("no text content extracted from {}", path.display()),
        });
    }

    Ok(Some(documents))
}

/// Collapse runs of whitespace; extracted page text is full of stray
/// newlines and form feeds.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_whitespace() {
        assert_eq!(normalize_whitespace("Hello   World\n\nTest"), "Hello World Test");
        assert_eq!(normalize_whitespace("  \n \t "), "");
    }

    #[test]
    fn missing_file_is_none() {
        let result = load_pdf_file(Path::new("does-not-exist.pdf")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, "definitely not a pdf").unwrap();
        assert!(load_pdf_file(&path).is_err());
    }
}
