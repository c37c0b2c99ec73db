//! Knowledge-base ingestion.
//!
//! Reads the configured plain-text and PDF sources into `Document`s. A
//! missing or unreadable source is skipped with a warning; ending up with no
//! documents at all is fatal, since the service would have nothing to answer
//! from.

pub mod chunker;
pub mod pdf;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::{AppError, Result};

/// Where a piece of text came from. Carried through chunking into retrieval
/// results for citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Originating file name.
    pub file: String,
    /// 1-based page number for paginated sources.
    pub page: Option<u32>,
}

/// A raw text segment produced by ingestion. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub text: String,
    pub source: SourceMetadata,
}

/// Load all configured sources.
///
/// Per-source failures are soft. The aggregate zero-documents case is the
/// one fatal outcome, checked once after every source has been attempted.
pub fn load_documents(txt_path: &Path, pdf_path: &Path) -> Result<Vec<Document>> {
    let mut documents = Vec::new();

    match load_text_file(txt_path) {
        Ok(Some(document)) => {
            info!(path = %txt_path.display(), "loaded text source");
            documents.push(document);
        }
        Ok(None) => {
            warn!(path = %txt_path.display(), "text source not found, continuing without it");
        }
        Err(e) => {
            warn!(path = %txt_path.display(), error = %e, "failed to read text source, skipping");
        }
    }

    match pdf::load_pdf_file(pdf_path) {
        Ok(Some(pages)) => {
            info!(path = %pdf_path.display(), pages = pages.len(), "loaded PDF source");
            documents.extend(pages);
        }
        Ok(None) => {
            warn!(path = %pdf_path.display(), "PDF source not found, continuing without it");
        }
        Err(e) => {
            warn!(path = %pdf_path.display(), error = %e, "failed to parse PDF source, skipping");
        }
    }

    if documents.is_empty() {
        return Err(AppError::Ingestion {
            message: format!(
                "no documents loaded; add {} or {} and restart",
                txt_path.display(),
                pdf_path.display()
            ),
        });
    }

    Ok(documents)
}

fn load_text_file(path: &Path) -> Result<Option<Document>> {
    if !path.exists() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(AppError::Ingestion {
            message: "text source is empty".to_string(),
        });
    }

    Ok(Some(Document {
        text,
        source: SourceMetadata {
            file: file_name(path),
            page: None,
        },
    }))
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_text_source() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("knowledge.txt");
        std::fs::write(&txt, "Some knowledge.").unwrap();

        let documents = load_documents(&txt, &dir.path().join("Knowledge.pdf")).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].text, "Some knowledge.");
        assert_eq!(documents[0].source.file, "knowledge.txt");
        assert_eq!(documents[0].source.page, None);
    }

    #[test]
    fn no_sources_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_documents(
            &dir.path().join("missing.txt"),
            &dir.path().join("missing.pdf"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn empty_text_source_alone_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("knowledge.txt");
        std::fs::write(&txt, "   \n").unwrap();

        let result = load_documents(&txt, &dir.path().join("missing.pdf"));
        assert!(result.is_err());
    }

    #[test]
    fn unreadable_pdf_is_soft_when_text_present() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("knowledge.txt");
        std::fs::write(&txt, "Text knowledge.").unwrap();
        let pdf = dir.path().join("Knowledge.pdf");
        std::fs::write(&pdf, "not a real pdf").unwrap();

        let documents = load_documents(&txt, &pdf).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].source.file, "knowledge.txt");
    }
}
