//! PDF text extraction using lopdf.
//!
//! Pulls the visible text out of every page's content stream, in page
//! order. Form widgets, layout and positions are ignored; the model only
//! ever sees the raw text.
//!
//! ## Usage
//!
//! ```no_run
//! use formex_core::extract::extract_text;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), formex_core::extract::ExtractError> {
//! let text = extract_text(Path::new("form.pdf"))?;
//! println!("{} pages, {} chars", text.page_count(), text.char_count());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lopdf::Document;
use thiserror::Error;
use tracing::debug;

/// Failures while turning a file into text.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The path does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The path exists but could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The bytes are not a loadable PDF document
    #[error("Not a valid PDF: {reason}")]
    Parse { reason: String },

    /// The document is encrypted and the empty user password does not open it
    #[error("PDF is password-protected and cannot be read")]
    Encrypted,

    /// A page's content stream could not be decoded
    #[error("Failed to extract text from page {page}: {reason}")]
    Page { page: u32, reason: String },

    /// The document contains no extractable text (scanned or image-only)
    #[error("PDF contains no extractable text (scanned or image-only form?)")]
    NoText,
}

/// Text of a PDF, one fragment per page in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pages: Vec<String>,
}

impl ExtractedText {
    /// Build from page fragments already in order.
    #[must_use]
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// Page fragments in document order.
    #[must_use]
    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of `char`s in the joined text.
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.pages
            .iter()
            .map(|page| page.trim_end().chars().count() + 1)
            .sum()
    }

    /// True when no page carries any non-whitespace text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.trim().is_empty())
    }

    /// All pages joined into one string, each page ending in a newline.
    #[must_use]
    pub fn joined(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for page in &self.pages {
            writeln!(f, "{}", page.trim_end())?;
        }
        Ok(())
    }
}

/// Extract the text of every page of the PDF at `path`.
///
/// # Errors
///
/// Returns [`ExtractError::NotFound`] for a missing path,
/// [`ExtractError::Unreadable`] for other I/O failures, and the parse
/// errors of [`extract_text_from_bytes`].
pub fn extract_text(path: &Path) -> Result<ExtractedText, ExtractError> {
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ExtractError::NotFound(path.to_path_buf()),
        _ => ExtractError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "read PDF");
    extract_text_from_bytes(&bytes)
}

/// Extract the text of every page of an in-memory PDF.
///
/// # Errors
///
/// Returns [`ExtractError::Parse`] if the bytes are not a PDF,
/// [`ExtractError::Encrypted`] for documents that need a password,
/// [`ExtractError::Page`] if a page cannot be decoded and
/// [`ExtractError::NoText`] if no page has any text.
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
    let document = Document::load_mem(bytes).map_err(|e| ExtractError::Parse {
        reason: e.to_string(),
    })?;

    // lopdf opens empty-user-password files on load but keeps /Encrypt
    if document.is_encrypted() {
        if document.encryption_state.is_none() {
            return Err(ExtractError::Encrypted);
        }
        debug!("opened encrypted PDF with the empty user password");
    }

    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(ExtractError::Parse {
            reason: "document has no pages".to_string(),
        });
    }

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page in page_numbers {
        let text = document
            .extract_text(&[page])
            .map_err(|e| ExtractError::Page {
                page,
                reason: e.to_string(),
            })?;
        debug!(page, chars = text.len(), "extracted page text");
        pages.push(text);
    }

    let extracted = ExtractedText::from_pages(pages);
    if extracted.is_blank() {
        return Err(ExtractError::NoText);
    }
    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_keeps_page_order() {
        let text = ExtractedText::from_pages(vec![
            "Name: Alice  \n".to_string(),
            "Date: 2024-01-01".to_string(),
        ]);
        assert_eq!(text.joined(), "Name: Alice\nDate: 2024-01-01\n");
        assert_eq!(text.page_count(), 2);
    }

    #[test]
    fn test_char_count_matches_joined() {
        let text =
            ExtractedText::from_pages(vec!["Prénom: Zoë".to_string(), "x\n\n".to_string()]);
        assert_eq!(text.char_count(), text.joined().chars().count());
    }

    #[test]
    fn test_blank_detection() {
        assert!(ExtractedText::from_pages(vec![" \n".to_string(), String::new()]).is_blank());
        assert!(!ExtractedText::from_pages(vec![String::new(), "a".to_string()]).is_blank());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        let err = extract_text(&missing).unwrap_err();
        assert!(matches!(err, ExtractError::NotFound(ref p) if p == &missing));
    }

    #[test]
    fn test_non_pdf_bytes_fail_to_parse() {
        let err = extract_text_from_bytes(b"this is plainly not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
    }

    #[test]
    fn test_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_text(dir.path()).unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable { .. }));
    }
}
