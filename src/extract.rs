//! Per-document dispatch by file extension.
//!
//! | Extension | Extractor | Short result |
//! |-----------|-----------|--------------|
//! | `.txt`, `.md` | UTF-8 passthrough (lossy) | |
//! | `.pdf` | PDF text objects | scanned-PDF placeholder under 50 chars |
//! | `.docx` | DOCX paragraphs | raw word scan under 20 chars |
//! | `.doc` | DOCX paragraphs, raw word scan if not a ZIP | raw word scan under 20 chars |
//! | images | none | visual-content placeholder |
//!
//! A placeholder is still text the caller counts as a used document; it
//! tells the prompt builder that a file exists but could not be read.

use intake_harness_core::error::ExtractError;
use intake_harness_core::{docx, pdf};
use serde::Serialize;

pub const PDF_MIN_CHARS: usize = 50;
pub const DOCX_MIN_CHARS: usize = 20;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "svg", "heic"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
    Docx,
    LegacyDoc,
    Image,
    Unsupported,
}

impl DocumentKind {
    pub fn from_file_name(file_name: &str) -> Self {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "txt" | "md" => DocumentKind::Text,
            "pdf" => DocumentKind::Pdf,
            "docx" => DocumentKind::Docx,
            "doc" => DocumentKind::LegacyDoc,
            e if IMAGE_EXTENSIONS.contains(&e) => DocumentKind::Image,
            _ => DocumentKind::Unsupported,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextQuality {
    Full,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentText {
    pub text: String,
    pub quality: TextQuality,
}

impl DocumentText {
    fn full(text: String) -> Self {
        Self {
            text,
            quality: TextQuality::Full,
        }
    }

    fn placeholder(text: &str) -> Self {
        Self {
            text: text.to_string(),
            quality: TextQuality::Placeholder,
        }
    }
}

pub fn scanned_pdf_placeholder(file_name: &str) -> String {
    format!(
        "[PDF scanné : « {} » ne contient pas de texte extractible (document image). \
         Demander à l'utilisateur d'en résumer le contenu.]",
        file_name
    )
}

pub fn image_placeholder(file_name: &str) -> String {
    format!(
        "[Image : « {} » est un contenu visuel non extractible en texte.]",
        file_name
    )
}

/// Extract the text of one file.
pub fn extract_document(file_name: &str, bytes: &[u8]) -> Result<DocumentText, ExtractError> {
    let extracted = match DocumentKind::from_file_name(file_name) {
        DocumentKind::Text => DocumentText::full(String::from_utf8_lossy(bytes).trim().to_string()),
        DocumentKind::Pdf => {
            let text = pdf::extract_text(bytes);
            if text.chars().count() < PDF_MIN_CHARS {
                DocumentText::placeholder(&scanned_pdf_placeholder(file_name))
            } else {
                DocumentText::full(text)
            }
        }
        DocumentKind::Docx => {
            let text = docx::extract_text(bytes)?;
            if text.chars().count() < DOCX_MIN_CHARS {
                DocumentText::full(docx::raw_scan(bytes))
            } else {
                DocumentText::full(text)
            }
        }
        DocumentKind::LegacyDoc => match docx::extract_text(bytes) {
            Ok(text) if text.chars().count() >= DOCX_MIN_CHARS => DocumentText::full(text),
            _ => DocumentText::full(docx::raw_scan(bytes)),
        },
        DocumentKind::Image => DocumentText::placeholder(&image_placeholder(file_name)),
        DocumentKind::Unsupported => {
            return Err(ExtractError::UnsupportedType(file_name.to_string()));
        }
    };

    if extracted.text.trim().is_empty() {
        return Err(ExtractError::Empty);
    }
    Ok(extracted)
}
