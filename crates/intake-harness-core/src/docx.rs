//! DOCX text extraction from `word/document.xml`.
//!
//! The primary pass walks the WordprocessingML tree and turns each `<w:p>`
//! into one line made of its `<w:t>` runs. When the document has no
//! paragraph elements, or the XML is malformed, every `<…:t>` run is taken
//! from a flat scan instead, one run per line.

use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::error::ExtractError;
use crate::text::{decode_entities, latin1};
use crate::zip::read_named_entry;

pub const DOCUMENT_PART: &str = "word/document.xml";

static TEXT_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:[A-Za-z0-9_]+:)?t(?:\s[^>]*)?>([^<]*)</(?:[A-Za-z0-9_]+:)?t>")
        .expect("valid text run regex")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Alphabetic}{2,}").expect("valid word regex"));

/// Extract paragraph text from a `.docx` container.
///
/// A buffer that is not a ZIP container, or that lacks the main document
/// part, fails with [`ExtractError::Zip`].
pub fn extract_text(docx_bytes: &[u8]) -> Result<String, ExtractError> {
    let xml_bytes = read_named_entry(docx_bytes, DOCUMENT_PART)?;
    let xml = String::from_utf8_lossy(&xml_bytes);
    Ok(document_xml_text(&xml))
}

/// Text of a `word/document.xml` body.
pub fn document_xml_text(xml: &str) -> String {
    let lines = match paragraphs(xml) {
        Ok((lines, seen)) if seen > 0 => lines,
        _ => flat_runs(xml),
    };
    lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns the paragraph lines and how many `<w:p>` elements were seen.
///
/// Paragraphs nested inside another paragraph (text boxes) become their
/// own lines; their runs do not leak into the enclosing paragraph.
fn paragraphs(xml: &str) -> Result<(Vec<String>, usize), quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut open: Vec<String> = Vec::new();
    let mut lines = Vec::new();
    let mut seen = 0usize;
    let mut in_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    seen += 1;
                    open.push(String::new());
                }
                b"w:t" => in_run = true,
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    if let Some(line) = open.pop() {
                        lines.push(line);
                    }
                }
                b"w:t" => in_run = false,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"w:p" => seen += 1,
            Event::Text(t) if in_run => {
                if let Some(line) = open.last_mut() {
                    line.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok((lines, seen))
}

fn flat_runs(xml: &str) -> Vec<String> {
    TEXT_RUN
        .captures_iter(xml)
        .map(|c| decode_entities(&c[1]))
        .collect()
}

/// Last-resort scan of an arbitrary binary for words.
///
/// NUL bytes are dropped first so UTF-16LE text in legacy Word files reads
/// as plain letters. Non-UTF-8 input is decoded as Latin-1.
pub fn raw_scan(bytes: &[u8]) -> String {
    let stripped: Vec<u8> = bytes.iter().copied().filter(|&b| b != 0).collect();
    let decoded = match std::str::from_utf8(&stripped) {
        Ok(s) => s.to_string(),
        Err(_) => latin1(&stripped),
    };
    WORD.find_iter(&decoded)
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZipError;
    use std::io::Write;

    fn docx_with(document_xml: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = ::zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let options = ::zip::write::SimpleFileOptions::default()
                .compression_method(::zip::CompressionMethod::Deflated);
            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(b"<Types/>").unwrap();
            zip.start_file(DOCUMENT_PART, options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    fn body(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{inner}</w:body></w:document>"#
        )
    }

    #[test]
    fn paragraphs_become_lines() {
        let xml = body(
            r#"<w:p><w:r><w:t>Coach </w:t></w:r><w:r><w:t>bien-être</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">Séances </w:t></w:r><w:r><w:t>individuelles</w:t></w:r></w:p>"#,
        );
        let text = extract_text(&docx_with(&xml)).unwrap();
        assert_eq!(text, "Coach bien-être\nSéances individuelles");
    }

    #[test]
    fn long_deflated_document_keeps_every_paragraph() {
        let lines: Vec<String> = (0..2500)
            .map(|i| {
                let theme = ["yoga doux", "méditation", "respiration", "posture"][i % 4];
                format!("Séance {i}: {theme}, groupe {} à Lyon", i * 13 % 97)
            })
            .collect();
        let inner: String = lines
            .iter()
            .map(|l| format!("<w:p><w:r><w:t>{l}</w:t></w:r></w:p>"))
            .collect();
        let xml = body(&inner);
        assert!(xml.len() > 64 * 1024);

        let text = extract_text(&docx_with(&xml)).unwrap();
        let got: Vec<&str> = text.lines().collect();
        assert_eq!(got.len(), lines.len());
        assert_eq!(got[0], "Séance 0: yoga doux, groupe 0 à Lyon");
        assert_eq!(got[2499], lines[2499]);
        assert_eq!(got, lines);
    }

    #[test]
    fn empty_paragraphs_dropped_and_entities_unescaped() {
        let xml = body(
            r#"<w:p/><w:p><w:r><w:t>A &amp; B</w:t></w:r></w:p><w:p></w:p><w:p><w:r><w:t>   </w:t></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&docx_with(&xml)).unwrap(), "A & B");
    }

    #[test]
    fn non_run_text_is_ignored() {
        let xml = body(
            r#"<w:p><w:pPr><w:pStyle w:val="Titre"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Mon offre</w:t></w:r><w:r><w:instrText>PAGE</w:instrText></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&docx_with(&xml)).unwrap(), "Mon offre");
    }

    #[test]
    fn nested_paragraph_keeps_its_own_line() {
        let xml = body(
            r#"<w:p><w:r><w:t>Avant</w:t></w:r><w:r><w:txbxContent><w:p><w:r><w:t>Encadré</w:t></w:r></w:p></w:txbxContent></w:r><w:r><w:t> après</w:t></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&docx_with(&xml)).unwrap(), "Encadré\nAvant après");
    }

    #[test]
    fn flat_scan_when_no_paragraphs() {
        let xml = r#"<doc><x:t>Premier</x:t><t attr="1">Second &amp; dernier</t></doc>"#;
        assert_eq!(document_xml_text(xml), "Premier\nSecond & dernier");
    }

    #[test]
    fn flat_scan_when_xml_is_malformed() {
        let xml = r#"<w:body><w:p><w:r><w:t>Texte</w:t></w:r></w:q></w:body>"#;
        assert_eq!(document_xml_text(xml), "Texte");
    }

    #[test]
    fn non_zip_input_is_an_error() {
        let err = extract_text(b"%PDF-1.4 not a docx").unwrap_err();
        assert!(matches!(err, ExtractError::Zip(ZipError::EntryNotFound(_))));
    }

    #[test]
    fn raw_scan_recovers_words() {
        let mut bytes = vec![0x01, 0x02, b'x', 0x03];
        for b in "Bonjour Marie".encode_utf16().flat_map(|u| u.to_le_bytes()) {
            bytes.push(b);
        }
        bytes.extend_from_slice(&[0xff, 0x07, b'C', b'a', b'f', 0xe9, 0x05]);
        assert_eq!(raw_scan(&bytes), "Bonjour Marie Café");
    }
}
