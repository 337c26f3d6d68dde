//! Text extraction for uploaded documents.
//!
//! Uploads declare a filename; the extension selects one of a closed set of
//! handlers. PDF text comes from `pdf-extract`, DOCX text is pulled from the
//! `<w:t>` runs of `word/document.xml` inside the OOXML archive, and TXT is a
//! lossy UTF-8 decode. There is no best-effort fallback for unknown
//! extensions; unsupported types are refused before extraction starts.

use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

/// Decompressed byte ceiling for a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Supported document formats, keyed by filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word processing document.
    Docx,
    /// Plain UTF-8 text.
    Txt,
}

impl FileType {
    /// Resolve the file type from a declared filename, if the extension is supported.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = filename.rsplit_once('.').map(|(_, ext)| ext)?;
        extension.to_lowercase().parse().ok()
    }

    /// Canonical lowercase name used in stored metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

impl std::str::FromStr for FileType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while turning document bytes into text.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// PDF parsing or text extraction failed.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// DOCX archive or XML parsing failed.
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    /// The extraction task was aborted before producing text.
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Extract plain text from document bytes for the given file type.
///
/// The returned text is trimmed; callers must treat an empty result as a
/// rejected upload rather than a zero-chunk document.
pub fn extract_text(bytes: &[u8], file_type: FileType) -> Result<String, ExtractError> {
    let text = match file_type {
        FileType::Pdf => extract_pdf(bytes)?,
        FileType::Docx => extract_docx(bytes)?,
        FileType::Txt => String::from_utf8_lossy(bytes).into_owned(),
    };
    Ok(text.trim().to_string())
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|err| ExtractError::Pdf(err.to_string()))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|err| ExtractError::Docx(err.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|err| ExtractError::Docx(err.to_string()))?;
    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|err| ExtractError::Docx(err.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    extract_paragraph_text(&xml)
}

/// Collect `<w:t>` text runs, joining paragraphs (`<w:p>`) with newlines.
fn extract_paragraph_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(element)) => {
                if element.local_name().as_ref() == b"t"
                    && let Ok(quick_xml::events::Event::Text(text)) =
                        reader.read_event_into(&mut buf)
                {
                    out.push_str(text.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(quick_xml::events::Event::End(element)) => {
                if element.local_name().as_ref() == b"p" && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(err) => return Err(ExtractError::Docx(err.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}
