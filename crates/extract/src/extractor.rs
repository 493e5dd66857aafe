//! Type dispatch for uploaded documents.

use crate::pdf::extract_pdf_text;
use docmorph_core::{DocumentFormat, Error, Result, TextNormalizer};
use docmorph_doc::DocParser;
use docmorph_docx::DocxTextExtractor;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Turns uploaded file bytes into normalized plain text.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    /// For PDF and plain text, where tabs are only whitespace.
    normalizer: TextNormalizer,

    /// For Word formats, where tabs separate table cells.
    table_normalizer: TextNormalizer,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    pub fn new() -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            table_normalizer: TextNormalizer::new().with_collapse_tabs(false),
        }
    }

    /// Extract text from `bytes` declared as `declared_type`.
    ///
    /// The declared type may be a MIME type (`application/pdf`) or a short
    /// name (`pdf`, `docx`, `doc`, `txt`).
    pub fn extract(&self, bytes: &[u8], declared_type: &str) -> Result<String> {
        let format = DocumentFormat::from_mime(declared_type).ok_or_else(|| {
            Error::UnsupportedFormat(format!("Unsupported file type: {}", declared_type))
        })?;
        self.extract_format(bytes, format)
    }

    /// Extract text, logging and returning any failure alongside empty text.
    pub fn extract_or_empty(&self, bytes: &[u8], declared_type: &str) -> (String, Option<Error>) {
        match self.extract(bytes, declared_type) {
            Ok(text) => (text, None),
            Err(e) => {
                log::error!("Text extraction failed for '{}': {}", declared_type, e);
                (String::new(), Some(e))
            }
        }
    }

    /// Extract text from a file, detecting its format from magic bytes and
    /// then from its extension.
    pub fn extract_path(&self, path: &Path) -> Result<String> {
        let bytes = fs::read(path)?;
        let format = detect_format(&bytes, path).ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "Could not detect file format of {}",
                path.display()
            ))
        })?;
        self.extract_format(&bytes, format)
    }

    /// Extract text from bytes already known to be `format`.
    pub fn extract_format(&self, bytes: &[u8], format: DocumentFormat) -> Result<String> {
        let text = match format {
            DocumentFormat::Pdf => {
                log::debug!("Extracting as PDF");
                self.normalizer.normalize(&extract_pdf_text(bytes)?)
            }
            DocumentFormat::Docx | DocumentFormat::Doc => {
                let raw = self.extract_word(bytes, format)?;
                self.table_normalizer.normalize(&raw)
            }
            DocumentFormat::PlainText => self.normalizer.normalize(&String::from_utf8_lossy(bytes)),
        };

        Ok(text)
    }

    /// Word uploads are read from a temporary copy on disk. Legacy
    /// `application/msword` uploads are often DOCX, so the payload decides.
    fn extract_word(&self, bytes: &[u8], declared: DocumentFormat) -> Result<String> {
        let format = match DocumentFormat::from_magic(bytes) {
            Some(sniffed @ (DocumentFormat::Docx | DocumentFormat::Doc)) => sniffed,
            _ => declared,
        };
        if format != declared {
            log::debug!("Declared {:?} but payload is {:?}", declared, format);
        }

        with_temp_copy(bytes, |path| match format {
            DocumentFormat::Doc => {
                log::debug!("Extracting as legacy DOC");
                DocParser::new().extract_file(path)
            }
            _ => {
                log::debug!("Extracting as DOCX");
                DocxTextExtractor::new().extract_file(path)
            }
        })
    }
}

/// Format of a file from its magic bytes, else from its extension.
pub fn detect_format(bytes: &[u8], path: &Path) -> Option<DocumentFormat> {
    DocumentFormat::from_magic(bytes).or_else(|| {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentFormat::from_extension)
    })
}

/// Write `bytes` to a temporary file and run `f` on its path. The file is
/// removed when this returns, whether or not `f` succeeded.
pub(crate) fn with_temp_copy<T>(bytes: &[u8], f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
    let mut file = NamedTempFile::new()?;
    file.write_all(bytes)?;
    file.flush()?;

    let result = f(file.path());
    if let Err(e) = file.close() {
        log::warn!("Failed to remove temporary file: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::tests::pdf_with_pages;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::path::PathBuf;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#,
        )
        .unwrap();

        zip.start_file("word/document.xml", options).unwrap();
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        zip.write_all(document.as_bytes()).unwrap();

        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_unsupported_type_yields_empty() {
        let extractor = TextExtractor::new();
        let (text, error) = extractor.extract_or_empty(b"GIF89a", "image/gif");

        assert!(text.is_empty());
        assert!(matches!(error, Some(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_plain_text_is_normalized() {
        let extractor = TextExtractor::new();
        let text = extractor
            .extract(b"Caf\x65\xCC\x81  ok\r\n\r\n\r\n\r\nnext", "text/plain; charset=utf-8")
            .unwrap();
        assert_eq!(text, "Caf\u{e9} ok\n\nnext");
    }

    #[test]
    fn test_docx_extraction() {
        let docx = docx_with_body(
            "<w:p><w:r><w:t>Hello</w:t></w:r></w:p><w:p><w:r><w:t>World</w:t></w:r></w:p>",
        );
        let text = TextExtractor::new().extract(&docx, "docx").unwrap();
        assert_eq!(text, "Hello\nWorld");
    }

    #[test]
    fn test_docx_table_cells_keep_tabs() {
        let docx = docx_with_body(
            "<w:tbl><w:tr>\
             <w:tc><w:p><w:r><w:t>one</w:t></w:r></w:p></w:tc>\
             <w:tc><w:p><w:r><w:t>two  words</w:t></w:r></w:p></w:tc>\
             </w:tr></w:tbl>\
             <w:p><w:r><w:t>after\ttab</w:t></w:r></w:p>",
        );
        let text = TextExtractor::new().extract(&docx, "docx").unwrap();
        assert_eq!(text, "one\ttwo words\nafter\ttab");
    }

    #[test]
    fn test_plain_text_tabs_collapse() {
        let text = TextExtractor::new().extract(b"a\t\tb", "txt").unwrap();
        assert_eq!(text, "a b");
    }

    #[test]
    fn test_msword_payload_is_sniffed() {
        let docx = docx_with_body("<w:p><w:r><w:t>Sniffed</w:t></w:r></w:p>");
        let text = TextExtractor::new()
            .extract(&docx, "application/msword")
            .unwrap();
        assert_eq!(text, "Sniffed");
    }

    #[test]
    fn test_pdf_extraction() {
        let pdf = pdf_with_pages(&["Quarterly report"]);
        let text = TextExtractor::new().extract(&pdf, "application/pdf").unwrap();
        assert_eq!(text, "Quarterly report");
    }

    #[test]
    fn test_corrupt_docx_reports_error() {
        let (text, error) = TextExtractor::new().extract_or_empty(b"PK\x03\x04broken", "docx");
        assert!(text.is_empty());
        assert!(matches!(error, Some(Error::ZipError(_))));
    }

    #[test]
    fn test_temp_copy_removed_on_success_and_failure() {
        let seen = RefCell::new(Vec::<PathBuf>::new());

        let ok = with_temp_copy(b"payload", |path| {
            seen.borrow_mut().push(path.to_path_buf());
            Ok(fs::read(path)?)
        });
        assert_eq!(ok.unwrap(), b"payload");

        let failed: Result<()> = with_temp_copy(b"payload", |path| {
            seen.borrow_mut().push(path.to_path_buf());
            Err(Error::ExtractionError("boom".to_string()))
        });
        assert!(failed.is_err());

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|path| !path.exists()));
    }

    #[test]
    fn test_extract_path_detects_format() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("upload.bin");
        fs::write(&path, docx_with_body("<w:p><w:r><w:t>By magic</w:t></w:r></w:p>")).unwrap();
        assert_eq!(TextExtractor::new().extract_path(&path).unwrap(), "By magic");

        let path = dir.path().join("notes.txt");
        fs::write(&path, "By extension").unwrap();
        assert_eq!(TextExtractor::new().extract_path(&path).unwrap(), "By extension");

        let path = dir.path().join("mystery.xyz");
        fs::write(&path, "???").unwrap();
        assert!(matches!(
            TextExtractor::new().extract_path(&path),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
