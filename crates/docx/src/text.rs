//! Plain-text extraction from DOCX files.

use crate::ooxml::{PACKAGE_RELS_PART, REL_OFFICE_DOCUMENT};
use crate::package::resolve_target;
use docmorph_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Streams the main document part of a DOCX file and returns its text:
/// one line per paragraph, table cells separated by tabs.
pub struct DocxTextExtractor;

impl DocxTextExtractor {
    /// Create a new DOCX text extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract text from a DOCX file on disk.
    pub fn extract_file(&self, path: &Path) -> Result<String> {
        let file = File::open(path)?;
        self.extract(BufReader::new(file))
    }

    /// Extract text from a DOCX archive.
    pub fn extract<R: Read + Seek>(&self, reader: R) -> Result<String> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let main_part = self.main_part_path(&mut archive)?;
        let content = self.read_file_from_archive(&mut archive, &main_part)?;
        let text = self.extract_body_text(&content)?;

        log::debug!("Extracted {} chars from '{}'", text.len(), main_part);
        Ok(text)
    }

    /// Locate the main document part through the package relationships.
    fn main_part_path<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<String> {
        let rels_content = match self.read_file_from_archive(archive, PACKAGE_RELS_PART) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("No package relationships, assuming {}: {}", DEFAULT_MAIN_PART, e);
                return Ok(DEFAULT_MAIN_PART.to_string());
            }
        };

        let mut reader = Reader::from_str(&rels_content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut rel_type = String::new();
                    let mut target = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Type" => {
                                rel_type = String::from_utf8_lossy(&attr.value).to_string();
                            }
                            b"Target" => {
                                target = String::from_utf8_lossy(&attr.value).to_string();
                            }
                            _ => {}
                        }
                    }

                    if rel_type == REL_OFFICE_DOCUMENT {
                        return Ok(resolve_target("", &target));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(DEFAULT_MAIN_PART.to_string())
    }

    /// Collect the text of the document body.
    fn extract_body_text(&self, xml_content: &str) -> Result<String> {
        let mut reader = Reader::from_str(xml_content);
        reader.trim_text(false);

        let mut out = String::new();
        let mut in_text = false;
        // Depth inside pPr/rPr, where w:tab describes tab stops.
        let mut in_properties = 0usize;
        let mut cell_depth = 0usize;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                    b"t" => in_text = true,
                    b"pPr" | b"rPr" => in_properties += 1,
                    b"tc" => cell_depth += 1,
                    _ => {}
                },
                Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                    b"tab" if in_properties == 0 => out.push('\t'),
                    b"br" | b"cr" if in_properties == 0 => out.push('\n'),
                    _ => {}
                },
                Ok(Event::Text(ref e)) => {
                    if in_text {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::XmlError(format!("Bad text content: {}", e)))?;
                        out.push_str(&text);
                    }
                }
                Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                    b"t" => in_text = false,
                    b"pPr" | b"rPr" => in_properties = in_properties.saturating_sub(1),
                    b"p" if cell_depth > 0 => out.push(' '),
                    b"p" => out.push('\n'),
                    b"tc" => {
                        cell_depth = cell_depth.saturating_sub(1);
                        trim_trailing_spaces(&mut out);
                        out.push('\t');
                    }
                    b"tr" => {
                        if out.ends_with('\t') {
                            out.pop();
                        }
                        out.push('\n');
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        Ok(out)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        path: &str,
    ) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }
}

impl Default for DocxTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_trailing_spaces(text: &mut String) {
    let trimmed = text.trim_end_matches(' ').len();
    text.truncate(trimmed);
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
