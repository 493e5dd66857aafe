//! DOCX (Office Open XML) backend for DocuMorph.
//!
//! Loads .docx packages (ZIP archives of XML parts) into an editable tree,
//! applies formatting through [`FormattingEngine`], and extracts plain text
//! with [`DocxTextExtractor`].

pub mod document;
pub mod engine;
pub mod export;
pub mod ooxml;
pub mod package;
pub mod paragraph;
pub mod picture;
pub mod styles;
pub mod template;
pub mod text;
pub mod xml;

pub use document::{DocxDocument, HeaderFooterKind, ParagraphInfo, RunInfo, SectionInfo};
pub use engine::FormattingEngine;
pub use export::{export_document, OUTPUT_FILENAME};
pub use text::DocxTextExtractor;
