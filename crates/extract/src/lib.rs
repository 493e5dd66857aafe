//! Plain-text extraction for uploaded documents.
//!
//! [`TextExtractor`] dispatches on the declared type of an upload to the
//! PDF, DOCX, legacy DOC or plain-text reader and normalizes the result.

pub mod extractor;
pub mod pdf;

pub use extractor::{detect_format, TextExtractor};
pub use pdf::extract_pdf_text;
