//! Error types for document formatting, text extraction and checking.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while formatting, extracting or checking documents.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Failed to extract text from an input file.
    #[error("Text extraction error: {0}")]
    ExtractionError(String),

    /// The base document could not be loaded, edited or saved.
    #[error("Formatting error: {0}")]
    FormattingError(String),

    /// An image could not be decoded as PNG or JPEG.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The correction backend failed.
    #[error("Checker error: {0}")]
    CheckerError(String),

    /// A style configuration or preset is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A preset name is empty or not filesystem-safe.
    #[error("Invalid preset name: {0:?}")]
    InvalidPresetName(String),

    /// ZIP archive error (for DOCX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for DOCX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// OLE/CFB container error (for legacy DOC).
    #[error("OLE/CFB error: {0}")]
    CfbError(String),

    /// PDF parsing error.
    #[error("PDF error: {0}")]
    PdfError(String),
}

/// The four error families reported back to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Extraction,
    Formatting,
    Checker,
    Config,
}

impl Error {
    /// Map the error onto the family of the operation that produced it.
    ///
    /// Container errors (ZIP, XML, CFB, PDF) and plain I/O errors are
    /// reported as extraction errors; the formatting engine wraps its own
    /// container failures in [`Error::FormattingError`] before returning.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::FormattingError(_) | Error::InvalidImage(_) => ErrorCategory::Formatting,
            Error::CheckerError(_) => ErrorCategory::Checker,
            Error::ConfigError(_) | Error::InvalidPresetName(_) => ErrorCategory::Config,
            Error::IoError(_)
            | Error::UnsupportedFormat(_)
            | Error::ExtractionError(_)
            | Error::ZipError(_)
            | Error::XmlError(_)
            | Error::CfbError(_)
            | Error::PdfError(_) => ErrorCategory::Extraction,
        }
    }
}
