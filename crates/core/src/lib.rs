//! Core domain types, preset storage, text normalization and the
//! suggestion checker for DocuMorph.

pub mod check;
pub mod error;
pub mod normalize;
pub mod presets;
pub mod session;
pub mod types;

pub use check::{CheckStrategy, Corrector, DictionaryCorrector, StrategyKind, SuggestionChecker};
pub use error::{Error, ErrorCategory, Result};
pub use normalize::TextNormalizer;
pub use presets::PresetStore;
pub use session::{bullets_from_text, ContentRequest, FigureRequest, ImageAsset, Session};
pub use types::{
    Alignment, CaptionPosition, DocumentFormat, HeaderFooterAlignment, Issue, IssueKind, Margins,
    StyleConfig, DOCX_MIME, MSWORD_MIME,
};
