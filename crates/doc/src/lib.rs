//! Legacy Word (OLE/CFB) backend for text extraction.
//!
//! Reads .doc files written by Word 97-2003, which store the document text
//! in a piece table inside a Compound File Binary container.

pub mod parser;

pub use parser::DocParser;
