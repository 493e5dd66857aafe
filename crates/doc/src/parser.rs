//! Word 97-2003 binary document parser.
//!
//! The text of a .doc file lives in the `WordDocument` stream, split into
//! pieces described by the piece table (the `Pcdt` inside the `Clx`) in
//! the `0Table` or `1Table` stream. Each piece is either UTF-16LE or
//! "compressed" 8-bit Windows-1252 text.
//!
//! Only the main document story is returned. Footnotes, headers and other
//! stories that follow it in the character stream are skipped.

use cfb::CompoundFile;
use docmorph_core::{Error, Result};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

/// Magic number at the start of the FIB.
const WORD_IDENT: u16 = 0xA5EC;

/// Size of the fixed `FibBase` block.
const FIB_BASE_SIZE: usize = 32;

/// Index of the `fcClx`/`lcbClx` pair in `fibRgFcLcb`.
const CLX_PAIR_INDEX: usize = 33;

/// Index of `ccpText` in `fibRgLw`.
const CCP_TEXT_INDEX: usize = 3;

mod fib_flags {
    pub const F_ENCRYPTED: u16 = 0x0100;
    pub const F_WHICH_TBL_STM: u16 = 0x0200;
}

mod clx_types {
    pub const PRC: u8 = 0x01;
    pub const PCDT: u8 = 0x02;
}

/// Piece descriptor flag: the piece holds 8-bit text at `fc / 2`.
const FC_COMPRESSED: u32 = 0x4000_0000;

mod special_chars {
    pub const CELL_MARK: char = '\u{07}';
    pub const LINE_BREAK: char = '\u{0B}';
    pub const PAGE_BREAK: char = '\u{0C}';
    pub const FIELD_BEGIN: char = '\u{13}';
    pub const FIELD_SEPARATOR: char = '\u{14}';
    pub const FIELD_END: char = '\u{15}';
    pub const NON_BREAKING_HYPHEN: char = '\u{1E}';
}

/// The parts of the File Information Block needed to find the text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fib {
    /// Table stream is `1Table` rather than `0Table`.
    which_table_1: bool,
    encrypted: bool,
    /// Number of characters in the main document story.
    ccp_text: u32,
    fc_clx: u32,
    lcb_clx: u32,
}

/// One piece of the character stream.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    cp_start: u32,
    cp_end: u32,
    /// Byte offset of the piece text in the WordDocument stream.
    offset: usize,
    compressed: bool,
}

/// Parser for legacy Word (.doc) files.
pub struct DocParser;

impl DocParser {
    /// Create a new DOC parser.
    pub fn new() -> Self {
        Self
    }

    /// Extract the main document text from a .doc file on disk.
    pub fn extract_file(&self, path: &Path) -> Result<String> {
        let file = File::open(path)?;
        self.extract(file)
    }

    /// Extract the main document text from a .doc file.
    pub fn extract<R: Read + Seek>(&self, reader: R) -> Result<String> {
        let mut cfb = CompoundFile::open(reader)
            .map_err(|e| Error::CfbError(format!("Failed to open CFB container: {}", e)))?;

        self.validate_cfb_structure(&cfb)?;

        let word = self.read_stream(&mut cfb, "/WordDocument")?;
        let fib = parse_fib(&word)?;
        if fib.encrypted {
            return Err(Error::UnsupportedFormat(
                "Encrypted Word documents are not supported".to_string(),
            ));
        }

        let table_name = if fib.which_table_1 { "/1Table" } else { "/0Table" };
        let table = self.read_stream(&mut cfb, table_name)?;

        let pieces = parse_piece_table(&table, fib.fc_clx, fib.lcb_clx)?;
        let raw = assemble_text(&word, &pieces, fib.ccp_text);
        let text = clean_text(&raw);

        log::debug!(
            "DOC: {} pieces, ccpText={}, extracted {} chars",
            pieces.len(),
            fib.ccp_text,
            text.chars().count()
        );
        Ok(text)
    }

    /// Validate the CFB container holds a Word document stream.
    fn validate_cfb_structure<R: Read + Seek>(&self, cfb: &CompoundFile<R>) -> Result<()> {
        if !cfb.is_stream("/WordDocument") {
            return Err(Error::UnsupportedFormat(
                "Missing 'WordDocument' stream. This may not be a Word 97-2003 file \
                 or may be a different Office format."
                    .to_string(),
            ));
        }
        Ok(())
    }

    fn read_stream<R: Read + Seek>(&self, cfb: &mut CompoundFile<R>, path: &str) -> Result<Vec<u8>> {
        let mut stream = cfb
            .open_stream(path)
            .map_err(|e| Error::CfbError(format!("Failed to open stream '{}': {}", path, e)))?;

        let mut data = Vec::new();
        stream
            .read_to_end(&mut data)
            .map_err(|e| Error::CfbError(format!("Failed to read stream '{}': {}", path, e)))?;

        Ok(data)
    }
}

impl Default for DocParser {
    fn default() -> Self {
        Self::new()
    }
}

fn truncated(what: &str) -> Error {
    Error::ExtractionError(format!("Truncated or corrupt Word document: {}", what))
}

/// Parse the FIB at the start of the WordDocument stream.
///
/// The variable-length blocks are walked by their declared counts rather
/// than fixed offsets, so files written by any Word 97+ version work.
fn parse_fib(word: &[u8]) -> Result<Fib> {
    let ident = read_u16_le(word, 0).ok_or_else(|| truncated("FIB"))?;
    if ident != WORD_IDENT {
        return Err(Error::UnsupportedFormat(format!(
            "Not a Word 97-2003 document (FIB ident {:#06x})",
            ident
        )));
    }

    let flags = read_u16_le(word, 0x000A).ok_or_else(|| truncated("FIB flags"))?;

    let csw = read_u16_le(word, FIB_BASE_SIZE).ok_or_else(|| truncated("csw"))? as usize;
    let rg_lw_count_at = FIB_BASE_SIZE + 2 + csw * 2;
    let cslw = read_u16_le(word, rg_lw_count_at).ok_or_else(|| truncated("cslw"))? as usize;
    let rg_lw = rg_lw_count_at + 2;
    if cslw <= CCP_TEXT_INDEX {
        return Err(truncated("fibRgLw"));
    }
    let ccp_text = read_u32_le(word, rg_lw + CCP_TEXT_INDEX * 4).ok_or_else(|| truncated("ccpText"))?;

    let rg_fc_count_at = rg_lw + cslw * 4;
    let pairs = read_u16_le(word, rg_fc_count_at).ok_or_else(|| truncated("cbRgFcLcb"))? as usize;
    if pairs <= CLX_PAIR_INDEX {
        return Err(truncated("fibRgFcLcb"));
    }
    let clx_at = rg_fc_count_at + 2 + CLX_PAIR_INDEX * 8;
    let fc_clx = read_u32_le(word, clx_at).ok_or_else(|| truncated("fcClx"))?;
    let lcb_clx = read_u32_le(word, clx_at + 4).ok_or_else(|| truncated("lcbClx"))?;

    Ok(Fib {
        which_table_1: flags & fib_flags::F_WHICH_TBL_STM != 0,
        encrypted: flags & fib_flags::F_ENCRYPTED != 0,
        ccp_text,
        fc_clx,
        lcb_clx,
    })
}

/// Parse the piece table out of the `Clx` in the table stream.
fn parse_piece_table(table: &[u8], fc_clx: u32, lcb_clx: u32) -> Result<Vec<Piece>> {
    let start = fc_clx as usize;
    let end = start
        .checked_add(lcb_clx as usize)
        .filter(|&end| lcb_clx > 0 && end <= table.len())
        .ok_or_else(|| truncated("Clx"))?;
    let clx = &table[start..end];

    let mut pos = 0;
    while pos < clx.len() {
        match clx[pos] {
            clx_types::PRC => {
                let cb = read_u16_le(clx, pos + 1).ok_or_else(|| truncated("Prc"))? as usize;
                pos += 3 + cb;
            }
            clx_types::PCDT => {
                let lcb = read_u32_le(clx, pos + 1).ok_or_else(|| truncated("Pcdt"))? as usize;
                let plc = clx
                    .get(pos + 5..pos + 5 + lcb)
                    .ok_or_else(|| truncated("PlcPcd"))?;
                return parse_plc_pcd(plc);
            }
            other => {
                return Err(Error::ExtractionError(format!(
                    "Unexpected Clx entry type {:#04x}",
                    other
                )));
            }
        }
    }

    Err(truncated("no piece table in Clx"))
}

/// A PlcPcd is `n + 1` character positions followed by `n` 8-byte piece
/// descriptors.
fn parse_plc_pcd(plc: &[u8]) -> Result<Vec<Piece>> {
    if plc.len() < 4 || (plc.len() - 4) % 12 != 0 {
        return Err(truncated("PlcPcd size"));
    }
    let count = (plc.len() - 4) / 12;
    let descriptors = 4 * (count + 1);

    let mut pieces = Vec::with_capacity(count);
    for i in 0..count {
        let cp_start = read_u32_le(plc, i * 4).ok_or_else(|| truncated("CP"))?;
        let cp_end = read_u32_le(plc, (i + 1) * 4).ok_or_else(|| truncated("CP"))?;
        let fc = read_u32_le(plc, descriptors + i * 8 + 2).ok_or_else(|| truncated("PCD"))?;

        let compressed = fc & FC_COMPRESSED != 0;
        let fc = fc & !(FC_COMPRESSED | 0x8000_0000);
        let offset = if compressed { fc / 2 } else { fc } as usize;

        if cp_end < cp_start {
            log::warn!("Skipping piece {} with reversed CP range", i);
            continue;
        }
        pieces.push(Piece {
            cp_start,
            cp_end,
            offset,
            compressed,
        });
    }

    Ok(pieces)
}

/// Concatenate the text of every piece up to character `limit`.
fn assemble_text(word: &[u8], pieces: &[Piece], limit: u32) -> String {
    let mut out = String::new();

    for piece in pieces {
        if piece.cp_start >= limit {
            break;
        }
        let chars = (piece.cp_end.min(limit) - piece.cp_start) as usize;

        let text = if piece.compressed {
            word.get(piece.offset..piece.offset + chars)
                .map(|bytes| bytes.iter().map(|&b| cp1252_char(b)).collect::<String>())
        } else {
            word.get(piece.offset..piece.offset + chars * 2).map(|bytes| {
                let units = bytes
                    .chunks_exact(2)
                    .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]));
                char::decode_utf16(units)
                    .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect::<String>()
            })
        };

        match text {
            Some(text) => out.push_str(&text),
            None => log::warn!(
                "Piece at CP {} points outside the WordDocument stream",
                piece.cp_start
            ),
        }
    }

    out
}

/// Turn Word's control characters into plain text.
///
/// Field codes are dropped and field results kept. Paragraph marks and
/// breaks become newlines; table cell marks become tabs, with the row end
/// mark closing the line.
fn clean_text(raw: &str) -> String {
    use special_chars::*;

    // One entry per open field: true once its separator has been seen.
    let mut fields: Vec<bool> = Vec::new();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            FIELD_BEGIN => {
                fields.push(false);
                continue;
            }
            FIELD_SEPARATOR => {
                if let Some(in_result) = fields.last_mut() {
                    *in_result = true;
                }
                continue;
            }
            FIELD_END => {
                fields.pop();
                continue;
            }
            _ => {}
        }

        if fields.iter().any(|in_result| !in_result) {
            continue;
        }

        match c {
            '\r' | LINE_BREAK | PAGE_BREAK => out.push('\n'),
            CELL_MARK => {
                if chars.peek() == Some(&CELL_MARK) {
                    chars.next();
                    out.push('\n');
                } else {
                    out.push('\t');
                }
            }
            NON_BREAKING_HYPHEN => out.push('-'),
            '\t' | '\n' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}

/// Decode one Windows-1252 byte.
fn cp1252_char(b: u8) -> char {
    match b {
        0x80 => '€',
        0x82 => '‚',
        0x83 => 'ƒ',
        0x84 => '„',
        0x85 => '…',
        0x86 => '†',
        0x87 => '‡',
        0x88 => 'ˆ',
        0x89 => '‰',
        0x8A => 'Š',
        0x8B => '‹',
        0x8C => 'Œ',
        0x8E => 'Ž',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '•',
        0x96 => '–',
        0x97 => '—',
        0x98 => '˜',
        0x99 => '™',
        0x9A => 'š',
        0x9B => '›',
        0x9C => 'œ',
        0x9E => 'ž',
        0x9F => 'Ÿ',
        0x81 | 0x8D | 0x8F | 0x90 | 0x9D => '?',
        other => other as char,
    }
}

/// Read a little-endian u16, if the slice is long enough.
fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read a little-endian u32, if the slice is long enough.
fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
