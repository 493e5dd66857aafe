//! OPC package access: ZIP parts, content types and relationships.

use crate::ooxml::{
    CONTENT_TYPES_NS, CONTENT_TYPES_PART, CT_RELATIONSHIPS, CT_XML, PKG_REL_NS,
};
use crate::xml::XmlElement;
use docmorph_core::{Error, Result};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A relationship entry from a `.rels` part.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

#[derive(Debug, Clone)]
enum PartData {
    Raw(Vec<u8>),
    Xml(XmlElement),
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: PartData,
}

/// An in-memory OPC package. XML parts are parsed on load so they can be
/// edited; everything else is carried through untouched.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a package from ZIP bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut package = Package::new();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }

            let name = file.name().to_string();
            // Declared sizes are untrusted; the buffer grows with the data.
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;

            let data = if is_xml_part(&name) {
                match XmlElement::parse(&data) {
                    Ok(root) => PartData::Xml(root),
                    Err(e) => {
                        log::warn!("Keeping unparsable part '{}' as raw bytes: {}", name, e);
                        PartData::Raw(data)
                    }
                }
            } else {
                PartData::Raw(data)
            };
            package.parts.push(Part { name, data });
        }

        log::debug!("Opened package with {} parts", package.parts.len());
        Ok(package)
    }

    /// Write the package as ZIP bytes, content types first.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let ordered = self
            .parts
            .iter()
            .filter(|p| p.name == CONTENT_TYPES_PART)
            .chain(self.parts.iter().filter(|p| p.name != CONTENT_TYPES_PART));

        for part in ordered {
            let bytes = match &part.data {
                PartData::Raw(bytes) => bytes.clone(),
                PartData::Xml(root) => root.to_xml()?,
            };
            writer
                .start_file(part.name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", part.name, e)))?;
            writer
                .write_all(&bytes)
                .map_err(|e| Error::ZipError(format!("Failed to write '{}': {}", part.name, e)))?;
        }

        let cursor = writer
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish ZIP: {}", e)))?;
        Ok(cursor.into_inner())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    /// Raw bytes of a binary part.
    pub fn raw(&self, name: &str) -> Option<&[u8]> {
        self.parts.iter().find(|p| p.name == name).and_then(|p| match &p.data {
            PartData::Raw(bytes) => Some(bytes.as_slice()),
            PartData::Xml(_) => None,
        })
    }

    pub fn xml(&self, name: &str) -> Option<&XmlElement> {
        self.parts.iter().find(|p| p.name == name).and_then(|p| match &p.data {
            PartData::Xml(root) => Some(root),
            PartData::Raw(_) => None,
        })
    }

    pub fn xml_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.parts
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| match &mut p.data {
                PartData::Xml(root) => Some(root),
                PartData::Raw(_) => None,
            })
    }

    /// Like [`Package::xml_mut`], but a missing part is an error.
    pub fn require_xml_mut(&mut self, name: &str) -> Result<&mut XmlElement> {
        self.xml_mut(name)
            .ok_or_else(|| Error::FormattingError(format!("Missing XML part '{}'", name)))
    }

    pub fn set_raw(&mut self, name: &str, bytes: Vec<u8>) {
        self.set_part(name, PartData::Raw(bytes));
    }

    pub fn set_xml(&mut self, name: &str, root: XmlElement) {
        self.set_part(name, PartData::Xml(root));
    }

    fn set_part(&mut self, name: &str, data: PartData) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    /// First free part name from a pattern like `word/header{}.xml`,
    /// counting from 1.
    pub fn unused_part_name(&self, pattern: &str) -> String {
        (1..)
            .map(|n| pattern.replace("{}", &n.to_string()))
            .find(|name| !self.contains(name))
            .unwrap_or_else(|| pattern.replace("{}", "0"))
    }

    /// Register a content type for a file extension.
    pub fn ensure_default_content_type(&mut self, extension: &str, content_type: &str) {
        let types = self.content_types_mut();
        let exists = types.children_named("Default").any(|d| {
            d.attr("Extension")
                .is_some_and(|e| e.eq_ignore_ascii_case(extension))
        });
        if !exists {
            let default = XmlElement::new("Default")
                .with_attr("Extension", extension)
                .with_attr("ContentType", content_type);
            // Defaults precede overrides.
            let index = types
                .children
                .iter()
                .position(|n| matches!(n, crate::xml::XmlNode::Element(e) if e.name == "Override"))
                .unwrap_or(types.children.len());
            types.insert(index, default);
        }
    }

    /// Register a content type for one part.
    pub fn ensure_override_content_type(&mut self, part: &str, content_type: &str) {
        let part_name = format!("/{}", part);
        let types = self.content_types_mut();
        if let Some(existing) = types
            .elements_mut()
            .find(|o| o.name == "Override" && o.attr("PartName") == Some(part_name.as_str()))
        {
            existing.set_attr("ContentType", content_type);
            return;
        }
        types.push(
            XmlElement::new("Override")
                .with_attr("PartName", part_name)
                .with_attr("ContentType", content_type),
        );
    }

    fn content_types_mut(&mut self) -> &mut XmlElement {
        if self.xml(CONTENT_TYPES_PART).is_none() {
            let types = XmlElement::new("Types")
                .with_attr("xmlns", CONTENT_TYPES_NS)
                .with_child(
                    XmlElement::new("Default")
                        .with_attr("Extension", "rels")
                        .with_attr("ContentType", CT_RELATIONSHIPS),
                )
                .with_child(
                    XmlElement::new("Default")
                        .with_attr("Extension", "xml")
                        .with_attr("ContentType", CT_XML),
                );
            self.parts.insert(
                0,
                Part {
                    name: CONTENT_TYPES_PART.to_string(),
                    data: PartData::Xml(types),
                },
            );
        }
        match self.parts.iter_mut().find(|p| p.name == CONTENT_TYPES_PART) {
            Some(Part {
                data: PartData::Xml(root),
                ..
            }) => root,
            _ => unreachable!("content types part was just ensured"),
        }
    }

    /// Relationships whose source is `source_part` (`""` for the package).
    pub fn relationships(&self, source_part: &str) -> Vec<Relationship> {
        let Some(rels) = self.xml(&rels_part_name(source_part)) else {
            return Vec::new();
        };

        rels.children_named("Relationship")
            .map(|r| Relationship {
                id: r.attr("Id").unwrap_or_default().to_string(),
                rel_type: r.attr("Type").unwrap_or_default().to_string(),
                target: r.attr("Target").unwrap_or_default().to_string(),
                external: r.attr("TargetMode") == Some("External"),
            })
            .collect()
    }

    /// Part name targeted by relationship `id` of `source_part`.
    pub fn relationship_target(&self, source_part: &str, id: &str) -> Option<String> {
        self.relationships(source_part)
            .into_iter()
            .find(|r| r.id == id && !r.external)
            .map(|r| resolve_target(source_part, &r.target))
    }

    /// Part name of the first internal relationship of `rel_type`.
    pub fn related_part(&self, source_part: &str, rel_type: &str) -> Option<String> {
        self.relationships(source_part)
            .into_iter()
            .find(|r| r.rel_type == rel_type && !r.external)
            .map(|r| resolve_target(source_part, &r.target))
    }

    /// Add a relationship from `source_part` to `target_part` and return
    /// its new id.
    pub fn add_relationship(
        &mut self,
        source_part: &str,
        rel_type: &str,
        target_part: &str,
    ) -> String {
        let rels_name = rels_part_name(source_part);
        if self.xml(&rels_name).is_none() {
            self.set_xml(
                &rels_name,
                XmlElement::new("Relationships").with_attr("xmlns", PKG_REL_NS),
            );
        }

        let existing = self.relationships(source_part);
        let next = existing
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{}", next);

        let target = relative_target(source_part, target_part);
        if let Some(rels) = self.xml_mut(&rels_name) {
            rels.push(
                XmlElement::new("Relationship")
                    .with_attr("Id", id.as_str())
                    .with_attr("Type", rel_type)
                    .with_attr("Target", target),
            );
        }
        id
    }
}

fn is_xml_part(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xml") || lower.ends_with(".rels")
}

/// Name of the relationships part for `source_part`.
pub fn rels_part_name(source_part: &str) -> String {
    match source_part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None if source_part.is_empty() => "_rels/.rels".to_string(),
        None => format!("_rels/{}.rels", source_part),
    }
}

fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Resolve a relationship target against its source part.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = part_dir(source_part)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Target string for a relationship from `source_part` to `target_part`.
fn relative_target(source_part: &str, target_part: &str) -> String {
    let dir = part_dir(source_part);
    if dir.is_empty() {
        return target_part.to_string();
    }
    match target_part.strip_prefix(dir).and_then(|rest| rest.strip_prefix('/')) {
        Some(relative) => relative.to_string(),
        None => format!("/{}", target_part),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rels_part_name() {
        assert_eq!(rels_part_name(""), "_rels/.rels");
        assert_eq!(rels_part_name("word/document.xml"), "word/_rels/document.xml.rels");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("word/document.xml", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("word/document.xml", "../customXml/item1.xml"), "customXml/item1.xml");
        assert_eq!(resolve_target("", "word/document.xml"), "word/document.xml");
        assert_eq!(resolve_target("word/document.xml", "/word/styles.xml"), "word/styles.xml");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(relative_target("word/document.xml", "word/header1.xml"), "header1.xml");
        assert_eq!(relative_target("", "word/document.xml"), "word/document.xml");
        assert_eq!(relative_target("word/document.xml", "other/x.xml"), "/other/x.xml");
    }

    #[test]
    fn test_relationships_and_content_types_round_trip() {
        let mut package = Package::new();
        package.set_xml("word/document.xml", XmlElement::new("w:document"));
        package.ensure_override_content_type("word/document.xml", "application/test+xml");
        package.ensure_default_content_type("png", "image/png");
        package.ensure_default_content_type("PNG", "image/png");
        package.set_raw("word/media/image1.png", vec![1, 2, 3]);

        let first = package.add_relationship("word/document.xml", "urn:image", "word/media/image1.png");
        let second = package.add_relationship("word/document.xml", "urn:header", "word/header1.xml");
        assert_eq!(first, "rId1");
        assert_eq!(second, "rId2");

        let bytes = package.to_bytes().unwrap();
        let reopened = Package::from_bytes(&bytes).unwrap();

        assert_eq!(reopened.part_names().next(), Some(CONTENT_TYPES_PART));
        assert_eq!(reopened.raw("word/media/image1.png"), Some(&[1u8, 2, 3][..]));
        assert_eq!(
            reopened.related_part("word/document.xml", "urn:header"),
            Some("word/header1.xml".to_string())
        );
        assert_eq!(
            reopened.relationship_target("word/document.xml", "rId1"),
            Some("word/media/image1.png".to_string())
        );

        let types = reopened.xml(CONTENT_TYPES_PART).unwrap();
        assert_eq!(types.children_named("Default").count(), 3);
        assert_eq!(types.children_named("Override").count(), 1);
    }

    #[test]
    fn test_unused_part_name() {
        let mut package = Package::new();
        assert_eq!(package.unused_part_name("word/header{}.xml"), "word/header1.xml");
        package.set_raw("word/header1.xml", Vec::new());
        assert_eq!(package.unused_part_name("word/header{}.xml"), "word/header2.xml");
    }

    fn crc32(data: &[u8]) -> u32 {
        let mut crc = !0u32;
        for &b in data {
            crc ^= b as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    /// A stored one-byte entry whose central directory claims, through a
    /// ZIP64 extra field, an uncompressed size of 2^62 bytes.
    fn archive_with_oversized_entry() -> Vec<u8> {
        let name = b"a.bin";
        let data = b"x";
        let crc = crc32(data);

        let mut zip = Vec::new();
        zip.extend(0x0403_4b50u32.to_le_bytes());
        zip.extend(20u16.to_le_bytes()); // version needed
        zip.extend(0u16.to_le_bytes()); // flags
        zip.extend(0u16.to_le_bytes()); // stored
        zip.extend(0u16.to_le_bytes()); // time
        zip.extend(0x21u16.to_le_bytes()); // date
        zip.extend(crc.to_le_bytes());
        zip.extend(1u32.to_le_bytes());
        zip.extend(1u32.to_le_bytes());
        zip.extend((name.len() as u16).to_le_bytes());
        zip.extend(0u16.to_le_bytes());
        zip.extend(name);
        zip.extend(data);

        let central_start = zip.len() as u32;
        zip.extend(0x0201_4b50u32.to_le_bytes());
        zip.extend(20u16.to_le_bytes()); // version made by
        zip.extend(20u16.to_le_bytes()); // version needed
        zip.extend(0u16.to_le_bytes());
        zip.extend(0u16.to_le_bytes());
        zip.extend(0u16.to_le_bytes());
        zip.extend(0x21u16.to_le_bytes());
        zip.extend(crc.to_le_bytes());
        zip.extend(1u32.to_le_bytes()); // compressed size
        zip.extend(0xFFFF_FFFFu32.to_le_bytes()); // uncompressed size in ZIP64 field
        zip.extend((name.len() as u16).to_le_bytes());
        zip.extend(12u16.to_le_bytes()); // extra field length
        zip.extend(0u16.to_le_bytes()); // comment length
        zip.extend(0u16.to_le_bytes()); // disk number
        zip.extend(0u16.to_le_bytes()); // internal attributes
        zip.extend(0u32.to_le_bytes()); // external attributes
        zip.extend(0u32.to_le_bytes()); // local header offset
        zip.extend(name);
        zip.extend(0x0001u16.to_le_bytes());
        zip.extend(8u16.to_le_bytes());
        zip.extend((1u64 << 62).to_le_bytes());
        let central_size = zip.len() as u32 - central_start;

        zip.extend(0x0605_4b50u32.to_le_bytes());
        zip.extend(0u16.to_le_bytes());
        zip.extend(0u16.to_le_bytes());
        zip.extend(1u16.to_le_bytes());
        zip.extend(1u16.to_le_bytes());
        zip.extend(central_size.to_le_bytes());
        zip.extend(central_start.to_le_bytes());
        zip.extend(0u16.to_le_bytes());
        zip
    }

    #[test]
    fn test_declared_entry_size_not_trusted() {
        let zip = archive_with_oversized_entry();

        match Package::from_bytes(&zip) {
            Ok(package) => assert_eq!(package.raw("a.bin"), Some(&b"x"[..])),
            Err(e) => assert!(matches!(e, Error::ZipError(_))),
        }
        assert!(crate::document::DocxDocument::open(&zip).is_err());
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            Package::from_bytes(b"plain text"),
            Err(Error::ZipError(_))
        ));
    }
}
