//! Paragraph styles and bullet numbering definitions.

use crate::document::DocxDocument;
use crate::ooxml::{CT_NUMBERING, CT_STYLES, PART_NAMESPACES, REL_NUMBERING, REL_STYLES};
use crate::xml::{XmlElement, XmlNode};
use docmorph_core::Result;

/// A paragraph style we may need to add to a document.
pub struct StyleSpec {
    pub id: &'static str,
    pub name: &'static str,
    build: fn() -> XmlElement,
}

pub const HEADING_1: StyleSpec = StyleSpec {
    id: "Heading1",
    name: "heading 1",
    build: heading_1,
};

pub const LIST_BULLET: StyleSpec = StyleSpec {
    id: "ListBullet",
    name: "List Bullet",
    build: list_bullet,
};

pub const CAPTION: StyleSpec = StyleSpec {
    id: "Caption",
    name: "caption",
    build: caption,
};

/// Marks the bullet definition we add, so later calls reuse it.
const BULLET_LIST_NAME: &str = "DocuMorph Bullet";

const BULLET_LEVELS: u32 = 9;

fn paragraph_style(spec_id: &str, name: &str) -> XmlElement {
    XmlElement::new("w:style")
        .with_attr("w:type", "paragraph")
        .with_attr("w:styleId", spec_id)
        .with_child(XmlElement::new("w:name").with_attr("w:val", name))
        .with_child(XmlElement::new("w:basedOn").with_attr("w:val", "Normal"))
}

fn heading_1() -> XmlElement {
    paragraph_style(HEADING_1.id, HEADING_1.name)
        .with_child(XmlElement::new("w:next").with_attr("w:val", "Normal"))
        .with_child(XmlElement::new("w:uiPriority").with_attr("w:val", "9"))
        .with_child(XmlElement::new("w:qFormat"))
        .with_child(
            XmlElement::new("w:pPr")
                .with_child(XmlElement::new("w:keepNext"))
                .with_child(XmlElement::new("w:keepLines"))
                .with_child(
                    XmlElement::new("w:spacing")
                        .with_attr("w:before", "480")
                        .with_attr("w:after", "0"),
                )
                .with_child(XmlElement::new("w:outlineLvl").with_attr("w:val", "0")),
        )
        .with_child(
            XmlElement::new("w:rPr")
                .with_child(XmlElement::new("w:b"))
                .with_child(XmlElement::new("w:bCs"))
                .with_child(XmlElement::new("w:sz").with_attr("w:val", "28"))
                .with_child(XmlElement::new("w:szCs").with_attr("w:val", "28")),
        )
}

fn list_bullet() -> XmlElement {
    paragraph_style(LIST_BULLET.id, LIST_BULLET.name)
        .with_child(XmlElement::new("w:uiPriority").with_attr("w:val", "99"))
        .with_child(XmlElement::new("w:unhideWhenUsed"))
        .with_child(
            XmlElement::new("w:pPr")
                .with_child(XmlElement::new("w:contextualSpacing"))
                .with_child(
                    XmlElement::new("w:ind")
                        .with_attr("w:left", "720")
                        .with_attr("w:hanging", "360"),
                ),
        )
}

fn caption() -> XmlElement {
    paragraph_style(CAPTION.id, CAPTION.name)
        .with_child(XmlElement::new("w:next").with_attr("w:val", "Normal"))
        .with_child(XmlElement::new("w:uiPriority").with_attr("w:val", "35"))
        .with_child(XmlElement::new("w:unhideWhenUsed"))
        .with_child(XmlElement::new("w:qFormat"))
        .with_child(
            XmlElement::new("w:pPr")
                .with_child(XmlElement::new("w:spacing").with_attr("w:after", "200")),
        )
        .with_child(
            XmlElement::new("w:rPr")
                .with_child(XmlElement::new("w:i"))
                .with_child(XmlElement::new("w:iCs"))
                .with_child(XmlElement::new("w:sz").with_attr("w:val", "18"))
                .with_child(XmlElement::new("w:szCs").with_attr("w:val", "18")),
        )
}

fn abstract_bullet_definition(abstract_id: u32) -> XmlElement {
    let mut definition = XmlElement::new("w:abstractNum")
        .with_attr("w:abstractNumId", abstract_id.to_string())
        .with_child(XmlElement::new("w:multiLevelType").with_attr("w:val", "hybridMultilevel"))
        .with_child(XmlElement::new("w:name").with_attr("w:val", BULLET_LIST_NAME));

    for level in 0..BULLET_LEVELS {
        definition.push(
            XmlElement::new("w:lvl")
                .with_attr("w:ilvl", level.to_string())
                .with_child(XmlElement::new("w:start").with_attr("w:val", "1"))
                .with_child(XmlElement::new("w:numFmt").with_attr("w:val", "bullet"))
                .with_child(XmlElement::new("w:lvlText").with_attr("w:val", "\u{2022}"))
                .with_child(XmlElement::new("w:lvlJc").with_attr("w:val", "left"))
                .with_child(
                    XmlElement::new("w:pPr").with_child(
                        XmlElement::new("w:ind")
                            .with_attr("w:left", ((level + 1) * 720).to_string())
                            .with_attr("w:hanging", "360"),
                    ),
                ),
        );
    }
    definition
}

fn part_root(tag: &str) -> XmlElement {
    let mut root = XmlElement::new(tag);
    for (prefix, ns) in PART_NAMESPACES {
        root.set_attr(prefix, *ns);
    }
    root
}

/// Largest numeric `attr` among children named `tag`, plus one.
fn next_id(parent: &XmlElement, tag: &str, attr: &str, first: u32) -> u32 {
    parent
        .children_named(tag)
        .filter_map(|e| e.attr(attr)?.parse::<u32>().ok())
        .max()
        .map_or(first, |max| max + 1)
}

/// Node index just after the last child named in `tags`, or 0.
fn after_last(parent: &XmlElement, tags: &[&str]) -> usize {
    parent
        .children
        .iter()
        .rposition(|n| matches!(n, XmlNode::Element(e) if tags.contains(&e.name.as_str())))
        .map_or(0, |idx| idx + 1)
}

/// Id of an existing paragraph style matching `spec` by display name
/// (case-insensitive), else by id.
fn find_paragraph_style(styles: &XmlElement, spec: &StyleSpec) -> Option<String> {
    let mut by_id = None;
    for style in styles.children_named("w:style") {
        if style.attr("w:type").unwrap_or("paragraph") != "paragraph" {
            continue;
        }
        let name = style.child("w:name").and_then(|n| n.attr("w:val"));
        if name.is_some_and(|n| n.eq_ignore_ascii_case(spec.name)) {
            if let Some(id) = style.attr("w:styleId") {
                return Some(id.to_string());
            }
        }
        if style.attr("w:styleId") == Some(spec.id) {
            by_id = Some(spec.id.to_string());
        }
    }
    by_id
}

impl DocxDocument {
    /// Part related to the main document by `rel_type`, created with an
    /// empty `root_tag` root if missing.
    fn ensure_related_part(
        &mut self,
        rel_type: &str,
        default_name: &str,
        root_tag: &str,
        content_type: &str,
    ) -> String {
        if let Some(part) = self.package.related_part(&self.main_part, rel_type) {
            if self.package.xml(&part).is_some() {
                return part;
            }
        }

        let name = if self.package.contains(default_name) {
            self.package.unused_part_name(&default_name.replace(".xml", "{}.xml"))
        } else {
            default_name.to_string()
        };
        self.package.set_xml(&name, part_root(root_tag));
        self.package.ensure_override_content_type(&name, content_type);
        self.package.add_relationship(&self.main_part, rel_type, &name);
        log::debug!("Created part '{}'", name);
        name
    }

    /// Id of the paragraph style `spec`, adding its definition if the
    /// document has no style of that name or id.
    pub(crate) fn ensure_paragraph_style(&mut self, spec: &StyleSpec) -> Result<String> {
        let part = self.ensure_related_part(REL_STYLES, "word/styles.xml", "w:styles", CT_STYLES);
        let styles = self.package.require_xml_mut(&part)?;

        if let Some(id) = find_paragraph_style(styles, spec) {
            return Ok(id);
        }

        styles.push((spec.build)());
        log::debug!("Added style '{}'", spec.name);
        Ok(spec.id.to_string())
    }

    /// `w:numId` of a bullet list definition, added once per document.
    pub(crate) fn ensure_bullet_numbering(&mut self) -> Result<String> {
        let part = self.ensure_related_part(
            REL_NUMBERING,
            "word/numbering.xml",
            "w:numbering",
            CT_NUMBERING,
        );
        let numbering = self.package.require_xml_mut(&part)?;

        let abstract_id = numbering
            .children_named("w:abstractNum")
            .find(|a| {
                a.child("w:name").and_then(|n| n.attr("w:val")) == Some(BULLET_LIST_NAME)
            })
            .and_then(|a| a.attr("w:abstractNumId"))
            .map(str::to_string);

        if let Some(abstract_id) = &abstract_id {
            let existing = numbering
                .children_named("w:num")
                .find(|n| {
                    n.child("w:abstractNumId").and_then(|a| a.attr("w:val"))
                        == Some(abstract_id.as_str())
                })
                .and_then(|n| n.attr("w:numId"));
            if let Some(num_id) = existing {
                return Ok(num_id.to_string());
            }
        }

        let abstract_id = match abstract_id {
            Some(id) => id,
            None => {
                let id = next_id(numbering, "w:abstractNum", "w:abstractNumId", 0);
                let index = after_last(numbering, &["w:numPicBullet", "w:abstractNum"]);
                numbering.insert(index, abstract_bullet_definition(id));
                id.to_string()
            }
        };

        let num_id = next_id(numbering, "w:num", "w:numId", 1).to_string();
        let index = after_last(numbering, &["w:numPicBullet", "w:abstractNum", "w:num"]);
        numbering.insert(
            index,
            XmlElement::new("w:num")
                .with_attr("w:numId", num_id.as_str())
                .with_child(XmlElement::new("w:abstractNumId").with_attr("w:val", abstract_id)),
        );

        log::debug!("Added bullet numbering {}", num_id);
        Ok(num_id)
    }
}
