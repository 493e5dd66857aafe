//! Image validation and inline drawing markup.

use crate::ooxml::{inches_to_emu, A_NS, PIC_NS};
use crate::xml::XmlElement;
use docmorph_core::{Error, Result};
use image::ImageFormat;
use std::io::Cursor;

const PICTURE_URI: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// Properties of an image that decoded successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
}

impl ImageInfo {
    /// Extension used for the media part name and content type default.
    pub fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "jpeg",
            _ => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "image/jpeg",
            _ => "image/png",
        }
    }
}

/// Decode `bytes` and accept it only if it is a PNG or JPEG image.
pub fn inspect_image(bytes: &[u8]) -> Result<ImageInfo> {
    if bytes.is_empty() {
        return Err(Error::InvalidImage("Image is empty".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| Error::InvalidImage(format!("Unrecognized image data: {}", e)))?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(Error::InvalidImage(format!(
            "Unsupported image format {:?}, expected PNG or JPEG",
            format
        )));
    }

    let decoded = image::io::Reader::with_format(Cursor::new(bytes), format)
        .decode()
        .map_err(|e| Error::InvalidImage(format!("Failed to decode image: {}", e)))?;

    Ok(ImageInfo {
        format,
        width_px: decoded.width(),
        height_px: decoded.height(),
    })
}

/// A `w:r` holding an inline picture of `width` x `height` inches that
/// references the image relationship `rel_id`.
pub fn inline_picture_run(
    rel_id: &str,
    drawing_id: u32,
    name: &str,
    width: f64,
    height: f64,
) -> XmlElement {
    let cx = inches_to_emu(width).to_string();
    let cy = inches_to_emu(height).to_string();
    let description = format!("Picture {}", drawing_id);

    let picture = XmlElement::new("pic:pic")
        .with_attr("xmlns:pic", PIC_NS)
        .with_child(
            XmlElement::new("pic:nvPicPr")
                .with_child(
                    XmlElement::new("pic:cNvPr")
                        .with_attr("id", "0")
                        .with_attr("name", name),
                )
                .with_child(XmlElement::new("pic:cNvPicPr")),
        )
        .with_child(
            XmlElement::new("pic:blipFill")
                .with_child(XmlElement::new("a:blip").with_attr("r:embed", rel_id))
                .with_child(XmlElement::new("a:stretch").with_child(XmlElement::new("a:fillRect"))),
        )
        .with_child(
            XmlElement::new("pic:spPr")
                .with_child(
                    XmlElement::new("a:xfrm")
                        .with_child(XmlElement::new("a:off").with_attr("x", "0").with_attr("y", "0"))
                        .with_child(
                            XmlElement::new("a:ext")
                                .with_attr("cx", cx.as_str())
                                .with_attr("cy", cy.as_str()),
                        ),
                )
                .with_child(
                    XmlElement::new("a:prstGeom")
                        .with_attr("prst", "rect")
                        .with_child(XmlElement::new("a:avLst")),
                ),
        );

    let inline = XmlElement::new("wp:inline")
        .with_attr("distT", "0")
        .with_attr("distB", "0")
        .with_attr("distL", "0")
        .with_attr("distR", "0")
        .with_child(
            XmlElement::new("wp:extent")
                .with_attr("cx", cx.as_str())
                .with_attr("cy", cy.as_str()),
        )
        .with_child(
            XmlElement::new("wp:docPr")
                .with_attr("id", drawing_id.to_string())
                .with_attr("name", description),
        )
        .with_child(
            XmlElement::new("wp:cNvGraphicFramePr").with_child(
                XmlElement::new("a:graphicFrameLocks")
                    .with_attr("xmlns:a", A_NS)
                    .with_attr("noChangeAspect", "1"),
            ),
        )
        .with_child(
            XmlElement::new("a:graphic").with_attr("xmlns:a", A_NS).with_child(
                XmlElement::new("a:graphicData")
                    .with_attr("uri", PICTURE_URI)
                    .with_child(picture),
            ),
        );

    XmlElement::new("w:r").with_child(XmlElement::new("w:drawing").with_child(inline))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, ImageOutputFormat, Rgb};

    /// Encode a small solid image for use as a fixture.
    pub(crate) fn encoded_image(format: ImageOutputFormat) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 3, Rgb([200, 30, 30]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, format).unwrap();
        bytes.into_inner()
    }

    pub(crate) fn png_bytes() -> Vec<u8> {
        encoded_image(ImageOutputFormat::Png)
    }

    #[test]
    fn test_inspect_png_and_jpeg() {
        let info = inspect_image(&png_bytes()).unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!((info.width_px, info.height_px), (4, 3));
        assert_eq!(info.extension(), "png");

        let info = inspect_image(&encoded_image(ImageOutputFormat::Jpeg(90))).unwrap();
        assert_eq!(info.content_type(), "image/jpeg");
    }

    #[test]
    fn test_rejects_invalid_images() {
        assert!(matches!(inspect_image(b""), Err(Error::InvalidImage(_))));
        assert!(matches!(
            inspect_image(b"definitely not an image"),
            Err(Error::InvalidImage(_))
        ));

        let mut truncated = png_bytes();
        truncated.truncate(20);
        assert!(matches!(inspect_image(&truncated), Err(Error::InvalidImage(_))));

        // GIF signature: recognized, but not accepted.
        assert!(matches!(
            inspect_image(b"GIF89a\x01\x00\x01\x00\x00\x00\x00;"),
            Err(Error::InvalidImage(_))
        ));
    }

    #[test]
    fn test_inline_picture_size_in_emu() {
        let run = inline_picture_run("rId7", 3, "logo.png", 1.5, 0.5);
        let inline = run.child("w:drawing").unwrap().child("wp:inline").unwrap();

        let extent = inline.child("wp:extent").unwrap();
        assert_eq!(extent.attr("cx"), Some("1371600"));
        assert_eq!(extent.attr("cy"), Some("457200"));
        assert_eq!(inline.child("wp:docPr").unwrap().attr("id"), Some("3"));

        let blips = run.descendants_named("a:blip");
        assert_eq!(blips.len(), 1);
        assert_eq!(blips[0].attr("r:embed"), Some("rId7"));
    }
}
