//! Page images taken from the scan embedded in each PDF page.
//!
//! Scanned certificates are usually one full-page image per page, so the
//! largest image XObject on a page stands in for a rendering of it.

use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Rgb};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use crate::error::InputError;

use super::{PageRasterizer, RasterizedPage};

/// Extracts embedded page images with lopdf.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedImageRasterizer;

impl EmbeddedImageRasterizer {
    pub fn new() -> Self {
        Self
    }

    fn load(path: &Path) -> Result<Document, InputError> {
        let mut doc = Document::load(path).map_err(|e| InputError::Pdf(e.to_string()))?;

        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(InputError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        Ok(doc)
    }

    /// Largest decodable image on a page.
    fn page_image(doc: &Document, page_id: ObjectId) -> Option<DynamicImage> {
        let resources = page_resources(doc, page_id)?;
        let xobjects = resources.get(b"XObject").ok()?;
        let Ok((_, Object::Dictionary(xobjects))) = doc.dereference(xobjects) else {
            return None;
        };

        xobjects
            .iter()
            .filter_map(|(_, obj_ref)| doc.dereference(obj_ref).ok())
            .filter_map(|(_, obj)| decode_image(doc, obj))
            .max_by_key(|img| {
                let (w, h) = img.dimensions();
                u64::from(w) * u64::from(h)
            })
    }
}

impl PageRasterizer for EmbeddedImageRasterizer {
    fn name(&self) -> &str {
        "embedded"
    }

    fn rasterize(&self, path: &Path, max_pages: u32) -> Result<Vec<RasterizedPage>, InputError> {
        let doc = Self::load(path)?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(InputError::NoPages);
        }
        debug!("Loaded PDF with {} pages", pages.len());

        let limit = if max_pages == 0 { usize::MAX } else { max_pages as usize };
        let rasterized = pages
            .iter()
            .take(limit)
            .map(|(&number, &page_id)| match Self::page_image(&doc, page_id) {
                Some(image) => RasterizedPage::ok(number, image),
                None => RasterizedPage::failed(number, "no decodable embedded image"),
            })
            .collect();

        Ok(rasterized)
    }
}

/// Resources dictionary for a page, following inheritance up the page tree.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
            return Some(res_dict.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}

fn decode_image(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                return image::load_from_memory_with_format(
                    &stream.content,
                    image::ImageFormat::Jpeg,
                )
                .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    raw_image(&data, width, height, color_space, bits)
}

fn raw_image(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits: i64,
) -> Option<DynamicImage> {
    let pixels = width as usize * height as usize;

    match (color_space, bits) {
        (b"DeviceGray" | b"G", 8) if data.len() >= pixels => {
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data[..pixels].to_vec())
                .map(DynamicImage::ImageLuma8)
        }
        (b"DeviceGray" | b"G", 1) => {
            // Rows are padded to whole bytes; a set bit is white
            let row_bytes = (width as usize).div_ceil(8);
            if data.len() < row_bytes * height as usize {
                return None;
            }
            let buffer = ImageBuffer::from_fn(width, height, |x, y| {
                let byte = data[y as usize * row_bytes + x as usize / 8];
                let bit = (byte >> (7 - (x % 8))) & 1;
                Luma([if bit == 1 { 255u8 } else { 0u8 }])
            });
            Some(DynamicImage::ImageLuma8(buffer))
        }
        (b"DeviceRGB" | b"RGB", 8) if data.len() >= pixels * 3 => {
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data[..pixels * 3].to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        _ => {
            trace!(
                "Could not decode image: {}x{}, colorspace={}, bits={}, data_len={}",
                width,
                height,
                String::from_utf8_lossy(color_space),
                bits,
                data.len()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// Build a PDF whose pages each embed one 8-bit grayscale image; a
    /// `None` entry produces a page without images.
    fn write_pdf(path: &Path, pages: &[Option<(u32, u32)>]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::new();
        for page in pages {
            let resources = match page {
                Some((w, h)) => {
                    let image_id = doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => *w as i64,
                            "Height" => *h as i64,
                            "ColorSpace" => "DeviceGray",
                            "BitsPerComponent" => 8,
                        },
                        vec![128u8; (*w * *h) as usize],
                    ));
                    dictionary! { "XObject" => dictionary! { "Im0" => image_id } }
                }
                None => dictionary! {},
            };
            let resources_id = doc.add_object(resources);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_rasterize_embedded_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certs.pdf");
        write_pdf(&path, &[Some((20, 10)), None, Some((8, 8))]);

        let pages = EmbeddedImageRasterizer::new().rasterize(&path, 0).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].image.as_ref().unwrap().dimensions(), (20, 10));
        assert!(matches!(
            pages[1].image,
            Err(InputError::Rasterize { page: 2, .. })
        ));
        assert_eq!(pages[2].image.as_ref().unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn test_max_pages_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certs.pdf");
        write_pdf(&path, &[Some((4, 4)), Some((4, 4)), Some((4, 4))]);

        let pages = EmbeddedImageRasterizer::new().rasterize(&path, 2).unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_not_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();

        assert!(matches!(
            EmbeddedImageRasterizer::new().rasterize(&path, 0),
            Err(InputError::Pdf(_))
        ));
    }

    #[test]
    fn test_one_bit_gray() {
        // 0b1010_0000 -> white, black, white, black
        let image = raw_image(&[0b1010_0000], 4, 1, b"DeviceGray", 1).unwrap();
        let gray = image.to_luma8();
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
        assert_eq!(gray.get_pixel(1, 0)[0], 0);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
    }
}
