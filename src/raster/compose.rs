//! Raster canvas operations and image-to-PDF encoding

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use lopdf::{Dictionary, Document, Object, Stream};
use crate::error::{Error, Result};
use crate::layout::PageDimensions;
use crate::raster::{FitPolicy, PixelBox, RasterStage};

/// White canvas of the given pixel size
pub fn blank_canvas(size: PixelBox) -> RgbImage {
    RgbImage::from_pixel(size.width, size.height, Rgb([255, 255, 255]))
}

/// Resize a rendered page so it fills `target`
///
/// `Uniform` scales both axes by the same factor and may leave the result a pixel
/// short of the box on one axis. `Stretch` always returns exactly `target`.
pub fn fit_to_box(image: RgbImage, target: PixelBox, fit: FitPolicy) -> RgbImage {
    let (width, height) = image.dimensions();
    if (width, height) == (target.width, target.height) || width == 0 || height == 0 {
        return image;
    }

    let (new_width, new_height) = match fit {
        FitPolicy::Stretch => (target.width, target.height),
        FitPolicy::Uniform => {
            let scale = (target.width as f64 / width as f64).min(target.height as f64 / height as f64);
            (
                ((width as f64 * scale).round() as u32).clamp(1, target.width.max(1)),
                ((height as f64 * scale).round() as u32).clamp(1, target.height.max(1)),
            )
        }
    };

    imageops::resize(&image, new_width, new_height, FilterType::Triangle)
}

/// Paste `layer` onto `canvas`; whatever overhangs the canvas edge is clipped
pub fn overlay_at(canvas: &mut RgbImage, layer: &RgbImage, x: u32, y: u32) -> Result<()> {
    if x >= canvas.width() || y >= canvas.height() {
        return Err(Error::raster(
            RasterStage::Composite,
            format!(
                "offset ({}, {}) lies outside the {}x{} canvas",
                x,
                y,
                canvas.width(),
                canvas.height()
            ),
        ));
    }

    imageops::overlay(canvas, layer, i64::from(x), i64::from(y));
    Ok(())
}

/// Encode `canvas` as a JPEG image filling a single page of `page` size
pub fn encode_page(canvas: &RgbImage, page: PageDimensions, quality: u8) -> Result<Document> {
    let (width_px, height_px) = canvas.dimensions();
    if width_px == 0 || height_px == 0 {
        return Err(Error::raster(RasterStage::Encode, "canvas is empty"));
    }

    let mut jpeg_bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, quality)
        .encode_image(canvas)
        .map_err(|e| Error::raster(RasterStage::Encode, format!("JPEG encoding failed: {}", e)))?;

    let (width_pt, height_pt) = (page.width.pt(), page.height.pt());
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_dict = Dictionary::new();
    image_dict.set("Type", Object::Name(b"XObject".to_vec()));
    image_dict.set("Subtype", Object::Name(b"Image".to_vec()));
    image_dict.set("Width", Object::Integer(i64::from(width_px)));
    image_dict.set("Height", Object::Integer(i64::from(height_px)));
    image_dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    image_dict.set("BitsPerComponent", Object::Integer(8));
    image_dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    // Already JPEG compressed
    let image_id = doc.add_object(Object::Stream(Stream {
        dict: image_dict,
        content: jpeg_bytes,
        allows_compression: false,
        start_position: None,
    }));

    let mut xobjects = Dictionary::new();
    xobjects.set("Im0", Object::Reference(image_id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let content = format!("q\n{:.4} 0 0 {:.4} 0 0 cm\n/Im0 Do\nQ\n", width_pt, height_pt);
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(pages_id));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width_pt as f32),
            Object::Real(height_pt as f32),
        ]),
    );
    page_dict.set("Resources", Object::Dictionary(resources));
    page_dict.set("Contents", Object::Reference(content_id));
    let page_id = doc.add_object(Object::Dictionary(page_dict));

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(1));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    Ok(doc)
}
