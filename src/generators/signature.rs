//! Signature decoding and compositing.
//!
//! The insured person's signature arrives as a base64-encoded raster image
//! (a canvas export, usually RGBA PNG). It is flattened onto an opaque
//! white background, fitted into a fixed-aspect canvas and composited onto
//! the main document at the geometry of the signature placeholder widget
//! discovered at template-load time.
//!
//! Every failure in here is recoverable: the document is still produced,
//! just without a signature.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, ExtendedColorType, Rgb, RgbImage, RgbaImage};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use thiserror::Error;

use crate::templates::SignatureAnchor;

/// Reference canvas in PDF points. The placeholder widget is expected to
/// have roughly this aspect ratio; the drawn box is fitted into its rect.
pub const REFERENCE_WIDTH_PT: f32 = 200.0;
pub const REFERENCE_HEIGHT_PT: f32 = 72.0;

/// Canvas raster size, 2x the point size for crisp output.
const CANVAS_WIDTH: u32 = 400;
const CANVAS_HEIGHT: u32 = 144;

const XOBJECT_NAME: &str = "PbSig";

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("invalid base64 signature payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("unsupported signature image: {0}")]
    Image(#[from] image::ImageError),
    #[error("signature page {0} not present in template")]
    PageMissing(u32),
}

/// A decoded signature, flattened and centered on the white canvas.
#[derive(Debug)]
pub struct PreparedSignature {
    pub image: RgbImage,
}

/// Decode a base64 signature, stripping an optional data-URI prefix, and
/// normalize it onto the opaque white canvas. The result carries no alpha
/// channel.
pub fn prepare(signature_base64: &str) -> Result<PreparedSignature, SignatureError> {
    let payload = if signature_base64.starts_with("data:") {
        signature_base64
            .split_once(',')
            .map(|(_, rest)| rest)
            .unwrap_or(signature_base64)
    } else {
        signature_base64
    };
    let bytes = BASE64.decode(payload.trim())?;
    let decoded = image::load_from_memory(&bytes)?;
    let flattened = flatten_onto_white(&decoded.to_rgba8());
    Ok(PreparedSignature {
        image: fit_to_canvas(&flattened),
    })
}

/// Composite a prepared signature onto the page named by the anchor. The
/// image goes in as a JPEG XObject drawn by a content stream appended
/// after the existing page content.
pub fn embed(
    doc: &mut Document,
    anchor: &SignatureAnchor,
    prepared: &PreparedSignature,
) -> Result<(), SignatureError> {
    let page_id = *doc
        .get_pages()
        .get(&anchor.page_number)
        .ok_or(SignatureError::PageMissing(anchor.page_number))?;

    let (width, height) = prepared.image.dimensions();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, 90).encode(
        prepared.image.as_raw(),
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;

    let xobject_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));
    register_xobject(doc, page_id, XOBJECT_NAME, xobject_id);

    let (box_width, box_height) = draw_box(anchor.rect);
    let x = anchor.rect[0].min(anchor.rect[2]);
    let y = anchor.rect[1].min(anchor.rect[3]);
    let content = format!("q\n{box_width} 0 0 {box_height} {x} {y} cm\n/{XOBJECT_NAME} Do\nQ\n");
    append_page_content(doc, page_id, content.into_bytes());
    Ok(())
}

/// Alpha-blend every pixel onto white, dropping the alpha channel.
fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u32::from(pixel[3]);
        let blend = |channel: u8| ((u32::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    rgb
}

/// Scale the image to fit the canvas, preserving aspect ratio, and center
/// it on white.
fn fit_to_canvas(source: &RgbImage) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, Rgb([255, 255, 255]));
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return canvas;
    }
    let scale = f64::min(
        f64::from(CANVAS_WIDTH) / f64::from(width),
        f64::from(CANVAS_HEIGHT) / f64::from(height),
    );
    let target_width = ((f64::from(width) * scale).round() as u32).max(1);
    let target_height = ((f64::from(height) * scale).round() as u32).max(1);
    let resized = imageops::resize(
        source,
        target_width,
        target_height,
        imageops::FilterType::Triangle,
    );
    let offset_x = i64::from((CANVAS_WIDTH - target_width.min(CANVAS_WIDTH)) / 2);
    let offset_y = i64::from((CANVAS_HEIGHT - target_height.min(CANVAS_HEIGHT)) / 2);
    imageops::overlay(&mut canvas, &resized, offset_x, offset_y);
    canvas
}

/// The box the canvas is drawn into: the reference aspect fitted inside
/// the widget rect, or the reference size itself when the rect is
/// degenerate.
fn draw_box(rect: [f32; 4]) -> (f32, f32) {
    let rect_width = (rect[2] - rect[0]).abs();
    let rect_height = (rect[3] - rect[1]).abs();
    if rect_width < 1.0 || rect_height < 1.0 {
        return (REFERENCE_WIDTH_PT, REFERENCE_HEIGHT_PT);
    }
    let scale = f32::min(
        rect_width / REFERENCE_WIDTH_PT,
        rect_height / REFERENCE_HEIGHT_PT,
    );
    (REFERENCE_WIDTH_PT * scale, REFERENCE_HEIGHT_PT * scale)
}

/// Register the image XObject under the page's resources, creating the
/// dictionaries that are missing along the way.
fn register_xobject(doc: &mut Document, page_id: ObjectId, name: &str, xobject_id: ObjectId) {
    // Probe read-only first; mutation target depends on how the template
    // stores its resources.
    let resources_obj = doc
        .get_object(page_id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .and_then(|page| page.get(b"Resources").ok().cloned());

    let resources_id = match resources_obj {
        Some(Object::Reference(id)) => Some(id),
        Some(Object::Dictionary(_)) => None,
        _ => {
            // No resources at all: create them inline on the page.
            if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
                page.set(
                    "Resources",
                    dictionary! {
                        "XObject" => dictionary! { name => Object::Reference(xobject_id) },
                    },
                );
            }
            return;
        }
    };

    let xobject_ref = {
        let resources = match resources_id {
            Some(id) => doc.get_object(id).ok().and_then(|o| o.as_dict().ok()),
            None => doc
                .get_object(page_id)
                .ok()
                .and_then(|o| o.as_dict().ok())
                .and_then(|page| page.get(b"Resources").ok())
                .and_then(|o| o.as_dict().ok()),
        };
        resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|o| o.as_reference().ok())
    };

    if let Some(xobjects_id) = xobject_ref {
        if let Ok(xobjects) = doc.get_object_mut(xobjects_id).and_then(Object::as_dict_mut) {
            xobjects.set(name, Object::Reference(xobject_id));
        }
        return;
    }

    let set_in_resources = |resources: &mut lopdf::Dictionary| {
        if let Ok(Object::Dictionary(xobjects)) = resources.get_mut(b"XObject") {
            xobjects.set(name, Object::Reference(xobject_id));
        } else {
            resources.set(
                "XObject",
                dictionary! { name => Object::Reference(xobject_id) },
            );
        }
    };

    match resources_id {
        Some(id) => {
            if let Ok(resources) = doc.get_object_mut(id).and_then(Object::as_dict_mut) {
                set_in_resources(resources);
            }
        }
        None => {
            if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
                if let Ok(Object::Dictionary(resources)) = page.get_mut(b"Resources") {
                    set_in_resources(resources);
                }
            }
        }
    }
}

/// Append a content stream after the page's existing content.
fn append_page_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) {
    let stream_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content));
    if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
        let existing = page.get(b"Contents").ok().cloned();
        match existing {
            Some(Object::Reference(existing_id)) => {
                page.set(
                    "Contents",
                    Object::Array(vec![
                        Object::Reference(existing_id),
                        Object::Reference(stream_id),
                    ]),
                );
            }
            Some(Object::Array(mut streams)) => {
                streams.push(Object::Reference(stream_id));
                page.set("Contents", Object::Array(streams));
            }
            _ => {
                page.set("Contents", Object::Reference(stream_id));
            }
        }
    }
}
