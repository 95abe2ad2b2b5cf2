//! PNG serializers for cutouts and masks.
//!
//! These are pure functions with no I/O: they return encoded bytes.

use image::{ExtendedColorType, ImageEncoder};
use image::codecs::png::PngEncoder;
use maskcut_engine::{Mask, RgbaImage};

use crate::ExportError;

/// Encode a cutout (source image with mask-scaled alpha) as RGBA PNG.
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder rejects the buffer.
pub fn encode_cutout_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    encode(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
}

/// Encode a mask as an 8-bit grayscale PNG (255 = included).
///
/// # Errors
///
/// Returns [`ExportError::Encode`] if the encoder rejects the buffer.
pub fn encode_mask_png(mask: &Mask) -> Result<Vec<u8>, ExportError> {
    let gray = mask.as_gray();
    encode(gray.as_raw(), gray.width(), gray.height(), ExtendedColorType::L8)
}

fn encode(
    data: &[u8],
    width: u32,
    height: u32,
    color: ExtendedColorType,
) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(data, width, height, color)
        .map_err(ExportError::Encode)?;
    Ok(buf)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use maskcut_engine::GrayImage;

    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn cutout_has_png_signature() {
        let img = RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 128]));
        let png = encode_cutout_png(&img).unwrap();
        assert_eq!(png[..8], PNG_SIGNATURE);
    }

    #[test]
    fn mask_decodes_as_grayscale() {
        let gray = GrayImage::from_fn(5, 3, |x, _| image::Luma([if x < 2 { 255 } else { 0 }]));
        let png = encode_mask_png(&Mask::from_gray(gray.clone())).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.color(), image::ColorType::L8);
        assert_eq!(decoded.to_luma8(), gray);
    }
}
