//! Source image decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGBA
//! buffer the segmenter and compositor operate on.

use maskcut_engine::RgbaImage;

use crate::ExportError;

/// Decode raw image bytes into straight-alpha RGBA8.
///
/// # Errors
///
/// Returns [`ExportError::EmptyInput`] if `bytes` is empty and
/// [`ExportError::Decode`] if the format is unrecognized or the data is
/// corrupt.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, ExportError> {
    if bytes.is_empty() {
        return Err(ExportError::EmptyInput);
    }
    let img = image::load_from_memory(bytes).map_err(ExportError::Decode)?;
    Ok(img.to_rgba8())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_returns_error() {
        assert!(matches!(decode_rgba(&[]), Err(ExportError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_decode_error() {
        let result = decode_rgba(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(ExportError::Decode(_))));
    }

    #[test]
    fn png_round_trips_pixels() {
        let img = RgbaImage::from_fn(3, 2, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 40 + y * 90) as u8;
            image::Rgba([v, 255 - v, 7, 255])
        });
        let png = crate::encode_cutout_png(&img).unwrap();
        assert_eq!(decode_rgba(&png).unwrap(), img);
    }
}
