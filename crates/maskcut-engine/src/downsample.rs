//! Nearest-neighbor downsampling to the segmentation working grid.
//!
//! Clustering cost grows with pixel count, so segmentation runs on a
//! small grid whose longest axis is at most `working_resolution`. The
//! scale factor is kept so traced boundaries can be mapped back to the
//! source image.
//!
//! Images already within the working resolution are copied unchanged;
//! images are never upscaled.

use image::RgbaImage;

/// A downsampled working image and the factor that produced it.
#[derive(Debug, Clone)]
pub struct Downsampled {
    /// The working-resolution image.
    pub image: RgbaImage,
    /// `working / source` scale factor, in `(0, 1]`.
    pub scale: f64,
}

/// Scale factor `min(res / width, res / height, 1)`.
///
/// Zero-sized axes yield `1.0` (there is nothing to shrink).
#[must_use]
pub fn scale_for(width: u32, height: u32, working_resolution: u32) -> f64 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    let res = f64::from(working_resolution);
    (res / f64::from(width))
        .min(res / f64::from(height))
        .min(1.0)
}

/// Downsample `image` with nearest-neighbor sampling.
///
/// The working grid is `floor(width * scale) x floor(height * scale)`
/// and each destination pixel copies source pixel
/// `floor(dst / scale)`, clamped to the source bounds. Very thin images
/// may floor to an empty grid.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn downsample(image: &RgbaImage, working_resolution: u32) -> Downsampled {
    let (w, h) = image.dimensions();
    let scale = scale_for(w, h, working_resolution);

    if scale >= 1.0 {
        return Downsampled {
            image: image.clone(),
            scale: 1.0,
        };
    }

    let dw = (f64::from(w) * scale).floor() as u32;
    let dh = (f64::from(h) * scale).floor() as u32;
    let src_coord = |dst: u32, limit: u32| -> u32 {
        ((f64::from(dst) / scale).floor() as u32).min(limit.saturating_sub(1))
    };

    let working = RgbaImage::from_fn(dw, dh, |x, y| {
        *image.get_pixel(src_coord(x, w), src_coord(y, h))
    });

    Downsampled {
        image: working,
        scale,
    }
}
