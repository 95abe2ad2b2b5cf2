//! maskcut-export: pure image codecs (sans-IO)
//!
//! Decodes source images into RGBA buffers for the engine and serializes
//! the engine's outputs (cutouts and masks) as PNG bytes. No filesystem
//! access happens here; callers own reading and writing.

pub mod decode;
pub mod png;

pub use decode::decode_rgba;
pub use png::{encode_cutout_png, encode_mask_png};

/// Errors from decoding or encoding images.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Failed to encode the output image.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}
