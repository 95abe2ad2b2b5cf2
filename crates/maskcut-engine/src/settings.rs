//! User-adjustable mask settings.
//!
//! Out-of-range values are clamped on mutation, never reported as errors.

use serde::{Deserialize, Serialize};

/// Settings that shape how the mask is composited.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskSettings {
    /// Stroke width in image pixels applied to newly committed paths.
    pub pen_size: f64,
    /// Per-shape dilation: grows selected regions and add strokes, shrinks
    /// subtract strokes.
    pub border_size: f64,
    /// Gaussian blur sigma applied to the composited mask.
    pub feather: f64,
    /// Complement the final mask.
    pub invert_mask: bool,
}

impl MaskSettings {
    pub const MIN_PEN_SIZE: f64 = 1.0;
    pub const MAX_PEN_SIZE: f64 = 100.0;
    pub const DEFAULT_PEN_SIZE: f64 = 20.0;

    pub const MIN_BORDER_SIZE: f64 = 0.0;
    pub const MAX_BORDER_SIZE: f64 = 20.0;
    pub const DEFAULT_BORDER_SIZE: f64 = 0.0;

    pub const MIN_FEATHER: f64 = 0.0;
    pub const MAX_FEATHER: f64 = 20.0;
    pub const DEFAULT_FEATHER: f64 = 0.0;

    pub const DEFAULT_INVERT_MASK: bool = false;

    /// A copy with every numeric field clamped to its documented range.
    ///
    /// `NaN` clamps to the range minimum.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            pen_size: clamp(self.pen_size, Self::MIN_PEN_SIZE, Self::MAX_PEN_SIZE),
            border_size: clamp(self.border_size, Self::MIN_BORDER_SIZE, Self::MAX_BORDER_SIZE),
            feather: clamp(self.feather, Self::MIN_FEATHER, Self::MAX_FEATHER),
            invert_mask: self.invert_mask,
        }
    }

    pub fn set_pen_size(&mut self, value: f64) {
        self.pen_size = clamp(value, Self::MIN_PEN_SIZE, Self::MAX_PEN_SIZE);
    }

    pub fn set_border_size(&mut self, value: f64) {
        self.border_size = clamp(value, Self::MIN_BORDER_SIZE, Self::MAX_BORDER_SIZE);
    }

    pub fn set_feather(&mut self, value: f64) {
        self.feather = clamp(value, Self::MIN_FEATHER, Self::MAX_FEATHER);
    }

    pub const fn set_invert_mask(&mut self, value: bool) {
        self.invert_mask = value;
    }
}

impl Default for MaskSettings {
    fn default() -> Self {
        Self {
            pen_size: Self::DEFAULT_PEN_SIZE,
            border_size: Self::DEFAULT_BORDER_SIZE,
            feather: Self::DEFAULT_FEATHER,
            invert_mask: Self::DEFAULT_INVERT_MASK,
        }
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}
