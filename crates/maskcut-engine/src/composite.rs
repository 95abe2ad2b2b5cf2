//! Mask compositing via tiny-skia.
//!
//! Selected segments and manual strokes are rasterized in layer order
//! into a caller-owned [`Pixmap`]:
//!
//! 1. Fill every selected segment boundary (even-odd, like hit-testing).
//! 2. If `border_size > 0`, stroke each selected boundary with width
//!    `2 * border_size`, growing the region by `border_size` on each side.
//! 3. Manual strokes in commit order. Add strokes paint with width
//!    `brush_size + 2 * border_size`; subtract strokes erase
//!    (destination-out) with width `max(1, brush_size - 2 * border_size)`.
//!
//! The mask is the alpha channel of the result, optionally feathered with
//! a Gaussian blur and inverted. The visualization overlay runs the same
//! layers with tinted paint.

use image::{GrayImage, Luma, Rgba, RgbaImage};
use tiny_skia::{
    BlendMode, FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};

use crate::components::PixelBounds;
use crate::settings::MaskSettings;
use crate::types::{Dimensions, ManualPath, Point, Rgb, Segment, StrokeTool};

/// Overlay tint for add strokes.
const STROKE_TINT: Rgb = [0, 180, 255];

/// Overlay alpha for segment fills and add strokes.
const TINT_ALPHA: u8 = 128;

/// An 8-bit opacity raster: 0 excludes a pixel, 255 includes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask(GrayImage);

impl Mask {
    /// Fully transparent mask.
    #[must_use]
    pub fn empty(dimensions: Dimensions) -> Self {
        Self(GrayImage::new(dimensions.width, dimensions.height))
    }

    #[must_use]
    pub const fn from_gray(gray: GrayImage) -> Self {
        Self(gray)
    }

    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.0.width(),
            height: self.0.height(),
        }
    }

    /// Raw opacity at `(x, y)`; zero outside the mask.
    #[must_use]
    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.0.get_pixel_checked(x, y).map_or(0, |p| p.0[0])
    }

    /// Opacity at `(x, y)` in `[0, 1]`.
    #[must_use]
    pub fn opacity(&self, x: u32, y: u32) -> f32 {
        f32::from(self.value(x, y)) / 255.0
    }

    #[must_use]
    pub const fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    #[must_use]
    pub fn into_gray(self) -> GrayImage {
        self.0
    }

    /// The complement: every value `v` becomes `255 - v`.
    #[must_use]
    pub fn inverted(&self) -> Self {
        let mut gray = self.0.clone();
        for p in gray.pixels_mut() {
            p.0[0] = 255 - p.0[0];
        }
        Self(gray)
    }

    /// Number of pixels with non-zero opacity.
    #[must_use]
    pub fn coverage(&self) -> u64 {
        self.0.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
    }

    /// Inclusive bounds of the non-zero pixels, if any.
    #[must_use]
    pub fn bounding_box(&self) -> Option<PixelBounds> {
        let mut bounds: Option<PixelBounds> = None;
        for (x, y, p) in self.0.enumerate_pixels() {
            if p.0[0] == 0 {
                continue;
            }
            bounds = Some(bounds.map_or(
                PixelBounds {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                |b| PixelBounds {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            ));
        }
        bounds
    }
}

/// How the shared layer pass paints each layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintPolicy {
    /// Opaque white: the pixmap's alpha channel becomes the mask.
    Mask,
    /// Segment palette colors and a fixed stroke tint, half transparent.
    Tint,
}

impl PaintPolicy {
    /// Paint for a selected segment's fill and border. Always opaque;
    /// transparency is applied per layer by [`Self::segment_opacity`].
    fn segment_paint(self, color: Rgb) -> Paint<'static> {
        match self {
            Self::Mask => solid_paint(255, 255, 255, 255),
            Self::Tint => solid_paint(color[0], color[1], color[2], 255),
        }
    }

    fn segment_opacity(self) -> f32 {
        match self {
            Self::Mask => 1.0,
            Self::Tint => f32::from(TINT_ALPHA) / 255.0,
        }
    }

    fn stroke_paint(self, tool: StrokeTool) -> Paint<'static> {
        match (tool, self) {
            (StrokeTool::Add, Self::Mask) => solid_paint(255, 255, 255, 255),
            (StrokeTool::Add, Self::Tint) => {
                solid_paint(STROKE_TINT[0], STROKE_TINT[1], STROKE_TINT[2], TINT_ALPHA)
            }
            (StrokeTool::Subtract, _) => {
                let mut paint = solid_paint(0, 0, 0, 255);
                paint.blend_mode = BlendMode::DestinationOut;
                paint
            }
        }
    }
}

fn solid_paint(r: u8, g: u8, b: u8, a: u8) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

/// Build a tiny-skia path; `None` for fewer than 2 points.
#[allow(clippy::cast_possible_truncation)]
fn build_path(points: &[Point], close: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    if rest.is_empty() {
        return None;
    }
    let mut pb = PathBuilder::new();
    pb.move_to(first.x as f32, first.y as f32);
    for p in rest {
        pb.line_to(p.x as f32, p.y as f32);
    }
    if close {
        pb.close();
    }
    pb.finish()
}

#[allow(clippy::cast_possible_truncation)]
fn round_stroke(width: f64) -> Stroke {
    Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}

/// Fill a closed boundary and, for a positive `border`, stroke it with
/// width `2 * border`.
///
/// Even-odd filling matches [`geometry::contains`](crate::geometry::contains),
/// so what renders as inside is exactly what hit-testing selects.
fn paint_region(pixmap: &mut Pixmap, path: &Path, paint: &Paint<'_>, border: f64) {
    pixmap.fill_path(path, paint, FillRule::EvenOdd, Transform::identity(), None);
    if border > 0.0 {
        pixmap.stroke_path(
            path,
            paint,
            &round_stroke(2.0 * border),
            Transform::identity(),
            None,
        );
    }
}

/// Rasterize selected segments and manual strokes into `pixmap`.
///
/// Segments that are not selected are skipped. Boundaries and strokes
/// with fewer than 2 points contribute nothing.
pub fn render_layers(
    pixmap: &mut Pixmap,
    segments: &[Segment],
    manual_paths: &[ManualPath],
    settings: &MaskSettings,
    policy: PaintPolicy,
) {
    let border = settings.border_size;

    for segment in segments.iter().filter(|s| s.selected) {
        let Some(path) = build_path(segment.boundary.points(), true) else {
            continue;
        };
        let paint = policy.segment_paint(segment.color);
        match policy {
            PaintPolicy::Mask => paint_region(pixmap, &path, &paint, border),
            PaintPolicy::Tint => {
                // Fill and border share one layer so their overlap is tinted once.
                let Some(mut layer) = Pixmap::new(pixmap.width(), pixmap.height()) else {
                    continue;
                };
                paint_region(&mut layer, &path, &paint, border);
                pixmap.draw_pixmap(
                    0,
                    0,
                    layer.as_ref(),
                    &PixmapPaint {
                        opacity: policy.segment_opacity(),
                        ..PixmapPaint::default()
                    },
                    Transform::identity(),
                    None,
                );
            }
        }
    }

    for manual in manual_paths {
        let Some(path) = build_path(manual.points.points(), false) else {
            continue;
        };
        let width = match manual.tool {
            StrokeTool::Add => 2.0f64.mul_add(border, manual.brush_size),
            StrokeTool::Subtract => 2.0f64.mul_add(-border, manual.brush_size).max(1.0),
        };
        pixmap.stroke_path(
            &path,
            &policy.stroke_paint(manual.tool),
            &round_stroke(width),
            Transform::identity(),
            None,
        );
    }
}

/// Composite the mask for `dimensions` from the given layers.
///
/// Pure: the same inputs always produce the same mask. Settings are
/// clamped before use. Zero-sized dimensions yield an empty mask.
#[must_use]
pub fn composite(
    segments: &[Segment],
    manual_paths: &[ManualPath],
    settings: &MaskSettings,
    dimensions: Dimensions,
) -> Mask {
    let settings = settings.clamped();
    let Some(mut pixmap) = Pixmap::new(dimensions.width, dimensions.height) else {
        return Mask::empty(dimensions);
    };
    render_layers(
        &mut pixmap,
        segments,
        manual_paths,
        &settings,
        PaintPolicy::Mask,
    );

    let data = pixmap.data();
    let alpha = GrayImage::from_fn(dimensions.width, dimensions.height, |x, y| {
        let off = (y as usize * dimensions.width as usize + x as usize) * 4;
        Luma([data[off + 3]])
    });

    let mask = Mask(feather(&alpha, settings.feather));
    if settings.invert_mask {
        mask.inverted()
    } else {
        mask
    }
}

/// Gaussian blur with `sigma = radius`; non-positive radii are a no-op
/// since `imageproc` panics on `sigma <= 0`.
#[allow(clippy::cast_possible_truncation)]
fn feather(alpha: &GrayImage, radius: f64) -> GrayImage {
    if radius <= 0.0 {
        return alpha.clone();
    }
    imageproc::filter::gaussian_blur_f32(alpha, radius as f32)
}

/// Render the tinted visualization overlay as a straight-alpha image.
///
/// Selected segments are filled with their palette color, add strokes
/// with a fixed tint, and subtract strokes clear what lies beneath them.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn render_overlay(
    segments: &[Segment],
    manual_paths: &[ManualPath],
    settings: &MaskSettings,
    dimensions: Dimensions,
) -> RgbaImage {
    let Some(mut pixmap) = Pixmap::new(dimensions.width, dimensions.height) else {
        return RgbaImage::new(dimensions.width, dimensions.height);
    };
    render_layers(
        &mut pixmap,
        segments,
        manual_paths,
        &settings.clamped(),
        PaintPolicy::Tint,
    );

    // Un-premultiply: channel = premultiplied * 255 / alpha.
    let data = pixmap.data();
    let mut img = RgbaImage::new(dimensions.width, dimensions.height);
    for (i, pixel) in img.pixels_mut().enumerate() {
        let off = i * 4;
        let a = data[off + 3];
        if a == 0 {
            continue;
        }
        let r = u16::from(data[off]) * 255 / u16::from(a);
        let g = u16::from(data[off + 1]) * 255 / u16::from(a);
        let b = u16::from(data[off + 2]) * 255 / u16::from(a);
        *pixel = Rgba([r as u8, g as u8, b as u8, a]);
    }
    img
}

/// Multiply each pixel's alpha by the mask opacity.
///
/// Pixels outside the mask's extent become fully transparent.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn apply_mask(image: &RgbaImage, mask: &Mask) -> RgbaImage {
    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let m = u16::from(mask.value(x, y));
        let a = u16::from(pixel.0[3]);
        pixel.0[3] = ((a * m + 127) / 255) as u8;
    }
    out
}
