//! Shared types for the maskcut engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::contour::ContourTracerKind;

/// Re-export `GrayImage` so downstream crates can reference mask and
/// label rasters without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can hand decoded images to
/// the engine without depending on `image` directly.
pub use image::RgbaImage;

/// An RGB display color.
pub type Rgb = [u8; 3];

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A sequence of connected points.
///
/// Used both for closed region boundaries (the last point conceptually
/// connects back to the first) and for open brush strokes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Whether the polyline explicitly closes (`first == last`) with more
    /// than two points.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.len() > 2 && self.0.first() == self.0.last()
    }

    /// Axis-aligned bounding box, or `None` for an empty polyline.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.0.first()?;
        let init = BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(self.0.iter().fold(init, |bb, p| BoundingBox {
            min_x: bb.min_x.min(p.x),
            min_y: bb.min_y.min(p.y),
            max_x: bb.max_x.max(p.x),
            max_y: bb.max_y.max(p.y),
        }))
    }
}

impl From<Vec<Point>> for Polyline {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

/// Axis-aligned bounding box in image coordinates (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Dimensions of an RGBA image.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Identifier of a segment: its creation index within one segmentation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub usize);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment#{}", self.0)
    }
}

/// A candidate region proposed by the segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    /// Closed boundary polygon in image coordinates.
    pub boundary: Polyline,
    /// Cosmetic tint used by the visualization overlay only.
    pub color: Rgb,
    /// Whether the region is part of the output mask.
    pub selected: bool,
    pub label: Option<String>,
}

/// Identifier of a committed manual stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathId(pub u64);

/// Whether a brush stroke adds to or removes from the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeTool {
    Add,
    Subtract,
}

impl fmt::Display for StrokeTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => f.write_str("add"),
            Self::Subtract => f.write_str("subtract"),
        }
    }
}

/// A freehand brush stroke committed by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualPath {
    pub id: PathId,
    /// Open polyline sampled during the pointer drag.
    pub points: Polyline,
    pub tool: StrokeTool,
    /// Stroke width in image pixels, fixed at commit time.
    pub brush_size: f64,
}

/// One immutable version of the editable state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub segments: Vec<Segment>,
    pub manual_paths: Vec<ManualPath>,
}

impl Snapshot {
    /// Snapshot holding freshly segmented regions and no strokes.
    #[must_use]
    pub const fn initial(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            manual_paths: Vec::new(),
        }
    }

    /// The topmost segment whose boundary contains `point`.
    ///
    /// Later-created segments are drawn on top, so they are tested first.
    #[must_use]
    pub fn segment_at(&self, point: Point) -> Option<&Segment> {
        self.segments
            .iter()
            .rev()
            .find(|s| crate::geometry::contains(&s.boundary, point))
    }

    /// Number of segments currently selected.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.segments.iter().filter(|s| s.selected).count()
    }

    /// A copy of this snapshot with the given segment's selection flipped.
    ///
    /// Returns `None` if no segment has that id.
    #[must_use]
    pub fn with_toggled(&self, id: SegmentId) -> Option<Self> {
        let index = self.segments.iter().position(|s| s.id == id)?;
        let mut next = self.clone();
        next.segments[index].selected = !next.segments[index].selected;
        Some(next)
    }

    /// A copy of this snapshot with `path` appended after all earlier strokes.
    #[must_use]
    pub fn with_path(&self, path: ManualPath) -> Self {
        let mut next = self.clone();
        next.manual_paths.push(path);
        next
    }
}

/// Configuration for the region segmenter.
///
/// All parameters have defaults matching the reference behavior; the
/// `DEFAULT_*` constants are exposed for CLI argument defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Longest working-grid axis in pixels. Images are never upscaled.
    pub working_resolution: u32,

    /// Number of k-means clusters.
    pub cluster_count: usize,

    /// Fixed number of k-means assign/update iterations.
    pub iterations: usize,

    /// Components smaller than this fraction of the working-grid pixel
    /// count are discarded as noise.
    pub min_component_fraction: f64,

    /// Minimum spacing between kept boundary points, in image pixels.
    pub simplify_tolerance: f64,

    /// Which boundary tracing algorithm to use.
    pub contour_tracer: ContourTracerKind,
}

impl SegmenterConfig {
    pub const DEFAULT_WORKING_RESOLUTION: u32 = 150;
    pub const DEFAULT_CLUSTER_COUNT: usize = 8;
    pub const DEFAULT_ITERATIONS: usize = 4;
    pub const DEFAULT_MIN_COMPONENT_FRACTION: f64 = 0.005;
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 2.0;

    /// Check the configuration for values the segmenter cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), SegmentError> {
        if self.working_resolution == 0 {
            return Err(SegmentError::InvalidConfig(
                "working_resolution must be at least 1".to_string(),
            ));
        }
        if self.cluster_count == 0 {
            return Err(SegmentError::InvalidConfig(
                "cluster_count must be at least 1".to_string(),
            ));
        }
        if self.iterations == 0 {
            return Err(SegmentError::InvalidConfig(
                "iterations must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_component_fraction) {
            return Err(SegmentError::InvalidConfig(format!(
                "min_component_fraction must be within [0, 1], got {}",
                self.min_component_fraction
            )));
        }
        if self.simplify_tolerance.is_nan() || self.simplify_tolerance < 0.0 {
            return Err(SegmentError::InvalidConfig(format!(
                "simplify_tolerance must be non-negative, got {}",
                self.simplify_tolerance
            )));
        }
        Ok(())
    }
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            working_resolution: Self::DEFAULT_WORKING_RESOLUTION,
            cluster_count: Self::DEFAULT_CLUSTER_COUNT,
            iterations: Self::DEFAULT_ITERATIONS,
            min_component_fraction: Self::DEFAULT_MIN_COMPONENT_FRACTION,
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
            contour_tracer: ContourTracerKind::default(),
        }
    }
}

/// Errors that can occur during segmentation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SegmentError {
    /// The image has zero width or height.
    #[error("image has no pixels")]
    EmptyImage,

    /// The pixel buffer does not hold `width * height` RGBA pixels.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// Segmenter configuration is invalid.
    #[error("invalid segmenter configuration: {0}")]
    InvalidConfig(String),
}

/// Errors returned by [`Session`](crate::Session) operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// A segmentation run is outstanding; edits are rejected until it lands.
    #[error("segmentation is still running")]
    Pending,

    /// The operation needs a loaded image.
    #[error("no image loaded")]
    NoImage,

    /// A segmentation outcome belongs to a superseded image load.
    #[error("stale segmentation result (generation {generation}, current {current})")]
    Stale { generation: u64, current: u64 },

    /// Segmentation failed; the session fell back to no segments.
    #[error("segmentation failed: {0}")]
    Segmentation(#[from] SegmentError),
}
