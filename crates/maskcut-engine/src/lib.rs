//! maskcut-engine: interactive image masking (sans-IO).
//!
//! Produces a per-pixel opacity mask for an image from two kinds of user
//! input: selections of automatically proposed regions, and freehand
//! add/subtract brush strokes. The pieces:
//!
//! - [`Segmenter`]: proposes candidate regions by downsampling, k-means
//!   color clustering, connected-component labeling and boundary tracing.
//! - [`composite`](composite::composite): rasterizes selected regions and
//!   strokes into a [`Mask`], applying border, feather and invert settings.
//! - [`History`]: linear undo/redo over immutable [`Snapshot`]s.
//! - [`Session`]: owns the image, history and settings; routes user
//!   operations and guards against stale segmentation results.
//!
//! This crate has **no I/O dependencies**: it operates on decoded
//! in-memory images. Decoding and encoding live in `maskcut-export` and
//! the CLI.

pub mod cluster;
pub mod components;
pub mod composite;
pub mod contour;
pub mod diagnostics;
pub mod downsample;
pub mod geometry;
pub mod history;
pub mod segment;
pub mod session;
pub mod settings;
pub mod simplify;
pub mod types;

pub use composite::{Mask, PaintPolicy, apply_mask, composite, render_overlay};
pub use contour::{ContourTracer, ContourTracerKind};
pub use diagnostics::SegmentationDiagnostics;
pub use history::History;
pub use segment::{Segmenter, StagedSegmentation};
pub use session::{SegmentationJob, SegmentationOutcome, Session};
pub use settings::MaskSettings;
pub use types::{
    Dimensions, GrayImage, ManualPath, PathId, Point, Polyline, Rgb, RgbaImage, Segment,
    SegmentError, SegmentId, SegmenterConfig, SessionError, Snapshot, StrokeTool,
};
