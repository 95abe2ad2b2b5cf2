//! Session controller: the single owner of editable state.
//!
//! A [`Session`] holds the source image, the edit [`History`], the
//! [`MaskSettings`] and two counters: the next manual path id and the
//! segmentation generation.
//!
//! Loading an image is split into three steps so segmentation can run
//! off the calling thread:
//!
//! ```rust
//! # use maskcut_engine::{RgbaImage, Segmenter, SegmenterConfig, Session, SessionError};
//! # fn run(image: RgbaImage) -> Result<(), SessionError> {
//! let mut session = Session::new();
//! let mut segmenter = Segmenter::seeded(SegmenterConfig::default(), 7);
//!
//! let job = session.begin_load(image);
//! // `job` is `Send`; it may be run on a worker thread.
//! let outcome = job.run(&mut segmenter);
//! session.finish_load(outcome)?;
//! # Ok(())
//! # }
//! ```
//!
//! Every load bumps the generation. An outcome whose generation no longer
//! matches is discarded, so a slow run for a replaced image can never
//! overwrite the newer image's segments. While a run is outstanding,
//! edits are rejected with [`SessionError::Pending`].

use std::sync::Arc;

use rand::Rng;

use crate::composite::{self, Mask};
use crate::history::History;
use crate::segment::Segmenter;
use crate::settings::MaskSettings;
use crate::types::{
    Dimensions, ManualPath, PathId, Point, Polyline, RgbaImage, Segment, SegmentError, SegmentId,
    SessionError, Snapshot, StrokeTool,
};

/// A segmentation run bound to the load that requested it.
#[derive(Debug, Clone)]
#[must_use = "a segmentation job does nothing until run"]
pub struct SegmentationJob {
    generation: u64,
    image: Arc<RgbaImage>,
}

impl SegmentationJob {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Segment the job's image.
    pub fn run<R: Rng>(self, segmenter: &mut Segmenter<R>) -> SegmentationOutcome {
        SegmentationOutcome {
            generation: self.generation,
            result: segmenter.segment_image(&self.image),
        }
    }
}

/// The result of a [`SegmentationJob`], to be handed back to
/// [`Session::finish_load`].
#[derive(Debug, Clone)]
pub struct SegmentationOutcome {
    pub generation: u64,
    pub result: Result<Vec<Segment>, SegmentError>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    image: Option<Arc<RgbaImage>>,
    history: History,
    settings: MaskSettings,
    next_path_id: u64,
    generation: u64,
    pending: bool,
}

impl Session {
    /// Session with no image, an empty history and default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Start loading `image`: store it, clear history, and mark the
    /// session pending until [`finish_load`](Self::finish_load) receives
    /// the matching outcome.
    pub fn begin_load(&mut self, image: RgbaImage) -> SegmentationJob {
        let image = Arc::new(image);
        self.image = Some(Arc::clone(&image));
        self.history.reset();
        self.next_path_id = 0;
        self.generation += 1;
        self.pending = true;
        tracing::debug!(
            generation = self.generation,
            width = image.width(),
            height = image.height(),
            "image load started"
        );
        SegmentationJob {
            generation: self.generation,
            image,
        }
    }

    /// Deliver a segmentation outcome.
    ///
    /// On success the history is replaced by one snapshot holding the new
    /// segments, and the segment count is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stale`] (leaving the session untouched) if
    /// the outcome belongs to a superseded load, and
    /// [`SessionError::Segmentation`] if segmentation failed. In the
    /// latter case the session is no longer pending and simply has no
    /// segments.
    pub fn finish_load(&mut self, outcome: SegmentationOutcome) -> Result<usize, SessionError> {
        if outcome.generation != self.generation {
            tracing::warn!(
                generation = outcome.generation,
                current = self.generation,
                "discarding stale segmentation result"
            );
            return Err(SessionError::Stale {
                generation: outcome.generation,
                current: self.generation,
            });
        }
        self.pending = false;

        match outcome.result {
            Ok(segments) => {
                let count = segments.len();
                self.history.reset_to(Snapshot::initial(segments));
                tracing::info!(
                    generation = self.generation,
                    segments = count,
                    "segmentation loaded"
                );
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "segmentation failed; continuing with no segments");
                Err(SessionError::Segmentation(e))
            }
        }
    }

    /// Load `image` and segment it on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Segmentation`] if segmentation failed; the
    /// image stays loaded with no segments.
    pub fn load_image<R: Rng>(
        &mut self,
        image: RgbaImage,
        segmenter: &mut Segmenter<R>,
    ) -> Result<usize, SessionError> {
        let outcome = self.begin_load(image).run(segmenter);
        self.finish_load(outcome)
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    const fn ensure_ready(&self) -> Result<(), SessionError> {
        if self.pending {
            Err(SessionError::Pending)
        } else {
            Ok(())
        }
    }

    /// Toggle the topmost segment containing `point`.
    ///
    /// Returns the toggled segment's id, or `None` if the point hit no
    /// segment (no history step is recorded then).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pending`] while segmentation is running.
    pub fn toggle_at(&mut self, point: Point) -> Result<Option<SegmentId>, SessionError> {
        self.ensure_ready()?;
        let Some(id) = self.history.current().segment_at(point).map(|s| s.id) else {
            return Ok(None);
        };
        self.toggle_segment(id)?;
        Ok(Some(id))
    }

    /// Toggle the segment with `id`. Returns `false` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pending`] while segmentation is running.
    pub fn toggle_segment(&mut self, id: SegmentId) -> Result<bool, SessionError> {
        self.ensure_ready()?;
        let Some(next) = self.history.current().with_toggled(id) else {
            return Ok(false);
        };
        self.history.push(next);
        tracing::debug!(%id, "segment toggled");
        Ok(true)
    }

    /// Commit a freehand stroke drawn with the current pen size.
    ///
    /// Strokes with fewer than 2 points are dropped without a history
    /// step and return `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pending`] while segmentation is running
    /// and [`SessionError::NoImage`] before any image is loaded.
    pub fn commit_stroke(
        &mut self,
        points: impl Into<Polyline>,
        tool: StrokeTool,
    ) -> Result<Option<PathId>, SessionError> {
        self.ensure_ready()?;
        if self.image.is_none() {
            return Err(SessionError::NoImage);
        }
        let points = points.into();
        if points.len() < 2 {
            return Ok(None);
        }

        let id = PathId(self.next_path_id);
        self.next_path_id += 1;
        let path = ManualPath {
            id,
            points,
            tool,
            brush_size: self.settings.pen_size,
        };
        let next = self.history.current().with_path(path);
        self.history.push(next);
        tracing::debug!(path = id.0, %tool, "stroke committed");
        Ok(Some(id))
    }

    /// Step back one edit. Returns `false` at the start of history.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pending`] while segmentation is running.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        self.ensure_ready()?;
        Ok(self.history.undo())
    }

    /// Step forward one edit. Returns `false` at the end of history.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pending`] while segmentation is running.
    pub fn redo(&mut self) -> Result<bool, SessionError> {
        self.ensure_ready()?;
        Ok(self.history.redo())
    }

    /// Discard every edit: all segments deselected, no strokes, and a
    /// single-entry history.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Pending`] while segmentation is running.
    pub fn reset_edits(&mut self) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let segments = self
            .history
            .current()
            .segments
            .iter()
            .cloned()
            .map(|s| Segment {
                selected: false,
                ..s
            })
            .collect();
        self.history.reset_to(Snapshot::initial(segments));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    #[must_use]
    pub const fn settings(&self) -> &MaskSettings {
        &self.settings
    }

    /// Replace all settings, clamping each to its range.
    pub fn set_settings(&mut self, settings: MaskSettings) {
        self.settings = settings.clamped();
    }

    pub fn set_pen_size(&mut self, value: f64) {
        self.settings.set_pen_size(value);
    }

    pub fn set_border_size(&mut self, value: f64) {
        self.settings.set_border_size(value);
    }

    pub fn set_feather(&mut self, value: f64) {
        self.settings.set_feather(value);
    }

    pub const fn set_invert_mask(&mut self, value: bool) {
        self.settings.set_invert_mask(value);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.image().map(Dimensions::of)
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// The snapshot under the history cursor.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        self.history.current()
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Composite the current mask, or `None` without an image.
    #[must_use]
    pub fn mask(&self) -> Option<Mask> {
        let dimensions = self.dimensions()?;
        let snap = self.snapshot();
        Some(composite::composite(
            &snap.segments,
            &snap.manual_paths,
            &self.settings,
            dimensions,
        ))
    }

    /// Render the tinted visualization overlay, or `None` without an image.
    #[must_use]
    pub fn overlay(&self) -> Option<RgbaImage> {
        let dimensions = self.dimensions()?;
        let snap = self.snapshot();
        Some(composite::render_overlay(
            &snap.segments,
            &snap.manual_paths,
            &self.settings,
            dimensions,
        ))
    }

    /// The source image with its alpha multiplied by the current mask,
    /// or `None` without an image.
    #[must_use]
    pub fn export(&self) -> Option<RgbaImage> {
        let image = self.image()?;
        let mask = self.mask()?;
        Some(composite::apply_mask(image, &mask))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::SegmenterConfig;

    fn black_square() -> RgbaImage {
        RgbaImage::from_fn(100, 100, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([200, 50, 50, 255])
            }
        })
    }

    fn loaded() -> Session {
        let mut session = Session::new();
        let mut segmenter = Segmenter::seeded(SegmenterConfig::default(), 21);
        session.load_image(black_square(), &mut segmenter).unwrap();
        session
    }

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![Point::new(x0, y0), Point::new(x1, y1)]
    }

    #[test]
    fn new_session_has_nothing_to_export() {
        let session = Session::new();
        assert!(session.mask().is_none());
        assert!(session.export().is_none());
        assert!(session.overlay().is_none());
        assert!(!session.is_pending());
    }

    #[test]
    fn stroke_without_image_is_rejected() {
        let mut session = Session::new();
        assert_eq!(
            session.commit_stroke(line(0.0, 0.0, 5.0, 5.0), StrokeTool::Add),
            Err(SessionError::NoImage)
        );
    }

    #[test]
    fn load_replaces_history_with_initial_snapshot() {
        let session = loaded();
        assert!(!session.is_pending());
        assert_eq!(session.history().len(), 1);
        assert!(!session.snapshot().segments.is_empty());
        assert_eq!(session.snapshot().selected_count(), 0);
    }

    #[test]
    fn edits_are_rejected_while_pending() {
        let mut session = loaded();
        let _job = session.begin_load(black_square());
        assert!(session.is_pending());
        assert_eq!(session.undo(), Err(SessionError::Pending));
        assert_eq!(
            session.toggle_at(Point::new(20.0, 20.0)),
            Err(SessionError::Pending)
        );
        assert_eq!(
            session.commit_stroke(line(0.0, 0.0, 5.0, 5.0), StrokeTool::Add),
            Err(SessionError::Pending)
        );
        assert_eq!(session.reset_edits(), Err(SessionError::Pending));
    }

    #[test]
    fn stale_outcome_is_discarded() {
        let mut session = Session::new();
        let mut segmenter = Segmenter::seeded(SegmenterConfig::default(), 1);
        let first = session.begin_load(black_square());
        let second = session.begin_load(RgbaImage::from_pixel(
            10,
            10,
            image::Rgba([0, 0, 255, 255]),
        ));

        let stale = first.run(&mut segmenter);
        assert_eq!(
            session.finish_load(stale),
            Err(SessionError::Stale {
                generation: 1,
                current: 2,
            })
        );
        assert!(session.is_pending(), "stale result must not clear pending");

        let fresh = second.run(&mut segmenter);
        assert!(session.finish_load(fresh).is_ok());
        assert!(!session.is_pending());
        assert_eq!(session.dimensions().map(|d| d.width), Some(10));
    }

    #[test]
    fn failed_segmentation_leaves_no_segments() {
        let mut session = Session::new();
        let job = session.begin_load(RgbaImage::new(4, 4));
        let outcome = SegmentationOutcome {
            generation: job.generation(),
            result: Err(SegmentError::EmptyImage),
        };
        assert_eq!(
            session.finish_load(outcome),
            Err(SessionError::Segmentation(SegmentError::EmptyImage))
        );
        assert!(!session.is_pending());
        assert!(session.snapshot().segments.is_empty());
        // The mask is still well defined: fully transparent.
        assert_eq!(session.mask().map(|m| m.coverage()), Some(0));
    }

    #[test]
    fn toggle_at_selects_topmost_and_records_step() {
        let mut session = loaded();
        let id = session.toggle_at(Point::new(20.0, 20.0)).unwrap();
        assert!(id.is_some());
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.snapshot().selected_count(), 1);

        assert!(session.undo().unwrap());
        assert_eq!(session.snapshot().selected_count(), 0);
        assert!(session.redo().unwrap());
        assert_eq!(session.snapshot().selected_count(), 1);
    }

    #[test]
    fn toggle_outside_every_segment_is_noop() {
        let mut session = loaded();
        assert_eq!(session.toggle_at(Point::new(-50.0, -50.0)), Ok(None));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn short_stroke_is_dropped() {
        let mut session = loaded();
        assert_eq!(
            session.commit_stroke(vec![Point::new(1.0, 1.0)], StrokeTool::Add),
            Ok(None)
        );
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn stroke_uses_pen_size_at_commit() {
        let mut session = loaded();
        session.set_pen_size(12.0);
        let id = session
            .commit_stroke(line(50.0, 50.0, 90.0, 50.0), StrokeTool::Add)
            .unwrap()
            .unwrap();
        session.set_pen_size(40.0);
        let path = &session.snapshot().manual_paths[0];
        assert_eq!(path.id, id);
        assert!((path.brush_size - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn path_ids_increase() {
        let mut session = loaded();
        let a = session
            .commit_stroke(line(50.0, 50.0, 60.0, 50.0), StrokeTool::Add)
            .unwrap();
        let b = session
            .commit_stroke(line(50.0, 60.0, 60.0, 60.0), StrokeTool::Subtract)
            .unwrap();
        assert_eq!(a, Some(PathId(0)));
        assert_eq!(b, Some(PathId(1)));
    }

    #[test]
    fn reset_edits_deselects_and_clears_strokes() {
        let mut session = loaded();
        session.toggle_at(Point::new(20.0, 20.0)).unwrap();
        session
            .commit_stroke(line(50.0, 50.0, 90.0, 50.0), StrokeTool::Add)
            .unwrap();
        let segment_count = session.snapshot().segments.len();

        session.reset_edits().unwrap();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.snapshot().segments.len(), segment_count);
        assert_eq!(session.snapshot().selected_count(), 0);
        assert!(session.snapshot().manual_paths.is_empty());
    }

    #[test]
    fn settings_changes_are_not_undo_steps() {
        let mut session = loaded();
        session
            .commit_stroke(line(40.0, 40.0, 60.0, 60.0), StrokeTool::Add)
            .unwrap();
        assert_eq!(session.history().len(), 2);

        session.set_feather(5.0);
        session.set_invert_mask(true);
        assert_eq!(session.history().len(), 2, "settings must not push history");

        assert!(session.undo().unwrap());
        assert!(session.snapshot().manual_paths.is_empty());
        assert!((session.settings().feather - 5.0).abs() < f64::EPSILON);
        assert!(session.settings().invert_mask, "undo must not revert settings");
    }

    #[test]
    fn settings_are_clamped() {
        let mut session = Session::new();
        session.set_border_size(99.0);
        session.set_feather(-1.0);
        assert!((session.settings().border_size - 20.0).abs() < f64::EPSILON);
        assert!(session.settings().feather.abs() < f64::EPSILON);

        session.set_settings(MaskSettings {
            pen_size: 0.0,
            ..MaskSettings::default()
        });
        assert!((session.settings().pen_size - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn export_multiplies_alpha_by_mask() {
        let mut session = loaded();
        session.toggle_at(Point::new(20.0, 20.0)).unwrap();
        let out = session.export().unwrap();
        assert_eq!(out.get_pixel(20, 20).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(70, 70).0[3], 0);
        assert_eq!(out.get_pixel(70, 70).0[..3], [200, 50, 50]);
    }

    #[test]
    fn job_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SegmentationJob>();
        assert_send::<SegmentationOutcome>();
    }
}
