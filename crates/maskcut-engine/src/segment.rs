//! Region segmenter: proposes candidate regions from a raster image.
//!
//! Pipeline:
//! downsample -> k-means -> connected components -> noise filter ->
//! boundary trace -> upscale -> simplify.
//!
//! The only source of nondeterminism is k-means initialization, so the
//! random generator is owned by the [`Segmenter`] and can be seeded or
//! injected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use web_time::Instant;

use crate::cluster::{self, LabelGrid};
use crate::components::{self, ComponentMap};
use crate::contour::ContourTracer;
use crate::diagnostics::{
    self, SegmentationDiagnostics, SegmentationSummary, StageDiagnostics, StageMetrics,
};
use crate::downsample;
use crate::simplify;
use crate::types::{
    Dimensions, Point, Polyline, Rgb, RgbaImage, Segment, SegmentError, SegmentId,
    SegmenterConfig,
};

/// Overlay tints assigned to segments in creation order (cycling).
pub const SEGMENT_COLORS: [Rgb; 8] = [
    [230, 57, 70],   // red
    [244, 162, 97],  // orange
    [233, 196, 106], // yellow
    [42, 157, 143],  // teal
    [69, 123, 157],  // blue
    [131, 56, 236],  // violet
    [255, 0, 110],   // magenta
    [138, 201, 38],  // green
];

/// Every intermediate of one segmentation run.
///
/// Intended for visualization and parameter tuning; callers that only
/// need the segments should use [`Segmenter::segment`].
#[derive(Debug, Clone)]
pub struct StagedSegmentation {
    /// Source image dimensions in pixels.
    pub dimensions: Dimensions,
    /// Stage 1: working-resolution image.
    pub downsampled: RgbaImage,
    /// `working / source` scale factor.
    pub scale: f64,
    /// Stage 2: per-pixel cluster labels of the working image.
    pub labels: LabelGrid,
    /// Stage 2: final cluster colors.
    pub centroids: Vec<[f64; 3]>,
    /// Stage 3: all 4-connected components.
    pub components: ComponentMap,
    /// Stage 4: indices into `components` that survived the noise filter.
    pub kept: Vec<usize>,
    /// Stages 5-6: traced boundaries in image coordinates, one per kept
    /// component.
    pub traced: Vec<Polyline>,
    /// Stage 7-8: the emitted segments.
    pub segments: Vec<Segment>,
}

/// Color-clustering region segmenter.
#[derive(Debug, Clone)]
pub struct Segmenter<R = StdRng> {
    config: SegmenterConfig,
    rng: R,
}

impl Segmenter<StdRng> {
    /// Segmenter seeded from the operating system's entropy source.
    #[must_use]
    pub fn new(config: SegmenterConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Segmenter whose output is fully determined by `seed`.
    #[must_use]
    pub fn seeded(config: SegmenterConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Segmenter<R> {
    /// Segmenter drawing k-means initialization from `rng`.
    #[must_use]
    pub const fn with_rng(config: SegmenterConfig, rng: R) -> Self {
        Self { config, rng }
    }

    #[must_use]
    pub const fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Segment a raw RGBA8 buffer of `width x height` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::EmptyImage`] if either dimension is zero,
    /// [`SegmentError::BufferSize`] if `pixels` is not exactly
    /// `width * height * 4` bytes, and [`SegmentError::InvalidConfig`]
    /// if the configuration fails validation.
    pub fn segment(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Segment>, SegmentError> {
        if width == 0 || height == 0 {
            return Err(SegmentError::EmptyImage);
        }
        let expected = usize::try_from(u64::from(width) * u64::from(height) * 4)
            .unwrap_or(usize::MAX);
        if pixels.len() != expected {
            return Err(SegmentError::BufferSize {
                expected,
                actual: pixels.len(),
            });
        }
        let image = RgbaImage::from_raw(width, height, pixels.to_vec()).ok_or(
            SegmentError::BufferSize {
                expected,
                actual: pixels.len(),
            },
        )?;
        self.segment_image(&image)
    }

    /// Segment a decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::EmptyImage`] for a zero-sized image and
    /// [`SegmentError::InvalidConfig`] for an invalid configuration.
    pub fn segment_image(&mut self, image: &RgbaImage) -> Result<Vec<Segment>, SegmentError> {
        self.segment_staged(image).map(|(staged, _)| staged.segments)
    }

    /// Segment a decoded image, keeping every intermediate and timing
    /// each stage.
    ///
    /// # Errors
    ///
    /// Same as [`segment_image`](Self::segment_image).
    pub fn segment_staged(
        &mut self,
        image: &RgbaImage,
    ) -> Result<(StagedSegmentation, SegmentationDiagnostics), SegmentError> {
        self.config.validate()?;
        let dimensions = Dimensions::of(image);
        if dimensions.width == 0 || dimensions.height == 0 {
            return Err(SegmentError::EmptyImage);
        }
        let config = &self.config;
        let total_start = Instant::now();

        // 1. Downsample.
        let start = Instant::now();
        let working = downsample::downsample(image, config.working_resolution);
        let downsample_diag = StageDiagnostics {
            duration: start.elapsed(),
            metrics: StageMetrics::Downsample {
                width: working.image.width(),
                height: working.image.height(),
                scale: working.scale,
            },
        };
        tracing::debug!(
            width = working.image.width(),
            height = working.image.height(),
            scale = working.scale,
            "downsampled to working grid"
        );

        // 2. Cluster.
        let start = Instant::now();
        let clustering = cluster::kmeans(
            &working.image,
            config.cluster_count,
            config.iterations,
            &mut self.rng,
        );
        let cluster_diag = StageDiagnostics {
            duration: start.elapsed(),
            metrics: StageMetrics::Cluster {
                k: config.cluster_count,
                iterations: config.iterations,
                empty_clusters: clustering.empty_clusters,
            },
        };
        tracing::debug!(
            k = config.cluster_count,
            empty = clustering.empty_clusters,
            "clustered colors"
        );

        // 3-4. Components and noise filter.
        let start = Instant::now();
        let map = components::label_components(&clustering.labels);
        let kept = components::significant(&map, config.min_component_fraction);
        #[allow(clippy::cast_precision_loss)]
        let min_pixels = map.grid_len() as f64 * config.min_component_fraction;
        let components_diag = StageDiagnostics {
            duration: start.elapsed(),
            metrics: StageMetrics::Components {
                found: map.components().len(),
                kept: kept.len(),
                min_pixels,
            },
        };
        tracing::debug!(
            found = map.components().len(),
            kept = kept.len(),
            "labeled connected components"
        );

        // 5-6. Trace and upscale.
        let start = Instant::now();
        let budget = map.grid_len();
        let mut unclosed = 0;
        let traced: Vec<Polyline> = kept
            .iter()
            .map(|&index| {
                let trace = config.contour_tracer.trace(&map, index, budget);
                if !trace.closed {
                    unclosed += 1;
                }
                upscale(&trace.points, working.scale)
            })
            .collect();
        if unclosed > 0 {
            tracing::debug!(unclosed, "boundary traces hit the step budget");
        }
        let trace_diag = StageDiagnostics {
            duration: start.elapsed(),
            metrics: StageMetrics::Trace {
                boundary_count: traced.len(),
                unclosed_count: unclosed,
                total_point_count: diagnostics::total_points(&traced),
            },
        };

        // 7. Simplify.
        let start = Instant::now();
        let simplified = simplify::simplify_paths(&traced, config.simplify_tolerance);
        let points_before = diagnostics::total_points(&traced);
        let points_after = diagnostics::total_points(&simplified);
        #[allow(clippy::cast_precision_loss)]
        let reduction_ratio = if points_before > 0 {
            1.0 - (points_after as f64 / points_before as f64)
        } else {
            0.0
        };
        let simplify_diag = StageDiagnostics {
            duration: start.elapsed(),
            metrics: StageMetrics::Simplify {
                tolerance: config.simplify_tolerance,
                points_before,
                points_after,
                reduction_ratio,
            },
        };

        // 8. Emit.
        let segments: Vec<Segment> = simplified
            .into_iter()
            .enumerate()
            .map(|(i, boundary)| Segment {
                id: SegmentId(i),
                boundary,
                color: SEGMENT_COLORS[i % SEGMENT_COLORS.len()],
                selected: false,
                label: Some(format!("Region {}", i + 1)),
            })
            .collect();

        tracing::debug!(segments = segments.len(), "segmentation complete");

        let diagnostics = SegmentationDiagnostics {
            downsample: downsample_diag,
            cluster: cluster_diag,
            components: components_diag,
            trace: trace_diag,
            simplify: simplify_diag,
            total_duration: total_start.elapsed(),
            summary: SegmentationSummary {
                image_width: dimensions.width,
                image_height: dimensions.height,
                pixel_count: dimensions.pixel_count(),
                segment_count: segments.len(),
            },
        };

        let staged = StagedSegmentation {
            dimensions,
            downsampled: working.image,
            scale: working.scale,
            labels: clustering.labels,
            centroids: clustering.centroids,
            components: map,
            kept,
            traced,
            segments,
        };
        Ok((staged, diagnostics))
    }
}

/// Map working-grid coordinates back to image space.
fn upscale(polyline: &Polyline, scale: f64) -> Polyline {
    polyline
        .points()
        .iter()
        .map(|p| Point::new(p.x / scale, p.y / scale))
        .collect::<Vec<_>>()
        .into()
}
