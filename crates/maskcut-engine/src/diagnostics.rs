//! Segmentation diagnostics: timing, counts, and other metrics for each stage.
//!
//! These diagnostics are permanent instrumentation intended for tuning
//! the segmenter's parameters. Every call to
//! [`Segmenter::segment_staged`](crate::Segmenter::segment_staged)
//! collects diagnostics alongside the intermediate results.
//!
//! Duration measurements use [`std::time::Duration`] (platform-agnostic).
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single segmentation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationDiagnostics {
    /// Stage 1: nearest-neighbor downsampling.
    pub downsample: StageDiagnostics,
    /// Stage 2: k-means color clustering.
    pub cluster: StageDiagnostics,
    /// Stages 3-4: connected components and noise filtering.
    pub components: StageDiagnostics,
    /// Stages 5-6: boundary tracing and upscaling.
    pub trace: StageDiagnostics,
    /// Stage 7: boundary simplification.
    pub simplify: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    pub summary: SegmentationSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    Downsample {
        /// Working-grid width in pixels.
        width: u32,
        /// Working-grid height in pixels.
        height: u32,
        /// `working / source` scale factor.
        scale: f64,
    },
    Cluster {
        /// Requested cluster count.
        k: usize,
        iterations: usize,
        /// Clusters with no pixels after the final assignment.
        empty_clusters: usize,
    },
    Components {
        /// Components found before noise filtering.
        found: usize,
        /// Components surviving the noise filter.
        kept: usize,
        /// Minimum member count a component needed to survive.
        min_pixels: f64,
    },
    Trace {
        /// Boundaries traced.
        boundary_count: usize,
        /// Boundaries cut short by the iteration budget.
        unclosed_count: usize,
        total_point_count: usize,
    },
    Simplify {
        /// Minimum spacing in image pixels.
        tolerance: f64,
        points_before: usize,
        points_after: usize,
        /// Reduction ratio: `1.0 - (after / before)`.
        reduction_ratio: f64,
    },
}

/// High-level summary counts for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationSummary {
    pub image_width: u32,
    pub image_height: u32,
    pub pixel_count: u64,
    /// Segments emitted.
    pub segment_count: usize,
}

impl SegmentationDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "Segmentation Diagnostics Report\n{}",
            "=".repeat(60)
        ));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages: [(&str, &StageDiagnostics); 5] = [
            ("Downsample", &self.downsample),
            ("Cluster", &self.cluster),
            ("Components", &self.components),
            ("Trace", &self.trace),
            ("Simplify", &self.simplify),
        ];

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!("Segments: {}", self.summary.segment_count));

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Downsample {
            width,
            height,
            scale,
        } => format!("{width}x{height} (scale={scale:.3})"),
        StageMetrics::Cluster {
            k,
            iterations,
            empty_clusters,
        } => format!("k={k} iters={iterations} empty={empty_clusters}"),
        StageMetrics::Components {
            found,
            kept,
            min_pixels,
        } => format!("{found} found, {kept} kept (min {min_pixels:.1} px)"),
        StageMetrics::Trace {
            boundary_count,
            unclosed_count,
            total_point_count,
        } => format!(
            "{boundary_count} boundaries, {total_point_count} pts ({unclosed_count} unclosed)"
        ),
        StageMetrics::Simplify {
            tolerance,
            points_before,
            points_after,
            reduction_ratio,
        } => format!(
            "tol={tolerance:.2} {points_before}->{points_after} pts ({:.1}% reduction)",
            reduction_ratio * 100.0,
        ),
    }
}

/// Total points across a slice of polylines.
pub(crate) fn total_points(polylines: &[crate::Polyline]) -> usize {
    polylines.iter().map(crate::Polyline::len).sum()
}
