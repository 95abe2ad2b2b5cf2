//! Boundary simplification by minimum point spacing.
//!
//! Traced boundaries visit every edge pixel, which is far denser than
//! needed for filling a region. This filter walks the point sequence and
//! drops points that sit within `tolerance` of the last kept point, then
//! closes the loop explicitly.
//!
//! This is the last geometric step of segmentation, applied after the
//! traced boundary has been upscaled to image coordinates.

use crate::types::{Point, Polyline};

/// Thin a boundary so consecutive kept points are more than `tolerance`
/// apart, then close it.
///
/// The first point is always kept. If more than two points survive and
/// the result does not already end on its first point, the first point
/// is appended. Results of two points or fewer are returned as-is (a
/// degenerate boundary the compositor will ignore).
#[must_use = "returns the simplified polyline"]
pub fn simplify(polyline: &Polyline, tolerance: f64) -> Polyline {
    let Some(&first) = polyline.first() else {
        return Polyline::default();
    };

    let mut kept: Vec<Point> = vec![first];
    let mut last = first;
    for &p in &polyline.points()[1..] {
        if p.distance(last) > tolerance {
            kept.push(p);
            last = p;
        }
    }

    if kept.len() > 2 && kept.last() != Some(&first) {
        kept.push(first);
    }

    Polyline::new(kept)
}

/// Simplify multiple boundaries independently.
#[must_use = "returns the simplified polylines"]
pub fn simplify_paths(polylines: &[Polyline], tolerance: f64) -> Vec<Polyline> {
    polylines.iter().map(|pl| simplify(pl, tolerance)).collect()
}
