//! Polygon hit-testing.
//!
//! Region boundaries are stored as closed polylines. The smart-select
//! tool needs to know which region lies under the pointer, which is a
//! plain point-in-polygon query.

use crate::types::{Point, Polyline};

/// Whether `point` lies inside the closed polygon described by `boundary`.
///
/// Uses the even-odd ray casting rule. The polygon is implicitly closed,
/// so an explicit duplicate of the first point at the end is harmless.
/// Boundaries with fewer than three points enclose nothing.
#[must_use]
pub fn contains(boundary: &Polyline, point: Point) -> bool {
    let pts = boundary.points();
    if pts.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = pts.len() - 1;
    for i in 0..pts.len() {
        let a = pts[i];
        let b = pts[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
