//! Contour tracing: walk the outer boundary of a labeled component.
//!
//! This module defines the [`ContourTracer`] trait for pluggable boundary
//! tracing algorithms and the [`ContourTracerKind`] enum for selecting
//! which algorithm to use at runtime.
//!
//! Tracing operates on the working grid; coordinates are pixel indices.
//! Mapping back to image space happens in the segmenter.

use serde::{Deserialize, Serialize};

use crate::components::{Component, ComponentMap};
use crate::types::{Point, Polyline};

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourTracerKind {
    /// Moore-neighbor tracing: an 8-connected clockwise walk driven by a
    /// backtrack pointer.
    #[default]
    MooreNeighbor,
}

/// A traced boundary on the working grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Boundary pixels in walk order, starting at the component's first pixel.
    pub points: Polyline,
    /// `false` when the iteration budget ran out before the walk returned
    /// to its start; `points` then holds the partial boundary.
    pub closed: bool,
}

/// Trait for boundary tracing strategies.
pub trait ContourTracer {
    /// Trace the outer boundary of component `index` in `map`.
    ///
    /// The walk is bounded by `budget` steps.
    fn trace(&self, map: &ComponentMap, index: usize, budget: usize) -> Trace;
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, map: &ComponentMap, index: usize, budget: usize) -> Trace {
        match *self {
            Self::MooreNeighbor => trace_moore(map, index, budget),
        }
    }
}

/// Neighbor offsets in clockwise order (y grows downward), starting east.
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),   // E
    (1, 1),   // SE
    (0, 1),   // S
    (-1, 1),  // SW
    (-1, 0),  // W
    (-1, -1), // NW
    (0, -1),  // N
    (1, -1),  // NE
];

const WEST: usize = 4;

/// Direction index of a unit offset, if it is one of the 8 neighbors.
fn direction_of(dx: i64, dy: i64) -> Option<usize> {
    DIRECTIONS.iter().position(|&d| d == (dx, dy))
}

/// Moore-neighbor tracing from the component's first-discovered pixel.
///
/// The start pixel is the component's top-most, left-most pixel, so its
/// west neighbor is never a member (it is either off-grid or precedes the
/// start in row-major order). That west neighbor is the initial backtrack.
///
/// At each step the eight neighbors of the current pixel are scanned
/// clockwise beginning just after the backtrack. The first member found
/// becomes the next boundary pixel, and the neighbor examined immediately
/// before it becomes the new backtrack. The walk ends when it steps back
/// onto the start pixel, when the pixel has no member neighbors (a single
/// isolated pixel), or after `budget` steps.
fn trace_moore(map: &ComponentMap, index: usize, budget: usize) -> Trace {
    let Some((sx, sy)) = map.components().get(index).and_then(Component::start)
    else {
        return Trace {
            points: Polyline::default(),
            closed: true,
        };
    };
    let start = (i64::from(sx), i64::from(sy));

    let mut points = vec![to_point(start)];
    let mut current = start;
    let mut backtrack = WEST;

    for _ in 0..budget {
        let found = (1..8).find_map(|i| {
            let dir = (backtrack + i) % 8;
            let (dx, dy) = DIRECTIONS[dir];
            let candidate = (current.0 + dx, current.1 + dy);
            map.is_member(index, candidate.0, candidate.1)
                .then_some((candidate, dir))
        });

        let Some((next, dir)) = found else {
            // Isolated pixel: the boundary is the pixel itself.
            return Trace {
                points: Polyline::new(points),
                closed: true,
            };
        };

        // The previously examined neighbor, expressed relative to `next`.
        let (pdx, pdy) = DIRECTIONS[(dir + 7) % 8];
        let prev = (current.0 + pdx, current.1 + pdy);
        backtrack = direction_of(prev.0 - next.0, prev.1 - next.1).unwrap_or(WEST);

        if next == start {
            return Trace {
                points: Polyline::new(points),
                closed: true,
            };
        }
        points.push(to_point(next));
        current = next;
    }

    Trace {
        points: Polyline::new(points),
        closed: false,
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_point((x, y): (i64, i64)) -> Point {
    Point::new(x as f64, y as f64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cluster::LabelGrid;
    use crate::components::label_components;

    fn map(rows: &[&str]) -> ComponentMap {
        let h = rows.len();
        let w = rows.first().map_or(0, |r| r.len());
        let labels = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| usize::from(b - b'0')))
            .collect();
        label_components(
            &LabelGrid::from_labels(u32::try_from(w).unwrap(), u32::try_from(h).unwrap(), labels)
                .unwrap(),
        )
    }

    fn index_of_label(map: &ComponentMap, label: usize) -> usize {
        map.components().iter().position(|c| c.label == label).unwrap()
    }

    fn coords(trace: &Trace) -> Vec<(f64, f64)> {
        trace.points.points().iter().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn default_is_moore_neighbor() {
        assert_eq!(ContourTracerKind::default(), ContourTracerKind::MooreNeighbor);
    }

    #[test]
    fn single_pixel_traces_to_itself() {
        let m = map(&["000", "010", "000"]);
        let idx = index_of_label(&m, 1);
        let trace = ContourTracerKind::MooreNeighbor.trace(&m, idx, 9);
        assert!(trace.closed);
        assert_eq!(coords(&trace), vec![(1.0, 1.0)]);
    }

    #[test]
    fn square_is_walked_clockwise() {
        let m = map(&["0000", "0110", "0110", "0000"]);
        let idx = index_of_label(&m, 1);
        let trace = ContourTracerKind::MooreNeighbor.trace(&m, idx, 16);
        assert!(trace.closed);
        assert_eq!(
            coords(&trace),
            vec![(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0)]
        );
    }

    #[test]
    fn component_touching_grid_corner_traces_border() {
        // The whole 3x3 grid is one component: the start pixel's west
        // neighbor is off-grid.
        let m = map(&["000", "000", "000"]);
        let trace = ContourTracerKind::MooreNeighbor.trace(&m, 0, 9);
        assert!(trace.closed);
        assert_eq!(
            coords(&trace),
            vec![
                (0.0, 0.0),
                (1.0, 0.0),
                (2.0, 0.0),
                (2.0, 1.0),
                (2.0, 2.0),
                (1.0, 2.0),
                (0.0, 2.0),
                (0.0, 1.0),
            ]
        );
    }

    #[test]
    fn interior_hole_is_not_traced() {
        let m = map(&["11111", "10001", "10001", "11111"]);
        let idx = index_of_label(&m, 1);
        let trace = ContourTracerKind::MooreNeighbor.trace(&m, idx, 20);
        assert!(trace.closed);
        // Outer ring only: 5 + 3 + 4 + 2 = 14 boundary pixels.
        assert_eq!(trace.points.len(), 14);
    }

    #[test]
    fn diagonal_step_is_followed() {
        // An L-shaped staircase: 8-connected walk crosses the diagonal.
        let m = map(&["100", "110", "011"]);
        let idx = index_of_label(&m, 1);
        let trace = ContourTracerKind::MooreNeighbor.trace(&m, idx, 9);
        assert!(trace.closed);
        let pts = coords(&trace);
        assert_eq!(pts[0], (0.0, 0.0));
        assert!(pts.contains(&(2.0, 2.0)), "walk should reach the far corner");
    }

    #[test]
    fn exhausted_budget_returns_partial_open_trace() {
        let m = map(&["1111", "1111"]);
        let trace = ContourTracerKind::MooreNeighbor.trace(&m, 0, 2);
        assert!(!trace.closed);
        assert_eq!(trace.points.len(), 3);
    }

    #[test]
    fn unknown_component_yields_empty_trace() {
        let m = map(&["0"]);
        let trace = ContourTracerKind::MooreNeighbor.trace(&m, 5, 1);
        assert!(trace.points.is_empty());
    }
}
