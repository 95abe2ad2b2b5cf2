//! Connected-component labeling of the cluster grid.
//!
//! A component is a maximal set of same-label pixels joined through
//! their 4-neighbors (left, right, up, down; diagonals do not connect).
//! Components are discovered by scanning the grid in row-major order and
//! flooding each unvisited pixel breadth-first, so a component's first
//! pixel is its top-most, then left-most, pixel.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::cluster::LabelGrid;

/// Inclusive pixel-space bounding box on the working grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelBounds {
    const fn at(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    const fn include(&mut self, x: u32, y: u32) {
        if x < self.min_x {
            self.min_x = x;
        }
        if x > self.max_x {
            self.max_x = x;
        }
        if y < self.min_y {
            self.min_y = y;
        }
        if y > self.max_y {
            self.max_y = y;
        }
    }
}

/// One 4-connected region of same-cluster pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Cluster label shared by every member.
    pub label: usize,
    /// Member pixels `(x, y)` in breadth-first discovery order.
    pub pixels: Vec<(u32, u32)>,
    pub bounds: PixelBounds,
}

impl Component {
    /// Number of member pixels.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.pixels.len()
    }

    /// First-discovered pixel (top-most, then left-most).
    #[must_use]
    pub fn start(&self) -> Option<(u32, u32)> {
        self.pixels.first().copied()
    }
}

/// Components over a grid, plus a per-pixel component index.
#[derive(Debug, Clone)]
pub struct ComponentMap {
    width: u32,
    height: u32,
    /// Row-major component index of every pixel.
    owner: Vec<usize>,
    components: Vec<Component>,
}

impl ComponentMap {
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// All components in discovery order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Whether `(x, y)` lies on the grid and belongs to component `index`.
    #[must_use]
    pub fn is_member(&self, index: usize, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return false;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let i = y as usize * self.width as usize + x as usize;
        self.owner[i] == index
    }

    /// Total pixel count of the grid.
    #[must_use]
    pub const fn grid_len(&self) -> usize {
        self.owner.len()
    }
}

/// Label every 4-connected same-label region of `grid`.
#[must_use]
pub fn label_components(grid: &LabelGrid) -> ComponentMap {
    let (width, height) = (grid.width(), grid.height());
    let w = width as usize;
    let labels = grid.labels();
    let mut owner = vec![usize::MAX; labels.len()];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for seed in 0..labels.len() {
        if owner[seed] != usize::MAX {
            continue;
        }
        let index = components.len();
        let label = labels[seed];
        let (sx, sy) = xy(seed, w);
        let mut pixels = Vec::new();
        let mut bounds = PixelBounds::at(sx, sy);

        owner[seed] = index;
        queue.push_back(seed);
        while let Some(i) = queue.pop_front() {
            let (x, y) = xy(i, w);
            pixels.push((x, y));
            bounds.include(x, y);

            let mut visit = |n: usize| {
                if owner[n] == usize::MAX && labels[n] == label {
                    owner[n] = index;
                    queue.push_back(n);
                }
            };
            if x > 0 {
                visit(i - 1);
            }
            if x + 1 < width {
                visit(i + 1);
            }
            if y > 0 {
                visit(i - w);
            }
            if y + 1 < height {
                visit(i + w);
            }
        }

        components.push(Component {
            label,
            pixels,
            bounds,
        });
    }

    ComponentMap {
        width,
        height,
        owner,
        components,
    }
}

/// Indices of components holding at least `min_fraction` of the grid.
///
/// Components strictly smaller than `min_fraction * grid_len` are noise.
#[must_use]
pub fn significant(map: &ComponentMap, min_fraction: f64) -> Vec<usize> {
    #[allow(clippy::cast_precision_loss)]
    let threshold = map.grid_len() as f64 * min_fraction;
    map.components
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            #[allow(clippy::cast_precision_loss)]
            let size = c.size() as f64;
            size >= threshold
        })
        .map(|(i, _)| i)
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
const fn xy(i: usize, w: usize) -> (u32, u32) {
    ((i % w) as u32, (i / w) as u32)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Build a label grid from rows of digits.
    fn grid(rows: &[&str]) -> LabelGrid {
        let h = rows.len();
        let w = rows.first().map_or(0, |r| r.len());
        let labels = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| usize::from(b - b'0')))
            .collect();
        LabelGrid::from_labels(u32::try_from(w).unwrap(), u32::try_from(h).unwrap(), labels)
            .unwrap()
    }

    #[test]
    fn uniform_grid_is_one_component() {
        let map = label_components(&grid(&["000", "000"]));
        assert_eq!(map.components().len(), 1);
        assert_eq!(map.components()[0].size(), 6);
        assert_eq!(
            map.components()[0].bounds,
            PixelBounds {
                min_x: 0,
                min_y: 0,
                max_x: 2,
                max_y: 1,
            }
        );
    }

    #[test]
    fn diagonal_pixels_are_not_connected() {
        let map = label_components(&grid(&["10", "01"]));
        // Two separate "1" pixels and two separate "0" pixels.
        assert_eq!(map.components().len(), 4);
        assert!(map.components().iter().all(|c| c.size() == 1));
    }

    #[test]
    fn same_label_in_separate_places_gives_separate_components() {
        let map = label_components(&grid(&["1001", "1001", "0000"]));
        let ones: Vec<&Component> = map.components().iter().filter(|c| c.label == 1).collect();
        assert_eq!(ones.len(), 2);
    }

    #[test]
    fn start_pixel_is_first_in_row_major_order() {
        let map = label_components(&grid(&["0000", "0011", "0111"]));
        let ones = map.components().iter().find(|c| c.label == 1).unwrap();
        assert_eq!(ones.start(), Some((2, 1)));
        assert_eq!(ones.size(), 5);
    }

    #[test]
    fn membership_checks_bounds() {
        let map = label_components(&grid(&["01", "11"]));
        let idx = map.components().iter().position(|c| c.label == 1).unwrap();
        assert!(map.is_member(idx, 1, 0));
        assert!(!map.is_member(idx, 0, 0));
        assert!(!map.is_member(idx, -1, 0));
        assert!(!map.is_member(idx, 2, 1));
    }

    #[test]
    fn noise_filter_drops_small_components() {
        // 10x10 grid: one stray pixel (1% of the grid) in a sea of zeros.
        let mut rows = vec!["0000000000"; 10];
        rows[4] = "0000100000";
        let map = label_components(&grid(&rows));
        assert_eq!(map.components().len(), 2);

        let kept = significant(&map, 0.005);
        assert_eq!(kept.len(), 2, "1% is above the 0.5% threshold");

        let kept = significant(&map, 0.02);
        assert_eq!(kept.len(), 1, "1% is below the 2% threshold");
        assert_eq!(map.components()[kept[0]].label, 0);
    }

    #[test]
    fn empty_grid_has_no_components() {
        let map = label_components(&LabelGrid::from_labels(0, 0, vec![]).unwrap());
        assert!(map.components().is_empty());
        assert!(significant(&map, 0.005).is_empty());
    }
}
