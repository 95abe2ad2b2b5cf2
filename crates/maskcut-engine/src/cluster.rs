//! Color clustering of the working grid with k-means.
//!
//! Each pixel's RGB triple (alpha ignored) is assigned to one of `k`
//! centroids. Centroids start at randomly sampled pixels, so the random
//! source is a parameter: callers that need reproducible output pass a
//! seeded generator.
//!
//! The iteration count is fixed rather than convergence-driven, which
//! bounds the cost at `iterations * k * pixels` distance evaluations.

use image::RgbaImage;
use rand::Rng;

/// Per-pixel cluster labels over a `width x height` grid (row-major).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelGrid {
    width: u32,
    height: u32,
    labels: Vec<usize>,
}

impl LabelGrid {
    /// Build a grid from row-major labels.
    ///
    /// Returns `None` if `labels.len() != width * height`.
    #[must_use]
    pub fn from_labels(width: u32, height: u32, labels: Vec<usize>) -> Option<Self> {
        (labels.len() as u64 == u64::from(width) * u64::from(height)).then_some(Self {
            width,
            height,
            labels,
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Row-major labels.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Label at `(x, y)`. Callers must stay within the grid.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> usize {
        self.labels[y as usize * self.width as usize + x as usize]
    }

    /// Total number of grid cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Result of a k-means run.
#[derive(Debug, Clone)]
pub struct Clustering {
    /// Final assignment of each pixel.
    pub labels: LabelGrid,
    /// Final centroid colors.
    pub centroids: Vec<[f64; 3]>,
    /// Clusters that had no pixels in the last assignment.
    pub empty_clusters: usize,
}

/// Cluster the RGB values of `image` into `k` groups.
///
/// 1. Pick `k` initial centroids by sampling pixels uniformly at random
///    (with replacement).
/// 2. Repeat `iterations` times: assign every pixel to the centroid with
///    the smallest squared RGB distance (ties go to the lowest index),
///    then move each centroid to the mean of its pixels. A centroid with
///    no pixels keeps its previous value.
///
/// The returned labels are those of the last assignment step. An empty
/// image yields an empty grid and no centroids.
#[must_use]
pub fn kmeans<R: Rng + ?Sized>(
    image: &RgbaImage,
    k: usize,
    iterations: usize,
    rng: &mut R,
) -> Clustering {
    let (width, height) = image.dimensions();
    let pixels: Vec<[f64; 3]> = image
        .pixels()
        .map(|p| [f64::from(p[0]), f64::from(p[1]), f64::from(p[2])])
        .collect();

    if pixels.is_empty() || k == 0 {
        return Clustering {
            labels: LabelGrid {
                width,
                height,
                labels: vec![0; pixels.len()],
            },
            centroids: Vec::new(),
            empty_clusters: k,
        };
    }

    let mut centroids: Vec<[f64; 3]> = (0..k)
        .map(|_| pixels[rng.random_range(0..pixels.len())])
        .collect();
    let mut labels = vec![0usize; pixels.len()];
    let mut counts = vec![0usize; k];

    for _ in 0..iterations {
        for (label, px) in labels.iter_mut().zip(&pixels) {
            *label = nearest(&centroids, *px);
        }

        let mut sums = vec![[0.0f64; 3]; k];
        counts.fill(0);
        for (&label, px) in labels.iter().zip(&pixels) {
            counts[label] += 1;
            for c in 0..3 {
                sums[label][c] += px[c];
            }
        }
        for ((centroid, sum), &count) in centroids.iter_mut().zip(&sums).zip(&counts) {
            if count > 0 {
                #[allow(clippy::cast_precision_loss)]
                let n = count as f64;
                *centroid = [sum[0] / n, sum[1] / n, sum[2] / n];
            }
        }
    }

    Clustering {
        labels: LabelGrid {
            width,
            height,
            labels,
        },
        centroids,
        empty_clusters: counts.iter().filter(|&&c| c == 0).count(),
    }
}

/// Index of the centroid nearest to `px`; the first one wins ties.
fn nearest(centroids: &[[f64; 3]], px: [f64; 3]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = distance_squared(*c, px);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

fn distance_squared(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr.mul_add(dr, dg.mul_add(dg, db * db))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn two_tone(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            if x < w / 2 {
                image::Rgba([200, 50, 50, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        })
    }

    #[test]
    fn nearest_breaks_ties_toward_lowest_index() {
        let centroids = [[10.0, 10.0, 10.0], [10.0, 10.0, 10.0], [0.0, 0.0, 0.0]];
        assert_eq!(nearest(&centroids, [10.0, 10.0, 10.0]), 0);
        assert_eq!(nearest(&centroids, [1.0, 1.0, 1.0]), 2);
    }

    #[test]
    fn two_colors_are_separated() {
        let img = two_tone(20, 10);
        let mut rng = StdRng::seed_from_u64(7);
        let result = kmeans(&img, 8, 4, &mut rng);
        let left = result.labels.get(0, 0);
        let right = result.labels.get(19, 9);
        assert_ne!(left, right, "red and black should not share a cluster");
        for y in 0..10 {
            for x in 0..20 {
                let expected = if x < 10 { left } else { right };
                assert_eq!(result.labels.get(x, y), expected, "pixel ({x},{y})");
            }
        }
    }

    /// Always yields zero bits, so every uniform sample picks index 0.
    struct ZeroRng;

    impl rand::RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0);
        }
    }

    #[test]
    fn identical_initial_centroids_still_split_after_iterations() {
        // Every centroid starts on the same red pixel: the first pass lumps
        // everything into cluster 0, whose mean drifts toward the black
        // pixel; the second pass pulls the red majority into cluster 1.
        let img = RgbaImage::from_fn(10, 10, |x, y| {
            if x == 9 && y == 9 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([200, 50, 50, 255])
            }
        });
        let result = kmeans(&img, 8, 4, &mut ZeroRng);
        assert_eq!(result.labels.get(9, 9), 0);
        assert_eq!(result.labels.get(5, 5), 1);
    }

    #[test]
    fn alpha_is_ignored() {
        let img = RgbaImage::from_fn(4, 4, |x, _| {
            let alpha = if x < 2 { 0 } else { 255 };
            image::Rgba([90, 90, 90, alpha])
        });
        let mut rng = StdRng::seed_from_u64(1);
        let result = kmeans(&img, 3, 4, &mut rng);
        let first = result.labels.get(0, 0);
        assert!(result.labels.labels().iter().all(|&l| l == first));
    }

    #[test]
    fn empty_clusters_keep_their_centroid() {
        let img = RgbaImage::from_pixel(5, 5, image::Rgba([10, 20, 30, 255]));
        let mut rng = StdRng::seed_from_u64(3);
        let result = kmeans(&img, 4, 4, &mut rng);
        // All centroids start (and stay) on the only color present.
        for c in &result.centroids {
            assert!((c[0] - 10.0).abs() < 1e-9);
            assert!((c[1] - 20.0).abs() < 1e-9);
            assert!((c[2] - 30.0).abs() < 1e-9);
        }
        assert_eq!(result.empty_clusters, 3);
    }

    #[test]
    fn empty_image_produces_empty_grid() {
        let img = RgbaImage::new(0, 0);
        let mut rng = StdRng::seed_from_u64(0);
        let result = kmeans(&img, 8, 4, &mut rng);
        assert!(result.labels.is_empty());
        assert!(result.centroids.is_empty());
    }

    #[test]
    fn same_seed_same_labels() {
        let img = RgbaImage::from_fn(16, 16, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 16 + y) % 256) as u8;
            image::Rgba([v, 255 - v, v / 2, 255])
        });
        let a = kmeans(&img, 8, 4, &mut StdRng::seed_from_u64(42));
        let b = kmeans(&img, 8, 4, &mut StdRng::seed_from_u64(42));
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn label_grid_rejects_wrong_length() {
        assert!(LabelGrid::from_labels(2, 2, vec![0; 3]).is_none());
        assert!(LabelGrid::from_labels(2, 2, vec![0; 4]).is_some());
    }
}
