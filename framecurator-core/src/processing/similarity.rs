//! Frame similarity measures for near-duplicate detection.
//!
//! Both measures compare luma planes and return a value where 1.0 means
//! identical. The second plane is resized to the first when dimensions differ.

use crate::config::SimilarityMeasureChoice;
use crate::media::match_dimensions;

use image::GrayImage;

/// Stabilizing constants `(K1 * L)²` and `(K2 * L)²` for 8-bit luma.
const C1: f64 = (0.01 * 255.0) * (0.01 * 255.0);
const C2: f64 = (0.03 * 255.0) * (0.03 * 255.0);

/// A similarity measure over luma planes, selected once per run.
pub trait SimilarityMeasure: Send + Sync {
    fn name(&self) -> &'static str;
    fn similarity(&self, a: &GrayImage, b: &GrayImage) -> f64;
}

/// Resolves the configured choice to a concrete measure.
///
/// `Auto` prefers structural similarity when it is compiled in. Asking for
/// `Structural` without the feature is rejected by config validation; if it
/// slips through anyway the difference measure is used.
pub fn select_measure(choice: SimilarityMeasureChoice) -> Box<dyn SimilarityMeasure> {
    match choice {
        SimilarityMeasureChoice::Difference => Box::new(DifferenceSimilarity),
        SimilarityMeasureChoice::Auto | SimilarityMeasureChoice::Structural => structural_or_fallback(),
    }
}

#[cfg(feature = "structural-similarity")]
fn structural_or_fallback() -> Box<dyn SimilarityMeasure> {
    Box::new(StructuralSimilarity::default())
}

#[cfg(not(feature = "structural-similarity"))]
fn structural_or_fallback() -> Box<dyn SimilarityMeasure> {
    Box::new(DifferenceSimilarity)
}

// ============================================================================
// STRUCTURAL SIMILARITY
// ============================================================================

/// Mean SSIM over all `window x window` windows with a uniform filter and
/// sample covariance. Planes smaller than the window are compared as a
/// single window.
#[cfg(feature = "structural-similarity")]
#[derive(Debug, Clone, Copy)]
pub struct StructuralSimilarity {
    pub window: u32,
    pub k1: f64,
    pub k2: f64,
    pub dynamic_range: f64,
}

#[cfg(feature = "structural-similarity")]
impl Default for StructuralSimilarity {
    fn default() -> Self {
        Self {
            window: 7,
            k1: 0.01,
            k2: 0.03,
            dynamic_range: 255.0,
        }
    }
}

/// Summed-area tables for x, y, x², y² and xy.
#[cfg(feature = "structural-similarity")]
struct MomentTables {
    stride: usize,
    sums: [Vec<f64>; 5],
}

#[cfg(feature = "structural-similarity")]
impl MomentTables {
    fn build(a: &[u8], b: &[u8], width: usize, height: usize) -> Self {
        let stride = width + 1;
        let size = stride * (height + 1);
        let mut sums: [Vec<f64>; 5] = std::array::from_fn(|_| vec![0.0; size]);
        for y in 0..height {
            let mut row = [0.0f64; 5];
            for x in 0..width {
                let av = a[y * width + x] as f64;
                let bv = b[y * width + x] as f64;
                let values = [av, bv, av * av, bv * bv, av * bv];
                for (k, table) in sums.iter_mut().enumerate() {
                    row[k] += values[k];
                    table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row[k];
                }
            }
        }
        Self { stride, sums }
    }

    /// Sum of table `k` over the window with top-left (x, y) and size (w, h).
    fn window_sum(&self, k: usize, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let t = &self.sums[k];
        let s = self.stride;
        t[(y + h) * s + x + w] - t[y * s + x + w] - t[(y + h) * s + x] + t[y * s + x]
    }
}

#[cfg(feature = "structural-similarity")]
impl StructuralSimilarity {
    fn window_ssim(&self, tables: &MomentTables, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let n = (w * h) as f64;
        let c1 = (self.k1 * self.dynamic_range).powi(2);
        let c2 = (self.k2 * self.dynamic_range).powi(2);
        let cov_norm = if n > 1.0 { n / (n - 1.0) } else { 1.0 };

        let mu_a = tables.window_sum(0, x, y, w, h) / n;
        let mu_b = tables.window_sum(1, x, y, w, h) / n;
        let var_a = cov_norm * (tables.window_sum(2, x, y, w, h) / n - mu_a * mu_a);
        let var_b = cov_norm * (tables.window_sum(3, x, y, w, h) / n - mu_b * mu_b);
        let cov = cov_norm * (tables.window_sum(4, x, y, w, h) / n - mu_a * mu_b);

        let numerator = (2.0 * mu_a * mu_b + c1) * (2.0 * cov + c2);
        let denominator = (mu_a * mu_a + mu_b * mu_b + c1) * (var_a + var_b + c2);
        numerator / denominator
    }
}

#[cfg(feature = "structural-similarity")]
impl SimilarityMeasure for StructuralSimilarity {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn similarity(&self, a: &GrayImage, b: &GrayImage) -> f64 {
        let (width, height) = a.dimensions();
        if width == 0 || height == 0 {
            return 1.0;
        }
        let b = match_dimensions(b, width, height);
        let (w, h) = (width as usize, height as usize);
        let tables = MomentTables::build(a.as_raw(), b.as_raw(), w, h);

        let win = self.window as usize;
        if w < win || h < win {
            return self.window_ssim(&tables, 0, 0, w, h);
        }

        let mut total = 0.0;
        let mut count = 0usize;
        for y in 0..=h - win {
            for x in 0..=w - win {
                total += self.window_ssim(&tables, x, y, win, win);
                count += 1;
            }
        }
        total / count as f64
    }
}

// ============================================================================
// DIFFERENCE FALLBACK
// ============================================================================

/// Normalized luma difference over non-overlapping `BLOCK x BLOCK` tiles.
///
/// Each tile scores
///
/// ```text
/// (1 - dμ² / (μa² + μb² + C1)) * (1 - dr² / (σa² + σb² + C2))
/// ```
///
/// where `dμ` is the difference of the tile means and `dr²` the mean squared
/// difference once each tile's mean is removed. The two factors normalize the
/// same quantities SSIM does with the same constants, so scores sit on the
/// SSIM scale and the configured threshold needs no remapping. Tiles are
/// weighted by their pixel count.
#[derive(Debug, Clone, Copy, Default)]
pub struct DifferenceSimilarity;

impl DifferenceSimilarity {
    pub const BLOCK: usize = 8;

    fn tile_score(a: &[u8], b: &[u8], width: usize, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let n = (w * h) as f64;
        let mut sums = [0.0f64; 5];
        for row in y..y + h {
            for col in x..x + w {
                let av = a[row * width + col] as f64;
                let bv = b[row * width + col] as f64;
                sums[0] += av;
                sums[1] += bv;
                sums[2] += av * av;
                sums[3] += bv * bv;
                sums[4] += av * bv;
            }
        }
        let mu_a = sums[0] / n;
        let mu_b = sums[1] / n;
        let var_a = sums[2] / n - mu_a * mu_a;
        let var_b = sums[3] / n - mu_b * mu_b;
        let cov = sums[4] / n - mu_a * mu_b;

        let mean_diff = mu_a - mu_b;
        let residual = (var_a + var_b - 2.0 * cov).max(0.0);
        let luminance = 1.0 - mean_diff * mean_diff / (mu_a * mu_a + mu_b * mu_b + C1);
        let structure = 1.0 - residual / (var_a + var_b + C2);
        luminance * structure
    }
}

impl SimilarityMeasure for DifferenceSimilarity {
    fn name(&self) -> &'static str {
        "difference"
    }

    fn similarity(&self, a: &GrayImage, b: &GrayImage) -> f64 {
        let (width, height) = a.dimensions();
        if width == 0 || height == 0 {
            return 1.0;
        }
        let b = match_dimensions(b, width, height);
        let (w, h) = (width as usize, height as usize);

        let mut total = 0.0;
        for y in (0..h).step_by(Self::BLOCK) {
            let tile_h = Self::BLOCK.min(h - y);
            for x in (0..w).step_by(Self::BLOCK) {
                let tile_w = Self::BLOCK.min(w - x);
                let score = Self::tile_score(a.as_raw(), b.as_raw(), w, x, y, tile_w, tile_h);
                total += score * (tile_w * tile_h) as f64;
            }
        }
        total / (w * h) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]))
    }

    #[test]
    fn test_difference_extremes() {
        let black = GrayImage::new(10, 10);
        let white = GrayImage::from_pixel(10, 10, Luma([255]));
        assert_eq!(DifferenceSimilarity.similarity(&black, &black), 1.0);
        assert!(DifferenceSimilarity.similarity(&black, &white) < 0.001);
    }

    #[test]
    fn test_difference_handles_partial_tiles() {
        // 10x10 plane: one full tile plus partial edge tiles
        let a = gradient(10, 10);
        assert_eq!(DifferenceSimilarity.similarity(&a, &a), 1.0);
        let shifted = GrayImage::from_fn(10, 10, |x, y| Luma([a.get_pixel(x, y)[0] + 10]));
        let score = DifferenceSimilarity.similarity(&a, &shifted);
        assert!(score < 1.0 && score > 0.5, "{score}");
    }

    #[cfg(feature = "structural-similarity")]
    #[test]
    fn test_ssim_identity_and_inversion() {
        let ssim = StructuralSimilarity::default();
        let a = gradient(40, 30);
        assert!((ssim.similarity(&a, &a) - 1.0).abs() < 1e-9);

        let inverted = GrayImage::from_fn(40, 30, |x, y| Luma([255 - a.get_pixel(x, y)[0]]));
        assert!(ssim.similarity(&a, &inverted) < 0.1);
    }

    #[cfg(feature = "structural-similarity")]
    #[test]
    fn test_ssim_small_planes_use_single_window() {
        let ssim = StructuralSimilarity::default();
        let a = gradient(4, 3);
        assert!((ssim.similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_auto_selection_follows_feature() {
        let measure = select_measure(SimilarityMeasureChoice::Auto);
        if cfg!(feature = "structural-similarity") {
            assert_eq!(measure.name(), "structural");
        } else {
            assert_eq!(measure.name(), "difference");
        }
        assert_eq!(select_measure(SimilarityMeasureChoice::Difference).name(), "difference");
    }

    fn base_plane() -> GrayImage {
        GrayImage::from_fn(160, 120, |x, y| Luma([(100 + x / 2 + y / 2) as u8]))
    }

    /// Pairs of (label, candidate) against `base_plane`.
    fn decision_fixtures() -> Vec<(&'static str, GrayImage)> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let base = base_plane();
        let mut rng = StdRng::seed_from_u64(7);
        let noisy = GrayImage::from_fn(160, 120, |x, y| {
            let v = base.get_pixel(x, y)[0] as i32 + rng.random_range(-12..=12);
            Luma([v.clamp(0, 255) as u8])
        });
        let shifted = GrayImage::from_fn(160, 120, |x, y| Luma([base.get_pixel(x, y)[0] + 15]));
        let distinct = GrayImage::from_fn(160, 120, |x, y| Luma([(20 + (x * 13 + y * 29) % 200) as u8]));
        vec![("noisy", noisy), ("shifted", shifted), ("distinct", distinct)]
    }

    #[cfg(feature = "structural-similarity")]
    #[test]
    fn test_difference_and_structural_make_the_same_decisions() {
        let ssim = StructuralSimilarity::default();
        let base = base_plane();
        for threshold in [0.9, 0.95, 0.98] {
            for (label, candidate) in decision_fixtures() {
                let primary = ssim.similarity(&candidate, &base);
                let fallback = DifferenceSimilarity.similarity(&candidate, &base);
                assert_eq!(
                    primary >= threshold,
                    fallback >= threshold,
                    "{label} at {threshold}: structural {primary:.4}, difference {fallback:.4}"
                );
            }
        }
    }

    #[test]
    fn test_difference_rejects_shift_and_keeps_noise() {
        let base = base_plane();
        let scores: Vec<(&str, f64)> = decision_fixtures()
            .into_iter()
            .map(|(label, candidate)| (label, DifferenceSimilarity.similarity(&candidate, &base)))
            .collect();
        assert!(scores[0].1 < 0.95, "{scores:?}");
        assert!(scores[1].1 >= 0.95, "{scores:?}");
        assert!(scores[2].1 < 0.5, "{scores:?}");
    }
}
