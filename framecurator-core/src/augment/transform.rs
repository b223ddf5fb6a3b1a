//! Transform specifications and their provenance encoding.
//!
//! A `TransformSpec` fully determines an augmented sample: every active
//! transform carries its parameter, and noise carries its own RNG seed.
//! Parameters are quantized to the precision of the provenance string when
//! drawn, so that `TransformSpec::from_provenance(&spec.provenance(n))`
//! reproduces `spec` exactly.
//!
//! Provenance format (active kinds only, canonical order):
//!
//! ```text
//! aug<N>_bright<+d>_contrast<.2f>_hflip_rot<.1f>_zoom<.2f>_noise<.1f>s<seed>
//! ```

use crate::config::AugmentationConfig;
use crate::error::{CoreError, CoreResult};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Parameters of the additive Gaussian noise transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    pub std_dev: f64,
    pub seed: u64,
}

/// The transforms applied to one sample, in canonical order:
/// brightness, contrast, horizontal flip, rotation, zoom, noise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    /// Additive delta on the HSV value channel
    pub brightness: Option<i32>,
    /// Factor around the image mean
    pub contrast: Option<f64>,
    pub horizontal_flip: bool,
    /// Degrees, positive counter-clockwise
    pub rotation: Option<f64>,
    /// > 1 crops in, < 1 pads out
    pub zoom: Option<f64>,
    pub noise: Option<NoiseParams>,
}

fn quantize(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn draw_in<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if min >= max { min } else { rng.random_range(min..=max) }
}

impl TransformSpec {
    /// The identity transform.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Draws a spec: one Bernoulli trial per kind against its probability,
    /// then a uniform parameter from its range when active.
    pub fn sample<R: Rng + ?Sized>(config: &AugmentationConfig, rng: &mut R) -> Self {
        let mut spec = Self::identity();

        if rng.random_bool(config.brightness.probability) {
            let lo = config.brightness.min().round() as i32;
            let hi = config.brightness.max().round() as i32;
            spec.brightness = Some(if lo >= hi { lo } else { rng.random_range(lo..=hi) });
        }
        if rng.random_bool(config.contrast.probability) {
            let factor = draw_in(rng, config.contrast.min(), config.contrast.max());
            spec.contrast = Some(quantize(factor, 2).max(0.01));
        }
        if rng.random_bool(config.flip_probability) {
            spec.horizontal_flip = true;
        }
        if rng.random_bool(config.rotation.probability) {
            let angle = draw_in(rng, config.rotation.min(), config.rotation.max());
            spec.rotation = Some(quantize(angle, 1));
        }
        if rng.random_bool(config.zoom.probability) {
            let factor = draw_in(rng, config.zoom.min(), config.zoom.max());
            spec.zoom = Some(quantize(factor, 2).max(0.01));
        }
        if rng.random_bool(config.noise_probability) {
            spec.noise = Some(NoiseParams {
                std_dev: quantize(config.noise_std, 1),
                seed: rng.random(),
            });
        }
        spec
    }

    /// Encodes the spec for sample number `sample_id`.
    pub fn provenance(&self, sample_id: usize) -> String {
        let mut out = format!("aug{sample_id}");
        if let Some(delta) = self.brightness {
            out.push_str(&format!("_bright{delta:+}"));
        }
        if let Some(factor) = self.contrast {
            out.push_str(&format!("_contrast{factor:.2}"));
        }
        if self.horizontal_flip {
            out.push_str("_hflip");
        }
        if let Some(angle) = self.rotation {
            out.push_str(&format!("_rot{angle:.1}"));
        }
        if let Some(factor) = self.zoom {
            out.push_str(&format!("_zoom{factor:.2}"));
        }
        if let Some(noise) = self.noise {
            out.push_str(&format!("_noise{:.1}s{}", noise.std_dev, noise.seed));
        }
        out
    }

    /// Parses a provenance string back into a spec, discarding the sample id.
    pub fn from_provenance(provenance: &str) -> CoreResult<Self> {
        parse_provenance(provenance).map(|(_, spec)| spec)
    }
}

/// Parses a provenance string into `(sample_id, spec)`.
///
/// Tokens must appear in canonical order and at most once.
pub fn parse_provenance(provenance: &str) -> CoreResult<(usize, TransformSpec)> {
    let err = |detail: &str| CoreError::Provenance(format!("'{provenance}': {detail}"));

    let mut tokens = provenance.split('_');
    let head = tokens.next().unwrap_or_default();
    let sample_id = head
        .strip_prefix("aug")
        .and_then(|id| id.parse::<usize>().ok())
        .ok_or_else(|| err("missing aug<N> prefix"))?;

    let mut spec = TransformSpec::identity();
    // Position of the last kind seen, in canonical order.
    let mut last_rank = 0;

    for token in tokens {
        let (rank, parsed) = if let Some(v) = token.strip_prefix("bright") {
            (1, v.parse::<i32>().map(|d| spec.brightness = Some(d)).is_ok())
        } else if let Some(v) = token.strip_prefix("contrast") {
            (2, v.parse::<f64>().map(|f| spec.contrast = Some(f)).is_ok())
        } else if token == "hflip" {
            spec.horizontal_flip = true;
            (3, true)
        } else if let Some(v) = token.strip_prefix("rot") {
            (4, v.parse::<f64>().map(|a| spec.rotation = Some(a)).is_ok())
        } else if let Some(v) = token.strip_prefix("zoom") {
            (5, v.parse::<f64>().map(|z| spec.zoom = Some(z)).is_ok())
        } else if let Some(v) = token.strip_prefix("noise") {
            let parsed = v.split_once('s').and_then(|(std_dev, seed)| {
                Some(NoiseParams {
                    std_dev: std_dev.parse().ok()?,
                    seed: seed.parse().ok()?,
                })
            });
            (6, parsed.map(|n| spec.noise = Some(n)).is_some())
        } else {
            return Err(err(&format!("unknown transform '{token}'")));
        };

        if !parsed {
            return Err(err(&format!("malformed parameter in '{token}'")));
        }
        if rank <= last_rank {
            return Err(err(&format!("'{token}' out of canonical order or repeated")));
        }
        last_rank = rank;
    }

    Ok((sample_id, spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_provenance_format() {
        let spec = TransformSpec {
            brightness: Some(12),
            contrast: Some(1.1),
            horizontal_flip: true,
            rotation: Some(-3.5),
            zoom: Some(0.95),
            noise: Some(NoiseParams { std_dev: 10.0, seed: 77 }),
        };
        assert_eq!(
            spec.provenance(2),
            "aug2_bright+12_contrast1.10_hflip_rot-3.5_zoom0.95_noise10.0s77"
        );
        assert_eq!(TransformSpec::identity().provenance(1), "aug1");
        assert_eq!(
            TransformSpec { brightness: Some(-4), ..Default::default() }.provenance(3),
            "aug3_bright-4"
        );
    }

    #[test]
    fn test_sampled_specs_round_trip_through_provenance() {
        let mut config = AugmentationConfig::default();
        config.brightness.probability = 0.5;
        config.contrast.probability = 0.5;
        config.rotation.probability = 0.5;
        config.zoom.probability = 0.5;
        config.noise_probability = 0.5;

        let mut rng = StdRng::seed_from_u64(9);
        for id in 1..200 {
            let spec = TransformSpec::sample(&config, &mut rng);
            let (parsed_id, parsed) = parse_provenance(&spec.provenance(id)).unwrap();
            assert_eq!(parsed_id, id);
            assert_eq!(parsed, spec, "{}", spec.provenance(id));
        }
    }

    #[test]
    fn test_parse_rejects_out_of_order_tokens() {
        assert!(parse_provenance("aug1_hflip_bright+3").is_err());
        assert!(parse_provenance("aug1_hflip_hflip").is_err());
        assert!(parse_provenance("aug1_blur2").is_err());
        assert!(parse_provenance("variant1").is_err());
        assert!(parse_provenance("aug1_noise10.0").is_err());
    }

    #[test]
    fn test_sampling_respects_zero_and_one_probabilities() {
        let mut config = AugmentationConfig::default();
        config.brightness.probability = 1.0;
        config.contrast.probability = 0.0;
        config.flip_probability = 1.0;
        config.rotation.probability = 0.0;
        config.zoom.probability = 0.0;
        config.noise_probability = 0.0;

        let mut rng = StdRng::seed_from_u64(1);
        let spec = TransformSpec::sample(&config, &mut rng);
        let delta = spec.brightness.unwrap();
        assert!((-30..=30).contains(&delta));
        assert!(spec.horizontal_flip);
        assert_eq!(spec.contrast, None);
        assert_eq!(spec.noise, None);
    }
}
