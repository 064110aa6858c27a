//! Multi-octave coherent noise height fields
//!
//! Each octave samples 2D Perlin noise at a frequency that grows by
//! `lacunarity` and an amplitude that decays by `persistence`. Per-octave
//! sampling offsets are drawn from a ChaCha generator seeded with `seed`, so
//! the same parameters always reproduce the same field.

use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::{Vec2, deserialize_count_u32};
use crate::math::Grid;

/// Grid of height samples
pub type HeightField = Grid<f32>;

/// Smallest usable noise scale
pub const MIN_SCALE: f32 = 1e-4;

/// Range of the random per-octave sampling offsets
const OCTAVE_OFFSET_RANGE: f64 = 100_000.0;

/// Multiple of the Perlin lattice period (256). Sample coordinates at or
/// beyond this magnitude are reduced modulo it, which leaves the noise value
/// unchanged and keeps lattice coordinates inside `isize`.
const SAMPLE_PERIOD: f64 = 256.0 * 1_048_576.0;

/// Fraction of the theoretical amplitude sum that samples realistically
/// reach. Global normalization maps `±estimate` onto `[0, 1]`.
const GLOBAL_AMPLITUDE_ESTIMATE: f32 = 0.9;

/// How accumulated noise is rescaled into `[0, 1]`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeMode {
    /// Rescale by the tile's own observed min/max. Not seam-consistent.
    #[default]
    Local,
    /// Rescale by the estimated amplitude bound shared by every tile.
    Global,
}

/// Parameters controlling noise field generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    pub seed: u32,
    pub scale: f32,       // Sampling scale (larger = smoother)
    #[serde(deserialize_with = "deserialize_count_u32")]
    pub octaves: u32,     // Number of summed noise layers
    pub persistence: f32, // Amplitude decay per octave
    pub lacunarity: f32,  // Frequency growth per octave
    pub offset: Vec2,     // Translation of the sampling window
    pub normalize_mode: NormalizeMode,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 25.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
            normalize_mode: NormalizeMode::Local,
        }
    }
}

impl NoiseParams {
    /// Clamp out-of-range values to the nearest valid ones
    pub fn clamped(mut self) -> Self {
        if self.scale.is_nan() || self.scale < MIN_SCALE {
            self.scale = MIN_SCALE;
        }
        if self.lacunarity.is_nan() || self.lacunarity < 1.0 {
            self.lacunarity = 1.0;
        }
        self.lacunarity = self.lacunarity.min(f32::MAX);
        self.persistence = if self.persistence.is_finite() {
            self.persistence.clamp(0.0, 1.0)
        } else {
            0.5
        };
        if !self.offset.is_finite() {
            self.offset = Vec2::ZERO;
        }
        self
    }

    /// Sum of octave amplitudes, `persistence^i` for `i in 0..octaves`
    pub fn max_amplitude(&self) -> f32 {
        let mut amplitude = 1.0;
        let mut total = 0.0;
        for _ in 0..self.octaves {
            total += amplitude;
            amplitude *= self.persistence;
        }
        total
    }

    /// Bound used by global normalization before mapping into `[0, 1]`
    pub fn global_estimate(&self) -> f32 {
        self.max_amplitude() * GLOBAL_AMPLITUDE_ESTIMATE
    }
}

/// Per-octave random sampling offsets derived from `seed`
fn octave_offsets(seed: u32, octaves: u32) -> Vec<[f64; 2]> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed as u64);
    (0..octaves)
        .map(|_| {
            [
                rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE),
                rng.gen_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE),
            ]
        })
        .collect()
}

/// Reduce a sample coordinate into `(-SAMPLE_PERIOD, SAMPLE_PERIOD)`.
/// `%` on floats is exact, so the reduced point hits the same lattice cell.
fn wrap_sample(v: f64) -> f64 {
    if v.abs() >= SAMPLE_PERIOD { v % SAMPLE_PERIOD } else { v }
}

/// Generate a `width` x `height` height field with values in `[0, 1]`.
///
/// Parameters are clamped first, and zero dimensions are raised to one.
/// Rows run toward -Z in world space, so `offset.y` is subtracted when
/// sampling; this keeps borders continuous between tiles whose offsets
/// differ by their world placement.
pub fn generate(width: usize, height: usize, params: &NoiseParams) -> HeightField {
    let width = width.max(1);
    let height = height.max(1);
    let params = params.clone().clamped();

    let perlin = Perlin::new(params.seed);
    let offsets = octave_offsets(params.seed, params.octaves);

    let center_x = (width - 1) as f64 * 0.5;
    let center_y = (height - 1) as f64 * 0.5;
    let scale = params.scale as f64;
    let offset_x = params.offset.x as f64;
    let offset_y = params.offset.y as f64;

    let mut min_value = f32::MAX;
    let mut max_value = f32::MIN;

    let mut field = HeightField::from_fn(width, height, |x, y| {
        let mut amplitude = 1.0f64;
        let mut frequency = 1.0f64;
        let mut value = 0.0f64;

        for offset in &offsets {
            let sample_x = (x as f64 - center_x + offset_x) / scale * frequency + offset[0];
            let sample_y = (y as f64 - center_y - offset_y) / scale * frequency + offset[1];
            // Frequency overflowed; later octaves carry no usable signal
            if !(sample_x.is_finite() && sample_y.is_finite()) {
                break;
            }
            value += perlin.get([wrap_sample(sample_x), wrap_sample(sample_y)]) * amplitude;

            amplitude *= params.persistence as f64;
            frequency *= params.lacunarity as f64;
        }

        let value = value as f32;
        min_value = min_value.min(value);
        max_value = max_value.max(value);
        value
    });

    match params.normalize_mode {
        NormalizeMode::Local => {
            let range = max_value - min_value;
            for v in field.as_mut_slice() {
                *v = if range > 0.0 { (*v - min_value) / range } else { 0.0 };
            }
        }
        NormalizeMode::Global => {
            let estimate = params.global_estimate();
            for v in field.as_mut_slice() {
                *v = if estimate > 0.0 {
                    ((*v + estimate) / (2.0 * estimate)).clamp(0.0, 1.0)
                } else {
                    0.0
                };
            }
        }
    }

    field
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_params() -> NoiseParams {
        NoiseParams {
            seed: 0,
            scale: 25.0,
            octaves: 1,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
            normalize_mode: NormalizeMode::Local,
        }
    }

    #[test]
    fn test_noise_params_default() {
        let params = NoiseParams::default();
        assert_eq!(params.seed, 0);
        assert_eq!(params.scale, 25.0);
        assert_eq!(params.octaves, 4);
        assert_eq!(params.persistence, 0.5);
        assert_eq!(params.lacunarity, 2.0);
        assert_eq!(params.normalize_mode, NormalizeMode::Local);
    }

    #[test]
    fn test_scenario_241_is_deterministic() {
        let params = scenario_params();
        let a = generate(241, 241, &params);
        let b = generate(241, 241, &params);

        assert_eq!(a.width(), 241);
        assert_eq!(a.height(), 241);
        let bits_a: Vec<u32> = a.iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = generate(32, 32, &NoiseParams { seed: 1, ..scenario_params() });
        let b = generate(32, 32, &NoiseParams { seed: 2, ..scenario_params() });
        assert_ne!(a, b);
    }

    #[test]
    fn test_local_mode_range() {
        let params = NoiseParams { octaves: 5, ..Default::default() };
        let field = generate(64, 48, &params);

        let min = field.iter().copied().fold(f32::INFINITY, f32::min);
        let max = field.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(field.iter().all(|v| (0.0..=1.0).contains(v) && v.is_finite()));
        // Local mode stretches to the full range
        assert_eq!(min, 0.0);
        assert!((max - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_global_mode_range() {
        let params = NoiseParams {
            octaves: 6,
            persistence: 0.9,
            normalize_mode: NormalizeMode::Global,
            ..Default::default()
        };
        let field = generate(64, 64, &params);
        assert!(field.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_global_mode_borders_match() {
        // Two 9x9 tiles, the second placed 8 units to the east
        let base = NoiseParams {
            octaves: 3,
            scale: 10.0,
            normalize_mode: NormalizeMode::Global,
            ..Default::default()
        };
        let west = generate(9, 9, &base);
        let east = generate(9, 9, &NoiseParams { offset: Vec2::new(8.0, 0.0), ..base.clone() });

        for y in 0..9 {
            assert!((west[(8, y)] - east[(0, y)]).abs() < 1e-6, "row {}", y);
        }

        // And one placed 8 units to the north (rows run toward -Z)
        let north = generate(9, 9, &NoiseParams { offset: Vec2::new(0.0, 8.0), ..base });
        for x in 0..9 {
            assert!((west[(x, 0)] - north[(x, 8)]).abs() < 1e-6, "column {}", x);
        }
    }

    #[test]
    fn test_zero_octaves_is_flat() {
        let params = NoiseParams { octaves: 0, ..Default::default() };
        let field = generate(8, 8, &params);
        assert!(field.iter().all(|&v| v == 0.0));

        let global = NoiseParams { normalize_mode: NormalizeMode::Global, ..params };
        assert!(generate(8, 8, &global).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_dimensions_are_raised() {
        let field = generate(0, 0, &NoiseParams::default());
        assert_eq!(field.width(), 1);
        assert_eq!(field.height(), 1);
    }

    #[test]
    fn test_clamped() {
        let params = NoiseParams {
            scale: 0.0,
            lacunarity: 0.5,
            persistence: 3.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.scale, MIN_SCALE);
        assert_eq!(params.lacunarity, 1.0);
        assert_eq!(params.persistence, 1.0);

        let nan = NoiseParams { scale: f32::NAN, ..Default::default() }.clamped();
        assert_eq!(nan.scale, MIN_SCALE);
    }

    #[test]
    fn test_many_octaves_stay_in_range() {
        for octaves in [64, 1100] {
            let params = NoiseParams { octaves, ..Default::default() };
            let field = generate(241, 241, &params);
            assert!(field.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)), "{} octaves", octaves);
        }
    }

    #[test]
    fn test_extreme_lacunarity_and_offset() {
        let params = NoiseParams {
            octaves: 8,
            lacunarity: f32::INFINITY,
            ..Default::default()
        };
        assert_eq!(params.clone().clamped().lacunarity, f32::MAX);
        let field = generate(33, 33, &params);
        assert!(field.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));

        let far = NoiseParams {
            offset: Vec2::new(1.0e30, -1.0e30),
            scale: MIN_SCALE,
            normalize_mode: NormalizeMode::Global,
            ..Default::default()
        };
        assert!(generate(17, 17, &far).iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_wrap_sample_is_periodic() {
        assert_eq!(wrap_sample(12.5), 12.5);
        assert_eq!(wrap_sample(-12.5), -12.5);
        assert_eq!(wrap_sample(SAMPLE_PERIOD + 3.25), 3.25);
        assert_eq!(wrap_sample(-SAMPLE_PERIOD * 4.0 - 0.5), -0.5);
        // Same lattice cell, same value
        let perlin = Perlin::new(7);
        let a = perlin.get([3.25, 9.5]);
        let b = perlin.get([wrap_sample(SAMPLE_PERIOD * 3.0 + 3.25), 9.5]);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_max_amplitude() {
        let params = NoiseParams { octaves: 3, persistence: 0.5, ..Default::default() };
        assert!((params.max_amplitude() - 1.75).abs() < 1e-6);
        assert_eq!(NoiseParams { octaves: 0, ..params }.max_amplitude(), 0.0);
    }

    #[test]
    fn test_offset_translates_samples() {
        let base = NoiseParams { octaves: 2, normalize_mode: NormalizeMode::Global, ..Default::default() };
        let a = generate(16, 1, &base);
        let b = generate(16, 1, &NoiseParams { offset: Vec2::new(3.0, 0.0), ..base });
        for x in 0..13 {
            assert!((a[(x + 3, 0)] - b[(x, 0)]).abs() < 1e-6);
        }
    }
}
