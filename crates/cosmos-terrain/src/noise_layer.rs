//! Multi-octave noise layers over 3D sphere-space coordinates.
//!
//! A layer sums octaves of simplex noise from the lowest frequency up,
//! normalizes the sum to `[0, 1]`, then applies a minimum-value floor that
//! rescales everything above the floor back onto `[0, 1]`.

use glam::DVec3;
use noise::{NoiseFn, Simplex};

/// Shape of a single octave.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoiseKind {
    /// Smooth fBm: each octave remapped from `[-1, 1]` to `[0, 1]`.
    Simplex,
    /// Ridged noise for mountain ranges: `(1 - |n|)²` per octave.
    Ridged,
}

/// Parameters of a [`NoiseLayer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoiseLayerParams {
    /// Frequency of the first octave, relative to the input coordinates.
    pub frequency: f64,
    /// Number of octaves to sum.
    pub octaves: u32,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude divisor between octaves.
    pub decay: f64,
    /// Normalized values below this floor map to zero.
    pub min_value: f64,
    pub kind: NoiseKind,
}

impl Default for NoiseLayerParams {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            octaves: 6,
            lacunarity: 2.0,
            decay: 2.0,
            min_value: 0.0,
            kind: NoiseKind::Simplex,
        }
    }
}

/// A seeded noise layer. Pure function of the sampled position.
pub struct NoiseLayer {
    noise: Simplex,
    params: NoiseLayerParams,
}

impl NoiseLayer {
    /// Create a layer with its own permutation table.
    #[must_use]
    pub fn new(seed: u32, params: NoiseLayerParams) -> Self {
        Self {
            noise: Simplex::new(seed),
            params,
        }
    }

    /// Sample the layer at `point`. Returns a value in `[0, 1]`.
    #[must_use]
    pub fn sample(&self, point: DVec3) -> f64 {
        let p = &self.params;
        let mut total = 0.0;
        let mut norm = 0.0;
        let mut frequency = p.frequency;
        let mut amplitude = 1.0;

        for _ in 0..p.octaves {
            let q = point * frequency;
            let n = self.noise.get([q.x, q.y, q.z]).clamp(-1.0, 1.0);
            let value = match p.kind {
                NoiseKind::Simplex => (n + 1.0) * 0.5,
                NoiseKind::Ridged => {
                    let r = 1.0 - n.abs();
                    r * r
                }
            };
            total += value * amplitude;
            norm += amplitude;

            frequency *= p.lacunarity;
            amplitude /= p.decay;
        }

        if norm <= 0.0 {
            return 0.0;
        }
        apply_floor(total / norm, p.min_value)
    }

    /// Return a reference to the layer parameters.
    #[must_use]
    pub fn params(&self) -> &NoiseLayerParams {
        &self.params
    }
}

/// `max(v - floor, 0) / (1 - floor)`; a floor of 1 or more silences the layer.
fn apply_floor(value: f64, floor: f64) -> f64 {
    if floor >= 1.0 {
        return 0.0;
    }
    (value - floor).max(0.0) / (1.0 - floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn sample_points() -> Vec<DVec3> {
        (0..200)
            .map(|i| {
                let t = i as f64 * 0.173;
                DVec3::new(t.sin() * 3.0, (t * 0.7).cos() * 2.0, t * 0.05)
            })
            .collect()
    }

    #[test]
    fn test_same_seed_same_value() {
        let a = NoiseLayer::new(5, NoiseLayerParams::default());
        let b = NoiseLayer::new(5, NoiseLayerParams::default());
        for p in sample_points() {
            assert_eq!(a.sample(p).to_bits(), b.sample(p).to_bits());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = NoiseLayer::new(1, NoiseLayerParams::default());
        let b = NoiseLayer::new(2, NoiseLayerParams::default());
        let differing = sample_points()
            .into_iter()
            .filter(|p| (a.sample(*p) - b.sample(*p)).abs() > 1e-6)
            .count();
        assert!(differing > 100, "only {differing} samples differ");
    }

    #[test]
    fn test_output_stays_in_unit_range() {
        for kind in [NoiseKind::Simplex, NoiseKind::Ridged] {
            let layer = NoiseLayer::new(
                9,
                NoiseLayerParams {
                    kind,
                    min_value: 0.3,
                    ..Default::default()
                },
            );
            for p in sample_points() {
                let v = layer.sample(p);
                assert!((-EPSILON..=1.0 + EPSILON).contains(&v), "{kind:?} gave {v}");
            }
        }
    }

    #[test]
    fn test_floor_of_one_silences_layer() {
        let layer = NoiseLayer::new(
            3,
            NoiseLayerParams {
                min_value: 1.0,
                ..Default::default()
            },
        );
        for p in sample_points() {
            assert_eq!(layer.sample(p), 0.0);
        }
    }

    #[test]
    fn test_floor_rescales_above_threshold() {
        assert!((apply_floor(0.75, 0.5) - 0.5).abs() < EPSILON);
        assert!(apply_floor(0.25, 0.5).abs() < EPSILON);
        assert!((apply_floor(0.4, 0.0) - 0.4).abs() < EPSILON);
    }

    #[test]
    fn test_zero_octaves_is_zero() {
        let layer = NoiseLayer::new(
            3,
            NoiseLayerParams {
                octaves: 0,
                ..Default::default()
            },
        );
        assert_eq!(layer.sample(DVec3::ONE), 0.0);
    }
}
