//! The elevation function of a planet.
//!
//! Main-thread height queries and worker-side mesh builds both go through
//! [`TerrainFunction`], so a vertex position computed by a worker matches a
//! height sampled synchronously at the same point bit for bit.

use glam::DVec3;

use crate::{CraterLayer, NoiseKind, NoiseLayer, NoiseLayerParams, TerrainSettings, derive_layer_seed};

/// Cached noise layers and craters for one `(seed, settings)` pair.
pub struct TerrainFunction {
    seed: u64,
    settings: TerrainSettings,
    continents: NoiseLayer,
    mountains: NoiseLayer,
    bumps: NoiseLayer,
    craters: CraterLayer,
}

impl TerrainFunction {
    /// Build the layers for a planet. Permutation tables are built once here.
    #[must_use]
    pub fn new(seed: u64, settings: TerrainSettings) -> Self {
        let continents = NoiseLayer::new(
            derive_layer_seed(seed, "continents"),
            NoiseLayerParams {
                frequency: 2.0,
                octaves: 5,
                lacunarity: 2.0,
                decay: 2.0,
                min_value: 1.0 - settings.continents_fragmentation,
                kind: NoiseKind::Simplex,
            },
        );
        let mountains = NoiseLayer::new(
            derive_layer_seed(seed, "mountains"),
            NoiseLayerParams {
                frequency: 0.5,
                octaves: 5,
                lacunarity: 2.2,
                decay: 2.0,
                min_value: 0.0,
                kind: NoiseKind::Ridged,
            },
        );
        let bumps = NoiseLayer::new(
            derive_layer_seed(seed, "bumps"),
            NoiseLayerParams {
                frequency: 2.0,
                octaves: 5,
                lacunarity: 2.0,
                decay: 2.0,
                min_value: 0.0,
                kind: NoiseKind::Simplex,
            },
        );
        let craters = CraterLayer::generate(
            seed,
            settings.crater_count,
            settings.crater_max_radius,
            settings.crater_max_depth,
        );

        Self {
            seed,
            settings,
            continents,
            mountains,
            bumps,
            craters,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// Returns `true` if this function was built from `(seed, settings)`.
    #[must_use]
    pub fn matches(&self, seed: u64, settings: &TerrainSettings) -> bool {
        self.seed == seed && self.settings == *settings
    }

    /// Elevation above the base radius at the direction of `point`, in meters.
    ///
    /// Only the direction of `point` matters. The zero vector yields zero.
    #[must_use]
    pub fn elevation(&self, point: DVec3) -> f64 {
        let Some(unit) = point.try_normalize() else {
            return 0.0;
        };
        let s = &self.settings;

        let mask = self.continents.sample(unit * s.continents_frequency);

        let mut elevation = mask * s.continent_base_height;
        elevation +=
            mask * self.mountains.sample(unit * s.mountains_frequency) * s.max_mountain_height;
        elevation += self.bumps.sample(unit * s.bumps_frequency) * s.max_bump_height;
        elevation += self.craters.evaluate(unit);

        elevation
    }

    /// Distance from the planet center of the surface above `point`.
    #[must_use]
    pub fn surface_radius(&self, point: DVec3, base_radius: f64) -> f64 {
        base_radius + self.elevation(point)
    }

    /// Move `point` radially onto the displaced surface of a planet of
    /// radius `base_radius`.
    #[must_use]
    pub fn displace(&self, point: DVec3, base_radius: f64) -> DVec3 {
        match point.try_normalize() {
            Some(unit) => unit * (base_radius + self.elevation(point)),
            None => DVec3::ZERO,
        }
    }
}

/// One-shot elevation sample. Builds the layers on every call; hold a
/// [`TerrainFunction`] when sampling repeatedly.
#[must_use]
pub fn elevation(point: DVec3, seed: u64, settings: &TerrainSettings) -> f64 {
    TerrainFunction::new(seed, *settings).elevation(point)
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn directions() -> Vec<DVec3> {
        (0..300)
            .map(|i| {
                let t = i as f64 * 0.37;
                DVec3::new(t.cos(), (t * 1.3).sin(), (t * 0.11).sin() + 0.2)
            })
            .collect()
    }

    #[test]
    fn test_elevation_is_deterministic() {
        let settings = TerrainSettings::default();
        let a = TerrainFunction::new(42, settings);
        let b = TerrainFunction::new(42, settings);
        for p in directions() {
            assert_eq!(a.elevation(p).to_bits(), b.elevation(p).to_bits());
        }
    }

    #[test]
    fn test_elevation_matches_across_threads() {
        let settings = TerrainSettings::airless();
        let points = directions();
        let main: Vec<u64> = {
            let f = TerrainFunction::new(7, settings);
            points.iter().map(|p| f.elevation(*p).to_bits()).collect()
        };
        let worker = {
            let points = points.clone();
            thread::spawn(move || {
                let f = TerrainFunction::new(7, settings);
                points
                    .iter()
                    .map(|p| f.elevation(*p).to_bits())
                    .collect::<Vec<u64>>()
            })
            .join()
            .unwrap()
        };
        assert_eq!(main, worker);
    }

    #[test]
    fn test_free_function_matches_cached() {
        let settings = TerrainSettings::default();
        let f = TerrainFunction::new(3, settings);
        for p in directions().into_iter().take(20) {
            assert_eq!(elevation(p, 3, &settings).to_bits(), f.elevation(p).to_bits());
        }
    }

    #[test]
    fn test_only_direction_matters() {
        let f = TerrainFunction::new(5, TerrainSettings::default());
        let p = DVec3::new(0.3, -0.8, 0.52);
        assert!((f.elevation(p) - f.elevation(p.normalize())).abs() < 1e-9);
        assert!((f.elevation(p) - f.elevation(p * 1e6)).abs() < 1e-9);
    }

    #[test]
    fn test_displacement_is_radial() {
        let radius = 1_000e3;
        let f = TerrainFunction::new(9, TerrainSettings::default());
        for p in directions() {
            let d = f.displace(p * 123.0, radius);
            assert!(d.normalize().dot(p.normalize()) > 1.0 - 1e-12);
            assert!((d.length() - f.surface_radius(p, radius)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_flat_settings_give_base_sphere() {
        let radius = 500.0;
        let f = TerrainFunction::new(1, TerrainSettings::flat());
        for p in directions() {
            assert_eq!(f.elevation(p), 0.0);
            assert!((f.displace(p, radius).length() - radius).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_fragmentation_removes_continents_and_mountains() {
        let settings = TerrainSettings {
            continents_fragmentation: 0.0,
            max_bump_height: 0.0,
            ..TerrainSettings::default()
        };
        let f = TerrainFunction::new(21, settings);
        for p in directions() {
            assert_eq!(f.elevation(p), 0.0);
        }
    }

    #[test]
    fn test_elevation_stays_within_bounds() {
        let settings = TerrainSettings::default();
        let f = TerrainFunction::new(77, settings);
        for p in directions() {
            let e = f.elevation(p);
            assert!(e >= 0.0 && e <= settings.max_elevation() + 1e-9, "{e}");
        }
    }

    #[test]
    fn test_craters_dig_below_base_radius() {
        let settings = TerrainSettings {
            max_bump_height: 0.0,
            ..TerrainSettings::airless()
        };
        let f = TerrainFunction::new(4, settings);
        let layer = CraterLayer::generate(
            4,
            settings.crater_count,
            settings.crater_max_radius,
            settings.crater_max_depth,
        );
        let deepest = layer
            .craters()
            .iter()
            .max_by(|a, b| a.depth.total_cmp(&b.depth))
            .unwrap();
        assert!(f.elevation(deepest.center) < 0.0);
    }

    #[test]
    fn test_zero_vector_is_handled() {
        let f = TerrainFunction::new(1, TerrainSettings::default());
        assert_eq!(f.elevation(DVec3::ZERO), 0.0);
        assert_eq!(f.displace(DVec3::ZERO, 10.0), DVec3::ZERO);
    }

    #[test]
    fn test_matches() {
        let settings = TerrainSettings::default();
        let f = TerrainFunction::new(2, settings);
        assert!(f.matches(2, &settings));
        assert!(!f.matches(3, &settings));
        assert!(!f.matches(2, &TerrainSettings::airless()));
    }
}
