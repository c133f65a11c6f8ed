//! Per-planet terrain settings.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::seed::planet_rng;

/// Reference radius used to scale procedural frequencies, in meters.
const EARTH_RADIUS: f64 = 6_371e3;
/// Ocean depth of an Earth-like body with unit water amount and pressure.
const OCEAN_DEPTH: f64 = 7e3;

/// Immutable terrain configuration of one planet.
///
/// Frequencies are relative to the unit sphere: a point is normalized before
/// it is scaled by a frequency and handed to a noise layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Higher values give more, smaller continents. In `[0, 1]`; the
    /// continent mask floor is `1 - fragmentation`, so zero removes
    /// continents and the mountains riding on them.
    pub continents_fragmentation: f64,
    pub continents_frequency: f64,
    /// Height added everywhere the continent mask is non-zero, in meters.
    pub continent_base_height: f64,
    pub mountains_frequency: f64,
    /// Peak mountain height in meters.
    pub max_mountain_height: f64,
    pub bumps_frequency: f64,
    /// Peak height of small-scale bumps in meters.
    pub max_bump_height: f64,
    /// Number of seeded craters; zero disables the crater layer.
    pub crater_count: u32,
    /// Largest crater radius as a fraction of the planet radius.
    pub crater_max_radius: f64,
    /// Depth of the largest crater bowl in meters.
    pub crater_max_depth: f64,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            continents_fragmentation: 0.47,
            continents_frequency: 1.0,
            continent_base_height: 5e3,
            mountains_frequency: 20.0,
            max_mountain_height: 10e3,
            bumps_frequency: 30.0,
            max_bump_height: 1.5e3,
            crater_count: 0,
            crater_max_radius: 0.05,
            crater_max_depth: 2e3,
        }
    }
}

impl TerrainSettings {
    /// Settings for a cratered body without atmosphere or oceans.
    #[must_use]
    pub fn airless() -> Self {
        Self {
            continents_fragmentation: 0.0,
            continent_base_height: 0.0,
            max_mountain_height: 0.0,
            max_bump_height: 800.0,
            crater_count: 64,
            ..Self::default()
        }
    }

    /// Settings with every height set to zero. The surface is the base sphere.
    #[must_use]
    pub fn flat() -> Self {
        Self {
            continent_base_height: 0.0,
            max_mountain_height: 0.0,
            max_bump_height: 0.0,
            crater_count: 0,
            ..Self::default()
        }
    }

    /// Derive settings for a planet of `radius` meters from its seed.
    ///
    /// Frequencies scale with the radius relative to Earth so features keep
    /// roughly the same size in meters. Bodies with negligible atmospheric
    /// pressure get craters and no continents.
    #[must_use]
    pub fn procedural(seed: u64, radius: f64) -> Self {
        let mut rng = planet_rng(seed, "terrain-settings");
        let scale = radius / EARTH_RADIUS;

        let pressure = normal_random(&mut rng, 0.9, 0.2).max(0.0);
        let water_amount = normal_random(&mut rng, 1.0, 0.3).max(0.0);
        let ocean_level = OCEAN_DEPTH * water_amount * pressure;
        let fragmentation = normal_random(&mut rng, 0.65, 0.03).clamp(0.0, 0.95);

        let mut settings = Self {
            continents_fragmentation: fragmentation,
            continents_frequency: scale,
            continent_base_height: ocean_level * 1.9,
            mountains_frequency: 20.0 * scale,
            bumps_frequency: 30.0 * scale,
            ..Self::default()
        };
        if pressure < 0.05 {
            settings.continents_fragmentation = 0.0;
            settings.crater_count = rng.random_range(24..96);
        }
        settings
    }

    /// Largest elevation the noise layers can produce above the base radius.
    ///
    /// Shading uses it to normalize altitude; craters only add up to a
    /// quarter of their depth as rim height, which is included here.
    #[must_use]
    pub fn max_elevation(&self) -> f64 {
        let rim = if self.crater_count > 0 {
            self.crater_max_depth * 0.25
        } else {
            0.0
        };
        self.continent_base_height + self.max_mountain_height + self.max_bump_height + rim
    }
}

/// Box-Muller sample from `N(mean, std_dev)`.
fn normal_random<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random();
    let z = libm::sqrt(-2.0 * libm::log(u1)) * libm::cos(std::f64::consts::TAU * u2);
    mean + z * std_dev
}
