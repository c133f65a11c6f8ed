//! Static description of a planet: identity, terrain and LOD parameters.

use cosmos_cubesphere::MAX_PATH_DEPTH;
use cosmos_forge::PlanetId;
use cosmos_terrain::TerrainSettings;
use serde::{Deserialize, Serialize};

/// Quadtree subdivision parameters shared by the six trees of a planet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSettings {
    /// Nodes shallower than this are always subdivided.
    pub min_depth: u8,
    /// Nodes at this depth are never subdivided.
    pub max_depth: u8,
    /// A node splits when the observer is closer than this many chunk sides.
    pub render_distance_factor: f64,
    /// Quads per chunk side.
    pub subdivisions: u32,
    /// Extra distance, as a fraction of the split limit, the observer must
    /// move away before a node collapses. Zero gives a single threshold.
    pub hysteresis: f64,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            min_depth: 1,
            max_depth: 14,
            render_distance_factor: 1.0,
            subdivisions: 32,
            hysteresis: 0.0,
        }
    }
}

impl LodSettings {
    /// Bring out-of-range values back into the range the chunk trees accept.
    ///
    /// `max_depth` is capped at [`MAX_PATH_DEPTH`] and `min_depth` at
    /// `max_depth`. A chunk has at least one quad per side. A distance factor
    /// that is not a positive number falls back to the default; a negative or
    /// non-finite hysteresis becomes zero.
    #[must_use]
    pub fn validated(self) -> Self {
        let max_depth = self.max_depth.min(MAX_PATH_DEPTH);
        let render_distance_factor =
            if self.render_distance_factor.is_finite() && self.render_distance_factor > 0.0 {
                self.render_distance_factor
            } else {
                Self::default().render_distance_factor
            };
        let hysteresis = if self.hysteresis.is_finite() {
            self.hysteresis.max(0.0)
        } else {
            0.0
        };
        Self {
            min_depth: self.min_depth.min(max_depth),
            max_depth,
            render_distance_factor,
            subdivisions: self.subdivisions.max(1),
            hysteresis,
        }
    }
}

/// Everything the chunk trees need to know about a planet.
#[derive(Clone, Debug, PartialEq)]
pub struct PlanetModel {
    pub id: PlanetId,
    pub name: String,
    pub seed: u64,
    /// Base radius in meters.
    pub radius: f64,
    pub terrain: TerrainSettings,
    pub lod: LodSettings,
}

impl PlanetModel {
    /// A planet with default terrain and LOD settings.
    #[must_use]
    pub fn new(id: PlanetId, name: impl Into<String>, seed: u64, radius: f64) -> Self {
        Self {
            id,
            name: name.into(),
            seed,
            radius,
            terrain: TerrainSettings::default(),
            lod: LodSettings::default(),
        }
    }

    /// A planet whose terrain settings are derived from its seed.
    #[must_use]
    pub fn procedural(id: PlanetId, name: impl Into<String>, seed: u64, radius: f64) -> Self {
        Self {
            terrain: TerrainSettings::procedural(seed, radius),
            ..Self::new(id, name, seed, radius)
        }
    }

    #[must_use]
    pub fn with_terrain(mut self, terrain: TerrainSettings) -> Self {
        self.terrain = terrain;
        self
    }

    /// Replace the LOD settings, clamped by [`LodSettings::validated`].
    #[must_use]
    pub fn with_lod(mut self, lod: LodSettings) -> Self {
        self.lod = lod.validated();
        self
    }

    /// Side of the cube projected onto the planet sphere.
    #[must_use]
    pub fn face_side(&self) -> f64 {
        self.radius * 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_side_is_diameter() {
        let model = PlanetModel::new(PlanetId(0), "Test", 1, 600e3);
        assert!((model.face_side() - 1200e3).abs() < 1e-9);
    }

    #[test]
    fn test_procedural_model_uses_seeded_terrain() {
        let model = PlanetModel::procedural(PlanetId(1), "Seeded", 99, 3e6);
        assert_eq!(model.terrain, TerrainSettings::procedural(99, 3e6));
        assert_eq!(model.lod, LodSettings::default());
    }

    #[test]
    fn test_validated_clamps_depths() {
        let lod = LodSettings {
            min_depth: 3,
            max_depth: 1,
            ..LodSettings::default()
        }
        .validated();
        assert_eq!((lod.min_depth, lod.max_depth), (1, 1));

        let lod = LodSettings {
            min_depth: 50,
            max_depth: 40,
            ..LodSettings::default()
        }
        .validated();
        assert_eq!(lod.max_depth, MAX_PATH_DEPTH);
        assert_eq!(lod.min_depth, MAX_PATH_DEPTH);
    }

    #[test]
    fn test_validated_repairs_degenerate_values() {
        let lod = LodSettings {
            render_distance_factor: f64::NAN,
            subdivisions: 0,
            hysteresis: -0.5,
            ..LodSettings::default()
        }
        .validated();
        assert!((lod.render_distance_factor - 1.0).abs() < 1e-12);
        assert_eq!(lod.subdivisions, 1);
        assert!(lod.hysteresis.abs() < 1e-12);
        assert_eq!(LodSettings::default().validated(), LodSettings::default());
    }

    #[test]
    fn test_with_lod_validates() {
        let model = PlanetModel::new(PlanetId(2), "Deep", 1, 1e6).with_lod(LodSettings {
            max_depth: 200,
            ..LodSettings::default()
        });
        assert_eq!(model.lod.max_depth, MAX_PATH_DEPTH);
    }

    #[test]
    fn test_lod_settings_partial_ron() {
        let lod: LodSettings = ron::from_str("(max_depth: 6, hysteresis: 0.1)").unwrap();
        assert_eq!(lod.max_depth, 6);
        assert!((lod.hysteresis - 0.1).abs() < 1e-12);
        assert_eq!(lod.min_depth, LodSettings::default().min_depth);
    }
}
