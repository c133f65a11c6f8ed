//! Procedural planet elevation: layered deterministic noise, seeded craters,
//! and the terrain function shared by the main thread and forge workers.

mod crater;
mod noise_layer;
mod seed;
mod settings;
mod terrain_function;

pub use crater::{Crater, CraterLayer};
pub use noise_layer::{NoiseKind, NoiseLayer, NoiseLayerParams};
pub use seed::{derive_layer_seed, planet_rng};
pub use settings::TerrainSettings;
pub use terrain_function::{TerrainFunction, elevation};
