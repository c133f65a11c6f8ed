//! Planet surfaces built from six chunk trees, one per cube face.
//!
//! Each frame the [`StarSystem`] updates the LOD of every planet, drains the
//! [`ChunkForge`](cosmos_forge::ChunkForge), pushes material uniforms and
//! recomputes chunk visibility. Meshes, collision shapes and materials live
//! behind the [`ChunkBackend`] and [`SurfaceMaterial`] traits.

mod backend;
mod chunk;
mod chunk_tree;
mod culling;
mod model;
mod planet;
mod star_system;

#[cfg(test)]
mod test_support;

pub use backend::{ChunkBackend, HeadlessBackend, HeadlessMaterial, PlanetUniforms, SurfaceMaterial};
pub use chunk::{ChunkState, PlanetChunk};
pub use chunk_tree::{ChunkNode, ChunkTree, LodChanges, TreeStats};
pub use culling::{CameraView, ChunkCuller, Frustum, HorizonCuller, Intersection};
pub use model::{LodSettings, PlanetModel};
pub use planet::{AppliedUpdate, PlanetTransform, TelluricPlanet};
pub use star_system::{FrameInput, FrameReport, StarSystem};
