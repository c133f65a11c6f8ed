//! The chunk forge: a pool of worker threads that builds chunk meshes and
//! samples collision heights off the main thread.
//!
//! The main thread submits [`Task`]s and polls [`ChunkForge::update`] once per
//! frame. Workers own a [`worker::WorkerContext`] with the terrain function of
//! the planet they last served; everything else travels by value.

mod error;
mod forge;
mod mesh_builder;
mod task;
mod worker;

pub use error::ForgeError;
pub use forge::{ChunkForge, ForgeStats, ForgeUpdate, TaskQueue};
pub use mesh_builder::build_chunk_mesh;
pub use task::{
    BuildResult, BuildTask, CollisionTask, DeleteTask, HeightResult, MeshBuffers, MeshHandle,
    PlanetId, ShapeHandle, Task, TaskId, TaskResult,
};
pub use worker::WorkerContext;
