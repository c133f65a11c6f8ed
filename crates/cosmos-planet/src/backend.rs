//! Contracts with the rendering, physics and shading collaborators.

use cosmos_cubesphere::{ChunkPath, Direction};
use cosmos_forge::{MeshBuffers, MeshHandle, PlanetId, ShapeHandle};
use glam::{DQuat, DVec3};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::PlanetChunk;

/// Creates and releases the engine-side resources of chunks.
///
/// The terrain core never looks inside a handle; it only stores the handles
/// it gets back and returns them for release.
pub trait ChunkBackend {
    /// Upload a chunk mesh. `local_position` is the chunk center in
    /// planet-local space; mesh positions are relative to it.
    fn create_mesh(
        &mut self,
        planet: PlanetId,
        direction: Direction,
        path: ChunkPath,
        local_position: DVec3,
        mesh: &MeshBuffers,
    ) -> MeshHandle;

    /// Build a triangle-mesh collision shape for a chunk mesh.
    fn create_collision_shape(&mut self, mesh: MeshHandle, buffers: &MeshBuffers) -> ShapeHandle;

    fn set_mesh_visible(&mut self, mesh: MeshHandle, visible: bool);

    fn release_mesh(&mut self, mesh: MeshHandle);

    fn release_shape(&mut self, shape: ShapeHandle);

    /// Called once a chunk has its mesh and shape, for material and physics
    /// hookup.
    fn on_chunk_created(&mut self, _chunk: &PlanetChunk) {}
}

/// Per-frame shading inputs of a planet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanetUniforms {
    pub planet_position: DVec3,
    pub planet_rotation: DQuat,
    pub planet_radius: f64,
    /// Highest elevation the terrain can reach, for altitude-based coloring.
    pub max_elevation: f64,
    /// Unit vector from the planet center to the sun, in planet-local space.
    pub sun_direction: DVec3,
    /// Seconds since the planet was created.
    pub time: f64,
    pub seed: u64,
}

/// A planet surface material.
pub trait SurfaceMaterial {
    fn update_uniforms(&mut self, uniforms: &PlanetUniforms);
}

#[derive(Clone, Copy, Debug)]
struct MeshRecord {
    planet: PlanetId,
    visible: bool,
    vertices: usize,
    /// Size of the uploaded vertex and index buffers.
    bytes: usize,
}

/// Backend without a renderer or physics engine.
///
/// Tracks live handles so drivers and tests can check for leaks.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    meshes: FxHashMap<MeshHandle, MeshRecord>,
    shapes: FxHashSet<ShapeHandle>,
    chunks_created: u64,
}

impl HeadlessBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    #[must_use]
    pub fn live_shapes(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn visible_meshes(&self) -> usize {
        self.meshes.values().filter(|m| m.visible).count()
    }

    /// Live meshes belonging to `planet`.
    #[must_use]
    pub fn meshes_of(&self, planet: PlanetId) -> usize {
        self.meshes.values().filter(|m| m.planet == planet).count()
    }

    /// Total vertices across all live meshes.
    #[must_use]
    pub fn live_vertices(&self) -> usize {
        self.meshes.values().map(|m| m.vertices).sum()
    }

    /// Bytes of vertex and index data held by live meshes.
    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.meshes.values().map(|m| m.bytes).sum()
    }

    #[must_use]
    pub fn is_mesh_live(&self, mesh: MeshHandle) -> bool {
        self.meshes.contains_key(&mesh)
    }

    #[must_use]
    pub fn is_visible(&self, mesh: MeshHandle) -> bool {
        self.meshes.get(&mesh).is_some_and(|m| m.visible)
    }

    /// Number of `on_chunk_created` notifications received.
    #[must_use]
    pub fn chunks_created(&self) -> u64 {
        self.chunks_created
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl ChunkBackend for HeadlessBackend {
    fn create_mesh(
        &mut self,
        planet: PlanetId,
        _direction: Direction,
        _path: ChunkPath,
        _local_position: DVec3,
        mesh: &MeshBuffers,
    ) -> MeshHandle {
        let handle = MeshHandle(self.next());
        self.meshes.insert(
            handle,
            MeshRecord {
                planet,
                visible: true,
                vertices: mesh.vertex_count(),
                bytes: mesh.position_bytes().len()
                    + mesh.normal_bytes().len()
                    + mesh.index_bytes().len(),
            },
        );
        handle
    }

    fn create_collision_shape(&mut self, _mesh: MeshHandle, _buffers: &MeshBuffers) -> ShapeHandle {
        let handle = ShapeHandle(self.next());
        self.shapes.insert(handle);
        handle
    }

    fn set_mesh_visible(&mut self, mesh: MeshHandle, visible: bool) {
        if let Some(record) = self.meshes.get_mut(&mesh) {
            record.visible = visible;
        }
    }

    fn release_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(&mesh).is_none() {
            tracing::warn!(?mesh, "released unknown mesh");
        }
    }

    fn release_shape(&mut self, shape: ShapeHandle) {
        if !self.shapes.remove(&shape) {
            tracing::warn!(?shape, "released unknown collision shape");
        }
    }

    fn on_chunk_created(&mut self, _chunk: &PlanetChunk) {
        self.chunks_created += 1;
    }
}

/// Material that only remembers the last uniforms it received.
#[derive(Debug, Default)]
pub struct HeadlessMaterial {
    pub last: Option<PlanetUniforms>,
    pub updates: u64,
}

impl SurfaceMaterial for HeadlessMaterial {
    fn update_uniforms(&mut self, uniforms: &PlanetUniforms) {
        self.last = Some(*uniforms);
        self.updates += 1;
    }
}
