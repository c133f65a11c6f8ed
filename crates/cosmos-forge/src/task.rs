//! Messages exchanged between chunk trees and the forge.

use std::fmt;

use cosmos_cubesphere::{ChunkPath, Direction};
use cosmos_terrain::TerrainSettings;
use glam::{DVec2, DVec3};

/// Identifier assigned by the forge to every submitted task.
///
/// A chunk is identified by the id of its build task for its whole life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a planet, used to route results back to their owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanetId(pub u64);

/// Opaque handle to a mesh owned by the rendering collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Opaque handle to a collision shape owned by the physics collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeHandle(pub u64);

/// Request to build the mesh of one chunk.
#[derive(Clone, Debug)]
pub struct BuildTask {
    pub planet_id: PlanetId,
    pub direction: Direction,
    pub path: ChunkPath,
    /// Side of the chunk on the cube, in meters.
    pub chunk_length: f64,
    /// Center of the chunk in face-plane units (`[-0.5, 0.5]` spans the face).
    pub plane_offset: DVec2,
    /// Center of the chunk on the base sphere, in planet-local space.
    /// Vertex positions are relative to this point.
    pub sphere_center: DVec3,
    /// Quads per chunk side.
    pub subdivisions: u32,
    pub planet_radius: f64,
    pub seed: u64,
    pub settings: TerrainSettings,
}

impl BuildTask {
    #[must_use]
    pub fn depth(&self) -> u8 {
        self.path.depth()
    }

    /// Side of the cube the planet is projected from.
    #[must_use]
    pub fn face_side(&self) -> f64 {
        self.planet_radius * 2.0
    }
}

/// Request to release the resources of a chunk that left the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteTask {
    pub planet_id: PlanetId,
    /// Build task id of the chunk being deleted.
    pub chunk: TaskId,
    pub mesh: Option<MeshHandle>,
    pub shape: Option<ShapeHandle>,
    /// The chunk's build was still queued or running.
    pub was_pending: bool,
    /// Builds of the chunks replacing this one. The deletion is held back
    /// until none of them is queued or running.
    pub awaiting: Vec<TaskId>,
}

/// Request for the surface radius under a position.
#[derive(Clone, Debug)]
pub struct CollisionTask {
    pub planet_id: PlanetId,
    pub seed: u64,
    pub settings: TerrainSettings,
    pub planet_radius: f64,
    /// Sample position in planet-local space.
    pub position: DVec3,
}

/// A unit of work for the forge.
#[derive(Clone, Debug)]
pub enum Task {
    Build(BuildTask),
    Delete(DeleteTask),
    Collision(CollisionTask),
}

impl Task {
    #[must_use]
    pub fn planet_id(&self) -> PlanetId {
        match self {
            Task::Build(t) => t.planet_id,
            Task::Delete(t) => t.planet_id,
            Task::Collision(t) => t.planet_id,
        }
    }
}

/// Vertex and index buffers of a chunk mesh.
///
/// Positions and normals are packed `xyz` triples; positions are relative to
/// the chunk's sphere-space center.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Largest distance from the chunk center to any vertex.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        self.positions
            .chunks_exact(3)
            .map(|p| {
                let (x, y, z) = (f64::from(p[0]), f64::from(p[1]), f64::from(p[2]));
                (x * x + y * y + z * z).sqrt()
            })
            .fold(0.0, f64::max)
    }

    /// Raw bytes of the position buffer, ready for upload.
    #[must_use]
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    #[must_use]
    pub fn normal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// A finished chunk build.
#[derive(Clone, Debug)]
pub struct BuildResult {
    pub task_id: TaskId,
    pub planet_id: PlanetId,
    pub direction: Direction,
    pub path: ChunkPath,
    pub mesh: MeshBuffers,
}

/// A finished collision sample: distance of the displaced surface point from
/// the planet center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightResult {
    pub task_id: TaskId,
    pub planet_id: PlanetId,
    pub height: f64,
}

/// Output of a worker.
#[derive(Clone, Debug)]
pub enum TaskResult {
    Build(BuildResult),
    Height(HeightResult),
}

impl TaskResult {
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskResult::Build(r) => r.task_id,
            TaskResult::Height(r) => r.task_id,
        }
    }

    #[must_use]
    pub fn planet_id(&self) -> PlanetId {
        match self {
            TaskResult::Build(r) => r.planet_id,
            TaskResult::Height(r) => r.planet_id,
        }
    }
}
