//! A leaf patch of planet surface and the lifecycle of its resources.

use cosmos_cubesphere::{ChunkPath, Direction, chunk_side_length, chunk_sphere_position};
use cosmos_forge::{
    BuildResult, BuildTask, DeleteTask, ForgeError, MeshHandle, PlanetId, ShapeHandle, Task,
    TaskId, TaskQueue,
};
use glam::DVec3;

use crate::{ChunkBackend, PlanetModel};

/// Build state of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    /// The build task is queued or running.
    Pending { task: TaskId },
    /// Mesh and collision shape exist.
    Built,
    /// The build faulted on a worker; the chunk has no geometry.
    Orphaned,
}

/// One leaf of a chunk tree.
#[derive(Debug)]
pub struct PlanetChunk {
    id: TaskId,
    planet_id: PlanetId,
    direction: Direction,
    path: ChunkPath,
    sphere_center: DVec3,
    bounding_radius: f64,
    state: ChunkState,
    mesh: Option<MeshHandle>,
    shape: Option<ShapeHandle>,
    visible: bool,
}

impl PlanetChunk {
    /// Create a chunk and submit its build. The chunk starts pending.
    pub fn create(
        path: ChunkPath,
        direction: Direction,
        model: &PlanetModel,
        queue: &mut dyn TaskQueue,
    ) -> Result<Self, ForgeError> {
        let face_side = model.face_side();
        let chunk_length = chunk_side_length(face_side, path.depth());
        let sphere_center = chunk_sphere_position(&path, direction, face_side);
        let id = queue.submit(Task::Build(BuildTask {
            planet_id: model.id,
            direction,
            path,
            chunk_length,
            plane_offset: path.plane_offset(),
            sphere_center,
            subdivisions: model.lod.subdivisions.max(1),
            planet_radius: model.radius,
            seed: model.seed,
            settings: model.terrain,
        }))?;

        Ok(Self {
            id,
            planet_id: model.id,
            direction,
            path,
            sphere_center,
            // Half diagonal of the flat square until the real mesh arrives.
            bounding_radius: chunk_length * std::f64::consts::FRAC_1_SQRT_2,
            state: ChunkState::Pending { task: id },
            mesh: None,
            shape: None,
            visible: false,
        })
    }

    /// Id of the build task that created this chunk.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    #[must_use]
    pub fn path(&self) -> ChunkPath {
        self.path
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn state(&self) -> ChunkState {
        self.state
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.state == ChunkState::Built
    }

    /// The build task this chunk is waiting for, if any.
    #[must_use]
    pub fn pending_task(&self) -> Option<TaskId> {
        match self.state {
            ChunkState::Pending { task } => Some(task),
            _ => None,
        }
    }

    /// Center on the base sphere, in planet-local space.
    #[must_use]
    pub fn sphere_center(&self) -> DVec3 {
        self.sphere_center
    }

    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    #[must_use]
    pub fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }

    #[must_use]
    pub fn shape(&self) -> Option<ShapeHandle> {
        self.shape
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Turn a finished build into a mesh and a collision shape.
    ///
    /// Ignored unless the result comes from the task this chunk is waiting
    /// for. Returns whether the result was applied.
    pub fn apply_build_result(&mut self, result: &BuildResult, backend: &mut dyn ChunkBackend) -> bool {
        if self.pending_task() != Some(result.task_id) {
            return false;
        }
        debug_assert_eq!(result.path, self.path);
        debug_assert_eq!(result.direction, self.direction);

        let mesh = backend.create_mesh(
            self.planet_id,
            self.direction,
            self.path,
            self.sphere_center,
            &result.mesh,
        );
        let shape = backend.create_collision_shape(mesh, &result.mesh);
        self.mesh = Some(mesh);
        self.shape = Some(shape);
        self.bounding_radius = result.mesh.bounding_radius();
        self.state = ChunkState::Built;
        self.visible = true;
        backend.on_chunk_created(self);
        true
    }

    /// Mark the chunk orphaned if `task` is its pending build.
    pub fn mark_faulted(&mut self, task: TaskId) -> bool {
        if self.pending_task() != Some(task) {
            return false;
        }
        tracing::warn!(planet = self.planet_id.0, face = ?self.direction, path = %self.path, "chunk build faulted");
        self.state = ChunkState::Orphaned;
        true
    }

    /// Submit a fresh build for an orphaned chunk. The chunk takes the id of
    /// the new task. Returns `false` if the chunk was not orphaned.
    pub fn resubmit(&mut self, model: &PlanetModel, queue: &mut dyn TaskQueue) -> Result<bool, ForgeError> {
        if self.state != ChunkState::Orphaned {
            return Ok(false);
        }
        let fresh = Self::create(self.path, self.direction, model, queue)?;
        self.id = fresh.id;
        self.state = fresh.state;
        Ok(true)
    }

    /// Show or hide the mesh. Only calls the backend on change.
    pub fn set_visible(&mut self, visible: bool, backend: &mut dyn ChunkBackend) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if let Some(mesh) = self.mesh {
            backend.set_mesh_visible(mesh, visible);
        }
    }

    /// Retire the chunk.
    ///
    /// Never waits for the build. Returns a deletion when a build is still
    /// outstanding or resources exist; `awaiting` lists the builds of the
    /// chunks that replace this one.
    #[must_use]
    pub fn dispose(self, awaiting: Vec<TaskId>) -> Option<DeleteTask> {
        let was_pending = self.pending_task().is_some();
        if !was_pending && self.mesh.is_none() && self.shape.is_none() {
            return None;
        }
        Some(DeleteTask {
            planet_id: self.planet_id,
            chunk: self.id,
            mesh: self.mesh,
            shape: self.shape,
            was_pending,
            awaiting,
        })
    }
}
