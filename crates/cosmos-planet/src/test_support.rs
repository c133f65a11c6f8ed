//! Shared helpers for the planet tests.

use std::sync::atomic::AtomicBool;

use cosmos_forge::{
    BuildResult, BuildTask, DeleteTask, ForgeError, PlanetId, Task, TaskId, TaskQueue, TaskResult,
    build_chunk_mesh,
};
use cosmos_terrain::{TerrainFunction, TerrainSettings};

use crate::{LodSettings, PlanetModel};

/// Small flat planet with cheap chunks.
pub fn model() -> PlanetModel {
    PlanetModel::new(PlanetId(1), "Testworld", 42, 1000.0)
        .with_terrain(TerrainSettings::flat())
        .with_lod(LodSettings {
            min_depth: 1,
            max_depth: 6,
            render_distance_factor: 1.0,
            subdivisions: 2,
            hysteresis: 0.0,
        })
}

/// Task queue that records submissions instead of running them.
#[derive(Default)]
pub struct RecordingQueue {
    next: u64,
    pub tasks: Vec<(TaskId, Task)>,
    pub disposed: bool,
}

impl TaskQueue for RecordingQueue {
    fn submit(&mut self, task: Task) -> Result<TaskId, ForgeError> {
        if self.disposed {
            return Err(ForgeError::Disposed);
        }
        let id = TaskId(self.next);
        self.next += 1;
        self.tasks.push((id, task));
        Ok(id)
    }
}

impl RecordingQueue {
    pub fn builds(&self) -> Vec<BuildTask> {
        self.tasks
            .iter()
            .filter_map(|(_, t)| match t {
                Task::Build(b) => Some(b.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn build_ids(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|(_, t)| matches!(t, Task::Build(_)))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn deletes(&self) -> Vec<DeleteTask> {
        self.tasks
            .iter()
            .filter_map(|(_, t)| match t {
                Task::Delete(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Run a recorded build synchronously, as a worker would.
    pub fn run(&self, id: TaskId) -> TaskResult {
        let task = self
            .tasks
            .iter()
            .find_map(|(tid, t)| match t {
                Task::Build(b) if *tid == id => Some(b),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no build task {id}"));
        let terrain = TerrainFunction::new(task.seed, task.settings);
        let mesh = build_chunk_mesh(task, &terrain, &AtomicBool::new(false))
            .unwrap_or_else(|| panic!("build {id} was cancelled"));
        TaskResult::Build(BuildResult {
            task_id: id,
            planet_id: task.planet_id,
            direction: task.direction,
            path: task.path,
            mesh,
        })
    }
}
