//! Worker threads and their per-thread terrain context.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use cosmos_terrain::{TerrainFunction, TerrainSettings};
use crossbeam_channel::{Receiver, Sender};

use crate::mesh_builder::build_chunk_mesh;
use crate::{BuildResult, BuildTask, CollisionTask, HeightResult, PlanetId, TaskId, TaskResult};

/// Work handed to a single worker slot.
pub(crate) struct WorkerJob {
    pub id: TaskId,
    pub kind: JobKind,
    pub cancelled: Arc<AtomicBool>,
}

pub(crate) enum JobKind {
    Build(BuildTask),
    Collision(CollisionTask),
}

impl JobKind {
    fn planet_id(&self) -> PlanetId {
        match self {
            JobKind::Build(t) => t.planet_id,
            JobKind::Collision(t) => t.planet_id,
        }
    }
}

/// Reply from a worker slot once a job is finished.
pub(crate) struct WorkerReply {
    pub slot: usize,
    pub id: TaskId,
    pub outcome: JobOutcome,
}

pub(crate) enum JobOutcome {
    Done(TaskResult),
    Cancelled,
    Faulted(String),
}

/// Per-thread state: the terrain function of the planet last served.
///
/// Rebuilt whenever a job arrives for another planet or with another
/// `(seed, settings)` pair, so noise tables are only built on change.
#[derive(Default)]
pub struct WorkerContext {
    current_planet_id: Option<PlanetId>,
    terrain: Option<TerrainFunction>,
}

impl WorkerContext {
    /// The planet the context is currently initialized for.
    #[must_use]
    pub fn current_planet_id(&self) -> Option<PlanetId> {
        self.current_planet_id
    }

    /// Terrain function for `planet_id`, rebuilding it if needed.
    pub fn terrain_for(
        &mut self,
        planet_id: PlanetId,
        seed: u64,
        settings: &TerrainSettings,
    ) -> &TerrainFunction {
        let stale = self.current_planet_id != Some(planet_id)
            || !self
                .terrain
                .as_ref()
                .is_some_and(|t| t.matches(seed, settings));
        if stale {
            self.current_planet_id = Some(planet_id);
            self.terrain = None;
        }
        self.terrain
            .get_or_insert_with(|| TerrainFunction::new(seed, *settings))
    }

    /// Forget the current planet.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Run one job. Panics inside the job are caught and reported as faults,
    /// after which the context is reset.
    pub(crate) fn run(&mut self, id: TaskId, kind: &JobKind, cancelled: &AtomicBool) -> JobOutcome {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(id, kind, cancelled)));
        match outcome {
            Ok(Some(result)) => JobOutcome::Done(result),
            Ok(None) => JobOutcome::Cancelled,
            Err(payload) => {
                self.reset();
                JobOutcome::Faulted(panic_message(payload.as_ref()))
            }
        }
    }

    fn execute(&mut self, id: TaskId, kind: &JobKind, cancelled: &AtomicBool) -> Option<TaskResult> {
        match kind {
            JobKind::Build(task) => {
                let terrain = self.terrain_for(task.planet_id, task.seed, &task.settings);
                let mesh = build_chunk_mesh(task, terrain, cancelled)?;
                Some(TaskResult::Build(BuildResult {
                    task_id: id,
                    planet_id: task.planet_id,
                    direction: task.direction,
                    path: task.path,
                    mesh,
                }))
            }
            JobKind::Collision(task) => {
                let terrain = self.terrain_for(task.planet_id, task.seed, &task.settings);
                Some(TaskResult::Height(HeightResult {
                    task_id: id,
                    planet_id: task.planet_id,
                    height: terrain.surface_radius(task.position, task.planet_radius),
                }))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Body of a worker thread: run jobs until the job channel closes.
pub(crate) fn worker_loop(slot: usize, jobs: Receiver<WorkerJob>, replies: Sender<WorkerReply>) {
    let mut context = WorkerContext::default();
    while let Ok(job) = jobs.recv() {
        tracing::trace!(slot, task = %job.id, planet = job.kind.planet_id().0, "worker picked up task");
        let outcome = context.run(job.id, &job.kind, &job.cancelled);
        if replies
            .send(WorkerReply {
                slot,
                id: job.id,
                outcome,
            })
            .is_err()
        {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use cosmos_cubesphere::{ChunkPath, Direction};
    use glam::{DVec2, DVec3};

    use super::*;

    fn collision(planet: u64, seed: u64) -> JobKind {
        JobKind::Collision(CollisionTask {
            planet_id: PlanetId(planet),
            seed,
            settings: TerrainSettings::default(),
            planet_radius: 1000.0,
            position: DVec3::new(0.0, 1200.0, 0.0),
        })
    }

    #[test]
    fn test_context_switches_planets() {
        let mut ctx = WorkerContext::default();
        assert_eq!(ctx.current_planet_id(), None);

        let flag = AtomicBool::new(false);
        let JobOutcome::Done(TaskResult::Height(a)) = ctx.run(TaskId(1), &collision(1, 10), &flag) else {
            panic!("expected a height result");
        };
        assert_eq!(ctx.current_planet_id(), Some(PlanetId(1)));

        let JobOutcome::Done(TaskResult::Height(b)) = ctx.run(TaskId(2), &collision(2, 11), &flag) else {
            panic!("expected a height result");
        };
        assert_eq!(ctx.current_planet_id(), Some(PlanetId(2)));
        assert_eq!(b.task_id, TaskId(2));

        let direct = TerrainFunction::new(10, TerrainSettings::default())
            .surface_radius(DVec3::Y, 1000.0);
        assert_eq!(a.height.to_bits(), direct.to_bits());
    }

    #[test]
    fn test_panicking_job_faults_and_resets_context() {
        let mut ctx = WorkerContext::default();
        let flag = AtomicBool::new(false);
        let _ = ctx.run(TaskId(1), &collision(5, 1), &flag);
        assert_eq!(ctx.current_planet_id(), Some(PlanetId(5)));

        let bad = JobKind::Build(BuildTask {
            planet_id: PlanetId(5),
            direction: Direction::Up,
            path: ChunkPath::ROOT,
            chunk_length: 2000.0,
            plane_offset: DVec2::ZERO,
            sphere_center: DVec3::Y * 1000.0,
            subdivisions: 0,
            planet_radius: 1000.0,
            seed: 1,
            settings: TerrainSettings::default(),
        });
        match ctx.run(TaskId(2), &bad, &flag) {
            JobOutcome::Faulted(message) => assert!(message.contains("subdivision")),
            _ => panic!("expected a fault"),
        }
        assert_eq!(ctx.current_planet_id(), None);
    }
}
