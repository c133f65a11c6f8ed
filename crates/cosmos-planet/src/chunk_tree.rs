//! Per-face quadtree of chunks that splits and collapses with observer
//! distance.
//!
//! A node splits when the observer is closer to its center (on the base
//! sphere) than `render_distance_factor` chunk sides, and collapses back
//! into a single leaf once the observer is farther than that, widened by the
//! hysteresis band. Depth is kept within `[min_depth, max_depth]`.

use std::mem;
use std::ops::AddAssign;

use cosmos_cubesphere::{ChunkPath, Direction, chunk_side_length, chunk_sphere_position};
use cosmos_forge::{BuildResult, ForgeError, Task, TaskId, TaskQueue};
use glam::{DAffine3, DVec3};

use crate::{ChunkBackend, ChunkCuller, ChunkState, LodSettings, PlanetChunk, PlanetModel};

/// A quadtree node: a chunk, or four children in quadrant order.
#[derive(Debug)]
pub enum ChunkNode {
    Leaf(PlanetChunk),
    Internal(Box<[ChunkNode; 4]>),
}

impl ChunkNode {
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, ChunkNode::Leaf(_))
    }

    /// The four children of an internal node.
    #[must_use]
    pub fn children(&self) -> Option<&[ChunkNode; 4]> {
        match self {
            ChunkNode::Leaf(_) => None,
            ChunkNode::Internal(children) => Some(children),
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a PlanetChunk>) {
        match self {
            ChunkNode::Leaf(chunk) => out.push(chunk),
            ChunkNode::Internal(children) => {
                for child in children.iter() {
                    child.collect_leaves(out);
                }
            }
        }
    }

    fn collect_leaves_mut<'a>(&'a mut self, out: &mut Vec<&'a mut PlanetChunk>) {
        match self {
            ChunkNode::Leaf(chunk) => out.push(chunk),
            ChunkNode::Internal(children) => {
                for child in children.iter_mut() {
                    child.collect_leaves_mut(out);
                }
            }
        }
    }

    fn into_leaves(self, out: &mut Vec<PlanetChunk>) {
        match self {
            ChunkNode::Leaf(chunk) => out.push(chunk),
            ChunkNode::Internal(children) => {
                let children: [ChunkNode; 4] = *children;
                for child in children {
                    child.into_leaves(out);
                }
            }
        }
    }
}

/// Topology changes made by one LOD pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LodChanges {
    /// Leaves replaced by a subtree.
    pub splits: usize,
    /// Subtrees replaced by a leaf.
    pub collapses: usize,
    /// Chunks created (each submitted one build).
    pub created: usize,
    /// Deletions submitted.
    pub deleted: usize,
}

impl LodChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splits == 0 && self.collapses == 0
    }
}

impl AddAssign for LodChanges {
    fn add_assign(&mut self, rhs: Self) {
        self.splits += rhs.splits;
        self.collapses += rhs.collapses;
        self.created += rhs.created;
        self.deleted += rhs.deleted;
    }
}

/// Snapshot of a tree's shape and chunk states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub leaves: usize,
    pub internal_nodes: usize,
    pub pending: usize,
    pub built: usize,
    pub orphaned: usize,
    pub visible: usize,
    pub deepest: u8,
}

impl AddAssign for TreeStats {
    fn add_assign(&mut self, rhs: Self) {
        self.leaves += rhs.leaves;
        self.internal_nodes += rhs.internal_nodes;
        self.pending += rhs.pending;
        self.built += rhs.built;
        self.orphaned += rhs.orphaned;
        self.visible += rhs.visible;
        self.deepest = self.deepest.max(rhs.deepest);
    }
}

/// The chunk quadtree of one cube face.
#[derive(Debug)]
pub struct ChunkTree {
    direction: Direction,
    root: ChunkNode,
}

impl ChunkTree {
    /// Create a tree holding a single root chunk and submit its build.
    pub fn new(direction: Direction, model: &PlanetModel, queue: &mut dyn TaskQueue) -> Result<Self, ForgeError> {
        let root = PlanetChunk::create(ChunkPath::ROOT, direction, model, queue)?;
        Ok(Self {
            direction,
            root: ChunkNode::Leaf(root),
        })
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn root(&self) -> &ChunkNode {
        &self.root
    }

    /// Run one LOD pass for an observer in planet-local space.
    ///
    /// Decisions for the whole pass use the same observer position. A leaf
    /// that must split is replaced directly by the subtree the observer
    /// calls for, so a second pass with the same observer changes nothing.
    pub fn update(
        &mut self,
        observer: DVec3,
        model: &PlanetModel,
        queue: &mut dyn TaskQueue,
    ) -> Result<LodChanges, ForgeError> {
        let mut pass = LodPass {
            direction: self.direction,
            model,
            lod: model.lod.validated(),
            observer,
            queue,
            changes: LodChanges::default(),
        };
        pass.visit(&mut self.root, ChunkPath::ROOT)?;
        let changes = pass.changes;
        if !changes.is_empty() {
            tracing::debug!(
                face = ?self.direction,
                splits = changes.splits,
                collapses = changes.collapses,
                created = changes.created,
                deleted = changes.deleted,
                "chunk tree updated"
            );
        }
        Ok(changes)
    }

    /// Replace the whole tree with a single root chunk.
    ///
    /// Every existing chunk is retired; its deletion waits for the new root.
    pub fn reset(&mut self, model: &PlanetModel, queue: &mut dyn TaskQueue) -> Result<LodChanges, ForgeError> {
        let root = PlanetChunk::create(ChunkPath::ROOT, self.direction, model, queue)?;
        let awaiting = vec![root.id()];
        let old = mem::replace(&mut self.root, ChunkNode::Leaf(root));
        let mut changes = LodChanges {
            created: 1,
            ..LodChanges::default()
        };
        changes.deleted = retire(old, &awaiting, queue)?;
        tracing::debug!(face = ?self.direction, deleted = changes.deleted, "chunk tree reset");
        Ok(changes)
    }

    /// Hand a finished build to the leaf at its path.
    ///
    /// Returns `false` for stale results: the leaf is gone or waits for
    /// another task.
    pub fn apply_build_result(&mut self, result: &BuildResult, backend: &mut dyn ChunkBackend) -> bool {
        let applied = match self.leaf_at_mut(result.path) {
            Some(chunk) => chunk.apply_build_result(result, backend),
            None => false,
        };
        if !applied {
            tracing::trace!(task = %result.task_id, face = ?self.direction, path = %result.path, "dropping stale build result");
        }
        applied
    }

    /// Mark the chunk waiting for `task` as orphaned.
    pub fn mark_faulted(&mut self, task: TaskId) -> bool {
        self.leaves_mut().into_iter().any(|chunk| chunk.mark_faulted(task))
    }

    /// Resubmit the builds of every orphaned chunk. Returns how many were
    /// resubmitted.
    pub fn recover_orphans(&mut self, model: &PlanetModel, queue: &mut dyn TaskQueue) -> Result<usize, ForgeError> {
        let mut recovered = 0;
        for chunk in self.leaves_mut() {
            if chunk.resubmit(model, queue)? {
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    /// Update the visibility of every built leaf. Does not change topology.
    ///
    /// `to_world` maps planet-local positions to world space. Returns the
    /// number of visible chunks.
    pub fn compute_culling(
        &mut self,
        culler: &ChunkCuller,
        to_world: &DAffine3,
        backend: &mut dyn ChunkBackend,
    ) -> usize {
        let mut visible = 0;
        for chunk in self.leaves_mut() {
            if !chunk.is_built() {
                continue;
            }
            let center = to_world.transform_point3(chunk.sphere_center());
            let is_visible = culler.is_visible(center, chunk.bounding_radius());
            chunk.set_visible(is_visible, backend);
            visible += usize::from(is_visible);
        }
        visible
    }

    /// Retire every chunk. Returns the number of deletions submitted.
    pub fn dispose(self, queue: &mut dyn TaskQueue) -> Result<usize, ForgeError> {
        retire(self.root, &[], queue)
    }

    /// All leaves in quadrant order.
    #[must_use]
    pub fn leaves(&self) -> Vec<&PlanetChunk> {
        let mut out = Vec::new();
        self.root.collect_leaves(&mut out);
        out
    }

    fn leaves_mut(&mut self) -> Vec<&mut PlanetChunk> {
        let mut out = Vec::new();
        self.root.collect_leaves_mut(&mut out);
        out
    }

    /// The leaf covering exactly `path`, if the tree has one there.
    #[must_use]
    pub fn leaf_at(&self, path: ChunkPath) -> Option<&PlanetChunk> {
        let mut node = &self.root;
        for quadrant in path.quadrants() {
            node = &node.children()?[quadrant as usize];
        }
        match node {
            ChunkNode::Leaf(chunk) => Some(chunk),
            ChunkNode::Internal(_) => None,
        }
    }

    fn leaf_at_mut(&mut self, path: ChunkPath) -> Option<&mut PlanetChunk> {
        let mut node = &mut self.root;
        for quadrant in path.quadrants() {
            node = match node {
                ChunkNode::Internal(children) => &mut children[quadrant as usize],
                ChunkNode::Leaf(_) => return None,
            };
        }
        match node {
            ChunkNode::Leaf(chunk) => Some(chunk),
            ChunkNode::Internal(_) => None,
        }
    }

    #[must_use]
    pub fn stats(&self) -> TreeStats {
        fn walk(node: &ChunkNode, depth: u8, stats: &mut TreeStats) {
            match node {
                ChunkNode::Leaf(chunk) => {
                    stats.leaves += 1;
                    stats.deepest = stats.deepest.max(depth);
                    match chunk.state() {
                        ChunkState::Pending { .. } => stats.pending += 1,
                        ChunkState::Built => stats.built += 1,
                        ChunkState::Orphaned => stats.orphaned += 1,
                    }
                    if chunk.is_built() && chunk.is_visible() {
                        stats.visible += 1;
                    }
                }
                ChunkNode::Internal(children) => {
                    stats.internal_nodes += 1;
                    for child in children.iter() {
                        walk(child, depth + 1, stats);
                    }
                }
            }
        }
        let mut stats = TreeStats::default();
        walk(&self.root, 0, &mut stats);
        stats
    }
}

/// Dispose every leaf of `node` and submit the resulting deletions.
fn retire(node: ChunkNode, awaiting: &[TaskId], queue: &mut dyn TaskQueue) -> Result<usize, ForgeError> {
    let mut chunks = Vec::new();
    node.into_leaves(&mut chunks);
    let mut deleted = 0;
    for chunk in chunks {
        if let Some(delete) = chunk.dispose(awaiting.to_vec()) {
            queue.submit(Task::Delete(delete))?;
            deleted += 1;
        }
    }
    Ok(deleted)
}

/// State of one LOD pass over a tree.
struct LodPass<'a> {
    direction: Direction,
    model: &'a PlanetModel,
    lod: LodSettings,
    observer: DVec3,
    queue: &'a mut dyn TaskQueue,
    changes: LodChanges,
}

impl LodPass<'_> {
    /// Squared observer distance to the node center and the split limit.
    fn distance_and_limit(&self, path: ChunkPath) -> (f64, f64) {
        let face_side = self.model.face_side();
        let center = chunk_sphere_position(&path, self.direction, face_side);
        let limit = self.lod.render_distance_factor * chunk_side_length(face_side, path.depth());
        (self.observer.distance_squared(center), limit)
    }

    fn wants_split(&self, path: ChunkPath) -> bool {
        let lod = &self.lod;
        let depth = path.depth();
        if depth < lod.min_depth {
            return true;
        }
        let (d2, limit) = self.distance_and_limit(path);
        d2 < limit * limit && depth < lod.max_depth
    }

    /// Called for internal nodes that no longer want to be split.
    fn may_collapse(&self, path: ChunkPath) -> bool {
        let lod = &self.lod;
        if path.depth() <= lod.min_depth {
            return false;
        }
        if path.depth() >= lod.max_depth {
            return true;
        }
        let (d2, limit) = self.distance_and_limit(path);
        let outer = limit * (1.0 + lod.hysteresis);
        d2 >= outer * outer
    }

    fn visit(&mut self, node: &mut ChunkNode, path: ChunkPath) -> Result<(), ForgeError> {
        let split = self.wants_split(path);
        match (node.is_leaf(), split) {
            (true, true) => self.split(node, path),
            (true, false) => Ok(()),
            (false, false) if self.may_collapse(path) => self.collapse(node, path),
            (false, _) => {
                if let ChunkNode::Internal(children) = node {
                    for (quadrant, child) in children.iter_mut().enumerate() {
                        self.visit(child, path.child(quadrant as u8))?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Build the subtree the observer calls for below `path`.
    fn grow(&mut self, path: ChunkPath) -> Result<ChunkNode, ForgeError> {
        if self.wants_split(path) {
            let [a, b, c, d] = path.children();
            return Ok(ChunkNode::Internal(Box::new([
                self.grow(a)?,
                self.grow(b)?,
                self.grow(c)?,
                self.grow(d)?,
            ])));
        }
        self.changes.created += 1;
        Ok(ChunkNode::Leaf(PlanetChunk::create(
            path,
            self.direction,
            self.model,
            &mut *self.queue,
        )?))
    }

    fn split(&mut self, node: &mut ChunkNode, path: ChunkPath) -> Result<(), ForgeError> {
        let grown = self.grow(path)?;
        let mut fresh = Vec::new();
        grown.collect_leaves(&mut fresh);
        let awaiting: Vec<TaskId> = fresh.iter().map(|chunk| chunk.id()).collect();

        let old = mem::replace(node, grown);
        self.changes.deleted += retire(old, &awaiting, &mut *self.queue)?;
        self.changes.splits += 1;
        Ok(())
    }

    fn collapse(&mut self, node: &mut ChunkNode, path: ChunkPath) -> Result<(), ForgeError> {
        let chunk = PlanetChunk::create(path, self.direction, self.model, &mut *self.queue)?;
        let awaiting = [chunk.id()];
        self.changes.created += 1;

        let old = mem::replace(node, ChunkNode::Leaf(chunk));
        self.changes.deleted += retire(old, &awaiting, &mut *self.queue)?;
        self.changes.collapses += 1;
        Ok(())
    }
}
