//! Worker-side construction of a chunk's displaced grid mesh.

use std::sync::atomic::{AtomicBool, Ordering};

use cosmos_cubesphere::face_point_on_cube;
use cosmos_terrain::TerrainFunction;
use glam::{DVec2, DVec3};

use crate::{BuildTask, MeshBuffers};

/// Build the mesh of a chunk.
///
/// Samples a `(subdivisions + 1)²` vertex grid over the chunk square,
/// projects every vertex onto the sphere and displaces it with `terrain`.
/// Triangles wind counter-clockwise seen from outside the planet, and normals
/// are the normalized sum of the adjacent face normals.
///
/// `cancelled` is checked between grid rows; returns `None` once it is set.
///
/// # Panics
///
/// Panics if `task.subdivisions` is zero.
#[must_use]
pub fn build_chunk_mesh(
    task: &BuildTask,
    terrain: &TerrainFunction,
    cancelled: &AtomicBool,
) -> Option<MeshBuffers> {
    assert!(task.subdivisions > 0, "chunk needs at least one subdivision");

    let subs = task.subdivisions as usize;
    let per_line = subs + 1;
    let face_side = task.face_side();
    let side_fraction = task.chunk_length / face_side;

    let mut points = Vec::with_capacity(per_line * per_line);
    for row in 0..per_line {
        if cancelled.load(Ordering::Relaxed) {
            return None;
        }
        let v = (row as f64 / subs as f64 - 0.5) * side_fraction;
        for col in 0..per_line {
            let u = (col as f64 / subs as f64 - 0.5) * side_fraction;
            let on_cube = face_point_on_cube(task.direction, task.plane_offset + DVec2::new(u, v), face_side);
            points.push(terrain.displace(on_cube, task.planet_radius) - task.sphere_center);
        }
    }

    let mut indices = Vec::with_capacity(subs * subs * 6);
    for row in 0..subs {
        for col in 0..subs {
            let f0 = (row * per_line + col) as u32;
            let f1 = f0 + 1;
            let f2 = f0 + 1 + per_line as u32;
            let f3 = f0 + per_line as u32;
            indices.extend_from_slice(&[f0, f1, f2, f0, f2, f3]);
        }
    }

    let mut accumulated = vec![DVec3::ZERO; points.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face = (points[b] - points[a]).cross(points[c] - points[a]);
        accumulated[a] += face;
        accumulated[b] += face;
        accumulated[c] += face;
    }

    let mut positions = Vec::with_capacity(points.len() * 3);
    let mut normals = Vec::with_capacity(points.len() * 3);
    for (p, n) in points.iter().zip(&accumulated) {
        let n = n.normalize_or_zero();
        positions.extend_from_slice(&[p.x as f32, p.y as f32, p.z as f32]);
        normals.extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
    }

    Some(MeshBuffers {
        positions,
        normals,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use cosmos_cubesphere::{ChunkPath, Direction, chunk_side_length, chunk_sphere_position};
    use cosmos_terrain::TerrainSettings;

    use super::*;
    use crate::PlanetId;

    const RADIUS: f64 = 1000.0;

    fn task(direction: Direction, path: ChunkPath, subdivisions: u32, settings: TerrainSettings) -> BuildTask {
        let face_side = RADIUS * 2.0;
        BuildTask {
            planet_id: PlanetId(1),
            direction,
            path,
            chunk_length: chunk_side_length(face_side, path.depth()),
            plane_offset: path.plane_offset(),
            sphere_center: chunk_sphere_position(&path, direction, face_side),
            subdivisions,
            planet_radius: RADIUS,
            seed: 42,
            settings,
        }
    }

    fn gentle() -> TerrainSettings {
        TerrainSettings {
            continent_base_height: 20.0,
            max_mountain_height: 50.0,
            max_bump_height: 5.0,
            ..TerrainSettings::default()
        }
    }

    fn vertex(mesh: &MeshBuffers, i: usize) -> DVec3 {
        DVec3::new(
            f64::from(mesh.positions[i * 3]),
            f64::from(mesh.positions[i * 3 + 1]),
            f64::from(mesh.positions[i * 3 + 2]),
        )
    }

    #[test]
    fn test_grid_sizes() {
        let t = task(Direction::Up, ChunkPath::ROOT, 8, TerrainSettings::flat());
        let terrain = TerrainFunction::new(t.seed, t.settings);
        let mesh = build_chunk_mesh(&t, &terrain, &AtomicBool::new(false)).unwrap();
        assert_eq!(mesh.vertex_count(), 81);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        assert_eq!(mesh.triangle_count(), 8 * 8 * 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_flat_terrain_lies_on_base_sphere() {
        let path = ChunkPath::from_quadrants(&[1, 2]);
        let t = task(Direction::Left, path, 6, TerrainSettings::flat());
        let terrain = TerrainFunction::new(t.seed, t.settings);
        let mesh = build_chunk_mesh(&t, &terrain, &AtomicBool::new(false)).unwrap();
        for i in 0..mesh.vertex_count() {
            let world = vertex(&mesh, i) + t.sphere_center;
            assert!((world.length() - RADIUS).abs() < 1e-3);
        }
    }

    #[test]
    fn test_normals_point_outward() {
        for direction in Direction::ALL {
            let t = task(direction, ChunkPath::from_quadrants(&[3]), 4, TerrainSettings::flat());
            let terrain = TerrainFunction::new(t.seed, t.settings);
            let mesh = build_chunk_mesh(&t, &terrain, &AtomicBool::new(false)).unwrap();
            for i in 0..mesh.vertex_count() {
                let world = vertex(&mesh, i) + t.sphere_center;
                let n = DVec3::new(
                    f64::from(mesh.normals[i * 3]),
                    f64::from(mesh.normals[i * 3 + 1]),
                    f64::from(mesh.normals[i * 3 + 2]),
                );
                assert!(n.dot(world.normalize()) > 0.9, "{direction:?} vertex {i}");
            }
        }
    }

    #[test]
    fn test_vertices_match_main_thread_samples() {
        let path = ChunkPath::from_quadrants(&[0, 3]);
        let t = task(Direction::Forward, path, 4, gentle());
        let terrain = TerrainFunction::new(t.seed, t.settings);
        let mesh = build_chunk_mesh(&t, &terrain, &AtomicBool::new(false)).unwrap();
        for i in 0..mesh.vertex_count() {
            let world = vertex(&mesh, i) + t.sphere_center;
            let expected = terrain.surface_radius(world, RADIUS);
            // f32 storage limits agreement to a fraction of a meter.
            assert!((world.length() - expected).abs() < 0.05, "vertex {i}");
        }
    }

    #[test]
    fn test_neighbor_chunks_share_edge_vertices() {
        let parent = ChunkPath::from_quadrants(&[2]);
        let left = task(Direction::Down, parent.child(0), 4, gentle());
        let right = task(Direction::Down, parent.child(1), 4, gentle());
        let terrain = TerrainFunction::new(42, gentle());
        let flag = AtomicBool::new(false);
        let a = build_chunk_mesh(&left, &terrain, &flag).unwrap();
        let b = build_chunk_mesh(&right, &terrain, &flag).unwrap();
        for row in 0..5 {
            let pa = vertex(&a, row * 5 + 4) + left.sphere_center;
            let pb = vertex(&b, row * 5) + right.sphere_center;
            assert!((pa - pb).length() < 0.05, "row {row}: {pa:?} vs {pb:?}");
        }
    }

    #[test]
    fn test_cancelled_build_returns_none() {
        let t = task(Direction::Up, ChunkPath::ROOT, 4, TerrainSettings::flat());
        let terrain = TerrainFunction::new(t.seed, t.settings);
        assert!(build_chunk_mesh(&t, &terrain, &AtomicBool::new(true)).is_none());
    }

    #[test]
    #[should_panic(expected = "at least one subdivision")]
    fn test_zero_subdivisions_panics() {
        let t = task(Direction::Up, ChunkPath::ROOT, 0, TerrainSettings::flat());
        let terrain = TerrainFunction::new(t.seed, t.settings);
        let _ = build_chunk_mesh(&t, &terrain, &AtomicBool::new(false));
    }
}
