//! Mapping from (face, chunk path) to positions in planet-local space.
//!
//! A planet of radius `r` uses a cube of side `face_side = 2r`. The chunk trees
//! and the mesh workers both go through these functions, so a path always
//! lands on the same square no matter which side computes it.

use glam::{DVec2, DVec3};

use crate::{ChunkPath, Direction};

/// Side length of a chunk at `depth` on a face of side `face_side`.
#[inline]
#[must_use]
pub fn chunk_side_length(face_side: f64, depth: u8) -> f64 {
    face_side * 0.5_f64.powi(i32::from(depth))
}

/// Point on the cube surface for a face-plane offset.
///
/// `offset` is in face-plane units (`[-0.5, 0.5]` spans the face).
#[inline]
#[must_use]
pub fn face_point_on_cube(direction: Direction, offset: DVec2, face_side: f64) -> DVec3 {
    (direction.normal() * 0.5 + direction.tangent() * offset.x + direction.bitangent() * offset.y)
        * face_side
}

/// Point on the base sphere (radius `face_side / 2`) for a face-plane offset.
#[inline]
#[must_use]
pub fn face_point_on_sphere(direction: Direction, offset: DVec2, face_side: f64) -> DVec3 {
    face_point_on_cube(direction, offset, face_side).normalize() * (face_side * 0.5)
}

/// Center of a chunk on the cube surface.
#[must_use]
pub fn chunk_cube_position(path: &ChunkPath, direction: Direction, face_side: f64) -> DVec3 {
    face_point_on_cube(direction, path.plane_offset(), face_side)
}

/// Center of a chunk projected on the base sphere, in planet-local space.
#[must_use]
pub fn chunk_sphere_position(path: &ChunkPath, direction: Direction, face_side: f64) -> DVec3 {
    face_point_on_sphere(direction, path.plane_offset(), face_side)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACE_SIDE: f64 = 1000.0;
    const EPSILON: f64 = 1e-9;

    fn all_paths(depth: u8) -> Vec<ChunkPath> {
        let mut paths = vec![ChunkPath::ROOT];
        for _ in 0..depth {
            paths = paths.iter().flat_map(|p| p.children()).collect();
        }
        paths
    }

    /// Axis-aligned square in face-plane units: (u_min, v_min, u_max, v_max).
    fn plane_square(path: &ChunkPath) -> (f64, f64, f64, f64) {
        let c = path.plane_offset();
        let h = path.side_fraction() * 0.5;
        (c.x - h, c.y - h, c.x + h, c.y + h)
    }

    fn overlap_area(a: (f64, f64, f64, f64), b: (f64, f64, f64, f64)) -> f64 {
        let w = (a.2.min(b.2) - a.0.max(b.0)).max(0.0);
        let h = (a.3.min(b.3) - a.1.max(b.1)).max(0.0);
        w * h
    }

    #[test]
    fn test_children_tile_parent_at_every_depth() {
        for depth in 0..6 {
            for parent in all_paths(depth) {
                let p = plane_square(&parent);
                let parent_area = (p.2 - p.0) * (p.3 - p.1);
                let children: Vec<_> = parent.children().iter().map(plane_square).collect();

                let child_area: f64 = children.iter().map(|c| (c.2 - c.0) * (c.3 - c.1)).sum();
                assert!(
                    (child_area - parent_area).abs() < EPSILON,
                    "children of {parent} cover {child_area}, parent {parent_area}"
                );

                for (i, a) in children.iter().enumerate() {
                    for b in &children[i + 1..] {
                        assert!(overlap_area(*a, *b) < EPSILON, "children of {parent} overlap");
                    }
                }

                let u_min = children.iter().map(|c| c.0).fold(f64::MAX, f64::min);
                let v_min = children.iter().map(|c| c.1).fold(f64::MAX, f64::min);
                let u_max = children.iter().map(|c| c.2).fold(f64::MIN, f64::max);
                let v_max = children.iter().map(|c| c.3).fold(f64::MIN, f64::max);
                assert!((u_min - p.0).abs() < EPSILON);
                assert!((v_min - p.1).abs() < EPSILON);
                assert!((u_max - p.2).abs() < EPSILON);
                assert!((v_max - p.3).abs() < EPSILON);
            }
        }
    }

    #[test]
    fn test_siblings_share_edges_on_the_cube() {
        let parent = ChunkPath::from_quadrants(&[2, 1]);
        let side = chunk_side_length(FACE_SIDE, parent.depth() + 1);
        for direction in Direction::ALL {
            let c = parent.children().map(|p| chunk_cube_position(&p, direction, FACE_SIDE));
            // 0 -> 1 moves one child side along the tangent, 0 -> 2 along the bitangent.
            assert!(((c[1] - c[0]) - direction.tangent() * side).length() < EPSILON);
            assert!(((c[2] - c[0]) - direction.bitangent() * side).length() < EPSILON);
            assert!(((c[3] - c[2]) - direction.tangent() * side).length() < EPSILON);
        }
    }

    #[test]
    fn test_sphere_position_lies_on_base_radius() {
        let radius = FACE_SIDE * 0.5;
        for direction in Direction::ALL {
            for path in all_paths(3) {
                let p = chunk_sphere_position(&path, direction, FACE_SIDE);
                assert!((p.length() - radius).abs() < EPSILON);
                assert!(p.dot(direction.normal()) > 0.0);
            }
        }
    }

    #[test]
    fn test_root_center_is_face_normal() {
        for direction in Direction::ALL {
            let p = chunk_sphere_position(&ChunkPath::ROOT, direction, FACE_SIDE);
            assert!((p - direction.normal() * FACE_SIDE * 0.5).length() < EPSILON);
        }
    }

    #[test]
    fn test_adjacent_faces_meet_at_shared_edge() {
        // The u+ edge of Forward (+Z) is the u- edge of Right (+X).
        let a = face_point_on_cube(Direction::Forward, DVec2::new(0.5, 0.1), FACE_SIDE);
        let b = face_point_on_cube(Direction::Right, DVec2::new(-0.5, 0.1), FACE_SIDE);
        assert!((a - b).length() < EPSILON, "{a:?} vs {b:?}");
    }

    #[test]
    fn test_chunk_side_length_halves_per_depth() {
        assert!((chunk_side_length(FACE_SIDE, 0) - FACE_SIDE).abs() < EPSILON);
        assert!((chunk_side_length(FACE_SIDE, 3) - FACE_SIDE / 8.0).abs() < EPSILON);
    }
}
