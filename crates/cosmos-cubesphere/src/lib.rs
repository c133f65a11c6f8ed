//! Cube-sphere geometry shared by the chunk trees and the forge workers:
//! cube face directions, quadtree chunk paths, and path-to-position mapping.

mod chunk_path;
mod direction;
mod placement;

pub use chunk_path::{ChunkPath, MAX_PATH_DEPTH, Quadrant};
pub use direction::Direction;
pub use placement::{
    chunk_cube_position, chunk_side_length, chunk_sphere_position, face_point_on_cube,
    face_point_on_sphere,
};
