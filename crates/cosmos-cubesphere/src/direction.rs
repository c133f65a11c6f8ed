//! The six cube faces of a planet and their local basis vectors.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Direction of the outward normal of one cube face.
///
/// Every planet surface is built from six chunk trees, one per direction.
/// The basis is right-handed: `tangent × bitangent == normal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// +Y face
    Up = 0,
    /// −Y face
    Down = 1,
    /// +Z face
    Forward = 2,
    /// −Z face
    Backward = 3,
    /// +X face
    Right = 4,
    /// −X face
    Left = 5,
}

impl Direction {
    /// All six faces in the order a planet creates its trees.
    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::Forward,
        Direction::Backward,
        Direction::Right,
        Direction::Left,
    ];

    /// Index of this face in [`Self::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The opposite face (e.g. `Up` → `Down`).
    #[must_use]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
        }
    }

    /// Outward-pointing unit normal for this face.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        match self {
            Direction::Up => DVec3::Y,
            Direction::Down => DVec3::NEG_Y,
            Direction::Forward => DVec3::Z,
            Direction::Backward => DVec3::NEG_Z,
            Direction::Right => DVec3::X,
            Direction::Left => DVec3::NEG_X,
        }
    }

    /// Direction of increasing `u` on this face.
    #[must_use]
    pub fn tangent(self) -> DVec3 {
        match self {
            Direction::Up => DVec3::X,
            Direction::Down => DVec3::X,
            Direction::Forward => DVec3::X,
            Direction::Backward => DVec3::NEG_X,
            Direction::Right => DVec3::NEG_Z,
            Direction::Left => DVec3::Z,
        }
    }

    /// Direction of increasing `v` on this face.
    #[must_use]
    pub fn bitangent(self) -> DVec3 {
        match self {
            Direction::Up => DVec3::NEG_Z,
            Direction::Down => DVec3::Z,
            Direction::Forward => DVec3::Y,
            Direction::Backward => DVec3::Y,
            Direction::Right => DVec3::Y,
            Direction::Left => DVec3::Y,
        }
    }
}
