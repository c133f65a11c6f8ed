//! Quadtree paths: the sequence of quadrant choices from a face root to a chunk.

use std::fmt;

use glam::DVec2;

/// Deepest path a [`ChunkPath`] can encode (two bits per level in a `u64`).
pub const MAX_PATH_DEPTH: u8 = 32;

/// Index of a child quadrant, `0..4`.
///
/// Winding follows the face's local `(u, v)` axes:
/// `0 = (u-, v-)`, `1 = (u+, v-)`, `2 = (u-, v+)`, `3 = (u+, v+)`.
pub type Quadrant = u8;

/// Path of quadrant indices from the root of a face tree.
///
/// The empty path is the root and covers the whole face. Each quadrant
/// halves the side length of the covered square.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ChunkPath {
    depth: u8,
    bits: u64,
}

impl ChunkPath {
    /// The root path (depth 0).
    pub const ROOT: ChunkPath = ChunkPath { depth: 0, bits: 0 };

    /// Build a path from a list of quadrants, root first.
    ///
    /// # Panics
    ///
    /// Panics if a quadrant is `>= 4` or the list is deeper than [`MAX_PATH_DEPTH`].
    #[must_use]
    pub fn from_quadrants(quadrants: &[Quadrant]) -> Self {
        quadrants
            .iter()
            .fold(Self::ROOT, |path, &quadrant| path.child(quadrant))
    }

    /// Number of levels below the root.
    #[must_use]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// The path of child `quadrant` of this node.
    ///
    /// # Panics
    ///
    /// Panics if `quadrant >= 4` or the path is already at [`MAX_PATH_DEPTH`].
    #[must_use]
    pub fn child(&self, quadrant: Quadrant) -> Self {
        assert!(quadrant < 4, "quadrant {quadrant} out of range");
        assert!(
            self.depth < MAX_PATH_DEPTH,
            "path depth {} exceeds MAX_PATH_DEPTH",
            self.depth
        );
        Self {
            depth: self.depth + 1,
            bits: self.bits | (u64::from(quadrant) << (2 * u32::from(self.depth))),
        }
    }

    /// All four child paths in winding order.
    #[must_use]
    pub fn children(&self) -> [ChunkPath; 4] {
        [self.child(0), self.child(1), self.child(2), self.child(3)]
    }

    /// The parent path, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<ChunkPath> {
        if self.depth == 0 {
            return None;
        }
        let depth = self.depth - 1;
        let mask = if depth == 0 {
            0
        } else {
            u64::MAX >> (64 - 2 * u32::from(depth))
        };
        Some(Self {
            depth,
            bits: self.bits & mask,
        })
    }

    /// Quadrant chosen at `level` (0 = first step below the root).
    ///
    /// # Panics
    ///
    /// Panics if `level >= depth`.
    #[must_use]
    pub fn quadrant(&self, level: u8) -> Quadrant {
        assert!(level < self.depth, "level {level} beyond depth {}", self.depth);
        ((self.bits >> (2 * u32::from(level))) & 0b11) as Quadrant
    }

    /// Iterate over the quadrants from the root down.
    pub fn quadrants(&self) -> impl Iterator<Item = Quadrant> + '_ {
        (0..self.depth).map(|level| self.quadrant(level))
    }

    /// Returns `true` if `self` is `other` or one of its ancestors.
    #[must_use]
    pub fn is_prefix_of(&self, other: &ChunkPath) -> bool {
        if self.depth > other.depth {
            return false;
        }
        self.quadrants().zip(other.quadrants()).all(|(a, b)| a == b)
    }

    /// Side of the covered square as a fraction of the face side (`0.5^depth`).
    #[must_use]
    pub fn side_fraction(&self) -> f64 {
        0.5_f64.powi(i32::from(self.depth))
    }

    /// Center of the covered square in face-plane units.
    ///
    /// The face spans `[-0.5, 0.5]` on both axes, so the root center is `(0, 0)`.
    /// Each level moves the center by a quarter of the parent side along `u` and `v`.
    #[must_use]
    pub fn plane_offset(&self) -> DVec2 {
        let mut offset = DVec2::ZERO;
        let mut quarter = 0.25;
        for quadrant in self.quadrants() {
            let du = if quadrant & 1 == 0 { -quarter } else { quarter };
            let dv = if quadrant & 2 == 0 { -quarter } else { quarter };
            offset += DVec2::new(du, dv);
            quarter *= 0.5;
        }
        offset
    }

    /// Bounds of the covered square in face UV space `[0, 1]`.
    ///
    /// Returns `(u_min, v_min, u_max, v_max)`.
    #[must_use]
    pub fn uv_bounds(&self) -> (f64, f64, f64, f64) {
        let center = self.plane_offset() + DVec2::splat(0.5);
        let half = self.side_fraction() * 0.5;
        (
            center.x - half,
            center.y - half,
            center.x + half,
            center.y + half,
        )
    }

    /// The quadrant of this node that contains the face UV point.
    #[must_use]
    pub fn quadrant_containing(&self, u: f64, v: f64) -> Quadrant {
        let (u_min, v_min, u_max, v_max) = self.uv_bounds();
        let u_bit = u8::from(u >= (u_min + u_max) * 0.5);
        let v_bit = u8::from(v >= (v_min + v_max) * 0.5);
        u_bit | (v_bit << 1)
    }
}

impl fmt::Debug for ChunkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkPath{self}")
    }
}

impl fmt::Display for ChunkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, quadrant) in self.quadrants().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{quadrant}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_root_covers_entire_face() {
        let (u_min, v_min, u_max, v_max) = ChunkPath::ROOT.uv_bounds();
        assert!(u_min.abs() < EPSILON);
        assert!(v_min.abs() < EPSILON);
        assert!((u_max - 1.0).abs() < EPSILON);
        assert!((v_max - 1.0).abs() < EPSILON);
        assert!(ChunkPath::ROOT.is_root());
    }

    #[test]
    fn test_child_parent_round_trip() {
        let path = ChunkPath::from_quadrants(&[3, 0, 2, 1]);
        assert_eq!(path.depth(), 4);
        assert_eq!(path.quadrants().collect::<Vec<_>>(), vec![3, 0, 2, 1]);
        assert_eq!(path.parent(), Some(ChunkPath::from_quadrants(&[3, 0, 2])));
        for quadrant in 0..4 {
            assert_eq!(path.child(quadrant).parent(), Some(path));
        }
        assert_eq!(ChunkPath::ROOT.parent(), None);
    }

    #[test]
    fn test_paths_differing_only_in_depth_are_distinct() {
        // Quadrant 0 encodes as zero bits, so depth must be part of identity.
        let a = ChunkPath::from_quadrants(&[0]);
        let b = ChunkPath::from_quadrants(&[0, 0]);
        assert_ne!(a, b);
        assert_ne!(ChunkPath::ROOT, a);
    }

    #[test]
    fn test_quadrant_winding_matches_uv_axes() {
        let expected = [(-0.25, -0.25), (0.25, -0.25), (-0.25, 0.25), (0.25, 0.25)];
        for (quadrant, (u, v)) in expected.into_iter().enumerate() {
            let offset = ChunkPath::ROOT.child(quadrant as u8).plane_offset();
            assert!((offset.x - u).abs() < EPSILON, "quadrant {quadrant} u");
            assert!((offset.y - v).abs() < EPSILON, "quadrant {quadrant} v");
        }
    }

    #[test]
    fn test_quadrant_containing_inverts_child() {
        let parent = ChunkPath::from_quadrants(&[1, 2]);
        for quadrant in 0..4 {
            let child = parent.child(quadrant);
            let center = child.plane_offset() + DVec2::splat(0.5);
            assert_eq!(parent.quadrant_containing(center.x, center.y), quadrant);
        }
    }

    #[test]
    fn test_is_prefix_of() {
        let a = ChunkPath::from_quadrants(&[1]);
        let b = ChunkPath::from_quadrants(&[1, 3, 0]);
        let c = ChunkPath::from_quadrants(&[2, 3]);
        assert!(ChunkPath::ROOT.is_prefix_of(&b));
        assert!(a.is_prefix_of(&b));
        assert!(b.is_prefix_of(&b));
        assert!(!b.is_prefix_of(&a));
        assert!(!a.is_prefix_of(&c));
    }

    #[test]
    fn test_max_depth_path_is_representable() {
        let quadrants = vec![3; MAX_PATH_DEPTH as usize];
        let path = ChunkPath::from_quadrants(&quadrants);
        assert_eq!(path.depth(), MAX_PATH_DEPTH);
        assert_eq!(path.quadrant(MAX_PATH_DEPTH - 1), 3);
    }

    #[test]
    #[should_panic(expected = "exceeds MAX_PATH_DEPTH")]
    fn test_child_past_max_depth_panics() {
        let path = ChunkPath::from_quadrants(&vec![0; MAX_PATH_DEPTH as usize]);
        let _ = path.child(0);
    }

    #[test]
    fn test_display() {
        assert_eq!(ChunkPath::ROOT.to_string(), "[]");
        assert_eq!(ChunkPath::from_quadrants(&[0, 3, 1]).to_string(), "[0,3,1]");
    }
}
