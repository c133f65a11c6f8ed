//! Chunk visibility: view frustum and planet horizon tests.
//!
//! Both tests work on bounding spheres in world space. The frustum rejects
//! chunks outside the view; the horizon rejects chunks hidden behind the
//! curvature of the planet, which at low altitude is about half of them.

use glam::{DMat4, DVec3, DVec4};

/// Result of testing a volume against a frustum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intersection {
    Outside,
    Intersecting,
    Inside,
}

/// View frustum as six inward-facing planes, extracted with the
/// Gribb/Hartmann method.
#[derive(Clone, Debug)]
pub struct Frustum {
    /// `(nx, ny, nz, d)` per plane.
    planes: [DVec4; 6],
}

impl Frustum {
    /// Extract the planes of a view-projection matrix with a `[0, 1]` depth
    /// range.
    #[must_use]
    pub fn from_view_proj(vp: &DMat4) -> Self {
        let row0 = vp.row(0);
        let row1 = vp.row(1);
        let row2 = vp.row(2);
        let row3 = vp.row(3);

        let mut planes = [
            row3 + row0, // left
            row3 - row0, // right
            row3 + row1, // bottom
            row3 - row1, // top
            row2,        // near
            row3 - row2, // far
        ];
        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 1e-12 {
                *plane /= len;
            }
        }
        Self { planes }
    }

    /// Test a sphere against the frustum.
    #[must_use]
    pub fn test_sphere(&self, center: DVec3, radius: f64) -> Intersection {
        let mut all_inside = true;
        for plane in &self.planes {
            let distance = plane.truncate().dot(center) + plane.w;
            if distance < -radius {
                return Intersection::Outside;
            }
            if distance < radius {
                all_inside = false;
            }
        }
        if all_inside {
            Intersection::Inside
        } else {
            Intersection::Intersecting
        }
    }
}

/// Horizon test for a spherical planet seen from one camera position.
#[derive(Clone, Debug)]
pub struct HorizonCuller {
    camera_pos: DVec3,
    planet_center: DVec3,
    radius: f64,
    camera_distance: f64,
    /// `r / d`: cosine of the angle, seen from the planet center, between the
    /// camera and the horizon circle.
    cos_horizon: f64,
}

impl HorizonCuller {
    #[must_use]
    pub fn new(camera_pos: DVec3, planet_center: DVec3, radius: f64) -> Self {
        let camera_distance = (camera_pos - planet_center).length();
        let cos_horizon = if camera_distance > radius {
            radius / camera_distance
        } else {
            0.0
        };
        Self {
            camera_pos,
            planet_center,
            radius,
            camera_distance,
            cos_horizon,
        }
    }

    /// Returns `false` only if the whole bounding sphere is below the horizon.
    ///
    /// A surface point is visible when the angle between it and the camera,
    /// seen from the planet center, is under the horizon angle. The bounding
    /// sphere widens that angle by `asin(radius / distance)`.
    #[must_use]
    pub fn is_above_horizon(&self, chunk_center: DVec3, chunk_radius: f64) -> bool {
        if self.camera_distance <= self.radius {
            return true;
        }
        let to_chunk = chunk_center - self.planet_center;
        let chunk_dist = to_chunk.length();
        if chunk_dist <= chunk_radius {
            return true;
        }
        let to_camera = self.camera_pos - self.planet_center;
        let cos_angle = to_chunk.dot(to_camera) / (chunk_dist * self.camera_distance);

        let sin_margin = chunk_radius / chunk_dist;
        let cos_margin = (1.0 - sin_margin * sin_margin).max(0.0).sqrt();
        let sin_horizon = (1.0 - self.cos_horizon * self.cos_horizon).max(0.0).sqrt();
        let cos_threshold = self.cos_horizon * cos_margin - sin_horizon * sin_margin;

        cos_angle >= cos_threshold
    }

    /// Straight-line distance from the camera to the horizon.
    #[must_use]
    pub fn horizon_distance(&self) -> f64 {
        if self.camera_distance <= self.radius {
            return 0.0;
        }
        (self.camera_distance * self.camera_distance - self.radius * self.radius).sqrt()
    }
}

/// What the culling pass knows about the camera.
#[derive(Clone, Debug)]
pub struct CameraView {
    /// Camera position in world space.
    pub position: DVec3,
    /// View-projection matrix, or `None` for an omnidirectional observer
    /// (only the horizon test applies).
    pub view_proj: Option<DMat4>,
}

impl CameraView {
    #[must_use]
    pub fn omnidirectional(position: DVec3) -> Self {
        Self {
            position,
            view_proj: None,
        }
    }
}

/// Combined frustum and horizon test for the chunks of one planet.
#[derive(Clone, Debug)]
pub struct ChunkCuller {
    frustum: Option<Frustum>,
    horizon: HorizonCuller,
}

impl ChunkCuller {
    #[must_use]
    pub fn new(camera: &CameraView, planet_center: DVec3, radius: f64) -> Self {
        Self {
            frustum: camera.view_proj.as_ref().map(Frustum::from_view_proj),
            horizon: HorizonCuller::new(camera.position, planet_center, radius),
        }
    }

    /// Returns `true` if a chunk with this world-space bounding sphere may
    /// be visible.
    #[must_use]
    pub fn is_visible(&self, center: DVec3, radius: f64) -> bool {
        if !self.horizon.is_above_horizon(center, radius) {
            return false;
        }
        self.frustum
            .as_ref()
            .is_none_or(|f| f.test_sphere(center, radius) != Intersection::Outside)
    }

    #[must_use]
    pub fn horizon(&self) -> &HorizonCuller {
        &self.horizon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: f64 = 6_400_000.0;

    fn culler(altitude: f64) -> HorizonCuller {
        HorizonCuller::new(DVec3::new(0.0, RADIUS + altitude, 0.0), DVec3::ZERO, RADIUS)
    }

    fn looking_down_neg_z() -> DMat4 {
        let view = DMat4::look_at_rh(DVec3::ZERO, DVec3::NEG_Z, DVec3::Y);
        let proj = DMat4::perspective_rh(std::f64::consts::FRAC_PI_2, 1.0, 0.1, 1000.0);
        proj * view
    }

    #[test]
    fn test_chunk_below_camera_is_visible() {
        assert!(culler(1000.0).is_above_horizon(DVec3::new(0.0, RADIUS, 0.0), 100.0));
    }

    #[test]
    fn test_far_side_is_culled() {
        assert!(!culler(1000.0).is_above_horizon(DVec3::new(0.0, -RADIUS, 0.0), 100.0));
    }

    #[test]
    fn test_large_bounding_sphere_reaches_over_horizon() {
        let c = culler(1000.0);
        // 90 degrees around the planet is well below the horizon at 1 km.
        let chunk = DVec3::new(RADIUS, 0.0, 0.0);
        assert!(!c.is_above_horizon(chunk, 1000.0));
        assert!(c.is_above_horizon(chunk, RADIUS * 1.5));
    }

    #[test]
    fn test_camera_inside_planet_sees_everything() {
        let c = HorizonCuller::new(DVec3::ZERO, DVec3::ZERO, RADIUS);
        assert!(c.is_above_horizon(DVec3::new(0.0, -RADIUS, 0.0), 1.0));
        assert_eq!(c.horizon_distance(), 0.0);
    }

    #[test]
    fn test_horizon_distance() {
        let c = culler(1000.0);
        let expected = ((RADIUS + 1000.0).powi(2) - RADIUS * RADIUS).sqrt();
        assert!((c.horizon_distance() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_frustum_classifies_spheres() {
        let frustum = Frustum::from_view_proj(&looking_down_neg_z());
        assert_eq!(
            frustum.test_sphere(DVec3::new(0.0, 0.0, -10.0), 1.0),
            Intersection::Inside
        );
        assert_eq!(
            frustum.test_sphere(DVec3::new(0.0, 0.0, 10.0), 1.0),
            Intersection::Outside
        );
        assert_eq!(
            frustum.test_sphere(DVec3::new(0.0, 0.0, -1000.0), 5.0),
            Intersection::Intersecting
        );
    }

    #[test]
    fn test_chunk_culler_without_frustum_uses_horizon_only() {
        let camera = CameraView::omnidirectional(DVec3::new(0.0, RADIUS + 1000.0, 0.0));
        let culler = ChunkCuller::new(&camera, DVec3::ZERO, RADIUS);
        assert!(culler.is_visible(DVec3::new(0.0, RADIUS, 0.0), 10.0));
        assert!(!culler.is_visible(DVec3::new(0.0, -RADIUS, 0.0), 10.0));
    }
}
