//! Scripted descent toward the planet surface.

use cosmos_config::FlightConfig;
use glam::DVec3;

/// Lowest altitude above the displaced surface the observer descends to.
pub const MIN_ALTITUDE_M: f64 = 10.0;

/// Straight radial descent at constant speed along a fixed direction.
#[derive(Clone, Copy, Debug)]
pub struct Descent {
    /// Unit direction from the planet center to the observer.
    pub direction: DVec3,
    pub start_altitude: f64,
    pub speed: f64,
}

impl Descent {
    #[must_use]
    pub fn from_config(flight: &FlightConfig) -> Self {
        Self {
            // Off the face centers, so the descent crosses chunk boundaries.
            direction: DVec3::new(0.31, 1.0, 0.17).normalize(),
            start_altitude: flight.start_altitude_m.max(MIN_ALTITUDE_M),
            speed: flight.descent_speed_m_s.max(0.0),
        }
    }

    /// Altitude above the surface after `t` seconds.
    #[must_use]
    pub fn altitude_at(&self, t: f64) -> f64 {
        (self.start_altitude - self.speed * t).max(MIN_ALTITUDE_M)
    }

    /// Observer position relative to the planet center, given the surface
    /// radius under the descent direction.
    #[must_use]
    pub fn position_at(&self, t: f64, surface_radius: f64) -> DVec3 {
        self.direction * (surface_radius + self.altitude_at(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descent() -> Descent {
        Descent::from_config(&FlightConfig {
            frames: 10,
            frame_dt: 0.5,
            start_altitude_m: 1000.0,
            descent_speed_m_s: 100.0,
        })
    }

    #[test]
    fn test_altitude_decreases_linearly() {
        let d = descent();
        assert!((d.altitude_at(0.0) - 1000.0).abs() < 1e-9);
        assert!((d.altitude_at(2.5) - 750.0).abs() < 1e-9);
    }

    #[test]
    fn test_altitude_clamps_above_surface() {
        let d = descent();
        assert!((d.altitude_at(1e6) - MIN_ALTITUDE_M).abs() < 1e-9);
    }

    #[test]
    fn test_position_is_radial() {
        let d = descent();
        let p = d.position_at(1.0, 5000.0);
        assert!((p.length() - 5900.0).abs() < 1e-9);
        assert!(p.normalize().dot(d.direction) > 1.0 - 1e-12);
    }
}
