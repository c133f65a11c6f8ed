//! Seeded impact craters on airless bodies.

use glam::DVec3;
use rand::Rng;

use crate::seed::planet_rng;

/// Width of the raised rim outside the bowl, relative to the crater radius.
const RIM_WIDTH: f64 = 0.5;
/// Rim height relative to the bowl depth.
const RIM_HEIGHT: f64 = 0.25;

/// One crater on the unit sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Crater {
    /// Unit vector to the crater center.
    pub center: DVec3,
    /// Bowl radius as a chord length on the unit sphere.
    pub radius: f64,
    /// Bowl depth in meters.
    pub depth: f64,
}

impl Crater {
    /// Elevation offset at `unit` (a point on the unit sphere).
    ///
    /// Inside the bowl the profile is a parabola from `-depth` at the center
    /// up to the rim height at the edge; outside it the rim falls back to
    /// zero over `RIM_WIDTH * radius`.
    #[must_use]
    pub fn evaluate(&self, unit: DVec3) -> f64 {
        if self.radius.is_nan() || self.radius <= 0.0 {
            return 0.0;
        }
        let d = (unit - self.center).length() / self.radius;
        let rim = self.depth * RIM_HEIGHT;
        if d < 1.0 {
            -self.depth * (1.0 - d * d) + rim * d * d
        } else if d < 1.0 + RIM_WIDTH {
            let t = 1.0 - (d - 1.0) / RIM_WIDTH;
            rim * t * t
        } else {
            0.0
        }
    }
}

/// Ordered list of craters. The contribution of each crater is summed in
/// generation order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CraterLayer {
    craters: Vec<Crater>,
}

impl CraterLayer {
    /// Wrap an explicit crater list.
    #[must_use]
    pub fn new(craters: Vec<Crater>) -> Self {
        Self { craters }
    }

    /// Place `count` craters uniformly on the sphere from the planet seed.
    ///
    /// Small craters are more frequent than large ones; depth is proportional
    /// to radius.
    #[must_use]
    pub fn generate(seed: u64, count: u32, max_radius: f64, max_depth: f64) -> Self {
        let mut rng = planet_rng(seed, "craters");
        let craters = (0..count)
            .map(|_| {
                let z: f64 = rng.random_range(-1.0..=1.0);
                let phi: f64 = rng.random_range(0.0..std::f64::consts::TAU);
                let r = libm::sqrt((1.0 - z * z).max(0.0));
                let center = DVec3::new(r * libm::cos(phi), r * libm::sin(phi), z);

                let size: f64 = rng.random();
                let scale = 0.1 + 0.9 * size * size * size;
                Crater {
                    center,
                    radius: max_radius * scale,
                    depth: max_depth * scale,
                }
            })
            .collect();
        Self { craters }
    }

    /// Sum of all crater offsets at `unit`.
    #[must_use]
    pub fn evaluate(&self, unit: DVec3) -> f64 {
        self.craters.iter().map(|c| c.evaluate(unit)).sum()
    }

    #[must_use]
    pub fn craters(&self) -> &[Crater] {
        &self.craters
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.craters.is_empty()
    }
}
