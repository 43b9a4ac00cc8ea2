//! Galactic coordinates in light-years.

use serde::{Deserialize, Serialize};

/// A point in galactic space. Distances are light-years.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        dz.mul_add(dz, dy.mul_add(dy, dx * dx)).sqrt()
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Move up to `max_step` toward `target`, landing exactly on it when the
    /// remaining distance fits inside the step.
    #[must_use]
    pub fn step_toward(self, target: Self, max_step: f64) -> Self {
        let distance = self.distance_to(target);
        if distance <= max_step || distance <= f64::EPSILON {
            return target;
        }
        let scale = max_step / distance;
        Self {
            x: (target.x - self.x).mul_add(scale, self.x),
            y: (target.y - self.y).mul_add(scale, self.y),
            z: (target.z - self.z).mul_add(scale, self.z),
        }
    }
}
