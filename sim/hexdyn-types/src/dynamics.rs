//! Force inputs: gravity and externally applied forces.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Uniform gravitational field.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gravity {
    /// Acceleration due to gravity.
    pub acceleration: Vector3<f64>,
}

impl Gravity {
    /// Zero gravity.
    #[must_use]
    pub fn zero() -> Self {
        Self::custom(Vector3::zeros())
    }

    /// Custom gravity vector.
    #[must_use]
    pub fn custom(acceleration: Vector3<f64>) -> Self {
        Self { acceleration }
    }

    /// Gravitational force `m·g` on a body.
    #[must_use]
    pub fn force_on_mass(&self, mass: f64) -> Vector3<f64> {
        self.acceleration * mass
    }

    /// Check whether the field is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.acceleration.iter().all(|a| *a == 0.0)
    }
}

/// A force and/or torque applied to the body for the whole step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExternalForce {
    /// Force vector, world frame.
    pub force: Vector3<f64>,
    /// Pure torque, world frame.
    pub torque: Vector3<f64>,
    /// Point of application relative to the center of mass. `None` means
    /// the force acts at the center of mass and produces no torque.
    pub offset: Option<Vector3<f64>>,
}

impl ExternalForce {
    /// Force acting at the center of mass.
    #[must_use]
    pub fn at_com(force: Vector3<f64>) -> Self {
        Self {
            force,
            torque: Vector3::zeros(),
            offset: None,
        }
    }

    /// Force acting at `offset` from the center of mass.
    #[must_use]
    pub fn at_offset(force: Vector3<f64>, offset: Vector3<f64>) -> Self {
        Self {
            force,
            torque: Vector3::zeros(),
            offset: Some(offset),
        }
    }

    /// Pure torque.
    #[must_use]
    pub fn torque_only(torque: Vector3<f64>) -> Self {
        Self {
            force: Vector3::zeros(),
            torque,
            offset: None,
        }
    }

    /// Total torque about the center of mass: `τ + r × F`.
    #[must_use]
    pub fn total_torque(&self) -> Vector3<f64> {
        match self.offset {
            Some(r) => self.torque + r.cross(&self.force),
            None => self.torque,
        }
    }
}
