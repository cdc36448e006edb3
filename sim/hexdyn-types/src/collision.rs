//! Collision primitives: edges, planes, and detected contacts.

use nalgebra::{Point3, Unit, Vector3};

use crate::{Result, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A finite segment `point + s·direction` for `s ∈ [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    /// Start of the segment.
    pub point: Point3<f64>,
    /// Vector from the start to the end of the segment.
    pub direction: Vector3<f64>,
}

impl Edge {
    /// Create an edge from a start point and a direction.
    #[must_use]
    pub const fn new(point: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { point, direction }
    }

    /// Create the edge running from `start` to `end`.
    #[must_use]
    pub fn from_points(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self {
            point: start,
            direction: end - start,
        }
    }

    /// Point at parameter `s` along the edge.
    #[must_use]
    pub fn point_at(&self, s: f64) -> Point3<f64> {
        self.point + self.direction * s
    }

    /// End point of the segment.
    #[must_use]
    pub fn end(&self) -> Point3<f64> {
        self.point_at(1.0)
    }

    /// Segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.direction.norm()
    }
}

/// A static plane through `point` with unit `normal`.
///
/// The positive half-space is the side the normal points into.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plane {
    /// Any point on the plane.
    pub point: Point3<f64>,
    /// Unit normal.
    pub normal: Unit<Vector3<f64>>,
}

impl Plane {
    /// Create a plane, normalizing `normal`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the normal has (near) zero
    /// length.
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Result<Self> {
        let normal = Unit::try_new(normal, 1e-12)
            .ok_or_else(|| SimError::invalid_config("plane normal must be non-zero"))?;
        Ok(Self { point, normal })
    }

    /// Horizontal plane `z = height` facing up.
    #[must_use]
    pub fn ground(height: f64) -> Self {
        Self {
            point: Point3::new(0.0, 0.0, height),
            normal: Vector3::z_axis(),
        }
    }

    /// Signed distance from the plane, positive on the normal side.
    #[must_use]
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.point).dot(&*self.normal)
    }
}

/// A single contact found by the detector.
///
/// An empty contact list is the "no contact" result.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Contact {
    /// Contact point relative to the center of mass (`r_a = p - x`).
    pub offset: Vector3<f64>,
    /// Contact normal, world frame, unit length.
    pub normal: Vector3<f64>,
}

impl Contact {
    /// Create a contact.
    #[must_use]
    pub const fn new(offset: Vector3<f64>, normal: Vector3<f64>) -> Self {
        Self { offset, normal }
    }

    /// World-space contact point given the center of mass.
    #[must_use]
    pub fn world_point(&self, center_of_mass: &Point3<f64>) -> Point3<f64> {
        center_of_mass + self.offset
    }
}
