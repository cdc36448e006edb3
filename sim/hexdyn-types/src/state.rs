//! Rigid body state and its time derivative.
//!
//! The state is expressed in momenta rather than velocities: linear momentum
//! `P` and world-frame angular momentum `L`. Velocities are derived on demand
//! from the mass properties in [`BoxGeometry`].

use std::ops::{Add, Mul};

use nalgebra::{Point3, Quaternion, UnitQuaternion, Vector3};

use crate::BoxGeometry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Quaternions with a norm below this cannot be re-normalized.
pub const MIN_QUATERNION_NORM: f64 = 1e-12;

/// Physical state of the body.
///
/// The orientation is stored as a raw quaternion because intermediate states
/// produced by the integrators drift off the unit sphere. It is unit length
/// at every committed step boundary.
///
/// # Example
///
/// ```
/// use hexdyn_types::{BoxGeometry, State};
/// use nalgebra::{Point3, UnitQuaternion, Vector3};
///
/// let geom = BoxGeometry::cube(2.0, 0.5).unwrap();
/// let state = State::from_velocities(
///     Point3::new(0.0, 0.0, 5.0),
///     UnitQuaternion::identity(),
///     Vector3::new(1.0, 0.0, 0.0),
///     Vector3::zeros(),
///     &geom,
/// );
///
/// assert_eq!(state.linear_momentum.x, 2.0);
/// assert_eq!(state.velocity(&geom).x, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct State {
    /// Position of the center of mass, world frame.
    pub position: Point3<f64>,
    /// Orientation (body to world).
    pub orientation: Quaternion<f64>,
    /// Linear momentum, world frame.
    pub linear_momentum: Vector3<f64>,
    /// Angular momentum about the center of mass, world frame.
    pub angular_momentum: Vector3<f64>,
}

impl Default for State {
    fn default() -> Self {
        Self::at_rest(Point3::origin(), UnitQuaternion::identity())
    }
}

impl State {
    /// Create a state from position, orientation, and momenta.
    #[must_use]
    pub fn new(
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
        linear_momentum: Vector3<f64>,
        angular_momentum: Vector3<f64>,
    ) -> Self {
        Self {
            position,
            orientation: orientation.into_inner(),
            linear_momentum,
            angular_momentum,
        }
    }

    /// Create a state at rest.
    #[must_use]
    pub fn at_rest(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self::new(position, orientation, Vector3::zeros(), Vector3::zeros())
    }

    /// Create a state from linear and angular velocity.
    ///
    /// `P = m·v` and `L = I_world·ω`, with the world inertia taken at the
    /// given orientation.
    #[must_use]
    pub fn from_velocities(
        position: Point3<f64>,
        orientation: UnitQuaternion<f64>,
        linear_velocity: Vector3<f64>,
        angular_velocity: Vector3<f64>,
        geometry: &BoxGeometry,
    ) -> Self {
        let inertia = geometry.inertia_world(&orientation);
        Self::new(
            position,
            orientation,
            linear_velocity * geometry.mass(),
            inertia * angular_velocity,
        )
    }

    /// Orientation as a unit quaternion.
    ///
    /// Intermediate (non-unit) orientations are normalized first. A
    /// degenerate quaternion maps to the identity; [`State::normalized`] is
    /// the checked path used at commit time.
    #[must_use]
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::try_new(self.orientation, MIN_QUATERNION_NORM)
            .unwrap_or_else(UnitQuaternion::identity)
    }

    /// Linear velocity `P / m`.
    #[must_use]
    pub fn velocity(&self, geometry: &BoxGeometry) -> Vector3<f64> {
        self.linear_momentum * geometry.inverse_mass()
    }

    /// Angular velocity `I_world⁻¹ · L`.
    #[must_use]
    pub fn angular_velocity(&self, geometry: &BoxGeometry) -> Vector3<f64> {
        geometry.inverse_inertia_world(&self.rotation()) * self.angular_momentum
    }

    /// Velocity of a point at `offset` from the center of mass.
    #[must_use]
    pub fn velocity_at(&self, offset: &Vector3<f64>, geometry: &BoxGeometry) -> Vector3<f64> {
        self.velocity(geometry) + self.angular_velocity(geometry).cross(offset)
    }

    /// Kinetic energy `P²/2m + ½ L·ω`.
    #[must_use]
    pub fn kinetic_energy(&self, geometry: &BoxGeometry) -> f64 {
        let linear = 0.5 * self.linear_momentum.norm_squared() * geometry.inverse_mass();
        let angular = 0.5 * self.angular_momentum.dot(&self.angular_velocity(geometry));
        linear + angular
    }

    /// Same state with the orientation scaled back to unit length.
    ///
    /// Returns `None` if the quaternion is too small or not finite to be
    /// normalized.
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.orientation.norm();
        if !norm.is_finite() || norm < MIN_QUATERNION_NORM {
            return None;
        }
        Some(Self {
            orientation: self.orientation / norm,
            ..*self
        })
    }

    /// Check if the state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|x| x.is_finite())
            && self.orientation.coords.iter().all(|x| x.is_finite())
            && self.linear_momentum.iter().all(|x| x.is_finite())
            && self.angular_momentum.iter().all(|x| x.is_finite())
    }

    /// Advance this state along `derivative` for `h` seconds.
    #[must_use]
    pub fn advance(&self, derivative: &StateDerivative, h: f64) -> Self {
        *self + derivative.scale(h)
    }

    /// Same pose with replaced momenta.
    #[must_use]
    pub fn with_momenta(&self, linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self {
            linear_momentum: linear,
            angular_momentum: angular,
            ..*self
        }
    }
}

/// Rate of change of a [`State`].
///
/// Scaled by a step size it becomes an increment that can be added to a
/// state; this is the only arithmetic the integrators need.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateDerivative {
    /// Linear velocity of the center of mass.
    pub velocity: Vector3<f64>,
    /// Quaternion rate `½ · (0, ω) ⊗ q`.
    pub orientation_rate: Quaternion<f64>,
    /// Net force (rate of change of linear momentum).
    pub force: Vector3<f64>,
    /// Net torque (rate of change of angular momentum).
    pub torque: Vector3<f64>,
}

impl Default for StateDerivative {
    fn default() -> Self {
        Self::zero()
    }
}

impl StateDerivative {
    /// A derivative that leaves the state unchanged.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            velocity: Vector3::zeros(),
            orientation_rate: Quaternion::new(0.0, 0.0, 0.0, 0.0),
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }

    /// Scale every component by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            velocity: self.velocity * factor,
            orientation_rate: self.orientation_rate * factor,
            force: self.force * factor,
            torque: self.torque * factor,
        }
    }

    /// Check if the derivative contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.velocity.iter().all(|x| x.is_finite())
            && self.orientation_rate.coords.iter().all(|x| x.is_finite())
            && self.force.iter().all(|x| x.is_finite())
            && self.torque.iter().all(|x| x.is_finite())
    }
}

impl Mul<f64> for StateDerivative {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.scale(rhs)
    }
}

impl Add<StateDerivative> for State {
    type Output = Self;

    fn add(self, rhs: StateDerivative) -> Self {
        Self {
            position: self.position + rhs.velocity,
            orientation: self.orientation + rhs.orientation_rate,
            linear_momentum: self.linear_momentum + rhs.force,
            angular_momentum: self.angular_momentum + rhs.torque,
        }
    }
}
