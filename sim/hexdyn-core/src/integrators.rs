//! Numerical integration methods for the rigid body state.
//!
//! Every method takes the current state `s` and its derivative `k1 = F(s)`,
//! which the caller has already evaluated, and returns a *tentative* next
//! state. Nothing is committed here: the orientation is left unnormalized and
//! collision handling has not yet run.
//!
//! # Integration Methods
//!
//! - **Explicit Euler**: `s + k1·h`
//! - **Semi-Implicit Euler**: momenta first, then pose with the new velocities
//! - **RK2 (midpoint)**: `s + F(s + k1·h/2)·h`
//!
//! # Example
//!
//! ```
//! use hexdyn_core::integrators::{ExplicitEuler, Integrator};
//! use hexdyn_core::Dynamics;
//! use hexdyn_types::{BoxGeometry, Gravity, State};
//! use nalgebra::{Point3, UnitQuaternion, Vector3};
//!
//! let geometry = BoxGeometry::cube(1.0, 0.5).unwrap();
//! let dynamics = Dynamics::new(geometry, Gravity::custom(Vector3::new(0.0, 0.0, -10.0)));
//! let state = State::at_rest(Point3::new(0.0, 0.0, 10.0), UnitQuaternion::identity());
//!
//! let k1 = dynamics.derivative(&state);
//! let next = ExplicitEuler::integrate(&dynamics, &state, &k1, 0.01);
//!
//! // Explicit Euler moves with the old (zero) velocity
//! assert_eq!(next.position.z, 10.0);
//! assert!(next.linear_momentum.z < 0.0);
//! ```

use hexdyn_types::{IntegrationMethod, State, StateDerivative};

use crate::kinematics::Dynamics;

/// Trait for integration methods.
pub trait Integrator {
    /// Produce the tentative state after `h` seconds.
    ///
    /// # Arguments
    ///
    /// * `dynamics` - Derivative evaluator for any further stages
    /// * `state` - Current state
    /// * `derivative` - `F(state)`, already evaluated
    /// * `h` - Timestep in seconds
    fn integrate(
        dynamics: &Dynamics,
        state: &State,
        derivative: &StateDerivative,
        h: f64,
    ) -> State;
}

/// Dispatch to the appropriate integrator based on method enum.
#[must_use]
pub fn integrate_with_method(
    method: IntegrationMethod,
    dynamics: &Dynamics,
    state: &State,
    derivative: &StateDerivative,
    h: f64,
) -> State {
    match method {
        IntegrationMethod::ExplicitEuler => ExplicitEuler::integrate(dynamics, state, derivative, h),
        IntegrationMethod::SemiImplicitEuler => {
            SemiImplicitEuler::integrate(dynamics, state, derivative, h)
        }
        IntegrationMethod::RungeKutta2 => RungeKutta2::integrate(dynamics, state, derivative, h),
    }
}

/// Explicit Euler integration (first-order).
///
/// ```text
/// s(t+h) = s(t) + F(s(t)) * h
/// ```
pub struct ExplicitEuler;

impl Integrator for ExplicitEuler {
    fn integrate(
        _dynamics: &Dynamics,
        state: &State,
        derivative: &StateDerivative,
        h: f64,
    ) -> State {
        state.advance(derivative, h)
    }
}

/// Semi-implicit Euler integration (symplectic Euler).
///
/// Momenta are updated first, then the pose moves with the velocities
/// implied by the new momenta.
///
/// ```text
/// P(t+h) = P(t) + F * h
/// L(t+h) = L(t) + τ * h
/// x(t+h) = x(t) + P(t+h)/m * h
/// q(t+h) = q(t) + ½·(0, ω(t+h))⊗q(t) * h
/// ```
pub struct SemiImplicitEuler;

impl Integrator for SemiImplicitEuler {
    fn integrate(
        dynamics: &Dynamics,
        state: &State,
        derivative: &StateDerivative,
        h: f64,
    ) -> State {
        let kicked = state.with_momenta(
            state.linear_momentum + derivative.force * h,
            state.angular_momentum + derivative.torque * h,
        );
        let drift = dynamics.derivative(&kicked);

        State {
            position: state.position + drift.velocity * h,
            orientation: state.orientation + drift.orientation_rate * h,
            ..kicked
        }
    }
}

/// Second-order Runge-Kutta integration (midpoint method).
///
/// ```text
/// k1 = F(s)
/// k2 = F(s + k1 * h/2)
/// s(t+h) = s(t) + k2 * h
/// ```
pub struct RungeKutta2;

impl Integrator for RungeKutta2 {
    fn integrate(
        dynamics: &Dynamics,
        state: &State,
        derivative: &StateDerivative,
        h: f64,
    ) -> State {
        let midpoint = state.advance(derivative, 0.5 * h);
        let k2 = dynamics.derivative(&midpoint);
        state.advance(&k2, h)
    }
}
