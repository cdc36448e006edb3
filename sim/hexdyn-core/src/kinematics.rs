//! Derivative evaluation for the momentum-form rigid body equations.
//!
//! ```text
//! ẋ = P / m
//! q̇ = ½ · (0, ω) ⊗ q,    ω = R · I_body⁻¹ · Rᵗ · L
//! Ṗ = m·g + Σ F
//! L̇ = Σ τ + Σ r × F
//! ```

use hexdyn_types::{BoxGeometry, ExternalForce, Gravity, Quaternion, State, StateDerivative, Vector3};

/// Everything needed to evaluate `F(s)` for the body: its mass properties
/// and the forces acting on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dynamics {
    geometry: BoxGeometry,
    gravity: Gravity,
    forces: Vec<ExternalForce>,
}

impl Dynamics {
    /// Dynamics under gravity alone.
    #[must_use]
    pub fn new(geometry: BoxGeometry, gravity: Gravity) -> Self {
        Self {
            geometry,
            gravity,
            forces: Vec::new(),
        }
    }

    /// Add a constant external force (builder form).
    #[must_use]
    pub fn with_force(mut self, force: ExternalForce) -> Self {
        self.forces.push(force);
        self
    }

    /// Add a constant external force.
    pub fn add_force(&mut self, force: ExternalForce) {
        self.forces.push(force);
    }

    /// Remove all external forces. Gravity stays.
    pub fn clear_forces(&mut self) {
        self.forces.clear();
    }

    /// The body's geometry and mass properties.
    #[must_use]
    pub fn geometry(&self) -> &BoxGeometry {
        &self.geometry
    }

    /// The gravitational field.
    #[must_use]
    pub fn gravity(&self) -> &Gravity {
        &self.gravity
    }

    /// External forces currently applied.
    #[must_use]
    pub fn forces(&self) -> &[ExternalForce] {
        &self.forces
    }

    /// Net force: `m·g` plus every external force.
    #[must_use]
    pub fn net_force(&self) -> Vector3<f64> {
        self.forces
            .iter()
            .fold(self.gravity.force_on_mass(self.geometry.mass()), |acc, f| acc + f.force)
    }

    /// Net torque about the center of mass.
    #[must_use]
    pub fn net_torque(&self) -> Vector3<f64> {
        self.forces
            .iter()
            .fold(Vector3::zeros(), |acc, f| acc + f.total_torque())
    }

    /// Evaluate `F(s)`.
    ///
    /// The rotation used for the world inertia is taken from the normalized
    /// orientation; the orientation rate is built from `s.orientation` as
    /// stored, so a drifting norm is carried through until commit.
    #[must_use]
    pub fn derivative(&self, state: &State) -> StateDerivative {
        let rotation = state.rotation();
        let omega = self.geometry.inverse_inertia_world(&rotation) * state.angular_momentum;

        StateDerivative {
            velocity: state.linear_momentum * self.geometry.inverse_mass(),
            orientation_rate: orientation_rate(&state.orientation, &omega),
            force: self.net_force(),
            torque: self.net_torque(),
        }
    }
}

/// `q̇ = ½ · (0, ω) ⊗ q` for a world-frame angular velocity.
#[must_use]
pub fn orientation_rate(orientation: &Quaternion<f64>, omega: &Vector3<f64>) -> Quaternion<f64> {
    Quaternion::from_imag(*omega) * orientation * 0.5
}
