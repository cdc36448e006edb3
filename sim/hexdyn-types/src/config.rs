//! Configuration types for simulation.
//!
//! Everything here is read once when the solver is built. The defaults
//! reproduce the reference scene: a 128-unit world cube, a box of
//! 128/5 x 128/6 x 128/7 released at 80% of the world height, gravity of 20
//! units/s² and a restitution of 0.5.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::{BoxGeometry, Color, Edge, Gravity, Plane, RenderFrame, SimError, State, VERTEX_COUNT};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const WORLD_EDGE: f64 = 128.0;

/// Main configuration for a simulation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// Fixed timestep (seconds).
    pub timestep: f64,
    /// Gravity field.
    pub gravity: Gravity,
    /// Coefficient of restitution in `[0, 1]`.
    pub restitution: f64,
    /// Integration method.
    pub integration: IntegrationMethod,
    /// Body shape and mass.
    pub body: BodyConfig,
    /// Initial pose and velocities.
    pub initial: InitialConditions,
    /// Collision scene and active tests.
    pub collision: CollisionConfig,
    /// Mapping used for render-space vertices.
    pub render: RenderFrame,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timestep: 0.01,
            gravity: Gravity::custom(Vector3::new(0.0, 0.0, -20.0)),
            restitution: 0.5,
            integration: IntegrationMethod::RungeKutta2,
            body: BodyConfig::default(),
            initial: InitialConditions::default(),
            collision: CollisionConfig::default(),
            render: RenderFrame::new(WORLD_EDGE),
        }
    }
}

impl SimulationConfig {
    /// Create a default config with the given timestep.
    #[must_use]
    pub fn with_timestep(timestep: f64) -> Self {
        Self {
            timestep,
            ..Default::default()
        }
    }

    /// Free fall of a mass-12 body under `g = (0, 0, -10)`, explicit Euler,
    /// `h = 0.01`, no collisions.
    #[must_use]
    pub fn free_fall() -> Self {
        Self {
            timestep: 0.01,
            gravity: Gravity::custom(Vector3::new(0.0, 0.0, -10.0)),
            integration: IntegrationMethod::ExplicitEuler,
            body: BodyConfig {
                mass: 12.0,
                ..BodyConfig::default()
            },
            ..Default::default()
        }
        .without_contacts()
    }

    /// Set the timestep.
    #[must_use]
    pub fn timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    /// Set the gravity.
    #[must_use]
    pub fn gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    /// Disable gravity.
    #[must_use]
    pub fn zero_gravity(mut self) -> Self {
        self.gravity = Gravity::zero();
        self
    }

    /// Set the coefficient of restitution.
    #[must_use]
    pub fn restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the integration method.
    #[must_use]
    pub fn integration(mut self, method: IntegrationMethod) -> Self {
        self.integration = method;
        self
    }

    /// Set the body configuration.
    #[must_use]
    pub fn body(mut self, body: BodyConfig) -> Self {
        self.body = body;
        self
    }

    /// Set the initial conditions.
    #[must_use]
    pub fn initial(mut self, initial: InitialConditions) -> Self {
        self.initial = initial;
        self
    }

    /// Select which collision tests run.
    #[must_use]
    pub fn collision_mode(mut self, mode: CollisionMode) -> Self {
        self.collision.mode = mode;
        self
    }

    /// Disable collision detection.
    #[must_use]
    pub fn without_contacts(self) -> Self {
        self.collision_mode(CollisionMode::Disabled)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidTimestep`] for a non-positive or
    /// non-finite timestep, [`SimError::InvalidMassProperties`] for a bad
    /// body, and [`SimError::InvalidConfig`] for anything else.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(SimError::InvalidTimestep(self.timestep));
        }

        if !self.gravity.acceleration.iter().all(|g| g.is_finite()) {
            return Err(SimError::invalid_config("gravity must be finite"));
        }

        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(SimError::invalid_config(format!(
                "restitution must be between 0 and 1, got {}",
                self.restitution
            )));
        }

        if !self.render.world_edge.is_finite() || self.render.world_edge <= 0.0 {
            return Err(SimError::invalid_config("render world edge must be positive"));
        }

        self.body.validate()?;
        self.initial.validate()?;
        self.collision.validate()?;

        Ok(())
    }

    /// Get the step frequency in Hz.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        1.0 / self.timestep
    }
}

/// Shape, mass, and color of the simulated box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BodyConfig {
    /// Total mass.
    pub mass: f64,
    /// Half-extents along the body axes.
    pub half_extents: Vector3<f64>,
    /// Vertex color.
    pub color: Color,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            mass: 12.0,
            half_extents: Vector3::new(WORLD_EDGE / 10.0, WORLD_EDGE / 12.0, WORLD_EDGE / 14.0),
            color: BoxGeometry::DEFAULT_COLOR,
        }
    }
}

impl BodyConfig {
    /// A cube of the given mass and half edge.
    #[must_use]
    pub fn cube(mass: f64, half_edge: f64) -> Self {
        Self {
            mass,
            half_extents: Vector3::repeat(half_edge),
            ..Default::default()
        }
    }

    /// Build the immutable geometry.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidMassProperties`] for a non-positive mass
    /// or extent.
    pub fn geometry(&self) -> crate::Result<BoxGeometry> {
        Ok(BoxGeometry::new(self.mass, self.half_extents)?.with_color(self.color))
    }

    fn validate(&self) -> crate::Result<()> {
        self.geometry().map(|_| ())
    }
}

/// Initial pose and velocities of the body.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InitialConditions {
    /// Center of mass position.
    pub position: Point3<f64>,
    /// Orientation.
    pub orientation: UnitQuaternion<f64>,
    /// Linear velocity.
    pub linear_velocity: Vector3<f64>,
    /// Angular velocity, world frame.
    pub angular_velocity: Vector3<f64>,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            position: Point3::new(WORLD_EDGE * 0.5, WORLD_EDGE * 0.5, WORLD_EDGE * 0.8),
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }
}

impl InitialConditions {
    /// At rest at `position` with identity orientation.
    #[must_use]
    pub fn at(position: Point3<f64>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Set the orientation.
    #[must_use]
    pub fn oriented(mut self, orientation: UnitQuaternion<f64>) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the linear and angular velocity.
    #[must_use]
    pub fn moving(mut self, linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    /// The starting state for a body with `geometry`.
    #[must_use]
    pub fn state(&self, geometry: &BoxGeometry) -> State {
        State::from_velocities(
            self.position,
            self.orientation,
            self.linear_velocity,
            self.angular_velocity,
            geometry,
        )
    }

    fn validate(&self) -> crate::Result<()> {
        let finite = self.position.coords.iter().all(|x| x.is_finite())
            && self.orientation.coords.iter().all(|x| x.is_finite())
            && self.linear_velocity.iter().all(|x| x.is_finite())
            && self.angular_velocity.iter().all(|x| x.is_finite());
        if !finite {
            return Err(SimError::invalid_config("initial conditions must be finite"));
        }

        if (self.orientation.norm() - 1.0).abs() > 1e-6 {
            return Err(SimError::invalid_config(
                "initial orientation must be a unit quaternion",
            ));
        }

        Ok(())
    }
}

/// Collision scene: which tests run and what they test against.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CollisionConfig {
    /// Active tests.
    pub mode: CollisionMode,
    /// Fixed reference edge for the edge-edge test.
    pub reference_edge: Edge,
    /// Static plane for the vertex-face test.
    pub ground: Plane,
    /// Body vertices forming the moving edge (start, end).
    pub edge_vertices: [usize; 2],
}

impl Default for CollisionConfig {
    fn default() -> Self {
        let frame = RenderFrame::new(WORLD_EDGE);
        Self {
            mode: CollisionMode::VertexFace,
            reference_edge: Edge::from_points(
                frame.from_render(&Point3::new(-0.1, 0.1, -0.2)),
                frame.from_render(&Point3::new(0.1, 0.5, 0.4)),
            ),
            ground: Plane::ground(0.0),
            edge_vertices: [2, 3],
        }
    }
}

impl CollisionConfig {
    fn validate(&self) -> crate::Result<()> {
        let [a, b] = self.edge_vertices;
        if a >= VERTEX_COUNT || b >= VERTEX_COUNT || a == b {
            return Err(SimError::invalid_config(format!(
                "edge vertices must be two distinct indices below {VERTEX_COUNT}, got [{a}, {b}]"
            )));
        }

        let edge = &self.reference_edge;
        if !edge.point.coords.iter().all(|x| x.is_finite())
            || !edge.direction.iter().all(|x| x.is_finite())
            || edge.length() <= 0.0
        {
            return Err(SimError::invalid_config(
                "reference edge must be finite with non-zero length",
            ));
        }

        let ground = &self.ground;
        if !ground.point.coords.iter().all(|x| x.is_finite())
            || (ground.normal.norm() - 1.0).abs() > 1e-6
        {
            return Err(SimError::invalid_config(
                "ground plane must be finite with a unit normal",
            ));
        }

        Ok(())
    }
}

/// Integration method for dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum IntegrationMethod {
    /// Explicit Euler: `s + F(s)·h`.
    ExplicitEuler,
    /// Semi-implicit Euler: momenta first, then pose from the new momenta.
    SemiImplicitEuler,
    /// Second-order Runge-Kutta (midpoint method).
    RungeKutta2,
}

impl IntegrationMethod {
    /// All methods, in declaration order.
    pub const ALL: [Self; 3] = [Self::ExplicitEuler, Self::SemiImplicitEuler, Self::RungeKutta2];

    /// Order of accuracy.
    #[must_use]
    pub const fn order(self) -> usize {
        match self {
            Self::ExplicitEuler | Self::SemiImplicitEuler => 1,
            Self::RungeKutta2 => 2,
        }
    }

    /// Number of derivative evaluations per step.
    #[must_use]
    pub const fn evaluations(self) -> usize {
        match self {
            Self::ExplicitEuler => 1,
            Self::SemiImplicitEuler | Self::RungeKutta2 => 2,
        }
    }

    /// Stable identifier, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExplicitEuler => "explicit-euler",
            Self::SemiImplicitEuler => "semi-implicit-euler",
            Self::RungeKutta2 => "rk2",
        }
    }
}

impl fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExplicitEuler => write!(f, "Explicit Euler"),
            Self::SemiImplicitEuler => write!(f, "Semi-Implicit Euler"),
            Self::RungeKutta2 => write!(f, "RK2"),
        }
    }
}

impl FromStr for IntegrationMethod {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "explicit-euler" | "euler" | "ex-euler" => Ok(Self::ExplicitEuler),
            "semi-implicit-euler" | "im-euler" | "symplectic-euler" => Ok(Self::SemiImplicitEuler),
            "rk2" | "midpoint" | "runge-kutta-2" => Ok(Self::RungeKutta2),
            other => Err(SimError::invalid_config(format!(
                "unknown integration method '{other}'"
            ))),
        }
    }
}

/// Which collision tests run each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum CollisionMode {
    /// No collision detection.
    Disabled,
    /// Body edge against the fixed reference edge.
    EdgeEdge,
    /// Body vertices against the ground plane.
    #[default]
    VertexFace,
    /// Both tests, contacts merged.
    Both,
}

impl CollisionMode {
    /// Whether the edge-edge test runs.
    #[must_use]
    pub const fn edge_edge(self) -> bool {
        matches!(self, Self::EdgeEdge | Self::Both)
    }

    /// Whether the vertex-face test runs.
    #[must_use]
    pub const fn vertex_face(self) -> bool {
        matches!(self, Self::VertexFace | Self::Both)
    }

    /// Stable identifier, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::EdgeEdge => "edge-edge",
            Self::VertexFace => "vertex-face",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for CollisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CollisionMode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            "edge-edge" | "edge" => Ok(Self::EdgeEdge),
            "vertex-face" | "ground" => Ok(Self::VertexFace),
            "both" | "all" => Ok(Self::Both),
            other => Err(SimError::invalid_config(format!(
                "unknown collision mode '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.timestep, 0.01, epsilon = 1e-12);
        assert_relative_eq!(config.restitution, 0.5);
        assert_relative_eq!(config.initial.position.z, 102.4, epsilon = 1e-12);
        assert_eq!(config.collision.mode, CollisionMode::VertexFace);
    }

    #[test]
    fn test_default_reference_edge() {
        let edge = CollisionConfig::default().reference_edge;
        assert_relative_eq!(edge.point, Point3::new(57.6, 70.4, 51.2), epsilon = 1e-10);
        assert_relative_eq!(edge.end(), Point3::new(70.4, 96.0, 89.6), epsilon = 1e-10);
    }

    #[test]
    fn test_free_fall_preset() {
        let config = SimulationConfig::free_fall();
        assert!(config.validate().is_ok());
        assert_eq!(config.integration, IntegrationMethod::ExplicitEuler);
        assert_eq!(config.collision.mode, CollisionMode::Disabled);
        assert_relative_eq!(config.body.mass, 12.0);
        assert_relative_eq!(config.gravity.acceleration.z, -10.0);
    }

    #[test]
    fn test_config_builder() {
        let config = SimulationConfig::with_timestep(0.001)
            .zero_gravity()
            .restitution(1.0)
            .integration(IntegrationMethod::SemiImplicitEuler)
            .collision_mode(CollisionMode::Both);

        assert_relative_eq!(config.timestep, 0.001);
        assert!(config.gravity.is_zero());
        assert_relative_eq!(config.frequency(), 1000.0, epsilon = 1e-9);
        assert!(config.collision.mode.edge_edge());
        assert!(config.collision.mode.vertex_face());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimulationConfig::default();

        config.timestep = -0.01;
        assert_eq!(config.validate(), Err(SimError::InvalidTimestep(-0.01)));
        config.timestep = 0.0;
        assert!(config.validate().is_err());
        config.timestep = f64::NAN;
        assert!(config.validate().is_err());
        config.timestep = 0.01;

        config.restitution = 1.5;
        assert!(config.validate().unwrap_err().is_config_error());
        config.restitution = 0.5;

        config.body.mass = 0.0;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidMassProperties { .. })
        ));
        config.body.mass = 12.0;

        config.collision.edge_vertices = [3, 3];
        assert!(config.validate().is_err());
        config.collision.edge_vertices = [2, 8];
        assert!(config.validate().is_err());
        config.collision.edge_vertices = [2, 3];

        config.initial.position.x = f64::INFINITY;
        assert!(config.validate().is_err());
        config.initial.position.x = 0.0;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_initial_state() {
        let body = BodyConfig::cube(2.0, 0.5);
        let geom = body.geometry().unwrap();
        let initial = InitialConditions::at(Point3::new(0.0, 0.0, 3.0))
            .moving(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0));

        let state = initial.state(&geom);
        assert_relative_eq!(state.linear_momentum.x, 2.0);
        // I = m/12 * (1 + 1) = 1/3 about every axis
        assert_relative_eq!(state.angular_momentum.z, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_integration_method() {
        assert_eq!(IntegrationMethod::ExplicitEuler.order(), 1);
        assert_eq!(IntegrationMethod::RungeKutta2.order(), 2);
        assert_eq!(IntegrationMethod::RungeKutta2.evaluations(), 2);

        for method in IntegrationMethod::ALL {
            assert_eq!(method.name().parse::<IntegrationMethod>().unwrap(), method);
        }
        assert_eq!("euler".parse::<IntegrationMethod>().unwrap(), IntegrationMethod::ExplicitEuler);
        assert!("rk4".parse::<IntegrationMethod>().is_err());
        assert_eq!(IntegrationMethod::RungeKutta2.to_string(), "RK2");
    }

    #[test]
    fn test_collision_mode() {
        assert!(!CollisionMode::Disabled.edge_edge());
        assert!(!CollisionMode::Disabled.vertex_face());
        assert!(CollisionMode::EdgeEdge.edge_edge());
        assert!(!CollisionMode::EdgeEdge.vertex_face());

        assert_eq!("vertex_face".parse::<CollisionMode>().unwrap(), CollisionMode::VertexFace);
        assert_eq!("Both".parse::<CollisionMode>().unwrap(), CollisionMode::Both);
        assert!("sometimes".parse::<CollisionMode>().is_err());
    }
}
