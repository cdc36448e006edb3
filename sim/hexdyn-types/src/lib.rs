//! Core types for single rigid-body hexahedron simulation.
//!
//! This crate provides the data the rest of the workspace passes around:
//!
//! - [`BoxGeometry`] - Body-frame corners, mesh indices, and inertia of the box
//! - [`State`] / [`StateDerivative`] - Pose and momenta, and their rate of change
//! - [`Edge`], [`Plane`], [`Contact`] - Collision primitives and results
//! - [`SimulationConfig`] - Timestep, gravity, restitution, integrator, scene
//! - [`SimError`] - Configuration and divergence errors
//!
//! # Design Philosophy
//!
//! These types are plain data with the arithmetic the integrators need and
//! nothing else. Dynamics live in `hexdyn-core`, collision handling in
//! `hexdyn-contact`.
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use hexdyn_types::{SimulationConfig, State};
//!
//! let config = SimulationConfig::default();
//! config.validate().unwrap();
//!
//! let geometry = config.body.geometry().unwrap();
//! let state: State = config.initial.state(&geometry);
//!
//! assert!(state.is_finite());
//! assert!(state.linear_momentum.norm() < 1e-12);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
)]

mod collision;
mod config;
mod dynamics;
mod error;
mod geometry;
mod render;
mod state;

pub use collision::{Contact, Edge, Plane};
pub use config::{
    BodyConfig, CollisionConfig, CollisionMode, InitialConditions, IntegrationMethod,
    SimulationConfig,
};
pub use dynamics::{ExternalForce, Gravity};
pub use error::SimError;
pub use geometry::{BoxGeometry, Color, MESH_INDICES, VERTEX_COUNT};
pub use render::RenderFrame;
pub use state::{State, StateDerivative, MIN_QUATERNION_NORM};

// Re-export math types for convenience
pub use nalgebra::{Matrix3, Point3, Quaternion, UnitQuaternion, Vector3};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(all(test, feature = "serde"))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_round_trip() {
        let config = SimulationConfig::default().integration(IntegrationMethod::ExplicitEuler);
        let json = serde_json::to_string(&config).unwrap();
        let back: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "timestep": 0.005, "integration": "explicit-euler", "body": { "mass": 3.0 } }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.timestep, 0.005);
        assert_eq!(config.integration, IntegrationMethod::ExplicitEuler);
        assert_eq!(config.body.mass, 3.0);
        assert_eq!(config.body.half_extents, BodyConfig::default().half_extents);
        assert_eq!(config.restitution, SimulationConfig::default().restitution);
    }
}
