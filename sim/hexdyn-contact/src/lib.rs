//! Collision detection and impulse response for a single rigid box.
//!
//! This crate sits between the dynamics and the solver: given the current
//! state and the tentative next state produced by an integrator, it decides
//! whether the body struck an obstacle during the step and, if so, how its
//! momenta change.
//!
//! # Detection
//!
//! Two tests are available, selected by [`CollisionMode`]:
//!
//! - **Edge-edge**: one body edge against a fixed reference edge
//! - **Vertex-face**: every body corner against a static ground plane
//!
//! Both are sign-change tests. A feature that is on the same side of the
//! obstacle at both states is not in contact, no matter how close it is.
//!
//! # Response
//!
//! The response is a frictionless instantaneous impulse along each contact
//! normal:
//!
//! ```text
//! j = -(1 + e) · v_in / (1/m + (r × n) · I⁻¹ (r × n))
//! ```
//!
//! where `v_in` is the normal velocity of the contact point and `e` the
//! coefficient of restitution. Simultaneous contacts that share a normal
//! take one impulse at their mean offset, shared among them. Impulses for
//! different normals are summed.
//!
//! # Example
//!
//! ```
//! use hexdyn_contact::{CollisionDetector, ImpulseResolver};
//! use hexdyn_types::{BoxGeometry, CollisionConfig, State, StateDerivative};
//! use nalgebra::{Point3, UnitQuaternion, Vector3};
//!
//! let geometry = BoxGeometry::cube(1.0, 0.5).unwrap();
//! let detector = CollisionDetector::new(CollisionConfig::default());
//!
//! let current = State::from_velocities(
//!     Point3::new(0.0, 0.0, 0.55),
//!     UnitQuaternion::identity(),
//!     Vector3::new(0.0, 0.0, -10.0),
//!     Vector3::zeros(),
//!     &geometry,
//! );
//! let next = State { position: Point3::new(0.0, 0.0, 0.45), ..current };
//!
//! let contacts = detector.detect(&geometry, &current, &next);
//! assert_eq!(contacts.len(), 4);
//!
//! let derivative = StateDerivative {
//!     velocity: current.velocity(&geometry),
//!     ..StateDerivative::zero()
//! };
//! let resolution = ImpulseResolver::new(1.0).resolve(&current, &derivative, &geometry, &contacts);
//!
//! // Four corners, one elastic bounce
//! assert!((resolution.state.velocity(&geometry).z - 10.0).abs() < 1e-9);
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod detector;
mod resolver;

pub use detector::{
    crosses, edge_edge_test, vertex_face_test, CollisionDetector, DEGENERACY_EPSILON,
};
pub use resolver::{ContactImpulse, ImpulseResolver, Resolution};

// Re-export types needed for contact handling
pub use hexdyn_types::{CollisionConfig, CollisionMode, Contact, Edge, Plane};
