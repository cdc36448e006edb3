//! Dynamics, integration, and the fixed-step solver for a rigid hexahedron.
//!
//! This crate advances a single box under gravity, colliding with one fixed
//! reference edge and a ground plane. It builds on [`hexdyn_types`] for the
//! data structures and [`hexdyn_contact`] for collision handling.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Solver                              │
//! │  Idle → Integrating → CollisionCheck → Resolving →          │
//! │         Committing → Idle          (or Halted on divergence) │
//! └──────────────┬───────────────────────────────┬──────────────┘
//!                │                               │
//!                ▼                               ▼
//! ┌──────────────────────────────┐ ┌────────────────────────────┐
//! │         Integrators          │ │       hexdyn-contact        │
//! │  Euler, Semi-Implicit, RK2   │ │  CollisionDetector          │
//! └──────────────┬───────────────┘ │  ImpulseResolver            │
//!                │                 └────────────────────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │          Dynamics            │
//! │  F(s): velocities, q̇, forces │
//! └──────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use hexdyn_core::Solver;
//! use hexdyn_types::{IntegrationMethod, SimulationConfig};
//!
//! let config = SimulationConfig::default().integration(IntegrationMethod::RungeKutta2);
//! let mut solver = Solver::new(config).unwrap();
//!
//! // Run for 2 seconds of simulation time
//! let states = solver.run_for(2.0).unwrap();
//! assert_eq!(states.len(), 200);
//!
//! // Vertices for drawing
//! let vertices = solver.current_render_vertices();
//! let indices = solver.mesh_indices();
//! assert_eq!(vertices.len(), 8);
//! assert_eq!(indices.len(), 36);
//! ```
//!
//! # Integration Methods
//!
//! | Method | Order | Evaluations | Best For |
//! |--------|-------|-------------|----------|
//! | Explicit Euler | 1 | 1 | Reference results |
//! | Semi-Implicit Euler | 1 | 2 | Long runs, bounded energy drift |
//! | RK2 (midpoint) | 2 | 2 | Accuracy |
//!
//! # Contacts
//!
//! Contacts are found by a sign change over the step and resolved with an
//! instantaneous impulse applied to the pre-step momenta. The committed state
//! after a contact keeps the pre-step pose.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
)]

pub mod integrators;
mod kinematics;
mod solver;

pub use integrators::{integrate_with_method, Integrator};
pub use kinematics::{orientation_rate, Dynamics};
pub use solver::{Solver, SolverPhase, StepReport};

// Re-export commonly used types
pub use hexdyn_contact::{ContactImpulse, Resolution};
pub use hexdyn_types::{
    IntegrationMethod, Result, SimError, SimulationConfig, State, StateDerivative,
};
