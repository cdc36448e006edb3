//! Fixed-step simulation loop for the hexahedron.
//!
//! The [`Solver`] owns the body state and advances it one tick at a time:
//! integrate to a tentative state, check for contacts between the current
//! and tentative states, resolve them if any, then normalize and commit.
//!
//! # Example
//!
//! ```
//! use hexdyn_core::Solver;
//! use hexdyn_types::SimulationConfig;
//!
//! let mut solver = Solver::new(SimulationConfig::free_fall()).unwrap();
//! let start = solver.current_state().position.z;
//!
//! for _ in 0..100 {
//!     solver.advance_one_step().unwrap();
//! }
//!
//! // One second of fall at g = 10
//! assert!((start - solver.current_state().position.z - 4.95).abs() < 1e-9);
//! assert_eq!(solver.tick(), 100);
//! ```

use std::fmt;

use hexdyn_contact::{CollisionDetector, ImpulseResolver, Resolution};
use hexdyn_types::{
    BoxGeometry, Color, Contact, ExternalForce, Point3, Result, SimError, SimulationConfig, State,
};
use tracing::{debug, error, trace};

use crate::integrators::integrate_with_method;
use crate::kinematics::Dynamics;

/// Where the solver is within a tick.
///
/// Outside of [`Solver::advance_one_step`] the solver is always either
/// `Idle` or `Halted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverPhase {
    /// Waiting for the next tick.
    Idle,
    /// Computing the tentative next state.
    Integrating,
    /// Testing the step for contacts.
    CollisionCheck,
    /// Applying contact impulses.
    Resolving,
    /// Normalizing and validating the new state.
    Committing,
    /// A previous tick diverged. No further ticks are possible.
    Halted,
}

impl fmt::Display for SolverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Integrating => "integrating",
            Self::CollisionCheck => "collision-check",
            Self::Resolving => "resolving",
            Self::Committing => "committing",
            Self::Halted => "halted",
        };
        f.write_str(name)
    }
}

/// Summary of one committed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Tick count after this step.
    pub tick: u64,
    /// Simulation time after this step.
    pub time: f64,
    /// The committed state.
    pub state: State,
    /// Contacts found during the step. Empty if none.
    pub contacts: Vec<Contact>,
    /// Impulse breakdown, present when contacts were resolved.
    pub resolution: Option<Resolution>,
    /// Kinetic energy of the committed state.
    pub kinetic_energy: f64,
}

impl StepReport {
    /// Whether any contact was found during the step.
    #[must_use]
    pub fn had_contact(&self) -> bool {
        !self.contacts.is_empty()
    }
}

/// Owns the body state and advances it in fixed steps.
#[derive(Debug, Clone)]
pub struct Solver {
    config: SimulationConfig,
    dynamics: Dynamics,
    detector: CollisionDetector,
    resolver: ImpulseResolver,
    state: State,
    phase: SolverPhase,
    tick: u64,
    time: f64,
}

impl Solver {
    /// Build a solver from a configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` fails validation, the body
    /// has invalid mass properties, or the initial state is not finite.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let geometry = config.body.geometry()?;
        let state = config.initial.state(&geometry);
        if !state.is_finite() {
            return Err(SimError::invalid_config("initial state must be finite"));
        }

        debug!(
            integrator = %config.integration,
            collisions = %config.collision.mode,
            timestep = config.timestep,
            "Created solver"
        );

        Ok(Self {
            dynamics: Dynamics::new(geometry, config.gravity),
            detector: CollisionDetector::new(config.collision),
            resolver: ImpulseResolver::new(config.restitution),
            state,
            phase: SolverPhase::Idle,
            tick: 0,
            time: 0.0,
            config,
        })
    }

    /// The configuration this solver was built from.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Body geometry and mass properties.
    #[must_use]
    pub fn geometry(&self) -> &BoxGeometry {
        self.dynamics.geometry()
    }

    /// Force model used for derivative evaluation.
    #[must_use]
    pub fn dynamics(&self) -> &Dynamics {
        &self.dynamics
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SolverPhase {
        self.phase
    }

    /// Whether a previous tick diverged.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.phase == SolverPhase::Halted
    }

    /// Number of committed ticks.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulation time in seconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Timestep in seconds.
    #[must_use]
    pub fn timestep(&self) -> f64 {
        self.config.timestep
    }

    /// The last committed state.
    #[must_use]
    pub fn current_state(&self) -> &State {
        &self.state
    }

    /// Kinetic energy of the current state.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.state.kinetic_energy(self.geometry())
    }

    /// Replace the current state.
    ///
    /// The orientation is normalized before it is stored.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Halted`] if the solver has halted, or
    /// [`SimError::InvalidConfig`] if `state` is not finite or has a
    /// zero-norm orientation.
    pub fn set_state(&mut self, state: State) -> Result<()> {
        if self.is_halted() {
            return Err(SimError::Halted { tick: self.tick });
        }
        if !state.is_finite() {
            return Err(SimError::invalid_config("state must be finite"));
        }
        self.state = state
            .normalized()
            .ok_or_else(|| SimError::invalid_config("orientation must have non-zero norm"))?;
        Ok(())
    }

    /// Return to the configured initial state at tick zero.
    ///
    /// This also clears a halt.
    pub fn reset(&mut self) {
        self.state = self.config.initial.state(self.dynamics.geometry());
        self.tick = 0;
        self.time = 0.0;
        self.phase = SolverPhase::Idle;
    }

    /// Apply a constant external force from the next tick on.
    pub fn add_force(&mut self, force: ExternalForce) {
        self.dynamics.add_force(force);
    }

    /// Remove all external forces. Gravity stays.
    pub fn clear_forces(&mut self) {
        self.dynamics.clear_forces();
    }

    /// Advance the simulation by one timestep.
    ///
    /// This performs:
    /// 1. Evaluate `F(s)` and integrate to a tentative state
    /// 2. Detect contacts between the current and tentative states
    /// 3. If there are contacts, resolve them against the current state
    /// 4. Normalize the orientation and check the result is finite
    /// 5. Commit and advance time
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Diverged`] if the new state is not finite or has
    /// a zero-norm orientation; the solver halts and the state is left at
    /// the last committed value. Returns [`SimError::Halted`] on every call
    /// after that.
    pub fn advance_one_step(&mut self) -> Result<StepReport> {
        if self.is_halted() {
            return Err(SimError::Halted { tick: self.tick });
        }

        let h = self.config.timestep;

        self.enter(SolverPhase::Integrating);
        let derivative = self.dynamics.derivative(&self.state);
        let tentative = integrate_with_method(
            self.config.integration,
            &self.dynamics,
            &self.state,
            &derivative,
            h,
        );

        self.enter(SolverPhase::CollisionCheck);
        let contacts = self
            .detector
            .detect(self.dynamics.geometry(), &self.state, &tentative);

        let (candidate, resolution) = if contacts.is_empty() {
            (tentative, None)
        } else {
            self.enter(SolverPhase::Resolving);
            debug!(tick = self.tick, count = contacts.len(), "Contacts detected");
            let resolution = self.resolver.resolve(
                &self.state,
                &derivative,
                self.dynamics.geometry(),
                &contacts,
            );
            (resolution.state, Some(resolution))
        };

        self.enter(SolverPhase::Committing);
        let committed = match Self::check(candidate) {
            Ok(state) => state,
            Err(e) => {
                error!(tick = self.tick, error = %e, "Simulation diverged, halting");
                self.phase = SolverPhase::Halted;
                return Err(e);
            }
        };

        self.state = committed;
        self.tick += 1;
        self.time += h;
        self.enter(SolverPhase::Idle);

        Ok(StepReport {
            tick: self.tick,
            time: self.time,
            state: committed,
            contacts,
            resolution,
            kinetic_energy: committed.kinetic_energy(self.dynamics.geometry()),
        })
    }

    /// Advance `steps` ticks and return every committed state.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Self::advance_one_step`].
    pub fn run(&mut self, steps: u64) -> Result<Vec<State>> {
        let mut states = Vec::with_capacity(usize::try_from(steps).map_or(0, |n| n.min(1 << 16)));
        for _ in 0..steps {
            states.push(self.advance_one_step()?.state);
        }
        Ok(states)
    }

    /// Advance for `duration` seconds of simulation time.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if `duration` is negative or not
    /// finite, or the first error from [`Self::advance_one_step`].
    pub fn run_for(&mut self, duration: f64) -> Result<Vec<State>> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(SimError::invalid_config(format!(
                "duration must be finite and non-negative, got {duration}"
            )));
        }

        // Safe cast: duration and timestep are positive and finite
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let steps = (duration / self.config.timestep).round() as u64;
        self.run(steps)
    }

    /// World positions of the eight corners at the current state.
    #[must_use]
    pub fn current_world_vertices(&self) -> Vec<Point3<f64>> {
        self.geometry()
            .world_vertices(&self.state.position, &self.state.rotation())
            .to_vec()
    }

    /// Current corners mapped into the `[-1, 1]³` render frame.
    #[must_use]
    pub fn current_render_vertices(&self) -> Vec<[f32; 3]> {
        let frame = self.config.render;
        self.current_world_vertices()
            .iter()
            .map(|p| frame.to_render_f32(p))
            .collect()
    }

    /// Triangle indices over the corners (12 triangles).
    #[must_use]
    pub fn mesh_indices(&self) -> &[u32] {
        self.geometry().indices()
    }

    /// Per-vertex colors.
    #[must_use]
    pub fn mesh_colors(&self) -> &[Color] {
        self.geometry().colors()
    }

    fn enter(&mut self, phase: SolverPhase) {
        trace!(tick = self.tick, from = %self.phase, to = %phase, "Phase transition");
        self.phase = phase;
    }

    fn check(candidate: State) -> Result<State> {
        if !candidate.is_finite() {
            return Err(SimError::diverged("state contains non-finite values"));
        }
        candidate
            .normalized()
            .ok_or_else(|| SimError::diverged("orientation quaternion has zero norm"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hexdyn_types::{CollisionMode, IntegrationMethod, Quaternion, Vector3};

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = Solver::new(SimulationConfig::default().timestep(0.0)).unwrap_err();
        assert!(err.is_config_error());

        let mut config = SimulationConfig::default();
        config.body.mass = -1.0;
        assert!(Solver::new(config).unwrap_err().is_config_error());
    }

    #[test]
    fn test_step_advances_time_and_tick() {
        let mut solver = Solver::new(SimulationConfig::free_fall()).unwrap();
        assert_eq!(solver.phase(), SolverPhase::Idle);

        let report = solver.advance_one_step().unwrap();
        assert_eq!(report.tick, 1);
        assert_relative_eq!(report.time, 0.01);
        assert!(!report.had_contact());
        assert!(report.resolution.is_none());
        assert_eq!(solver.phase(), SolverPhase::Idle);
        assert_eq!(&report.state, solver.current_state());
    }

    #[test]
    fn test_orientation_normalized_at_commit() {
        let config = SimulationConfig::free_fall()
            .integration(IntegrationMethod::ExplicitEuler)
            .initial(
                SimulationConfig::free_fall()
                    .initial
                    .moving(Vector3::zeros(), Vector3::new(3.0, -1.0, 2.0)),
            );
        let mut solver = Solver::new(config).unwrap();

        for _ in 0..20 {
            let report = solver.advance_one_step().unwrap();
            assert_relative_eq!(report.state.orientation.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_set_state_validates_and_normalizes() {
        let mut solver = Solver::new(SimulationConfig::free_fall()).unwrap();

        let mut state = *solver.current_state();
        state.orientation = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        solver.set_state(state).unwrap();
        assert_relative_eq!(solver.current_state().orientation.norm(), 1.0);

        state.orientation = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert!(solver.set_state(state).is_err());

        state.orientation = Quaternion::identity();
        state.position.x = f64::NAN;
        assert!(solver.set_state(state).is_err());
    }

    #[test]
    fn test_divergence_halts() {
        let mut solver = Solver::new(SimulationConfig::free_fall()).unwrap();
        let mut state = *solver.current_state();
        state.linear_momentum = Vector3::new(f64::MAX, 0.0, 0.0);
        solver.set_state(state).unwrap();
        solver.add_force(ExternalForce::at_com(Vector3::new(f64::MAX, 0.0, 0.0)));

        let before = *solver.current_state();
        let err = solver.advance_one_step().unwrap_err();
        assert!(matches!(err, SimError::Diverged { .. }));
        assert!(solver.is_halted());
        assert_eq!(*solver.current_state(), before);
        assert_eq!(solver.tick(), 0);

        let err = solver.advance_one_step().unwrap_err();
        assert_eq!(err, SimError::Halted { tick: 0 });
        assert!(solver.set_state(before).is_err());

        solver.reset();
        solver.clear_forces();
        assert!(!solver.is_halted());
        solver.advance_one_step().unwrap();
    }

    #[test]
    fn test_run_and_run_for() {
        let mut solver = Solver::new(SimulationConfig::free_fall()).unwrap();
        let states = solver.run(10).unwrap();
        assert_eq!(states.len(), 10);
        assert_eq!(states[9], *solver.current_state());

        let states = solver.run_for(0.5).unwrap();
        assert_eq!(states.len(), 50);
        assert_eq!(solver.tick(), 60);
        assert_relative_eq!(solver.time(), 0.6, epsilon = 1e-9);

        assert!(solver.run_for(-1.0).is_err());
        assert!(solver.run_for(f64::INFINITY).is_err());
    }

    #[test]
    fn test_mesh_accessors() {
        let solver = Solver::new(SimulationConfig::default()).unwrap();
        assert_eq!(solver.mesh_indices().len(), 36);
        assert_eq!(solver.mesh_colors().len(), 8);
        assert_eq!(solver.current_world_vertices().len(), 8);

        for v in solver.current_render_vertices() {
            assert!(v.iter().all(|c| (-1.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn test_ground_contact_is_reported() {
        // Unit cube just above the ground, falling fast enough to cross it in one step
        let config = SimulationConfig::default()
            .zero_gravity()
            .collision_mode(CollisionMode::VertexFace)
            .restitution(1.0)
            .body(hexdyn_types::BodyConfig::cube(1.0, 0.5))
            .initial(
                hexdyn_types::InitialConditions::at(Point3::new(64.0, 64.0, 0.51))
                    .moving(Vector3::new(0.0, 0.0, -2.0), Vector3::zeros()),
            );
        let mut solver = Solver::new(config).unwrap();

        let report = solver.advance_one_step().unwrap();
        assert_eq!(report.contacts.len(), 4);
        let resolution = report.resolution.unwrap();
        assert_eq!(resolution.contact_count(), 4);

        // Pose stays at the pre-step value, velocity points up
        assert_relative_eq!(report.state.position.z, 0.51, epsilon = 1e-12);
        assert!(report.state.velocity(solver.geometry()).z > 0.0);
    }
}
