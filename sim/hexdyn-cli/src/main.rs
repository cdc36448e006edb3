//! Headless driver for the hexahedron solver.
//!
//! # Commands
//!
//! - `hexdyn run` - Simulate and write frames as JSON lines, or a summary
//! - `hexdyn config` - Print the effective configuration as JSON
//!
//! Both commands start from the built-in scene, or from `--config <FILE>`
//! (a JSON `SimulationConfig`, missing fields take their defaults), and then
//! apply command-line overrides.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hexdyn_core::{Solver, StepReport};
use hexdyn_types::{CollisionMode, IntegrationMethod, SimulationConfig, State};

/// Rigid hexahedron simulation
#[derive(Parser)]
#[command(name = "hexdyn")]
#[command(about = "Simulate a rigid box falling onto a ground plane and a fixed edge", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation
    Run {
        #[command(flatten)]
        scene: SceneArgs,

        /// Number of steps to simulate
        #[arg(long, default_value_t = 1000)]
        steps: u64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
        output: OutputFormat,

        /// Write vertices in the [-1, 1] render frame instead of world space
        #[arg(long)]
        render: bool,
    },

    /// Print the effective configuration
    Config {
        #[command(flatten)]
        scene: SceneArgs,
    },
}

/// Scene selection shared by all commands.
#[derive(Args, Debug, Default)]
struct SceneArgs {
    /// JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Integration method (explicit-euler, semi-implicit-euler, rk2)
    #[arg(long)]
    integrator: Option<IntegrationMethod>,

    /// Coefficient of restitution in [0, 1]
    #[arg(long)]
    restitution: Option<f64>,

    /// Collision tests (disabled, edge-edge, vertex-face, both)
    #[arg(long)]
    collisions: Option<CollisionMode>,

    /// Timestep in seconds
    #[arg(long)]
    timestep: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One JSON object per committed step
    Frames,
    /// Human-readable summary at the end
    Summary,
}

impl SceneArgs {
    /// Load the base configuration and apply overrides.
    fn resolve(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(method) = self.integrator {
            config = config.integration(method);
        }
        if let Some(e) = self.restitution {
            config = config.restitution(e);
        }
        if let Some(mode) = self.collisions {
            config = config.collision_mode(mode);
        }
        if let Some(h) = self.timestep {
            config = config.timestep(h);
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<SimulationConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// One line of `--output frames`.
#[derive(Serialize)]
struct Frame<'a> {
    tick: u64,
    time: f64,
    state: &'a State,
    vertices: Vec<[f64; 3]>,
    contacts: usize,
    kinetic_energy: f64,
}

impl<'a> Frame<'a> {
    fn new(report: &'a StepReport, solver: &Solver, render: bool) -> Self {
        let vertices = if render {
            solver
                .current_render_vertices()
                .iter()
                .map(|v| v.map(f64::from))
                .collect()
        } else {
            solver
                .current_world_vertices()
                .iter()
                .map(|p| [p.x, p.y, p.z])
                .collect()
        };

        Self {
            tick: report.tick,
            time: report.time,
            state: &report.state,
            vertices,
            contacts: report.contacts.len(),
            kinetic_energy: report.kinetic_energy,
        }
    }
}

/// Totals gathered over a run.
#[derive(Debug, Default)]
struct RunStats {
    steps: u64,
    contact_steps: u64,
    contacts: usize,
    min_height: Option<f64>,
}

impl RunStats {
    fn record(&mut self, report: &StepReport) {
        self.steps += 1;
        if report.had_contact() {
            self.contact_steps += 1;
            self.contacts += report.contacts.len();
        }
        let z = report.state.position.z;
        self.min_height = Some(self.min_height.map_or(z, |m| m.min(z)));
    }
}

fn run(config: SimulationConfig, steps: u64, output: OutputFormat, render: bool) -> Result<()> {
    info!(
        integrator = %config.integration,
        collisions = %config.collision.mode,
        timestep = config.timestep,
        steps,
        "Starting simulation"
    );

    let mut solver = Solver::new(config).context("failed to build solver")?;
    let start_energy = solver.kinetic_energy();
    let mut stats = RunStats::default();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for _ in 0..steps {
        let report = solver
            .advance_one_step()
            .with_context(|| format!("step {} failed", solver.tick() + 1))?;
        stats.record(&report);

        if output == OutputFormat::Frames {
            serde_json::to_writer(&mut out, &Frame::new(&report, &solver, render))?;
            writeln!(out)?;
        }
    }

    if output == OutputFormat::Summary {
        write_summary(&mut out, &solver, &stats, start_energy)?;
    }
    out.flush()?;

    if stats.contact_steps == 0 && solver.config().collision.mode != CollisionMode::Disabled {
        warn!("No contacts during the run");
    }
    info!(steps = stats.steps, contacts = stats.contacts, "Simulation complete");
    Ok(())
}

fn write_summary(
    out: &mut impl Write,
    solver: &Solver,
    stats: &RunStats,
    start_energy: f64,
) -> Result<()> {
    let state = solver.current_state();
    let geometry = solver.geometry();
    let velocity = state.velocity(geometry);
    let omega = state.angular_velocity(geometry);

    writeln!(out, "Simulation Summary")?;
    writeln!(out, "==================")?;
    writeln!(out, "Integrator:      {}", solver.config().integration)?;
    writeln!(out, "Collisions:      {}", solver.config().collision.mode)?;
    writeln!(out, "Steps:           {}", stats.steps)?;
    writeln!(out, "Time:            {:.4} s", solver.time())?;
    writeln!(
        out,
        "Position:        ({:.4}, {:.4}, {:.4})",
        state.position.x, state.position.y, state.position.z
    )?;
    writeln!(
        out,
        "Velocity:        ({:.4}, {:.4}, {:.4})",
        velocity.x, velocity.y, velocity.z
    )?;
    writeln!(
        out,
        "Angular vel.:    ({:.4}, {:.4}, {:.4})",
        omega.x, omega.y, omega.z
    )?;
    if let Some(z) = stats.min_height {
        writeln!(out, "Lowest center:   {z:.4}")?;
    }
    writeln!(
        out,
        "Contacts:        {} in {} steps",
        stats.contacts, stats.contact_steps
    )?;
    writeln!(
        out,
        "Kinetic energy:  {:.4} -> {:.4}",
        start_energy,
        solver.kinetic_energy()
    )?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scene,
            steps,
            output,
            render,
        } => run(scene.resolve()?, steps, output, render),
        Commands::Config { scene } => {
            let config = scene.resolve()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
