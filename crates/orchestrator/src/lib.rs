//! Orchestration Layer
//!
//! This crate provides orchestration for the lava SPH simulation, including:
//! - JSON configuration loading and validation
//! - Scene construction (fluid lattices, rigid box shells, rigid volumes)
//! - Rigid body load extraction for external rigid-body integrators
//! - Simulation runner with lifecycle management and frame snapshots

#![warn(missing_docs)]

pub mod config;
pub mod force;
pub mod runner;
pub mod scene;

pub use config::{ConfigError, SimulationConfig};
pub use force::{compute_rigid_body_loads, RigidBodyLoad};
pub use runner::{Frame, RunSettings, RunnerState, SimulationRunner};
pub use scene::{build_scene, Scene};

use std::path::Path;

use lava_kernel::{ForcingField, KernelError, NoForcing, SimulationKernel, WcsphSolver};

/// Errors surfaced while setting up or running a simulation.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scene or solver construction failed.
    #[error("simulation setup failed: {0}")]
    Setup(#[from] KernelError),

    /// The simulation thread panicked.
    #[error("simulation thread panicked")]
    ThreadPanicked,

    /// The run stopped because the fluid state became non-finite.
    #[error("simulation diverged: {0}")]
    Diverged(String),
}

/// Create a complete simulation from a configuration file
///
/// This function performs the full simulation setup pipeline:
/// 1. Load and validate the configuration
/// 2. Build fluid and rigid particles, including rigid volumes
/// 3. Create the WCSPH solver with the configured forcing field
/// 4. Wrap in a SimulationRunner for lifecycle management
///
/// # Arguments
/// * `config_path` - Path to the JSON configuration file
///
/// # Returns
/// A `SimulationRunner` ready to be started, or an error if setup fails
///
/// # Example
/// ```no_run
/// use lava_orchestrator::create_simulation;
///
/// let runner = create_simulation("configs/volcano.json")?;
/// runner.start();
/// let particles = runner.join()?;
/// # Ok::<(), lava_orchestrator::OrchestratorError>(())
/// ```
pub fn create_simulation(
    config_path: impl AsRef<Path>,
) -> Result<SimulationRunner, OrchestratorError> {
    let config_path = config_path.as_ref();
    tracing::info!("Creating simulation from config: {}", config_path.display());

    let config = SimulationConfig::load(config_path)?;
    tracing::info!("Configuration loaded: {}", config.name);

    simulation_from_config(&config)
}

/// Build a runner from an already validated configuration
pub fn simulation_from_config(
    config: &SimulationConfig,
) -> Result<SimulationRunner, OrchestratorError> {
    let params = config.solver_params()?;
    let scene = build_scene(config)?;

    let forcing: Box<dyn ForcingField> = match &config.eruption {
        Some(eruption) => {
            tracing::info!(
                "Eruption forcing enabled: crater radius {} m, onset {} s",
                eruption.crater_radius,
                eruption.onset_time
            );
            Box::new(*eruption)
        }
        None => Box::new(NoForcing),
    };

    let solver = WcsphSolver::new(
        params,
        scene.bodies.clone(),
        forcing,
        config.domain.min,
        config.domain.max,
    )?;
    solver.check_particles(&scene.particles)?;
    let kernel: Box<dyn SimulationKernel + Send> = Box::new(solver);

    let settings = RunSettings {
        time_step: config.time_step,
        max_timesteps: config.max_timesteps,
        max_time: config.max_time,
        frame_interval: config.frame_interval,
    };

    tracing::info!("Simulation ready to start");
    Ok(SimulationRunner::new(kernel, scene.particles, scene.bodies, settings))
}
