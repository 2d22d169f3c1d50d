//! Simulation runner with lifecycle management
//!
//! This module provides the `SimulationRunner` which drives the substep loop
//! in a background thread, including start, pause, resume, status tracking
//! and periodic frame snapshots for external renderers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use lava_kernel::{ParticleArrays, RigidBodies, SimulationKernel, SubstepDiagnostics, Tick};

use crate::force::{compute_rigid_body_loads, RigidBodyLoad};
use crate::OrchestratorError;

/// Density ratio above which progress logs turn into warnings.
const COMPRESSION_WARN_RATIO: f32 = 1.5;

/// Runner state enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerState {
    /// Simulation created but not yet started
    Created,
    /// Simulation actively running
    Running,
    /// Simulation paused
    Paused,
    /// Simulation finished (reached stopping condition)
    Finished,
    /// Simulation encountered an error
    Error,
}

/// Loop limits and output cadence.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// Fixed substep length (seconds)
    pub time_step: f32,
    /// Optional maximum number of substeps
    pub max_timesteps: Option<u64>,
    /// Optional maximum simulated time (seconds)
    pub max_time: Option<f64>,
    /// Publish a frame every this many substeps; zero is treated as one
    pub frame_interval: u64,
}

/// Post-substep snapshot for visualization and rigid-body coupling.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Tick that the next substep will run at
    pub tick: Tick,
    /// Particle positions
    pub positions: Vec<[f32; 3]>,
    /// Particle densities (kg/m^3)
    pub density: Vec<f32>,
    /// Particle pressures (Pa)
    pub pressure: Vec<f32>,
    /// Particle ages (s)
    pub lifetime: Vec<f32>,
    /// Loads on dynamic rigid bodies
    pub rigid_loads: Vec<RigidBodyLoad>,
    /// Fluid statistics
    pub diagnostics: SubstepDiagnostics,
}

impl Frame {
    fn capture(
        particles: &ParticleArrays,
        bodies: &RigidBodies,
        tick: Tick,
        diagnostics: SubstepDiagnostics,
    ) -> Self {
        Self {
            tick,
            positions: (0..particles.len()).map(|i| particles.position(i)).collect(),
            density: particles.density.clone(),
            pressure: particles.pressure.clone(),
            lifetime: particles.lifetime.clone(),
            rigid_loads: compute_rigid_body_loads(particles, bodies),
            diagnostics,
        }
    }
}

/// Shared state between the runner thread and control interface
struct SharedState {
    /// Current runner state
    state: RunnerState,
    /// Current simulation time (seconds)
    sim_time: f64,
    /// Number of timesteps executed
    timestep_count: u64,
    /// Most recent error message (if state is Error)
    error_message: Option<String>,
    /// Most recently published frame
    frame: Option<Arc<Frame>>,
}

type Shared = Arc<Mutex<SharedState>>;

/// Lock the shared state, ignoring poisoning from a panicked peer.
fn lock(shared: &Mutex<SharedState>) -> MutexGuard<'_, SharedState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for controlling and querying a running simulation
pub struct SimulationRunner {
    /// Shared state (protected by mutex)
    shared: Shared,
    /// Handle to the background thread, which returns the final particles
    thread_handle: Option<thread::JoinHandle<ParticleArrays>>,
}

impl SimulationRunner {
    /// Create a new simulation runner
    ///
    /// # Arguments
    /// * `kernel` - The solver to drive
    /// * `particles` - Initial particles; moved into the runner thread
    /// * `bodies` - Rigid body table, for load extraction in frames
    /// * `settings` - Time step, stopping conditions and frame cadence
    pub fn new(
        mut kernel: Box<dyn SimulationKernel + Send>,
        mut particles: ParticleArrays,
        bodies: RigidBodies,
        settings: RunSettings,
    ) -> Self {
        let settings = RunSettings {
            frame_interval: settings.frame_interval.max(1),
            ..settings
        };
        let shared = Arc::new(Mutex::new(SharedState {
            state: RunnerState::Created,
            sim_time: 0.0,
            timestep_count: 0,
            error_message: None,
            frame: None,
        }));

        let shared_clone = Arc::clone(&shared);

        // Spawn background thread
        let thread_handle = thread::spawn(move || {
            run_simulation_loop(
                kernel.as_mut(),
                &mut particles,
                &bodies,
                &shared_clone,
                settings,
            );
            particles
        });

        Self {
            shared,
            thread_handle: Some(thread_handle),
        }
    }

    /// Get current runner state
    pub fn state(&self) -> RunnerState {
        lock(&self.shared).state.clone()
    }

    /// Get current simulation time (seconds)
    pub fn sim_time(&self) -> f64 {
        lock(&self.shared).sim_time
    }

    /// Get current timestep count
    pub fn timestep_count(&self) -> u64 {
        lock(&self.shared).timestep_count
    }

    /// Get error message if state is Error
    pub fn error_message(&self) -> Option<String> {
        lock(&self.shared).error_message.clone()
    }

    /// Most recently published frame, if any
    pub fn latest_frame(&self) -> Option<Arc<Frame>> {
        lock(&self.shared).frame.clone()
    }

    /// Pause the simulation
    pub fn pause(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Running {
            state.state = RunnerState::Paused;
        }
    }

    /// Resume the simulation
    pub fn resume(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Paused {
            state.state = RunnerState::Running;
        }
    }

    /// Start the simulation (transition from Created to Running)
    pub fn start(&self) {
        let mut state = lock(&self.shared);
        if state.state == RunnerState::Created {
            state.state = RunnerState::Running;
        }
    }

    /// Ask the loop to stop after the current substep
    pub fn stop(&self) {
        let mut state = lock(&self.shared);
        if matches!(
            state.state,
            RunnerState::Created | RunnerState::Running | RunnerState::Paused
        ) {
            state.state = RunnerState::Finished;
        }
    }

    /// Wait for the simulation thread to complete and return the final particles
    pub fn join(mut self) -> Result<ParticleArrays, OrchestratorError> {
        let handle = self
            .thread_handle
            .take()
            .ok_or(OrchestratorError::ThreadPanicked)?;
        let particles = handle.join().map_err(|_| OrchestratorError::ThreadPanicked)?;
        if let Some(message) = self.error_message() {
            return Err(OrchestratorError::Diverged(message));
        }
        Ok(particles)
    }
}

impl Drop for SimulationRunner {
    fn drop(&mut self) {
        // Signal the thread to exit
        self.stop();
    }
}

/// `Some(reason)` if the run has become numerically unusable.
fn divergence(diag: &SubstepDiagnostics) -> Option<String> {
    (diag.non_finite_count > 0).then(|| {
        format!(
            "{} fluid particles have non-finite density, pressure or velocity",
            diag.non_finite_count
        )
    })
}

fn publish(shared: &Mutex<SharedState>, frame: Frame) {
    lock(shared).frame = Some(Arc::new(frame));
}

/// Measure the fluid, log progress and publish a frame at `tick`.
///
/// Returns `false` and moves the runner to `Error` if the fluid diverged.
fn report(
    particles: &ParticleArrays,
    bodies: &RigidBodies,
    shared: &Mutex<SharedState>,
    tick: Tick,
    rest_density: f32,
    start_wall_time: Instant,
) -> bool {
    let diag = SubstepDiagnostics::measure(particles, rest_density);
    let diverged = divergence(&diag);
    match &diverged {
        Some(reason) => {
            tracing::error!("Simulation diverged at step {}: {}", tick.index, reason);
        }
        None if diag.max_density_ratio > COMPRESSION_WARN_RATIO => {
            tracing::warn!(
                "Step {}: fluid compressed to {:.2}x rest density",
                tick.index,
                diag.max_density_ratio
            );
        }
        None => {}
    }
    tracing::debug!(
        "Step {}: sim_time={:.4}s, max_rho/rho0={:.4}, max_p={:.1}Pa, \
         max_speed={:.3}m/s, wall_time={:.2}s",
        tick.index,
        tick.time(),
        diag.max_density_ratio,
        diag.max_pressure,
        diag.max_speed,
        start_wall_time.elapsed().as_secs_f64(),
    );
    publish(shared, Frame::capture(particles, bodies, tick, diag));

    match diverged {
        Some(reason) => {
            let mut guard = lock(shared);
            guard.state = RunnerState::Error;
            guard.error_message = Some(reason);
            false
        }
        None => true,
    }
}

/// Main simulation loop executed in background thread
fn run_simulation_loop(
    kernel: &mut dyn SimulationKernel,
    particles: &mut ParticleArrays,
    bodies: &RigidBodies,
    shared: &Mutex<SharedState>,
    settings: RunSettings,
) {
    // Wait for start signal
    loop {
        let state = lock(shared).state.clone();
        match state {
            RunnerState::Created => thread::sleep(Duration::from_millis(10)),
            RunnerState::Running => break,
            _ => return, // Exit if finished or error
        }
    }

    let rest_density = kernel.params().rest_density;
    let start_wall_time = Instant::now();
    let mut tick = Tick::start(settings.time_step);

    // Frame 0: initial state
    let initial = SubstepDiagnostics::measure(particles, rest_density);
    publish(shared, Frame::capture(particles, bodies, tick, initial));

    loop {
        let current_state = lock(shared).state.clone();

        match current_state {
            RunnerState::Running => {
                tick = kernel.substep(particles, tick);
                let sim_time = tick.time();

                // Update shared state
                {
                    let mut guard = lock(shared);
                    guard.sim_time = sim_time;
                    guard.timestep_count = tick.index;
                }

                let reached_steps = settings.max_timesteps.is_some_and(|max| tick.index >= max);
                let reached_time = settings.max_time.is_some_and(|max| sim_time >= max);
                let done = reached_steps || reached_time;

                if done || tick.index % settings.frame_interval == 0 {
                    let healthy =
                        report(particles, bodies, shared, tick, rest_density, start_wall_time);
                    if !healthy {
                        break;
                    }
                }

                if done {
                    if reached_steps {
                        tracing::info!(
                            "Simulation finished: reached max_timesteps = {}",
                            tick.index
                        );
                    } else {
                        tracing::info!("Simulation finished: reached max_time = {:.3}s", sim_time);
                    }
                    lock(shared).state = RunnerState::Finished;
                    break;
                }
            }
            RunnerState::Paused => {
                // Wait while paused
                thread::sleep(Duration::from_millis(50));
            }
            RunnerState::Finished | RunnerState::Error | RunnerState::Created => {
                // Stopped from outside: the last substep still gets a frame.
                tracing::info!("Simulation stopped at step {}", tick.index);
                report(particles, bodies, shared, tick, rest_density, start_wall_time);
                break;
            }
        }
    }

    tracing::info!(
        "Simulation thread exiting: {} timesteps, {:.4}s simulated, {:.2}s wall time",
        tick.index,
        tick.time(),
        start_wall_time.elapsed().as_secs_f64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use lava_kernel::{Material, NoForcing, SolverParams, WcsphSolver};

    fn solver() -> Box<dyn SimulationKernel + Send> {
        let params = SolverParams {
            rest_density: 1000.0,
            support_radius: 0.04,
            speed_of_sound: 50.0,
            gamma: 7.0,
            stiffness: 1000.0,
            surface_tension: 0.01,
            viscosity: 0.05,
            gravity: [0.0, -9.81, 0.0],
        };
        Box::new(
            WcsphSolver::new(params, RigidBodies::new(), NoForcing, [0.0; 3], [1.0; 3]).unwrap(),
        )
    }

    fn single_particle() -> ParticleArrays {
        let mut particles = ParticleArrays::new();
        particles.push_particle([0.5; 3], 8.0e-3, 0.0, 1000.0, Material::Fluid, 0);
        particles
    }

    fn settings(max_timesteps: Option<u64>) -> RunSettings {
        RunSettings {
            time_step: 1.0e-3,
            max_timesteps,
            max_time: None,
            frame_interval: 5,
        }
    }

    #[test]
    fn test_runner_lifecycle() {
        let runner = SimulationRunner::new(
            solver(),
            single_particle(),
            RigidBodies::new(),
            settings(Some(10)),
        );

        // Initially Created
        assert_eq!(runner.state(), RunnerState::Created);

        // Start
        runner.start();

        let particles = runner.join().unwrap();
        // Ten steps of free fall
        assert!((particles.lifetime[0] - 0.01).abs() < 1e-6);
        assert!(particles.vy[0] < 0.0);
    }

    #[test]
    fn test_final_frame_is_published() {
        let runner = SimulationRunner::new(
            solver(),
            single_particle(),
            RigidBodies::new(),
            settings(Some(12)),
        );
        runner.start();
        while runner.state() == RunnerState::Running {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(runner.state(), RunnerState::Finished);
        assert_eq!(runner.timestep_count(), 12);
        let frame = runner.latest_frame().unwrap();
        assert_eq!(frame.tick.index, 12);
        assert_eq!(frame.positions.len(), 1);
        assert_eq!(frame.diagnostics.fluid_count, 1);
        assert!((runner.sim_time() - 0.012).abs() < 1e-6);
    }

    #[test]
    fn test_max_time_stops_run() {
        let run = RunSettings {
            max_time: Some(0.005),
            ..settings(None)
        };
        let runner = SimulationRunner::new(solver(), single_particle(), RigidBodies::new(), run);
        runner.start();
        runner.join().unwrap();
    }

    #[test]
    fn test_runner_pause_resume() {
        let runner = SimulationRunner::new(
            solver(),
            single_particle(),
            RigidBodies::new(),
            settings(None),
        );

        runner.start();
        thread::sleep(Duration::from_millis(20));

        // Pause
        runner.pause();

        // Wait for pause to take effect
        thread::sleep(Duration::from_millis(100));
        assert_eq!(runner.state(), RunnerState::Paused);

        let steps_paused = runner.timestep_count();
        thread::sleep(Duration::from_millis(100));

        // Should not advance while paused (allow for 1 step race condition)
        let steps_after_pause = runner.timestep_count();
        assert!(
            steps_after_pause <= steps_paused + 1,
            "Steps should not advance while paused: before={}, after={}",
            steps_paused,
            steps_after_pause
        );

        // Resume
        runner.resume();
        assert_eq!(runner.state(), RunnerState::Running);

        runner.stop();
        runner.join().unwrap();
    }

    /// Poll, for at most ten seconds, until the latest frame satisfies `frame_ready`.
    fn wait_for(runner: &SimulationRunner, frame_ready: impl Fn(&Frame) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if runner.latest_frame().is_some_and(|f| frame_ready(&f)) {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_stop_publishes_final_frame() {
        let run = RunSettings {
            frame_interval: 1_000_000,
            ..settings(None)
        };
        let runner = SimulationRunner::new(solver(), single_particle(), RigidBodies::new(), run);
        runner.start();
        wait_for(&runner, |_| true);
        thread::sleep(Duration::from_millis(50));
        runner.stop();
        wait_for(&runner, |f| f.tick.index > 0);

        let steps = runner.timestep_count();
        assert!(steps > 0);
        let frame = runner.latest_frame().unwrap();
        assert_eq!(frame.tick.index, steps);
        assert_eq!(runner.state(), RunnerState::Finished);
        runner.join().unwrap();
    }

    #[test]
    fn test_non_finite_fluid_stops_with_error() {
        let mut particles = single_particle();
        particles.set_velocity(0, [f32::NAN, 0.0, 0.0]);
        let runner =
            SimulationRunner::new(solver(), particles, RigidBodies::new(), settings(Some(50)));
        runner.start();
        while matches!(runner.state(), RunnerState::Running | RunnerState::Created) {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(runner.state(), RunnerState::Error);
        // Detected at the first frame interval.
        assert_eq!(runner.timestep_count(), 5);
        assert!(runner.error_message().is_some());
        let frame = runner.latest_frame().unwrap();
        assert_eq!(frame.diagnostics.non_finite_count, 1);
        assert!(matches!(runner.join(), Err(OrchestratorError::Diverged(_))));
    }

    #[test]
    fn test_zero_frame_interval_publishes_every_step() {
        let run = RunSettings {
            frame_interval: 0,
            ..settings(Some(3))
        };
        let runner = SimulationRunner::new(solver(), single_particle(), RigidBodies::new(), run);
        runner.start();
        wait_for(&runner, |f| f.tick.index == 3);
        assert_eq!(runner.latest_frame().unwrap().tick.index, 3);
        runner.join().unwrap();
    }

    #[test]
    fn test_stop_before_start_exits() {
        let runner = SimulationRunner::new(
            solver(),
            single_particle(),
            RigidBodies::new(),
            settings(None),
        );
        runner.stop();
        let particles = runner.join().unwrap();
        assert_eq!(particles.lifetime[0], 0.0);
    }
}
