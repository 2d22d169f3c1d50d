//! Weakly-compressible SPH kernel for lava/rigid interaction
//!
//! This crate provides the per-substep physics of the lava simulation: density
//! summation, Tait pressure, non-pressure forces (viscosity, surface tension,
//! scripted forcing), the symmetric pressure gradient with two-way rigid
//! coupling, and symplectic Euler integration.
//!
//! # Modules
//! - [`particle`] -- Struct-of-arrays particle storage and the `Material` enum.
//! - [`neighbor`] -- Uniform-grid spatial hash with iterator/reduction neighbor queries.
//! - [`sph`] -- Cubic spline kernel, density summation and pressure forces.
//! - [`eos`] -- Tait equation of state with the rest-density clamp.
//! - [`nonpressure`] -- Gravity, surface tension, artificial viscosity and forcing.
//! - [`integrate`] -- Semi-implicit Euler and lifetime accumulation.
//! - [`rigid`] -- Rigid body metadata and effective rigid particle volumes.
//! - [`forcing`] -- The explicit `Tick` clock and pluggable forcing fields.
//! - [`accumulate`] -- Atomic reaction-force buffer.
//! - [`params`] -- Solver settings and validation.

#![warn(missing_docs)]

pub mod accumulate;
pub mod eos;
pub mod error;
pub mod forcing;
pub mod integrate;
pub mod neighbor;
pub mod nonpressure;
pub mod params;
pub mod particle;
pub mod rigid;
pub mod sph;

mod vector;

pub use accumulate::ReactionAccumulator;
pub use eos::tait_eos;
pub use error::{KernelError, KernelResult};
pub use forcing::{EruptionForcing, ForcingField, NoForcing, Tick};
pub use neighbor::NeighborGrid;
pub use params::{SolverParams, SolverSettings};
pub use particle::{Material, ParticleArrays};
pub use rigid::{compute_rigid_volumes, RigidBodies, RigidBody};
pub use sph::CubicSpline;

// ---------------------------------------------------------------------------
// SimulationKernel trait
// ---------------------------------------------------------------------------

/// Snapshot statistics of the fluid after a substep.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SubstepDiagnostics {
    /// Largest `density / density0` over fluid particles.
    pub max_density_ratio: f32,
    /// Largest fluid pressure (Pa).
    pub max_pressure: f32,
    /// Smallest fluid pressure (Pa). Never negative after the EOS pass.
    pub min_pressure: f32,
    /// Largest fluid speed (m/s).
    pub max_speed: f32,
    /// Total fluid kinetic energy (J).
    pub kinetic_energy: f64,
    /// Number of fluid particles measured.
    pub fluid_count: usize,
    /// Fluid particles with a NaN or infinite density, pressure or velocity.
    pub non_finite_count: usize,
}

impl SubstepDiagnostics {
    /// Measure the fluid particles of `particles`.
    ///
    /// With no fluid particles every field is zero.
    pub fn measure(particles: &ParticleArrays, rest_density: f32) -> Self {
        let mut diag = Self {
            min_pressure: f32::INFINITY,
            ..Self::default()
        };
        for i in (0..particles.len()).filter(|&i| particles.is_fluid(i)) {
            let v = particles.velocity(i);
            let finite = particles.density[i].is_finite()
                && particles.pressure[i].is_finite()
                && v.iter().all(|c| c.is_finite());
            if !finite {
                diag.non_finite_count += 1;
                continue;
            }
            let speed_sq = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
            diag.max_density_ratio = diag.max_density_ratio.max(particles.density[i] / rest_density);
            diag.max_pressure = diag.max_pressure.max(particles.pressure[i]);
            diag.min_pressure = diag.min_pressure.min(particles.pressure[i]);
            diag.max_speed = diag.max_speed.max(speed_sq.sqrt());
            diag.kinetic_energy += 0.5 * particles.mass[i] as f64 * speed_sq as f64;
            diag.fluid_count += 1;
        }
        if diag.fluid_count == 0 {
            diag.min_pressure = 0.0;
        }
        diag
    }
}

/// A solver that advances caller-owned particles one substep at a time.
///
/// The simulation clock is explicit: the caller passes the current [`Tick`]
/// in and receives the next one back.
pub trait SimulationKernel {
    /// Execute one substep at `tick` and return the tick that follows it.
    fn substep(&mut self, particles: &mut ParticleArrays, tick: Tick) -> Tick;

    /// Validated constants the solver runs with.
    fn params(&self) -> &SolverParams;
}

// ---------------------------------------------------------------------------
// WcsphSolver -- rayon implementation of SimulationKernel
// ---------------------------------------------------------------------------

/// Weakly-compressible SPH solver.
///
/// Each substep runs, in this order and with a barrier between phases:
///
/// 1. Neighbor grid rebuild
/// 2. Density summation
/// 3. Tait EOS (with the rest-density clamp)
/// 4. Non-pressure forces (seeds accelerations with gravity)
/// 5. Pressure forces (adds onto step 4, scatters rigid reactions)
/// 6. Semi-implicit Euler advection
/// 7. Tick advance and lifetime `+= dt`
pub struct WcsphSolver<F: ForcingField = NoForcing> {
    params: SolverParams,
    bodies: RigidBodies,
    forcing: F,
    kernel: CubicSpline,
    grid: NeighborGrid,
    reactions: ReactionAccumulator,
}

impl<F: ForcingField> WcsphSolver<F> {
    /// Create a solver.
    ///
    /// The neighbor grid uses cells of one support radius over
    /// `[domain_min, domain_max]`; particles outside are binned into the
    /// edge cells.
    pub fn new(
        params: SolverParams,
        bodies: RigidBodies,
        forcing: F,
        domain_min: [f32; 3],
        domain_max: [f32; 3],
    ) -> KernelResult<Self> {
        params.validate()?;
        let h = params.support_radius;
        tracing::info!(
            "WCSPH solver created: h={h}, density0={}, B={}, gamma={}, {} rigid bodies",
            params.rest_density,
            params.stiffness,
            params.gamma,
            bodies.len()
        );
        Ok(Self {
            params,
            bodies,
            forcing,
            kernel: CubicSpline::new(h),
            grid: NeighborGrid::new(h, domain_min, domain_max),
            reactions: ReactionAccumulator::default(),
        })
    }

    /// Rigid body table.
    pub fn bodies(&self) -> &RigidBodies {
        &self.bodies
    }

    /// Forcing field.
    pub fn forcing(&self) -> &F {
        &self.forcing
    }

    /// Smoothing kernel.
    pub fn kernel(&self) -> &CubicSpline {
        &self.kernel
    }

    /// Check that every rigid particle refers to a registered body.
    ///
    /// Call this before the first substep. The substep itself does not
    /// re-check; rigid particles with an unregistered id contribute no
    /// viscosity.
    pub fn check_particles(&self, particles: &ParticleArrays) -> KernelResult<()> {
        self.bodies.check_particles(particles)
    }
}

impl<F: ForcingField> SimulationKernel for WcsphSolver<F> {
    fn substep(&mut self, particles: &mut ParticleArrays, tick: Tick) -> Tick {
        let params = self.params;

        self.grid.update(&particles.x, &particles.y, &particles.z);

        sph::compute_density(particles, &self.grid, &self.kernel, params.rest_density);
        eos::compute_pressure(particles, params.rest_density, params.stiffness, params.gamma);
        nonpressure::compute_non_pressure_forces(
            particles,
            &self.grid,
            &self.kernel,
            &params,
            &self.bodies,
            &self.forcing,
            tick,
        );
        sph::compute_pressure_forces(
            particles,
            &self.grid,
            &self.kernel,
            params.rest_density,
            &mut self.reactions,
        );
        integrate::advect(particles, tick.dt);

        let next = tick.next();
        integrate::increase_lifetime(particles, tick.dt);

        tracing::trace!(tick = next.index, time = next.time(), "substep complete");
        next
    }

    fn params(&self) -> &SolverParams {
        &self.params
    }
}
