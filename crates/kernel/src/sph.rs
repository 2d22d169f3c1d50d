//! SPH smoothing kernel and the density / pressure-force operators.
//!
//! Implements the 3D cubic spline kernel with compact support `h` (the kernel
//! is zero for `r >= h`), density summation with rigid contributions, and the
//! symmetric pressure gradient with two-way fluid/rigid coupling.
//!
//! Every operator here is one phase of the substep: a data-parallel loop over
//! particles that reads the previous phase's output and writes only its own
//! slot (plus the atomic reaction buffer in the pressure pass).

use std::f32::consts::PI;

use rayon::prelude::*;

use crate::accumulate::ReactionAccumulator;
use crate::neighbor::NeighborGrid;
use crate::particle::ParticleArrays;
use crate::vector::{self, ZERO};

/// Separations below this are treated as coincident particles.
const MIN_SEPARATION: f32 = 1.0e-5;

/// Cubic spline smoothing kernel in 3D with support radius `h`.
///
/// ```text
/// q = r / h
/// W(r) = k * (6 q^3 - 6 q^2 + 1)   for 0   <= q <= 1/2
/// W(r) = k * 2 (1 - q)^3           for 1/2 <  q <= 1
/// W(r) = 0                         otherwise
/// k    = 8 / (pi h^3)
/// ```
///
/// Normalization constants are precomputed once per support radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSpline {
    h: f32,
    /// 8 / (pi h^3)
    k: f32,
    /// 48 / (pi h^3), the derivative constant.
    l: f32,
}

impl CubicSpline {
    /// Build a kernel with support radius `h` (must be > 0).
    pub fn new(h: f32) -> Self {
        debug_assert!(h > 0.0, "support radius must be positive");
        let h3 = h * h * h;
        Self {
            h,
            k: 8.0 / (PI * h3),
            l: 48.0 / (PI * h3),
        }
    }

    /// Support radius `h`.
    #[inline]
    pub fn support_radius(&self) -> f32 {
        self.h
    }

    /// Kernel value `W(r)` for a non-negative distance `r`.
    #[inline]
    pub fn value(&self, r: f32) -> f32 {
        let q = r.abs() / self.h;
        if q <= 0.5 {
            let q2 = q * q;
            self.k * (6.0 * q2 * q - 6.0 * q2 + 1.0)
        } else if q <= 1.0 {
            let t = 1.0 - q;
            self.k * 2.0 * t * t * t
        } else {
            0.0
        }
    }

    /// Kernel gradient `grad W(r_vec)` for the displacement `r_vec = x_i - x_j`.
    ///
    /// Zero outside the support and at (near) zero separation.
    #[inline]
    pub fn gradient(&self, r_vec: [f32; 3]) -> [f32; 3] {
        let r = vector::norm(r_vec);
        let q = r / self.h;
        if r <= MIN_SEPARATION || q > 1.0 {
            return ZERO;
        }
        // dW/dq, then chain rule: grad q = r_vec / (r h)
        let dw_dq = if q <= 0.5 {
            self.l * q * (3.0 * q - 2.0)
        } else {
            let t = 1.0 - q;
            -self.l * t * t
        };
        vector::scale(r_vec, dw_dq / (r * self.h))
    }
}

/// Displacement `x_i - x_j`.
#[inline]
pub(crate) fn displacement(particles: &ParticleArrays, i: usize, j: usize) -> [f32; 3] {
    [
        particles.x[i] - particles.x[j],
        particles.y[i] - particles.y[j],
        particles.z[i] - particles.z[j],
    ]
}

// ---------------------------------------------------------------------------
// Density summation
// ---------------------------------------------------------------------------

/// Compute density for every fluid particle by SPH summation.
///
/// ```text
/// rho_i = m_i W(0) + sum_{j fluid} m_j W(r_ij) + sum_{j rigid} rho_0 V_j W(r_ij)
/// ```
///
/// Rigid neighbors contribute an effective mass through their pre-computed
/// volume. Rigid particles keep whatever density they already had.
pub fn compute_density(
    particles: &mut ParticleArrays,
    grid: &NeighborGrid,
    kernel: &CubicSpline,
    rest_density: f32,
) {
    let p = &*particles;
    let h = kernel.support_radius();
    let self_weight = kernel.value(0.0);

    let density: Vec<f32> = (0..p.len())
        .into_par_iter()
        .map(|i| {
            if !p.is_fluid(i) {
                return p.density[i];
            }
            let neighbor_sum = grid.reduce_neighbors(
                i,
                &p.x,
                &p.y,
                &p.z,
                h,
                0.0_f32,
                |j| {
                    let r = vector::norm(displacement(p, i, j));
                    let effective_mass = if p.is_fluid(j) {
                        p.mass[j]
                    } else {
                        rest_density * p.volume[j]
                    };
                    effective_mass * kernel.value(r)
                },
                |a, b| a + b,
            );
            p.mass[i] * self_weight + neighbor_sum
        })
        .collect();

    particles.density = density;
}

// ---------------------------------------------------------------------------
// Pressure forces
// ---------------------------------------------------------------------------

/// Pressure acceleration that neighbor `j` exerts on fluid particle `i`.
///
/// `p_rho_i` is `P_i / rho_i^2`, hoisted out of the neighbor loop.
#[inline]
fn pressure_contribution(
    p: &ParticleArrays,
    kernel: &CubicSpline,
    rest_density: f32,
    i: usize,
    j: usize,
    p_rho_i: f32,
) -> [f32; 3] {
    let grad_w = kernel.gradient(displacement(p, i, j));
    if p.is_fluid(j) {
        let p_rho_j = p.pressure[j] / (p.density[j] * p.density[j]);
        vector::scale(grad_w, -p.mass[j] * (p_rho_i + p_rho_j))
    } else {
        let psi = rest_density * p.volume[j];
        vector::scale(grad_w, -psi * p_rho_i)
    }
}

/// Reaction a dynamic rigid particle `j` receives for `contribution` on `i`.
///
/// Equal and opposite, scaled by `m_i / m_j`.
#[inline]
pub fn rigid_reaction(contribution: [f32; 3], mass_i: f32, mass_j: f32) -> [f32; 3] {
    vector::scale(contribution, -mass_i / mass_j)
}

/// Add symmetric SPH pressure accelerations to every particle.
///
/// ```text
/// a_i += -sum_{j fluid} m_j (P_i/rho_i^2 + P_j/rho_j^2) grad W_ij
///        -sum_{j rigid} rho_0 V_j (P_i/rho_i^2) grad W_ij
/// ```
///
/// For every dynamic rigid neighbor the negated, mass-ratio-scaled
/// contribution is scattered into `reactions` and merged into that particle's
/// acceleration after the parallel pass. Static rigid particles end the pass
/// with zero acceleration. Accelerations must already hold the non-pressure
/// terms.
pub fn compute_pressure_forces(
    particles: &mut ParticleArrays,
    grid: &NeighborGrid,
    kernel: &CubicSpline,
    rest_density: f32,
    reactions: &mut ReactionAccumulator,
) {
    let n = particles.len();
    reactions.reset(n);
    let h = kernel.support_radius();

    let own: Vec<[f32; 3]> = {
        let p = &*particles;
        let reactions = &*reactions;
        (0..n)
            .into_par_iter()
            .map(|i| {
                if !p.is_fluid(i) {
                    return ZERO;
                }
                let p_rho_i = p.pressure[i] / (p.density[i] * p.density[i]);
                grid.neighbors(i, &p.x, &p.y, &p.z, h).fold(ZERO, |acc, j| {
                    let contribution =
                        pressure_contribution(p, kernel, rest_density, i, j, p_rho_i);
                    if p.is_dynamic_rigid(j) {
                        reactions.add(j, rigid_reaction(contribution, p.mass[i], p.mass[j]));
                    }
                    vector::add(acc, contribution)
                })
            })
            .collect()
    };

    let reactions = &*reactions;
    let material = &particles.material;
    particles
        .ax
        .par_iter_mut()
        .zip(particles.ay.par_iter_mut())
        .zip(particles.az.par_iter_mut())
        .enumerate()
        .for_each(|(i, ((ax, ay), az))| {
            if !material[i].is_dynamic() {
                *ax = 0.0;
                *ay = 0.0;
                *az = 0.0;
                return;
            }
            let total = vector::add(own[i], reactions.get(i));
            *ax += total[0];
            *ay += total[1];
            *az += total[2];
        });
}
