//! Non-pressure accelerations: gravity, surface tension, artificial viscosity
//! and external forcing.
//!
//! This pass runs before the pressure pass and *seeds* the acceleration
//! arrays. Static rigid particles are zeroed, every other particle starts from
//! gravity, and fluid particles additionally accumulate the neighbor terms and
//! the forcing field.

use rayon::prelude::*;

use crate::forcing::{ForcingField, Tick};
use crate::neighbor::NeighborGrid;
use crate::params::SolverParams;
use crate::particle::ParticleArrays;
use crate::rigid::RigidBodies;
use crate::sph::{displacement, CubicSpline};
use crate::vector::{self, ZERO};

/// Monaghan-style artificial viscosity term `pi_ij`.
///
/// ```text
/// pi = -nu * min(v_ij . x_ij, 0) / (x_ij . x_ij + 0.01 h^2)
/// ```
///
/// Only approaching pairs (`v_ij . x_ij < 0`) are damped.
#[inline]
pub fn viscosity_term(nu: f32, v_ij: [f32; 3], x_ij: [f32; 3], h: f32) -> f32 {
    let approach = vector::dot(v_ij, x_ij).min(0.0);
    -nu * approach / (vector::dot(x_ij, x_ij) + 0.01 * h * h)
}

/// Neighbor `j`'s non-pressure contribution to fluid particle `i`.
fn neighbor_contribution(
    p: &ParticleArrays,
    kernel: &CubicSpline,
    params: &SolverParams,
    bodies: &RigidBodies,
    i: usize,
    j: usize,
) -> [f32; 3] {
    let h = params.support_radius;
    let x_ij = displacement(p, i, j);
    let v_ij = vector::sub(p.velocity(i), p.velocity(j));
    let grad_w = kernel.gradient(x_ij);

    if p.is_fluid(j) {
        let tension = vector::scale(
            x_ij,
            -params.surface_tension / p.mass[i] * p.mass[j] * kernel.value(vector::norm(x_ij)),
        );
        let nu = 2.0 * params.viscosity * h * params.speed_of_sound
            / (p.density[i] + p.density[j]);
        let pi = viscosity_term(nu, v_ij, x_ij, h);
        vector::add(tension, vector::scale(grad_w, -p.mass[j] * pi))
    } else {
        let sigma = bodies.sigma(p.object_id[j]);
        let nu = sigma * h * params.speed_of_sound / (2.0 * p.density[i]);
        let pi = viscosity_term(nu, v_ij, x_ij, h);
        vector::scale(grad_w, -params.rest_density * p.volume[j] * pi)
    }
}

/// Overwrite accelerations with gravity plus viscosity, surface tension and
/// the forcing field evaluated at `tick`.
///
/// Densities must be current; rigid ids must have been checked against
/// `bodies`.
pub fn compute_non_pressure_forces<F>(
    particles: &mut ParticleArrays,
    grid: &NeighborGrid,
    kernel: &CubicSpline,
    params: &SolverParams,
    bodies: &RigidBodies,
    forcing: &F,
    tick: Tick,
) where
    F: ForcingField + ?Sized,
{
    let h = params.support_radius;
    let accelerations: Vec<[f32; 3]> = {
        let p = &*particles;
        (0..p.len())
            .into_par_iter()
            .map(|i| {
                if p.is_static_rigid(i) {
                    return ZERO;
                }
                if !p.is_fluid(i) {
                    return params.gravity;
                }
                let neighbors = grid.reduce_neighbors(
                    i,
                    &p.x,
                    &p.y,
                    &p.z,
                    h,
                    ZERO,
                    |j| neighbor_contribution(p, kernel, params, bodies, i, j),
                    vector::add,
                );
                let external = forcing.acceleration(tick, p.position(i));
                vector::add(vector::add(params.gravity, neighbors), external)
            })
            .collect()
    };

    particles
        .ax
        .par_iter_mut()
        .zip(particles.ay.par_iter_mut())
        .zip(particles.az.par_iter_mut())
        .zip(accelerations.par_iter())
        .for_each(|(((ax, ay), az), a)| {
            *ax = a[0];
            *ay = a[1];
            *az = a[2];
        });
}
