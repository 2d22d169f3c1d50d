//! Tait equation of state for weakly-compressible lava.
//!
//! Densities below rest are clamped to rest before pressure is evaluated, so
//! fluid pressure is never negative and under-dense regions (free surfaces)
//! do not pull particles together. A NaN density is not clamped: it stays NaN
//! and so does its pressure, leaving the blow-up visible to diagnostics.

use rayon::prelude::*;

use crate::particle::ParticleArrays;

/// Tait equation of state.
///
/// ```text
/// P = B * ((rho / rho0)^gamma - 1)
/// ```
///
/// # Arguments
/// * `density` - Current density rho (kg/m^3).
/// * `rest_density` - Reference rest density rho0 (kg/m^3).
/// * `stiffness` - Stiffness B (Pa).
/// * `gamma` - Tait exponent.
///
/// # Returns
/// Pressure in Pascals. Negative if `density < rest_density`.
pub fn tait_eos(density: f32, rest_density: f32, stiffness: f32, gamma: f32) -> f32 {
    let ratio = density / rest_density;
    stiffness * (ratio.powf(gamma) - 1.0)
}

/// Clamp fluid density to at least `rest_density` and evaluate the Tait EOS.
///
/// Rigid particles are left untouched.
pub fn compute_pressure(
    particles: &mut ParticleArrays,
    rest_density: f32,
    stiffness: f32,
    gamma: f32,
) {
    particles
        .density
        .par_iter_mut()
        .zip(particles.pressure.par_iter_mut())
        .zip(particles.material.par_iter())
        .for_each(|((density, pressure), material)| {
            if !material.is_fluid() {
                return;
            }
            // `f32::max` would replace NaN with rest density.
            if !density.is_nan() {
                *density = density.max(rest_density);
            }
            *pressure = tait_eos(*density, rest_density, stiffness, gamma);
            debug_assert!(!(*pressure < 0.0), "fluid pressure went negative: {}", *pressure);
        });
}
