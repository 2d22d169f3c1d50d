//! Semi-implicit (symplectic) Euler integration and particle ageing.

use rayon::prelude::*;

use crate::particle::{Material, ParticleArrays};

/// Kick then drift one axis: `v += a dt`, then `x += v dt` with the new `v`.
fn advect_axis(
    position: &mut [f32],
    velocity: &mut [f32],
    acceleration: &[f32],
    material: &[Material],
    dt: f32,
) {
    position
        .par_iter_mut()
        .zip(velocity.par_iter_mut())
        .zip(acceleration.par_iter())
        .zip(material.par_iter())
        .for_each(|(((x, v), a), m)| {
            if m.is_dynamic() {
                *v += a * dt;
                *x += *v * dt;
            }
        });
}

/// Advance every dynamic particle (fluid or dynamic rigid) by `dt`.
///
/// Static rigid particles are untouched.
pub fn advect(particles: &mut ParticleArrays, dt: f32) {
    let ParticleArrays {
        x,
        y,
        z,
        vx,
        vy,
        vz,
        ax,
        ay,
        az,
        material,
        ..
    } = particles;
    advect_axis(x, vx, ax, material, dt);
    advect_axis(y, vy, ay, material, dt);
    advect_axis(z, vz, az, material, dt);
}

/// Add `dt` to the lifetime of every particle.
pub fn increase_lifetime(particles: &mut ParticleArrays, dt: f32) {
    particles.lifetime.par_iter_mut().for_each(|age| *age += dt);
}
