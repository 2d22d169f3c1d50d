//! Rigid body load extraction
//!
//! Sums the per-particle accelerations the kernel writes into dynamic rigid
//! particles (gravity plus fluid reactions) into a net force and a moment
//! about each body's centroid, the quantities an external rigid-body
//! integrator consumes.

use lava_kernel::{ParticleArrays, RigidBodies};

/// Force and moment on one rigid body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RigidBodyLoad {
    /// Body id (index into the rigid body table)
    pub object_id: u32,
    /// Mass-weighted centroid of the body's particles
    pub centroid: [f32; 3],
    /// Total particle mass (kg)
    pub mass: f32,
    /// Net force vector [Fx, Fy, Fz] (Newtons)
    pub net_force: [f32; 3],
    /// Net moment/torque vector [Tx, Ty, Tz] (N·m) about the centroid
    pub net_moment: [f32; 3],
}

#[derive(Default)]
struct Accum {
    mass: f64,
    weighted_pos: [f64; 3],
    force: [f64; 3],
    count: usize,
}

/// Compute the load on every dynamic rigid body.
///
/// Bodies are returned in id order; static bodies and dynamic bodies with no
/// particles are omitted.
pub fn compute_rigid_body_loads(
    particles: &ParticleArrays,
    bodies: &RigidBodies,
) -> Vec<RigidBodyLoad> {
    let mut accum: Vec<Accum> = (0..bodies.len()).map(|_| Accum::default()).collect();

    // First pass: mass, centroid, net force
    for i in (0..particles.len()).filter(|&i| particles.is_dynamic_rigid(i)) {
        let Some(acc) = accum.get_mut(particles.object_id[i] as usize) else {
            continue;
        };
        let m = particles.mass[i] as f64;
        let pos = particles.position(i);
        let a = particles.acceleration(i);
        for axis in 0..3 {
            acc.weighted_pos[axis] += m * pos[axis] as f64;
            acc.force[axis] += m * a[axis] as f64;
        }
        acc.mass += m;
        acc.count += 1;
    }

    let centroids: Vec<[f64; 3]> = accum
        .iter()
        .map(|acc| {
            if acc.mass > 0.0 {
                acc.weighted_pos.map(|p| p / acc.mass)
            } else {
                [0.0; 3]
            }
        })
        .collect();

    // Second pass: moment = r x F about the centroid
    let mut moments = vec![[0.0_f64; 3]; bodies.len()];
    for i in (0..particles.len()).filter(|&i| particles.is_dynamic_rigid(i)) {
        let id = particles.object_id[i] as usize;
        let Some(c) = centroids.get(id) else {
            continue;
        };
        let m = particles.mass[i] as f64;
        let pos = particles.position(i);
        let a = particles.acceleration(i);
        let r = [pos[0] as f64 - c[0], pos[1] as f64 - c[1], pos[2] as f64 - c[2]];
        let f = [m * a[0] as f64, m * a[1] as f64, m * a[2] as f64];
        moments[id][0] += r[1] * f[2] - r[2] * f[1];
        moments[id][1] += r[2] * f[0] - r[0] * f[2];
        moments[id][2] += r[0] * f[1] - r[1] * f[0];
    }

    bodies
        .iter()
        .filter(|(id, body)| body.dynamic && accum[*id as usize].count > 0)
        .map(|(id, _)| {
            let idx = id as usize;
            RigidBodyLoad {
                object_id: id,
                centroid: centroids[idx].map(|v| v as f32),
                mass: accum[idx].mass as f32,
                net_force: accum[idx].force.map(|v| v as f32),
                net_moment: moments[idx].map(|v| v as f32),
            }
        })
        .collect()
}
