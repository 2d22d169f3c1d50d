//! Rigid body metadata and rigid particle volumes.
//!
//! Rigid particles sample the surface of static scenery (the volcano) or of
//! movable bodies. They take part in density summation and exert pressure and
//! viscous forces on fluid, but their own density is never evaluated; instead
//! each carries a pre-computed effective volume (Akinci et al. 2012):
//!
//! ```text
//! V_i = 1 / sum_{j in same body} W(r_ij)      (self term included)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};
use crate::neighbor::NeighborGrid;
use crate::particle::{Material, ParticleArrays};
use crate::sph::{displacement, CubicSpline};
use crate::vector;

/// Per-body metadata consulted by the force passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    /// Fluid/rigid viscosity coefficient for this body.
    pub sigma: f32,
    /// Whether the body moves (receives reactions and is advected).
    pub dynamic: bool,
    /// Material density used to derive particle masses (kg/m^3).
    pub density: f32,
}

impl RigidBody {
    /// Particle material matching this body.
    pub fn material(&self) -> Material {
        if self.dynamic {
            Material::RigidDynamic
        } else {
            Material::RigidStatic
        }
    }
}

/// Table of rigid bodies indexed by `object_id`.
#[derive(Debug, Clone, Default)]
pub struct RigidBodies {
    bodies: Vec<RigidBody>,
}

impl RigidBodies {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body and return its id.
    pub fn push(&mut self, body: RigidBody) -> u32 {
        self.bodies.push(body);
        (self.bodies.len() - 1) as u32
    }

    /// Number of registered bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// `true` if no bodies are registered.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Metadata for body `object_id`, if registered.
    pub fn get(&self, object_id: u32) -> Option<&RigidBody> {
        self.bodies.get(object_id as usize)
    }

    /// Viscosity coefficient of body `object_id`.
    ///
    /// Unregistered ids have no viscosity. [`RigidBodies::check_particles`]
    /// reports them as errors up front.
    #[inline]
    pub fn sigma(&self, object_id: u32) -> f32 {
        self.get(object_id).map_or(0.0, |body| body.sigma)
    }

    /// Iterate `(object_id, body)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &RigidBody)> {
        self.bodies.iter().enumerate().map(|(id, b)| (id as u32, b))
    }

    /// Verify every rigid particle refers to a registered body with a
    /// matching static/dynamic flag.
    pub fn check_particles(&self, particles: &ParticleArrays) -> KernelResult<()> {
        for i in 0..particles.len() {
            let material = particles.material[i];
            if material.is_fluid() {
                continue;
            }
            let object_id = particles.object_id[i];
            let body = self
                .get(object_id)
                .ok_or(KernelError::UnknownRigidBody { particle: i, object_id })?;
            if body.material() != material {
                return Err(KernelError::RigidMaterialMismatch { particle: i, object_id });
            }
        }
        Ok(())
    }
}

/// Compute effective volume and mass for every rigid particle.
///
/// Only neighbors belonging to the same body are summed, so two bodies in
/// contact do not shrink each other's volumes. Mass is `body.density * V_i`.
/// `grid` must have been updated with the current positions.
pub fn compute_rigid_volumes(
    particles: &mut ParticleArrays,
    bodies: &RigidBodies,
    grid: &NeighborGrid,
    kernel: &CubicSpline,
) -> KernelResult<()> {
    bodies.check_particles(particles)?;
    let h = kernel.support_radius();
    let self_weight = kernel.value(0.0);

    let mut volumes = Vec::with_capacity(particles.len());
    for i in 0..particles.len() {
        if particles.is_fluid(i) {
            volumes.push(particles.volume[i]);
            continue;
        }
        let mut delta = self_weight;
        let object_id = particles.object_id[i];
        grid.for_each_neighbor(i, &particles.x, &particles.y, &particles.z, h, |j| {
            if !particles.is_fluid(j) && particles.object_id[j] == object_id {
                delta += kernel.value(vector::norm(displacement(particles, i, j)));
            }
        });
        volumes.push(1.0 / delta);
    }

    for (i, volume) in volumes.into_iter().enumerate() {
        if particles.is_fluid(i) {
            continue;
        }
        particles.volume[i] = volume;
        particles.mass[i] = bodies.bodies[particles.object_id[i] as usize].density * volume;
    }

    tracing::debug!(
        "Rigid volumes computed for {} particles across {} bodies",
        particles.len() - particles.fluid_count(),
        bodies.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(dynamic: bool) -> RigidBody {
        RigidBody {
            sigma: 0.5,
            dynamic,
            density: 2500.0,
        }
    }

    #[test]
    fn push_returns_sequential_ids() {
        let mut bodies = RigidBodies::new();
        assert!(bodies.is_empty());
        assert_eq!(bodies.push(body(false)), 0);
        assert_eq!(bodies.push(body(true)), 1);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies.sigma(1), 0.5);
        assert_eq!(bodies.sigma(7), 0.0);
        assert!(bodies.get(2).is_none());
    }

    #[test]
    fn unknown_body_is_rejected() {
        let bodies = RigidBodies::new();
        let mut particles = ParticleArrays::new();
        particles.push_particle([0.0; 3], 1.0, 1.0e-6, 0.0, Material::RigidStatic, 3);
        let err = bodies.check_particles(&particles).unwrap_err();
        assert!(matches!(err, KernelError::UnknownRigidBody { particle: 0, object_id: 3 }));
    }

    #[test]
    fn material_mismatch_is_rejected() {
        let mut bodies = RigidBodies::new();
        let id = bodies.push(body(false));
        let mut particles = ParticleArrays::new();
        particles.push_particle([0.0; 3], 1.0, 1.0e-6, 0.0, Material::RigidDynamic, id);
        let err = bodies.check_particles(&particles).unwrap_err();
        assert!(matches!(err, KernelError::RigidMaterialMismatch { .. }));
    }

    #[test]
    fn isolated_rigid_particle_volume_is_inverse_self_weight() {
        let h = 0.1;
        let kernel = CubicSpline::new(h);
        let mut bodies = RigidBodies::new();
        let id = bodies.push(body(true));
        let mut particles = ParticleArrays::new();
        particles.push_particle([0.5; 3], 1.0, 0.0, 0.0, Material::RigidDynamic, id);

        let mut grid = NeighborGrid::new(h, [0.0; 3], [1.0; 3]);
        grid.update(&particles.x, &particles.y, &particles.z);
        compute_rigid_volumes(&mut particles, &bodies, &grid, &kernel).unwrap();

        let expected = 1.0 / kernel.value(0.0);
        assert!((particles.volume[0] - expected).abs() / expected < 1.0e-6);
        assert!((particles.mass[0] - 2500.0 * expected).abs() / (2500.0 * expected) < 1.0e-6);
    }

    #[test]
    fn other_bodies_and_fluid_do_not_shrink_volume() {
        let h = 0.1;
        let kernel = CubicSpline::new(h);
        let mut bodies = RigidBodies::new();
        let a = bodies.push(body(false));
        let b = bodies.push(body(false));
        let mut particles = ParticleArrays::new();
        particles.push_particle([0.5, 0.5, 0.5], 1.0, 0.0, 0.0, Material::RigidStatic, a);
        particles.push_particle([0.52, 0.5, 0.5], 1.0, 0.0, 0.0, Material::RigidStatic, a);
        particles.push_particle([0.5, 0.52, 0.5], 1.0, 0.0, 0.0, Material::RigidStatic, b);
        particles.push_particle([0.5, 0.5, 0.52], 0.1, 0.0, 1000.0, Material::Fluid, 0);

        let mut grid = NeighborGrid::new(h, [0.0; 3], [1.0; 3]);
        grid.update(&particles.x, &particles.y, &particles.z);
        compute_rigid_volumes(&mut particles, &bodies, &grid, &kernel).unwrap();

        let expected = 1.0 / (kernel.value(0.0) + kernel.value(0.02));
        assert!((particles.volume[0] - expected).abs() / expected < 1.0e-4);
        let lone = 1.0 / kernel.value(0.0);
        assert!((particles.volume[2] - lone).abs() / lone < 1.0e-4);
        // Fluid volume untouched.
        assert_eq!(particles.volume[3], 0.0);
        assert_eq!(particles.mass[3], 0.1);
    }
}
