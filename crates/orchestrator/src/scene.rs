//! Scene setup: fluid lattice placement and rigid box sampling

use lava_kernel::{
    compute_rigid_volumes, CubicSpline, KernelResult, Material, NeighborGrid, ParticleArrays,
    RigidBodies, RigidBody,
};

use crate::config::{FluidBlock, RigidBox, SimulationConfig};

/// Particles and rigid metadata ready for the solver.
#[derive(Debug, Clone)]
pub struct Scene {
    /// All fluid and rigid particles
    pub particles: ParticleArrays,
    /// Rigid body table indexed by particle `object_id`
    pub bodies: RigidBodies,
}

/// Build the initial scene described by `config`.
///
/// Rigid boxes are registered first so their ids follow config order. Fluid
/// lattice sites that fall inside a rigid box are skipped. Rigid volumes and
/// masses are computed before returning.
pub fn build_scene(config: &SimulationConfig) -> KernelResult<Scene> {
    let spacing = config.particle_spacing;
    let rest_density = config.solver.rest_density;
    let mut particles = ParticleArrays::new();
    let mut bodies = RigidBodies::new();

    for rigid in &config.rigid_bodies {
        let id = bodies.push(RigidBody {
            sigma: rigid.sigma,
            dynamic: rigid.dynamic,
            density: rigid.density,
        });
        sample_box_shell(&mut particles, rigid, id, spacing);
    }
    let rigid_count = particles.len();

    let fluid_mass = rest_density * spacing.powi(3);
    for block in &config.fluid_blocks {
        place_fluid_block(
            &mut particles,
            block,
            &config.rigid_bodies,
            spacing,
            fluid_mass,
            rest_density,
        );
    }

    let h = config.support_radius();
    let kernel = CubicSpline::new(h);
    let mut grid = NeighborGrid::new(h, config.domain.min, config.domain.max);
    grid.update(&particles.x, &particles.y, &particles.z);
    compute_rigid_volumes(&mut particles, &bodies, &grid, &kernel)?;

    tracing::info!(
        "Scene setup complete: {} fluid particles, {} rigid particles in {} bodies",
        particles.len() - rigid_count,
        rigid_count,
        bodies.len()
    );

    Ok(Scene { particles, bodies })
}

/// Lattice steps spanning `[min, max]` at roughly `spacing`, at least one.
fn steps(min: f32, max: f32, spacing: f32) -> usize {
    (((max - min) / spacing).round() as usize).max(1)
}

/// Sample the surface of an axis-aligned box on a lattice.
fn sample_box_shell(
    particles: &mut ParticleArrays,
    rigid: &RigidBox,
    object_id: u32,
    spacing: f32,
) {
    let n = [
        steps(rigid.min[0], rigid.max[0], spacing),
        steps(rigid.min[1], rigid.max[1], spacing),
        steps(rigid.min[2], rigid.max[2], spacing),
    ];
    let material = if rigid.dynamic {
        Material::RigidDynamic
    } else {
        Material::RigidStatic
    };

    for i in 0..=n[0] {
        for j in 0..=n[1] {
            for k in 0..=n[2] {
                let on_surface =
                    i == 0 || j == 0 || k == 0 || i == n[0] || j == n[1] || k == n[2];
                if !on_surface {
                    continue;
                }
                let pos = [
                    rigid.min[0] + (rigid.max[0] - rigid.min[0]) * i as f32 / n[0] as f32,
                    rigid.min[1] + (rigid.max[1] - rigid.min[1]) * j as f32 / n[1] as f32,
                    rigid.min[2] + (rigid.max[2] - rigid.min[2]) * k as f32 / n[2] as f32,
                ];
                // Mass and volume are placeholders until the volume pass runs.
                particles.push_particle(
                    pos,
                    rigid.density,
                    0.0,
                    rigid.density,
                    material,
                    object_id,
                );
                if rigid.dynamic {
                    let last = particles.len() - 1;
                    particles.set_velocity(last, rigid.velocity);
                }
            }
        }
    }
}

/// Whole cells of width `spacing` that fit in `[min, max]`.
fn cells(min: f32, max: f32, spacing: f32) -> usize {
    // Tolerate round-off when the extent is an exact multiple of spacing.
    ((max - min) / spacing + 1.0e-3).floor() as usize
}

fn inside_box(pos: [f32; 3], min: [f32; 3], max: [f32; 3], margin: f32) -> bool {
    (0..3).all(|a| pos[a] >= min[a] - margin && pos[a] <= max[a] + margin)
}

/// Fill a block with fluid at cell centers, skipping sites inside rigid boxes.
fn place_fluid_block(
    particles: &mut ParticleArrays,
    block: &FluidBlock,
    rigid: &[RigidBox],
    spacing: f32,
    mass: f32,
    rest_density: f32,
) {
    let nx = cells(block.min[0], block.max[0], spacing);
    let ny = cells(block.min[1], block.max[1], spacing);
    let nz = cells(block.min[2], block.max[2], spacing);
    let margin = 0.5 * spacing;

    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let pos = [
                    block.min[0] + (i as f32 + 0.5) * spacing,
                    block.min[1] + (j as f32 + 0.5) * spacing,
                    block.min[2] + (k as f32 + 0.5) * spacing,
                ];
                if rigid.iter().any(|r| inside_box(pos, r.min, r.max, margin)) {
                    continue;
                }
                particles.push_particle(pos, mass, 0.0, rest_density, Material::Fluid, 0);
                let last = particles.len() - 1;
                particles.set_velocity(last, block.velocity);
            }
        }
    }
}
