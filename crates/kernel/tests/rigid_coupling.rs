//! Fluid/rigid pressure coupling.
//!
//! Checks the discrete action-reaction pair between a fluid particle and a
//! dynamic rigid neighbor, and that static rigid particles never accelerate.

use lava_kernel::eos::compute_pressure;
use lava_kernel::sph::{compute_density, compute_pressure_forces};
use lava_kernel::{
    compute_rigid_volumes, CubicSpline, Material, NeighborGrid, NoForcing, ParticleArrays,
    ReactionAccumulator, RigidBodies, RigidBody, SimulationKernel, SolverParams, Tick,
    WcsphSolver,
};

const H: f32 = 0.1;
const RHO0: f32 = 1000.0;

fn pressure_pass(particles: &mut ParticleArrays, bodies: &RigidBodies) {
    let kernel = CubicSpline::new(H);
    let mut grid = NeighborGrid::new(H, [0.0; 3], [1.0; 3]);
    grid.update(&particles.x, &particles.y, &particles.z);
    compute_rigid_volumes(particles, bodies, &grid, &kernel).unwrap();
    compute_density(particles, &grid, &kernel, RHO0);
    compute_pressure(particles, RHO0, 1000.0, 7.0);
    for i in 0..particles.len() {
        particles.ax[i] = 0.0;
        particles.ay[i] = 0.0;
        particles.az[i] = 0.0;
    }
    let mut reactions = ReactionAccumulator::default();
    compute_pressure_forces(particles, &grid, &kernel, RHO0, &mut reactions);
}

fn body(dynamic: bool) -> RigidBody {
    RigidBody {
        sigma: 0.2,
        dynamic,
        density: 2000.0,
    }
}

#[test]
fn reaction_on_dynamic_rigid_is_mass_scaled_opposite() {
    let mut bodies = RigidBodies::new();
    let rock = bodies.push(body(true));
    let mut particles = ParticleArrays::new();
    // Heavy fluid particle so its density is well above rest.
    particles.push_particle([0.50, 0.5, 0.5], 1.0, 0.0, RHO0, Material::Fluid, 0);
    particles.push_particle([0.53, 0.52, 0.5], 1.0, 0.0, 0.0, Material::RigidDynamic, rock);

    pressure_pass(&mut particles, &bodies);

    let m_i = particles.mass[0];
    let m_j = particles.mass[1];
    let a_i = particles.acceleration(0);
    let a_j = particles.acceleration(1);
    assert!(particles.pressure[0] > 0.0);
    assert!(a_i[0] < 0.0, "fluid should be pushed away from the rock");
    for axis in 0..3 {
        let expected = -a_i[axis] * m_i / m_j;
        assert!(
            (a_j[axis] - expected).abs() <= 1.0e-5 * expected.abs().max(1.0e-6),
            "axis {axis}: reaction {} vs expected {expected}",
            a_j[axis]
        );
        // Net momentum change of the pair vanishes.
        let net = m_i * a_i[axis] + m_j * a_j[axis];
        assert!(net.abs() <= 1.0e-4 * (m_i * a_i[axis]).abs().max(1.0e-6));
    }
}

#[test]
fn many_fluid_particles_accumulate_on_one_rigid() {
    let mut bodies = RigidBodies::new();
    let rock = bodies.push(body(true));
    let mut particles = ParticleArrays::new();
    let rigid = [0.5, 0.5, 0.5];
    particles.push_particle(rigid, 1.0, 0.0, 0.0, Material::RigidDynamic, rock);
    let offsets = [
        [0.04, 0.0, 0.0],
        [-0.04, 0.0, 0.0],
        [0.0, 0.04, 0.0],
        [0.0, -0.04, 0.0],
        [0.0, 0.0, 0.04],
        [0.03, 0.03, 0.0],
    ];
    for o in offsets {
        let pos = [rigid[0] + o[0], rigid[1] + o[1], rigid[2] + o[2]];
        particles.push_particle(pos, 1.0, 0.0, RHO0, Material::Fluid, 0);
    }

    pressure_pass(&mut particles, &bodies);

    // Total momentum change over all particles is zero when every pair
    // interaction is symmetric.
    let mut net = [0.0_f64; 3];
    let mut scale = 0.0_f64;
    for i in 0..particles.len() {
        let a = particles.acceleration(i);
        for axis in 0..3 {
            let f = particles.mass[i] as f64 * a[axis] as f64;
            net[axis] += f;
            scale = scale.max(f.abs());
        }
    }
    for axis in 0..3 {
        assert!(net[axis].abs() <= 1.0e-4 * scale, "net[{axis}] = {}", net[axis]);
    }
    // The off-axis neighbor leaves a net push on the rock toward -x/-y.
    assert!(particles.ax[0] < 0.0);
    assert!(particles.ay[0] < 0.0);
}

#[test]
fn static_rigid_never_accelerates() {
    let mut bodies = RigidBodies::new();
    let wall = bodies.push(body(false));
    let mut particles = ParticleArrays::new();
    for k in 0..5 {
        let x = 0.4 + 0.02 * k as f32;
        particles.push_particle([x, 0.4, 0.5], 1.0, 0.0, 0.0, Material::RigidStatic, wall);
    }
    for k in 0..5 {
        let x = 0.4 + 0.02 * k as f32;
        particles.push_particle([x, 0.43, 0.5], 0.5, 0.0, RHO0, Material::Fluid, 0);
    }

    let params = SolverParams {
        rest_density: RHO0,
        support_radius: H,
        speed_of_sound: 50.0,
        gamma: 7.0,
        stiffness: 1000.0,
        surface_tension: 0.01,
        viscosity: 0.05,
        gravity: [0.0, -9.81, 0.0],
    };
    let kernel = CubicSpline::new(H);
    let mut grid = NeighborGrid::new(H, [0.0; 3], [1.0; 3]);
    grid.update(&particles.x, &particles.y, &particles.z);
    compute_rigid_volumes(&mut particles, &bodies, &grid, &kernel).unwrap();
    let before: Vec<[f32; 3]> = (0..5).map(|i| particles.position(i)).collect();

    let mut solver = WcsphSolver::new(params, bodies, NoForcing, [0.0; 3], [1.0; 3]).unwrap();
    solver.check_particles(&particles).unwrap();
    let mut tick = solver.substep(&mut particles, Tick::start(1.0e-4));
    // Fluid above the wall is pushed up relative to free fall.
    assert!(particles.ay[7] > -9.81, "ay = {}", particles.ay[7]);

    for _ in 0..9 {
        tick = solver.substep(&mut particles, tick);
        for i in 0..5 {
            assert_eq!(particles.acceleration(i), [0.0; 3]);
        }
    }
    for (i, pos) in before.iter().enumerate() {
        assert_eq!(particles.position(i), *pos);
    }
    assert_eq!(tick.index, 10);
}
