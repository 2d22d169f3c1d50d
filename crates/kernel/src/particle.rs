//! Particle data structures using struct-of-arrays layout.
//!
//! Fluid and rigid particles share one store so that a single neighbor grid
//! covers both. The solver mutates fields in place but never adds or removes
//! particles; allocation belongs to whoever builds the scene.

/// Material discriminator.
///
/// Decides which terms of the substep pipeline a particle takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum Material {
    /// Lava. Density, pressure and all forces are computed for it.
    Fluid = 0,
    /// Rigid particle of an immovable body. Acceleration is always zero.
    RigidStatic = 1,
    /// Rigid particle of a movable body. Receives gravity and pressure reactions.
    RigidDynamic = 2,
}

impl Material {
    /// `true` for [`Material::Fluid`].
    #[inline]
    pub fn is_fluid(self) -> bool {
        self == Material::Fluid
    }

    /// `true` for either rigid variant.
    #[inline]
    pub fn is_rigid(self) -> bool {
        !self.is_fluid()
    }

    /// `true` for particles that are advected by the integrator.
    #[inline]
    pub fn is_dynamic(self) -> bool {
        self != Material::RigidStatic
    }
}

/// Struct-of-arrays particle storage.
///
/// All arrays are parallel: index `i` across every array refers to the same particle.
#[derive(Debug, Clone)]
pub struct ParticleArrays {
    // ---- Positions ----
    /// X positions (meters)
    pub x: Vec<f32>,
    /// Y positions (meters). Y is the vertical axis.
    pub y: Vec<f32>,
    /// Z positions (meters)
    pub z: Vec<f32>,

    // ---- Velocities ----
    /// X velocities (m/s)
    pub vx: Vec<f32>,
    /// Y velocities (m/s)
    pub vy: Vec<f32>,
    /// Z velocities (m/s)
    pub vz: Vec<f32>,

    // ---- Accelerations ----
    /// X accelerations (m/s^2)
    pub ax: Vec<f32>,
    /// Y accelerations (m/s^2)
    pub ay: Vec<f32>,
    /// Z accelerations (m/s^2)
    pub az: Vec<f32>,

    // ---- Scalar fields ----
    /// Density (kg/m^3). Only maintained for fluid particles.
    pub density: Vec<f32>,
    /// Pressure (Pa). Only maintained for fluid particles.
    pub pressure: Vec<f32>,
    /// Particle mass (kg)
    pub mass: Vec<f32>,
    /// Effective volume (m^3). Pre-computed for rigid particles.
    pub volume: Vec<f32>,
    /// Simulated seconds since the particle was created.
    pub lifetime: Vec<f32>,
    /// Material tag
    pub material: Vec<Material>,
    /// Rigid body id for rigid particles; ignored for fluid.
    pub object_id: Vec<u32>,
}

impl ParticleArrays {
    /// Create an empty particle collection with no particles allocated.
    pub fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            vx: Vec::new(),
            vy: Vec::new(),
            vz: Vec::new(),
            ax: Vec::new(),
            ay: Vec::new(),
            az: Vec::new(),
            density: Vec::new(),
            pressure: Vec::new(),
            mass: Vec::new(),
            volume: Vec::new(),
            lifetime: Vec::new(),
            material: Vec::new(),
            object_id: Vec::new(),
        }
    }

    /// Return the number of particles currently stored.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Return `true` if there are no particles.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Append a single particle with the given initial state.
    ///
    /// Velocity, acceleration, pressure and lifetime are initialized to zero.
    pub fn push_particle(
        &mut self,
        position: [f32; 3],
        mass: f32,
        volume: f32,
        density: f32,
        material: Material,
        object_id: u32,
    ) {
        debug_assert!(mass > 0.0, "particle mass must be positive");
        debug_assert!(volume >= 0.0, "particle volume must be non-negative");
        self.x.push(position[0]);
        self.y.push(position[1]);
        self.z.push(position[2]);
        self.vx.push(0.0);
        self.vy.push(0.0);
        self.vz.push(0.0);
        self.ax.push(0.0);
        self.ay.push(0.0);
        self.az.push(0.0);
        self.density.push(density);
        self.pressure.push(0.0);
        self.mass.push(mass);
        self.volume.push(volume);
        self.lifetime.push(0.0);
        self.material.push(material);
        self.object_id.push(object_id);
    }

    /// Position of particle `i`.
    #[inline]
    pub fn position(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Velocity of particle `i`.
    #[inline]
    pub fn velocity(&self, i: usize) -> [f32; 3] {
        [self.vx[i], self.vy[i], self.vz[i]]
    }

    /// Acceleration of particle `i`.
    #[inline]
    pub fn acceleration(&self, i: usize) -> [f32; 3] {
        [self.ax[i], self.ay[i], self.az[i]]
    }

    /// Overwrite the velocity of particle `i`.
    pub fn set_velocity(&mut self, i: usize, v: [f32; 3]) {
        self.vx[i] = v[0];
        self.vy[i] = v[1];
        self.vz[i] = v[2];
    }

    /// `true` if particle `i` is fluid.
    #[inline]
    pub fn is_fluid(&self, i: usize) -> bool {
        self.material[i].is_fluid()
    }

    /// `true` if particle `i` belongs to a static rigid body.
    #[inline]
    pub fn is_static_rigid(&self, i: usize) -> bool {
        self.material[i] == Material::RigidStatic
    }

    /// `true` if particle `i` belongs to a dynamic rigid body.
    #[inline]
    pub fn is_dynamic_rigid(&self, i: usize) -> bool {
        self.material[i] == Material::RigidDynamic
    }

    /// Fluid or dynamic rigid.
    #[inline]
    pub fn is_dynamic(&self, i: usize) -> bool {
        self.material[i].is_dynamic()
    }

    /// Number of fluid particles.
    pub fn fluid_count(&self) -> usize {
        self.material.iter().filter(|m| m.is_fluid()).count()
    }
}

impl Default for ParticleArrays {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_particle_arrays() {
        let pa = ParticleArrays::new();
        assert_eq!(pa.len(), 0);
        assert!(pa.is_empty());
    }

    #[test]
    fn push_and_len() {
        let mut pa = ParticleArrays::new();
        pa.push_particle([1.0, 2.0, 3.0], 0.001, 1.0e-6, 1000.0, Material::Fluid, 0);
        assert_eq!(pa.len(), 1);
        assert!(!pa.is_empty());
        assert_eq!(pa.position(0), [1.0, 2.0, 3.0]);
        assert_eq!(pa.mass[0], 0.001);
        assert_eq!(pa.density[0], 1000.0);
        assert_eq!(pa.material[0], Material::Fluid);
        assert_eq!(pa.velocity(0), [0.0; 3]);
        assert_eq!(pa.acceleration(0), [0.0; 3]);
        assert_eq!(pa.pressure[0], 0.0);
        assert_eq!(pa.lifetime[0], 0.0);
    }

    #[test]
    fn predicates_follow_material() {
        let mut pa = ParticleArrays::new();
        pa.push_particle([0.0; 3], 1.0, 0.0, 1000.0, Material::Fluid, 0);
        pa.push_particle([0.0; 3], 1.0, 1.0e-6, 1000.0, Material::RigidStatic, 1);
        pa.push_particle([0.0; 3], 1.0, 1.0e-6, 1000.0, Material::RigidDynamic, 2);

        assert!(pa.is_fluid(0) && pa.is_dynamic(0));
        assert!(pa.is_static_rigid(1) && !pa.is_dynamic(1));
        assert!(pa.is_dynamic_rigid(2) && pa.is_dynamic(2));
        assert_eq!(pa.fluid_count(), 1);
    }

    #[test]
    fn material_repr() {
        assert_eq!(Material::Fluid as u8, 0);
        assert_eq!(Material::RigidStatic as u8, 1);
        assert_eq!(Material::RigidDynamic as u8, 2);
    }
}
