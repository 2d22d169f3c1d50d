//! Configuration parsing and validation for lava simulations

use std::fs;
use std::path::{Path, PathBuf};

use lava_kernel::{EruptionForcing, KernelError, SolverParams, SolverSettings};
use serde::{Deserialize, Serialize};

/// Errors raised while loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid configuration JSON.
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is outside its admissible range.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Solver settings were rejected by the kernel.
    #[error(transparent)]
    Solver(#[from] KernelError),
}

/// Main simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Human-readable simulation name
    pub name: String,
    /// Simulation domain bounds
    pub domain: DomainBounds,
    /// Initial inter-particle distance (meters)
    pub particle_spacing: f32,
    /// Fixed substep length (seconds)
    #[serde(default = "default_time_step")]
    pub time_step: f32,
    /// SPH solver settings; `gamma`, `B` and `surfaceTension` are required
    pub solver: SolverSettings,
    /// Scripted eruption; absent means no external forcing
    #[serde(default)]
    pub eruption: Option<EruptionForcing>,
    /// Initial fluid regions
    #[serde(default)]
    pub fluid_blocks: Vec<FluidBlock>,
    /// Rigid geometry
    #[serde(default)]
    pub rigid_bodies: Vec<RigidBox>,
    /// Stop after this many timesteps
    pub max_timesteps: Option<u64>,
    /// Stop after this much simulated time (seconds)
    pub max_time: Option<f64>,
    /// Publish a frame every this many substeps
    #[serde(default = "default_frame_interval")]
    pub frame_interval: u64,
}

/// Domain bounding box
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DomainBounds {
    /// Minimum corner [x, y, z]
    pub min: [f32; 3],
    /// Maximum corner [x, y, z]
    pub max: [f32; 3],
}

/// Axis-aligned block filled with fluid on a lattice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluidBlock {
    /// Minimum corner [x, y, z]
    pub min: [f32; 3],
    /// Maximum corner [x, y, z]
    pub max: [f32; 3],
    /// Initial velocity (m/s)
    #[serde(default)]
    pub velocity: [f32; 3],
}

/// Axis-aligned rigid box, sampled on its surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBox {
    /// Minimum corner [x, y, z]
    pub min: [f32; 3],
    /// Maximum corner [x, y, z]
    pub max: [f32; 3],
    /// Fluid/rigid viscosity coefficient
    #[serde(default = "default_sigma")]
    pub sigma: f32,
    /// Material density (kg/m^3)
    #[serde(default = "default_rigid_density")]
    pub density: f32,
    /// Whether the body receives reaction forces and moves
    #[serde(default)]
    pub dynamic: bool,
    /// Initial velocity (m/s); ignored for static bodies
    #[serde(default)]
    pub velocity: [f32; 3],
}

// Default values
fn default_time_step() -> f32 {
    4.0e-4
}

fn default_frame_interval() -> u64 {
    20
}

fn default_sigma() -> f32 {
    0.5
}

fn default_rigid_density() -> f32 {
    2500.0
}

fn check_box(what: &str, min: [f32; 3], max: [f32; 3]) -> Result<(), ConfigError> {
    for (axis, name) in ["x", "y", "z"].iter().enumerate() {
        if min[axis] >= max[axis] {
            return Err(ConfigError::Invalid(format!(
                "{what} min.{name} must be less than max.{name}"
            )));
        }
    }
    Ok(())
}

impl SimulationConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&contents)?;
        tracing::debug!("Loaded config {} from {}", config.name, path.display());
        Ok(config)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_box("Domain", self.domain.min, self.domain.max)?;

        if !(self.particle_spacing > 0.0) {
            return Err(ConfigError::Invalid("Particle spacing must be positive".to_string()));
        }
        if !(self.time_step > 0.0) {
            return Err(ConfigError::Invalid("time_step must be positive".to_string()));
        }
        if self.frame_interval == 0 {
            return Err(ConfigError::Invalid("frame_interval must be at least 1".to_string()));
        }

        // Check max_timesteps
        if let Some(max_timesteps) = self.max_timesteps {
            if max_timesteps == 0 {
                return Err(ConfigError::Invalid("max_timesteps must be at least 1".to_string()));
            }
        }

        // Check max_time
        if let Some(max_time) = self.max_time {
            if max_time <= 0.0 {
                return Err(ConfigError::Invalid("max_time must be positive".to_string()));
            }
        }

        for (i, block) in self.fluid_blocks.iter().enumerate() {
            check_box(&format!("fluid_blocks[{i}]"), block.min, block.max)?;
        }
        for (i, body) in self.rigid_bodies.iter().enumerate() {
            check_box(&format!("rigid_bodies[{i}]"), body.min, body.max)?;
            if !(body.density > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "rigid_bodies[{i}] density must be positive"
                )));
            }
            if !(body.sigma >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "rigid_bodies[{i}] sigma must be non-negative"
                )));
            }
        }

        if let Some(eruption) = &self.eruption {
            if !(eruption.crater_radius > 0.0) || eruption.period_steps == 0 {
                return Err(ConfigError::Invalid(
                    "eruption crater_radius and period_steps must be positive".to_string(),
                ));
            }
        }

        // Missing gamma / B / surfaceTension fail here, at load time.
        self.solver_params()?;
        Ok(())
    }

    /// Kernel support radius from particle spacing
    pub fn support_radius(&self) -> f32 {
        2.0 * self.particle_spacing
    }

    /// Validated solver constants
    pub fn solver_params(&self) -> Result<SolverParams, ConfigError> {
        Ok(SolverParams::from_settings(&self.solver, self.support_radius())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "name": "test",
        "domain": { "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 1.0] },
        "particle_spacing": 0.02,
        "solver": { "gamma": 7.0, "B": 50000.0, "surfaceTension": 0.01 }
    }"#;

    #[test]
    fn test_support_radius() {
        let config = SimulationConfig::from_json(MINIMAL).unwrap();
        assert!((config.support_radius() - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_defaults_and_key_aliases() {
        let config = SimulationConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.solver.gamma, Some(7.0));
        assert_eq!(config.solver.stiffness, Some(50_000.0));
        assert_eq!(config.solver.surface_tension, Some(0.01));
        assert_eq!(config.solver.rest_density, 1000.0);
        assert_eq!(config.time_step, default_time_step());
        assert_eq!(config.frame_interval, 20);
        assert!(config.eruption.is_none());
        assert!(config.fluid_blocks.is_empty());
    }

    #[test]
    fn test_missing_required_solver_key() {
        for key in ["gamma", "B", "surfaceTension"] {
            let mut value: serde_json::Value = serde_json::from_str(MINIMAL).unwrap();
            value["solver"].as_object_mut().unwrap().remove(key);
            let err = SimulationConfig::from_json(&value.to_string()).unwrap_err();
            match err {
                ConfigError::Solver(KernelError::MissingParameter(name)) => assert_eq!(name, key),
                other => panic!("expected missing {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validation_domain_bounds() {
        let mut config = SimulationConfig::from_json(MINIMAL).unwrap();
        config.domain.min[0] = 1.0;
        config.domain.max[0] = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.domain.min[0] = 0.0;
        config.domain.max[0] = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_particle_spacing() {
        let mut config = SimulationConfig::from_json(MINIMAL).unwrap();
        config.particle_spacing = -0.01;
        assert!(config.validate().is_err());

        config.particle_spacing = 0.01;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_eruption_defaults_fill_missing_fields() {
        let mut value: serde_json::Value = serde_json::from_str(MINIMAL).unwrap();
        value["eruption"] = serde_json::json!({ "crater_radius": 0.2 });
        let config = SimulationConfig::from_json(&value.to_string()).unwrap();
        let eruption = config.eruption.unwrap();
        assert_eq!(eruption.crater_radius, 0.2);
        assert_eq!(eruption.period_steps, 2000);
        assert_eq!(eruption.onset_time, 0.6);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimulationConfig::load("/nonexistent/lava.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
