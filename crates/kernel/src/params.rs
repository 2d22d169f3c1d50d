//! Solver parameters and their validation.
//!
//! [`SolverSettings`] is the deserializable shape read from configuration; the
//! keys `gamma`, `B` and `surfaceTension` have no defaults and must be present.
//! [`SolverParams`] is the validated form the substep pipeline consumes.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

/// Raw solver settings as they appear in a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Rest density rho_0 (kg/m^3)
    #[serde(default = "default_density0", alias = "density0")]
    pub rest_density: f32,
    /// Fluid viscosity coefficient mu used by the artificial viscosity term.
    #[serde(default = "default_viscosity")]
    pub viscosity: f32,
    /// Numerical speed of sound c_s (m/s)
    #[serde(default = "default_speed_of_sound", alias = "c_s")]
    pub speed_of_sound: f32,
    /// Gravity vector (m/s^2)
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    /// Tait exponent. Required.
    #[serde(default)]
    pub gamma: Option<f32>,
    /// Tait stiffness B (Pa). Required.
    #[serde(default, alias = "B")]
    pub stiffness: Option<f32>,
    /// Surface tension coefficient. Required.
    #[serde(default, alias = "surfaceTension")]
    pub surface_tension: Option<f32>,
}

fn default_density0() -> f32 {
    1000.0
}

fn default_viscosity() -> f32 {
    0.05
}

fn default_speed_of_sound() -> f32 {
    50.0
}

fn default_gravity() -> [f32; 3] {
    [0.0, -9.81, 0.0]
}

impl Default for SolverSettings {
    /// Defaults for the optional keys; the required keys stay unset.
    fn default() -> Self {
        Self {
            rest_density: default_density0(),
            viscosity: default_viscosity(),
            speed_of_sound: default_speed_of_sound(),
            gravity: default_gravity(),
            gamma: None,
            stiffness: None,
            surface_tension: None,
        }
    }
}

/// Validated constants for one solver instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverParams {
    /// Rest density rho_0 (kg/m^3)
    pub rest_density: f32,
    /// Kernel support radius h (m)
    pub support_radius: f32,
    /// Numerical speed of sound c_s (m/s)
    pub speed_of_sound: f32,
    /// Tait exponent gamma
    pub gamma: f32,
    /// Tait stiffness B (Pa)
    pub stiffness: f32,
    /// Surface tension coefficient
    pub surface_tension: f32,
    /// Fluid viscosity coefficient mu
    pub viscosity: f32,
    /// Gravity vector (m/s^2)
    pub gravity: [f32; 3],
}

impl SolverParams {
    /// Validate `settings` and pair them with the kernel support radius.
    ///
    /// Fails if a required key is absent rather than silently defaulting it.
    pub fn from_settings(settings: &SolverSettings, support_radius: f32) -> KernelResult<Self> {
        let gamma = settings.gamma.ok_or(KernelError::MissingParameter("gamma"))?;
        let stiffness = settings.stiffness.ok_or(KernelError::MissingParameter("B"))?;
        let surface_tension = settings
            .surface_tension
            .ok_or(KernelError::MissingParameter("surfaceTension"))?;

        let params = Self {
            rest_density: settings.rest_density,
            support_radius,
            speed_of_sound: settings.speed_of_sound,
            gamma,
            stiffness,
            surface_tension,
            viscosity: settings.viscosity,
            gravity: settings.gravity,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check admissible ranges.
    pub fn validate(&self) -> KernelResult<()> {
        positive("support_radius", self.support_radius)?;
        positive("density0", self.rest_density)?;
        positive("speed_of_sound", self.speed_of_sound)?;
        positive("gamma", self.gamma)?;
        non_negative("B", self.stiffness)?;
        non_negative("surfaceTension", self.surface_tension)?;
        non_negative("viscosity", self.viscosity)?;
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(KernelError::InvalidParameter {
                name: "gravity",
                reason: "components must be finite".to_string(),
            });
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f32) -> KernelResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KernelError::InvalidParameter {
            name,
            reason: format!("must be positive, got {value}"),
        })
    }
}

fn non_negative(name: &'static str, value: f32) -> KernelResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(KernelError::InvalidParameter {
            name,
            reason: format!("must be non-negative, got {value}"),
        })
    }
}
