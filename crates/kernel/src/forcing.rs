//! Scripted external forcing fields.
//!
//! A forcing field maps (tick, position) to an extra acceleration that the
//! non-pressure pass adds to every fluid particle. Scripted effects plug in
//! here without touching the SPH terms.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Explicit simulation clock threaded through the substep scheduler.
///
/// `index` counts completed substeps; `dt` is the step length supplied by
/// the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Number of substeps already taken.
    pub index: u64,
    /// Step length (seconds).
    pub dt: f32,
}

impl Tick {
    /// First tick of a run.
    pub fn start(dt: f32) -> Self {
        Self { index: 0, dt }
    }

    /// Simulated time `index * dt` in seconds.
    pub fn time(&self) -> f64 {
        self.index as f64 * self.dt as f64
    }

    /// The tick after this one, keeping `dt`.
    pub fn next(self) -> Self {
        Self {
            index: self.index + 1,
            dt: self.dt,
        }
    }
}

/// A time- and position-dependent external acceleration.
pub trait ForcingField: Send + Sync {
    /// Acceleration applied to a fluid particle at `position` during `tick`.
    fn acceleration(&self, tick: Tick, position: [f32; 3]) -> [f32; 3];
}

impl<T: ForcingField + ?Sized> ForcingField for Box<T> {
    fn acceleration(&self, tick: Tick, position: [f32; 3]) -> [f32; 3] {
        (**self).acceleration(tick, position)
    }
}

/// Forcing field that never pushes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoForcing;

impl ForcingField for NoForcing {
    fn acceleration(&self, _tick: Tick, _position: [f32; 3]) -> [f32; 3] {
        [0.0; 3]
    }
}

/// Pulsing volcanic eruption below a crater.
///
/// After `onset_time` seconds, fluid within `crater_radius` (measured in the
/// horizontal x/z plane) of `crater_center` is pushed upward and radially
/// outward. Both magnitudes are scaled by
/// `0.5 + 0.5 * sin(2 pi * index / period_steps)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EruptionForcing {
    /// Crater center; the y component is ignored.
    #[serde(default = "default_crater_center")]
    pub crater_center: [f32; 3],
    /// Horizontal radius of influence (m).
    #[serde(default = "default_crater_radius")]
    pub crater_radius: f32,
    /// Peak upward acceleration (m/s^2).
    #[serde(default = "default_upward_magnitude")]
    pub upward_magnitude: f32,
    /// Peak radial acceleration (m/s^2).
    #[serde(default = "default_horizontal_magnitude")]
    pub horizontal_magnitude: f32,
    /// Substeps per full pulse cycle.
    #[serde(default = "default_period_steps")]
    pub period_steps: u64,
    /// Simulated time after which the eruption starts (s).
    #[serde(default = "default_onset_time")]
    pub onset_time: f64,
}

fn default_crater_center() -> [f32; 3] {
    [0.85, 0.15, 0.85]
}

fn default_crater_radius() -> f32 {
    0.15
}

fn default_upward_magnitude() -> f32 {
    20.0
}

fn default_horizontal_magnitude() -> f32 {
    5.0
}

fn default_period_steps() -> u64 {
    2000
}

fn default_onset_time() -> f64 {
    0.6
}

impl Default for EruptionForcing {
    fn default() -> Self {
        Self {
            crater_center: default_crater_center(),
            crater_radius: default_crater_radius(),
            upward_magnitude: default_upward_magnitude(),
            horizontal_magnitude: default_horizontal_magnitude(),
            period_steps: default_period_steps(),
            onset_time: default_onset_time(),
        }
    }
}

impl EruptionForcing {
    /// Pulse factor in `[0, 1]` for `tick`, or `None` before the onset.
    pub fn pulse(&self, tick: Tick) -> Option<f32> {
        if tick.time() <= self.onset_time {
            return None;
        }
        let period = self.period_steps.max(1) as f64;
        let phase = 2.0 * PI * tick.index as f64 / period;
        Some((0.5 + 0.5 * phase.sin()) as f32)
    }
}

impl ForcingField for EruptionForcing {
    fn acceleration(&self, tick: Tick, position: [f32; 3]) -> [f32; 3] {
        let Some(factor) = self.pulse(tick) else {
            return [0.0; 3];
        };

        let dx = position[0] - self.crater_center[0];
        let dz = position[2] - self.crater_center[2];
        let horizontal_dist = (dx * dx + dz * dz).sqrt();
        if horizontal_dist >= self.crater_radius {
            return [0.0; 3];
        }

        let upward = self.upward_magnitude * factor;
        // Exactly above the center the radial direction is undefined.
        if horizontal_dist > 0.0 {
            let radial = self.horizontal_magnitude * factor / horizontal_dist;
            [radial * dx, upward, radial * dz]
        } else {
            [0.0, upward, 0.0]
        }
    }
}
