//! Simulation tuning.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest delay a JS timer honours; larger values fire immediately.
const MAX_TIMER_DELAY_MS: f64 = 2_147_483_647.0;

/// Constants and defaults for the force simulation.
///
/// Every field is optional when decoded, so a driver can override a single
/// constant with `{ "damping": 0.9 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Spring phase multiplier (default: 0.05).
    pub spring_constant: f64,
    /// Numerator of the inverse-square repulsion (default: 2000).
    pub repulsion: f64,
    /// Gap added to the summed radii before collision kicks in (default: 2).
    pub collision_margin: f64,
    /// Pull toward the viewport center, scaled by dt (default: 0.02).
    pub centering: f64,
    /// Per-step velocity multiplier (default: 0.85).
    pub damping: f64,
    /// Step size used by the run loop, in seconds (default: 1/60).
    pub time_step: f64,
    /// Frame rate the velocities are tuned for (default: 60).
    pub frame_rate: f64,
    /// Distance guard for the spring and pair phases (default: 0.01).
    pub epsilon: f64,
    /// Radius for nodes without a usable `r` (default: 10).
    pub default_radius: f64,
    /// Rest length for links without a usable `distance` (default: 100).
    pub default_distance: f64,
    /// Stiffness for links without a usable `strength` (default: 0.5).
    pub default_strength: f64,
    /// Weight for links without a usable `weight` (default: 1).
    pub default_weight: f64,
    /// Viewport width when the driver gives none (default: 800).
    pub default_width: f64,
    /// Viewport height when the driver gives none (default: 500).
    pub default_height: f64,
    /// Seed for random placement; fresh entropy per run when absent.
    pub seed: Option<u64>,
    /// Keep positions and velocities of ids that survive an update.
    pub warm_start: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            spring_constant: 0.05,
            repulsion: 2000.0,
            collision_margin: 2.0,
            centering: 0.02,
            damping: 0.85,
            time_step: 1.0 / 60.0,
            frame_rate: 60.0,
            epsilon: 0.01,
            default_radius: 10.0,
            default_distance: 100.0,
            default_strength: 0.5,
            default_weight: 1.0,
            default_width: 800.0,
            default_height: 500.0,
            seed: None,
            warm_start: false,
        }
    }
}

impl SimulationConfig {
    /// Replace unusable values with the defaults.
    ///
    /// Magnitudes must be finite and non-negative; sizes, step and guard
    /// values must be strictly positive.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            spring_constant: non_negative(self.spring_constant, defaults.spring_constant),
            repulsion: non_negative(self.repulsion, defaults.repulsion),
            collision_margin: non_negative(self.collision_margin, defaults.collision_margin),
            centering: non_negative(self.centering, defaults.centering),
            damping: non_negative(self.damping, defaults.damping),
            time_step: positive(self.time_step, defaults.time_step),
            frame_rate: positive(self.frame_rate, defaults.frame_rate),
            epsilon: positive(self.epsilon, defaults.epsilon),
            default_radius: positive(self.default_radius, defaults.default_radius),
            default_distance: positive(self.default_distance, defaults.default_distance),
            default_strength: non_negative(self.default_strength, defaults.default_strength),
            default_weight: non_negative(self.default_weight, defaults.default_weight),
            default_width: positive(self.default_width, defaults.default_width),
            default_height: positive(self.default_height, defaults.default_height),
            seed: self.seed,
            warm_start: self.warm_start,
        }
    }

    /// Wall-clock time between loop iterations.
    ///
    /// A step too long to represent falls back to the default step.
    pub fn frame_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_step)
            .unwrap_or_else(|_| Duration::from_secs_f64(Self::default().time_step))
    }

    /// Milliseconds between loop iterations when no display-synchronized
    /// primitive is available.
    pub fn frame_interval_ms(&self) -> f64 {
        (self.frame_interval().as_secs_f64() * 1000.0).min(MAX_TIMER_DELAY_MS)
    }

    /// Resolve a driver-supplied viewport, falling back per axis.
    pub fn viewport(&self, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
        (
            width.map_or(self.default_width, |w| positive(w, self.default_width)),
            height.map_or(self.default_height, |h| positive(h, self.default_height)),
        )
    }
}

#[inline]
pub(crate) fn positive(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 { value } else { fallback }
}

#[inline]
pub(crate) fn non_negative(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 { value } else { fallback }
}
