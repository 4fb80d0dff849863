//! Tunable constants for the simulation.
//!
//! Every field has a default so a settings file only needs to name the
//! values it overrides.

use serde::{Deserialize, Serialize};

/// Constants consumed by the modifier evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierSettings {
    /// Multiplier applied by the `pressure` token when the habitat is not
    /// pressurized.
    pub pressure_factor: f64,
    /// Waste-atmosphere level above which the habitat counts as poisoned.
    pub poisoning_threshold: f64,
    /// Multiplier applied by the `poisoning` token above the threshold.
    pub poisoning_factor: f64,
    /// Relative humidity above which the habitat counts as humid.
    pub humidity_threshold: f64,
    /// Multiplier applied by the `humidity` token above the threshold.
    pub humidity_factor: f64,
    /// Background radiation floor, in rad/s.
    pub nominal_radiation: f64,
}

impl Default for ModifierSettings {
    fn default() -> Self {
        Self {
            pressure_factor: 10.0,
            poisoning_threshold: 0.02,
            poisoning_factor: 10.0,
            humidity_threshold: 0.95,
            humidity_factor: 10.0,
            nominal_radiation: 1e-8,
        }
    }
}

/// All engine settings, grouped by consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub modifiers: ModifierSettings,
    /// Default relax constant for rules that do not declare one.
    pub recovery_rate: f64,
    /// Fraction below which an executor step counts as no progress.
    pub epsilon: f64,
    /// Extra evaluations the projection runs before the reported one.
    pub warmup_steps: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            modifiers: ModifierSettings::default(),
            recovery_rate: 0.002,
            epsilon: 1e-12,
            warmup_steps: 4,
        }
    }
}
