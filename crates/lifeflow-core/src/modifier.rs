//! Environmental modifiers: named tokens that scale a nominal rate.
//!
//! Tokens are resolved once when a definition enters the catalog. Evaluation
//! is a pure fold over the token list against a read-only
//! [`VesselEnvironment`] and the vessel's current stocks.

use crate::id::ResourceId;
use crate::settings::ModifierSettings;
use crate::stock::StockSet;
use serde::{Deserialize, Serialize};

/// Divisors at or below this are treated as absent.
const DIVISOR_EPSILON: f64 = 1e-12;

/// One factor of a modifier expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierToken {
    Breathable,
    Temperature,
    Radiation,
    Shielding,
    Volume,
    Surface,
    LivingSpace,
    Comfort,
    Pressure,
    Poisoning,
    Humidity,
    PerCapita,
    /// Scale by the current amount of a resource.
    Resource(ResourceId),
}

impl ModifierToken {
    /// Map a reserved token name to its token. Any other name is a resource
    /// reference and must be resolved through the catalog.
    pub fn reserved(name: &str) -> Option<Self> {
        let token = match name {
            "breathable" => Self::Breathable,
            "temperature" => Self::Temperature,
            "radiation" => Self::Radiation,
            "shielding" => Self::Shielding,
            "volume" => Self::Volume,
            "surface" => Self::Surface,
            "living_space" => Self::LivingSpace,
            "comfort" => Self::Comfort,
            "pressure" => Self::Pressure,
            "poisoning" => Self::Poisoning,
            "humidity" => Self::Humidity,
            "per_capita" => Self::PerCapita,
            _ => return None,
        };
        Some(token)
    }
}

/// Read-only snapshot of the conditions aboard a vessel, computed by the
/// host's environment analysis before each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselEnvironment {
    /// Whether the ambient air outside is breathable.
    pub breathable: bool,
    /// Deviation from the survivable temperature range, in kelvin.
    pub temperature_deviation: f64,
    /// Ambient dose rate, in rad/s.
    pub radiation: f64,
    /// Dose rate emitted by the vessel itself, in rad/s.
    pub emitted_radiation: f64,
    /// Shielding effectiveness in `[0, 1]`.
    pub shielding: f64,
    /// Habitat volume, in m^3.
    pub volume: f64,
    /// Habitat surface, in m^2.
    pub surface: f64,
    pub living_space: f64,
    pub comfort: f64,
    pub pressurized: bool,
    /// Waste-atmosphere level in the habitat.
    pub poisoning: f64,
    /// Relative humidity in the habitat.
    pub humidity: f64,
    pub crew_count: u32,
    /// Crew capacity of the vessel.
    pub crew_capacity: u32,
    /// Fraction of full sunlight reaching the vessel, in `[0, 1]`.
    pub sunlight: f64,
}

impl Default for VesselEnvironment {
    fn default() -> Self {
        Self {
            breathable: false,
            temperature_deviation: 0.0,
            radiation: 0.0,
            emitted_radiation: 0.0,
            shielding: 0.0,
            volume: 1.0,
            surface: 1.0,
            living_space: 1.0,
            comfort: 1.0,
            pressurized: true,
            poisoning: 0.0,
            humidity: 0.0,
            crew_count: 0,
            crew_capacity: 0,
            sunlight: 1.0,
        }
    }
}

/// Fold `tokens` into a multiplier, starting from 1.0.
pub fn evaluate(
    env: &VesselEnvironment,
    stocks: &StockSet,
    settings: &ModifierSettings,
    tokens: &[ModifierToken],
) -> f64 {
    let mut k = 1.0;
    for token in tokens {
        match *token {
            ModifierToken::Breathable => {
                if env.breathable {
                    k = 0.0;
                }
            }
            ModifierToken::Temperature => k *= env.temperature_deviation.max(0.0),
            ModifierToken::Radiation => {
                k *= (env.radiation + env.emitted_radiation).max(settings.nominal_radiation)
            }
            ModifierToken::Shielding => k *= (1.0 - env.shielding).max(0.0),
            ModifierToken::Volume => k *= env.volume,
            ModifierToken::Surface => k *= env.surface,
            ModifierToken::LivingSpace => k = divide(k, env.living_space),
            ModifierToken::Comfort => k = divide(k, env.comfort),
            ModifierToken::Pressure => {
                if !env.pressurized {
                    k *= settings.pressure_factor;
                }
            }
            ModifierToken::Poisoning => {
                if env.poisoning > settings.poisoning_threshold {
                    k *= settings.poisoning_factor;
                }
            }
            ModifierToken::Humidity => {
                if env.humidity > settings.humidity_threshold {
                    k *= settings.humidity_factor;
                }
            }
            ModifierToken::PerCapita => k /= f64::from(env.crew_count.max(1)),
            ModifierToken::Resource(resource) => k *= stocks.amount(resource),
        }
    }
    k
}

/// Protective factors divide the rate; a missing factor leaves it unchanged.
fn divide(k: f64, factor: f64) -> f64 {
    if factor > DIVISOR_EPSILON {
        k / factor
    } else {
        k
    }
}
