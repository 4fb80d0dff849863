//! Life-support rules: per-subject consumption with accumulated problems.
//!
//! A rule runs once per tick for every active crew member. Its evaluation
//! is split in two so that all rules of a vessel can share one executor
//! run:
//!
//! 1. [`RuleDefinition::advance`] turns elapsed time into steps (continuous
//!    rules use seconds, interval rules whole intervals) and
//!    [`RuleDefinition::required`] yields the amount to consume.
//! 2. After the executor converged, [`RuleDefinition::settle`] accumulates or
//!    relaxes the problem and reports at most one threshold crossing.

use crate::id::{BrokerId, ResourceId};
use crate::modifier::ModifierToken;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// Problem levels at which notifications fire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub warning: f64,
    pub danger: f64,
    pub fatal: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: 0.33,
            danger: 0.66,
            fatal: 1.0,
        }
    }
}

impl Thresholds {
    /// Levels must be ordered and the fatal one positive.
    pub fn is_valid(&self) -> bool {
        self.warning >= 0.0
            && self.warning <= self.danger
            && self.danger <= self.fatal
            && self.fatal > 0.0
    }

    /// Where a breakdown puts the problem back.
    pub fn breakdown_level(&self) -> f64 {
        (self.warning + self.danger) * 0.5
    }
}

/// Optional notification texts. A crossing without text still notifies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleMessages {
    pub warning: Option<String>,
    pub danger: Option<String>,
    pub fatal: Option<String>,
    pub relax: Option<String>,
}

/// Name-based description of a rule, resolved by
/// [`CatalogBuilder::add_rule`](crate::catalog::CatalogBuilder::add_rule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub input: Option<String>,
    pub output: Option<String>,
    /// Seconds between executions; 0 means continuous.
    pub interval: f64,
    /// Input consumed per second, or per interval.
    pub rate: f64,
    /// Output produced per unit of input. Derived from densities when 0.
    pub ratio: f64,
    /// Problem added per second, or per interval.
    pub degeneration: f64,
    /// Per-subject spread of the degeneration, in `[0, 1]`.
    pub variance: f64,
    pub modifiers: Vec<String>,
    pub thresholds: Thresholds,
    pub messages: RuleMessages,
    /// Reaching the fatal threshold causes a breakdown instead of removal.
    pub breakdown: bool,
    /// Rule state survives subject recovery.
    pub lifetime: bool,
    /// Relax constant; the global default applies when unset.
    pub recovery: Option<f64>,
}

impl RuleSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            input: None,
            output: None,
            interval: 0.0,
            rate: 0.0,
            ratio: 0.0,
            degeneration: 0.0,
            variance: 0.0,
            modifiers: Vec::new(),
            thresholds: Thresholds::default(),
            messages: RuleMessages::default(),
            breakdown: false,
            lifetime: false,
            recovery: None,
        }
    }
}

/// A rule with every name resolved to a catalog handle.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    pub name: String,
    pub broker: BrokerId,
    pub input: Option<ResourceId>,
    pub output: Option<ResourceId>,
    pub interval: f64,
    pub rate: f64,
    pub ratio: f64,
    pub degeneration: f64,
    pub variance: f64,
    pub modifiers: Vec<ModifierToken>,
    pub thresholds: Thresholds,
    pub messages: RuleMessages,
    pub breakdown: bool,
    pub lifetime: bool,
    pub recovery: Option<f64>,
}

/// How a subject's rule state changed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Danger,
    /// The subject must be removed once all rules ran.
    Fatal,
    /// The problem was reset to between warning and danger.
    Breakdown,
    /// The problem dropped back below warning.
    Relax,
}

/// What one subject went through during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exposure {
    /// Product of the rule's modifiers.
    pub k: f64,
    /// Seconds or whole intervals executed.
    pub steps: f64,
    /// The input ran out this tick.
    pub starved: bool,
    /// The subject's variance factor.
    pub bias: f64,
}

impl RuleDefinition {
    pub fn is_continuous(&self) -> bool {
        self.interval <= 0.0
    }

    /// Advance the interval accumulator and return the steps to execute:
    /// seconds for continuous rules, whole intervals otherwise.
    pub fn advance(&self, data: &mut RuleData, elapsed: f64) -> f64 {
        if self.is_continuous() {
            return elapsed;
        }
        data.time_since += elapsed;
        let steps = (data.time_since / self.interval).floor();
        data.time_since -= steps * self.interval;
        steps
    }

    /// Input to consume for `steps` under modifier `k`, if the rule has an
    /// input and a meaningful rate.
    pub fn required(&self, k: f64, steps: f64, epsilon: f64) -> Option<(ResourceId, f64)> {
        let input = self.input?;
        if steps <= epsilon || self.rate <= epsilon {
            return None;
        }
        Some((input, self.rate * k * steps))
    }

    /// Accumulate or relax the problem, then check thresholds.
    ///
    /// Resourceless rules always degenerate while the modifier is positive;
    /// rules with an input degenerate only when it ran out.
    pub fn settle(
        &self,
        data: &mut RuleData,
        exposure: &Exposure,
        recovery: f64,
        epsilon: f64,
    ) -> Option<Severity> {
        let Exposure {
            k,
            steps,
            starved,
            bias,
        } = *exposure;
        if steps > epsilon {
            let trigger = self.input.is_none() || starved;
            if k > 0.0 && trigger {
                data.problem += self.degeneration * k * steps * bias;
            } else {
                data.problem *= 1.0 / (1.0 + self.interval.max(1.0) * steps * recovery);
            }
            data.problem = data.problem.max(0.0);
        }
        self.check_thresholds(data)
    }

    fn check_thresholds(&self, data: &mut RuleData) -> Option<Severity> {
        let t = &self.thresholds;
        if data.problem >= t.fatal {
            if self.breakdown {
                data.problem = t.breakdown_level();
                data.message = MessageLevel::Warning;
                Some(Severity::Breakdown)
            } else {
                Some(Severity::Fatal)
            }
        } else if data.problem >= t.danger && data.message < MessageLevel::Danger {
            data.message = MessageLevel::Danger;
            Some(Severity::Danger)
        } else if data.problem >= t.warning && data.message < MessageLevel::Warning {
            data.message = MessageLevel::Warning;
            Some(Severity::Warning)
        } else if data.problem < t.warning && data.message > MessageLevel::Nominal {
            data.message = MessageLevel::Nominal;
            Some(Severity::Relax)
        } else {
            None
        }
    }

    /// Text attached to a notification of `severity`, if any.
    pub fn message(&self, severity: Severity) -> Option<&str> {
        match severity {
            Severity::Warning => self.messages.warning.as_deref(),
            Severity::Danger => self.messages.danger.as_deref(),
            Severity::Fatal | Severity::Breakdown => self.messages.fatal.as_deref(),
            Severity::Relax => self.messages.relax.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-subject state
// ---------------------------------------------------------------------------

/// The last notification level reached, so each crossing fires once.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum MessageLevel {
    #[default]
    Nominal,
    Warning,
    Danger,
}

/// Mutable rule state of one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleData {
    pub problem: f64,
    pub message: MessageLevel,
    /// Seconds accumulated toward the next interval.
    pub time_since: f64,
    /// Survives subject recovery.
    pub lifetime: bool,
}

impl RuleData {
    pub fn new(lifetime: bool) -> Self {
        Self {
            lifetime,
            ..Default::default()
        }
    }

    /// Clear notification and interval state. The problem is cleared too
    /// unless the data is lifetime-flagged.
    pub fn reset(&mut self) {
        self.message = MessageLevel::Nominal;
        self.time_since = 0.0;
        if !self.lifetime {
            self.problem = 0.0;
        }
    }
}
