//! Serde data file structs for life-support profile definitions.
//!
//! These structs define the on-disk format for resources, rules, processes
//! and supplies. They are deserialized from RON, JSON, or TOML data files and
//! then turned into catalog specs by the loader.

use lifeflow_core::catalog::{CatalogError, parse_rate};
use lifeflow_core::process::{DumpSelection, ProcessSpec};
use lifeflow_core::rule::{RuleMessages, RuleSpec, Thresholds};
use lifeflow_core::supply::SupplySpec;
use serde::Deserialize;

// ===========================================================================
// Resources
// ===========================================================================

/// A resource definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceEntry {
    pub name: String,
    /// Mass per unit. Resources without mass (electric charge) omit it.
    #[serde(default)]
    pub density: f64,
}

// ===========================================================================
// Rules
// ===========================================================================

/// A rule definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    pub name: String,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub interval: f64,
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub ratio: f64,
    #[serde(default)]
    pub degeneration: f64,
    #[serde(default)]
    pub variance: f64,
    /// Comma-separated modifier tokens, e.g. `"breathable,per_capita"`.
    #[serde(default)]
    pub modifier: String,
    #[serde(default = "default_warning")]
    pub warning_threshold: f64,
    #[serde(default = "default_danger")]
    pub danger_threshold: f64,
    #[serde(default = "default_fatal")]
    pub fatal_threshold: f64,
    #[serde(default)]
    pub warning_message: Option<String>,
    #[serde(default)]
    pub danger_message: Option<String>,
    #[serde(default)]
    pub fatal_message: Option<String>,
    #[serde(default)]
    pub relax_message: Option<String>,
    #[serde(default)]
    pub breakdown: bool,
    #[serde(default)]
    pub lifetime: bool,
    #[serde(default)]
    pub recovery: Option<f64>,
}

fn default_warning() -> f64 {
    Thresholds::default().warning
}

fn default_danger() -> f64 {
    Thresholds::default().danger
}

fn default_fatal() -> f64 {
    Thresholds::default().fatal
}

impl RuleEntry {
    pub fn to_spec(&self) -> RuleSpec {
        let mut spec = RuleSpec::new(&self.name);
        spec.input = non_empty(self.input.as_deref());
        spec.output = non_empty(self.output.as_deref());
        spec.interval = self.interval;
        spec.rate = self.rate;
        spec.ratio = self.ratio;
        spec.degeneration = self.degeneration;
        spec.variance = self.variance;
        spec.modifiers = tokenize(&self.modifier);
        spec.thresholds = Thresholds {
            warning: self.warning_threshold,
            danger: self.danger_threshold,
            fatal: self.fatal_threshold,
        };
        spec.messages = RuleMessages {
            warning: non_empty(self.warning_message.as_deref()),
            danger: non_empty(self.danger_message.as_deref()),
            fatal: non_empty(self.fatal_message.as_deref()),
            relax: non_empty(self.relax_message.as_deref()),
        };
        spec.breakdown = self.breakdown;
        spec.lifetime = self.lifetime;
        spec.recovery = self.recovery;
        spec
    }
}

// ===========================================================================
// Processes
// ===========================================================================

/// A process definition in a data file. Inputs and outputs are
/// `resource@rate` tokens with rates per second.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessEntry {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub modifier: String,
    /// `"all"`, `"none"`, or a comma-separated list of output names.
    #[serde(default = "default_dumpable")]
    pub dumpable: String,
    #[serde(default)]
    pub default_dumped: String,
}

fn default_dumpable() -> String {
    "all".to_string()
}

impl ProcessEntry {
    pub fn to_spec(&self) -> Result<ProcessSpec, CatalogError> {
        let mut spec = ProcessSpec::new(&self.name);
        for token in &self.inputs {
            let (resource, rate) = parse_rate(&self.name, token)?;
            spec = spec.input(&resource, rate);
        }
        for token in &self.outputs {
            let (resource, rate) = parse_rate(&self.name, token)?;
            spec = spec.output(&resource, rate);
        }
        for token in tokenize(&self.modifier) {
            spec = spec.modifier(&token);
        }
        spec.dumpable = dump_selection(&self.dumpable);
        spec.default_dumped = dump_selection(&self.default_dumped);
        Ok(spec)
    }
}

fn dump_selection(text: &str) -> DumpSelection {
    match text.trim() {
        "all" => DumpSelection::All,
        "" | "none" => DumpSelection::None,
        list => DumpSelection::Only(tokenize(list)),
    }
}

// ===========================================================================
// Supplies
// ===========================================================================

/// A supply definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplyEntry {
    pub resource: String,
    #[serde(default = "default_low_threshold")]
    pub low_threshold: f64,
    #[serde(default)]
    pub low_message: Option<String>,
    #[serde(default)]
    pub empty_message: Option<String>,
    #[serde(default)]
    pub refill_message: Option<String>,
    #[serde(default)]
    pub monitor_unmanned: bool,
}

fn default_low_threshold() -> f64 {
    0.15
}

impl SupplyEntry {
    pub fn to_spec(&self) -> SupplySpec {
        let mut spec = SupplySpec::new(&self.resource);
        spec.low_threshold = self.low_threshold;
        spec.low_message = non_empty(self.low_message.as_deref());
        spec.empty_message = non_empty(self.empty_message.as_deref());
        spec.refill_message = non_empty(self.refill_message.as_deref());
        spec.monitor_unmanned = self.monitor_unmanned;
        spec
    }
}

// ===========================================================================
// Whole profiles
// ===========================================================================

/// Every list of a profile in one document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProfileData {
    pub resources: Vec<ResourceEntry>,
    pub rules: Vec<RuleEntry>,
    pub processes: Vec<ProcessEntry>,
    pub supplies: Vec<SupplyEntry>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_entry_ron_with_defaults() {
        let ron_str = r#"(name: "eating", input: Some("Food"), interval: 21600.0, rate: 0.3, degeneration: 0.05)"#;
        let entry: RuleEntry = ron::from_str(ron_str).unwrap();
        let spec = entry.to_spec();
        assert_eq!(spec.name, "eating");
        assert_eq!(spec.input.as_deref(), Some("Food"));
        assert_eq!(spec.output, None);
        assert_eq!(spec.thresholds, Thresholds::default());
        assert!(spec.modifiers.is_empty());
        assert_eq!(spec.recovery, None);
    }

    #[test]
    fn rule_entry_modifiers_and_messages() {
        let json = r#"{
            "name": "breathing",
            "input": "Oxygen",
            "output": "CarbonDioxide",
            "rate": 0.01,
            "degeneration": 0.2,
            "modifier": "breathable, per_capita",
            "fatal_message": "suffocated",
            "relax_message": ""
        }"#;
        let entry: RuleEntry = serde_json::from_str(json).unwrap();
        let spec = entry.to_spec();
        assert_eq!(spec.modifiers, vec!["breathable", "per_capita"]);
        assert_eq!(spec.messages.fatal.as_deref(), Some("suffocated"));
        assert_eq!(spec.messages.relax, None);
    }

    #[test]
    fn empty_input_means_none() {
        let entry: RuleEntry =
            serde_json::from_str(r#"{"name": "climate", "input": "", "degeneration": 0.002}"#)
                .unwrap();
        assert_eq!(entry.to_spec().input, None);
    }

    #[test]
    fn process_entry_parses_rate_tokens() {
        let toml_str = r#"
name = "scrubber"
inputs = ["CarbonDioxide@0.01", "ElectricCharge@0.5"]
outputs = ["Oxygen@0.01"]
default_dumped = "Oxygen"
"#;
        let entry: ProcessEntry = toml::from_str(toml_str).unwrap();
        let spec = entry.to_spec().unwrap();
        assert_eq!(
            spec.inputs,
            vec![
                ("CarbonDioxide".to_string(), 0.01),
                ("ElectricCharge".to_string(), 0.5)
            ]
        );
        assert_eq!(spec.outputs, vec![("Oxygen".to_string(), 0.01)]);
        assert_eq!(spec.dumpable, DumpSelection::All);
        assert_eq!(
            spec.default_dumped,
            DumpSelection::Only(vec!["Oxygen".to_string()])
        );
    }

    #[test]
    fn process_entry_rejects_malformed_token() {
        let entry: ProcessEntry =
            serde_json::from_str(r#"{"name": "broken", "inputs": ["Oxygen"]}"#).unwrap();
        assert!(matches!(
            entry.to_spec(),
            Err(CatalogError::MalformedRate { ref token, .. }) if token == "Oxygen"
        ));
    }

    #[test]
    fn dump_selection_keywords() {
        assert_eq!(dump_selection("all"), DumpSelection::All);
        assert_eq!(dump_selection("none"), DumpSelection::None);
        assert_eq!(dump_selection("  "), DumpSelection::None);
        assert_eq!(
            dump_selection("Water, WasteWater"),
            DumpSelection::Only(vec!["Water".to_string(), "WasteWater".to_string()])
        );
    }

    #[test]
    fn supply_entry_defaults() {
        let entry: SupplyEntry = ron::from_str(r#"(resource: "Food")"#).unwrap();
        let spec = entry.to_spec();
        assert_eq!(spec.low_threshold, 0.15);
        assert!(!spec.monitor_unmanned);
        assert_eq!(spec.low_message, None);
    }

    #[test]
    fn resource_entry_without_density() {
        let entry: ResourceEntry =
            toml::from_str(r#"name = "ElectricCharge""#).unwrap();
        assert_eq!(entry.density, 0.0);
    }

    #[test]
    fn profile_data_missing_lists_are_empty() {
        let profile: ProfileData =
            serde_json::from_str(r#"{"resources": [{"name": "Food", "density": 0.28}]}"#)
                .unwrap();
        assert_eq!(profile.resources.len(), 1);
        assert!(profile.rules.is_empty());
        assert!(profile.processes.is_empty());
        assert!(profile.supplies.is_empty());
    }
}
