//! Vessel-level production processes (converters, scrubbers, recyclers).

use crate::id::{BrokerId, ResourceId};
use crate::modifier::ModifierToken;
use crate::recipe::Recipe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which outputs a process may or does dump by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpSelection {
    #[default]
    All,
    None,
    Only(Vec<String>),
}

/// Name-based description of a process, resolved by
/// [`CatalogBuilder::add_process`](crate::catalog::CatalogBuilder::add_process).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub name: String,
    /// `(resource, rate per second)` pairs.
    pub inputs: Vec<(String, f64)>,
    pub outputs: Vec<(String, f64)>,
    pub modifiers: Vec<String>,
    /// Outputs the crew may choose to dump. Defaults to all.
    pub dumpable: DumpSelection,
    /// Outputs dumped unless overridden. Defaults to none.
    pub default_dumped: DumpSelection,
}

impl ProcessSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            modifiers: Vec::new(),
            dumpable: DumpSelection::All,
            default_dumped: DumpSelection::None,
        }
    }

    pub fn input(mut self, resource: &str, rate: f64) -> Self {
        self.inputs.push((resource.to_string(), rate));
        self
    }

    pub fn output(mut self, resource: &str, rate: f64) -> Self {
        self.outputs.push((resource.to_string(), rate));
        self
    }

    pub fn modifier(mut self, token: &str) -> Self {
        self.modifiers.push(token.to_string());
        self
    }
}

/// A resource and its nominal rate per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub resource: ResourceId,
    pub rate: f64,
}

/// A process with every name resolved to a catalog handle.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDefinition {
    pub name: String,
    pub broker: BrokerId,
    pub inputs: Vec<RateEntry>,
    pub outputs: Vec<RateEntry>,
    pub modifiers: Vec<ModifierToken>,
    pub dumpable: Vec<ResourceId>,
    pub default_dumped: Vec<ResourceId>,
}

impl ProcessDefinition {
    pub fn is_dumpable(&self, resource: ResourceId) -> bool {
        self.dumpable.contains(&resource)
    }

    /// Build the recipe for one tick, or `None` when the process is idle.
    pub fn recipe(
        &self,
        data: &ProcessData,
        k: f64,
        elapsed: f64,
        epsilon: f64,
    ) -> Option<Recipe> {
        if k <= epsilon || data.fraction <= epsilon || elapsed <= 0.0 {
            return None;
        }
        let scale = k * data.fraction * elapsed;
        let mut recipe = Recipe::new(self.broker);
        for entry in &self.inputs {
            recipe.input(entry.resource, entry.rate * scale);
        }
        for entry in &self.outputs {
            recipe.output(
                entry.resource,
                entry.rate * scale,
                data.is_dumped(self, entry.resource),
            );
        }
        Some(recipe)
    }
}

/// Per-vessel configuration of a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessData {
    /// Desired fraction of the nominal rate, in `[0, 1]`.
    fraction: f64,
    /// Dump choices that differ from the process default.
    dump_overrides: BTreeMap<ResourceId, bool>,
}

impl Default for ProcessData {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ProcessData {
    pub fn new(fraction: f64) -> Self {
        Self {
            fraction: clamp_fraction(fraction),
            dump_overrides: BTreeMap::new(),
        }
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn set_fraction(&mut self, fraction: f64) {
        self.fraction = clamp_fraction(fraction);
    }

    /// Override the dump policy of an output. Returns `false` and changes
    /// nothing when the output is not dumpable.
    pub fn set_dump(&mut self, def: &ProcessDefinition, resource: ResourceId, dump: bool) -> bool {
        if !def.is_dumpable(resource) {
            return false;
        }
        self.dump_overrides.insert(resource, dump);
        true
    }

    /// Whether `resource` is currently dumped.
    pub fn is_dumped(&self, def: &ProcessDefinition, resource: ResourceId) -> bool {
        if !def.is_dumpable(resource) {
            return false;
        }
        self.dump_overrides
            .get(&resource)
            .copied()
            .unwrap_or_else(|| def.default_dumped.contains(&resource))
    }
}

fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}
