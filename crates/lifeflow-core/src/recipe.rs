//! Recipes and the fixed-point executor that applies them.
//!
//! A [`Recipe`] is a weighted bundle of inputs and outputs that executes in
//! fractions. [`execute_recipes`] repeatedly offers every unfinished recipe
//! the largest fraction the current stocks allow, and stops after the first
//! full pass in which nothing executed.
//!
//! Recipes competing for a scarce resource within one pass are served in
//! slice order: an earlier recipe can claim more of the resource than a
//! later one.

use crate::id::{BrokerId, ResourceId};
use crate::stock::StockSet;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Recipe types
// ---------------------------------------------------------------------------

/// A resource drawn by a recipe at full execution.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecipeInput {
    pub resource: ResourceId,
    pub quantity: f64,
}

/// A resource produced by a recipe at full execution.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecipeOutput {
    pub resource: ResourceId,
    pub quantity: f64,
    /// Discard what does not fit instead of throttling the recipe.
    pub dump: bool,
}

/// A batch of inputs and outputs executed against shared stocks.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Recipe {
    /// Credited with every consumption and production of this recipe.
    pub broker: BrokerId,
    inputs: Vec<RecipeInput>,
    outputs: Vec<RecipeOutput>,
    /// Fraction still to execute, in `[0, 1]`.
    remaining: f64,
}

impl Recipe {
    pub fn new(broker: BrokerId) -> Self {
        Self {
            broker,
            inputs: Vec::new(),
            outputs: Vec::new(),
            remaining: 1.0,
        }
    }

    /// Add an input. Quantities that are not positive are ignored.
    pub fn input(&mut self, resource: ResourceId, quantity: f64) -> &mut Self {
        if quantity > 0.0 && quantity.is_finite() {
            self.inputs.push(RecipeInput { resource, quantity });
        }
        self
    }

    /// Add an output. Quantities that are not positive are ignored.
    pub fn output(&mut self, resource: ResourceId, quantity: f64, dump: bool) -> &mut Self {
        if quantity > 0.0 && quantity.is_finite() {
            self.outputs.push(RecipeOutput {
                resource,
                quantity,
                dump,
            });
        }
        self
    }

    pub fn inputs(&self) -> &[RecipeInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[RecipeOutput] {
        &self.outputs
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    /// True when there is nothing left to execute.
    pub fn is_done(&self, epsilon: f64) -> bool {
        self.remaining <= epsilon
    }

    /// The largest fraction the stocks currently allow.
    pub fn executable_fraction(&self, stocks: &StockSet) -> f64 {
        let mut fraction = self.remaining;
        for input in &self.inputs {
            let available = stocks.amount(input.resource) / input.quantity;
            fraction = fraction.min(available.clamp(0.0, self.remaining));
        }
        for output in self.outputs.iter().filter(|o| !o.dump) {
            let space =
                stocks.capacity(output.resource) - stocks.amount(output.resource);
            fraction = fraction.min((space / output.quantity).clamp(0.0, self.remaining));
        }
        fraction.max(0.0)
    }

    /// Execute as much as possible in one step and return the fraction
    /// executed.
    pub fn step(&mut self, stocks: &mut StockSet) -> f64 {
        let fraction = self.executable_fraction(stocks);
        if fraction <= 0.0 {
            return 0.0;
        }
        for input in &self.inputs {
            stocks.consume(input.resource, input.quantity * fraction, self.broker);
        }
        for output in &self.outputs {
            stocks.produce(output.resource, output.quantity * fraction, self.broker);
        }
        self.remaining = (self.remaining - fraction).max(0.0);
        fraction
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// What one executor run did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    /// Full passes over the batch, including the final idle one.
    pub passes: u64,
    /// Recipe steps that executed a fraction above epsilon.
    pub steps: u64,
    /// The pass bound was exceeded. Only non-finite stocks or a
    /// non-positive epsilon can get here.
    pub capped: bool,
}

/// Apply `recipes` against `stocks` until a full pass executes nothing.
///
/// Every stock a recipe references is clamped to its bounds afterwards.
/// Already finished recipes are skipped, so a second call on the same batch
/// performs no mutation.
pub fn execute_recipes(
    recipes: &mut [Recipe],
    stocks: &mut StockSet,
    epsilon: f64,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    if recipes.is_empty() {
        return report;
    }

    // Every pass with progress retires more than `epsilon` of the summed
    // remaining fractions, so a converging batch never reaches this bound.
    let outstanding: f64 = recipes.iter().map(Recipe::remaining).sum();
    let max_passes = pass_bound(outstanding, epsilon);

    loop {
        report.passes += 1;
        let mut progress = false;
        for recipe in recipes.iter_mut() {
            if recipe.is_done(epsilon) {
                continue;
            }
            let executed = recipe.step(stocks);
            if executed > epsilon {
                report.steps += 1;
                progress = true;
            }
        }
        log::trace!("executor pass {}: progress={progress}", report.passes);
        if !progress {
            break;
        }
        if report.passes >= max_passes {
            log::warn!(
                "recipe executor stopped after {} passes without reaching a fixed point",
                report.passes
            );
            report.capped = true;
            break;
        }
    }

    let touched: BTreeSet<ResourceId> = recipes
        .iter()
        .flat_map(|r| {
            r.inputs
                .iter()
                .map(|i| i.resource)
                .chain(r.outputs.iter().map(|o| o.resource))
        })
        .collect();
    for resource in touched {
        stocks.get(resource).clamp_to_bounds();
    }

    report
}

fn pass_bound(outstanding: f64, epsilon: f64) -> u64 {
    if epsilon.is_nan() || epsilon <= 0.0 || !outstanding.is_finite() {
        return u64::MAX;
    }
    let bound = (outstanding / epsilon).ceil() + 1.0;
    if bound >= u64::MAX as f64 { u64::MAX } else { bound as u64 }
}
