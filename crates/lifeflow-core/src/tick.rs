//! The tick front-end: advances one vessel by an elapsed time slice.
//!
//! # Tick pipeline
//!
//! 1. **Reset** -- per-tick stock accounting is cleared.
//! 2. **Synthesize** -- every rule, for every active crew member, and every
//!    configured process turn their rates into recipes. Rules without an
//!    output consume directly.
//! 3. **Execute** -- the recipe batch runs to a fixed point.
//! 4. **Settle** -- rule problems accumulate or relax and threshold
//!    crossings are collected.
//! 5. **Remove** -- subjects that crossed a fatal threshold leave the
//!    roster, after every rule ran.
//! 6. **Monitor** -- supply levels are checked.
//! 7. **Clamp** -- every stock is forced back into its bounds.
//!
//! Results are only observable once [`TickSimulator::tick`] returns.

use crate::catalog::ProfileCatalog;
use crate::context::SimulationContext;
use crate::crew::CrewMember;
use crate::hash::subject_variance;
use crate::id::{ResourceId, RuleId, SubjectId, SupplyId};
use crate::modifier::{self, VesselEnvironment};
use crate::recipe::{execute_recipes, ExecutionReport, Recipe};
use crate::rule::{Exposure, Severity};
use crate::settings::SimulationSettings;
use crate::supply::SupplyAlert;

/// A rule threshold crossing for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleNotification {
    pub subject: SubjectId,
    pub subject_name: String,
    pub rule: RuleId,
    pub severity: Severity,
    pub message: Option<String>,
}

/// A supply level crossing.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyNotification {
    pub supply: SupplyId,
    pub resource: ResourceId,
    pub alert: SupplyAlert,
    pub message: Option<String>,
}

/// What a tick did.
#[derive(Debug, Default)]
pub struct TickReport {
    pub elapsed: f64,
    /// Recipes handed to the executor.
    pub recipes: usize,
    pub execution: ExecutionReport,
    pub rule_notifications: Vec<RuleNotification>,
    pub supply_notifications: Vec<SupplyNotification>,
    /// Subjects removed after a fatal crossing.
    pub removed: Vec<(SubjectId, CrewMember)>,
}

/// A rule evaluation waiting for the executor to finish.
struct PendingRule {
    rule: RuleId,
    subject: SubjectId,
    k: f64,
    steps: f64,
}

/// Advances vessels against a shared catalog and settings.
#[derive(Debug, Clone, Copy)]
pub struct TickSimulator<'a> {
    catalog: &'a ProfileCatalog,
    settings: &'a SimulationSettings,
}

impl<'a> TickSimulator<'a> {
    pub fn new(catalog: &'a ProfileCatalog, settings: &'a SimulationSettings) -> Self {
        Self { catalog, settings }
    }

    /// Advance `ctx` by `elapsed` seconds under `env`.
    pub fn tick(
        &self,
        ctx: &mut SimulationContext,
        env: &VesselEnvironment,
        elapsed: f64,
    ) -> TickReport {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        let eps = self.settings.epsilon;
        let mut report = TickReport {
            elapsed,
            ..Default::default()
        };

        // Phase 1: reset.
        ctx.stocks.begin_tick();

        // Phase 2: synthesize.
        let mut recipes = Vec::new();
        let pending = self.synthesize_rules(ctx, env, elapsed, &mut recipes);
        self.synthesize_processes(ctx, env, elapsed, &mut recipes);

        // Phase 3: execute.
        report.recipes = recipes.len();
        report.execution = execute_recipes(&mut recipes, &mut ctx.stocks, eps);

        // Phase 4: settle.
        let mut doomed = Vec::new();
        for p in &pending {
            let Some(def) = self.catalog.rule(p.rule) else {
                continue;
            };
            let Some(member) = ctx.crew.get_mut(p.subject) else {
                continue;
            };
            let starved = def
                .input
                .is_some_and(|input| ctx.stocks.amount(input) <= eps);
            let exposure = Exposure {
                k: p.k,
                steps: p.steps,
                starved,
                bias: subject_variance(&member.name, def.variance),
            };
            let recovery = def.recovery.unwrap_or(self.settings.recovery_rate);
            let data = member.rule_mut(p.rule, def.lifetime);
            if let Some(severity) = def.settle(data, &exposure, recovery, eps) {
                if severity == Severity::Fatal && !doomed.contains(&p.subject) {
                    doomed.push(p.subject);
                }
                if severity == Severity::Breakdown {
                    log::debug!("{} broke down ({})", member.name, def.name);
                }
                report.rule_notifications.push(RuleNotification {
                    subject: p.subject,
                    subject_name: member.name.clone(),
                    rule: p.rule,
                    severity,
                    message: def.message(severity).map(str::to_string),
                });
            }
        }

        // Phase 5: remove.
        for subject in doomed {
            if let Some(member) = ctx.crew.remove(subject) {
                log::debug!("{} removed after a fatal rule crossing", member.name);
                report.removed.push((subject, member));
            }
        }

        // Phase 6: monitor.
        let crewed = !ctx.crew.is_empty();
        for (id, def) in self.catalog.supplies() {
            let Some(stock) = ctx.stocks.find(def.resource) else {
                continue;
            };
            let data = ctx.supplies.entry(id).or_default();
            if let Some(alert) = def.check(data, stock, crewed, eps) {
                report.supply_notifications.push(SupplyNotification {
                    supply: id,
                    resource: def.resource,
                    alert,
                    message: def.message(alert).map(str::to_string),
                });
            }
        }

        // Phase 7: clamp.
        ctx.stocks.clamp_all();
        ctx.last_elapsed = elapsed;
        ctx.ticks += 1;

        log::debug!(
            "tick {}: {:.1}s, {} recipes in {} passes, {} notifications",
            ctx.ticks,
            elapsed,
            report.recipes,
            report.execution.passes,
            report.rule_notifications.len() + report.supply_notifications.len()
        );
        report
    }

    fn synthesize_rules(
        &self,
        ctx: &mut SimulationContext,
        env: &VesselEnvironment,
        elapsed: f64,
        recipes: &mut Vec<Recipe>,
    ) -> Vec<PendingRule> {
        let eps = self.settings.epsilon;
        let mut pending = Vec::new();
        let SimulationContext { stocks, crew, .. } = ctx;

        for (rule, def) in self.catalog.rules() {
            let k = modifier::evaluate(env, stocks, &self.settings.modifiers, &def.modifiers);
            for (subject, member) in crew.iter_mut() {
                if member.disabled {
                    continue;
                }
                let data = member.rule_mut(rule, def.lifetime);
                let steps = def.advance(data, elapsed);
                if let Some((input, required)) = def.required(k, steps, eps) {
                    match def.output {
                        Some(output) => {
                            let mut recipe = Recipe::new(def.broker);
                            recipe
                                .input(input, required)
                                .output(output, required * def.ratio, true);
                            recipes.push(recipe);
                        }
                        None => stocks.consume(input, required, def.broker),
                    }
                }
                pending.push(PendingRule {
                    rule,
                    subject,
                    k,
                    steps,
                });
            }
        }
        pending
    }

    fn synthesize_processes(
        &self,
        ctx: &SimulationContext,
        env: &VesselEnvironment,
        elapsed: f64,
        recipes: &mut Vec<Recipe>,
    ) {
        for (id, def) in self.catalog.processes() {
            let Some(data) = ctx.processes.get(&id) else {
                continue;
            };
            let k = modifier::evaluate(env, &ctx.stocks, &self.settings.modifiers, &def.modifiers);
            if let Some(recipe) = def.recipe(data, k, elapsed, self.settings.epsilon) {
                recipes.push(recipe);
            }
        }
    }
}
