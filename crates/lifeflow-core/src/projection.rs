//! The projection front-end: steady-state rates for a planned vessel.
//!
//! Projection builds throwaway stocks from a [`PlanningContext`], runs the
//! same recipe machinery as [`TickSimulator`](crate::tick::TickSimulator)
//! with every rate taken per second, and reports consumption, production
//! and lifetime per resource. Nothing persistent is touched.
//!
//! The evaluation runs `warmup_steps` extra times first so that multi-stage
//! chains (a byproduct feeding a scrubber feeding a recycler) are primed.
//! Stocks that warmup drained are refilled to plan before the reported step,
//! so a small tank still shows its real drain. Reported amounts are the
//! planned ones, not the primed ones.

use crate::catalog::ProfileCatalog;
use crate::id::{BrokerId, ProcessId, ResourceId};
use crate::modifier::{self, VesselEnvironment};
use crate::process::{ProcessData, RateEntry};
use crate::recipe::{execute_recipes, Recipe};
use crate::settings::SimulationSettings;
use crate::stock::{BrokerRate, StockSet};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Planning input
// ---------------------------------------------------------------------------

/// Where the planned vessel is assumed to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Situation {
    Landed,
    Atmosphere,
    #[default]
    Orbit,
    Interplanetary,
}

/// Container capacity a planned part brings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannedResource {
    pub resource: ResourceId,
    pub amount: f64,
    pub capacity: f64,
}

/// An output of a planned converter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConverterOutput {
    pub resource: ResourceId,
    pub rate: f64,
    pub dump: bool,
}

/// A resource-moving module on a planned part. Rates are per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlannedDevice {
    Consumer { resource: ResourceId, rate: f64 },
    Producer { resource: ResourceId, rate: f64 },
    /// Produces `rate` in full sunlight, scaled by the context's sunlight.
    SolarPanel { resource: ResourceId, rate: f64 },
    Converter {
        inputs: Vec<RateEntry>,
        outputs: Vec<ConverterOutput>,
    },
    /// Runs a catalog process at `fraction`.
    Process { process: ProcessId, fraction: f64 },
}

/// One part of the planned vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPart {
    pub name: String,
    /// Credited with the part's device flows.
    pub broker: BrokerId,
    pub resources: Vec<PlannedResource>,
    pub devices: Vec<PlannedDevice>,
}

impl PlannedPart {
    pub fn new(name: &str, broker: BrokerId) -> Self {
        Self {
            name: name.to_string(),
            broker,
            resources: Vec::new(),
            devices: Vec::new(),
        }
    }

    pub fn with_resource(mut self, resource: ResourceId, amount: f64, capacity: f64) -> Self {
        self.resources.push(PlannedResource {
            resource,
            amount,
            capacity,
        });
        self
    }

    pub fn with_device(mut self, device: PlannedDevice) -> Self {
        self.devices.push(device);
        self
    }
}

/// A hypothetical vessel and where it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningContext {
    pub body: String,
    pub situation: Situation,
    /// Conditions aboard. `crew_count` sets how many subjects rules run for
    /// and `sunlight` scales solar panels.
    pub environment: VesselEnvironment,
    pub parts: Vec<PlannedPart>,
}

// ---------------------------------------------------------------------------
// Projection output
// ---------------------------------------------------------------------------

/// Steady-state flows of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProjection {
    pub resource: ResourceId,
    pub amount: f64,
    pub capacity: f64,
    pub consumed_rate: f64,
    pub produced_rate: f64,
    pub net_rate: f64,
    /// Seconds until empty, or infinity when not draining.
    pub lifetime: f64,
    pub brokers: Vec<BrokerRate>,
}

/// Result of projecting a planned vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionReport {
    pub body: String,
    pub situation: Situation,
    pub resources: Vec<ResourceProjection>,
}

impl ProjectionReport {
    pub fn resource(&self, resource: ResourceId) -> Option<&ResourceProjection> {
        self.resources.iter().find(|r| r.resource == resource)
    }
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

/// Computes steady-state rates for planned vessels.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionSimulator<'a> {
    catalog: &'a ProfileCatalog,
    settings: &'a SimulationSettings,
}

impl<'a> ProjectionSimulator<'a> {
    pub fn new(catalog: &'a ProfileCatalog, settings: &'a SimulationSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn project(&self, plan: &PlanningContext) -> ProjectionReport {
        let mut planned = StockSet::new();
        for part in &plan.parts {
            for r in &part.resources {
                planned.register(r.resource, r.amount, r.capacity);
            }
        }

        let mut stocks = planned.clone();
        for _ in 0..self.settings.warmup_steps {
            stocks.begin_tick();
            self.step(plan, &mut stocks);
        }
        refill_drained(&planned, &mut stocks);
        stocks.begin_tick();
        self.step(plan, &mut stocks);

        let resources = stocks
            .iter()
            .map(|stock| {
                let amount = planned.amount(stock.resource());
                let net = stock.net();
                let lifetime = if net < 0.0 {
                    amount / net.abs()
                } else {
                    f64::INFINITY
                };
                ResourceProjection {
                    resource: stock.resource(),
                    amount,
                    capacity: stock.capacity(),
                    consumed_rate: stock.consumed(),
                    produced_rate: stock.produced(),
                    net_rate: net,
                    lifetime,
                    brokers: stock.broker_rates(1.0),
                }
            })
            .collect();

        log::debug!(
            "projected {} parts at {} ({:?})",
            plan.parts.len(),
            plan.body,
            plan.situation
        );
        ProjectionReport {
            body: plan.body.clone(),
            situation: plan.situation,
            resources,
        }
    }

    /// One second of the planned vessel.
    fn step(&self, plan: &PlanningContext, stocks: &mut StockSet) {
        let env = &plan.environment;
        let eps = self.settings.epsilon;
        let crew = f64::from(env.crew_count);
        let mut recipes = Vec::new();

        for (_, def) in self.catalog.rules() {
            let Some(input) = def.input else {
                continue;
            };
            let per_second = if def.is_continuous() {
                def.rate
            } else {
                def.rate / def.interval
            };
            let k = modifier::evaluate(env, stocks, &self.settings.modifiers, &def.modifiers);
            let required = crew * per_second * k;
            if required <= eps {
                continue;
            }
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

        for part in &plan.parts {
            for device in &part.devices {
                if let Some(recipe) = self.device_recipe(plan, part, device, stocks) {
                    recipes.push(recipe);
                }
            }
        }

        execute_recipes(&mut recipes, stocks, eps);
        stocks.clamp_all();
    }

    fn device_recipe(
        &self,
        plan: &PlanningContext,
        part: &PlannedPart,
        device: &PlannedDevice,
        stocks: &StockSet,
    ) -> Option<Recipe> {
        let mut recipe = Recipe::new(part.broker);
        match device {
            PlannedDevice::Consumer { resource, rate } => {
                recipe.input(*resource, *rate);
            }
            PlannedDevice::Producer { resource, rate } => {
                recipe.output(*resource, *rate, true);
            }
            PlannedDevice::SolarPanel { resource, rate } => {
                let sunlight = plan.environment.sunlight.clamp(0.0, 1.0);
                recipe.output(*resource, rate * sunlight, true);
            }
            PlannedDevice::Converter { inputs, outputs } => {
                for i in inputs {
                    recipe.input(i.resource, i.rate);
                }
                for o in outputs {
                    recipe.output(o.resource, o.rate, o.dump);
                }
            }
            PlannedDevice::Process { process, fraction } => {
                let def = self.catalog.process(*process)?;
                let k = modifier::evaluate(
                    &plan.environment,
                    stocks,
                    &self.settings.modifiers,
                    &def.modifiers,
                );
                return def.recipe(&ProcessData::new(*fraction), k, 1.0, self.settings.epsilon);
            }
        }
        let idle = recipe.inputs().is_empty() && recipe.outputs().is_empty();
        (!idle).then_some(recipe)
    }
}

/// Put back whatever warmup drained below the planned amounts. Stocks that
/// warmup filled above plan keep their primed level.
fn refill_drained(planned: &StockSet, stocks: &mut StockSet) {
    for stock in planned.iter() {
        let resource = stock.resource();
        if stocks.amount(resource) < stock.amount() {
            stocks.get(resource).sync(stock.amount(), stock.capacity());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::process::ProcessSpec;
    use crate::rule::RuleSpec;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn plan(parts: Vec<PlannedPart>, crew: u32) -> PlanningContext {
        PlanningContext {
            body: "Kerbin".to_string(),
            situation: Situation::Orbit,
            environment: VesselEnvironment {
                crew_count: crew,
                ..Default::default()
            },
            parts,
        }
    }

    #[test]
    fn rules_scale_with_crew() {
        let mut b = CatalogBuilder::new();
        let food = b.register_resource("Food", 1.0).unwrap();
        let mut spec = RuleSpec::new("eating");
        spec.input = Some("Food".to_string());
        spec.rate = 0.01;
        spec.degeneration = 0.001;
        b.add_rule(spec).unwrap();
        let cat = b.build();
        let settings = SimulationSettings::default();

        let pod = PlannedPart::new("pod", BrokerId::GENERIC).with_resource(food, 100.0, 100.0);
        let report = ProjectionSimulator::new(&cat, &settings).project(&plan(vec![pod], 3));
        let p = report.resource(food).unwrap();
        assert!(approx(p.consumed_rate, 0.03));
        assert!(approx(p.net_rate, -0.03));
        assert!(approx(p.lifetime, 100.0 / 0.03));
        assert_eq!(p.amount, 100.0);
        assert_eq!(report.body, "Kerbin");
    }

    #[test]
    fn interval_rules_become_per_second() {
        let mut b = CatalogBuilder::new();
        let food = b.register_resource("Food", 1.0).unwrap();
        let mut spec = RuleSpec::new("meals");
        spec.input = Some("Food".to_string());
        spec.interval = 21600.0;
        spec.rate = 0.5;
        spec.degeneration = 0.01;
        b.add_rule(spec).unwrap();
        let cat = b.build();
        let settings = SimulationSettings::default();

        let pod = PlannedPart::new("pod", BrokerId::GENERIC).with_resource(food, 100.0, 100.0);
        let report = ProjectionSimulator::new(&cat, &settings).project(&plan(vec![pod], 1));
        assert!(approx(report.resource(food).unwrap().consumed_rate, 0.5 / 21600.0));
    }

    #[test]
    fn balanced_resource_lives_forever() {
        let cat = CatalogBuilder::new().build();
        let settings = SimulationSettings::default();
        let ec = ResourceId(0);
        let part = PlannedPart::new("bus", BrokerId::GENERIC)
            .with_resource(ec, 50.0, 100.0)
            .with_device(PlannedDevice::Consumer {
                resource: ec,
                rate: 1.0,
            })
            .with_device(PlannedDevice::SolarPanel {
                resource: ec,
                rate: 4.0,
            });
        let mut ctx = plan(vec![part], 0);
        ctx.environment.sunlight = 0.5;
        let report = ProjectionSimulator::new(&cat, &settings).project(&ctx);
        let p = report.resource(ec).unwrap();
        assert!(approx(p.produced_rate, 2.0));
        assert!(approx(p.net_rate, 1.0));
        assert!(p.lifetime.is_infinite());
    }

    #[test]
    fn warmup_primes_byproduct_chains() {
        let mut b = CatalogBuilder::new();
        let o2 = b.register_resource("Oxygen", 1.0).unwrap();
        let co2 = b.register_resource("CarbonDioxide", 1.0).unwrap();
        let mut spec = RuleSpec::new("breathing");
        spec.input = Some("Oxygen".to_string());
        spec.output = Some("CarbonDioxide".to_string());
        spec.rate = 1.0;
        spec.degeneration = 0.001;
        b.add_rule(spec).unwrap();
        let scrubber = b
            .add_process(
                ProcessSpec::new("scrubber")
                    .input("CarbonDioxide", 1.0)
                    .output("Oxygen", 1.0),
            )
            .unwrap();
        let cat = b.build();
        let settings = SimulationSettings::default();

        let part = PlannedPart::new("hab", BrokerId::GENERIC)
            .with_resource(o2, 100.0, 100.0)
            .with_resource(co2, 0.0, 100.0)
            .with_device(PlannedDevice::Process {
                process: scrubber,
                fraction: 1.0,
            });
        let report = ProjectionSimulator::new(&cat, &settings).project(&plan(vec![part], 1));
        let oxygen = report.resource(o2).unwrap();
        // Breathing feeds the scrubber within the same step.
        assert!(approx(oxygen.produced_rate, 1.0));
        assert!(approx(oxygen.net_rate, 0.0));
        assert_eq!(oxygen.brokers.len(), 2);
    }

    #[test]
    fn converter_respects_dump_flag() {
        let cat = CatalogBuilder::new().build();
        let settings = SimulationSettings::default();
        let (water, hydrogen) = (ResourceId(0), ResourceId(1));
        let part = PlannedPart::new("electrolyzer", BrokerId::GENERIC)
            .with_resource(water, 10.0, 10.0)
            .with_resource(hydrogen, 0.0, 0.0)
            .with_device(PlannedDevice::Converter {
                inputs: vec![RateEntry {
                    resource: water,
                    rate: 1.0,
                }],
                outputs: vec![ConverterOutput {
                    resource: hydrogen,
                    rate: 2.0,
                    dump: false,
                }],
            });
        let report = ProjectionSimulator::new(&cat, &settings).project(&plan(vec![part], 0));
        // No room for the output, so nothing runs.
        assert_eq!(report.resource(water).unwrap().consumed_rate, 0.0);
    }

    #[test]
    fn projection_does_not_touch_the_plan() {
        let cat = CatalogBuilder::new().build();
        let settings = SimulationSettings::default();
        let ec = ResourceId(0);
        let part = PlannedPart::new("bus", BrokerId::GENERIC)
            .with_resource(ec, 5.0, 100.0)
            .with_device(PlannedDevice::Consumer {
                resource: ec,
                rate: 1.0,
            });
        let ctx = plan(vec![part], 0);
        let before = ctx.clone();
        let sim = ProjectionSimulator::new(&cat, &settings);
        let first = sim.project(&ctx);
        let second = sim.project(&ctx);
        assert_eq!(ctx, before);
        assert_eq!(first, second);
        assert_eq!(first.resource(ec).unwrap().amount, 5.0);
    }

    #[test]
    fn small_planned_stock_still_reports_its_drain() {
        let cat = CatalogBuilder::new().build();
        let settings = SimulationSettings::default();
        assert!(settings.warmup_steps > 2);
        let ec = ResourceId(0);
        let part = PlannedPart::new("bus", BrokerId::GENERIC)
            .with_resource(ec, 1.0, 100.0)
            .with_device(PlannedDevice::Consumer {
                resource: ec,
                rate: 0.5,
            });
        let report = ProjectionSimulator::new(&cat, &settings).project(&plan(vec![part], 0));
        let p = report.resource(ec).unwrap();
        assert_eq!(p.amount, 1.0);
        assert!(approx(p.consumed_rate, 0.5));
        assert!(approx(p.net_rate, -0.5));
        assert!(approx(p.lifetime, 2.0));
    }

    #[test]
    fn refill_restores_only_drained_stocks() {
        let (water, waste) = (ResourceId(0), ResourceId(1));
        let mut planned = StockSet::new();
        planned.register(water, 5.0, 10.0);
        planned.register(waste, 0.0, 10.0);
        let mut primed = StockSet::new();
        primed.register(water, 1.0, 10.0);
        primed.register(waste, 4.0, 10.0);

        refill_drained(&planned, &mut primed);

        assert_eq!(primed.amount(water), 5.0);
        assert_eq!(primed.amount(waste), 4.0);
        assert_eq!(primed.capacity(water), 10.0);
    }
}
