//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::{CatalogBuilder, ProfileCatalog};
use crate::context::SimulationContext;
use crate::id::{ProcessId, ResourceId, RuleId};
use crate::modifier::VesselEnvironment;
use crate::process::ProcessSpec;
use crate::recipe::Recipe;
use crate::rule::{RuleMessages, RuleSpec};
use crate::supply::SupplySpec;

// ===========================================================================
// Float comparison
// ===========================================================================

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ===========================================================================
// Life-support catalog
// ===========================================================================

/// A small life-support profile and the handles of everything in it.
#[derive(Debug)]
pub struct LifeSupport {
    pub catalog: ProfileCatalog,
    pub food: ResourceId,
    pub water: ResourceId,
    pub oxygen: ResourceId,
    pub co2: ResourceId,
    pub waste_water: ResourceId,
    pub ec: ResourceId,
    pub eating: RuleId,
    pub drinking: RuleId,
    pub breathing: RuleId,
    pub climate: RuleId,
    pub scrubber: ProcessId,
    pub recycler: ProcessId,
}

fn messages(what: &str) -> RuleMessages {
    RuleMessages {
        warning: Some(format!("{what}: warning")),
        danger: Some(format!("{what}: danger")),
        fatal: Some(format!("{what}: fatal")),
        relax: Some(format!("{what}: relaxed")),
    }
}

/// Food every six hours, water and oxygen continuously, a temperature rule,
/// a CO2 scrubber, a water recycler, and supply monitoring on food and
/// oxygen.
pub fn life_support() -> LifeSupport {
    let mut b = CatalogBuilder::new();
    let food = resource(&mut b, "Food", 0.28);
    let water = resource(&mut b, "Water", 1.0);
    let oxygen = resource(&mut b, "Oxygen", 0.001429);
    let co2 = resource(&mut b, "CarbonDioxide", 0.001977);
    let waste_water = resource(&mut b, "WasteWater", 1.0);
    let ec = resource(&mut b, "ElectricCharge", 0.0);

    let mut eating = RuleSpec::new("eating");
    eating.input = Some("Food".to_string());
    eating.interval = 21600.0;
    eating.rate = 0.3;
    eating.degeneration = 0.05;
    eating.variance = 0.2;
    eating.messages = messages("eating");

    let mut drinking = RuleSpec::new("drinking");
    drinking.input = Some("Water".to_string());
    drinking.output = Some("WasteWater".to_string());
    drinking.rate = 0.000005;
    drinking.ratio = 1.0;
    drinking.degeneration = 0.00001;
    drinking.messages = messages("drinking");

    let mut breathing = RuleSpec::new("breathing");
    breathing.input = Some("Oxygen".to_string());
    breathing.output = Some("CarbonDioxide".to_string());
    breathing.rate = 0.01;
    breathing.ratio = 1.0;
    breathing.degeneration = 0.2;
    breathing.modifiers = vec!["breathable".to_string()];
    breathing.messages = messages("breathing");

    let mut climate = RuleSpec::new("climate");
    climate.degeneration = 0.002;
    climate.modifiers = vec!["temperature".to_string()];
    climate.breakdown = true;
    climate.messages = messages("climate");

    let eating = b.add_rule(eating).expect("eating must be valid");
    let drinking = b.add_rule(drinking).expect("drinking must be valid");
    let breathing = b.add_rule(breathing).expect("breathing must be valid");
    let climate = b.add_rule(climate).expect("climate must be valid");

    let scrubber = b
        .add_process(
            ProcessSpec::new("scrubber")
                .input("CarbonDioxide", 0.01)
                .input("ElectricCharge", 0.5)
                .output("Oxygen", 0.01),
        )
        .expect("scrubber must be valid");
    let recycler = b
        .add_process(
            ProcessSpec::new("water recycler")
                .input("WasteWater", 0.000005)
                .input("ElectricCharge", 0.1)
                .output("Water", 0.0000045),
        )
        .expect("recycler must be valid");

    let mut food_supply = SupplySpec::new("Food");
    food_supply.low_message = Some("food is running low".to_string());
    food_supply.empty_message = Some("food is gone".to_string());
    food_supply.refill_message = Some("food restocked".to_string());
    b.add_supply(food_supply).expect("food supply must be valid");
    b.add_supply(SupplySpec::new("Oxygen"))
        .expect("oxygen supply must be valid");

    LifeSupport {
        catalog: b.build(),
        food,
        water,
        oxygen,
        co2,
        waste_water,
        ec,
        eating,
        drinking,
        breathing,
        climate,
        scrubber,
        recycler,
    }
}

fn resource(b: &mut CatalogBuilder, name: &str, density: f64) -> ResourceId {
    b.register_resource(name, density)
        .expect("test resources must be valid")
}

// ===========================================================================
// Vessels
// ===========================================================================

/// A vessel with full tanks, an empty CO2 / waste tank, and the given crew.
pub fn stocked_vessel(ls: &LifeSupport, crew: &[&str]) -> SimulationContext {
    let mut ctx = SimulationContext::new();
    let stocks = ctx.stocks_mut();
    stocks.register(ls.food, 100.0, 100.0);
    stocks.register(ls.water, 100.0, 100.0);
    stocks.register(ls.oxygen, 100.0, 100.0);
    stocks.register(ls.co2, 0.0, 100.0);
    stocks.register(ls.waste_water, 0.0, 100.0);
    stocks.register(ls.ec, 1000.0, 1000.0);
    for name in crew {
        ctx.add_crew(name);
    }
    ctx
}

// ===========================================================================
// Environment presets
// ===========================================================================

/// A pressurized, comfortable habitat in vacuum.
pub fn nominal_env(crew: u32) -> VesselEnvironment {
    VesselEnvironment {
        crew_count: crew,
        crew_capacity: crew.max(1),
        ..Default::default()
    }
}

/// Like [`nominal_env`], `deviation` kelvin outside the survivable range.
pub fn hot_env(crew: u32, deviation: f64) -> VesselEnvironment {
    VesselEnvironment {
        temperature_deviation: deviation,
        ..nominal_env(crew)
    }
}

/// Landed on a world with breathable air.
pub fn breathable_env(crew: u32) -> VesselEnvironment {
    VesselEnvironment {
        breathable: true,
        ..nominal_env(crew)
    }
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A chain of `len` recipes `r0 -> r1 -> ... -> r{len}`, each moving
/// `quantity`. Resources are numbered from 0.
pub fn recipe_chain(len: u32, quantity: f64) -> Vec<Recipe> {
    (0..len)
        .map(|i| {
            let mut recipe = Recipe::new(crate::id::BrokerId::GENERIC);
            recipe
                .input(ResourceId(i), quantity)
                .output(ResourceId(i + 1), quantity, false);
            recipe
        })
        .collect()
}
