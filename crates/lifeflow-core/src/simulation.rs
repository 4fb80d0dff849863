//! Multi-vessel orchestration.
//!
//! A [`Simulation`] owns the catalog, the settings, and every vessel's
//! [`SimulationContext`]. Vessels never share state, so ticking them one
//! after the other in key order is equivalent to ticking them in any other
//! order.
//!
//! Each tick's notifications are turned into [`Event`]s and delivered to
//! listeners once the tick is over.

use crate::catalog::ProfileCatalog;
use crate::context::SimulationContext;
use crate::event::{Event, EventBus, EventKind, Listener};
use crate::hash::StableHash;
use crate::id::VesselId;
use crate::modifier::VesselEnvironment;
use crate::projection::{PlanningContext, ProjectionReport, ProjectionSimulator};
use crate::settings::SimulationSettings;
use crate::tick::{TickReport, TickSimulator};
use slotmap::{SecondaryMap, SlotMap};

/// Every simulated vessel plus the shared catalog and settings.
#[derive(Debug)]
pub struct Simulation {
    catalog: ProfileCatalog,
    settings: SimulationSettings,
    pub(crate) vessels: SlotMap<VesselId, SimulationContext>,
    /// Conditions each vessel is ticked under; missing entries use the
    /// default environment.
    pub(crate) environments: SecondaryMap<VesselId, VesselEnvironment>,
    pub event_bus: EventBus,
}

impl Simulation {
    pub fn new(catalog: ProfileCatalog, settings: SimulationSettings) -> Self {
        Self {
            catalog,
            settings,
            vessels: SlotMap::with_key(),
            environments: SecondaryMap::new(),
            event_bus: EventBus::default(),
        }
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Vessels
    // -----------------------------------------------------------------------

    pub fn add_vessel(&mut self, context: SimulationContext) -> VesselId {
        let vessel = self.vessels.insert(context);
        self.event_bus.emit(Event::VesselAdded { vessel });
        vessel
    }

    /// Drop a vessel and its environment.
    pub fn remove_vessel(&mut self, vessel: VesselId) -> Option<SimulationContext> {
        let context = self.vessels.remove(vessel)?;
        self.environments.remove(vessel);
        self.event_bus.emit(Event::VesselRemoved {
            vessel,
            tick: context.ticks(),
        });
        Some(context)
    }

    pub fn vessel(&self, vessel: VesselId) -> Option<&SimulationContext> {
        self.vessels.get(vessel)
    }

    pub fn vessel_mut(&mut self, vessel: VesselId) -> Option<&mut SimulationContext> {
        self.vessels.get_mut(vessel)
    }

    pub fn vessels(&self) -> impl Iterator<Item = (VesselId, &SimulationContext)> {
        self.vessels.iter()
    }

    pub fn vessel_count(&self) -> usize {
        self.vessels.len()
    }

    /// Set the conditions a vessel is ticked under. Returns `false` for
    /// unknown vessels.
    pub fn set_environment(&mut self, vessel: VesselId, env: VesselEnvironment) -> bool {
        if !self.vessels.contains_key(vessel) {
            return false;
        }
        self.environments.insert(vessel, env);
        true
    }

    pub fn environment(&self, vessel: VesselId) -> Option<&VesselEnvironment> {
        self.environments.get(vessel)
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    pub fn on_event(&mut self, kind: EventKind, listener: Listener) {
        self.event_bus.on(kind, listener);
    }

    /// Bound how many events of `kind` can wait for the next delivery.
    pub fn set_event_capacity(&mut self, kind: EventKind, capacity: usize) {
        self.event_bus.set_capacity(kind, capacity);
    }

    // -----------------------------------------------------------------------
    // Ticking
    // -----------------------------------------------------------------------

    /// Tick one vessel and deliver its events. `None` for unknown vessels.
    pub fn tick_vessel(&mut self, vessel: VesselId, elapsed: f64) -> Option<TickReport> {
        let report = self.tick_one(vessel, elapsed)?;
        self.event_bus.deliver();
        Some(report)
    }

    /// Tick every vessel in key order, then deliver all events.
    pub fn tick_all(&mut self, elapsed: f64) -> Vec<(VesselId, TickReport)> {
        let ids: Vec<VesselId> = self.vessels.keys().collect();
        let reports = ids
            .into_iter()
            .filter_map(|vessel| self.tick_one(vessel, elapsed).map(|r| (vessel, r)))
            .collect();
        self.event_bus.deliver();
        reports
    }

    fn tick_one(&mut self, vessel: VesselId, elapsed: f64) -> Option<TickReport> {
        let context = self.vessels.get_mut(vessel)?;
        let default_env = VesselEnvironment::default();
        let env = self.environments.get(vessel).unwrap_or(&default_env);
        let report = TickSimulator::new(&self.catalog, &self.settings).tick(context, env, elapsed);
        emit_report(&mut self.event_bus, vessel, context.ticks(), &report);
        Some(report)
    }

    /// Project a planned vessel against this simulation's catalog.
    pub fn project(&self, plan: &PlanningContext) -> ProjectionReport {
        ProjectionSimulator::new(&self.catalog, &self.settings).project(plan)
    }

    /// Fingerprint of every vessel's state, in key order.
    pub fn state_hash(&self) -> u64 {
        let mut h = StableHash::new();
        for (_, context) in &self.vessels {
            h.write_u64(context.state_hash());
        }
        h.finish()
    }
}

fn emit_report(bus: &mut EventBus, vessel: VesselId, tick: u64, report: &TickReport) {
    if report.execution.capped {
        bus.emit(Event::ExecutionCapped {
            vessel,
            passes: report.execution.passes,
            tick,
        });
    }
    for n in &report.rule_notifications {
        bus.emit(Event::RuleCrossed {
            vessel,
            subject: n.subject,
            rule: n.rule,
            severity: n.severity,
            message: n.message.clone(),
            tick,
        });
    }
    for (subject, member) in &report.removed {
        bus.emit(Event::SubjectRemoved {
            vessel,
            subject: *subject,
            name: member.name.clone(),
            tick,
        });
    }
    for n in &report.supply_notifications {
        bus.emit(Event::SupplyAlert {
            vessel,
            supply: n.supply,
            resource: n.resource,
            alert: n.alert,
            message: n.message.clone(),
            tick,
        });
    }
}
