//! Per-vessel simulation state.
//!
//! A [`SimulationContext`] exclusively owns one vessel's stocks, crew
//! roster, process configuration and supply alert state. It is created and
//! destroyed with the vessel and never shared between vessels.

use crate::catalog::ProfileCatalog;
use crate::crew::CrewMember;
use crate::hash::StableHash;
use crate::id::{ProcessId, ResourceId, SubjectId, SupplyId};
use crate::process::ProcessData;
use crate::stock::{BrokerRate, ResourceStock, StockSet};
use crate::supply::SupplyData;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::BTreeMap;

/// Telemetry for one resource over the last tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTelemetry {
    pub resource: ResourceId,
    pub amount: f64,
    pub capacity: f64,
    pub level: f64,
    /// Net change per second.
    pub rate: f64,
    /// Seconds until empty at `rate`, or infinity.
    pub depletion: f64,
    pub brokers: Vec<BrokerRate>,
}

impl ResourceTelemetry {
    fn from_stock(stock: &ResourceStock, elapsed: f64) -> Self {
        let rate = if elapsed > 0.0 {
            stock.net() / elapsed
        } else {
            0.0
        };
        Self {
            resource: stock.resource(),
            amount: stock.amount(),
            capacity: stock.capacity(),
            level: stock.level(),
            rate,
            depletion: stock.depletion(rate),
            brokers: stock.broker_rates(elapsed),
        }
    }
}

/// Everything one vessel needs to be ticked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationContext {
    pub(crate) stocks: StockSet,
    pub(crate) crew: SlotMap<SubjectId, CrewMember>,
    pub(crate) processes: BTreeMap<ProcessId, ProcessData>,
    pub(crate) supplies: BTreeMap<SupplyId, SupplyData>,
    /// Elapsed seconds of the last tick.
    pub(crate) last_elapsed: f64,
    pub(crate) ticks: u64,
}

impl SimulationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stocks(&self) -> &StockSet {
        &self.stocks
    }

    /// Stocks, for the part layer to register containers between ticks.
    pub fn stocks_mut(&mut self) -> &mut StockSet {
        &mut self.stocks
    }

    // -- Crew --

    pub fn add_crew(&mut self, name: &str) -> SubjectId {
        self.crew.insert(CrewMember::new(name))
    }

    pub fn remove_crew(&mut self, id: SubjectId) -> Option<CrewMember> {
        self.crew.remove(id)
    }

    pub fn crew_member(&self, id: SubjectId) -> Option<&CrewMember> {
        self.crew.get(id)
    }

    pub fn crew_member_mut(&mut self, id: SubjectId) -> Option<&mut CrewMember> {
        self.crew.get_mut(id)
    }

    pub fn crew(&self) -> impl Iterator<Item = (SubjectId, &CrewMember)> {
        self.crew.iter()
    }

    pub fn crew_count(&self) -> usize {
        self.crew.len()
    }

    /// Look up a crew member by name.
    pub fn find_crew(&self, name: &str) -> Option<SubjectId> {
        self.crew
            .iter()
            .find(|(_, member)| member.name == name)
            .map(|(id, _)| id)
    }

    // -- Processes --

    /// Process configuration, created at full rate on first access.
    pub fn configure_process(&mut self, id: ProcessId) -> &mut ProcessData {
        self.processes.entry(id).or_default()
    }

    pub fn process(&self, id: ProcessId) -> Option<&ProcessData> {
        self.processes.get(&id)
    }

    pub fn remove_process(&mut self, id: ProcessId) -> Option<ProcessData> {
        self.processes.remove(&id)
    }

    pub fn supply(&self, id: SupplyId) -> Option<&SupplyData> {
        self.supplies.get(&id)
    }

    // -- Bookkeeping --

    pub fn last_elapsed(&self) -> f64 {
        self.last_elapsed
    }

    /// Ticks simulated so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Telemetry of every stock for the last tick, in resource order.
    pub fn telemetry(&self) -> Vec<ResourceTelemetry> {
        self.stocks
            .iter()
            .map(|stock| ResourceTelemetry::from_stock(stock, self.last_elapsed))
            .collect()
    }

    /// Telemetry of a single resource for the last tick.
    pub fn resource_telemetry(&self, resource: ResourceId) -> Option<ResourceTelemetry> {
        self.stocks
            .find(resource)
            .map(|stock| ResourceTelemetry::from_stock(stock, self.last_elapsed))
    }

    /// Human-readable telemetry lines, for logs and debugging.
    pub fn describe(&self, catalog: &ProfileCatalog) -> Vec<String> {
        self.telemetry()
            .iter()
            .map(|t| {
                format!(
                    "{}: {:.3}/{:.3} ({:+.6}/s)",
                    catalog.resource_name(t.resource),
                    t.amount,
                    t.capacity,
                    t.rate
                )
            })
            .collect()
    }

    /// Fingerprint of stocks and crew state, for comparing runs.
    pub fn state_hash(&self) -> u64 {
        let mut h = StableHash::new();
        h.write_u64(self.ticks);
        for stock in self.stocks.iter() {
            h.write_u32(stock.resource().0);
            h.write_f64(stock.amount());
            h.write_f64(stock.capacity());
        }
        for (_, member) in self.crew.iter() {
            h.write_str(&member.name);
            for (rule, data) in member.rules() {
                h.write_u32(rule.0);
                h.write_f64(data.problem);
                h.write_f64(data.time_since);
            }
        }
        h.finish()
    }
}
