//! Capacity-bounded resource stocks and the per-vessel stock set.
//!
//! A [`ResourceStock`] never leaves `[0, capacity]` through its own mutation
//! paths: [`ResourceStock::consume`] and [`ResourceStock::produce`] clamp
//! the requested quantity and record only what actually moved.

use crate::id::{BrokerId, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Broker amounts smaller than this are dropped from telemetry.
const BROKER_NOISE: f64 = 1e-7;

/// The rate at which a single broker feeds (positive) or drains (negative)
/// a resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrokerRate {
    pub broker: BrokerId,
    pub rate: f64,
}

/// A named scalar quantity bounded by a capacity, with per-tick accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStock {
    resource: ResourceId,
    amount: f64,
    capacity: f64,
    produced: f64,
    consumed: f64,
    /// Signed amount moved by each broker since the last `begin_tick`.
    contributions: BTreeMap<BrokerId, f64>,
}

impl ResourceStock {
    /// An empty stock with no capacity.
    pub fn new(resource: ResourceId) -> Self {
        Self {
            resource,
            amount: 0.0,
            capacity: 0.0,
            produced: 0.0,
            consumed: 0.0,
            contributions: BTreeMap::new(),
        }
    }

    /// A stock holding `amount` out of `capacity`. Both are clamped.
    pub fn with_amount(resource: ResourceId, amount: f64, capacity: f64) -> Self {
        let mut stock = Self::new(resource);
        stock.capacity = capacity.max(0.0);
        stock.amount = amount.clamp(0.0, stock.capacity);
        stock
    }

    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Free room left before the stock is full.
    pub fn space(&self) -> f64 {
        (self.capacity - self.amount).max(0.0)
    }

    /// Total produced since the last `begin_tick`.
    pub fn produced(&self) -> f64 {
        self.produced
    }

    /// Total consumed since the last `begin_tick`.
    pub fn consumed(&self) -> f64 {
        self.consumed
    }

    /// Produced minus consumed since the last `begin_tick`.
    pub fn net(&self) -> f64 {
        self.produced - self.consumed
    }

    /// Add container amount and capacity, as reported by the part layer.
    pub fn register(&mut self, amount: f64, capacity: f64) {
        self.capacity += capacity.max(0.0);
        self.amount = (self.amount + amount.max(0.0)).min(self.capacity);
    }

    /// Replace amount and capacity with externally observed values.
    pub fn sync(&mut self, amount: f64, capacity: f64) {
        self.capacity = capacity.max(0.0);
        self.amount = amount.clamp(0.0, self.capacity);
    }

    /// Remove up to `quantity`, crediting `broker`. Never fails: a request
    /// larger than the amount drains the stock.
    pub fn consume(&mut self, quantity: f64, broker: BrokerId) {
        let taken = quantity.max(0.0).min(self.amount.max(0.0));
        if taken <= 0.0 {
            return;
        }
        self.amount -= taken;
        self.consumed += taken;
        *self.contributions.entry(broker).or_insert(0.0) -= taken;
    }

    /// Add up to `quantity`, crediting `broker`. Anything beyond the free
    /// space is discarded.
    pub fn produce(&mut self, quantity: f64, broker: BrokerId) {
        let added = quantity.max(0.0).min(self.space());
        if added <= 0.0 {
            return;
        }
        self.amount += added;
        self.produced += added;
        *self.contributions.entry(broker).or_insert(0.0) += added;
    }

    /// Force the amount back into `[0, capacity]`.
    pub fn clamp_to_bounds(&mut self) {
        self.amount = self.amount.clamp(0.0, self.capacity.max(0.0));
    }

    /// Amount relative to capacity, or 0 without capacity.
    pub fn level(&self) -> f64 {
        if self.capacity > 0.0 {
            self.amount / self.capacity
        } else {
            0.0
        }
    }

    /// Seconds until empty at `consumer_rate` (negative when draining),
    /// or infinity when the rate is not draining.
    pub fn depletion(&self, consumer_rate: f64) -> f64 {
        if consumer_rate < 0.0 {
            self.amount / consumer_rate.abs()
        } else {
            f64::INFINITY
        }
    }

    /// Signed amount moved by each broker, in broker order.
    pub fn contributions(&self) -> impl Iterator<Item = (BrokerId, f64)> + '_ {
        self.contributions.iter().map(|(&b, &v)| (b, v))
    }

    /// Per-second broker rates over `elapsed` seconds, without noise.
    pub fn broker_rates(&self, elapsed: f64) -> Vec<BrokerRate> {
        if elapsed <= 0.0 {
            return Vec::new();
        }
        self.contributions
            .iter()
            .filter(|(_, v)| v.abs() >= BROKER_NOISE)
            .map(|(&broker, &v)| BrokerRate {
                broker,
                rate: v / elapsed,
            })
            .collect()
    }

    /// Reset per-tick accounting.
    pub fn begin_tick(&mut self) {
        self.produced = 0.0;
        self.consumed = 0.0;
        self.contributions.clear();
    }
}

/// The stocks of one vessel, keyed by resource. Stocks are created on
/// first access.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockSet {
    stocks: BTreeMap<ResourceId, ResourceStock>,
}

impl StockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a stock, creating an empty one if absent.
    pub fn get(&mut self, resource: ResourceId) -> &mut ResourceStock {
        self.stocks
            .entry(resource)
            .or_insert_with(|| ResourceStock::new(resource))
    }

    /// Look up a stock without creating it.
    pub fn find(&self, resource: ResourceId) -> Option<&ResourceStock> {
        self.stocks.get(&resource)
    }

    /// Current amount, 0 for unknown resources.
    pub fn amount(&self, resource: ResourceId) -> f64 {
        self.find(resource).map_or(0.0, ResourceStock::amount)
    }

    /// Current capacity, 0 for unknown resources.
    pub fn capacity(&self, resource: ResourceId) -> f64 {
        self.find(resource).map_or(0.0, ResourceStock::capacity)
    }

    /// Add container amount and capacity for a resource.
    pub fn register(&mut self, resource: ResourceId, amount: f64, capacity: f64) {
        self.get(resource).register(amount, capacity);
    }

    /// Shortcut for `get(resource).consume(..)`.
    pub fn consume(&mut self, resource: ResourceId, quantity: f64, broker: BrokerId) {
        self.get(resource).consume(quantity, broker);
    }

    /// Shortcut for `get(resource).produce(..)`.
    pub fn produce(&mut self, resource: ResourceId, quantity: f64, broker: BrokerId) {
        self.get(resource).produce(quantity, broker);
    }

    pub fn begin_tick(&mut self) {
        for stock in self.stocks.values_mut() {
            stock.begin_tick();
        }
    }

    pub fn clamp_all(&mut self) {
        for stock in self.stocks.values_mut() {
            stock.clamp_to_bounds();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceStock> {
        self.stocks.values()
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOOD: ResourceId = ResourceId(0);
    const RULE: BrokerId = BrokerId(1);

    #[test]
    fn consume_clamps_to_amount() {
        let mut s = ResourceStock::with_amount(FOOD, 50.0, 100.0);
        s.consume(80.0, RULE);
        assert_eq!(s.amount(), 0.0);
        assert_eq!(s.consumed(), 50.0);
        assert_eq!(s.contributions().collect::<Vec<_>>(), vec![(RULE, -50.0)]);
    }

    #[test]
    fn produce_clamps_to_capacity() {
        let mut s = ResourceStock::with_amount(FOOD, 90.0, 100.0);
        s.produce(25.0, RULE);
        assert_eq!(s.amount(), 100.0);
        assert_eq!(s.produced(), 10.0);
    }

    #[test]
    fn negative_requests_are_ignored() {
        let mut s = ResourceStock::with_amount(FOOD, 10.0, 100.0);
        s.consume(-5.0, RULE);
        s.produce(-5.0, RULE);
        assert_eq!(s.amount(), 10.0);
        assert_eq!(s.contributions().count(), 0);
    }

    #[test]
    fn level_without_capacity_is_zero() {
        let s = ResourceStock::new(FOOD);
        assert_eq!(s.level(), 0.0);
        let s = ResourceStock::with_amount(FOOD, 25.0, 100.0);
        assert_eq!(s.level(), 0.25);
    }

    #[test]
    fn depletion_time() {
        let s = ResourceStock::with_amount(FOOD, 30.0, 100.0);
        assert_eq!(s.depletion(-3.0), 10.0);
        assert!(s.depletion(0.0).is_infinite());
        assert!(s.depletion(1.0).is_infinite());
    }

    #[test]
    fn clamp_to_bounds_restores_invariant() {
        let mut s = ResourceStock::with_amount(FOOD, 10.0, 100.0);
        s.amount = 120.0;
        s.clamp_to_bounds();
        assert_eq!(s.amount(), 100.0);
        s.amount = -1e-15;
        s.clamp_to_bounds();
        assert_eq!(s.amount(), 0.0);
    }

    #[test]
    fn begin_tick_resets_accounting() {
        let mut s = ResourceStock::with_amount(FOOD, 10.0, 100.0);
        s.produce(5.0, RULE);
        s.consume(2.0, BrokerId::GENERIC);
        assert_eq!(s.net(), 3.0);
        s.begin_tick();
        assert_eq!(s.produced(), 0.0);
        assert_eq!(s.consumed(), 0.0);
        assert_eq!(s.contributions().count(), 0);
        assert_eq!(s.amount(), 13.0);
    }

    #[test]
    fn broker_rates_drop_noise() {
        let mut s = ResourceStock::with_amount(FOOD, 10.0, 100.0);
        s.produce(4.0, RULE);
        s.consume(1e-9, BrokerId::GENERIC);
        let rates = s.broker_rates(2.0);
        assert_eq!(rates, vec![BrokerRate { broker: RULE, rate: 2.0 }]);
        assert!(s.broker_rates(0.0).is_empty());
    }

    #[test]
    fn stock_set_creates_lazily() {
        let mut set = StockSet::new();
        assert!(set.find(FOOD).is_none());
        assert_eq!(set.amount(FOOD), 0.0);
        let s = set.get(FOOD);
        assert_eq!(s.amount(), 0.0);
        assert_eq!(s.capacity(), 0.0);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn register_accumulates_containers() {
        let mut set = StockSet::new();
        set.register(FOOD, 10.0, 50.0);
        set.register(FOOD, 5.0, 50.0);
        assert_eq!(set.amount(FOOD), 15.0);
        assert_eq!(set.capacity(FOOD), 100.0);
    }
}
