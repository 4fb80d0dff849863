//! Supply monitoring: low / empty / refilled alerts for a resource level.

use crate::id::ResourceId;
use crate::rule::MessageLevel;
use crate::stock::ResourceStock;
use serde::{Deserialize, Serialize};

/// Name-based description of a monitored supply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplySpec {
    pub resource: String,
    /// Level below which the supply counts as low.
    pub low_threshold: f64,
    pub low_message: Option<String>,
    pub empty_message: Option<String>,
    pub refill_message: Option<String>,
    /// Also alert on vessels without crew.
    pub monitor_unmanned: bool,
}

impl SupplySpec {
    pub fn new(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            low_threshold: 0.15,
            low_message: None,
            empty_message: None,
            refill_message: None,
            monitor_unmanned: false,
        }
    }
}

/// A monitored supply with its resource resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyDefinition {
    pub resource: ResourceId,
    pub low_threshold: f64,
    pub low_message: Option<String>,
    pub empty_message: Option<String>,
    pub refill_message: Option<String>,
    pub monitor_unmanned: bool,
}

/// A change in supply level worth telling the crew about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupplyAlert {
    Low,
    Empty,
    Refilled,
}

/// Per-vessel alert state of one supply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyData {
    pub message: MessageLevel,
}

impl SupplyDefinition {
    /// Check the stock level and return the alert crossed, if any.
    pub fn check(
        &self,
        data: &mut SupplyData,
        stock: &ResourceStock,
        crewed: bool,
        epsilon: f64,
    ) -> Option<SupplyAlert> {
        if stock.capacity() <= epsilon || !(crewed || self.monitor_unmanned) {
            return None;
        }
        let level = stock.level();
        if level <= epsilon && data.message < MessageLevel::Danger {
            data.message = MessageLevel::Danger;
            Some(SupplyAlert::Empty)
        } else if level < self.low_threshold && data.message < MessageLevel::Warning {
            data.message = MessageLevel::Warning;
            Some(SupplyAlert::Low)
        } else if level > self.low_threshold && data.message > MessageLevel::Nominal {
            data.message = MessageLevel::Nominal;
            Some(SupplyAlert::Refilled)
        } else {
            None
        }
    }

    pub fn message(&self, alert: SupplyAlert) -> Option<&str> {
        match alert {
            SupplyAlert::Low => self.low_message.as_deref(),
            SupplyAlert::Empty => self.empty_message.as_deref(),
            SupplyAlert::Refilled => self.refill_message.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;
    const FOOD: ResourceId = ResourceId(0);

    fn food_supply() -> SupplyDefinition {
        SupplyDefinition {
            resource: FOOD,
            low_threshold: 0.15,
            low_message: Some("food is running low".to_string()),
            empty_message: None,
            refill_message: None,
            monitor_unmanned: false,
        }
    }

    #[test]
    fn low_then_empty_then_refilled() {
        let def = food_supply();
        let mut data = SupplyData::default();
        let low = ResourceStock::with_amount(FOOD, 10.0, 100.0);
        assert_eq!(def.check(&mut data, &low, true, EPS), Some(SupplyAlert::Low));
        assert_eq!(def.check(&mut data, &low, true, EPS), None);
        let empty = ResourceStock::with_amount(FOOD, 0.0, 100.0);
        assert_eq!(def.check(&mut data, &empty, true, EPS), Some(SupplyAlert::Empty));
        assert_eq!(def.check(&mut data, &empty, true, EPS), None);
        let full = ResourceStock::with_amount(FOOD, 100.0, 100.0);
        assert_eq!(def.check(&mut data, &full, true, EPS), Some(SupplyAlert::Refilled));
        assert_eq!(data.message, MessageLevel::Nominal);
    }

    #[test]
    fn unmanned_vessels_are_ignored_by_default() {
        let mut def = food_supply();
        let mut data = SupplyData::default();
        let empty = ResourceStock::with_amount(FOOD, 0.0, 100.0);
        assert_eq!(def.check(&mut data, &empty, false, EPS), None);
        def.monitor_unmanned = true;
        assert_eq!(def.check(&mut data, &empty, false, EPS), Some(SupplyAlert::Empty));
    }

    #[test]
    fn no_capacity_no_alert() {
        let def = food_supply();
        let mut data = SupplyData::default();
        assert_eq!(def.check(&mut data, &ResourceStock::new(FOOD), true, EPS), None);
    }

    #[test]
    fn message_by_alert() {
        let def = food_supply();
        assert_eq!(def.message(SupplyAlert::Low), Some("food is running low"));
        assert_eq!(def.message(SupplyAlert::Empty), None);
    }
}
