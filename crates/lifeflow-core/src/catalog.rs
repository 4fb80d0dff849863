use crate::id::*;
use crate::modifier::ModifierToken;
use crate::process::{DumpSelection, ProcessDefinition, ProcessSpec, RateEntry};
use crate::rule::{RuleDefinition, RuleSpec};
use crate::supply::{SupplyDefinition, SupplySpec};
use std::collections::HashMap;

/// Densities and ratios at or below this are treated as unset.
const RATIO_EPSILON: f64 = 1e-12;

/// Name of the catch-all broker.
pub const GENERIC_BROKER: &str = "Others";

/// A resource known to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub name: String,
    /// Mass per unit, used to derive conversion ratios.
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("{kind} without a name")]
    MissingName { kind: &'static str },
    #[error("{owner} references undefined resource '{resource}'")]
    UnknownResource { owner: String, resource: String },
    #[error("rule {0} has a non-positive degeneration")]
    NonPositiveDegeneration(String),
    #[error("{owner} has a malformed rate '{token}'")]
    MalformedRate { owner: String, token: String },
    #[error("duplicate {kind} '{name}'")]
    DuplicateName { kind: &'static str, name: String },
    #[error("rule {0} has unordered thresholds")]
    InvalidThresholds(String),
}

/// Parse a `resource@rate` token.
pub fn parse_rate(owner: &str, token: &str) -> Result<(String, f64), CatalogError> {
    let malformed = || CatalogError::MalformedRate {
        owner: owner.to_string(),
        token: token.to_string(),
    };
    let parts: Vec<&str> = token.split('@').map(str::trim).collect();
    let [resource, rate] = parts.as_slice() else {
        return Err(malformed());
    };
    if resource.is_empty() {
        return Err(malformed());
    }
    let rate: f64 = rate.parse().map_err(|_| malformed())?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(malformed());
    }
    Ok((resource.to_string(), rate))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for the immutable [`ProfileCatalog`]. Every definition is
/// validated and resolved as it is added, so one bad definition can be
/// skipped without affecting the rest.
#[derive(Debug)]
pub struct CatalogBuilder {
    resources: Vec<ResourceDefinition>,
    resource_name_to_id: HashMap<String, ResourceId>,
    brokers: Vec<String>,
    broker_name_to_id: HashMap<String, BrokerId>,
    rules: Vec<RuleDefinition>,
    rule_name_to_id: HashMap<String, RuleId>,
    processes: Vec<ProcessDefinition>,
    process_name_to_id: HashMap<String, ProcessId>,
    supplies: Vec<SupplyDefinition>,
    supply_resource_to_id: HashMap<ResourceId, SupplyId>,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            resources: Vec::new(),
            resource_name_to_id: HashMap::new(),
            brokers: Vec::new(),
            broker_name_to_id: HashMap::new(),
            rules: Vec::new(),
            rule_name_to_id: HashMap::new(),
            processes: Vec::new(),
            process_name_to_id: HashMap::new(),
            supplies: Vec::new(),
            supply_resource_to_id: HashMap::new(),
        };
        builder.brokers.push(GENERIC_BROKER.to_string());
        builder
            .broker_name_to_id
            .insert(GENERIC_BROKER.to_string(), BrokerId::GENERIC);
        builder
    }

    /// Register a resource. Returns its ID.
    pub fn register_resource(
        &mut self,
        name: &str,
        density: f64,
    ) -> Result<ResourceId, CatalogError> {
        if name.is_empty() {
            return Err(CatalogError::MissingName { kind: "resource" });
        }
        if self.resource_name_to_id.contains_key(name) {
            return Err(CatalogError::DuplicateName {
                kind: "resource",
                name: name.to_string(),
            });
        }
        let id = ResourceId(self.resources.len() as u32);
        self.resources.push(ResourceDefinition {
            name: name.to_string(),
            density: density.max(0.0),
        });
        self.resource_name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    /// Register a broker under a name nobody else uses. Rules, processes and
    /// host part modules share one namespace, and the generic broker's name
    /// is taken.
    pub fn register_broker(&mut self, name: &str) -> Result<BrokerId, CatalogError> {
        if self.broker_name_to_id.contains_key(name) {
            return Err(CatalogError::DuplicateName {
                kind: "broker",
                name: name.to_string(),
            });
        }
        let id = BrokerId(self.brokers.len() as u32);
        self.brokers.push(name.to_string());
        self.broker_name_to_id.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_name_to_id.get(name).copied()
    }

    /// Validate and resolve a rule.
    pub fn add_rule(&mut self, spec: RuleSpec) -> Result<RuleId, CatalogError> {
        if spec.name.is_empty() {
            return Err(CatalogError::MissingName { kind: "rule" });
        }
        if self.rule_name_to_id.contains_key(&spec.name) {
            return Err(CatalogError::DuplicateName {
                kind: "rule",
                name: spec.name,
            });
        }
        if spec.degeneration <= 0.0 || spec.degeneration.is_nan() {
            return Err(CatalogError::NonPositiveDegeneration(spec.name));
        }
        if !spec.thresholds.is_valid() {
            return Err(CatalogError::InvalidThresholds(spec.name));
        }

        let input = spec
            .input
            .as_deref()
            .map(|r| self.resolve(&spec.name, r))
            .transpose()?;
        let output = spec
            .output
            .as_deref()
            .map(|r| self.resolve(&spec.name, r))
            .transpose()?;
        let modifiers = self.resolve_modifiers(&spec.name, &spec.modifiers)?;

        let ratio = match (input, output) {
            (Some(i), Some(o)) if spec.ratio <= RATIO_EPSILON => self.density_ratio(i, o),
            _ => spec.ratio,
        };

        let broker = self.register_broker(&spec.name)?;
        let id = RuleId(self.rules.len() as u32);
        self.rule_name_to_id.insert(spec.name.clone(), id);
        self.rules.push(RuleDefinition {
            name: spec.name,
            broker,
            input,
            output,
            interval: spec.interval.max(0.0),
            rate: spec.rate,
            ratio,
            degeneration: spec.degeneration,
            variance: spec.variance.clamp(0.0, 1.0),
            modifiers,
            thresholds: spec.thresholds,
            messages: spec.messages,
            breakdown: spec.breakdown,
            lifetime: spec.lifetime,
            recovery: spec.recovery,
        });
        Ok(id)
    }

    /// Validate and resolve a process.
    pub fn add_process(&mut self, spec: ProcessSpec) -> Result<ProcessId, CatalogError> {
        if spec.name.is_empty() {
            return Err(CatalogError::MissingName { kind: "process" });
        }
        if self.process_name_to_id.contains_key(&spec.name) {
            return Err(CatalogError::DuplicateName {
                kind: "process",
                name: spec.name,
            });
        }
        let inputs = self.resolve_rates(&spec.name, &spec.inputs)?;
        let outputs = self.resolve_rates(&spec.name, &spec.outputs)?;
        let modifiers = self.resolve_modifiers(&spec.name, &spec.modifiers)?;

        let dumpable = select_outputs(&spec.dumpable, &spec.outputs, &outputs);
        let default_dumped: Vec<ResourceId> =
            select_outputs(&spec.default_dumped, &spec.outputs, &outputs)
                .into_iter()
                .filter(|r| dumpable.contains(r))
                .collect();

        let broker = self.register_broker(&spec.name)?;
        let id = ProcessId(self.processes.len() as u32);
        self.process_name_to_id.insert(spec.name.clone(), id);
        self.processes.push(ProcessDefinition {
            name: spec.name,
            broker,
            inputs,
            outputs,
            modifiers,
            dumpable,
            default_dumped,
        });
        Ok(id)
    }

    /// Validate and resolve a supply. One supply per resource.
    pub fn add_supply(&mut self, spec: SupplySpec) -> Result<SupplyId, CatalogError> {
        if spec.resource.is_empty() {
            return Err(CatalogError::MissingName { kind: "supply" });
        }
        let resource = self.resolve("supply", &spec.resource)?;
        if self.supply_resource_to_id.contains_key(&resource) {
            return Err(CatalogError::DuplicateName {
                kind: "supply",
                name: spec.resource,
            });
        }
        let id = SupplyId(self.supplies.len() as u32);
        self.supply_resource_to_id.insert(resource, id);
        self.supplies.push(SupplyDefinition {
            resource,
            low_threshold: spec.low_threshold.clamp(0.0, 1.0),
            low_message: spec.low_message,
            empty_message: spec.empty_message,
            refill_message: spec.refill_message,
            monitor_unmanned: spec.monitor_unmanned,
        });
        Ok(id)
    }

    /// Finalize and build the immutable catalog.
    pub fn build(self) -> ProfileCatalog {
        ProfileCatalog {
            resources: self.resources,
            resource_name_to_id: self.resource_name_to_id,
            brokers: self.brokers,
            broker_name_to_id: self.broker_name_to_id,
            rules: self.rules,
            rule_name_to_id: self.rule_name_to_id,
            processes: self.processes,
            process_name_to_id: self.process_name_to_id,
            supplies: self.supplies,
            supply_resource_to_id: self.supply_resource_to_id,
        }
    }

    fn resolve(&self, owner: &str, resource: &str) -> Result<ResourceId, CatalogError> {
        self.resource_id(resource)
            .ok_or_else(|| CatalogError::UnknownResource {
                owner: owner.to_string(),
                resource: resource.to_string(),
            })
    }

    fn resolve_rates(
        &self,
        owner: &str,
        entries: &[(String, f64)],
    ) -> Result<Vec<RateEntry>, CatalogError> {
        entries
            .iter()
            .map(|(resource, rate)| {
                if !rate.is_finite() || *rate < 0.0 {
                    return Err(CatalogError::MalformedRate {
                        owner: owner.to_string(),
                        token: format!("{resource}@{rate}"),
                    });
                }
                Ok(RateEntry {
                    resource: self.resolve(owner, resource)?,
                    rate: *rate,
                })
            })
            .collect()
    }

    fn resolve_modifiers(
        &self,
        owner: &str,
        names: &[String],
    ) -> Result<Vec<ModifierToken>, CatalogError> {
        names
            .iter()
            .map(|name| match ModifierToken::reserved(name) {
                Some(token) => Ok(token),
                None => self.resolve(owner, name).map(ModifierToken::Resource),
            })
            .collect()
    }

    fn density_ratio(&self, input: ResourceId, output: ResourceId) -> f64 {
        let density = |id: ResourceId| self.resources[id.0 as usize].density;
        let (din, dout) = (density(input), density(output));
        if din > RATIO_EPSILON && dout > RATIO_EPSILON {
            din / dout
        } else {
            1.0
        }
    }
}

/// Resolve a dump selection against the declared outputs. Names that are
/// not outputs of the process are ignored.
fn select_outputs(
    selection: &DumpSelection,
    names: &[(String, f64)],
    resolved: &[RateEntry],
) -> Vec<ResourceId> {
    match selection {
        DumpSelection::All => resolved.iter().map(|e| e.resource).collect(),
        DumpSelection::None => Vec::new(),
        DumpSelection::Only(list) => names
            .iter()
            .zip(resolved)
            .filter(|((name, _), _)| list.contains(name))
            .map(|(_, entry)| entry.resource)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable catalog of resources, brokers and definitions. Frozen after
/// build; shared read-only by every simulation entry point.
#[derive(Debug)]
pub struct ProfileCatalog {
    resources: Vec<ResourceDefinition>,
    resource_name_to_id: HashMap<String, ResourceId>,
    brokers: Vec<String>,
    broker_name_to_id: HashMap<String, BrokerId>,
    rules: Vec<RuleDefinition>,
    rule_name_to_id: HashMap<String, RuleId>,
    processes: Vec<ProcessDefinition>,
    process_name_to_id: HashMap<String, ProcessId>,
    supplies: Vec<SupplyDefinition>,
    supply_resource_to_id: HashMap<ResourceId, SupplyId>,
}

impl ProfileCatalog {
    pub fn resource(&self, id: ResourceId) -> Option<&ResourceDefinition> {
        self.resources.get(id.0 as usize)
    }

    pub fn resource_id(&self, name: &str) -> Option<ResourceId> {
        self.resource_name_to_id.get(name).copied()
    }

    /// Resource name, or `"?"` for unknown ids.
    pub fn resource_name(&self, id: ResourceId) -> &str {
        self.resource(id).map_or("?", |r| r.name.as_str())
    }

    pub fn broker_name(&self, id: BrokerId) -> Option<&str> {
        self.brokers.get(id.0 as usize).map(String::as_str)
    }

    pub fn broker_id(&self, name: &str) -> Option<BrokerId> {
        self.broker_name_to_id.get(name).copied()
    }

    pub fn rule(&self, id: RuleId) -> Option<&RuleDefinition> {
        self.rules.get(id.0 as usize)
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rule_name_to_id.get(name).copied()
    }

    /// Rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &RuleDefinition)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, r)| (RuleId(i as u32), r))
    }

    pub fn process(&self, id: ProcessId) -> Option<&ProcessDefinition> {
        self.processes.get(id.0 as usize)
    }

    pub fn process_id(&self, name: &str) -> Option<ProcessId> {
        self.process_name_to_id.get(name).copied()
    }

    /// Processes in registration order.
    pub fn processes(&self) -> impl Iterator<Item = (ProcessId, &ProcessDefinition)> {
        self.processes
            .iter()
            .enumerate()
            .map(|(i, p)| (ProcessId(i as u32), p))
    }

    pub fn supply(&self, id: SupplyId) -> Option<&SupplyDefinition> {
        self.supplies.get(id.0 as usize)
    }

    /// The supply monitoring a resource, if any.
    pub fn supply_for(&self, resource: ResourceId) -> Option<SupplyId> {
        self.supply_resource_to_id.get(&resource).copied()
    }

    pub fn supplies(&self) -> impl Iterator<Item = (SupplyId, &SupplyDefinition)> {
        self.supplies
            .iter()
            .enumerate()
            .map(|(i, s)| (SupplyId(i as u32), s))
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn broker_count(&self) -> usize {
        self.brokers.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    pub fn supply_count(&self) -> usize {
        self.supplies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new();
        b.register_resource("Food", 0.3).unwrap();
        b.register_resource("Water", 1.0).unwrap();
        b.register_resource("WasteWater", 1.0).unwrap();
        b.register_resource("Oxygen", 0.0).unwrap();
        b.register_resource("CarbonDioxide", 0.0).unwrap();
        b
    }

    fn drinking() -> RuleSpec {
        let mut spec = RuleSpec::new("thirst");
        spec.input = Some("Water".to_string());
        spec.output = Some("WasteWater".to_string());
        spec.rate = 0.01;
        spec.degeneration = 0.001;
        spec.modifiers = vec!["per_capita".to_string()];
        spec
    }

    #[test]
    fn register_and_build() {
        let mut b = setup_builder();
        b.add_rule(drinking()).unwrap();
        let cat = b.build();
        assert_eq!(cat.resource_count(), 5);
        assert_eq!(cat.rule_count(), 1);
        // Generic broker plus one per rule.
        assert_eq!(cat.broker_count(), 2);
    }

    #[test]
    fn lookup_by_name() {
        let mut b = setup_builder();
        let rule = b.add_rule(drinking()).unwrap();
        let cat = b.build();
        assert_eq!(cat.rule_id("thirst"), Some(rule));
        assert_eq!(cat.resource_id("Water"), Some(ResourceId(1)));
        assert!(cat.resource_id("Unobtainium").is_none());
        assert_eq!(cat.resource_name(ResourceId(0)), "Food");
        assert_eq!(cat.broker_id(GENERIC_BROKER), Some(BrokerId::GENERIC));
        let def = cat.rule(rule).unwrap();
        assert_eq!(cat.broker_name(def.broker), Some("thirst"));
    }

    #[test]
    fn rule_resolves_resources_and_modifiers() {
        let mut b = setup_builder();
        let id = b.add_rule(drinking()).unwrap();
        let cat = b.build();
        let def = cat.rule(id).unwrap();
        assert_eq!(def.input, cat.resource_id("Water"));
        assert_eq!(def.output, cat.resource_id("WasteWater"));
        assert_eq!(def.modifiers, vec![ModifierToken::PerCapita]);
    }

    #[test]
    fn ratio_derived_from_densities() {
        let mut b = setup_builder();
        let mut spec = drinking();
        spec.input = Some("Food".to_string());
        let id = b.add_rule(spec).unwrap();
        let cat = b.build();
        assert!((cat.rule(id).unwrap().ratio - 0.3).abs() < 1e-12);
    }

    #[test]
    fn ratio_defaults_to_one_without_density() {
        let mut b = setup_builder();
        let mut spec = RuleSpec::new("breathing");
        spec.input = Some("Oxygen".to_string());
        spec.output = Some("CarbonDioxide".to_string());
        spec.degeneration = 1.0;
        let id = b.add_rule(spec).unwrap();
        let cat = b.build();
        assert_eq!(cat.rule(id).unwrap().ratio, 1.0);
    }

    #[test]
    fn explicit_ratio_is_kept() {
        let mut b = setup_builder();
        let mut spec = drinking();
        spec.ratio = 0.9;
        let id = b.add_rule(spec).unwrap();
        assert_eq!(b.build().rule(id).unwrap().ratio, 0.9);
    }

    #[test]
    fn resource_modifier_resolves_to_resource_token() {
        let mut b = setup_builder();
        let mut spec = drinking();
        spec.modifiers = vec!["Oxygen".to_string(), "pressure".to_string()];
        let id = b.add_rule(spec).unwrap();
        let cat = b.build();
        let oxygen = cat.resource_id("Oxygen").unwrap();
        assert_eq!(
            cat.rule(id).unwrap().modifiers,
            vec![ModifierToken::Resource(oxygen), ModifierToken::Pressure]
        );
    }

    // -----------------------------------------------------------------------
    // Error path tests
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_resource_is_rejected() {
        let mut b = setup_builder();
        let mut spec = drinking();
        spec.input = Some("Juice".to_string());
        match b.add_rule(spec) {
            Err(CatalogError::UnknownResource { owner, resource }) => {
                assert_eq!(owner, "thirst");
                assert_eq!(resource, "Juice");
            }
            other => panic!("expected UnknownResource, got: {other:?}"),
        }
        // The failed rule left nothing behind.
        let cat = b.build();
        assert_eq!(cat.rule_count(), 0);
        assert!(cat.broker_id("thirst").is_none());
    }

    #[test]
    fn unknown_modifier_name_is_rejected() {
        let mut b = setup_builder();
        let mut spec = drinking();
        spec.modifiers = vec!["happiness".to_string()];
        assert!(matches!(
            b.add_rule(spec),
            Err(CatalogError::UnknownResource { .. })
        ));
    }

    #[test]
    fn non_positive_degeneration_is_rejected() {
        let mut b = setup_builder();
        let mut spec = drinking();
        spec.degeneration = 0.0;
        assert_eq!(
            b.add_rule(spec),
            Err(CatalogError::NonPositiveDegeneration("thirst".to_string()))
        );
    }

    #[test]
    fn missing_name_is_rejected() {
        let mut b = setup_builder();
        let mut spec = drinking();
        spec.name.clear();
        assert_eq!(
            b.add_rule(spec),
            Err(CatalogError::MissingName { kind: "rule" })
        );
        assert_eq!(
            b.register_resource("", 1.0),
            Err(CatalogError::MissingName { kind: "resource" })
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut b = setup_builder();
        b.add_rule(drinking()).unwrap();
        assert!(matches!(
            b.add_rule(drinking()),
            Err(CatalogError::DuplicateName { kind: "rule", .. })
        ));
        assert!(matches!(
            b.register_resource("Food", 1.0),
            Err(CatalogError::DuplicateName { kind: "resource", .. })
        ));
    }

    #[test]
    fn broker_names_stay_unique() {
        let mut b = setup_builder();
        let mut generic = drinking();
        generic.name = GENERIC_BROKER.to_string();
        assert!(matches!(
            b.add_rule(generic),
            Err(CatalogError::DuplicateName { kind: "broker", ref name }) if name == GENERIC_BROKER
        ));

        b.add_rule(drinking()).unwrap();
        assert!(matches!(
            b.add_process(ProcessSpec::new("thirst").input("Water", 1.0)),
            Err(CatalogError::DuplicateName { kind: "broker", .. })
        ));
        b.add_process(ProcessSpec::new("still").input("WasteWater", 1.0))
            .unwrap();
        let mut clash = drinking();
        clash.name = "still".to_string();
        assert!(matches!(
            b.add_rule(clash),
            Err(CatalogError::DuplicateName { kind: "broker", .. })
        ));

        let cat = b.build();
        assert_eq!(cat.broker_count(), 3);
        assert_eq!(cat.rule_count(), 1);
        assert_eq!(cat.process_count(), 1);
        assert_ne!(cat.broker_id("thirst"), cat.broker_id("still"));
    }

    #[test]
    fn host_brokers_cannot_take_rule_names() {
        let mut b = setup_builder();
        let solar = b.register_broker("solar panel").unwrap();
        assert_eq!(solar, BrokerId(1));
        b.add_rule(drinking()).unwrap();
        assert!(b.register_broker("thirst").is_err());
        assert!(b.register_broker("solar panel").is_err());
        assert_eq!(b.build().broker_count(), 3);
    }

    #[test]
    fn unordered_thresholds_are_rejected() {
        let mut b = setup_builder();
        let mut spec = drinking();
        spec.thresholds.warning = 0.9;
        assert!(matches!(
            b.add_rule(spec),
            Err(CatalogError::InvalidThresholds(_))
        ));
    }

    #[test]
    fn parse_rate_tokens() {
        assert_eq!(
            parse_rate("p", "Oxygen@0.5"),
            Ok(("Oxygen".to_string(), 0.5))
        );
        assert_eq!(
            parse_rate("p", " Water @ 2 "),
            Ok(("Water".to_string(), 2.0))
        );
        for bad in ["Oxygen", "Oxygen@", "@1", "a@1@2", "Oxygen@fast", "Oxygen@-1"] {
            assert!(
                matches!(parse_rate("p", bad), Err(CatalogError::MalformedRate { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn process_dump_policy_defaults() {
        let mut b = setup_builder();
        let id = b
            .add_process(
                ProcessSpec::new("recycler")
                    .input("WasteWater", 0.1)
                    .output("Water", 0.09)
                    .output("Oxygen", 0.01),
            )
            .unwrap();
        let cat = b.build();
        let def = cat.process(id).unwrap();
        assert_eq!(def.dumpable.len(), 2);
        assert!(def.default_dumped.is_empty());
    }

    #[test]
    fn process_default_dumped_must_be_dumpable() {
        let mut b = setup_builder();
        let mut spec = ProcessSpec::new("electrolysis")
            .input("Water", 0.1)
            .output("Oxygen", 0.05)
            .output("CarbonDioxide", 0.05);
        spec.dumpable = DumpSelection::Only(vec!["Oxygen".to_string()]);
        spec.default_dumped = DumpSelection::All;
        let id = b.add_process(spec).unwrap();
        let cat = b.build();
        let oxygen = cat.resource_id("Oxygen").unwrap();
        let def = cat.process(id).unwrap();
        assert_eq!(def.dumpable, vec![oxygen]);
        assert_eq!(def.default_dumped, vec![oxygen]);
    }

    #[test]
    fn process_with_negative_rate_is_rejected() {
        let mut b = setup_builder();
        let spec = ProcessSpec::new("bad").input("Water", -1.0);
        assert!(matches!(
            b.add_process(spec),
            Err(CatalogError::MalformedRate { .. })
        ));
    }

    #[test]
    fn one_supply_per_resource() {
        let mut b = setup_builder();
        let id = b.add_supply(SupplySpec::new("Food")).unwrap();
        assert!(b.add_supply(SupplySpec::new("Food")).is_err());
        assert!(matches!(
            b.add_supply(SupplySpec::new("Juice")),
            Err(CatalogError::UnknownResource { .. })
        ));
        let cat = b.build();
        assert_eq!(cat.supply_for(cat.resource_id("Food").unwrap()), Some(id));
        assert_eq!(cat.supply(id).unwrap().low_threshold, 0.15);
    }

    #[test]
    fn registration_order_is_iteration_order() {
        let mut b = setup_builder();
        b.add_rule(drinking()).unwrap();
        let mut eating = drinking();
        eating.name = "hunger".to_string();
        b.add_rule(eating).unwrap();
        let cat = b.build();
        let names: Vec<_> = cat.rules().map(|(_, r)| r.name.as_str()).collect();
        assert_eq!(names, vec!["thirst", "hunger"]);
    }

    #[test]
    fn empty_catalog_builds() {
        let cat = CatalogBuilder::new().build();
        assert_eq!(cat.resource_count(), 0);
        assert_eq!(cat.rule_count(), 0);
        assert_eq!(cat.broker_count(), 1);
        assert!(cat.rule(RuleId(0)).is_none());
    }
}
