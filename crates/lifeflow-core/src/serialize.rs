//! Binary snapshots of vessel and simulation state.
//!
//! Snapshots are encoded with `bitcode` behind a versioned header. The
//! catalog and settings are not part of a snapshot: they are rebuilt from
//! data files, and a snapshot is only meaningful against the catalog it was
//! taken with. The event bus holds closures and starts out empty after a
//! restore.

use crate::catalog::ProfileCatalog;
use crate::context::SimulationContext;
use crate::id::VesselId;
use crate::modifier::VesselEnvironment;
use crate::settings::SimulationSettings;
use crate::simulation::Simulation;
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a single-vessel snapshot.
pub const VESSEL_SNAPSHOT_MAGIC: u32 = 0x11FE_0001;

/// Magic number identifying a whole-simulation snapshot.
pub const SIMULATION_SNAPSHOT_MAGIC: u32 = 0x11FE_0002;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("data too short for snapshot header")]
    TooShort,
    #[error("invalid magic number: expected 0x{expected:08X}, got 0x{found:08X}")]
    InvalidMagic { expected: u32, found: u32 },
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header stored in front of every snapshot payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Ticks simulated when the snapshot was taken. For a whole simulation
    /// this is the highest vessel tick count.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(magic: u32, tick: u64) -> Self {
        Self {
            magic,
            version: FORMAT_VERSION,
            tick,
        }
    }

    /// Check the header against the expected magic and the current version.
    pub fn validate(&self, expected: u32) -> Result<(), DeserializeError> {
        if self.magic != expected {
            return Err(DeserializeError::InvalidMagic {
                expected,
                found: self.magic,
            });
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Header plus the encoded body, so the header can be read and checked
/// before the body is decoded.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    header: SnapshotHeader,
    payload: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SimulationPayload {
    vessels: SlotMap<VesselId, SimulationContext>,
    environments: SecondaryMap<VesselId, VesselEnvironment>,
}

fn encode<T: Serialize>(magic: u32, tick: u64, body: &T) -> Result<Vec<u8>, SerializeError> {
    let payload = bitcode::serialize(body).map_err(|e| SerializeError::Encode(e.to_string()))?;
    let envelope = Envelope {
        header: SnapshotHeader::new(magic, tick),
        payload,
    };
    bitcode::serialize(&envelope).map_err(|e| SerializeError::Encode(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(data: &[u8], magic: u32) -> Result<T, DeserializeError> {
    let envelope = open(data)?;
    envelope.header.validate(magic)?;
    bitcode::deserialize(&envelope.payload).map_err(|e| DeserializeError::Decode(e.to_string()))
}

fn open(data: &[u8]) -> Result<Envelope, DeserializeError> {
    if data.is_empty() {
        return Err(DeserializeError::TooShort);
    }
    bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))
}

// ---------------------------------------------------------------------------
// SimulationContext
// ---------------------------------------------------------------------------

impl SimulationContext {
    /// Encode this vessel's state.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        encode(VESSEL_SNAPSHOT_MAGIC, self.ticks, self)
    }

    /// Decode a vessel snapshot, validating its header first.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        decode(data, VESSEL_SNAPSHOT_MAGIC)
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

impl Simulation {
    /// Encode every vessel and its environment. Vessel ids survive the
    /// round trip.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let tick = self
            .vessels
            .values()
            .map(SimulationContext::ticks)
            .max()
            .unwrap_or(0);
        let payload = SimulationPayload {
            vessels: self.vessels.clone(),
            environments: self.environments.clone(),
        };
        encode(SIMULATION_SNAPSHOT_MAGIC, tick, &payload)
    }

    /// Rebuild a simulation from a snapshot and the catalog it was taken
    /// with. Listeners must be registered again.
    pub fn deserialize(
        data: &[u8],
        catalog: ProfileCatalog,
        settings: SimulationSettings,
    ) -> Result<Self, DeserializeError> {
        let payload: SimulationPayload = decode(data, SIMULATION_SNAPSHOT_MAGIC)?;
        let mut sim = Simulation::new(catalog, settings);
        sim.vessels = payload.vessels;
        sim.environments = payload.environments;
        Ok(sim)
    }
}

/// Read a snapshot's header without decoding or validating its body.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    open(data).map(|envelope| envelope.header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::id::{BrokerId, ProcessId, ResourceId};
    use crate::rule::RuleSpec;
    use crate::tick::TickSimulator;

    fn catalog() -> ProfileCatalog {
        let mut b = CatalogBuilder::new();
        b.register_resource("Food", 1.0).unwrap();
        let mut spec = RuleSpec::new("eating");
        spec.input = Some("Food".to_string());
        spec.rate = 1.0;
        spec.degeneration = 0.01;
        b.add_rule(spec).unwrap();
        b.build()
    }

    fn vessel() -> SimulationContext {
        let mut ctx = SimulationContext::new();
        ctx.stocks_mut().register(ResourceId(0), 10.0, 20.0);
        ctx.add_crew("Jebediah");
        ctx.configure_process(ProcessId(0)).set_fraction(0.5);
        ctx
    }

    #[test]
    fn vessel_round_trip_preserves_state() {
        let cat = catalog();
        let settings = SimulationSettings::default();
        let mut ctx = vessel();
        TickSimulator::new(&cat, &settings).tick(&mut ctx, &VesselEnvironment::default(), 12.0);

        let data = ctx.serialize().unwrap();
        let restored = SimulationContext::deserialize(&data).unwrap();
        assert_eq!(restored.state_hash(), ctx.state_hash());
        assert_eq!(restored.ticks(), 1);
        assert_eq!(restored.process(ProcessId(0)).map(|p| p.fraction()), Some(0.5));
        assert_eq!(restored.telemetry(), ctx.telemetry());
    }

    #[test]
    fn restored_vessel_continues_identically() {
        let cat = catalog();
        let settings = SimulationSettings::default();
        let sim = TickSimulator::new(&cat, &settings);
        let env = VesselEnvironment::default();

        let mut original = vessel();
        sim.tick(&mut original, &env, 4.0);
        let mut restored = SimulationContext::deserialize(&original.serialize().unwrap()).unwrap();
        for _ in 0..5 {
            sim.tick(&mut original, &env, 3.0);
            sim.tick(&mut restored, &env, 3.0);
        }
        assert_eq!(original.state_hash(), restored.state_hash());
    }

    #[test]
    fn simulation_round_trip_keeps_vessel_ids() {
        let mut sim = Simulation::new(catalog(), SimulationSettings::default());
        let a = sim.add_vessel(vessel());
        let b = sim.add_vessel(vessel());
        sim.remove_vessel(a);
        sim.set_environment(b, VesselEnvironment {
            crew_count: 1,
            ..Default::default()
        });
        sim.tick_all(2.0);

        let data = sim.serialize().unwrap();
        assert_eq!(read_snapshot_header(&data).unwrap().tick, 1);
        let restored = Simulation::deserialize(&data, catalog(), SimulationSettings::default())
            .unwrap();
        assert_eq!(restored.vessel_count(), 1);
        assert!(restored.vessel(a).is_none());
        assert_eq!(restored.environment(b).map(|e| e.crew_count), Some(1));
        assert_eq!(restored.state_hash(), sim.state_hash());
    }

    #[test]
    fn garbage_is_a_decode_error() {
        match SimulationContext::deserialize(&[0u8; 10]) {
            Err(DeserializeError::Decode(_) | DeserializeError::InvalidMagic { .. }) => {}
            other => panic!("expected a decode failure, got {other:?}"),
        }
        assert!(matches!(
            SimulationContext::deserialize(&[]),
            Err(DeserializeError::TooShort)
        ));
    }

    #[test]
    fn snapshot_kinds_are_not_interchangeable() {
        let sim = Simulation::new(catalog(), SimulationSettings::default());
        let data = sim.serialize().unwrap();
        assert!(matches!(
            SimulationContext::deserialize(&data),
            Err(DeserializeError::InvalidMagic { expected: VESSEL_SNAPSHOT_MAGIC, .. })
        ));
        assert_eq!(read_snapshot_header(&data).unwrap().magic, SIMULATION_SNAPSHOT_MAGIC);
    }

    #[test]
    fn header_validation() {
        assert!(SnapshotHeader::new(VESSEL_SNAPSHOT_MAGIC, 0)
            .validate(VESSEL_SNAPSHOT_MAGIC)
            .is_ok());

        let wrong_kind = SnapshotHeader::new(SIMULATION_SNAPSHOT_MAGIC, 0);
        assert!(matches!(
            wrong_kind.validate(VESSEL_SNAPSHOT_MAGIC),
            Err(DeserializeError::InvalidMagic { found: SIMULATION_SNAPSHOT_MAGIC, .. })
        ));

        let future = SnapshotHeader {
            magic: VESSEL_SNAPSHOT_MAGIC,
            version: 999,
            tick: 0,
        };
        assert!(matches!(
            future.validate(VESSEL_SNAPSHOT_MAGIC),
            Err(DeserializeError::FutureVersion(999))
        ));

        let old = SnapshotHeader {
            magic: VESSEL_SNAPSHOT_MAGIC,
            version: 0,
            tick: 0,
        };
        assert!(matches!(
            old.validate(VESSEL_SNAPSHOT_MAGIC),
            Err(DeserializeError::UnsupportedVersion(0))
        ));
    }

    #[test]
    fn broker_contributions_survive() {
        let mut ctx = SimulationContext::new();
        ctx.stocks_mut().register(ResourceId(0), 10.0, 10.0);
        ctx.stocks_mut().consume(ResourceId(0), 2.0, BrokerId(3));
        ctx.last_elapsed = 1.0;
        let restored = SimulationContext::deserialize(&ctx.serialize().unwrap()).unwrap();
        assert_eq!(restored.telemetry(), ctx.telemetry());
    }
}
