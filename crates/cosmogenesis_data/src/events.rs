use crate::celestial::BodyKind;
use crate::vector::Vec3;
use serde::{Deserialize, Serialize};

/// The topics the core publishes. Names are part of the external contract.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ParticleCreated,
    ParticleDied,
    EntanglementFormed,
    CriticalEventTriggered,
    SectorGenerated,
    AutonomousCreationRequested,
}

impl Topic {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Topic::ParticleCreated => "particle-created",
            Topic::ParticleDied => "particle-died",
            Topic::EntanglementFormed => "entanglement-formed",
            Topic::CriticalEventTriggered => "critical-event-triggered",
            Topic::SectorGenerated => "sector-generated",
            Topic::AutonomousCreationRequested => "autonomous-creation-requested",
        }
    }
}

/// Threshold crossings detected over the transient particle population.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriticalEventKind {
    ConsciousnessSurge,
    QuantumCoalescence,
    DimensionalRift,
    StellarNursery,
    ChaoticDestabilization,
    /// A single particle's total potential crossed the critical threshold.
    ParticleCritical,
}

/// A detected threshold crossing. Ephemeral: retained only in bounded history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CriticalEvent {
    pub kind: CriticalEventKind,
    pub location: Vec3,
    /// Energy or consciousness score, depending on the kind.
    pub magnitude: f64,
    pub tick: u64,
    pub timestamp: String,
}

/// A synthesized request for the external generation collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CreationRequest {
    pub object: BodyKind,
    pub position: Vec3,
    pub size: f64,
    pub lifetime_s: f64,
    pub magnitude: f64,
}

/// Typed event payloads, one variant per topic.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event")]
pub enum Payload {
    ParticleCreated {
        id: u64,
        position: Vec3,
        frequency_hz: f64,
        amplitude: f64,
        energy: f64,
        tick: u64,
    },
    ParticleDied {
        id: u64,
        final_energy: f64,
        age: f64,
        position: Vec3,
        tick: u64,
    },
    EntanglementFormed {
        first: u64,
        second: u64,
        strength: f64,
        distance: f64,
        tick: u64,
    },
    CriticalEventTriggered {
        kind: CriticalEventKind,
        location: Vec3,
        magnitude: f64,
        tick: u64,
    },
    SectorGenerated {
        coord: [i64; 3],
        object_count: usize,
        tick: u64,
    },
    AutonomousCreationRequested {
        request: CreationRequest,
        tick: u64,
    },
}

impl Payload {
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Payload::ParticleCreated { .. } => Topic::ParticleCreated,
            Payload::ParticleDied { .. } => Topic::ParticleDied,
            Payload::EntanglementFormed { .. } => Topic::EntanglementFormed,
            Payload::CriticalEventTriggered { .. } => Topic::CriticalEventTriggered,
            Payload::SectorGenerated { .. } => Topic::SectorGenerated,
            Payload::AutonomousCreationRequested { .. } => Topic::AutonomousCreationRequested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_topic_mapping() {
        let p = Payload::ParticleCreated {
            id: 1,
            position: Vec3::ZERO,
            frequency_hz: 440.0,
            amplitude: 1.0,
            energy: 1.0,
            tick: 0,
        };
        assert_eq!(p.topic(), Topic::ParticleCreated);
        assert_eq!(p.topic().name(), "particle-created");
    }

    #[test]
    fn test_critical_event_reachable_from_crate_root() {
        let event = crate::CriticalEvent {
            kind: crate::CriticalEventKind::DimensionalRift,
            location: Vec3::ZERO,
            magnitude: 1.0,
            tick: 0,
            timestamp: String::new(),
        };
        assert_eq!(event.kind, CriticalEventKind::DimensionalRift);
    }

    #[test]
    fn test_payload_serializes_tagged() {
        let p = Payload::SectorGenerated {
            coord: [1, -2, 3],
            object_count: 7,
            tick: 42,
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"event\":\"SectorGenerated\""));
    }
}
