//! Critical-event detection over the aggregate particle population.
//!
//! The detector observes, publishes, and synthesizes creation requests; it
//! never creates world content itself. Requests are returned to the driver,
//! which routes them to the sector manager.

use crate::bus::EventBus;
use crate::souldust::{BrainState, SoulDustField};
use cosmogenesis_data::{
    BodyKind, CreationRequest, CriticalEvent, CriticalEventKind, Payload, Vec3,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

const MAX_EVENT_HISTORY: usize = 1000;

/// Half-extent of the fallback location cube used when no particles are
/// alive to derive a centroid from.
const FALLBACK_EXTENT: f64 = 500.0;

pub struct QuantumEventDetector {
    critical_threshold: f64,
    rng: ChaCha8Rng,
    history: VecDeque<CriticalEvent>,
    last_state: BrainState,
}

impl QuantumEventDetector {
    #[must_use]
    pub fn new(critical_threshold: f64, world_seed: u64) -> Self {
        Self {
            critical_threshold,
            rng: ChaCha8Rng::seed_from_u64(world_seed ^ 0x71_75_61_6e_74_75_6d),
            history: VecDeque::new(),
            last_state: BrainState::default(),
        }
    }

    /// Brain state as of the last [`Self::check`] call.
    #[must_use]
    pub fn brain_state(&self) -> BrainState {
        self.last_state
    }

    #[must_use]
    pub fn history(&self) -> impl Iterator<Item = &CriticalEvent> {
        self.history.iter()
    }

    /// Evaluates all threshold rules against the live population. The rules
    /// are independent: any subset may fire in one tick, each firing exactly
    /// once. Returns the synthesized creation requests for the driver.
    pub fn check(
        &mut self,
        dust: &SoulDustField,
        tick: u64,
        bus: &EventBus,
    ) -> Vec<CreationRequest> {
        let state = dust.brain_state(self.critical_threshold);
        self.last_state = state;
        let mut requests = Vec::new();

        if state.total_energy >= self.critical_threshold {
            let location = self.event_location(dust);
            requests.extend(self.fire(
                CriticalEventKind::ConsciousnessSurge,
                location,
                state.total_energy,
                &state,
                tick,
                bus,
            ));
        }

        if state.entanglement_links as f64 > state.particle_count as f64 * 0.5 {
            let location = self.event_location(dust);
            requests.extend(self.fire(
                CriticalEventKind::QuantumCoalescence,
                location,
                state.entanglement_links as f64,
                &state,
                tick,
                bus,
            ));
        }

        if state.mean_consciousness > 0.8 && state.total_energy > self.critical_threshold * 0.5 {
            let location = self.event_location(dust);
            requests.extend(self.fire(
                CriticalEventKind::DimensionalRift,
                location,
                state.total_energy,
                &state,
                tick,
                bus,
            ));
        }

        // A single particle whose cached potential crossed the threshold
        // seeds a nursery at its own position; only the hottest crossing
        // fires per tick.
        let hottest = dust
            .iter()
            .filter(|p| p.alive && p.potential >= self.critical_threshold)
            .max_by(|a, b| a.potential.total_cmp(&b.potential));
        if let Some(particle) = hottest {
            requests.extend(self.fire(
                CriticalEventKind::StellarNursery,
                particle.position,
                particle.energy,
                &state,
                tick,
                bus,
            ));
        }

        requests
    }

    fn fire(
        &mut self,
        kind: CriticalEventKind,
        location: Vec3,
        magnitude: f64,
        state: &BrainState,
        tick: u64,
        bus: &EventBus,
    ) -> Option<CreationRequest> {
        let event = CriticalEvent {
            kind,
            location,
            magnitude,
            tick,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        self.history.push_back(event);
        if self.history.len() > MAX_EVENT_HISTORY {
            self.history.pop_front();
        }

        bus.publish(Payload::CriticalEventTriggered {
            kind,
            location,
            magnitude,
            tick,
        });

        let request = Self::creation_request(kind, location, magnitude, state)?;
        bus.publish(Payload::AutonomousCreationRequested {
            request: request.clone(),
            tick,
        });
        Some(request)
    }

    /// Kind-specific creation payload. Particle-level crossings published by
    /// the lifecycle manager map to no request.
    fn creation_request(
        kind: CriticalEventKind,
        position: Vec3,
        magnitude: f64,
        state: &BrainState,
    ) -> Option<CreationRequest> {
        let request = match kind {
            CriticalEventKind::ConsciousnessSurge => CreationRequest {
                object: BodyKind::ConsciousnessSurge,
                position,
                size: 40.0,
                lifetime_s: 180.0,
                magnitude,
            },
            CriticalEventKind::QuantumCoalescence => CreationRequest {
                object: BodyKind::QuantumCoalescence,
                position,
                size: 30.0,
                lifetime_s: 90.0,
                magnitude,
            },
            CriticalEventKind::DimensionalRift => CreationRequest {
                object: BodyKind::DimensionalRift,
                position,
                size: 50.0,
                lifetime_s: 120.0,
                magnitude,
            },
            CriticalEventKind::StellarNursery => CreationRequest {
                object: BodyKind::StellarNursery,
                position,
                size: (magnitude / 100.0).max(1.0),
                lifetime_s: 300.0,
                magnitude,
            },
            CriticalEventKind::ChaoticDestabilization => CreationRequest {
                object: BodyKind::ChaoticField {
                    chaos: state.mean_consciousness.max(0.5),
                },
                position,
                size: 100.0,
                lifetime_s: 60.0,
                magnitude,
            },
            CriticalEventKind::ParticleCritical => return None,
        };
        Some(request)
    }

    /// Energy-weighted centroid of the live particles; a bounded random
    /// point when none are alive.
    fn event_location(&mut self, dust: &SoulDustField) -> Vec3 {
        let mut weighted = Vec3::ZERO;
        let mut total = 0.0;
        for particle in dust.iter().filter(|p| p.alive) {
            weighted += particle.position * particle.energy;
            total += particle.energy;
        }
        if total > 0.0 {
            weighted * (1.0 / total)
        } else {
            Vec3::new(
                self.rng.gen_range(-FALLBACK_EXTENT..=FALLBACK_EXTENT),
                self.rng.gen_range(-FALLBACK_EXTENT..=FALLBACK_EXTENT),
                self.rng.gen_range(-FALLBACK_EXTENT..=FALLBACK_EXTENT),
            )
        }
    }
}
