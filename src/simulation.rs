//! The simulation driver: owns every subsystem and runs the fixed per-tick
//! ordering.
//!
//! Tick order: sensory intake, particle spawning, body motion, particle
//! update (decay, motion, entanglement), merge pass, critical-event
//! detection, placement of requested content, end-of-tick sweep, sector
//! streaming. All of it is synchronous; one call to [`Simulation::tick`]
//! is one frame.

use anyhow::{Context, Result};
use cosmogenesis_core::quantum_events::QuantumEventDetector;
use cosmogenesis_core::sensory::{SampleSource, SensoryIntake};
use cosmogenesis_core::souldust::BrainState;
use cosmogenesis_core::{
    AppConfig, EventBus, Metrics, SectorGrid, SoulDustField, UnifiedField,
};
use cosmogenesis_data::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

pub struct Simulation {
    config: AppConfig,
    bus: EventBus,
    field: UnifiedField,
    dust: SoulDustField,
    intake: SensoryIntake,
    detector: QuantumEventDetector,
    sectors: SectorGrid,
    metrics: Metrics,
    rng: ChaCha8Rng,
    observer: Vec3,
    tick: u64,
    now: f64,
}

impl Simulation {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let seed = config.world.seed.unwrap_or_else(rand::random);
        tracing::info!(
            seed,
            fingerprint = %config.fingerprint(),
            "simulation configured"
        );

        Ok(Self {
            bus: EventBus::new(config.bus.history_capacity),
            field: UnifiedField::from_config(&config.physics),
            dust: SoulDustField::new(config.clone()),
            intake: SensoryIntake::new(config.audio.clone()),
            detector: QuantumEventDetector::new(config.physics.critical_energy_threshold, seed),
            sectors: SectorGrid::new(config.sector.clone(), seed),
            metrics: Metrics::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            observer: Vec3::ZERO,
            tick: 0,
            now: 0.0,
            config,
        })
    }

    /// Advances the whole simulation by `dt` seconds, drawing sensory input
    /// from `source`. A malformed sample is dropped and logged; it never
    /// halts the loop.
    pub fn tick(&mut self, dt: f64, source: &mut dyn SampleSource) {
        let start = Instant::now();
        self.now += dt;
        let tick = self.tick;
        let bounds = self.config.world.universe_bounds;

        for sample in self.intake.collect(dt, self.now, source) {
            if let Err(err) = self.dust.spawn(
                &sample,
                self.observer,
                self.now,
                tick,
                &mut self.rng,
                &self.bus,
            ) {
                tracing::warn!(error = %err, "dropped malformed sensory sample");
            }
        }
        let modulation = self.intake.modulation();

        let dust_snapshots = self.dust.snapshots();
        self.sectors
            .step_bodies(dt, self.now, &self.field, &dust_snapshots, &modulation, bounds);

        let body_snapshots = self.sectors.body_snapshots();
        self.dust.update(
            dt,
            self.now,
            tick,
            &self.field,
            &body_snapshots,
            &modulation,
            bounds,
            &self.bus,
        );
        self.dust.merge_pass(self.now, tick, &self.bus);

        let requests = self.detector.check(&self.dust, tick, &self.bus);
        for request in &requests {
            self.metrics.record_critical_event();
            self.sectors.place_object(request, tick);
        }

        self.dust.sweep();
        self.sectors.update(self.observer, tick, &self.bus);

        self.metrics.record_tick(
            start.elapsed(),
            self.dust.len(),
            self.sectors.bodies().count(),
            self.sectors.loaded_count(),
        );
        self.tick += 1;
    }

    /// Observer position for sector streaming, supplied by the camera or
    /// controls collaborator.
    pub fn set_observer(&mut self, position: Vec3) {
        self.observer = position;
    }

    #[must_use]
    pub fn observer(&self) -> Vec3 {
        self.observer
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn elapsed_sim_time(&self) -> f64 {
        self.now
    }

    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub fn dust(&self) -> &SoulDustField {
        &self.dust
    }

    #[must_use]
    pub fn sectors(&self) -> &SectorGrid {
        &self.sectors
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn brain_state(&self) -> BrainState {
        self.detector.brain_state()
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmogenesis_core::sensory::FrequencySweep;
    use cosmogenesis_data::Topic;

    fn seeded_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.world.seed = Some(99);
        config
    }

    #[test]
    fn test_ticks_advance_time_and_count() {
        let mut sim = Simulation::new(seeded_config()).unwrap();
        let mut source = FrequencySweep::default();
        for _ in 0..5 {
            sim.tick(1.0 / 60.0, &mut source);
        }
        assert_eq!(sim.tick_count(), 5);
        assert!((sim.elapsed_sim_time() - 5.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_sensory_feed_creates_particles() {
        let mut sim = Simulation::new(seeded_config()).unwrap();
        let mut source = FrequencySweep::default();
        for _ in 0..60 {
            sim.tick(1.0 / 60.0, &mut source);
        }
        // One second at the default 10 samples/s.
        assert!(!sim.dust().is_empty());
        assert!(!sim
            .bus()
            .history(Some(Topic::ParticleCreated), 100)
            .is_empty());
    }

    #[test]
    fn test_sectors_stream_around_observer() {
        let mut sim = Simulation::new(seeded_config()).unwrap();
        let mut source = FrequencySweep::default();
        for _ in 0..10 {
            sim.tick(1.0 / 60.0, &mut source);
        }
        // Generation budget is 2/tick.
        assert_eq!(sim.sectors().loaded_count(), 20);
    }
}
