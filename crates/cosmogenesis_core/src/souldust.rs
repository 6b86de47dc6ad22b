//! The transient particle population ("soul dust"): audio-derived quanta
//! with a bounded lifecycle of spawn, decay, entanglement, merge, and death.
//!
//! The manager owns the particles in a dense arena with monotonic u64 ids -
//! ids are never reused, and dead particles are removed only by the
//! end-of-tick sweep so no collection is mutated mid-iteration.

use crate::bus::EventBus;
use crate::config::AppConfig;
use crate::error::CoreError;
use crate::potential::{BodySnapshot, DustSnapshot, FieldSubject, Modulation, UnifiedField};
use cosmogenesis_data::{Color, PathSample, Payload, SensorySample, Vec3};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

/// Particle path retention, separate from the longer body history.
const MAX_PARTICLE_HISTORY: usize = 50;

const TWO_PI: f64 = std::f64::consts::TAU;

/// Discrete quantum-state tag derived from energy thresholds each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantumState {
    Ground,
    Superposition,
    Excited,
}

/// Aggregate statistics over the live population, recomputed per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrainState {
    pub total_energy: f64,
    pub mean_consciousness: f64,
    /// Directed link count: each entangled pair contributes twice.
    pub entanglement_links: usize,
    pub particle_count: usize,
    pub is_active: bool,
}

/// One transient quantum. Source attributes are fixed at creation; energy,
/// visuals, and the quantum-state tag are recomputed every tick.
#[derive(Debug, Clone)]
pub struct Particle {
    pub id: u64,
    pub position: Vec3,
    pub velocity: Vec3,
    pub created_at: f64,
    pub source: SensorySample,

    pub initial_energy: f64,
    pub max_energy: f64,
    pub energy: f64,

    pub consciousness_factor: f64,
    pub color: Color,
    pub size: f64,
    pub brightness: f64,

    pub age: f64,
    pub life_s: f64,
    pub alive: bool,

    pub quantum_state: QuantumState,
    pub phase: f64,
    pub entangled: BTreeSet<u64>,
    pub path_history: Vec<PathSample>,

    /// Total potential cached for the current tick only.
    pub potential: f64,
}

fn remap(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    out_min + (value - in_min) / (in_max - in_min) * (out_max - out_min)
}

/// Maps an audible frequency onto the visible spectrum and converts the
/// resulting wavelength to gamma-corrected RGB. The audible band is mapped
/// logarithmically onto 380-780 nm.
#[must_use]
pub fn frequency_to_rgb(frequency_hz: f64) -> Color {
    let clamped = frequency_hz.clamp(20.0, 20_000.0);
    let t = (clamped / 20.0).log2() / (20_000.0f64 / 20.0).log2();
    let wavelength = 380.0 + t * 400.0;

    let (r, g, b) = if wavelength < 440.0 {
        (-(wavelength - 440.0) / 60.0, 0.0, 1.0)
    } else if wavelength < 490.0 {
        (0.0, (wavelength - 440.0) / 50.0, 1.0)
    } else if wavelength < 510.0 {
        (0.0, 1.0, -(wavelength - 510.0) / 20.0)
    } else if wavelength < 580.0 {
        ((wavelength - 510.0) / 70.0, 1.0, 0.0)
    } else if wavelength < 645.0 {
        (1.0, -(wavelength - 645.0) / 65.0, 0.0)
    } else {
        (1.0, 0.0, 0.0)
    };

    let gamma = 0.8;
    Color::new(r.powf(gamma), g.powf(gamma), b.powf(gamma))
}

impl Particle {
    /// Derives a particle from a sensory sample. Fails fast on malformed
    /// input instead of producing an inert particle.
    pub fn from_sample(
        id: u64,
        sample: SensorySample,
        position: Vec3,
        velocity: Vec3,
        phase: f64,
        now: f64,
        life_s: f64,
        planck: f64,
    ) -> Result<Self, CoreError> {
        if !sample.is_finite() {
            let field = if !sample.frequency_hz.is_finite() {
                "frequency"
            } else if !sample.amplitude.is_finite() {
                "amplitude"
            } else if !sample.spectral_complexity.is_finite() {
                "spectral_complexity"
            } else {
                "timestamp"
            };
            return Err(CoreError::NonFiniteSample { field });
        }

        let consciousness_factor = Self::consciousness_factor_of(&sample);
        let initial_energy = planck
            * sample.frequency_hz
            * sample.amplitude
            * sample.amplitude
            * (1.0 + 0.5 * sample.spectral_complexity)
            * consciousness_factor;
        if !initial_energy.is_finite() {
            return Err(CoreError::DegenerateSpawn {
                frequency_hz: sample.frequency_hz,
                amplitude: sample.amplitude,
            });
        }

        let max_energy = initial_energy * 2.0;
        let mut particle = Self {
            id,
            position,
            velocity,
            created_at: now,
            source: sample,
            initial_energy,
            max_energy,
            energy: initial_energy,
            consciousness_factor,
            color: frequency_to_rgb(sample.frequency_hz),
            size: 0.0,
            brightness: 0.0,
            age: 0.0,
            life_s,
            alive: true,
            quantum_state: QuantumState::Superposition,
            phase,
            entangled: BTreeSet::new(),
            path_history: vec![PathSample {
                position,
                timestamp: now,
            }],
            potential: 0.0,
        };
        particle.refresh_visuals();
        Ok(particle)
    }

    fn consciousness_factor_of(sample: &SensorySample) -> f64 {
        let frequency_factor = remap(sample.frequency_hz, 20.0, 20_000.0, 0.1, 0.9);
        let complexity_factor = sample.spectral_complexity.clamp(0.0, 1.0);
        ((frequency_factor + complexity_factor) * 0.5).min(1.0)
    }

    /// Mass from mass-energy equivalence.
    #[must_use]
    pub fn mass(&self, c: f64) -> f64 {
        self.energy / (c * c)
    }

    #[must_use]
    pub fn field_subject(&self, field_strength: f64, c: f64) -> FieldSubject<'_> {
        FieldSubject {
            body_id: None,
            position: self.position,
            mass: self.mass(c),
            consciousness_energy: self.energy * self.consciousness_factor,
            field_coupling: field_strength * self.consciousness_factor,
            vibrational_frequency: self.source.frequency_hz,
            lyapunov_exponent: (self.source.spectral_complexity
                + self.source.frequency_fraction())
                * 0.5,
            path_history: &self.path_history,
        }
    }

    fn refresh_visuals(&mut self) {
        self.brightness = if self.max_energy > 0.0 {
            remap(self.energy, 0.0, self.max_energy, 0.1, 1.0)
        } else {
            0.1
        };
        self.size = 2.0 * remap(self.source.amplitude, 0.0, 1.0, 0.5, 2.0);
    }

    fn refresh_quantum_state(&mut self) {
        self.quantum_state = if self.energy > self.max_energy * 0.8 {
            QuantumState::Excited
        } else if self.energy < self.initial_energy * 0.3 {
            QuantumState::Ground
        } else {
            QuantumState::Superposition
        };
    }

    fn record_path(&mut self, now: f64) {
        self.path_history.push(PathSample {
            position: self.position,
            timestamp: now,
        });
        if self.path_history.len() > MAX_PARTICLE_HISTORY {
            self.path_history.remove(0);
        }
    }
}

/// Owner of the transient particle arena.
pub struct SoulDustField {
    particles: Vec<Particle>,
    next_id: u64,
    config: AppConfig,
}

impl SoulDustField {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            particles: Vec::new(),
            next_id: 0,
            config,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Particle> {
        self.particles.iter().find(|p| p.id == id)
    }

    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Read-only per-tick captures for the potential field.
    #[must_use]
    pub fn snapshots(&self) -> Vec<DustSnapshot> {
        self.particles
            .iter()
            .filter(|p| p.alive)
            .map(|p| DustSnapshot {
                position: p.position,
                energy: p.energy,
                consciousness_factor: p.consciousness_factor,
            })
            .collect()
    }

    /// Spawns one particle from a sensory sample in a sphere around the
    /// observer, publishing its creation event.
    pub fn spawn(
        &mut self,
        sample: &SensorySample,
        observer: Vec3,
        now: f64,
        tick: u64,
        rng: &mut ChaCha8Rng,
        bus: &EventBus,
    ) -> Result<u64, CoreError> {
        let audio = &self.config.audio;
        let position = observer + random_point_in_sphere(rng, audio.spawn_radius);
        let speed = rng.gen_range(audio.min_spawn_speed..=audio.max_spawn_speed);
        let velocity = random_point_on_sphere(rng) * speed;
        let phase = rng.gen_range(0.0..TWO_PI);

        let id = self.next_id;
        let particle = Particle::from_sample(
            id,
            *sample,
            position,
            velocity,
            phase,
            now,
            self.config.soul_dust.life_s,
            self.config.physics.h,
        )?;
        self.next_id += 1;

        bus.publish(Payload::ParticleCreated {
            id,
            position: particle.position,
            frequency_hz: particle.source.frequency_hz,
            amplitude: particle.source.amplitude,
            energy: particle.initial_energy,
            tick,
        });
        self.particles.push(particle);
        Ok(id)
    }

    /// Per-tick update of every live particle: aging, decay, motion through
    /// the unified field, derived attributes, entanglement, and the critical
    /// predicate. Death is terminal for the tick; removal happens in
    /// [`Self::sweep`].
    pub fn update(
        &mut self,
        dt: f64,
        now: f64,
        tick: u64,
        field: &UnifiedField,
        bodies: &[BodySnapshot],
        modulation: &Modulation,
        bounds: f64,
        bus: &EventBus,
    ) {
        let dust = self.snapshots();
        let decay_factor = self.config.soul_dust.decay_rate.powf(dt);
        let floor_fraction = self.config.soul_dust.energy_floor_fraction;
        let field_strength = self.config.physics.consciousness_field_strength;
        let c = self.config.physics.c;

        for i in 0..self.particles.len() {
            if !self.particles[i].alive {
                continue;
            }

            self.particles[i].age += dt;
            if self.particles[i].age >= self.particles[i].life_s {
                self.kill(i, tick, bus);
                continue;
            }

            {
                let particle = &mut self.particles[i];
                particle.energy =
                    (particle.energy * decay_factor).max(particle.initial_energy * floor_fraction);
            }

            let (breakdown, force, mass) = {
                let particle = &self.particles[i];
                let subject = particle.field_subject(field_strength, c);
                (
                    field.evaluate(&subject, bodies, &dust, modulation),
                    field.force(&subject, bodies, &dust, modulation),
                    subject.mass,
                )
            };

            let particle = &mut self.particles[i];
            particle.potential = breakdown.total;
            UnifiedField::integrate(
                &mut particle.position,
                &mut particle.velocity,
                force,
                mass,
                dt,
            );
            UnifiedField::wrap(&mut particle.position, bounds);

            particle.refresh_visuals();
            particle.phase = (particle.phase + particle.source.frequency_hz * dt) % TWO_PI;
            particle.refresh_quantum_state();
            particle.record_path(now);

            if field.critical(particle.potential) {
                bus.publish(Payload::CriticalEventTriggered {
                    kind: cosmogenesis_data::CriticalEventKind::ParticleCritical,
                    location: particle.position,
                    magnitude: particle.energy,
                    tick,
                });
            }
        }

        self.entanglement_pass(tick, bus);
    }

    fn entanglement_pass(&mut self, tick: u64, bus: &EventBus) {
        let range = self.config.soul_dust.entanglement_range;
        let live: Vec<(usize, u64, Vec3)> = self
            .particles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.alive)
            .map(|(i, p)| (i, p.id, p.position))
            .collect();

        for a in 0..live.len() {
            for b in (a + 1)..live.len() {
                let (ai, a_id, a_pos) = live[a];
                let (bi, b_id, b_pos) = live[b];
                let distance = a_pos.distance(&b_pos);
                if distance > range {
                    continue;
                }
                let strength = 1.0 - distance / range;
                if strength <= 0.5 || self.particles[ai].entangled.contains(&b_id) {
                    continue;
                }
                self.particles[ai].entangled.insert(b_id);
                self.particles[bi].entangled.insert(a_id);
                bus.publish(Payload::EntanglementFormed {
                    first: a_id,
                    second: b_id,
                    strength,
                    distance,
                    tick,
                });
            }
        }
    }

    /// Merges every unordered pair of live particles within the merge
    /// distance; each pair is handled at most once per tick and a particle
    /// never merges with itself. The merged particle carries the summed
    /// energy, max amplitude/complexity, averaged frequency and position.
    pub fn merge_pass(&mut self, now: f64, tick: u64, bus: &EventBus) {
        let merge_distance = self.config.soul_dust.merge_distance;
        let mut born: Vec<Particle> = Vec::new();

        for a in 0..self.particles.len() {
            if !self.particles[a].alive {
                continue;
            }
            for b in (a + 1)..self.particles.len() {
                if !self.particles[a].alive || !self.particles[b].alive {
                    continue;
                }
                let distance = self.particles[a]
                    .position
                    .distance(&self.particles[b].position);
                if distance >= merge_distance {
                    continue;
                }

                match self.merge_pair(a, b, now) {
                    Ok(merged) => {
                        self.kill(a, tick, bus);
                        self.kill(b, tick, bus);
                        bus.publish(Payload::ParticleCreated {
                            id: merged.id,
                            position: merged.position,
                            frequency_hz: merged.source.frequency_hz,
                            amplitude: merged.source.amplitude,
                            energy: merged.energy,
                            tick,
                        });
                        born.push(merged);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "merge produced invalid particle");
                    }
                }
            }
        }

        self.particles.extend(born);
    }

    fn merge_pair(&mut self, a: usize, b: usize, now: f64) -> Result<Particle, CoreError> {
        let (first, second) = (&self.particles[a], &self.particles[b]);
        let sample = SensorySample::clamped(
            (first.source.frequency_hz + second.source.frequency_hz) / 2.0,
            first.source.amplitude.max(second.source.amplitude),
            first
                .source
                .spectral_complexity
                .max(second.source.spectral_complexity),
            now,
        );
        let position = (first.position + second.position) * 0.5;
        let velocity = (first.velocity + second.velocity) * 0.5;
        let phase = (first.phase + second.phase) % TWO_PI;
        let combined_energy = first.energy + second.energy;
        let combined_max = first.max_energy + second.max_energy;

        let id = self.next_id;
        let mut merged = Particle::from_sample(
            id,
            sample,
            position,
            velocity,
            phase,
            now,
            self.config.soul_dust.life_s,
            self.config.physics.h,
        )?;
        self.next_id += 1;

        merged.energy = combined_energy;
        merged.initial_energy = combined_energy;
        merged.max_energy = combined_max;
        merged.refresh_visuals();
        Ok(merged)
    }

    /// Transfers 10% of the source's energy to the target, conserving the
    /// total: only what fits under the target's energy cap leaves the source.
    pub fn absorb_energy(&mut self, target: u64, source: u64) -> Result<(), CoreError> {
        let source_idx = self
            .particles
            .iter()
            .position(|p| p.id == source && p.alive)
            .ok_or(CoreError::UnknownParticle(source))?;
        let target_idx = self
            .particles
            .iter()
            .position(|p| p.id == target && p.alive)
            .ok_or(CoreError::UnknownParticle(target))?;

        let offered = self.particles[source_idx].energy * 0.1;
        let headroom =
            self.particles[target_idx].max_energy - self.particles[target_idx].energy;
        let transferred = offered.min(headroom).max(0.0);

        let source_factor = self.particles[source_idx].consciousness_factor;
        self.particles[source_idx].energy -= transferred;
        let target_particle = &mut self.particles[target_idx];
        target_particle.energy += transferred;
        target_particle.consciousness_factor =
            target_particle.consciousness_factor.max(source_factor);
        Ok(())
    }

    fn kill(&mut self, index: usize, tick: u64, bus: &EventBus) {
        let particle = &mut self.particles[index];
        if !particle.alive {
            return;
        }
        particle.alive = false;
        bus.publish(Payload::ParticleDied {
            id: particle.id,
            final_energy: particle.energy,
            age: particle.age,
            position: particle.position,
            tick,
        });
    }

    /// End-of-tick removal of dead particles, plus pruning of entanglement
    /// links that point at the removed ids so the link population stays
    /// bounded by the live population.
    pub fn sweep(&mut self) {
        let dead: BTreeSet<u64> = self
            .particles
            .iter()
            .filter(|p| !p.alive)
            .map(|p| p.id)
            .collect();
        if dead.is_empty() {
            return;
        }
        self.particles.retain(|p| p.alive);
        for particle in &mut self.particles {
            particle.entangled.retain(|id| !dead.contains(id));
        }
    }

    /// Aggregate statistics over the live population.
    #[must_use]
    pub fn brain_state(&self, critical_threshold: f64) -> BrainState {
        let mut state = BrainState::default();
        let mut consciousness_sum = 0.0;
        for particle in self.particles.iter().filter(|p| p.alive) {
            state.total_energy += particle.energy;
            consciousness_sum += particle.consciousness_factor;
            state.entanglement_links += particle.entangled.len();
            state.particle_count += 1;
        }
        if state.particle_count > 0 {
            state.mean_consciousness = consciousness_sum / state.particle_count as f64;
        }
        state.is_active = state.total_energy > critical_threshold * 0.1;
        state
    }
}

fn random_point_on_sphere(rng: &mut ChaCha8Rng) -> Vec3 {
    let theta = rng.gen_range(0.0..TWO_PI);
    let phi = (rng.gen_range(-1.0f64..=1.0)).acos();
    Vec3::new(
        phi.sin() * theta.cos(),
        phi.sin() * theta.sin(),
        phi.cos(),
    )
}

fn random_point_in_sphere(rng: &mut ChaCha8Rng, radius: f64) -> Vec3 {
    let r = rng.gen_range(0.0f64..=1.0).cbrt() * radius;
    random_point_on_sphere(rng) * r
}
