//! Configuration management for simulation parameters.
//!
//! Strongly-typed configuration structures that map to a `config.toml` file.
//! Every parameter has a hardcoded default, so the simulation is fully
//! functional with no configuration present.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! [world]
//! universe_bounds = 1000000.0
//! seed = 42
//!
//! [physics]
//! critical_energy_threshold = 1000.0
//!
//! [sector]
//! sector_size = 10000.0
//! load_distance = 50000.0
//! unload_distance = 100000.0
//! ```

use serde::{Deserialize, Serialize};

/// World-level parameters: bounds of the toroidal universe and the seed that
/// makes a run reproducible.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct WorldConfig {
    /// Positions wrap at +/- this bound on every axis.
    pub universe_bounds: f64,
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            universe_bounds: 1_000_000.0,
            seed: None,
        }
    }
}

/// Constants of the unified potential field.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Speed of light, m/s.
    pub c: f64,
    /// Gravitational constant.
    pub g: f64,
    /// Planck constant.
    pub h: f64,
    /// Cosmological constant for the chaotic term.
    pub lambda: f64,
    /// Fine-tuning constant keeping the baseline term bounded.
    pub alpha: f64,
    /// Spatial dimensionality D; gravity falls off as r^-(D-2).
    pub dimensionality: u32,
    /// Aggregate-energy threshold for critical events.
    pub critical_energy_threshold: f64,
    /// Field coupling for the baseline consciousness term.
    pub consciousness_field_strength: f64,
    /// Particles beyond this radius contribute nothing to the field term.
    pub influence_radius: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            c: 299_792_458.0,
            g: 6.674_30e-11,
            h: 6.626_070_15e-34,
            lambda: 1.1056e-52,
            alpha: 1e-106,
            dimensionality: 11,
            critical_energy_threshold: 1000.0,
            consciousness_field_strength: 0.1,
            influence_radius: 1000.0,
        }
    }
}

/// How the sensory stream drives and modulates the simulation.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AudioConfig {
    /// Global multiplier on audio influence, 0.0..=2.0.
    pub sensitivity: f64,
    /// Whether audio modulates the particle-field potential term.
    pub affect_field: bool,
    /// Particles spawned per second of simulation time while samples arrive.
    pub generation_rate: f64,
    /// Spawn sphere radius around the observer.
    pub spawn_radius: f64,
    /// Initial particle speed range.
    pub min_spawn_speed: f64,
    pub max_spawn_speed: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            affect_field: true,
            generation_rate: 10.0,
            spawn_radius: 50.0,
            min_spawn_speed: 10.0,
            max_spawn_speed: 50.0,
        }
    }
}

/// Lifecycle parameters of the transient particle population.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SoulDustConfig {
    /// Multiplicative energy decay per second.
    pub decay_rate: f64,
    /// Lifetime in seconds of simulation time.
    pub life_s: f64,
    /// Energy never decays below this fraction of initial energy.
    pub energy_floor_fraction: f64,
    /// Pairs closer than this merge into one particle.
    pub merge_distance: f64,
    /// Pairs closer than this may entangle.
    pub entanglement_range: f64,
}

impl Default for SoulDustConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.95,
            life_s: 15.0,
            energy_floor_fraction: 0.1,
            merge_distance: 10.0,
            entanglement_range: 50.0,
        }
    }
}

/// Sector streaming parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SectorConfig {
    /// Edge length of a cubic sector in world units.
    pub sector_size: f64,
    /// Sectors within this world distance of the observer are generated.
    pub load_distance: f64,
    /// Loaded sectors beyond this world distance are unloaded. Must be
    /// strictly greater than `load_distance` or sectors thrash every tick.
    pub unload_distance: f64,
    /// Generation work budget per tick.
    pub max_generated_per_tick: usize,
}

impl Default for SectorConfig {
    fn default() -> Self {
        Self {
            sector_size: 10_000.0,
            load_distance: 50_000.0,
            unload_distance: 100_000.0,
            max_generated_per_tick: 2,
        }
    }
}

/// Event bus parameters.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BusConfig {
    /// Ring-buffer capacity of the event history.
    pub history_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub soul_dust: SoulDustConfig,
    #[serde(default)]
    pub sector: SectorConfig,
    #[serde(default)]
    pub bus: BusConfig,
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// Returns `Ok(())` if all parameters are valid, or `Err` with a
    /// description of the first validation failure.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.world.universe_bounds > 0.0,
            "Universe bounds must be positive"
        );

        anyhow::ensure!(self.physics.c > 0.0, "Speed of light must be positive");
        anyhow::ensure!(self.physics.h > 0.0, "Planck constant must be positive");
        anyhow::ensure!(
            self.physics.dimensionality >= 3,
            "Dimensionality must be at least 3"
        );
        anyhow::ensure!(
            self.physics.critical_energy_threshold > 0.0,
            "Critical energy threshold must be positive"
        );
        anyhow::ensure!(
            self.physics.influence_radius > 0.0,
            "Influence radius must be positive"
        );

        anyhow::ensure!(
            (0.0..=2.0).contains(&self.audio.sensitivity),
            "Audio sensitivity must be in [0.0, 2.0]"
        );
        anyhow::ensure!(
            (1.0..=100.0).contains(&self.audio.generation_rate),
            "Generation rate must be in [1.0, 100.0] particles/second"
        );
        anyhow::ensure!(
            self.audio.spawn_radius > 0.0,
            "Spawn radius must be positive"
        );
        anyhow::ensure!(
            self.audio.min_spawn_speed <= self.audio.max_spawn_speed,
            "Min spawn speed must not exceed max spawn speed"
        );

        anyhow::ensure!(
            (0.0..=1.0).contains(&self.soul_dust.decay_rate),
            "Decay rate must be in [0.0, 1.0]"
        );
        anyhow::ensure!(self.soul_dust.life_s > 0.0, "Particle life must be positive");
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.soul_dust.energy_floor_fraction),
            "Energy floor fraction must be in [0.0, 1.0]"
        );
        anyhow::ensure!(
            self.soul_dust.merge_distance >= 0.0,
            "Merge distance must be non-negative"
        );
        anyhow::ensure!(
            self.soul_dust.entanglement_range > 0.0,
            "Entanglement range must be positive"
        );

        anyhow::ensure!(
            self.sector.sector_size > 0.0,
            "Sector size must be positive"
        );
        anyhow::ensure!(
            self.sector.load_distance > 0.0,
            "Load distance must be positive"
        );
        anyhow::ensure!(
            self.sector.unload_distance > self.sector.load_distance,
            "Unload distance must be strictly greater than load distance"
        );
        anyhow::ensure!(
            self.sector.max_generated_per_tick > 0,
            "Sector generation budget must be positive"
        );

        anyhow::ensure!(
            self.bus.history_capacity > 0,
            "Event history capacity must be positive"
        );

        Ok(())
    }

    /// Parses and validates configuration from TOML content.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Stable digest over the sections that change simulation behavior.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.world).as_bytes());
        hasher.update(format!("{:?}", self.physics).as_bytes());
        hasher.update(format!("{:?}", self.audio).as_bytes());
        hasher.update(format!("{:?}", self.soul_dust).as_bytes());
        hasher.update(format!("{:?}", self.sector).as_bytes());
        hex::encode(hasher.finalize())
    }
}
