//! # Cosmogenesis Core
//!
//! The simulation substrate for cosmogenesis - a real-time procedural
//! universe driven by a scalar potential field and an audio-derived particle
//! population.
//!
//! This crate contains the deterministic simulation logic, including:
//! - Typed publish/subscribe event routing with bounded history
//! - The six-term unified potential field and Euler motion integration
//! - The transient "soul dust" particle lifecycle (spawn, decay, merge,
//!   entanglement)
//! - Spatial sector streaming around an observer position
//! - Threshold-based critical-event detection feeding content generation
//! - Metrics collection and structured logging
//!
//! ## Architecture
//!
//! Every subsystem is an explicitly constructed component owned by the
//! simulation driver; there is no ambient global state. All per-tick work is
//! synchronous, and shared populations are mutated only by their owning
//! manager. Seeded ChaCha8 RNGs make every run reproducible.

/// Typed event bus with bounded history
pub mod bus;
/// Configuration management for simulation parameters
pub mod config;
/// Typed failure taxonomy for fallible core operations
pub mod error;
/// Metrics collection and logging
pub mod metrics;
/// The unified potential field model and motion integration
pub mod potential;
/// Critical-event detection over aggregate particle statistics
pub mod quantum_events;
/// Spatial sector streaming and procedural content
pub mod sector;
/// Sensory sample intake, rate limiting, and field modulation
pub mod sensory;
/// Transient particle lifecycle management
pub mod souldust;

pub use bus::{EventBus, SubscriptionId};
pub use config::AppConfig;
pub use error::CoreError;
pub use metrics::{init_logging, Metrics};
pub use potential::{Modulation, PotentialBreakdown, UnifiedField};
pub use quantum_events::QuantumEventDetector;
pub use sector::{Sector, SectorCoord, SectorGrid, SectorState};
pub use sensory::{FrequencySweep, SampleSource, SensoryIntake};
pub use souldust::{BrainState, Particle, QuantumState, SoulDustField};
