//! Shared data types for the cosmogenesis simulation substrate.
//!
//! This crate holds the plain serializable types that flow between the
//! simulation subsystems: 3D vectors, sensory samples, celestial bodies and
//! their generation parameters, and the typed event payloads carried by the
//! event bus. It contains no simulation logic beyond small constructors and
//! derivations.

pub mod celestial;
pub mod events;
pub mod sample;
pub mod vector;

pub use celestial::{BodyKind, CelestialBody, Color, PathSample};
pub use events::{CreationRequest, CriticalEvent, CriticalEventKind, Payload, Topic};
pub use sample::{SensorySample, MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ};
pub use vector::Vec3;
