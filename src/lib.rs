//! # Cosmogenesis
//!
//! A real-time procedural universe simulator. Sound becomes matter: sensory
//! samples spawn transient "soul dust" particles whose energy feeds a
//! six-term unified potential field, threshold crossings over the particle
//! population synthesize new celestial content, and cubic world sectors
//! stream in and out around the observer.
//!
//! The heavy lifting lives in `cosmogenesis_core` (subsystems) and
//! `cosmogenesis_data` (shared types); this crate wires them into a
//! [`simulation::Simulation`] driver and the headless binary.

pub mod simulation;

pub use cosmogenesis_core as core;
pub use cosmogenesis_data as data;
pub use simulation::Simulation;
