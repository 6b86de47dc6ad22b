use crate::vector::Vec3;
use serde::{Deserialize, Serialize};

/// Position history retained for the path-action potential term.
pub const MAX_PATH_HISTORY: usize = 100;

/// One retained (position, time) sample of a body's path.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PathSample {
    pub position: Vec3,
    /// Seconds of simulation time.
    pub timestamp: f64,
}

/// Linear RGB color, components in 0.0..=1.0.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    #[must_use]
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

/// What a celestial body is, with its kind-specific generation properties.
///
/// The first four kinds come out of sector generation; the rest are spawned
/// by critical-event creation requests.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "kind")]
pub enum BodyKind {
    Star { temperature: f64, brightness: f64 },
    Planet { atmosphere: bool, rings: bool },
    Nebula { density: f64 },
    BlackHole { event_horizon: f64 },
    StellarNursery,
    ChaoticField { chaos: f64 },
    DimensionalRift,
    QuantumCoalescence,
    ConsciousnessSurge,
}

impl BodyKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            BodyKind::Star { .. } => "star",
            BodyKind::Planet { .. } => "planet",
            BodyKind::Nebula { .. } => "nebula",
            BodyKind::BlackHole { .. } => "black_hole",
            BodyKind::StellarNursery => "stellar_nursery",
            BodyKind::ChaoticField { .. } => "chaotic_field",
            BodyKind::DimensionalRift => "dimensional_rift",
            BodyKind::QuantumCoalescence => "quantum_coalescence",
            BodyKind::ConsciousnessSurge => "consciousness_surge",
        }
    }
}

/// A persistent massive body subject to the potential field.
///
/// Owned by the sector that generated it; the streaming manager is the only
/// component allowed to add or remove bodies from a sector's set.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CelestialBody {
    pub id: u64,
    pub kind: BodyKind,
    pub position: Vec3,
    pub velocity: Vec3,
    pub mass: f64,
    pub size: f64,
    pub color: Color,

    // Scalars feeding the potential model.
    pub consciousness_energy: f64,
    pub vibrational_frequency: f64,
    pub lyapunov_exponent: f64,

    /// Recent path, bounded to [`MAX_PATH_HISTORY`] samples.
    pub path_history: Vec<PathSample>,

    /// Total potential cached for the current tick only; recomputed every
    /// tick, never carried across ticks.
    #[serde(skip)]
    pub potential: f64,
}

impl CelestialBody {
    #[must_use]
    pub fn new(id: u64, kind: BodyKind, position: Vec3, mass: f64, size: f64) -> Self {
        Self {
            id,
            kind,
            position,
            velocity: Vec3::ZERO,
            mass,
            size,
            color: Color::default(),
            consciousness_energy: 0.0,
            vibrational_frequency: 0.0,
            lyapunov_exponent: 0.0,
            path_history: Vec::new(),
            potential: 0.0,
        }
    }

    /// Appends a path sample, dropping the oldest past the retention cap.
    pub fn record_path(&mut self, timestamp: f64) {
        self.path_history.push(PathSample {
            position: self.position,
            timestamp,
        });
        if self.path_history.len() > MAX_PATH_HISTORY {
            self.path_history.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_history_bounded() {
        let mut body = CelestialBody::new(
            1,
            BodyKind::Star {
                temperature: 5000.0,
                brightness: 1.0,
            },
            Vec3::ZERO,
            1.0,
            10.0,
        );
        for i in 0..(MAX_PATH_HISTORY + 25) {
            body.record_path(i as f64);
        }
        assert_eq!(body.path_history.len(), MAX_PATH_HISTORY);
        // Oldest samples dropped first.
        assert_eq!(body.path_history[0].timestamp, 25.0);
    }

    #[test]
    fn test_kind_names_stable() {
        assert_eq!(
            BodyKind::BlackHole { event_horizon: 5.0 }.name(),
            "black_hole"
        );
        assert_eq!(BodyKind::StellarNursery.name(), "stellar_nursery");
    }
}
