//! The unified potential field: a six-term scalar potential and its force,
//! evaluated per entity against the massive bodies and the live particle
//! population.
//!
//! Terms, summed independently:
//! 1. baseline: `c^2 * coupling * consciousness_energy * alpha`
//! 2. chaotic: `lambda * exp(lyapunov_exponent)`
//! 3. path action: discrete Lagrangian action over retained path history
//! 4. synaptic: `vibrational_frequency * consciousness_energy`
//! 5. gravitational: inverse power law `r^-(D-2)` over all other bodies
//! 6. particle field: `energy * consciousness_factor / (d^2 + 1)` within the
//!    influence radius, optionally modulated by the live sensory analysis
//!
//! Numeric policy: zero-distance pairs are skipped everywhere, and every term
//! is finite-checked before summing - a non-finite term is zeroed and logged,
//! never propagated.

use crate::config::PhysicsConfig;
use cosmogenesis_data::{CelestialBody, PathSample, Vec3};

const FALL_ACCELERATION: f64 = 9.81;

/// Read-only capture of a massive body for pairwise terms, taken once per
/// tick before any body is mutated.
#[derive(Debug, Clone, Copy)]
pub struct BodySnapshot {
    pub id: u64,
    pub position: Vec3,
    pub mass: f64,
}

impl BodySnapshot {
    #[must_use]
    pub fn of(body: &CelestialBody) -> Self {
        Self {
            id: body.id,
            position: body.position,
            mass: body.mass,
        }
    }
}

/// Read-only capture of a live particle for the field term.
#[derive(Debug, Clone, Copy)]
pub struct DustSnapshot {
    pub position: Vec3,
    pub energy: f64,
    pub consciousness_factor: f64,
}

/// The entity a potential is being evaluated for.
#[derive(Debug, Clone, Copy)]
pub struct FieldSubject<'a> {
    /// Body id to exclude from pairwise sums; `None` for particles, which
    /// are not in the body set.
    pub body_id: Option<u64>,
    pub position: Vec3,
    pub mass: f64,
    pub consciousness_energy: f64,
    /// Field coupling for the baseline term: the configured field strength,
    /// scaled by consciousness factor for particles.
    pub field_coupling: f64,
    pub vibrational_frequency: f64,
    pub lyapunov_exponent: f64,
    pub path_history: &'a [PathSample],
}

impl<'a> FieldSubject<'a> {
    #[must_use]
    pub fn of_body(body: &'a CelestialBody, field_strength: f64) -> Self {
        Self {
            body_id: Some(body.id),
            position: body.position,
            mass: body.mass,
            consciousness_energy: body.consciousness_energy,
            field_coupling: field_strength,
            vibrational_frequency: body.vibrational_frequency,
            lyapunov_exponent: body.lyapunov_exponent,
            path_history: &body.path_history,
        }
    }
}

/// Live sensory analysis applied multiplicatively to the particle-field term.
#[derive(Debug, Clone, Copy)]
pub struct Modulation {
    pub amplitude: f64,
    pub complexity: f64,
    pub sensitivity: f64,
    pub enabled: bool,
}

impl Modulation {
    #[must_use]
    pub fn none() -> Self {
        Self {
            amplitude: 0.0,
            complexity: 0.0,
            sensitivity: 1.0,
            enabled: false,
        }
    }

    #[must_use]
    pub fn potential_factor(&self) -> f64 {
        if !self.enabled {
            return 1.0;
        }
        (1.0 + self.amplitude * 0.5 * self.sensitivity)
            * (1.0 + self.complexity * 0.25 * self.sensitivity)
    }

    #[must_use]
    pub fn force_factor(&self) -> f64 {
        if !self.enabled {
            return 1.0;
        }
        1.0 + self.amplitude * 0.5 * self.sensitivity
    }
}

/// Per-term breakdown of one evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PotentialBreakdown {
    pub baseline: f64,
    pub chaotic: f64,
    pub path_action: f64,
    pub synaptic: f64,
    pub gravitational: f64,
    pub soul_dust: f64,
    pub total: f64,
}

impl PotentialBreakdown {
    /// Share of each term in the total, as percentages. Empty-total gives
    /// all zeros.
    #[must_use]
    pub fn distribution(&self) -> [f64; 6] {
        if self.total == 0.0 {
            return [0.0; 6];
        }
        [
            self.baseline,
            self.chaotic,
            self.path_action,
            self.synaptic,
            self.gravitational,
            self.soul_dust,
        ]
        .map(|term| term / self.total * 100.0)
    }
}

fn finite_or_zero(value: f64, term: &'static str) -> f64 {
    if value.is_finite() {
        value
    } else {
        tracing::warn!(term, value, "non-finite potential term zeroed");
        0.0
    }
}

/// The field model itself: constants plus the evaluation routines.
#[derive(Debug, Clone)]
pub struct UnifiedField {
    c: f64,
    g: f64,
    lambda: f64,
    alpha: f64,
    /// D-2: exponent of the gravitational potential falloff.
    potential_exponent: i32,
    critical_threshold: f64,
    influence_radius: f64,
    field_strength: f64,
}

impl UnifiedField {
    #[must_use]
    pub fn from_config(physics: &PhysicsConfig) -> Self {
        Self {
            c: physics.c,
            g: physics.g,
            lambda: physics.lambda,
            alpha: physics.alpha,
            potential_exponent: physics.dimensionality as i32 - 2,
            critical_threshold: physics.critical_energy_threshold,
            influence_radius: physics.influence_radius,
            field_strength: physics.consciousness_field_strength,
        }
    }

    /// The configured baseline coupling, applied uniformly to bodies and
    /// scaled by consciousness factor for particles.
    #[must_use]
    pub fn field_strength(&self) -> f64 {
        self.field_strength
    }

    /// Whether a total potential crosses the critical-event threshold.
    #[must_use]
    pub fn critical(&self, total_potential: f64) -> bool {
        total_potential >= self.critical_threshold
    }

    /// Computes the six-term scalar potential for one subject.
    #[must_use]
    pub fn evaluate(
        &self,
        subject: &FieldSubject,
        bodies: &[BodySnapshot],
        dust: &[DustSnapshot],
        modulation: &Modulation,
    ) -> PotentialBreakdown {
        let baseline = finite_or_zero(
            self.c * self.c * subject.field_coupling * subject.consciousness_energy * self.alpha,
            "baseline",
        );
        let chaotic = finite_or_zero(self.lambda * subject.lyapunov_exponent.exp(), "chaotic");
        let path_action = finite_or_zero(
            self.path_action(subject.mass, subject.path_history),
            "path_action",
        );
        let synaptic = finite_or_zero(
            subject.vibrational_frequency * subject.consciousness_energy,
            "synaptic",
        );
        let gravitational =
            finite_or_zero(self.gravitational_potential(subject, bodies), "gravitational");
        let soul_dust = finite_or_zero(
            self.dust_potential(subject.position, dust) * modulation.potential_factor(),
            "soul_dust",
        );

        let total = baseline + chaotic + path_action + synaptic + gravitational + soul_dust;
        PotentialBreakdown {
            baseline,
            chaotic,
            path_action,
            synaptic,
            gravitational,
            soul_dust,
            total,
        }
    }

    /// Force on the subject: symmetric gravitational pull one exponent above
    /// the potential falloff, plus the directional particle-field pull.
    #[must_use]
    pub fn force(
        &self,
        subject: &FieldSubject,
        bodies: &[BodySnapshot],
        dust: &[DustSnapshot],
        modulation: &Modulation,
    ) -> Vec3 {
        let mut force = Vec3::ZERO;
        let force_exponent = self.potential_exponent + 1;

        for body in bodies {
            if subject.body_id == Some(body.id) {
                continue;
            }
            let offset = body.position - subject.position;
            let distance = offset.length();
            if distance == 0.0 {
                continue;
            }
            let magnitude =
                self.g * subject.mass * body.mass / distance.powi(force_exponent);
            if !magnitude.is_finite() {
                tracing::warn!(body = body.id, "non-finite gravitational force skipped");
                continue;
            }
            force += offset * (magnitude / distance);
        }

        let dust_factor = modulation.force_factor();
        for grain in dust {
            let offset = grain.position - subject.position;
            let distance = offset.length();
            if distance == 0.0 || distance > self.influence_radius {
                continue;
            }
            let magnitude = grain.energy * grain.consciousness_factor
                / (distance * distance + 1.0)
                * dust_factor;
            if !magnitude.is_finite() {
                continue;
            }
            force += offset * (magnitude / distance);
        }

        force
    }

    fn gravitational_potential(&self, subject: &FieldSubject, bodies: &[BodySnapshot]) -> f64 {
        let mut potential = 0.0;
        for body in bodies {
            if subject.body_id == Some(body.id) {
                continue;
            }
            let distance = subject.position.distance(&body.position);
            if distance == 0.0 {
                continue;
            }
            potential -=
                self.g * subject.mass * body.mass / distance.powi(self.potential_exponent);
        }
        potential
    }

    fn dust_potential(&self, position: Vec3, dust: &[DustSnapshot]) -> f64 {
        let mut potential = 0.0;
        for grain in dust {
            let distance = position.distance(&grain.position);
            if distance == 0.0 || distance > self.influence_radius {
                continue;
            }
            potential += grain.energy * grain.consciousness_factor / (distance * distance + 1.0);
        }
        potential
    }

    /// Discrete Lagrangian action over the retained path: for each
    /// consecutive sample pair, `(T - V) * dt` with `T = m v^2 / 2` and
    /// `V = m g y`. Zero with fewer than two samples.
    fn path_action(&self, mass: f64, history: &[PathSample]) -> f64 {
        let mut action = 0.0;
        for pair in history.windows(2) {
            let dt = pair[1].timestamp - pair[0].timestamp;
            if dt <= 0.0 {
                continue;
            }
            let speed = pair[0].position.distance(&pair[1].position) / dt;
            let kinetic = 0.5 * mass * speed * speed;
            let potential = mass * FALL_ACCELERATION * pair[1].position.y;
            action += (kinetic - potential) * dt;
        }
        action
    }

    /// Explicit Euler step: `v += F/m * dt; p += v * dt`. A zero mass leaves
    /// the velocity untouched rather than dividing by zero.
    pub fn integrate(position: &mut Vec3, velocity: &mut Vec3, force: Vec3, mass: f64, dt: f64) {
        if mass != 0.0 {
            *velocity += force * (dt / mass);
        }
        *position += *velocity * dt;
    }

    /// Toroidal wraparound, exact at the boundary: a component strictly past
    /// `+bound` re-enters past `-bound` by the overshoot, and symmetrically.
    pub fn wrap(position: &mut Vec3, bound: f64) {
        for component in [&mut position.x, &mut position.y, &mut position.z] {
            if *component > bound {
                *component = -bound + (*component - bound);
            } else if *component < -bound {
                *component = bound + (*component + bound);
            }
        }
    }
}
