use serde::{Deserialize, Serialize};

/// Audible frequency band the sensory collaborator reports, in Hz.
pub const MIN_FREQUENCY_HZ: f64 = 20.0;
pub const MAX_FREQUENCY_HZ: f64 = 20_000.0;

/// One discrete sample from the sensory collaborator.
///
/// Out-of-range values are folded into range rather than rejected; the core
/// never drops a well-formed sample just because the capture layer clipped.
/// Non-finite fields are the caller's problem and are caught at spawn time.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct SensorySample {
    pub frequency_hz: f64,
    /// 0.0..=1.0
    pub amplitude: f64,
    /// 0.0..=1.0
    pub spectral_complexity: f64,
    /// Seconds of simulation time at capture.
    pub timestamp: f64,
}

impl SensorySample {
    /// Builds a sample with every field clamped into its documented range.
    #[must_use]
    pub fn clamped(
        frequency_hz: f64,
        amplitude: f64,
        spectral_complexity: f64,
        timestamp: f64,
    ) -> Self {
        Self {
            frequency_hz: frequency_hz.clamp(MIN_FREQUENCY_HZ, MAX_FREQUENCY_HZ),
            amplitude: amplitude.clamp(0.0, 1.0),
            spectral_complexity: spectral_complexity.clamp(0.0, 1.0),
            timestamp,
        }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.frequency_hz.is_finite()
            && self.amplitude.is_finite()
            && self.spectral_complexity.is_finite()
            && self.timestamp.is_finite()
    }

    /// Position of the frequency within the audible band, 0.0..=1.0.
    #[must_use]
    pub fn frequency_fraction(&self) -> f64 {
        (self.frequency_hz - MIN_FREQUENCY_HZ) / (MAX_FREQUENCY_HZ - MIN_FREQUENCY_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_folds_out_of_range() {
        let s = SensorySample::clamped(50_000.0, 1.7, -0.3, 1.0);
        assert_eq!(s.frequency_hz, MAX_FREQUENCY_HZ);
        assert_eq!(s.amplitude, 1.0);
        assert_eq!(s.spectral_complexity, 0.0);
    }

    #[test]
    fn test_clamped_preserves_in_range() {
        let s = SensorySample::clamped(440.0, 0.5, 0.25, 2.0);
        assert_eq!(s.frequency_hz, 440.0);
        assert_eq!(s.amplitude, 0.5);
        assert_eq!(s.spectral_complexity, 0.25);
    }

    #[test]
    fn test_frequency_fraction_bounds() {
        assert_eq!(
            SensorySample::clamped(MIN_FREQUENCY_HZ, 0.5, 0.0, 0.0).frequency_fraction(),
            0.0
        );
        assert_eq!(
            SensorySample::clamped(MAX_FREQUENCY_HZ, 0.5, 0.0, 0.0).frequency_fraction(),
            1.0
        );
    }
}
