//! Sensory intake: turns an external sample stream into a steady,
//! rate-limited feed of clamped samples plus the field modulation the
//! current sound state exerts.

use crate::config::AudioConfig;
use crate::potential::Modulation;
use cosmogenesis_data::{SensorySample, MAX_FREQUENCY_HZ, MIN_FREQUENCY_HZ};

/// Anything that can be polled for the current sensory reading.
pub trait SampleSource {
    fn sample(&mut self, now: f64) -> SensorySample;
}

/// Deterministic synthetic source: a logarithmic sweep across the audible
/// band with a slow amplitude swell. Used by the headless driver and tests.
#[derive(Debug, Clone)]
pub struct FrequencySweep {
    /// Seconds for one full sweep of the band.
    pub period_s: f64,
}

impl Default for FrequencySweep {
    fn default() -> Self {
        Self { period_s: 30.0 }
    }
}

impl SampleSource for FrequencySweep {
    fn sample(&mut self, now: f64) -> SensorySample {
        let t = (now / self.period_s).fract();
        let octaves = (MAX_FREQUENCY_HZ / MIN_FREQUENCY_HZ).log2();
        let frequency = MIN_FREQUENCY_HZ * (t * octaves).exp2();
        let amplitude = 0.5 + 0.4 * (now * 0.2).sin();
        SensorySample::clamped(frequency, amplitude, t, now)
    }
}

/// Rate-limiting front end over a [`SampleSource`].
pub struct SensoryIntake {
    config: AudioConfig,
    accumulator: f64,
    latest: Option<SensorySample>,
}

impl SensoryIntake {
    #[must_use]
    pub fn new(config: AudioConfig) -> Self {
        Self {
            config,
            accumulator: 0.0,
            latest: None,
        }
    }

    /// Advances the intake clock by `dt` and polls the source once per
    /// generation interval, scaling amplitude by the configured sensitivity.
    pub fn collect(
        &mut self,
        dt: f64,
        now: f64,
        source: &mut dyn SampleSource,
    ) -> Vec<SensorySample> {
        if self.config.generation_rate <= 0.0 {
            return Vec::new();
        }
        let interval = 1.0 / self.config.generation_rate;
        self.accumulator += dt;

        let mut out = Vec::new();
        while self.accumulator >= interval {
            self.accumulator -= interval;
            let raw = source.sample(now - self.accumulator);
            let scaled = SensorySample::clamped(
                raw.frequency_hz,
                raw.amplitude * self.config.sensitivity,
                raw.spectral_complexity,
                raw.timestamp,
            );
            self.latest = Some(scaled);
            out.push(scaled);
        }
        out
    }

    /// The field modulation the most recent sample exerts. Inert until the
    /// first sample arrives or when audio influence is disabled.
    #[must_use]
    pub fn modulation(&self) -> Modulation {
        match self.latest {
            Some(sample) if self.config.affect_field => Modulation {
                amplitude: sample.amplitude,
                complexity: sample.spectral_complexity,
                sensitivity: self.config.sensitivity,
                enabled: true,
            },
            _ => Modulation::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_respects_generation_rate() {
        let mut intake = SensoryIntake::new(AudioConfig::default());
        let mut source = FrequencySweep::default();
        // Default rate is 10/s, so one second yields 10 samples.
        let samples = intake.collect(1.0, 1.0, &mut source);
        assert_eq!(samples.len(), 10);
        // A sub-interval step yields nothing until the interval accrues.
        let samples = intake.collect(0.05, 1.05, &mut source);
        assert!(samples.is_empty());
        let samples = intake.collect(0.05, 1.1, &mut source);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_sweep_stays_in_audible_band() {
        let mut source = FrequencySweep::default();
        for i in 0..300 {
            let sample = source.sample(i as f64 * 0.25);
            assert!(sample.frequency_hz >= MIN_FREQUENCY_HZ);
            assert!(sample.frequency_hz <= MAX_FREQUENCY_HZ);
            assert!((0.0..=1.0).contains(&sample.amplitude));
        }
    }

    #[test]
    fn test_sensitivity_scales_amplitude() {
        let config = AudioConfig {
            sensitivity: 0.5,
            ..AudioConfig::default()
        };
        let mut intake = SensoryIntake::new(config);

        struct Constant;
        impl SampleSource for Constant {
            fn sample(&mut self, now: f64) -> SensorySample {
                SensorySample::clamped(440.0, 1.0, 0.0, now)
            }
        }
        let samples = intake.collect(0.1, 0.1, &mut Constant);
        assert_eq!(samples.len(), 1);
        assert!((samples[0].amplitude - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_modulation_inert_until_first_sample() {
        let mut intake = SensoryIntake::new(AudioConfig::default());
        assert_eq!(intake.modulation().potential_factor(), 1.0);
        let mut source = FrequencySweep::default();
        intake.collect(0.1, 0.1, &mut source);
        assert!(intake.modulation().enabled);
    }

    #[test]
    fn test_modulation_disabled_by_config() {
        let config = AudioConfig {
            affect_field: false,
            ..AudioConfig::default()
        };
        let mut intake = SensoryIntake::new(config);
        let mut source = FrequencySweep::default();
        intake.collect(0.2, 0.2, &mut source);
        assert!(!intake.modulation().enabled);
    }
}
