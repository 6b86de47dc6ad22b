//! Performance metrics collection for the simulation.
//!
//! Provides structured logging and metrics tracking for monitoring
//! simulation performance and health.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Metrics collector for simulation statistics.
pub struct Metrics {
    tick_count: AtomicU64,
    particle_count: AtomicU64,
    body_count: AtomicU64,
    loaded_sectors: AtomicU64,
    critical_events: AtomicU64,
    pub counters: Mutex<HashMap<String, AtomicU64>>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick_count: AtomicU64::new(0),
            particle_count: AtomicU64::new(0),
            body_count: AtomicU64::new(0),
            loaded_sectors: AtomicU64::new(0),
            critical_events: AtomicU64::new(0),
            counters: Mutex::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Records a completed tick with its duration and population sizes.
    pub fn record_tick(
        &self,
        duration: Duration,
        particles: usize,
        bodies: usize,
        loaded_sectors: usize,
    ) {
        self.tick_count.fetch_add(1, Ordering::Relaxed);
        self.particle_count.store(particles as u64, Ordering::Relaxed);
        self.body_count.store(bodies as u64, Ordering::Relaxed);
        self.loaded_sectors
            .store(loaded_sectors as u64, Ordering::Relaxed);

        // Log at info level every 1000 ticks
        let tick = self.tick_count.load(Ordering::Relaxed);
        if tick % 1000 == 0 {
            tracing::info!(
                tick = tick,
                particles = particles,
                bodies = bodies,
                loaded_sectors = loaded_sectors,
                duration_ms = duration.as_millis() as u64,
                "Simulation tick"
            );
        }
    }

    /// Records one critical-event firing.
    pub fn record_critical_event(&self) {
        self.critical_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments a named counter.
    pub fn increment_counter(&self, name: &str) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn particle_count(&self) -> u64 {
        self.particle_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn body_count(&self) -> u64 {
        self.body_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn critical_events(&self) -> u64 {
        self.critical_events.load(Ordering::Relaxed)
    }

    /// Elapsed time since metrics creation.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Initialize tracing subscriber for logging.
pub fn init_logging() {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::INFO)
            .finish(),
    )
    .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.tick_count(), 0);
    }

    #[test]
    fn test_record_tick() {
        let metrics = Metrics::new();
        metrics.record_tick(Duration::from_millis(16), 100, 50, 4);
        assert_eq!(metrics.tick_count(), 1);
        assert_eq!(metrics.particle_count(), 100);
        assert_eq!(metrics.body_count(), 50);
    }

    #[test]
    fn test_critical_event_counter() {
        let metrics = Metrics::new();
        metrics.record_critical_event();
        metrics.record_critical_event();
        assert_eq!(metrics.critical_events(), 2);
    }
}
