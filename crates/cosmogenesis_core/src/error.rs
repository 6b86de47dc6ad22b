use thiserror::Error;

/// Failures a core operation can raise to its caller.
///
/// Configuration fallbacks and non-finite potential terms are handled in
/// place (logged, defaulted or zeroed); only the failures that must abort the
/// current operation surface here.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sensory sample carried NaN or infinity; the particle cannot be
    /// constructed from it.
    #[error("sensory sample has a non-finite {field} component")]
    NonFiniteSample { field: &'static str },

    /// Spawn derivation produced a degenerate energy. Fails fast instead of
    /// creating an inert particle.
    #[error(
        "particle spawn produced non-finite energy \
         (frequency {frequency_hz} Hz, amplitude {amplitude})"
    )]
    DegenerateSpawn { frequency_hz: f64, amplitude: f64 },

    /// A particle id that is not (or no longer) in the live set.
    #[error("unknown particle id {0}")]
    UnknownParticle(u64),
}
