use thiserror::Error;

/// Errors raised while validating inputs or generating packets.
///
/// Every variant is detected before (or instead of) producing packets; no
/// condition is silently replaced by a default value.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("isotope '{isotope}' has no entry in the {table} table")]
    MissingIsotope { isotope: String, table: &'static str },

    #[error("invalid line spectrum for isotope '{isotope}': {reason}")]
    InvalidSpectrum { isotope: String, reason: String },

    #[error("invalid ejecta grid: {0}")]
    InvalidGrid(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("invalid decay table row {row}: {reason}")]
    InvalidDecayRow { row: usize, reason: String },

    #[error("decay table contains no gamma-ray rows to sample from")]
    NoGammaRows,

    #[error("no packets requested")]
    NoPackets,

    #[error("invalid mean lifetime {tau} for isotope '{isotope}'")]
    InvalidLifetime { isotope: String, tau: f64 },

    #[error("degenerate decay-time window [{min}, {max}) for isotope '{isotope}'")]
    DegenerateTimeWindow { isotope: String, min: f64, max: f64 },

    #[error("decay-time rejection sampling for isotope '{isotope}' exceeded {attempts} attempts")]
    SamplingExhausted { isotope: String, attempts: usize },

    #[error("packet {packet} mixes time-indexed and unindexed packets in one collection")]
    MixedTimeIndices { packet: usize },

    #[error("weighted decay sampling failed: {0}")]
    WeightedSampling(#[from] rand_distr::WeightedError),

    #[error("failed to parse input: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
