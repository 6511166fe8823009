use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceError};

fn default_base_seed() -> u64 {
    1963
}

fn default_max_rejection_attempts() -> usize {
    1_000_000
}

/// Run-level parameters shared by both packet sources.
///
/// Usually deserialized from the simulation's JSON configuration block:
///
/// ```
/// use gamma_ray_source::Settings;
///
/// let settings = Settings::from_json_str(
///     r#"{"packet_energy": 1.0e40, "positronium_fraction": 0.5, "number_of_packets": 1000}"#,
/// ).unwrap();
/// assert_eq!(settings.base_seed, 1963);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Energy carried by every packet in the co-moving frame (erg)
    pub packet_energy: f64,
    /// Fraction of positrons that form positronium before annihilating
    pub positronium_fraction: f64,
    /// Packets drawn by the weighted-draw source (ignored by the fixed-count source)
    #[serde(default)]
    pub number_of_packets: usize,
    /// Seed for the weighted decay draw
    #[serde(default = "default_base_seed")]
    pub base_seed: u64,
    /// Cap on rejection-sampling attempts per decay time
    #[serde(default = "default_max_rejection_attempts")]
    pub max_rejection_attempts: usize,
}

impl Settings {
    pub fn new(packet_energy: f64, positronium_fraction: f64) -> Self {
        Self {
            packet_energy,
            positronium_fraction,
            number_of_packets: 0,
            base_seed: default_base_seed(),
            max_rejection_attempts: default_max_rejection_attempts(),
        }
    }

    /// Parse and validate settings from a JSON object
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.packet_energy.is_finite() || self.packet_energy <= 0.0 {
            return Err(SourceError::InvalidSettings(format!(
                "packet_energy must be finite and positive, got {}",
                self.packet_energy
            )));
        }
        if !(0.0..=1.0).contains(&self.positronium_fraction) {
            return Err(SourceError::InvalidSettings(format!(
                "positronium_fraction must lie in [0, 1], got {}",
                self.positronium_fraction
            )));
        }
        if self.max_rejection_attempts == 0 {
            return Err(SourceError::InvalidSettings(
                "max_rejection_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
