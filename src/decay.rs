//! Decay statistics consumed by the packet sources.
//!
//! Two shapes of input exist. The fixed-count source reads per-isotope
//! lifetimes and line spectra from an [`IsotopeCatalog`] together with packet
//! counts per isotope and shell ([`IsotopeShellCounts`]). The weighted-draw
//! source reads a flat [`DecayTable`] with one row per isotope, shell, time
//! step and radiation channel.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceError};
use crate::stats::LineSpectrum;

/// Radiation channel of a decay-table row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RadiationType {
    /// Gamma rays, including X-rays
    #[serde(rename = "g")]
    Gamma,
    /// Positrons (beta plus)
    #[serde(rename = "bp")]
    BetaPlus,
    /// Electrons (beta minus)
    #[serde(rename = "bm")]
    BetaMinus,
    /// Auger and conversion electrons
    #[serde(rename = "e")]
    Electron,
    #[serde(rename = "x")]
    XRay,
    #[serde(rename = "a")]
    Alpha,
}

/// One row of the time-dependent decay table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayRow {
    pub isotope: String,
    pub shell_number: usize,
    pub time_index: usize,
    pub radiation: RadiationType,
    #[serde(rename = "radiation_energy_keV")]
    pub radiation_energy_kev: f64,
    /// Energy released through this channel during the step; the sampling weight
    pub decay_energy_erg: f64,
    /// Energy per decay carried by this channel
    #[serde(rename = "energy_per_channel_keV")]
    pub energy_per_channel_kev: f64,
}

/// Decay table sampled by the weighted-draw source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecayTable {
    pub rows: Vec<DecayRow>,
}

impl DecayTable {
    pub fn new(rows: Vec<DecayRow>) -> Self {
        Self { rows }
    }

    /// Load rows from a JSON array of records
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Gamma-ray rows (X-rays are tabulated as gamma), the population packets are drawn from
    pub fn gamma_rows(&self) -> Vec<&DecayRow> {
        self.rows
            .iter()
            .filter(|row| row.radiation == RadiationType::Gamma)
            .collect()
    }

    /// Check every row against the grid dimensions.
    ///
    /// Gamma rows must carry a finite, non-negative decay weight and a
    /// positive line energy; they are the rows fed to the weighted draw.
    pub fn validate(&self, number_of_shells: usize, number_of_time_steps: usize) -> Result<()> {
        for (row_index, row) in self.rows.iter().enumerate() {
            let invalid = |reason: String| SourceError::InvalidDecayRow {
                row: row_index,
                reason,
            };
            if row.shell_number >= number_of_shells {
                return Err(invalid(format!(
                    "shell_number {} outside {} shells",
                    row.shell_number, number_of_shells
                )));
            }
            if row.time_index >= number_of_time_steps {
                return Err(invalid(format!(
                    "time_index {} outside {} time steps",
                    row.time_index, number_of_time_steps
                )));
            }
            if row.radiation == RadiationType::Gamma {
                if !(row.decay_energy_erg.is_finite() && row.decay_energy_erg >= 0.0) {
                    return Err(invalid(format!(
                        "decay_energy_erg {} is not a usable weight",
                        row.decay_energy_erg
                    )));
                }
                if !(row.radiation_energy_kev.is_finite() && row.radiation_energy_kev > 0.0) {
                    return Err(invalid(format!(
                        "radiation_energy_keV {} is not a photon energy",
                        row.radiation_energy_kev
                    )));
                }
            }
        }
        Ok(())
    }

    /// Fraction of released energy carried by positron kinetic energy, per isotope.
    ///
    /// Ratio of summed `bp` to summed `g` channel energies in shell 0. The
    /// ratio does not depend on the shell, only absolute rates do. Isotopes
    /// without positron rows are absent from the map; see
    /// [`DecayTable::positron_fraction`].
    pub fn positron_fractions(&self) -> Result<HashMap<String, f64>> {
        let mut positron_energy: HashMap<&str, f64> = HashMap::new();
        let mut gamma_energy: HashMap<&str, f64> = HashMap::new();
        for row in self.rows.iter().filter(|row| row.shell_number == 0) {
            match row.radiation {
                RadiationType::BetaPlus => {
                    *positron_energy.entry(row.isotope.as_str()).or_insert(0.0) +=
                        row.energy_per_channel_kev
                }
                RadiationType::Gamma => {
                    *gamma_energy.entry(row.isotope.as_str()).or_insert(0.0) +=
                        row.energy_per_channel_kev
                }
                _ => {}
            }
        }

        positron_energy
            .into_iter()
            .map(|(isotope, positron)| {
                let gamma = gamma_energy.get(isotope).copied().unwrap_or(0.0);
                if gamma > 0.0 {
                    Ok((isotope.to_string(), positron / gamma))
                } else {
                    Err(SourceError::MissingIsotope {
                        isotope: isotope.to_string(),
                        table: "shell-0 gamma energy",
                    })
                }
            })
            .collect()
    }

    /// Positron fraction of one isotope, 0 when it emits no positrons
    pub fn positron_fraction(fractions: &HashMap<String, f64>, isotope: &str) -> f64 {
        fractions.get(isotope).copied().unwrap_or(0.0)
    }
}

/// Per-isotope decay data for the fixed-count source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsotopeCatalog {
    /// Mean lifetime per isotope (s)
    pub taus: BTreeMap<String, f64>,
    /// Parent isotope feeding each daughter in a two-step chain
    #[serde(default)]
    pub parents: BTreeMap<String, String>,
    pub gamma_ray_lines: BTreeMap<String, LineSpectrum>,
    /// Mean positron kinetic energy per decay (keV)
    #[serde(default)]
    pub average_positron_energies: BTreeMap<String, f64>,
}

impl IsotopeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Mean lifetime of an isotope, which must be finite and positive
    pub fn tau(&self, isotope: &str) -> Result<f64> {
        let tau = *self.taus.get(isotope).ok_or_else(|| SourceError::MissingIsotope {
            isotope: isotope.to_string(),
            table: "lifetime",
        })?;
        if !(tau.is_finite() && tau > 0.0) {
            return Err(SourceError::InvalidLifetime {
                isotope: isotope.to_string(),
                tau,
            });
        }
        Ok(tau)
    }

    /// Lifetime of the isotope's parent, 0 when it has none
    pub fn parent_tau(&self, isotope: &str) -> Result<f64> {
        match self.parents.get(isotope) {
            Some(parent) => self.tau(parent),
            None => Ok(0.0),
        }
    }

    pub fn lines(&self, isotope: &str) -> Result<&LineSpectrum> {
        self.gamma_ray_lines
            .get(isotope)
            .ok_or_else(|| SourceError::MissingIsotope {
                isotope: isotope.to_string(),
                table: "gamma-ray line",
            })
    }

    /// Positron kinetic energy relative to the photon energy released per decay
    pub fn positron_fraction(&self, isotope: &str) -> Result<f64> {
        let positron_energy = *self.average_positron_energies.get(isotope).ok_or_else(|| {
            SourceError::MissingIsotope {
                isotope: isotope.to_string(),
                table: "average positron energy",
            }
        })?;
        Ok(positron_energy / self.lines(isotope)?.total_energy_kev())
    }
}

/// Packets to create per isotope and shell for the fixed-count source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IsotopeShellCounts {
    counts: BTreeMap<String, Vec<usize>>,
}

impl IsotopeShellCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-shell packet counts of an isotope
    pub fn insert(&mut self, isotope: impl Into<String>, per_shell: Vec<usize>) {
        self.counts.insert(isotope.into(), per_shell);
    }

    pub fn count(&self, isotope: &str, shell: usize) -> usize {
        self.counts
            .get(isotope)
            .and_then(|per_shell| per_shell.get(shell))
            .copied()
            .unwrap_or(0)
    }

    /// Isotope names in iteration order
    pub fn isotopes(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn total(&self) -> usize {
        self.counts.values().flatten().sum()
    }

    /// Packets summed over isotopes, per shell
    pub fn per_shell(&self, number_of_shells: usize) -> Vec<usize> {
        (0..number_of_shells)
            .map(|shell| self.isotopes().map(|isotope| self.count(isotope, shell)).sum())
            .collect()
    }

    /// Every isotope must list one count per shell and at least one packet must be requested
    pub fn validate(&self, number_of_shells: usize) -> Result<()> {
        for (isotope, per_shell) in &self.counts {
            if per_shell.len() != number_of_shells {
                return Err(SourceError::InvalidGrid(format!(
                    "isotope '{}' lists {} shell counts for {} shells",
                    isotope,
                    per_shell.len(),
                    number_of_shells
                )));
            }
        }
        if self.total() == 0 {
            return Err(SourceError::NoPackets);
        }
        Ok(())
    }
}
