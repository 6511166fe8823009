use nalgebra::Vector3;
use rand::Rng;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceError};

/// Sample an isotropic unit vector.
///
/// Cosine of the polar angle is uniform in [-1, 1) and the azimuth uniform in
/// [0, 2π), which is uniform over the sphere surface.
pub fn sample_isotropic_direction<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    let xi1: f64 = rng.gen();
    let xi2: f64 = rng.gen();

    let mu = 2.0 * xi1 - 1.0;
    let phi = 2.0 * std::f64::consts::PI * xi2;

    let sin_theta = (1.0 - mu * mu).max(0.0).sqrt();
    Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), mu)
}

/// Tabulated photon lines of one isotope: energies (keV) and intensities
/// (photons per decay).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LineSpectrumRecord", into = "LineSpectrumRecord")]
pub struct LineSpectrum {
    energies_kev: Vec<f64>,
    intensities: Vec<f64>,
    cumulative: Vec<f64>,
}

/// Serialized form of [`LineSpectrum`]; the cumulative table is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LineSpectrumRecord {
    energies_kev: Vec<f64>,
    intensities: Vec<f64>,
}

impl TryFrom<LineSpectrumRecord> for LineSpectrum {
    type Error = SourceError;

    fn try_from(record: LineSpectrumRecord) -> Result<Self> {
        LineSpectrum::new("<deserialized>", record.energies_kev, record.intensities)
    }
}

impl From<LineSpectrum> for LineSpectrumRecord {
    fn from(spectrum: LineSpectrum) -> Self {
        Self {
            energies_kev: spectrum.energies_kev,
            intensities: spectrum.intensities,
        }
    }
}

impl LineSpectrum {
    /// Build a spectrum, checking that it can be sampled.
    ///
    /// `isotope` is only used to label errors.
    pub fn new(isotope: &str, energies_kev: Vec<f64>, intensities: Vec<f64>) -> Result<Self> {
        let invalid = |reason: String| SourceError::InvalidSpectrum {
            isotope: isotope.to_string(),
            reason,
        };
        if energies_kev.is_empty() {
            return Err(invalid("no lines".to_string()));
        }
        if energies_kev.len() != intensities.len() {
            return Err(invalid(format!(
                "{} energies but {} intensities",
                energies_kev.len(),
                intensities.len()
            )));
        }
        if let Some((e, i)) = energies_kev
            .iter()
            .zip(&intensities)
            .find(|(e, i)| !(**e > 0.0 && e.is_finite() && **i >= 0.0 && i.is_finite()))
        {
            return Err(invalid(format!("line ({} keV, intensity {}) is not usable", e, i)));
        }

        let mut spectrum = Self {
            energies_kev,
            intensities,
            cumulative: Vec::new(),
        };
        let total = spectrum.total_energy_kev();
        if total <= 0.0 {
            return Err(invalid("all intensities are zero".to_string()));
        }

        let mut running = 0.0;
        spectrum.cumulative = spectrum
            .energies_kev
            .iter()
            .zip(&spectrum.intensities)
            .map(|(e, i)| {
                running += e * i / total;
                running
            })
            .collect();
        Ok(spectrum)
    }

    /// A spectrum holding a single line with unit intensity
    pub fn single_line(isotope: &str, energy_kev: f64) -> Result<Self> {
        Self::new(isotope, vec![energy_kev], vec![1.0])
    }

    /// Total photon energy released per decay, Σ energy × intensity (keV)
    pub fn total_energy_kev(&self) -> f64 {
        self.energies_kev
            .iter()
            .zip(&self.intensities)
            .map(|(e, i)| e * i)
            .sum()
    }

    pub fn energies_kev(&self) -> &[f64] {
        &self.energies_kev
    }

    pub fn intensities(&self) -> &[f64] {
        &self.intensities
    }

    pub fn len(&self) -> usize {
        self.energies_kev.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies_kev.is_empty()
    }
}

impl Distribution<f64> for LineSpectrum {
    /// Draw one line energy, weighted by the energy it carries (energy × intensity).
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.gen();
        let idx = self
            .cumulative
            .partition_point(|&c| c <= z)
            .min(self.energies_kev.len() - 1);
        self.energies_kev[idx]
    }
}
