//! Positronium formation and the ortho-positronium three-photon continuum.
//!
//! A positron emitted by a decay either annihilates directly (two 511 keV
//! photons) or first binds with an electron into positronium. Para-positronium
//! still yields two 511 keV photons; ortho-positronium yields three photons
//! whose individual energies follow the Ore & Powell (1949) spectrum below
//! 511 keV.

use once_cell::sync::Lazy;
use rand::Rng;
use rand_distr::Distribution;

use crate::constants::{PARA_TO_ORTHO_RATIO, POSITRON_ANNIHILATION_LINE};
use crate::utilities::interpolate_linear;

const GRID_POINTS: usize = 4096;
const X_MIN: f64 = 1.0e-3;

/// Ore & Powell photon spectrum of ortho-positronium decay, x = E / 511 keV.
///
/// Finite on [0, 1]; the x = 1 limit is 2.
pub fn ore_powell_spectrum(x: f64) -> f64 {
    if x >= 1.0 {
        return 2.0;
    }
    if x <= 0.0 {
        return 0.0;
    }
    let one_minus_x = 1.0 - x;
    let two_minus_x = 2.0 - x;
    let log_term = (-x).ln_1p();
    let value = x * one_minus_x / two_minus_x.powi(2)
        - 2.0 * one_minus_x.powi(2) / two_minus_x.powi(3) * log_term
        + two_minus_x / x
        + 2.0 * one_minus_x / (x * x) * log_term;
    (2.0 * value).max(0.0)
}

/// Tabulated inverse CDF of the ortho-positronium spectrum
struct ContinuumTable {
    x: Vec<f64>,
    cdf: Vec<f64>,
}

static ORTHO_POSITRONIUM_TABLE: Lazy<ContinuumTable> = Lazy::new(|| {
    let step = (1.0 - X_MIN) / (GRID_POINTS - 1) as f64;
    let x: Vec<f64> = (0..GRID_POINTS).map(|i| X_MIN + i as f64 * step).collect();
    let pdf: Vec<f64> = x.iter().map(|&xi| ore_powell_spectrum(xi)).collect();

    let mut cdf = Vec::with_capacity(GRID_POINTS);
    cdf.push(0.0);
    for i in 1..GRID_POINTS {
        let area = 0.5 * (pdf[i] + pdf[i - 1]) * (x[i] - x[i - 1]);
        cdf.push(cdf[i - 1] + area);
    }
    let total = cdf[GRID_POINTS - 1];
    for value in cdf.iter_mut() {
        *value /= total;
    }
    ContinuumTable { x, cdf }
});

/// Draws single-photon energies (keV) from the ortho-positronium continuum
#[derive(Debug, Clone, Copy, Default)]
pub struct PositroniumSampler;

impl PositroniumSampler {
    pub fn new() -> Self {
        Self
    }
}

impl Distribution<f64> for PositroniumSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let table = &*ORTHO_POSITRONIUM_TABLE;
        let u: f64 = rng.gen();
        let x = interpolate_linear(&table.cdf, &table.x, u);
        (x * POSITRON_ANNIHILATION_LINE).min(POSITRON_ANNIHILATION_LINE)
    }
}

/// Fate of a positron behind a 511 keV packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositroniumBranch {
    /// Direct two-photon annihilation
    Annihilation,
    /// Para-positronium, two photons at 511 keV
    Para,
    /// Ortho-positronium, three-photon continuum
    Ortho,
}

pub fn sample_positronium_branch<R: Rng + ?Sized>(
    positronium_fraction: f64,
    rng: &mut R,
) -> PositroniumBranch {
    let formation: f64 = rng.gen();
    let spin_state: f64 = rng.gen();
    if formation >= positronium_fraction {
        PositroniumBranch::Annihilation
    } else if spin_state < PARA_TO_ORTHO_RATIO {
        PositroniumBranch::Para
    } else {
        PositroniumBranch::Ortho
    }
}

/// Photon energy of one packet after positronium branching
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotonDraw {
    pub energy_kev: f64,
    /// The packet came from the annihilation line, i.e. a positron was emitted
    pub from_positron: bool,
}

/// Apply positronium branching to a line energy.
///
/// Lines other than 511 keV pass through untouched and consume no randomness.
pub fn apply_positronium<R: Rng + ?Sized>(
    line_energy_kev: f64,
    positronium_fraction: f64,
    sampler: &PositroniumSampler,
    rng: &mut R,
) -> PhotonDraw {
    if line_energy_kev != POSITRON_ANNIHILATION_LINE {
        return PhotonDraw {
            energy_kev: line_energy_kev,
            from_positron: false,
        };
    }
    let energy_kev = match sample_positronium_branch(positronium_fraction, rng) {
        PositroniumBranch::Ortho => sampler.sample(rng),
        PositroniumBranch::Para | PositroniumBranch::Annihilation => POSITRON_ANNIHILATION_LINE,
    };
    PhotonDraw {
        energy_kev,
        from_positron: true,
    }
}
