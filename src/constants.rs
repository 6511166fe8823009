// src/constants.rs
// Physical constants and fixed branching ratios used by the packet sources.

/// Planck constant in keV·s, so that `nu = E_keV / H_CGS_KEV` gives Hz.
pub const H_CGS_KEV: f64 = 4.135667696923859e-18;

/// Speed of light in cm/s.
pub const C_CGS: f64 = 2.99792458e10;

/// Electron-positron annihilation line energy in keV.
pub const POSITRON_ANNIHILATION_LINE: f64 = 511.0;

/// Probability that formed positronium is in the para (two-photon) state.
/// The remaining 0.75 is ortho-positronium, which decays to three photons.
pub const PARA_TO_ORTHO_RATIO: f64 = 0.25;

/// Convert a photon energy in keV to its frequency in Hz.
#[inline]
pub fn kev_to_frequency(energy_kev: f64) -> f64 {
    energy_kev / H_CGS_KEV
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annihilation_line_frequency() {
        let nu = kev_to_frequency(POSITRON_ANNIHILATION_LINE);
        // 511 keV photon is ~1.2356e20 Hz
        assert!((nu - 1.2356e20).abs() / 1.2356e20 < 1e-3);
        assert_eq!(nu, POSITRON_ANNIHILATION_LINE / H_CGS_KEV);
    }
}
