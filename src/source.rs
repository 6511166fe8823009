//! Shared packet-creation contract and the sampling helpers both sources use.

use nalgebra::Vector3;
use rand::{Rng, RngCore};

use crate::error::{Result, SourceError};
use crate::geometry::sample_shell_radius;
use crate::ledger::{DepositionLedger, PositronRow};
use crate::packet::GXPacketCollection;
use crate::stats::sample_isotropic_direction;

/// Everything a packet source produces in one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedPackets {
    pub packets: GXPacketCollection,
    /// Packet came from the 511 keV line of a positron decay
    pub positron_mask: Vec<bool>,
    /// Positron energy fraction of each packet's isotope
    pub positron_fractions: Vec<f64>,
    pub positron_rows: Vec<PositronRow>,
}

impl GeneratedPackets {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            packets: GXPacketCollection::with_capacity(capacity),
            positron_mask: Vec::with_capacity(capacity),
            positron_fractions: Vec::with_capacity(capacity),
            positron_rows: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Number of packets that came from positron annihilation
    pub fn positron_count(&self) -> usize {
        self.positron_mask.iter().filter(|&&p| p).count()
    }
}

/// A source of initial gamma-ray packets.
///
/// Randomness comes only from the `rng` argument (plus any seed the source
/// declares), so a fixed generator state reproduces the same packets.
pub trait PacketSource {
    /// Co-moving energy of every packet before any rescaling (erg)
    fn packet_energy(&self) -> f64;

    /// (shells, time steps) of the deposition ledger this source writes to
    fn ledger_shape(&self) -> (usize, usize);

    /// Build the packet collection, adding positron deposition to `ledger`
    fn create_packets(
        &self,
        ledger: &mut DepositionLedger,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedPackets>;

    /// Empty ledger of the right shape
    fn new_ledger(&self) -> DepositionLedger {
        let (shells, time_steps) = self.ledger_shape();
        DepositionLedger::new(shells, time_steps)
    }

    fn create_packet_directions(&self, no_of_packets: usize, rng: &mut dyn RngCore) -> Vec<Vector3<f64>> {
        create_packet_directions(no_of_packets, rng)
    }

    /// Decay times uniform in `[start, end]`
    fn create_packet_times_uniform_time(
        &self,
        no_of_packets: usize,
        start: f64,
        end: f64,
        rng: &mut dyn RngCore,
    ) -> Vec<f64> {
        create_packet_times_uniform_time(no_of_packets, start, end, rng)
    }

    fn create_packet_energies(&self, no_of_packets: usize) -> Vec<f64> {
        vec![self.packet_energy(); no_of_packets]
    }

    fn check_ledger(&self, ledger: &DepositionLedger) -> Result<()> {
        if ledger.shape() != self.ledger_shape() {
            return Err(SourceError::InvalidGrid(format!(
                "ledger shape {:?} does not match grid {:?}",
                ledger.shape(),
                self.ledger_shape()
            )));
        }
        Ok(())
    }
}

/// Volume-uniform radii (velocity units) inside one shell
pub fn create_packet_radii<R: Rng + ?Sized>(
    no_of_packets: usize,
    inner_velocity: f64,
    outer_velocity: f64,
    rng: &mut R,
) -> Vec<f64> {
    (0..no_of_packets)
        .map(|_| sample_shell_radius(inner_velocity, outer_velocity, rng))
        .collect()
}

/// Independent isotropic unit vectors
pub fn create_packet_directions<R: Rng + ?Sized>(no_of_packets: usize, rng: &mut R) -> Vec<Vector3<f64>> {
    (0..no_of_packets)
        .map(|_| sample_isotropic_direction(rng))
        .collect()
}

/// Decay times drawn uniformly between `start` and `end`.
///
/// Unlike the exponential samplers the packets are then not of equal
/// energy; callers weight each packet by the decay rate at its time.
pub fn create_packet_times_uniform_time<R: Rng + ?Sized>(
    no_of_packets: usize,
    start: f64,
    end: f64,
    rng: &mut R,
) -> Vec<f64> {
    (0..no_of_packets)
        .map(|_| {
            let z: f64 = rng.gen();
            z * start + (1.0 - z) * end
        })
        .collect()
}

/// Decay time of a (possibly chained) decay inside the open window `(min, max)`.
///
/// Draws `t = -tau_start ln(u1) - tau_end ln(u2)`, the convolution of the
/// parent and daughter exponentials, until it lands inside the window.
pub fn sample_chained_decay_time<R: Rng + ?Sized>(
    isotope: &str,
    tau_start: f64,
    tau_end: f64,
    decay_time_min: f64,
    decay_time_max: f64,
    max_attempts: usize,
    rng: &mut R,
) -> Result<f64> {
    if !(decay_time_max > decay_time_min) || decay_time_max <= 0.0 {
        return Err(SourceError::DegenerateTimeWindow {
            isotope: isotope.to_string(),
            min: decay_time_min,
            max: decay_time_max,
        });
    }
    for _ in 0..max_attempts {
        let u1: f64 = rng.gen();
        let u2: f64 = rng.gen();
        let t = -tau_start * u1.ln() - tau_end * u2.ln();
        if t > decay_time_min && t < decay_time_max {
            return Ok(t);
        }
    }
    Err(SourceError::SamplingExhausted {
        isotope: isotope.to_string(),
        attempts: max_attempts,
    })
}

/// Decay time of a single exponential decay, conditioned on the bucket `(min, max)`.
///
/// The exponential is memoryless, so drawing `min - tau ln(u)` and rejecting
/// values past `max` gives the same conditional distribution as rejecting
/// unshifted draws, with an acceptance rate that depends only on the bucket
/// width.
pub fn sample_bucketed_decay_time<R: Rng + ?Sized>(
    isotope: &str,
    tau: f64,
    decay_time_min: f64,
    decay_time_max: f64,
    max_attempts: usize,
    rng: &mut R,
) -> Result<f64> {
    if !(decay_time_max > decay_time_min) {
        return Err(SourceError::DegenerateTimeWindow {
            isotope: isotope.to_string(),
            min: decay_time_min,
            max: decay_time_max,
        });
    }
    for _ in 0..max_attempts {
        let u: f64 = rng.gen();
        let t = decay_time_min - tau * u.ln();
        if t > decay_time_min && t < decay_time_max {
            return Ok(t);
        }
    }
    Err(SourceError::SamplingExhausted {
        isotope: isotope.to_string(),
        attempts: max_attempts,
    })
}

/// Energy factor and admitted time of a packet decaying before `start_time`.
///
/// Early packets are moved to `start_time` and their energy scaled by
/// `decay_time / start_time`; later packets are returned unchanged.
pub fn calculate_energy_factor(start_time: f64, decay_time: f64) -> (f64, f64) {
    if decay_time < start_time {
        (decay_time / start_time, start_time)
    } else {
        (1.0, decay_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_radii_and_directions_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(create_packet_radii(0, 1.0, 2.0, &mut rng).is_empty());
        let radii = create_packet_radii(50, 1.0, 2.0, &mut rng);
        assert_eq!(radii.len(), 50);
        assert!(radii.iter().all(|r| (1.0..=2.0).contains(r)));

        let directions = create_packet_directions(50, &mut rng);
        assert_eq!(directions.len(), 50);
        assert!(directions.iter().all(|d| (d.norm() - 1.0).abs() < 1e-10));
    }

    #[test]
    fn test_chained_decay_time_inside_window() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            let t = sample_chained_decay_time("Co56", 9.6e6, 7.6e5, 0.0, 5.0e6, 1000, &mut rng).unwrap();
            assert!(t > 0.0 && t < 5.0e6);
        }
    }

    #[test]
    fn test_single_decay_mean_lifetime() {
        // Window far wider than tau: mean of the draws approaches tau
        let mut rng = StdRng::seed_from_u64(3);
        let tau = 10.0;
        let n = 20000;
        let mean: f64 = (0..n)
            .map(|_| sample_chained_decay_time("X", tau, 0.0, 0.0, 1.0e6, 1000, &mut rng).unwrap())
            .sum::<f64>()
            / n as f64;
        assert!((mean - tau).abs() < 0.3, "mean decay time {}", mean);
    }

    #[test]
    fn test_degenerate_windows_fail_fast() {
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            sample_chained_decay_time("X", 1.0, 0.0, 5.0, 5.0, 10, &mut rng),
            Err(SourceError::DegenerateTimeWindow { .. })
        ));
        assert!(matches!(
            sample_chained_decay_time("X", 1.0, 0.0, 0.0, 0.0, 10, &mut rng),
            Err(SourceError::DegenerateTimeWindow { .. })
        ));
        assert!(matches!(
            sample_bucketed_decay_time("X", 1.0, 3.0, 2.0, 10, &mut rng),
            Err(SourceError::DegenerateTimeWindow { .. })
        ));
    }

    #[test]
    fn test_rejection_is_bounded() {
        // Lifetime of a microsecond against a window a day away
        let mut rng = StdRng::seed_from_u64(5);
        let err = sample_chained_decay_time("X", 1.0e-6, 0.0, 86400.0, 86401.0, 100, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SourceError::SamplingExhausted { attempts: 100, .. }));
    }

    #[test]
    fn test_bucketed_decay_time_inside_bucket() {
        let mut rng = StdRng::seed_from_u64(6);
        // Bucket deep in the tail of a short-lived isotope still samples
        for _ in 0..1000 {
            let t = sample_bucketed_decay_time("Ni56", 7.6e5, 8.64e7, 8.7e7, 10_000, &mut rng).unwrap();
            assert!(t > 8.64e7 && t < 8.7e7);
        }
    }

    #[test]
    fn test_bucketed_distribution_is_truncated_exponential() {
        // P(t < min + tau ln 2 | bucket) for a bucket of width 2 tau
        let mut rng = StdRng::seed_from_u64(8);
        let tau = 1.0;
        let n = 20000;
        let split = 5.0 + tau * 2f64.ln();
        let below = (0..n)
            .filter(|_| sample_bucketed_decay_time("X", tau, 5.0, 7.0, 1000, &mut rng).unwrap() < split)
            .count();
        let expected = 0.5 / (1.0 - (-2.0f64).exp());
        let frac = below as f64 / n as f64;
        assert!((frac - expected).abs() < 0.02, "fraction {} vs {}", frac, expected);
    }

    #[test]
    fn test_uniform_time_decay_times() {
        let mut rng = StdRng::seed_from_u64(9);
        let n = 20000;
        let times = create_packet_times_uniform_time(n, 2.0, 10.0, &mut rng);
        assert_eq!(times.len(), n);
        assert!(times.iter().all(|t| (2.0..=10.0).contains(t)));
        let mean = times.iter().sum::<f64>() / n as f64;
        assert!((mean - 6.0).abs() < 0.05, "mean decay time {}", mean);
        let early = times.iter().filter(|&&t| t < 4.0).count() as f64 / n as f64;
        assert!((early - 0.25).abs() < 0.015, "fraction before t = 4: {}", early);
    }

    #[test]
    fn test_energy_factor() {
        assert_eq!(calculate_energy_factor(10.0, 5.0), (0.5, 10.0));
        assert_eq!(calculate_energy_factor(10.0, 10.0), (1.0, 10.0));
        assert_eq!(calculate_energy_factor(10.0, 20.0), (1.0, 20.0));
    }
}
