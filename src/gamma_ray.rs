//! Weighted-draw packet source.
//!
//! Packets are drawn with replacement from the gamma-ray rows of a decay
//! table, weighted by the energy each row releases. A drawn row fixes the
//! packet's isotope, shell and time step together.

use std::collections::{BTreeMap, HashMap};

use nalgebra::Vector3;
use rand::RngCore;
use rand_distr::{Distribution, WeightedIndex};
use tracing::{debug, info};

use crate::constants::kev_to_frequency;
use crate::decay::{DecayRow, DecayTable};
use crate::doppler::doppler_factor_3d_all_packets;
use crate::error::{Result, SourceError};
use crate::geometry::{sample_shell_radius, EjectaGrid};
use crate::ledger::{DepositionLedger, PositronRow};
use crate::packet::{GXPacket, PacketStatus};
use crate::positronium::{apply_positronium, PhotonDraw, PositroniumSampler};
use crate::rng::PacketRng;
use crate::settings::Settings;
use crate::source::{sample_bucketed_decay_time, GeneratedPackets, PacketSource};

/// Stream of `base_seed` reserved for the weighted row draw
const WEIGHTED_DRAW_STREAM: u64 = 0;

#[derive(Debug, Clone)]
pub struct GammaRayPacketSource {
    pub settings: Settings,
    pub grid: EjectaGrid,
    pub isotope_decay_table: DecayTable,
    /// Mean lifetime per isotope (s)
    pub taus: BTreeMap<String, f64>,
    positron_fractions: HashMap<String, f64>,
    positronium: PositroniumSampler,
}

impl GammaRayPacketSource {
    pub fn new(
        settings: Settings,
        grid: EjectaGrid,
        isotope_decay_table: DecayTable,
        taus: BTreeMap<String, f64>,
    ) -> Result<Self> {
        settings.validate()?;
        grid.validate()?;
        if settings.number_of_packets == 0 {
            return Err(SourceError::NoPackets);
        }
        isotope_decay_table.validate(grid.number_of_shells(), grid.number_of_time_steps())?;

        let gamma_rows = isotope_decay_table.gamma_rows();
        if gamma_rows.is_empty() {
            return Err(SourceError::NoGammaRows);
        }
        for row in gamma_rows.iter().filter(|row| row.decay_energy_erg > 0.0) {
            let tau = *taus.get(&row.isotope).ok_or_else(|| SourceError::MissingIsotope {
                isotope: row.isotope.clone(),
                table: "lifetime",
            })?;
            if !(tau.is_finite() && tau > 0.0) {
                return Err(SourceError::InvalidLifetime {
                    isotope: row.isotope.clone(),
                    tau,
                });
            }
            let (min, max) = grid.bucket_bounds(row.time_index);
            if !(max > min) {
                return Err(SourceError::DegenerateTimeWindow {
                    isotope: row.isotope.clone(),
                    min,
                    max,
                });
            }
        }

        let positron_fractions = isotope_decay_table.positron_fractions()?;

        Ok(Self {
            settings,
            grid,
            isotope_decay_table,
            taus,
            positron_fractions,
            positronium: PositroniumSampler::new(),
        })
    }

    /// Draw `number_of_packets` gamma rows with replacement, weighted by decay energy.
    ///
    /// Uses its own stream of `base_seed`, so the drawn rows depend only on
    /// the settings and the table.
    pub fn sample_decay_rows(&self) -> Result<Vec<&DecayRow>> {
        let gamma_rows = self.isotope_decay_table.gamma_rows();
        let weights = WeightedIndex::new(gamma_rows.iter().map(|row| row.decay_energy_erg))?;
        let mut draw_rng = PacketRng::stream(self.settings.base_seed, WEIGHTED_DRAW_STREAM);
        Ok((0..self.settings.number_of_packets)
            .map(|_| gamma_rows[weights.sample(&mut draw_rng)])
            .collect())
    }

    /// Volume-uniform radii (cm/s) in each sampled row's shell
    pub fn create_packet_radii(&self, sampled: &[&DecayRow], rng: &mut dyn RngCore) -> Vec<f64> {
        sampled
            .iter()
            .map(|row| {
                let (inner, outer) = self.grid.shell_bounds(row.shell_number);
                sample_shell_radius(inner, outer, rng)
            })
            .collect()
    }

    /// Row line energies with positronium branching applied
    pub fn create_packet_nus(&self, sampled: &[&DecayRow], rng: &mut dyn RngCore) -> Vec<PhotonDraw> {
        sampled
            .iter()
            .map(|row| {
                apply_positronium(
                    row.radiation_energy_kev,
                    self.settings.positronium_fraction,
                    &self.positronium,
                    rng,
                )
            })
            .collect()
    }

    /// Continuous decay times inside each sampled row's time step
    pub fn create_packet_times_uniform_energy(
        &self,
        sampled: &[&DecayRow],
        rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>> {
        sampled
            .iter()
            .map(|row| {
                let tau = self.taus.get(&row.isotope).copied().ok_or_else(|| {
                    SourceError::MissingIsotope {
                        isotope: row.isotope.clone(),
                        table: "lifetime",
                    }
                })?;
                let (min, max) = self.grid.bucket_bounds(row.time_index);
                sample_bucketed_decay_time(
                    &row.isotope,
                    tau,
                    min,
                    max,
                    self.settings.max_rejection_attempts,
                    rng,
                )
            })
            .collect()
    }

    /// Positron fraction of each sampled row's isotope
    pub fn calculate_positron_fraction(&self, sampled: &[&DecayRow]) -> Vec<f64> {
        sampled
            .iter()
            .map(|row| DecayTable::positron_fraction(&self.positron_fractions, &row.isotope))
            .collect()
    }
}

impl PacketSource for GammaRayPacketSource {
    fn packet_energy(&self) -> f64 {
        self.settings.packet_energy
    }

    fn ledger_shape(&self) -> (usize, usize) {
        (self.grid.number_of_shells(), self.grid.number_of_time_steps())
    }

    /// Draws, in order: radii, placement directions, travel directions,
    /// decay times, then line energies.
    fn create_packets(
        &self,
        ledger: &mut DepositionLedger,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedPackets> {
        self.check_ledger(ledger)?;

        let sampled = self.sample_decay_rows()?;
        let no_of_packets = sampled.len();
        debug!(
            packets = no_of_packets,
            rows = self.isotope_decay_table.gamma_rows().len(),
            seed = self.settings.base_seed,
            "sampled decay rows"
        );

        let positron_fractions = self.calculate_positron_fraction(&sampled);
        let radii = self.create_packet_radii(&sampled, rng);
        let placements = self.create_packet_directions(no_of_packets, rng);
        let effective_times: Vec<f64> = sampled
            .iter()
            .map(|row| self.grid.effective_times[row.time_index])
            .collect();
        let locations: Vec<Vector3<f64>> = radii
            .iter()
            .zip(&placements)
            .zip(&effective_times)
            .map(|((&radius, placement), &effective_time)| placement * (radius * effective_time))
            .collect();
        let directions = self.create_packet_directions(no_of_packets, rng);
        let times = self.create_packet_times_uniform_energy(&sampled, rng)?;
        let photons = self.create_packet_nus(&sampled, rng);
        let energies = self.create_packet_energies(no_of_packets);
        // Flow velocity is location / effective time, the packet's shell velocity
        let doppler_factors = doppler_factor_3d_all_packets(&directions, &locations, &effective_times);

        let mut generated = GeneratedPackets::with_capacity(no_of_packets);
        for (i, row) in sampled.iter().enumerate() {
            let nu_cmf = kev_to_frequency(photons[i].energy_kev);
            let positron_energy = positron_fractions[i] * energies[i];

            generated.positron_rows.push(PositronRow {
                packet_index: i,
                positron_energy,
                initial_radius: radii[i],
                decay_time: times[i],
            });
            generated.packets.push(GXPacket {
                location: locations[i],
                direction: directions[i],
                energy_rf: energies[i] / doppler_factors[i],
                energy_cmf: energies[i],
                nu_rf: nu_cmf / doppler_factors[i],
                nu_cmf,
                status: PacketStatus::InProcess,
                shell: row.shell_number,
                time_start: times[i],
                time_index: Some(row.time_index),
            })?;
            generated.positron_mask.push(photons[i].from_positron);
            ledger.deposit(row.shell_number, row.time_index, positron_energy)?;
        }
        generated.positron_fractions = positron_fractions;

        info!(
            packets = generated.len(),
            positron_packets = generated.positron_count(),
            deposited = ledger.total(),
            "created gamma-ray packets"
        );
        Ok(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decay::RadiationType;
    use crate::doppler::doppler_factor_3d;
    use approx::assert_relative_eq;

    const DAY: f64 = 86400.0;

    fn grid() -> EjectaGrid {
        EjectaGrid::new(
            vec![1.0e8, 5.0e8],
            vec![5.0e8, 1.0e9],
            vec![5.0 * DAY, 10.0 * DAY, 20.0 * DAY],
            vec![7.0 * DAY, 14.0 * DAY, 25.0 * DAY],
        )
        .unwrap()
    }

    fn gamma(isotope: &str, shell: usize, time_index: usize, energy_kev: f64, weight: f64) -> DecayRow {
        DecayRow {
            isotope: isotope.to_string(),
            shell_number: shell,
            time_index,
            radiation: RadiationType::Gamma,
            radiation_energy_kev: energy_kev,
            decay_energy_erg: weight,
            energy_per_channel_kev: energy_kev,
        }
    }

    fn taus() -> BTreeMap<String, f64> {
        BTreeMap::from([("Ni56".to_string(), 8.8 * DAY), ("Co56".to_string(), 111.3 * DAY)])
    }

    fn settings(number_of_packets: usize) -> Settings {
        Settings {
            number_of_packets,
            ..Settings::new(1.0e40, 0.0)
        }
    }

    #[test]
    fn test_packets_follow_sampled_rows() {
        let table = DecayTable::new(vec![
            gamma("Ni56", 0, 0, 158.38, 3.0),
            gamma("Co56", 1, 2, 846.77, 1.0),
        ]);
        let source = GammaRayPacketSource::new(settings(2000), grid(), table, taus()).unwrap();
        let mut ledger = source.new_ledger();
        let mut rng = PacketRng::new(9);
        let generated = source.create_packets(&mut ledger, &mut rng).unwrap();

        assert_eq!(generated.len(), 2000);
        let time_indices = generated.packets.time_indices.clone().unwrap();
        for (i, packet) in generated.packets.iter().enumerate() {
            let energy = generated.packets.photon_energy_cmf_kev(i);
            if packet.shell == 0 {
                assert_eq!(time_indices[i], 0);
                assert_relative_eq!(energy, 158.38, max_relative = 1e-12);
                assert!(packet.time_start > 5.0 * DAY && packet.time_start < 10.0 * DAY);
                let r = packet.location.norm() / (7.0 * DAY);
                assert!(r >= 1.0e8 * (1.0 - 1e-12) && r <= 5.0e8 * (1.0 + 1e-12));
            } else {
                assert_eq!(time_indices[i], 2);
                assert_relative_eq!(energy, 846.77, max_relative = 1e-12);
                // last bucket runs to the final effective time
                assert!(packet.time_start > 20.0 * DAY && packet.time_start < 25.0 * DAY);
            }
            assert_eq!(packet.energy_cmf, 1.0e40);
        }
        let shell_zero = generated.packets.shells.iter().filter(|&&s| s == 0).count();
        let frac = shell_zero as f64 / 2000.0;
        assert!((frac - 0.75).abs() < 0.04, "shell 0 fraction {}", frac);
    }

    #[test]
    fn test_doppler_flow_velocity_stays_in_shell() {
        let grid = EjectaGrid::new(
            vec![1.0e8],
            vec![5.0e8],
            vec![5.0 * DAY, 10.0 * DAY],
            vec![7.0 * DAY, 12.0 * DAY],
        )
        .unwrap();
        let table = DecayTable::new(vec![gamma("Ni56", 0, 0, 158.38, 1.0)]);
        let source = GammaRayPacketSource::new(settings(2000), grid, table, taus()).unwrap();
        let mut ledger = source.new_ledger();
        let mut rng = PacketRng::new(13);
        let generated = source.create_packets(&mut ledger, &mut rng).unwrap();

        for packet in generated.packets.iter() {
            let effective_time = 7.0 * DAY;
            let flow_velocity = packet.location.norm() / effective_time;
            assert!(flow_velocity >= 1.0e8 * (1.0 - 1e-12) && flow_velocity <= 5.0e8 * (1.0 + 1e-12));
            let doppler = doppler_factor_3d(&packet.direction, &packet.location, effective_time);
            assert_relative_eq!(packet.energy_rf * doppler, packet.energy_cmf, max_relative = 1e-12);
            assert_relative_eq!(packet.nu_rf * doppler, packet.nu_cmf, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_row_draw_uses_declared_seed() {
        let table = DecayTable::new(vec![
            gamma("Ni56", 0, 0, 158.38, 1.0),
            gamma("Ni56", 1, 1, 158.38, 1.0),
        ]);
        let source = GammaRayPacketSource::new(settings(100), grid(), table, taus()).unwrap();
        let first: Vec<usize> = source.sample_decay_rows().unwrap().iter().map(|r| r.shell_number).collect();
        let second: Vec<usize> = source.sample_decay_rows().unwrap().iter().map(|r| r.shell_number).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_positron_fractions_and_ledger() {
        let mut positron = gamma("Co56", 0, 0, 0.0, 1.0);
        positron.radiation = RadiationType::BetaPlus;
        positron.energy_per_channel_kev = 100.0;
        let table = DecayTable::new(vec![
            gamma("Co56", 0, 1, 511.0, 1.0),
            gamma("Co56", 0, 0, 400.0, 0.0),
            positron,
        ]);
        let source = GammaRayPacketSource::new(settings(50), grid(), table, taus()).unwrap();
        let mut ledger = source.new_ledger();
        let mut rng = PacketRng::new(2);
        let generated = source.create_packets(&mut ledger, &mut rng).unwrap();

        let fraction = 100.0 / 911.0;
        assert!(generated.positron_fractions.iter().all(|&f| f == fraction));
        assert!(generated.positron_mask.iter().all(|&p| p));
        assert_relative_eq!(ledger.get(0, 1), 50.0 * fraction * 1.0e40, max_relative = 1e-12);
        assert_eq!(ledger.get(0, 0), 0.0);
    }

    #[test]
    fn test_construction_errors() {
        let table = DecayTable::new(vec![gamma("Ni56", 0, 0, 158.38, 1.0)]);
        assert!(matches!(
            GammaRayPacketSource::new(settings(0), grid(), table.clone(), taus()),
            Err(SourceError::NoPackets)
        ));
        assert!(matches!(
            GammaRayPacketSource::new(settings(10), grid(), table.clone(), BTreeMap::new()),
            Err(SourceError::MissingIsotope { .. })
        ));

        let mut positron_only = gamma("Ni56", 0, 0, 0.0, 1.0);
        positron_only.radiation = RadiationType::BetaPlus;
        assert!(matches!(
            GammaRayPacketSource::new(settings(10), grid(), DecayTable::new(vec![positron_only]), taus()),
            Err(SourceError::NoGammaRows)
        ));

        let nan_weight = DecayTable::new(vec![gamma("Ni56", 0, 0, 158.38, f64::NAN)]);
        assert!(matches!(
            GammaRayPacketSource::new(settings(10), grid(), nan_weight, taus()),
            Err(SourceError::InvalidDecayRow { .. })
        ));

        let mut flat = grid();
        flat.effective_times[2] = flat.times[2];
        let last_bucket = DecayTable::new(vec![gamma("Ni56", 0, 2, 158.38, 1.0)]);
        assert!(matches!(
            GammaRayPacketSource::new(settings(10), flat, last_bucket, taus()),
            Err(SourceError::DegenerateTimeWindow { .. })
        ));
    }

    #[test]
    fn test_all_zero_weights_fail_to_sample() {
        let table = DecayTable::new(vec![gamma("Ni56", 0, 0, 158.38, 0.0)]);
        let source = GammaRayPacketSource::new(settings(10), grid(), table, taus()).unwrap();
        let mut ledger = source.new_ledger();
        let mut rng = PacketRng::new(1);
        assert!(matches!(
            source.create_packets(&mut ledger, &mut rng),
            Err(SourceError::WeightedSampling(_))
        ));
    }
}
