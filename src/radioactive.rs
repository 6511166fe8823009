//! Fixed-count packet source.
//!
//! Each isotope contributes a given number of packets per shell. Decay times
//! follow the parent-daughter chain, restricted to the simulated window.

use rand::distributions::Distribution;
use rand::RngCore;
use tracing::{debug, info, warn};

use crate::constants::kev_to_frequency;
use crate::decay::{IsotopeCatalog, IsotopeShellCounts};
use crate::doppler::doppler_factor_3d;
use crate::error::{Result, SourceError};
use crate::geometry::EjectaGrid;
use crate::ledger::{DepositionLedger, PositronRow};
use crate::packet::{GXPacket, PacketStatus};
use crate::positronium::{apply_positronium, PhotonDraw, PositroniumSampler};
use crate::settings::Settings;
use crate::source::{
    calculate_energy_factor, create_packet_radii, sample_chained_decay_time, GeneratedPackets,
    PacketSource,
};
use crate::stats::LineSpectrum;

#[derive(Debug, Clone)]
pub struct RadioactivePacketSource {
    pub settings: Settings,
    pub grid: EjectaGrid,
    pub catalog: IsotopeCatalog,
    pub decays_per_isotope: IsotopeShellCounts,
    positronium: PositroniumSampler,
}

impl RadioactivePacketSource {
    /// Build a source, checking every input before any packet is drawn.
    ///
    /// Each isotope named in `decays_per_isotope` needs a lifetime, a line
    /// spectrum and an average positron energy in `catalog`; a listed parent
    /// needs a lifetime as well.
    pub fn new(
        settings: Settings,
        grid: EjectaGrid,
        catalog: IsotopeCatalog,
        decays_per_isotope: IsotopeShellCounts,
    ) -> Result<Self> {
        settings.validate()?;
        grid.validate()?;
        decays_per_isotope.validate(grid.number_of_shells())?;

        for isotope in decays_per_isotope.isotopes() {
            catalog.tau(isotope)?;
            catalog.parent_tau(isotope)?;
            let fraction = catalog.positron_fraction(isotope)?;
            if !(fraction.is_finite() && fraction >= 0.0) {
                return Err(SourceError::InvalidSpectrum {
                    isotope: isotope.to_string(),
                    reason: format!("positron fraction {} is not usable", fraction),
                });
            }
        }

        Ok(Self {
            settings,
            grid,
            catalog,
            decays_per_isotope,
            positronium: PositroniumSampler::new(),
        })
    }

    /// Volume-uniform radii (cm/s) inside `shell`
    pub fn create_packet_radii(&self, no_of_packets: usize, shell: usize, rng: &mut dyn RngCore) -> Vec<f64> {
        let (inner, outer) = self.grid.shell_bounds(shell);
        create_packet_radii(no_of_packets, inner, outer, rng)
    }

    /// Line energies with positronium branching applied to the 511 keV line
    pub fn create_packet_nus(
        &self,
        no_of_packets: usize,
        lines: &LineSpectrum,
        rng: &mut dyn RngCore,
    ) -> Vec<PhotonDraw> {
        (0..no_of_packets)
            .map(|_| {
                let line = lines.sample(rng);
                apply_positronium(line, self.settings.positronium_fraction, &self.positronium, rng)
            })
            .collect()
    }

    /// Chained decay times in `(0, last time edge)`
    pub fn create_packet_times_uniform_energy(
        &self,
        no_of_packets: usize,
        isotope: &str,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>> {
        let tau_start = self.catalog.tau(isotope)?;
        let tau_end = self.catalog.parent_tau(isotope)?;
        (0..no_of_packets)
            .map(|_| {
                sample_chained_decay_time(
                    isotope,
                    tau_start,
                    tau_end,
                    0.0,
                    self.grid.end_time(),
                    self.settings.max_rejection_attempts,
                    rng,
                )
            })
            .collect()
    }

    /// Energy factors for decays before the first time edge.
    ///
    /// Early times in `times` are moved to the first edge in place.
    pub fn calculate_energy_factors(&self, times: &mut [f64]) -> Vec<f64> {
        let start_time = self.grid.start_time();
        times
            .iter_mut()
            .map(|time| {
                let (factor, admitted) = calculate_energy_factor(start_time, *time);
                *time = admitted;
                factor
            })
            .collect()
    }
}

impl PacketSource for RadioactivePacketSource {
    fn packet_energy(&self) -> f64 {
        self.settings.packet_energy
    }

    fn ledger_shape(&self) -> (usize, usize) {
        (self.grid.number_of_shells(), self.grid.number_of_time_steps())
    }

    /// Packets shell by shell, isotope by isotope in name order.
    ///
    /// Per batch the draws are: radii, travel directions, decay times,
    /// placement directions, then line energies.
    fn create_packets(
        &self,
        ledger: &mut DepositionLedger,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedPackets> {
        self.check_ledger(ledger)?;

        let total = self.decays_per_isotope.total();
        let mut generated = GeneratedPackets::with_capacity(total);
        let mut rescaled = 0usize;

        for shell in 0..self.grid.number_of_shells() {
            for isotope in self.decays_per_isotope.isotopes() {
                let no_of_packets = self.decays_per_isotope.count(isotope, shell);
                if no_of_packets == 0 {
                    continue;
                }
                debug!(shell, isotope, packets = no_of_packets, "creating packet batch");

                let lines = self.catalog.lines(isotope)?;
                let positron_fraction = self.catalog.positron_fraction(isotope)?;
                let positron_energy = positron_fraction * self.packet_energy();

                let radii = self.create_packet_radii(no_of_packets, shell, rng);
                let directions = self.create_packet_directions(no_of_packets, rng);
                let decay_times = self.create_packet_times_uniform_energy(no_of_packets, isotope, rng)?;
                let time_indices: Vec<usize> = decay_times
                    .iter()
                    .map(|&time| self.grid.time_index(time))
                    .collect();
                let placements = self.create_packet_directions(no_of_packets, rng);
                let photons = self.create_packet_nus(no_of_packets, lines, rng);

                let mut times = decay_times;
                let energy_factors = self.calculate_energy_factors(&mut times);
                let energies = self.create_packet_energies(no_of_packets);

                for i in 0..no_of_packets {
                    if energy_factors[i] < 1.0 {
                        rescaled += 1;
                    }
                    let time_index = time_indices[i];
                    let effective_time = self.grid.effective_times[time_index];
                    let location = placements[i] * (radii[i] * effective_time);
                    let energy_cmf = energies[i] * energy_factors[i];
                    let nu_cmf = kev_to_frequency(photons[i].energy_kev);
                    let doppler = doppler_factor_3d(&directions[i], &location, effective_time);

                    generated.positron_rows.push(PositronRow {
                        packet_index: generated.len(),
                        positron_energy,
                        initial_radius: radii[i],
                        decay_time: times[i],
                    });
                    generated.packets.push(GXPacket {
                        location,
                        direction: directions[i],
                        energy_rf: energy_cmf / doppler,
                        energy_cmf,
                        nu_rf: nu_cmf / doppler,
                        nu_cmf,
                        status: PacketStatus::InProcess,
                        shell,
                        time_start: times[i],
                        time_index: None,
                    })?;
                    generated.positron_mask.push(photons[i].from_positron);
                    generated.positron_fractions.push(positron_fraction);
                    ledger.deposit(shell, time_index, positron_energy)?;
                }
            }
        }

        if rescaled > 0 {
            warn!(
                packets = rescaled,
                start_time = self.grid.start_time(),
                "decays before the first time step moved to it with reduced energy"
            );
        }
        info!(
            packets = generated.len(),
            positron_packets = generated.positron_count(),
            deposited = ledger.total(),
            "created radioactive packets"
        );
        Ok(generated)
    }
}
