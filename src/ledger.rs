use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceError};

/// Positron kinetic energy deposited locally, per shell and time step.
///
/// Positrons are assumed to stop where they are emitted, so their energy is
/// scored at creation time. Entries only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositionLedger {
    number_of_shells: usize,
    number_of_time_steps: usize,
    /// Row-major (shell, time step) energies
    data: Vec<f64>,
}

impl DepositionLedger {
    pub fn new(number_of_shells: usize, number_of_time_steps: usize) -> Self {
        Self {
            number_of_shells,
            number_of_time_steps,
            data: vec![0.0; number_of_shells * number_of_time_steps],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.number_of_shells, self.number_of_time_steps)
    }

    /// Add `energy` to the (shell, time step) cell.
    ///
    /// Negative, non-finite and out-of-range deposits are refused so the
    /// ledger stays monotone.
    pub fn deposit(&mut self, shell: usize, time_index: usize, energy: f64) -> Result<()> {
        if shell >= self.number_of_shells || time_index >= self.number_of_time_steps {
            return Err(SourceError::InvalidGrid(format!(
                "deposit at ({}, {}) outside ledger of shape ({}, {})",
                shell, time_index, self.number_of_shells, self.number_of_time_steps
            )));
        }
        if !(energy.is_finite() && energy >= 0.0) {
            return Err(SourceError::InvalidSettings(format!(
                "positron deposit must be finite and non-negative, got {}",
                energy
            )));
        }
        self.data[shell * self.number_of_time_steps + time_index] += energy;
        Ok(())
    }

    pub fn get(&self, shell: usize, time_index: usize) -> f64 {
        self.data[shell * self.number_of_time_steps + time_index]
    }

    /// Energies of one shell across all time steps
    pub fn shell_row(&self, shell: usize) -> &[f64] {
        let start = shell * self.number_of_time_steps;
        &self.data[start..start + self.number_of_time_steps]
    }

    pub fn shell_total(&self, shell: usize) -> f64 {
        self.shell_row(shell).iter().sum()
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Add a partial ledger into this one, cell by cell.
    ///
    /// Summing partial ledgers in a fixed order gives the same totals no
    /// matter which order they were filled in.
    pub fn merge(&mut self, other: &DepositionLedger) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(SourceError::InvalidGrid(format!(
                "cannot merge ledger of shape {:?} into {:?}",
                other.shape(),
                self.shape()
            )));
        }
        for (mine, theirs) in self.data.iter_mut().zip(&other.data) {
            *mine += theirs;
        }
        Ok(())
    }
}

impl fmt::Display for DepositionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Positron deposition ({} shells x {} time steps)",
            self.number_of_shells, self.number_of_time_steps
        )?;
        for shell in 0..self.number_of_shells {
            writeln!(f, "  shell {}: {:.6e}", shell, self.shell_total(shell))?;
        }
        write!(f, "  total: {:.6e}", self.total())
    }
}

/// Diagnostic record of the positron energy behind one packet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositronRow {
    pub packet_index: usize,
    pub positron_energy: f64,
    /// Radius sampled at time zero, in velocity units (cm/s)
    pub initial_radius: f64,
    pub decay_time: f64,
}
