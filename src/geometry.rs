use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SourceError};
use crate::utilities::get_index;

/// Homologous ejecta geometry and the simulation time grid.
///
/// Shells are described by velocity boundaries (cm/s); a point at velocity
/// `v` sits at radius `v * t` at time `t`. `times` are the time-step edges
/// (s) and `effective_times` the representative time of each step, one per
/// entry of `times`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EjectaGrid {
    pub inner_velocities: Vec<f64>,
    pub outer_velocities: Vec<f64>,
    pub times: Vec<f64>,
    pub effective_times: Vec<f64>,
}

impl EjectaGrid {
    /// Create a grid, validating shell and time arrays
    pub fn new(
        inner_velocities: Vec<f64>,
        outer_velocities: Vec<f64>,
        times: Vec<f64>,
        effective_times: Vec<f64>,
    ) -> Result<Self> {
        let grid = Self {
            inner_velocities,
            outer_velocities,
            times,
            effective_times,
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<()> {
        if self.inner_velocities.is_empty() {
            return Err(SourceError::InvalidGrid("no shells".to_string()));
        }
        if self.inner_velocities.len() != self.outer_velocities.len() {
            return Err(SourceError::InvalidGrid(format!(
                "{} inner velocities but {} outer velocities",
                self.inner_velocities.len(),
                self.outer_velocities.len()
            )));
        }
        for (shell, (&inner, &outer)) in self
            .inner_velocities
            .iter()
            .zip(&self.outer_velocities)
            .enumerate()
        {
            if !(inner >= 0.0 && inner < outer && outer.is_finite()) {
                return Err(SourceError::InvalidGrid(format!(
                    "shell {} has velocity bounds [{}, {}]",
                    shell, inner, outer
                )));
            }
        }
        if self.times.is_empty() {
            return Err(SourceError::InvalidGrid("empty time grid".to_string()));
        }
        if self.times.windows(2).any(|w| !(w[1] > w[0])) || !self.times[0].is_finite() {
            return Err(SourceError::InvalidGrid(
                "time grid must be strictly increasing".to_string(),
            ));
        }
        if self.effective_times.len() != self.times.len() {
            return Err(SourceError::InvalidGrid(format!(
                "{} effective times for {} time steps",
                self.effective_times.len(),
                self.times.len()
            )));
        }
        if self.effective_times.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
            return Err(SourceError::InvalidGrid(
                "effective times must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn number_of_shells(&self) -> usize {
        self.inner_velocities.len()
    }

    pub fn number_of_time_steps(&self) -> usize {
        self.times.len()
    }

    pub fn start_time(&self) -> f64 {
        self.times[0]
    }

    pub fn end_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Time step holding `time`, see [`get_index`]
    pub fn time_index(&self, time: f64) -> usize {
        get_index(time, &self.times)
    }

    /// Decay-time interval of a time step, `[times[i], times[i + 1])`.
    ///
    /// The last step runs from the last edge to its effective time.
    pub fn bucket_bounds(&self, time_index: usize) -> (f64, f64) {
        let last = self.times.len() - 1;
        if time_index >= last {
            (self.times[last], self.effective_times[last])
        } else {
            (self.times[time_index], self.times[time_index + 1])
        }
    }

    /// Velocity boundaries of a shell
    pub fn shell_bounds(&self, shell: usize) -> (f64, f64) {
        (self.inner_velocities[shell], self.outer_velocities[shell])
    }
}

/// Sample a radius uniformly in volume between two bounds.
///
/// Inverse CDF of p(r) ∝ r² on [inner, outer].
pub fn sample_shell_radius<R: Rng + ?Sized>(inner: f64, outer: f64, rng: &mut R) -> f64 {
    let z: f64 = rng.gen();
    (z * inner.powi(3) + (1.0 - z) * outer.powi(3)).cbrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn two_shell_grid() -> EjectaGrid {
        EjectaGrid::new(
            vec![1.0e8, 2.0e8],
            vec![2.0e8, 3.0e8],
            vec![10.0, 20.0, 40.0],
            vec![15.0, 30.0, 50.0],
        )
        .unwrap()
    }

    #[test]
    fn test_grid_accessors() {
        let grid = two_shell_grid();
        assert_eq!(grid.number_of_shells(), 2);
        assert_eq!(grid.number_of_time_steps(), 3);
        assert_eq!(grid.start_time(), 10.0);
        assert_eq!(grid.end_time(), 40.0);
        assert_eq!(grid.shell_bounds(1), (2.0e8, 3.0e8));
    }

    #[test]
    fn test_bucket_bounds() {
        let grid = two_shell_grid();
        assert_eq!(grid.bucket_bounds(0), (10.0, 20.0));
        assert_eq!(grid.bucket_bounds(1), (20.0, 40.0));
        assert_eq!(grid.bucket_bounds(2), (40.0, 50.0));
    }

    #[test]
    fn test_time_index() {
        let grid = two_shell_grid();
        assert_eq!(grid.time_index(5.0), 0);
        assert_eq!(grid.time_index(25.0), 1);
        assert_eq!(grid.time_index(45.0), 2);
    }

    #[test]
    fn test_invalid_grids() {
        assert!(EjectaGrid::new(vec![], vec![], vec![1.0], vec![1.0]).is_err());
        assert!(EjectaGrid::new(vec![1.0], vec![1.0], vec![1.0], vec![1.0]).is_err());
        assert!(EjectaGrid::new(vec![1.0], vec![2.0, 3.0], vec![1.0], vec![1.0]).is_err());
        assert!(EjectaGrid::new(vec![1.0], vec![2.0], vec![2.0, 1.0], vec![1.0, 1.5]).is_err());
        assert!(EjectaGrid::new(vec![1.0], vec![2.0], vec![1.0, 2.0], vec![1.5]).is_err());
        assert!(EjectaGrid::new(vec![1.0], vec![2.0], vec![1.0, 1.0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn test_shell_radius_within_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..1000 {
            let r = sample_shell_radius(1.0, 2.0, &mut rng);
            assert!((1.0..=2.0).contains(&r));
        }
    }

    #[test]
    fn test_shell_radius_uniform_in_volume() {
        // Half the volume of [0, 1] lies outside r = 0.5^(1/3)
        let mut rng = StdRng::seed_from_u64(10);
        let n = 20000;
        let r_half = 0.5f64.cbrt();
        let outer = (0..n)
            .filter(|_| sample_shell_radius(0.0, 1.0, &mut rng) > r_half)
            .count();
        let frac = outer as f64 / n as f64;
        assert!((frac - 0.5).abs() < 0.02, "outer-volume fraction {}", frac);
    }
}
