// Co-moving to rest frame transformation for homologous flows

use nalgebra::Vector3;

use crate::constants::C_CGS;

/// First-order Doppler factor of a packet.
///
/// In homologous expansion the local flow velocity is `location / time`, so
/// the factor is `1 - (direction · v) / c`. Rest-frame quantities follow as
/// `x_rf = x_cmf / doppler_factor`.
#[inline]
pub fn doppler_factor_3d(direction: &Vector3<f64>, location: &Vector3<f64>, time: f64) -> f64 {
    let velocity = location / time;
    1.0 - direction.dot(&velocity) / C_CGS
}

/// Doppler factors for a whole packet set.
///
/// Applies [`doppler_factor_3d`] element by element so batch and single-packet
/// results are bit-identical.
pub fn doppler_factor_3d_all_packets(
    directions: &[Vector3<f64>],
    locations: &[Vector3<f64>],
    times: &[f64],
) -> Vec<f64> {
    debug_assert_eq!(directions.len(), locations.len());
    debug_assert_eq!(directions.len(), times.len());
    directions
        .iter()
        .zip(locations)
        .zip(times)
        .map(|((direction, location), &time)| doppler_factor_3d(direction, location, time))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::sample_isotropic_direction;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_radial_motion() {
        // Moving outward along the flow at 0.1 c
        let time = 100.0;
        let location = Vector3::new(0.1 * C_CGS * time, 0.0, 0.0);
        let outward = Vector3::new(1.0, 0.0, 0.0);
        let inward = -outward;
        assert_relative_eq!(doppler_factor_3d(&outward, &location, time), 0.9, epsilon = 1e-12);
        assert_relative_eq!(doppler_factor_3d(&inward, &location, time), 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_perpendicular_motion_is_unshifted() {
        let location = Vector3::new(0.0, 3.0e9, 0.0);
        let direction = Vector3::new(0.0, 0.0, 1.0);
        assert_eq!(doppler_factor_3d(&direction, &location, 1.0), 1.0);
    }

    #[test]
    fn test_batch_matches_scalar() {
        let mut rng = StdRng::seed_from_u64(3);
        let n = 200;
        let directions: Vec<_> = (0..n).map(|_| sample_isotropic_direction(&mut rng)).collect();
        let locations: Vec<_> = (0..n)
            .map(|i| sample_isotropic_direction(&mut rng) * 1.0e14 * (i + 1) as f64)
            .collect();
        let times: Vec<f64> = (0..n).map(|i| 86400.0 * (1.0 + i as f64)).collect();

        let batch = doppler_factor_3d_all_packets(&directions, &locations, &times);
        for i in 0..n {
            assert_eq!(batch[i], doppler_factor_3d(&directions[i], &locations[i], times[i]));
        }
    }
}
