// Seedable random stream for packet generation.
//
// A PCG-LCG generator (same LCG constants as OpenMC's random_lcg.cpp) with
// the RXS-M-XS output permutation. Streams derived from one declared seed let
// the weighted decay draw and the per-packet samplers stay independent while
// remaining reproducible from a single number.

use rand::{RngCore, SeedableRng};

const PRN_MULT: u64 = 6364136223846793005;
const PRN_ADD: u64 = 1442695040888963407;
const PERMUTE_MULT: u64 = 12605985483714917081;

/// Explicit random stream handed to every sampler.
///
/// Implements [`RngCore`], so `rand::Rng` methods and `rand_distr`
/// distributions work on it directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketRng {
    state: u64,
}

impl PacketRng {
    /// Create a stream from a seed
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Derive the `stream_id`-th independent stream of `seed`.
    ///
    /// The state is scrambled with a splitmix64 finalizer so neighbouring
    /// stream ids do not produce correlated sequences.
    pub fn stream(seed: u64, stream_id: u64) -> Self {
        let mut z = seed
            .wrapping_add(stream_id.wrapping_mul(0x9E3779B97F4A7C15))
            .wrapping_add(0x9E3779B97F4A7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        Self::new(z ^ (z >> 31))
    }

    /// Uniform f64 in [0, 1)
    #[inline(always)]
    pub fn uniform(&mut self) -> f64 {
        // 53 high bits into the mantissa
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    #[inline(always)]
    fn advance(&mut self) -> u64 {
        self.state = PRN_MULT.wrapping_mul(self.state).wrapping_add(PRN_ADD);
        let word = ((self.state >> ((self.state >> 59) + 5)) ^ self.state)
            .wrapping_mul(PERMUTE_MULT);
        (word >> 43) ^ word
    }
}

impl SeedableRng for PacketRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}

impl RngCore for PacketRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        (self.advance() >> 32) as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        self.advance()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.advance().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
