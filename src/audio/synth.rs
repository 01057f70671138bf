//! Synthetic audio used when no real capture source is available

use crate::audio::pcm::{Pcm16Block, PCM_WINDOW};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Peak magnitude of generated samples (2^14)
const AMPLITUDE: f32 = 16384.0;

/// Random-noise generator producing one stereo 16-bit window per tick
pub struct SyntheticAudio {
    rng: SmallRng,
}

impl SyntheticAudio {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Deterministic generator for reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Generate the next window
    ///
    /// Magnitudes are uniform in [0, 2^14], every odd sample is negated
    /// so the signal alternates around zero.
    pub fn next_block(&mut self) -> Pcm16Block {
        let mut block = [[0i16; PCM_WINDOW]; 2];
        for channel in block.iter_mut() {
            for (i, sample) in channel.iter_mut().enumerate() {
                let magnitude = (self.rng.random::<f32>() * AMPLITUDE) as i16;
                *sample = if i % 2 == 1 { -magnitude } else { magnitude };
            }
        }
        block
    }
}

impl Default for SyntheticAudio {
    fn default() -> Self {
        Self::new()
    }
}
