//! Multi-octave fractal Brownian motion (fBm) heightmap sampler.
//!
//! Composites multiple octaves of simplex noise to produce natural-looking
//! terrain height values with features at many spatial frequencies.

use noise::{NoiseFn, Simplex};

/// Configuration for multi-octave fBm noise used in heightmap generation.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightmapParams {
    /// World seed for deterministic generation.
    pub seed: u64,
    /// Number of noise octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first (lowest) octave, in cycles per block.
    pub base_frequency: f64,
    /// Amplitude of the first octave, in blocks.
    pub amplitude: f64,
    /// Height of the zero level the noise oscillates around, in blocks.
    pub base_height: f64,
}

impl Default for HeightmapParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            amplitude: 24.0,
            base_frequency: 0.01,
            base_height: 48.0,
        }
    }
}

/// Generates terrain height values using fractal Brownian motion over simplex noise.
pub struct HeightmapSampler {
    noise: Simplex,
    params: HeightmapParams,
}

impl HeightmapSampler {
    /// Create a new sampler with the given parameters.
    pub fn new(params: HeightmapParams) -> Self {
        // Fold the high bits in so 64-bit seeds differing only above bit 32 still diverge.
        let noise = Simplex::new((params.seed ^ (params.seed >> 32)) as u32);
        Self { noise, params }
    }

    /// Raw fBm value at world column `(x, z)`, in `[-max_amplitude, max_amplitude]`.
    pub fn sample(&self, x: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = self.params.amplitude;

        for _ in 0..self.params.octaves {
            total += self.noise.get([x * frequency, z * frequency]) * amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        total
    }

    /// Y of the topmost solid block in the column at `(x, z)`.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        (self.params.base_height + self.sample(x as f64, z as f64)).floor() as i32
    }

    /// Theoretical maximum absolute amplitude (geometric series sum).
    pub fn max_amplitude(&self) -> f64 {
        let mut sum = 0.0;
        let mut amp = self.params.amplitude;
        for _ in 0..self.params.octaves {
            sum += amp;
            amp *= self.params.persistence;
        }
        sum
    }

    /// Return a reference to the current parameters.
    pub fn params(&self) -> &HeightmapParams {
        &self.params
    }
}
