//! Deterministic seed derivation for the noise layers.
//!
//! Every noise layer draws its seed from the world seed and a fixed stream id,
//! so layers are decorrelated from each other but identical across runs,
//! threads and platforms.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Added to the world seed to form the height-shape noise stream of every
/// generator. Keeps generator weights independent of the layout layers.
pub const GENERATOR_HEIGHT_SEED_OFFSET: u64 = 239_945;

/// Stream ids of the layout noise layers.
pub mod stream {
    /// Horizontal coordinate warp, x component.
    pub const FRACTURE_X: u64 = 13;
    /// Horizontal coordinate warp, z component.
    pub const FRACTURE_Z: u64 = 14;
    /// Region cell layer.
    pub const REGION: u64 = 1;
    /// Continent (land/sea) layer.
    pub const CONTINENT: u64 = 2;
    /// Top-level biome cell layer.
    pub const BIOME: u64 = 3;
    /// First child-biome cell layer; level `n` uses `CHILD + n`.
    pub const CHILD: u64 = 64;
}

const STREAM_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Derive the 64-bit seed of a noise stream.
pub fn derive_seed64(world_seed: u64, stream: u64) -> u64 {
    let mut rng = ChaCha8Rng::seed_from_u64(world_seed ^ stream.wrapping_mul(STREAM_MIX));
    rng.next_u64()
}

/// Derive the 32-bit seed expected by the `noise` crate for a stream.
pub fn derive_seed(world_seed: u64, stream: u64) -> u32 {
    let mut rng = ChaCha8Rng::seed_from_u64(world_seed ^ stream.wrapping_mul(STREAM_MIX));
    rng.next_u32()
}

/// Seed of a generator's height-shape noise stream.
pub fn generator_seed(world_seed: u64, generator_offset: u64) -> u64 {
    world_seed
        .wrapping_add(GENERATOR_HEIGHT_SEED_OFFSET)
        .wrapping_add(generator_offset)
}
