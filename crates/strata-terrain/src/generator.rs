//! Compiled height generators: a [`GeneratorDef`] bound to a world seed.

use std::sync::Arc;

use crate::definition::GeneratorDef;
use crate::noise_field::{FractalNoise, NoiseSource};
use crate::seed::{derive_seed, generator_seed};

struct Layer {
    noise: FractalNoise,
    opacity: f64,
    exponent: f64,
}

/// A generator whose noise layers are seeded and ready to sample.
///
/// Building the noise permutation tables is comparatively expensive, so this
/// is compiled once per registration and shared through `Arc`.
pub struct HeightGenerator {
    def: Arc<GeneratorDef>,
    layers: Vec<Layer>,
    total_opacity: f64,
}

impl HeightGenerator {
    /// Seed the generator's layers from the world seed.
    ///
    /// Layer `i` draws from stream `i` of the generator's own noise stream,
    /// which is the world seed plus
    /// [`GENERATOR_HEIGHT_SEED_OFFSET`](crate::seed::GENERATOR_HEIGHT_SEED_OFFSET)
    /// plus the definition's seed offset.
    pub fn compile(def: Arc<GeneratorDef>, world_seed: u64) -> Self {
        let base = generator_seed(world_seed, def.seed);
        let layers: Vec<Layer> = def
            .layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.opacity > 0.0)
            .map(|(i, layer)| Layer {
                noise: FractalNoise::new(layer.style, derive_seed(base, i as u64), layer.size, layer.octaves),
                opacity: layer.opacity,
                exponent: if layer.exponent > 0.0 { layer.exponent } else { 1.0 },
            })
            .collect();
        let total_opacity = layers.iter().map(|l| l.opacity).sum();

        Self {
            def,
            layers,
            total_opacity,
        }
    }

    /// Identifier of the generator.
    pub fn key(&self) -> &str {
        &self.def.name
    }

    /// The definition this generator was compiled from.
    pub fn def(&self) -> &Arc<GeneratorDef> {
        &self.def
    }

    /// Height weight at `(x, z)` in `[0, 1]`.
    ///
    /// The opacity-weighted mean of the layers, each remapped from `[-1, 1]`
    /// to `[0, 1]` and raised to its exponent. A generator without visible
    /// layers is flat at 0.5.
    pub fn height(&self, x: f64, z: f64) -> f64 {
        if self.layers.is_empty() {
            return 0.5;
        }

        let sum: f64 = self
            .layers
            .iter()
            .map(|layer| {
                let v = (layer.noise.sample(x, z) + 1.0) * 0.5;
                v.powf(layer.exponent) * layer.opacity
            })
            .sum();

        (sum / self.total_opacity).clamp(0.0, 1.0)
    }
}

impl std::fmt::Debug for HeightGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeightGenerator")
            .field("key", &self.def.name)
            .field("layers", &self.layers.len())
            .finish()
    }
}
