//! Height generator definition: a named, noise-shaped height weight.

use serde::{Deserialize, Serialize};

use crate::interpolate::InterpolationMethod;
use crate::noise_field::NoiseStyle;

/// One fractal layer of a generator's height function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseLayerDef {
    /// Noise basis.
    pub style: NoiseStyle,
    /// Feature size in blocks of the broadest octave.
    pub size: f64,
    /// Number of octaves composited.
    pub octaves: u32,
    /// Weight of this layer relative to the generator's other layers.
    pub opacity: f64,
    /// Exponent applied to the layer's `[0, 1]` value; above 1 flattens
    /// lowlands, below 1 flattens highlands.
    pub exponent: f64,
}

impl Default for NoiseLayerDef {
    fn default() -> Self {
        Self {
            style: NoiseStyle::Simplex,
            size: 200.0,
            octaves: 3,
            opacity: 1.0,
            exponent: 1.0,
        }
    }
}

/// Full descriptor for a procedural height generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorDef {
    /// Unique generator identifier.
    pub name: String,
    /// How biome bounds are blended across neighbouring lattice samples.
    pub interpolation: InterpolationMethod,
    /// Lattice spacing in blocks for the bound blending.
    pub interpolation_scale: f64,
    /// Offset added to the generator noise stream, so two generators with
    /// identical layers still differ.
    pub seed: u64,
    /// Layers averaged (by opacity) into the height weight.
    pub layers: Vec<NoiseLayerDef>,
}

impl Default for GeneratorDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            interpolation: InterpolationMethod::Bicubic,
            interpolation_scale: 7.0,
            seed: 0,
            layers: vec![NoiseLayerDef::default()],
        }
    }
}

impl GeneratorDef {
    /// Create a generator with one default layer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the interpolation method and lattice spacing.
    pub fn with_interpolation(mut self, method: InterpolationMethod, scale: f64) -> Self {
        self.interpolation = method;
        self.interpolation_scale = scale;
        self
    }

    /// Set the noise stream offset.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the layers.
    pub fn with_layers(mut self, layers: Vec<NoiseLayerDef>) -> Self {
        self.layers = layers;
        self
    }
}
