//! Definitions consumed by the sampler: dimensions, regions, biomes and
//! height generators, plus the [`DefinitionSource`] lookup boundary.
//!
//! Definitions are immutable once loaded and shared through `Arc`. The
//! sampler never writes into them; derived facts such as a focus biome's
//! classification travel in [`BiomeResult`](crate::BiomeResult) instead.

mod biome;
mod dimension;
mod generator;
mod region;
mod set;

pub use biome::{BiomeClass, BiomeDef, GeneratorLink};
pub use dimension::{DimensionDef, Orientation};
pub use generator::{GeneratorDef, NoiseLayerDef};
pub use region::RegionDef;
pub use set::{DefinitionSet, DefinitionSource};
