//! Biome and height-generator sampling: region and biome lookup per
//! coordinate, interpolated generator contributions, per-coordinate caching
//! and hot-reload of the whole sampling state.

mod biome;
mod cache;
mod columns;
mod diagnostics;
mod error;
mod generator;
mod interpolate;
mod region;
mod registry;
mod sampler;

pub mod definition;
pub mod noise_field;
pub mod seed;

pub use biome::{BiomeResult, BiomeSelector, focus};
pub use cache::{BiomeCache, CacheStats, ChunkPosition};
pub use columns::{
    AsyncColumnSampler, CHUNK_SIZE, ChunkColumns, ColumnSample, ColumnTask, SampledChunk,
};
pub use definition::{
    BiomeClass, BiomeDef, DefinitionSet, DefinitionSource, DimensionDef, GeneratorDef,
    GeneratorLink, NoiseLayerDef, Orientation, RegionDef,
};
pub use diagnostics::WarnLatch;
pub use error::{DefinitionError, DefinitionKind, MissingReference, SamplerError};
pub use generator::HeightGenerator;
pub use interpolate::{InterpolationMethod, Lattice, LatticeTap, interpolate};
pub use noise_field::{Cell, CellNoise, FractalNoise, NoiseSource, NoiseStyle};
pub use region::{Candidates, CoordinateWarp, RegionResolver, ResolvedRegion};
pub use registry::{GeneratorRegistry, Registration};
pub use sampler::{
    BiomeSampler, BiomeSamplerBuilder, DimensionLayout, Generation, OrientedSampler,
    RebuildReport, block_position,
};
pub use strata_config::SamplerConfig;
