//! Error types for definition loading and sampler construction.
//!
//! None of these are produced on the sampling path: `region`, `biome` and
//! `total_height` are total over a successfully built sampler.

use crate::definition::Orientation;

/// Kind of definition, used in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefinitionKind {
    /// A [`DimensionDef`](crate::DimensionDef).
    Dimension,
    /// A [`RegionDef`](crate::RegionDef).
    Region,
    /// A [`BiomeDef`](crate::BiomeDef).
    Biome,
    /// A [`GeneratorDef`](crate::GeneratorDef).
    Generator,
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Dimension => "dimension",
            Self::Region => "region",
            Self::Biome => "biome",
            Self::Generator => "generator",
        };
        f.write_str(name)
    }
}

/// Errors raised while assembling a [`DefinitionSet`](crate::DefinitionSet).
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// A definition with this name is already present.
    #[error("duplicate {kind} name: {name}")]
    Duplicate {
        /// What kind of definition collided.
        kind: DefinitionKind,
        /// The colliding identifier.
        name: String,
    },
}

/// A reference from one definition to another that could not be resolved.
///
/// Non-fatal: the referencing link is skipped and the reference is reported
/// in a [`RebuildReport`](crate::RebuildReport).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MissingReference {
    /// A dimension lists a region that does not exist.
    #[error("dimension `{dimension}` references unknown region `{region}`")]
    Region {
        /// Referencing dimension.
        dimension: String,
        /// Unresolved region identifier.
        region: String,
    },
    /// A region or parent biome lists a biome that does not exist.
    #[error("`{parent}` references unknown biome `{biome}`")]
    Biome {
        /// Referencing region or parent biome.
        parent: String,
        /// Unresolved biome identifier.
        biome: String,
    },
    /// A biome links a generator that does not exist.
    #[error("biome `{biome}` links unknown generator `{generator}`")]
    Generator {
        /// Referencing biome.
        biome: String,
        /// Unresolved generator identifier.
        generator: String,
    },
    /// A dimension focuses a biome that does not exist.
    #[error("dimension `{dimension}` focuses unknown biome `{biome}`")]
    Focus {
        /// Referencing dimension.
        dimension: String,
        /// Unresolved biome identifier.
        biome: String,
    },
}

/// Errors that prevent a sampler generation from being built.
///
/// When a reload fails with one of these, the previously published
/// generation stays active.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// The sampler was built without any dimension.
    #[error("no dimension configured")]
    NoDimensions,
    /// A configured dimension key is not present in the definitions.
    #[error("unknown dimension: {0}")]
    UnknownDimension(String),
    /// Two configured dimensions share an orientation.
    #[error("dimensions `{first}` and `{second}` both use the {orientation:?} orientation")]
    DuplicateOrientation {
        /// Orientation claimed twice.
        orientation: Orientation,
        /// Dimension that claimed it first.
        first: String,
        /// Dimension that claimed it again.
        second: String,
    },
    /// None of the dimension's regions resolved to a region with candidates.
    #[error("dimension `{0}` has no region with resolvable biomes")]
    NoUsableRegions(String),
}
