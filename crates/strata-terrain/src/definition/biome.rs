//! Biome definition: classification, nested children and generator bounds.

use serde::{Deserialize, Serialize};

/// Land/sea/shore classification of a biome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiomeClass {
    /// Dry land.
    Land,
    /// Open water.
    Sea,
    /// Coastline between land and sea.
    Shore,
    /// Not declared; taken from the candidate list the biome was selected from.
    #[default]
    Inferred,
}

/// How far one generator may push terrain while a biome is active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratorLink {
    /// Identifier of the linked generator.
    pub generator: String,
    /// Contribution when the generator's height weight is 0.
    pub min: f64,
    /// Contribution when the generator's height weight is 1.
    pub max: f64,
}

/// Full descriptor for a biome type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeDef {
    /// Unique biome identifier (e.g., "plains").
    pub name: String,
    /// Declared classification; `Inferred` defers to the selecting region.
    pub class: BiomeClass,
    /// Biomes that may replace this one at finer scales.
    pub children: Vec<String>,
    /// Generator bounds applied while this biome is active.
    pub generators: Vec<GeneratorLink>,
    /// Relative rarity; a biome with rarity 2 is picked half as often as one
    /// with rarity 1. Zero is treated as 1.
    pub rarity: u32,
}

impl Default for BiomeDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            class: BiomeClass::Inferred,
            children: Vec::new(),
            generators: Vec::new(),
            rarity: 1,
        }
    }
}

impl BiomeDef {
    /// Create a biome with no children and no generator links.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the declared classification.
    pub fn with_class(mut self, class: BiomeClass) -> Self {
        self.class = class;
        self
    }

    /// Add a child biome identifier.
    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Link a generator with its `(min, max)` bounds.
    pub fn with_generator(mut self, generator: impl Into<String>, min: f64, max: f64) -> Self {
        self.generators.push(GeneratorLink {
            generator: generator.into(),
            min,
            max,
        });
        self
    }

    /// Set the relative rarity.
    pub fn with_rarity(mut self, rarity: u32) -> Self {
        self.rarity = rarity;
        self
    }

    /// The link to `generator`, if this biome configures one.
    ///
    /// With several links to the same generator the first one applies.
    pub fn link(&self, generator: &str) -> Option<&GeneratorLink> {
        self.generators.iter().find(|l| l.generator == generator)
    }

    /// Selection weight derived from [`rarity`](Self::rarity).
    pub fn weight(&self) -> f64 {
        1.0 / f64::from(self.rarity.max(1))
    }
}
