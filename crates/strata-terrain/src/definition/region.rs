//! Region definition: the candidate biomes of a large-scale area.

use serde::{Deserialize, Serialize};

use super::BiomeClass;

/// Named grouping of candidate biomes, selected by the region layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionDef {
    /// Unique region identifier.
    pub name: String,
    /// Candidates for land columns.
    pub land: Vec<String>,
    /// Candidates for sea columns.
    pub sea: Vec<String>,
    /// Candidates for the coastline band.
    pub shore: Vec<String>,
    /// Relative rarity among the dimension's regions. Zero is treated as 1.
    pub rarity: u32,
}

impl Default for RegionDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            land: Vec::new(),
            sea: Vec::new(),
            shore: Vec::new(),
            rarity: 1,
        }
    }
}

impl RegionDef {
    /// Create a region without candidates.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a land candidate.
    pub fn with_land(mut self, biome: impl Into<String>) -> Self {
        self.land.push(biome.into());
        self
    }

    /// Add a sea candidate.
    pub fn with_sea(mut self, biome: impl Into<String>) -> Self {
        self.sea.push(biome.into());
        self
    }

    /// Add a shore candidate.
    pub fn with_shore(mut self, biome: impl Into<String>) -> Self {
        self.shore.push(biome.into());
        self
    }

    /// Set the relative rarity.
    pub fn with_rarity(mut self, rarity: u32) -> Self {
        self.rarity = rarity;
        self
    }

    /// Candidate list for a classification. `Inferred` has none.
    pub fn candidates(&self, class: BiomeClass) -> &[String] {
        match class {
            BiomeClass::Land => &self.land,
            BiomeClass::Sea => &self.sea,
            BiomeClass::Shore => &self.shore,
            BiomeClass::Inferred => &[],
        }
    }

    /// Which list contains `biome`, checking land, then sea, then shore.
    pub fn classify(&self, biome: &str) -> Option<BiomeClass> {
        [BiomeClass::Land, BiomeClass::Sea, BiomeClass::Shore]
            .into_iter()
            .find(|class| self.candidates(*class).iter().any(|b| b == biome))
    }

    /// Every candidate identifier: land, then sea, then shore.
    pub fn biome_keys(&self) -> impl Iterator<Item = &str> {
        self.land
            .iter()
            .chain(&self.sea)
            .chain(&self.shore)
            .map(String::as_str)
    }

    /// Selection weight derived from [`rarity`](Self::rarity).
    pub fn weight(&self) -> f64 {
        1.0 / f64::from(self.rarity.max(1))
    }
}
