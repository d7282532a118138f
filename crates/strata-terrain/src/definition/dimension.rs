//! Dimension definition: the top-level layout consumed by one sampler slot.

use serde::{Deserialize, Serialize};

/// Normal terrain or the inverted "ceiling" variant of a dimension.
///
/// Each orientation owns an independent generator registry and result cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// Ground-up terrain.
    #[default]
    Floor,
    /// Terrain hanging from the top of the world.
    Ceiling,
}

impl Orientation {
    /// Both orientations, floor first.
    pub const ALL: [Orientation; 2] = [Orientation::Floor, Orientation::Ceiling];

    /// Slot index used by per-orientation arrays.
    pub const fn index(self) -> usize {
        match self {
            Self::Floor => 0,
            Self::Ceiling => 1,
        }
    }
}

/// Top-level configuration unit: which regions exist and how they are laid out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionDef {
    /// Unique dimension identifier.
    pub name: String,
    /// Selects the ceiling registry/cache pair instead of the floor one.
    pub inverted: bool,
    /// Region identifiers, in selection order.
    pub regions: Vec<String>,
    /// Biome forced everywhere when non-empty (diagnostic mode).
    pub focus: String,
    /// Amplitude in blocks of the coordinate warp applied before region and
    /// biome lookup. Zero disables warping.
    pub fracture: f64,
    /// Feature size in blocks of the coordinate warp noise.
    pub fracture_size: f64,
    /// Average width in blocks of a region cell.
    pub region_size: f64,
    /// Average width in blocks of a biome cell.
    pub biome_size: f64,
    /// Cell width multiplier applied per level of child-biome nesting.
    pub child_scale: f64,
    /// Feature size in blocks of the continent (land/sea) layer.
    pub continent_size: f64,
    /// Approximate fraction of the dimension that is land, in `[0, 1]`.
    pub land_chance: f64,
    /// Half-width of the coastline band, in continent-noise units.
    pub shore_width: f64,
}

impl Default for DimensionDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            inverted: false,
            regions: Vec::new(),
            focus: String::new(),
            fracture: 0.0,
            fracture_size: 160.0,
            region_size: 1_200.0,
            biome_size: 180.0,
            child_scale: 0.5,
            continent_size: 900.0,
            land_chance: 0.55,
            shore_width: 0.04,
        }
    }
}

impl DimensionDef {
    /// Create a floor dimension with default layout parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a region identifier.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.regions.push(region.into());
        self
    }

    /// Mark the dimension as a ceiling.
    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    /// Force a focus biome.
    pub fn with_focus(mut self, biome: impl Into<String>) -> Self {
        self.focus = biome.into();
        self
    }

    /// Registry/cache slot of this dimension.
    pub fn orientation(&self) -> Orientation {
        if self.inverted {
            Orientation::Ceiling
        } else {
            Orientation::Floor
        }
    }

    /// The focus biome, if focus mode is on.
    pub fn focus(&self) -> Option<&str> {
        (!self.focus.is_empty()).then_some(self.focus.as_str())
    }
}
