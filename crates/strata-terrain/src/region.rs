//! Region layer: coordinate fracturing and the large-scale region cells.

use std::sync::Arc;

use glam::DVec2;

use crate::definition::{BiomeClass, BiomeDef, DefinitionSource, DimensionDef, RegionDef};
use crate::error::SamplerError;
use crate::noise_field::{CellNoise, FractalNoise, NoiseSource, NoiseStyle, pick_weighted};
use crate::seed::{derive_seed, derive_seed64, stream};

const FRACTURE_OCTAVES: u32 = 3;

/// Domain warp applied to block coordinates before region and biome lookup.
///
/// Breaks up the straight edges and regular spacing of the cell layers.
pub struct CoordinateWarp {
    axes: Option<(FractalNoise, FractalNoise)>,
    amplitude: f64,
}

impl CoordinateWarp {
    /// Warp configured by the dimension's `fracture` settings.
    ///
    /// A non-positive amplitude yields the identity warp.
    pub fn new(dimension: &DimensionDef, world_seed: u64) -> Self {
        let amplitude = dimension.fracture;
        let axes = (amplitude > 0.0).then(|| {
            let axis = |s| {
                FractalNoise::new(
                    NoiseStyle::Simplex,
                    derive_seed(world_seed, s),
                    dimension.fracture_size,
                    FRACTURE_OCTAVES,
                )
            };
            (axis(stream::FRACTURE_X), axis(stream::FRACTURE_Z))
        });
        Self { axes, amplitude }
    }

    /// The warped position of `(x, z)`.
    pub fn apply(&self, x: f64, z: f64) -> DVec2 {
        let p = DVec2::new(x, z);
        match &self.axes {
            Some((wx, wz)) => p + DVec2::new(wx.sample(x, z), wz.sample(x, z)) * self.amplitude,
            None => p,
        }
    }
}

/// Weighted candidates of one classification.
#[derive(Clone, Debug, Default)]
pub struct Candidates {
    biomes: Vec<Arc<BiomeDef>>,
    weights: Vec<f64>,
}

impl Candidates {
    fn resolve(defs: &dyn DefinitionSource, keys: &[String]) -> Self {
        let biomes: Vec<Arc<BiomeDef>> = keys.iter().filter_map(|k| defs.biome(k)).collect();
        let weights = biomes.iter().map(|b| b.weight()).collect();
        Self { biomes, weights }
    }

    /// Resolved biomes, in declaration order.
    pub fn biomes(&self) -> &[Arc<BiomeDef>] {
        &self.biomes
    }

    /// Returns `true` if no candidate resolved.
    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    /// Pick a candidate with a roll in `[0, 1)`.
    pub fn pick(&self, roll: f64) -> Option<&Arc<BiomeDef>> {
        pick_weighted(&self.weights, roll).map(|i| &self.biomes[i])
    }
}

/// A region with its candidate lists resolved to definitions.
///
/// Only constructed when at least one list is non-empty.
#[derive(Clone, Debug)]
pub struct ResolvedRegion {
    def: Arc<RegionDef>,
    land: Candidates,
    sea: Candidates,
    shore: Candidates,
    fallback: Arc<BiomeDef>,
}

impl ResolvedRegion {
    fn resolve(defs: &dyn DefinitionSource, def: Arc<RegionDef>) -> Option<Self> {
        let land = Candidates::resolve(defs, &def.land);
        let sea = Candidates::resolve(defs, &def.sea);
        let shore = Candidates::resolve(defs, &def.shore);
        let fallback = land
            .biomes
            .first()
            .or(sea.biomes.first())
            .or(shore.biomes.first())
            .cloned()?;
        Some(Self {
            def,
            land,
            sea,
            shore,
            fallback,
        })
    }

    /// The region definition.
    pub fn def(&self) -> &Arc<RegionDef> {
        &self.def
    }

    /// First resolvable candidate, preferring land.
    pub fn fallback(&self) -> &Arc<BiomeDef> {
        &self.fallback
    }

    /// Resolved candidates of exactly one classification.
    pub fn list(&self, class: BiomeClass) -> &Candidates {
        match class {
            BiomeClass::Land => &self.land,
            BiomeClass::Sea => &self.sea,
            BiomeClass::Shore | BiomeClass::Inferred => &self.shore,
        }
    }

    /// The first non-empty list for `class`, with the class it belongs to.
    ///
    /// Empty lists fall back to the nearest surface: land tries shore then
    /// sea, sea tries shore then land, shore tries land then sea.
    pub fn candidates(&self, class: BiomeClass) -> (BiomeClass, &Candidates) {
        use BiomeClass::{Land, Sea, Shore};
        let order = match class {
            Land => [Land, Shore, Sea],
            Sea => [Sea, Shore, Land],
            Shore | BiomeClass::Inferred => [Shore, Land, Sea],
        };
        order
            .into_iter()
            .map(|c| (c, self.list(c)))
            .find(|(_, list)| !list.is_empty())
            .unwrap_or((order[0], self.list(order[0])))
    }
}

/// Maps warped coordinates to regions.
pub struct RegionResolver {
    cells: CellNoise,
    regions: Vec<ResolvedRegion>,
    weights: Vec<f64>,
}

impl RegionResolver {
    /// Resolve the dimension's regions.
    ///
    /// Unknown regions and regions without a single resolvable candidate are
    /// dropped; they are reported by the registry rebuild.
    pub fn new(
        defs: &dyn DefinitionSource,
        dimension: &DimensionDef,
        world_seed: u64,
    ) -> Result<Self, SamplerError> {
        let regions: Vec<ResolvedRegion> = dimension
            .regions
            .iter()
            .filter_map(|key| defs.region(key))
            .filter_map(|def| ResolvedRegion::resolve(defs, def))
            .collect();

        if regions.is_empty() {
            return Err(SamplerError::NoUsableRegions(dimension.name.clone()));
        }

        let weights = regions.iter().map(|r| r.def.weight()).collect();
        Ok(Self {
            cells: CellNoise::new(
                derive_seed64(world_seed, stream::REGION),
                dimension.region_size,
            ),
            regions,
            weights,
        })
    }

    /// The region owning the warped position `p`.
    pub fn resolve(&self, p: DVec2) -> &ResolvedRegion {
        let cell = self.cells.cell(p.x, p.y);
        let i = pick_weighted(&self.weights, cell.value).unwrap_or(0);
        &self.regions[i]
    }

    /// Usable regions, in dimension order.
    pub fn regions(&self) -> &[ResolvedRegion] {
        &self.regions
    }
}
