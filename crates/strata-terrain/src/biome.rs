//! Biome layer: continent classification, weighted cell selection and
//! nested child biomes.

use std::collections::VecDeque;
use std::sync::Arc;

use glam::DVec2;
use hashbrown::HashMap;

use crate::definition::{BiomeClass, BiomeDef, DefinitionSource, DimensionDef};
use crate::diagnostics::WarnLatch;
use crate::error::MissingReference;
use crate::noise_field::{CellNoise, FractalNoise, NoiseSource, NoiseStyle, pick_weighted};
use crate::region::{RegionResolver, ResolvedRegion};
use crate::seed::{derive_seed, derive_seed64, stream};

const CONTINENT_OCTAVES: u32 = 4;

/// The biome selected at a coordinate.
///
/// Carries the classification the biome was selected under, which may differ
/// from the classification declared on the definition.
#[derive(Clone, Debug, PartialEq)]
pub struct BiomeResult {
    biome: Arc<BiomeDef>,
    class: BiomeClass,
    score: f64,
}

impl BiomeResult {
    pub fn new(biome: Arc<BiomeDef>, class: BiomeClass, score: f64) -> Self {
        Self { biome, class, score }
    }

    pub fn biome(&self) -> &Arc<BiomeDef> {
        &self.biome
    }

    pub fn name(&self) -> &str {
        &self.biome.name
    }

    pub fn class(&self) -> BiomeClass {
        self.class
    }

    /// Distance from the border of the cell that selected the biome, in cell
    /// units. Zero for a focused biome.
    pub fn score(&self) -> f64 {
        self.score
    }
}

/// The fixed result of focus mode, if the dimension focuses a biome.
///
/// The classification is the list the biome first appears in while scanning
/// the dimension's regions in order (land, sea, then shore of each region).
/// A biome no region lists keeps its declared classification.
pub fn focus(
    defs: &dyn DefinitionSource,
    dimension: &DimensionDef,
) -> Result<Option<BiomeResult>, MissingReference> {
    let Some(key) = dimension.focus() else {
        return Ok(None);
    };
    let Some(biome) = defs.biome(key) else {
        return Err(MissingReference::Focus {
            dimension: dimension.name.clone(),
            biome: key.to_string(),
        });
    };

    let class = dimension
        .regions
        .iter()
        .filter_map(|r| defs.region(r))
        .find_map(|region| region.classify(key))
        .unwrap_or(biome.class);

    Ok(Some(BiomeResult::new(biome, class, 0.0)))
}

/// Selects the biome of a warped coordinate inside a resolved region.
pub struct BiomeSelector {
    continent: FractalNoise,
    land_threshold: f64,
    shore_width: f64,
    cells: CellNoise,
    child_cells: Vec<CellNoise>,
    biomes: HashMap<String, Arc<BiomeDef>>,
    latch: Arc<WarnLatch>,
}

impl BiomeSelector {
    /// Seed the layers of `dimension` and index every biome reachable from
    /// its regions.
    pub fn new(
        defs: &dyn DefinitionSource,
        dimension: &DimensionDef,
        regions: &RegionResolver,
        world_seed: u64,
        max_child_depth: u32,
        latch: Arc<WarnLatch>,
    ) -> Self {
        let child_cells = (0..max_child_depth)
            .map(|level| {
                let size = dimension.biome_size * dimension.child_scale.powi(level as i32 + 1);
                CellNoise::new(
                    derive_seed64(world_seed, stream::CHILD + u64::from(level)),
                    size,
                )
            })
            .collect();

        Self {
            continent: FractalNoise::new(
                NoiseStyle::Simplex,
                derive_seed(world_seed, stream::CONTINENT),
                dimension.continent_size,
                CONTINENT_OCTAVES,
            ),
            land_threshold: 1.0 - 2.0 * dimension.land_chance.clamp(0.0, 1.0),
            shore_width: dimension.shore_width.max(0.0),
            cells: CellNoise::new(
                derive_seed64(world_seed, stream::BIOME),
                dimension.biome_size,
            ),
            child_cells,
            biomes: reachable_biomes(defs, regions.regions()),
            latch,
        }
    }

    /// Surface classification of `p` before candidate fallback.
    pub fn surface(&self, region: &ResolvedRegion, p: DVec2) -> BiomeClass {
        let d = self.continent.sample(p.x, p.y) - self.land_threshold;
        if d.abs() < self.shore_width && !region.list(BiomeClass::Shore).is_empty() {
            BiomeClass::Shore
        } else if d > 0.0 {
            BiomeClass::Land
        } else {
            BiomeClass::Sea
        }
    }

    /// Select the biome at the warped position `p` inside `region`.
    pub fn select(&self, region: &ResolvedRegion, p: DVec2) -> BiomeResult {
        let (list_class, candidates) = region.candidates(self.surface(region, p));
        let cell = self.cells.cell(p.x, p.y);

        let mut current = candidates.pick(cell.value).unwrap_or(region.fallback());
        let mut class = inherit(list_class, current);
        let mut score = cell.edge;
        let mut visited: Vec<&str> = vec![current.name.as_str()];

        for layer in &self.child_cells {
            if current.children.is_empty() {
                break;
            }

            let mut options: Vec<&Arc<BiomeDef>> = Vec::with_capacity(current.children.len() + 1);
            options.push(current);
            for key in &current.children {
                match self.biomes.get(key) {
                    Some(child) if !visited.contains(&child.name.as_str()) => options.push(child),
                    Some(_) => {}
                    None => self.warn_unresolved(&current.name, key),
                }
            }
            if options.len() == 1 {
                break;
            }

            let child_cell = layer.cell(p.x, p.y);
            let weights: Vec<f64> = options.iter().map(|b| b.weight()).collect();
            let pick = pick_weighted(&weights, child_cell.value).unwrap_or(0);
            if pick == 0 {
                break;
            }

            current = options[pick];
            class = inherit(class, current);
            score = child_cell.edge;
            visited.push(current.name.as_str());
        }

        BiomeResult::new(Arc::clone(current), class, score)
    }

    fn warn_unresolved(&self, parent: &str, child: &str) {
        if self.latch.flip() {
            tracing::warn!(
                parent,
                child,
                suppressed = self.latch.take_suppressed(),
                "skipping unresolved child biome"
            );
        }
    }
}

fn inherit(parent: BiomeClass, biome: &BiomeDef) -> BiomeClass {
    match biome.class {
        BiomeClass::Inferred => parent,
        declared => declared,
    }
}

/// Every biome reachable from the regions' candidates through children.
fn reachable_biomes(
    defs: &dyn DefinitionSource,
    regions: &[ResolvedRegion],
) -> HashMap<String, Arc<BiomeDef>> {
    let mut found: HashMap<String, Arc<BiomeDef>> = HashMap::new();
    let mut queue: VecDeque<Arc<BiomeDef>> = regions
        .iter()
        .flat_map(|r| {
            [BiomeClass::Land, BiomeClass::Sea, BiomeClass::Shore]
                .into_iter()
                .flat_map(move |c| r.list(c).biomes().iter().cloned())
        })
        .collect();

    while let Some(biome) = queue.pop_front() {
        if found.contains_key(&biome.name) {
            continue;
        }
        queue.extend(
            biome
                .children
                .iter()
                .filter(|key| !found.contains_key(key.as_str()))
                .filter_map(|key| defs.biome(key)),
        );
        found.insert(biome.name.clone(), biome);
    }
    found
}
