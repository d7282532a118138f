//! Definition store: name-based lookup of loaded definitions.

use std::sync::Arc;

use hashbrown::HashMap;

use super::{BiomeDef, DimensionDef, GeneratorDef, RegionDef};
use crate::error::{DefinitionError, DefinitionKind};

/// Lookup boundary to the definition loader.
///
/// Implementations must be pure with respect to a published sampler
/// generation: the same key keeps returning the same definition until the
/// sampler is reloaded.
pub trait DefinitionSource: Send + Sync {
    /// Look up a dimension by identifier.
    fn dimension(&self, key: &str) -> Option<Arc<DimensionDef>>;
    /// Look up a region by identifier.
    fn region(&self, key: &str) -> Option<Arc<RegionDef>>;
    /// Look up a biome by identifier.
    fn biome(&self, key: &str) -> Option<Arc<BiomeDef>>;
    /// Look up a generator by identifier.
    fn generator(&self, key: &str) -> Option<Arc<GeneratorDef>>;
}

/// In-memory [`DefinitionSource`] with O(1) lookup by name.
///
/// Cloning is cheap: definitions are shared, only the maps are copied.
#[derive(Clone, Debug, Default)]
pub struct DefinitionSet {
    dimensions: HashMap<String, Arc<DimensionDef>>,
    regions: HashMap<String, Arc<RegionDef>>,
    biomes: HashMap<String, Arc<BiomeDef>>,
    generators: HashMap<String, Arc<GeneratorDef>>,
}

fn insert_unique<T>(
    map: &mut HashMap<String, Arc<T>>,
    kind: DefinitionKind,
    name: &str,
    def: T,
) -> Result<Arc<T>, DefinitionError> {
    if map.contains_key(name) {
        return Err(DefinitionError::Duplicate {
            kind,
            name: name.to_string(),
        });
    }
    let def = Arc::new(def);
    map.insert(name.to_string(), Arc::clone(&def));
    Ok(def)
}

impl DefinitionSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dimension.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Duplicate`] if the name is taken.
    pub fn insert_dimension(
        &mut self,
        def: DimensionDef,
    ) -> Result<Arc<DimensionDef>, DefinitionError> {
        let name = def.name.clone();
        insert_unique(&mut self.dimensions, DefinitionKind::Dimension, &name, def)
    }

    /// Adds a region.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Duplicate`] if the name is taken.
    pub fn insert_region(&mut self, def: RegionDef) -> Result<Arc<RegionDef>, DefinitionError> {
        let name = def.name.clone();
        insert_unique(&mut self.regions, DefinitionKind::Region, &name, def)
    }

    /// Adds a biome.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Duplicate`] if the name is taken.
    pub fn insert_biome(&mut self, def: BiomeDef) -> Result<Arc<BiomeDef>, DefinitionError> {
        let name = def.name.clone();
        insert_unique(&mut self.biomes, DefinitionKind::Biome, &name, def)
    }

    /// Adds a generator.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError::Duplicate`] if the name is taken.
    pub fn insert_generator(
        &mut self,
        def: GeneratorDef,
    ) -> Result<Arc<GeneratorDef>, DefinitionError> {
        let name = def.name.clone();
        insert_unique(&mut self.generators, DefinitionKind::Generator, &name, def)
    }

    /// Replaces (or adds) a biome, returning the previous definition.
    ///
    /// Samplers built from an earlier copy of the set are unaffected until
    /// they are reloaded with this one.
    pub fn replace_biome(&mut self, def: BiomeDef) -> Option<Arc<BiomeDef>> {
        self.biomes.insert(def.name.clone(), Arc::new(def))
    }

    /// Replaces (or adds) a dimension, returning the previous definition.
    pub fn replace_dimension(&mut self, def: DimensionDef) -> Option<Arc<DimensionDef>> {
        self.dimensions.insert(def.name.clone(), Arc::new(def))
    }

    /// Total number of definitions of all kinds.
    pub fn len(&self) -> usize {
        self.dimensions.len() + self.regions.len() + self.biomes.len() + self.generators.len()
    }

    /// Returns `true` if nothing has been loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DefinitionSource for DefinitionSet {
    fn dimension(&self, key: &str) -> Option<Arc<DimensionDef>> {
        self.dimensions.get(key).cloned()
    }

    fn region(&self, key: &str) -> Option<Arc<RegionDef>> {
        self.regions.get(key).cloned()
    }

    fn biome(&self, key: &str) -> Option<Arc<BiomeDef>> {
        self.biomes.get(key).cloned()
    }

    fn generator(&self, key: &str) -> Option<Arc<GeneratorDef>> {
        self.generators.get(key).cloned()
    }
}
