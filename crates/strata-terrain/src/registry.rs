//! Generator registry: the ordered set of height generators active for one
//! orientation, keyed by identifier.
//!
//! Registries are plain values. The sampler publishes them as immutable
//! snapshots and mutates by copy-on-write, so readers never observe a
//! registry halfway through a rebuild.

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use crate::definition::{DefinitionSource, DimensionDef};
use crate::error::MissingReference;
use crate::generator::HeightGenerator;

/// Outcome of [`GeneratorRegistry::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The generator was added.
    Added,
    /// The same definition is already registered; nothing changed.
    AlreadyPresent,
    /// A different definition already owns the identifier. The first
    /// registration wins and the collision is counted.
    Collision,
}

/// Ordered generators of one orientation.
///
/// Iteration follows registration order, which is also the summation order
/// of the total height, keeping totals bit-reproducible.
#[derive(Clone, Debug, Default)]
pub struct GeneratorRegistry {
    generators: Vec<Arc<HeightGenerator>>,
    index: HashMap<String, usize>,
    skipped_collisions: u64,
}

impl GeneratorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a generator unless its identifier is already taken.
    pub fn insert(&mut self, generator: Arc<HeightGenerator>) -> Registration {
        if let Some(&i) = self.index.get(generator.key()) {
            let existing = self.generators[i].def();
            if Arc::ptr_eq(existing, generator.def()) || **existing == **generator.def() {
                return Registration::AlreadyPresent;
            }
            self.skipped_collisions += 1;
            return Registration::Collision;
        }

        self.index
            .insert(generator.key().to_string(), self.generators.len());
        self.generators.push(generator);
        Registration::Added
    }

    /// Looks up a generator by identifier.
    pub fn get(&self, key: &str) -> Option<&Arc<HeightGenerator>> {
        self.index.get(key).map(|&i| &self.generators[i])
    }

    /// Returns `true` if a generator with this identifier is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Generators in registration order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Arc<HeightGenerator>> {
        self.generators.iter()
    }

    /// Identifiers in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.generators.iter().map(|g| g.key())
    }

    /// Number of registered generators.
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// Returns `true` if no generator is registered.
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Registrations dropped because a different definition already owned
    /// the identifier.
    pub fn skipped_collisions(&self) -> u64 {
        self.skipped_collisions
    }

    /// Build the registry of a dimension from scratch.
    ///
    /// Walks regions, their land/sea/shore candidates and, breadth-first,
    /// every child biome reachable from them. Each biome is visited once, so
    /// cyclic child graphs terminate. Unresolvable references are skipped
    /// and returned alongside the registry.
    pub fn collect(
        defs: &dyn DefinitionSource,
        dimension: &DimensionDef,
        world_seed: u64,
    ) -> (Self, Vec<MissingReference>) {
        let mut registry = Self::new();
        let mut missing = Vec::new();
        let mut queue: VecDeque<(String, String)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();

        for region_key in &dimension.regions {
            match defs.region(region_key) {
                Some(region) => queue.extend(
                    region
                        .biome_keys()
                        .map(|biome| (region.name.clone(), biome.to_string())),
                ),
                None => missing.push(MissingReference::Region {
                    dimension: dimension.name.clone(),
                    region: region_key.clone(),
                }),
            }
        }

        while let Some((parent, biome_key)) = queue.pop_front() {
            if !visited.insert(biome_key.clone()) {
                continue;
            }

            let Some(biome) = defs.biome(&biome_key) else {
                missing.push(MissingReference::Biome {
                    parent,
                    biome: biome_key,
                });
                continue;
            };

            for link in &biome.generators {
                if registry.contains(&link.generator) {
                    continue;
                }
                match defs.generator(&link.generator) {
                    Some(def) => {
                        registry.insert(Arc::new(HeightGenerator::compile(def, world_seed)));
                    }
                    None => missing.push(MissingReference::Generator {
                        biome: biome.name.clone(),
                        generator: link.generator.clone(),
                    }),
                }
            }

            queue.extend(
                biome
                    .children
                    .iter()
                    .map(|child| (biome.name.clone(), child.clone())),
            );
        }

        (registry, missing)
    }
}
