//! The sampling API.
//!
//! A [`BiomeSampler`] owns everything derived from one world seed and one set
//! of definitions. That state is published as an immutable [`Generation`]:
//! resolved dimension layouts plus, per orientation, a generator registry and
//! a biome cache. Readers clone the current generation under a short read
//! lock and sample it lock-free. Writers (`register_generator`,
//! `on_hotloaded`, `reload`) serialize on a mutex, build the next generation
//! off to the side and swap it in with a single write.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use strata_config::SamplerConfig;

use crate::biome::{self, BiomeResult, BiomeSelector};
use crate::cache::{BiomeCache, CacheStats, ChunkPosition};
use crate::definition::{DefinitionSource, DimensionDef, GeneratorDef, Orientation, RegionDef};
use crate::diagnostics::WarnLatch;
use crate::error::{MissingReference, SamplerError};
use crate::generator::HeightGenerator;
use crate::interpolate::{Lattice, floor_block, lattice_anchor};
use crate::region::{CoordinateWarp, RegionResolver};
use crate::registry::{GeneratorRegistry, Registration};

/// The block containing `(x, z)`.
///
/// Biomes are resolved per block; fractional coordinates share the biome of
/// the block they fall in. Coordinates beyond the `i32` block range clamp to
/// its edge and NaN maps to block 0.
pub fn block_position(x: f64, z: f64) -> ChunkPosition {
    ChunkPosition::new(floor_block(x), floor_block(z))
}

/// Region and biome layers of one dimension, seeded and resolved.
pub struct DimensionLayout {
    dimension: Arc<DimensionDef>,
    warp: CoordinateWarp,
    regions: RegionResolver,
    selector: BiomeSelector,
    focus: Option<BiomeResult>,
}

impl DimensionLayout {
    fn build(
        defs: &dyn DefinitionSource,
        dimension: Arc<DimensionDef>,
        settings: &Settings,
        missing: &mut Vec<MissingReference>,
    ) -> Result<Self, SamplerError> {
        let regions = RegionResolver::new(defs, &dimension, settings.world_seed)?;
        let selector = BiomeSelector::new(
            defs,
            &dimension,
            &regions,
            settings.world_seed,
            settings.config.max_child_depth,
            Arc::clone(&settings.latch),
        );
        let focus = biome::focus(defs, &dimension).unwrap_or_else(|reference| {
            missing.push(reference);
            None
        });

        Ok(Self {
            warp: CoordinateWarp::new(&dimension, settings.world_seed),
            regions,
            selector,
            focus,
            dimension,
        })
    }

    /// The dimension this layout was built from.
    pub fn dimension(&self) -> &Arc<DimensionDef> {
        &self.dimension
    }

    /// The focus result, when focus mode is active.
    pub fn focus(&self) -> Option<&BiomeResult> {
        self.focus.as_ref()
    }

    fn region(&self, pos: ChunkPosition) -> &Arc<RegionDef> {
        let p = self.warp.apply(f64::from(pos.x), f64::from(pos.z));
        self.regions.resolve(p).def()
    }

    fn resolve(&self, pos: ChunkPosition) -> BiomeResult {
        let p = self.warp.apply(f64::from(pos.x), f64::from(pos.z));
        self.selector.select(self.regions.resolve(p), p)
    }
}

/// One published, immutable sampler state.
pub struct Generation {
    epoch: u64,
    defs: Arc<dyn DefinitionSource>,
    /// Ordered by orientation, never empty.
    layouts: Vec<Arc<DimensionLayout>>,
    registries: [Arc<GeneratorRegistry>; 2],
    caches: [Arc<BiomeCache>; 2],
}

impl Generation {
    /// Publish counter, starting at 1 and bumped by every publish.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The definitions this generation was built from.
    pub fn definitions(&self) -> &Arc<dyn DefinitionSource> {
        &self.defs
    }

    /// Generators registered for `orientation`.
    pub fn registry(&self, orientation: Orientation) -> &Arc<GeneratorRegistry> {
        &self.registries[orientation.index()]
    }

    /// Biome cache of `orientation`.
    pub fn cache(&self, orientation: Orientation) -> &Arc<BiomeCache> {
        &self.caches[orientation.index()]
    }

    fn layout(&self, orientation: Orientation) -> Option<&Arc<DimensionLayout>> {
        self.layouts
            .iter()
            .find(|l| l.dimension.orientation() == orientation)
    }

    fn with_registry(&self, orientation: Orientation, registry: GeneratorRegistry) -> Self {
        let mut registries = self.registries.clone();
        registries[orientation.index()] = Arc::new(registry);
        Self {
            epoch: self.epoch + 1,
            defs: Arc::clone(&self.defs),
            layouts: self.layouts.clone(),
            registries,
            caches: self.caches.clone(),
        }
    }
}

/// Outcome of building or reloading a generation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RebuildReport {
    /// Epoch of the published generation.
    pub epoch: u64,
    /// Registered generators, indexed by [`Orientation::index`].
    pub generators: [usize; 2],
    /// Registrations dropped because another definition owned the identifier.
    pub skipped_collisions: u64,
    /// References that could not be resolved and were skipped.
    pub missing: Vec<MissingReference>,
}

impl RebuildReport {
    fn log(&self) {
        for reference in &self.missing {
            tracing::warn!(epoch = self.epoch, %reference, "skipping unresolved reference");
        }
        tracing::info!(
            epoch = self.epoch,
            floor_generators = self.generators[Orientation::Floor.index()],
            ceiling_generators = self.generators[Orientation::Ceiling.index()],
            skipped_collisions = self.skipped_collisions,
            missing = self.missing.len(),
            "published sampler generation"
        );
    }
}

struct Settings {
    world_seed: u64,
    dimensions: Vec<String>,
    config: SamplerConfig,
    latch: Arc<WarnLatch>,
}

impl Settings {
    fn assemble(
        &self,
        defs: Arc<dyn DefinitionSource>,
        epoch: u64,
    ) -> Result<(Generation, RebuildReport), SamplerError> {
        if self.dimensions.is_empty() {
            return Err(SamplerError::NoDimensions);
        }

        let mut slots: [Option<Arc<DimensionLayout>>; 2] = [None, None];
        let mut registries = [GeneratorRegistry::new(), GeneratorRegistry::new()];
        let mut missing = Vec::new();

        for key in &self.dimensions {
            let dimension = defs
                .dimension(key)
                .ok_or_else(|| SamplerError::UnknownDimension(key.clone()))?;
            let orientation = dimension.orientation();
            if let Some(first) = &slots[orientation.index()] {
                return Err(SamplerError::DuplicateOrientation {
                    orientation,
                    first: first.dimension.name.clone(),
                    second: key.clone(),
                });
            }

            let (registry, unresolved) =
                GeneratorRegistry::collect(defs.as_ref(), &dimension, self.world_seed);
            missing.extend(unresolved);
            registries[orientation.index()] = registry;

            let layout = DimensionLayout::build(defs.as_ref(), dimension, self, &mut missing)?;
            slots[orientation.index()] = Some(Arc::new(layout));
        }

        let report = RebuildReport {
            epoch,
            generators: [registries[0].len(), registries[1].len()],
            skipped_collisions: registries.iter().map(|r| r.skipped_collisions()).sum(),
            missing,
        };
        let generation = Generation {
            epoch,
            defs,
            layouts: slots.into_iter().flatten().collect(),
            registries: registries.map(Arc::new),
            caches: std::array::from_fn(|_| Arc::new(BiomeCache::new())),
        };
        Ok((generation, report))
    }
}

/// Configures and builds a [`BiomeSampler`].
pub struct BiomeSamplerBuilder {
    world_seed: u64,
    defs: Arc<dyn DefinitionSource>,
    dimensions: Vec<String>,
    config: SamplerConfig,
}

impl BiomeSamplerBuilder {
    /// Sample this dimension. At most one dimension per orientation.
    pub fn dimension(mut self, key: impl Into<String>) -> Self {
        self.dimensions.push(key.into());
        self
    }

    /// Override the default sampler settings.
    pub fn config(mut self, config: SamplerConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve the definitions and publish the first generation.
    pub fn build(self) -> Result<BiomeSampler, SamplerError> {
        let latch = Arc::new(WarnLatch::new(Duration::from_millis(
            self.config.warn_interval_ms,
        )));
        let settings = Settings {
            world_seed: self.world_seed,
            dimensions: self.dimensions,
            config: self.config,
            latch,
        };
        let (generation, report) = settings.assemble(self.defs, 1)?;
        report.log();

        Ok(BiomeSampler {
            settings,
            current: RwLock::new(Arc::new(generation)),
            writer: Mutex::new(()),
            rejected: [AtomicU64::new(0), AtomicU64::new(0)],
        })
    }
}

/// Biome, region and height sampler of one world.
pub struct BiomeSampler {
    settings: Settings,
    current: RwLock<Arc<Generation>>,
    writer: Mutex<()>,
    /// Colliding `register_generator` calls, per orientation.
    rejected: [AtomicU64; 2],
}

impl BiomeSampler {
    /// Start configuring a sampler for `world_seed` over `defs`.
    pub fn builder(world_seed: u64, defs: Arc<dyn DefinitionSource>) -> BiomeSamplerBuilder {
        BiomeSamplerBuilder {
            world_seed,
            defs,
            dimensions: Vec::new(),
            config: SamplerConfig::default(),
        }
    }

    pub fn world_seed(&self) -> u64 {
        self.settings.world_seed
    }

    /// The currently published generation.
    pub fn generation(&self) -> Arc<Generation> {
        Arc::clone(&self.current.read())
    }

    pub fn epoch(&self) -> u64 {
        self.current.read().epoch
    }

    /// Sampler of the primary orientation: floor if configured, else ceiling.
    pub fn primary(&self) -> OrientedSampler {
        let generation = self.generation();
        let layout = Arc::clone(&generation.layouts[0]);
        OrientedSampler {
            generation,
            layout,
            cache_enabled: self.settings.config.cache_enabled,
        }
    }

    /// Sampler of `orientation`, if a dimension is configured for it.
    ///
    /// The returned sampler pins the current generation.
    pub fn oriented(&self, orientation: Orientation) -> Option<OrientedSampler> {
        let generation = self.generation();
        let layout = Arc::clone(generation.layout(orientation)?);
        Some(OrientedSampler {
            generation,
            layout,
            cache_enabled: self.settings.config.cache_enabled,
        })
    }

    /// Region at `(x, z)` in the primary orientation.
    pub fn region(&self, x: f64, z: f64) -> Arc<RegionDef> {
        self.primary().region(x, z)
    }

    /// Biome at `(x, z)` in the primary orientation.
    pub fn biome(&self, x: f64, z: f64) -> BiomeResult {
        self.primary().biome(x, z)
    }

    /// Sum of all generator contributions at `(x, z)` in the primary orientation.
    pub fn total_height(&self, x: f64, z: f64) -> f64 {
        self.primary().total_height(x, z)
    }

    /// Contribution of one generator at `(x, z)` in the primary orientation.
    pub fn contribution(&self, x: f64, z: f64, generator: &HeightGenerator) -> f64 {
        self.primary().contribution(x, z, generator)
    }

    /// Snapshot of the generators registered for `orientation`.
    pub fn active_generators(&self, orientation: Orientation) -> Arc<GeneratorRegistry> {
        Arc::clone(self.current.read().registry(orientation))
    }

    /// Register a generator under the orientation of `dimension`.
    ///
    /// Returns `true` if it was added. Re-registering an identifier is a
    /// no-op; a different definition under a taken identifier is counted in
    /// [`BiomeSampler::skipped_collisions`]. Only an addition publishes a new
    /// epoch.
    pub fn register_generator(&self, def: Arc<GeneratorDef>, dimension: &DimensionDef) -> bool {
        let _writer = self.writer.lock();
        let current = self.generation();
        let orientation = dimension.orientation();

        let mut registry = GeneratorRegistry::clone(current.registry(orientation));
        let key = def.name.clone();
        let generator = Arc::new(HeightGenerator::compile(def, self.settings.world_seed));
        match registry.insert(generator) {
            Registration::Added => {
                *self.current.write() = Arc::new(current.with_registry(orientation, registry));
                tracing::debug!(generator = %key, ?orientation, "registered generator");
                true
            }
            Registration::AlreadyPresent => false,
            Registration::Collision => {
                self.rejected[orientation.index()].fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    generator = %key,
                    ?orientation,
                    "generator identifier already taken, keeping the first definition"
                );
                false
            }
        }
    }

    /// Generators skipped for `orientation` because their identifier was taken.
    ///
    /// Counts collisions of the last rebuild plus every colliding
    /// [`register_generator`](Self::register_generator) call since the sampler
    /// was built.
    pub fn skipped_collisions(&self, orientation: Orientation) -> u64 {
        self.current.read().registry(orientation).skipped_collisions()
            + self.rejected[orientation.index()].load(Ordering::Relaxed)
    }

    /// Rebuild registries and caches from the current definitions.
    ///
    /// On error the previous generation stays published.
    pub fn on_hotloaded(&self) -> Result<RebuildReport, SamplerError> {
        let _writer = self.writer.lock();
        let defs = Arc::clone(&self.current.read().defs);
        self.rebuild(defs)
    }

    /// Swap in new definitions and rebuild.
    ///
    /// On error the previous generation, including its definitions, stays
    /// published.
    pub fn reload(&self, defs: Arc<dyn DefinitionSource>) -> Result<RebuildReport, SamplerError> {
        let _writer = self.writer.lock();
        self.rebuild(defs)
    }

    /// Caller holds the writer lock.
    fn rebuild(&self, defs: Arc<dyn DefinitionSource>) -> Result<RebuildReport, SamplerError> {
        let epoch = self.current.read().epoch + 1;
        let (next, report) = match self.settings.assemble(defs, epoch) {
            Ok(built) => built,
            Err(err) => {
                tracing::error!(epoch, %err, "sampler rebuild failed, keeping previous generation");
                return Err(err);
            }
        };

        let retired = std::mem::replace(&mut *self.current.write(), Arc::new(next));
        report.log();
        if self.settings.config.log_cache_stats {
            for orientation in Orientation::ALL {
                let stats = retired.cache(orientation).stats();
                tracing::info!(
                    epoch = retired.epoch,
                    ?orientation,
                    hits = stats.hits,
                    misses = stats.misses,
                    entries = stats.entries,
                    "retired biome cache"
                );
            }
        }
        Ok(report)
    }
}

/// Sampler bound to one orientation of one generation.
///
/// Everything sampled through the same `OrientedSampler` comes from the same
/// generation, even if the owning [`BiomeSampler`] is reloaded meanwhile.
#[derive(Clone)]
pub struct OrientedSampler {
    generation: Arc<Generation>,
    layout: Arc<DimensionLayout>,
    cache_enabled: bool,
}

impl OrientedSampler {
    pub fn orientation(&self) -> Orientation {
        self.layout.dimension.orientation()
    }

    pub fn dimension(&self) -> &Arc<DimensionDef> {
        &self.layout.dimension
    }

    /// Epoch of the pinned generation.
    pub fn epoch(&self) -> u64 {
        self.generation.epoch
    }

    pub fn layout(&self) -> &Arc<DimensionLayout> {
        &self.layout
    }

    /// Generators of this orientation, in summation order.
    pub fn active_generators(&self) -> &Arc<GeneratorRegistry> {
        self.generation.registry(self.orientation())
    }

    pub fn cache(&self) -> &Arc<BiomeCache> {
        self.generation.cache(self.orientation())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache().stats()
    }

    /// Region at `(x, z)`.
    pub fn region(&self, x: f64, z: f64) -> Arc<RegionDef> {
        Arc::clone(self.layout.region(block_position(x, z)))
    }

    /// Biome at `(x, z)`.
    pub fn biome(&self, x: f64, z: f64) -> BiomeResult {
        self.biome_at(block_position(x, z))
    }

    /// Biome of the block at `pos`, through the cache.
    pub fn biome_at(&self, pos: ChunkPosition) -> BiomeResult {
        if let Some(focus) = &self.layout.focus {
            return focus.clone();
        }
        if !self.cache_enabled {
            return self.layout.resolve(pos);
        }
        self.cache()
            .get_or_insert_with(pos, || self.layout.resolve(pos))
    }

    /// Biome at `(x, z)`, resolved without reading or filling the cache.
    pub fn biome_uncached(&self, x: f64, z: f64) -> BiomeResult {
        match &self.layout.focus {
            Some(focus) => focus.clone(),
            None => self.layout.resolve(block_position(x, z)),
        }
    }

    /// Interpolated `(min, max)` bounds of `generator` at `(x, z)`.
    ///
    /// Both bounds are gathered in a single pass over the lattice taps of the
    /// generator's interpolation method, anchored at the nearest block. A
    /// biome without a link to the generator contributes zero to both.
    pub fn bounds(&self, x: f64, z: f64, generator: &HeightGenerator) -> (f64, f64) {
        let def = generator.def();
        let lattice = Lattice::around(
            def.interpolation,
            lattice_anchor(x),
            lattice_anchor(z),
            def.interpolation_scale,
        );

        let mut lo = 0.0;
        let mut hi = 0.0;
        for tap in lattice.taps() {
            let result = self.biome_at(ChunkPosition::new(tap.x, tap.z));
            if let Some(link) = result.biome().link(generator.key()) {
                lo += link.min * tap.weight;
                hi += link.max * tap.weight;
            }
        }
        (lo, hi)
    }

    /// Height contribution of `generator` at `(x, z)`.
    ///
    /// Lies between the interpolated bounds, placed by the generator's own
    /// height weight.
    pub fn contribution(&self, x: f64, z: f64, generator: &HeightGenerator) -> f64 {
        let (lo, hi) = self.bounds(x, z, generator);
        lo + (hi - lo) * generator.height(x, z)
    }

    /// Sum of every active generator's contribution, in registration order.
    pub fn total_height(&self, x: f64, z: f64) -> f64 {
        self.active_generators()
            .iter()
            .map(|generator| self.contribution(x, z, generator))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{BiomeClass, BiomeDef, DefinitionSet, RegionDef};
    use crate::interpolate::InterpolationMethod;

    const SEED: u64 = 20_240_917;

    /// Region r1 with plains and forest; plains links hills (0, 4).
    fn scenario() -> DefinitionSet {
        let mut set = DefinitionSet::new();
        set.insert_generator(GeneratorDef::new("hills")).unwrap();
        set.insert_biome(BiomeDef::new("plains").with_generator("hills", 0.0, 4.0))
            .unwrap();
        set.insert_biome(BiomeDef::new("forest")).unwrap();
        set.insert_region(RegionDef::new("r1").with_land("plains").with_land("forest"))
            .unwrap();
        let mut overworld = DimensionDef::new("overworld").with_region("r1");
        overworld.land_chance = 1.0;
        set.insert_dimension(overworld).unwrap();
        set
    }

    fn build(set: DefinitionSet) -> BiomeSampler {
        BiomeSampler::builder(SEED, Arc::new(set))
            .dimension("overworld")
            .build()
            .unwrap()
    }

    fn grid(step: f64) -> impl Iterator<Item = (f64, f64)> {
        (-25..25).flat_map(move |i| (-25..25).map(move |j| (i as f64 * step, j as f64 * step)))
    }

    /// Names of every biome under the lattice taps of `generator` at `(x, z)`.
    fn tap_biomes(sampler: &OrientedSampler, generator: &HeightGenerator, x: f64, z: f64) -> Vec<String> {
        let def = generator.def();
        Lattice::around(
            def.interpolation,
            lattice_anchor(x),
            lattice_anchor(z),
            def.interpolation_scale,
        )
            .taps()
            .iter()
            .map(|t| sampler.biome_at(ChunkPosition::new(t.x, t.z)).name().to_string())
            .collect()
    }

    #[test]
    fn test_plains_forest_hills_scenario() {
        let sampler = build(scenario());
        let oriented = sampler.primary();
        let hills = Arc::clone(oriented.active_generators().get("hills").unwrap());

        let mut inside_plains = 0;
        let mut inside_forest = 0;
        for (x, z) in grid(23.0) {
            let taps = tap_biomes(&oriented, &hills, x, z);
            let total = oriented.total_height(x, z);
            if taps.iter().all(|b| b == "plains") {
                assert!((0.0..=4.0).contains(&total), "plains total {total} at ({x}, {z})");
                inside_plains += 1;
            } else if taps.iter().all(|b| b == "forest") {
                assert_eq!(total, 0.0, "forest total at ({x}, {z})");
                inside_forest += 1;
            }
        }
        assert!(inside_plains > 0 && inside_forest > 0);
    }

    #[test]
    fn test_sampling_is_deterministic_across_instances() {
        let a = build(scenario());
        let b = build(scenario());
        for (x, z) in grid(31.0) {
            assert_eq!(a.region(x, z).name, b.region(x, z).name);
            assert_eq!(a.biome(x, z), b.biome(x, z));
            assert_eq!(a.total_height(x, z).to_bits(), b.total_height(x, z).to_bits());
            assert_eq!(a.total_height(x, z).to_bits(), a.total_height(x, z).to_bits());
        }
    }

    #[test]
    fn test_region_layout_is_pinned() {
        let mut set = scenario();
        set.insert_biome(BiomeDef::new("dunes")).unwrap();
        let mut arid = RegionDef::new("arid").with_land("dunes");
        arid.rarity = 3;
        set.insert_region(arid).unwrap();
        set.replace_dimension(
            DimensionDef::new("overworld")
                .with_region("r1")
                .with_region("arid"),
        );
        let sampler = build(set);
        let pinned = [
            ((0.0, 0.0), "r1"),
            ((5000.0, 0.0), "arid"),
            ((-3000.0, 7000.0), "r1"),
            ((12000.0, -12000.0), "r1"),
            ((2400.0, 2400.0), "arid"),
            ((-800.0, -15000.0), "r1"),
            ((30000.0, 1.0), "r1"),
            ((-25000.0, -25000.0), "arid"),
        ];
        for ((x, z), name) in pinned {
            assert_eq!(sampler.region(x, z).name, name, "at ({x}, {z})");
        }
    }

    const SAMPLE_DUMP_ENV: &str = "STRATA_SAMPLE_DUMP";
    const SAMPLE_MARKER: &str = "strata-sample:";

    fn sample_lines() -> Vec<String> {
        let sampler = build(scenario());
        (-6..6)
            .flat_map(|i| (-6..6).map(move |j| (f64::from(i) * 97.5, f64::from(j) * 61.0)))
            .map(|(x, z)| {
                format!(
                    "{x} {z} {} {} {:016x}",
                    sampler.region(x, z).name,
                    sampler.biome(x, z).name(),
                    sampler.total_height(x, z).to_bits()
                )
            })
            .collect()
    }

    #[test]
    fn test_emit_sample_lines() {
        if std::env::var_os(SAMPLE_DUMP_ENV).is_some() {
            for line in sample_lines() {
                println!("{SAMPLE_MARKER}{line}");
            }
        }
    }

    #[test]
    fn test_samples_match_a_fresh_process() {
        if std::env::var_os(SAMPLE_DUMP_ENV).is_some() {
            return;
        }
        let output = std::process::Command::new(std::env::current_exe().unwrap())
            .args([
                "sampler::tests::test_emit_sample_lines",
                "--exact",
                "--nocapture",
                "--test-threads=1",
            ])
            .env(SAMPLE_DUMP_ENV, "1")
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let stdout = String::from_utf8(output.stdout).unwrap();
        let fresh: Vec<&str> = stdout
            .lines()
            .filter_map(|line| line.split_once(SAMPLE_MARKER).map(|(_, rest)| rest))
            .collect();
        assert_eq!(fresh, sample_lines());
    }

    #[test]
    fn test_cache_is_transparent() {
        let sampler = build(scenario());
        let oriented = sampler.primary();
        for (x, z) in grid(17.0) {
            assert_eq!(oriented.biome(x, z), oriented.biome_uncached(x, z));
            assert_eq!(oriented.biome(x, z), oriented.biome_uncached(x, z));
        }
        let stats = oriented.cache_stats();
        assert_eq!(stats.entries, 2500);
        assert!(stats.hits >= 2500);
    }

    #[test]
    fn test_disabled_cache_stays_empty() {
        let sampler = BiomeSampler::builder(SEED, Arc::new(scenario()))
            .dimension("overworld")
            .config(SamplerConfig {
                cache_enabled: false,
                ..Default::default()
            })
            .build()
            .unwrap();
        let cached = build(scenario());
        for (x, z) in grid(29.0) {
            assert_eq!(sampler.biome(x, z), cached.biome(x, z));
        }
        assert!(sampler.primary().cache().is_empty());
    }

    #[test]
    fn test_fractional_coordinates_share_block() {
        let sampler = build(scenario());
        assert_eq!(sampler.biome(10.2, -3.9), sampler.biome(10.0, -4.0));
        assert_eq!(block_position(-0.5, 0.5), ChunkPosition::new(-1, 0));
    }

    #[test]
    fn test_sampling_at_block_range_edges() {
        let sampler = build(scenario());
        for (x, z) in [
            (2_147_483_640.0, 0.0),
            (-2_147_483_640.0, 0.0),
            (0.0, 2_147_483_647.4),
            (-2_147_483_648.0, -2_147_483_648.0),
        ] {
            let total = sampler.total_height(x, z);
            assert!(total.is_finite(), "total {total} at ({x}, {z})");
            assert_eq!(sampler.biome(x, z), sampler.primary().biome_uncached(x, z));
        }
        assert_eq!(block_position(1e20, -1e20), ChunkPosition::new(i32::MAX, i32::MIN));
        assert_eq!(block_position(f64::NAN, 0.5), ChunkPosition::new(0, 0));
    }

    #[test]
    fn test_huge_interpolation_scale_is_sampled() {
        let mut set = scenario();
        set.insert_generator(
            GeneratorDef::new("plateau").with_interpolation(InterpolationMethod::Bicubic, 1e15),
        )
        .unwrap();
        set.replace_biome(
            BiomeDef::new("plains")
                .with_generator("hills", 0.0, 4.0)
                .with_generator("plateau", 1.0, 1.0),
        );
        set.replace_biome(BiomeDef::new("forest").with_generator("plateau", 1.0, 1.0));
        let sampler = build(set);
        let oriented = sampler.primary();
        let plateau = Arc::clone(oriented.active_generators().get("plateau").unwrap());
        for (x, z) in [(0.0, 0.0), (2_147_483_640.0, -2_147_483_640.0), (-77.5, 13.0)] {
            let (lo, hi) = oriented.bounds(x, z, &plateau);
            assert!((lo - 1.0).abs() < 1e-9 && (hi - 1.0).abs() < 1e-9, "({lo}, {hi}) at {x}");
        }
    }

    #[test]
    fn test_bounds_anchor_at_nearest_block() {
        let sampler = build(scenario());
        let oriented = sampler.primary();
        let hills = Arc::clone(oriented.active_generators().get("hills").unwrap());
        let mut varying = 0;
        for i in -1000..1000 {
            let x = f64::from(i);
            let here = oriented.bounds(x, 5.0, &hills);
            let next = oriented.bounds(x + 1.0, 5.0, &hills);
            if here != next {
                varying += 1;
            }
            assert_eq!(oriented.bounds(x + 0.6, 5.0, &hills), next, "at {x}");
            assert_eq!(oriented.bounds(x + 0.5, 5.0, &hills), next, "at {x}");
            assert_eq!(oriented.bounds(x + 0.4, 5.0, &hills), here, "at {x}");
            assert_eq!(oriented.bounds(x - 0.4, 5.0, &hills), here, "at {x}");
        }
        assert!(varying > 0);
    }

    #[test]
    fn test_contribution_stays_within_bounds() {
        let mut set = scenario();
        set.insert_generator(
            GeneratorDef::new("ridges").with_interpolation(InterpolationMethod::Bilinear, 9.0),
        )
        .unwrap();
        set.replace_biome(
            BiomeDef::new("forest")
                .with_generator("ridges", -3.0, 5.0)
                .with_generator("hills", 6.0, 2.0),
        );
        let sampler = build(set);
        let oriented = sampler.primary();
        let registry = Arc::clone(oriented.active_generators());
        assert_eq!(registry.len(), 2);

        for (x, z) in grid(11.0) {
            for generator in registry.iter() {
                let (lo, hi) = oriented.bounds(x, z, generator);
                let c = oriented.contribution(x, z, generator);
                assert!(c >= lo.min(hi) - 1e-9 && c <= lo.max(hi) + 1e-9);
            }
            let ridges = registry.get("ridges").unwrap();
            let c = oriented.contribution(x, z, ridges);
            assert!((-3.0 - 1e-9..=5.0 + 1e-9).contains(&c), "bilinear {c}");
        }
    }

    #[test]
    fn test_total_height_sums_in_registration_order() {
        let mut set = scenario();
        set.insert_generator(GeneratorDef::new("ridges").with_seed(3)).unwrap();
        set.replace_biome(
            BiomeDef::new("plains")
                .with_generator("hills", 0.0, 4.0)
                .with_generator("ridges", 1.0, 2.0),
        );
        let sampler = build(set);
        let oriented = sampler.primary();
        let keys: Vec<_> = oriented.active_generators().keys().collect();
        assert_eq!(keys, ["hills", "ridges"]);

        for (x, z) in grid(47.0) {
            let expected: f64 = oriented
                .active_generators()
                .iter()
                .map(|g| oriented.contribution(x, z, g))
                .sum();
            assert_eq!(oriented.total_height(x, z).to_bits(), expected.to_bits());
        }
    }

    #[test]
    fn test_register_generator_is_idempotent() {
        let sampler = build(scenario());
        let overworld = DimensionDef::new("overworld");
        let ridges = Arc::new(GeneratorDef::new("ridges"));

        assert!(sampler.register_generator(Arc::clone(&ridges), &overworld));
        assert!(!sampler.register_generator(Arc::clone(&ridges), &overworld));
        assert!(!sampler.register_generator(Arc::new(GeneratorDef::new("ridges")), &overworld));

        let registry = sampler.active_generators(Orientation::Floor);
        assert_eq!(registry.keys().filter(|k| *k == "ridges").count(), 1);
        assert_eq!(registry.skipped_collisions(), 0);
        assert!(sampler.active_generators(Orientation::Ceiling).is_empty());
    }

    #[test]
    fn test_register_collision_is_counted() {
        let sampler = build(scenario());
        let overworld = DimensionDef::new("overworld");
        let other = Arc::new(GeneratorDef::new("hills").with_seed(99));

        assert!(!sampler.register_generator(other, &overworld));
        assert_eq!(sampler.skipped_collisions(Orientation::Floor), 1);
        assert_eq!(sampler.skipped_collisions(Orientation::Ceiling), 0);
        assert_eq!(sampler.epoch(), 1);
        let registry = sampler.active_generators(Orientation::Floor);
        assert_eq!(registry.get("hills").unwrap().def().seed, 0);
    }

    #[test]
    fn test_register_keeps_biome_cache() {
        let sampler = build(scenario());
        sampler.biome(0.0, 0.0);
        sampler.register_generator(
            Arc::new(GeneratorDef::new("ridges")),
            &DimensionDef::new("overworld"),
        );
        assert_eq!(sampler.epoch(), 2);
        assert_eq!(sampler.primary().cache().len(), 1);
    }

    #[test]
    fn test_rebuild_is_complete_on_nested_and_cyclic_children() {
        let mut set = scenario();
        for key in ["ridges", "dunes"] {
            set.insert_generator(GeneratorDef::new(key)).unwrap();
        }
        set.replace_biome(
            BiomeDef::new("forest")
                .with_child("grove")
                .with_generator("hills", 0.0, 1.0),
        );
        set.insert_biome(
            BiomeDef::new("grove")
                .with_child("forest")
                .with_child("glade")
                .with_generator("ridges", 0.0, 1.0),
        )
        .unwrap();
        set.insert_biome(
            BiomeDef::new("glade")
                .with_child("glade")
                .with_generator("dunes", 0.0, 1.0)
                .with_generator("ridges", 0.0, 1.0),
        )
        .unwrap();

        let sampler = build(set);
        let report = sampler.on_hotloaded().unwrap();
        let mut keys: Vec<_> = sampler
            .active_generators(Orientation::Floor)
            .keys()
            .map(str::to_string)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, ["dunes", "hills", "ridges"]);
        assert_eq!(report.generators, [3, 0]);
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_missing_references_are_reported() {
        let mut set = scenario();
        set.replace_biome(
            BiomeDef::new("forest")
                .with_child("thicket")
                .with_generator("canopy", 0.0, 1.0),
        );
        set.replace_dimension(
            DimensionDef::new("overworld")
                .with_region("r1")
                .with_region("r9"),
        );

        let sampler = build(set);
        let report = sampler.on_hotloaded().unwrap();
        assert_eq!(report.missing.len(), 3, "{:?}", report.missing);
        assert_eq!(sampler.active_generators(Orientation::Floor).len(), 1);
        for (x, z) in grid(53.0) {
            let name = sampler.biome(x, z).name().to_string();
            assert!(name == "plains" || name == "forest");
        }
    }

    fn three_regions() -> DefinitionSet {
        let mut set = scenario();
        set.insert_biome(BiomeDef::new("ocean")).unwrap();
        set.insert_biome(BiomeDef::new("desert")).unwrap();
        set.insert_region(RegionDef::new("r2").with_sea("ocean")).unwrap();
        set.insert_region(RegionDef::new("r3").with_land("desert")).unwrap();
        set.replace_dimension(
            DimensionDef::new("overworld")
                .with_region("r1")
                .with_region("r2")
                .with_region("r3")
                .with_focus("ocean"),
        );
        set
    }

    #[test]
    fn test_focus_overrides_every_region() {
        let set = three_regions();
        let unfocused = {
            let mut plain = set.clone();
            plain.replace_dimension(
                DimensionDef::new("overworld")
                    .with_region("r1")
                    .with_region("r2")
                    .with_region("r3"),
            );
            build(plain)
        };
        let focused = build(set);

        let mut by_region: hashbrown::HashMap<String, (f64, f64)> = hashbrown::HashMap::new();
        for (x, z) in grid(400.0) {
            by_region.entry(unfocused.region(x, z).name.clone()).or_insert((x, z));
        }
        assert_eq!(by_region.len(), 3, "{by_region:?}");

        for (x, z) in by_region.values() {
            let result = focused.biome(*x, *z);
            assert_eq!(result.name(), "ocean");
            assert_eq!(result.class(), BiomeClass::Sea);
            assert_eq!(focused.primary().biome_uncached(*x, *z), result);
        }
        assert!(focused.primary().cache().is_empty());
        assert_eq!(focused.primary().layout().focus().map(|f| f.name()), Some("ocean"));
    }

    #[test]
    fn test_missing_focus_falls_back_to_selection() {
        let mut set = three_regions();
        set.replace_dimension(
            DimensionDef::new("overworld")
                .with_region("r1")
                .with_focus("atlantis"),
        );
        let sampler = build(set);
        let report = sampler.on_hotloaded().unwrap();
        assert!(report.missing.contains(&MissingReference::Focus {
            dimension: "overworld".into(),
            biome: "atlantis".into(),
        }));
        let name = sampler.biome(0.0, 0.0).name().to_string();
        assert!(name == "plains" || name == "forest");
    }

    /// Definition source that the host mutates in place before hot-reloading.
    struct LiveDefinitions(RwLock<DefinitionSet>);

    impl DefinitionSource for LiveDefinitions {
        fn dimension(&self, key: &str) -> Option<Arc<DimensionDef>> {
            self.0.read().dimension(key)
        }
        fn region(&self, key: &str) -> Option<Arc<RegionDef>> {
            self.0.read().region(key)
        }
        fn biome(&self, key: &str) -> Option<Arc<BiomeDef>> {
            self.0.read().biome(key)
        }
        fn generator(&self, key: &str) -> Option<Arc<GeneratorDef>> {
            self.0.read().generator(key)
        }
    }

    #[test]
    fn test_hotload_picks_up_new_bounds() {
        let live = Arc::new(LiveDefinitions(RwLock::new(scenario())));
        let sampler = BiomeSampler::builder(SEED, live.clone())
            .dimension("overworld")
            .build()
            .unwrap();

        let oriented = sampler.primary();
        let hills = Arc::clone(oriented.active_generators().get("hills").unwrap());
        let (x, z) = grid(23.0)
            .find(|&(x, z)| tap_biomes(&oriented, &hills, x, z).iter().all(|b| b == "plains"))
            .unwrap();
        assert!(oriented.total_height(x, z) <= 4.0);
        assert!(!oriented.cache().is_empty());

        live.0
            .write()
            .replace_biome(BiomeDef::new("plains").with_generator("hills", 10.0, 20.0));
        let report = sampler.on_hotloaded().unwrap();
        assert_eq!(report.epoch, 2);
        assert!(sampler.primary().cache().is_empty());

        let after = sampler.total_height(x, z);
        assert!((10.0..=20.0).contains(&after), "reloaded total {after}");
        // The pinned sampler still sees its own generation.
        assert!(oriented.total_height(x, z) <= 4.0);
        assert_eq!(oriented.epoch(), 1);
    }

    #[test]
    fn test_reload_swaps_definitions() {
        let sampler = build(scenario());
        let mut next = scenario();
        next.replace_biome(BiomeDef::new("forest").with_generator("hills", 7.0, 7.0));
        let report = sampler.reload(Arc::new(next)).unwrap();
        assert_eq!(report.epoch, sampler.epoch());

        let oriented = sampler.primary();
        let hills = Arc::clone(oriented.active_generators().get("hills").unwrap());
        let (x, z) = grid(23.0)
            .find(|&(x, z)| tap_biomes(&oriented, &hills, x, z).iter().all(|b| b == "forest"))
            .unwrap();
        assert!((sampler.total_height(x, z) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_reload_keeps_previous_generation() {
        let sampler = build(scenario());
        sampler.biome(5.0, 5.0);
        let before = sampler.epoch();

        let err = sampler.reload(Arc::new(DefinitionSet::new())).unwrap_err();
        assert!(matches!(err, SamplerError::UnknownDimension(ref k) if k == "overworld"));
        assert_eq!(sampler.epoch(), before);
        assert_eq!(sampler.primary().cache().len(), 1);
        assert_eq!(sampler.biome(5.0, 5.0), build(scenario()).biome(5.0, 5.0));
    }

    #[test]
    fn test_builder_errors() {
        let defs: Arc<dyn DefinitionSource> = Arc::new(scenario());
        assert!(matches!(
            BiomeSampler::builder(SEED, defs.clone()).build(),
            Err(SamplerError::NoDimensions)
        ));
        assert!(matches!(
            BiomeSampler::builder(SEED, defs.clone()).dimension("nether").build(),
            Err(SamplerError::UnknownDimension(_))
        ));

        let mut set = scenario();
        set.insert_dimension(DimensionDef::new("overworld_copy").with_region("r1"))
            .unwrap();
        let result = BiomeSampler::builder(SEED, Arc::new(set))
            .dimension("overworld")
            .dimension("overworld_copy")
            .build();
        assert!(matches!(
            result,
            Err(SamplerError::DuplicateOrientation {
                orientation: Orientation::Floor,
                ..
            })
        ));

        let mut empty = scenario();
        empty.insert_dimension(DimensionDef::new("void").inverted())
            .unwrap();
        assert!(matches!(
            BiomeSampler::builder(SEED, Arc::new(empty)).dimension("void").build(),
            Err(SamplerError::NoUsableRegions(_))
        ));
    }

    #[test]
    fn test_orientations_are_independent() {
        let mut set = scenario();
        set.insert_generator(GeneratorDef::new("stalactites")).unwrap();
        set.insert_biome(BiomeDef::new("cavern").with_generator("stalactites", -6.0, 0.0))
            .unwrap();
        set.insert_region(RegionDef::new("underside").with_land("cavern"))
            .unwrap();
        set.insert_dimension(DimensionDef::new("ceiling").with_region("underside").inverted())
            .unwrap();

        let sampler = BiomeSampler::builder(SEED, Arc::new(set))
            .dimension("ceiling")
            .dimension("overworld")
            .build()
            .unwrap();

        assert_eq!(sampler.primary().orientation(), Orientation::Floor);
        let ceiling = sampler.oriented(Orientation::Ceiling).unwrap();
        assert_eq!(ceiling.biome(3.0, 3.0).name(), "cavern");
        let floor_keys: Vec<_> = sampler.active_generators(Orientation::Floor).keys().map(str::to_string).collect();
        let ceiling_keys: Vec<_> = ceiling.active_generators().keys().collect();
        assert_eq!(floor_keys, ["hills"]);
        assert_eq!(ceiling_keys, ["stalactites"]);

        sampler.biome(3.0, 3.0);
        assert_eq!(ceiling.cache().len(), 1);
        assert_eq!(sampler.primary().cache().len(), 1);
        assert!(ceiling.total_height(3.0, 3.0) <= 0.0);
    }

    #[test]
    fn test_parallel_sampling_matches_sequential() {
        let sampler = Arc::new(build(scenario()));
        let fresh = build(scenario());
        let expected: Vec<(String, u64)> = grid(19.0)
            .take(200)
            .map(|(x, z)| (fresh.biome(x, z).name().to_string(), fresh.total_height(x, z).to_bits()))
            .collect();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sampler = Arc::clone(&sampler);
                std::thread::spawn(move || {
                    grid(19.0)
                        .take(200)
                        .map(|(x, z)| {
                            (sampler.biome(x, z).name().to_string(), sampler.total_height(x, z).to_bits())
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_reload_during_sampling() {
        let sampler = Arc::new(build(scenario()));
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|t| {
                let sampler = Arc::clone(&sampler);
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    let mut rounds = 0_u32;
                    while !stop.load(std::sync::atomic::Ordering::Relaxed) || rounds == 0 {
                        let pinned = sampler.primary();
                        let epoch = pinned.epoch();
                        for i in 0..64 {
                            let x = f64::from(t * 1000 + i * 7);
                            let name = pinned.biome(x, -x).name().to_string();
                            assert!(name == "plains" || name == "forest");
                            assert!(pinned.total_height(x, -x).is_finite());
                        }
                        assert_eq!(pinned.epoch(), epoch);
                        rounds += 1;
                    }
                    rounds
                })
            })
            .collect();

        for _ in 0..20 {
            sampler.on_hotloaded().unwrap();
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(sampler.epoch(), 21);
    }
}
