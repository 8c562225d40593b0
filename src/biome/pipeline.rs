//! Staged biome generation for chunk regions
//!
//! A request names the final cells it needs. The pipeline walks its stages
//! backwards to find the seed rectangle that feeds them, seeds it, runs every
//! stage forward and crops the result. Since every stage only reads global
//! coordinates, neighbouring chunks agree wherever their regions overlap.

use glam::IVec2;
use std::time::Instant;

use super::config::{BiomeConfig, StageConfig, WeightedName, SELF_CHOICE};
use super::grid::ChunkBiome;
use super::hash::cell_hash;
use super::registry::{BiomeId, BiomeRegistry, WeightedList};
use super::stage::{Choice, Stage};
use crate::core::Result;
use crate::terrain::{ChunkCoord, ChunkLayout};

const SEED_SALT: u32 = 0;

/// Ordered list of biome stages behind a weighted seed grid
#[derive(Clone, Debug)]
pub struct BiomePipeline {
    seed: u32,
    cell_size: f32,
    seed_biomes: WeightedList<BiomeId>,
    stages: Vec<Stage>,
}

impl BiomePipeline {
    pub fn new(seed: u32, cell_size: f32, seed_biomes: WeightedList<BiomeId>, stages: Vec<Stage>) -> Self {
        Self { seed, cell_size, seed_biomes, stages }
    }

    /// Resolve every biome name and tag in `config`
    pub fn from_config(config: &BiomeConfig, registry: &BiomeRegistry, seed: u32) -> Result<Self> {
        config.validate()?;

        let seed_biomes = WeightedList::new(
            config
                .seed_biomes
                .iter()
                .map(|w| -> Result<(BiomeId, f32)> { Ok((registry.id(&w.biome)?, w.weight)) })
                .collect::<Result<_>>()?,
        )?;

        let stages = config
            .stages
            .iter()
            .map(|stage| resolve_stage(stage, registry))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Biome pipeline: {} biomes, {} stages ({})",
            registry.len(),
            stages.len(),
            stages.iter().map(Stage::name).collect::<Vec<_>>().join(" > ")
        );

        Ok(Self::new(seed, config.cell_size, seed_biomes, stages))
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Seed rectangle needed to produce final cells `[min, max]`
    pub fn plan(&self, min: IVec2, max: IVec2) -> (IVec2, IVec2) {
        self.stages
            .iter()
            .rev()
            .fold((min, max), |(min, max), stage| stage.input_region(min, max))
    }

    /// Weighted seed pick for every cell of `[min, max]`
    pub fn seed_grid(&self, min: IVec2, max: IVec2) -> ChunkBiome {
        let size = (max - min + IVec2::ONE).max(IVec2::ONE);
        ChunkBiome::from_fn(min, size.x as u32, size.y as u32, |x, z| {
            *self.seed_biomes.pick(cell_hash(self.seed, SEED_SALT, x, z))
        })
    }

    /// Final biome cells `[min, max]`
    pub fn generate(&self, min: IVec2, max: IVec2) -> Result<ChunkBiome> {
        let (seed_min, seed_max) = self.plan(min, max);
        let mut grid = self.seed_grid(seed_min, seed_max);

        for (index, stage) in self.stages.iter().enumerate() {
            let start = Instant::now();
            grid = stage.apply(&grid, self.seed, index as u32 + 1);
            log::trace!(
                "Biome stage {} ({}) -> {}x{} in {:?}",
                index,
                stage.name(),
                grid.width(),
                grid.depth(),
                start.elapsed()
            );
        }

        grid.crop(min, max)
    }

    /// Final cells under a chunk's core column
    pub fn chunk_region(&self, layout: &ChunkLayout, coord: ChunkCoord) -> (IVec2, IVec2) {
        let bounds = layout.chunk_bounds(coord);
        let cell = |v: f32| (v / self.cell_size).floor() as i32;
        (
            IVec2::new(cell(bounds.min.x), cell(bounds.min.z)),
            IVec2::new(cell(bounds.max.x), cell(bounds.max.z)),
        )
    }

    pub fn generate_chunk(&self, layout: &ChunkLayout, coord: ChunkCoord) -> Result<ChunkBiome> {
        let (min, max) = self.chunk_region(layout, coord);
        self.generate(min, max)
    }
}

fn resolve_choices(choices: &[WeightedName], registry: &BiomeRegistry) -> Result<WeightedList<Choice>> {
    let entries = choices
        .iter()
        .map(|w| -> Result<(Choice, f32)> {
            let choice = if w.biome == SELF_CHOICE {
                Choice::Keep
            } else {
                Choice::Biome(registry.id(&w.biome)?)
            };
            Ok((choice, w.weight))
        })
        .collect::<Result<_>>()?;
    WeightedList::new(entries)
}

fn resolve_stage(config: &StageConfig, registry: &BiomeRegistry) -> Result<Stage> {
    Ok(match config {
        StageConfig::Expand => Stage::Expand,
        StageConfig::Smooth => Stage::Smooth,
        StageConfig::Replace { tags, choices } => Stage::Replace {
            targets: registry.tagged(tags)?,
            choices: resolve_choices(choices, registry)?,
        },
        StageConfig::Border { from_tags, replace_tags, choices } => Stage::Border {
            from: registry.tagged(from_tags)?,
            targets: registry.tagged(replace_tags)?,
            choices: resolve_choices(choices, registry)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeDef;
    use crate::core::Error;

    fn two_biome_config(stages: Vec<StageConfig>) -> BiomeConfig {
        BiomeConfig {
            cell_size: 1.0,
            biomes: vec![
                BiomeDef {
                    name: "a".into(),
                    tags: vec!["first".into()],
                    color: [1.0, 0.0, 0.0],
                },
                BiomeDef {
                    name: "b".into(),
                    tags: vec!["second".into()],
                    color: [0.0, 0.0, 1.0],
                },
            ],
            seed_biomes: vec![WeightedName::new("a", 1.0), WeightedName::new("b", 1.0)],
            stages,
        }
    }

    fn build(config: &BiomeConfig, seed: u32) -> BiomePipeline {
        let registry = config.registry().unwrap();
        BiomePipeline::from_config(config, &registry, seed).unwrap()
    }

    #[test]
    fn test_seed_grid_reproducible() {
        let config = two_biome_config(Vec::new());
        let first = build(&config, 42).generate(IVec2::ZERO, IVec2::splat(2)).unwrap();
        let second = build(&config, 42).generate(IVec2::ZERO, IVec2::splat(2)).unwrap();

        assert_eq!(first.width(), 3);
        assert_eq!(first.depth(), 3);
        assert_eq!(first, second);
        for (_, _, id) in first.iter() {
            assert!(id == BiomeId(0) || id == BiomeId(1));
        }
    }

    #[test]
    fn test_empty_stage_list_is_identity() {
        let pipeline = build(&two_biome_config(Vec::new()), 9);
        let (min, max) = (IVec2::new(-4, 2), IVec2::new(3, 6));

        assert_eq!(pipeline.plan(min, max), (min, max));
        assert_eq!(pipeline.generate(min, max).unwrap(), pipeline.seed_grid(min, max));
    }

    #[test]
    fn test_unknown_biome_fails_setup() {
        let config = two_biome_config(vec![StageConfig::Replace {
            tags: vec!["first".into()],
            choices: vec![WeightedName::new("swamp", 1.0)],
        }]);
        let registry = config.registry().unwrap();
        assert!(matches!(
            BiomePipeline::from_config(&config, &registry, 1),
            Err(Error::UnknownBiome(name)) if name == "swamp"
        ));
    }

    #[test]
    fn test_unmatched_tag_fails_setup() {
        let config = two_biome_config(vec![StageConfig::Border {
            from_tags: vec!["frist".into()],
            replace_tags: vec!["second".into()],
            choices: vec![WeightedName::new("a", 1.0)],
        }]);
        let registry = config.registry().unwrap();
        assert!(matches!(
            BiomePipeline::from_config(&config, &registry, 1),
            Err(Error::Config(msg)) if msg.contains("frist")
        ));
    }

    #[test]
    fn test_plan_walks_stages_backwards() {
        let pipeline = build(
            &two_biome_config(vec![StageConfig::Expand, StageConfig::Smooth, StageConfig::Expand]),
            1,
        );
        // Expand: [0, 7] <- [0, 4]; smooth: [0, 4] <- [-1, 5]; expand: [-1, 5] <- [-1, 3]
        let (min, max) = pipeline.plan(IVec2::ZERO, IVec2::splat(7));
        assert_eq!(min, IVec2::splat(-1));
        assert_eq!(max, IVec2::splat(3));
    }

    #[test]
    fn test_overlapping_regions_agree() {
        let pipeline = build(&BiomeConfig::default(), 1234);
        let left = pipeline.generate(IVec2::new(0, 0), IVec2::new(9, 9)).unwrap();
        let right = pipeline.generate(IVec2::new(5, -3), IVec2::new(17, 6)).unwrap();

        let mut shared = 0;
        for (x, z, id) in left.iter() {
            if let Some(other) = right.get(x, z) {
                assert_eq!(id, other, "disagreement at ({x}, {z})");
                shared += 1;
            }
        }
        assert_eq!(shared, 5 * 7);
    }

    #[test]
    fn test_chunk_region_covers_chunk() {
        let pipeline = build(&BiomeConfig::default(), 3);
        let layout = ChunkLayout::default();
        let (min, max) = pipeline.chunk_region(&layout, ChunkCoord::new(-1, 2));

        // 16 world units per chunk at 4 units per cell, inclusive far edge
        assert_eq!(min, IVec2::new(-4, 8));
        assert_eq!(max, IVec2::new(0, 12));

        let grid = pipeline.generate_chunk(&layout, ChunkCoord::new(-1, 2)).unwrap();
        assert_eq!(grid.origin(), min);
        assert_eq!(grid.max(), max);
    }
}
