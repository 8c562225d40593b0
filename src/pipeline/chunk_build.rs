//! Per-chunk build chain
//!
//! density ─► extract ─┐
//!                     ├─► assemble ─► collision
//! biomes ─────────────┘

use std::sync::Arc;
use std::time::Instant;

use super::jobs::{JobHandle, JobSystem};
use crate::biome::{BiomePipeline, BiomeRegistry, ChunkBiome};
use crate::core::{Result, WorldConfig};
use crate::mesh::{extract, CollisionMesh, ExtractParams, Extraction, MeshAssembler, MeshBuffers};
use crate::streaming::ChunkSource;
use crate::terrain::{ChunkCoord, ChunkLayout, DensityField, DensityGrid};

/// Finished chunk handed back to the scheduler
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkMesh {
    pub coord: ChunkCoord,
    pub buffers: MeshBuffers,
    pub collision: CollisionMesh,
}

/// Shared, read-only world state every chunk build draws from
pub struct TerrainContext {
    pub layout: ChunkLayout,
    pub density: DensityField,
    pub registry: BiomeRegistry,
    pub biomes: BiomePipeline,
    pub extract_params: ExtractParams,
}

impl TerrainContext {
    pub fn new(config: &WorldConfig) -> Result<Self> {
        config.validate()?;

        let registry = config.biomes.registry()?;
        let biomes = BiomePipeline::from_config(&config.biomes, &registry, config.seed)?;

        Ok(Self {
            layout: config.layout.clone(),
            density: DensityField::new(&config.density, config.seed),
            registry,
            biomes,
            extract_params: ExtractParams::from_layout(&config.layout),
        })
    }

    pub fn sample_density(&self, coord: ChunkCoord) -> DensityGrid {
        let start = Instant::now();
        let grid = DensityGrid::sample(&self.density, &self.layout, coord);
        log::trace!("Chunk {coord:?}: sampled {} densities in {:?}", grid.len(), start.elapsed());
        grid
    }

    pub fn generate_biomes(&self, coord: ChunkCoord) -> Result<ChunkBiome> {
        let start = Instant::now();
        let grid = self.biomes.generate_chunk(&self.layout, coord)?;
        log::trace!("Chunk {coord:?}: biomes {}x{} in {:?}", grid.width(), grid.depth(), start.elapsed());
        Ok(grid)
    }

    pub fn extract(&self, coord: ChunkCoord, grid: &DensityGrid) -> Extraction {
        let start = Instant::now();
        let extraction = extract(grid, &self.extract_params);
        log::trace!(
            "Chunk {coord:?}: extracted {} triangles in {:?}",
            extraction.triangles.len(),
            start.elapsed()
        );
        extraction
    }

    pub fn assemble(&self, coord: ChunkCoord, extraction: &Extraction, biomes: &ChunkBiome) -> Result<MeshBuffers> {
        let start = Instant::now();
        let assembler = MeshAssembler::new(&self.density, &self.registry, &self.layout, self.biomes.cell_size());
        let buffers = assembler.assemble(coord, extraction, biomes)?;
        log::trace!(
            "Chunk {coord:?}: assembled {} vertices, {} submeshes in {:?}",
            buffers.vertex_count(),
            buffers.submeshes.len(),
            start.elapsed()
        );
        Ok(buffers)
    }

    /// Run the whole chain on the calling thread
    pub fn build_chunk_blocking(&self, coord: ChunkCoord) -> Result<ChunkMesh> {
        let grid = self.sample_density(coord);
        let biomes = self.generate_biomes(coord)?;
        let extraction = self.extract(coord, &grid);
        let buffers = self.assemble(coord, &extraction, &biomes)?;
        let collision = CollisionMesh::bake(&buffers);
        Ok(ChunkMesh { coord, buffers, collision })
    }
}

/// Builds chunks on the job system
pub struct ChunkPipeline {
    context: Arc<TerrainContext>,
    jobs: JobSystem,
}

impl ChunkPipeline {
    pub fn new(context: Arc<TerrainContext>, jobs: JobSystem) -> Self {
        Self { context, jobs }
    }

    pub fn from_config(config: &WorldConfig) -> Result<Self> {
        let context = TerrainContext::new(config)?;
        let jobs = JobSystem::new(config.streaming.worker_threads)?;
        Ok(Self::new(Arc::new(context), jobs))
    }

    pub fn context(&self) -> &Arc<TerrainContext> {
        &self.context
    }

    /// Schedule the full chain for one chunk
    pub fn build(&self, coord: ChunkCoord) -> JobHandle<ChunkMesh> {
        let ctx = Arc::clone(&self.context);
        let density = self.jobs.schedule(move || ctx.sample_density(coord));

        let ctx = Arc::clone(&self.context);
        let biomes = self.jobs.try_schedule(move || ctx.generate_biomes(coord));

        let ctx = Arc::clone(&self.context);
        let extraction = self.jobs.schedule_after(density, move |grid| ctx.extract(coord, &grid));

        let inputs = self.jobs.join(extraction, biomes);
        let ctx = Arc::clone(&self.context);
        let buffers = self
            .jobs
            .try_schedule_after(inputs, move |(extraction, biomes)| ctx.assemble(coord, &extraction, &biomes));

        self.jobs.schedule_after(buffers, move |buffers| {
            let collision = CollisionMesh::bake(&buffers);
            ChunkMesh { coord, buffers, collision }
        })
    }

    pub fn shutdown(self) {
        self.jobs.shutdown();
    }
}

impl ChunkSource for ChunkPipeline {
    fn request(&mut self, coord: ChunkCoord) -> JobHandle<ChunkMesh> {
        self.build(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::streaming::StreamingConfig;

    fn small_config() -> WorldConfig {
        WorldConfig {
            seed: 11,
            streaming: StreamingConfig { near_radius: 1, far_radius: 2.0, worker_threads: 2, ..Default::default() },
            layout: ChunkLayout { chunk_size: 8, chunk_height: 48, ..Default::default() },
            ..Default::default()
        }
    }

    #[test]
    fn test_async_build_matches_blocking() {
        let pipeline = ChunkPipeline::from_config(&small_config()).unwrap();
        let coord = ChunkCoord::new(-1, 2);

        let built = pipeline.build(coord).wait().unwrap();
        let direct = pipeline.context().build_chunk_blocking(coord).unwrap();

        assert_eq!(built.coord, coord);
        assert!(!built.buffers.is_empty());
        assert_eq!(built.buffers.positions, direct.buffers.positions);
        assert_eq!(built.buffers.submeshes.len(), direct.buffers.submeshes.len());
        assert_eq!(built.collision.triangle_count(), direct.collision.triangle_count());
    }

    #[test]
    fn test_collision_matches_render_mesh() {
        let context = TerrainContext::new(&small_config()).unwrap();
        let mesh = context.build_chunk_blocking(ChunkCoord::new(0, 0)).unwrap();

        assert_eq!(mesh.collision.vertices, mesh.buffers.positions);
        assert!(mesh.collision.triangle_count() <= mesh.buffers.triangle_count());
        assert_eq!(mesh.collision.bounds, mesh.buffers.bounds);
    }

    #[test]
    fn test_many_chunks_in_parallel() {
        let pipeline = ChunkPipeline::from_config(&small_config()).unwrap();
        let handles: Vec<_> = (0..6).map(|i| pipeline.build(ChunkCoord::new(i, -i))).collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let mesh = handle.wait().unwrap();
            assert_eq!(mesh.coord, ChunkCoord::new(i as i32, -(i as i32)));
        }
    }

    #[test]
    fn test_unknown_seed_biome_fails_setup() {
        let mut config = small_config();
        config.biomes.seed_biomes[0].biome = "lava".into();
        assert!(matches!(TerrainContext::new(&config), Err(Error::UnknownBiome(_))));
    }
}
