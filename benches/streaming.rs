use criterion::{criterion_group, criterion_main, Criterion, black_box};

use glam::IVec2;

use marchland::biome::BiomePipeline;
use marchland::core::WorldConfig;
use marchland::mesh::{extract, ExtractParams, MeshAssembler};
use marchland::pipeline::TerrainContext;
use marchland::terrain::{ChunkCoord, DensityGrid};

fn context() -> TerrainContext {
    TerrainContext::new(&WorldConfig::default()).unwrap()
}

fn bench_density_sample(c: &mut Criterion) {
    let ctx = context();

    c.bench_function("density_sample_chunk", |b| {
        b.iter(|| DensityGrid::sample(&ctx.density, &ctx.layout, black_box(ChunkCoord::new(3, -2))));
    });
}

fn bench_extract(c: &mut Criterion) {
    let ctx = context();
    let grid = ctx.sample_density(ChunkCoord::new(3, -2));

    c.bench_function("extract_chunk", |b| {
        b.iter(|| extract(black_box(&grid), &ExtractParams::from_layout(&ctx.layout)));
    });

    let coarse = ExtractParams { step: 2, ..ExtractParams::from_layout(&ctx.layout) };
    c.bench_function("extract_chunk_step2", |b| {
        b.iter(|| extract(black_box(&grid), &coarse));
    });
}

fn bench_assemble(c: &mut Criterion) {
    let ctx = context();
    let coord = ChunkCoord::new(3, -2);
    let grid = ctx.sample_density(coord);
    let extraction = ctx.extract(coord, &grid);
    let biomes = ctx.generate_biomes(coord).unwrap();
    let assembler = MeshAssembler::new(&ctx.density, &ctx.registry, &ctx.layout, ctx.biomes.cell_size());

    c.bench_function("assemble_chunk", |b| {
        b.iter(|| assembler.assemble(coord, black_box(&extraction), &biomes).unwrap());
    });
}

fn bench_biomes(c: &mut Criterion) {
    let config = WorldConfig::default();
    let registry = config.biomes.registry().unwrap();
    let pipeline = BiomePipeline::from_config(&config.biomes, &registry, config.seed).unwrap();

    c.bench_function("biome_region_64", |b| {
        b.iter(|| pipeline.generate(black_box(IVec2::new(-32, -32)), IVec2::new(31, 31)).unwrap());
    });
}

fn bench_build_chunk(c: &mut Criterion) {
    let ctx = context();

    c.bench_function("build_chunk_blocking", |b| {
        b.iter(|| ctx.build_chunk_blocking(black_box(ChunkCoord::new(-1, 4))).unwrap());
    });
}

criterion_group!(
    benches,
    bench_density_sample,
    bench_extract,
    bench_assemble,
    bench_biomes,
    bench_build_chunk,
);
criterion_main!(benches);
