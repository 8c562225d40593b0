//! Layered-noise density field
//!
//! Positive density is solid, negative is air. Each noise layer adds
//! fractal detail and a vertical bias pulls density down with height so the
//! iso-surface settles into a roughly planar ground.

use glam::Vec3;
use noise::{Fbm, MultiFractal, NoiseFn, OpenSimplex, Perlin, RidgedMulti};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Octave limit of the fractal noise sources
pub const MAX_OCTAVES: u32 = 32;

/// Base noise used by a density layer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    Perlin,
    Simplex,
    Ridged,
}

/// One octave stack contributing to the density sum
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseLayer {
    pub kind: NoiseKind,
    pub frequency: f64,
    pub octaves: u32,
    /// Weight of this layer in the sum
    pub amplitude: f32,
    /// Added to the world seed so layers decorrelate
    pub seed_offset: u32,
}

impl Default for NoiseLayer {
    fn default() -> Self {
        Self {
            kind: NoiseKind::Perlin,
            frequency: 0.02,
            octaves: 4,
            amplitude: 12.0,
            seed_offset: 0,
        }
    }
}

/// Parameters controlling the density field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityParams {
    pub layers: Vec<NoiseLayer>,
    /// Height at which the vertical bias crosses zero
    pub ground_height: f32,
    /// Density lost per world unit of height
    pub height_falloff: f32,
}

impl Default for DensityParams {
    fn default() -> Self {
        Self {
            layers: vec![
                NoiseLayer {
                    kind: NoiseKind::Perlin,
                    frequency: 0.01,
                    octaves: 5,
                    amplitude: 16.0,
                    seed_offset: 0,
                },
                NoiseLayer {
                    kind: NoiseKind::Simplex,
                    frequency: 0.05,
                    octaves: 2,
                    amplitude: 3.0,
                    seed_offset: 17,
                },
            ],
            ground_height: 24.0,
            height_falloff: 1.0,
        }
    }
}

impl DensityParams {
    pub fn validate(&self) -> Result<()> {
        for (i, layer) in self.layers.iter().enumerate() {
            if !(layer.frequency.is_finite() && layer.frequency > 0.0) {
                return Err(Error::Config(format!("density layer {i}: frequency must be positive")));
            }
            if layer.octaves == 0 || layer.octaves > MAX_OCTAVES {
                return Err(Error::Config(format!(
                    "density layer {i}: octaves must be in 1..={MAX_OCTAVES}"
                )));
            }
            if !layer.amplitude.is_finite() {
                return Err(Error::Config(format!("density layer {i}: amplitude must be finite")));
            }
        }
        if !(self.ground_height.is_finite() && self.height_falloff.is_finite()) {
            return Err(Error::Config("ground_height and height_falloff must be finite".into()));
        }
        Ok(())
    }
}

enum LayerSource {
    Perlin(Fbm<Perlin>),
    Simplex(Fbm<OpenSimplex>),
    Ridged(RidgedMulti<Perlin>),
}

impl LayerSource {
    fn new(layer: &NoiseLayer, seed: u32) -> Self {
        let seed = seed.wrapping_add(layer.seed_offset);
        let octaves = layer.octaves as usize;
        match layer.kind {
            NoiseKind::Perlin => Self::Perlin(
                Fbm::<Perlin>::new(seed)
                    .set_octaves(octaves)
                    .set_frequency(layer.frequency),
            ),
            NoiseKind::Simplex => Self::Simplex(
                Fbm::<OpenSimplex>::new(seed)
                    .set_octaves(octaves)
                    .set_frequency(layer.frequency),
            ),
            NoiseKind::Ridged => Self::Ridged(
                RidgedMulti::<Perlin>::new(seed)
                    .set_octaves(octaves)
                    .set_frequency(layer.frequency),
            ),
        }
    }

    fn get(&self, point: [f64; 3]) -> f64 {
        match self {
            Self::Perlin(noise) => noise.get(point),
            Self::Simplex(noise) => noise.get(point),
            Self::Ridged(noise) => noise.get(point),
        }
    }
}

/// Deterministic scalar field sampled by every chunk.
///
/// Holds no mutable state, so one instance is shared by all worker threads.
pub struct DensityField {
    layers: Vec<(LayerSource, f32)>,
    ground_height: f32,
    height_falloff: f32,
    seed: u32,
}

impl DensityField {
    pub fn new(params: &DensityParams, seed: u32) -> Self {
        let layers = params
            .layers
            .iter()
            .map(|layer| (LayerSource::new(layer, seed), layer.amplitude))
            .collect();

        Self {
            layers,
            ground_height: params.ground_height,
            height_falloff: params.height_falloff,
            seed,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Density at a world position
    pub fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let point = [x as f64, y as f64, z as f64];
        let detail: f64 = self
            .layers
            .iter()
            .map(|(source, amplitude)| source.get(point) * *amplitude as f64)
            .sum();

        detail as f32 + (self.ground_height - y) * self.height_falloff
    }

    pub fn sample_at(&self, pos: Vec3) -> f32 {
        self.sample(pos.x, pos.y, pos.z)
    }

    /// Central-difference gradient from a six-sample stencil
    pub fn gradient(&self, pos: Vec3, eps: f32) -> Vec3 {
        let dx = self.sample(pos.x + eps, pos.y, pos.z) - self.sample(pos.x - eps, pos.y, pos.z);
        let dy = self.sample(pos.x, pos.y + eps, pos.z) - self.sample(pos.x, pos.y - eps, pos.z);
        let dz = self.sample(pos.x, pos.y, pos.z + eps) - self.sample(pos.x, pos.y, pos.z - eps);
        Vec3::new(dx, dy, dz) / (2.0 * eps)
    }
}
