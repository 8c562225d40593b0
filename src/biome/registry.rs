//! Biome definitions and weighted selection lists

use glam::Vec4;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::core::{Error, Result};

/// Compact biome identifier, an index into the [`BiomeRegistry`]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[repr(transparent)]
pub struct BiomeId(pub u16);

/// A registered biome
#[derive(Clone, Debug, PartialEq)]
pub struct Biome {
    pub id: BiomeId,
    pub name: String,
    pub tags: Vec<String>,
    /// Linear RGBA vertex color
    pub color: Vec4,
}

impl Biome {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.has_tag(t))
    }
}

/// Name and tag lookup for every biome a world uses.
///
/// Built once at setup; stages resolve names and tags against it so unknown
/// biomes fail before any chunk is generated.
#[derive(Clone, Debug, Default)]
pub struct BiomeRegistry {
    biomes: Vec<Biome>,
    by_name: HashMap<String, BiomeId>,
}

impl BiomeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, tags: &[String], color: Vec4) -> Result<BiomeId> {
        if self.by_name.contains_key(name) {
            return Err(Error::Config(format!("biome '{name}' registered twice")));
        }
        let index = u16::try_from(self.biomes.len())
            .map_err(|_| Error::Config("too many biomes".into()))?;

        let id = BiomeId(index);
        self.biomes.push(Biome {
            id,
            name: name.to_string(),
            tags: tags.to_vec(),
            color,
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Resolve a biome name
    pub fn id(&self, name: &str) -> Result<BiomeId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownBiome(name.to_string()))
    }

    pub fn get(&self, id: BiomeId) -> Option<&Biome> {
        self.biomes.get(id.0 as usize)
    }

    /// Vertex color of a biome, opaque magenta for ids outside the registry
    pub fn color(&self, id: BiomeId) -> Vec4 {
        self.get(id)
            .map(|b| b.color)
            .unwrap_or(Vec4::new(1.0, 0.0, 1.0, 1.0))
    }

    /// Every biome carrying at least one of `tags`
    pub fn with_any_tag(&self, tags: &[String]) -> BTreeSet<BiomeId> {
        self.biomes
            .iter()
            .filter(|b| b.has_any_tag(tags))
            .map(|b| b.id)
            .collect()
    }

    /// Like [`with_any_tag`](Self::with_any_tag), but every tag must match some biome
    pub fn tagged(&self, tags: &[String]) -> Result<BTreeSet<BiomeId>> {
        if let Some(tag) = tags
            .iter()
            .find(|tag| !self.biomes.iter().any(|b| b.has_tag(tag)))
        {
            return Err(Error::Config(format!("no biome is tagged '{tag}'")));
        }
        Ok(self.with_any_tag(tags))
    }

    pub fn len(&self) -> usize {
        self.biomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.biomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Biome> {
        self.biomes.iter()
    }
}

/// Items with relative weights, picked by a unit-interval sample
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedList<T> {
    entries: Vec<(T, f32)>,
    total: f32,
}

impl<T> WeightedList<T> {
    pub fn new(entries: Vec<(T, f32)>) -> Result<Self> {
        if entries.iter().any(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(Error::Config("weights must be finite and non-negative".into()));
        }
        let total: f32 = entries.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(Error::Config("weighted list needs a positive total weight".into()));
        }
        Ok(Self { entries, total })
    }

    /// Item whose cumulative weight range contains `unit * total`.
    ///
    /// `unit` is expected in `[0, 1]`; values at or past the end select the
    /// last item with non-zero weight.
    pub fn pick(&self, unit: f32) -> &T {
        let target = unit.clamp(0.0, 1.0) * self.total;
        let mut acc = 0.0;
        let mut last = &self.entries[0].0;

        for (item, weight) in &self.entries {
            if *weight <= 0.0 {
                continue;
            }
            acc += weight;
            last = item;
            if target < acc {
                return item;
            }
        }
        last
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(item, _)| item)
    }
}
