//! Serializable biome setup

use glam::Vec4;
use serde::{Deserialize, Serialize};

use super::registry::BiomeRegistry;
use crate::core::{Error, Result};

/// Choice name that leaves a cell unchanged
pub const SELF_CHOICE: &str = "self";

/// A biome declaration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiomeDef {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Linear RGB
    pub color: [f32; 3],
}

impl BiomeDef {
    fn new(name: &str, tags: &[&str], color: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            color,
        }
    }
}

/// Biome name with a relative weight
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedName {
    pub biome: String,
    pub weight: f32,
}

impl WeightedName {
    pub fn new(biome: &str, weight: f32) -> Self {
        Self { biome: biome.to_string(), weight }
    }
}

/// Stage declaration, resolved against the registry at setup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageConfig {
    Expand,
    Replace {
        tags: Vec<String>,
        choices: Vec<WeightedName>,
    },
    Smooth,
    Border {
        from_tags: Vec<String>,
        replace_tags: Vec<String>,
        choices: Vec<WeightedName>,
    },
}

/// Full biome generation setup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeConfig {
    /// World size of one cell in the final biome grid
    pub cell_size: f32,
    pub biomes: Vec<BiomeDef>,
    /// Weighted biomes drawn for each seed cell
    pub seed_biomes: Vec<WeightedName>,
    pub stages: Vec<StageConfig>,
}

impl Default for BiomeConfig {
    fn default() -> Self {
        Self {
            cell_size: 4.0,
            biomes: vec![
                BiomeDef::new("ocean", &["water"], [0.12, 0.31, 0.59]),
                BiomeDef::new("beach", &["land", "coast"], [0.93, 0.84, 0.69]),
                BiomeDef::new("plains", &["land", "temperate"], [0.39, 0.71, 0.31]),
                BiomeDef::new("forest", &["land", "temperate"], [0.2, 0.47, 0.16]),
                BiomeDef::new("desert", &["land", "dry"], [0.93, 0.79, 0.69]),
                BiomeDef::new("mountains", &["land", "highland"], [0.47, 0.47, 0.47]),
                BiomeDef::new("snow", &["land", "cold"], [0.94, 0.97, 1.0]),
            ],
            seed_biomes: vec![
                WeightedName::new("ocean", 1.0),
                WeightedName::new("plains", 2.0),
                WeightedName::new("desert", 1.0),
                WeightedName::new("snow", 1.0),
            ],
            stages: vec![
                StageConfig::Expand,
                StageConfig::Replace {
                    tags: vec!["temperate".into()],
                    choices: vec![WeightedName::new(SELF_CHOICE, 2.0), WeightedName::new("forest", 1.0)],
                },
                StageConfig::Expand,
                StageConfig::Replace {
                    tags: vec!["dry".into(), "cold".into()],
                    choices: vec![WeightedName::new(SELF_CHOICE, 3.0), WeightedName::new("mountains", 1.0)],
                },
                StageConfig::Smooth,
                StageConfig::Border {
                    from_tags: vec!["water".into()],
                    replace_tags: vec!["land".into()],
                    choices: vec![WeightedName::new("beach", 1.0)],
                },
                StageConfig::Expand,
                StageConfig::Smooth,
            ],
        }
    }
}

impl BiomeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(Error::Config("biome cell_size must be positive".into()));
        }
        if self.seed_biomes.is_empty() {
            return Err(Error::Config("seed_biomes must name at least one biome".into()));
        }
        Ok(())
    }

    /// Register every declared biome in declaration order
    pub fn registry(&self) -> Result<BiomeRegistry> {
        let mut registry = BiomeRegistry::new();
        for def in &self.biomes {
            if def.name == SELF_CHOICE {
                return Err(Error::Config(format!("'{SELF_CHOICE}' is reserved")));
            }
            let [r, g, b] = def.color;
            registry.register(&def.name, &def.tags, Vec4::new(r, g, b, 1.0))?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_registers() {
        let config = BiomeConfig::default();
        assert!(config.validate().is_ok());
        let registry = config.registry().unwrap();
        assert_eq!(registry.len(), config.biomes.len());
        assert!(registry.id("beach").is_ok());
    }

    #[test]
    fn test_stage_config_json() {
        let json = r#"[
            {"type": "expand"},
            {"type": "replace", "tags": ["land"], "choices": [{"biome": "self", "weight": 2.0}]},
            {"type": "border", "from_tags": ["water"], "replace_tags": ["land"],
             "choices": [{"biome": "beach", "weight": 1.0}]},
            {"type": "smooth"}
        ]"#;
        let stages: Vec<StageConfig> = serde_json::from_str(json).unwrap();

        assert_eq!(stages.len(), 4);
        assert_eq!(stages[0], StageConfig::Expand);
        assert!(matches!(&stages[2], StageConfig::Border { from_tags, .. } if from_tags == &["water"]));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: BiomeConfig = serde_json::from_str(r#"{"cell_size": 2.0}"#).unwrap();
        assert_eq!(config.cell_size, 2.0);
        assert_eq!(config.biomes, BiomeConfig::default().biomes);
    }

    #[test]
    fn test_reserved_name_rejected() {
        let config = BiomeConfig {
            biomes: vec![BiomeDef::new(SELF_CHOICE, &[], [0.0; 3])],
            ..Default::default()
        };
        assert!(config.registry().is_err());
    }
}
