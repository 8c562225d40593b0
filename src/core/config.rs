//! World configuration loaded from JSON

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::Error;
use super::types::Result;
use crate::biome::BiomeConfig;
use crate::streaming::StreamingConfig;
use crate::terrain::{ChunkLayout, DensityParams};

/// Everything needed to stream a world
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Global seed for density and biome noise
    pub seed: u32,
    pub streaming: StreamingConfig,
    pub layout: ChunkLayout,
    pub density: DensityParams,
    pub biomes: BiomeConfig,
}

impl WorldConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded world config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.streaming.validate()?;
        self.layout.validate()?;
        self.density.validate()?;
        self.biomes.validate()?;
        if self.layout.margin >= self.layout.chunk_size {
            return Err(Error::Config(format!(
                "margin {} must be smaller than chunk_size {}",
                self.layout.margin, self.layout.chunk_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = WorldConfig::from_json_str(
            r#"{"seed": 42, "streaming": {"near_radius": 2, "far_radius": 5.0}}"#,
        )
        .unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.streaming.near_radius, 2);
        assert_eq!(config.streaming.far_radius, 5.0);
        assert_eq!(config.layout, ChunkLayout::default());
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(WorldConfig::from_json_str("{ nope"), Err(Error::Json(_))));
        assert!(matches!(
            WorldConfig::from_json_str(r#"{"streaming": {"near_radius": 4, "far_radius": 4.0}}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let config = WorldConfig { seed: 7, ..Default::default() };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json_string().unwrap().as_bytes()).unwrap();

        let loaded = WorldConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(WorldConfig::load(dir.path().join("missing.json")), Err(Error::Io(_))));
    }
}
