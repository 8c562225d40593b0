//! Streaming radii and dispatch limits

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// How far around the viewer chunks are kept and how fast they are built
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Half-width in chunks of the square that gets loaded
    pub near_radius: i32,
    /// Euclidean chunk distance beyond which chunks are dropped
    pub far_radius: f32,
    /// Load requests dispatched per frame
    pub max_dispatch_per_frame: usize,
    /// Size of the worker pool building chunks
    pub worker_threads: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            near_radius: 4,
            far_radius: 8.0,
            max_dispatch_per_frame: 4,
            worker_threads: 4,
        }
    }
}

impl StreamingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.near_radius < 0 {
            return Err(Error::Config("near_radius must not be negative".into()));
        }
        // Corners of the load square must stay inside the keep radius
        let corner = self.near_radius as f32 * std::f32::consts::SQRT_2;
        if !self.far_radius.is_finite() || self.far_radius < corner {
            return Err(Error::Config(format!(
                "far_radius {} must be at least near_radius * sqrt(2) = {corner:.3}",
                self.far_radius
            )));
        }
        if self.max_dispatch_per_frame == 0 {
            return Err(Error::Config("max_dispatch_per_frame must be positive".into()));
        }
        if self.worker_threads == 0 {
            return Err(Error::Config("worker_threads must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_valid() {
        assert!(StreamingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_far_radius_must_cover_square() {
        let config = StreamingConfig { near_radius: 4, far_radius: 5.0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = StreamingConfig { near_radius: 4, far_radius: 10.0, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = StreamingConfig { max_dispatch_per_frame: 0, ..Default::default() };
        assert!(config.validate().is_err());
        let config = StreamingConfig { worker_threads: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }
}
