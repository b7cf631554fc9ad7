//! Configuration for the view conductor.

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::View`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Regrid target resolution in degrees, used when regridding is enabled.
    pub resolution_deg: f64,

    /// Nearest-neighbor influence radius in meters for regridding.
    pub influence_radius_meters: f64,

    /// Fallback raster width when rendering polygons directly (no regridder).
    pub polygon_raster_width: usize,

    /// Fallback raster height when rendering polygons directly.
    pub polygon_raster_height: usize,

    /// Pixel block size each regridded cell is replicated into.
    pub scale_factor: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            resolution_deg: 0.5,
            influence_radius_meters: 50_000.0,
            polygon_raster_width: 720,
            polygon_raster_height: 360,
            scale_factor: 1,
        }
    }
}

impl ViewerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VIEWER_RESOLUTION_DEG") {
            if let Ok(v) = val.parse() {
                config.resolution_deg = v;
            }
        }

        if let Ok(val) = std::env::var("VIEWER_INFLUENCE_RADIUS_METERS") {
            if let Ok(v) = val.parse() {
                config.influence_radius_meters = v;
            }
        }

        if let Ok(val) = std::env::var("VIEWER_POLYGON_RASTER_WIDTH") {
            if let Ok(v) = val.parse() {
                config.polygon_raster_width = v;
            }
        }

        if let Ok(val) = std::env::var("VIEWER_POLYGON_RASTER_HEIGHT") {
            if let Ok(v) = val.parse() {
                config.polygon_raster_height = v;
            }
        }

        if let Ok(val) = std::env::var("VIEWER_SCALE_FACTOR") {
            if let Ok(v) = val.parse() {
                config.scale_factor = v;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.resolution_deg <= 0.0 || self.resolution_deg > 180.0 {
            return Err("resolution_deg must be in (0, 180]".to_string());
        }
        if self.influence_radius_meters <= 0.0 {
            return Err("influence_radius_meters must be > 0".to_string());
        }
        if self.polygon_raster_width == 0 || self.polygon_raster_height == 0 {
            return Err("polygon raster dimensions must be > 0".to_string());
        }
        if self.scale_factor == 0 {
            return Err("scale_factor must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ViewerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_resolution_is_invalid() {
        let mut config = ViewerConfig::default();
        config.resolution_deg = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_scale_factor_is_invalid() {
        let mut config = ViewerConfig::default();
        config.scale_factor = 0;
        assert!(config.validate().is_err());
    }
}
