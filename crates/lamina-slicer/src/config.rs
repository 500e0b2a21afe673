//! Slicer settings.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlicerError};

/// Parameters for one slicing run.
///
/// Unknown keys are rejected when parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlicerConfig {
    /// Layer height (mm).
    pub layer_height: f64,
    /// Nozzle diameter (mm); also the extrusion width and wall spacing.
    pub nozzle_diameter: f64,
    /// Number of perimeter walls.
    pub wall_count: u32,
    /// Solid layers at the top and bottom, and the exposure window radius.
    pub skin_layer_count: usize,
    /// Look for exposed and cavity-closing regions on interior layers.
    pub exposure_detection_enabled: bool,
    /// Exposure sample spacing (mm).
    pub exposure_detection_resolution: f64,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            layer_height: 0.2,
            nozzle_diameter: 0.4,
            wall_count: 3,
            skin_layer_count: 4,
            exposure_detection_enabled: true,
            exposure_detection_resolution: 0.5,
        }
    }
}

impl SlicerConfig {
    /// Derive wall and skin counts from shell thicknesses.
    ///
    /// `wall_count` rounds `shell_wall_thickness / nozzle_diameter`;
    /// `skin_layer_count` floors `shell_skin_thickness / layer_height`.
    /// Both are at least 1.
    pub fn from_shell_thickness(
        layer_height: f64,
        nozzle_diameter: f64,
        shell_wall_thickness: f64,
        shell_skin_thickness: f64,
    ) -> Result<Self> {
        let config = Self {
            layer_height,
            nozzle_diameter,
            ..Default::default()
        };
        config.validate()?;
        if shell_wall_thickness < 0.0 || shell_skin_thickness < 0.0 {
            return Err(SlicerError::InvalidSettings(
                "shell thickness must not be negative".into(),
            ));
        }

        // Nudge before flooring so 0.8 / 0.2 lands on 4, not 3.
        let skin_layers = (shell_skin_thickness / layer_height + 1e-9).floor();
        Ok(Self {
            wall_count: ((shell_wall_thickness / nozzle_diameter).round() as u32).max(1),
            skin_layer_count: (skin_layers as usize).max(1),
            ..config
        })
    }

    /// Parse settings from TOML. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SlicerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize settings to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| SlicerError::Config(e.to_string()))
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.layer_height <= 0.0 || self.layer_height > 1.0 {
            return Err(SlicerError::InvalidSettings(
                "layer_height must be between 0 and 1mm".into(),
            ));
        }
        if self.nozzle_diameter <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "nozzle_diameter must be positive".into(),
            ));
        }
        if self.wall_count == 0 {
            return Err(SlicerError::InvalidSettings(
                "wall_count must be at least 1".into(),
            ));
        }
        if self.skin_layer_count == 0 {
            return Err(SlicerError::InvalidSettings(
                "skin_layer_count must be at least 1".into(),
            ));
        }
        if self.exposure_detection_resolution <= 0.0 {
            return Err(SlicerError::InvalidSettings(
                "exposure_detection_resolution must be positive".into(),
            ));
        }
        Ok(())
    }
}
