//! Configuration management for the face tracker filter

use crate::{
    constants::{
        DEFAULT_DETECT_INTERVAL, DEFAULT_KP, DEFAULT_SCALE_MAX, DEFAULT_TD, DEFAULT_TDLPF, DEFAULT_TRACK_X,
        DEFAULT_TRACK_Y, DEFAULT_TRACK_Z,
    },
    control::{Gains, Geometry},
    rect::Margins,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

const UPSIZE_RANGE: RangeInclusive<f32> = -0.4..=4.0;
const TRACK_Z_RANGE: RangeInclusive<f32> = 0.1..=2.0;
const TRACK_OFFSET_RANGE: RangeInclusive<f32> = -1.0..=1.0;
const SCALE_MAX_RANGE: RangeInclusive<f32> = 1.0..=20.0;
const KP_RANGE: RangeInclusive<f32> = 0.01..=10.0;
const TD_RANGE: RangeInclusive<f32> = 0.0..=5.0;
const TDLPF_RANGE: RangeInclusive<f32> = 0.0..=2.0;

/// Filter configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Framing of the tracked face
    pub tracking: TrackingConfig,

    /// Crop controller gains
    pub control: ControlConfig,

    /// Detector scheduling
    pub detection: DetectionConfig,

    /// Debug overlays
    pub debug: DebugConfig,
}

/// Framing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Margins added around a detection before a tracker is seeded
    pub upsize: Margins,

    /// Face height relative to the crop height
    pub track_z: f32,

    /// Horizontal face position in the crop (-1 to 1)
    pub track_x: f32,

    /// Vertical face position in the crop (-1 to 1)
    pub track_y: f32,

    /// Maximum zoom factor
    pub scale_max: f32,
}

/// Controller gains as exposed to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Proportional gain (1/s)
    pub kp: f32,

    /// Derivative time (s)
    pub td: f32,

    /// Low-pass time constant of the derivative path (s)
    pub tdlpf: f32,
}

/// Detector scheduling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Seconds between detection passes
    pub interval: f32,
}

/// Debug toggles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Draw detections and tracker boxes while the filter is not live
    pub faces: bool,

    /// Show the uncropped source while the filter is not live
    pub notrack: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            upsize: Margins::default(),
            track_z: DEFAULT_TRACK_Z,
            track_x: DEFAULT_TRACK_X,
            track_y: DEFAULT_TRACK_Y,
            scale_max: DEFAULT_SCALE_MAX,
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            kp: DEFAULT_KP,
            td: DEFAULT_TD,
            tdlpf: DEFAULT_TDLPF,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_DETECT_INTERVAL,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] naming the first parameter out of range.
    pub fn validate(&self) -> Result<()> {
        let upsize = &self.tracking.upsize;
        for (name, value) in [
            ("upsize.left", upsize.left),
            ("upsize.right", upsize.right),
            ("upsize.top", upsize.top),
            ("upsize.bottom", upsize.bottom),
        ] {
            check_range(name, value, &UPSIZE_RANGE)?;
        }

        check_range("track_z", self.tracking.track_z, &TRACK_Z_RANGE)?;
        check_range("track_x", self.tracking.track_x, &TRACK_OFFSET_RANGE)?;
        check_range("track_y", self.tracking.track_y, &TRACK_OFFSET_RANGE)?;
        check_range("scale_max", self.tracking.scale_max, &SCALE_MAX_RANGE)?;

        check_range("kp", self.control.kp, &KP_RANGE)?;
        check_range("td", self.control.td, &TD_RANGE)?;
        check_range("tdlpf", self.control.tdlpf, &TDLPF_RANGE)?;

        if !(self.detection.interval.is_finite() && self.detection.interval > 0.0) {
            return Err(Error::ConfigError(
                "Detection interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Framing parameters for the error aggregator
    #[must_use]
    pub const fn geometry(&self) -> Geometry {
        Geometry {
            track_z: self.tracking.track_z,
            track_x: self.tracking.track_x,
            track_y: self.tracking.track_y,
            scale_max: self.tracking.scale_max,
        }
    }

    /// Controller gains
    #[must_use]
    pub fn gains(&self) -> Gains {
        Gains::from_settings(self.control.kp, self.control.td, self.control.tdlpf)
    }

    /// Detection upsize margins
    #[must_use]
    pub const fn margins(&self) -> Margins {
        self.tracking.upsize
    }
}

fn check_range(name: &str, value: f32, range: &RangeInclusive<f32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!(
            "{name} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r"# Face Tracker Configuration

# Framing of the tracked face
tracking:
  # Margins added around a detection, as fractions of its width/height
  upsize:
    left: 0.2
    right: 0.2
    top: 0.3
    bottom: 0.1
  track_z: 0.7
  track_x: 0.0
  track_y: 0.0
  scale_max: 10.0

# Crop controller
control:
  kp: 0.5
  td: 0.05
  tdlpf: 0.025

# Detector scheduling
detection:
  interval: 2.0

# Debug overlays
debug:
  faces: false
  notrack: false
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.margins(), Margins::new(0.2, 0.2, 0.3, 0.1));
        assert!((config.gains().klpf - 0.025).abs() < 1e-7);
    }

    #[test]
    fn test_example_matches_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let parsed = Config::from_yaml("tracking:\n  scale_max: 4.0\n").unwrap();
        assert_eq!(parsed.tracking.scale_max, 4.0);
        assert_eq!(parsed.tracking.track_z, DEFAULT_TRACK_Z);
        assert_eq!(parsed.control, ControlConfig::default());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut config = Config::default();
        config.tracking.scale_max = 25.0;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.tracking.upsize.top = -0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.control.kp = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detection.interval = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_margins_fill_defaults() {
        let parsed = Config::from_yaml("tracking:\n  upsize:\n    left: 1.0\n").unwrap();
        assert_eq!(parsed.margins(), Margins::new(1.0, 0.2, 0.3, 0.1));
    }

    #[test]
    fn test_malformed_yaml_is_config_error() {
        assert!(matches!(Config::from_yaml("tracking: ["), Err(Error::ConfigError(_))));
    }
}
