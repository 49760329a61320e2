//! Configuration management for the VRT pipeline
//!
//! One master TOML config with a section per module, loaded from
//! `vrt.toml`. Every field carries a serde default so a partial file
//! (or none at all) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{DeviceClass, Viewport};
use crate::{Result, VrtError};

/// Master configuration for all VRT modules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VrtConfig {
    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub diff: DiffConfig,

    #[serde(default)]
    pub confidence: ConfidenceConfig,

    #[serde(default)]
    pub suite: SuiteConfig,
}

/// Snapshot capture and retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Master switch for snapshot capture
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Snapshots older than this are removed by cleanup
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Simulated viewport per device class
    #[serde(default = "default_desktop_viewport")]
    pub desktop_viewport: Viewport,
    #[serde(default = "default_tablet_viewport")]
    pub tablet_viewport: Viewport,
    #[serde(default = "default_mobile_viewport")]
    pub mobile_viewport: Viewport,
}

impl SnapshotConfig {
    /// Viewport for a device class
    pub fn viewport(&self, device: DeviceClass) -> Viewport {
        match device {
            DeviceClass::Desktop => self.desktop_viewport,
            DeviceClass::Tablet => self.tablet_viewport,
            DeviceClass::Mobile => self.mobile_viewport,
        }
    }
}

/// Pixel diff thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Fraction of differing pixels considered an acceptable diff (0.01-0.20)
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f64,

    /// Minimum pixel count for a connected region to be retained
    #[serde(default = "default_min_region_size")]
    pub min_region_size: usize,

    /// Maximum number of regions reported per diff
    #[serde(default = "default_max_regions")]
    pub max_regions: usize,

    /// Euclidean RGB distance above which a pixel counts as different
    #[serde(default = "default_color_threshold")]
    pub color_threshold: f64,

    /// Position/size change threshold in pixels
    #[serde(default = "default_layout_threshold")]
    pub layout_threshold: f64,
}

/// Confidence adjustment weights and bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Master switch for confidence adjustment
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Signed penalty per overall severity level
    #[serde(default)]
    pub severity_penalties: SeverityPenalties,

    /// Penalty per diff region not declared by the fixing agent
    #[serde(default = "default_unexpected_change_penalty")]
    pub unexpected_change_penalty: f64,

    /// Bonus per diff region matching a declared change
    #[serde(default = "default_intentional_change_bonus")]
    pub intentional_change_bonus: f64,

    /// Bonus scaled by layout stability (0-1)
    #[serde(default = "default_layout_stability_bonus")]
    pub layout_stability_bonus: f64,

    /// Lower clamp for adjusted confidence
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Upper clamp for adjusted confidence
    #[serde(default = "default_max_confidence")]
    pub max_confidence: f64,

    /// Whether adjustments feed the learning model
    #[serde(default = "default_true")]
    pub learning_enabled: bool,
}

/// Penalty applied to the adjustment factor per overall diff severity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityPenalties {
    pub none: f64,
    pub minor: f64,
    pub moderate: f64,
    pub major: f64,
    pub critical: f64,
}

impl Default for SeverityPenalties {
    fn default() -> Self {
        Self {
            none: 0.0,
            minor: -0.05,
            moderate: -0.15,
            major: -0.25,
            critical: -0.4,
        }
    }
}

/// Assertion suite settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Master switch for the assertion suite
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum passing accessibility score (0-1)
    #[serde(default = "default_accessibility_threshold")]
    pub accessibility_threshold: f64,

    /// Minimum passing color contrast ratio
    #[serde(default = "default_color_contrast_threshold")]
    pub color_contrast_threshold: f64,

    /// Classes that mark a node as intentionally responsive
    #[serde(default = "default_responsive_marker_classes")]
    pub responsive_marker_classes: Vec<String>,

    /// Widths (CSS pixels) exercised by responsive layout runs
    #[serde(default = "default_responsive_breakpoints")]
    pub responsive_breakpoints: Vec<u32>,
}

// Default value providers

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u32 {
    30
}

fn default_desktop_viewport() -> Viewport {
    Viewport::new(1920, 1080)
}

fn default_tablet_viewport() -> Viewport {
    Viewport::new(768, 1024)
}

fn default_mobile_viewport() -> Viewport {
    Viewport::new(375, 667)
}

fn default_sensitivity() -> f64 {
    0.05
}

fn default_min_region_size() -> usize {
    100
}

fn default_max_regions() -> usize {
    50
}

fn default_color_threshold() -> f64 {
    30.0
}

fn default_layout_threshold() -> f64 {
    5.0
}

fn default_unexpected_change_penalty() -> f64 {
    -0.1
}

fn default_intentional_change_bonus() -> f64 {
    0.05
}

fn default_layout_stability_bonus() -> f64 {
    0.1
}

fn default_min_confidence() -> f64 {
    0.1
}

fn default_max_confidence() -> f64 {
    0.95
}

fn default_accessibility_threshold() -> f64 {
    0.8
}

fn default_color_contrast_threshold() -> f64 {
    4.5
}

fn default_responsive_marker_classes() -> Vec<String> {
    vec!["mobile".to_string(), "responsive".to_string()]
}

fn default_responsive_breakpoints() -> Vec<u32> {
    vec![375, 768, 1024, 1440, 1920]
}

impl VrtConfig {
    /// Load configuration from `vrt.toml` under the given root, or use defaults
    pub fn load_or_default(root: &Path) -> Result<Self> {
        let config_path = root.join("vrt.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)
                .map_err(|e| VrtError::Other(format!("Failed to parse config file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default configuration to `vrt.toml` under the given root
    pub fn write_default(root: &Path) -> Result<()> {
        std::fs::create_dir_all(root)?;

        let config_path = root.join("vrt.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| VrtError::Other(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: default_retention_days(),
            desktop_viewport: default_desktop_viewport(),
            tablet_viewport: default_tablet_viewport(),
            mobile_viewport: default_mobile_viewport(),
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            sensitivity: default_sensitivity(),
            min_region_size: default_min_region_size(),
            max_regions: default_max_regions(),
            color_threshold: default_color_threshold(),
            layout_threshold: default_layout_threshold(),
        }
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity_penalties: SeverityPenalties::default(),
            unexpected_change_penalty: default_unexpected_change_penalty(),
            intentional_change_bonus: default_intentional_change_bonus(),
            layout_stability_bonus: default_layout_stability_bonus(),
            min_confidence: default_min_confidence(),
            max_confidence: default_max_confidence(),
            learning_enabled: true,
        }
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            accessibility_threshold: default_accessibility_threshold(),
            color_contrast_threshold: default_color_contrast_threshold(),
            responsive_marker_classes: default_responsive_marker_classes(),
            responsive_breakpoints: default_responsive_breakpoints(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = VrtConfig::default();
        assert!(config.snapshot.enabled);
        assert_eq!(config.snapshot.retention_days, 30);
        assert_eq!(config.diff.color_threshold, 30.0);
        assert_eq!(config.diff.min_region_size, 100);
        assert_eq!(config.confidence.min_confidence, 0.1);
        assert_eq!(config.confidence.max_confidence, 0.95);
        assert_eq!(config.suite.color_contrast_threshold, 4.5);
    }

    #[test]
    fn test_viewport_lookup() {
        let config = SnapshotConfig::default();
        assert_eq!(config.viewport(DeviceClass::Desktop), Viewport::new(1920, 1080));
        assert_eq!(config.viewport(DeviceClass::Tablet), Viewport::new(768, 1024));
        assert_eq!(config.viewport(DeviceClass::Mobile), Viewport::new(375, 667));
    }

    #[test]
    fn test_write_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        VrtConfig::write_default(dir.path()).unwrap();

        let loaded = VrtConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.diff.max_regions, 50);
        assert_eq!(loaded.confidence.severity_penalties.critical, -0.4);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = VrtConfig::load_or_default(dir.path()).unwrap();
        assert!(config.suite.enabled);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("vrt.toml"),
            "[diff]\ncolor_threshold = 45.0\n",
        )
        .unwrap();

        let config = VrtConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.diff.color_threshold, 45.0);
        assert_eq!(config.diff.max_regions, 50);
        assert!(config.snapshot.enabled);
    }
}
