//! Diff result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vrt_core::{DeviceClass, Viewport};

/// Inferred kind of visual change in a diff region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    LayoutShift,
    ColorChange,
    ElementMissing,
    ElementAdded,
    SizeChange,
    PositionChange,
    TextChange,
    StyleChange,
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LayoutShift => write!(f, "layout_shift"),
            Self::ColorChange => write!(f, "color_change"),
            Self::ElementMissing => write!(f, "element_missing"),
            Self::ElementAdded => write!(f, "element_added"),
            Self::SizeChange => write!(f, "size_change"),
            Self::PositionChange => write!(f, "position_change"),
            Self::TextChange => write!(f, "text_change"),
            Self::StyleChange => write!(f, "style_change"),
        }
    }
}

/// Severity of a visual change, ordered from none to critical
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DiffSeverity {
    #[default]
    None,
    Minor,
    Moderate,
    Major,
    Critical,
}

impl DiffSeverity {
    /// Numeric rank used when averaging severities
    pub fn rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Minor => 1,
            Self::Moderate => 2,
            Self::Major => 3,
            Self::Critical => 4,
        }
    }
}

impl std::fmt::Display for DiffSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Minor => write!(f, "minor"),
            Self::Moderate => write!(f, "moderate"),
            Self::Major => write!(f, "major"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One contiguous rectangular area of pixel difference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub diff_type: DiffType,
    pub severity: DiffSeverity,
    /// Confidence in the classification itself (0-1)
    pub confidence: f64,
    pub description: String,
}

impl DiffRegion {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Per-type and per-severity counts over a diff's regions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub total_regions: usize,
    pub regions_by_type: HashMap<DiffType, usize>,
    pub regions_by_severity: HashMap<DiffSeverity, usize>,
    pub average_confidence: f64,
}

/// Capture context and timing carried on a diff result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffRunMetadata {
    pub viewport: Viewport,
    pub device: DeviceClass,
    pub fix_id: Option<String>,
    pub analysis_ms: u64,
}

/// Outcome of comparing one baseline/post-fix snapshot pair
///
/// Created by one analysis call, persisted, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    /// Derived from the pair of snapshot ids being compared
    pub id: String,
    pub baseline_snapshot_id: String,
    pub post_fix_snapshot_id: String,
    pub component_id: String,
    pub created_at: DateTime<Utc>,
    /// Fraction of pixels over the color threshold, as a percentage
    pub diff_percentage: f64,
    /// Aggregated severity; never below the worst region severity
    pub severity: DiffSeverity,
    pub regions: Vec<DiffRegion>,
    pub summary: DiffSummary,
    pub metadata: DiffRunMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(DiffSeverity::None < DiffSeverity::Minor);
        assert!(DiffSeverity::Major < DiffSeverity::Critical);
        assert_eq!(DiffSeverity::Moderate.rank(), 2);
    }

    #[test]
    fn test_enum_display() {
        assert_eq!(DiffType::LayoutShift.to_string(), "layout_shift");
        assert_eq!(DiffSeverity::Critical.to_string(), "critical");
    }

    #[test]
    fn test_summary_serializes_enum_keys() {
        let mut summary = DiffSummary::default();
        summary.regions_by_type.insert(DiffType::ColorChange, 2);
        summary.regions_by_severity.insert(DiffSeverity::Minor, 2);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("color_change"));
        assert!(json.contains("minor"));
    }
}
