//! Snapshot record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use vrt_core::{Bounds, ComponentDescriptor, DeviceClass, Viewport};

/// Point in the fix lifecycle a snapshot was taken at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Baseline,
    PostFix,
}

impl std::fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Baseline => write!(f, "baseline"),
            Self::PostFix => write!(f, "postfix"),
        }
    }
}

/// Metadata attached to every snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub component_id: String,
    pub component_name: String,
    pub captured_at: DateTime<Utc>,
    /// Rendered element size in pixels
    pub element_width: f64,
    pub element_height: f64,
    /// Simulated viewport the capture ran at
    pub viewport: Viewport,
    pub device: DeviceClass,
    pub kind: CaptureKind,
    /// Fix this snapshot validates (post-fix captures only)
    pub fix_id: Option<String>,
    /// Confidence the fixing agent reported before validation
    pub prior_confidence: Option<f64>,
    /// Capturing agent string
    pub agent: String,
    pub source_url: String,
}

/// Structural state of the component at capture time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentStateSnapshot {
    pub props: HashMap<String, serde_json::Value>,
    pub css_classes: Vec<String>,
    pub computed_styles: HashMap<String, String>,
}

impl ComponentStateSnapshot {
    pub fn of(component: &ComponentDescriptor) -> Self {
        Self {
            props: component.props.clone(),
            css_classes: component.css_classes.clone(),
            computed_styles: component.computed_styles.clone(),
        }
    }
}

/// A captured visual+structural record of one component at one viewport
///
/// Immutable once created; deleted only by retention cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub id: String,
    pub metadata: SnapshotMetadata,
    /// Encoded (PNG) screenshot bytes
    pub image_data: Vec<u8>,
    pub element_bounds: Bounds,
    pub component_state: ComponentStateSnapshot,
}

impl SnapshotRecord {
    pub fn is_baseline(&self) -> bool {
        self.metadata.kind == CaptureKind::Baseline
    }
}

/// Derive a stable snapshot id from component, kind, time, and fix
pub(crate) fn snapshot_id(
    component_id: &str,
    kind: CaptureKind,
    captured_at: DateTime<Utc>,
    fix_id: Option<&str>,
) -> String {
    let salt = &Uuid::new_v4().simple().to_string()[..8];
    match fix_id {
        Some(fix) => format!(
            "{}_{}_{}_{}_{}",
            component_id,
            kind,
            captured_at.timestamp_millis(),
            fix,
            salt
        ),
        None => format!(
            "{}_{}_{}_{}",
            component_id,
            kind,
            captured_at.timestamp_millis(),
            salt
        ),
    }
}
