//! Snapshot capture, lookup, and retention

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vrt_core::access::{AccessPolicy, AuditAction, AuditEvent, AuditSink};
use vrt_core::capture::ScreenshotCapture;
use vrt_core::config::SnapshotConfig;
use vrt_core::store::{StateStore, SNAPSHOT_STORE_KEY};
use vrt_core::{ComponentDescriptor, DeviceClass, Result};

use crate::record::{
    snapshot_id, CaptureKind, ComponentStateSnapshot, SnapshotMetadata, SnapshotRecord,
};

/// Baseline and post-fix snapshots for one component/fix pair
#[derive(Debug, Clone, Default)]
pub struct ComparisonPair {
    pub baseline: Option<SnapshotRecord>,
    pub post_fix: Option<SnapshotRecord>,
}

/// Aggregate storage figures for the snapshot set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_snapshots: usize,
    /// Sum of encoded image bytes
    pub total_bytes: u64,
    pub oldest_snapshot: Option<chrono::DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
struct PersistedSnapshots {
    version: String,
    timestamp: chrono::DateTime<Utc>,
    snapshots: Vec<SnapshotRecord>,
}

/// Captures and owns the lifetime of [`SnapshotRecord`]s
///
/// Every capture attempt, whether it succeeds, is denied, or fails, records
/// exactly one audit event. Denials and capture failures return `None`; the
/// caller must treat a missing record as "cannot confirm safety".
pub struct SnapshotStore {
    config: SnapshotConfig,
    actor: String,
    policy: Arc<dyn AccessPolicy>,
    audit: Arc<dyn AuditSink>,
    capture: Arc<dyn ScreenshotCapture>,
    store: Arc<dyn StateStore>,
    snapshots: HashMap<String, SnapshotRecord>,
}

impl SnapshotStore {
    /// Create a store and hydrate previously persisted snapshots
    ///
    /// A failed load is logged and ignored; in-memory state starts empty.
    pub async fn open(
        config: SnapshotConfig,
        actor: impl Into<String>,
        policy: Arc<dyn AccessPolicy>,
        audit: Arc<dyn AuditSink>,
        capture: Arc<dyn ScreenshotCapture>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let mut this = Self {
            config,
            actor: actor.into(),
            policy,
            audit,
            capture,
            store,
            snapshots: HashMap::new(),
        };
        this.load_persisted().await;
        this
    }

    /// Capture a baseline snapshot before a fix is applied
    pub async fn capture_baseline(
        &mut self,
        component: &ComponentDescriptor,
        device: DeviceClass,
    ) -> Option<SnapshotRecord> {
        self.capture_snapshot(component, device, CaptureKind::Baseline, None, None)
            .await
    }

    /// Capture a post-fix snapshot, stamped with the fix and its prior confidence
    pub async fn capture_post_fix(
        &mut self,
        component: &ComponentDescriptor,
        fix_id: &str,
        prior_confidence: f64,
        device: DeviceClass,
    ) -> Option<SnapshotRecord> {
        self.capture_snapshot(
            component,
            device,
            CaptureKind::PostFix,
            Some(fix_id.to_string()),
            Some(prior_confidence),
        )
        .await
    }

    /// Capture one snapshot per device class
    ///
    /// Breakpoints that fail or are denied are omitted from the result.
    pub async fn capture_all_breakpoints(
        &mut self,
        component: &ComponentDescriptor,
        fix_id: Option<&str>,
        prior_confidence: Option<f64>,
    ) -> Vec<SnapshotRecord> {
        let mut records = Vec::new();
        for device in DeviceClass::all() {
            let record = match fix_id {
                Some(fix) => {
                    self.capture_post_fix(component, fix, prior_confidence.unwrap_or(0.0), device)
                        .await
                }
                None => self.capture_baseline(component, device).await,
            };
            if let Some(record) = record {
                records.push(record);
            }
        }
        records
    }

    /// All snapshots for a component, newest first
    pub fn component_snapshots(&self, component_id: &str) -> Vec<SnapshotRecord> {
        let mut records: Vec<SnapshotRecord> = self
            .snapshots
            .values()
            .filter(|s| s.metadata.component_id == component_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.metadata.captured_at.cmp(&a.metadata.captured_at));
        records
    }

    /// Most recent baseline plus the post-fix snapshot for a fix
    pub fn comparison_pair(&self, component_id: &str, fix_id: &str) -> ComparisonPair {
        let records = self.component_snapshots(component_id);
        ComparisonPair {
            baseline: records.iter().find(|s| s.is_baseline()).cloned(),
            post_fix: records
                .iter()
                .find(|s| s.metadata.fix_id.as_deref() == Some(fix_id))
                .cloned(),
        }
    }

    /// Remove snapshots older than the retention window, returning the count
    pub async fn cleanup_expired(&mut self) -> usize {
        let cutoff = Utc::now() - Duration::days(i64::from(self.config.retention_days));
        let expired: Vec<String> = self
            .snapshots
            .values()
            .filter(|s| s.metadata.captured_at < cutoff)
            .map(|s| s.id.clone())
            .collect();

        for id in &expired {
            self.snapshots.remove(id);
        }

        if !expired.is_empty() {
            self.persist().await;
            self.audit
                .record(AuditEvent::success(
                    &self.actor,
                    AuditAction::Cleanup,
                    serde_json::json!({ "removed": expired.len() }),
                ))
                .await;
            info!("Cleaned up {} expired snapshots", expired.len());
        }

        expired.len()
    }

    /// Serialize snapshots (optionally for one component) for offline analysis
    pub fn export(&self, component_id: Option<&str>) -> Result<String> {
        let snapshots: Vec<SnapshotRecord> = match component_id {
            Some(id) => self.component_snapshots(id),
            None => self.snapshots.values().cloned().collect(),
        };

        let document = serde_json::json!({
            "version": "1.0",
            "export_date": Utc::now(),
            "total_snapshots": snapshots.len(),
            "snapshots": snapshots,
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Storage statistics across all held snapshots
    pub fn storage_stats(&self) -> StorageStats {
        StorageStats {
            total_snapshots: self.snapshots.len(),
            total_bytes: self
                .snapshots
                .values()
                .map(|s| s.image_data.len() as u64)
                .sum(),
            oldest_snapshot: self
                .snapshots
                .values()
                .map(|s| s.metadata.captured_at)
                .min(),
        }
    }

    // Single-breakpoint capture shared by baseline and post-fix paths

    async fn capture_snapshot(
        &mut self,
        component: &ComponentDescriptor,
        device: DeviceClass,
        kind: CaptureKind,
        fix_id: Option<String>,
        prior_confidence: Option<f64>,
    ) -> Option<SnapshotRecord> {
        let details = serde_json::json!({
            "type": kind.to_string(),
            "device": device.to_string(),
            "fix_id": &fix_id,
        });

        let decision = self.policy.authorize(&self.actor);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_else(|| "access denied".to_string());
            warn!("Snapshot capture denied for {}: {}", component.name, reason);
            self.audit
                .record(
                    AuditEvent::failure(&self.actor, AuditAction::SnapshotCapture, details, &reason)
                        .for_component(&component.id, &component.name),
                )
                .await;
            return None;
        }

        if !self.config.enabled {
            let reason = "snapshot capture disabled in config";
            self.audit
                .record(
                    AuditEvent::failure(&self.actor, AuditAction::SnapshotCapture, details, reason)
                        .for_component(&component.id, &component.name),
                )
                .await;
            return None;
        }

        let viewport = self.config.viewport(device);
        let image_data = match self.capture.capture(component, viewport).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to capture {} snapshot for {}: {}", kind, component.name, e);
                self.audit
                    .record(
                        AuditEvent::failure(
                            &self.actor,
                            AuditAction::SnapshotCapture,
                            details,
                            e.to_string(),
                        )
                        .for_component(&component.id, &component.name),
                    )
                    .await;
                return None;
            }
        };

        let captured_at = Utc::now();
        let record = SnapshotRecord {
            id: snapshot_id(&component.id, kind, captured_at, fix_id.as_deref()),
            metadata: SnapshotMetadata {
                component_id: component.id.clone(),
                component_name: component.name.clone(),
                captured_at,
                element_width: component.bounds.width,
                element_height: component.bounds.height,
                viewport,
                device,
                kind,
                fix_id,
                prior_confidence,
                agent: self.actor.clone(),
                source_url: component.source_url.clone(),
            },
            image_data,
            element_bounds: component.bounds,
            component_state: ComponentStateSnapshot::of(component),
        };

        self.snapshots.insert(record.id.clone(), record.clone());
        self.persist().await;

        self.audit
            .record(
                AuditEvent::success(
                    &self.actor,
                    AuditAction::SnapshotCapture,
                    serde_json::json!({
                        "snapshot_id": record.id,
                        "type": kind.to_string(),
                        "device": device.to_string(),
                        "viewport": viewport.to_string(),
                        "fix_id": record.metadata.fix_id,
                    }),
                )
                .for_component(&component.id, &component.name),
            )
            .await;

        info!("{} snapshot captured for {}: {}", kind, component.name, record.id);
        Some(record)
    }

    #[cfg(test)]
    pub(crate) fn insert_record(&mut self, record: SnapshotRecord) {
        self.snapshots.insert(record.id.clone(), record);
    }

    async fn load_persisted(&mut self) {
        match self.store.load(SNAPSHOT_STORE_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<PersistedSnapshots>(&bytes) {
                Ok(persisted) => {
                    for record in persisted.snapshots {
                        self.snapshots.insert(record.id.clone(), record);
                    }
                    debug!("Loaded {} snapshots from storage", self.snapshots.len());
                }
                Err(e) => warn!("Failed to parse persisted snapshots: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Failed to load snapshots: {}", e),
        }
    }

    async fn persist(&self) {
        let persisted = PersistedSnapshots {
            version: "1.0".to_string(),
            timestamp: Utc::now(),
            snapshots: self.snapshots.values().cloned().collect(),
        };

        let bytes = match serde_json::to_vec(&persisted) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize snapshots: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.save(SNAPSHOT_STORE_KEY, &bytes).await {
            warn!("Failed to save snapshots: {}", e);
        }
    }
}
