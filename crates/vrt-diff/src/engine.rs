//! Diff analysis orchestration
//!
//! The engine owns analyzed [`DiffResult`]s, runs the pixel walk and region
//! pipeline over snapshot pairs, and audits every attempt. Denials and
//! analysis failures yield `None`; downstream consumers treat a missing
//! diff as "cannot confirm the fix is visually safe".

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vrt_core::access::{AccessPolicy, AuditAction, AuditEvent, AuditSink};
use vrt_core::config::DiffConfig;
use vrt_core::store::{StateStore, DIFF_STORE_KEY};
use vrt_core::Result;
use vrt_snapshot::SnapshotRecord;

use crate::classify::{classify_region, overall_severity, summarize};
use crate::pixel;
use crate::region::segment;
use crate::types::{DiffRegion, DiffResult, DiffRunMetadata, DiffSeverity, DiffSummary, DiffType};

/// Aggregate diff figures for one component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffStatistics {
    pub total_diffs: usize,
    pub average_diff_percentage: f64,
    pub severity_distribution: HashMap<DiffSeverity, usize>,
    pub type_distribution: HashMap<DiffType, usize>,
    /// Share of diffs whose percentage stayed under the sensitivity threshold
    pub success_rate: f64,
}

#[derive(Serialize, Deserialize)]
struct PersistedDiffs {
    version: String,
    timestamp: chrono::DateTime<Utc>,
    diffs: Vec<DiffResult>,
}

/// Runs pixel comparison over snapshot pairs and owns the results
pub struct DiffEngine {
    config: DiffConfig,
    actor: String,
    policy: Arc<dyn AccessPolicy>,
    audit: Arc<dyn AuditSink>,
    store: Arc<dyn StateStore>,
    diffs: HashMap<String, DiffResult>,
}

impl DiffEngine {
    /// Create an engine and hydrate previously persisted diffs
    pub async fn open(
        config: DiffConfig,
        actor: impl Into<String>,
        policy: Arc<dyn AccessPolicy>,
        audit: Arc<dyn AuditSink>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let mut this = Self {
            config,
            actor: actor.into(),
            policy,
            audit,
            store,
            diffs: HashMap::new(),
        };
        this.load_persisted().await;
        this
    }

    /// Compare one baseline/post-fix pair
    ///
    /// Exactly one audit event is recorded per attempt. Returns `None` when
    /// access is denied, the snapshots are not comparable, or decoding fails.
    pub async fn analyze(
        &mut self,
        baseline: &SnapshotRecord,
        post_fix: &SnapshotRecord,
    ) -> Option<DiffResult> {
        let details = serde_json::json!({
            "baseline_id": baseline.id,
            "post_fix_id": post_fix.id,
        });
        let component_name = &baseline.metadata.component_name;

        let decision = self.policy.authorize(&self.actor);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_else(|| "access denied".to_string());
            warn!("Diff analysis denied for {}: {}", component_name, reason);
            self.audit
                .record(
                    AuditEvent::failure(&self.actor, AuditAction::DiffAnalysis, details, &reason)
                        .for_component(&baseline.metadata.component_id, component_name),
                )
                .await;
            return None;
        }

        if let Err(reason) = validate_pair(baseline, post_fix) {
            warn!("Snapshot pair rejected for {}: {}", component_name, reason);
            self.audit
                .record(
                    AuditEvent::failure(&self.actor, AuditAction::DiffAnalysis, details, &reason)
                        .for_component(&baseline.metadata.component_id, component_name),
                )
                .await;
            return None;
        }

        let started = Instant::now();
        let comparison =
            match pixel::compare(&baseline.image_data, &post_fix.image_data, self.config.color_threshold)
            {
                Ok(comparison) => comparison,
                Err(e) => {
                    error!("Diff analysis failed for {}: {}", component_name, e);
                    self.audit
                        .record(
                            AuditEvent::failure(
                                &self.actor,
                                AuditAction::DiffAnalysis,
                                details,
                                e.to_string(),
                            )
                            .for_component(&baseline.metadata.component_id, component_name),
                        )
                        .await;
                    return None;
                }
            };

        let raw_regions = segment(
            &comparison.different,
            self.config.min_region_size,
            self.config.max_regions,
        );
        let regions: Vec<DiffRegion> = raw_regions
            .iter()
            .map(|r| classify_region(r, &self.config))
            .collect();
        let severity = overall_severity(&regions);
        let summary: DiffSummary = summarize(&regions);
        let diff_percentage = comparison.diff_percentage();

        let result = DiffResult {
            id: diff_id(&baseline.id, &post_fix.id),
            baseline_snapshot_id: baseline.id.clone(),
            post_fix_snapshot_id: post_fix.id.clone(),
            component_id: baseline.metadata.component_id.clone(),
            created_at: Utc::now(),
            diff_percentage,
            severity,
            regions,
            summary,
            metadata: DiffRunMetadata {
                viewport: baseline.metadata.viewport,
                device: baseline.metadata.device,
                fix_id: post_fix.metadata.fix_id.clone(),
                analysis_ms: started.elapsed().as_millis() as u64,
            },
        };

        self.diffs.insert(result.id.clone(), result.clone());
        self.persist().await;

        self.audit
            .record(
                AuditEvent::success(
                    &self.actor,
                    AuditAction::DiffAnalysis,
                    serde_json::json!({
                        "diff_id": result.id,
                        "baseline_id": baseline.id,
                        "post_fix_id": post_fix.id,
                        "diff_percentage": diff_percentage,
                        "severity": severity.to_string(),
                        "regions": result.summary.total_regions,
                        "analysis_ms": result.metadata.analysis_ms,
                    }),
                )
                .for_component(&baseline.metadata.component_id, component_name),
            )
            .await;

        info!(
            "Diff analysis completed for {}: {:.2}% diff, {} severity, {} regions",
            component_name,
            diff_percentage,
            severity,
            result.summary.total_regions
        );
        Some(result)
    }

    /// Compare snapshot sets across breakpoints, pairing by device class
    ///
    /// Baselines without a matching post-fix snapshot are skipped; failed
    /// pairs are omitted from the result.
    pub async fn analyze_all(
        &mut self,
        baselines: &[SnapshotRecord],
        post_fixes: &[SnapshotRecord],
    ) -> Vec<DiffResult> {
        let mut results = Vec::new();
        for baseline in baselines {
            let post_fix = post_fixes
                .iter()
                .find(|s| s.metadata.device == baseline.metadata.device);
            if let Some(post_fix) = post_fix {
                if let Some(result) = self.analyze(baseline, post_fix).await {
                    results.push(result);
                }
            }
        }
        results
    }

    /// All diffs for a component, newest first
    pub fn component_diffs(&self, component_id: &str) -> Vec<DiffResult> {
        let mut results: Vec<DiffResult> = self
            .diffs
            .values()
            .filter(|d| d.component_id == component_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        results
    }

    /// Aggregate statistics over a component's diff history
    pub fn statistics(&self, component_id: &str) -> DiffStatistics {
        let results = self.component_diffs(component_id);
        if results.is_empty() {
            return DiffStatistics::default();
        }

        let total = results.len();
        let average_diff_percentage =
            results.iter().map(|r| r.diff_percentage).sum::<f64>() / total as f64;

        let mut severity_distribution: HashMap<DiffSeverity, usize> = HashMap::new();
        let mut type_distribution: HashMap<DiffType, usize> = HashMap::new();
        for result in &results {
            for (severity, count) in &result.summary.regions_by_severity {
                *severity_distribution.entry(*severity).or_insert(0) += count;
            }
            for (diff_type, count) in &result.summary.regions_by_type {
                *type_distribution.entry(*diff_type).or_insert(0) += count;
            }
        }

        let acceptable = results
            .iter()
            .filter(|r| r.diff_percentage < self.config.sensitivity * 100.0)
            .count();

        DiffStatistics {
            total_diffs: total,
            average_diff_percentage,
            severity_distribution,
            type_distribution,
            success_rate: acceptable as f64 / total as f64 * 100.0,
        }
    }

    /// Serialize diffs (optionally for one component) for offline analysis
    pub fn export(&self, component_id: Option<&str>) -> Result<String> {
        let diffs: Vec<DiffResult> = match component_id {
            Some(id) => self.component_diffs(id),
            None => self.diffs.values().cloned().collect(),
        };

        let document = serde_json::json!({
            "version": "1.0",
            "export_date": Utc::now(),
            "total_diffs": diffs.len(),
            "diffs": diffs,
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }

    async fn load_persisted(&mut self) {
        match self.store.load(DIFF_STORE_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<PersistedDiffs>(&bytes) {
                Ok(persisted) => {
                    for diff in persisted.diffs {
                        self.diffs.insert(diff.id.clone(), diff);
                    }
                    debug!("Loaded {} diffs from storage", self.diffs.len());
                }
                Err(e) => warn!("Failed to parse persisted diffs: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Failed to load diffs: {}", e),
        }
    }

    async fn persist(&self) {
        let persisted = PersistedDiffs {
            version: "1.0".to_string(),
            timestamp: Utc::now(),
            diffs: self.diffs.values().cloned().collect(),
        };

        let bytes = match serde_json::to_vec(&persisted) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize diffs: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.save(DIFF_STORE_KEY, &bytes).await {
            warn!("Failed to save diffs: {}", e);
        }
    }
}

/// A pair is comparable when both snapshots cover the same component at
/// the same breakpoint.
fn validate_pair(baseline: &SnapshotRecord, post_fix: &SnapshotRecord) -> std::result::Result<(), String> {
    if baseline.metadata.component_id != post_fix.metadata.component_id {
        return Err(format!(
            "component mismatch: {} vs {}",
            baseline.metadata.component_id, post_fix.metadata.component_id
        ));
    }
    if baseline.metadata.device != post_fix.metadata.device
        || baseline.metadata.viewport != post_fix.metadata.viewport
    {
        return Err(format!(
            "breakpoint mismatch: {}/{} vs {}/{}",
            baseline.metadata.device,
            baseline.metadata.viewport,
            post_fix.metadata.device,
            post_fix.metadata.viewport
        ));
    }
    Ok(())
}

/// Derive a diff id from the snapshot pair it compares
fn diff_id(baseline_id: &str, post_fix_id: &str) -> String {
    let salt = &Uuid::new_v4().simple().to_string()[..8];
    format!("diff_{}_{}_{}", baseline_id, post_fix_id, salt)
}
