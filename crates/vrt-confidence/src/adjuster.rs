//! Confidence adjustment from visual diff evidence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use vrt_core::access::{AccessPolicy, AuditAction, AuditEvent, AuditSink};
use vrt_core::config::{ConfidenceConfig, SeverityPenalties};
use vrt_core::store::{StateStore, CONFIDENCE_STORE_KEY};
use vrt_core::{FixContext, Result};
use vrt_diff::{DiffRegion, DiffResult, DiffSeverity, DiffType};

use crate::model::LearningModel;

/// Visual evidence that fed one adjustment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualFactors {
    pub diff_percentage: f64,
    pub severity: DiffSeverity,
    /// Regions whose change the fixing agent did not declare
    pub unexpected_changes: usize,
    /// Regions matching a declared expected change
    pub intentional_changes: usize,
    /// 1 − (layout-shift regions / total regions), floored at 0
    pub layout_stability: f64,
}

/// One confidence adjustment, keyed by the fix/diff pair it judged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceAdjustment {
    pub fix_id: String,
    pub diff_id: String,
    pub component_id: String,
    pub original_confidence: f64,
    /// Always `clamp(original + factor)` within the configured bounds
    pub adjusted_confidence: f64,
    /// Signed factor, clamped to [-0.5, +0.5]
    pub adjustment_factor: f64,
    pub visual_factors: VisualFactors,
    pub reasoning: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate figures over all stored adjustments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfidenceStatistics {
    pub total_adjustments: usize,
    pub average_adjustment: f64,
    /// Share of adjustments that raised confidence
    pub accuracy_improvement: f64,
    /// Share of adjustments with a near-clean diff
    pub visual_consistency: f64,
    pub severity_distribution: HashMap<DiffSeverity, usize>,
}

#[derive(Serialize, Deserialize)]
struct PersistedAdjustments {
    version: String,
    timestamp: DateTime<Utc>,
    model: LearningModel,
    adjustments: Vec<ConfidenceAdjustment>,
}

/// Adjusts agent confidence from diff evidence and learns from outcomes
///
/// Denied calls return `None` after auditing; the caller keeps the prior
/// confidence and must not treat the fix as visually validated.
pub struct ConfidenceAdjuster {
    config: ConfidenceConfig,
    actor: String,
    policy: Arc<dyn AccessPolicy>,
    audit: Arc<dyn AuditSink>,
    store: Arc<dyn StateStore>,
    model: LearningModel,
    adjustments: HashMap<String, ConfidenceAdjustment>,
}

impl ConfidenceAdjuster {
    /// Create an adjuster and hydrate the persisted model and history
    pub async fn open(
        config: ConfidenceConfig,
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
            model: LearningModel::default(),
            adjustments: HashMap::new(),
        };
        this.load_persisted().await;
        this
    }

    /// Adjust a prior confidence value against one diff result
    pub async fn adjust(
        &mut self,
        original_confidence: f64,
        diff: &DiffResult,
        fix: &FixContext,
    ) -> Option<ConfidenceAdjustment> {
        let details = serde_json::json!({
            "fix_id": fix.fix_id,
            "diff_id": diff.id,
            "original_confidence": original_confidence,
        });

        let decision = self.policy.authorize(&self.actor);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_else(|| "access denied".to_string());
            warn!("Confidence adjustment denied for fix {}: {}", fix.fix_id, reason);
            self.audit
                .record(
                    AuditEvent::failure(&self.actor, AuditAction::ConfidenceAdjust, details, &reason)
                        .for_component(&fix.component_id, &fix.component_id),
                )
                .await;
            return None;
        }

        if !self.config.enabled {
            let adjustment = ConfidenceAdjustment {
                fix_id: fix.fix_id.clone(),
                diff_id: diff.id.clone(),
                component_id: fix.component_id.clone(),
                original_confidence,
                adjusted_confidence: original_confidence,
                adjustment_factor: 0.0,
                visual_factors: VisualFactors {
                    diff_percentage: diff.diff_percentage,
                    severity: diff.severity,
                    unexpected_changes: 0,
                    intentional_changes: 0,
                    layout_stability: 1.0,
                },
                reasoning: vec!["Visual confidence adjustment disabled".to_string()],
                created_at: Utc::now(),
            };
            self.audit
                .record(AuditEvent::success(
                    &self.actor,
                    AuditAction::ConfidenceAdjust,
                    serde_json::json!({ "fix_id": fix.fix_id, "disabled": true }),
                ))
                .await;
            return Some(adjustment);
        }

        let visual_factors = analyze_visual_factors(diff, &fix.expected_changes);
        let adjustment_factor = self.adjustment_factor(&visual_factors);
        let adjusted_confidence = (original_confidence + adjustment_factor)
            .clamp(self.config.min_confidence, self.config.max_confidence);
        let reasoning = reasoning_for(&visual_factors, adjustment_factor);

        let adjustment = ConfidenceAdjustment {
            fix_id: fix.fix_id.clone(),
            diff_id: diff.id.clone(),
            component_id: fix.component_id.clone(),
            original_confidence,
            adjusted_confidence,
            adjustment_factor,
            visual_factors,
            reasoning,
            created_at: Utc::now(),
        };

        let key = format!("{}_{}", fix.fix_id, diff.id);
        self.adjustments.insert(key, adjustment.clone());

        if self.config.learning_enabled {
            self.model.observe(
                adjustment.visual_factors.layout_stability,
                adjustment.adjusted_confidence > adjustment.original_confidence,
            );
            debug!(
                "Learning model updated: multiplier={:.3}, accuracy={:.3}",
                self.model.visual_multiplier, self.model.historical_accuracy
            );
        }

        self.persist().await;

        self.audit
            .record(
                AuditEvent::success(
                    &self.actor,
                    AuditAction::ConfidenceAdjust,
                    serde_json::json!({
                        "fix_id": fix.fix_id,
                        "diff_id": diff.id,
                        "original_confidence": original_confidence,
                        "adjusted_confidence": adjusted_confidence,
                        "adjustment_factor": adjustment_factor,
                    }),
                )
                .for_component(&fix.component_id, &fix.component_id),
            )
            .await;

        info!(
            "Confidence adjusted for fix {}: {:.3} -> {:.3} ({:+.3})",
            fix.fix_id, original_confidence, adjusted_confidence, adjustment_factor
        );
        Some(adjustment)
    }

    /// Adjust against several diffs of the same fix, one per breakpoint
    ///
    /// Each diff is judged independently; there is no cross-breakpoint
    /// aggregation. Denied calls are omitted from the result.
    pub async fn adjust_batch(
        &mut self,
        original_confidence: f64,
        diffs: &[DiffResult],
        fix: &FixContext,
    ) -> Vec<ConfidenceAdjustment> {
        let mut adjustments = Vec::new();
        for diff in diffs {
            if let Some(adjustment) = self.adjust(original_confidence, diff, fix).await {
                adjustments.push(adjustment);
            }
        }
        adjustments
    }

    /// Adjustment history for one fix, newest first
    pub fn history(&self, fix_id: &str) -> Vec<ConfidenceAdjustment> {
        let mut history: Vec<ConfidenceAdjustment> = self
            .adjustments
            .values()
            .filter(|a| a.fix_id == fix_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        history
    }

    /// Aggregate statistics over all stored adjustments
    pub fn statistics(&self) -> ConfidenceStatistics {
        if self.adjustments.is_empty() {
            return ConfidenceStatistics::default();
        }

        let total = self.adjustments.len();
        let average_adjustment = self
            .adjustments
            .values()
            .map(|a| a.adjustment_factor)
            .sum::<f64>()
            / total as f64;

        let raised = self
            .adjustments
            .values()
            .filter(|a| a.adjusted_confidence > a.original_confidence)
            .count();
        let consistent = self
            .adjustments
            .values()
            .filter(|a| {
                a.visual_factors.diff_percentage < 5.0
                    && a.visual_factors.severity == DiffSeverity::None
            })
            .count();

        let mut severity_distribution: HashMap<DiffSeverity, usize> = HashMap::new();
        for adjustment in self.adjustments.values() {
            *severity_distribution
                .entry(adjustment.visual_factors.severity)
                .or_insert(0) += 1;
        }

        ConfidenceStatistics {
            total_adjustments: total,
            average_adjustment,
            accuracy_improvement: raised as f64 / total as f64,
            visual_consistency: consistent as f64 / total as f64,
            severity_distribution,
        }
    }

    /// Serialize the model, history, and statistics for offline analysis
    pub fn export(&self) -> Result<String> {
        let adjustments: Vec<&ConfidenceAdjustment> = self.adjustments.values().collect();
        let document = serde_json::json!({
            "version": "1.0",
            "export_date": Utc::now(),
            "model": self.model,
            "adjustments": adjustments,
            "statistics": self.statistics(),
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Drop all learned state and stored adjustments
    pub async fn reset_learning_model(&mut self) {
        self.model.reset();
        self.adjustments.clear();
        self.persist().await;
        self.audit
            .record(AuditEvent::success(
                &self.actor,
                AuditAction::ConfidenceAdjust,
                serde_json::json!({ "reset": true }),
            ))
            .await;
        info!("Confidence learning model reset to defaults");
    }

    /// Current learning state
    pub fn model(&self) -> &LearningModel {
        &self.model
    }

    fn adjustment_factor(&self, factors: &VisualFactors) -> f64 {
        let mut factor = severity_penalty(&self.config.severity_penalties, factors.severity);

        // Higher diff percentage erodes confidence, capped at 0.2.
        factor -= (factors.diff_percentage / 100.0 * 0.2).min(0.2);

        factor += factors.unexpected_changes as f64 * self.config.unexpected_change_penalty;
        factor += factors.intentional_changes as f64 * self.config.intentional_change_bonus;
        factor += factors.layout_stability * self.config.layout_stability_bonus;

        factor *= self.model.visual_multiplier;
        factor *= self.model.historical_accuracy;

        factor.clamp(-0.5, 0.5)
    }

    async fn load_persisted(&mut self) {
        match self.store.load(CONFIDENCE_STORE_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<PersistedAdjustments>(&bytes) {
                Ok(persisted) => {
                    self.model = persisted.model;
                    for adjustment in persisted.adjustments {
                        let key = format!("{}_{}", adjustment.fix_id, adjustment.diff_id);
                        self.adjustments.insert(key, adjustment);
                    }
                    debug!("Loaded {} confidence adjustments from storage", self.adjustments.len());
                }
                Err(e) => warn!("Failed to parse persisted adjustments: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Failed to load confidence adjustments: {}", e),
        }
    }

    async fn persist(&self) {
        let persisted = PersistedAdjustments {
            version: "1.0".to_string(),
            timestamp: Utc::now(),
            model: self.model.clone(),
            adjustments: self.adjustments.values().cloned().collect(),
        };

        let bytes = match serde_json::to_vec(&persisted) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize confidence adjustments: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.save(CONFIDENCE_STORE_KEY, &bytes).await {
            warn!("Failed to save confidence adjustments: {}", e);
        }
    }
}

fn severity_penalty(penalties: &SeverityPenalties, severity: DiffSeverity) -> f64 {
    match severity {
        DiffSeverity::None => penalties.none,
        DiffSeverity::Minor => penalties.minor,
        DiffSeverity::Moderate => penalties.moderate,
        DiffSeverity::Major => penalties.major,
        DiffSeverity::Critical => penalties.critical,
    }
}

fn analyze_visual_factors(diff: &DiffResult, expected_changes: &[String]) -> VisualFactors {
    let intentional_changes = diff
        .regions
        .iter()
        .filter(|r| matches_expected(r, expected_changes))
        .count();
    let unexpected_changes = diff.regions.len() - intentional_changes;

    let layout_shifts = diff
        .regions
        .iter()
        .filter(|r| r.diff_type == DiffType::LayoutShift)
        .count();
    let layout_stability =
        (1.0 - layout_shifts as f64 / diff.regions.len().max(1) as f64).max(0.0);

    VisualFactors {
        diff_percentage: diff.diff_percentage,
        severity: diff.severity,
        unexpected_changes,
        intentional_changes,
        layout_stability,
    }
}

/// Lexical match between a region and the agent's declared changes
fn matches_expected(region: &DiffRegion, expected_changes: &[String]) -> bool {
    let type_phrase = region.diff_type.to_string().replace('_', " ");
    let description = region.description.to_lowercase();

    expected_changes.iter().any(|expected| {
        let expected = expected.to_lowercase();
        expected.contains(&type_phrase)
            || (expected.contains("layout") && region.diff_type == DiffType::LayoutShift)
            || (expected.contains("color") && region.diff_type == DiffType::ColorChange)
            || description.contains(&expected)
    })
}

fn reasoning_for(factors: &VisualFactors, adjustment_factor: f64) -> Vec<String> {
    let mut reasoning = Vec::new();

    if factors.severity != DiffSeverity::None {
        reasoning.push(format!("{} visual changes detected", factors.severity));
    }

    if factors.diff_percentage > 5.0 {
        reasoning.push(format!(
            "High visual difference ({:.1}%)",
            factors.diff_percentage
        ));
    } else if factors.diff_percentage > 1.0 {
        reasoning.push(format!(
            "Moderate visual difference ({:.1}%)",
            factors.diff_percentage
        ));
    } else {
        reasoning.push(format!(
            "Minimal visual difference ({:.1}%)",
            factors.diff_percentage
        ));
    }

    if factors.unexpected_changes > 0 {
        reasoning.push(format!(
            "{} unexpected changes detected",
            factors.unexpected_changes
        ));
    }
    if factors.intentional_changes > 0 {
        reasoning.push(format!(
            "{} intentional changes confirmed",
            factors.intentional_changes
        ));
    }

    if factors.layout_stability < 0.8 {
        reasoning.push("Layout stability concerns detected".to_string());
    } else if factors.layout_stability > 0.95 {
        reasoning.push("Excellent layout stability maintained".to_string());
    }

    if adjustment_factor > 0.1 {
        reasoning.push("Significant confidence boost from visual validation".to_string());
    } else if adjustment_factor < -0.1 {
        reasoning.push("Significant confidence reduction due to visual issues".to_string());
    } else if adjustment_factor.abs() < 0.05 {
        reasoning.push("Minimal confidence adjustment needed".to_string());
    }

    reasoning
}
