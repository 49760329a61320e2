//! Suite orchestration across environments and assertions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vrt_core::access::{AccessPolicy, AuditAction, AuditEvent, AuditSink};
use vrt_core::config::SuiteConfig;
use vrt_core::store::{StateStore, SUITE_STORE_KEY};
use vrt_core::{ComponentDescriptor, Result};
use vrt_diff::DiffResult;
use vrt_snapshot::SnapshotRecord;

use crate::assertions::{self, AssertionKind, TestAssertion};
use crate::environment::TestEnvironment;

/// One assertion executed under one environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub assertion: TestAssertion,
    /// Environment name the assertion ran under
    pub environment: String,
    pub passed: bool,
    pub actual_value: Option<serde_json::Value>,
    /// Set when the check itself could not run; such results never pass
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Counts and scores recomputed after every run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSummary {
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    /// `passed / total * 100`
    pub success_rate: f64,
    /// Mean over results carrying a numeric actual value
    pub average_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteMetadata {
    pub created_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub total_runs: u32,
}

/// All environments × all assertions for one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: String,
    pub name: String,
    pub component_id: String,
    pub environments: Vec<TestEnvironment>,
    pub assertions: Vec<TestAssertion>,
    /// Results accumulate across runs
    pub results: Vec<TestResult>,
    pub summary: TestSummary,
    pub metadata: SuiteMetadata,
}

/// Per-environment pass/fail counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentStats {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Aggregate figures across all suites
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuiteStatistics {
    pub total_suites: usize,
    pub total_tests: usize,
    pub overall_success_rate: f64,
    pub average_score: f64,
    pub environment_stats: HashMap<String, EnvironmentStats>,
}

#[derive(Serialize, Deserialize)]
struct PersistedSuites {
    version: String,
    timestamp: DateTime<Utc>,
    suites: Vec<TestSuite>,
}

/// Runs assertion suites over components and owns the results
///
/// Individual assertion failures and check errors are recorded as failed
/// results; only denial or a disabled config withholds the whole suite.
pub struct TestOrchestrator {
    config: SuiteConfig,
    actor: String,
    policy: Arc<dyn AccessPolicy>,
    audit: Arc<dyn AuditSink>,
    store: Arc<dyn StateStore>,
    suites: HashMap<String, TestSuite>,
}

impl TestOrchestrator {
    /// Create an orchestrator and hydrate previously persisted suites
    pub async fn open(
        config: SuiteConfig,
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
            suites: HashMap::new(),
        };
        this.load_persisted().await;
        this
    }

    /// Create a suite for a component with the default assertions plus any
    /// custom ones
    pub async fn create_suite(
        &mut self,
        component: &ComponentDescriptor,
        custom_assertions: Vec<TestAssertion>,
    ) -> TestSuite {
        let mut assertions = TestAssertion::defaults(&self.config);
        assertions.extend(custom_assertions);

        let suite = TestSuite {
            id: suite_id(&component.id),
            name: format!("{} Test Suite", component.name),
            component_id: component.id.clone(),
            environments: TestEnvironment::defaults(),
            assertions,
            results: Vec::new(),
            summary: TestSummary::default(),
            metadata: SuiteMetadata {
                created_at: Utc::now(),
                last_run: None,
                total_runs: 0,
            },
        };

        self.suites.insert(suite.id.clone(), suite.clone());
        self.persist().await;
        info!("Created test suite for {}: {}", component.name, suite.id);
        suite
    }

    /// The suite registered for a component, if any
    pub fn suite_for(&self, component_id: &str) -> Option<&TestSuite> {
        self.suites
            .values()
            .find(|s| s.component_id == component_id)
    }

    /// Run every environment × assertion combination for a component
    ///
    /// The snapshot pair and diff result tie the run to the fix being
    /// validated; they are recorded in the audit trail.
    pub async fn run(
        &mut self,
        component: &ComponentDescriptor,
        baseline: &SnapshotRecord,
        post_fix: &SnapshotRecord,
        diff: &DiffResult,
    ) -> Option<TestSuite> {
        let details = serde_json::json!({
            "baseline_id": baseline.id,
            "post_fix_id": post_fix.id,
            "diff_id": diff.id,
            "diff_severity": diff.severity.to_string(),
        });

        let decision = self.policy.authorize(&self.actor);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_else(|| "access denied".to_string());
            warn!("Suite run denied for {}: {}", component.name, reason);
            self.audit
                .record(
                    AuditEvent::failure(&self.actor, AuditAction::SuiteRun, details, &reason)
                        .for_component(&component.id, &component.name),
                )
                .await;
            return None;
        }

        if !self.config.enabled {
            let reason = "assertion suite disabled in config";
            self.audit
                .record(
                    AuditEvent::failure(&self.actor, AuditAction::SuiteRun, details, reason)
                        .for_component(&component.id, &component.name),
                )
                .await;
            return None;
        }

        let suite_id = match self.suite_for(&component.id) {
            Some(suite) => suite.id.clone(),
            None => self.create_suite(component, Vec::new()).await.id,
        };

        let (environments, assertions) = {
            let suite = &self.suites[&suite_id];
            (suite.environments.clone(), suite.assertions.clone())
        };

        let mut new_results = Vec::new();
        for environment in &environments {
            debug!("Running assertions under {} environment", environment.name);
            for assertion in &assertions {
                new_results.push(self.run_assertion(assertion, environment, component));
            }
        }

        let suite = self.suites.get_mut(&suite_id)?;
        suite.results.extend(new_results);
        suite.metadata.last_run = Some(Utc::now());
        suite.metadata.total_runs += 1;
        suite.summary = summarize(&suite.results);
        let snapshot = suite.clone();

        self.persist().await;

        self.audit
            .record(
                AuditEvent::success(
                    &self.actor,
                    AuditAction::SuiteRun,
                    serde_json::json!({
                        "suite_id": snapshot.id,
                        "baseline_id": baseline.id,
                        "post_fix_id": post_fix.id,
                        "diff_id": diff.id,
                        "total_tests": snapshot.summary.total_tests,
                        "success_rate": snapshot.summary.success_rate,
                    }),
                )
                .for_component(&component.id, &component.name),
            )
            .await;

        info!(
            "Suite run completed for {}: {}/{} passed ({:.1}%)",
            component.name,
            snapshot.summary.passed,
            snapshot.summary.total_tests,
            snapshot.summary.success_rate
        );
        Some(snapshot)
    }

    /// Accessibility score and color contrast checks, outside any suite
    pub async fn run_accessibility(
        &mut self,
        component: &ComponentDescriptor,
    ) -> Option<Vec<TestResult>> {
        let decision = self.policy.authorize(&self.actor);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_else(|| "access denied".to_string());
            self.audit
                .record(
                    AuditEvent::failure(
                        &self.actor,
                        AuditAction::SuiteRun,
                        serde_json::json!({ "check": "accessibility" }),
                        &reason,
                    )
                    .for_component(&component.id, &component.name),
                )
                .await;
            return None;
        }

        let score_assertion = TestAssertion::new(
            "accessibility_score",
            AssertionKind::AccessibilityScore,
            format!("[data-testid=\"{}\"]", component.id),
            "Accessibility score above threshold",
        )
        .with_expected(serde_json::json!(self.config.accessibility_threshold));
        let contrast_assertion = TestAssertion::new(
            "color_contrast",
            AssertionKind::ColorContrast,
            format!("[data-testid=\"{}\"]", component.id),
            "Color contrast ratio above threshold",
        )
        .with_expected(serde_json::json!(self.config.color_contrast_threshold));

        let environment = TestEnvironment::defaults().remove(0);
        let results = vec![
            self.run_assertion(&score_assertion, &environment, component),
            self.run_assertion(&contrast_assertion, &environment, component),
        ];

        self.audit
            .record(
                AuditEvent::success(
                    &self.actor,
                    AuditAction::SuiteRun,
                    serde_json::json!({
                        "check": "accessibility",
                        "score": results[0].actual_value,
                        "contrast": results[1].actual_value,
                    }),
                )
                .for_component(&component.id, &component.name),
            )
            .await;

        info!("Accessibility checks completed for {}", component.name);
        Some(results)
    }

    /// Responsive layout check at every configured breakpoint
    pub async fn run_responsive(
        &mut self,
        component: &ComponentDescriptor,
    ) -> Option<Vec<TestResult>> {
        let decision = self.policy.authorize(&self.actor);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_else(|| "access denied".to_string());
            self.audit
                .record(
                    AuditEvent::failure(
                        &self.actor,
                        AuditAction::SuiteRun,
                        serde_json::json!({ "check": "responsive" }),
                        &reason,
                    )
                    .for_component(&component.id, &component.name),
                )
                .await;
            return None;
        }

        let mut results = Vec::new();
        for breakpoint in self.config.responsive_breakpoints.clone() {
            let passed =
                assertions::responsive_layout(&component.root, breakpoint, &self.config);
            let assertion = TestAssertion::new(
                "responsive_layout",
                AssertionKind::ResponsiveLayout,
                format!("[data-testid=\"{}\"]", component.id),
                format!("Responsive layout at {}px breakpoint", breakpoint),
            )
            .with_expected(serde_json::json!(true));
            results.push(TestResult {
                id: result_id(),
                assertion,
                environment: format!("{}px", breakpoint),
                passed,
                actual_value: Some(serde_json::json!(passed)),
                error: None,
                created_at: Utc::now(),
            });
        }

        self.audit
            .record(
                AuditEvent::success(
                    &self.actor,
                    AuditAction::SuiteRun,
                    serde_json::json!({
                        "check": "responsive",
                        "breakpoints": self.config.responsive_breakpoints,
                        "passed": results.iter().filter(|r| r.passed).count(),
                    }),
                )
                .for_component(&component.id, &component.name),
            )
            .await;

        info!(
            "Responsive checks completed for {} across {} breakpoints",
            component.name,
            results.len()
        );
        Some(results)
    }

    /// Aggregate statistics across all suites
    pub fn statistics(&self) -> SuiteStatistics {
        let total_suites = self.suites.len();
        let total_tests: usize = self.suites.values().map(|s| s.summary.total_tests).sum();
        let total_passed: usize = self.suites.values().map(|s| s.summary.passed).sum();

        let overall_success_rate = if total_tests > 0 {
            total_passed as f64 / total_tests as f64 * 100.0
        } else {
            0.0
        };
        let average_score = if total_suites > 0 {
            self.suites
                .values()
                .map(|s| s.summary.average_score)
                .sum::<f64>()
                / total_suites as f64
        } else {
            0.0
        };

        let mut environment_stats: HashMap<String, EnvironmentStats> = HashMap::new();
        for suite in self.suites.values() {
            for result in &suite.results {
                let stats = environment_stats
                    .entry(result.environment.clone())
                    .or_default();
                stats.total += 1;
                if result.passed {
                    stats.passed += 1;
                } else {
                    stats.failed += 1;
                }
            }
        }

        SuiteStatistics {
            total_suites,
            total_tests,
            overall_success_rate,
            average_score,
            environment_stats,
        }
    }

    /// Serialize suites and statistics for offline analysis
    pub fn export(&self) -> Result<String> {
        let suites: Vec<&TestSuite> = self.suites.values().collect();
        let document = serde_json::json!({
            "version": "1.0",
            "export_date": Utc::now(),
            "total_suites": suites.len(),
            "suites": suites,
            "statistics": self.statistics(),
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }

    // One assertion under one environment; check errors become failed
    // results rather than aborting the run.

    fn run_assertion(
        &self,
        assertion: &TestAssertion,
        environment: &TestEnvironment,
        component: &ComponentDescriptor,
    ) -> TestResult {
        match assertions::check(assertion, component, environment.viewport, &self.config) {
            Ok(outcome) => TestResult {
                id: result_id(),
                assertion: assertion.clone(),
                environment: environment.name.clone(),
                passed: outcome.passed,
                actual_value: Some(outcome.actual),
                error: None,
                created_at: Utc::now(),
            },
            Err(e) => {
                warn!(
                    "Assertion {} failed to run for {}: {}",
                    assertion.id, component.name, e
                );
                TestResult {
                    id: result_id(),
                    assertion: assertion.clone(),
                    environment: environment.name.clone(),
                    passed: false,
                    actual_value: None,
                    error: Some(e.to_string()),
                    created_at: Utc::now(),
                }
            }
        }
    }

    async fn load_persisted(&mut self) {
        match self.store.load(SUITE_STORE_KEY).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<PersistedSuites>(&bytes) {
                Ok(persisted) => {
                    for suite in persisted.suites {
                        self.suites.insert(suite.id.clone(), suite);
                    }
                    debug!("Loaded {} test suites from storage", self.suites.len());
                }
                Err(e) => warn!("Failed to parse persisted test suites: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("Failed to load test suites: {}", e),
        }
    }

    async fn persist(&self) {
        let persisted = PersistedSuites {
            version: "1.0".to_string(),
            timestamp: Utc::now(),
            suites: self.suites.values().cloned().collect(),
        };

        let bytes = match serde_json::to_vec(&persisted) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to serialize test suites: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.save(SUITE_STORE_KEY, &bytes).await {
            warn!("Failed to save test suites: {}", e);
        }
    }
}

/// Summary over every result the suite has accumulated
fn summarize(results: &[TestResult]) -> TestSummary {
    let total_tests = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = total_tests - passed;
    let success_rate = if total_tests > 0 {
        passed as f64 / total_tests as f64 * 100.0
    } else {
        0.0
    };

    let numeric: Vec<f64> = results
        .iter()
        .filter_map(|r| r.actual_value.as_ref().and_then(|v| v.as_f64()))
        .collect();
    let average_score = if numeric.is_empty() {
        0.0
    } else {
        numeric.iter().sum::<f64>() / numeric.len() as f64
    };

    TestSummary {
        total_tests,
        passed,
        failed,
        success_rate,
        average_score,
    }
}

fn suite_id(component_id: &str) -> String {
    let salt = &Uuid::new_v4().simple().to_string()[..8];
    format!(
        "test_suite_{}_{}_{}",
        component_id,
        Utc::now().timestamp_millis(),
        salt
    )
}

fn result_id() -> String {
    let salt = &Uuid::new_v4().simple().to_string()[..8];
    format!("test_result_{}_{}", Utc::now().timestamp_millis(), salt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrt_core::access::{AllowAll, DenyAll, MemoryAudit};
    use vrt_core::store::MemoryStore;
    use vrt_core::{Bounds, DeviceClass, RenderedNode, Viewport};
    use vrt_diff::{DiffRunMetadata, DiffSeverity, DiffSummary};
    use vrt_snapshot::{CaptureKind, ComponentStateSnapshot, SnapshotMetadata};

    // A single-node component that passes every default assertion.
    fn passing_component() -> ComponentDescriptor {
        ComponentDescriptor::new(
            "comp-1",
            "Header",
            RenderedNode::new("header")
                .with_attribute("data-testid", "comp-1")
                .with_bounds(Bounds::new(0.0, 0.0, 800.0, 120.0)),
        )
    }

    fn snapshot(id: &str, kind: CaptureKind) -> SnapshotRecord {
        SnapshotRecord {
            id: id.to_string(),
            metadata: SnapshotMetadata {
                component_id: "comp-1".to_string(),
                component_name: "Header".to_string(),
                captured_at: Utc::now(),
                element_width: 800.0,
                element_height: 120.0,
                viewport: Viewport::new(1920, 1080),
                device: DeviceClass::Desktop,
                kind,
                fix_id: None,
                prior_confidence: None,
                agent: "vrt-agent".to_string(),
                source_url: String::new(),
            },
            image_data: Vec::new(),
            element_bounds: Bounds::new(0.0, 0.0, 800.0, 120.0),
            component_state: ComponentStateSnapshot::default(),
        }
    }

    fn clean_diff() -> DiffResult {
        DiffResult {
            id: "diff-1".to_string(),
            baseline_snapshot_id: "b-1".to_string(),
            post_fix_snapshot_id: "p-1".to_string(),
            component_id: "comp-1".to_string(),
            created_at: Utc::now(),
            diff_percentage: 0.0,
            severity: DiffSeverity::None,
            regions: Vec::new(),
            summary: DiffSummary::default(),
            metadata: DiffRunMetadata {
                viewport: Viewport::new(1920, 1080),
                device: DeviceClass::Desktop,
                fix_id: None,
                analysis_ms: 1,
            },
        }
    }

    async fn orchestrator_with(
        config: SuiteConfig,
        policy: Arc<dyn AccessPolicy>,
        audit: Arc<MemoryAudit>,
    ) -> TestOrchestrator {
        TestOrchestrator::open(config, "vrt-agent", policy, audit, Arc::new(MemoryStore::new()))
            .await
    }

    #[tokio::test]
    async fn test_full_grid_passes() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit.clone()).await;

        let component = passing_component();
        let suite = orchestrator
            .run(
                &component,
                &snapshot("b-1", CaptureKind::Baseline),
                &snapshot("p-1", CaptureKind::PostFix),
                &clean_diff(),
            )
            .await
            .unwrap();

        // 3 environments x 4 default assertions.
        assert_eq!(suite.summary.total_tests, 12);
        assert_eq!(suite.summary.passed, 12);
        assert_eq!(suite.summary.success_rate, 100.0);
        assert_eq!(suite.metadata.total_runs, 1);
        assert!(suite.metadata.last_run.is_some());
        assert!(audit.events().iter().any(|e| e.success));
    }

    #[tokio::test]
    async fn test_flat_root_with_children_passes_grid() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit).await;

        // The root's box encloses both children; only the disjoint
        // children are overlap candidates.
        let component = ComponentDescriptor::new(
            "comp-1",
            "Header",
            RenderedNode::new("header")
                .with_attribute("data-testid", "comp-1")
                .with_bounds(Bounds::new(0.0, 0.0, 800.0, 120.0))
                .with_child(
                    RenderedNode::new("span").with_bounds(Bounds::new(0.0, 0.0, 100.0, 100.0)),
                )
                .with_child(
                    RenderedNode::new("span").with_bounds(Bounds::new(200.0, 0.0, 100.0, 100.0)),
                ),
        );
        let suite = orchestrator
            .run(
                &component,
                &snapshot("b-1", CaptureKind::Baseline),
                &snapshot("p-1", CaptureKind::PostFix),
                &clean_diff(),
            )
            .await
            .unwrap();

        assert_eq!(suite.summary.total_tests, 12);
        assert_eq!(suite.summary.passed, 12);
    }

    #[tokio::test]
    async fn test_nine_of_twelve_is_seventy_five_percent() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit).await;

        // No data-testid: element_exists fails in all three environments.
        let component = ComponentDescriptor::new(
            "comp-1",
            "Header",
            RenderedNode::new("header").with_bounds(Bounds::new(0.0, 0.0, 800.0, 120.0)),
        );
        let suite = orchestrator
            .run(
                &component,
                &snapshot("b-1", CaptureKind::Baseline),
                &snapshot("p-1", CaptureKind::PostFix),
                &clean_diff(),
            )
            .await
            .unwrap();

        assert_eq!(suite.summary.total_tests, 12);
        assert_eq!(suite.summary.passed, 9);
        assert_eq!(suite.summary.failed, 3);
        assert!((suite.summary.success_rate - 75.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_results_record_environment() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit).await;

        let component = passing_component();
        let suite = orchestrator
            .run(
                &component,
                &snapshot("b-1", CaptureKind::Baseline),
                &snapshot("p-1", CaptureKind::PostFix),
                &clean_diff(),
            )
            .await
            .unwrap();

        let environments: Vec<&str> =
            suite.results.iter().map(|r| r.environment.as_str()).collect();
        assert_eq!(environments.iter().filter(|e| **e == "Desktop").count(), 4);
        assert_eq!(environments.iter().filter(|e| **e == "Tablet").count(), 4);
        assert_eq!(environments.iter().filter(|e| **e == "Mobile").count(), 4);
    }

    #[tokio::test]
    async fn test_assertion_error_is_recorded_not_fatal() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit).await;

        let component = passing_component();
        // Contrast check cannot run without color styles.
        let custom = vec![TestAssertion::new(
            "color_contrast",
            AssertionKind::ColorContrast,
            "*",
            "Color contrast ratio above threshold",
        )];
        orchestrator.create_suite(&component, custom).await;

        let suite = orchestrator
            .run(
                &component,
                &snapshot("b-1", CaptureKind::Baseline),
                &snapshot("p-1", CaptureKind::PostFix),
                &clean_diff(),
            )
            .await
            .unwrap();

        assert_eq!(suite.summary.total_tests, 15);
        let errored: Vec<&TestResult> =
            suite.results.iter().filter(|r| r.error.is_some()).collect();
        assert_eq!(errored.len(), 3);
        assert!(errored.iter().all(|r| !r.passed));
        // The rest of the grid still ran and passed.
        assert_eq!(suite.summary.passed, 12);
    }

    #[tokio::test]
    async fn test_denied_run_is_audited() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator = orchestrator_with(
            SuiteConfig::default(),
            Arc::new(DenyAll::new("super admin required")),
            audit.clone(),
        )
        .await;

        let result = orchestrator
            .run(
                &passing_component(),
                &snapshot("b-1", CaptureKind::Baseline),
                &snapshot("p-1", CaptureKind::PostFix),
                &clean_diff(),
            )
            .await;
        assert!(result.is_none());

        let events = audit.events();
        assert_eq!(events.len(), 1);
        assert!(!events[0].success);
    }

    #[tokio::test]
    async fn test_disabled_suite_returns_none() {
        let audit = Arc::new(MemoryAudit::new());
        let config = SuiteConfig {
            enabled: false,
            ..SuiteConfig::default()
        };
        let mut orchestrator = orchestrator_with(config, Arc::new(AllowAll), audit.clone()).await;

        let result = orchestrator
            .run(
                &passing_component(),
                &snapshot("b-1", CaptureKind::Baseline),
                &snapshot("p-1", CaptureKind::PostFix),
                &clean_diff(),
            )
            .await;
        assert!(result.is_none());
        assert!(!audit.events()[0].success);
    }

    #[tokio::test]
    async fn test_accessible_image_fix_raises_score() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit).await;

        let before = ComponentDescriptor::new(
            "comp-1",
            "Hero",
            RenderedNode::new("section")
                .with_bounds(Bounds::new(0.0, 0.0, 800.0, 400.0))
                .with_child(
                    RenderedNode::new("img").with_bounds(Bounds::new(0.0, 0.0, 400.0, 300.0)),
                ),
        );
        let after = ComponentDescriptor::new(
            "comp-1",
            "Hero",
            RenderedNode::new("section")
                .with_bounds(Bounds::new(0.0, 0.0, 800.0, 400.0))
                .with_child(
                    RenderedNode::new("img")
                        .with_attribute("alt", "hero banner")
                        .with_bounds(Bounds::new(0.0, 0.0, 400.0, 300.0)),
                ),
        );

        let baseline_results = orchestrator.run_accessibility(&before).await.unwrap();
        let post_fix_results = orchestrator.run_accessibility(&after).await.unwrap();

        let baseline_score = baseline_results[0].actual_value.as_ref().unwrap().as_f64().unwrap();
        let post_fix_score = post_fix_results[0].actual_value.as_ref().unwrap().as_f64().unwrap();
        assert!((post_fix_score - baseline_score - 0.1).abs() < 1e-9);
        assert!(post_fix_results[0].passed);
    }

    #[tokio::test]
    async fn test_accessibility_contrast_error_is_nonfatal() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit).await;

        let results = orchestrator
            .run_accessibility(&passing_component())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        // No color styles on the component root.
        assert!(results[1].error.is_some());
        assert!(!results[1].passed);
        // The score check still produced a value.
        assert!(results[0].actual_value.is_some());
    }

    #[tokio::test]
    async fn test_responsive_run_covers_breakpoints() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit).await;

        // 800px wide: wide enough up through 1440 but not for 1920.
        let component = ComponentDescriptor::new(
            "comp-2",
            "Sidebar",
            RenderedNode::new("aside").with_bounds(Bounds::new(0.0, 0.0, 800.0, 600.0)),
        );
        let results = orchestrator.run_responsive(&component).await.unwrap();

        assert_eq!(results.len(), 5);
        let by_env: HashMap<&str, bool> = results
            .iter()
            .map(|r| (r.environment.as_str(), r.passed))
            .collect();
        assert!(by_env["375px"]); // 800 >= 337.5
        assert!(by_env["768px"]); // 800 >= 537.6
        assert!(by_env["1440px"]); // 800 >= 720
        assert!(!by_env["1920px"]); // 800 < 960
    }

    #[tokio::test]
    async fn test_repeat_runs_accumulate() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit).await;

        let component = passing_component();
        let baseline = snapshot("b-1", CaptureKind::Baseline);
        let post_fix = snapshot("p-1", CaptureKind::PostFix);
        let diff = clean_diff();

        orchestrator.run(&component, &baseline, &post_fix, &diff).await.unwrap();
        let second = orchestrator.run(&component, &baseline, &post_fix, &diff).await.unwrap();

        assert_eq!(second.metadata.total_runs, 2);
        assert_eq!(second.summary.total_tests, 24);
        // Both runs reuse the one suite per component.
        assert_eq!(orchestrator.statistics().total_suites, 1);
    }

    #[tokio::test]
    async fn test_statistics_and_export() {
        let audit = Arc::new(MemoryAudit::new());
        let mut orchestrator =
            orchestrator_with(SuiteConfig::default(), Arc::new(AllowAll), audit).await;

        let component = passing_component();
        orchestrator
            .run(
                &component,
                &snapshot("b-1", CaptureKind::Baseline),
                &snapshot("p-1", CaptureKind::PostFix),
                &clean_diff(),
            )
            .await
            .unwrap();

        let stats = orchestrator.statistics();
        assert_eq!(stats.total_suites, 1);
        assert_eq!(stats.total_tests, 12);
        assert_eq!(stats.overall_success_rate, 100.0);
        assert_eq!(stats.environment_stats["Desktop"].total, 4);
        assert_eq!(stats.environment_stats["Desktop"].failed, 0);

        let exported = orchestrator.export().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&exported).unwrap();
        assert_eq!(parsed["total_suites"], 1);
        assert_eq!(parsed["statistics"]["total_tests"], 12);
    }

    #[tokio::test]
    async fn test_persistence_roundtrip() {
        let backing = Arc::new(MemoryStore::new());
        let audit = Arc::new(MemoryAudit::new());
        {
            let mut orchestrator = TestOrchestrator::open(
                SuiteConfig::default(),
                "vrt-agent",
                Arc::new(AllowAll),
                audit.clone(),
                backing.clone(),
            )
            .await;
            orchestrator
                .run(
                    &passing_component(),
                    &snapshot("b-1", CaptureKind::Baseline),
                    &snapshot("p-1", CaptureKind::PostFix),
                    &clean_diff(),
                )
                .await
                .unwrap();
        }

        let reopened = TestOrchestrator::open(
            SuiteConfig::default(),
            "vrt-agent",
            Arc::new(AllowAll),
            audit,
            backing,
        )
        .await;
        let suite = reopened.suite_for("comp-1").unwrap();
        assert_eq!(suite.summary.total_tests, 12);
        assert_eq!(suite.metadata.total_runs, 1);
    }
}
