//! Authorization and audit collaborator seams
//!
//! Every capture, diff, and suite operation asks the [`AccessPolicy`] first
//! and records exactly one [`AuditEvent`] per attempt regardless of outcome.
//! Both collaborators live outside this core; the impls here are the
//! fixtures the pipeline tests with.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};

/// Outcome of an authorization check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Kinds of auditable VRT operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    SnapshotCapture,
    DiffAnalysis,
    ConfidenceAdjust,
    SuiteRun,
    Cleanup,
    Export,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SnapshotCapture => write!(f, "snapshot_capture"),
            Self::DiffAnalysis => write!(f, "diff_analysis"),
            Self::ConfidenceAdjust => write!(f, "confidence_adjust"),
            Self::SuiteRun => write!(f, "suite_run"),
            Self::Cleanup => write!(f, "cleanup"),
            Self::Export => write!(f, "export"),
        }
    }
}

/// One audit record for one operation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Who attempted the operation (agent string)
    pub actor: String,
    pub action: AuditAction,
    /// Operation-specific detail map
    pub details: serde_json::Value,
    pub component_id: Option<String>,
    pub component_name: Option<String>,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn success(
        actor: impl Into<String>,
        action: AuditAction,
        details: serde_json::Value,
    ) -> Self {
        Self {
            actor: actor.into(),
            action,
            details,
            component_id: None,
            component_name: None,
            success: true,
            failure_reason: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(
        actor: impl Into<String>,
        action: AuditAction,
        details: serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action,
            details,
            component_id: None,
            component_name: None,
            success: false,
            failure_reason: Some(reason.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn for_component(
        mut self,
        component_id: impl Into<String>,
        component_name: impl Into<String>,
    ) -> Self {
        self.component_id = Some(component_id.into());
        self.component_name = Some(component_name.into());
        self
    }
}

/// Authorizes VRT operations for an actor
pub trait AccessPolicy: Send + Sync {
    fn authorize(&self, actor: &str) -> AccessDecision;
}

/// Receives one audit event per operation attempt
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// Policy that allows every actor
#[derive(Debug, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn authorize(&self, _actor: &str) -> AccessDecision {
        AccessDecision::allow()
    }
}

/// Policy that denies every actor with a fixed reason
#[derive(Debug)]
pub struct DenyAll {
    pub reason: String,
}

impl DenyAll {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl AccessPolicy for DenyAll {
    fn authorize(&self, _actor: &str) -> AccessDecision {
        AccessDecision::deny(self.reason.clone())
    }
}

/// In-memory audit sink, inspectable from tests
#[derive(Debug, Default)]
pub struct MemoryAudit {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("audit lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAudit {
    async fn record(&self, event: AuditEvent) {
        self.events.lock().expect("audit lock poisoned").push(event);
    }
}

/// Audit sink that only emits tracing events
#[derive(Debug, Default)]
pub struct LogAudit;

#[async_trait]
impl AuditSink for LogAudit {
    async fn record(&self, event: AuditEvent) {
        if event.success {
            info!(
                actor = %event.actor,
                action = %event.action,
                component = event.component_id.as_deref().unwrap_or("-"),
                "audit"
            );
        } else {
            warn!(
                actor = %event.actor,
                action = %event.action,
                component = event.component_id.as_deref().unwrap_or("-"),
                reason = event.failure_reason.as_deref().unwrap_or("unknown"),
                "audit failure"
            );
        }
    }
}
