//! Audit trail for changes to project grants.
//!
//! Every create, update or revoke attempt produces one [`AuditEvent`],
//! successful or not. Backends persist events through [`AuditLog`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_storage::{ProjectId, UserId};
use thiserror::Error;
use uuid::Uuid;

/// Time-ordered (v7) identifier of an audit entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditLogId(pub Uuid);

impl AuditLogId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AuditLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditLogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for AuditLogId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Raised when a stored action or result string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown audit {kind}: {value}")]
pub struct ParseAuditError {
    kind: &'static str,
    value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ProjectGrantCreate,
    ProjectGrantUpdate,
    ProjectGrantRevoke,
}

impl AuditAction {
    pub const ALL: [AuditAction; 3] = [
        AuditAction::ProjectGrantCreate,
        AuditAction::ProjectGrantUpdate,
        AuditAction::ProjectGrantRevoke,
    ];

    /// Dotted form used in storage and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ProjectGrantCreate => "project_grant.create",
            AuditAction::ProjectGrantUpdate => "project_grant.update",
            AuditAction::ProjectGrantRevoke => "project_grant.revoke",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = ParseAuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ParseAuditError {
                kind: "action",
                value: s.to_string(),
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    /// The actor failed the capability check.
    PermissionDenied,
    /// The grant to change did not exist.
    NotFound,
    Error,
}

impl AuditResult {
    pub const ALL: [AuditResult; 4] = [
        AuditResult::Success,
        AuditResult::PermissionDenied,
        AuditResult::NotFound,
        AuditResult::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Success => "success",
            AuditResult::PermissionDenied => "permission_denied",
            AuditResult::NotFound => "not_found",
            AuditResult::Error => "error",
        }
    }
}

impl std::fmt::Display for AuditResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditResult {
    type Err = ParseAuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|result| result.as_str() == s)
            .ok_or_else(|| ParseAuditError {
                kind: "result",
                value: s.to_string(),
            })
    }
}

/// One grant mutation attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: AuditLogId,
    pub timestamp: DateTime<Utc>,
    /// `None` for changes made outside a user session.
    pub actor_user_id: Option<UserId>,
    pub action: AuditAction,
    pub project_id: ProjectId,
    /// Holder of the affected grant.
    pub target_user_id: UserId,
    pub result: AuditResult,
    pub reason: Option<String>,
    /// Free-form context such as the requested role.
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn builder(
        action: AuditAction,
        project_id: &ProjectId,
        target_user_id: &UserId,
    ) -> AuditEventBuilder {
        AuditEventBuilder {
            action,
            project_id: project_id.clone(),
            target_user_id: target_user_id.clone(),
            actor_user_id: None,
            result: AuditResult::Success,
            reason: None,
            details: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result == AuditResult::Success
    }
}

/// Accumulates optional fields; `build` stamps the id and time.
#[derive(Clone, Debug)]
pub struct AuditEventBuilder {
    action: AuditAction,
    project_id: ProjectId,
    target_user_id: UserId,
    actor_user_id: Option<UserId>,
    result: AuditResult,
    reason: Option<String>,
    details: Option<serde_json::Value>,
}

impl AuditEventBuilder {
    pub fn actor(mut self, actor: Option<&UserId>) -> Self {
        self.actor_user_id = actor.cloned();
        self
    }

    pub fn result(mut self, result: AuditResult) -> Self {
        self.result = result;
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn build(self) -> AuditEvent {
        AuditEvent {
            id: AuditLogId::new(),
            timestamp: Utc::now(),
            actor_user_id: self.actor_user_id,
            action: self.action,
            project_id: self.project_id,
            target_user_id: self.target_user_id,
            result: self.result,
            reason: self.reason,
            details: self.details,
        }
    }
}

/// Criteria for [`AuditLog::query`]. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct AuditLogFilter {
    pub project_id: Option<ProjectId>,
    pub target_user_id: Option<UserId>,
    pub action: Option<AuditAction>,
    pub result: Option<AuditResult>,
    pub limit: Option<u32>,
}

impl AuditLogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_id(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn target_user_id(mut self, user_id: UserId) -> Self {
        self.target_user_id = Some(user_id);
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn result(mut self, result: AuditResult) -> Self {
        self.result = Some(result);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("audit storage error: {0}")]
    Database(String),
    #[error("no audit entry with id {0}")]
    NotFound(AuditLogId),
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Persist one event. Callers log a failure here and carry on.
    async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError>;

    /// Matching events, newest first.
    async fn query(&self, filter: AuditLogFilter) -> Result<Vec<AuditEvent>, AuditLogError>;

    async fn get(&self, id: AuditLogId) -> Result<AuditEvent, AuditLogError>;
}
