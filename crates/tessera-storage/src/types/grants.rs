//! Explicit per-project grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProjectId, ProjectRole, UserId};

/// Explicit project grant for a user, joined with the user's email.
///
/// A project holds at most one grant per user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGrant {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub email: String,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a project grant
#[derive(Clone, Debug)]
pub struct CreateProjectGrantParams {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub role: ProjectRole,
}
