//! Project types.

use chrono::{DateTime, Utc};

use super::{OrganizationId, ProjectId};

#[derive(Clone, Debug)]
pub struct Project {
    pub id: ProjectId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input to `Store::create_project`.
#[derive(Clone, Debug)]
pub struct CreateProjectParams {
    pub organization_id: OrganizationId,
    pub name: String,
}
