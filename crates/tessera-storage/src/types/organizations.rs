//! Organization types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrganizationId, OrganizationRole, UserId};

#[derive(Clone, Debug)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Organization member, joined with the member's email.
///
/// Email is unique within an organization and is the key used to match
/// members against project grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub email: String,
    pub role: OrganizationRole,
    pub joined_at: DateTime<Utc>,
}

/// Input to `Store::add_organization_member`.
#[derive(Clone, Debug)]
pub struct AddOrganizationMemberParams {
    pub organization_id: OrganizationId,
    pub user_id: UserId,
    pub role: OrganizationRole,
}
