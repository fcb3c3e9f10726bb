//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait the access core depends on.
///
/// Reads return whole snapshots; the core never caches them across calls.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Users ──────────────────────────────────────────

    /// Create a new user (returns generated ID).
    async fn create_user(&self, email: &str) -> Result<UserId, StoreError>;

    /// Get user by email.
    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    // ───────────────────────────────────── Organizations ──────────────────────────────────

    /// Create a new organization (returns generated ID).
    async fn create_organization(&self, name: &str) -> Result<OrganizationId, StoreError>;

    /// Get organization by ID.
    async fn get_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Organization, StoreError>;

    /// Add a user to an organization with the given role.
    async fn add_organization_member(
        &self,
        params: &AddOrganizationMemberParams,
    ) -> Result<(), StoreError>;

    /// Get a single membership.
    async fn get_organization_member(
        &self,
        organization_id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<OrganizationMember, StoreError>;

    /// List all members of an organization, in join order.
    async fn list_organization_members(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<OrganizationMember>, StoreError>;

    // ───────────────────────────────────── Projects ───────────────────────────────────────

    /// Create a project within an organization (returns generated ID).
    async fn create_project(&self, params: &CreateProjectParams) -> Result<ProjectId, StoreError>;

    /// Get a project by ID.
    async fn get_project(&self, project_id: &ProjectId) -> Result<Project, StoreError>;

    // ──────────────────────────────────── Project Grants ──────────────────────────────────

    /// Create an explicit grant. Fails with `AlreadyExists` if the user already has one.
    async fn create_project_grant(
        &self,
        params: &CreateProjectGrantParams,
    ) -> Result<(), StoreError>;

    /// Get the explicit grant for a user on a project.
    async fn get_project_grant(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<ProjectGrant, StoreError>;

    /// List all explicit grants on a project, in creation order.
    async fn list_project_grants(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<ProjectGrant>, StoreError>;

    /// Change the role of an existing grant. Fails with `NotFound` if there is none.
    async fn update_project_grant(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProjectRole,
    ) -> Result<(), StoreError>;

    /// Delete an existing grant. Fails with `NotFound` if there is none.
    async fn remove_project_grant(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<(), StoreError>;
}
