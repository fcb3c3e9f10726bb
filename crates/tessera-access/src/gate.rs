//! Capability check for managing a project's access list.

use tessera_storage::{OrganizationId, OrganizationRole, Project, ProjectRole, UserId};

/// Everything a gate may know about the acting user, resolved fresh for each
/// check and never carried across actors or projects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActorContext {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub organization_role: OrganizationRole,
    /// The actor's own explicit grant on the project being checked.
    pub project_role: Option<ProjectRole>,
}

/// May this actor update or revoke explicit grants on this project?
///
/// Implementations are pure predicates with no side effects.
#[cfg_attr(any(test, feature = "test-support"), mockall::automock)]
pub trait CapabilityGate: Send + Sync {
    fn can_manage(&self, actor: &ActorContext, project: &Project) -> bool;
}

/// Default policy: organization admins and project admins of the same
/// organization manage project access.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProjectAdminGate;

impl CapabilityGate for ProjectAdminGate {
    fn can_manage(&self, actor: &ActorContext, project: &Project) -> bool {
        if actor.organization_id != project.organization_id {
            return false;
        }
        actor.organization_role == OrganizationRole::Admin
            || actor.project_role == Some(ProjectRole::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tessera_storage::ProjectId;
    use uuid::Uuid;

    fn project(org: &OrganizationId) -> Project {
        Project {
            id: ProjectId(Uuid::new_v4()),
            organization_id: org.clone(),
            name: "analytics".to_string(),
            created_at: Utc::now(),
        }
    }

    fn actor(
        org: &OrganizationId,
        organization_role: OrganizationRole,
        project_role: Option<ProjectRole>,
    ) -> ActorContext {
        ActorContext {
            user_id: UserId(Uuid::new_v4()),
            organization_id: org.clone(),
            organization_role,
            project_role,
        }
    }

    #[test]
    fn org_admin_can_manage() {
        let org = OrganizationId(Uuid::new_v4());
        let gate = ProjectAdminGate;
        assert!(gate.can_manage(&actor(&org, OrganizationRole::Admin, None), &project(&org)));
    }

    #[test]
    fn project_admin_can_manage() {
        let org = OrganizationId(Uuid::new_v4());
        let gate = ProjectAdminGate;
        let a = actor(&org, OrganizationRole::Member, Some(ProjectRole::Admin));
        assert!(gate.can_manage(&a, &project(&org)));
    }

    #[test]
    fn lesser_roles_cannot_manage() {
        let org = OrganizationId(Uuid::new_v4());
        let gate = ProjectAdminGate;
        let p = project(&org);
        for role in [
            OrganizationRole::Member,
            OrganizationRole::Viewer,
            OrganizationRole::Editor,
            OrganizationRole::Developer,
        ] {
            assert!(!gate.can_manage(&actor(&org, role, Some(ProjectRole::Developer)), &p));
        }
    }

    #[test]
    fn admin_of_another_organization_cannot_manage() {
        let org = OrganizationId(Uuid::new_v4());
        let other = OrganizationId(Uuid::new_v4());
        let gate = ProjectAdminGate;
        let a = actor(&other, OrganizationRole::Admin, Some(ProjectRole::Admin));
        assert!(!gate.can_manage(&a, &project(&org)));
    }
}
