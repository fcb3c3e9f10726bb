//! Render-ready view of a project's access list.

use tessera_storage::{Project, ProjectId, ProjectRole, UserId};

use crate::error::AccessError;
use crate::reconcile::{ExplicitAccess, InheritedAccess, ReconciledAccess};
use crate::service::ProjectAccessService;

/// Mutation handle bound to one explicit grant.
///
/// Only built when the capability gate passed at load time. Each dispatch goes
/// through [`ProjectAccessService`], which checks the gate again, so controls
/// kept past a demotion fail with `UnauthorizedMutationAttempt`.
#[derive(Clone)]
pub struct GrantControls {
    actor: UserId,
    project_id: ProjectId,
    user_id: UserId,
    service: ProjectAccessService,
}

impl std::fmt::Debug for GrantControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrantControls")
            .field("actor", &self.actor)
            .field("project_id", &self.project_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl GrantControls {
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn is_pending(&self) -> bool {
        self.service
            .pending()
            .is_pending(&self.project_id, &self.user_id)
    }

    pub async fn update(&self, role: ProjectRole) -> Result<(), AccessError> {
        self.service
            .update_grant(&self.actor, &self.project_id, &self.user_id, role)
            .await
    }

    pub async fn revoke(&self) -> Result<(), AccessError> {
        self.service
            .revoke_grant(&self.actor, &self.project_id, &self.user_id)
            .await
    }
}

#[derive(Clone, Debug)]
pub struct ExplicitRow {
    pub access: ExplicitAccess,
    pub controls: Option<GrantControls>,
}

impl ExplicitRow {
    /// Informational note when the organization role already covers the grant.
    pub fn overlap_note(&self) -> Option<String> {
        self.access.overlapping_org_role.map(|role| {
            format!(
                "This user already has {} access through the organization role: {}",
                self.access.role, role
            )
        })
    }
}

#[derive(Clone, Debug)]
pub struct InheritedRow {
    pub access: InheritedAccess,
}

impl InheritedRow {
    pub fn role_note(&self) -> String {
        format!(
            "This user inherits the organization role: {}",
            self.access.inherited_via
        )
    }
}

/// Reconciled access for one project, as seen by one actor.
#[derive(Clone, Debug)]
pub struct ProjectAccessView {
    pub project: Project,
    pub explicit: Vec<ExplicitRow>,
    pub inherited: Vec<InheritedRow>,
    pub excluded: Vec<UserId>,
    can_manage: bool,
}

impl ProjectAccessView {
    /// Attach controls to every explicit row when `can_manage` is true, and to
    /// none otherwise. Inherited rows never carry controls.
    pub fn build(
        project: Project,
        reconciled: ReconciledAccess,
        actor: &UserId,
        can_manage: bool,
        service: &ProjectAccessService,
    ) -> Self {
        let explicit = reconciled
            .explicit
            .into_iter()
            .map(|access| {
                let controls = can_manage.then(|| GrantControls {
                    actor: actor.clone(),
                    project_id: project.id.clone(),
                    user_id: access.user_id.clone(),
                    service: service.clone(),
                });
                ExplicitRow { access, controls }
            })
            .collect();

        let inherited = reconciled
            .inherited
            .into_iter()
            .map(|access| InheritedRow { access })
            .collect();

        Self {
            project,
            explicit,
            inherited,
            excluded: reconciled.excluded,
            can_manage,
        }
    }

    pub fn can_manage(&self) -> bool {
        self.can_manage
    }

    pub fn explicit_row(&self, user_id: &UserId) -> Option<&ExplicitRow> {
        self.explicit.iter().find(|row| &row.access.user_id == user_id)
    }

    pub fn explicit_row_by_email(&self, email: &str) -> Option<&ExplicitRow> {
        self.explicit.iter().find(|row| row.access.email == email)
    }

    pub fn controls_for(&self, user_id: &UserId) -> Option<&GrantControls> {
        self.explicit_row(user_id)
            .and_then(|row| row.controls.as_ref())
    }
}
