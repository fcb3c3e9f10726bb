use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use tessera_audit::{AuditAction, AuditEvent, AuditLog, AuditResult};
use tessera_events::EventBus;
use tessera_storage::{Project, ProjectId, ProjectRole, Store, StoreError, UserId};
use tracing::{debug, error, warn};

use crate::error::AccessError;
use crate::gate::{ActorContext, CapabilityGate};
use crate::mutation::{AccessMutationService, PendingMutations};
use crate::reconcile::AccessReconciler;
use crate::snapshot::Snapshot;
use crate::view::ProjectAccessView;

/// Loads project access views and authorizes every grant mutation.
///
/// Cloning is cheap and clones share the pending-mutation set. The capability
/// gate is evaluated against fresh store state on each call, including calls
/// made through the controls of a previously loaded view.
#[derive(Clone)]
pub struct ProjectAccessService {
    store: Arc<dyn Store>,
    gate: Arc<dyn CapabilityGate>,
    mutations: Arc<dyn AccessMutationService>,
    events: Arc<dyn EventBus>,
    audit: Option<Arc<dyn AuditLog>>,
    reconciler: AccessReconciler,
    pending: PendingMutations,
}

impl ProjectAccessService {
    pub fn new(
        store: Arc<dyn Store>,
        gate: Arc<dyn CapabilityGate>,
        mutations: Arc<dyn AccessMutationService>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            store,
            gate,
            mutations,
            events,
            audit: None,
            reconciler: AccessReconciler::default(),
            pending: PendingMutations::new(),
        }
    }

    pub fn with_reconciler(mut self, reconciler: AccessReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Record refused mutation attempts as `permission_denied`.
    pub fn with_audit_log(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn pending(&self) -> &PendingMutations {
        &self.pending
    }

    /// Resolve the actor's standing in the project's organization.
    /// Returns `None` when the actor is not a member.
    pub async fn resolve_actor(
        &self,
        actor: &UserId,
        project: &Project,
    ) -> Result<Option<ActorContext>, StoreError> {
        let member = match self
            .store
            .get_organization_member(&project.organization_id, actor)
            .await
        {
            Ok(member) => member,
            Err(StoreError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let project_role = match self.store.get_project_grant(&project.id, actor).await {
            Ok(grant) => Some(grant.role),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e),
        };

        Ok(Some(ActorContext {
            user_id: actor.clone(),
            organization_id: project.organization_id.clone(),
            organization_role: member.role,
            project_role,
        }))
    }

    pub async fn can_manage(&self, actor: &UserId, project: &Project) -> Result<bool, StoreError> {
        Ok(self
            .resolve_actor(actor, project)
            .await?
            .is_some_and(|ctx| self.gate.can_manage(&ctx, project)))
    }

    /// Fetch members and grants concurrently and reconcile them for `actor`.
    ///
    /// The gate is evaluated on every load. A failed gate lookup yields a
    /// read-only view rather than a failed one.
    pub async fn load(&self, actor: &UserId, project_id: &ProjectId) -> Snapshot<ProjectAccessView> {
        let project = match self.store.get_project(project_id).await {
            Ok(project) => project,
            Err(e) => return Snapshot::Failed(e.to_string()),
        };

        let (members, grants, can_manage) = tokio::join!(
            self.store.list_organization_members(&project.organization_id),
            self.store.list_project_grants(project_id),
            self.can_manage(actor, &project),
        );

        let can_manage = can_manage.unwrap_or_else(|e| {
            warn!(%project_id, %actor, error = %e, "capability check failed, rendering read-only");
            false
        });

        let members = Snapshot::from_result(members);
        let grants = Snapshot::from_result(grants);
        self.reconciler
            .reconcile_snapshots(&members, &grants)
            .map(|reconciled| {
                ProjectAccessView::build(project, reconciled, actor, can_manage, self)
            })
    }

    /// The current view, then a freshly loaded one after every grant change on
    /// the project. Changes published before this call are not replayed.
    pub async fn watch(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
    ) -> Result<BoxStream<'static, Snapshot<ProjectAccessView>>, AccessError> {
        // subscribe first so a change racing the initial load still triggers a reload
        let changes = self.events.subscribe(project_id).await?;
        let initial = self.load(actor, project_id).await;

        let service = self.clone();
        let actor = actor.clone();
        let project_id = project_id.clone();
        let reloads = changes.then(move |change| {
            let service = service.clone();
            let actor = actor.clone();
            let project_id = project_id.clone();
            async move {
                debug!(
                    %project_id,
                    user_id = %change.user_id,
                    kind = ?change.kind,
                    "grant changed, reloading"
                );
                service.load(&actor, &project_id).await
            }
        });

        Ok(stream::once(future::ready(initial)).chain(reloads).boxed())
    }

    pub async fn create_grant(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProjectRole,
    ) -> Result<(), AccessError> {
        self.authorize(actor, project_id, user_id, AuditAction::ProjectGrantCreate)
            .await?;
        let _guard = self.pending.try_begin(project_id, user_id)?;
        self.mutations
            .create_grant(actor, project_id, user_id, role)
            .await
    }

    pub async fn update_grant(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProjectRole,
    ) -> Result<(), AccessError> {
        self.authorize(actor, project_id, user_id, AuditAction::ProjectGrantUpdate)
            .await?;
        let _guard = self.pending.try_begin(project_id, user_id)?;
        self.mutations
            .update_grant(actor, project_id, user_id, role)
            .await
    }

    pub async fn revoke_grant(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<(), AccessError> {
        self.authorize(actor, project_id, user_id, AuditAction::ProjectGrantRevoke)
            .await?;
        let _guard = self.pending.try_begin(project_id, user_id)?;
        self.mutations.revoke_grant(actor, project_id, user_id).await
    }

    async fn authorize(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
        action: AuditAction,
    ) -> Result<(), AccessError> {
        let project = self.store.get_project(project_id).await?;
        if self.can_manage(actor, &project).await? {
            return Ok(());
        }
        error!(%actor, %project_id, %action, "grant mutation attempted without management capability");

        if let Some(audit) = &self.audit {
            let event = AuditEvent::builder(action, project_id, user_id)
                .actor(Some(actor))
                .result(AuditResult::PermissionDenied)
                .reason("actor may not manage project access")
                .build();
            if let Err(e) = audit.record(event).await {
                warn!(error = %e, "failed to record audit event");
            }
        }

        Err(AccessError::UnauthorizedMutationAttempt {
            actor: actor.clone(),
            project_id: project_id.clone(),
        })
    }
}
