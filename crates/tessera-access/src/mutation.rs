//! Create, update and revoke commands on explicit grants.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashSet;
use tessera_audit::{AuditAction, AuditEvent, AuditLog, AuditResult};
use tessera_events::{EventBus, GrantChangeEvent};
use tessera_storage::{CreateProjectGrantParams, ProjectId, ProjectRole, Store, StoreError, UserId};
use tracing::{info, warn};

use crate::error::AccessError;

/// Applies grant mutations and reports the outcome.
///
/// Failures leave the stored grant untouched and are never retried here.
#[cfg_attr(any(test, feature = "test-support"), mockall::automock)]
#[async_trait]
pub trait AccessMutationService: Send + Sync {
    /// Fails with `MutationRejected` when the user already holds a grant.
    async fn create_grant(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProjectRole,
    ) -> Result<(), AccessError>;

    async fn update_grant(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProjectRole,
    ) -> Result<(), AccessError>;

    async fn revoke_grant(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<(), AccessError>;
}

/// Mutation service backed by a [`Store`].
///
/// After a successful write it publishes a [`GrantChangeEvent`] so that views
/// re-read the grant snapshot, and every attempt is written to the audit log.
/// Event and audit failures are logged and do not fail the mutation.
pub struct StoreMutationService {
    store: Arc<dyn Store>,
    events: Arc<dyn EventBus>,
    audit: Arc<dyn AuditLog>,
}

impl StoreMutationService {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventBus>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            store,
            events,
            audit,
        }
    }

    async fn publish(&self, project_id: &ProjectId, event: GrantChangeEvent) {
        if let Err(e) = self.events.publish(project_id, event).await {
            warn!(%project_id, error = %e, "failed to publish grant change event");
        }
    }

    async fn record(&self, event: AuditEvent) {
        if let Err(e) = self.audit.record(event).await {
            warn!(error = %e, "failed to record audit event");
        }
    }

    fn audit_result(err: &StoreError) -> AuditResult {
        match err {
            StoreError::NotFound => AuditResult::NotFound,
            _ => AuditResult::Error,
        }
    }
}

#[async_trait]
impl AccessMutationService for StoreMutationService {
    async fn create_grant(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProjectRole,
    ) -> Result<(), AccessError> {
        let audit = AuditEvent::builder(AuditAction::ProjectGrantCreate, project_id, user_id)
            .actor(Some(actor))
            .details(serde_json::json!({ "role": role.as_str() }));
        let params = CreateProjectGrantParams {
            project_id: project_id.clone(),
            user_id: user_id.clone(),
            role,
        };

        match self.store.create_project_grant(&params).await {
            Ok(()) => {
                info!(%project_id, %user_id, role = role.as_str(), "project grant created");
                let event = GrantChangeEvent::created(user_id, role, Utc::now().timestamp());
                self.publish(project_id, event).await;
                self.record(audit.build()).await;
                Ok(())
            }
            Err(e) => {
                self.record(
                    audit
                        .result(Self::audit_result(&e))
                        .reason(e.to_string())
                        .build(),
                )
                .await;
                // a missing row here is the user or project, not a grant
                Err(match e {
                    StoreError::NotFound => AccessError::MutationRejected {
                        reason: "user or project not found".to_string(),
                    },
                    other => AccessError::rejected(&other),
                })
            }
        }
    }

    async fn update_grant(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
        role: ProjectRole,
    ) -> Result<(), AccessError> {
        let audit = AuditEvent::builder(AuditAction::ProjectGrantUpdate, project_id, user_id)
            .actor(Some(actor))
            .details(serde_json::json!({ "role": role.as_str() }));

        match self.store.update_project_grant(project_id, user_id, role).await {
            Ok(()) => {
                info!(%project_id, %user_id, role = role.as_str(), "project grant updated");
                let event = GrantChangeEvent::updated(user_id, role, Utc::now().timestamp());
                self.publish(project_id, event).await;
                self.record(audit.build()).await;
                Ok(())
            }
            Err(e) => {
                self.record(
                    audit
                        .result(Self::audit_result(&e))
                        .reason(e.to_string())
                        .build(),
                )
                .await;
                Err(AccessError::rejected(&e))
            }
        }
    }

    async fn revoke_grant(
        &self,
        actor: &UserId,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<(), AccessError> {
        let audit = AuditEvent::builder(AuditAction::ProjectGrantRevoke, project_id, user_id)
            .actor(Some(actor));

        match self.store.remove_project_grant(project_id, user_id).await {
            Ok(()) => {
                info!(%project_id, %user_id, "project grant revoked");
                let event = GrantChangeEvent::revoked(user_id, Utc::now().timestamp());
                self.publish(project_id, event).await;
                self.record(audit.build()).await;
                Ok(())
            }
            Err(e) => {
                self.record(
                    audit
                        .result(Self::audit_result(&e))
                        .reason(e.to_string())
                        .build(),
                )
                .await;
                Err(AccessError::rejected(&e))
            }
        }
    }
}

/// In-flight mutations keyed by (project, user).
///
/// Cloning shares the same set.
#[derive(Clone, Debug, Default)]
pub struct PendingMutations {
    inflight: Arc<DashSet<(ProjectId, UserId)>>,
}

impl PendingMutations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the (project, user) slot, or fail if a mutation already holds it.
    /// The slot is released when the returned guard drops.
    pub fn try_begin(
        &self,
        project_id: &ProjectId,
        user_id: &UserId,
    ) -> Result<PendingGuard, AccessError> {
        let key = (project_id.clone(), user_id.clone());
        if !self.inflight.insert(key.clone()) {
            return Err(AccessError::MutationPending {
                project_id: project_id.clone(),
                user_id: user_id.clone(),
            });
        }
        Ok(PendingGuard {
            inflight: Arc::clone(&self.inflight),
            key,
        })
    }

    pub fn is_pending(&self, project_id: &ProjectId, user_id: &UserId) -> bool {
        self.inflight
            .contains(&(project_id.clone(), user_id.clone()))
    }
}

/// Releases its (project, user) slot on drop.
#[derive(Debug)]
pub struct PendingGuard {
    inflight: Arc<DashSet<(ProjectId, UserId)>>,
    key: (ProjectId, UserId),
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.inflight.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use mockall::predicate::*;
    use std::time::Duration;
    use tessera_audit::{AuditLogError, AuditLogFilter, AuditLogId};
    use tessera_events::GrantChangeKind;
    use tessera_events_memory::MemoryEventBus;
    use tessera_storage::MockStore;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingAudit {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditLog for RecordingAudit {
        async fn record(&self, event: AuditEvent) -> Result<(), AuditLogError> {
            self.events.lock().await.push(event);
            Ok(())
        }

        async fn query(&self, _filter: AuditLogFilter) -> Result<Vec<AuditEvent>, AuditLogError> {
            Ok(self.events.lock().await.clone())
        }

        async fn get(&self, id: AuditLogId) -> Result<AuditEvent, AuditLogError> {
            self.events
                .lock()
                .await
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .ok_or(AuditLogError::NotFound(id))
        }
    }

    struct FailingAudit;

    #[async_trait]
    impl AuditLog for FailingAudit {
        async fn record(&self, _event: AuditEvent) -> Result<(), AuditLogError> {
            Err(AuditLogError::Database("read-only".to_string()))
        }

        async fn query(&self, _filter: AuditLogFilter) -> Result<Vec<AuditEvent>, AuditLogError> {
            Ok(vec![])
        }

        async fn get(&self, id: AuditLogId) -> Result<AuditEvent, AuditLogError> {
            Err(AuditLogError::NotFound(id))
        }
    }

    fn ids() -> (UserId, ProjectId, UserId) {
        (
            UserId(Uuid::new_v4()),
            ProjectId(Uuid::new_v4()),
            UserId(Uuid::new_v4()),
        )
    }

    #[tokio::test]
    async fn update_success_publishes_and_audits() {
        let (actor, project_id, user_id) = ids();
        let mut store = MockStore::new();
        store
            .expect_update_project_grant()
            .with(eq(project_id.clone()), eq(user_id.clone()), eq(ProjectRole::Editor))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let bus = Arc::new(MemoryEventBus::new());
        let audit = Arc::new(RecordingAudit::default());
        let mut stream = bus.subscribe(&project_id).await.unwrap();

        let service = StoreMutationService::new(Arc::new(store), bus.clone(), audit.clone());
        service
            .update_grant(&actor, &project_id, &user_id, ProjectRole::Editor)
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(event.kind, GrantChangeKind::Updated);
        assert_eq!(event.role, Some(ProjectRole::Editor));

        let recorded = audit.events.lock().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].action, AuditAction::ProjectGrantUpdate);
        assert_eq!(recorded[0].result, AuditResult::Success);
        assert_eq!(recorded[0].actor_user_id, Some(actor));
    }

    #[tokio::test]
    async fn create_success_publishes_created_event() {
        let (actor, project_id, user_id) = ids();
        let mut store = MockStore::new();
        let expected = (project_id.clone(), user_id.clone());
        store
            .expect_create_project_grant()
            .withf(move |p| {
                (&p.project_id, &p.user_id) == (&expected.0, &expected.1)
                    && p.role == ProjectRole::Viewer
            })
            .times(1)
            .returning(|_| Ok(()));

        let bus = Arc::new(MemoryEventBus::new());
        let audit = Arc::new(RecordingAudit::default());
        let mut stream = bus.subscribe(&project_id).await.unwrap();

        let service = StoreMutationService::new(Arc::new(store), bus.clone(), audit.clone());
        service
            .create_grant(&actor, &project_id, &user_id, ProjectRole::Viewer)
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(event.kind, GrantChangeKind::Created);
        assert_eq!(event.role, Some(ProjectRole::Viewer));

        let recorded = audit.events.lock().await;
        assert_eq!(recorded[0].action, AuditAction::ProjectGrantCreate);
        assert_eq!(recorded[0].details.as_ref().unwrap()["role"], "viewer");
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let (actor, project_id, user_id) = ids();
        let mut store = MockStore::new();
        store
            .expect_create_project_grant()
            .returning(|_| Err(StoreError::AlreadyExists));

        let audit = Arc::new(RecordingAudit::default());
        let service = StoreMutationService::new(
            Arc::new(store),
            Arc::new(MemoryEventBus::new()),
            audit.clone(),
        );
        let err = service
            .create_grant(&actor, &project_id, &user_id, ProjectRole::Admin)
            .await
            .unwrap_err();

        assert!(matches!(err, AccessError::MutationRejected { ref reason } if reason == "grant already exists"));
        assert_eq!(audit.events.lock().await[0].result, AuditResult::Error);
    }

    #[tokio::test]
    async fn update_missing_grant_is_rejected() {
        let (actor, project_id, user_id) = ids();
        let mut store = MockStore::new();
        store
            .expect_update_project_grant()
            .returning(|_, _, _| Err(StoreError::NotFound));

        let bus = Arc::new(MemoryEventBus::new());
        let audit = Arc::new(RecordingAudit::default());
        let mut stream = bus.subscribe(&project_id).await.unwrap();

        let service = StoreMutationService::new(Arc::new(store), bus.clone(), audit.clone());
        let err = service
            .update_grant(&actor, &project_id, &user_id, ProjectRole::Admin)
            .await
            .unwrap_err();

        assert!(matches!(err, AccessError::MutationRejected { ref reason } if reason == "grant not found"));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), stream.next())
                .await
                .is_err(),
            "no refresh event on failure"
        );
        let recorded = audit.events.lock().await;
        assert_eq!(recorded[0].result, AuditResult::NotFound);
    }

    #[tokio::test]
    async fn revoke_success_publishes_revoked_event() {
        let (actor, project_id, user_id) = ids();
        let mut store = MockStore::new();
        store
            .expect_remove_project_grant()
            .with(eq(project_id.clone()), eq(user_id.clone()))
            .times(1)
            .returning(|_, _| Ok(()));

        let bus = Arc::new(MemoryEventBus::new());
        let audit = Arc::new(RecordingAudit::default());
        let mut stream = bus.subscribe(&project_id).await.unwrap();

        let service = StoreMutationService::new(Arc::new(store), bus.clone(), audit.clone());
        service
            .revoke_grant(&actor, &project_id, &user_id)
            .await
            .unwrap();

        let event = stream.next().await.unwrap();
        assert_eq!(event.kind, GrantChangeKind::Revoked);
        assert_eq!(event.user_id, user_id);
        assert_eq!(event.role, None);
    }

    #[tokio::test]
    async fn backend_failure_maps_to_rejection() {
        let (actor, project_id, user_id) = ids();
        let mut store = MockStore::new();
        store
            .expect_remove_project_grant()
            .returning(|_, _| Err(StoreError::Backend("database is locked".to_string())));

        let audit = Arc::new(RecordingAudit::default());
        let service = StoreMutationService::new(
            Arc::new(store),
            Arc::new(MemoryEventBus::new()),
            audit.clone(),
        );
        let err = service
            .revoke_grant(&actor, &project_id, &user_id)
            .await
            .unwrap_err();

        assert!(err.is_recoverable());
        assert!(err.to_string().contains("database is locked"));
        assert_eq!(audit.events.lock().await[0].result, AuditResult::Error);
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_mutation() {
        let (actor, project_id, user_id) = ids();
        let mut store = MockStore::new();
        store
            .expect_update_project_grant()
            .returning(|_, _, _| Ok(()));

        let service = StoreMutationService::new(
            Arc::new(store),
            Arc::new(MemoryEventBus::new()),
            Arc::new(FailingAudit),
        );
        assert!(service
            .update_grant(&actor, &project_id, &user_id, ProjectRole::Viewer)
            .await
            .is_ok());
    }

    #[test]
    fn pending_slot_is_exclusive_per_pair() {
        let (_, project_id, user_id) = ids();
        let pending = PendingMutations::new();

        let guard = pending.try_begin(&project_id, &user_id).unwrap();
        assert!(pending.is_pending(&project_id, &user_id));
        assert!(matches!(
            pending.try_begin(&project_id, &user_id),
            Err(AccessError::MutationPending { .. })
        ));

        // A different user on the same project is independent.
        let other = UserId(Uuid::new_v4());
        assert!(pending.try_begin(&project_id, &other).is_ok());

        drop(guard);
        assert!(!pending.is_pending(&project_id, &user_id));
        assert!(pending.try_begin(&project_id, &user_id).is_ok());
    }

    #[test]
    fn pending_set_is_shared_between_clones() {
        let (_, project_id, user_id) = ids();
        let pending = PendingMutations::new();
        let cloned = pending.clone();

        let _guard = pending.try_begin(&project_id, &user_id).unwrap();
        assert!(cloned.is_pending(&project_id, &user_id));
    }
}
