use tessera_events::EventBusError;
use tessera_storage::{ProjectId, StoreError, UserId};
use thiserror::Error;

/// Errors surfaced by the access layer.
///
/// Orphan grants are not errors; they travel as an
/// [`AccessWarning`](crate::AccessWarning) on the affected entry.
#[derive(Debug, Error)]
pub enum AccessError {
    /// A snapshot the view depends on is still loading or failed to load.
    #[error("access snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    /// The grant store refused the mutation. Prior state is unchanged.
    #[error("mutation rejected: {reason}")]
    MutationRejected { reason: String },

    /// Another mutation for the same (project, user) pair has not finished yet.
    #[error("a mutation for user {user_id} on project {project_id} is already pending")]
    MutationPending {
        project_id: ProjectId,
        user_id: UserId,
    },

    /// A mutation was dispatched although the capability gate denies it, either
    /// outside the view's controls or through controls from a stale view.
    #[error("user {actor} may not manage access to project {project_id}")]
    UnauthorizedMutationAttempt { actor: UserId, project_id: ProjectId },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("event bus error: {0}")]
    Events(#[from] EventBusError),
}

impl AccessError {
    pub(crate) fn rejected(err: &StoreError) -> Self {
        let reason = match err {
            StoreError::NotFound => "grant not found".to_string(),
            StoreError::AlreadyExists => "grant already exists".to_string(),
            other => other.to_string(),
        };
        AccessError::MutationRejected { reason }
    }

    /// True when the caller may show the failure and let the user try again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AccessError::SnapshotUnavailable(_)
                | AccessError::MutationRejected { .. }
                | AccessError::MutationPending { .. }
        )
    }
}
