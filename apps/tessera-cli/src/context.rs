use std::sync::Arc;

use tessera_access::{ProjectAccessService, ProjectAdminGate, StoreMutationService};
use tessera_events_memory::MemoryEventBus;
use tessera_storage::{OrganizationId, ProjectId, Store, StoreError, UserId};
use tessera_store_sqlite::SqliteStore;

pub async fn open_store(database_url: Option<&str>) -> Result<Arc<SqliteStore>, StoreError> {
    let store = match database_url {
        Some(url) => SqliteStore::open(url).await?,
        None => SqliteStore::open_default().await?,
    };
    Ok(Arc::new(store))
}

/// Access service over `store`, auditing into the same database.
///
/// The event bus lives for one command, so only subscribers inside this
/// process (none for the one-shot commands) see grant changes.
pub fn access_service(store: &Arc<SqliteStore>) -> ProjectAccessService {
    let events = Arc::new(MemoryEventBus::new());
    let mutations = StoreMutationService::new(store.clone(), events.clone(), store.clone());
    ProjectAccessService::new(
        store.clone(),
        Arc::new(ProjectAdminGate),
        Arc::new(mutations),
        events,
    )
    .with_audit_log(store.clone())
}

pub async fn user_id_for(
    store: &SqliteStore,
    email: &str,
) -> Result<UserId, Box<dyn std::error::Error>> {
    match store.get_user_by_email(email).await {
        Ok(user) => Ok(user.id),
        Err(StoreError::NotFound) => Err(format!("No user with email {}", email).into()),
        Err(e) => Err(e.into()),
    }
}

pub fn parse_project_id(s: &str) -> Result<ProjectId, Box<dyn std::error::Error>> {
    s.parse()
        .map_err(|e| format!("Invalid project ID '{}': {}", s, e).into())
}

pub fn parse_organization_id(s: &str) -> Result<OrganizationId, Box<dyn std::error::Error>> {
    s.parse()
        .map_err(|e| format!("Invalid organization ID '{}': {}", s, e).into())
}
