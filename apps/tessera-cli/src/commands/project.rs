use tessera_storage::{CreateProjectParams, Store, StoreError};
use tessera_store_sqlite::SqliteStore;

use crate::context::parse_organization_id;

pub async fn cmd_project_create(
    store: &SqliteStore,
    org: &str,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let organization_id = parse_organization_id(org)?;
    let params = CreateProjectParams {
        organization_id,
        name: name.to_string(),
    };
    match store.create_project(&params).await {
        Ok(id) => {
            println!("Created project {} ({})", name, id);
            Ok(())
        }
        Err(StoreError::NotFound) => Err(format!("Organization {} not found", org).into()),
        Err(StoreError::AlreadyExists) => {
            Err(format!("Project {} already exists in organization {}", name, org).into())
        }
        Err(e) => Err(e.into()),
    }
}
