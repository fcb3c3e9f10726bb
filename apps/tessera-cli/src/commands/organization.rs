use tessera_storage::{AddOrganizationMemberParams, OrganizationRole, Store, StoreError};
use tessera_store_sqlite::SqliteStore;

use crate::context::{parse_organization_id, user_id_for};

pub async fn cmd_org_create(
    store: &SqliteStore,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let id = store.create_organization(name).await?;
    println!("Created organization {} ({})", name, id);
    Ok(())
}

pub async fn cmd_org_add_member(
    store: &SqliteStore,
    org: &str,
    email: &str,
    role: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let organization_id = parse_organization_id(org)?;
    let role: OrganizationRole = role.parse()?;
    let user_id = user_id_for(store, email).await?;

    let params = AddOrganizationMemberParams {
        organization_id,
        user_id,
        role,
    };
    match store.add_organization_member(&params).await {
        Ok(()) => {
            println!("Added {} to organization {} as {}", email, org, role);
            Ok(())
        }
        Err(StoreError::AlreadyExists) => {
            Err(format!("{} is already a member of organization {}", email, org).into())
        }
        Err(StoreError::NotFound) => Err(format!("Organization {} not found", org).into()),
        Err(e) => Err(e.into()),
    }
}
