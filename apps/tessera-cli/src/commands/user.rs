use tessera_storage::{Store, StoreError};
use tessera_store_sqlite::SqliteStore;

pub async fn cmd_user_create(
    store: &SqliteStore,
    email: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match store.create_user(email).await {
        Ok(id) => {
            println!("Created user {} ({})", email, id);
            Ok(())
        }
        Err(StoreError::AlreadyExists) => Err(format!("User {} already exists", email).into()),
        Err(e) => Err(e.into()),
    }
}
