//! Audit log commands: list

use tessera_audit::{AuditLog, AuditLogFilter};
use tessera_store_sqlite::SqliteStore;

use crate::context::parse_project_id;

pub async fn cmd_audit_list(
    store: &SqliteStore,
    project: Option<&str>,
    limit: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut filter = AuditLogFilter::new();
    if let Some(project) = project {
        filter = filter.project_id(parse_project_id(project)?);
    }
    if let Some(limit) = limit {
        filter = filter.limit(limit);
    }

    let entries = store.query(filter).await?;
    if entries.is_empty() {
        println!("No audit log entries found.");
        return Ok(());
    }

    println!("Audit logs ({}):\n", entries.len());
    for entry in entries {
        println!("ID:        {}", entry.id);
        println!("Timestamp: {}", entry.timestamp.to_rfc3339());
        if let Some(actor) = entry.actor_user_id {
            println!("Actor:     {}", actor);
        }
        println!("Action:    {}", entry.action);
        println!("Project:   {}", entry.project_id);
        println!("Target:    {}", entry.target_user_id);
        println!("Result:    {}", entry.result);
        if let Some(reason) = entry.reason {
            println!("Reason:    {}", reason);
        }
        if let Some(details) = entry.details {
            println!("Details:   {}", details);
        }
        println!();
    }
    Ok(())
}
