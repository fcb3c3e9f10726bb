//! Project access commands: list, grant, update, revoke

use std::fmt::{self, Write};
use std::sync::Arc;

use tessera_access::{AccessError, GrantControls, ProjectAccessView};
use tessera_storage::{ProjectRole, Store, UserId};
use tessera_store_sqlite::SqliteStore;

use crate::context::{access_service, parse_project_id, user_id_for};

pub async fn cmd_access_list(
    store: &Arc<SqliteStore>,
    actor: &UserId,
    project: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let project_id = parse_project_id(project)?;
    let view = access_service(store).load(actor, &project_id).await.into_result()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view_json(&view))?);
    } else {
        let mut out = String::new();
        render_view(&mut out, &view)?;
        print!("{}", out);
    }
    Ok(())
}

pub async fn cmd_access_grant(
    store: &Arc<SqliteStore>,
    actor: &UserId,
    project: &str,
    email: &str,
    role: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let project_id = parse_project_id(project)?;
    let role: ProjectRole = role.parse()?;
    let project = store.get_project(&project_id).await?;
    let user_id = user_id_for(store, email).await?;

    match access_service(store)
        .create_grant(actor, &project_id, &user_id, role)
        .await
    {
        Ok(()) => {
            println!("Granted {} {} on project {}", email, role, project.name);
            Ok(())
        }
        Err(AccessError::UnauthorizedMutationAttempt { .. }) => {
            Err(format!("You may not manage access to project {}", project.name).into())
        }
        Err(AccessError::MutationRejected { reason }) if reason == "grant already exists" => {
            Err(format!(
                "{} already has an explicit grant; use 'tessera access update'",
                email
            )
            .into())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn cmd_access_update(
    store: &Arc<SqliteStore>,
    actor: &UserId,
    project: &str,
    email: &str,
    role: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let project_id = parse_project_id(project)?;
    let role: ProjectRole = role.parse()?;
    let view = access_service(store).load(actor, &project_id).await.into_result()?;

    controls_for_email(&view, email)?.update(role).await?;
    println!("Updated {} to {} on project {}", email, role, view.project.name);
    Ok(())
}

pub async fn cmd_access_revoke(
    store: &Arc<SqliteStore>,
    actor: &UserId,
    project: &str,
    email: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let project_id = parse_project_id(project)?;
    let view = access_service(store).load(actor, &project_id).await.into_result()?;

    controls_for_email(&view, email)?.revoke().await?;
    println!("Revoked explicit access for {} on project {}", email, view.project.name);
    Ok(())
}

/// Mutations only go through controls the view handed out.
fn controls_for_email<'a>(
    view: &'a ProjectAccessView,
    email: &str,
) -> Result<&'a GrantControls, Box<dyn std::error::Error>> {
    let row = view
        .explicit_row_by_email(email)
        .ok_or_else(|| format!("{} has no explicit grant on project {}", email, view.project.name))?;
    row.controls.as_ref().ok_or_else(|| {
        format!("You may not manage access to project {}", view.project.name).into()
    })
}

fn render_view(out: &mut impl Write, view: &ProjectAccessView) -> fmt::Result {
    writeln!(out, "Project: {} ({})", view.project.name, view.project.id)?;
    writeln!(out)?;

    if view.explicit.is_empty() {
        writeln!(out, "No explicit grants.")?;
    } else {
        writeln!(out, "Explicit access:")?;
        for row in &view.explicit {
            writeln!(out, "  {:<32} {}", row.access.email, row.access.role)?;
            if let Some(note) = row.overlap_note() {
                writeln!(out, "    {}", note)?;
            }
            if let Some(warning) = &row.access.warning {
                writeln!(out, "    warning: {}", warning)?;
            }
        }
    }

    if !view.inherited.is_empty() {
        writeln!(out)?;
        writeln!(out, "Inherited from organization:")?;
        for row in &view.inherited {
            writeln!(out, "  {:<32} {}", row.access.email, row.role_note())?;
        }
    }

    if !view.excluded.is_empty() {
        writeln!(out)?;
        writeln!(out, "{} member(s) without project access.", view.excluded.len())?;
    }
    Ok(())
}

fn view_json(view: &ProjectAccessView) -> serde_json::Value {
    let explicit: Vec<_> = view.explicit.iter().map(|row| &row.access).collect();
    let inherited: Vec<_> = view.inherited.iter().map(|row| &row.access).collect();
    serde_json::json!({
        "project_id": view.project.id,
        "project_name": view.project.name,
        "can_manage": view.can_manage(),
        "explicit": explicit,
        "inherited": inherited,
        "excluded": view.excluded,
    })
}
