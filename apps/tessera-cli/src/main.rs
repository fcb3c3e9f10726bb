mod cli;
mod commands;
mod context;

use clap::Parser;
use cli::{
    AccessCommand, AuditCommand, Cli, Command, ConfigCommand, OrgCommand, ProjectCommand,
    UserCommand,
};
use commands::*;
use tessera_config::CliConfig;
use tracing_subscriber::EnvFilter;

// ────────────────────────────────────── Main ──────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Config commands never touch the store.
    if let Command::Config { config_cmd } = &cli.command {
        match config_cmd {
            ConfigCommand::Show => cmd_config_show()?,
            ConfigCommand::SetActor { email } => cmd_config_set_actor(email)?,
            ConfigCommand::SetDatabase { url } => cmd_config_set_database(url)?,
        }
        return Ok(());
    }

    let config = CliConfig::load_or_default()?;
    let database_url = config.resolve_database_url(cli.database.as_deref());
    let store = context::open_store(database_url.as_deref()).await?;

    match cli.command {
        Command::User { user_cmd } => match user_cmd {
            UserCommand::Create { email } => {
                cmd_user_create(&store, &email).await?;
            }
        },
        Command::Org { org_cmd } => match org_cmd {
            OrgCommand::Create { name } => {
                cmd_org_create(&store, &name).await?;
            }
            OrgCommand::AddMember { org, email, role } => {
                cmd_org_add_member(&store, &org, &email, &role).await?;
            }
        },
        Command::Project { project_cmd } => match project_cmd {
            ProjectCommand::Create { org, name } => {
                cmd_project_create(&store, &org, &name).await?;
            }
        },
        Command::Access { access_cmd } => {
            let actor_email = config.resolve_actor(cli.actor.as_deref())?;
            let actor = context::user_id_for(&store, &actor_email).await?;
            match access_cmd {
                AccessCommand::List { project, json } => {
                    cmd_access_list(&store, &actor, &project, json).await?;
                }
                AccessCommand::Grant {
                    project,
                    email,
                    role,
                } => {
                    cmd_access_grant(&store, &actor, &project, &email, &role).await?;
                }
                AccessCommand::Update {
                    project,
                    email,
                    role,
                } => {
                    cmd_access_update(&store, &actor, &project, &email, &role).await?;
                }
                AccessCommand::Revoke { project, email } => {
                    cmd_access_revoke(&store, &actor, &project, &email).await?;
                }
            }
        }
        Command::Audit { audit_cmd } => match audit_cmd {
            AuditCommand::List { project, limit } => {
                cmd_audit_list(&store, project.as_deref(), limit).await?;
            }
        },
        Command::Config { .. } => {}
    }

    Ok(())
}
