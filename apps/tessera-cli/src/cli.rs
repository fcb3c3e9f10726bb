use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Tessera project access CLI")]
pub struct Cli {
    /// Database URL (defaults to ~/.tessera/store.db)
    #[arg(long, env = "TESSERA_DATABASE_URL")]
    pub database: Option<String>,

    /// Email of the acting user
    #[arg(long, env = "TESSERA_ACTOR")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// User commands
    User {
        #[command(subcommand)]
        user_cmd: UserCommand,
    },
    /// Organization commands
    Org {
        #[command(subcommand)]
        org_cmd: OrgCommand,
    },
    /// Project commands
    Project {
        #[command(subcommand)]
        project_cmd: ProjectCommand,
    },
    /// Project access commands (explicit grants and inherited roles)
    Access {
        #[command(subcommand)]
        access_cmd: AccessCommand,
    },
    /// Audit log commands
    Audit {
        #[command(subcommand)]
        audit_cmd: AuditCommand,
    },
    /// Local configuration
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Create a user
    Create {
        /// User email
        email: String,
    },
}

#[derive(Subcommand)]
pub enum OrgCommand {
    /// Create an organization
    Create {
        /// Organization name
        name: String,
    },
    /// Add an existing user to an organization
    AddMember {
        /// Organization ID
        org: String,
        /// User email
        email: String,
        /// Organization role (member, viewer, interactive_viewer, editor, developer, admin)
        #[arg(long)]
        role: String,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Create a project in an organization
    Create {
        /// Organization ID
        org: String,
        /// Project name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum AccessCommand {
    /// Show explicit grants, inherited access and excluded members
    List {
        /// Project ID
        project: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Give a user an explicit grant
    Grant {
        /// Project ID
        project: String,
        /// User email
        email: String,
        /// Project role (viewer, interactive_viewer, editor, developer, admin)
        #[arg(long)]
        role: String,
    },
    /// Change the role of an explicit grant
    Update {
        /// Project ID
        project: String,
        /// User email
        email: String,
        /// New project role
        #[arg(long)]
        role: String,
    },
    /// Remove an explicit grant
    Revoke {
        /// Project ID
        project: String,
        /// User email
        email: String,
    },
}

#[derive(Subcommand)]
pub enum AuditCommand {
    /// List audit log entries, newest first
    List {
        /// Filter by project ID
        #[arg(long)]
        project: Option<String>,
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the stored configuration
    Show,
    /// Set the default acting user
    SetActor {
        /// User email
        email: String,
    },
    /// Set the default database URL
    SetDatabase {
        /// sqlx SQLite URL, e.g. sqlite:///path/to/store.db
        url: String,
    },
}
