pub mod access;
pub mod audit;
pub mod config;
pub mod organization;
pub mod project;
pub mod user;

pub use access::{cmd_access_grant, cmd_access_list, cmd_access_revoke, cmd_access_update};
pub use audit::cmd_audit_list;
pub use config::{cmd_config_set_actor, cmd_config_set_database, cmd_config_show};
pub use organization::{cmd_org_add_member, cmd_org_create};
pub use project::cmd_project_create;
pub use user::cmd_user_create;
