//! Records and identifiers shared by every store backend.

mod grants;
mod ids;
mod organizations;
mod projects;
mod roles;
mod users;

pub use grants::*;
pub use ids::*;
pub use organizations::*;
pub use projects::*;
pub use roles::*;
pub use users::*;
