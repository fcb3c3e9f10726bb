//! User types.

use chrono::{DateTime, Utc};

use super::UserId;

/// A person who can hold organization roles and project grants.
#[derive(Clone, Debug)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
