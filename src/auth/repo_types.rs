use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                     // unique user ID
    pub username: String,             // login name, unique
    pub email: String,                // lowercased, unique
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
    pub is_admin: bool,
    pub paid: bool,                   // set by the payment webhook only
    pub created_at: OffsetDateTime,   // creation timestamp
}

/// Fields needed to insert a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Username or email collided with an existing row. Which one is not reported.
    #[error("username or email already registered")]
    Duplicate,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
