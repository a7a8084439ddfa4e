//! Auth token and login session models.

use sqlx::FromRow;

/// Opaque bearer token, one per user
#[derive(Debug, Clone, FromRow)]
pub struct AuthToken {
    pub key: String,
    pub user_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub expires_at: String,
    pub created_at: String,
}
