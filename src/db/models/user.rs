//! User models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Closed set of account roles. Stored as `admin` / `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Map the signup flags onto a role.
    ///
    /// Returns `None` for an account that would be neither admin nor user.
    pub fn from_flags(is_admin: bool, is_user: bool) -> Option<Self> {
        match (is_admin, is_user) {
            (true, _) => Some(Role::Admin),
            (false, true) => Some(Role::User),
            (false, false) => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from(self.role.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.role().is_admin()
    }
}

/// A user about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default, deserialize_with = "super::trimmed")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "super::trimmed")]
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
    pub is_user: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Body returned by signup and login.
///
/// `is_admin` and `is_user` are derived from the stored role and are
/// mutually exclusive: an account created with both flags set is an admin
/// and reports `is_user: false`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user_id: i64,
    pub username: String,
    pub is_admin: bool,
    pub is_user: bool,
    pub token: String,
}

impl AuthResponse {
    pub fn new(user: &User, token: String) -> Self {
        let role = user.role();
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_admin: role == Role::Admin,
            is_user: role == Role::User,
            token,
        }
    }
}
