//! Storage interfaces used by the API layer.
//!
//! Handlers only talk to these traits. Uniqueness (username, email,
//! serial number, one token per user) is enforced by the database itself,
//! so implementations report violations as [`StoreError::Duplicate`]
//! instead of checking before writing.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{AuthToken, InventoryItem, ItemFields, NewUser, Session, User, Visibility};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for {field}")]
    Duplicate { field: &'static str },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Return the user's token, storing `candidate` if none exists yet.
    async fn get_or_create_token(&self, user_id: i64, candidate: &str) -> StoreResult<AuthToken>;

    async fn find_user_by_token(&self, key: &str) -> StoreResult<Option<User>>;

    async fn create_session(&self, session: Session) -> StoreResult<Session>;

    /// Returns whether a session was removed
    async fn delete_session(&self, id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn create_item(&self, owner_id: i64, fields: ItemFields) -> StoreResult<InventoryItem>;

    async fn list_items(&self, visibility: Visibility) -> StoreResult<Vec<InventoryItem>>;

    async fn find_item(&self, id: i64, visibility: Visibility) -> StoreResult<Option<InventoryItem>>;

    /// Replace the writable columns. `None` if the item is not visible.
    async fn update_item(
        &self,
        id: i64,
        visibility: Visibility,
        fields: ItemFields,
    ) -> StoreResult<Option<InventoryItem>>;

    /// Returns whether an item was removed
    async fn delete_item(&self, id: i64, visibility: Visibility) -> StoreResult<bool>;

    async fn count_items(&self) -> StoreResult<i64>;
}

/// Everything the API needs from persistence.
pub trait Store: UserRepository + AuthRepository + ItemRepository {}

impl<T> Store for T where T: UserRepository + AuthRepository + ItemRepository {}
