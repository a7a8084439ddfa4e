//! SQLite implementation of the storage traits.

use async_trait::async_trait;

use super::models::{AuthToken, InventoryItem, ItemFields, NewUser, Session, User, Visibility};
use super::repository::{
    AuthRepository, ItemRepository, StoreError, StoreResult, UserRepository,
};
use super::DbPool;

/// Unique columns and the request field each one is reported against
const UNIQUE_COLUMNS: &[(&str, &str)] = &[
    ("users.username", "username"),
    ("users.email", "email"),
    ("inventory_items.serial_number", "serial_number"),
];

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.name, i.type, i.serial_number, i.barcode, i.location, i.status,
           i.user_id, u.username AS owner_username, i.created_at, i.updated_at
    FROM inventory_items i
    JOIN users u ON u.id = i.user_id
"#;

fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = db_err.message();
            if let Some((_, field)) = UNIQUE_COLUMNS
                .iter()
                .find(|(column, _)| message.contains(column))
            {
                return StoreError::Duplicate { field: *field };
            }
        }
    }
    StoreError::Database(err)
}

/// `None` means no owner restriction
fn owner_filter(visibility: Visibility) -> Option<i64> {
    match visibility {
        Visibility::All => None,
        Visibility::OwnedBy(id) => Some(id),
    }
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let now = chrono::Utc::now().to_rfc3339();

        let id = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?
        .last_insert_rowid();

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl AuthRepository for SqliteStore {
    async fn get_or_create_token(&self, user_id: i64, candidate: &str) -> StoreResult<AuthToken> {
        let now = chrono::Utc::now().to_rfc3339();

        // A concurrent issuer loses the race on the user_id constraint and
        // falls through to the select below.
        sqlx::query(
            "INSERT INTO auth_tokens (key, user_id, created_at) VALUES (?, ?, ?) ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(candidate)
        .bind(user_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let token = sqlx::query_as::<_, AuthToken>("SELECT * FROM auth_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(token)
    }

    async fn find_user_by_token(&self, key: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.* FROM users u JOIN auth_tokens t ON t.user_id = u.id WHERE t.key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_session(&self, session: Session) -> StoreResult<Session> {
        // Timestamps are fixed-width RFC 3339 UTC, so text order is time order
        sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(&session.created_at)
            .execute(&self.pool)
            .await?;

        sqlx::query("INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
            .bind(&session.id)
            .bind(session.user_id)
            .bind(&session.expires_at)
            .bind(&session.created_at)
            .execute(&self.pool)
            .await?;
        Ok(session)
    }

    async fn delete_session(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ItemRepository for SqliteStore {
    async fn create_item(&self, owner_id: i64, fields: ItemFields) -> StoreResult<InventoryItem> {
        let now = chrono::Utc::now().to_rfc3339();

        let id = sqlx::query(
            r#"
            INSERT INTO inventory_items
                (name, type, serial_number, barcode, location, status, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.item_type)
        .bind(&fields.serial_number)
        .bind(&fields.barcode)
        .bind(&fields.location)
        .bind(&fields.status)
        .bind(owner_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?
        .last_insert_rowid();

        let item = sqlx::query_as::<_, InventoryItem>(&format!("{ITEM_SELECT} WHERE i.id = ?"))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(item)
    }

    async fn list_items(&self, visibility: Visibility) -> StoreResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "{ITEM_SELECT} WHERE (?1 IS NULL OR i.user_id = ?1) ORDER BY i.id"
        ))
        .bind(owner_filter(visibility))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn find_item(&self, id: i64, visibility: Visibility) -> StoreResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "{ITEM_SELECT} WHERE i.id = ?1 AND (?2 IS NULL OR i.user_id = ?2)"
        ))
        .bind(id)
        .bind(owner_filter(visibility))
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn update_item(
        &self,
        id: i64,
        visibility: Visibility,
        fields: ItemFields,
    ) -> StoreResult<Option<InventoryItem>> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                name = ?1,
                type = ?2,
                serial_number = ?3,
                barcode = ?4,
                location = ?5,
                status = ?6,
                updated_at = ?7
            WHERE id = ?8 AND (?9 IS NULL OR user_id = ?9)
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.item_type)
        .bind(&fields.serial_number)
        .bind(&fields.barcode)
        .bind(&fields.location)
        .bind(&fields.status)
        .bind(&now)
        .bind(id)
        .bind(owner_filter(visibility))
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_item(id, visibility).await
    }

    async fn delete_item(&self, id: i64, visibility: Visibility) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = ?1 AND (?2 IS NULL OR user_id = ?2)")
            .bind(id)
            .bind(owner_filter(visibility))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_items(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM inventory_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;

    async fn store() -> SqliteStore {
        SqliteStore::new(crate::db::init_in_memory().await.unwrap())
    }

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "hash".to_string(),
            role,
        }
    }

    fn fields(serial: &str) -> ItemFields {
        ItemFields {
            name: "Laptop".to_string(),
            item_type: "Compute".to_string(),
            serial_number: serial.to_string(),
            barcode: None,
            location: "RoomA".to_string(),
            status: "in-use".to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_is_reported_by_field() {
        let store = store().await;
        store.create_user(new_user("alice", Role::User)).await.unwrap();

        let mut again = new_user("alice", Role::User);
        again.email = "other@example.com".to_string();
        let err = store.create_user(again).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "username" }));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_reported_by_field() {
        let store = store().await;
        store.create_user(new_user("alice", Role::User)).await.unwrap();

        let mut other = new_user("bob", Role::User);
        other.email = "alice@example.com".to_string();
        let err = store.create_user(other).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "email" }));
    }

    #[tokio::test]
    async fn test_token_get_or_create_keeps_first_key() {
        let store = store().await;
        let user = store.create_user(new_user("alice", Role::User)).await.unwrap();

        let first = store.get_or_create_token(user.id, "first").await.unwrap();
        let second = store.get_or_create_token(user.id, "second").await.unwrap();
        assert_eq!(first.key, "first");
        assert_eq!(second.key, "first");

        let found = store.find_user_by_token("first").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(store.find_user_by_token("second").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_serial_number_unique_across_owners() {
        let store = store().await;
        let alice = store.create_user(new_user("alice", Role::User)).await.unwrap();
        let bob = store.create_user(new_user("bob", Role::User)).await.unwrap();

        store.create_item(alice.id, fields("SN1")).await.unwrap();
        let err = store.create_item(bob.id, fields("SN1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "serial_number" }));
    }

    #[tokio::test]
    async fn test_visibility_scopes_every_item_query() {
        let store = store().await;
        let alice = store.create_user(new_user("alice", Role::User)).await.unwrap();
        let admin = store.create_user(new_user("root", Role::Admin)).await.unwrap();

        let item = store.create_item(alice.id, fields("SN1")).await.unwrap();
        store.create_item(admin.id, fields("SN2")).await.unwrap();
        assert_eq!(item.owner_username, "alice");

        let mine = store.list_items(Visibility::OwnedBy(alice.id)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(store.list_items(Visibility::All).await.unwrap().len(), 2);

        let outsider = Visibility::OwnedBy(admin.id);
        assert!(store.find_item(item.id, outsider).await.unwrap().is_none());
        assert!(store.update_item(item.id, outsider, fields("SN9")).await.unwrap().is_none());
        assert!(!store.delete_item(item.id, outsider).await.unwrap());

        assert!(store.delete_item(item.id, Visibility::All).await.unwrap());
        assert!(!store.delete_item(item.id, Visibility::All).await.unwrap());
        assert_eq!(store.count_items().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_to_taken_serial_number() {
        let store = store().await;
        let alice = store.create_user(new_user("alice", Role::User)).await.unwrap();
        store.create_item(alice.id, fields("SN1")).await.unwrap();
        let second = store.create_item(alice.id, fields("SN2")).await.unwrap();

        let err = store
            .update_item(second.id, Visibility::All, fields("SN1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "serial_number" }));

        // Keeping its own serial number is fine
        let updated = store
            .update_item(second.id, Visibility::All, fields("SN2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.serial_number, "SN2");
    }

    #[tokio::test]
    async fn test_sessions() {
        let store = store().await;
        let alice = store.create_user(new_user("alice", Role::User)).await.unwrap();

        let session = Session {
            id: "s1".to_string(),
            user_id: alice.id,
            expires_at: "2099-01-01T00:00:00Z".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        store.create_session(session).await.unwrap();

        assert!(store.delete_session("s1").await.unwrap());
        assert!(!store.delete_session("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_new_session_prunes_expired_ones() {
        let store = store().await;
        let alice = store.create_user(new_user("alice", Role::User)).await.unwrap();

        let session = |id: &str, created_at: &str, expires_at: &str| Session {
            id: id.to_string(),
            user_id: alice.id,
            expires_at: expires_at.to_string(),
            created_at: created_at.to_string(),
        };

        store
            .create_session(session("old", "2024-01-01T00:00:00Z", "2024-01-15T00:00:00Z"))
            .await
            .unwrap();
        store
            .create_session(session("live", "2024-01-10T00:00:00Z", "2024-03-01T00:00:00Z"))
            .await
            .unwrap();
        store
            .create_session(session("new", "2024-02-01T00:00:00Z", "2024-02-15T00:00:00Z"))
            .await
            .unwrap();

        assert!(!store.delete_session("old").await.unwrap());
        assert!(store.delete_session("live").await.unwrap());
        assert!(store.delete_session("new").await.unwrap());
    }
}
