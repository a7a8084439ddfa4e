//! Inventory item models and DTOs.

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

use super::user::User;

/// Which items a request may observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Administrators see every item
    All,
    /// Everyone else sees only the items they own
    OwnedBy(i64),
}

impl Visibility {
    pub fn for_user(user: &User) -> Self {
        if user.is_admin() {
            Visibility::All
        } else {
            Visibility::OwnedBy(user.id)
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    pub item_type: String,
    pub serial_number: String,
    pub barcode: Option<String>,
    pub location: String,
    pub status: String,
    pub user_id: i64,
    pub owner_username: String,
    pub created_at: String,
    pub updated_at: String,
}

impl InventoryItem {
    pub fn fields(&self) -> ItemFields {
        ItemFields {
            name: self.name.clone(),
            item_type: self.item_type.clone(),
            serial_number: self.serial_number.clone(),
            barcode: self.barcode.clone(),
            location: self.location.clone(),
            status: self.status.clone(),
        }
    }
}

/// The writable columns of an item, fully populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub name: String,
    pub item_type: String,
    pub serial_number: String,
    pub barcode: Option<String>,
    pub location: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryItemResponse {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub serial_number: String,
    pub barcode: Option<String>,
    pub location: String,
    pub status: String,
    pub owner: i64,
    pub owner_username: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<InventoryItem> for InventoryItemResponse {
    fn from(item: InventoryItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            item_type: item.item_type,
            serial_number: item.serial_number,
            barcode: item.barcode,
            location: item.location,
            status: item.status,
            owner: item.user_id,
            owner_username: item.owner_username,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Request body for create, update and partial update.
///
/// Every field is optional at the wire level so that missing fields can be
/// reported per field. `owner` and `id` are ignored if sent.
#[derive(Debug, Default, Deserialize)]
pub struct ItemPayload {
    #[serde(default, deserialize_with = "super::trimmed")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "super::trimmed")]
    pub item_type: Option<String>,
    #[serde(default, deserialize_with = "super::trimmed")]
    pub serial_number: Option<String>,
    /// `None` = absent, `Some(None)` = explicit null
    #[serde(default, deserialize_with = "present")]
    pub barcode: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::trimmed")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "super::trimmed")]
    pub status: Option<String>,
}

impl ItemPayload {
    /// Build the full field set for a new item. Call after validation.
    pub fn into_new(self) -> ItemFields {
        ItemFields {
            name: self.name.unwrap_or_default(),
            item_type: self.item_type.unwrap_or_default(),
            serial_number: self.serial_number.unwrap_or_default(),
            barcode: self.barcode.flatten(),
            location: self.location.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
        }
    }

    /// Overlay the provided fields on an existing item.
    pub fn apply_to(self, current: ItemFields) -> ItemFields {
        ItemFields {
            name: self.name.unwrap_or(current.name),
            item_type: self.item_type.unwrap_or(current.item_type),
            serial_number: self.serial_number.unwrap_or(current.serial_number),
            barcode: match self.barcode {
                Some(barcode) => barcode,
                None => current.barcode,
            },
            location: self.location.unwrap_or(current.location),
            status: self.status.unwrap_or(current.status),
        }
    }
}

/// Distinguishes an explicit `null` from an absent field
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    super::trimmed(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ItemFields {
        ItemFields {
            name: "Laptop".to_string(),
            item_type: "Compute".to_string(),
            serial_number: "SN1".to_string(),
            barcode: Some("BC-1".to_string()),
            location: "RoomA".to_string(),
            status: "in-use".to_string(),
        }
    }

    #[test]
    fn test_payload_trims_text() {
        let payload: ItemPayload = serde_json::from_str(
            r#"{"name": "  Laptop  ", "serial_number": " SN1 ", "barcode": " BC-1\t"}"#,
        )
        .unwrap();
        assert_eq!(payload.name.as_deref(), Some("Laptop"));
        assert_eq!(payload.serial_number.as_deref(), Some("SN1"));
        assert_eq!(payload.barcode, Some(Some("BC-1".to_string())));
    }

    #[test]
    fn test_payload_barcode_null_vs_absent() {
        let absent: ItemPayload = serde_json::from_str(r#"{"status": "available"}"#).unwrap();
        assert_eq!(absent.barcode, None);

        let cleared: ItemPayload = serde_json::from_str(r#"{"barcode": null}"#).unwrap();
        assert_eq!(cleared.barcode, Some(None));

        let set: ItemPayload = serde_json::from_str(r#"{"barcode": "X"}"#).unwrap();
        assert_eq!(set.barcode, Some(Some("X".to_string())));
    }

    #[test]
    fn test_apply_keeps_omitted_fields() {
        let patch: ItemPayload = serde_json::from_str(r#"{"status": "available"}"#).unwrap();
        let merged = patch.apply_to(fields());
        assert_eq!(merged.status, "available");
        assert_eq!(merged.name, "Laptop");
        assert_eq!(merged.barcode.as_deref(), Some("BC-1"));
    }

    #[test]
    fn test_apply_clears_barcode() {
        let patch: ItemPayload = serde_json::from_str(r#"{"barcode": null}"#).unwrap();
        assert_eq!(patch.apply_to(fields()).barcode, None);
    }

    #[test]
    fn test_payload_ignores_owner() {
        let payload: ItemPayload =
            serde_json::from_str(r#"{"name": "Laptop", "owner": 99, "user": 99}"#).unwrap();
        assert_eq!(payload.name.as_deref(), Some("Laptop"));
    }

    #[test]
    fn test_response_uses_type_key() {
        let item = InventoryItem {
            id: 1,
            name: "Laptop".to_string(),
            item_type: "Compute".to_string(),
            serial_number: "SN1".to_string(),
            barcode: None,
            location: "RoomA".to_string(),
            status: "in-use".to_string(),
            user_id: 3,
            owner_username: "alice".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let body = serde_json::to_value(InventoryItemResponse::from(item)).unwrap();
        assert_eq!(body["type"], "Compute");
        assert_eq!(body["owner"], 3);
        assert!(body["barcode"].is_null());
    }
}
