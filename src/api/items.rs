//! Inventory item CRUD.
//!
//! Every handler scopes its query with the requester's [`Visibility`]:
//! admins reach all items, everyone else only their own. Items outside
//! that scope are reported as not found.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::validation::validate_item;
use crate::db::{InventoryItemResponse, ItemPayload, User, Visibility};
use crate::AppState;

fn item_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|_| not_found())
}

fn not_found() -> ApiError {
    ApiError::not_found("Not found.")
}

/// List the items visible to the requester
///
/// GET /api/items
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<InventoryItemResponse>>, ApiError> {
    let items = state.store.list_items(Visibility::for_user(&user)).await?;
    Ok(Json(items.into_iter().map(InventoryItemResponse::from).collect()))
}

/// Get a single item
///
/// GET /api/items/:id
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<InventoryItemResponse>, ApiError> {
    let id = item_id(path)?;

    let item = state
        .store
        .find_item(id, Visibility::for_user(&user))
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(InventoryItemResponse::from(item)))
}

/// Create an item owned by the requester
///
/// POST /api/items
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ItemPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<InventoryItemResponse>), ApiError> {
    let Json(payload) = payload?;
    validate_item(&payload, false)?;

    let item = state.store.create_item(user.id, payload.into_new()).await?;

    info!(item_id = item.id, user_id = user.id, serial_number = %item.serial_number, "Inventory item created");

    Ok((StatusCode::CREATED, Json(InventoryItemResponse::from(item))))
}

/// Replace an item's fields
///
/// PUT /api/items/:id
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ItemPayload>, JsonRejection>,
) -> Result<Json<InventoryItemResponse>, ApiError> {
    save_item(&state, &user, item_id(path)?, payload, false).await
}

/// Change some of an item's fields
///
/// PATCH /api/items/:id
pub async fn partial_update_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ItemPayload>, JsonRejection>,
) -> Result<Json<InventoryItemResponse>, ApiError> {
    save_item(&state, &user, item_id(path)?, payload, true).await
}

async fn save_item(
    state: &AppState,
    user: &User,
    id: i64,
    payload: Result<Json<ItemPayload>, JsonRejection>,
    partial: bool,
) -> Result<Json<InventoryItemResponse>, ApiError> {
    let visibility = Visibility::for_user(user);

    let existing = state
        .store
        .find_item(id, visibility)
        .await?
        .ok_or_else(not_found)?;

    let Json(payload) = payload?;
    validate_item(&payload, partial)?;

    let fields = payload.apply_to(existing.fields());
    let item = state
        .store
        .update_item(id, visibility, fields)
        .await?
        .ok_or_else(not_found)?;

    info!(item_id = item.id, user_id = user.id, partial, "Inventory item updated");

    Ok(Json(InventoryItemResponse::from(item)))
}

/// Delete an item
///
/// DELETE /api/items/:id
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = item_id(path)?;

    if !state.store.delete_item(id, Visibility::for_user(&user)).await? {
        return Err(not_found());
    }

    info!(item_id = id, user_id = user.id, "Inventory item deleted");

    Ok(StatusCode::NO_CONTENT)
}
