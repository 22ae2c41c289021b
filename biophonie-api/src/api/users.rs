//! Account endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use biophonie_common::db::Account;
use tracing::info;

use super::error::{parse_id, ApiError};
use crate::db::accounts::{get_account_by_id, get_account_by_name, make_admin};
use crate::AppState;

/// GET /api/v1/user/:name
///
/// The token digest is never serialized.
pub async fn get_user(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let account = get_account_by_name(&state.db, &name).await?;
    Ok(Json(account))
}

/// PATCH /api/v1/restricted/user/:id
pub async fn make_user_admin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Account>, ApiError> {
    let id = parse_id(&id)?;
    if !make_admin(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("account {} not found", id)));
    }
    info!("Account {} promoted to admin", id);

    let account = get_account_by_id(&state.db, id).await?;
    Ok(Json(account))
}
