//! Geopoint endpoints

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use biophonie_common::db::{Assets, GeoPoint, NewGeoPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::{Caller, MaybeCaller};
use super::error::{parse_id, ApiError};
use crate::availability::{Availability, TransitionOutcome};
use crate::AppState;

/// Query keys carrying ids to exclude from a closest lookup
const EXCLUDE_KEYS: [&str; 2] = ["not[]", "not"];

/// Body of `POST /restricted/geopoint`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGeoPoint {
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Recording date
    pub date: DateTime<Utc>,
    pub amplitudes: Vec<f64>,
    /// Use a stock picture instead of an uploaded one
    #[serde(default)]
    pub picture_template: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClosestResponse {
    pub id: i64,
}

/// Stock picture name, restricted to a bare file stem
fn template_picture(template: &str) -> Result<String, ApiError> {
    let valid = !template.is_empty()
        && template
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(ApiError::Validation(format!("invalid picture template: {}", template)));
    }
    Ok(format!("{}.webp", template))
}

/// POST /api/v1/restricted/geopoint
///
/// Stored as pending until an admin enables it. Asset names are assigned here.
pub async fn create_geopoint(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateGeoPoint>, JsonRejection>,
) -> Result<(StatusCode, Json<GeoPoint>), ApiError> {
    let Json(body) = payload?;

    let asset_id = Uuid::new_v4();
    let picture = match body.picture_template.as_deref() {
        Some(template) => template_picture(template)?,
        None => format!("{}.webp", asset_id),
    };

    let fields = NewGeoPoint {
        title: body.title,
        user_id: caller.user_id,
        latitude: body.latitude,
        longitude: body.longitude,
        created_on: body.date,
        amplitudes: body.amplitudes,
        picture,
        sound: format!("{}.aac", asset_id),
    };

    let point = state.lifecycle.create(fields).await?;
    Ok((StatusCode::CREATED, Json(point)))
}

/// Fetch a geopoint, refusing pending ones unless `admin`
async fn visible_geopoint(state: &AppState, raw_id: &str, admin: bool) -> Result<GeoPoint, ApiError> {
    let id = parse_id(raw_id)?;
    let point = state.store.get_by_id(id).await?;

    if !Availability::of(&point).is_public() && !admin {
        return Err(ApiError::Forbidden("geopoint not available yet".to_string()));
    }
    Ok(point)
}

/// GET /api/v1/geopoint/:id
pub async fn get_geopoint(
    State(state): State<AppState>,
    caller: MaybeCaller,
    Path(id): Path<String>,
) -> Result<Json<GeoPoint>, ApiError> {
    visible_geopoint(&state, &id, caller.is_admin()).await.map(Json)
}

/// GET /api/v1/geopoint/:id/assets
pub async fn get_geopoint_assets(
    State(state): State<AppState>,
    caller: MaybeCaller,
    Path(id): Path<String>,
) -> Result<Json<Assets>, ApiError> {
    let point = visible_geopoint(&state, &id, caller.is_admin()).await?;
    Ok(Json(Assets::from(&point)))
}

/// GET /api/v1/restricted/geopoint/:id
pub async fn get_restricted_geopoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GeoPoint>, ApiError> {
    visible_geopoint(&state, &id, true).await.map(Json)
}

/// PATCH /api/v1/restricted/geopoint/:id/enable
pub async fn enable_geopoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransitionOutcome>, ApiError> {
    let id = parse_id(&id)?;
    let outcome = state.lifecycle.enable(id).await?;
    Ok(Json(outcome))
}

/// DELETE /api/v1/restricted/geopoint/:id
pub async fn delete_geopoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransitionOutcome>, ApiError> {
    let id = parse_id(&id)?;
    let outcome = state.lifecycle.delete(id).await?;
    Ok(Json(outcome))
}

fn parse_coordinate(name: &str, raw: &str) -> Result<f64, ApiError> {
    raw.parse::<f64>()
        .map_err(|_| ApiError::Validation(format!("invalid {}: {}", name, raw)))
}

/// GET /api/v1/geopoint/closest/to/:latitude/:longitude?not[]=1&not[]=2
pub async fn closest_geopoint(
    State(state): State<AppState>,
    Path((latitude, longitude)): Path<(String, String)>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<ClosestResponse>, ApiError> {
    let Query(pairs) = query?;
    let latitude = parse_coordinate("latitude", &latitude)?;
    let longitude = parse_coordinate("longitude", &longitude)?;

    let excluded = pairs
        .iter()
        .filter(|(key, _)| EXCLUDE_KEYS.contains(&key.as_str()))
        .map(|(_, value)| parse_id(value))
        .collect::<Result<Vec<_>, _>>()?;

    let id = state.proximity.closest(latitude, longitude, &excluded).await?;
    Ok(Json(ClosestResponse { id }))
}
