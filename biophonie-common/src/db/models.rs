//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A moderated point of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeoPoint {
    pub id: i64,
    pub title: String,
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub created_on: DateTime<Utc>,
    /// Amplitude envelope, stored as a JSON array
    #[sqlx(json)]
    pub amplitudes: Vec<f64>,
    pub picture: String,
    pub sound: String,
    pub available: bool,
}

/// Fields of a geopoint submission, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGeoPoint {
    pub title: String,
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub created_on: DateTime<Utc>,
    pub amplitudes: Vec<f64>,
    pub picture: String,
    pub sound: String,
}

/// Asset references of a geopoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assets {
    pub picture: String,
    pub sound: String,
}

impl From<&GeoPoint> for Assets {
    fn from(point: &GeoPoint) -> Self {
        Self {
            picture: point.picture.clone(),
            sound: point.sound.clone(),
        }
    }
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub token_hash: String,
    pub admin: bool,
    pub created_on: DateTime<Utc>,
}
