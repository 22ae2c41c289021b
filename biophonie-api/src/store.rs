//! Geopoint system of record
//!
//! The snapshot maintainer, the lifecycle and the proximity index only see the
//! store through [`GeopointStore`]. The SQLite implementation lives in
//! [`crate::db::geopoints`].

use async_trait::async_trait;
use biophonie_common::db::{GeoPoint, NewGeoPoint};
use biophonie_common::{Error, Result};
use serde::{Deserialize, Serialize};

/// Latitude bounds in degrees
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Longitude bounds in degrees
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A validated WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Validate and build a position
    ///
    /// Rejects non-finite values and values outside `[-90,90]` / `[-180,180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !LATITUDE_RANGE.contains(&latitude) {
            return Err(Error::InvalidInput(format!(
                "latitude must be between -90 and 90, got {}",
                latitude
            )));
        }
        if !longitude.is_finite() || !LONGITUDE_RANGE.contains(&longitude) {
            return Err(Error::InvalidInput(format!(
                "longitude must be between -180 and 180, got {}",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// The two fields of a geopoint that make up its snapshot feature
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct FeatureFields {
    pub id: i64,
    pub name: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl From<&GeoPoint> for FeatureFields {
    fn from(point: &GeoPoint) -> Self {
        Self {
            id: point.id,
            name: point.title.clone(),
            longitude: point.longitude,
            latitude: point.latitude,
        }
    }
}

/// Operations the core needs from the relational store
#[async_trait]
pub trait GeopointStore: Send + Sync {
    /// Insert a new geopoint with `available = false`, returning its id
    async fn create_unavailable(&self, fields: &NewGeoPoint) -> Result<i64>;

    /// Flip `available` to true. `false` if the id is unknown or already available.
    async fn enable(&self, id: i64) -> Result<bool>;

    /// Remove the geopoint. `false` if the id is unknown.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Fetch one geopoint, `Error::NotFound` if absent
    async fn get_by_id(&self, id: i64) -> Result<GeoPoint>;

    /// Every available geopoint, ascending id
    async fn list_available(&self) -> Result<Vec<GeoPoint>>;

    /// Snapshot fields of one available geopoint, `Error::NotFound` otherwise
    async fn feature_fields(&self, id: i64) -> Result<FeatureFields>;

    /// Id of the available geopoint nearest to `target` whose id is not in `excluded`
    async fn nearest_available(&self, target: Coordinates, excluded: &[i64]) -> Result<i64>;
}
