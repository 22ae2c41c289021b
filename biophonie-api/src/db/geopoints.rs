//! Geopoint queries
//!
//! SQLite has no geodesic operators, so nearest-neighbour ordering uses the
//! squared planar distance in degrees, ties broken by ascending id.

use async_trait::async_trait;
use biophonie_common::db::{GeoPoint, NewGeoPoint};
use biophonie_common::{Error, Result};
use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::store::{Coordinates, FeatureFields, GeopointStore};

/// [`GeopointStore`] backed by the `geopoints` table
#[derive(Clone)]
pub struct SqliteGeopointStore {
    pool: SqlitePool,
}

impl SqliteGeopointStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl GeopointStore for SqliteGeopointStore {
    async fn create_unavailable(&self, fields: &NewGeoPoint) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO geopoints (title, user_id, latitude, longitude, created_on, amplitudes, picture, sound, available)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(&fields.title)
        .bind(fields.user_id)
        .bind(fields.latitude)
        .bind(fields.longitude)
        .bind(fields.created_on)
        .bind(Json(&fields.amplitudes))
        .bind(&fields.picture)
        .bind(&fields.sound)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn enable(&self, id: i64) -> Result<bool> {
        // The `available = 0` guard makes Pending -> Available the only accepted transition
        let result = sqlx::query("UPDATE geopoints SET available = 1 WHERE id = ? AND available = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM geopoints WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get_by_id(&self, id: i64) -> Result<GeoPoint> {
        sqlx::query_as::<_, GeoPoint>(
            r#"
            SELECT id, title, user_id, latitude, longitude, created_on, amplitudes, picture, sound, available
            FROM geopoints
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("geopoint {}", id)))
    }

    async fn list_available(&self) -> Result<Vec<GeoPoint>> {
        let points = sqlx::query_as::<_, GeoPoint>(
            r#"
            SELECT id, title, user_id, latitude, longitude, created_on, amplitudes, picture, sound, available
            FROM geopoints
            WHERE available = 1
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(points)
    }

    async fn feature_fields(&self, id: i64) -> Result<FeatureFields> {
        sqlx::query_as::<_, FeatureFields>(
            r#"
            SELECT id, title AS name, longitude, latitude
            FROM geopoints
            WHERE id = ? AND available = 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("available geopoint {}", id)))
    }

    async fn nearest_available(&self, target: Coordinates, excluded: &[i64]) -> Result<i64> {
        let excluded = serde_json::to_string(excluded)
            .map_err(|e| Error::Internal(format!("Cannot encode excluded ids: {}", e)))?;

        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM geopoints
            WHERE available = 1
              AND id NOT IN (SELECT value FROM json_each(?1))
            ORDER BY (longitude - ?2) * (longitude - ?2) + (latitude - ?3) * (latitude - ?3) ASC,
                     id ASC
            LIMIT 1
            "#,
        )
        .bind(excluded)
        .bind(target.longitude())
        .bind(target.latitude())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("no available geopoint left".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biophonie_common::db::init_memory_database;
    use chrono::Utc;

    async fn setup_store() -> SqliteGeopointStore {
        let pool = init_memory_database().await.expect("in-memory database");
        sqlx::query("INSERT INTO accounts (name, token_hash) VALUES ('alice', 'hash')")
            .execute(&pool)
            .await
            .unwrap();
        SqliteGeopointStore::new(pool)
    }

    fn new_point(title: &str, latitude: f64, longitude: f64) -> NewGeoPoint {
        NewGeoPoint {
            title: title.to_string(),
            user_id: 1,
            latitude,
            longitude,
            created_on: Utc::now(),
            amplitudes: vec![0.0, 0.5, 1.0],
            picture: format!("{}.webp", title),
            sound: format!("{}.aac", title),
        }
    }

    #[tokio::test]
    async fn test_create_starts_unavailable() {
        let store = setup_store().await;
        let id = store.create_unavailable(&new_point("Forest", 1.0, 1.2)).await.unwrap();

        let point = store.get_by_id(id).await.unwrap();
        assert!(!point.available);
        assert_eq!(point.amplitudes, vec![0.0, 0.5, 1.0]);
        assert!(store.list_available().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enable_only_once() {
        let store = setup_store().await;
        let id = store.create_unavailable(&new_point("Forest", 1.0, 1.2)).await.unwrap();

        assert!(store.enable(id).await.unwrap());
        assert!(!store.enable(id).await.unwrap(), "second enable must be refused");
        assert!(!store.enable(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_feature_fields_requires_available() {
        let store = setup_store().await;
        let id = store.create_unavailable(&new_point("Forest", 1.0, 1.2)).await.unwrap();

        assert!(matches!(store.feature_fields(id).await, Err(Error::NotFound(_))));

        store.enable(id).await.unwrap();
        let fields = store.feature_fields(id).await.unwrap();
        assert_eq!(fields.name, "Forest");
        assert_eq!(fields.longitude, 1.2);
        assert_eq!(fields.latitude, 1.0);
    }

    #[tokio::test]
    async fn test_deleted_ids_are_not_reused() {
        let store = setup_store().await;
        let first = store.create_unavailable(&new_point("First", 1.0, 1.0)).await.unwrap();
        assert!(store.delete(first).await.unwrap());
        assert!(!store.delete(first).await.unwrap());

        let second = store.create_unavailable(&new_point("Second", 1.0, 1.0)).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_nearest_with_exclusions() {
        let store = setup_store().await;
        let a = store.create_unavailable(&new_point("A", 1.0, 1.1)).await.unwrap();
        let b = store.create_unavailable(&new_point("B", 2.0, 2.1)).await.unwrap();
        let hidden = store.create_unavailable(&new_point("Hidden", 1.0, 1.1)).await.unwrap();
        store.enable(a).await.unwrap();
        store.enable(b).await.unwrap();

        let target = Coordinates::new(1.0, 1.1).unwrap();
        assert_eq!(store.nearest_available(target, &[]).await.unwrap(), a);
        assert_eq!(store.nearest_available(target, &[a]).await.unwrap(), b);
        assert!(matches!(
            store.nearest_available(target, &[a, b]).await,
            Err(Error::NotFound(_))
        ));
        assert_ne!(store.nearest_available(target, &[]).await.unwrap(), hidden);
    }
}
