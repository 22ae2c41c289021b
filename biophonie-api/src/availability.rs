//! Geopoint visibility lifecycle
//!
//! ```text
//! create ──> Pending ──enable──> Available
//!               │                    │
//!               └──────delete────────┴──> Deleted (record purged)
//! ```
//!
//! There is no way back from `Available` to `Pending`. An enable that does not
//! apply (unknown id or already available) is reported as a single NotFound.
//!
//! [`GeopointLifecycle`] commits each transition to the store and then brings the
//! snapshot up to date while holding the snapshot lock, so a refresh triggered by
//! another request can never interleave between the two steps. A snapshot failure
//! is logged and reported in the outcome; the committed transition stays.

use biophonie_common::config::GeopointLimits;
use biophonie_common::db::{GeoPoint, NewGeoPoint};
use biophonie_common::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::snapshot::SnapshotMaintainer;
use crate::store::{Coordinates, GeopointStore};

/// Visibility state of a geopoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Availability {
    /// Created, visible to admins only
    Pending,
    /// Visible to everyone and present in the snapshot
    Available,
    /// Purged from the store and the snapshot
    Deleted,
}

impl Availability {
    pub fn of(point: &GeoPoint) -> Self {
        if point.available {
            Availability::Available
        } else {
            Availability::Pending
        }
    }

    /// `Pending -> Available`
    pub fn enable(self) -> Result<Self> {
        match self {
            Availability::Pending => Ok(Availability::Available),
            Availability::Available | Availability::Deleted => Err(not_found_or_enabled()),
        }
    }

    /// `Pending | Available -> Deleted`
    pub fn delete(self) -> Result<Self> {
        match self {
            Availability::Pending | Availability::Available => Ok(Availability::Deleted),
            Availability::Deleted => Err(Error::NotFound("not found or already deleted".to_string())),
        }
    }

    /// Whether a caller without admin rights may read the geopoint
    pub fn is_public(self) -> bool {
        self == Availability::Available
    }
}

fn not_found_or_enabled() -> Error {
    Error::NotFound("not found or already enabled".to_string())
}

/// Result of a committed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub state: Availability,
    /// False when the snapshot could not be updated and now lags the store
    pub snapshot_synced: bool,
}

/// Validate a submission against the configured limits
///
/// `now` is passed in so the future-date bound can be checked deterministically.
pub fn validate_submission(
    fields: &NewGeoPoint,
    limits: &GeopointLimits,
    now: DateTime<Utc>,
) -> Result<()> {
    let title_len = fields.title.chars().count();
    if title_len < limits.title_min_len {
        return Err(Error::InvalidInput(format!(
            "title must be at least {} characters",
            limits.title_min_len
        )));
    }
    if title_len > limits.title_max_len {
        return Err(Error::InvalidInput(format!(
            "title cannot be longer than {} characters",
            limits.title_max_len
        )));
    }

    Coordinates::new(fields.latitude, fields.longitude)?;

    let amplitudes = fields.amplitudes.len();
    if amplitudes < limits.amplitudes_min_len || amplitudes > limits.amplitudes_max_len {
        return Err(Error::InvalidInput(format!(
            "amplitudes must contain between {} and {} samples, got {}",
            limits.amplitudes_min_len, limits.amplitudes_max_len, amplitudes
        )));
    }
    if fields.amplitudes.iter().any(|a| !a.is_finite()) {
        return Err(Error::InvalidInput("amplitudes must be finite numbers".to_string()));
    }

    if fields.created_on > now + Duration::seconds(limits.max_future_secs) {
        return Err(Error::InvalidInput("date cannot be in the future".to_string()));
    }

    Ok(())
}

/// Drives create/enable/delete and keeps the snapshot in step
pub struct GeopointLifecycle {
    store: Arc<dyn GeopointStore>,
    snapshot: Arc<SnapshotMaintainer>,
    limits: GeopointLimits,
}

impl GeopointLifecycle {
    pub fn new(
        store: Arc<dyn GeopointStore>,
        snapshot: Arc<SnapshotMaintainer>,
        limits: GeopointLimits,
    ) -> Self {
        Self {
            store,
            snapshot,
            limits,
        }
    }

    pub fn limits(&self) -> &GeopointLimits {
        &self.limits
    }

    /// Validate and store a new geopoint in the `Pending` state
    pub async fn create(&self, fields: NewGeoPoint) -> Result<GeoPoint> {
        validate_submission(&fields, &self.limits, Utc::now())?;

        let id = self.store.create_unavailable(&fields).await?;
        info!("Geopoint {} created by account {} (pending)", id, fields.user_id);

        self.store.get_by_id(id).await
    }

    /// `Pending -> Available`, then append the feature to the snapshot
    pub async fn enable(&self, id: i64) -> Result<TransitionOutcome> {
        let writer = self.snapshot.lock().await;

        if !self.store.enable(id).await? {
            return Err(not_found_or_enabled());
        }
        let state = Availability::Pending.enable()?;
        info!("Geopoint {} enabled", id);

        let snapshot_synced = match writer.incremental_append(id).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Geopoint {} enabled but snapshot append failed, snapshot lags until next refresh: {}",
                    id, e
                );
                false
            }
        };

        Ok(TransitionOutcome {
            state,
            snapshot_synced,
        })
    }

    /// `Pending | Available -> Deleted`, then rebuild the snapshot
    pub async fn delete(&self, id: i64) -> Result<TransitionOutcome> {
        let writer = self.snapshot.lock().await;

        if !self.store.delete(id).await? {
            return Err(Error::NotFound("not found or already deleted".to_string()));
        }
        info!("Geopoint {} deleted", id);

        let snapshot_synced = match writer.full_refresh().await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    "Geopoint {} deleted but snapshot refresh failed, snapshot lags until next refresh: {}",
                    id, e
                );
                false
            }
        };

        Ok(TransitionOutcome {
            state: Availability::Deleted,
            snapshot_synced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteGeopointStore;
    use crate::snapshot::FeatureCollection;
    use biophonie_common::db::init_memory_database;
    use tempfile::TempDir;

    #[test]
    fn test_transitions() {
        assert_eq!(Availability::Pending.enable().unwrap(), Availability::Available);
        assert!(matches!(Availability::Available.enable(), Err(Error::NotFound(_))));
        assert_eq!(Availability::Pending.delete().unwrap(), Availability::Deleted);
        assert_eq!(Availability::Available.delete().unwrap(), Availability::Deleted);
        assert!(Availability::Deleted.delete().is_err());
        assert!(Availability::Deleted.enable().is_err());
    }

    fn submission() -> NewGeoPoint {
        NewGeoPoint {
            title: "Forest by night".to_string(),
            user_id: 1,
            latitude: 1.0,
            longitude: 1.2,
            created_on: Utc::now(),
            amplitudes: vec![0.5; 100],
            picture: "clearing.webp".to_string(),
            sound: "merle.aac".to_string(),
        }
    }

    #[test]
    fn test_validate_submission() {
        let limits = GeopointLimits::default();
        let now = Utc::now();
        assert!(validate_submission(&submission(), &limits, now).is_ok());

        let cases: Vec<Box<dyn Fn(&mut NewGeoPoint)>> = vec![
            Box::new(|p| p.title = "Fo".to_string()),
            Box::new(|p| p.title = "Forest by night very late at night".to_string()),
            Box::new(|p| {
                p.latitude = 100000001.0;
                p.longitude = 1000000000.2;
            }),
            Box::new(|p| p.created_on = Utc::now() + Duration::hours(200000)),
            Box::new(|p| p.amplitudes = vec![0.5]),
            Box::new(|p| p.amplitudes = vec![0.5; 1001]),
            Box::new(|p| p.amplitudes[3] = f64::NAN),
        ];

        for mutate in cases {
            let mut point = submission();
            mutate(&mut point);
            assert!(
                matches!(validate_submission(&point, &limits, now), Err(Error::InvalidInput(_))),
                "expected rejection for {:?}",
                point.title
            );
        }
    }

    #[test]
    fn test_title_length_counts_characters() {
        let limits = GeopointLimits::default();
        let mut point = submission();
        point.title = "Forêt à l'aube".to_string();
        assert!(validate_submission(&point, &limits, Utc::now()).is_ok());
    }

    async fn setup() -> (TempDir, GeopointLifecycle, Arc<SnapshotMaintainer>) {
        let dir = TempDir::new().unwrap();
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO accounts (name, token_hash) VALUES ('alice', 'hash')")
            .execute(&pool)
            .await
            .unwrap();
        let store: Arc<dyn GeopointStore> = Arc::new(SqliteGeopointStore::new(pool));
        let snapshot = Arc::new(SnapshotMaintainer::new(dir.path().join("geojson.json"), store.clone()));
        snapshot.full_refresh().await.unwrap();
        let lifecycle = GeopointLifecycle::new(store, snapshot.clone(), GeopointLimits::default());
        (dir, lifecycle, snapshot)
    }

    fn snapshot_ids(snapshot: &SnapshotMaintainer) -> Vec<i64> {
        let bytes = std::fs::read(snapshot.path()).unwrap();
        FeatureCollection::from_bytes(&bytes)
            .unwrap()
            .features
            .iter()
            .map(|f| f.id())
            .collect()
    }

    #[tokio::test]
    async fn test_create_enable_delete_flow() {
        let (_dir, lifecycle, snapshot) = setup().await;

        let point = lifecycle.create(submission()).await.unwrap();
        assert_eq!(Availability::of(&point), Availability::Pending);
        assert!(snapshot_ids(&snapshot).is_empty());

        let outcome = lifecycle.enable(point.id).await.unwrap();
        assert_eq!(outcome.state, Availability::Available);
        assert!(outcome.snapshot_synced);
        assert_eq!(snapshot_ids(&snapshot), vec![point.id]);

        let outcome = lifecycle.delete(point.id).await.unwrap();
        assert_eq!(outcome.state, Availability::Deleted);
        assert!(snapshot_ids(&snapshot).is_empty());
    }

    #[tokio::test]
    async fn test_enable_twice_is_not_found() {
        let (_dir, lifecycle, snapshot) = setup().await;
        let point = lifecycle.create(submission()).await.unwrap();

        lifecycle.enable(point.id).await.unwrap();
        assert!(matches!(lifecycle.enable(point.id).await, Err(Error::NotFound(_))));
        assert!(matches!(lifecycle.enable(9999).await, Err(Error::NotFound(_))));
        assert_eq!(snapshot_ids(&snapshot), vec![point.id]);
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let (_dir, lifecycle, _snapshot) = setup().await;
        assert!(matches!(lifecycle.delete(42).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_append_failure_keeps_enable_committed() {
        let (_dir, lifecycle, snapshot) = setup().await;
        let point = lifecycle.create(submission()).await.unwrap();

        std::fs::remove_file(snapshot.path()).unwrap();
        let outcome = lifecycle.enable(point.id).await.unwrap();
        assert!(!outcome.snapshot_synced);

        // Still enabled in the store: a second enable is refused
        assert!(lifecycle.enable(point.id).await.is_err());

        // The next refresh reconciles the file
        snapshot.full_refresh().await.unwrap();
        assert_eq!(snapshot_ids(&snapshot), vec![point.id]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enables_and_deletes_keep_snapshot_consistent() {
        let dir = TempDir::new().unwrap();
        let pool = init_memory_database().await.unwrap();
        sqlx::query("INSERT INTO accounts (name, token_hash) VALUES ('alice', 'hash')")
            .execute(&pool)
            .await
            .unwrap();
        let store: Arc<dyn GeopointStore> = Arc::new(SqliteGeopointStore::new(pool));
        let snapshot = Arc::new(SnapshotMaintainer::new(dir.path().join("geojson.json"), store.clone()));
        snapshot.full_refresh().await.unwrap();
        let lifecycle = Arc::new(GeopointLifecycle::new(
            store.clone(),
            snapshot.clone(),
            GeopointLimits::default(),
        ));

        let mut ids = Vec::new();
        for i in 0..12 {
            let mut fields = submission();
            fields.title = format!("Point {}", i);
            fields.sound = format!("point-{}.aac", i);
            fields.latitude = i as f64;
            ids.push(lifecycle.create(fields).await.unwrap().id);
        }
        let (published, pending) = ids.split_at(6);
        for id in published {
            lifecycle.enable(*id).await.unwrap();
        }

        // Appends from enables race full refreshes from deletes
        let mut tasks = tokio::task::JoinSet::new();
        for id in pending.iter().copied() {
            let lifecycle = lifecycle.clone();
            tasks.spawn(async move { lifecycle.enable(id).await });
        }
        for id in published[..3].iter().copied() {
            let lifecycle = lifecycle.clone();
            tasks.spawn(async move { lifecycle.delete(id).await });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().unwrap().snapshot_synced);
        }

        let mut in_snapshot = snapshot_ids(&snapshot);
        in_snapshot.sort_unstable();
        let expected: Vec<i64> = store
            .list_available()
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(in_snapshot, expected);
        assert_eq!(expected.len(), 9);
    }
}
