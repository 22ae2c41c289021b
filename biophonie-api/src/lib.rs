//! biophonie-api library - geopoint soundscape service
//!
//! Users submit geopoints, admins enable or delete them, and every available
//! geopoint is published in a GeoJSON snapshot file that map clients download.

use axum::Router;
use biophonie_common::config::GeopointLimits;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

pub mod api;
pub mod availability;
pub mod db;
pub mod proximity;
pub mod snapshot;
pub mod store;

use availability::GeopointLifecycle;
use db::SqliteGeopointStore;
use proximity::ProximityIndex;
use snapshot::SnapshotMaintainer;
use store::GeopointStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (accounts)
    pub db: SqlitePool,
    pub store: Arc<dyn GeopointStore>,
    pub snapshot: Arc<SnapshotMaintainer>,
    pub lifecycle: Arc<GeopointLifecycle>,
    pub proximity: Arc<ProximityIndex>,
    pub snapshot_path: PathBuf,
    pub assets_folder: PathBuf,
}

impl AppState {
    /// Wire the store, snapshot maintainer, lifecycle and proximity index together
    pub fn new(
        db: SqlitePool,
        snapshot_path: PathBuf,
        assets_folder: PathBuf,
        limits: GeopointLimits,
    ) -> Self {
        let store: Arc<dyn GeopointStore> = Arc::new(SqliteGeopointStore::new(db.clone()));
        let snapshot = Arc::new(SnapshotMaintainer::new(snapshot_path.clone(), store.clone()));
        let lifecycle = Arc::new(GeopointLifecycle::new(store.clone(), snapshot.clone(), limits));
        let proximity = Arc::new(ProximityIndex::new(store.clone()));

        Self {
            db,
            store,
            snapshot,
            lifecycle,
            proximity,
            snapshot_path,
            assets_folder,
        }
    }
}

/// Build application router
///
/// Everything lives under `/api/v1` except `/health`.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, patch, post};
    use tower_http::cors::CorsLayer;
    use tower_http::services::{ServeDir, ServeFile};
    use tower_http::trace::TraceLayer;

    // Admin-only routes
    let admin = Router::new()
        .route(
            "/restricted/geopoint/:id",
            get(api::get_restricted_geopoint).delete(api::delete_geopoint),
        )
        .route("/restricted/geopoint/:id/enable", patch(api::enable_geopoint))
        .route("/restricted/user/:id", patch(api::make_user_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_admin,
        ));

    // Any authenticated account
    let user = Router::new()
        .route("/restricted/geopoint", post(api::create_geopoint))
        .route("/restricted/ping", get(api::ping))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_user,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/ping", get(api::ping))
        .route("/user/:name", get(api::get_user))
        .route("/geopoint/:id", get(api::get_geopoint))
        .route("/geopoint/:id/assets", get(api::get_geopoint_assets))
        .route(
            "/geopoint/closest/to/:latitude/:longitude",
            get(api::closest_geopoint),
        )
        .route_service("/geojson", ServeFile::new(&state.snapshot_path))
        .nest_service("/assets", ServeDir::new(&state.assets_folder));

    let v1 = Router::new().merge(admin).merge(user).merge(public);

    Router::new()
        .nest("/api/v1", v1)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
