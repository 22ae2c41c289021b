//! HTTP API for biophonie-api

pub mod auth;
pub mod error;
pub mod geopoints;
pub mod health;
pub mod users;

pub use auth::{require_admin, require_user, Caller, MaybeCaller};
pub use error::ApiError;
pub use geopoints::{
    closest_geopoint, create_geopoint, delete_geopoint, enable_geopoint, get_geopoint,
    get_geopoint_assets, get_restricted_geopoint,
};
pub use health::{health_routes, ping};
pub use users::{get_user, make_user_admin};
