//! Database access layer for biophonie-api
//!
//! - `geopoints`: SQLite implementation of [`crate::store::GeopointStore`]
//! - `accounts`: account lookup for the authentication middleware

pub mod accounts;
pub mod geopoints;

pub use geopoints::SqliteGeopointStore;
