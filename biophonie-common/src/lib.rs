//! # Biophonie Common Library
//!
//! Shared code for the Biophonie soundscape service:
//! - Error type shared by the store and service layers
//! - Configuration loading (CLI/env/TOML/defaults)
//! - Database initialization and row models
//! - API token hashing

pub mod auth;
pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
