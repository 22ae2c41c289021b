//! Nearest available geopoint lookup

use biophonie_common::Result;
use std::sync::Arc;
use tracing::debug;

use crate::store::{Coordinates, GeopointStore};

pub struct ProximityIndex {
    store: Arc<dyn GeopointStore>,
}

impl ProximityIndex {
    pub fn new(store: Arc<dyn GeopointStore>) -> Self {
        Self { store }
    }

    /// Id of the available geopoint closest to `(latitude, longitude)`, skipping `excluded`
    ///
    /// Coordinates are validated before the store is queried. `Error::NotFound`
    /// when every available geopoint is excluded or none exists.
    pub async fn closest(&self, latitude: f64, longitude: f64, excluded: &[i64]) -> Result<i64> {
        let target = Coordinates::new(latitude, longitude)?;

        let id = self.store.nearest_available(target, excluded).await?;
        debug!(
            "Closest to ({}, {}) excluding {} ids: {}",
            latitude,
            longitude,
            excluded.len(),
            id
        );
        Ok(id)
    }
}
