//! GeoJSON wire types for the snapshot
//!
//! Output is compact `serde_json` in field declaration order:
//!
//! ```text
//! {"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[<lon>,<lat>]},"properties":{"name":"<title>","id":<id>}}]}
//! ```
//!
//! Byte offsets used by the incremental append are derived from this serializer
//! at runtime ([`empty_collection_len`]), so changing a field here cannot leave a
//! stale constant behind.

use biophonie_common::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::store::FeatureFields;

/// Bytes closing the `features` array and the collection
pub const FEATURES_CLOSER: &[u8] = b"]}";

/// Tail of a collection with no features: empty array plus collection closer
pub const EMPTY_FEATURES_CLOSER: &[u8] = b"[]}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionType {
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: CollectionType,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: FeatureType,
    pub geometry: Geometry,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: GeometryType,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub name: String,
    pub id: i64,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: CollectionType::FeatureCollection,
            features,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Serialized document bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::Internal(format!("Cannot serialize feature collection: {}", e)))
    }

    /// Parse a snapshot document
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Internal(format!("Snapshot is not a valid feature collection: {}", e)))
    }
}

impl Feature {
    pub fn point(id: i64, name: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            kind: FeatureType::Feature,
            geometry: Geometry {
                kind: GeometryType::Point,
                coordinates: [longitude, latitude],
            },
            properties: Properties {
                name: name.into(),
                id,
            },
        }
    }

    pub fn id(&self) -> i64 {
        self.properties.id
    }

    /// Serialized feature bytes, as they appear inside the `features` array
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::Internal(format!("Cannot serialize feature {}: {}", self.id(), e)))
    }
}

impl From<FeatureFields> for Feature {
    fn from(fields: FeatureFields) -> Self {
        Feature::point(fields.id, fields.name, fields.longitude, fields.latitude)
    }
}

static EMPTY_COLLECTION: Lazy<Vec<u8>> = Lazy::new(|| {
    FeatureCollection::empty()
        .to_bytes()
        .expect("empty feature collection always serializes")
});

/// Bytes of a collection with no features
pub fn empty_collection_bytes() -> &'static [u8] {
    &EMPTY_COLLECTION
}

/// Byte length of a collection with no features under the current serializer
pub fn empty_collection_len() -> u64 {
    EMPTY_COLLECTION.len() as u64
}
