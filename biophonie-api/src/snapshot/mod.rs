//! GeoJSON snapshot of every available geopoint
//!
//! The snapshot file is what map clients download. It is kept in step with the
//! store by [`SnapshotMaintainer`]: a full rebuild at startup and after deletions,
//! a byte-level append after each enable.

pub mod geojson;
pub mod maintainer;

pub use geojson::{Feature, FeatureCollection};
pub use maintainer::{SnapshotMaintainer, SnapshotWriter};
