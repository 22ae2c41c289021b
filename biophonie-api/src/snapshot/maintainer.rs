//! Snapshot maintenance
//!
//! Two strategies keep the snapshot file equal to the set of available geopoints:
//!
//! - **Full refresh**: list every available geopoint (ascending id), serialize the
//!   whole collection to a temporary file next to the snapshot and rename it over
//!   the live path. Readers see either the old or the new document.
//! - **Incremental append**: serialize one feature and patch it in place over the
//!   closing `]}` (or `[]}` when the collection is empty). The file only grows.
//!   This write is not atomic for readers: one that opens the file mid-patch can
//!   get a document cut off after the new feature, without the closing `]}`.
//!
//! The offset arithmetic of the append is only correct with a single writer, so
//! every entry point goes through one [`tokio::sync::Mutex`]. Callers that need
//! a store mutation and the matching file update to be atomic with respect to
//! other snapshot writers hold a [`SnapshotWriter`] across both.
//!
//! Nothing here retries. The store and the file may diverge after a failed
//! append until the next full refresh.

use biophonie_common::{Error, Result};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use super::geojson::{
    empty_collection_len, Feature, FeatureCollection, EMPTY_FEATURES_CLOSER, FEATURES_CLOSER,
};
use crate::store::{FeatureFields, GeopointStore};

/// Owner of the snapshot file
pub struct SnapshotMaintainer {
    path: PathBuf,
    store: Arc<dyn GeopointStore>,
    lock: Mutex<()>,
}

/// Exclusive access to the snapshot file
///
/// Dropping the writer releases the lock.
pub struct SnapshotWriter<'a> {
    maintainer: &'a SnapshotMaintainer,
    _guard: MutexGuard<'a, ()>,
}

impl SnapshotMaintainer {
    pub fn new(path: impl Into<PathBuf>, store: Arc<dyn GeopointStore>) -> Self {
        Self {
            path: path.into(),
            store,
            lock: Mutex::new(()),
        }
    }

    /// Live snapshot path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for exclusive access to the snapshot
    pub async fn lock(&self) -> SnapshotWriter<'_> {
        let guard = self.lock.lock().await;
        SnapshotWriter {
            maintainer: self,
            _guard: guard,
        }
    }

    /// Rebuild the snapshot from the store. Returns the number of features written.
    pub async fn full_refresh(&self) -> Result<usize> {
        self.lock().await.full_refresh().await
    }

    /// Patch one available geopoint into the snapshot
    pub async fn incremental_append(&self, id: i64) -> Result<()> {
        self.lock().await.incremental_append(id).await
    }
}

impl SnapshotWriter<'_> {
    pub async fn full_refresh(&self) -> Result<usize> {
        let path = &self.maintainer.path;
        let points = self.maintainer.store.list_available().await?;

        let features: Vec<Feature> = points
            .iter()
            .map(|point| Feature::from(FeatureFields::from(point)))
            .collect();
        let count = features.len();
        let bytes = FeatureCollection::new(features).to_bytes()?;

        write_atomically(path, &bytes).await?;

        info!(
            "Snapshot refreshed: {} features, {} bytes ({})",
            count,
            bytes.len(),
            path.display()
        );
        Ok(count)
    }

    pub async fn incremental_append(&self, id: i64) -> Result<()> {
        let path = &self.maintainer.path;
        let fields = self.maintainer.store.feature_fields(id).await?;
        let feature = Feature::from(fields).to_bytes()?;

        let mut file = OpenOptions::new().read(true).write(true).open(path).await?;
        let len = file.metadata().await?.len();
        let empty_len = empty_collection_len();

        let (offset, expected_tail, separator): (u64, &[u8], &[u8]) = if len == empty_len {
            (len - EMPTY_FEATURES_CLOSER.len() as u64, EMPTY_FEATURES_CLOSER, b"[".as_slice())
        } else if len > empty_len {
            (len - FEATURES_CLOSER.len() as u64, FEATURES_CLOSER, b",".as_slice())
        } else {
            return Err(Error::Internal(format!(
                "Snapshot {} is shorter than an empty collection ({} bytes)",
                path.display(),
                len
            )));
        };

        let mut tail = vec![0u8; expected_tail.len()];
        file.seek(SeekFrom::Start(offset)).await?;
        file.read_exact(&mut tail).await?;
        if tail != expected_tail {
            return Err(Error::Internal(format!(
                "Snapshot {} does not end with {:?}, refusing to patch",
                path.display(),
                String::from_utf8_lossy(expected_tail)
            )));
        }

        let mut patch =
            Vec::with_capacity(separator.len() + feature.len() + FEATURES_CLOSER.len());
        patch.extend_from_slice(separator);
        patch.extend_from_slice(&feature);
        patch.extend_from_slice(FEATURES_CLOSER);

        file.seek(SeekFrom::Start(offset)).await?;
        file.write_all(&patch).await?;
        file.flush().await?;
        file.sync_data().await?;

        debug!(
            "Appended geopoint {} to snapshot at offset {} ({} bytes)",
            id,
            offset,
            patch.len()
        );
        Ok(())
    }
}

/// Write `bytes` to a sibling temporary file, then rename it over `path`
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("Snapshot path has no file name: {}", path.display())))?;
    let tmp_path = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    let result: std::io::Result<()> = async {
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }

    Ok(())
}
