//! In-memory object store.
//!
//! Holds whole objects in a map. Primarily a test double for the download
//! engine, but usable anywhere the engine should run without a network.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ObjectMeta, ObjectStore, StoreError};

/// Object store backed by an in-memory map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts (or replaces) an object.
    pub fn put(&self, path: impl Into<String>, data: impl Into<Bytes>) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(path.into(), data.into());
    }

    /// Removes an object, returning whether it existed.
    pub fn delete(&self, path: &str) -> bool {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.remove(path).is_some()
    }

    fn object(&self, path: &str) -> Result<Bytes, StoreError> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::not_found(path))
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        let data = self.object(path)?;
        Ok(ObjectMeta {
            size: data.len() as u64,
        })
    }

    async fn get_range(&self, path: &str, range: Range<u64>) -> Result<Bytes, StoreError> {
        let data = self.object(path)?;
        let len = data.len() as u64;

        // Clamp the end past EOF; reject a start past EOF.
        let end = range.end.min(len);
        if range.start > end {
            return Err(StoreError::invalid_range(
                path,
                format!("start {} beyond object end {len}", range.start),
            ));
        }

        Ok(data.slice(range.start as usize..end as usize))
    }
}
