//! Item Store Trait
//!
//! The persistence seam. The engine is agnostic to how items are fetched or
//! stored; callers hand [`ScheduleOps`](crate::operations::ScheduleOps) any
//! `ItemStore` implementation and the wrapper drives it one write at a time.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{WbsItem, WbsItemUpdate};

/// Store-level failures
#[derive(Error, Debug)]
pub enum StoreError {
    /// The id is unknown to the store
    #[error("Item not found in store: {id}")]
    NotFound { id: String },

    /// Backend-specific failure (network, database, serialization)
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Per-write options supplied by the integration layer.
///
/// `skip_auto_schedule` tells a store with reactive scheduling hooks not to
/// cascade a re-schedule for this write; bulk structural passes set it on
/// every intermediate row and defer the cascade to a single pass at the end.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    pub skip_auto_schedule: bool,
}

impl UpdateOptions {
    /// Options for a bulk structural write with the cascade deferred
    pub fn deferred() -> Self {
        Self {
            skip_auto_schedule: true,
        }
    }
}

/// Asynchronous persistence callback surface for WBS items.
///
/// Implementations apply each call independently; nothing here is assumed
/// to be transactional across calls.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Snapshot of every item in the project
    async fn fetch_all(&self) -> Result<Vec<WbsItem>, StoreError>;

    /// Fetch one item by id
    async fn get_item(&self, id: &str) -> Result<Option<WbsItem>, StoreError>;

    /// Persist a new item
    async fn insert_item(&self, item: WbsItem) -> Result<(), StoreError>;

    /// Apply a partial update to one item
    async fn update_item(
        &self,
        id: &str,
        update: WbsItemUpdate,
        options: UpdateOptions,
    ) -> Result<(), StoreError>;

    /// Remove one item
    async fn delete_item(&self, id: &str) -> Result<(), StoreError>;
}

/// In-memory store for operations tests.
///
/// Applies writes immediately and keeps a log of them, plus a sticky flag
/// that trips if any write ever leaves two items sharing a non-empty
/// `wbs_id`. Tests use the flag to assert the no-transient-collision
/// ordering guarantees on the actual write sequence.
#[cfg(test)]
pub(crate) struct MemoryStore {
    inner: std::sync::Mutex<MemoryInner>,
}

#[cfg(test)]
struct MemoryInner {
    items: Vec<WbsItem>,
    write_log: Vec<String>,
    duplicate_seen: bool,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new(items: Vec<WbsItem>) -> Self {
        Self {
            inner: std::sync::Mutex::new(MemoryInner {
                items,
                write_log: Vec::new(),
                duplicate_seen: false,
            }),
        }
    }

    /// Ordered log of every mutating call, as "op:id" entries
    pub fn write_log(&self) -> Vec<String> {
        self.inner.lock().unwrap().write_log.clone()
    }

    /// Whether any intermediate state held a duplicate `wbs_id`
    pub fn saw_duplicate_wbs_id(&self) -> bool {
        self.inner.lock().unwrap().duplicate_seen
    }

    pub fn items(&self) -> Vec<WbsItem> {
        self.inner.lock().unwrap().items.clone()
    }
}

#[cfg(test)]
impl MemoryInner {
    fn check_uniqueness(&mut self) {
        let mut seen = std::collections::HashSet::new();
        for item in &self.items {
            if !item.wbs_id.is_empty() && !seen.insert(item.wbs_id.as_str()) {
                self.duplicate_seen = true;
            }
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ItemStore for MemoryStore {
    async fn fetch_all(&self) -> Result<Vec<WbsItem>, StoreError> {
        Ok(self.inner.lock().unwrap().items.clone())
    }

    async fn get_item(&self, id: &str) -> Result<Option<WbsItem>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn insert_item(&self, item: WbsItem) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_log.push(format!("insert:{}", item.id));
        inner.items.push(item);
        inner.check_uniqueness();
        Ok(())
    }

    async fn update_item(
        &self,
        id: &str,
        update: WbsItemUpdate,
        _options: UpdateOptions,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let item = inner
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        item.apply_update(&update);
        inner.write_log.push(format!("update:{}", id));
        inner.check_uniqueness();
        Ok(())
    }

    async fn delete_item(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.items.len();
        inner.items.retain(|i| i.id != id);
        if inner.items.len() == before {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        inner.write_log.push(format!("delete:{}", id));
        Ok(())
    }
}
