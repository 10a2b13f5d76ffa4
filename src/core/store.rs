//! In-memory subscription store.
//!
//! Holds the authoritative set of subscribed sources behind a single
//! reader/writer lock. Nothing here is persisted; the store lives exactly as
//! long as the daemon process.
//!
//! Repeat adds and refreshes go through the same merge: new items are the
//! prefix of the incoming list that precedes the previously newest item.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use super::models::{Item, MAX_FEED_SIZE, SourceRecord, normalize_key};
use super::notifications::Notifications;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("channel with no videos")]
    EmptyFeed,

    #[error("not subscribed to channel '{0}'")]
    NotSubscribed(String),
}

/// What an accepted `add` did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The key was new (or held no items) and the record was inserted.
    Inserted,
    /// An existing record had `new_items` items prepended.
    Merged { new_items: usize },
}

/// Thread-safe map of normalized source key to record.
///
/// Cloning is cheap and every clone shares the same map, so the store is
/// handed to tasks through `AppContext`.
#[derive(Clone, Default)]
pub struct SubscriptionStore {
    inner: Arc<RwLock<HashMap<String, SourceRecord>>>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `incoming` under `name`, or merge its items into the existing
    /// record.
    ///
    /// Alerts for new items are raised while the write lock is held, so a
    /// slow notifier stalls every other store access until it returns.
    pub async fn add(
        &self,
        name: &str,
        mut incoming: SourceRecord,
        notifications: &Notifications,
    ) -> Result<AddOutcome, StoreError> {
        if incoming.items.is_empty() {
            return Err(StoreError::EmptyFeed);
        }

        let key = normalize_key(name);
        let mut map = self.inner.write().await;

        match map.get_mut(&key) {
            Some(existing) if !existing.items.is_empty() => {
                let latest = &existing.items[0].id;
                let i = match incoming.items.iter().position(|item| &item.id == latest) {
                    Some(i) => i,
                    None => {
                        // Previously newest item fell out of the fetched list;
                        // the update is dropped.
                        debug!(source = %key, latest = %latest, "No overlap with stored items");
                        0
                    }
                };

                if i > 0 && notifications.is_enabled() {
                    notifications.announce(&key, &incoming.items[..i]).await;
                }

                let mut merged: Vec<Item> = incoming.items.drain(..i).collect();
                merged.extend(existing.items.iter().take(MAX_FEED_SIZE).cloned());
                merged.truncate(MAX_FEED_SIZE);
                existing.items = merged;

                Ok(AddOutcome::Merged { new_items: i })
            }
            _ => {
                incoming.items.truncate(MAX_FEED_SIZE);
                map.insert(key, incoming);
                Ok(AddOutcome::Inserted)
            }
        }
    }

    pub async fn get(&self, name: &str) -> Result<SourceRecord, StoreError> {
        let key = normalize_key(name);
        let map = self.inner.read().await;
        map.get(&key)
            .cloned()
            .ok_or(StoreError::NotSubscribed(key))
    }

    /// Drop the record for `name`. Returns whether anything was removed.
    pub async fn remove(&self, name: &str) -> bool {
        let key = normalize_key(name);
        let mut map = self.inner.write().await;
        map.remove(&key).is_some()
    }

    /// Snapshot of every record, in no particular order.
    pub async fn list(&self) -> Vec<SourceRecord> {
        let map = self.inner.read().await;
        map.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}
