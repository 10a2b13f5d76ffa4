//! In-memory collaborators for `--simulation` runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::core::models::{Item, MAX_FEED_SIZE, SourceRecord, normalize_key};
use crate::core::notifications::Notifier;
use crate::core::sources::{ChannelResolver, ChannelSearch, FeedFetcher, SourceError};

const ADDRESS_BASE: &str = "sim://feed/";
const PAGE_BASE: &str = "sim://channel/";

#[derive(Default)]
struct SimulatedChannel {
    items: Vec<Item>,
    unreachable: bool,
}

/// Programmable set of channels served without touching the network.
///
/// Clones share state, so a test keeps one handle as the controller while
/// the daemon uses another.
#[derive(Clone, Default)]
pub struct SimulatedSource {
    channels: Arc<Mutex<HashMap<String, SimulatedChannel>>>,
    fetches: Arc<AtomicUsize>,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the feed of `name` with `items` (newest first).
    pub fn publish(&self, name: &str, items: Vec<Item>) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.entry(normalize_key(name)).or_default().items = items;
    }

    /// Put a new upload at the top of `name`'s feed.
    pub fn upload(&self, name: &str, item: Item) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels
            .entry(normalize_key(name))
            .or_default()
            .items
            .insert(0, item);
    }

    /// Make fetches of `name` fail until reset.
    pub fn set_unreachable(&self, name: &str, unreachable: bool) {
        let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        channels.entry(normalize_key(name)).or_default().unreachable = unreachable;
    }

    /// Number of feed fetches served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn address_of(name: &str) -> String {
        format!("{}{}", ADDRESS_BASE, normalize_key(name))
    }
}

#[async_trait]
impl ChannelResolver for SimulatedSource {
    async fn resolve(&self, name: &str) -> Result<String, SourceError> {
        let name = name.replace('\n', "");
        if name.is_empty() {
            return Err(SourceError::EmptyName);
        }
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        if channels.contains_key(&normalize_key(&name)) {
            Ok(Self::address_of(&name))
        } else {
            Err(SourceError::NotFound(name))
        }
    }
}

#[async_trait]
impl FeedFetcher for SimulatedSource {
    async fn fetch(&self, name: &str, address: &str) -> Result<SourceRecord, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let key = address.strip_prefix(ADDRESS_BASE).unwrap_or(address);
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let channel = channels
            .get(key)
            .ok_or_else(|| SourceError::NotFound(name.to_string()))?;
        if channel.unreachable {
            return Err(SourceError::MalformedFeed {
                address: address.to_string(),
                reason: "simulated outage".to_string(),
            });
        }

        Ok(SourceRecord {
            name: name.to_string(),
            address: address.to_string(),
            page_url: format!("{}{}", PAGE_BASE, key),
            items: channel.items.iter().take(MAX_FEED_SIZE).cloned().collect(),
        })
    }
}

#[async_trait]
impl ChannelSearch for SimulatedSource {
    async fn search(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let needle = normalize_key(query);
        let channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let mut found: Vec<String> = channels
            .keys()
            .filter(|key| key.contains(&needle))
            .cloned()
            .collect();
        found.sort();
        Ok(found)
    }
}

/// Notifier that remembers which item ids it was asked to announce.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    fail_after: Option<usize>,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed `successes` times, then fail every call.
    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::default()
        }
    }

    /// Sleep for `delay` inside every call.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, _source: &str, item: &Item) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_after.is_some_and(|n| attempt >= n) {
            bail!("simulated notifier failure");
        }
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(item.id.clone());
        Ok(())
    }
}
