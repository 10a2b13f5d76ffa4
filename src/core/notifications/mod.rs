mod dunst;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::core::models::Item;

pub use dunst::DunstNotifier;

/// Trait for desktop alert implementations (dunst, etc.)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, source: &str, item: &Item) -> Result<()>;
}

/// Process-wide notification switch plus the channel it guards.
///
/// The switch starts at the configured value and is turned off for good the
/// first time the channel fails.
#[derive(Clone)]
pub struct Notifications {
    channel: Option<Arc<dyn Notifier>>,
    enabled: Arc<AtomicBool>,
}

impl Notifications {
    pub fn new(channel: Option<Arc<dyn Notifier>>) -> Self {
        let enabled = channel.is_some();
        Self {
            channel,
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Alert for each item in order, stopping at the first failure.
    ///
    /// Returns how many alerts were delivered.
    pub async fn announce(&self, source: &str, items: &[Item]) -> usize {
        let Some(channel) = self.channel.as_ref() else {
            return 0;
        };

        let mut delivered = 0;
        for item in items {
            if !self.is_enabled() {
                break;
            }
            match channel.notify(source, item).await {
                Ok(()) => {
                    debug!(source = %source, video = %item.id, "Notified new video");
                    delivered += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Notifier failed, disabling notifications");
                    self.disable();
                    break;
                }
            }
        }
        delivered
    }
}

/// Factory function to create a notifier based on config
pub fn create_notifier(config: &AppConfig) -> Option<Arc<dyn Notifier>> {
    if !config.notify {
        return None;
    }
    Some(Arc::new(DunstNotifier::new()))
}
