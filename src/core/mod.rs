pub mod models;
pub mod notifications;
pub mod orchestrator;
pub mod scheduler;
pub mod sources;
pub mod store;

pub use models::{Item, MAX_FEED_SIZE, SourceRecord, normalize_key};
pub use notifications::{Notifications, Notifier};
pub use orchestrator::Orchestrator;
pub use scheduler::{RefreshSummary, refresh};
pub use sources::{ChannelResolver, ChannelSearch, FeedFetcher, SourceError, Sources};
pub use store::{AddOutcome, StoreError, SubscriptionStore};
