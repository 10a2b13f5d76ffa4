use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::notifications::Notifications;
use crate::core::sources::Sources;
use crate::core::store::SubscriptionStore;
use crate::ipc::ListenerPool;

/// Shared daemon state, cloned into every endpoint and connection task.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: SubscriptionStore,
    pub notifications: Notifications,
    pub sources: Sources,
    pub listeners: Arc<ListenerPool>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        sources: Sources,
        notifications: Notifications,
        listeners: Arc<ListenerPool>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: SubscriptionStore::new(),
            notifications,
            sources,
            listeners,
        }
    }
}
