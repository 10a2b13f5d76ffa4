use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info};

use crate::context::AppContext;
use crate::core::scheduler;
use crate::ipc::endpoints;

pub struct Orchestrator {
    ctx: AppContext,
}

impl Orchestrator {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Start background work and serve every endpoint.
    ///
    /// Returns once the blocking endpoint's listener is closed.
    pub async fn start(&self) -> Result<()> {
        info!("Feed daemon starting");

        self.spawn_subscriptions();
        scheduler::spawn_refresh_timer(self.ctx.clone(), self.ctx.config.refresh_delay());

        for endpoint in endpoints(&self.ctx.config) {
            let result = endpoint.serve(self.ctx.clone()).await;
            match result {
                Err(e) if endpoint.blocking => return Err(e),
                Err(e) => error!(
                    endpoint = endpoint.operation.name(),
                    error = %format!("{:#}", e),
                    "Endpoint unavailable"
                ),
                Ok(()) => {}
            }
        }

        Ok(())
    }

    /// Close every listener and exit on SIGINT or SIGTERM.
    pub fn spawn_signal_handler(&self) -> Result<()> {
        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        let listeners = self.ctx.listeners.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
            info!("Shutdown signal received");
            listeners.close_all();
            std::process::exit(0);
        });

        Ok(())
    }

    fn spawn_subscriptions(&self) {
        let Some(path) = self.ctx.config.subs_file.clone() else {
            info!("No subscriptions file provided");
            return;
        };

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            match scheduler::subscribe_from_file(&ctx, &path).await {
                Ok(stored) => info!(stored, path = %path.display(), "Subscriptions loaded"),
                Err(e) => error!(error = %format!("{:#}", e), "Failed to load subscriptions"),
            }
        });
    }
}
