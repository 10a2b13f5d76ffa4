//! Store-wide refreshes and bulk subscription.
//!
//! Every source is fetched in its own task with no concurrency bound. A
//! failing source is logged and skipped; it never affects its siblings.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

use crate::context::AppContext;
use crate::core::store::AddOutcome;

/// Tally of one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub sources: usize,
    pub failed: usize,
    pub new_items: usize,
}

/// Re-fetch every subscribed source from its stored address and merge the
/// results back. Waits for all sources to finish.
pub async fn refresh(ctx: &AppContext) -> RefreshSummary {
    let records = ctx.store.list().await;
    let mut summary = RefreshSummary {
        sources: records.len(),
        ..Default::default()
    };

    let mut tasks = JoinSet::new();
    for record in records {
        let ctx = ctx.clone();
        tasks.spawn(async move {
            let fetched = ctx
                .sources
                .fetcher
                .fetch(&record.name, &record.address)
                .await
                .with_context(|| format!("failed to fetch '{}' for refresh", record.name))?;

            ctx.store
                .add(&record.name, fetched, &ctx.notifications)
                .await
                .with_context(|| format!("failed to refresh channel '{}'", record.name))
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(AddOutcome::Merged { new_items })) => summary.new_items += new_items,
            Ok(Ok(AddOutcome::Inserted)) => {}
            Ok(Err(e)) => {
                warn!(error = %format!("{:#}", e), "Refresh of source failed");
                summary.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "Refresh task panicked");
                summary.failed += 1;
            }
        }
    }

    info!(
        sources = summary.sources,
        failed = summary.failed,
        new_items = summary.new_items,
        "Refresh complete"
    );
    summary
}

/// Run a single refresh once `delay` has elapsed.
///
/// The timer does not re-arm; later refreshes only happen on demand.
pub fn spawn_refresh_timer(ctx: AppContext, delay: Duration) -> JoinHandle<RefreshSummary> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        info!("Refresh timer fired");
        refresh(&ctx).await
    })
}

/// Subscribe to every channel named in `path`, one per line.
///
/// Returns how many channels were stored.
pub async fn subscribe_from_file(ctx: &AppContext, path: &Path) -> Result<usize> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read subscriptions file {}", path.display()))?;

    let mut tasks = JoinSet::new();
    for line in contents.lines() {
        let name = line.trim_end_matches('\r');
        if name.trim().is_empty() {
            continue;
        }

        let name = name.to_string();
        let ctx = ctx.clone();
        tasks.spawn(async move {
            let record = ctx
                .sources
                .lookup(&name)
                .await
                .with_context(|| format!("failed to fetch '{}'", name))?;
            ctx.store
                .add(&name, record, &ctx.notifications)
                .await
                .with_context(|| format!("failed to subscribe to channel '{}'", name))?;
            info!(source = %name, "Channel stored");
            Ok::<(), anyhow::Error>(())
        });
    }

    let mut stored = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => stored += 1,
            Ok(Err(e)) => warn!(error = %format!("{:#}", e), "Subscription from file failed"),
            Err(e) => error!(error = %e, "Subscription task panicked"),
        }
    }
    Ok(stored)
}
