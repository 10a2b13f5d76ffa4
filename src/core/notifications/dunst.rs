use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;

use super::Notifier;
use crate::core::models::Item;

const APP_NAME: &str = "feedd";
const TIMEOUT_MS: &str = "10000";
const STACK_TAG: &str = "string:x-dunst-stack-tag:feedd";

/// Raises desktop alerts through `dunstify`.
pub struct DunstNotifier {
    program: String,
}

impl Default for DunstNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DunstNotifier {
    pub fn new() -> Self {
        Self {
            program: "dunstify".to_string(),
        }
    }

    fn format_message(source: &str, item: &Item) -> String {
        format!("New video from {}:\n{}", source, item.title)
    }
}

#[async_trait]
impl Notifier for DunstNotifier {
    async fn notify(&self, source: &str, item: &Item) -> Result<()> {
        let status = Command::new(&self.program)
            .args(["-a", APP_NAME, "-t", TIMEOUT_MS, "-u", "low", "-h", STACK_TAG])
            .arg(Self::format_message(source, item))
            .status()
            .await
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}
