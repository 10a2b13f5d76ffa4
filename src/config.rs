use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/feedd/config.toml";
const ENV_PREFIX: &str = "FEEDD_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding every endpoint socket.
    pub socket_dir: PathBuf,
    /// Socket files are named `<socket_prefix>.<endpoint>.sock`.
    pub socket_prefix: String,
    /// Raise desktop alerts for new videos.
    pub notify: bool,
    /// Delay before the startup refresh, in minutes.
    pub refresh_minutes: u64,
    /// Channel names to subscribe to at startup, one per line.
    pub subs_file: Option<PathBuf>,
    /// Log to stderr instead of `log_file`.
    pub debug: bool,
    pub log_file: PathBuf,
    pub verbose: bool,
    pub json_logs: bool,
    /// Serve in-memory channels instead of YouTube.
    pub simulation: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            socket_dir: PathBuf::from("/tmp"),
            socket_prefix: "feedd".to_string(),
            notify: true,
            refresh_minutes: 15,
            subs_file: None,
            debug: false,
            log_file: PathBuf::from("/tmp/feedd.log"),
            verbose: false,
            json_logs: false,
            simulation: false,
        }
    }
}

impl AppConfig {
    /// Layer defaults, the config file, `FEEDD_*` variables and CLI args.
    pub fn new<T: Serialize>(args: Option<&T>) -> Result<Self> {
        Self::load(Path::new(DEFAULT_CONFIG_PATH), args)
    }

    pub fn load<T: Serialize>(path: &Path, args: Option<&T>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX));

        if let Some(args) = args {
            figment = figment.merge(Serialized::defaults(args));
        }

        figment
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    pub fn socket_path(&self, endpoint: &str) -> PathBuf {
        self.socket_dir
            .join(format!("{}.{}.sock", self.socket_prefix, endpoint))
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_secs(self.refresh_minutes * 60)
    }
}
