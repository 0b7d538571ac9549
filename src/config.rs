//! Runtime configuration

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use snafu::prelude::*;

static SESSION_URL: &str = "http://api.nodepay.ai/api/auth/session";
static PING_URL: &str = "http://nw.nodepay.ai/api/network/ping";
static ORIGIN: &str = "chrome-extension://lgmpfmgeabnnlemejacfljbmonaomfmm";
static PROTOCOL_VERSION: &str = "2.2.7";
static CREDENTIALS_PATH: &str = "token_list.txt";

const PING_INTERVAL: u64 = 60;
const RETRY_THRESHOLD: u32 = 2;
const MAX_BACKOFF: u64 = 600;
const BATCH_SIZE: usize = 15;
const SETTLE_DELAY: u64 = 10;
const BATCH_DELAY: u64 = 2;
const REQUEST_TIMEOUT: u64 = 30;

/// Load config error
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(variant), context(suffix(false)))]
pub enum Error {
    /// read config file failed
    #[snafu(display("read config file {} failed: {source}", path.display()))]
    ReadConfigFailed {
        /// config file path
        path: PathBuf,
        /// source error
        source: std::io::Error,
    },

    /// config file content is not valid config json
    #[snafu(display("parse config file {} failed: {source}", path.display()))]
    ParseConfigFailed {
        /// config file path
        path: PathBuf,
        /// source error
        source: serde_json::Error,
    },
}

/// All tunables of the scheduler, every field has a default so a config file only needs to
/// list what it overrides. Durations are in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// session establishment endpoint
    pub session_url: String,
    /// heartbeat endpoint
    pub ping_url: String,
    /// `Origin` header sent with every request
    pub origin: Option<String>,
    /// identities to rotate over, empty means the crate's own user agent
    pub user_agents: Vec<String>,
    /// per request timeout
    pub request_timeout: u64,
    /// minimal interval between two heartbeats of one account
    pub ping_interval: u64,
    /// consecutive failures tolerated before the interval starts to double
    pub retry_threshold: u32,
    /// upper bound of the backed off interval
    pub max_backoff: u64,
    /// accounts per batch
    pub batch_size: usize,
    /// wait before a batch is dispatched
    pub settle_delay: u64,
    /// pause after a batch completes
    pub batch_delay: u64,
    /// version field of heartbeat payload
    pub protocol_version: String,
    /// newline delimited credential list
    pub credentials_path: PathBuf,
    /// json session store, sessions are only kept in memory if absent
    pub session_store_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_url: SESSION_URL.to_string(),
            ping_url: PING_URL.to_string(),
            origin: Some(ORIGIN.to_string()),
            user_agents: vec![],
            request_timeout: REQUEST_TIMEOUT,
            ping_interval: PING_INTERVAL,
            retry_threshold: RETRY_THRESHOLD,
            max_backoff: MAX_BACKOFF,
            batch_size: BATCH_SIZE,
            settle_delay: SETTLE_DELAY,
            batch_delay: BATCH_DELAY,
            protocol_version: PROTOCOL_VERSION.to_string(),
            credentials_path: PathBuf::from(CREDENTIALS_PATH),
            session_store_path: None,
        }
    }
}

impl Config {
    /// Load config from a json file, missing fields take default value.
    pub async fn load<P: AsRef<Path> + ?Sized>(path: &P) -> Result<Self, Error> {
        let path = path.as_ref();

        let content = tokio::fs::read(path)
            .await
            .context(variant::ReadConfigFailed { path })?;

        let config: Self =
            serde_json::from_slice(&content).context(variant::ParseConfigFailed { path })?;

        log::debug!("Loaded config from {}", path.display());

        Ok(config)
    }

    /// per request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// minimal interval between two heartbeats of one account
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval)
    }

    /// upper bound of the backed off interval
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff)
    }

    /// wait before a batch is dispatched
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay)
    }

    /// pause after a batch completes
    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs(self.batch_delay)
    }
}
