//! Per credential session cache.
//!
//! The store is an opaque load/save cache in front of session establishment. Entries are keyed
//! by credential fingerprint, the secret itself is never written anywhere.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Debug,
    path::{Path, PathBuf},
};

use snafu::prelude::*;
use tokio::sync::Mutex;

use crate::{account::AccountInfo, credential::Credential};

/// Session store error
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(variant), context(suffix(false)))]
pub enum Error {
    /// read store file failed
    #[snafu(display("read session store {} failed: {source}", path.display()))]
    ReadStoreFailed {
        /// store file path
        path: PathBuf,
        /// source error
        source: std::io::Error,
    },

    /// store file content is not valid
    #[snafu(display("parse session store {} failed: {source}", path.display()))]
    ParseStoreFailed {
        /// store file path
        path: PathBuf,
        /// source error
        source: serde_json::Error,
    },

    /// encode sessions as json failed
    #[snafu(display("encode session store {} failed: {source}", path.display()))]
    EncodeStoreFailed {
        /// store file path
        path: PathBuf,
        /// source error
        source: serde_json::Error,
    },

    /// write store file failed
    #[snafu(display("write session store {} failed: {source}", path.display()))]
    WriteStoreFailed {
        /// store file path
        path: PathBuf,
        /// source error
        source: std::io::Error,
    },
}

/// Result type for store module
pub type Result<T> = std::result::Result<T, Error>;

/// Load/save cached account info of a credential.
#[async_trait::async_trait]
pub trait SessionStore: Debug + Send + Sync {
    /// cached info of `credential`, `None` if nothing cached
    async fn load(&self, credential: &Credential) -> Result<Option<AccountInfo>>;
    /// cache `info` for `credential`, replace existing one
    async fn save(&self, credential: &Credential, info: &AccountInfo) -> Result<()>;
    /// forget cached info of `credential`
    async fn clear(&self, credential: &Credential) -> Result<()>;
}

/// Store keeping sessions in process memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<Credential, AccountInfo>>,
}

impl MemoryStore {
    /// empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, credential: &Credential) -> Result<Option<AccountInfo>> {
        Ok(self.sessions.lock().await.get(credential).cloned())
    }

    async fn save(&self, credential: &Credential, info: &AccountInfo) -> Result<()> {
        self.sessions
            .lock()
            .await
            .insert(credential.clone(), info.clone());
        Ok(())
    }

    async fn clear(&self, credential: &Credential) -> Result<()> {
        self.sessions.lock().await.remove(credential);
        Ok(())
    }
}

type Sessions = BTreeMap<String, AccountInfo>;

/// Store keeping all sessions in one json object on disk, keyed by credential fingerprint.
///
/// Every operation reads the whole file, a missing file is an empty store. Writes go to a
/// sibling `.tmp` file first which then replaces the store file, so a crash mid write never
/// leaves a truncated store behind. A store file that does not parse makes `load` fail, but
/// `save` and `clear` start over from an empty store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // serialize read-modify-write of the shared file
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// store backed by file at `path`, created on first save
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Sessions> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Sessions::new()),
            Err(err) => {
                return Err(err).context(variant::ReadStoreFailed { path: &self.path });
            }
        };

        serde_json::from_slice(&content).context(variant::ParseStoreFailed { path: &self.path })
    }

    async fn read_or_reset(&self) -> Result<Sessions> {
        match self.read().await {
            Err(err @ Error::ParseStoreFailed { .. }) => {
                log::warn!("{}, start over with an empty session store", err);
                Ok(Sessions::new())
            }
            result => result,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    async fn write(&self, sessions: &Sessions) -> Result<()> {
        let content = serde_json::to_vec_pretty(sessions)
            .context(variant::EncodeStoreFailed { path: &self.path })?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, content)
            .await
            .context(variant::WriteStoreFailed { path: &temp })?;

        tokio::fs::rename(&temp, &self.path)
            .await
            .context(variant::WriteStoreFailed { path: &self.path })
    }
}

#[async_trait::async_trait]
impl SessionStore for JsonFileStore {
    async fn load(&self, credential: &Credential) -> Result<Option<AccountInfo>> {
        let _guard = self.lock.lock().await;
        Ok(self.read().await?.remove(&credential.fingerprint()))
    }

    async fn save(&self, credential: &Credential, info: &AccountInfo) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_or_reset().await?;
        sessions.insert(credential.fingerprint(), info.clone());
        self.write(&sessions).await?;

        log::trace!("Saved session of {} to {}", credential, self.path.display());

        Ok(())
    }

    async fn clear(&self, credential: &Credential) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut sessions = self.read_or_reset().await?;
        if sessions.remove(&credential.fingerprint()).is_some() {
            self.write(&sessions).await?;
        }
        Ok(())
    }
}
