use std::{collections::HashMap, slice::Chunks, sync::Arc, time::Duration};

use futures_util::future::join_all;
use snafu::prelude::*;
use tokio::sync::Mutex;

use crate::{
    account::{AccountSession, ConnectionState, Environment, Policy, RunOutcome},
    api::{self, Api},
    config::Config,
    credential::Credential,
    error, identity,
    source::{CredentialSource, FileSource},
    store::{JsonFileStore, MemoryStore, SessionStore},
    Result,
};

/// Split `credentials` into consecutive groups of `size`, the last one may be smaller.
pub fn batches(credentials: &[Credential], size: usize) -> Chunks<'_, Credential> {
    credentials.chunks(size.max(1))
}

/// Scheduler instance
///
/// Runs every credential's session batch by batch: members of a batch run concurrently, batches
/// run one after another, and the whole list is started over when the last batch completes.
#[derive(Debug)]
pub struct Scheduler {
    env: Environment,
    source: Arc<dyn CredentialSource>,
    policy: Policy,
    batch_size: usize,
    settle_delay: Duration,
    batch_delay: Duration,
    accounts: HashMap<Credential, Arc<Mutex<AccountSession>>>,
}

impl Scheduler {
    /// Create scheduler using given collaborators
    pub fn new(
        config: &Config,
        api: Arc<dyn Api>,
        store: Arc<dyn SessionStore>,
        source: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            env: Environment {
                api,
                store,
                protocol_version: config.protocol_version.clone(),
            },
            source,
            policy: Policy::from_config(config),
            batch_size: config.batch_size.max(1),
            settle_delay: config.settle_delay(),
            batch_delay: config.batch_delay(),
            accounts: HashMap::new(),
        }
    }

    /// Create scheduler with HTTP client, credential file and session store described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = api::Client::new(config, identity::from_list(config.user_agents.clone()))
            .context(error::CreateClientFailed)?;

        let store: Arc<dyn SessionStore> = match config.session_store_path {
            Some(ref path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };

        let source = FileSource::new(&config.credentials_path);

        log::info!("Create api client and scheduler success");

        Ok(Self::new(config, Arc::new(api), store, Arc::new(source)))
    }

    /// Run
    ///
    /// Never returns unless the credential list can't be read (error) or is empty (`Ok`).
    pub async fn run(mut self) -> Result<()> {
        loop {
            let credentials = self
                .source
                .credentials()
                .await
                .context(error::CredentialSource)?;

            if credentials.is_empty() {
                log::warn!("No credentials found, stop");
                return Ok(());
            }

            self.run_pass(&credentials).await;

            log::info!("Restarting batch process after completion");
        }
    }

    /// Process every credential once, batch by batch.
    pub async fn run_pass(&mut self, credentials: &[Credential]) {
        let total = credentials.len().div_ceil(self.batch_size);

        log::info!("Total accounts: {}, total batches: {}", credentials.len(), total);

        for (i, batch) in batches(credentials, self.batch_size).enumerate() {
            self.run_batch(batch, i + 1, total).await;
            tokio::time::sleep(self.batch_delay).await;
        }
    }

    async fn run_batch(&mut self, batch: &[Credential], number: usize, total: usize) {
        log::info!(
            "Processing batch {} of {}, containing {} accounts",
            number,
            total,
            batch.len()
        );

        tokio::time::sleep(self.settle_delay).await;

        let sessions = batch
            .iter()
            .map(|credential| self.session(credential))
            .collect::<Vec<_>>();

        let env = &self.env;
        let outcomes = join_all(
            sessions
                .iter()
                .map(|session| async move { session.lock().await.run(env).await }),
        )
        .await;

        let connected = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, RunOutcome::Heartbeat(ConnectionState::Connected)))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|outcome| matches!(outcome, RunOutcome::Skipped))
            .count();

        log::info!(
            "Finished batch {} of {}: {} connected, {} skipped, {} failed",
            number,
            total,
            connected,
            skipped,
            outcomes.len() - connected - skipped
        );
    }

    fn session(&mut self, credential: &Credential) -> Arc<Mutex<AccountSession>> {
        let policy = self.policy;
        self.accounts
            .entry(credential.clone())
            .or_insert_with(|| {
                log::trace!("Track new account {}", credential);
                Arc::new(Mutex::new(AccountSession::new(credential.clone(), policy)))
            })
            .clone()
    }

    /// connection state of `credential`, `None` if it never ran
    pub async fn connection_state(&self, credential: &Credential) -> Option<ConnectionState> {
        match self.accounts.get(credential) {
            Some(session) => Some(session.lock().await.machine().state()),
            None => None,
        }
    }

    /// consecutive failure count of `credential`, `None` if it never ran
    pub async fn retries(&self, credential: &Credential) -> Option<u32> {
        match self.accounts.get(credential) {
            Some(session) => Some(session.lock().await.machine().retries()),
            None => None,
        }
    }
}
