use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use enum_as_inner::EnumAsInner;
use serde_json::json;
use tokio::time::Instant;

use super::{AccountInfo, AccountStateMachine, ConnectionState, Policy};
use crate::{
    api::{self, types::Endpoint, Api},
    credential::Credential,
    store::SessionStore,
};

/// Collaborators shared by every account session.
#[derive(Debug, Clone)]
pub struct Environment {
    /// remote service
    pub api: Arc<dyn Api>,
    /// session cache
    pub store: Arc<dyn SessionStore>,
    /// version field of heartbeat payload
    pub protocol_version: String,
}

/// What one run of an account session ended with
#[derive(Debug, EnumAsInner)]
pub enum RunOutcome {
    /// interval since last heartbeat not elapsed yet, nothing sent
    Skipped,
    /// heartbeat sent, the account is now in this state
    Heartbeat(ConnectionState),
    /// session not established or rejected, account info cleared
    LoggedOut,
    /// session establishment failed, retried on next run
    Aborted(api::Error),
}

/// Heartbeat workflow of one credential.
#[derive(Debug)]
pub struct AccountSession {
    credential: Credential,
    machine: AccountStateMachine,
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl AccountSession {
    /// new session of `credential`, nothing cached yet
    pub fn new(credential: Credential, policy: Policy) -> Self {
        Self {
            credential,
            machine: AccountStateMachine::new(policy),
        }
    }

    /// the credential
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// account state
    pub fn machine(&self) -> &AccountStateMachine {
        &self.machine
    }

    /// Make sure a session is established, then try exactly one heartbeat.
    ///
    /// Never fails: every error ends this run only and is reported in the outcome.
    pub async fn run(&mut self, env: &Environment) -> RunOutcome {
        match self.run_inner(env).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_transient() {
                    log::info!(
                        "Account {} got transient error, retry on next pass: {}",
                        self.credential,
                        err
                    );
                } else {
                    log::error!("Account {} session failed: {}", self.credential, err);
                }
                RunOutcome::Aborted(err)
            }
        }
    }

    async fn run_inner(&mut self, env: &Environment) -> api::Result<RunOutcome> {
        if self.machine.info().is_none() {
            match env.store.load(&self.credential).await {
                Ok(Some(info)) => {
                    log::debug!("Account {} use cached session {}", self.credential, info.uid);
                    self.machine.adopt(info);
                }
                Ok(None) => {}
                Err(err) => log::warn!(
                    "Account {} load cached session failed, ignored: {}",
                    self.credential,
                    err
                ),
            }
        }

        if self.machine.info().is_none() && !self.establish(env).await? {
            return Ok(RunOutcome::LoggedOut);
        }

        Ok(self.heartbeat(env).await)
    }

    /// true if a session is established
    async fn establish(&mut self, env: &Environment) -> api::Result<bool> {
        let browser_id = uuid::Uuid::new_v4().to_string();

        log::debug!("Account {} establishing new session", self.credential);

        let envelope = env
            .api
            .call(Endpoint::Session, &json!({}), &self.credential)
            .await?;

        match envelope
            .session_data()
            .and_then(|data| data.uid)
            .filter(|uid| !uid.is_empty())
        {
            Some(uid) => {
                let info = AccountInfo { uid, browser_id };

                if let Err(err) = env.store.save(&self.credential, &info).await {
                    log::warn!(
                        "Account {} save session failed, keep it in memory only: {}",
                        self.credential,
                        err
                    );
                }

                log::info!("Account {} session established, uid {}", self.credential, info.uid);

                self.machine.adopt(info);
                Ok(true)
            }
            None => {
                log::warn!(
                    "Account {} session response has no uid (code {}), logout",
                    self.credential,
                    envelope.code
                );
                self.logout(env).await;
                Ok(false)
            }
        }
    }

    async fn heartbeat(&mut self, env: &Environment) -> RunOutcome {
        let payload = match self.machine.info() {
            Some(info) => json!({
                "id": info.uid,
                "browser_id": info.browser_id,
                "timestamp": unix_timestamp(),
                "version": env.protocol_version,
            }),
            None => return RunOutcome::LoggedOut,
        };

        if !self.machine.should_heartbeat(Instant::now()) {
            log::info!(
                "Skip heartbeat of account {}, interval {:?} not elapsed",
                self.credential,
                self.machine.interval()
            );
            return RunOutcome::Skipped;
        }

        log::debug!("Send heartbeat of account {}", self.credential);

        let state = match env.api.call(Endpoint::Ping, &payload, &self.credential).await {
            Ok(envelope) => {
                if envelope.is_success() {
                    log::info!("Heartbeat of account {} success", self.credential);
                } else {
                    log::warn!(
                        "Heartbeat of account {} failed with code {}: {}",
                        self.credential,
                        envelope.code,
                        envelope.text().unwrap_or_default()
                    );
                }
                self.machine.on_result(&envelope)
            }
            Err(err) => {
                log::error!("Heartbeat of account {} failed: {}", self.credential, err);
                self.machine.on_failure(None)
            }
        };

        if state == ConnectionState::NotConnected {
            log::warn!("Account {} rejected, logout", self.credential);
            self.clear_cache(env).await;
            return RunOutcome::LoggedOut;
        }

        if self.machine.retries() > 0 {
            log::debug!(
                "Account {} failed {} times in a row, next heartbeat after {:?}",
                self.credential,
                self.machine.retries(),
                self.machine.interval()
            );
        }

        RunOutcome::Heartbeat(state)
    }

    async fn logout(&mut self, env: &Environment) {
        self.machine.logout();
        self.clear_cache(env).await;
    }

    async fn clear_cache(&self, env: &Environment) {
        if let Err(err) = env.store.clear(&self.credential).await {
            log::warn!(
                "Account {} clear cached session failed: {}",
                self.credential,
                err
            );
        }
    }
}
