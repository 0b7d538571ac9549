use std::time::Duration;

use tokio::time::Instant;

use super::AccountInfo;
use crate::{api::types::Envelope, config::Config};

// Cap the doubling exponent so the multiplication can't overflow before clamping.
const BACKOFF_MAX_EXPONENT: u32 = 16;

/// Connection state of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// last heartbeat succeeded
    Connected,
    /// last heartbeat failed
    Disconnected,
    /// no session, or the session was rejected
    #[default]
    NotConnected,
}

/// When an account may heartbeat again.
///
/// The interval is `ping_interval` until the account has failed more than `retry_threshold`
/// times in a row, then it doubles with every further failure up to `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// minimal interval between two heartbeats
    pub ping_interval: Duration,
    /// consecutive failures tolerated before backoff starts
    pub retry_threshold: u32,
    /// upper bound of the backed off interval
    pub max_backoff: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Policy {
    /// policy described by `config`
    pub fn from_config(config: &Config) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            retry_threshold: config.retry_threshold,
            max_backoff: config.max_backoff(),
        }
    }

    /// Interval to wait after an attempt, given the consecutive failure count.
    ///
    /// Never shorter than `ping_interval`.
    pub fn interval(&self, retries: u32) -> Duration {
        if retries <= self.retry_threshold {
            return self.ping_interval;
        }

        let exponent = (retries - self.retry_threshold).min(BACKOFF_MAX_EXPONENT);

        self.ping_interval
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
            .max(self.ping_interval)
    }
}

/// Connection state, heartbeat record, retry counter and session info of one account.
#[derive(Debug, Clone)]
pub struct AccountStateMachine {
    policy: Policy,
    state: ConnectionState,
    last_heartbeat: Option<Instant>,
    retries: u32,
    info: Option<AccountInfo>,
}

impl AccountStateMachine {
    /// fresh account, not connected and never heartbeat
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            state: ConnectionState::NotConnected,
            last_heartbeat: None,
            retries: 0,
            info: None,
        }
    }

    /// current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// consecutive failure count
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// time of last heartbeat attempt
    pub fn last_heartbeat(&self) -> Option<Instant> {
        self.last_heartbeat
    }

    /// current session info
    pub fn info(&self) -> Option<&AccountInfo> {
        self.info.as_ref()
    }

    /// use `info` as current session
    pub fn adopt(&mut self, info: AccountInfo) {
        self.info = Some(info);
    }

    /// interval required between last attempt and next one
    pub fn interval(&self) -> Duration {
        self.policy.interval(self.retries)
    }

    /// Decide whether a heartbeat may be sent at `now`.
    ///
    /// A positive answer reserves the slot: the record is stamped with `now` before the
    /// heartbeat is sent, so a second decision inside the interval is refused.
    pub fn should_heartbeat(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_heartbeat {
            if now.saturating_duration_since(last) < self.interval() {
                return false;
            }
        }

        self.last_heartbeat = Some(now);
        true
    }

    /// Fold a structurally valid heartbeat response into state, returns new state.
    pub fn on_result(&mut self, envelope: &Envelope) -> ConnectionState {
        if envelope.is_success() {
            self.retries = 0;
            self.state = ConnectionState::Connected;
            self.state
        } else {
            self.on_failure(Some(envelope))
        }
    }

    /// Fold a failed heartbeat into state, returns new state.
    ///
    /// `None` stands for a request that got no usable envelope back. A rejected credential
    /// logs out, whatever the retry count is.
    pub fn on_failure(&mut self, envelope: Option<&Envelope>) -> ConnectionState {
        self.retries = self.retries.saturating_add(1);

        if envelope.map(Envelope::is_auth_rejected).unwrap_or_default() {
            log::trace!("Credential rejected after {} failures", self.retries);
            self.logout();
        } else {
            self.state = ConnectionState::Disconnected;
        }

        self.state
    }

    /// Drop session info and go back to not connected.
    pub fn logout(&mut self) {
        self.state = ConnectionState::NotConnected;
        self.info = None;
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn envelope(code: i64) -> Envelope {
        serde_json::from_value(json!({ "code": code })).unwrap()
    }

    fn info() -> AccountInfo {
        AccountInfo {
            uid: "u1".to_string(),
            browser_id: "b1".to_string(),
        }
    }

    fn policy() -> Policy {
        Policy {
            ping_interval: Duration::from_secs(60),
            retry_threshold: 2,
            max_backoff: Duration::from_secs(600),
        }
    }

    #[test]
    fn test_initial_state() {
        let machine = AccountStateMachine::new(policy());

        assert_eq!(machine.state(), ConnectionState::NotConnected);
        assert_eq!(machine.retries(), 0);
        assert!(machine.last_heartbeat().is_none());
        assert!(machine.info().is_none());
    }

    #[test]
    fn test_should_heartbeat_rate_limit() {
        let mut machine = AccountStateMachine::new(policy());
        let start = Instant::now();

        assert!(machine.should_heartbeat(start));
        assert_eq!(machine.last_heartbeat(), Some(start));

        assert!(!machine.should_heartbeat(start));
        assert!(!machine.should_heartbeat(start + Duration::from_secs(59)));
        assert_eq!(machine.last_heartbeat(), Some(start));

        let later = start + Duration::from_secs(60);
        assert!(machine.should_heartbeat(later));
        assert_eq!(machine.last_heartbeat(), Some(later));
    }

    #[test]
    fn test_success_resets_from_any_state() {
        let mut machine = AccountStateMachine::new(policy());

        machine.on_failure(None);
        machine.on_failure(Some(&envelope(7)));
        assert_eq!(machine.retries(), 2);

        assert_eq!(machine.on_result(&envelope(0)), ConnectionState::Connected);
        assert_eq!(machine.retries(), 0);

        machine.adopt(info());
        machine.on_result(&envelope(403));
        assert_eq!(machine.state(), ConnectionState::NotConnected);

        assert_eq!(machine.on_result(&envelope(0)), ConnectionState::Connected);
        assert_eq!(machine.retries(), 0);
    }

    #[test]
    fn test_generic_failure_disconnects() {
        let mut machine = AccountStateMachine::new(policy());
        machine.adopt(info());
        machine.on_result(&envelope(0));

        assert_eq!(machine.on_result(&envelope(1)), ConnectionState::Disconnected);
        assert_eq!(machine.retries(), 1);
        assert_eq!(machine.info(), Some(&info()));

        assert_eq!(machine.on_failure(None), ConnectionState::Disconnected);
        assert_eq!(machine.retries(), 2);
    }

    #[test]
    fn test_rejection_logs_out_regardless_of_retries() {
        let mut machine = AccountStateMachine::new(policy());
        machine.adopt(info());

        for _ in 0..5 {
            machine.on_failure(None);
        }
        assert_eq!(machine.state(), ConnectionState::Disconnected);

        assert_eq!(
            machine.on_failure(Some(&envelope(403))),
            ConnectionState::NotConnected
        );
        assert_eq!(machine.retries(), 6);
        assert!(machine.info().is_none());
    }

    #[test]
    fn test_logout_keeps_retries() {
        let mut machine = AccountStateMachine::new(policy());
        machine.adopt(info());
        machine.on_failure(None);

        machine.logout();

        assert_eq!(machine.state(), ConnectionState::NotConnected);
        assert!(machine.info().is_none());
        assert_eq!(machine.retries(), 1);
    }

    #[test]
    fn test_policy_backoff() {
        let policy = policy();
        let minute = Duration::from_secs(60);

        assert_eq!(policy.interval(0), minute);
        assert_eq!(policy.interval(2), minute);
        assert_eq!(policy.interval(3), minute * 2);
        assert_eq!(policy.interval(4), minute * 4);
        assert_eq!(policy.interval(5), minute * 8);
        assert_eq!(policy.interval(6), Duration::from_secs(600));
        assert_eq!(policy.interval(u32::MAX), Duration::from_secs(600));

        let tight = Policy {
            max_backoff: Duration::from_secs(1),
            ..policy
        };
        assert_eq!(tight.interval(10), minute);
    }

    #[test]
    fn test_backoff_delays_next_heartbeat() {
        let mut machine = AccountStateMachine::new(policy());
        let start = Instant::now();

        for _ in 0..3 {
            machine.on_failure(None);
        }
        assert!(machine.should_heartbeat(start));

        assert!(!machine.should_heartbeat(start + Duration::from_secs(60)));
        assert!(machine.should_heartbeat(start + Duration::from_secs(120)));

        machine.on_result(&envelope(0));
        assert!(machine.should_heartbeat(start + Duration::from_secs(180)));
    }
}
