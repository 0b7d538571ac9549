//! Per account state and heartbeat workflow

mod session;
mod state;

use serde::{Deserialize, Serialize};

pub use session::{AccountSession, Environment, RunOutcome};
pub use state::{AccountStateMachine, ConnectionState, Policy};

/// Identity of an established account session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// account id assigned by remote service
    pub uid: String,
    /// random id generated when the session was established
    pub browser_id: String,
}
