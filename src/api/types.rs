//! Remote service request and response types

use std::fmt::Display;

use serde::Deserialize;

/// Envelope code the service uses to reject a credential.
pub const AUTH_REJECTED_CODE: i64 = 403;

/// Remote endpoint a call is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// session establishment, exchange credential for account identity
    Session,
    /// heartbeat
    Ping,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Endpoint::Session => "session",
            Endpoint::Ping => "ping",
        })
    }
}

/// Envelope is common response structure with a code, and optional message and data field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    /// zero is success, 403 is credential rejected, other non-negative value is generic failure
    pub code: i64,
    /// error message, any json type the service chooses to put there
    #[serde(default)]
    pub message: Option<serde_json::Value>,
    /// error message under its short name
    #[serde(default)]
    pub msg: Option<serde_json::Value>,
    /// result data, differ type for each endpoint
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    /// code is zero
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// code is [`AUTH_REJECTED_CODE`]
    pub fn is_auth_rejected(&self) -> bool {
        self.code == AUTH_REJECTED_CODE
    }

    /// Text of `message` or `msg`, whichever is a string first.
    pub fn text(&self) -> Option<&str> {
        [&self.message, &self.msg]
            .into_iter()
            .find_map(|field| field.as_ref().and_then(|value| value.as_str()))
    }

    /// Data of a session establishment response, `None` if data is absent or has other shape.
    pub fn session_data(&self) -> Option<SessionData> {
        self.data
            .as_ref()
            .and_then(|data| SessionData::deserialize(data).ok())
    }
}

/// data type for session endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionData {
    /// account id assigned by remote service
    #[serde(default)]
    pub uid: Option<String>,
}
