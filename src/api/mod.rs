//! heartbeat service api

mod client;
mod error;
#[cfg(test)]
pub(crate) mod mock;
pub mod types;

use std::fmt::Debug;

pub use client::Client;
pub use error::Error;

use crate::credential::Credential;
use types::{Endpoint, Envelope};

/// Result type for api module
pub type Result<T> = std::result::Result<T, Error>;

/// Issue one call to a remote endpoint.
///
/// Implementations must fail with a transport error on network failure, timeout or non-2xx
/// status, and with an invalid response error when the body is not an envelope or its code is
/// negative. A non-negative code is returned as is, its meaning is decided by the caller.
#[async_trait::async_trait]
pub trait Api: Debug + Send + Sync {
    /// post `payload` to `endpoint` on behalf of `credential`
    async fn call(
        &self,
        endpoint: Endpoint,
        payload: &serde_json::Value,
        credential: &Credential,
    ) -> Result<Envelope>;
}
