//! crate error types

use snafu::prelude::*;

use super::api::Error as APIError;
use super::source::Error as SourceError;

/// crate result type
pub type Result<T> = std::result::Result<T, Error>;

/// crate error type
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), context(suffix(false)))]
pub enum Error {
    /// Create heartbeat api client failed
    #[snafu(display("create api client failed: {source}"))]
    CreateClientFailed {
        /// source error
        source: APIError,
    },

    /// Read credential list failed, the scheduler can't continue
    #[snafu(display("read credential list failed: {source}"))]
    CredentialSource {
        /// source error
        source: SourceError,
    },
}
