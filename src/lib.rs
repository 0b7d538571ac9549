//! # Keepalive
//!
//! Keep a large set of bearer-authenticated accounts alive against a remote service.
//!
//! Every account gets its own state machine deciding when it may heartbeat and how a result
//! changes its connection state. The [`Scheduler`] walks the credential list in fixed-size
//! batches, running the members of a batch concurrently and the batches one after another,
//! forever.

#![deny(warnings)]
#![deny(clippy::all)]
#![deny(missing_debug_implementations, missing_docs)]
#![forbid(unsafe_code)]

pub mod account;
pub mod api;
pub mod config;
pub mod credential;
pub mod identity;
pub mod source;
pub mod store;

mod error;
mod scheduler;

pub use credential::Credential;
pub use error::{Error, Result};
pub use scheduler::{batches, Scheduler};
