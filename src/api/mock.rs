//! Scripted [`Api`] implementation for tests

use std::{fmt::Debug, sync::Mutex, time::Duration};

use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio::time::Instant;

use super::client::validate;
use super::error::variant::HTTPStatusNotOK;
use super::types::{Endpoint, Envelope};
use super::{Api, Result};
use crate::credential::Credential;

pub(crate) enum Reply {
    Envelope(serde_json::Value),
    Status(u16),
    Delayed(Duration, Box<Reply>),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Envelope(json!({ "code": 0 }))
    }

    pub fn code(code: i64) -> Self {
        Reply::Envelope(json!({ "code": code }))
    }

    pub fn session(uid: &str) -> Self {
        Reply::Envelope(json!({ "code": 0, "data": { "uid": uid } }))
    }

    pub fn after(self, delay: Duration) -> Self {
        Reply::Delayed(delay, Box::new(self))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub endpoint: Endpoint,
    pub credential: Credential,
    pub payload: serde_json::Value,
    pub started: Instant,
    pub finished: Instant,
}

type Responder = Box<dyn Fn(Endpoint, &Credential) -> Reply + Send + Sync>;

pub(crate) struct MockApi {
    responder: Responder,
    calls: Mutex<Vec<Call>>,
}

impl Debug for MockApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockApi").finish_non_exhaustive()
    }
}

impl MockApi {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(Endpoint, &Credential) -> Reply + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(vec![]),
        }
    }

    /// every session returns uid `u1`, every ping succeeds
    pub fn healthy() -> Self {
        Self::new(|endpoint, _| match endpoint {
            Endpoint::Session => Reply::session("u1"),
            Endpoint::Ping => Reply::ok(),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }
}

#[async_trait::async_trait]
impl Api for MockApi {
    async fn call(
        &self,
        endpoint: Endpoint,
        payload: &serde_json::Value,
        credential: &Credential,
    ) -> Result<Envelope> {
        let started = Instant::now();

        let mut reply = (self.responder)(endpoint, credential);
        while let Reply::Delayed(delay, inner) = reply {
            tokio::time::sleep(delay).await;
            reply = *inner;
        }

        let result = match reply {
            Reply::Envelope(value) => validate(value.to_string().into()),
            Reply::Status(status) => Err(HTTPStatusNotOK {
                method: Method::POST,
                url: format!("mock://{}", endpoint),
                status_code: StatusCode::from_u16(status).unwrap(),
            }
            .build()),
            Reply::Delayed(..) => unreachable!(),
        };

        self.calls.lock().unwrap().push(Call {
            endpoint,
            credential: credential.clone(),
            payload: payload.clone(),
            started,
            finished: Instant::now(),
        });

        result
    }
}
