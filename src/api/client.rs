use std::{fmt::Debug, sync::Arc, time::Duration};

use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Method,
};
use snafu::prelude::*;
use url::Url;

use super::error::variant::*;
use super::types::*;
use super::{Api, Result};
use crate::{config::Config, credential::Credential, identity::IdentityProvider};

/// Heartbeat service HTTP API Client
#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
    session_url: Url,
    ping_url: Url,
    timeout: Duration,
    identity: Arc<dyn IdentityProvider>,
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("session_url", &self.session_url.as_str())
            .field("ping_url", &self.ping_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn parse_endpoint(url: &str) -> Result<Url> {
    Url::parse(url).with_context(|_| InvalidEndpoint { url })
}

impl Client {
    /// create a new api client, every request carries an identity produced by `identity`
    pub fn new(config: &Config, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let session_url = parse_endpoint(&config.session_url)?;
        let ping_url = parse_endpoint(&config.ping_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        if let Some(ref origin) = config.origin {
            let value = origin
                .parse()
                .map_err(|_| InvalidOrigin { origin }.build())?;
            headers.insert(header::ORIGIN, value);
        }

        let client = reqwest::Client::builder()
            .gzip(true)
            .deflate(true)
            .default_headers(headers)
            .build()
            .context(ClientCreateFailed)?;

        Ok(Self {
            client,
            session_url,
            ping_url,
            timeout: config.request_timeout(),
            identity,
        })
    }

    fn url(&self, endpoint: Endpoint) -> &Url {
        match endpoint {
            Endpoint::Session => &self.session_url,
            Endpoint::Ping => &self.ping_url,
        }
    }
}

/// Check a response body is a json envelope with a non-negative code.
pub(crate) fn validate(body: bytes::Bytes) -> Result<Envelope> {
    let value: serde_json::Value =
        serde_json::from_slice(&body).with_context(|_| ParseBodyFailed { body })?;

    let envelope: Envelope =
        serde_json::from_value(value.clone()).context(InvalidEnvelope { body: value })?;

    ensure!(envelope.code >= 0, NegativeCode { code: envelope.code });

    Ok(envelope)
}

#[async_trait::async_trait]
impl Api for Client {
    async fn call(
        &self,
        endpoint: Endpoint,
        payload: &serde_json::Value,
        credential: &Credential,
    ) -> Result<Envelope> {
        let url = self.url(endpoint);

        let mut auth_header_value: HeaderValue = format!("Bearer {}", credential.secret())
            .parse()
            .map_err(|_| {
                TokenInvalid {
                    credential: credential.to_string(),
                }
                .build()
            })?;
        auth_header_value.set_sensitive(true);

        let body = serde_json::to_vec(payload).context(EncodePayloadFailed)?;

        let identity = self.identity.identity();
        log::trace!("Call {} for {} as {}", endpoint, credential, identity);

        let req = self
            .client
            .post(url.clone())
            .timeout(self.timeout)
            .header(header::AUTHORIZATION, auth_header_value)
            .header(header::USER_AGENT, &*identity)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .build()
            .context(BuildRequestFailed)?;

        let resp = self
            .client
            .execute(req)
            .await
            .with_context(|_| RequestFailed {
                method: Method::POST,
                url: url.as_str(),
            })?;

        ensure!(
            resp.status().is_success(),
            HTTPStatusNotOK {
                method: Method::POST,
                url: url.as_str(),
                status_code: resp.status()
            }
        );

        let body = resp.bytes().await.with_context(|_| RequestFailed {
            method: Method::POST,
            url: url.as_str(),
        })?;

        validate(body)
    }
}
