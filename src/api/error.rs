use snafu::prelude::*;

/// API Error
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(variant), context(suffix(false)))]
pub enum Error {
    /// endpoint url in config is invalid
    #[snafu(display("endpoint url {url} is invalid: {source}"))]
    InvalidEndpoint {
        /// configured url
        url: String,
        /// source error
        source: url::ParseError,
    },

    /// origin header in config contains character that can't be send in HTTP header
    #[snafu(display("origin {origin} is invalid"))]
    InvalidOrigin {
        /// configured origin
        origin: String,
    },

    /// credential is invalid(contains invalid character that cant be send in HTTP header)
    #[snafu(display("credential {credential} is invalid"))]
    TokenInvalid {
        /// credential fingerprint, never the secret
        credential: String,
    },

    /// create HTTP client failed
    #[snafu(display("create api client failed: {source}"))]
    ClientCreateFailed {
        /// source error
        source: reqwest::Error,
    },

    /// encode request payload as json failed
    #[snafu(display("encode payload failed: {source}"))]
    EncodePayloadFailed {
        /// source error
        source: serde_json::Error,
    },

    /// build api request failed
    #[snafu(display("build request failed: {source}"))]
    BuildRequestFailed {
        /// source error
        source: reqwest::Error,
    },

    /// request never got a complete response, connect error, timeout or broken body
    #[snafu(display("{method} {url} failed: {source}"))]
    RequestFailed {
        /// http method
        method: reqwest::Method,
        /// target url
        url: String,
        /// source http error
        source: reqwest::Error,
    },

    /// service answered with a non 2xx status
    #[snafu(display("{method} {url} answered with http status {status_code}"))]
    HTTPStatusNotOK {
        /// http method
        method: reqwest::Method,
        /// request url
        url: String,
        /// received http status code
        status_code: reqwest::StatusCode,
    },

    /// response body of api request is not json
    #[snafu(display("parse response body {body:?} failed: {source}"))]
    ParseBodyFailed {
        /// http response body
        body: bytes::Bytes,
        /// source parse error
        source: serde_json::Error,
    },

    /// response json is not an envelope with an integer code
    #[snafu(display("response {body} is not a valid envelope: {source}"))]
    InvalidEnvelope {
        /// received json
        body: serde_json::Value,
        /// source parse error
        source: serde_json::Error,
    },

    /// envelope code is negative
    #[snafu(display("api return negative code {code}"))]
    NegativeCode {
        /// received response code
        code: i64,
    },
}

impl Error {
    /// The request failed before a structurally valid response came back:
    /// network, timeout, non-2xx, or the request could not be built.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::TokenInvalid { .. }
                | Error::EncodePayloadFailed { .. }
                | Error::BuildRequestFailed { .. }
                | Error::RequestFailed { .. }
                | Error::HTTPStatusNotOK { .. }
        )
    }

    /// A response came back but it is not a usable envelope.
    pub fn is_invalid_response(&self) -> bool {
        matches!(
            self,
            Error::ParseBodyFailed { .. } | Error::InvalidEnvelope { .. } | Error::NegativeCode { .. }
        )
    }

    /// Timeout or server side error, likely to go away on the next pass.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::RequestFailed { source, .. } => source.is_timeout(),
            Error::HTTPStatusNotOK { status_code, .. } => status_code.is_server_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = variant::HTTPStatusNotOK {
            method: reqwest::Method::POST,
            url: "http://localhost/api/network/ping",
            status_code: reqwest::StatusCode::BAD_GATEWAY,
        }
        .build();

        assert_eq!(
            err.to_string(),
            "POST http://localhost/api/network/ping answered with http status 502 Bad Gateway"
        );
        assert!(err.is_transport());
        assert!(err.is_transient());
    }
}
