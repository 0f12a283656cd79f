//! HTTP client for the auction server.
//!
//! # Responsibilities
//! - POST the encoded bid request with JSON content headers
//! - Attach the session cookie when one is stored
//! - Read the full response body and any `Set-Cookie` headers
//!
//! # Design Decisions
//! - The transport never applies the auction timeout itself; the connector
//!   races it against a countdown and drops the future to abort
//! - Non-200 statuses are not errors here; classification happens upstream

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, SET_COOKIE};

use crate::config::TimeoutConfig;
use crate::transport::error::{TransportError, TransportResult};

/// One outbound auction call.
#[derive(Debug, Clone)]
pub struct AuctionRequest {
    pub url: String,
    pub body: Vec<u8>,
    /// Value for the `Cookie` header, if a session cookie is stored.
    pub cookie: Option<String>,
}

/// The server's reply, fully read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionReply {
    pub status: u16,
    pub body: String,
    pub set_cookies: Vec<String>,
}

/// Sends auction requests. Implemented by `ReqwestTransport` and by
/// scripted transports in tests.
pub trait AuctionTransport: Send + Sync {
    /// Perform the exchange. Dropping the returned future aborts it.
    fn post(&self, request: AuctionRequest) -> BoxFuture<'_, TransportResult<AuctionReply>>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport whose connect timeout is the configured upper bound.
    pub fn new(timeouts: &TimeoutConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(timeouts.upper_bound_ms))
            .build()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(Self { client })
    }
}

impl AuctionTransport for ReqwestTransport {
    fn post(&self, request: AuctionRequest) -> BoxFuture<'_, TransportResult<AuctionReply>> {
        async move {
            let mut builder = self
                .client
                .post(&request.url)
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, "application/json")
                .body(request.body);
            if let Some(cookie) = request.cookie {
                builder = builder.header(COOKIE, cookie);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let set_cookies = response
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(str::to_string)
                .collect();
            let body = response.text().await?;

            tracing::debug!(status, bytes = body.len(), "Auction response read");
            Ok(AuctionReply {
                status,
                body,
                set_cookies,
            })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let transport = ReqwestTransport::new(&TimeoutConfig::default()).unwrap();
        let err = transport
            .post(AuctionRequest {
                url: "::nope::".into(),
                body: b"{}".to_vec(),
                cookie: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_io_error() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = ReqwestTransport::new(&TimeoutConfig::default()).unwrap();
        let err = transport
            .post(AuctionRequest {
                url: format!("http://127.0.0.1:{}/auction", port),
                body: b"{}".to_vec(),
                cookie: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
