//! Per-auction connector task.
//!
//! # Responsibilities
//! - Build and send one bid request
//! - Race the exchange against the countdown and against cancellation
//! - Classify the reply and hand the outcome to the dispatcher
//! - Feed the adaptive timeout from successful auctions
//!
//! # Lifecycle
//! ```text
//! Created ──▶ Running ──┬── Cancelled ──────────────────────────────▶ Retired
//!  (submit)   (spawned) ├── TimedOut  ── Failure(Timeout) ──▶ notify ──▶ Retired
//!                       └── exchange  ── Succeeded | Failed ──▶ notify ──▶ Retired
//! ```
//!
//! `Retired` is the drop of the connector's `Registration`.
//!
//! Losing branches of the race are dropped, which aborts an in-flight HTTP
//! exchange and stops the countdown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::auction::classifier::{classify_response, classify_transport_error, Classification};
use crate::auction::completion::CompletionToken;
use crate::auction::dispatcher::{Dispatcher, Notification};
use crate::auction::listener::DemandListener;
use crate::auction::outcome::{AuctionOutcome, ResultCode};
use crate::auction::registry::Registration;
use crate::auction::timeout::{AdaptiveTimeout, Countdown};
use crate::config::{CookieConfig, ServerConfig};
use crate::observability::metrics;
use crate::payload::{encode_bid_request, EnvironmentProvider};
use crate::request::RequestParams;
use crate::transport::cookies::{session_cookie, sync_session_cookies};
use crate::transport::{AuctionRequest, AuctionTransport, SessionCookieStore};

/// Collaborators shared by every connector of a registry.
pub(crate) struct ConnectorServices {
    pub transport: Arc<dyn AuctionTransport>,
    pub environment: Arc<dyn EnvironmentProvider>,
    pub cookies: Arc<dyn SessionCookieStore>,
    pub cookie_config: CookieConfig,
    pub adaptive: Arc<AdaptiveTimeout>,
    pub dispatcher: Dispatcher,
}

pub(crate) struct Connector {
    pub auction_id: String,
    pub params: RequestParams,
    pub listener: Arc<dyn DemandListener>,
    pub server: Arc<ServerConfig>,
    pub services: Arc<ConnectorServices>,
    pub completion: Arc<CompletionToken>,
    pub cancel: CancellationToken,
    pub countdown: Countdown,
    pub registration: Registration,
}

enum Resolution {
    Cancelled,
    TimedOut,
    Completed(Exchange),
}

/// Result of the network leg.
struct Exchange {
    classification: Classification,
    round_trip: Option<Duration>,
}

impl Exchange {
    fn failed(code: ResultCode) -> Self {
        Self {
            classification: code.into(),
            round_trip: None,
        }
    }
}

impl Connector {
    pub(crate) async fn run(self) {
        let span = tracing::info_span!("auction", auction_id = %self.auction_id);
        self.drive().instrument(span).await
    }

    async fn drive(self) {
        let timeout_ms = u64::try_from(self.countdown.duration().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(timeout_ms, "Connector running");

        let resolution = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Resolution::Cancelled,
            _ = self.countdown.expired() => Resolution::TimedOut,
            exchange = self.exchange(timeout_ms) => Resolution::Completed(exchange),
        };
        self.countdown.cancel();

        let outcome = match resolution {
            Resolution::Cancelled => {
                tracing::info!("Auction cancelled");
                return;
            }
            Resolution::TimedOut => {
                tracing::warn!(timeout_ms, "Auction timed out");
                AuctionOutcome::Failure(ResultCode::Timeout)
            }
            Resolution::Completed(exchange) => self.settle(exchange),
        };

        let Connector {
            auction_id,
            listener,
            completion,
            registration,
            services,
            ..
        } = self;
        services.dispatcher.dispatch(Notification {
            auction_id,
            outcome,
            listener,
            completion,
            registration,
        });
    }

    /// Apply side effects of a completed exchange and return its outcome.
    fn settle(&self, exchange: Exchange) -> AuctionOutcome {
        let Exchange {
            classification,
            round_trip,
        } = exchange;

        if let (true, Some(suggested), Some(rtt)) = (
            classification.outcome.is_success(),
            classification.suggested_tmax_ms,
            round_trip,
        ) {
            if let Some(updated_ms) = self.services.adaptive.observe(rtt, suggested) {
                tracing::info!(
                    timeout_ms = updated_ms,
                    round_trip_ms = rtt.as_millis() as u64,
                    tmaxrequest = suggested,
                    "Adaptive timeout updated"
                );
                metrics::record_timeout_ms(updated_ms);
            }
        }

        match &classification.outcome {
            AuctionOutcome::Success(keywords) => {
                tracing::info!(keywords = keywords.len(), "Auction succeeded")
            }
            AuctionOutcome::Failure(code) => {
                tracing::info!(code = code.as_str(), "Auction failed")
            }
        }
        classification.outcome
    }

    async fn exchange(&self, tmax_ms: u64) -> Exchange {
        let environment = self.services.environment.snapshot();
        let body = match encode_bid_request(&self.params, &environment, &self.server, tmax_ms) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build bid request");
                return Exchange::failed(ResultCode::ServerError);
            }
        };

        let services = &self.services;
        let request = AuctionRequest {
            url: self.server.host_url.clone(),
            body,
            cookie: session_cookie(services.cookies.as_ref(), &services.cookie_config),
        };
        tracing::debug!(
            url = %request.url,
            bytes = request.body.len(),
            session = request.cookie.is_some(),
            "Sending bid request"
        );

        let started = Instant::now();
        let reply = match services.transport.post(request).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Auction request failed");
                return Exchange::failed(classify_transport_error(&e));
            }
        };
        let round_trip = started.elapsed();
        metrics::record_round_trip(round_trip);

        if reply.status == 200 {
            sync_session_cookies(
                services.cookies.as_ref(),
                &services.cookie_config,
                &reply.set_cookies,
            );
        }
        tracing::debug!(
            status = reply.status,
            round_trip_ms = round_trip.as_millis() as u64,
            "Auction response received"
        );

        Exchange {
            classification: classify_response(reply.status, &reply.body),
            round_trip: Some(round_trip),
        }
    }
}
