//! Registry of in-flight auctions.
//!
//! # Responsibilities
//! - Start one connector per `submit`
//! - Track live connectors by auction id so they can be cancelled
//! - Retire connectors once they have been cancelled or have notified
//!
//! # Design Decisions
//! - Several connectors may share an auction id; `cancel` stops all of them
//! - Each connector holds a `Registration` that removes its own entry on
//!   drop, so a connector can never outlive its bookkeeping or vice versa
//! - Registrations hold a weak reference: dropping the registry does not
//!   stop in-flight connectors, their self-removal just becomes a no-op

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::auction::completion::CompletionToken;
use crate::auction::connector::{Connector, ConnectorServices};
use crate::auction::dispatcher::Dispatcher;
use crate::auction::listener::DemandListener;
use crate::auction::timeout::{AdaptiveTimeout, Countdown};
use crate::config::{ClientConfig, ServerConfig};
use crate::observability::metrics;
use crate::payload::{EnvironmentProvider, StaticEnvironment};
use crate::request::RequestParams;
use crate::transport::{
    AuctionTransport, InMemoryCookieStore, ReqwestTransport, SessionCookieStore, TransportError,
};

/// Registry construction errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),

    #[error("failed to create transport: {0}")]
    Transport(#[from] TransportError),
}

/// Cancellation handle for one live connector.
#[derive(Debug)]
struct ConnectorHandle {
    seq: u64,
    completion: Arc<CompletionToken>,
    cancel: CancellationToken,
}

impl ConnectorHandle {
    fn cancel(&self) -> bool {
        let claimed = self.completion.try_cancel();
        self.cancel.cancel();
        claimed
    }
}

#[derive(Debug, Default)]
pub(crate) struct RegistryInner {
    connectors: DashMap<String, Vec<ConnectorHandle>>,
}

impl RegistryInner {
    fn insert(&self, auction_id: &str, handle: ConnectorHandle) {
        self.connectors
            .entry(auction_id.to_string())
            .or_default()
            .push(handle);
        metrics::record_active_connectors(self.len());
    }

    fn remove(&self, auction_id: &str, seq: u64) {
        if let Some(mut handles) = self.connectors.get_mut(auction_id) {
            handles.retain(|h| h.seq != seq);
        }
        self.connectors
            .remove_if(auction_id, |_, handles| handles.is_empty());
        metrics::record_active_connectors(self.len());
    }

    fn len(&self) -> usize {
        self.connectors.iter().map(|entry| entry.value().len()).sum()
    }
}

/// Guard tying a connector to its registry entry.
pub(crate) struct Registration {
    registry: Weak<RegistryInner>,
    auction_id: String,
    seq: u64,
}

impl Registration {
    /// A registration not backed by any registry.
    #[cfg(test)]
    pub(crate) fn detached(auction_id: &str) -> Self {
        Self {
            registry: Weak::new(),
            auction_id: auction_id.to_string(),
            seq: 0,
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.auction_id, self.seq);
        }
    }
}

/// Entry point for running auctions.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use auction_client::{AuctionRegistry, ChannelListener, ClientConfig, RequestParams};
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = AuctionRegistry::builder(ClientConfig::default()).build()?;
/// let (listener, mut outcomes) = ChannelListener::new();
/// registry.submit(RequestParams::interstitial("imp-1")?, Arc::new(listener), "auction-1");
/// let notice = outcomes.recv().await;
/// # Ok(())
/// # }
/// ```
pub struct AuctionRegistry {
    inner: Arc<RegistryInner>,
    services: Arc<ConnectorServices>,
    server: ArcSwap<ServerConfig>,
    runtime: Handle,
    next_seq: AtomicU64,
}

impl AuctionRegistry {
    pub fn builder(config: ClientConfig) -> RegistryBuilder {
        RegistryBuilder::new(config)
    }

    /// Start an auction. The outcome is reported to `listener` exactly once
    /// unless the auction is cancelled first.
    ///
    /// Never blocks and may be called from any thread.
    pub fn submit(
        &self,
        params: RequestParams,
        listener: Arc<dyn DemandListener>,
        auction_id: impl Into<String>,
    ) {
        let auction_id = auction_id.into();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let completion = Arc::new(CompletionToken::new());
        let cancel = CancellationToken::new();
        let timeout = self.services.adaptive.current();

        self.inner.insert(
            &auction_id,
            ConnectorHandle {
                seq,
                completion: Arc::clone(&completion),
                cancel: cancel.clone(),
            },
        );

        let connector = Connector {
            registration: Registration {
                registry: Arc::downgrade(&self.inner),
                auction_id: auction_id.clone(),
                seq,
            },
            auction_id,
            params,
            listener,
            server: self.server.load_full(),
            services: Arc::clone(&self.services),
            completion,
            cancel,
            countdown: Countdown::new(timeout),
        };

        tracing::debug!(
            auction_id = %connector.auction_id,
            timeout_ms = timeout.as_millis() as u64,
            "Auction submitted"
        );
        metrics::record_submitted();
        self.runtime.spawn(connector.run());
    }

    /// Cancel every live connector for `auction_id`. Unknown ids are a no-op.
    ///
    /// Returns how many connectors were stopped before notifying. A zero
    /// return for a live id means its outcome is already being delivered.
    pub fn cancel(&self, auction_id: &str) -> usize {
        let Some(handles) = self.inner.connectors.get(auction_id) else {
            tracing::debug!(auction_id, "Cancel for unknown auction ignored");
            return 0;
        };
        let cancelled = handles.iter().filter(|h| h.cancel()).count();
        drop(handles);

        tracing::info!(auction_id, cancelled, "Auction cancelled");
        metrics::record_cancelled(cancelled);
        cancelled
    }

    /// Cancel every live connector. Returns how many were stopped.
    pub fn cancel_all(&self) -> usize {
        let cancelled: usize = self
            .inner
            .connectors
            .iter()
            .map(|entry| entry.value().iter().filter(|h| h.cancel()).count())
            .sum();
        tracing::info!(cancelled, "All auctions cancelled");
        metrics::record_cancelled(cancelled);
        cancelled
    }

    /// Number of connectors not yet retired.
    pub fn active_count(&self) -> usize {
        self.inner.len()
    }

    pub fn is_active(&self, auction_id: &str) -> bool {
        self.inner.connectors.contains_key(auction_id)
    }

    pub fn adaptive_timeout(&self) -> &AdaptiveTimeout {
        &self.services.adaptive
    }

    /// Replace server settings for auctions submitted from now on.
    pub fn update_server(&self, server: ServerConfig) {
        tracing::info!(host = %server.host_url, "Server settings updated");
        self.server.store(Arc::new(server));
    }

    pub fn server(&self) -> Arc<ServerConfig> {
        self.server.load_full()
    }
}

/// Builds an `AuctionRegistry`, defaulting every collaborator not supplied.
pub struct RegistryBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn AuctionTransport>>,
    environment: Option<Arc<dyn EnvironmentProvider>>,
    cookies: Option<Arc<dyn SessionCookieStore>>,
    adaptive: Option<Arc<AdaptiveTimeout>>,
    runtime: Option<Handle>,
}

impl RegistryBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            environment: None,
            cookies: None,
            adaptive: None,
            runtime: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn AuctionTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn environment(mut self, environment: Arc<dyn EnvironmentProvider>) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn cookie_store(mut self, cookies: Arc<dyn SessionCookieStore>) -> Self {
        self.cookies = Some(cookies);
        self
    }

    /// Share an adaptive timeout between registries.
    pub fn adaptive_timeout(mut self, adaptive: Arc<AdaptiveTimeout>) -> Self {
        self.adaptive = Some(adaptive);
        self
    }

    /// Run connectors on `runtime` instead of the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<AuctionRegistry, RegistryError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| RegistryError::NoRuntime(e.to_string()))?,
        };

        let transport: Arc<dyn AuctionTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(&self.config.timeouts)?),
        };
        let environment = self.environment.unwrap_or_else(|| {
            Arc::new(StaticEnvironment::new(self.config.environment.clone()))
        });
        let cookies = self
            .cookies
            .unwrap_or_else(|| Arc::new(InMemoryCookieStore::new()));
        let adaptive = self
            .adaptive
            .unwrap_or_else(|| Arc::new(AdaptiveTimeout::from_config(&self.config.timeouts)));
        metrics::record_timeout_ms(adaptive.current_ms());

        let services = ConnectorServices {
            transport,
            environment,
            cookies,
            cookie_config: self.config.cookies,
            adaptive,
            dispatcher: Dispatcher::spawn(&runtime),
        };

        Ok(AuctionRegistry {
            inner: Arc::new(RegistryInner::default()),
            services: Arc::new(services),
            server: ArcSwap::from_pointee(self.config.server),
            runtime,
            next_seq: AtomicU64::new(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::listener::{AuctionNotice, ChannelListener};
    use crate::auction::outcome::{AuctionOutcome, Keywords, ResultCode};
    use crate::auction::testing::ScriptedTransport;
    use crate::request::AdSize;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn config() -> ClientConfig {
        let mut config = ClientConfig::default();
        config.server.account_id = "acct-1".into();
        config
    }

    fn banner() -> RequestParams {
        RequestParams::banner("imp-1", vec![AdSize::new(300, 250).unwrap()]).unwrap()
    }

    fn registry(transport: Arc<ScriptedTransport>, config: ClientConfig) -> AuctionRegistry {
        AuctionRegistry::builder(config)
            .transport(transport)
            .build()
            .unwrap()
    }

    fn winning_body(tmax: Option<u64>) -> String {
        let mut body = json!({
            "id": "r",
            "seatbid": [{"bid": [{"ext": {"prebid": {"targeting": {
                "hb_cache_id": "c-1",
                "hb_pb": "0.50"
            }}}}]}]
        });
        if let Some(tmax) = tmax {
            body["ext"] = json!({"tmaxrequest": tmax});
        }
        body.to_string()
    }

    async fn next(rx: &mut UnboundedReceiver<AuctionNotice>) -> AuctionNotice {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no outcome in time")
            .expect("listener channel closed")
    }

    async fn wait_idle(registry: &AuctionRegistry) {
        for _ in 0..200 {
            if registry.active_count() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("registry still has {} connectors", registry.active_count());
    }

    #[tokio::test]
    async fn test_success_notifies_once_and_retires() {
        let transport = ScriptedTransport::replying(200, winning_body(None));
        let registry = registry(transport.clone(), config());
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "a1");
        assert!(registry.is_active("a1"));

        let notice = next(&mut rx).await;
        assert_eq!(notice.auction_id, "a1");
        let expected = Keywords::from([
            ("hb_cache_id".to_string(), "c-1".to_string()),
            ("hb_pb".to_string(), "0.50".to_string()),
        ]);
        assert_eq!(notice.outcome, AuctionOutcome::Success(expected));

        wait_idle(&registry).await;
        assert!(!registry.is_active("a1"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let transport = ScriptedTransport::replying(200, winning_body(None))
            .with_delay(Duration::from_secs(2));
        let mut config = config();
        config.timeouts.default_ms = 100;
        let registry = registry(transport, config);
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "slow");
        let notice = next(&mut rx).await;
        assert_eq!(notice.outcome, AuctionOutcome::Failure(ResultCode::Timeout));

        wait_idle(&registry).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fast_failure_is_not_a_timeout() {
        let transport = ScriptedTransport::replying(200, r#"{"id":"r"}"#);
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "nobid");
        let notice = next(&mut rx).await;
        assert_eq!(notice.outcome, AuctionOutcome::Failure(ResultCode::NoBids));
    }

    #[tokio::test]
    async fn test_bad_request_classified() {
        let transport = ScriptedTransport::replying(
            400,
            "Invalid request: Stored Imp with ID=\"imp-1\" not found.",
        );
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "bad");
        assert_eq!(
            next(&mut rx).await.outcome,
            AuctionOutcome::Failure(ResultCode::InvalidConfigId)
        );
    }

    #[tokio::test]
    async fn test_transport_errors_classified() {
        let transport = ScriptedTransport::failing(TransportError::Io("reset".into()));
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "io");
        assert_eq!(
            next(&mut rx).await.outcome,
            AuctionOutcome::Failure(ResultCode::ServerError)
        );
    }

    #[tokio::test]
    async fn test_cancel_suppresses_notification() {
        let transport = ScriptedTransport::replying(200, winning_body(None))
            .with_delay(Duration::from_millis(300));
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "c1");
        tokio::time::sleep(Duration::from_millis(20)).await;
        registry.cancel("c1");

        wait_idle(&registry).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_immediately_after_submit() {
        let transport = ScriptedTransport::replying(200, winning_body(None));
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "c2");
        assert_eq!(registry.cancel("c2"), 1);

        wait_idle(&registry).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_after_notification_stops_nothing() {
        let transport = ScriptedTransport::replying(200, winning_body(None));
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "done");
        next(&mut rx).await;
        assert_eq!(registry.cancel("done"), 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_is_noop() {
        let transport = ScriptedTransport::replying(200, winning_body(None));
        let registry = registry(transport, config());
        assert_eq!(registry.cancel("never-submitted"), 0);
        assert_eq!(registry.cancel_all(), 0);
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_shared_auction_id() {
        let transport = ScriptedTransport::replying(200, winning_body(None))
            .with_delay(Duration::from_millis(50));
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();
        let listener = Arc::new(listener);

        registry.submit(banner(), listener.clone(), "dup");
        registry.submit(banner(), listener, "dup");
        assert_eq!(registry.active_count(), 2);

        assert!(next(&mut rx).await.outcome.is_success());
        assert!(next(&mut rx).await.outcome.is_success());
        wait_idle(&registry).await;
    }

    #[tokio::test]
    async fn test_cancel_stops_every_connector_for_id() {
        let transport = ScriptedTransport::replying(200, winning_body(None))
            .with_delay(Duration::from_millis(300));
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();
        let listener = Arc::new(listener);

        registry.submit(banner(), listener.clone(), "dup");
        registry.submit(banner(), listener.clone(), "dup");
        registry.submit(banner(), listener, "other");
        registry.cancel("dup");

        let notice = next(&mut rx).await;
        assert_eq!(notice.auction_id, "other");
        wait_idle(&registry).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let transport = ScriptedTransport::replying(200, winning_body(None))
            .with_delay(Duration::from_millis(300));
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();
        let listener = Arc::new(listener);

        registry.submit(banner(), listener.clone(), "x");
        registry.submit(banner(), listener, "y");
        assert_eq!(registry.cancel_all(), 2);

        wait_idle(&registry).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_adaptive_timeout_updates_once() {
        let transport = ScriptedTransport::replying(200, winning_body(Some(300)));
        let registry = registry(transport.clone(), config());
        let (listener, mut rx) = ChannelListener::new();
        let listener = Arc::new(listener);

        registry.submit(banner(), listener.clone(), "first");
        next(&mut rx).await;
        let adapted = registry.adaptive_timeout().current_ms();
        assert!(registry.adaptive_timeout().is_updated());
        assert!((500..=2000).contains(&adapted), "adapted to {adapted}");

        registry.submit(banner(), listener, "second");
        next(&mut rx).await;
        assert_eq!(registry.adaptive_timeout().current_ms(), adapted);

        // The second request carries the adapted deadline.
        let sent: Value = serde_json::from_slice(&transport.requests()[1].body).unwrap();
        assert_eq!(sent["tmax"], json!(adapted));
    }

    #[tokio::test]
    async fn test_failed_auction_leaves_timeout_alone() {
        let transport = ScriptedTransport::replying(200, r#"{"ext":{"tmaxrequest":100}}"#);
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "nobid");
        next(&mut rx).await;
        assert!(!registry.adaptive_timeout().is_updated());
        assert_eq!(registry.adaptive_timeout().current_ms(), 2000);
    }

    #[tokio::test]
    async fn test_payload_failure_skips_transport() {
        let transport = ScriptedTransport::replying(200, winning_body(None));
        let mut config = config();
        config.environment.device.display = None;
        let registry = registry(transport.clone(), config);
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(
            RequestParams::interstitial("imp-1").unwrap(),
            Arc::new(listener),
            "inter",
        );
        assert_eq!(
            next(&mut rx).await.outcome,
            AuctionOutcome::Failure(ResultCode::ServerError)
        );
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_session_cookie_round_trip() {
        let transport = ScriptedTransport::replying(200, winning_body(None))
            .with_set_cookie("uuid2=session-1; Path=/");
        let registry = registry(transport.clone(), config());
        let (listener, mut rx) = ChannelListener::new();
        let listener = Arc::new(listener);

        registry.submit(banner(), listener.clone(), "c1");
        next(&mut rx).await;
        registry.submit(banner(), listener, "c2");
        next(&mut rx).await;

        let requests = transport.requests();
        assert_eq!(requests[0].cookie, None);
        assert_eq!(requests[1].cookie.as_deref(), Some("uuid2=session-1"));
    }

    #[tokio::test]
    async fn test_update_server_applies_to_new_auctions() {
        let transport = ScriptedTransport::replying(200, winning_body(None));
        let registry = registry(transport.clone(), config());
        let (listener, mut rx) = ChannelListener::new();

        let mut server = (*registry.server()).clone();
        server.host_url = "http://127.0.0.1:1/other".into();
        server.account_id = "acct-2".into();
        registry.update_server(server);

        registry.submit(banner(), Arc::new(listener), "moved");
        next(&mut rx).await;

        let request = &transport.requests()[0];
        assert_eq!(request.url, "http://127.0.0.1:1/other");
        let sent: Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(sent["app"]["publisher"]["id"], "acct-2");
    }

    #[tokio::test]
    async fn test_dropped_registry_still_notifies() {
        let transport = ScriptedTransport::replying(200, winning_body(None))
            .with_delay(Duration::from_millis(50));
        let registry = registry(transport, config());
        let (listener, mut rx) = ChannelListener::new();

        registry.submit(banner(), Arc::new(listener), "orphan");
        drop(registry);

        assert!(next(&mut rx).await.outcome.is_success());
    }

    #[test]
    fn test_build_without_runtime() {
        let result = AuctionRegistry::builder(config()).build();
        assert!(matches!(result, Err(RegistryError::NoRuntime(_))));
    }

    #[test]
    fn test_submit_from_plain_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = ScriptedTransport::replying(200, winning_body(None));
        let registry = AuctionRegistry::builder(config())
            .transport(transport)
            .runtime(runtime.handle().clone())
            .build()
            .unwrap();
        let (listener, mut rx) = ChannelListener::new();

        std::thread::spawn(move || {
            registry.submit(banner(), Arc::new(listener), "threaded");
            std::thread::sleep(Duration::from_millis(200));
        })
        .join()
        .unwrap();

        let notice = runtime.block_on(next(&mut rx));
        assert_eq!(notice.auction_id, "threaded");
    }
}
