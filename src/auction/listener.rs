//! Demand listeners.

use tokio::sync::mpsc;

use crate::auction::outcome::{AuctionOutcome, Keywords, ResultCode};

/// Receives the single outcome of each auction.
///
/// Callbacks run on the dispatcher task, never on the connector's task.
/// A listener that panics is logged and does not affect other auctions.
pub trait DemandListener: Send + Sync {
    fn on_demand_ready(&self, keywords: Keywords, auction_id: &str);

    fn on_demand_failed(&self, code: ResultCode, auction_id: &str);
}

/// An outcome delivered by `ChannelListener`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionNotice {
    pub auction_id: String,
    pub outcome: AuctionOutcome,
}

/// Listener that forwards outcomes over a channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<AuctionNotice>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuctionNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, auction_id: &str, outcome: AuctionOutcome) {
        let notice = AuctionNotice {
            auction_id: auction_id.to_string(),
            outcome,
        };
        if self.tx.send(notice).is_err() {
            tracing::debug!(auction_id, "Outcome receiver dropped");
        }
    }
}

impl DemandListener for ChannelListener {
    fn on_demand_ready(&self, keywords: Keywords, auction_id: &str) {
        self.forward(auction_id, AuctionOutcome::Success(keywords));
    }

    fn on_demand_failed(&self, code: ResultCode, auction_id: &str) {
        self.forward(auction_id, AuctionOutcome::Failure(code));
    }
}

/// Invoke the listener method matching `outcome`.
pub(crate) fn deliver(listener: &dyn DemandListener, auction_id: &str, outcome: AuctionOutcome) {
    match outcome {
        AuctionOutcome::Success(keywords) => listener.on_demand_ready(keywords, auction_id),
        AuctionOutcome::Failure(code) => listener.on_demand_failed(code, auction_id),
    }
}
