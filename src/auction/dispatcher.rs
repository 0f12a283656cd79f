//! Outcome dispatch.
//!
//! Connectors never call listeners directly. They hand a `Notification`
//! to the dispatcher, a single task that claims the completion token and
//! then invokes the listener. A cancellation that claimed the token first
//! turns the notification into a no-op.
//!
//! The notification owns the connector's registry registration, so the
//! registry entry disappears only after the listener has returned.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::auction::completion::CompletionToken;
use crate::auction::listener::{deliver, DemandListener};
use crate::auction::outcome::AuctionOutcome;
use crate::auction::registry::Registration;
use crate::observability::metrics;

pub(crate) struct Notification {
    pub auction_id: String,
    pub outcome: AuctionOutcome,
    pub listener: Arc<dyn DemandListener>,
    pub completion: Arc<CompletionToken>,
    pub registration: Registration,
}

#[derive(Clone)]
pub(crate) struct Dispatcher {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Dispatcher {
    /// Spawn the dispatch loop on `runtime`.
    pub fn spawn(runtime: &Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        runtime.spawn(run(rx));
        Self { tx }
    }

    pub fn dispatch(&self, notification: Notification) {
        if let Err(mpsc::error::SendError(notification)) = self.tx.send(notification) {
            tracing::warn!(
                auction_id = %notification.auction_id,
                "Dispatcher stopped, outcome dropped"
            );
        }
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        notify(notification);
    }
    tracing::debug!("Dispatcher stopped");
}

/// Deliver one notification. Returns whether the listener was called.
fn notify(notification: Notification) -> bool {
    let Notification {
        auction_id,
        outcome,
        listener,
        completion,
        registration,
    } = notification;

    if !completion.try_notify() {
        tracing::debug!(auction_id = %auction_id, "Auction cancelled, outcome discarded");
        return false;
    }

    tracing::debug!(auction_id = %auction_id, outcome = outcome.label(), "Notifying listener");
    metrics::record_outcome(&outcome);
    let result = catch_unwind(AssertUnwindSafe(|| {
        deliver(listener.as_ref(), &auction_id, outcome)
    }));
    if result.is_err() {
        tracing::error!(auction_id = %auction_id, "Demand listener panicked");
    }

    drop(registration);
    true
}
