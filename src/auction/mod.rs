//! Auction orchestration.
//!
//! # Data Flow
//! ```text
//! AuctionRegistry::submit
//!     → registry.rs (register handle, spawn connector)
//!     → connector.rs (race: cancel | countdown | exchange)
//!         → payload (encode bid request)
//!         → transport (POST, session cookie)
//!         → classifier.rs (status + body → outcome)
//!     → dispatcher.rs (claim completion token, call listener)
//!     → registration dropped (registry entry removed)
//!
//! AuctionRegistry::cancel
//!     → completion.rs (claim token) + cancellation token fired
//!     → connector drops its exchange and retires silently
//! ```
//!
//! # Design Decisions
//! - At most one listener callback per submitted auction, arbitrated by an
//!   atomic completion token shared with `cancel`
//! - Listener callbacks are serialized on one dispatcher task
//! - The adaptive timeout is shared process-wide and adjusts once

pub mod classifier;
pub mod completion;
mod connector;
mod dispatcher;
pub mod listener;
pub mod outcome;
pub mod registry;
pub mod timeout;

pub use classifier::{classify_response, classify_transport_error, Classification};
pub use completion::{CompletionState, CompletionToken};
pub use listener::{AuctionNotice, ChannelListener, DemandListener};
pub use outcome::{AuctionOutcome, Keywords, ResultCode};
pub use registry::{AuctionRegistry, RegistryBuilder, RegistryError};
pub use timeout::{AdaptiveTimeout, Countdown};
