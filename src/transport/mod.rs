//! Transport subsystem.
//!
//! # Data Flow
//! ```text
//! Connector
//!     → cookies.rs (look up session cookie)
//!     → client.rs (POST body, read status + body + Set-Cookie)
//!     → cookies.rs (sync session cookie on HTTP 200)
//!     → classifier
//! ```
//!
//! # Design Decisions
//! - `AuctionTransport` is the seam tests replace with scripted transports
//! - Timeout vs other I/O failures are distinct error variants
//! - Aborting an exchange is done by dropping its future

pub mod client;
pub mod cookies;
pub mod error;

pub use client::{AuctionReply, AuctionRequest, AuctionTransport, ReqwestTransport};
pub use cookies::{InMemoryCookieStore, SessionCookieStore};
pub use error::{TransportError, TransportResult};
