//! Bid request payload subsystem.
//!
//! # Data Flow
//! ```text
//! RequestParams + EnvironmentProvider::snapshot() + ServerConfig + armed timeout
//!     → builder.rs (map to wire types)
//!     → openrtb.rs (serde structs)
//!     → JSON bytes handed to the transport
//! ```
//!
//! # Design Decisions
//! - Building is pure; a failure means the auction fails locally and no
//!   HTTP call is made
//! - Platform lookups (screen, carrier, location) are captured once per
//!   auction in an `Environment` value

pub mod builder;
pub mod environment;
pub mod openrtb;

pub use builder::{build_bid_request, encode_bid_request, PayloadError};
pub use environment::{Environment, EnvironmentProvider, StaticEnvironment};
