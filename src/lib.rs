//! Client-side header-bidding auction library.
//!
//! Submits ad placement requests to an OpenRTB auction server, races each
//! exchange against an adaptive timeout, classifies the reply and reports
//! exactly one outcome per auction unless it is cancelled first.

pub mod auction;
pub mod config;
pub mod observability;
pub mod payload;
pub mod request;
pub mod transport;

pub use auction::{
    AdaptiveTimeout, AuctionNotice, AuctionOutcome, AuctionRegistry, ChannelListener,
    DemandListener, Keywords, RegistryBuilder, RegistryError, ResultCode,
};
pub use config::ClientConfig;
pub use request::{AdSize, AdType, RequestParams};
