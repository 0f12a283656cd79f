//! Request parameter model.
//!
//! `RequestParams` is built once per auction by the caller and handed to
//! `AuctionRegistry::submit`, which moves it into the connector. Nothing
//! mutates it afterwards.

pub mod params;

pub use params::{
    AdSize, AdType, NativeAssetClass, NativeAssetKind, NativeAssetParams, NativeRequestVersion,
    ParamsError, RequestParams,
};
