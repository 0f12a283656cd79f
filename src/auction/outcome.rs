//! Auction outcome types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Targeting keywords returned by a successful auction.
pub type Keywords = HashMap<String, String>;

/// Why an auction produced no demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    /// The server has no stored request for the account id.
    #[error("invalid account id")]
    InvalidAccountId,

    /// The server has no stored impression for the config id.
    #[error("invalid config id")]
    InvalidConfigId,

    /// The requested sizes were rejected.
    #[error("invalid ad size")]
    InvalidSize,

    /// Required platform context was unavailable.
    #[error("invalid context")]
    InvalidContext,

    /// Any other server or client-side failure.
    #[error("auction server error")]
    ServerError,

    /// No response before the deadline.
    #[error("auction timed out")]
    Timeout,

    /// The auction ran but returned no usable bid.
    #[error("no bids")]
    NoBids,
}

impl ResultCode {
    /// Stable label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::InvalidAccountId => "invalid_account_id",
            ResultCode::InvalidConfigId => "invalid_config_id",
            ResultCode::InvalidSize => "invalid_size",
            ResultCode::InvalidContext => "invalid_context",
            ResultCode::ServerError => "server_error",
            ResultCode::Timeout => "timeout",
            ResultCode::NoBids => "no_bids",
        }
    }
}

/// The single result reported for an auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum AuctionOutcome {
    Success(Keywords),
    Failure(ResultCode),
}

impl AuctionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuctionOutcome::Success(_))
    }

    /// Label used for the outcome metric.
    pub fn label(&self) -> &'static str {
        match self {
            AuctionOutcome::Success(_) => "success",
            AuctionOutcome::Failure(code) => code.as_str(),
        }
    }
}

impl From<ResultCode> for AuctionOutcome {
    fn from(code: ResultCode) -> Self {
        AuctionOutcome::Failure(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_serialization() {
        let failure = serde_json::to_value(AuctionOutcome::Failure(ResultCode::NoBids)).unwrap();
        assert_eq!(failure, json!({"status": "failure", "value": "no_bids"}));

        let keywords = Keywords::from([("hb_pb".to_string(), "0.50".to_string())]);
        let success = serde_json::to_value(AuctionOutcome::Success(keywords)).unwrap();
        assert_eq!(success, json!({"status": "success", "value": {"hb_pb": "0.50"}}));
    }

    #[test]
    fn test_labels() {
        assert_eq!(AuctionOutcome::from(ResultCode::Timeout).label(), "timeout");
        assert_eq!(AuctionOutcome::Success(Keywords::new()).label(), "success");
        assert_eq!(ResultCode::InvalidAccountId.to_string(), "invalid account id");
    }
}
