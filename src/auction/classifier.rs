//! Response classification.
//!
//! # Responsibilities
//! - Map HTTP 200 bodies to targeting keywords or `NoBids`
//! - Map HTTP 400 bodies to a result code by fixed-precedence text matching
//! - Map transport failures to `Timeout` or `ServerError`
//!
//! # Design Decisions
//! - Pure functions, no I/O
//! - No regex: the server messages are matched with a small token matcher
//!   that mirrors the anchored patterns the server contract was written
//!   against (`\d` digit, `.` any character except a line terminator)
//! - The 400 precedence order is part of the contract and must not change

use serde_json::Value;

use crate::auction::outcome::{AuctionOutcome, Keywords, ResultCode};
use crate::transport::TransportError;

/// Key whose presence marks a bid as the top bid.
pub const CACHE_ID_KEY: &str = "hb_cache_id";

/// Classifier output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: AuctionOutcome,
    /// Server processing time suggested in `ext.tmaxrequest`, if present.
    pub suggested_tmax_ms: Option<u64>,
}

impl From<ResultCode> for Classification {
    fn from(code: ResultCode) -> Self {
        Self {
            outcome: AuctionOutcome::Failure(code),
            suggested_tmax_ms: None,
        }
    }
}

/// Classify a fully read HTTP response.
pub fn classify_response(status: u16, body: &str) -> Classification {
    match status {
        200 => classify_bid_response(body),
        400 => classify_bad_request(body).into(),
        _ => ResultCode::ServerError.into(),
    }
}

/// Classify a transport failure.
pub fn classify_transport_error(err: &TransportError) -> ResultCode {
    match err {
        TransportError::Timeout(_) => ResultCode::Timeout,
        TransportError::InvalidUrl(_) | TransportError::Io(_) => ResultCode::ServerError,
    }
}

/// Classify an HTTP 200 body.
pub fn classify_bid_response(body: &str) -> Classification {
    let response: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed auction response");
            return ResultCode::ServerError.into();
        }
    };

    let suggested_tmax_ms = response
        .pointer("/ext/tmaxrequest")
        .and_then(Value::as_i64)
        .and_then(|v| u64::try_from(v).ok());

    let (keywords, has_top_bid) = extract_keywords(&response);
    let outcome = if !keywords.is_empty() && has_top_bid {
        AuctionOutcome::Success(keywords)
    } else {
        AuctionOutcome::Failure(ResultCode::NoBids)
    };

    Classification {
        outcome,
        suggested_tmax_ms,
    }
}

/// Collect targeting keywords from every bid carrying a cache id.
///
/// Returns the merged keywords (last write wins) and whether any bid had
/// the exact top-bid key.
pub fn extract_keywords(response: &Value) -> (Keywords, bool) {
    let mut keywords = Keywords::new();
    let mut has_top_bid = false;

    let seats = response
        .get("seatbid")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let bids = seats
        .iter()
        .filter_map(|seat| seat.get("bid").and_then(Value::as_array))
        .flatten();

    for bid in bids {
        // Lower bids on the same seat may carry no targeting.
        let Some(targeting) = bid
            .pointer("/ext/prebid/targeting")
            .and_then(Value::as_object)
        else {
            continue;
        };

        if targeting.contains_key(CACHE_ID_KEY) {
            has_top_bid = true;
        }
        if !targeting.keys().any(|k| k.starts_with(CACHE_ID_KEY)) {
            continue;
        }
        for (key, value) in targeting {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            keywords.insert(key.clone(), value);
        }
    }

    (keywords, has_top_bid)
}

/// Classify an HTTP 400 body. First match wins.
pub fn classify_bad_request(body: &str) -> ResultCode {
    if stored_not_found(body, "Request") || body.contains("No stored request") {
        ResultCode::InvalidAccountId
    } else if stored_not_found(body, "Imp") || body.contains("No stored imp") {
        ResultCode::InvalidConfigId
    } else if invalid_banner_format(body)
        || body.contains("Invalid request: Unable to set interstitial size list")
        || body.contains("Request imp[0].banner.format")
    {
        ResultCode::InvalidSize
    } else {
        ResultCode::ServerError
    }
}

/// `Invalid request: Stored <what> with ID="…" not found.` at the start of the body.
fn stored_not_found(body: &str, what: &str) -> bool {
    const NOT_FOUND: &str = "\" not found";

    let line = first_line(body);
    let Some(rest) = line
        .strip_prefix("Invalid request: Stored ")
        .and_then(|r| r.strip_prefix(what))
        .and_then(|r| r.strip_prefix(" with ID=\""))
    else {
        return false;
    };

    // The message must continue for at least one character after "not found".
    rest.match_indices(NOT_FOUND)
        .any(|(i, m)| i + m.len() < rest.len())
}

/// `Invalid request: Request imp[d].banner.format[d] must define non-zero "h" and "w" properties.`
fn invalid_banner_format(body: &str) -> bool {
    use Token::*;
    matches_tokens(
        body,
        &[
            Lit("Invalid request: Request imp["),
            Digit,
            Lit("]"),
            Any,
            Lit("banner"),
            Any,
            Lit("format["),
            Digit,
            Lit("] must define non-zero \"h\" and \"w\" properties"),
            Any,
        ],
    )
}

enum Token {
    Lit(&'static str),
    Digit,
    Any,
}

/// Match `tokens` against the start of `input`.
fn matches_tokens(input: &str, tokens: &[Token]) -> bool {
    let mut rest = input;
    for token in tokens {
        let next = match token {
            Token::Lit(lit) => rest.strip_prefix(lit),
            Token::Digit => strip_char(rest, |c| c.is_ascii_digit()),
            Token::Any => strip_char(rest, |c| !is_line_terminator(c)),
        };
        match next {
            Some(r) => rest = r,
            None => return false,
        }
    }
    true
}

fn strip_char(s: &str, accept: impl Fn(char) -> bool) -> Option<&str> {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if accept(c) => Some(chars.as_str()),
        _ => None,
    }
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

fn first_line(s: &str) -> &str {
    s.split(is_line_terminator).next().unwrap_or_default()
}
