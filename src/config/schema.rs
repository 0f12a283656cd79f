//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the auction
//! client. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::payload::environment::Environment;

/// Root configuration for the auction client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Auction server location and account.
    pub server: ServerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Session cookie handling.
    pub cookies: CookieConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Static environment snapshot (device/app/user/regs).
    pub environment: Environment,
}

/// Auction server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Full URL requests are POSTed to.
    pub host_url: String,

    /// Account id sent as the stored request id and publisher id.
    pub account_id: String,

    /// SDK version reported in `app.ext.prebid.version`.
    pub sdk_version: String,

    /// Include the device location in bid requests when one is known.
    pub share_geo_location: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host_url: "https://prebid.adnxs.com/pbs/v1/openrtb2/auction".to_string(),
            account_id: String::new(),
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            share_geo_location: false,
        }
    }
}

/// Timeout configuration in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Initial request timeout, used until the server suggests one.
    pub default_ms: u64,

    /// Ceiling for the adapted timeout.
    pub upper_bound_ms: u64,

    /// Added on top of round trip + server processing time.
    pub safety_margin_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_ms: 2000,
            upper_bound_ms: 2000,
            safety_margin_ms: 200,
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Domain the session cookie is stored under.
    pub domain: String,

    /// Marker identifying the session cookie (e.g. "uuid2").
    pub session_key: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            domain: "http://prebid.adnxs.com".to_string(),
            session_key: "uuid2".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
