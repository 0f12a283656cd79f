//! Session cookie storage and synchronisation.
//!
//! The auction server identifies returning clients by a session cookie
//! (by default the one carrying `uuid2`). The cookie is read from a store
//! before each request and refreshed from `Set-Cookie` headers of
//! successful responses.

use std::collections::BTreeMap;

use dashmap::DashMap;

use crate::config::CookieConfig;

/// Cookie jar lookups, keyed by domain.
pub trait SessionCookieStore: Send + Sync {
    /// All cookies for `domain`, formatted as a `Cookie` header value.
    fn get(&self, domain: &str) -> Option<String>;

    /// Store a cookie from a `Set-Cookie` header value.
    fn set(&self, domain: &str, set_cookie: &str);
}

/// Process-local cookie jar.
#[derive(Debug, Default)]
pub struct InMemoryCookieStore {
    jars: DashMap<String, BTreeMap<String, String>>,
}

impl InMemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCookieStore for InMemoryCookieStore {
    fn get(&self, domain: &str) -> Option<String> {
        let jar = self.jars.get(domain)?;
        if jar.is_empty() {
            return None;
        }
        let header = jar
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        Some(header)
    }

    fn set(&self, domain: &str, set_cookie: &str) {
        // Attributes (Path, Expires, ...) follow the first ';'.
        let pair = set_cookie.split(';').next().unwrap_or_default();
        let Some((name, value)) = pair.split_once('=') else {
            tracing::debug!(cookie = %set_cookie, "Ignoring malformed cookie");
            return;
        };
        self.jars
            .entry(domain.to_string())
            .or_default()
            .insert(name.trim().to_string(), value.trim().to_string());
    }
}

/// The stored session cookie (`name=value`), if any.
pub fn session_cookie(store: &dyn SessionCookieStore, config: &CookieConfig) -> Option<String> {
    let header = store.get(&config.domain)?;
    header
        .split("; ")
        .find(|cookie| cookie.contains(&config.session_key))
        .map(str::to_string)
}

/// Store session cookies found in a response's `Set-Cookie` values.
///
/// A value is stored only if it carries the session key and either no
/// session cookie is stored yet or the stored one is not part of it.
pub fn sync_session_cookies(
    store: &dyn SessionCookieStore,
    config: &CookieConfig,
    set_cookies: &[String],
) {
    let existing = session_cookie(store, config);

    for cookie in set_cookies {
        if cookie.is_empty() || !cookie.contains(&config.session_key) {
            continue;
        }
        let outdated = existing
            .as_deref()
            .map_or(true, |current| !cookie.contains(current));
        if outdated {
            tracing::debug!(domain = %config.domain, "Storing session cookie");
            store.set(&config.domain, cookie);
        }
    }
}
