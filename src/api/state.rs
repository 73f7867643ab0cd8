//! Shared application state for HTTP handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::RelayConfig;
use crate::store::MessageStore;

/// Header carrying the admin shared secret
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// Client key used when neither a forwarded address nor a peer is known
const UNKNOWN_CLIENT: &str = "unknown";

/// State handed to every handler
pub struct AppState {
    pub store: Arc<MessageStore>,
    admin_secret: Option<String>,
    trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(store: Arc<MessageStore>, config: &RelayConfig) -> Self {
        Self {
            store,
            admin_secret: config.admin_secret.clone(),
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    /// Derive the rate-limit key for a request from its network origin
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if self.trust_forwarded_for {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(addr) = forwarded {
                return addr.to_string();
            }
        }

        peer.map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }

    /// Whether admin routes are enabled at all
    pub fn admin_enabled(&self) -> bool {
        self.admin_secret.is_some()
    }

    /// Check the admin secret header
    pub fn is_admin(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.admin_secret.as_deref() else {
            return false;
        };
        headers
            .get(ADMIN_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|given| secrets_match(given.as_bytes(), expected.as_bytes()))
            .unwrap_or(false)
    }
}

/// Compare without short-circuiting on the first differing byte
fn secrets_match(given: &[u8], expected: &[u8]) -> bool {
    given.len() == expected.len()
        && given
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use tempfile::TempDir;

    fn state(configure: impl FnOnce(&mut RelayConfig)) -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = RelayConfig::with_data_dir(temp_dir.path());
        configure(&mut config);
        let store = Arc::new(MessageStore::open(&config).unwrap());
        (AppState::new(store, &config), temp_dir)
    }

    #[test]
    fn test_client_key_uses_peer_ip() {
        let (state, _dir) = state(|_| {});
        let peer: SocketAddr = "10.0.0.7:51234".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.1.1.1"));
        assert_eq!(state.client_key(&headers, Some(peer)), "10.0.0.7");
        assert_eq!(state.client_key(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn test_client_key_trusts_forwarded_for_when_enabled() {
        let (state, _dir) = state(|c| c.trust_forwarded_for = true);
        let peer: SocketAddr = "10.0.0.7:51234".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(state.client_key(&headers, Some(peer)), "203.0.113.9");
    }

    #[test]
    fn test_admin_secret() {
        let (state, _dir) = state(|c| c.admin_secret = Some("s3cret".to_string()));
        let mut headers = HeaderMap::new();
        assert!(!state.is_admin(&headers));
        headers.insert(ADMIN_SECRET_HEADER, HeaderValue::from_static("s3cre"));
        assert!(!state.is_admin(&headers));
        headers.insert(ADMIN_SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(state.is_admin(&headers));
    }

    #[test]
    fn test_admin_disabled_without_secret() {
        let (state, _dir) = state(|_| {});
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_SECRET_HEADER, HeaderValue::from_static(""));
        assert!(!state.admin_enabled());
        assert!(!state.is_admin(&headers));
    }
}
