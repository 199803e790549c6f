//! Bearer-token access for authenticated requests.
//!
//! The cache never initiates login or token refresh; it reads whatever token
//! the auth layer has made available, one snapshot per request. A missing
//! token is not an error - the request goes out unauthenticated and the
//! backend answers with 401/403 if it objects.

use std::sync::{Arc, PoisonError, RwLock};

/// Synchronous accessor for the current bearer token.
pub trait TokenProvider: Send + Sync {
    /// Current bearer token, if one is available.
    fn token(&self) -> Option<String>;
}

/// Token provider for unauthenticated use.
pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

/// Single-writer token store shared between an auth layer (the writer) and
/// the cache (a reader).
///
/// Clone is cheap - clones share the same inner slot.
#[derive(Clone, Default)]
pub struct TokenStore {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current token.
    pub fn set(&self, token: impl Into<String>) {
        *self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Drop the current token; subsequent requests go out unauthenticated.
    pub fn clear(&self) {
        *self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TokenProvider for TokenStore {
    fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_store_starts_empty() {
        let store = TokenStore::new();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_set_and_clear() {
        let store = TokenStore::new();
        store.set("abc123");
        assert_eq!(store.token(), Some("abc123".to_string()));

        store.clear();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_clones_share_the_slot() {
        let store = TokenStore::new();
        let reader = store.clone();
        store.set("t");
        assert_eq!(reader.token(), Some("t".to_string()));
    }
}
