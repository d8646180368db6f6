//! CSRF token pool.
//!
//! # Responsibilities
//! - Issue random tokens (32 bytes, URL-safe base64)
//! - Answer membership checks for echoed tokens
//! - Keep the pool bounded with FIFO eviction
//!
//! # Design Decisions
//! - In-memory only; a restart invalidates every token
//! - Eviction triggers once the pool grows past `max_tokens` and drains down
//!   to `cleanup_threshold`, so it runs in batches instead of per insert
//! - Multi-use by default (a token stays valid until evicted); `single_use`
//!   makes verification consume the token

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::SystemTime;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use crate::config::CsrfConfig;

/// An issued token and when it was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub value: String,
    pub issued_at: SystemTime,
}

#[derive(Default)]
struct TokenPool {
    issued: HashMap<String, SystemTime>,
    order: VecDeque<String>,
}

impl TokenPool {
    fn insert(&mut self, value: String, at: SystemTime) {
        self.issued.insert(value.clone(), at);
        self.order.push_back(value);
    }

    fn remove(&mut self, value: &str) -> bool {
        if self.issued.remove(value).is_some() {
            self.order.retain(|t| t != value);
            true
        } else {
            false
        }
    }

    fn evict_to(&mut self, target: usize) -> usize {
        let mut evicted = 0;
        while self.issued.len() > target {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.issued.remove(&oldest);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

/// Bounded store of issued CSRF tokens.
pub struct CsrfStore {
    pool: Mutex<TokenPool>,
    config: CsrfConfig,
}

impl CsrfStore {
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            pool: Mutex::new(TokenPool::default()),
            config,
        }
    }

    pub fn is_single_use(&self) -> bool {
        self.config.single_use
    }

    fn random_value(&self) -> String {
        let mut bytes = vec![0u8; self.config.token_length];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Issue a fresh token and add it to the pool.
    pub fn generate_token(&self) -> String {
        self.issue().value
    }

    /// Issue a fresh token, returning it with its timestamp.
    pub fn issue(&self) -> CsrfToken {
        let value = self.random_value();
        let issued_at = SystemTime::now();

        let mut pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        pool.insert(value.clone(), issued_at);
        if pool.issued.len() > self.config.max_tokens {
            let evicted = pool.evict_to(self.config.cleanup_threshold);
            tracing::debug!(
                evicted,
                remaining = pool.issued.len(),
                "Evicted oldest CSRF tokens"
            );
        }

        CsrfToken { value, issued_at }
    }

    /// Token to attach to an outgoing request.
    ///
    /// Reuses the newest live token unless tokens are single-use.
    pub fn obtain_token(&self) -> String {
        if !self.config.single_use {
            let pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(newest) = pool.order.back() {
                return newest.clone();
            }
        }
        self.generate_token()
    }

    /// Membership check only; never mutates the pool.
    pub fn validate_token(&self, value: &str) -> bool {
        let pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        pool.issued.contains_key(value)
    }

    /// Remove `value` from the pool, returning whether it was present.
    pub fn consume_token(&self, value: &str) -> bool {
        let mut pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        pool.remove(value)
    }

    /// Apply the configured policy: consume when single-use, else check membership.
    pub fn verify(&self, value: &str) -> bool {
        if self.config.single_use {
            self.consume_token(value)
        } else {
            self.validate_token(value)
        }
    }

    /// Drop a token explicitly, e.g. after logout.
    pub fn revoke_token(&self, value: &str) -> bool {
        self.consume_token(value)
    }

    pub fn issued_at(&self, value: &str) -> Option<SystemTime> {
        let pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        pool.issued.get(value).copied()
    }

    pub fn len(&self) -> usize {
        let pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        pool.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut pool = self.pool.lock().unwrap_or_else(|e| e.into_inner());
        pool.issued.clear();
        pool.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tokens_are_unique() {
        let store = CsrfStore::new(CsrfConfig {
            max_tokens: 20_000,
            cleanup_threshold: 10_000,
            ..CsrfConfig::default()
        });
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(store.generate_token()));
        }
    }

    #[test]
    fn test_token_encoding() {
        let store = CsrfStore::new(CsrfConfig::default());
        let token = store.generate_token();
        // 32 bytes, unpadded base64 → 43 chars
        assert_eq!(token.len(), 43);
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), 32);
        assert!(store.issued_at(&token).is_some());
    }

    #[test]
    fn test_validate_unknown_token() {
        let store = CsrfStore::new(CsrfConfig::default());
        store.generate_token();
        assert!(!store.validate_token("never-issued"));
        assert!(!store.validate_token(""));
    }

    #[test]
    fn test_multi_use_validation() {
        let store = CsrfStore::new(CsrfConfig::default());
        let token = store.generate_token();
        assert!(store.verify(&token));
        assert!(store.verify(&token));
        assert_eq!(store.obtain_token(), token);
    }

    #[test]
    fn test_single_use_validation() {
        let store = CsrfStore::new(CsrfConfig {
            single_use: true,
            ..CsrfConfig::default()
        });
        let token = store.generate_token();
        assert!(store.verify(&token));
        assert!(!store.verify(&token));
        assert_ne!(store.obtain_token(), token);
    }

    #[test]
    fn test_eviction_past_max_tokens() {
        let store = CsrfStore::new(CsrfConfig::default());
        let first = store.generate_token();
        for _ in 0..999 {
            store.generate_token();
        }
        assert_eq!(store.len(), 1000);
        assert!(store.validate_token(&first));

        let newest = store.generate_token();
        assert!(store.len() <= 500);
        assert!(!store.validate_token(&first));
        assert!(store.validate_token(&newest));
    }

    #[test]
    fn test_revoke_and_clear() {
        let store = CsrfStore::new(CsrfConfig::default());
        let a = store.generate_token();
        let b = store.generate_token();
        assert!(store.revoke_token(&a));
        assert!(!store.validate_token(&a));
        assert!(store.validate_token(&b));
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_generation_loses_nothing() {
        let store = std::sync::Arc::new(CsrfStore::new(CsrfConfig {
            max_tokens: 5_000,
            cleanup_threshold: 2_500,
            ..CsrfConfig::default()
        }));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| store.generate_token())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let tokens: Vec<String> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();

        assert_eq!(store.len(), 2_000);
        assert!(tokens.iter().all(|t| store.validate_token(t)));
    }

    #[test]
    fn test_concurrent_generation_stays_bounded() {
        let store = std::sync::Arc::new(CsrfStore::new(CsrfConfig::default()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..400 {
                        store.generate_token();
                        assert!(store.len() <= 1_000);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(store.len() <= 1_000);
        assert!(!store.is_empty());
    }
}
