//! Token persistence consumed by the pipeline.
//!
//! The client only needs a narrow key-value contract; where and how the
//! values are kept (memory, disk, an OS keychain) is the implementor's concern.

pub mod file;
pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::{SecurityError, SecurityResult};

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Key under which [`AuthTokens`] are stored.
pub const AUTH_TOKENS_KEY: &str = "auth_tokens";

/// Credentials issued by the authentication service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: u64,
}

/// Narrow key-value store for credentials.
pub trait SecureStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> SecurityResult<()>;

    fn remove_item(&self, key: &str) -> SecurityResult<()>;

    /// Stored tokens, or `None` when absent or unreadable.
    fn get_auth_tokens(&self) -> Option<AuthTokens> {
        let raw = self.get_item(AUTH_TOKENS_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable stored auth tokens");
                None
            }
        }
    }

    fn set_auth_tokens(&self, tokens: &AuthTokens) -> SecurityResult<()> {
        let raw = serde_json::to_string(tokens).map_err(|e| SecurityError::Storage(e.to_string()))?;
        self.set_item(AUTH_TOKENS_KEY, &raw)
    }

    fn clear_auth_tokens(&self) -> SecurityResult<()> {
        self.remove_item(AUTH_TOKENS_KEY)
    }
}
