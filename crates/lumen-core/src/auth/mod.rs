//! Authentication providers for upstream requests.
//!
//! A provider turns the configured credentials into an `Authorization`
//! header value. API-key mode is stateless; OAuth mode maintains a cached
//! access token with single-flight refresh (see [`oauth`]).

mod oauth;

pub use oauth::{AccessToken, REFRESH_MARGIN_SECS};

use thiserror::Error;
use tracing::debug;

use crate::config::{AuthMode, SecretString, Settings};

/// Authentication errors.
///
/// `Clone` is required so a single refresh outcome can be shared with
/// every caller awaiting the same in-flight refresh.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No credentials are configured.
    #[error("authentication is not configured")]
    Unconfigured,

    /// The token endpoint rejected the refresh or was unreachable
    /// (status 0 when no response was received).
    #[error("OAuth token refresh failed (status {status}): {message}")]
    RefreshFailed {
        /// Token endpoint status, 0 when unreachable.
        status: u16,
        /// Scrubbed description of the failure.
        message: String,
    },
}

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

enum Inner {
    ApiKey(SecretString),
    OAuth(oauth::OAuthClient),
    None,
}

/// Produces `Authorization` headers for upstream requests.
pub struct AuthProvider {
    inner: Inner,
    mode: AuthMode,
}

impl AuthProvider {
    /// Builds a provider from the configured credentials, reusing the
    /// shared HTTP client for token-endpoint calls.
    #[must_use]
    pub fn from_settings(settings: &Settings, http: reqwest::Client) -> Self {
        let mode = settings.auth_mode();
        let inner = match mode {
            AuthMode::OAuth => {
                let oauth = settings.oauth.clone().expect("oauth mode implies oauth settings");
                Inner::OAuth(oauth::OAuthClient::new(http, oauth))
            }
            AuthMode::ApiKey => {
                let key = settings.api_key.clone().expect("api_key mode implies a key");
                Inner::ApiKey(key)
            }
            AuthMode::None => Inner::None,
        };
        Self { inner, mode }
    }

    /// The configured authentication mode.
    #[must_use]
    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    /// Returns a usable `Authorization` header, refreshing the OAuth
    /// token first when necessary.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unconfigured` when no credentials are set, or
    /// `AuthError::RefreshFailed` when an OAuth refresh fails.
    pub async fn header_for(&self) -> Result<(&'static str, String)> {
        let value = match &self.inner {
            Inner::ApiKey(key) => format!("Bearer {}", key.expose()),
            Inner::OAuth(client) => format!("Bearer {}", client.bearer().await?),
            Inner::None => return Err(AuthError::Unconfigured),
        };
        Ok(("Authorization", value))
    }

    /// Marks any cached token unusable, forcing the next [`Self::header_for`]
    /// to refresh. A no-op outside OAuth mode.
    pub fn invalidate(&self) {
        if let Inner::OAuth(client) = &self.inner {
            debug!("invalidating cached OAuth token");
            client.invalidate();
        }
    }

    /// Drops any cached token. Called during graceful shutdown.
    pub fn clear(&self) {
        if let Inner::OAuth(client) = &self.inner {
            client.invalidate();
        }
    }
}
