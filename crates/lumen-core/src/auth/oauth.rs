//! OAuth2 client-credentials token lifecycle.
//!
//! At most one refresh is ever in flight: the first caller that finds the
//! cached token stale installs a shared refresh future, and every
//! concurrent caller awaits that same future. The slot is cleared once the
//! refresh settles, so the next expiry starts a fresh one. On failure no
//! token is cached and all awaiters observe the same error.

use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use tracing::{info, warn};

use super::{AuthError, Result};
use crate::config::{OAuthSettings, SecretString};

/// Seconds before expiry at which a token is considered stale.
pub const REFRESH_MARGIN_SECS: i64 = 300;

const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// A cached OAuth access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates a token expiring at the given instant.
    #[must_use]
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { secret: SecretString::new(secret), expires_at }
    }

    /// The token value.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.secret.expose()
    }

    /// True while the token is still outside the refresh margin.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
    #[allow(dead_code)]
    token_type: Option<String>,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<AccessToken>>>;

#[derive(Default)]
struct State {
    token: Option<AccessToken>,
    inflight: Option<RefreshFuture>,
}

/// OAuth token client with single-flight refresh.
pub(super) struct OAuthClient {
    http: reqwest::Client,
    settings: OAuthSettings,
    state: Mutex<State>,
}

impl OAuthClient {
    pub(super) fn new(http: reqwest::Client, settings: OAuthSettings) -> Self {
        Self { http, settings, state: Mutex::new(State::default()) }
    }

    /// Returns a usable bearer token, refreshing if necessary.
    pub(super) async fn bearer(&self) -> Result<String> {
        let refresh = {
            let mut state = self.state.lock().expect("auth state lock poisoned");
            if let Some(token) = &state.token {
                if token.is_usable(Utc::now()) {
                    return Ok(token.secret().to_string());
                }
            }
            match &state.inflight {
                Some(inflight) => inflight.clone(),
                None => {
                    let future =
                        refresh_token(self.http.clone(), self.settings.clone()).boxed().shared();
                    state.inflight = Some(future.clone());
                    future
                }
            }
        };

        let result = refresh.clone().await;

        let mut state = self.state.lock().expect("auth state lock poisoned");
        // Only clear the slot we awaited; a newer refresh may already be in.
        if state.inflight.as_ref().is_some_and(|f| f.ptr_eq(&refresh)) {
            state.inflight = None;
        }
        match result {
            Ok(token) => {
                let secret = token.secret().to_string();
                state.token = Some(token);
                Ok(secret)
            }
            Err(err) => Err(err),
        }
    }

    /// Drops the cached token so the next call refreshes.
    pub(super) fn invalidate(&self) {
        let mut state = self.state.lock().expect("auth state lock poisoned");
        state.token = None;
    }
}

/// Performs one client-credentials token request.
async fn refresh_token(http: reqwest::Client, settings: OAuthSettings) -> Result<AccessToken> {
    let mut form = vec![("grant_type", "client_credentials".to_string())];
    if let Some(scope) = &settings.scope {
        form.push(("scope", scope.clone()));
    }

    let response = http
        .post(settings.token_url.clone())
        .basic_auth(&settings.client_id, Some(settings.client_secret.expose()))
        .form(&form)
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "token endpoint unreachable");
            AuthError::RefreshFailed { status: 0, message: format!("token endpoint unreachable: {e}") }
        })?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        warn!(status, "token endpoint returned an error");
        return Err(AuthError::RefreshFailed {
            status,
            message: "token endpoint returned an error".to_string(),
        });
    }

    let body: TokenResponse = response.json().await.map_err(|_| AuthError::RefreshFailed {
        status,
        message: "malformed token response".to_string(),
    })?;

    let expires_in = body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    info!(expires_in, "OAuth token refreshed");
    Ok(AccessToken::new(
        body.access_token,
        Utc::now() + ChronoDuration::seconds(expires_in as i64),
    ))
}
