//! Configuration for the Lumen bridge.
//!
//! Settings are constructed once at startup through [`SettingsBuilder`],
//! validated eagerly, and never mutated afterwards. Secrets are wrapped in
//! [`SecretString`] so they cannot leak through `Debug` output or the
//! [`Settings::redacted`] logging view.

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use serde_json::{json, Value};
use thiserror::Error;

/// Default upstream base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.lumen.dev";
/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// One or more settings failed validation.
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Execution environment profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development (default).
    #[default]
    Development,
    /// Test runs.
    Test,
    /// Staging deployment.
    Staging,
    /// Production deployment.
    Production,
}

impl Environment {
    /// Returns the string representation of the environment.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    /// Parses an environment tag from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "test" => Some(Self::Test),
            "staging" => Some(Self::Staging),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

/// Authentication mode derived from the configured credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Static API key sent as a bearer token.
    ApiKey,
    /// OAuth2 client-credentials flow.
    OAuth,
    /// No authentication configured.
    None,
}

impl AuthMode {
    /// Returns the string representation of the auth mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::OAuth => "oauth",
            Self::None => "none",
        }
    }
}

/// A secret value that is redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the underlying secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true when the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("********")
    }
}

/// OAuth client-credentials configuration.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: SecretString,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Optional scope string.
    pub scope: Option<String>,
}

/// Retry tuning.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Total attempt budget per invocation (at least 1).
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Upper bound for any computed or server-directed delay.
    pub max_delay: Duration,
    /// Jitter fraction applied to backoff delays, in `[0, 1]`.
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: 0.25,
        }
    }
}

/// Client-side rate limit tuning.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Refill window.
    pub window: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self { max_requests: 60, window: Duration::from_secs(60) }
    }
}

/// Immutable bridge settings.
///
/// Construct through [`Settings::builder`]; the builder validates all
/// cross-field invariants and either returns a usable value or the full
/// list of problems.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Execution environment profile.
    pub env: Environment,
    /// Upstream API base URL.
    pub base_url: Url,
    /// API key credential, if configured.
    pub api_key: Option<SecretString>,
    /// OAuth credentials, if configured.
    pub oauth: Option<OAuthSettings>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    /// Optional HTTP proxy.
    pub http_proxy: Option<Url>,
    /// Optional HTTPS proxy.
    pub https_proxy: Option<Url>,
    /// Retry tuning.
    pub retry: RetrySettings,
    /// Client-side rate limit tuning.
    pub rate_limit: RateLimitSettings,
}

impl Settings {
    /// Returns a builder with default values.
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// The authentication mode derived from the configured credentials.
    ///
    /// OAuth wins when both credential sets are present; the builder
    /// rejects that combination in staging and production.
    #[must_use]
    pub fn auth_mode(&self) -> AuthMode {
        if self.oauth.is_some() {
            AuthMode::OAuth
        } else if self.api_key.as_ref().is_some_and(|k| !k.is_empty()) {
            AuthMode::ApiKey
        } else {
            AuthMode::None
        }
    }

    /// True for staging and production environments.
    #[must_use]
    pub fn is_production_like(&self) -> bool {
        matches!(self.env, Environment::Staging | Environment::Production)
    }

    /// Returns a JSON view of the settings with secrets replaced by a
    /// fixed placeholder, suitable for logging.
    #[must_use]
    pub fn redacted(&self) -> Value {
        json!({
            "env": self.env.as_str(),
            "base_url": self.base_url.as_str(),
            "auth_mode": self.auth_mode().as_str(),
            "api_key": self.api_key.as_ref().map(|_| "********"),
            "client_id": self.oauth.as_ref().map(|o| o.client_id.clone()),
            "client_secret": self.oauth.as_ref().map(|_| "********"),
            "token_url": self.oauth.as_ref().map(|o| o.token_url.as_str().to_string()),
            "scope": self.oauth.as_ref().and_then(|o| o.scope.clone()),
            "request_timeout_s": self.request_timeout.as_secs_f64(),
            "verify_tls": self.verify_tls,
            "http_proxy": self.http_proxy.as_ref().map(|u| u.as_str().to_string()),
            "https_proxy": self.https_proxy.as_ref().map(|u| u.as_str().to_string()),
            "retry_max_attempts": self.retry.max_attempts,
            "rate_limit_requests": self.rate_limit.max_requests,
            "rate_limit_window_s": self.rate_limit.window.as_secs_f64(),
        })
    }
}

/// Builder for [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    env: Environment,
    base_url: Option<String>,
    api_key: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_url: Option<String>,
    scope: Option<String>,
    request_timeout: Option<Duration>,
    verify_tls: Option<bool>,
    http_proxy: Option<String>,
    https_proxy: Option<String>,
    retry: RetrySettings,
    rate_limit: RateLimitSettings,
}

impl SettingsBuilder {
    /// Sets the execution environment.
    #[must_use]
    pub fn env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Sets the upstream base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API key credential.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the OAuth client id.
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the OAuth client secret.
    #[must_use]
    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the OAuth token endpoint URL.
    #[must_use]
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    /// Sets the OAuth scope.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = Some(verify);
        self
    }

    /// Sets the HTTP proxy URL.
    #[must_use]
    pub fn http_proxy(mut self, url: impl Into<String>) -> Self {
        self.http_proxy = Some(url.into());
        self
    }

    /// Sets the HTTPS proxy URL.
    #[must_use]
    pub fn https_proxy(mut self, url: impl Into<String>) -> Self {
        self.https_proxy = Some(url.into());
        self
    }

    /// Sets the retry tuning.
    #[must_use]
    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the rate limit tuning.
    #[must_use]
    pub fn rate_limit(mut self, rate_limit: RateLimitSettings) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Validates the accumulated values and builds the settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` carrying every validation problem
    /// found, not just the first.
    pub fn build(self) -> Result<Settings, ConfigError> {
        let mut issues = Vec::new();

        let base_url = parse_url(
            self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            "base_url",
            &mut issues,
        );

        let oauth = self.build_oauth(&mut issues);

        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::new);

        if matches!(self.env, Environment::Staging | Environment::Production) {
            match (api_key.is_some(), oauth.is_some()) {
                (true, true) => issues.push(
                    "both API key and OAuth credentials are configured; provide exactly one"
                        .to_string(),
                ),
                (false, false) => issues.push(format!(
                    "no authentication configured for {} environment; set an API key or \
                     OAuth credentials",
                    self.env.as_str()
                )),
                _ => {}
            }
        }

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        if request_timeout.is_zero() {
            issues.push("request_timeout must be greater than zero".to_string());
        }

        if self.retry.max_attempts < 1 {
            issues.push("retry.max_attempts must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            issues.push("retry.jitter must be within [0, 1]".to_string());
        }
        if self.rate_limit.max_requests < 1 {
            issues.push("rate_limit.max_requests must be at least 1".to_string());
        }
        if self.rate_limit.window.is_zero() {
            issues.push("rate_limit.window must be greater than zero".to_string());
        }

        let http_proxy = self
            .http_proxy
            .as_deref()
            .and_then(|u| parse_url(u, "http_proxy", &mut issues));
        let https_proxy = self
            .https_proxy
            .as_deref()
            .and_then(|u| parse_url(u, "https_proxy", &mut issues));

        if !issues.is_empty() {
            return Err(ConfigError::Invalid(issues));
        }

        Ok(Settings {
            env: self.env,
            // Validated above; issues is empty on this path.
            base_url: base_url.expect("base_url validated"),
            api_key,
            oauth,
            request_timeout,
            verify_tls: self.verify_tls.unwrap_or(true),
            http_proxy,
            https_proxy,
            retry: self.retry,
            rate_limit: self.rate_limit,
        })
    }

    fn build_oauth(&self, issues: &mut Vec<String>) -> Option<OAuthSettings> {
        let client_id = self.client_id.as_deref().filter(|s| !s.trim().is_empty());
        let client_secret = self.client_secret.as_deref().filter(|s| !s.trim().is_empty());
        let token_url = self.token_url.as_deref().filter(|s| !s.trim().is_empty());

        match (client_id, client_secret, token_url) {
            (None, None, None) => None,
            (Some(id), Some(secret), Some(url)) => {
                let token_url = parse_url(url, "token_url", issues)?;
                Some(OAuthSettings {
                    client_id: id.to_string(),
                    client_secret: SecretString::new(secret),
                    token_url,
                    scope: self.scope.clone().filter(|s| !s.trim().is_empty()),
                })
            }
            _ => {
                issues.push(
                    "incomplete OAuth configuration; client_id, client_secret and \
                     token_url must all be set"
                        .to_string(),
                );
                None
            }
        }
    }
}

fn parse_url(raw: &str, field: &str, issues: &mut Vec<String>) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
        Ok(url) => {
            issues.push(format!("{field} must use http or https, got {}", url.scheme()));
            None
        }
        Err(e) => {
            issues.push(format!("{field} is not a valid URL: {e}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_build() {
        let settings = Settings::builder().build().unwrap();
        assert_eq!(settings.env, Environment::Development);
        assert_eq!(settings.base_url.as_str(), "https://api.lumen.dev/");
        assert_eq!(settings.auth_mode(), AuthMode::None);
        assert!(settings.verify_tls);
        assert_eq!(settings.retry.max_attempts, 3);
    }

    #[test]
    fn test_auth_mode_api_key() {
        let settings = Settings::builder().api_key("sk-test").build().unwrap();
        assert_eq!(settings.auth_mode(), AuthMode::ApiKey);
    }

    #[test]
    fn test_auth_mode_oauth() {
        let settings = Settings::builder()
            .client_id("id")
            .client_secret("secret")
            .token_url("https://auth.example.com/token")
            .build()
            .unwrap();
        assert_eq!(settings.auth_mode(), AuthMode::OAuth);
    }

    #[test]
    fn test_production_requires_auth() {
        let err = Settings::builder().env(Environment::Production).build().unwrap_err();
        let ConfigError::Invalid(issues) = err;
        assert!(issues.iter().any(|i| i.contains("no authentication configured")));
    }

    #[test]
    fn test_production_rejects_both_credentials() {
        let err = Settings::builder()
            .env(Environment::Staging)
            .api_key("sk-test")
            .client_id("id")
            .client_secret("secret")
            .token_url("https://auth.example.com/token")
            .build()
            .unwrap_err();
        let ConfigError::Invalid(issues) = err;
        assert!(issues.iter().any(|i| i.contains("exactly one")));
    }

    #[test]
    fn test_development_allows_no_auth() {
        let settings = Settings::builder().env(Environment::Development).build().unwrap();
        assert_eq!(settings.auth_mode(), AuthMode::None);
        assert!(!settings.is_production_like());
    }

    #[test]
    fn test_incomplete_oauth_rejected() {
        let err = Settings::builder().client_id("id").build().unwrap_err();
        let ConfigError::Invalid(issues) = err;
        assert!(issues.iter().any(|i| i.contains("incomplete OAuth")));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = Settings::builder().base_url("not a url").build().unwrap_err();
        let ConfigError::Invalid(issues) = err;
        assert!(issues.iter().any(|i| i.contains("base_url")));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let err = Settings::builder().base_url("ftp://api.lumen.dev").build().unwrap_err();
        let ConfigError::Invalid(issues) = err;
        assert!(issues.iter().any(|i| i.contains("http or https")));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let err = Settings::builder()
            .retry(RetrySettings { max_attempts: 0, ..RetrySettings::default() })
            .build()
            .unwrap_err();
        let ConfigError::Invalid(issues) = err;
        assert!(issues.iter().any(|i| i.contains("max_attempts")));
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = SecretString::new("super-secret");
        assert_eq!(format!("{secret:?}"), "********");
        assert_eq!(secret.expose(), "super-secret");
    }

    #[test]
    fn test_redacted_view_hides_secrets() {
        let settings = Settings::builder()
            .api_key("sk-live-abc123")
            .build()
            .unwrap();
        let view = settings.redacted().to_string();
        assert!(!view.contains("sk-live-abc123"));
        assert!(view.contains("********"));
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Some(Environment::Production));
        assert_eq!(Environment::parse("Staging"), Some(Environment::Staging));
        assert_eq!(Environment::parse("prod"), Some(Environment::Production));
        assert_eq!(Environment::parse("unknown"), None);
    }

    #[test]
    fn test_auth_mode_as_str() {
        assert_eq!(AuthMode::ApiKey.as_str(), "api_key");
        assert_eq!(AuthMode::OAuth.as_str(), "oauth");
        assert_eq!(AuthMode::None.as_str(), "none");
    }
}
