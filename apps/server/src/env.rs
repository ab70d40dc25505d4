//! Environment-variable configuration loading.
//!
//! All settings come from `LUMEN_*` variables; anything unset takes the
//! documented default. Parse problems are collected and reported together
//! with the builder's own validation issues so the operator sees the full
//! picture on one failed startup.

use std::time::Duration;

use lumen_core::config::{ConfigError, RateLimitSettings, RetrySettings};
use lumen_core::{Environment, Settings};

/// Loads settings from the process environment.
///
/// # Errors
///
/// Returns every parse and validation problem found.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_from(|name| std::env::var(name).ok())
}

/// Loads settings through a variable lookup, so tests can inject values
/// without touching the process environment.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Settings, ConfigError> {
    let var = |name: &str| {
        lookup(&format!("LUMEN_{name}"))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let mut issues = Vec::new();
    let mut builder = Settings::builder();

    if let Some(raw) = var("ENV") {
        match Environment::parse(&raw) {
            Some(env) => builder = builder.env(env),
            None => issues.push(format!("LUMEN_ENV: unknown environment `{raw}`")),
        }
    }
    if let Some(url) = var("API_BASE_URL") {
        builder = builder.base_url(url);
    }
    if let Some(key) = var("API_KEY") {
        builder = builder.api_key(key);
    }
    if let Some(id) = var("CLIENT_ID") {
        builder = builder.client_id(id);
    }
    if let Some(secret) = var("CLIENT_SECRET") {
        builder = builder.client_secret(secret);
    }
    if let Some(url) = var("TOKEN_URL") {
        builder = builder.token_url(url);
    }
    if let Some(scope) = var("SCOPE") {
        builder = builder.scope(scope);
    }
    if let Some(timeout) = parse_seconds("TIMEOUT", &var, &mut issues) {
        builder = builder.request_timeout(timeout);
    }
    if let Some(raw) = var("VERIFY_SSL") {
        match parse_bool(&raw) {
            Some(verify) => builder = builder.verify_tls(verify),
            None => issues.push(format!("LUMEN_VERIFY_SSL: expected a boolean, got `{raw}`")),
        }
    }
    if let Some(proxy) = var("HTTP_PROXY") {
        builder = builder.http_proxy(proxy);
    }
    if let Some(proxy) = var("HTTPS_PROXY") {
        builder = builder.https_proxy(proxy);
    }

    let defaults = RetrySettings::default();
    let retry = RetrySettings {
        max_attempts: parse_u32("MAX_RETRIES", &var, &mut issues)
            .unwrap_or(defaults.max_attempts),
        base_delay: parse_seconds("RETRY_BASE_DELAY", &var, &mut issues)
            .unwrap_or(defaults.base_delay),
        max_delay: parse_seconds("RETRY_MAX_DELAY", &var, &mut issues)
            .unwrap_or(defaults.max_delay),
        jitter: parse_f64("RETRY_JITTER", &var, &mut issues).unwrap_or(defaults.jitter),
    };
    builder = builder.retry(retry);

    let defaults = RateLimitSettings::default();
    let rate_limit = RateLimitSettings {
        max_requests: parse_u32("RATE_LIMIT_REQUESTS", &var, &mut issues)
            .unwrap_or(defaults.max_requests),
        window: parse_seconds("RATE_LIMIT_WINDOW", &var, &mut issues)
            .unwrap_or(defaults.window),
    };
    builder = builder.rate_limit(rate_limit);

    match builder.build() {
        Ok(settings) if issues.is_empty() => Ok(settings),
        Ok(_) => Err(ConfigError::Invalid(issues)),
        Err(ConfigError::Invalid(mut more)) => {
            issues.append(&mut more);
            Err(ConfigError::Invalid(issues))
        }
    }
}

fn parse_seconds(
    name: &str,
    var: &impl Fn(&str) -> Option<String>,
    issues: &mut Vec<String>,
) -> Option<Duration> {
    let raw = var(name)?;
    match raw.parse::<f64>() {
        Ok(seconds) if seconds >= 0.0 && seconds.is_finite() => {
            Some(Duration::from_secs_f64(seconds))
        }
        _ => {
            issues.push(format!("LUMEN_{name}: expected seconds, got `{raw}`"));
            None
        }
    }
}

fn parse_u32(
    name: &str,
    var: &impl Fn(&str) -> Option<String>,
    issues: &mut Vec<String>,
) -> Option<u32> {
    let raw = var(name)?;
    match raw.parse::<u32>() {
        Ok(value) => Some(value),
        Err(_) => {
            issues.push(format!("LUMEN_{name}: expected an integer, got `{raw}`"));
            None
        }
    }
}

fn parse_f64(
    name: &str,
    var: &impl Fn(&str) -> Option<String>,
    issues: &mut Vec<String>,
) -> Option<f64> {
    let raw = var(name)?;
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            issues.push(format!("LUMEN_{name}: expected a number, got `{raw}`"));
            None
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
