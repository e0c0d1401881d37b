use crate::app_config::{ApiEndpoint, AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let endpoint = |key_var: &str, url_var: &str, url_default: &str, model_var: &str, model_default: &str| {
        optional(key_var).map(|api_key| ApiEndpoint {
            api_key,
            base_url: or_default(url_var, url_default)
                .trim_end_matches('/')
                .to_string(),
            model: or_default(model_var, model_default),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("DIGESTD_ENV", "development"));

    let bind_addr = or_default("DIGESTD_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("DIGESTD_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("DIGESTD_LOG_LEVEL", "info");
    let api_keys = parse_api_keys(&or_default("DIGESTD_API_KEYS", ""));

    let db_max_connections = parse_u32("DIGESTD_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("DIGESTD_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("DIGESTD_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let web_search = endpoint(
        "OPENAI_API_KEY",
        "OPENAI_BASE_URL",
        "https://api.openai.com",
        "DIGESTD_WEB_SEARCH_MODEL",
        "gpt-4o-mini",
    );
    let social_search = endpoint(
        "XAI_API_KEY",
        "XAI_BASE_URL",
        "https://api.x.ai",
        "DIGESTD_SOCIAL_SEARCH_MODEL",
        "grok-3-beta",
    );
    let summarizer = endpoint(
        "ANTHROPIC_API_KEY",
        "ANTHROPIC_BASE_URL",
        "https://api.anthropic.com",
        "DIGESTD_SUMMARY_MODEL",
        "claude-3-5-sonnet-20241022",
    );

    let resend_api_key = optional("RESEND_API_KEY");
    let resend_base_url = or_default("RESEND_BASE_URL", "https://api.resend.com")
        .trim_end_matches('/')
        .to_string();
    let email_from = or_default("DIGESTD_EMAIL_FROM", "digest@digest.wtf");

    let retrieval_timeout_secs = parse_u64("DIGESTD_RETRIEVAL_TIMEOUT_SECS", "90")?;
    let summary_timeout_secs = parse_u64("DIGESTD_SUMMARY_TIMEOUT_SECS", "120")?;
    let email_timeout_secs = parse_u64("DIGESTD_EMAIL_TIMEOUT_SECS", "30")?;

    let batch_size = parse_usize("DIGESTD_BATCH_SIZE", "10")?;
    if batch_size == 0 {
        return Err(invalid("DIGESTD_BATCH_SIZE", "must be at least 1".to_string()));
    }
    let max_attempts = parse_u32("DIGESTD_MAX_ATTEMPTS", "3")?;
    if max_attempts == 0 {
        return Err(invalid("DIGESTD_MAX_ATTEMPTS", "must be at least 1".to_string()));
    }
    let backoff_base_secs = parse_u64("DIGESTD_BACKOFF_BASE_SECS", "1")?;
    let batch_delay_ms = parse_u64("DIGESTD_BATCH_DELAY_MS", "1000")?;
    let run_lease_secs = parse_u64("DIGESTD_RUN_LEASE_SECS", "1800")?;
    let cron = or_default("DIGESTD_CRON", "0 0 * * * *");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        api_keys,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        web_search,
        social_search,
        summarizer,
        resend_api_key,
        resend_base_url,
        email_from,
        retrieval_timeout_secs,
        summary_timeout_secs,
        email_timeout_secs,
        batch_size,
        max_attempts,
        backoff_base_secs,
        batch_delay_ms,
        run_lease_secs,
        cron,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
