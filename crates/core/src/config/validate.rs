use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde)
/// - `api_key` auth has a non-empty key
/// - Server port is not 0
/// - Scheduler concurrency and timeout are not 0
/// - LLM section is usable when present
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Auth validation
    if config.auth.method == AuthMethod::ApiKey
        && config
            .auth
            .api_key
            .as_deref()
            .map_or(true, |key| key.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.api_key is required when auth.method = \"api_key\"".to_string(),
        ));
    }

    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Scheduler validation
    if config.scheduler.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.concurrency must be at least 1".to_string(),
        ));
    }
    if config.scheduler.triage_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.triage_timeout_secs cannot be 0".to_string(),
        ));
    }

    config
        .triage
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("triage: {}", e)))?;

    Ok(())
}
