use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, RobotsConfig, SourceConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_robots_config(&config.robots)?;
    validate_output_config(&config.output)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates the API and site base URLs
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    validate_base_url("api-base-url", &config.api_base_url)?;
    validate_base_url("collection-base-url", &config.collection_base_url)?;
    Ok(())
}

/// Validates robots.txt settings
fn validate_robots_config(config: &RobotsConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Ok(());
    }

    Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid robots url: {}", e)))?;

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "robots user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.partials_directory.is_empty() {
        return Err(ConfigError::Validation(
            "partials-directory cannot be empty".to_string(),
        ));
    }

    if config.combined_path.is_empty() {
        return Err(ConfigError::Validation(
            "combined-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_collections < 1 || config.max_concurrent_collections > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_collections must be between 1 and 64, got {}",
            config.max_concurrent_collections
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    if let Some(email) = &config.contact_email {
        validate_email(email)?;
    }

    Ok(())
}

/// Validates a base URL that relative paths are appended to
fn validate_base_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    if !value.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "{} must end with '/', got '{}'",
            field, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
