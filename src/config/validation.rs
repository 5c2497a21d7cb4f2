use crate::config::types::{
    BoundaryConfig, Config, CrawlConfig, OutputConfig, ServiceConfig, UserAgentConfig,
};
use crate::ConfigError;
use num_bigint::{BigInt, Sign};
use url::Url;

/// Default magnitude ceiling for the exponential boundary probe (10^30)
pub const DEFAULT_PROBE_CEILING: &str = "1000000000000000000000000000000";

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_service_config(&config.service)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_crawl_config(&config.crawl)?;
    validate_boundary_config(&config.boundary)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Parses a probe ceiling, falling back to the default when unset
pub fn parse_probe_ceiling(raw: Option<&str>) -> Result<BigInt, ConfigError> {
    let raw = raw.unwrap_or(DEFAULT_PROBE_CEILING).trim();
    let ceiling: BigInt = raw.parse().map_err(|e| {
        ConfigError::Validation(format!("probe_ceiling '{}' is not an integer: {}", raw, e))
    })?;

    if ceiling.sign() != Sign::Plus {
        return Err(ConfigError::Validation(format!(
            "probe_ceiling must be positive, got {}",
            ceiling
        )));
    }

    Ok(ceiling)
}

/// Validates the listing endpoint and identifier format
fn validate_service_config(config: &ServiceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if config.page_param.trim().is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    if config.item_tag.is_empty() || !config.item_tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ConfigError::InvalidPattern(format!(
            "item_tag must be non-empty and alphanumeric, got '{}'",
            config.item_tag
        )));
    }

    if !config.item_extension.starts_with('.') || config.item_extension.len() < 2 {
        return Err(ConfigError::InvalidPattern(format!(
            "item_extension must look like '.pdf', got '{}'",
            config.item_extension
        )));
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

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates crawl pacing, retry and range settings
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.end_page < config.start_page {
        return Err(ConfigError::Validation(format!(
            "end_page ({}) must not be below start_page ({})",
            config.end_page, config.start_page
        )));
    }

    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if config.request_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be >= 100ms, got {}ms",
            config.request_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.stop_after_without_new == Some(0) {
        return Err(ConfigError::Validation(
            "stop_after_without_new must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_boundary_config(config: &BoundaryConfig) -> Result<(), ConfigError> {
    parse_probe_ceiling(config.probe_ceiling.as_deref())?;
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("directory", &config.directory),
        ("checkpoint_file", &config.checkpoint_file),
        ("manifest_file", &config.manifest_file),
        ("index_file", &config.index_file),
        ("boundary_file", &config.boundary_file),
        ("probe_file", &config.probe_file),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty",
                name
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    // Domain part should contain at least one dot
    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
