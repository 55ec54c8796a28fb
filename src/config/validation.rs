use crate::config::types::{Config, CrawlConfig, JobEntry, RegistryConfig, SelectorConfig};
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_registry_config(&config.registry)?;
    validate_output_config(&config.output)?;
    validate_jobs(&config.jobs)?;
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    // The subdivision algorithm is defined for any cap >= 1
    if config.result_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "result_cap must be >= 1, got {}",
            config.result_cap
        )));
    }

    if config.checkpoint_every < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_every must be >= 1, got {}",
            config.checkpoint_every
        )));
    }

    if config.captcha_poll_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "captcha_poll_secs must be >= 1, got {}",
            config.captcha_poll_secs
        )));
    }

    if config.result_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "result_timeout_secs must be >= 1, got {}",
            config.result_timeout_secs
        )));
    }

    Ok(())
}

/// Validates registry configuration
fn validate_registry_config(config: &RegistryConfig) -> Result<(), ConfigError> {
    Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if config.page_size_value.is_empty() {
        return Err(ConfigError::Validation(
            "page_size_value cannot be empty".to_string(),
        ));
    }

    validate_selectors(&config.selectors)?;

    Ok(())
}

/// Validates that every configured CSS selector actually compiles
fn validate_selectors(selectors: &SelectorConfig) -> Result<(), ConfigError> {
    let named = [
        ("name", &selectors.name),
        ("address", &selectors.address),
        ("status", &selectors.status),
        ("registration-date", &selectors.registration_date),
        ("entity-type", &selectors.entity_type),
        ("pager-banner", &selectors.pager_banner),
        ("results-container", &selectors.results_container),
    ];

    for (field, selector) in named {
        if selector.is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector '{}' cannot be empty",
                field
            )));
        }
        Selector::parse(selector).map_err(|_| {
            ConfigError::InvalidSelector(format!("selector '{}': '{}'", field, selector))
        })?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates job entries
fn validate_jobs(jobs: &[JobEntry]) -> Result<(), ConfigError> {
    if jobs.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[job]] entry is required".to_string(),
        ));
    }

    let mut seen_outputs = HashSet::new();
    for job in jobs {
        if job.category.is_empty() {
            return Err(ConfigError::Validation(
                "job category cannot be empty".to_string(),
            ));
        }

        if job.output_file.is_empty() {
            return Err(ConfigError::Validation(format!(
                "job '{}' must name an output file",
                job.category
            )));
        }

        // Two jobs sharing an output file would clobber each other's checkpoints
        if !seen_outputs.insert(&job.output_file) {
            return Err(ConfigError::Validation(format!(
                "output file '{}' is used by more than one job",
                job.output_file
            )));
        }
    }

    Ok(())
}
