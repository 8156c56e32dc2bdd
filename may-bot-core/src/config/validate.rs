//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();
    let provider = &config.provider;

    if provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if provider.api_base.trim().is_empty() {
        errors.push("provider.api_base must not be empty".to_string());
    } else if !provider.api_base.starts_with("http://")
        && !provider.api_base.starts_with("https://")
    {
        errors.push("provider.api_base must be an http(s) URL".to_string());
    }
    if provider.max_tokens == 0 {
        errors.push("provider.max_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&provider.temperature) {
        errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
    }
    if provider.timeout_secs == 0 {
        errors.push("provider.timeout_secs must be > 0".to_string());
    }

    let format = config.logging.format.to_lowercase();
    if format != "text" && format != "json" {
        errors.push("logging.format must be \"text\" or \"json\"".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
