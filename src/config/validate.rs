// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, SagaflowError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::SagaflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.news, raw.policy))
    }
}

/// Run every semantic check on an already deserialized config.
///
/// Whether a policy's `on` kind and `workflow` name exist is checked when
/// the policies are bound to an application.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_news(cfg)?;
    validate_policies(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    let sizes = [
        ("channel_capacity", cfg.config.channel_capacity),
        ("max_steps_per_turn", cfg.config.max_steps_per_turn),
        ("max_retained_outcomes", cfg.config.max_retained_outcomes),
    ];
    for (key, value) in sizes {
        if value == 0 {
            return Err(SagaflowError::ConfigError(format!(
                "[config].{key} must be >= 1 (got 0)"
            )));
        }
    }
    Ok(())
}

fn validate_news(cfg: &RawConfigFile) -> Result<()> {
    let base_url = cfg.news.base_url.trim();
    if base_url.is_empty() {
        return Err(SagaflowError::ConfigError(
            "[news].base_url must not be empty".to_string(),
        ));
    }
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(SagaflowError::ConfigError(format!(
            "[news].base_url must be an http(s) URL (got '{base_url}')"
        )));
    }
    Ok(())
}

fn validate_policies(cfg: &RawConfigFile) -> Result<()> {
    for (name, policy) in cfg.policy.iter() {
        if policy.on.trim().is_empty() {
            return Err(SagaflowError::ConfigError(format!(
                "policy '{name}' must set a non-empty `on` action kind"
            )));
        }
        if policy.workflow.as_deref().is_some_and(|w| w.trim().is_empty()) {
            return Err(SagaflowError::ConfigError(format!(
                "policy '{name}' has an empty `workflow`"
            )));
        }
    }
    Ok(())
}
