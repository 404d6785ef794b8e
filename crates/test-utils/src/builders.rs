#![allow(dead_code)]

use std::collections::BTreeMap;

use sagaflow::config::{ConfigFile, ConfigSection, NewsSection, PolicyConfig, RawConfigFile};
use sagaflow::types::LaunchMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                news: NewsSection::default(),
                policy: BTreeMap::new(),
            },
        }
    }

    pub fn with_policy(mut self, name: &str, policy: PolicyConfig) -> Self {
        self.config.policy.insert(name.to_string(), policy);
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.config.news.base_url = url.to_string();
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.config.news.query = query.to_string();
        self
    }

    pub fn with_max_retained_outcomes(mut self, n: usize) -> Self {
        self.config.config.max_retained_outcomes = n;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `PolicyConfig`.
pub struct PolicyConfigBuilder {
    policy: PolicyConfig,
}

impl PolicyConfigBuilder {
    pub fn new(on: &str) -> Self {
        Self {
            policy: PolicyConfig::new(on, LaunchMode::Every),
        }
    }

    pub fn launch(mut self, mode: LaunchMode) -> Self {
        self.policy.launch = mode;
        self
    }

    pub fn workflow(mut self, name: &str) -> Self {
        self.policy.workflow = Some(name.to_string());
        self
    }

    pub fn build(self) -> PolicyConfig {
        self.policy
    }
}
