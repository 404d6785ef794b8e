// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::engine::RuntimeOptions;
use crate::types::LaunchMode;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// channel_capacity = 64
/// max_steps_per_turn = 1024
/// max_retained_outcomes = 1024
///
/// [news]
/// base_url = "http://hn.algolia.com/api/v1"
/// query = "react"
///
/// [policy.route-news]
/// on = "route-changed"
/// launch = "latest"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Engine sizing from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// News API settings from `[news]`.
    #[serde(default)]
    pub news: NewsSection,

    /// Dispatch policies from `[policy.<name>]`.
    #[serde(default)]
    pub policy: BTreeMap<String, PolicyConfig>,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub news: NewsSection,
    /// Keys are policy names; iteration order is registration order.
    pub policy: BTreeMap<String, PolicyConfig>,
}

impl ConfigFile {
    /// Assemble without validation. Only `TryFrom<RawConfigFile>` should
    /// call this.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        news: NewsSection,
        policy: BTreeMap<String, PolicyConfig>,
    ) -> Self {
        Self {
            config,
            news,
            policy,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ConfigSection {
    /// Capacity of the runtime event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Effects one instance may interpret in a single turn before it is
    /// failed for never suspending.
    #[serde(default = "default_max_steps_per_turn")]
    pub max_steps_per_turn: usize,

    /// Terminal instance records kept for late joins.
    #[serde(default = "default_max_retained_outcomes")]
    pub max_retained_outcomes: usize,
}

fn default_channel_capacity() -> usize {
    64
}

fn default_max_steps_per_turn() -> usize {
    1024
}

fn default_max_retained_outcomes() -> usize {
    1024
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            max_steps_per_turn: default_max_steps_per_turn(),
            max_retained_outcomes: default_max_retained_outcomes(),
        }
    }
}

impl ConfigSection {
    pub fn runtime_options(&self, exit_when_idle: bool) -> RuntimeOptions {
        RuntimeOptions {
            exit_when_idle,
            max_steps_per_turn: self.max_steps_per_turn,
            max_retained_outcomes: self.max_retained_outcomes,
        }
    }
}

/// `[news]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NewsSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Search query sent with both feeds.
    #[serde(default = "default_query")]
    pub query: String,
}

fn default_base_url() -> String {
    "http://hn.algolia.com/api/v1".to_string()
}

fn default_query() -> String {
    "react".to_string()
}

impl Default for NewsSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query: default_query(),
        }
    }
}

/// `[policy.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Action kind that triggers the policy, e.g. `"route-changed"`.
    pub on: String,

    /// `"every"` (default), `"latest"` or `"first"`.
    #[serde(default)]
    pub launch: LaunchMode,

    /// Workflow to launch. Defaults to the policy name.
    #[serde(default)]
    pub workflow: Option<String>,
}

impl PolicyConfig {
    pub fn new(on: impl Into<String>, launch: LaunchMode) -> Self {
        Self {
            on: on.into(),
            launch,
            workflow: None,
        }
    }

    pub fn with_workflow(mut self, workflow: impl Into<String>) -> Self {
        self.workflow = Some(workflow.into());
        self
    }

    /// Effective workflow name for the policy called `policy_name`.
    pub fn workflow_name<'a>(&'a self, policy_name: &'a str) -> &'a str {
        self.workflow.as_deref().unwrap_or(policy_name)
    }
}
