// src/news/mod.rs

//! The news application built on the engine.
//!
//! - [`actions`]: typed actions and the story item.
//! - [`store`]: the reducer state read by `ReadState`.
//! - [`workflows`]: route-driven fetch, single-feed fetch, fork/join fetch.
//! - [`api`]: HTTP operations for both feeds.
//!
//! [`register_policies`] binds `[policy.<name>]` entries to the workflows
//! here, by name.

pub mod actions;
pub mod api;
pub mod store;
pub mod workflows;

use std::collections::BTreeMap;

use tracing::info;

use crate::config::{ConfigFile, PolicyConfig};
use crate::effect::Workflow;
use crate::engine::{CoreRuntime, WorkflowFactory};
use crate::errors::{Result, SagaflowError};
use crate::types::LaunchMode;

pub use actions::{NewsAction, NewsItem, NewsKind};
pub use api::{NewsApi, register_news_operations};
pub use store::NewsStore;
pub use workflows::{Feed, FetchAllNewsWorkflow, FetchOneWorkflow, RouteNewsWorkflow};

/// Workflow names a policy can launch.
pub const WORKFLOW_NAMES: [&str; 4] = ["route-news", "fetch-all-news", "latest-news", "popular-news"];

/// Policies used when the config has no `[policy]` table.
pub fn default_policies() -> BTreeMap<String, PolicyConfig> {
    BTreeMap::from([
        (
            "route-news".to_string(),
            PolicyConfig::new(NewsKind::RouteChanged.as_str(), LaunchMode::Latest),
        ),
        (
            "fetch-all-news".to_string(),
            PolicyConfig::new(NewsKind::FetchNews.as_str(), LaunchMode::Every),
        ),
        (
            "latest-news".to_string(),
            PolicyConfig::new(NewsKind::GetLatestNews.as_str(), LaunchMode::Every),
        ),
        (
            "popular-news".to_string(),
            PolicyConfig::new(NewsKind::GetPopularNews.as_str(), LaunchMode::Every),
        ),
    ])
}

/// Policies `cfg` asks for, falling back to [`default_policies`].
pub fn effective_policies(cfg: &ConfigFile) -> BTreeMap<String, PolicyConfig> {
    if cfg.policy.is_empty() {
        default_policies()
    } else {
        cfg.policy.clone()
    }
}

/// Factory for the workflow called `name`.
pub fn workflow_factory(name: &str, query: &str) -> Result<WorkflowFactory<NewsAction>> {
    let query = query.to_string();
    let factory: WorkflowFactory<NewsAction> = match name {
        "route-news" => Box::new(move |_: &NewsAction| {
            Box::new(RouteNewsWorkflow::new(query.clone())) as Box<dyn Workflow<NewsAction>>
        }),
        "fetch-all-news" => Box::new(move |_: &NewsAction| {
            Box::new(FetchAllNewsWorkflow::new(query.clone())) as Box<dyn Workflow<NewsAction>>
        }),
        "latest-news" => Box::new(move |_: &NewsAction| {
            Box::new(FetchOneWorkflow::new(Feed::Latest, query.clone())) as Box<dyn Workflow<NewsAction>>
        }),
        "popular-news" => Box::new(move |_: &NewsAction| {
            Box::new(FetchOneWorkflow::new(Feed::Popular, query.clone())) as Box<dyn Workflow<NewsAction>>
        }),
        other => {
            return Err(SagaflowError::ConfigError(format!(
                "unknown workflow '{other}' (expected one of: {})",
                WORKFLOW_NAMES.join(", ")
            )));
        }
    };
    Ok(factory)
}

/// Register every effective policy of `cfg` on `core`, in policy-name order.
pub fn register_policies(core: &mut CoreRuntime<NewsAction>, cfg: &ConfigFile) -> Result<()> {
    for (name, policy) in effective_policies(cfg) {
        let kind: NewsKind = policy.on.parse().map_err(|_| {
            SagaflowError::ConfigError(format!(
                "policy '{name}' is triggered by unknown action kind '{}'",
                policy.on
            ))
        })?;
        let workflow = policy.workflow_name(&name);
        let factory = workflow_factory(workflow, &cfg.news.query)
            .map_err(|e| SagaflowError::ConfigError(format!("policy '{name}': {e}")))?;

        info!(policy = %name, %kind, launch = %policy.launch, workflow, "binding policy");
        core.register(name.clone(), kind, policy.launch, factory)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;
    use crate::engine::RuntimeOptions;

    fn core() -> CoreRuntime<NewsAction> {
        CoreRuntime::new(NewsStore::new(), RuntimeOptions::default())
    }

    #[test]
    fn defaults_bind_all_four_workflows() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        let mut core = core();
        register_policies(&mut core, &cfg).unwrap();

        let route = core
            .registrar()
            .policies()
            .find(|p| p.name() == "route-news")
            .unwrap();
        assert_eq!(route.kind(), NewsKind::RouteChanged);
        assert_eq!(route.mode(), LaunchMode::Latest);
        assert_eq!(core.registrar().len(), 4);
    }

    #[test]
    fn unknown_workflow_and_kind_are_config_errors() {
        let mut raw = RawConfigFile::default();
        raw.policy.insert(
            "custom".into(),
            PolicyConfig::new("fetch-news", LaunchMode::Every).with_workflow("nope"),
        );
        let cfg = ConfigFile::try_from(raw).unwrap();
        let err = register_policies(&mut core(), &cfg).unwrap_err();
        assert!(matches!(err, SagaflowError::ConfigError(msg) if msg.contains("nope")));

        let mut raw = RawConfigFile::default();
        raw.policy.insert(
            "route-news".into(),
            PolicyConfig::new("page-opened", LaunchMode::Every),
        );
        let cfg = ConfigFile::try_from(raw).unwrap();
        let err = register_policies(&mut core(), &cfg).unwrap_err();
        assert!(matches!(err, SagaflowError::ConfigError(msg) if msg.contains("page-opened")));
    }
}
