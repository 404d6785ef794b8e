// src/lib.rs

pub mod bus;
pub mod cli;
pub mod config;
pub mod effect;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod news;
pub mod ops;
pub mod state;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::bus::Action;
use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate};
use crate::engine::{CoreRuntime, EngineHandle, Runtime, RuntimeEvent};
use crate::news::{NewsAction, NewsApi, NewsStore, register_news_operations};
use crate::ops::{OperationRegistry, RegistryBackend};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - operation registry / backend
/// - core runtime with the news store and policies
/// - startup actions from `--publish`
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Startup actions are queued before the loop runs, so the channel must
    // hold all of them.
    let capacity = cfg.config.channel_capacity.max(args.publish.len() + 1);
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent<NewsAction>>(capacity);

    let mut registry = OperationRegistry::new();
    register_news_operations(&mut registry, NewsApi::new(&cfg.news))?;
    let registry = Arc::new(registry);

    let mut core = CoreRuntime::new(NewsStore::new(), cfg.config.runtime_options(args.once))
        .with_rules(registry.effect_rules());
    news::register_policies(&mut core, &cfg)?;
    core.subscribe_all(|action: &NewsAction| {
        debug!(kind = %action.kind(), "action delivered");
    });

    let backend = RegistryBackend::new(Arc::clone(&registry), rt_tx.clone());
    let handle = EngineHandle::new(rt_tx);

    // Ctrl-C → graceful shutdown.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = handle.shutdown().await;
        });
    }

    info!(count = args.publish.len(), "publishing startup actions");
    for action in args.publish {
        handle.publish(action).await?;
    }

    let runtime = Runtime::new(core, rt_rx, backend);
    let core = runtime.run().await?;

    print_summary(&core);
    Ok(())
}

/// Final state snapshot on stdout.
fn print_summary(core: &CoreRuntime<NewsAction>) {
    let len = |selector: &str| {
        core.select(selector)
            .and_then(|v| v.as_array().map(Vec::len))
            .unwrap_or(0)
    };

    println!("sagaflow summary");
    if let Some(route) = core.select("route") {
        println!("  route = {route}");
    }
    println!("  latest_news = {} items", len("latest_news"));
    println!("  popular_news = {} items", len("popular_news"));
    for selector in ["latest_error", "popular_error"] {
        if let Some(err) = core.select(selector).filter(|v| !v.is_null()) {
            println!("  {selector} = {err}");
        }
    }
    println!("  live workflows = {}", core.supervisor().live_count());
}

/// Simple dry-run output: print engine sizing, news settings and policies.
fn print_dry_run(cfg: &ConfigFile) {
    println!("sagaflow dry-run");
    println!("  config.channel_capacity = {}", cfg.config.channel_capacity);
    println!("  config.max_steps_per_turn = {}", cfg.config.max_steps_per_turn);
    println!(
        "  config.max_retained_outcomes = {}",
        cfg.config.max_retained_outcomes
    );
    println!("  news.base_url = {}", cfg.news.base_url);
    println!("  news.query = {}", cfg.news.query);
    println!();

    let policies = news::effective_policies(cfg);
    if cfg.policy.is_empty() {
        println!("policies ({}, built-in defaults):", policies.len());
    } else {
        println!("policies ({}):", policies.len());
    }
    for (name, policy) in policies.iter() {
        println!("  - {name}");
        println!("      on: {}", policy.on);
        println!("      launch: {}", policy.launch);
        println!("      workflow: {}", policy.workflow_name(name));
    }

    debug!("dry-run complete (nothing executed)");
}
