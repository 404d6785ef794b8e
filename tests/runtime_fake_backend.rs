// tests/runtime_fake_backend.rs

mod common;

use std::error::Error;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

use sagaflow::engine::{CoreRuntime, EngineHandle, Runtime, RuntimeEvent, RuntimeOptions};
use sagaflow::errors::SagaflowError;
use sagaflow::news::{self, NewsAction, NewsStore};
use sagaflow_test_utils::builders::ConfigFileBuilder;
use sagaflow_test_utils::fake_backend::{CallLog, ManualBackend, ScriptedBackend};

use common::{hits, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn once_core() -> CoreRuntime<NewsAction> {
    let cfg = ConfigFileBuilder::new().build();
    let mut core = CoreRuntime::new(NewsStore::new(), cfg.config.runtime_options(true));
    news::register_policies(&mut core, &cfg).expect("policies");
    core
}

fn array_len(core: &CoreRuntime<NewsAction>, selector: &str) -> usize {
    core.select(selector)
        .and_then(|v| v.as_array().map(Vec::len))
        .unwrap_or(0)
}

#[tokio::test]
async fn once_mode_runs_fetch_news_to_completion_and_exits() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent<NewsAction>>(16);
    let log = CallLog::new();
    let backend = ScriptedBackend::new(rt_tx.clone(), log.clone())
        .succeed("fetch-latest", hits(2))
        .succeed("fetch-popular", hits(3));

    // Seed the action before starting the runtime loop.
    EngineHandle::new(rt_tx).publish(NewsAction::FetchNews).await?;

    let runtime = Runtime::new(once_core(), rt_rx, backend);

    let run_result = timeout(Duration::from_secs(3), runtime.run()).await;
    let core = match run_result {
        Ok(Ok(core)) => core,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => panic!("runtime did not finish within 3 seconds"),
    };

    assert_eq!(log.operations(), vec!["fetch-latest", "fetch-popular"]);
    assert_eq!(array_len(&core, "latest_news"), 2);
    assert_eq!(array_len(&core, "popular_news"), 3);
    assert!(core.is_idle());

    Ok(())
}

#[tokio::test]
async fn reverse_settlement_order_still_joins_both() -> TestResult {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent<NewsAction>>(16);
    let log = CallLog::new();
    let backend = ScriptedBackend::new(rt_tx.clone(), log.clone())
        .succeed("fetch-latest", hits(1))
        .succeed("fetch-popular", hits(1))
        .settle_in_reverse();

    EngineHandle::new(rt_tx).publish(NewsAction::FetchNews).await?;
    let core = with_timeout(Runtime::new(once_core(), rt_rx, backend).run()).await?;

    assert_eq!(log.operations(), vec!["fetch-popular", "fetch-latest"]);
    let root = common::last_root(&core, "fetch-all-news");
    assert_eq!(
        core.supervisor().outcome_of(root),
        Some(&sagaflow::engine::Outcome::Completed(json!({ "latest": 1, "popular": 1 })))
    );
    Ok(())
}

#[tokio::test]
async fn failing_operation_reports_error_through_the_store() -> TestResult {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent<NewsAction>>(16);
    let backend = ScriptedBackend::new(rt_tx.clone(), CallLog::new())
        .fail("fetch-latest", "HTTP 500");

    EngineHandle::new(rt_tx)
        .publish(NewsAction::RouteChanged("/latest-news".into()))
        .await?;
    let core = with_timeout(Runtime::new(once_core(), rt_rx, backend).run()).await?;

    assert_eq!(core.select("latest_error"), Some(json!("Error fetching latest news")));
    assert_eq!(core.select("loading"), Some(json!(false)));
    Ok(())
}

#[tokio::test]
async fn handle_drives_a_long_running_engine_until_shutdown() -> TestResult {
    init_tracing();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent<NewsAction>>(16);
    let handle = EngineHandle::new(rt_tx.clone());
    let log = CallLog::new();

    let cfg = ConfigFileBuilder::new().build();
    let mut core = CoreRuntime::new(NewsStore::new(), RuntimeOptions::default());
    news::register_policies(&mut core, &cfg)?;

    let runtime = tokio::spawn(Runtime::new(core, rt_rx, ManualBackend::new(log.clone())).run());

    handle
        .publish(NewsAction::RouteChanged("/popular-news".into()))
        .await?;
    let calls = with_timeout(log.wait_for(1)).await;
    assert_eq!(calls[0].operation, "fetch-popular");

    rt_tx
        .send(RuntimeEvent::OperationSettled {
            call: calls[0].call,
            result: Ok(hits(4)),
        })
        .await?;
    handle.publish(NewsAction::IncreaseCount).await?;
    handle.shutdown().await?;

    let core = with_timeout(runtime).await??;
    assert_eq!(array_len(&core, "popular_news"), 4);
    assert_eq!(core.select("count"), Some(json!(1)));

    // The loop is gone; publishing now fails.
    drop(core);
    let err = handle.publish(NewsAction::FetchNews).await.unwrap_err();
    assert!(matches!(err, SagaflowError::ChannelClosed(_)));
    Ok(())
}

#[tokio::test]
async fn once_mode_processes_every_seeded_action_before_exiting() -> TestResult {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent<NewsAction>>(16);
    let log = CallLog::new();
    let backend = ScriptedBackend::new(rt_tx.clone(), log.clone())
        .succeed("fetch-latest", hits(1))
        .succeed("fetch-popular", hits(2));

    // The first action launches nothing, so the core is idle right after it.
    let handle = EngineHandle::new(rt_tx);
    handle.publish(NewsAction::IncreaseCount).await?;
    handle.publish(NewsAction::FetchNews).await?;
    handle.publish(NewsAction::IncreaseCount).await?;

    let core = with_timeout(Runtime::new(once_core(), rt_rx, backend).run()).await?;

    assert_eq!(log.operations(), vec!["fetch-latest", "fetch-popular"]);
    assert_eq!(core.select("count"), Some(json!(2)));
    assert_eq!(array_len(&core, "popular_news"), 2);
    Ok(())
}

#[tokio::test]
async fn once_mode_with_nothing_seeded_exits_immediately() -> TestResult {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent<NewsAction>>(4);
    let log = CallLog::new();
    let backend = ScriptedBackend::new(rt_tx.clone(), log.clone());

    let core = with_timeout(Runtime::new(once_core(), rt_rx, backend).run()).await?;

    assert!(log.is_empty());
    assert!(core.is_idle());
    drop(rt_tx);
    Ok(())
}

#[tokio::test]
async fn scripted_batch_larger_than_channel_capacity_still_settles() -> TestResult {
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent<NewsAction>>(1);
    let backend = ScriptedBackend::new(rt_tx.clone(), CallLog::new())
        .succeed("fetch-latest", hits(1))
        .succeed("fetch-popular", hits(1));

    EngineHandle::new(rt_tx).publish(NewsAction::FetchNews).await?;
    let core = with_timeout(Runtime::new(once_core(), rt_rx, backend).run()).await?;

    let root = common::last_root(&core, "fetch-all-news");
    assert_eq!(
        core.supervisor().outcome_of(root),
        Some(&sagaflow::engine::Outcome::Completed(json!({ "latest": 1, "popular": 1 })))
    );
    Ok(())
}
