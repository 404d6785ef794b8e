#![allow(dead_code)]

use serde_json::{Value, json};

use sagaflow::config::ConfigFile;
use sagaflow::engine::{CoreRuntime, CoreStep, RuntimeEvent, ScheduledCall, TaskId};
use sagaflow::errors::OperationError;
use sagaflow::news::{self, NewsAction, NewsStore};
use sagaflow_test_utils::builders::ConfigFileBuilder;

pub use sagaflow_test_utils::{init_tracing, with_timeout};

/// Core with the news store and the default news policies.
pub fn news_core() -> CoreRuntime<NewsAction> {
    news_core_with(&ConfigFileBuilder::new().build())
}

pub fn news_core_with(cfg: &ConfigFile) -> CoreRuntime<NewsAction> {
    let mut core = CoreRuntime::new(NewsStore::new(), cfg.config.runtime_options(false));
    news::register_policies(&mut core, cfg).expect("register news policies");
    core
}

/// `n` fake hits as returned by the search API.
pub fn hits(n: usize) -> Value {
    Value::Array(
        (0..n)
            .map(|i| json!({ "objectID": i.to_string(), "title": format!("story {i}") }))
            .collect(),
    )
}

pub fn calls_of(step: &CoreStep) -> Vec<ScheduledCall> {
    step.calls().cloned().collect()
}

pub fn settle(
    core: &mut CoreRuntime<NewsAction>,
    call: &ScheduledCall,
    result: Result<Value, OperationError>,
) -> CoreStep {
    core.step(RuntimeEvent::OperationSettled {
        call: call.call,
        result,
    })
}

/// Root launched by the most recent match of policy `name`.
pub fn last_root(core: &CoreRuntime<NewsAction>, name: &str) -> TaskId {
    core.registrar()
        .policies()
        .find(|p| p.name() == name)
        .and_then(|p| p.last_launched())
        .unwrap_or_else(|| panic!("policy {name} never launched"))
}
