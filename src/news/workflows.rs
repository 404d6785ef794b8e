// src/news/workflows.rs

//! News-fetching workflows.
//!
//! Each workflow is an explicit state machine: `stage` records which effect
//! was yielded last, so `resume` knows what the injected value means.

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::effect::{Effect, Resume, Step, Workflow};
use crate::engine::TaskId;
use crate::errors::WorkflowError;
use crate::news::actions::{NewsAction, NewsItem};

type NewsStep = Result<Step<NewsAction>, WorkflowError>;

/// One of the two news feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    Latest,
    Popular,
}

impl Feed {
    pub const ALL: [Feed; 2] = [Feed::Latest, Feed::Popular];

    /// Name of the operation that fetches this feed.
    pub fn operation(self) -> &'static str {
        match self {
            Feed::Latest => "fetch-latest",
            Feed::Popular => "fetch-popular",
        }
    }

    pub fn route(self) -> &'static str {
        match self {
            Feed::Latest => "/latest-news",
            Feed::Popular => "/popular-news",
        }
    }

    pub fn from_route(route: &str) -> Option<Feed> {
        Feed::ALL.into_iter().find(|feed| feed.route() == route)
    }

    pub fn error_message(self) -> &'static str {
        match self {
            Feed::Latest => "Error fetching latest news",
            Feed::Popular => "Error fetching popular news",
        }
    }

    fn ready(self, items: Vec<NewsItem>) -> NewsAction {
        match self {
            Feed::Latest => NewsAction::LatestNewsReady(items),
            Feed::Popular => NewsAction::PopularNewsReady(items),
        }
    }

    fn failed(self) -> NewsAction {
        let message = self.error_message().to_string();
        match self {
            Feed::Latest => NewsAction::LatestNewsError(message),
            Feed::Popular => NewsAction::PopularNewsError(message),
        }
    }
}

fn finished(name: &str) -> WorkflowError {
    WorkflowError::Program(format!("{name} resumed after completion"))
}

#[derive(Debug)]
enum FetchStage {
    Invoke,
    Decode,
    Report(Value),
    Finished,
}

/// Fetch one feed and report it: `Invoke`, then `Emit` the ready action, or
/// the feed's error action if the call failed or returned something that is
/// not a list of items.
///
/// The failure is contained: the workflow completes either way, with the
/// number of items fetched or `null`.
#[derive(Debug)]
pub struct FetchOneWorkflow {
    feed: Feed,
    query: String,
    stage: FetchStage,
}

impl FetchOneWorkflow {
    pub fn new(feed: Feed, query: impl Into<String>) -> Self {
        Self {
            feed,
            query: query.into(),
            stage: FetchStage::Invoke,
        }
    }
}

impl Workflow<NewsAction> for FetchOneWorkflow {
    fn name(&self) -> &str {
        self.feed.operation()
    }

    fn resume(&mut self, input: Resume<NewsAction>) -> NewsStep {
        match std::mem::replace(&mut self.stage, FetchStage::Finished) {
            FetchStage::Invoke => {
                self.stage = FetchStage::Decode;
                Ok(Step::Yield(Effect::invoke(
                    self.feed.operation(),
                    json!({ "query": self.query }),
                )))
            }
            FetchStage::Decode => {
                let decoded = input.into_value().and_then(|hits| {
                    serde_json::from_value::<Vec<NewsItem>>(hits)
                        .map_err(|e| WorkflowError::Program(format!("malformed news items: {e}")))
                });

                match decoded {
                    Ok(items) => {
                        debug!(feed = ?self.feed, items = items.len(), "news fetched");
                        self.stage = FetchStage::Report(Value::from(items.len()));
                        Ok(Step::Yield(Effect::emit(self.feed.ready(items))))
                    }
                    Err(err) => {
                        warn!(feed = ?self.feed, error = %err, "news fetch failed");
                        self.stage = FetchStage::Report(Value::Null);
                        Ok(Step::Yield(Effect::emit(self.feed.failed())))
                    }
                }
            }
            FetchStage::Report(result) => Ok(Step::Done(result)),
            FetchStage::Finished => Err(finished(self.name())),
        }
    }
}

#[derive(Debug)]
enum RouteStage {
    ReadRoute,
    Route,
    Fetch(FetchOneWorkflow),
    Finish(Value),
    Finished,
}

/// Launched on `route-changed`: reads the route from state and fetches the
/// feed shown on that page, toggling `loading` around the fetch.
///
/// Routes without a feed complete right after reading the route.
#[derive(Debug)]
pub struct RouteNewsWorkflow {
    query: String,
    stage: RouteStage,
}

impl RouteNewsWorkflow {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            stage: RouteStage::ReadRoute,
        }
    }
}

impl Workflow<NewsAction> for RouteNewsWorkflow {
    fn name(&self) -> &str {
        "route-news"
    }

    fn resume(&mut self, input: Resume<NewsAction>) -> NewsStep {
        match std::mem::replace(&mut self.stage, RouteStage::Finished) {
            RouteStage::ReadRoute => {
                self.stage = RouteStage::Route;
                Ok(Step::Yield(Effect::read_state("route")))
            }
            RouteStage::Route => {
                let route = input.into_value()?;
                let Some(feed) = route.as_str().and_then(Feed::from_route) else {
                    debug!(%route, "route shows no news feed");
                    return Ok(Step::Done(Value::Null));
                };
                self.stage = RouteStage::Fetch(FetchOneWorkflow::new(feed, self.query.clone()));
                Ok(Step::Yield(Effect::emit(NewsAction::LoadingChanged(true))))
            }
            RouteStage::Fetch(mut fetch) => match fetch.resume(input)? {
                Step::Yield(effect) => {
                    self.stage = RouteStage::Fetch(fetch);
                    Ok(Step::Yield(effect))
                }
                Step::Done(result) => {
                    self.stage = RouteStage::Finish(result);
                    Ok(Step::Yield(Effect::emit(NewsAction::LoadingChanged(false))))
                }
            },
            RouteStage::Finish(result) => Ok(Step::Done(result)),
            RouteStage::Finished => Err(finished(self.name())),
        }
    }
}

#[derive(Debug)]
enum FetchAllStage {
    Start,
    ForkedLatest,
    ForkedPopular { latest: TaskId },
    JoinedLatest { popular: TaskId },
    JoinedPopular { latest: Value },
    Finished,
}

/// Launched on `fetch-news`: forks one [`FetchOneWorkflow`] per feed, then
/// joins both. Completes with `{"latest": n, "popular": n}` once both joins
/// resolved, whichever child finished first.
#[derive(Debug)]
pub struct FetchAllNewsWorkflow {
    query: String,
    stage: FetchAllStage,
}

impl FetchAllNewsWorkflow {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            stage: FetchAllStage::Start,
        }
    }

    fn child(&self, feed: Feed) -> Effect<NewsAction> {
        Effect::fork(FetchOneWorkflow::new(feed, self.query.clone()))
    }
}

impl Workflow<NewsAction> for FetchAllNewsWorkflow {
    fn name(&self) -> &str {
        "fetch-all-news"
    }

    fn resume(&mut self, input: Resume<NewsAction>) -> NewsStep {
        match std::mem::replace(&mut self.stage, FetchAllStage::Finished) {
            FetchAllStage::Start => {
                self.stage = FetchAllStage::ForkedLatest;
                Ok(Step::Yield(self.child(Feed::Latest)))
            }
            FetchAllStage::ForkedLatest => {
                let latest = input.into_handle()?;
                self.stage = FetchAllStage::ForkedPopular { latest };
                Ok(Step::Yield(self.child(Feed::Popular)))
            }
            FetchAllStage::ForkedPopular { latest } => {
                let popular = input.into_handle()?;
                self.stage = FetchAllStage::JoinedLatest { popular };
                Ok(Step::Yield(Effect::join(latest)))
            }
            FetchAllStage::JoinedLatest { popular } => {
                let latest = input.into_value()?;
                self.stage = FetchAllStage::JoinedPopular { latest };
                Ok(Step::Yield(Effect::join(popular)))
            }
            FetchAllStage::JoinedPopular { latest } => {
                let popular = input.into_value()?;
                Ok(Step::Done(json!({ "latest": latest, "popular": popular })))
            }
            FetchAllStage::Finished => Err(finished(self.name())),
        }
    }
}
