// src/news/actions.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bus::Action;
use crate::errors::{Result, SagaflowError};

/// One story as returned by the HN Algolia search API.
///
/// Every field is optional: the API omits or nulls fields freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(rename = "objectID", default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub points: Option<i64>,
    #[serde(default)]
    pub num_comments: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NewsAction {
    RouteChanged(String),
    FetchNews,
    GetLatestNews,
    GetPopularNews,
    LatestNewsReady(Vec<NewsItem>),
    PopularNewsReady(Vec<NewsItem>),
    LatestNewsError(String),
    PopularNewsError(String),
    LoadingChanged(bool),
    IncreaseCount,
    DecreaseCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NewsKind {
    RouteChanged,
    FetchNews,
    GetLatestNews,
    GetPopularNews,
    LatestNewsReady,
    PopularNewsReady,
    LatestNewsError,
    PopularNewsError,
    LoadingChanged,
    IncreaseCount,
    DecreaseCount,
}

impl NewsKind {
    pub const ALL: [NewsKind; 11] = [
        NewsKind::RouteChanged,
        NewsKind::FetchNews,
        NewsKind::GetLatestNews,
        NewsKind::GetPopularNews,
        NewsKind::LatestNewsReady,
        NewsKind::PopularNewsReady,
        NewsKind::LatestNewsError,
        NewsKind::PopularNewsError,
        NewsKind::LoadingChanged,
        NewsKind::IncreaseCount,
        NewsKind::DecreaseCount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NewsKind::RouteChanged => "route-changed",
            NewsKind::FetchNews => "fetch-news",
            NewsKind::GetLatestNews => "get-latest-news",
            NewsKind::GetPopularNews => "get-popular-news",
            NewsKind::LatestNewsReady => "latest-news-ready",
            NewsKind::PopularNewsReady => "popular-news-ready",
            NewsKind::LatestNewsError => "latest-news-error",
            NewsKind::PopularNewsError => "popular-news-error",
            NewsKind::LoadingChanged => "loading-changed",
            NewsKind::IncreaseCount => "increase-count",
            NewsKind::DecreaseCount => "decrease-count",
        }
    }
}

impl fmt::Display for NewsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NewsKind {
    type Err = SagaflowError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        NewsKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SagaflowError::ConfigError(format!("unknown action kind '{wanted}'")))
    }
}

impl Action for NewsAction {
    type Kind = NewsKind;

    fn kind(&self) -> NewsKind {
        match self {
            NewsAction::RouteChanged(_) => NewsKind::RouteChanged,
            NewsAction::FetchNews => NewsKind::FetchNews,
            NewsAction::GetLatestNews => NewsKind::GetLatestNews,
            NewsAction::GetPopularNews => NewsKind::GetPopularNews,
            NewsAction::LatestNewsReady(_) => NewsKind::LatestNewsReady,
            NewsAction::PopularNewsReady(_) => NewsKind::PopularNewsReady,
            NewsAction::LatestNewsError(_) => NewsKind::LatestNewsError,
            NewsAction::PopularNewsError(_) => NewsKind::PopularNewsError,
            NewsAction::LoadingChanged(_) => NewsKind::LoadingChanged,
            NewsAction::IncreaseCount => NewsKind::IncreaseCount,
            NewsAction::DecreaseCount => NewsKind::DecreaseCount,
        }
    }
}

impl NewsAction {
    /// Build an action from its kind and an optional textual payload, as
    /// given on the command line (`route-changed=/popular-news`).
    ///
    /// `…-ready` payloads are JSON arrays of items; `loading-changed` takes
    /// `true`/`false`.
    pub fn from_parts(kind: NewsKind, payload: Option<&str>) -> Result<Self> {
        let missing = || SagaflowError::ConfigError(format!("action '{kind}' requires a payload"));

        let action = match kind {
            NewsKind::RouteChanged => NewsAction::RouteChanged(payload.ok_or_else(missing)?.to_string()),
            NewsKind::LatestNewsError => NewsAction::LatestNewsError(payload.ok_or_else(missing)?.to_string()),
            NewsKind::PopularNewsError => NewsAction::PopularNewsError(payload.ok_or_else(missing)?.to_string()),
            NewsKind::LatestNewsReady => NewsAction::LatestNewsReady(parse_items(kind, payload.ok_or_else(missing)?)?),
            NewsKind::PopularNewsReady => NewsAction::PopularNewsReady(parse_items(kind, payload.ok_or_else(missing)?)?),
            NewsKind::LoadingChanged => {
                let raw = payload.ok_or_else(missing)?;
                let flag = raw.trim().parse::<bool>().map_err(|_| {
                    SagaflowError::ConfigError(format!("action '{kind}' expects true or false, got '{raw}'"))
                })?;
                NewsAction::LoadingChanged(flag)
            }
            NewsKind::FetchNews
            | NewsKind::GetLatestNews
            | NewsKind::GetPopularNews
            | NewsKind::IncreaseCount
            | NewsKind::DecreaseCount => {
                if payload.is_some() {
                    return Err(SagaflowError::ConfigError(format!(
                        "action '{kind}' does not take a payload"
                    )));
                }
                match kind {
                    NewsKind::FetchNews => NewsAction::FetchNews,
                    NewsKind::GetLatestNews => NewsAction::GetLatestNews,
                    NewsKind::GetPopularNews => NewsAction::GetPopularNews,
                    NewsKind::IncreaseCount => NewsAction::IncreaseCount,
                    _ => NewsAction::DecreaseCount,
                }
            }
        };
        Ok(action)
    }
}

impl FromStr for NewsAction {
    type Err = SagaflowError;

    /// Parses `KIND` or `KIND=PAYLOAD`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (kind, payload) = match s.split_once('=') {
            Some((kind, payload)) => (kind, Some(payload)),
            None => (s, None),
        };
        NewsAction::from_parts(kind.parse()?, payload)
    }
}

fn parse_items(kind: NewsKind, raw: &str) -> Result<Vec<NewsItem>> {
    serde_json::from_str(raw).map_err(|e| {
        SagaflowError::ConfigError(format!("action '{kind}' payload is not a JSON item list: {e}"))
    })
}
