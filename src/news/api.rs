// src/news/api.rs

//! HTTP operations against the Hacker News Algolia search API.

use serde_json::Value;
use tracing::debug;

use crate::config::NewsSection;
use crate::errors::{OperationError, Result};
use crate::news::workflows::Feed;
use crate::ops::OperationRegistry;

/// Client for both news feeds.
#[derive(Debug, Clone)]
pub struct NewsApi {
    client: reqwest::Client,
    base_url: String,
    query: String,
}

impl NewsApi {
    pub fn new(news: &NewsSection) -> Self {
        Self::with_client(reqwest::Client::new(), news)
    }

    pub fn with_client(client: reqwest::Client, news: &NewsSection) -> Self {
        Self {
            client,
            base_url: news.base_url.trim_end_matches('/').to_string(),
            query: news.query.clone(),
        }
    }

    /// Fetch one feed and return the response's `hits` array.
    ///
    /// `args.query` overrides the configured query.
    pub async fn fetch(&self, feed: Feed, args: Value) -> std::result::Result<Value, OperationError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or(&self.query);
        let (path, tags) = endpoint(feed);
        let url = format!("{}/{}", self.base_url, path);

        debug!(%url, query, tags, "requesting news feed");

        let response = self
            .client
            .get(&url)
            .query(&[("query", query), ("tags", tags)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OperationError::Rejected(format!("{url} answered {status}")));
        }

        let mut body: Value = response.json().await?;
        match body.get_mut("hits").map(Value::take) {
            Some(hits @ Value::Array(_)) => Ok(hits),
            _ => Err(OperationError::Decode(
                "response has no 'hits' array".to_string(),
            )),
        }
    }
}

fn endpoint(feed: Feed) -> (&'static str, &'static str) {
    match feed {
        Feed::Latest => ("search_by_date", "story"),
        Feed::Popular => ("search", "front_page"),
    }
}

/// Register `fetch-latest` and `fetch-popular` backed by `api`.
pub fn register_news_operations(registry: &mut OperationRegistry, api: NewsApi) -> Result<()> {
    for feed in Feed::ALL {
        let api = api.clone();
        registry.register(feed.operation(), move |args: Value| {
            let api = api.clone();
            async move { api.fetch(feed, args).await }
        })?;
    }
    Ok(())
}
