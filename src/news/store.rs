// src/news/store.rs

use serde::Serialize;
use serde_json::Value;

use crate::news::actions::{NewsAction, NewsItem};
use crate::state::{Selector, Store};

/// Reducer state of the news application.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewsStore {
    pub route: String,
    pub latest_news: Vec<NewsItem>,
    pub popular_news: Vec<NewsItem>,
    pub latest_error: Option<String>,
    pub popular_error: Option<String>,
    pub loading: bool,
    pub count: i64,
}

impl NewsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store<NewsAction> for NewsStore {
    fn reduce(&mut self, action: &NewsAction) {
        match action {
            NewsAction::RouteChanged(route) => self.route = route.clone(),
            // Latest stories accumulate across fetches.
            NewsAction::LatestNewsReady(items) => {
                self.latest_news.extend(items.iter().cloned());
                self.latest_error = None;
            }
            NewsAction::PopularNewsReady(items) => {
                self.popular_news = items.clone();
                self.popular_error = None;
            }
            NewsAction::LatestNewsError(message) => {
                self.latest_error = Some(message.clone());
                self.loading = false;
            }
            NewsAction::PopularNewsError(message) => {
                self.popular_error = Some(message.clone());
                self.loading = false;
            }
            NewsAction::LoadingChanged(loading) => self.loading = *loading,
            NewsAction::IncreaseCount => self.count += 1,
            NewsAction::DecreaseCount => self.count -= 1,
            NewsAction::FetchNews | NewsAction::GetLatestNews | NewsAction::GetPopularNews => {}
        }
    }

    fn select(&self, selector: &Selector) -> Option<Value> {
        let value = match selector.as_str() {
            "route" => Value::from(self.route.clone()),
            "latest_news" => serde_json::to_value(&self.latest_news).ok()?,
            "popular_news" => serde_json::to_value(&self.popular_news).ok()?,
            "latest_error" => self.latest_error.clone().map_or(Value::Null, Value::from),
            "popular_error" => self.popular_error.clone().map_or(Value::Null, Value::from),
            "loading" => Value::from(self.loading),
            "count" => Value::from(self.count),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn item(id: &str) -> NewsItem {
        NewsItem {
            object_id: Some(id.to_string()),
            ..NewsItem::default()
        }
    }

    #[test]
    fn latest_news_appends_and_popular_news_replaces() {
        let mut store = NewsStore::new();
        store.reduce(&NewsAction::LatestNewsReady(vec![item("a")]));
        store.reduce(&NewsAction::LatestNewsReady(vec![item("b")]));
        store.reduce(&NewsAction::PopularNewsReady(vec![item("x")]));
        store.reduce(&NewsAction::PopularNewsReady(vec![item("y")]));

        assert_eq!(store.latest_news, vec![item("a"), item("b")]);
        assert_eq!(store.popular_news, vec![item("y")]);
    }

    #[test]
    fn errors_clear_loading() {
        let mut store = NewsStore::new();
        store.reduce(&NewsAction::LoadingChanged(true));
        store.reduce(&NewsAction::PopularNewsError("boom".into()));

        assert!(!store.loading);
        assert_eq!(store.select(&"popular_error".into()), Some(json!("boom")));
        assert_eq!(store.select(&"latest_error".into()), Some(json!(null)));
    }

    #[test]
    fn counter_and_route_selectors() {
        let mut store = NewsStore::new();
        store.reduce(&NewsAction::RouteChanged("/latest-news".into()));
        store.reduce(&NewsAction::IncreaseCount);
        store.reduce(&NewsAction::IncreaseCount);
        store.reduce(&NewsAction::DecreaseCount);

        assert_eq!(store.select(&"route".into()), Some(json!("/latest-news")));
        assert_eq!(store.select(&"count".into()), Some(json!(1)));
        assert_eq!(store.select(&"unknown".into()), None);
    }
}
