//! News headlines for the prompt
//!
//! Each tracked symbol is used verbatim as a search term and the top three
//! headlines come back. The payload is probed leniently: a response that
//! does not carry the expected fields is reported as `None` rather than an
//! error, and the snapshot builder decides what to do with that (it stops
//! gathering news and keeps what it has).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::NewsConfig;

/// Headlines kept per symbol.
pub const MAX_HEADLINES: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// `Ok(None)` means the service answered but the payload was missing
    /// the expected fields. Transport and HTTP failures are errors.
    async fn search(&self, query: &str) -> Result<Option<Vec<Headline>>>;
}

pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(cfg: &NewsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        }
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn search(&self, query: &str) -> Result<Option<Vec<Headline>>> {
        let resp = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .query(&[("q", query), ("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("news search for {query:?} failed: {status}"));
        }

        let body: Value = resp.json().await?;
        Ok(extract_headlines(&body))
    }
}

/// Pull up to [`MAX_HEADLINES`] title/source pairs out of a NewsAPI-shaped
/// payload. Any missing field makes the whole payload malformed.
fn extract_headlines(body: &Value) -> Option<Vec<Headline>> {
    let articles = body.get("articles")?.as_array()?;

    let mut headlines = Vec::new();
    for article in articles.iter().take(MAX_HEADLINES) {
        let title = article.get("title")?.as_str()?;
        let source = article.get("source")?.get("name")?.as_str()?;
        headlines.push(Headline {
            title: title.to_string(),
            source: source.to_string(),
        });
    }
    Some(headlines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_top_three() {
        let body = json!({
            "status": "ok",
            "articles": [
                {"title": "BTC rallies", "source": {"name": "Example Wire"}},
                {"title": "Miners expand", "source": {"name": "Chain Daily"}},
                {"title": "ETF inflows", "source": {"name": "Market Watcher"}},
                {"title": "Fourth story", "source": {"name": "Ignored"}},
            ]
        });

        let headlines = extract_headlines(&body).unwrap();
        assert_eq!(headlines.len(), MAX_HEADLINES);
        assert_eq!(headlines[0].title, "BTC rallies");
        assert_eq!(headlines[0].source, "Example Wire");
        assert_eq!(headlines[2].source, "Market Watcher");
    }

    #[test]
    fn test_fewer_than_three_is_fine() {
        let body = json!({"articles": [
            {"title": "Quiet day", "source": {"name": "Chain Daily"}},
        ]});
        assert_eq!(extract_headlines(&body).unwrap().len(), 1);
        assert_eq!(extract_headlines(&json!({"articles": []})).unwrap().len(), 0);
    }

    #[test]
    fn test_missing_articles_is_malformed() {
        let body = json!({"status": "error", "code": "rateLimited"});
        assert!(extract_headlines(&body).is_none());
    }

    #[test]
    fn test_article_missing_source_name_is_malformed() {
        let body = json!({"articles": [
            {"title": "BTC rallies", "source": {}},
        ]});
        assert!(extract_headlines(&body).is_none());

        let body = json!({"articles": [
            {"source": {"name": "Chain Daily"}},
        ]});
        assert!(extract_headlines(&body).is_none());
    }
}
