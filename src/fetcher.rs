use std::time::Duration;

use chrono::{NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{CategoryConfig, Config, Secrets};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Article {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

impl Article {
    /// Text block handed to the summarizer for this article.
    pub fn prompt_text(&self) -> String {
        format!(
            "Title: {}\nURL: {}\nContent: {} {}",
            self.title, self.url, self.description, self.content
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Articles(Vec<Article>),
    NoRecentNews,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

pub struct Fetcher {
    client: Client,
    base_url: String,
    api_key: String,
    lookback_days: i64,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = Secrets::require(&config.secrets.news_api_key, "NEWS_API_KEY")?;
        Self::with_parts(&config.news_base_url, api_key, config.lookback_days)
    }

    pub fn with_parts(base_url: &str, api_key: &str, lookback_days: i64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("NewsDigest/1.0")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            lookback_days,
        })
    }

    /// Search for the category's query over the trailing window, newest first.
    pub async fn fetch(&self, category: &CategoryConfig) -> Result<FetchOutcome> {
        let from = from_date(Utc::now().date_naive(), self.lookback_days);
        info!("Fetching news for '{}' since {}", category.key, from);

        let response = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .query(&[
                ("q", category.query.as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("from", from.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("News search for '{}' returned {}", category.key, status);
            return Err(Error::NewsApi {
                category: category.key.clone(),
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response.json().await?;
        if body.articles.is_empty() {
            info!("No recent news for '{}'", category.key);
            return Ok(FetchOutcome::NoRecentNews);
        }

        info!("Found {} articles for '{}'", body.articles.len(), category.key);
        Ok(FetchOutcome::Articles(body.articles))
    }
}

/// First day of the lookback window as `YYYY-MM-DD`.
pub fn from_date(today: NaiveDate, lookback_days: i64) -> String {
    (today - chrono::Duration::days(lookback_days))
        .format("%Y-%m-%d")
        .to_string()
}
