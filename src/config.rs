use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One paragraph per category
    #[default]
    Digest,
    /// One short post per article
    Thread,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Newsletter title shown on the subscription page
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub mode: Mode,
    /// Trailing news search window in days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_email_subject")]
    pub email_subject: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_news_base_url")]
    pub news_base_url: String,
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_twitter_base_url")]
    pub twitter_base_url: String,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
    #[serde(skip)]
    pub secrets: Secrets,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CategoryConfig {
    pub key: String,
    /// Display name, defaults to the capitalized key
    pub label: Option<String>,
    pub query: String,
    pub system_prompt: String,
}

impl CategoryConfig {
    pub fn label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => capitalize(&self.key),
        }
    }
}

/// Credentials and subscriber seed read from the environment.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub news_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub email_address: Option<String>,
    pub email_password: Option<String>,
    pub twitter_api_key: Option<String>,
    pub twitter_api_secret: Option<String>,
    pub twitter_access_token: Option<String>,
    pub twitter_access_token_secret: Option<String>,
    pub subscribers: Vec<String>,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let subscribers = match var("SUBSCRIBERS") {
            Some(json) => parse_subscribers(&json)?,
            None => Vec::new(),
        };

        Ok(Self {
            news_api_key: var("NEWS_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            email_address: var("EMAIL_ADDRESS"),
            email_password: var("EMAIL_PASSWORD"),
            twitter_api_key: var("TWITTER_API_KEY"),
            twitter_api_secret: var("TWITTER_API_SECRET"),
            twitter_access_token: var("TWITTER_ACCESS_TOKEN"),
            twitter_access_token_secret: var("TWITTER_ACCESS_TOKEN_SECRET"),
            subscribers,
        })
    }

    /// Returns the value of a credential or a configuration error naming it.
    pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{} is not set", name)))
    }
}

/// Parse the `SUBSCRIBERS` JSON list.
pub fn parse_subscribers(json: &str) -> Result<Vec<String>> {
    serde_json::from_str::<Vec<String>>(json)
        .map_err(|e| Error::Config(format!("SUBSCRIBERS is not a JSON list of strings: {}", e)))
}

fn default_title() -> String {
    "Daily News Summary".to_string()
}

fn default_lookback_days() -> i64 {
    2
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_email_subject() -> String {
    "News Summary: Warriors and Regenerative Tech".to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_url() -> String {
    "sqlite:news_digest.db?mode=rwc".to_string()
}

fn default_news_base_url() -> String {
    "https://newsapi.org".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_twitter_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig {
            key: "warriors".to_string(),
            label: None,
            query: r#""Golden State Warriors" OR (Warriors AND (NBA OR basketball))"#.to_string(),
            system_prompt: "You are a helpful assistant that summarizes news articles about the \
                Golden State Warriors. If the articles are not related to the Warriors or NBA \
                basketball, state that no relevant news was found."
                .to_string(),
        },
        CategoryConfig {
            key: "regenerative".to_string(),
            label: None,
            query: r#""regenerative technology" OR "wise technology""#.to_string(),
            system_prompt: "You are a helpful assistant that summarizes news articles about \
                regenerative technology, including wise technology. If the articles are not \
                related to regenerative technology, state that no relevant news was found."
                .to_string(),
        },
    ]
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: default_title(),
            mode: Mode::default(),
            lookback_days: default_lookback_days(),
            model: default_model(),
            email_subject: default_email_subject(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            bind: default_bind(),
            database_url: default_database_url(),
            news_base_url: default_news_base_url(),
            llm_base_url: default_llm_base_url(),
            twitter_base_url: default_twitter_base_url(),
            categories: default_categories(),
            secrets: Secrets::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_str(&content)
    }

    /// Load the file if it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        if config.lookback_days < 0 {
            return Err(Error::Config("lookback_days must not be negative".to_string()));
        }
        Ok(config)
    }

    /// Apply environment overrides: secrets and `DATABASE_URL`.
    pub fn with_env(mut self) -> Result<Self> {
        self.secrets = Secrets::from_env()?;
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database_url = url;
        }
        Ok(self)
    }

    pub fn category(&self, key: &str) -> Result<&CategoryConfig> {
        self.categories
            .iter()
            .find(|c| c.key == key)
            .ok_or_else(|| Error::UnknownCategory(key.to_string()))
    }
}
