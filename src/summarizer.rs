//! Language-model summaries of fetched articles.
//!
//! Digest mode asks for one paragraph per category. Thread mode asks for a
//! JSON list of short statements, each tagged with the index of the article
//! it describes, so that statements can be paired with their source links.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{CategoryConfig, Config, Mode, Secrets};
use crate::error::{Error, Result};
use crate::fetcher::Article;

const THREAD_INSTRUCTIONS: &str = "Write one short statement (at most 200 characters) for each \
relevant article. Do not use numbering, bullet points, hashtags or @mentions. Respond with JSON \
only, in the form {\"entries\": [{\"article\": <article index>, \"text\": \"<statement>\"}]}. \
Skip articles that are not relevant. If none are relevant, respond with {\"entries\": []}.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadEntry {
    pub text: String,
    pub article: Article,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Summary {
    Digest(String),
    Thread(Vec<ThreadEntry>),
}

impl Summary {
    pub fn has_content(&self) -> bool {
        match self {
            Summary::Digest(text) => !text.trim().is_empty(),
            Summary::Thread(entries) => !entries.is_empty(),
        }
    }

    /// Plain-text rendering used for console output and email bodies.
    pub fn to_text(&self) -> String {
        match self {
            Summary::Digest(text) => text.clone(),
            Summary::Thread(entries) => entries
                .iter()
                .map(|e| format!("- {} ({})", e.text, e.article.url))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ThreadResponse {
    entries: Vec<TaggedEntry>,
}

#[derive(Deserialize)]
struct TaggedEntry {
    article: usize,
    text: String,
}

pub struct Summarizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    mode: Mode,
}

impl Summarizer {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = Secrets::require(&config.secrets.openai_api_key, "OPENAI_API_KEY")?;
        Self::with_parts(&config.llm_base_url, api_key, &config.model, config.mode)
    }

    pub fn with_parts(base_url: &str, api_key: &str, model: &str, mode: Mode) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            mode,
        })
    }

    pub async fn summarize(
        &self,
        category: &CategoryConfig,
        articles: &[Article],
    ) -> Result<Summary> {
        info!(
            "Summarizing {} articles for '{}' ({:?} mode)",
            articles.len(),
            category.key,
            self.mode
        );

        match self.mode {
            Mode::Digest => {
                let prompt = digest_prompt(&category.key, articles);
                let text = self.complete(&category.system_prompt, &prompt).await?;
                Ok(Summary::Digest(text))
            }
            Mode::Thread => {
                let system = format!("{}\n\n{}", category.system_prompt, THREAD_INSTRUCTIONS);
                let prompt = thread_prompt(&category.key, articles);
                let text = self.complete(&system, &prompt).await?;
                Ok(Summary::Thread(parse_thread_response(&text, articles)))
            }
        }
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or(Error::EmptyCompletion)
    }
}

fn articles_text(articles: &[Article]) -> String {
    articles
        .iter()
        .map(Article::prompt_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn digest_prompt(topic: &str, articles: &[Article]) -> String {
    format!(
        "Here are several news articles about {}. Please provide a concise summary of the main \
         news points, mentioning any significant developments or updates. Include relevant links \
         where appropriate. If the articles are not relevant, state that no relevant news was \
         found:\n\n{}",
        topic,
        articles_text(articles)
    )
}

pub fn thread_prompt(topic: &str, articles: &[Article]) -> String {
    let indexed = articles
        .iter()
        .enumerate()
        .map(|(i, a)| format!("Article {}:\n{}", i, a.prompt_text()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Here are several news articles about {}:\n\n{}", topic, indexed)
}

/// Pair generated statements with their articles.
///
/// Structured responses are matched by article index. Anything that does not
/// parse as the structured form falls back to zipping non-empty lines with
/// the articles in order, which truncates to the shorter of the two.
pub fn parse_thread_response(text: &str, articles: &[Article]) -> Vec<ThreadEntry> {
    let cleaned = strip_code_fence(text);

    match serde_json::from_str::<ThreadResponse>(&cleaned) {
        Ok(response) => response
            .entries
            .into_iter()
            .filter_map(|entry| {
                let text = entry.text.trim();
                if text.is_empty() || is_no_relevant_fallback(text) {
                    return None;
                }
                match articles.get(entry.article) {
                    Some(article) => Some(ThreadEntry {
                        text: text.to_string(),
                        article: article.clone(),
                    }),
                    None => {
                        warn!("Dropping entry for unknown article index {}", entry.article);
                        None
                    }
                }
            })
            .collect(),
        Err(_) => {
            warn!("Thread response was not structured, pairing lines by position");
            zip_lines(text, articles)
        }
    }
}

fn zip_lines(text: &str, articles: &[Article]) -> Vec<ThreadEntry> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_no_relevant_fallback(line))
        .zip(articles)
        .map(|(line, article)| ThreadEntry {
            text: line.to_string(),
            article: article.clone(),
        })
        .collect()
}

fn is_no_relevant_fallback(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("no relevant") || lower.starts_with("no recent news")
}

/// Strip markdown code block wrappers from a JSON response
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim().to_string();
        }
    }

    trimmed.to_string()
}
