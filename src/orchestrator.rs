use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::fetcher::{FetchOutcome, Fetcher};
use crate::notifier::{EmailReport, Notifier};
use crate::summarizer::{Summarizer, Summary};
use crate::thread::{format_entry, wrap_words, MAX_POST_CHARS};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub email: bool,
    pub twitter: bool,
    pub local: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    Summary(Summary),
    /// The search returned no articles
    NoRecentNews,
    /// Articles were found but the model kept none of them
    NoRelevantNews,
    /// The search or the completion failed
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub key: String,
    pub label: String,
    pub outcome: CategoryOutcome,
}

impl CategoryReport {
    fn body(&self) -> String {
        match &self.outcome {
            CategoryOutcome::Summary(summary) => summary.to_text(),
            CategoryOutcome::NoRecentNews => {
                format!("No recent news about {} was found.", self.key)
            }
            CategoryOutcome::NoRelevantNews => {
                format!("No relevant news about {} was found.", self.key)
            }
            CategoryOutcome::Failed(reason) => {
                format!("Unable to summarize news for {}: {}", self.key, reason)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub categories: Vec<CategoryReport>,
    pub delivered: bool,
    pub email: Option<EmailReport>,
    pub thread_ids: Vec<String>,
}

pub struct Orchestrator {
    config: Config,
    db: Arc<Database>,
    fetcher: Fetcher,
    summarizer: Summarizer,
    notifier: Notifier,
}

impl Orchestrator {
    pub fn new(config: Config, db: Arc<Database>, options: &RunOptions) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        let summarizer = Summarizer::new(&config)?;
        let notifier = Notifier::from_config(&config, options.email, options.twitter, options.local)?;
        Ok(Self::with_parts(config, db, fetcher, summarizer, notifier))
    }

    pub fn with_parts(
        config: Config,
        db: Arc<Database>,
        fetcher: Fetcher,
        summarizer: Summarizer,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            db,
            fetcher,
            summarizer,
            notifier,
        }
    }

    /// Fetch and summarize one category. Only an unknown category is an
    /// error; search and completion failures become [`CategoryOutcome::Failed`].
    pub async fn summarize_category(&self, key: &str) -> Result<CategoryOutcome> {
        let category = self.config.category(key)?;

        let articles = match self.fetcher.fetch(category).await {
            Ok(FetchOutcome::Articles(articles)) => articles,
            Ok(FetchOutcome::NoRecentNews) => return Ok(CategoryOutcome::NoRecentNews),
            Err(e) => {
                warn!("Fetching '{}' failed: {}", key, e);
                return Ok(CategoryOutcome::Failed(e.to_string()));
            }
        };

        match self.summarizer.summarize(category, &articles).await {
            Ok(summary) if summary.has_content() => Ok(CategoryOutcome::Summary(summary)),
            Ok(_) => Ok(CategoryOutcome::NoRelevantNews),
            Err(e) => {
                warn!("Summarizing '{}' failed: {}", key, e);
                Ok(CategoryOutcome::Failed(e.to_string()))
            }
        }
    }

    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let mut report = RunReport::default();

        for category in &self.config.categories {
            let outcome = self.summarize_category(&category.key).await?;
            let category_report = CategoryReport {
                key: category.key.clone(),
                label: category.label(),
                outcome,
            };

            println!("Summary of {} News:", category_report.label);
            println!("{}", category_report.body());
            println!("\n{}\n", "=".repeat(50));

            report.categories.push(category_report);
        }

        if !has_deliverable(&report.categories) {
            info!("No relevant news found for any category. Skipping emails and posts.");
            return Ok(report);
        }

        if options.email {
            let subscribers: Vec<String> = self
                .db
                .get_all_subscribers()
                .await?
                .into_iter()
                .map(|s| s.email)
                .collect();
            let body = combined_body(&report.categories);
            let email_report = self
                .notifier
                .send_emails(&subscribers, &self.config.email_subject, &body)
                .await?;
            info!("Subscriber emails processed");
            report.email = Some(email_report);
        }

        if options.twitter {
            let segments = thread_segments(&report.categories);
            report.thread_ids = self.notifier.post_thread(&segments).await?;
            info!("Thread processed");
        }

        report.delivered = options.email || options.twitter;
        Ok(report)
    }
}

/// Delivery happens only when at least one category produced a summary.
pub fn has_deliverable(categories: &[CategoryReport]) -> bool {
    categories
        .iter()
        .any(|c| matches!(c.outcome, CategoryOutcome::Summary(_)))
}

/// Email body: `"<Label> News:\n<summary>"` for each summarized category.
pub fn combined_body(categories: &[CategoryReport]) -> String {
    categories
        .iter()
        .filter_map(|c| match &c.outcome {
            CategoryOutcome::Summary(summary) => {
                Some(format!("{} News:\n{}", c.label, summary.to_text()))
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Posts for the thread. Digest summaries are word-wrapped per category;
/// thread entries become one post each with their article link.
pub fn thread_segments(categories: &[CategoryReport]) -> Vec<String> {
    let mut segments = Vec::new();

    for category in categories {
        match &category.outcome {
            CategoryOutcome::Summary(Summary::Digest(text)) => {
                let text = format!("{} News: {}", category.label, text);
                segments.extend(wrap_words(&text, MAX_POST_CHARS));
            }
            CategoryOutcome::Summary(Summary::Thread(entries)) => {
                segments.extend(
                    entries
                        .iter()
                        .map(|e| format_entry(&e.text, &e.article.url, MAX_POST_CHARS)),
                );
            }
            _ => {}
        }
    }

    segments
}
