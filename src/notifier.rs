//! Delivery of summaries by email and as a linked thread of posts.
//!
//! Transports are trait objects so that dry-run only swaps where messages
//! go; segmentation and chaining run the same code either way.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::mailer::SmtpMailer;
use crate::twitter::TwitterClient;

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

#[async_trait]
pub trait PostTransport: Send + Sync {
    /// Publish `text`, replying to `in_reply_to` when given. Returns the post id.
    async fn post(&self, text: &str, in_reply_to: Option<&str>) -> Result<String>;
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        SmtpMailer::send(self, to, subject, body).await
    }
}

#[async_trait]
impl PostTransport for TwitterClient {
    async fn post(&self, text: &str, in_reply_to: Option<&str>) -> Result<String> {
        self.create_post(text, in_reply_to).await
    }
}

/// Prints intended actions instead of performing them.
#[derive(Default)]
pub struct ConsoleTransport {
    posts: AtomicUsize,
}

#[async_trait]
impl MailTransport for ConsoleTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        println!(
            "Local mode: Would send email to {} with subject '{}' and body:",
            to, subject
        );
        println!("{}", body);
        Ok(())
    }
}

#[async_trait]
impl PostTransport for ConsoleTransport {
    async fn post(&self, text: &str, _in_reply_to: Option<&str>) -> Result<String> {
        let n = self.posts.fetch_add(1, Ordering::SeqCst) + 1;
        println!("Tweet {}: {}", n, text);
        Ok(format!("local-{}", n))
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct EmailReport {
    pub sent: usize,
    pub failed: Vec<String>,
}

pub struct Notifier {
    mailer: Option<Box<dyn MailTransport>>,
    poster: Option<Box<dyn PostTransport>>,
}

impl Notifier {
    pub fn new(
        mailer: Option<Box<dyn MailTransport>>,
        poster: Option<Box<dyn PostTransport>>,
    ) -> Self {
        Self { mailer, poster }
    }

    /// Console transports for both paths.
    pub fn dry_run() -> Self {
        Self::new(
            Some(Box::new(ConsoleTransport::default())),
            Some(Box::new(ConsoleTransport::default())),
        )
    }

    /// Network transports for the requested paths only, so a run that
    /// does not post needs no social credentials and vice versa.
    pub fn from_config(config: &Config, email: bool, thread: bool, dry_run: bool) -> Result<Self> {
        if dry_run {
            return Ok(Self::dry_run());
        }

        let mailer: Option<Box<dyn MailTransport>> = if email {
            Some(Box::new(SmtpMailer::new(config)?))
        } else {
            None
        };
        let poster: Option<Box<dyn PostTransport>> = if thread {
            Some(Box::new(TwitterClient::new(config)?))
        } else {
            None
        };

        Ok(Self::new(mailer, poster))
    }

    /// Send `body` to each subscriber. A failed recipient is logged and
    /// skipped; the remaining recipients are still attempted.
    pub async fn send_emails(
        &self,
        subscribers: &[String],
        subject: &str,
        body: &str,
    ) -> Result<EmailReport> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| Error::Config("email delivery is not configured".to_string()))?;

        let mut report = EmailReport::default();
        for email in subscribers {
            match mailer.send(email, subject, body).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    error!("Failed to email {}: {}", email, e);
                    report.failed.push(email.clone());
                }
            }
        }

        info!(
            "Emailed {} subscribers ({} failed)",
            report.sent,
            report.failed.len()
        );
        Ok(report)
    }

    /// Post segments in order, each replying to the one before it.
    /// Returns the ids of the posts created.
    pub async fn post_thread(&self, segments: &[String]) -> Result<Vec<String>> {
        let poster = self
            .poster
            .as_ref()
            .ok_or_else(|| Error::Config("thread posting is not configured".to_string()))?;

        let mut ids: Vec<String> = Vec::with_capacity(segments.len());
        for segment in segments {
            let id = poster.post(segment, ids.last().map(String::as_str)).await?;
            ids.push(id);
        }

        info!("Posted thread of {} posts", ids.len());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingMailer {
        sent: Arc<Mutex<Vec<String>>>,
        reject: Option<String>,
    }

    #[async_trait]
    impl MailTransport for RecordingMailer {
        async fn send(&self, to: &str, _subject: &str, _body: &str) -> Result<()> {
            if self.reject.as_deref() == Some(to) {
                return Err(Error::Smtp {
                    recipient: to.to_string(),
                    reason: "mailbox unavailable".to_string(),
                });
            }
            self.sent.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct RecordingPoster {
        calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
        fail_at: Option<usize>,
    }

    #[async_trait]
    impl PostTransport for RecordingPoster {
        async fn post(&self, text: &str, in_reply_to: Option<&str>) -> Result<String> {
            let mut calls = self.calls.lock().unwrap();
            if self.fail_at == Some(calls.len()) {
                return Err(Error::SocialApi {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            calls.push((text.to_string(), in_reply_to.map(str::to_string)));
            Ok(format!("id-{}", calls.len()))
        }
    }

    fn subscribers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    mod email_tests {
        use super::*;

        #[tokio::test]
        async fn test_sends_to_every_subscriber() {
            let mailer = RecordingMailer::default();
            let notifier = Notifier::new(Some(Box::new(mailer.clone())), None);

            let report = notifier
                .send_emails(&subscribers(&["a@example.com", "b@example.com"]), "s", "b")
                .await
                .unwrap();

            assert_eq!(report.sent, 2);
            assert!(report.failed.is_empty());
            assert_eq!(
                *mailer.sent.lock().unwrap(),
                vec!["a@example.com", "b@example.com"]
            );
        }

        #[tokio::test]
        async fn test_failure_does_not_block_remaining() {
            let mailer = RecordingMailer {
                reject: Some("bad@example.com".to_string()),
                ..Default::default()
            };
            let notifier = Notifier::new(Some(Box::new(mailer.clone())), None);

            let report = notifier
                .send_emails(
                    &subscribers(&["a@example.com", "bad@example.com", "c@example.com"]),
                    "s",
                    "b",
                )
                .await
                .unwrap();

            assert_eq!(report.sent, 2);
            assert_eq!(report.failed, vec!["bad@example.com"]);
            assert_eq!(
                *mailer.sent.lock().unwrap(),
                vec!["a@example.com", "c@example.com"]
            );
        }

        #[tokio::test]
        async fn test_email_without_transport() {
            let notifier = Notifier::new(None, None);
            let result = notifier.send_emails(&subscribers(&["a@example.com"]), "s", "b").await;

            assert!(matches!(result, Err(Error::Config(_))));
        }
    }

    mod thread_tests {
        use super::*;

        #[tokio::test]
        async fn test_posts_are_chained() {
            let poster = RecordingPoster::default();
            let notifier = Notifier::new(None, Some(Box::new(poster.clone())));

            let ids = notifier
                .post_thread(&subscribers(&["one", "two", "three"]))
                .await
                .unwrap();

            assert_eq!(ids, vec!["id-1", "id-2", "id-3"]);
            let calls = poster.calls.lock().unwrap();
            assert_eq!(calls[0], ("one".to_string(), None));
            assert_eq!(calls[1], ("two".to_string(), Some("id-1".to_string())));
            assert_eq!(calls[2], ("three".to_string(), Some("id-2".to_string())));
        }

        #[tokio::test]
        async fn test_failure_aborts_thread() {
            let poster = RecordingPoster {
                fail_at: Some(1),
                ..Default::default()
            };
            let notifier = Notifier::new(None, Some(Box::new(poster.clone())));

            let result = notifier
                .post_thread(&subscribers(&["one", "two", "three"]))
                .await;

            assert!(matches!(result, Err(Error::SocialApi { status: 503, .. })));
            assert_eq!(poster.calls.lock().unwrap().len(), 1);
        }

        #[tokio::test]
        async fn test_empty_thread_posts_nothing() {
            let notifier = Notifier::new(None, Some(Box::new(RecordingPoster::default())));
            let ids = notifier.post_thread(&[]).await.unwrap();
            assert!(ids.is_empty());
        }
    }

    mod dry_run_tests {
        use super::*;

        #[tokio::test]
        async fn test_console_transport_chains_synthetic_ids() {
            let notifier = Notifier::dry_run();

            let ids = notifier
                .post_thread(&subscribers(&["first", "second"]))
                .await
                .unwrap();

            assert_eq!(ids, vec!["local-1", "local-2"]);
        }

        #[tokio::test]
        async fn test_console_email_reports_sent() {
            let notifier = Notifier::dry_run();

            let report = notifier
                .send_emails(&subscribers(&["a@example.com"]), "s", "body")
                .await
                .unwrap();

            assert_eq!(report.sent, 1);
        }

        #[test]
        fn test_dry_run_needs_no_credentials() {
            let result = Notifier::from_config(&Config::default(), true, true, true);
            assert!(result.is_ok());
        }

        #[test]
        fn test_live_email_needs_credentials() {
            let result = Notifier::from_config(&Config::default(), true, false, false);
            assert!(matches!(result, Err(Error::Config(_))));
        }

        #[test]
        fn test_no_paths_requested() {
            let result = Notifier::from_config(&Config::default(), false, false, false);
            assert!(result.is_ok());
        }
    }
}
