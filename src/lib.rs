//! News Digest - topic news summaries delivered by email and thread
//!
//! This crate searches recent news for configured topics, summarizes the
//! articles with a language model, and delivers the result to subscribers
//! by email and/or as a chained social-media thread. A small web form
//! collects subscriber addresses.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod mailer;
pub mod notifier;
pub mod orchestrator;
pub mod routes;
pub mod summarizer;
pub mod thread;
pub mod twitter;

pub use error::{Error, Result};
