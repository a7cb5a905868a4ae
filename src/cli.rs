use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::orchestrator::RunOptions;

/// Summarize recent news with a language model and deliver it by email or as a thread.
#[derive(Debug, Parser)]
#[command(name = "news-digest", version, about)]
pub struct Cli {
    /// Send the summary to every subscriber
    #[arg(long)]
    pub email: bool,

    /// Post the summary as a thread
    #[arg(long)]
    pub twitter: bool,

    /// Print intended emails and posts instead of sending them
    #[arg(long)]
    pub local: bool,

    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "news.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the subscription form
    Serve {
        /// Address to listen on, overrides the config file
        #[arg(long)]
        bind: Option<String>,
    },
    /// Create the subscriber table and import SUBSCRIBERS
    Migrate,
}

impl Cli {
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            email: self.email,
            twitter: self.twitter,
            local: self.local,
        }
    }
}
