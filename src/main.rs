use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_digest::cli::{Cli, Command};
use news_digest::config::Config;
use news_digest::db::Database;
use news_digest::orchestrator::Orchestrator;
use news_digest::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_digest=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let options = cli.run_options();

    // Load configuration
    let config = Config::load_or_default(&cli.config)?.with_env()?;
    info!(
        "Loaded {} categories from configuration ({:?} mode)",
        config.categories.len(),
        config.mode
    );

    // Initialize database
    let db = Database::new(&config.database_url).await?;
    db.initialize().await?;
    let imported = db.seed_subscribers(&config.secrets.subscribers).await?;
    if imported > 0 {
        info!("Imported {} subscribers from SUBSCRIBERS", imported);
    }
    info!("Database initialized");

    let db = Arc::new(db);

    match cli.command {
        Some(Command::Serve { bind }) => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let state = Arc::new(AppState {
                db,
                title: config.title.clone(),
            });
            let app = routes::app(state);

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Server starting on http://{}", bind);

            axum::serve(listener, app).await?;
        }
        Some(Command::Migrate) => {
            info!("{} subscribers stored", db.get_subscriber_count().await?);
        }
        None => {
            let orchestrator = Orchestrator::new(config, db, &options)?;
            let report = orchestrator.run(&options).await?;

            if let Some(email) = &report.email {
                info!("Emails sent: {}, failed: {}", email.sent, email.failed.len());
            }
            if !report.thread_ids.is_empty() {
                info!("Thread posted with {} posts", report.thread_ids.len());
            }
            if !report.delivered {
                info!("Nothing delivered");
            }
        }
    }

    Ok(())
}
