use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::error::DatabaseError;
use sqlx::{AnyPool, FromRow};
use tracing::{debug, info};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Subscriber {
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Subscribed,
    AlreadySubscribed,
}

pub struct Database {
    pool: AnyPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        install_default_drivers();

        let url = with_tls_convention(database_url);
        // Every connection to `:memory:` is a separate database
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS subscribers (email TEXT UNIQUE)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a subscriber inside its own transaction.
    ///
    /// A unique-constraint violation rolls the transaction back and is
    /// reported as [`SubscribeOutcome::AlreadySubscribed`] rather than an error.
    pub async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("INSERT INTO subscribers (email) VALUES ($1)")
            .bind(email)
            .execute(&mut *tx)
            .await;

        match result {
            Ok(_) => {
                tx.commit().await?;
                info!("New subscriber: {}", email);
                Ok(SubscribeOutcome::Subscribed)
            }
            Err(sqlx::Error::Database(err)) if is_unique_violation(&*err) => {
                tx.rollback().await?;
                debug!("Duplicate subscription attempt: {}", email);
                Ok(SubscribeOutcome::AlreadySubscribed)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Insert each address unless it is already present. Returns the number added.
    pub async fn seed_subscribers(&self, emails: &[String]) -> Result<u64> {
        let mut added = 0;
        for email in emails {
            let email = email.trim();
            if email.is_empty() {
                continue;
            }
            let result = sqlx::query(
                "INSERT INTO subscribers (email) VALUES ($1) ON CONFLICT (email) DO NOTHING",
            )
            .bind(email)
            .execute(&self.pool)
            .await?;
            added += result.rows_affected();
        }
        Ok(added)
    }

    pub async fn get_all_subscribers(&self) -> Result<Vec<Subscriber>> {
        let subscribers =
            sqlx::query_as::<_, Subscriber>("SELECT email FROM subscribers ORDER BY email")
                .fetch_all(&self.pool)
                .await?;
        Ok(subscribers)
    }

    pub async fn get_subscriber_count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}

/// SQLite `SQLITE_CONSTRAINT_UNIQUE` and Postgres `unique_violation` codes.
const UNIQUE_VIOLATION_CODES: [&str; 2] = ["2067", "23505"];

fn is_unique_violation(err: &dyn DatabaseError) -> bool {
    err.is_unique_violation()
        || err
            .code()
            .map(|code| UNIQUE_VIOLATION_CODES.contains(&&*code))
            .unwrap_or(false)
}

/// Local and SQLite URLs are used as-is; any other network database gets
/// `sslmode=require` unless the URL already names an `sslmode`.
pub fn with_tls_convention(database_url: &str) -> String {
    if database_url.starts_with("sqlite:") {
        return database_url.to_string();
    }

    let parsed = match reqwest::Url::parse(database_url) {
        Ok(url) => url,
        Err(_) => return database_url.to_string(),
    };

    let is_local = matches!(
        parsed.host_str(),
        None | Some("localhost") | Some("127.0.0.1") | Some("[::1]")
    );
    let has_sslmode = parsed.query_pairs().any(|(key, _)| key == "sslmode");

    if is_local || has_sslmode {
        return database_url.to_string();
    }

    let separator = if parsed.query().is_some() { '&' } else { '?' };
    format!("{}{}sslmode=require", database_url, separator)
}
