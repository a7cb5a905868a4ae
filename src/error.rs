use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unable to fetch news for {category}: status code {status}")]
    NewsApi { category: String, status: u16 },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion request failed with status {status}: {body}")]
    Llm { status: u16, body: String },

    #[error("completion response contained no choices")]
    EmptyCompletion,

    #[error("failed to send email to {recipient}: {reason}")]
    Smtp { recipient: String, reason: String },

    #[error("post rejected with status {status}: {body}")]
    SocialApi { status: u16, body: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
