//! X (Twitter) API v2 client with OAuth 1.0a user-context signing.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use tracing::{debug, info};

use crate::config::{Config, Secrets};
use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl OAuthCredentials {
    pub fn from_secrets(secrets: &Secrets) -> Result<Self> {
        Ok(Self {
            consumer_key: Secrets::require(&secrets.twitter_api_key, "TWITTER_API_KEY")?
                .to_string(),
            consumer_secret: Secrets::require(&secrets.twitter_api_secret, "TWITTER_API_SECRET")?
                .to_string(),
            token: Secrets::require(&secrets.twitter_access_token, "TWITTER_ACCESS_TOKEN")?
                .to_string(),
            token_secret: Secrets::require(
                &secrets.twitter_access_token_secret,
                "TWITTER_ACCESS_TOKEN_SECRET",
            )?
            .to_string(),
        })
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// RFC 5849 signature base string. `params` holds every oauth and request
/// parameter that takes part in the signature, unencoded.
pub fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> =
        params.iter().map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&param_string)
    )
}

pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> Result<String> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Config(format!("invalid signing key: {}", e)))?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// `Authorization` header value for a request whose body is not
/// form-encoded, so only the oauth parameters are signed.
pub fn authorization_header(
    credentials: &OAuthCredentials,
    method: &str,
    url: &str,
    nonce: &str,
    timestamp: i64,
) -> Result<String> {
    let timestamp = timestamp.to_string();
    let mut params = vec![
        ("oauth_consumer_key", credentials.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_token", credentials.token.as_str()),
        ("oauth_version", "1.0"),
    ];

    let base = signature_base_string(method, url, &params);
    let signature = sign(&base, &credentials.consumer_secret, &credentials.token_secret)?;
    params.push(("oauth_signature", signature.as_str()));
    params.sort();

    let fields = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {}", fields))
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[derive(Serialize)]
struct CreatePost<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<Reply<'a>>,
}

#[derive(Serialize)]
struct Reply<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Deserialize)]
struct CreatePostResponse {
    data: PostData,
}

#[derive(Deserialize)]
struct PostData {
    id: String,
}

pub struct TwitterClient {
    client: Client,
    base_url: String,
    credentials: OAuthCredentials,
}

impl TwitterClient {
    pub fn new(config: &Config) -> Result<Self> {
        let credentials = OAuthCredentials::from_secrets(&config.secrets)?;
        Self::with_parts(&config.twitter_base_url, credentials)
    }

    pub fn with_parts(base_url: &str, credentials: OAuthCredentials) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Publish a post, optionally as a reply. Returns the new post's id.
    pub async fn create_post(&self, text: &str, in_reply_to: Option<&str>) -> Result<String> {
        let url = format!("{}/2/tweets", self.base_url);
        let header = authorization_header(
            &self.credentials,
            "POST",
            &url,
            &nonce(),
            chrono::Utc::now().timestamp(),
        )?;

        let body = CreatePost {
            text,
            reply: in_reply_to.map(|id| Reply {
                in_reply_to_tweet_id: id,
            }),
        };

        debug!("Posting {} characters (reply to {:?})", text.chars().count(), in_reply_to);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, header)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SocialApi {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatePostResponse = response.json().await?;
        info!("Published post {}", created.data.id);
        Ok(created.data.id)
    }
}
