use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::db::{Database, SubscribeOutcome};

pub const SUBSCRIBED_MESSAGE: &str = "Subscribed successfully!";
pub const ALREADY_SUBSCRIBED_MESSAGE: &str = "You are already subscribed.";
pub const EMPTY_EMAIL_MESSAGE: &str = "Please enter an email address.";

pub struct AppState {
    pub db: Arc<Database>,
    pub title: String,
}

#[derive(Template)]
#[template(path = "subscribe.html")]
pub struct SubscribeTemplate {
    pub title: String,
    pub message: Option<String>,
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

// Custom error type
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {}", self.0),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        AppError(err.into())
    }
}

#[derive(Deserialize)]
pub struct SubscribeForm {
    pub email: String,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(subscribe_page).post(subscribe))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn page(state: &AppState, message: Option<&str>) -> HtmlTemplate<SubscribeTemplate> {
    HtmlTemplate(SubscribeTemplate {
        title: state.title.clone(),
        message: message.map(str::to_string),
    })
}

// Route handlers
pub async fn subscribe_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    page(&state, None)
}

pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubscribeForm>,
) -> Result<impl IntoResponse, AppError> {
    let email = form.email.trim();
    if email.is_empty() {
        return Ok(page(&state, Some(EMPTY_EMAIL_MESSAGE)));
    }

    let message = match state.db.subscribe(email).await? {
        SubscribeOutcome::Subscribed => SUBSCRIBED_MESSAGE,
        SubscribeOutcome::AlreadySubscribed => ALREADY_SUBSCRIBED_MESSAGE,
    };

    Ok(page(&state, Some(message)))
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn create_test_app() -> (Router, Arc<Database>) {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.initialize().await.unwrap();
        let db = Arc::new(db);

        let state = Arc::new(AppState {
            db: db.clone(),
            title: "Warriors News".to_string(),
        });

        (app(state), db)
    }

    fn post_form(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    mod health_tests {
        use super::*;

        #[tokio::test]
        async fn test_health_endpoint() {
            let (app, _db) = create_test_app().await;

            let response = app
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"OK");
        }
    }

    mod page_tests {
        use super::*;

        #[tokio::test]
        async fn test_get_renders_form() {
            let (app, _db) = create_test_app().await;

            let response = app
                .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);

            let body = body_string(response).await;
            assert!(body.contains("<form method=\"POST\">"));
            assert!(body.contains("name=\"email\" required"));
            assert!(body.contains("Subscribe to Warriors News"));
            assert!(!body.contains("<p>"));
        }
    }

    mod subscribe_tests {
        use super::*;

        #[tokio::test]
        async fn test_subscribe_success() {
            let (app, db) = create_test_app().await;

            let response = app
                .oneshot(post_form("email=a%40example.com"))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert!(body_string(response).await.contains(SUBSCRIBED_MESSAGE));

            let subscribers = db.get_all_subscribers().await.unwrap();
            assert_eq!(subscribers.len(), 1);
            assert_eq!(subscribers[0].email, "a@example.com");
        }

        #[tokio::test]
        async fn test_duplicate_subscription_returns_ok() {
            let (app, db) = create_test_app().await;

            let first = app
                .clone()
                .oneshot(post_form("email=a%40example.com"))
                .await
                .unwrap();
            assert!(body_string(first).await.contains(SUBSCRIBED_MESSAGE));

            let second = app
                .oneshot(post_form("email=a%40example.com"))
                .await
                .unwrap();

            assert_eq!(second.status(), StatusCode::OK);
            assert!(body_string(second).await.contains(ALREADY_SUBSCRIBED_MESSAGE));
            assert_eq!(db.get_subscriber_count().await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_email_is_trimmed() {
            let (app, db) = create_test_app().await;

            app.oneshot(post_form("email=+b%40example.com+"))
                .await
                .unwrap();

            let subscribers = db.get_all_subscribers().await.unwrap();
            assert_eq!(subscribers[0].email, "b@example.com");
        }

        #[tokio::test]
        async fn test_blank_email_not_stored() {
            let (app, db) = create_test_app().await;

            let response = app.oneshot(post_form("email=+++")).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            assert!(body_string(response).await.contains(EMPTY_EMAIL_MESSAGE));
            assert_eq!(db.get_subscriber_count().await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_missing_field_rejected() {
            let (app, db) = create_test_app().await;

            let response = app.oneshot(post_form("name=bob")).await.unwrap();

            assert!(response.status().is_client_error());
            assert_eq!(db.get_subscriber_count().await.unwrap(), 0);
        }
    }

    mod form_tests {
        use super::*;

        #[test]
        fn test_form_decodes_email() {
            let form: SubscribeForm = serde_urlencoded::from_str("email=a%40example.com").unwrap();
            assert_eq!(form.email, "a@example.com");
        }

        #[test]
        fn test_form_requires_email() {
            let result: Result<SubscribeForm, _> = serde_urlencoded::from_str("");
            assert!(result.is_err());
        }
    }
}
