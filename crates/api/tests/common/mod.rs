//! Shared fixtures for HTTP integration tests.
//!
//! The router runs over an in-memory store, a manual clock and the mock
//! email transport, so no database or SMTP server is needed.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use clubhouse_api::{
    app::{create_app, AppState, Stores},
    config::{Config, EmailConfig},
    services::EmailService,
};
use domain::models::ClubRole;
use fake::{faker::internet::en::SafeEmail, Fake};
use domain::repositories::{InMemoryStore, MailError, Mailer, ManualClock, OutgoingEmail, SentEmail};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<EmailService>,
}

/// A signed-in test user.
pub struct TestUser {
    pub user_id: Uuid,
    pub email: String,
    /// `session=<token>` ready for the Cookie header.
    pub cookie: String,
}

/// Mailer whose every delivery fails.
pub struct BrokenMailer;

#[async_trait]
impl Mailer for BrokenMailer {
    async fn send(&self, _email: OutgoingEmail) -> Result<SentEmail, MailError> {
        Err(MailError::DeliveryFailed("relay refused connection".to_string()))
    }
}

/// A random, well-formed email address.
pub fn fake_email() -> String {
    SafeEmail().fake()
}

pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    Config::load_for_test(overrides).expect("test config should load")
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(&[]))
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mailer = Arc::new(EmailService::new(&EmailConfig::default()).expect("mock mailer"));

        let state = AppState::new(
            config,
            Stores::in_memory(store.clone()),
            mailer.clone(),
            clock.clone(),
        );

        Self {
            router: create_app(state),
            store,
            clock,
            mailer,
        }
    }

    /// App whose mailer always fails.
    pub fn with_broken_mailer() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mailer = Arc::new(EmailService::new(&EmailConfig::default()).expect("mock mailer"));

        let state = AppState::new(
            test_config(&[]),
            Stores::in_memory(store.clone()),
            Arc::new(BrokenMailer),
            clock.clone(),
        );

        Self {
            router: create_app(state),
            store,
            clock,
            mailer,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Requests a magic link and returns the token from the delivered email.
    pub async fn request_magic_link(&self, email: &str) -> String {
        let response = self
            .send(json_request(
                Method::POST,
                "/api/v1/auth/magic-link",
                None,
                serde_json::json!({ "email": email }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let message = self
            .mailer
            .sent_messages()
            .pop()
            .expect("a magic link email should have been sent");
        extract_token(&message.html_body, "token=")
    }

    /// Full sign-in: magic link, verification, session cookie.
    pub async fn sign_in(&self, email: &str) -> TestUser {
        let token = self.request_magic_link(email).await;
        let response = self
            .send(get_request(&format!("/auth/verify?token={}", token), None))
            .await;
        assert_eq!(location(&response), "/dashboard");

        let cookie = session_cookie(&response).expect("verify should set a session cookie");
        let me = body_json(self.send(get_request("/api/v1/auth/me", Some(&cookie))).await).await;

        TestUser {
            user_id: me["user"]["id"]
                .as_str()
                .and_then(|id| id.parse().ok())
                .expect("user id"),
            email: me["user"]["email"].as_str().expect("user email").to_string(),
            cookie,
        }
    }

    /// Creates a club through the API and returns its id.
    pub async fn create_club(&self, owner: &TestUser, name: &str) -> Uuid {
        let response = self
            .send(json_request(
                Method::POST,
                "/api/v1/clubs",
                Some(&owner.cookie),
                serde_json::json!({ "name": name }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        body["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("club id")
    }

    pub fn add_member(&self, user: &TestUser, club_id: Uuid, role: ClubRole) {
        self.store
            .add_member(user.user_id, club_id, role, Utc::now())
            .expect("membership upsert");
    }
}

pub fn json_request(method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    empty_request(Method::GET, uri, cookie)
}

pub fn empty_request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `session=<token>` from the Set-Cookie header, if it sets a non-empty session.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with("session=") && pair.len() > "session=".len())
        .map(str::to_string)
}

/// Token following `marker` in a rendered email or URL.
pub fn extract_token(text: &str, marker: &str) -> String {
    let start = text.find(marker).expect("marker present") + marker.len();
    text[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect()
}
