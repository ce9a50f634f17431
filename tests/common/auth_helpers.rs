//! Authentication test helpers
//!
//! Users, tokens and chat messages shaped the way the server sends them,
//! plus mounts for the auth endpoints.

use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use teammatch::shared::{ChatMessage, MessageSender, Role, User};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Test user credentials
pub struct TestUser {
    pub user: User,
    pub password: String,
    pub token: String,
}

impl TestUser {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            user: user(id, name),
            password: "password123".to_string(),
            token: format!("token-{}", id),
        }
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    /// Login/register response body
    pub fn auth_body(&self) -> Value {
        auth_body(&self.user, &self.token)
    }
}

pub fn user(id: &str, name: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        last_name: None,
        email: format!("{}@example.com", id),
        role: Role::Player,
        address: None,
        age: None,
        location: None,
    }
}

pub fn auth_body(user: &User, token: &str) -> Value {
    let mut body = serde_json::to_value(user).unwrap();
    body["token"] = json!(token);
    body
}

/// `POST /api/auth/login` succeeding for this user's email
pub async fn mount_login(server: &MockServer, test_user: &TestUser) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_partial_json(json!({ "email": test_user.email() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_user.auth_body()))
        .mount(server)
        .await;
}

/// `GET /api/auth/me` accepting this user's token
pub async fn mount_me(server: &MockServer, test_user: &TestUser) {
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("Authorization", format!("Bearer {}", test_user.token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&test_user.user))
        .mount(server)
        .await;
}

/// Answers every login with a fresh token: `token-1`, `token-2`, ...
pub struct TokenSequence {
    user: User,
    issued: AtomicUsize,
}

impl TokenSequence {
    pub fn new(user: User) -> Self {
        Self {
            user,
            issued: AtomicUsize::new(0),
        }
    }
}

impl Respond for TokenSequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        ResponseTemplate::new(200).set_body_json(auth_body(&self.user, &format!("token-{}", n)))
    }
}

/// A message created `secs` seconds after a fixed epoch
pub fn chat_message(id: &str, sender: &User, recipient: Option<&str>, secs: i64) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        sender: MessageSender {
            id: sender.id.clone(),
            name: sender.name.clone(),
        },
        content: format!("message {}", id),
        created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        recipient: recipient.map(str::to_string),
    }
}

pub fn random_message(sender: &User, recipient: Option<&str>, secs: i64) -> ChatMessage {
    chat_message(&Uuid::new_v4().to_string(), sender, recipient, secs)
}

pub fn message_json(message: &ChatMessage) -> Value {
    serde_json::to_value(message).unwrap()
}
