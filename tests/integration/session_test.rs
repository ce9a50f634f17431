//! Session store integration tests
//!
//! Login, registration, restore and logout against a mock server

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use teammatch::client::{
    ClientError, MemoryTokenStore, PersistedSession, SessionStore, TokenStore,
};
use teammatch::shared::{RegisterForm, Role, SharedError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

fn store(server: &MockServer, storage: Arc<MemoryTokenStore>) -> SessionStore {
    let (api, session) = test_api(server);
    SessionStore::new(api, storage, session)
}

#[tokio::test]
async fn test_login_establishes_and_persists_session() {
    let server = MockServer::start().await;
    let ana = TestUser::new("u1", "Ana");
    mount_login(&server, &ana).await;

    let storage = Arc::new(MemoryTokenStore::new());
    let sessions = store(&server, storage.clone());

    let user = sessions.login(ana.email(), &ana.password).await.unwrap();
    assert_eq!(user, ana.user);
    assert_eq!(sessions.session().token(), Some(ana.token.as_str()));
    assert_eq!(sessions.session().user(), Some(&ana.user));

    let persisted = storage.load().unwrap().unwrap();
    assert_eq!(persisted.token, ana.token);
}

#[tokio::test]
async fn test_requests_after_login_carry_bearer_token() {
    let server = MockServer::start().await;
    let ana = TestUser::new("u1", "Ana");
    mount_login(&server, &ana).await;
    Mock::given(method("GET"))
        .and(path("/api/messages"))
        .and(header("Authorization", "Bearer token-u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (api, session) = test_api(&server);
    let sessions = SessionStore::new(api.clone(), Arc::new(MemoryTokenStore::new()), session);
    sessions.login(ana.email(), &ana.password).await.unwrap();

    let messages: Vec<serde_json::Value> = api.get("/api/messages").await.unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_failed_login_reports_server_message_and_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Credenciales inválidas" })),
        )
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStore::new());
    let sessions = store(&server, storage.clone());

    let err = sessions.login("a@x.com", "wrong").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Credenciales inválidas");
    assert!(!sessions.session().is_authenticated());
    assert!(storage.load().unwrap().is_none());
}

#[tokio::test]
async fn test_failed_login_without_message_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sessions = store(&server, Arc::new(MemoryTokenStore::new()));
    let err = sessions.login("a@x.com", "pw").await.unwrap_err();
    assert_eq!(err.to_string(), "Error al iniciar sesión");
}

#[tokio::test]
async fn test_register_with_blank_field_sends_nothing() {
    let server = MockServer::start().await;
    let sessions = store(&server, Arc::new(MemoryTokenStore::new()));

    let form = RegisterForm {
        email: "a@x.com".into(),
        password: "pw".into(),
        name: "Ana".into(),
        role: Some(Role::Player),
        ..Default::default()
    };
    let err = sessions.register(&form).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Por favor completa todos los campos requeridos: address, latitude, longitude"
    );
    match err {
        ClientError::Validation(SharedError::MissingFields { fields }) => {
            assert_eq!(fields, vec!["address", "latitude", "longitude"]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(!sessions.session().is_authenticated());
}

#[tokio::test]
async fn test_register_logs_in() {
    let server = MockServer::start().await;
    let luis = TestUser::new("u2", "Luis");
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(luis.auth_body()))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = store(&server, Arc::new(MemoryTokenStore::new()));
    let mut form = RegisterForm {
        email: luis.email().to_string(),
        password: luis.password.clone(),
        name: "Luis".into(),
        role: Some(Role::Coach),
        ..Default::default()
    };
    form.set_address("Calle Mayor 1, Madrid", "40.41", "-3.70");

    let user = sessions.register(&form).await.unwrap();
    assert_eq!(user.id, "u2");
    assert_eq!(sessions.session().token(), Some("token-u2"));
}

#[tokio::test]
async fn test_register_failure_uses_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({})))
        .mount(&server)
        .await;

    let sessions = store(&server, Arc::new(MemoryTokenStore::new()));
    let mut form = RegisterForm {
        email: "a@x.com".into(),
        password: "pw".into(),
        name: "Ana".into(),
        role: Some(Role::Player),
        ..Default::default()
    };
    form.set_address("Madrid", "40.4", "-3.7");

    let err = sessions.register(&form).await.unwrap_err();
    assert_eq!(err.to_string(), "Error en el registro");
}

#[tokio::test]
async fn test_restore_session_with_valid_token() {
    let server = MockServer::start().await;
    let ana = TestUser::new("u1", "Ana");
    mount_me(&server, &ana).await;

    let storage = Arc::new(MemoryTokenStore::with_session(PersistedSession {
        token: ana.token.clone(),
        user: None,
    }));
    let sessions = store(&server, storage.clone());

    let restored = sessions.restore_session().await.unwrap();
    assert_eq!(restored, Some(ana.user.clone()));
    assert_eq!(sessions.session().token(), Some(ana.token.as_str()));
    assert_eq!(storage.load().unwrap().unwrap().user, Some(ana.user));
}

#[tokio::test]
async fn test_restore_with_rejected_token_clears_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "jwt expired" })))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStore::with_session(PersistedSession {
        token: "stale".into(),
        user: None,
    }));
    let sessions = store(&server, storage.clone());

    assert_eq!(sessions.restore_session().await.unwrap(), None);
    assert!(!sessions.session().is_authenticated());
    assert!(storage.load().unwrap().is_none());
}

#[tokio::test]
async fn test_restore_without_token_makes_no_request() {
    let server = MockServer::start().await;
    let sessions = store(&server, Arc::new(MemoryTokenStore::new()));

    assert_eq!(sessions.restore_session().await.unwrap(), None);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_logout_clears_session_and_storage() {
    let server = MockServer::start().await;
    let ana = TestUser::new("u1", "Ana");
    mount_login(&server, &ana).await;

    let storage = Arc::new(MemoryTokenStore::new());
    let sessions = store(&server, storage.clone());
    let mut changes = sessions.subscribe();

    sessions.login(ana.email(), &ana.password).await.unwrap();
    sessions.logout();

    assert!(!sessions.session().is_authenticated());
    assert!(sessions.session().token().is_none());
    assert!(storage.load().unwrap().is_none());
    changes.changed().await.unwrap();
    assert!(!changes.borrow().is_authenticated());
}

#[tokio::test]
async fn test_requests_after_logout_are_anonymous() {
    let server = MockServer::start().await;
    let ana = TestUser::new("u1", "Ana");
    mount_login(&server, &ana).await;
    Mock::given(method("GET"))
        .and(path("/api/teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (api, session) = test_api(&server);
    let sessions = SessionStore::new(api.clone(), Arc::new(MemoryTokenStore::new()), session);
    sessions.login(ana.email(), &ana.password).await.unwrap();
    sessions.logout();

    let _: Vec<serde_json::Value> = api.get("/api/teams").await.unwrap();
    let requests = server.received_requests().await.unwrap();
    let teams_request = requests
        .iter()
        .find(|r| r.url.path() == "/api/teams")
        .unwrap();
    assert!(teams_request.headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_rejected_session_token_expires_session() {
    let server = MockServer::start().await;
    let ana = TestUser::new("u1", "Ana");
    mount_login(&server, &ana).await;
    Mock::given(method("DELETE"))
        .and(path("/api/teams/t1"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "Token inválido" })))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStore::new());
    let (api, session) = test_api(&server);
    let sessions = SessionStore::new(api.clone(), storage.clone(), session);
    sessions.login(ana.email(), &ana.password).await.unwrap();
    let mut changes = sessions.subscribe();

    let err = api.delete("/api/teams/t1").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Token inválido");

    assert!(!sessions.session().is_authenticated());
    assert!(storage.load().unwrap().is_none());
    changes.changed().await.unwrap();
    assert!(!changes.borrow().is_authenticated());
}

#[tokio::test]
async fn test_failed_login_does_not_end_existing_session() {
    let server = MockServer::start().await;
    let ana = TestUser::new("u1", "Ana");
    mount_login(&server, &ana).await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_partial_json(json!({ "email": "intruso@example.com" })))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Credenciales inválidas" })))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStore::new());
    let sessions = store(&server, storage.clone());
    sessions.login(ana.email(), &ana.password).await.unwrap();

    let err = sessions.login("intruso@example.com", "nope").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(sessions.session().token(), Some(ana.token.as_str()));
    assert_eq!(storage.load().unwrap().unwrap().token, ana.token);
}

#[tokio::test]
async fn test_anonymous_rejection_leaves_storage_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/all"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStore::with_session(PersistedSession {
        token: "persisted".into(),
        user: None,
    }));
    let (api, session) = test_api(&server);
    let _sessions = SessionStore::new(api.clone(), storage.clone(), session);

    let err = api.get::<serde_json::Value>("/api/users/all").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(storage.load().unwrap().is_some());
}
