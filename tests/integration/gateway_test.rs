//! Gateway and REST service integration tests

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use teammatch::client::{
    ApiClient, ClientError, Config, MatchService, SessionHandle, TeamService, UserService,
    GENERIC_ERROR_MESSAGE,
};
use teammatch::shared::{AppConfig, MatchFilters, NewTeam, TeamFilters, ADMIN_EMAIL};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::*;

#[tokio::test]
async fn test_error_without_message_uses_generic_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/teams"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let err = api.get::<Vec<serde_json::Value>>("/api/teams").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), GENERIC_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_error_message_from_server_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/teams"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "Team name taken" })))
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let teams = TeamService::new(api);
    let err = teams.create(&NewTeam::default()).await.unwrap_err();
    assert_eq!(err, ClientError::Api { status: 400, message: Some("Team name taken".into()) });
}

#[tokio::test]
async fn test_forbidden_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/u9"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let err = UserService::new(api).delete("u9").await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Error deleting user");
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let config = Config::with_builder(
        AppConfig::builder()
            .api_url("http://127.0.0.1:9")
            .request_timeout_secs(2),
    )
    .unwrap();

    let api = ApiClient::new(config, SessionHandle::new()).unwrap();
    let err = api.get::<serde_json::Value>("/api/teams").await.unwrap_err();
    assert_matches!(err, ClientError::Network(_));
}

#[tokio::test]
async fn test_user_search_hides_admin_account() {
    let server = MockServer::start().await;
    let mut admin = user("admin", "Admin");
    admin.email = ADMIN_EMAIL.to_string();
    Mock::given(method("GET"))
        .and(path("/api/users/search"))
        .and(query_param("search", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([admin, user("u1", "Ana")])))
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let users = UserService::new(api).search("a").await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, "u1");
}

#[tokio::test]
async fn test_nearby_users_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/nearby"))
        .and(query_param("longitude", "-3.7"))
        .and(query_param("latitude", "40.4"))
        .and(query_param("maxDistance", "5000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user("u1", "Ana")])))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let users = UserService::new(api).nearby(-3.7, 40.4, 5000).await.unwrap();
    assert_eq!(users.len(), 1);
}

#[tokio::test]
async fn test_team_filter_omits_empty_criteria() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/teams/filter"))
        .and(query_param("sport", "tenis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let filters = TeamFilters {
        sport: "tenis".into(),
        ..Default::default()
    };
    TeamService::new(api).filter(&filters).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("sport=tenis"));
}

#[tokio::test]
async fn test_create_team_splits_player_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/teams"))
        .and(body_json(json!({
            "name": "Tigres",
            "sport": "fútbol",
            "category": "senior",
            "location": "Madrid",
            "description": "",
            "players": ["Ana", "Luis"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_id": "t1", "name": "Tigres", "sport": "fútbol", "category": "senior",
            "players": ["Ana", "Luis"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let team = NewTeam {
        name: "Tigres".into(),
        sport: "fútbol".into(),
        category: "senior".into(),
        location: "Madrid".into(),
        ..Default::default()
    }
    .with_player_names("Ana, Luis, ");
    let created = TeamService::new(api).create(&team).await.unwrap();
    assert_eq!(created.players, vec!["Ana", "Luis"]);
}

#[tokio::test]
async fn test_join_team_posts_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/teams/t1/join"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "t1", "name": "Tigres", "sport": "tenis", "category": "amateur", "players": ["u1"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let team = TeamService::new(api).join("t1").await.unwrap();
    assert!(team.has_player("u1"));
}

#[tokio::test]
async fn test_match_history_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/matches/history"))
        .and(query_param("date", "2024-05-01"))
        .and(query_param("competition", "liga"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "_id": "m1", "date": "2024-05-01T18:00:00.000Z", "competition": "liga", "result": "2-1" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let filters = MatchFilters {
        date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
        competition: "liga".into(),
    };
    let history = MatchService::new(api).history(&filters).await.unwrap();
    assert_eq!(history[0].result.as_deref(), Some("2-1"));
}

#[tokio::test]
async fn test_delete_match_fallback_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/matches/m1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (api, _) = test_api(&server);
    let err = MatchService::new(api).delete("m1").await.unwrap_err();
    assert_eq!(err.to_string(), "Error deleting match");
}
