/**
 * REST Services
 *
 * Typed wrappers over the gateway for users, teams and matches, plus the
 * address geocoder used by the sign-up form. Each failing call falls back to
 * an operation-specific message when the server does not send one.
 */
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::ClientError;
use super::gateway::ApiClient;
use super::search::Lookup;
use crate::shared::{MatchFilters, NewTeam, RegisterForm, SportMatch, Team, TeamFilters, User, UserUpdate};

/// Users, without the hidden admin account
#[derive(Debug, Clone)]
pub struct UserService {
    api: ApiClient,
}

impl UserService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Search by name; an empty query lists everyone
    pub async fn search(&self, query: &str) -> Result<Vec<User>, ClientError> {
        let users: Vec<User> = self
            .api
            .get_query("/api/users/search", &[("search", query)])
            .await
            .map_err(|e| e.or_message("Error searching users"))?;
        Ok(visible(users))
    }

    pub async fn all(&self) -> Result<Vec<User>, ClientError> {
        let users: Vec<User> = self
            .api
            .get("/api/users/all")
            .await
            .map_err(|e| e.or_message("Error getting all users"))?;
        Ok(visible(users))
    }

    /// Users within `max_distance` meters of a point
    pub async fn nearby(&self, longitude: f64, latitude: f64, max_distance: u32) -> Result<Vec<User>, ClientError> {
        let query = [
            ("longitude", longitude.to_string()),
            ("latitude", latitude.to_string()),
            ("maxDistance", max_distance.to_string()),
        ];
        let users: Vec<User> = self
            .api
            .get_query("/api/users/nearby", &query)
            .await
            .map_err(|e| e.or_message("Error getting nearby users"))?;
        Ok(visible(users))
    }

    pub async fn create(&self, form: &RegisterForm) -> Result<User, ClientError> {
        form.validate()?;
        self.api
            .post("/api/users", form)
            .await
            .map_err(|e| e.or_message("Error creating user"))
    }

    pub async fn update(&self, user_id: &str, update: &UserUpdate) -> Result<User, ClientError> {
        self.api
            .put(&format!("/api/users/{}", user_id), update)
            .await
            .map_err(|e| e.or_message("Error updating user"))
    }

    pub async fn delete(&self, user_id: &str) -> Result<(), ClientError> {
        self.api
            .delete(&format!("/api/users/{}", user_id))
            .await
            .map_err(|e| e.or_message("Error deleting user"))
    }
}

#[async_trait]
impl Lookup for UserService {
    type Output = Vec<User>;

    async fn lookup(&self, query: &str) -> Result<Vec<User>, ClientError> {
        self.search(query).await
    }
}

fn visible(users: Vec<User>) -> Vec<User> {
    users.into_iter().filter(|u| !u.is_hidden_admin()).collect()
}

#[derive(Debug, Clone)]
pub struct TeamService {
    api: ApiClient,
}

impl TeamService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<Team>, ClientError> {
        self.api
            .get("/api/teams")
            .await
            .map_err(|e| e.or_message("Error fetching teams"))
    }

    /// Server-side filter; empty criteria are not sent
    pub async fn filter(&self, filters: &TeamFilters) -> Result<Vec<Team>, ClientError> {
        self.api
            .get_query("/api/teams/filter", &filters.query_pairs())
            .await
            .map_err(|e| e.or_message("Error filtering teams"))
    }

    pub async fn create(&self, team: &NewTeam) -> Result<Team, ClientError> {
        self.api
            .post("/api/teams", team)
            .await
            .map_err(|e| e.or_message("Error creating team"))
    }

    pub async fn update(&self, team_id: &str, team: &NewTeam) -> Result<Team, ClientError> {
        self.api
            .put(&format!("/api/teams/{}", team_id), team)
            .await
            .map_err(|e| e.or_message("Error updating team"))
    }

    pub async fn delete(&self, team_id: &str) -> Result<(), ClientError> {
        self.api
            .delete(&format!("/api/teams/{}", team_id))
            .await
            .map_err(|e| e.or_message("Error deleting team"))
    }

    /// Join as the current user
    pub async fn join(&self, team_id: &str) -> Result<Team, ClientError> {
        self.api
            .post_empty(&format!("/api/teams/{}/join", team_id))
            .await
            .map_err(|e| e.or_message("Error joining team"))
    }
}

#[derive(Debug, Clone)]
pub struct MatchService {
    api: ApiClient,
}

impl MatchService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Upcoming matches
    pub async fn list(&self, filters: &MatchFilters) -> Result<Vec<SportMatch>, ClientError> {
        self.api
            .get_query("/api/matches", &filters.query_pairs())
            .await
            .map_err(|e| e.or_message("Error fetching matches"))
    }

    /// Played matches
    pub async fn history(&self, filters: &MatchFilters) -> Result<Vec<SportMatch>, ClientError> {
        self.api
            .get_query("/api/matches/history", &filters.query_pairs())
            .await
            .map_err(|e| e.or_message("Error fetching match history"))
    }

    pub async fn create(&self, sport_match: &SportMatch) -> Result<SportMatch, ClientError> {
        self.api
            .post("/api/matches", sport_match)
            .await
            .map_err(|e| e.or_message("Error creating match"))
    }

    pub async fn update(&self, match_id: &str, sport_match: &SportMatch) -> Result<SportMatch, ClientError> {
        self.api
            .put(&format!("/api/matches/{}", match_id), sport_match)
            .await
            .map_err(|e| e.or_message("Error updating match"))
    }

    pub async fn delete(&self, match_id: &str) -> Result<(), ClientError> {
        self.api
            .delete(&format!("/api/matches/{}", match_id))
            .await
            .map_err(|e| e.or_message("Error deleting match"))
    }
}

/// Public Nominatim instance
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Queries this short are not worth a request
const MIN_ADDRESS_QUERY_LEN: usize = 3;

/// One address candidate; coordinates are kept as the strings Nominatim sends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSuggestion {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
}

/// Address autocompletion for the sign-up form.
///
/// Talks to a third-party service, so it bypasses the gateway and never
/// sends the session token.
#[derive(Debug, Clone)]
pub struct Geocoder {
    base_url: String,
    client: Client,
}

impl Geocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("teammatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn nominatim(timeout: Duration) -> Result<Self, ClientError> {
        Self::new(NOMINATIM_URL, timeout)
    }

    pub async fn search(&self, address: &str) -> Result<Vec<AddressSuggestion>, ClientError> {
        let address = address.trim();
        if address.chars().count() <= MIN_ADDRESS_QUERY_LEN {
            return Ok(Vec::new());
        }

        tracing::debug!(address, "geocoding");
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", address)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), None)
                .or_message("Error fetching address suggestions"));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Lookup for Geocoder {
    type Output = Vec<AddressSuggestion>;

    async fn lookup(&self, query: &str) -> Result<Vec<AddressSuggestion>, ClientError> {
        self.search(query).await
    }
}
