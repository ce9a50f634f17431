//! Team Data Structures
//!
//! Teams as listed by `/api/teams`, the create form, and the filters the
//! team table applies locally.

use serde::{Deserialize, Serialize};

/// Sports offered by the service
pub const SPORTS: [&str; 4] = ["fútbol", "baloncesto", "voleibol", "tenis"];
/// Team categories
pub const CATEGORIES: [&str; 4] = ["juvenil", "senior", "amateur", "profesional"];

/// A team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub sport: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Player user ids
    #[serde(default)]
    pub players: Vec<String>,
    /// User id of the coach who created the team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Team {
    pub fn has_player(&self, user_id: &str) -> bool {
        self.players.iter().any(|id| id == user_id)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner.as_deref() == Some(user_id)
    }
}

/// Body of `POST /api/teams` and `PUT /api/teams/:id`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTeam {
    pub name: String,
    pub sport: String,
    pub category: String,
    pub location: String,
    pub description: String,
    pub players: Vec<String>,
}

impl NewTeam {
    /// Split a comma-separated player list, dropping blanks
    pub fn with_player_names(mut self, player_names: &str) -> Self {
        self.players = player_names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        self
    }
}

/// Query for `GET /api/teams/filter` and the local team filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamFilters {
    pub search_term: String,
    pub sport: String,
    pub category: String,
}

impl TeamFilters {
    /// Non-empty filters as query parameters
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("searchTerm", self.search_term.as_str()),
            ("sport", self.sport.as_str()),
            ("category", self.category.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect()
    }
}

/// Case-insensitive name/description search plus exact sport and category.
pub fn filter_teams<'a>(teams: &'a [Team], filters: &TeamFilters) -> Vec<&'a Team> {
    let needle = filters.search_term.to_lowercase();
    teams
        .iter()
        .filter(|team| {
            needle.is_empty()
                || team.name.to_lowercase().contains(&needle)
                || team
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .filter(|team| filters.sport.is_empty() || team.sport.to_lowercase() == filters.sport.to_lowercase())
        .filter(|team| {
            filters.category.is_empty()
                || team.category.to_lowercase() == filters.category.to_lowercase()
        })
        .collect()
}
