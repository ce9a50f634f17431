//! Match Data Structures
//!
//! Scheduled and played matches (`/api/matches`, `/api/matches/history`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Competition types
pub const COMPETITIONS: [&str; 3] = ["liga", "copa", "champions"];

/// A scheduled or played match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SportMatch {
    /// Empty until the server assigns one
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ISO date, possibly with a time part
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// Query for match listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilters {
    pub date: Option<NaiveDate>,
    pub competition: String,
}

impl MatchFilters {
    /// Non-empty filters as query parameters; dates use `yyyy-MM-dd`
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(date) = self.date {
            pairs.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        if !self.competition.is_empty() {
            pairs.push(("competition", self.competition.clone()));
        }
        pairs
    }
}

/// Keep matches on the given date and of the given competition.
pub fn filter_matches<'a>(matches: &'a [SportMatch], filters: &MatchFilters) -> Vec<&'a SportMatch> {
    let date = filters.date.map(|d| d.format("%Y-%m-%d").to_string());
    matches
        .iter()
        .filter(|m| date.as_deref().map_or(true, |d| m.date.contains(d)))
        .filter(|m| {
            filters.competition.is_empty()
                || m.competition
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase() == filters.competition.to_lowercase())
        })
        .collect()
}
