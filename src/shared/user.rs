/**
 * User Types
 *
 * Identity, roles and the auth request/response shapes exchanged with the
 * REST API. Field names follow the server's JSON (`_id`, `lastName`).
 */
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::SharedError;

/// Account that every listing hides from regular users
pub const ADMIN_EMAIL: &str = "adminscj@gmail.com";

/// Role a user registers with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "administrador")]
    Admin,
    #[serde(rename = "entrenador")]
    Coach,
    #[serde(rename = "jugador")]
    Player,
}

impl Role {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "administrador",
            Role::Coach => "entrenador",
            Role::Player => "jugador",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "administrador" => Ok(Role::Admin),
            "entrenador" => Ok(Role::Coach),
            "jugador" => Ok(Role::Player),
            other => Err(SharedError::validation("role", format!("unknown role '{}'", other))),
        }
    }
}

/// GeoJSON point as stored by the server: `[longitude, latitude]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default = "GeoPoint::kind")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    fn kind() -> String {
        "Point".to_string()
    }

    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: Self::kind(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// User information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "lastName", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this is the hidden administrator account
    pub fn is_hidden_admin(&self) -> bool {
        self.email == ADMIN_EMAIL
    }
}

/// Authentication response from server: the user object with its token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration form as submitted by the sign-up screen.
///
/// Every field is kept as entered; latitude and longitude come from the
/// address suggestion the user picked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub age: String,
    pub address: String,
    pub role: Option<Role>,
    pub latitude: String,
    pub longitude: String,
}

impl RegisterForm {
    /// Check that every required field is filled in.
    pub fn validate(&self) -> Result<(), SharedError> {
        let mut missing = Vec::new();
        let text_fields = [
            ("email", &self.email),
            ("password", &self.password),
            ("name", &self.name),
        ];
        for (field, value) in text_fields {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }
        if self.role.is_none() {
            missing.push("role");
        }
        let location_fields = [
            ("address", &self.address),
            ("latitude", &self.latitude),
            ("longitude", &self.longitude),
        ];
        for (field, value) in location_fields {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SharedError::missing_fields(missing))
        }
    }

    /// Fill address and coordinates from a picked suggestion
    pub fn set_address(&mut self, display_name: &str, latitude: &str, longitude: &str) {
        self.address = display_name.to_string();
        self.latitude = latitude.to_string();
        self.longitude = longitude.to_string();
    }
}

/// Partial update sent by the admin edit screen; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "lastName", default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

/// Filters the user map applies locally
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilters {
    pub role: Option<Role>,
    pub search_term: String,
}

/// Apply role and name filters, dropping the hidden admin account.
pub fn filter_users<'a>(users: &'a [User], filters: &UserFilters) -> Vec<&'a User> {
    let needle = filters.search_term.trim().to_lowercase();
    users
        .iter()
        .filter(|user| !user.is_hidden_admin())
        .filter(|user| filters.role.map_or(true, |role| user.role == role))
        .filter(|user| {
            needle.is_empty()
                || user.name.to_lowercase().contains(&needle)
                || user
                    .last_name
                    .as_deref()
                    .is_some_and(|last| last.to_lowercase().contains(&needle))
        })
        .collect()
}
