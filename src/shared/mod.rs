//! Shared Module
//!
//! Types and data structures exchanged with the server over REST and the
//! realtime channel. Nothing here performs I/O.

/// Chat messages and conversation keys
pub mod message;

/// Realtime event names and decoding
pub mod event;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Users, roles and auth payloads
pub mod user;

/// Teams and team filters
pub mod team;

/// Matches and match filters
pub mod sport_match;

pub use message::{ChatMessage, ConversationKey, MessageSender, SendMessageRequest};
pub use event::{EventType, RealtimeEvent};
pub use error::SharedError;
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use user::{AuthResponse, LoginRequest, RegisterForm, Role, User, UserFilters, UserUpdate, ADMIN_EMAIL};
pub use team::{NewTeam, Team, TeamFilters};
pub use sport_match::{MatchFilters, SportMatch};
