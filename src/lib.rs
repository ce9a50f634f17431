//! teammatch - client core for a sports team-matching service
//!
//! Players, coaches and admins log in, browse teams and matches, find each
//! other on a map and chat. This library holds everything below the UI:
//!
//! - **`shared`** - wire types (users, messages, teams, matches, realtime
//!   events), shared errors and configuration
//! - **`client`** - session store, REST gateway, realtime channel,
//!   conversation state and the REST service clients
//!
//! # Data Flow
//!
//! `SessionStore` publishes the current `Session` on a watch channel. The
//! `ApiClient` reads the token from it on every request, the
//! `RealtimeChannel` opens and closes its connection as it changes, and the
//! `ConversationStore` receives live messages from the channel.
//!
//! # Error Handling
//!
//! - `shared::SharedError` for local validation and serialization
//! - `client::ClientError` for everything the client does

/// Shared types and data structures
pub mod shared;

/// Client-side session and messaging
pub mod client;
