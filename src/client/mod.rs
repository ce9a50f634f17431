//! Client Module
//!
//! Session, REST gateway, realtime channel and conversation state.
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── config.rs        - Resolved URLs and timings
//! ├── error.rs         - ClientError
//! ├── storage.rs       - Persisted token (file or memory)
//! ├── session.rs       - Session, SessionHandle, SessionStore
//! ├── gateway.rs       - ApiClient: bearer auth and error normalisation
//! ├── realtime/        - Socket.IO channel following the session
//! ├── conversation.rs  - Per-conversation message lists
//! ├── search.rs        - Debounced, last-request-wins lookups
//! ├── services.rs      - Users, teams, matches, geocoding
//! └── state.rs         - ClientContext wiring it all together
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod realtime;
pub mod search;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;

pub use config::Config;
pub use conversation::{Conversation, ConversationStore};
pub use error::{ClientError, GENERIC_ERROR_MESSAGE};
pub use gateway::ApiClient;
pub use realtime::{ChannelState, Connector, RealtimeChannel, Transport, WebSocketConnector};
pub use search::{Debounced, Lookup, LookupState};
pub use services::{AddressSuggestion, Geocoder, MatchService, TeamService, UserService};
pub use session::{AuthenticatedSession, Session, SessionHandle, SessionStore};
pub use state::ClientContext;
pub use storage::{FileTokenStore, MemoryTokenStore, PersistedSession, TokenStore};
