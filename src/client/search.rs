//! Debounced lookups
//!
//! Search boxes (user search, address suggestions) fire on every keystroke.
//! `Debounced` waits for the input to settle before calling the lookup, and
//! tags each call with a sequence number so that only the response to the
//! latest input is ever published.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::error::ClientError;

/// Something that can be searched
#[async_trait]
pub trait Lookup: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    async fn lookup(&self, query: &str) -> Result<Self::Output, ClientError>;
}

/// Latest published lookup outcome
#[derive(Debug, Clone, PartialEq)]
pub enum LookupState<T> {
    Idle,
    /// The lookup for `query` is in flight
    Pending { seq: u64, query: String },
    Ready { seq: u64, query: String, result: T },
    Failed { seq: u64, query: String, error: ClientError },
}

impl<T> LookupState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, LookupState::Pending { .. })
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            LookupState::Ready { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            LookupState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn seq(&self) -> Option<u64> {
        match self {
            LookupState::Idle => None,
            LookupState::Pending { seq, .. }
            | LookupState::Ready { seq, .. }
            | LookupState::Failed { seq, .. } => Some(*seq),
        }
    }
}

/// Debounce plus last-request-wins around a `Lookup`
pub struct Debounced<L: Lookup> {
    lookup: Arc<L>,
    window: Duration,
    latest: Arc<AtomicU64>,
    state: Arc<watch::Sender<LookupState<L::Output>>>,
}

impl<L: Lookup> Clone for Debounced<L> {
    fn clone(&self) -> Self {
        Self {
            lookup: self.lookup.clone(),
            window: self.window,
            latest: self.latest.clone(),
            state: self.state.clone(),
        }
    }
}

impl<L: Lookup> Debounced<L> {
    pub fn new(lookup: L, window: Duration) -> Self {
        let (state, _) = watch::channel(LookupState::Idle);
        Self {
            lookup: Arc::new(lookup),
            window,
            latest: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn results(&self) -> watch::Receiver<LookupState<L::Output>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> LookupState<L::Output> {
        self.state.borrow().clone()
    }

    /// Sequence number of the most recent input
    pub fn latest_seq(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    /// Feed a keystroke. Returns the sequence number assigned to it.
    ///
    /// The lookup runs after the debounce window unless a newer input
    /// arrives first. Must be called inside a Tokio runtime.
    pub fn input(&self, query: impl Into<String>) -> u64 {
        let query = query.into();
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let this = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(this.window).await;
            if !this.is_latest(seq) {
                tracing::trace!(seq, "debounced input superseded");
                return;
            }
            this.execute(seq, query).await;
        });
        seq
    }

    /// Run a lookup right away, still subject to last-request-wins.
    pub async fn run_now(&self, query: impl Into<String>) -> LookupState<L::Output> {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.execute(seq, query.into()).await;
        self.state()
    }

    async fn execute(&self, seq: u64, query: String) {
        self.state.send_replace(LookupState::Pending {
            seq,
            query: query.clone(),
        });

        let result = self.lookup.lookup(&query).await;
        if !self.is_latest(seq) {
            tracing::debug!(seq, query = %query, "discarding stale lookup response");
            return;
        }

        let state = match result {
            Ok(result) => LookupState::Ready { seq, query, result },
            Err(error) => {
                tracing::debug!(seq, error = %error, "lookup failed");
                LookupState::Failed { seq, query, error }
            }
        };
        self.state.send_replace(state);
    }

    fn is_latest(&self, seq: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == seq
    }
}
