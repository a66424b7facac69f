//! Cancellation handles for in-flight geocoding requests.
//!
//! A [`RequestToken`] stands for exactly one outstanding request. Transports hand one
//! back from every fetch and keep a clone so they can observe cancellation; the
//! orchestrator keeps the other clone and compares identities when a completion
//! arrives to decide whether it is still the request it cares about.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, AtomicU64, Ordering},
    },
};

use tokio_util::sync::CancellationToken;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

const PENDING: u8 = 0;
const CANCELLED: u8 = 1;
const SETTLED: u8 = 2;

/// Process-unique identity of a [`RequestToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u64);

impl TokenId {
    fn next() -> Self {
        Self(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a request as seen through its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// The request has been issued and has neither completed nor been cancelled.
    Pending,
    /// Someone called [`RequestToken::cancel`] before the request settled.
    Cancelled,
    /// The request completed (successfully or not) before any cancellation.
    Settled,
}

/// Opaque handle identifying one outstanding request.
///
/// Clones share state: cancelling any clone cancels them all. Both
/// [`cancel`](Self::cancel) and [`settle`](Self::settle) are idempotent and only the
/// first transition out of [`TokenState::Pending`] has any effect. Transports wait on
/// [`cancelled`](Self::cancelled) to abandon work.
///
/// ```rust
/// use pinpoint::{RequestToken, TokenState};
///
/// let token = RequestToken::new();
/// assert!(token.cancel());
/// assert!(!token.cancel());
/// assert_eq!(token.state(), TokenState::Cancelled);
/// ```
#[derive(Clone)]
pub struct RequestToken {
    id: TokenId,
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
}

impl RequestToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: TokenId::next(),
            state: Arc::new(AtomicU8::new(PENDING)),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> TokenId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> TokenState {
        match self.state.load(Ordering::Acquire) {
            PENDING => TokenState::Pending,
            CANCELLED => TokenState::Cancelled,
            _ => TokenState::Settled,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state() == TokenState::Pending
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() == TokenState::Cancelled
    }

    /// Ask the transport to abandon the request.
    ///
    /// Returns `true` only for the call that moved the token from pending to cancelled.
    /// Calling this on a settled or already cancelled token is a no-op.
    pub fn cancel(&self) -> bool {
        let cancelled = self.transition(CANCELLED);
        if cancelled {
            self.cancel.cancel();
        }
        cancelled
    }

    /// Mark the request as completed. Returns `false` if it was already cancelled or settled.
    pub fn settle(&self) -> bool {
        self.transition(SETTLED)
    }

    /// Resolves once the token is cancelled. Never resolves for a settled token.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for RequestToken {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for RequestToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RequestToken {}

impl fmt::Debug for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestToken")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
