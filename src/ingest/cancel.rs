//! Session tokens for cooperative cancellation
//!
//! Every session carries a token. Work enqueued for a session captures the
//! token at enqueue time; resetting the session cancels it. The queue checks
//! the token before starting a subject, and the session checks it again
//! before merging, so results that settle after a reset are discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// A cancellable token identifying one session generation.
#[derive(Debug, Clone)]
pub struct SessionToken {
    session_id: Uuid,
    cancelled: Arc<AtomicBool>,
}

impl SessionToken {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The session this token belongs to.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True if both tokens were issued for the same session.
    pub fn same_session(&self, other: &SessionToken) -> bool {
        self.session_id == other.session_id
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_uncancelled() {
        let token = SessionToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cloned_token_shares_state() {
        let token = SessionToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(clone.same_session(&token));
    }

    #[test]
    fn fresh_tokens_belong_to_different_sessions() {
        assert!(!SessionToken::new().same_session(&SessionToken::new()));
    }
}
