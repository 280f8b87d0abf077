//! Process-wide session state.
//!
//! The console has at most one active session (single-user client). The store
//! is an explicit context object passed to every consumer — mutation funnels
//! through [`SessionStore::login`] and [`SessionStore::logout`] behind a mutex.
//!
//! Validation responses are *fenced*: each validation attempt takes a
//! [`ValidationTicket`] carrying a monotonically increasing sequence number,
//! and a login whose ticket is no longer the latest is discarded. A slow
//! validation response therefore cannot overwrite a newer login or logout.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::types::{SessionToken, UserProfile};

/// An authenticated session: the application bearer token plus the staff
/// user's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: SessionToken,
    pub profile: UserProfile,
    /// When the session was established locally. Expiry itself is a backend
    /// policy (7 days); the client never checks it.
    pub established_at: SystemTime,
}

impl Session {
    #[must_use]
    pub fn new(token: SessionToken, profile: UserProfile) -> Self {
        Self {
            token,
            profile,
            established_at: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.profile.name.as_deref()
    }
}

/// One-shot fencing token for a validation attempt.
///
/// Not `Clone`: a ticket is consumed by the single [`SessionStore::login`]
/// call it authorizes.
#[derive(Debug)]
pub struct ValidationTicket(u64);

#[derive(Debug, Default)]
struct Cell {
    session: Option<Session>,
    /// Sequence number of the most recent validation attempt (or a value no
    /// outstanding ticket holds, after a logout).
    latest: u64,
}

/// Single-cell holder of the current session.
///
/// Reads are cheap clones; writes are last-*request*-wins: starting a new
/// validation attempt invalidates every earlier outstanding ticket.
#[derive(Debug, Default)]
pub struct SessionStore {
    cell: Mutex<Cell>,
    seq: AtomicU64,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validation attempt and return its fencing ticket.
    pub fn begin_validation(&self) -> ValidationTicket {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut cell = self.cell.lock().expect("session store poisoned");
        cell.latest = seq;
        ValidationTicket(seq)
    }

    /// Replace the current session with a validated one.
    ///
    /// Returns `false` (and leaves the store untouched) if the ticket is
    /// stale — a newer validation attempt or a logout has happened since it
    /// was issued.
    pub fn login(&self, ticket: ValidationTicket, session: Session) -> bool {
        let mut cell = self.cell.lock().expect("session store poisoned");
        if ticket.0 != cell.latest {
            tracing::debug!(
                ticket = ticket.0,
                latest = cell.latest,
                "discarding stale validation response"
            );
            return false;
        }
        cell.session = Some(session);
        true
    }

    /// Clear the current session unconditionally. Idempotent.
    ///
    /// Also invalidates every outstanding validation ticket, so an in-flight
    /// validation resolved after logout cannot resurrect the session.
    pub fn logout(&self) {
        let fence = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut cell = self.cell.lock().expect("session store poisoned");
        cell.latest = fence;
        if cell.session.take().is_some() {
            tracing::info!("session cleared");
        }
    }

    /// The current session, if any.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.cell
            .lock()
            .expect("session store poisoned")
            .session
            .clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.cell
            .lock()
            .expect("session store poisoned")
            .session
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> Session {
        Session::new(SessionToken::from(token.to_string()), UserProfile::default())
    }

    #[test]
    fn login_replaces_session() {
        let store = SessionStore::new();
        let ticket = store.begin_validation();
        assert!(store.login(ticket, session("t1")));
        assert!(store.is_logged_in());
        assert_eq!(store.current().unwrap().token().as_str(), "t1");
    }

    #[test]
    fn logout_is_idempotent() {
        let store = SessionStore::new();
        let ticket = store.begin_validation();
        assert!(store.login(ticket, session("t1")));

        store.logout();
        assert!(!store.is_logged_in());
        // Second logout leaves the store logged out with no error.
        store.logout();
        assert!(!store.is_logged_in());
    }

    #[test]
    fn stale_ticket_cannot_override_newer_login() {
        let store = SessionStore::new();
        let slow = store.begin_validation();
        let fast = store.begin_validation();

        assert!(store.login(fast, session("fresh")));
        // The earlier attempt resolves late; it must be discarded.
        assert!(!store.login(slow, session("stale")));
        assert_eq!(store.current().unwrap().token().as_str(), "fresh");
    }

    #[test]
    fn logout_fences_in_flight_validation() {
        let store = SessionStore::new();
        let ticket = store.begin_validation();
        store.logout();

        assert!(!store.login(ticket, session("zombie")));
        assert!(!store.is_logged_in());
    }

    #[test]
    fn current_is_none_before_login() {
        let store = SessionStore::new();
        assert!(store.current().is_none());
        assert!(!store.is_logged_in());
    }
}
