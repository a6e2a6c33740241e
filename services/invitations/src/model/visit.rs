//! Visitor page lifecycle.
//!
//! # Purpose
//! Models what an invitation page shows while a guest opens their link:
//! `Loading -> {Found, NotFound, Error}`, `Found -> EnteredContent` on the
//! entry action, and `Error -> Loading` on retry. Nothing is remembered across
//! visits; every visit starts at `Loading` and passes the entry gate again.
//!
//! # Key invariants
//! - Every lookup is issued with a [`FetchTicket`]. Only the ticket of the
//!   current `Loading` state can complete it, so a response that arrives after
//!   a retry or after the page was closed is dropped.
use super::guest::Guest;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum VisitState {
    Loading { ticket: FetchTicket },
    Found(Guest),
    NotFound,
    Error { message: String },
    EnteredContent(Guest),
}

/// Result of one guest lookup, as seen by the page.
#[derive(Debug, Clone)]
pub enum VisitOutcome {
    Found(Guest),
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisitTransitionError {
    #[error("the entry gate can only be passed once the invitation is found")]
    NotFound,
    #[error("retry is only possible after a failed lookup")]
    NotFailed,
    #[error("visit is closed")]
    Closed,
}

#[derive(Debug)]
pub struct Visit {
    state: VisitState,
    next_ticket: u64,
    closed: bool,
}

impl Visit {
    /// Open a page and return the ticket for the initial lookup.
    pub fn start() -> (Self, FetchTicket) {
        let ticket = FetchTicket(0);
        let visit = Self {
            state: VisitState::Loading { ticket },
            next_ticket: 1,
            closed: false,
        };
        (visit, ticket)
    }

    pub fn state(&self) -> &VisitState {
        &self.state
    }

    /// Apply a lookup result. Returns `false` if the ticket is stale or the
    /// visit has been closed, in which case the state is unchanged.
    pub fn resolve(&mut self, ticket: FetchTicket, outcome: VisitOutcome) -> bool {
        if self.closed {
            return false;
        }
        match &self.state {
            VisitState::Loading { ticket: current } if *current == ticket => {}
            _ => return false,
        }
        self.state = match outcome {
            VisitOutcome::Found(guest) => VisitState::Found(guest),
            VisitOutcome::NotFound => VisitState::NotFound,
            VisitOutcome::Failed(message) => VisitState::Error { message },
        };
        true
    }

    /// Pass the entry gate. Entering an already entered visit is a no-op.
    pub fn enter(&mut self) -> Result<(), VisitTransitionError> {
        if self.closed {
            return Err(VisitTransitionError::Closed);
        }
        let state = std::mem::replace(&mut self.state, VisitState::NotFound);
        match state {
            VisitState::Found(guest) | VisitState::EnteredContent(guest) => {
                self.state = VisitState::EnteredContent(guest);
                Ok(())
            }
            other => {
                self.state = other;
                Err(VisitTransitionError::NotFound)
            }
        }
    }

    /// The resolved guest, once the lookup has found one.
    pub fn guest(&self) -> Option<&Guest> {
        match &self.state {
            VisitState::Found(guest) | VisitState::EnteredContent(guest) => Some(guest),
            _ => None,
        }
    }

    /// Go back to `Loading` after a failure and hand out a fresh ticket.
    pub fn retry(&mut self) -> Result<FetchTicket, VisitTransitionError> {
        if self.closed {
            return Err(VisitTransitionError::Closed);
        }
        if !matches!(self.state, VisitState::Error { .. }) {
            return Err(VisitTransitionError::NotFailed);
        }
        let ticket = FetchTicket(self.next_ticket);
        self.next_ticket += 1;
        self.state = VisitState::Loading { ticket };
        Ok(ticket)
    }

    /// Tear the page down. Any lookup still in flight becomes stale.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GuestId, Slug};
    use chrono::Utc;

    fn guest() -> Guest {
        let now = Utc::now();
        Guest {
            id: GuestId::new(),
            slug: Slug::parse("sarah-johnson").expect("slug"),
            name: "Sarah Johnson".to_string(),
            email: None,
            plus_one: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn found_then_entered() {
        let (mut visit, ticket) = Visit::start();
        assert!(matches!(visit.state(), VisitState::Loading { .. }));
        assert!(visit.resolve(ticket, VisitOutcome::Found(guest())));
        assert!(matches!(visit.state(), VisitState::Found(_)));
        visit.enter().expect("enter");
        assert_eq!(visit.guest().map(|g| g.name.as_str()), Some("Sarah Johnson"));
        assert!(matches!(visit.state(), VisitState::EnteredContent(_)));
        // Entering twice is harmless.
        assert!(visit.enter().is_ok());
    }

    #[test]
    fn not_found_cannot_enter() {
        let (mut visit, ticket) = Visit::start();
        assert!(visit.resolve(ticket, VisitOutcome::NotFound));
        assert_eq!(visit.state(), &VisitState::NotFound);
        assert_eq!(visit.enter().err(), Some(VisitTransitionError::NotFound));
        assert_eq!(visit.retry().err(), Some(VisitTransitionError::NotFailed));
    }

    #[test]
    fn error_retry_issues_fresh_ticket_and_drops_stale_response() {
        let (mut visit, first) = Visit::start();
        assert!(visit.resolve(first, VisitOutcome::Failed("offline".into())));
        let second = visit.retry().expect("retry");
        assert_ne!(first, second);

        // A late answer to the first lookup must not land.
        assert!(!visit.resolve(first, VisitOutcome::Found(guest())));
        assert!(matches!(visit.state(), VisitState::Loading { .. }));

        assert!(visit.resolve(second, VisitOutcome::Found(guest())));
        assert!(matches!(visit.state(), VisitState::Found(_)));
    }

    #[test]
    fn closed_visit_ignores_in_flight_result() {
        let (mut visit, ticket) = Visit::start();
        visit.close();
        assert!(!visit.resolve(ticket, VisitOutcome::Found(guest())));
        assert!(matches!(visit.state(), VisitState::Loading { .. }));
        assert_eq!(visit.enter().err(), Some(VisitTransitionError::Closed));
    }

    #[test]
    fn second_resolution_with_same_ticket_is_ignored() {
        let (mut visit, ticket) = Visit::start();
        assert!(visit.resolve(ticket, VisitOutcome::NotFound));
        assert!(!visit.resolve(ticket, VisitOutcome::Found(guest())));
        assert_eq!(visit.state(), &VisitState::NotFound);
    }
}
