//! Guest directory data model.
//!
//! # Purpose
//! Re-exports the guest record, slug, search/stats helpers, and the visitor
//! page state machine used by the store, directory, and HTTP layers.
mod guest;
mod search;
mod slug;
mod stats;
mod visit;

pub use guest::{Guest, GuestChange, GuestChangeOp, GuestDraft, GuestId, GuestPatch};
pub use search::filter_guests;
pub use slug::{RESERVED_SLUGS, Slug, SlugError, derive_slug};
pub use stats::GuestStats;
pub use visit::{FetchTicket, Visit, VisitOutcome, VisitState, VisitTransitionError};
