//! Guest identity and slug management.
//!
//! # Purpose
//! The only logic-bearing layer between the HTTP surface and the store:
//! derives invitation slugs from names, checks their uniqueness, resolves a
//! slug back to a guest, and validates every admin write before it reaches
//! the store.
//!
//! # Key invariants
//! - A guest's slug is fixed at creation. Updates never recompute it, so a
//!   link that has already been sent keeps working after a name fix.
//! - Validation and uniqueness failures are returned before any store write.
//! - The application-level uniqueness check and the insert are two separate
//!   store calls. Backends enforce slug uniqueness as well, and a conflict
//!   from the insert is reported the same way as a failed check.
use crate::model::{
    Guest, GuestDraft, GuestId, GuestPatch, GuestStats, Slug, SlugError, filter_guests,
};
use crate::store::{GuestStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error("a guest with the invitation link '{0}' already exists")]
    SlugTaken(Slug),
    #[error("guest not found")]
    NotFound,
    #[error("guest directory unavailable: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for DirectoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => DirectoryError::NotFound,
            other => DirectoryError::Store(other),
        }
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Fields an administrator supplies for a new guest.
#[derive(Debug, Clone, Default)]
pub struct NewGuest {
    pub name: String,
    pub email: Option<String>,
    pub plus_one: bool,
}

/// Fields an administrator may change. Absent fields are left untouched; a
/// blank `email` clears it.
#[derive(Debug, Clone, Default)]
pub struct GuestUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub plus_one: Option<bool>,
}

/// Derived slug for a name, and whether it is free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugPreview {
    pub slug: Slug,
    pub available: bool,
}

#[derive(Clone)]
pub struct GuestDirectory {
    store: Arc<dyn GuestStore>,
}

impl GuestDirectory {
    pub fn new(store: Arc<dyn GuestStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn GuestStore> {
        &self.store
    }

    /// True iff no guest other than `exclude_id` already uses `slug`.
    pub async fn is_slug_unique(
        &self,
        slug: &Slug,
        exclude_id: Option<&GuestId>,
    ) -> DirectoryResult<bool> {
        let matches = self.store.find_by_slug(slug).await?;
        Ok(matches
            .iter()
            .all(|guest| Some(&guest.id) == exclude_id))
    }

    /// Look up the guest behind an invitation link.
    ///
    /// Returns `Ok(None)` when nobody has that slug, including when the slug is
    /// not well formed. If the uniqueness invariant has been broken the first
    /// match in store order wins and the condition is logged.
    pub async fn resolve(&self, slug: &str) -> DirectoryResult<Option<Guest>> {
        let Ok(slug) = Slug::parse(slug) else {
            metrics::counter!("invitations_slug_resolutions_total", "outcome" => "invalid")
                .increment(1);
            return Ok(None);
        };
        let mut matches = match self.store.find_by_slug(&slug).await {
            Ok(matches) => matches,
            Err(err) => {
                metrics::counter!("invitations_slug_resolutions_total", "outcome" => "error")
                    .increment(1);
                return Err(DirectoryError::Store(err));
            }
        };
        if matches.len() > 1 {
            tracing::warn!(
                slug = %slug,
                matches = matches.len(),
                "duplicate invitation slug; serving the first match"
            );
        }
        let outcome = if matches.is_empty() { "not_found" } else { "found" };
        metrics::counter!("invitations_slug_resolutions_total", "outcome" => outcome).increment(1);
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        })
    }

    pub async fn get_guest(&self, id: &GuestId) -> DirectoryResult<Guest> {
        Ok(self.store.get_guest(id).await?)
    }

    /// All guests ordered by name.
    pub async fn list_guests(&self) -> DirectoryResult<Vec<Guest>> {
        Ok(self.store.list_guests().await?)
    }

    /// Guests whose name or email contains `term`, ignoring case.
    pub async fn search_guests(&self, term: &str) -> DirectoryResult<Vec<Guest>> {
        let guests = self.list_guests().await?;
        Ok(filter_guests(&guests, term).into_iter().cloned().collect())
    }

    pub async fn stats(&self) -> DirectoryResult<GuestStats> {
        let guests = self.list_guests().await?;
        Ok(GuestStats::from_guests(&guests))
    }

    /// Slug a name would get, and whether it is currently free.
    pub async fn slug_preview(
        &self,
        name: &str,
        exclude_id: Option<&GuestId>,
    ) -> DirectoryResult<SlugPreview> {
        let slug = Slug::derive(name)?;
        let available = self.is_slug_unique(&slug, exclude_id).await?;
        Ok(SlugPreview { slug, available })
    }

    pub async fn create_guest(&self, new_guest: NewGuest) -> DirectoryResult<Guest> {
        let name = required_name(&new_guest.name)?;
        let slug = Slug::derive(&name)?;
        if !self.is_slug_unique(&slug, None).await? {
            return Err(DirectoryError::SlugTaken(slug));
        }
        let draft = GuestDraft {
            slug: slug.clone(),
            name,
            email: normalize_email(new_guest.email),
            plus_one: new_guest.plus_one,
        };
        match self.store.insert_guest(draft).await {
            Ok(guest) => {
                tracing::info!(guest_id = %guest.id, slug = %guest.slug, "guest created");
                Ok(guest)
            }
            // Lost a race with a concurrent insert of the same slug.
            Err(StoreError::Conflict(_)) => Err(DirectoryError::SlugTaken(slug)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_guest(&self, id: &GuestId, update: GuestUpdate) -> DirectoryResult<Guest> {
        let name = match update.name {
            Some(name) => Some(required_name(&name)?),
            None => None,
        };
        let patch = GuestPatch {
            name,
            email: update.email.map(|email| normalize_email(Some(email))),
            plus_one: update.plus_one,
        };
        let guest = self.store.update_guest(id, patch).await?;
        tracing::info!(guest_id = %guest.id, slug = %guest.slug, "guest updated");
        Ok(guest)
    }

    pub async fn delete_guest(&self, id: &GuestId) -> DirectoryResult<()> {
        self.store.delete_guest(id).await?;
        tracing::info!(guest_id = %id, "guest deleted");
        Ok(())
    }
}

fn required_name(name: &str) -> DirectoryResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DirectoryError::Validation("name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_email(email: Option<String>) -> Option<String> {
    email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
}
