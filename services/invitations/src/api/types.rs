//! HTTP API request/response types.
//!
//! # Purpose
//! Shared payload shapes for the JSON API and OpenAPI schema generation.
use crate::model::{Guest, GuestChange, GuestId, Slug};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct FeatureFlags {
    pub durable_storage: bool,
    pub live_updates: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub api_version: String,
    pub storage_backend: String,
    pub public_url: String,
    pub features: FeatureFlags,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GuestCreateRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub plus_one: bool,
}

/// Partial update. Omitted fields are left unchanged; an empty `email`
/// clears the address. The slug cannot be changed.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct GuestUpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub plus_one: Option<bool>,
}

/// A guest as presented to administrators: the stored record plus the
/// values derived from it.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct GuestView {
    pub id: GuestId,
    pub slug: Slug,
    pub name: String,
    pub email: Option<String>,
    pub plus_one: bool,
    pub expected_party_size: u32,
    pub invitation_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuestView {
    pub fn new(guest: Guest, public_url: &str) -> Self {
        let expected_party_size = guest.expected_party_size();
        let invitation_url = invitation_url(public_url, &guest.slug);
        Self {
            id: guest.id,
            slug: guest.slug,
            name: guest.name,
            email: guest.email,
            plus_one: guest.plus_one,
            expected_party_size,
            invitation_url,
            created_at: guest.created_at,
            updated_at: guest.updated_at,
        }
    }
}

/// Shareable link for a slug under the configured public base URL.
pub fn invitation_url(public_url: &str, slug: &Slug) -> String {
    format!("{}/{}", public_url.trim_end_matches('/'), slug)
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GuestListResponse {
    pub items: Vec<GuestView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GuestSnapshotResponse {
    pub items: Vec<Guest>,
    pub next_seq: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GuestChangesResponse {
    pub items: Vec<GuestChange>,
    pub next_seq: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SlugPreviewResponse {
    pub slug: Slug,
    pub available: bool,
    pub invitation_url: String,
}
