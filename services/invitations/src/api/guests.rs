//! Guest API handlers.
//!
//! # Purpose
//! Guest CRUD, slug resolution, aggregates, and the snapshot + changes feed.
//! All writes go through the directory so validation and slug uniqueness are
//! enforced in one place.
use crate::api::error::{ApiError, api_internal, api_not_found};
use crate::api::types::{
    GuestChangesResponse, GuestCreateRequest, GuestListResponse, GuestSnapshotResponse,
    GuestUpdateRequest, GuestView,
};
use crate::app::AppState;
use crate::directory::{GuestUpdate, NewGuest};
use crate::model::{GuestId, GuestStats};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::collections::HashMap;

/// Ids that are not UUIDs cannot name a guest.
fn parse_guest_id(raw: &str) -> Result<GuestId, ApiError> {
    raw.parse().map_err(|_| api_not_found("guest not found"))
}

#[utoipa::path(
    get,
    path = "/v1/guests",
    tag = "guests",
    params(
        ("q" = Option<String>, Query, description = "Case-insensitive match on name or email")
    ),
    responses(
        (status = 200, description = "Guests ordered by name", body = GuestListResponse)
    )
)]
pub(crate) async fn list_guests(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<GuestListResponse>, ApiError> {
    let term = params.get("q").map(String::as_str).unwrap_or_default();
    let guests = state.directory.search_guests(term).await?;
    let items = guests
        .into_iter()
        .map(|guest| GuestView::new(guest, &state.public_url))
        .collect();
    Ok(Json(GuestListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/guests",
    tag = "guests",
    request_body = GuestCreateRequest,
    responses(
        (status = 201, description = "Guest created", body = GuestView),
        (status = 400, description = "Name missing or unusable as a link", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Invitation link already taken", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_guest(
    State(state): State<AppState>,
    Json(body): Json<GuestCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let guest = state
        .directory
        .create_guest(NewGuest {
            name: body.name,
            email: body.email,
            plus_one: body.plus_one,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(GuestView::new(guest, &state.public_url)),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/guests/{guest_id}",
    tag = "guests",
    params(
        ("guest_id" = String, Path, description = "Guest identifier")
    ),
    responses(
        (status = 200, description = "Fetch guest", body = GuestView),
        (status = 404, description = "Guest not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_guest(
    Path(guest_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<GuestView>, ApiError> {
    let id = parse_guest_id(&guest_id)?;
    let guest = state.directory.get_guest(&id).await?;
    Ok(Json(GuestView::new(guest, &state.public_url)))
}

#[utoipa::path(
    patch,
    path = "/v1/guests/{guest_id}",
    tag = "guests",
    params(
        ("guest_id" = String, Path, description = "Guest identifier")
    ),
    request_body = GuestUpdateRequest,
    responses(
        (status = 200, description = "Guest updated; the slug is unchanged", body = GuestView),
        (status = 400, description = "Invalid field", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Guest not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_guest(
    Path(guest_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<GuestUpdateRequest>,
) -> Result<Json<GuestView>, ApiError> {
    let id = parse_guest_id(&guest_id)?;
    let guest = state
        .directory
        .update_guest(
            &id,
            GuestUpdate {
                name: body.name,
                email: body.email,
                plus_one: body.plus_one,
            },
        )
        .await?;
    Ok(Json(GuestView::new(guest, &state.public_url)))
}

#[utoipa::path(
    delete,
    path = "/v1/guests/{guest_id}",
    tag = "guests",
    params(
        ("guest_id" = String, Path, description = "Guest identifier")
    ),
    responses(
        (status = 204, description = "Guest deleted"),
        (status = 404, description = "Guest not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_guest(
    Path(guest_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let id = parse_guest_id(&guest_id)?;
    state.directory.delete_guest(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/guests/by-slug/{slug}",
    tag = "guests",
    params(
        ("slug" = String, Path, description = "Invitation slug")
    ),
    responses(
        (status = 200, description = "Guest behind the invitation link", body = GuestView),
        (status = 404, description = "No guest has this slug", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn resolve_guest(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<GuestView>, ApiError> {
    match state.directory.resolve(&slug).await? {
        Some(guest) => Ok(Json(GuestView::new(guest, &state.public_url))),
        None => Err(api_not_found("guest not found")),
    }
}

#[utoipa::path(
    get,
    path = "/v1/guests/stats",
    tag = "guests",
    responses(
        (status = 200, description = "Guest list aggregates", body = GuestStats)
    )
)]
pub(crate) async fn guest_stats(State(state): State<AppState>) -> Result<Json<GuestStats>, ApiError> {
    Ok(Json(state.directory.stats().await?))
}

#[utoipa::path(
    get,
    path = "/v1/guests/snapshot",
    tag = "guests",
    responses(
        (status = 200, description = "Full guest snapshot", body = GuestSnapshotResponse)
    )
)]
pub(crate) async fn guest_snapshot(
    State(state): State<AppState>,
) -> Result<Json<GuestSnapshotResponse>, ApiError> {
    let snapshot = state
        .directory
        .store()
        .guest_snapshot()
        .await
        .map_err(|err| api_internal("failed to load guest snapshot", &err))?;
    Ok(Json(GuestSnapshotResponse {
        items: snapshot.items,
        next_seq: snapshot.next_seq,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/guests/changes",
    tag = "guests",
    params(
        ("since" = Option<u64>, Query, description = "First sequence to return")
    ),
    responses(
        (status = 200, description = "Guest change list", body = GuestChangesResponse)
    )
)]
pub(crate) async fn guest_changes(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<GuestChangesResponse>, ApiError> {
    let since = params
        .get("since")
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);
    let changes = state
        .directory
        .store()
        .guest_changes(since)
        .await
        .map_err(|err| api_internal("failed to load guest changes", &err))?;
    Ok(Json(GuestChangesResponse {
        items: changes.items,
        next_seq: changes.next_seq,
    }))
}
