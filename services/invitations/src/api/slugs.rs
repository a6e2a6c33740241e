//! Slug preview for the admin form.
use crate::api::error::{ApiError, api_validation_error};
use crate::api::types::{SlugPreviewResponse, invitation_url};
use crate::app::AppState;
use crate::model::GuestId;
use axum::Json;
use axum::extract::{Query, State};
use std::collections::HashMap;

#[utoipa::path(
    get,
    path = "/v1/slugs/preview",
    tag = "slugs",
    params(
        ("name" = String, Query, description = "Display name to derive a slug from"),
        ("exclude_id" = Option<String>, Query, description = "Guest whose own slug does not count as taken")
    ),
    responses(
        (status = 200, description = "Derived slug and availability", body = SlugPreviewResponse),
        (status = 400, description = "Name cannot produce a link", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn preview_slug(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<SlugPreviewResponse>, ApiError> {
    let name = params.get("name").map(String::as_str).unwrap_or_default();
    let exclude_id = match params.get("exclude_id").filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(
            raw.parse::<GuestId>()
                .map_err(|_| api_validation_error("exclude_id must be a guest id"))?,
        ),
        None => None,
    };
    let preview = state
        .directory
        .slug_preview(name, exclude_id.as_ref())
        .await?;
    Ok(Json(SlugPreviewResponse {
        invitation_url: invitation_url(&state.public_url, &preview.slug),
        slug: preview.slug,
        available: preview.available,
    }))
}
