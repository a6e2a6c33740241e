//! OpenAPI document for the JSON API, served at `/v1/openapi.json`.
use crate::api::{
    guests, slugs, system,
    types::{
        ErrorResponse, FeatureFlags, GuestChangesResponse, GuestCreateRequest, GuestListResponse,
        GuestSnapshotResponse, GuestUpdateRequest, GuestView, HealthStatus, SlugPreviewResponse,
        SystemInfo,
    },
    watch,
};
use crate::model::{Guest, GuestChange, GuestChangeOp, GuestId, GuestStats, Slug};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "invitations",
        version = "v1",
        description = "Wedding invitation guest directory API"
    ),
    paths(
        system::system_info,
        system::system_health,
        guests::list_guests,
        guests::create_guest,
        guests::get_guest,
        guests::patch_guest,
        guests::delete_guest,
        guests::resolve_guest,
        guests::guest_stats,
        guests::guest_snapshot,
        guests::guest_changes,
        watch::watch_guests,
        slugs::preview_slug
    ),
    components(schemas(
        FeatureFlags,
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        Guest,
        GuestId,
        Slug,
        GuestView,
        GuestCreateRequest,
        GuestUpdateRequest,
        GuestListResponse,
        GuestSnapshotResponse,
        GuestChange,
        GuestChangeOp,
        GuestChangesResponse,
        GuestStats,
        SlugPreviewResponse
    )),
    tags(
        (name = "system", description = "System and discovery endpoints"),
        (name = "guests", description = "Guest directory management"),
        (name = "slugs", description = "Invitation link helpers")
    )
)]
pub struct ApiDoc;
