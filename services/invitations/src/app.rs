//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router for pages and the JSON API, configures tracing
//! middleware, and defines the shared state injected into handlers.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::api::types::FeatureFlags;
use crate::config::SiteConfig;
use crate::directory::GuestDirectory;
use crate::observability;
use crate::pages;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub directory: GuestDirectory,
    /// Base URL used to build shareable invitation links.
    pub public_url: String,
    pub site: SiteConfig,
    pub api_version: String,
    pub features: FeatureFlags,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route("/v1/system/info", get(api::system::system_info))
        .route("/v1/system/health", get(api::system::system_health))
        .route(
            "/v1/guests",
            get(api::guests::list_guests).post(api::guests::create_guest),
        )
        .route("/v1/guests/snapshot", get(api::guests::guest_snapshot))
        .route("/v1/guests/changes", get(api::guests::guest_changes))
        .route("/v1/guests/stats", get(api::guests::guest_stats))
        .route("/v1/guests/watch", get(api::watch::watch_guests))
        .route(
            "/v1/guests/by-slug/:slug",
            get(api::guests::resolve_guest),
        )
        .route(
            "/v1/guests/:guest_id",
            get(api::guests::get_guest)
                .patch(api::guests::patch_guest)
                .delete(api::guests::delete_guest),
        )
        .route("/v1/slugs/preview", get(api::slugs::preview_slug))
        .route(
            "/admin/guests",
            get(pages::admin::guests_page).post(pages::admin::create_from_form),
        )
        .route(
            "/admin/guests/:guest_id/edit",
            get(pages::admin::edit_page).post(pages::admin::update_from_form),
        )
        .route(
            "/admin/guests/:guest_id/delete",
            post(pages::admin::delete_from_form),
        )
        .route("/", get(pages::landing::landing))
        .route("/:slug", get(pages::invitation::entry_gate))
        .route("/:slug/enter", get(pages::invitation::entered))
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
