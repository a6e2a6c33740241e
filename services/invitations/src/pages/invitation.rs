//! Personal invitation pages.
//!
//! `/{slug}` shows the welcome card with the entry gate; `/{slug}/enter` is
//! the invitation content behind it. Each request runs one [`Visit`] from
//! `Loading` to a terminal state and renders whatever state it ends in.
use super::{escape, page};
use crate::app::AppState;
use crate::config::SiteConfig;
use crate::model::{Guest, Visit, VisitOutcome, VisitState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;

async fn load(state: &AppState, slug: &str) -> Visit {
    let (mut visit, ticket) = Visit::start();
    let outcome = match state.directory.resolve(slug).await {
        Ok(Some(guest)) => VisitOutcome::Found(guest),
        Ok(None) => VisitOutcome::NotFound,
        Err(err) => {
            tracing::error!(error = %err, slug, "invitation lookup failed");
            VisitOutcome::Failed("We could not load your invitation right now.".to_string())
        }
    };
    visit.resolve(ticket, outcome);
    visit
}

pub(crate) async fn entry_gate(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let visit = load(&state, &slug).await;
    render(&state.site, &slug, visit.state())
}

pub(crate) async fn entered(Path(slug): Path<String>, State(state): State<AppState>) -> Response {
    let mut visit = load(&state, &slug).await;
    // Only a found guest can pass the gate; other states render as they are.
    let _ = visit.enter();
    render(&state.site, &slug, visit.state())
}

fn render(site: &SiteConfig, slug: &str, state: &VisitState) -> Response {
    match state {
        VisitState::Found(guest) => page(
            StatusCode::OK,
            site,
            &format!("Invitation for {}", guest.name),
            &gate_body(site, guest),
        ),
        VisitState::EnteredContent(guest) => page(
            StatusCode::OK,
            site,
            &format!("Invitation for {}", guest.name),
            &content_body(site, guest),
        ),
        VisitState::NotFound => page(
            StatusCode::NOT_FOUND,
            site,
            "Invitation not found",
            "<main class=\"not-found\">\n<h1>Invitation not found</h1>\n\
             <p>We could not find an invitation for this link. Please check the link you received.</p>\n\
             <p><a href=\"/\">Go to the home page</a></p>\n</main>",
        ),
        VisitState::Error { message } => page(
            StatusCode::INTERNAL_SERVER_ERROR,
            site,
            "Something went wrong",
            &format!(
                "<main class=\"error\">\n<h1>Something went wrong</h1>\n<p>{message}</p>\n\
                 <p><a class=\"retry\" href=\"/{slug}\">Try again</a></p>\n</main>",
                message = escape(message),
                slug = escape(slug),
            ),
        ),
        // A finished lookup never leaves the visit loading.
        VisitState::Loading { .. } => page(
            StatusCode::SERVICE_UNAVAILABLE,
            site,
            "Loading",
            &format!(
                "<main class=\"loading\"><p>Loading your invitation.</p>\
                 <p><a href=\"/{}\">Reload</a></p></main>",
                escape(slug)
            ),
        ),
    }
}

fn gate_body(site: &SiteConfig, guest: &Guest) -> String {
    let companion = if guest.plus_one {
        "<p class=\"plus-one\">You are welcome to bring a guest.</p>\n"
    } else {
        ""
    };
    format!(
        "<main class=\"entry-gate\">\n<h1>{couple}</h1>\n<p>Dear</p>\n<h2 class=\"guest-name\">{name}</h2>\n\
         <p>You are warmly invited to celebrate our wedding.</p>\n{companion}\
         <p><a class=\"enter\" href=\"/{slug}/enter\">Open invitation</a></p>\n</main>",
        couple = escape(&site.couple_names),
        name = escape(&guest.name),
        slug = escape(guest.slug.as_str()),
    )
}

fn content_body(site: &SiteConfig, guest: &Guest) -> String {
    let date = site
        .wedding_date
        .as_deref()
        .map(|date| format!("<p class=\"date\">{}</p>\n", escape(date)))
        .unwrap_or_default();
    let seats = match guest.expected_party_size() {
        1 => "We have reserved a seat for you.".to_string(),
        n => format!("We have reserved {n} seats for you."),
    };
    format!(
        "<main class=\"invitation\">\n<h1>{couple}</h1>\n{date}\
         <p class=\"greeting\">Welcome, {name}.</p>\n<p class=\"seats\">{seats}</p>\n</main>",
        couple = escape(&site.couple_names),
        name = escape(&guest.name),
    )
}
