//! Public landing page.
use super::{escape, page};
use crate::app::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

pub(crate) async fn landing(State(state): State<AppState>) -> Response {
    let site = &state.site;
    let date = site
        .wedding_date
        .as_deref()
        .map(|date| format!("<p class=\"date\">{}</p>\n", escape(date)))
        .unwrap_or_default();
    let body = format!(
        "<main class=\"landing\">\n<h1>{couple}</h1>\n{date}\
         <p>We are getting married. If you received an invitation link, please open it to see your personal invitation.</p>\n</main>",
        couple = escape(&site.couple_names),
    );
    page(StatusCode::OK, site, "Welcome", &body)
}
