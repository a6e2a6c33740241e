//! Server-rendered HTML pages.
//!
//! Pages are small hand-built documents. Every value that came from a guest
//! record or a request goes through [`escape`].
pub mod admin;
pub mod invitation;
pub mod landing;

use crate::config::SiteConfig;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

/// Minimal HTML escaping for text and double-quoted attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Wrap `body` (already escaped) in the shared document shell.
pub(crate) fn layout(site: &SiteConfig, title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} | {couple}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        title = escape(title),
        couple = escape(&site.couple_names),
    )
}

pub(crate) fn page(status: StatusCode, site: &SiteConfig, title: &str, body: &str) -> Response {
    (status, Html(layout(site, title, body))).into_response()
}
