//! Guest management page.
//!
//! Lists guests with their shareable links and a search box, and accepts
//! plain form posts for adding, editing and removing guests. A rejected add
//! form is shown again with the link its name would produce.
use super::{escape, page};
use crate::api::types::invitation_url;
use crate::app::AppState;
use crate::directory::{DirectoryError, GuestUpdate, NewGuest, SlugPreview};
use crate::model::{Guest, GuestId, GuestStats};
use axum::Form;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;

#[derive(Debug, Deserialize)]
pub(crate) struct GuestForm {
    name: String,
    #[serde(default)]
    email: Option<String>,
    /// Checkbox; present only when ticked.
    #[serde(default)]
    plus_one: Option<String>,
}

/// A rejected add form, echoed back with its link preview.
struct AddDraft {
    name: String,
    email: String,
    plus_one: bool,
    preview: Option<SlugPreview>,
}

pub(crate) async fn guests_page(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Response {
    let term = params.get("q").map(String::as_str).unwrap_or_default();
    render_list(&state, term, None, None).await
}

pub(crate) async fn create_from_form(
    State(state): State<AppState>,
    Form(form): Form<GuestForm>,
) -> Response {
    let new_guest = NewGuest {
        name: form.name.clone(),
        email: form.email.clone(),
        plus_one: form.plus_one.is_some(),
    };
    match state.directory.create_guest(new_guest).await {
        Ok(_) => Redirect::to("/admin/guests").into_response(),
        Err(err) => {
            // Names with no usable slug have nothing to preview.
            let preview = state.directory.slug_preview(&form.name, None).await.ok();
            let draft = AddDraft {
                name: form.name,
                email: form.email.unwrap_or_default(),
                plus_one: form.plus_one.is_some(),
                preview,
            };
            render_list(&state, "", Some(err), Some(draft)).await
        }
    }
}

pub(crate) async fn edit_page(
    Path(guest_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let Ok(id) = guest_id.parse::<GuestId>() else {
        return render_list(&state, "", Some(DirectoryError::NotFound), None).await;
    };
    match state.directory.get_guest(&id).await {
        Ok(guest) => render_edit(&state, &guest, None),
        Err(err) => render_list(&state, "", Some(err), None).await,
    }
}

pub(crate) async fn update_from_form(
    Path(guest_id): Path<String>,
    State(state): State<AppState>,
    Form(form): Form<GuestForm>,
) -> Response {
    let Ok(id) = guest_id.parse::<GuestId>() else {
        return render_list(&state, "", Some(DirectoryError::NotFound), None).await;
    };
    let update = GuestUpdate {
        name: Some(form.name.clone()),
        // Blank clears the stored address.
        email: Some(form.email.clone().unwrap_or_default()),
        plus_one: Some(form.plus_one.is_some()),
    };
    match state.directory.update_guest(&id, update).await {
        Ok(_) => Redirect::to("/admin/guests").into_response(),
        Err(err @ (DirectoryError::Validation(_) | DirectoryError::Slug(_))) => {
            match state.directory.get_guest(&id).await {
                Ok(mut guest) => {
                    guest.name = form.name;
                    guest.email = form.email;
                    guest.plus_one = form.plus_one.is_some();
                    render_edit(&state, &guest, Some(err))
                }
                Err(lookup) => render_list(&state, "", Some(lookup), None).await,
            }
        }
        Err(err) => render_list(&state, "", Some(err), None).await,
    }
}

pub(crate) async fn delete_from_form(
    Path(guest_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let Ok(id) = guest_id.parse::<GuestId>() else {
        return render_list(&state, "", Some(DirectoryError::NotFound), None).await;
    };
    match state.directory.delete_guest(&id).await {
        Ok(()) => Redirect::to("/admin/guests").into_response(),
        Err(err) => render_list(&state, "", Some(err), None).await,
    }
}

fn error_status(err: &DirectoryError) -> StatusCode {
    match err {
        DirectoryError::Validation(_) | DirectoryError::Slug(_) => StatusCode::BAD_REQUEST,
        DirectoryError::SlugTaken(_) => StatusCode::CONFLICT,
        DirectoryError::NotFound => StatusCode::NOT_FOUND,
        DirectoryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_message(err: &DirectoryError) -> String {
    match err {
        DirectoryError::Store(inner) => {
            tracing::error!(error = ?inner, "admin page storage error");
            "The guest list is unavailable right now. Please try again.".to_string()
        }
        other => other.to_string(),
    }
}

async fn render_list(
    state: &AppState,
    term: &str,
    failure: Option<DirectoryError>,
    draft: Option<AddDraft>,
) -> Response {
    let (mut status, mut notice) = match &failure {
        Some(err) => (error_status(err), Some(error_message(err))),
        None => (StatusCode::OK, None),
    };
    let guests = match state.directory.list_guests().await {
        Ok(guests) => guests,
        Err(err) => {
            status = error_status(&err);
            notice = Some(error_message(&err));
            Vec::new()
        }
    };
    let stats = GuestStats::from_guests(&guests);
    let shown: Vec<&Guest> = crate::model::filter_guests(&guests, term);

    let mut body = String::from("<main class=\"admin\">\n<h1>Guest list</h1>\n");
    if let Some(notice) = notice {
        let _ = writeln!(body, "<p class=\"notice\">{}</p>", escape(&notice));
    }
    let _ = writeln!(
        body,
        "<p class=\"stats\">{} guests, {} with a plus one, {} expected attendees.</p>",
        stats.total_guests, stats.total_plus_ones, stats.expected_attendees
    );
    let _ = writeln!(
        body,
        "<form method=\"get\" action=\"/admin/guests\"><input type=\"search\" name=\"q\" value=\"{}\" placeholder=\"Search by name or email\"><button>Search</button></form>",
        escape(term)
    );
    body.push_str(&add_form(state, draft.as_ref()));
    body.push_str(
        "<table>\n<thead><tr><th>Name</th><th>Email</th><th>Plus one</th><th>Invitation link</th><th></th></tr></thead>\n<tbody>\n",
    );
    for guest in &shown {
        let link = invitation_url(&state.public_url, &guest.slug);
        let _ = writeln!(
            body,
            "<tr><td>{name}</td><td>{email}</td><td>{plus_one}</td><td><a href=\"{link}\">{link}</a></td>\
             <td><a href=\"/admin/guests/{id}/edit\">Edit</a> \
             <form method=\"post\" action=\"/admin/guests/{id}/delete\"><button>Delete</button></form></td></tr>",
            name = escape(&guest.name),
            email = escape(guest.email.as_deref().unwrap_or("")),
            plus_one = if guest.plus_one { "yes" } else { "no" },
            link = escape(&link),
            id = guest.id,
        );
    }
    body.push_str("</tbody>\n</table>\n");
    if shown.is_empty() && !guests.is_empty() {
        body.push_str("<p class=\"empty\">No guests match your search.</p>\n");
    }
    body.push_str("</main>");
    page(status, &state.site, "Guest list", &body)
}

fn add_form(state: &AppState, draft: Option<&AddDraft>) -> String {
    let (name, email, plus_one) = match draft {
        Some(draft) => (draft.name.as_str(), draft.email.as_str(), draft.plus_one),
        None => ("", "", false),
    };
    let mut form = String::new();
    let _ = write!(
        form,
        "<form method=\"post\" action=\"/admin/guests\" class=\"add-guest\">\
         <input name=\"name\" value=\"{name}\" placeholder=\"Name\" required>\
         <input name=\"email\" type=\"email\" value=\"{email}\" placeholder=\"Email\">\
         <label><input name=\"plus_one\" type=\"checkbox\"{checked}> Plus one</label>\
         <button>Add guest</button></form>\n",
        name = escape(name),
        email = escape(email),
        checked = if plus_one { " checked" } else { "" },
    );
    if let Some(preview) = draft.and_then(|draft| draft.preview.as_ref()) {
        let _ = writeln!(
            form,
            "<p class=\"slug-preview\">URL will be: {url}{taken}</p>",
            url = escape(&invitation_url(&state.public_url, &preview.slug)),
            taken = if preview.available {
                ""
            } else {
                " (already used by another guest)"
            },
        );
    }
    form
}

fn render_edit(state: &AppState, guest: &Guest, failure: Option<DirectoryError>) -> Response {
    let status = failure.as_ref().map(error_status).unwrap_or(StatusCode::OK);
    let mut body = String::from("<main class=\"admin\">\n<h1>Edit guest</h1>\n");
    if let Some(err) = &failure {
        let _ = writeln!(body, "<p class=\"notice\">{}</p>", escape(&error_message(err)));
    }
    let link = invitation_url(&state.public_url, &guest.slug);
    let _ = writeln!(
        body,
        "<p class=\"slug\">Invitation link: <a href=\"{link}\">{link}</a> \
         (stays the same when the name changes)</p>",
        link = escape(&link),
    );
    let _ = writeln!(
        body,
        "<form method=\"post\" action=\"/admin/guests/{id}/edit\" class=\"edit-guest\">\
         <input name=\"name\" value=\"{name}\" required>\
         <input name=\"email\" type=\"email\" value=\"{email}\">\
         <label><input name=\"plus_one\" type=\"checkbox\"{checked}> Plus one</label>\
         <button>Update guest</button> <a href=\"/admin/guests\">Cancel</a></form>",
        id = guest.id,
        name = escape(&guest.name),
        email = escape(guest.email.as_deref().unwrap_or("")),
        checked = if guest.plus_one { " checked" } else { "" },
    );
    body.push_str("</main>");
    page(status, &state.site, "Edit guest", &body)
}
