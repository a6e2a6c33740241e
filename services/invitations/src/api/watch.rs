//! Server-Sent Events feed of the live guest list.
//!
//! Each `guests` event carries the full list in the same shape as
//! `GET /v1/guests`. A failed reload is reported as an `error` event and the
//! stream stays open. The subscription is released when the client goes away.
use crate::api::error::ApiError;
use crate::api::types::{GuestListResponse, GuestView};
use crate::app::AppState;
use crate::directory::DirectoryResult;
use crate::model::Guest;
use crate::watch::GuestSubscription;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use std::convert::Infallible;

#[utoipa::path(
    get,
    path = "/v1/guests/watch",
    tag = "guests",
    responses(
        (status = 200, description = "Stream of full guest lists", body = GuestListResponse, content_type = "text/event-stream"),
        (status = 500, description = "Guest directory unavailable", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn watch_guests(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let subscription = GuestSubscription::open(state.directory.clone()).await?;
    let public_url = state.public_url.clone();
    let events = subscription
        .into_stream()
        .map(move |item| Ok(list_event(item, &public_url)));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn list_event(item: DirectoryResult<Vec<Guest>>, public_url: &str) -> Event {
    let guests = match item {
        Ok(guests) => guests,
        Err(err) => {
            tracing::warn!(error = %err, "guest watch reload failed");
            return Event::default()
                .event("error")
                .data("guest directory unavailable");
        }
    };
    let body = GuestListResponse {
        items: guests
            .into_iter()
            .map(|guest| GuestView::new(guest, public_url))
            .collect(),
    };
    match Event::default().event("guests").json_data(body) {
        Ok(event) => event,
        Err(err) => {
            tracing::error!(error = %err, "failed to encode guest list event");
            Event::default()
                .event("error")
                .data("failed to encode guest list")
        }
    }
}
