//! JSON handlers for brackets and slot actions.
//!
//! Every handler that depends on who is asking reads the acting user from
//! the `x-user-label` header.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::error::{Result, SlotError};
use crate::feed::SharedSlotFeed;
use crate::identity::{HeaderIdentity, IdentityProvider};
use crate::managers::{SharedBracketManager, SharedReservationCoordinator, SlotAction};
use crate::state::{BracketDocument, NewBracket, Seat, Slot};
use crate::store::SlotSnapshot;

/// Events replayed to a new SSE subscriber before live ones
const REPLAY_EVENTS: usize = 20;

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub brackets: SharedBracketManager,
    pub coordinator: SharedReservationCoordinator,
    pub feed: SharedSlotFeed,
}

/// A slot as shown to one user
#[derive(Debug, Serialize)]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: Slot,
    pub can_confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub bracket_id: String,
    pub version: u64,
    pub slots: Vec<SlotView>,
}

impl SlotsResponse {
    fn for_user(snapshot: SlotSnapshot, label: &str) -> Self {
        let slots = snapshot
            .slots
            .into_iter()
            .map(|slot| SlotView {
                can_confirm: slot.can_confirm(label),
                slot,
            })
            .collect();

        Self {
            bracket_id: snapshot.bracket_id,
            version: snapshot.version,
            slots,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub seat: Seat,
}

/// GET / - Health check
pub async fn health() -> &'static str {
    "ok"
}

/// GET /brackets
pub async fn list_brackets(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<BracketDocument>>> {
    let identity = HeaderIdentity::from_headers(&headers)?;
    Ok(Json(state.brackets.list_visible(&identity).await?))
}

/// POST /brackets
pub async fn create_bracket(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(request): Json<NewBracket>,
) -> Result<impl IntoResponse> {
    let identity = HeaderIdentity::from_headers(&headers)?;
    let doc = state.brackets.create_bracket(request, &identity).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

/// GET /brackets/:id
pub async fn get_bracket(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(bracket_id): Path<String>,
) -> Result<Json<BracketDocument>> {
    let identity = HeaderIdentity::from_headers(&headers)?;
    let doc = visible_bracket(&state, &bracket_id, &identity.current_user_label()).await?;
    Ok(Json(doc))
}

/// DELETE /brackets/:id
pub async fn delete_bracket(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(bracket_id): Path<String>,
) -> Result<StatusCode> {
    let identity = HeaderIdentity::from_headers(&headers)?;
    state.brackets.delete_bracket(&bracket_id, &identity).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /brackets/:id/slots
pub async fn list_slots(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(bracket_id): Path<String>,
) -> Result<Json<SlotsResponse>> {
    let identity = HeaderIdentity::from_headers(&headers)?;
    let label = identity.current_user_label();
    visible_bracket(&state, &bracket_id, &label).await?;

    let snapshot = state.coordinator.snapshot(&bracket_id).await?;
    Ok(Json(SlotsResponse::for_user(snapshot, &label)))
}

/// POST /brackets/:id/slots/:slot_id/join
pub async fn join_slot(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((bracket_id, slot_id)): Path<(String, String)>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<SlotsResponse>> {
    perform(&headers, &state, &bracket_id, &slot_id, SlotAction::Join(request.seat)).await
}

/// POST /brackets/:id/slots/:slot_id/confirm
pub async fn confirm_slot(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((bracket_id, slot_id)): Path<(String, String)>,
) -> Result<Json<SlotsResponse>> {
    perform(&headers, &state, &bracket_id, &slot_id, SlotAction::Confirm).await
}

/// POST /brackets/:id/slots/:slot_id/leave
pub async fn leave_slot(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((bracket_id, slot_id)): Path<(String, String)>,
) -> Result<Json<SlotsResponse>> {
    perform(&headers, &state, &bracket_id, &slot_id, SlotAction::Leave).await
}

/// POST /brackets/:id/slots/:slot_id/decline
pub async fn decline_slot(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path((bracket_id, slot_id)): Path<(String, String)>,
) -> Result<Json<SlotsResponse>> {
    perform(&headers, &state, &bracket_id, &slot_id, SlotAction::Decline).await
}

async fn perform(
    headers: &HeaderMap,
    state: &AppState,
    bracket_id: &str,
    slot_id: &str,
    action: SlotAction,
) -> Result<Json<SlotsResponse>> {
    let identity = HeaderIdentity::from_headers(headers)?;
    let label = identity.current_user_label();
    visible_bracket(state, bracket_id, &label).await?;

    let snapshot = state
        .coordinator
        .perform(bracket_id, slot_id, action, &identity)
        .await?;
    Ok(Json(SlotsResponse::for_user(snapshot, &label)))
}

/// Load a bracket the caller may see.
///
/// Private brackets are hidden rather than forbidden: a non-creator gets the
/// same `NotFound` as for an unknown id, on every bracket-scoped route.
async fn visible_bracket(
    state: &AppState,
    bracket_id: &str,
    label: &str,
) -> Result<BracketDocument> {
    let doc = state.brackets.get_bracket(bracket_id).await?;
    if !doc.bracket.is_visible_to(label) {
        return Err(SlotError::NotFound {
            bracket_id: bracket_id.to_string(),
        });
    }
    Ok(doc)
}

/// GET /brackets/:id/events - SSE stream of changes to one bracket
pub async fn bracket_events(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(bracket_id): Path<String>,
) -> Result<impl IntoResponse> {
    let identity = HeaderIdentity::from_headers(&headers)?;
    visible_bracket(&state, &bracket_id, &identity.current_user_label()).await?;

    let replay = state.feed.recent_for(&bracket_id, REPLAY_EVENTS);
    let rx = state.feed.subscribe();

    let replayed = tokio_stream::iter(replay)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.to_json())));
    let live = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.bracket_id == bracket_id => {
            Some(Ok::<_, Infallible>(Event::default().data(event.to_json())))
        }
        _ => None, // Other brackets and lagged messages
    });

    Ok(Sse::new(replayed.chain(live)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}
