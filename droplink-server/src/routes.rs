use crate::state::MailboxState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use droplink_core::model::api::{
    AppendMessageResponse, CreateRoomRequest, CreateRoomResponse, MarkProcessedRequest,
};
use droplink_core::{Room, RoomId, RosterEntry, SignalDraft};
use std::str::FromStr;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

pub fn router(state: MailboxState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{id}", get(read_room))
        .route("/rooms/{id}/peers", post(append_peer))
        .route("/rooms/{id}/messages", post(append_message))
        .route("/rooms/{id}/processed", post(mark_processed))
        .layer(cors)
        .with_state(state)
}

fn parse_room(id: &str) -> Result<RoomId, StatusCode> {
    RoomId::from_str(id).map_err(|_| StatusCode::NOT_FOUND)
}

async fn create_room(
    State(state): State<MailboxState>,
    Json(req): Json<CreateRoomRequest>,
) -> (StatusCode, Json<CreateRoomResponse>) {
    let room = Room::new(req.creator.id, req.creator.name, req.created_at_ms);
    let id = room.id.clone();
    state.rooms.insert(id.clone(), room);

    info!("room {id} created");
    (StatusCode::CREATED, Json(CreateRoomResponse { id }))
}

async fn read_room(
    State(state): State<MailboxState>,
    Path(id): Path<String>,
) -> Result<Json<Room>, StatusCode> {
    let id = parse_room(&id)?;
    state
        .rooms
        .get(&id)
        .map(|room| Json(room.clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn append_peer(
    State(state): State<MailboxState>,
    Path(id): Path<String>,
    Json(entry): Json<RosterEntry>,
) -> Result<StatusCode, StatusCode> {
    let id = parse_room(&id)?;
    let mut room = state.rooms.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    room.append_peer(entry);
    Ok(StatusCode::NO_CONTENT)
}

async fn append_message(
    State(state): State<MailboxState>,
    Path(id): Path<String>,
    Json(draft): Json<SignalDraft>,
) -> Result<Json<AppendMessageResponse>, StatusCode> {
    let id = parse_room(&id)?;
    let mut room = state.rooms.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    let seq = room.append_message(draft);

    debug!("room {id}: message appended at seq {seq}");
    Ok(Json(AppendMessageResponse { seq }))
}

async fn mark_processed(
    State(state): State<MailboxState>,
    Path(id): Path<String>,
    Json(req): Json<MarkProcessedRequest>,
) -> Result<StatusCode, StatusCode> {
    let id = parse_room(&id)?;
    let mut room = state.rooms.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    room.mark_processed(&req.seqs, &req.reader);
    Ok(StatusCode::NO_CONTENT)
}
