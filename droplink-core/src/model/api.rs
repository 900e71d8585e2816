use crate::model::peer::{PeerId, RosterEntry};
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

/// Request/response bodies for the mailbox HTTP API. Room reads return the
/// full `Room`; peer appends take a bare `RosterEntry`; message appends take
/// a bare `SignalDraft`.

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub creator: RosterEntry,
    #[serde(rename = "createdAt")]
    pub created_at_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub id: RoomId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppendMessageResponse {
    pub seq: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkProcessedRequest {
    pub reader: PeerId,
    pub seqs: Vec<u64>,
}
