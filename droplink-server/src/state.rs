use dashmap::DashMap;
use droplink_core::{Room, RoomId};
use std::sync::Arc;

/// Shared room table. Merge semantics (idempotent roster append, sequenced
/// log append, set-union processed-marks) come from the `Room` methods; the
/// per-entry DashMap lock serializes writers to one room.
#[derive(Clone, Default)]
pub struct MailboxState {
    pub rooms: Arc<DashMap<RoomId, Room>>,
}
