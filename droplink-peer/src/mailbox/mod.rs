mod http;
mod memory;

pub use http::HttpMailbox;
pub use memory::MemoryMailbox;

use async_trait::async_trait;
use droplink_core::{PeerId, Room, RoomId, RosterEntry, SignalDraft, StoreError};

/// Shared storage for one room's roster and signaling log.
///
/// Every operation must be safe under concurrent callers from independent
/// processes: appends never drop a concurrent writer's earlier append, and
/// processed-marks merge by set-union. Implementations get those semantics
/// for free by funnelling mutations through the `Room` methods.
#[async_trait]
pub trait MailboxStore: Send + Sync {
    async fn create_room(
        &self,
        creator: RosterEntry,
        created_at_ms: u64,
    ) -> Result<RoomId, StoreError>;

    async fn read_room(&self, room: &RoomId) -> Result<Room, StoreError>;

    /// Idempotent: appending an id already in the roster is a no-op.
    async fn append_peer(&self, room: &RoomId, entry: RosterEntry) -> Result<(), StoreError>;

    /// Returns the assigned log sequence number.
    async fn append_message(&self, room: &RoomId, draft: SignalDraft) -> Result<u64, StoreError>;

    async fn mark_processed(
        &self,
        room: &RoomId,
        seqs: &[u64],
        reader: &PeerId,
    ) -> Result<(), StoreError>;
}
