use crate::mailbox::MailboxStore;
use async_trait::async_trait;
use dashmap::DashMap;
use droplink_core::{PeerId, Room, RoomId, RosterEntry, SignalDraft, StoreError};
use std::sync::Arc;

/// In-process mailbox: the substrate for peers sharing one process and the
/// fixture integration tests run against. Clones share the same room table.
#[derive(Clone, Default)]
pub struct MemoryMailbox {
    rooms: Arc<DashMap<RoomId, Room>>,
}

impl MemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MailboxStore for MemoryMailbox {
    async fn create_room(
        &self,
        creator: RosterEntry,
        created_at_ms: u64,
    ) -> Result<RoomId, StoreError> {
        let room = Room::new(creator.id, creator.name, created_at_ms);
        let id = room.id.clone();
        self.rooms.insert(id.clone(), room);
        Ok(id)
    }

    async fn read_room(&self, room: &RoomId) -> Result<Room, StoreError> {
        self.rooms
            .get(room)
            .map(|r| r.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn append_peer(&self, room: &RoomId, entry: RosterEntry) -> Result<(), StoreError> {
        let mut room = self.rooms.get_mut(room).ok_or(StoreError::NotFound)?;
        room.append_peer(entry);
        Ok(())
    }

    async fn append_message(&self, room: &RoomId, draft: SignalDraft) -> Result<u64, StoreError> {
        let mut room = self.rooms.get_mut(room).ok_or(StoreError::NotFound)?;
        Ok(room.append_message(draft))
    }

    async fn mark_processed(
        &self,
        room: &RoomId,
        seqs: &[u64],
        reader: &PeerId,
    ) -> Result<(), StoreError> {
        let mut room = self.rooms.get_mut(room).ok_or(StoreError::NotFound)?;
        room.mark_processed(seqs, reader);
        Ok(())
    }
}
