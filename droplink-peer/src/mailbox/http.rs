use crate::mailbox::MailboxStore;
use async_trait::async_trait;
use droplink_core::model::api::{
    AppendMessageResponse, CreateRoomRequest, CreateRoomResponse, MarkProcessedRequest,
};
use droplink_core::{PeerId, Room, RoomId, RosterEntry, SignalDraft, StoreError};
use reqwest::StatusCode;

/// Mailbox client against a droplink-server instance. A dead or unreachable
/// server surfaces `StoreError::Unavailable`; the relay degrades to retrying
/// on its next tick instead of failing the node.
#[derive(Clone)]
pub struct HttpMailbox {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMailbox {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound),
            status if status.is_success() => Ok(response),
            status => Err(StoreError::Invalid(format!(
                "mailbox server returned {status}"
            ))),
        }
    }
}

fn transport_err(e: reqwest::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn decode_err(e: reqwest::Error) -> StoreError {
    StoreError::Invalid(e.to_string())
}

#[async_trait]
impl MailboxStore for HttpMailbox {
    async fn create_room(
        &self,
        creator: RosterEntry,
        created_at_ms: u64,
    ) -> Result<RoomId, StoreError> {
        let body = CreateRoomRequest {
            creator,
            created_at_ms,
        };
        let response = self
            .client
            .post(self.url("/rooms"))
            .json(&body)
            .send()
            .await
            .map_err(transport_err)?;
        let created: CreateRoomResponse =
            Self::check(response).await?.json().await.map_err(decode_err)?;
        Ok(created.id)
    }

    async fn read_room(&self, room: &RoomId) -> Result<Room, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("/rooms/{room}")))
            .send()
            .await
            .map_err(transport_err)?;
        Self::check(response).await?.json().await.map_err(decode_err)
    }

    async fn append_peer(&self, room: &RoomId, entry: RosterEntry) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.url(&format!("/rooms/{room}/peers")))
            .json(&entry)
            .send()
            .await
            .map_err(transport_err)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn append_message(&self, room: &RoomId, draft: SignalDraft) -> Result<u64, StoreError> {
        let response = self
            .client
            .post(self.url(&format!("/rooms/{room}/messages")))
            .json(&draft)
            .send()
            .await
            .map_err(transport_err)?;
        let appended: AppendMessageResponse =
            Self::check(response).await?.json().await.map_err(decode_err)?;
        Ok(appended.seq)
    }

    async fn mark_processed(
        &self,
        room: &RoomId,
        seqs: &[u64],
        reader: &PeerId,
    ) -> Result<(), StoreError> {
        let body = MarkProcessedRequest {
            reader: reader.clone(),
            seqs: seqs.to_vec(),
        };
        let response = self
            .client
            .post(self.url(&format!("/rooms/{room}/processed")))
            .json(&body)
            .send()
            .await
            .map_err(transport_err)?;
        Self::check(response).await?;
        Ok(())
    }
}
