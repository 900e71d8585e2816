use crate::transport::{
    ChannelHandle, IceCandidate, PeerTransport, TransportEvent, TransportFactory,
};
use async_trait::async_trait;
use bytes::Bytes;
use droplink_core::{ChannelMode, PeerId, TransportError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// STUN/TURN settings for the WebRTC transport.
#[derive(Clone)]
pub struct RtcConfig {
    pub ice_servers: Vec<String>,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_owned()],
        }
    }
}

/// Production transport: WebRTC peer connections with a single data channel.
pub struct RtcTransportFactory {
    config: RtcConfig,
}

impl RtcTransportFactory {
    pub fn new(config: RtcConfig) -> Self {
        Self { config }
    }
}

impl Default for RtcTransportFactory {
    fn default() -> Self {
        Self::new(RtcConfig::default())
    }
}

fn rtc_err(e: webrtc::Error) -> TransportError {
    TransportError::Failed(e.to_string())
}

fn channel_init(mode: ChannelMode) -> Option<RTCDataChannelInit> {
    match mode {
        ChannelMode::Reliable => None,
        ChannelMode::ReliableUnordered => Some(RTCDataChannelInit {
            ordered: Some(false),
            ..Default::default()
        }),
        ChannelMode::Unreliable => Some(RTCDataChannelInit {
            ordered: Some(false),
            max_retransmits: Some(0),
            ..Default::default()
        }),
    }
}

async fn build_peer_connection(
    config: &RtcConfig,
    remote: PeerId,
    event_tx: mpsc::Sender<TransportEvent>,
) -> Result<Arc<RTCPeerConnection>, TransportError> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs().map_err(rtc_err)?;
    let registry =
        register_default_interceptors(Registry::new(), &mut media_engine).map_err(rtc_err)?;

    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();

    let rtc_config = RTCConfiguration {
        ice_servers: vec![RTCIceServer {
            urls: config.ice_servers.clone(),
            ..Default::default()
        }],
        ..Default::default()
    };

    let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await.map_err(rtc_err)?);

    let state_tx = event_tx.clone();
    let peer_state = remote.clone();
    peer_connection.on_peer_connection_state_change(Box::new(
        move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let peer = peer_state.clone();

            Box::pin(async move {
                info!("peer connection state for {peer}: {s:?}");
                match s {
                    RTCPeerConnectionState::Connected => {
                        let _ = tx.send(TransportEvent::Connected(peer)).await;
                    }
                    RTCPeerConnectionState::Failed
                    | RTCPeerConnectionState::Disconnected
                    | RTCPeerConnectionState::Closed => {
                        let _ = tx.send(TransportEvent::Disconnected(peer)).await;
                    }
                    _ => {}
                }
            })
        },
    ));

    let ice_tx = event_tx;
    let peer_ice = remote;
    peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
        let tx = ice_tx.clone();
        let peer = peer_ice.clone();

        Box::pin(async move {
            let Some(candidate) = c else { return };
            let Ok(init) = candidate.to_json() else {
                return;
            };
            let candidate = IceCandidate {
                candidate: init.candidate,
                sdp_mid: init.sdp_mid,
                sdp_m_line_index: init.sdp_mline_index,
            };
            let _ = tx
                .send(TransportEvent::CandidateGenerated(peer, candidate))
                .await;
        })
    }));

    Ok(peer_connection)
}

/// Hook open/message callbacks on a data channel and surface it to the node
/// once it is writable.
fn wire_data_channel(dc: Arc<RTCDataChannel>, remote: PeerId, event_tx: mpsc::Sender<TransportEvent>) {
    let open_dc = dc.clone();
    let open_tx = event_tx.clone();
    let open_peer = remote.clone();
    dc.on_open(Box::new(move || {
        let tx = open_tx.clone();
        let peer = open_peer.clone();
        let channel: Arc<dyn ChannelHandle> = Arc::new(RtcChannel { dc: open_dc.clone() });

        Box::pin(async move {
            debug!("data channel open for {peer}");
            let _ = tx.send(TransportEvent::ChannelReady(peer, channel)).await;
        })
    }));

    let msg_tx = event_tx;
    let msg_peer = remote;
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = msg_tx.clone();
        let peer = msg_peer.clone();
        Box::pin(async move {
            let bytes = Bytes::from(msg.data.to_vec());
            let _ = tx.send(TransportEvent::Message(peer, bytes)).await;
        })
    }));
}

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn create_offerer(
        &self,
        remote: PeerId,
        mode: ChannelMode,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(Box<dyn PeerTransport>, String), TransportError> {
        let pc = build_peer_connection(&self.config, remote.clone(), events.clone()).await?;

        let dc = pc
            .create_data_channel("data", channel_init(mode))
            .await
            .map_err(rtc_err)?;
        wire_data_channel(dc, remote.clone(), events);

        let offer = pc.create_offer(None).await.map_err(rtc_err)?;
        pc.set_local_description(offer.clone())
            .await
            .map_err(rtc_err)?;

        let transport = RtcTransport { pc };
        Ok((Box::new(transport), offer.sdp))
    }

    async fn create_answerer(
        &self,
        remote: PeerId,
        remote_offer: String,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(Box<dyn PeerTransport>, String), TransportError> {
        let pc = build_peer_connection(&self.config, remote.clone(), events.clone()).await?;

        let dc_peer = remote;
        let dc_tx = events;
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let peer = dc_peer.clone();
            let tx = dc_tx.clone();
            Box::pin(async move {
                debug!("remote data channel '{}' from {peer}", dc.label());
                wire_data_channel(dc, peer, tx);
            })
        }));

        let offer = RTCSessionDescription::offer(remote_offer).map_err(rtc_err)?;
        pc.set_remote_description(offer).await.map_err(rtc_err)?;

        let answer = pc.create_answer(None).await.map_err(rtc_err)?;
        pc.set_local_description(answer.clone())
            .await
            .map_err(rtc_err)?;

        let transport = RtcTransport { pc };
        Ok((Box::new(transport), answer.sdp))
    }
}

struct RtcTransport {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerTransport for RtcTransport {
    async fn apply_answer(&self, sdp: String) -> Result<(), TransportError> {
        let answer = RTCSessionDescription::answer(sdp).map_err(rtc_err)?;
        self.pc
            .set_remote_description(answer)
            .await
            .map_err(rtc_err)
    }

    async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<(), TransportError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            ..Default::default()
        };
        self.pc.add_ice_candidate(init).await.map_err(rtc_err)
    }

    async fn close(&self) {
        let _ = self.pc.close().await;
    }
}

struct RtcChannel {
    dc: Arc<RTCDataChannel>,
}

#[async_trait]
impl ChannelHandle for RtcChannel {
    fn is_open(&self) -> bool {
        self.dc.ready_state() == RTCDataChannelState::Open
    }

    async fn send(&self, bytes: Bytes) -> Result<(), TransportError> {
        if self.dc.ready_state() != RTCDataChannelState::Open {
            return Err(TransportError::ChannelClosed);
        }
        self.dc.send(&bytes).await.map_err(rtc_err)?;
        Ok(())
    }
}
