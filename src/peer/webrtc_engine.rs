//! WebRTC Media Engine
//!
//! Implementiert den Media Engine Port auf Basis von `webrtc`. Die async
//! API des Crates wird auf die callback-basierten Operationen des Ports
//! abgebildet: jede Operation läuft als eigener Task und ruft am Ende den
//! Completion-Callback auf.

use super::error::PeerError;
use super::port::{
    CreateSdpCallback, EngineEvent, EngineObserver, MediaConnection, MediaEngineFactory,
    SetCallback, StatsCallback,
};
use super::types::{
    ConnectionState, IceCandidate, MediaConstraints, PeerRole, RemoteTrack, SdpType,
    SessionDescription, StatsReport, TrackKind,
};
use crate::config::CallConfig;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

// ============================================================================
// ENGINE
// ============================================================================

/// Factory für webrtc Peer Connections
#[derive(Debug, Clone)]
pub struct WebRtcEngine {
    ice_servers: Vec<RTCIceServer>,
}

impl WebRtcEngine {
    /// Übernimmt die ICE Server aus der Konfiguration; eine leere Liste
    /// bedeutet nur Host-Candidates
    pub fn new(config: &CallConfig) -> Self {
        let ice_servers = config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect();

        Self { ice_servers }
    }

    /// Fügt einen TURN-Server mit Credentials hinzu
    pub fn with_turn_server(mut self, url: String, username: String, credential: String) -> Self {
        self.ice_servers.push(RTCIceServer {
            urls: vec![url],
            username,
            credential,
            ..Default::default()
        });
        self
    }

    async fn build_peer_connection(&self) -> Result<Arc<RTCPeerConnection>, PeerError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| PeerError::ConnectionSetup(e.to_string()))?;

        // Interceptors für RTCP, NACK etc.
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)
            .map_err(|e| PeerError::ConnectionSetup(e.to_string()))?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: self.ice_servers.clone(),
            ..Default::default()
        };

        let pc = api
            .new_peer_connection(config)
            .await
            .map_err(|e| PeerError::ConnectionSetup(e.to_string()))?;
        Ok(Arc::new(pc))
    }
}

impl Default for WebRtcEngine {
    fn default() -> Self {
        Self::new(&CallConfig::default())
    }
}

#[async_trait]
impl MediaEngineFactory for WebRtcEngine {
    async fn create_connection(
        &self,
        role: PeerRole,
        observer: EngineObserver,
    ) -> Result<Arc<dyn MediaConnection>, PeerError> {
        let pc = self.build_peer_connection().await?;
        register_handlers(&pc, observer);
        tracing::info!(role = %role, "WebRTC peer connection created");

        Ok(Arc::new(WebRtcConnection {
            pc,
            runtime: Handle::current(),
        }))
    }
}

/// Leitet die Events der Peer Connection an den Observer weiter
fn register_handlers(pc: &Arc<RTCPeerConnection>, observer: EngineObserver) {
    let state_observer = observer.clone();
    pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
        if let Some(state) = connection_state(s) {
            state_observer.notify(EngineEvent::ConnectionStateChanged(state));
        }
        Box::pin(async {})
    }));

    let ice_observer = observer.clone();
    pc.on_ice_candidate(Box::new(move |candidate| {
        if let Some(c) = candidate {
            match c.to_json() {
                Ok(init) => ice_observer.notify(EngineEvent::IceCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_mline_index: init.sdp_mline_index,
                })),
                Err(e) => tracing::warn!("Failed to serialize ICE candidate: {}", e),
            }
        }
        Box::pin(async {})
    }));

    let track_observer = observer.clone();
    pc.on_track(Box::new(move |track, _, _| {
        let kind = match track.kind() {
            RTPCodecType::Audio => Some(TrackKind::Audio),
            RTPCodecType::Video => Some(TrackKind::Video),
            _ => None,
        };
        if let Some(kind) = kind {
            track_observer.notify(EngineEvent::TrackAdded(RemoteTrack {
                track_id: track.id(),
                stream_id: track.stream_id(),
                kind,
            }));
        }
        Box::pin(async {})
    }));

    pc.on_negotiation_needed(Box::new(move || {
        observer.notify(EngineEvent::RenegotiationNeeded);
        Box::pin(async {})
    }));
}

fn connection_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        RTCPeerConnectionState::Unspecified => None,
    }
}

// ============================================================================
// SDP CONVERSION
// ============================================================================

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, String> {
    let result = match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
        SdpType::PrAnswer => RTCSessionDescription::pranswer(desc.sdp),
        SdpType::Rollback => {
            let mut rollback = RTCSessionDescription::default();
            rollback.sdp_type = RTCSdpType::Rollback;
            Ok(rollback)
        }
    };
    result.map_err(|e| e.to_string())
}

/// `None` für einen unspezifizierten Typ, wird zu `EmptyResult`
fn from_rtc(desc: RTCSessionDescription) -> Option<SessionDescription> {
    let sdp_type = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::PrAnswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => return None,
    };
    Some(SessionDescription {
        sdp_type,
        sdp: desc.sdp,
    })
}

// ============================================================================
// CONNECTION
// ============================================================================

/// Verbindung der Media Engine.
///
/// Hält das Runtime-Handle aus der Erstellung, damit `close()` und die
/// übrigen Operationen auch außerhalb eines Tokio-Kontexts aufrufbar sind.
pub struct WebRtcConnection {
    pc: Arc<RTCPeerConnection>,
    runtime: Handle,
}

/// Legt für jede gewünschte Medienart ohne Transceiver einen
/// Recvonly-Transceiver an
async fn ensure_receive_transceivers(
    pc: &RTCPeerConnection,
    constraints: MediaConstraints,
) -> Result<(), String> {
    let existing = pc.get_transceivers().await;
    let wanted = [
        (RTPCodecType::Audio, constraints.offer_to_receive_audio),
        (RTPCodecType::Video, constraints.offer_to_receive_video),
    ];

    for (kind, receive) in wanted {
        if !receive || existing.iter().any(|t| t.kind() == kind) {
            continue;
        }
        pc.add_transceiver_from_kind(
            kind,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
                send_encodings: vec![],
            }),
        )
        .await
        .map_err(|e| e.to_string())?;
    }
    Ok(())
}

impl MediaConnection for WebRtcConnection {
    fn create_offer(&self, constraints: &MediaConstraints, done: CreateSdpCallback) {
        let pc = Arc::clone(&self.pc);
        let constraints = *constraints;
        let options = RTCOfferOptions {
            ice_restart: constraints.ice_restart,
            ..Default::default()
        };
        self.runtime.spawn(async move {
            if let Err(e) = ensure_receive_transceivers(&pc, constraints).await {
                done(Err(e));
                return;
            }
            let result = pc.create_offer(Some(options)).await;
            done(result.map(from_rtc).map_err(|e| e.to_string()));
        });
    }

    /// Die Empfangs-Flags und `ice_restart` sind Offer-Optionen; die Answer
    /// folgt den m-Sections des Remote Offers
    fn create_answer(&self, _constraints: &MediaConstraints, done: CreateSdpCallback) {
        let pc = Arc::clone(&self.pc);
        self.runtime.spawn(async move {
            let result = pc.create_answer(None).await;
            done(result.map(from_rtc).map_err(|e| e.to_string()));
        });
    }

    fn set_local_description(&self, desc: SessionDescription, done: SetCallback) {
        let pc = Arc::clone(&self.pc);
        self.runtime.spawn(async move {
            let result = match to_rtc(desc) {
                Ok(desc) => pc
                    .set_local_description(desc)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };
            done(result);
        });
    }

    fn set_remote_description(&self, desc: SessionDescription, done: SetCallback) {
        let pc = Arc::clone(&self.pc);
        self.runtime.spawn(async move {
            let result = match to_rtc(desc) {
                Ok(desc) => pc
                    .set_remote_description(desc)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };
            done(result);
        });
    }

    fn add_ice_candidate(&self, candidate: IceCandidate, done: SetCallback) {
        let pc = Arc::clone(&self.pc);
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            ..Default::default()
        };
        self.runtime.spawn(async move {
            done(pc.add_ice_candidate(init).await.map_err(|e| e.to_string()));
        });
    }

    fn get_stats(&self, done: StatsCallback) {
        let pc = Arc::clone(&self.pc);
        self.runtime.spawn(async move {
            let report = pc.get_stats().await;
            let entries = report
                .reports
                .iter()
                .map(|(id, stat)| {
                    let value = serde_json::to_value(stat).unwrap_or(serde_json::Value::Null);
                    (id.clone(), value)
                })
                .collect();
            done(StatsReport::new(entries));
        });
    }

    fn close(&self) {
        let pc = Arc::clone(&self.pc);
        self.runtime.spawn(async move {
            if let Err(e) = pc.close().await {
                tracing::warn!("Failed to close peer connection: {}", e);
            }
        });
    }
}

impl std::fmt::Debug for WebRtcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebRtcConnection")
            .field("connection_state", &self.pc.connection_state())
            .finish()
    }
}
