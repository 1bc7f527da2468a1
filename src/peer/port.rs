//! Media Engine Port
//!
//! Die schmale Schnittstelle zur eigentlichen Media Engine (ICE, DTLS,
//! Codecs, Transport). Alle SDP/ICE-Operationen sind callback-basiert:
//! die Engine ruft den Completion-Callback genau einmal auf, auf einem
//! beliebigen Thread.

use super::connection::PeerConnection;
use super::error::PeerError;
use super::types::{
    ConnectionState, IceCandidate, MediaConstraints, PeerRole, RemoteTrack, SessionDescription,
    StatsReport,
};
use async_trait::async_trait;
use std::sync::{Arc, Weak};

// ============================================================================
// CALLBACK TYPES
// ============================================================================

/// Ergebnis von create_offer / create_answer.
/// `Ok(None)` heißt: Erfolg gemeldet, aber keine Description geliefert.
pub type CreateSdpResult = Result<Option<SessionDescription>, String>;

pub type CreateSdpCallback = Box<dyn FnOnce(CreateSdpResult) + Send>;

/// Completion für set_*_description und add_ice_candidate
pub type SetCallback = Box<dyn FnOnce(Result<(), String>) + Send>;

pub type StatsCallback = Box<dyn FnOnce(StatsReport) + Send>;

// ============================================================================
// CONNECTION
// ============================================================================

/// Eine live Verbindung der Media Engine (der `connectionHandle`)
pub trait MediaConnection: Send + Sync {
    fn create_offer(&self, constraints: &MediaConstraints, done: CreateSdpCallback);

    fn create_answer(&self, constraints: &MediaConstraints, done: CreateSdpCallback);

    fn set_local_description(&self, desc: SessionDescription, done: SetCallback);

    fn set_remote_description(&self, desc: SessionDescription, done: SetCallback);

    fn add_ice_candidate(&self, candidate: IceCandidate, done: SetCallback);

    fn get_stats(&self, done: StatsCallback);

    /// Schließt die Verbindung, fire-and-forget
    fn close(&self);
}

/// Erstellt Verbindungen für eine Rolle
#[async_trait]
pub trait MediaEngineFactory: Send + Sync {
    async fn create_connection(
        &self,
        role: PeerRole,
        observer: EngineObserver,
    ) -> Result<Arc<dyn MediaConnection>, PeerError>;
}

/// Steuerung der lokalen Capture-Quellen
pub trait LocalMediaPort: Send + Sync {
    fn set_camera_enabled(&self, enabled: bool);

    fn set_microphone_enabled(&self, enabled: bool);

    fn flip_camera(&self);
}

// ============================================================================
// OBSERVER
// ============================================================================

/// Events, die die Media Engine an eine Verbindung meldet
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    IceCandidate(IceCandidate),
    TrackAdded(RemoteTrack),
    RenegotiationNeeded,
    ConnectionStateChanged(ConnectionState),
}

/// Rückkanal von der Media Engine zur Negotiation Engine.
///
/// Hält nur eine schwache Referenz, damit Verbindung und Engine sich
/// nicht gegenseitig am Leben halten.
#[derive(Clone)]
pub struct EngineObserver {
    peer: Weak<PeerConnection>,
}

impl EngineObserver {
    pub fn for_peer(peer: &Arc<PeerConnection>) -> Self {
        Self {
            peer: Arc::downgrade(peer),
        }
    }

    /// Leitet ein Event weiter; nach dem Teardown der Session ein No-op
    pub fn notify(&self, event: EngineEvent) {
        match self.peer.upgrade() {
            Some(peer) => peer.on_engine_event(event),
            None => tracing::trace!("Dropping engine event for released peer: {:?}", event),
        }
    }
}

impl std::fmt::Debug for EngineObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineObserver")
            .field("alive", &(self.peer.strong_count() > 0))
            .finish()
    }
}
