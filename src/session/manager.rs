//! Session Orchestrator
//!
//! Der [`SessionManager`] verbindet zwei Peer Connections (Publisher und
//! Subscriber), das Audio-Routing und die lokalen Capture-Quellen mit dem
//! Signaling Port. Eigenen Zustand hat er nur für die veröffentlichten
//! Observables.
//!
//! Rollen-Zuordnung: ausgehende Nachrichten tragen die lokale Rolle des
//! Absenders, eine eingehende Nachricht mit Rolle R verarbeitet die lokale
//! Verbindung `R.counterpart()`.

use super::error::SessionError;
use super::state::{CallMediaState, SessionEvent, SessionState};
use crate::audio::{AudioDevice, AudioDeviceChangeListener, AudioSwitch, SystemAudioPort};
use crate::config::CallConfig;
use crate::peer::{
    munge_description, LocalMediaPort, MediaConstraints, MediaEngineFactory, PeerConnection,
    PeerError, PeerEvent, PeerRole, RemoteTrack, SdpType, SessionDescription, StatsReport,
    TrackKind,
};
use crate::signaling::SignalingMessage;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

pub struct SessionManager {
    session_id: Uuid,
    config: CallConfig,
    publisher: Arc<PeerConnection>,
    subscriber: Arc<PeerConnection>,
    audio: AudioSwitch,
    local_media: Arc<dyn LocalMediaPort>,
    signaling: mpsc::Sender<SignalingMessage>,
    peer_events: Mutex<Option<mpsc::UnboundedReceiver<PeerEvent>>>,
    run_task: Mutex<Option<JoinHandle<()>>>,
    session_state: watch::Sender<SessionState>,
    media_state: watch::Sender<CallMediaState>,
    remote_video_track: watch::Sender<Option<RemoteTrack>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Baut beide Verbindungen und das Audio-Routing auf
    pub async fn new(
        config: CallConfig,
        engine: &dyn MediaEngineFactory,
        audio_port: Arc<dyn SystemAudioPort>,
        local_media: Arc<dyn LocalMediaPort>,
        signaling: mpsc::Sender<SignalingMessage>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let audio = AudioSwitch::new(audio_port, &config.audio_preference)?;

        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        let constraints = MediaConstraints::default();
        let publisher = PeerConnection::create(
            engine,
            PeerRole::Publisher,
            constraints,
            config.stats_interval(),
            peer_tx.clone(),
        )
        .await?;
        let subscriber = PeerConnection::create(
            engine,
            PeerRole::Subscriber,
            constraints,
            config.stats_interval(),
            peer_tx,
        )
        .await?;

        let session_id = Uuid::new_v4();
        tracing::info!(%session_id, "Session created");

        let (session_state, _) = watch::channel(SessionState::Offline);
        let (media_state, _) = watch::channel(CallMediaState::default());
        let (remote_video_track, _) = watch::channel(None);
        let (events, _) = broadcast::channel(100);

        Ok(Self {
            session_id,
            config,
            publisher,
            subscriber,
            audio,
            local_media,
            signaling,
            peer_events: Mutex::new(Some(peer_rx)),
            run_task: Mutex::new(None),
            session_state,
            media_state,
            remote_video_track,
            events,
        })
    }

    /// Startet die Event-Schleife für eingehende Signaling-Nachrichten und
    /// Peer Events
    pub fn spawn(
        self: &Arc<Self>,
        mut inbound: mpsc::Receiver<SignalingMessage>,
    ) -> Result<(), SessionError> {
        let mut peer_events = self
            .peer_events
            .lock()
            .take()
            .ok_or(SessionError::AlreadyRunning)?;

        let manager = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = inbound.recv() => match msg {
                        Some(msg) => {
                            if let Err(e) = manager.handle_signaling(msg).await {
                                tracing::warn!(session_id = %manager.session_id, "Failed to handle signaling message: {}", e);
                            }
                        }
                        None => {
                            tracing::info!(session_id = %manager.session_id, "Inbound signaling closed");
                            break;
                        }
                    },
                    event = peer_events.recv() => match event {
                        Some(event) => {
                            if let Err(e) = manager.handle_peer_event(event).await {
                                tracing::warn!(session_id = %manager.session_id, "Failed to handle peer event: {}", e);
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        *self.run_task.lock() = Some(task);
        Ok(())
    }

    // ========================================================================
    // SIGNALING
    // ========================================================================

    /// Verarbeitet eine eingehende Nachricht des Signaling Ports
    pub async fn handle_signaling(&self, msg: SignalingMessage) -> Result<(), SessionError> {
        let role = msg.target_role();
        let peer = self.peer(role);

        let remote = match msg {
            SignalingMessage::IceCandidate { candidate, .. } => {
                return match peer.add_ice_candidate(candidate).await {
                    Err(e) if e.is_deferred() => {
                        tracing::debug!(role = %role, "Remote ICE candidate buffered");
                        Ok(())
                    }
                    result => Ok(result?),
                };
            }
            other => other.session_description(),
        };
        let Some(remote) = remote else {
            return Ok(());
        };

        tracing::info!(role = %role, sdp_type = ?remote.sdp_type, "Received remote description");
        peer.set_remote_description(&remote).await?;

        if remote.sdp_type == SdpType::Offer {
            let answer = peer.create_answer().await?;
            peer.set_local_description(&answer).await?;
            self.send(outbound(role, &answer)?).await?;
        }

        Ok(())
    }

    async fn send(&self, msg: SignalingMessage) -> Result<(), SessionError> {
        self.signaling
            .send(msg)
            .await
            .map_err(|_| SessionError::SignalingClosed)
    }

    // ========================================================================
    // PEER EVENTS
    // ========================================================================

    /// Reagiert auf ein Event einer der beiden Verbindungen
    pub async fn handle_peer_event(&self, event: PeerEvent) -> Result<(), SessionError> {
        match event {
            PeerEvent::IceCandidate { role, candidate } => {
                self.send(SignalingMessage::IceCandidate { role, candidate })
                    .await?;
            }
            PeerEvent::TrackAdded { role, track } => match track.kind {
                TrackKind::Video => {
                    tracing::info!(role = %role, track_id = %track.track_id, "Remote video track available");
                    self.remote_video_track.send_replace(Some(track));
                }
                TrackKind::Audio => {
                    tracing::debug!(role = %role, track_id = %track.track_id, "Remote audio track added");
                }
            },
            PeerEvent::RenegotiationNeeded { role } => self.renegotiate(role).await?,
            PeerEvent::ConnectionStateChanged { role, state } => {
                let _ = self
                    .events
                    .send(SessionEvent::ConnectionStateChanged { role, state });
            }
        }

        Ok(())
    }

    /// Neues Offer erstellen, lokal setzen und senden
    ///
    /// Bis zu `negotiation_attempts` Versuche; danach wird
    /// [`SessionEvent::ConnectionFailed`] gemeldet.
    async fn renegotiate(&self, role: PeerRole) -> Result<(), SessionError> {
        let attempts = self.config.negotiation_attempts.max(1);
        let mut last_error = PeerError::EmptyResult;

        for attempt in 1..=attempts {
            match self.send_offer(role).await {
                Ok(()) => return Ok(()),
                Err(SessionError::Peer(e)) => {
                    tracing::warn!(role = %role, attempt, attempts, "Renegotiation failed: {}", e);
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::error!(role = %role, "Giving up renegotiation: {}", last_error);
        let _ = self.events.send(SessionEvent::ConnectionFailed {
            role,
            error: last_error.to_string(),
        });
        Err(last_error.into())
    }

    async fn send_offer(&self, role: PeerRole) -> Result<(), SessionError> {
        let peer = self.peer(role);
        let offer = peer.create_offer().await?;
        peer.set_local_description(&offer).await?;
        self.send(outbound(role, &offer)?).await
    }

    // ========================================================================
    // CALL LIFECYCLE
    // ========================================================================

    /// Call-Screen ist sichtbar: Audio-Routing starten und lokale Medien
    /// auf den aktuellen Stand bringen
    pub fn on_session_screen_ready(&self) {
        let events = self.events.clone();
        let listener: AudioDeviceChangeListener =
            Arc::new(move |devices: &[AudioDevice], selected: Option<&AudioDevice>| {
            let _ = events.send(SessionEvent::AudioDevicesChanged {
                devices: devices.to_vec(),
                selected: selected.cloned(),
            });
        });
        self.audio.start(listener);

        let media = *self.media_state.borrow();
        self.local_media.set_camera_enabled(media.camera_enabled);
        self.local_media.set_microphone_enabled(media.microphone_enabled);
        tracing::info!(session_id = %self.session_id, "Session screen ready");
    }

    /// Veröffentlicht den vom Aufrufer abgeleiteten Session State
    ///
    /// Beim Wechsel nach `Active` wird das Audio-Routing aktiviert, beim
    /// Verlassen von `Active` deaktiviert.
    pub fn publish_session_state(&self, state: SessionState) -> Result<(), SessionError> {
        let previous = *self.session_state.borrow();

        // Erst aktivieren, dann veröffentlichen: schlägt die Aktivierung
        // fehl, bleibt der alte Zustand sichtbar
        match (previous == SessionState::Active, state == SessionState::Active) {
            (false, true) => self.audio.activate()?,
            (true, false) => self.audio.deactivate(),
            _ => {}
        }

        self.session_state.send_replace(state);
        tracing::info!(?previous, ?state, "Session state published");
        Ok(())
    }

    /// Beendet den Anruf und gibt alle Ressourcen frei
    ///
    /// Braucht keinen Tokio-Kontext; die Verbindungen schließen auf der
    /// Runtime, auf der sie erstellt wurden.
    pub fn disconnect(&self) {
        if let Some(task) = self.run_task.lock().take() {
            task.abort();
        }

        self.audio.stop();
        self.publisher.close();
        self.subscriber.close();
        self.remote_video_track.send_replace(None);
        self.session_state.send_replace(SessionState::Offline);
        tracing::info!(session_id = %self.session_id, "Session disconnected");
    }

    // ========================================================================
    // LOCAL MEDIA
    // ========================================================================

    pub fn enable_camera(&self, enabled: bool) {
        self.media_state.send_modify(|m| m.camera_enabled = enabled);
        self.local_media.set_camera_enabled(enabled);
    }

    pub fn enable_microphone(&self, enabled: bool) {
        self.media_state.send_modify(|m| m.microphone_enabled = enabled);
        self.local_media.set_microphone_enabled(enabled);
    }

    pub fn flip_camera(&self) {
        self.media_state.send_modify(|m| m.front_camera = !m.front_camera);
        self.local_media.flip_camera();
    }

    /// Wählt ein Audio-Gerät aus, `None` kehrt zur Präferenzreihenfolge zurück
    pub fn select_audio_device(&self, device: Option<AudioDevice>) {
        self.audio.select_device(device);
    }

    // ========================================================================
    // OBSERVABLES
    // ========================================================================

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn peer(&self, role: PeerRole) -> &Arc<PeerConnection> {
        match role {
            PeerRole::Publisher => &self.publisher,
            PeerRole::Subscriber => &self.subscriber,
        }
    }

    pub fn audio(&self) -> &AudioSwitch {
        &self.audio
    }

    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.session_state.subscribe()
    }

    pub fn media_state(&self) -> CallMediaState {
        *self.media_state.borrow()
    }

    pub fn remote_video_track(&self) -> watch::Receiver<Option<RemoteTrack>> {
        self.remote_video_track.subscribe()
    }

    pub fn stats(&self, role: PeerRole) -> watch::Receiver<Option<StatsReport>> {
        self.peer(role).get_stats()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.run_task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

/// Ausgehende Nachricht mit derselben Codec-Schreibweise wie lokal gesetzt
fn outbound(role: PeerRole, desc: &SessionDescription) -> Result<SignalingMessage, SessionError> {
    SignalingMessage::from_description(role, &munge_description(desc)).ok_or_else(|| {
        PeerError::NegotiationFailed(format!("cannot signal {:?} description", desc.sdp_type)).into()
    })
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session_id", &self.session_id)
            .field("session_state", &*self.session_state.borrow())
            .field("publisher", &self.publisher)
            .field("subscriber", &self.subscriber)
            .field("audio", &self.audio)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
