//! Peer Negotiation Engine
//!
//! Eine [`PeerConnection`] führt die Offer/Answer-Verhandlung für genau
//! eine Verbindung der Media Engine. ICE Candidates, die vor der Remote
//! Description eintreffen, werden gepuffert und nach dem Setzen der
//! Remote Description in Eingangsreihenfolge angewendet.

use super::completion::{create_value, set_value};
use super::error::PeerError;
use super::port::{EngineEvent, EngineObserver, MediaConnection, MediaEngineFactory};
use super::sdp::munge_description;
use super::types::{
    ConnectionState, IceCandidate, MediaConstraints, PeerRole, RemoteTrack, SessionDescription,
    StatsReport,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

/// Abstand zwischen zwei Stats-Samples
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(10);

// ============================================================================
// PEER EVENTS
// ============================================================================

/// Events, die eine Verbindung an ihren Besitzer weiterreicht
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    IceCandidate {
        role: PeerRole,
        candidate: IceCandidate,
    },
    TrackAdded {
        role: PeerRole,
        track: RemoteTrack,
    },
    RenegotiationNeeded {
        role: PeerRole,
    },
    ConnectionStateChanged {
        role: PeerRole,
        state: ConnectionState,
    },
}

impl PeerEvent {
    pub fn role(&self) -> PeerRole {
        match self {
            PeerEvent::IceCandidate { role, .. }
            | PeerEvent::TrackAdded { role, .. }
            | PeerEvent::RenegotiationNeeded { role }
            | PeerEvent::ConnectionStateChanged { role, .. } => *role,
        }
    }
}

// ============================================================================
// CANDIDATE QUEUE
// ============================================================================

/// Alles, was unter dem Candidate-Lock steht
#[derive(Debug, Default)]
struct CandidateQueue {
    remote_description_set: bool,
    pending: Vec<IceCandidate>,
}

// ============================================================================
// PEER CONNECTION
// ============================================================================

pub struct PeerConnection {
    role: PeerRole,
    constraints: MediaConstraints,
    connection: OnceCell<Arc<dyn MediaConnection>>,
    candidates: AsyncMutex<CandidateQueue>,
    stats_interval: Duration,
    stats_task: Mutex<Option<JoinHandle<()>>>,
    stats_tx: Arc<watch::Sender<Option<StatsReport>>>,
    events: mpsc::UnboundedSender<PeerEvent>,
}

impl PeerConnection {
    /// Erstellt eine noch nicht initialisierte Verbindung
    pub fn new(
        role: PeerRole,
        constraints: MediaConstraints,
        stats_interval: Duration,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Self {
        let (stats_tx, _) = watch::channel(None);
        tracing::info!(role = %role, ?constraints, "Peer connection created");

        Self {
            role,
            constraints,
            connection: OnceCell::new(),
            candidates: AsyncMutex::new(CandidateQueue::default()),
            stats_interval,
            stats_task: Mutex::new(None),
            stats_tx: Arc::new(stats_tx),
            events,
        }
    }

    /// Erstellt die Verbindung und lässt die Media Engine das Handle bauen
    pub async fn create(
        factory: &dyn MediaEngineFactory,
        role: PeerRole,
        constraints: MediaConstraints,
        stats_interval: Duration,
        events: mpsc::UnboundedSender<PeerEvent>,
    ) -> Result<Arc<Self>, PeerError> {
        let peer = Arc::new(Self::new(role, constraints, stats_interval, events));
        let connection = factory
            .create_connection(role, EngineObserver::for_peer(&peer))
            .await?;
        peer.initialize(connection)?;
        Ok(peer)
    }

    /// Setzt das Connection-Handle, genau einmal
    pub fn initialize(&self, connection: Arc<dyn MediaConnection>) -> Result<(), PeerError> {
        self.connection
            .set(connection)
            .map_err(|_| PeerError::AlreadyInitialized)?;
        tracing::debug!(role = %self.role, "Peer connection initialized");
        Ok(())
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    // ========================================================================
    // SDP
    // ========================================================================

    /// Erstellt ein SDP Offer
    pub async fn create_offer(&self) -> Result<SessionDescription, PeerError> {
        let connection = self.connection()?;
        tracing::debug!(role = %self.role, "Creating offer");
        let constraints = self.constraints;
        create_value(|done| connection.create_offer(&constraints, done)).await
    }

    /// Erstellt ein SDP Answer
    pub async fn create_answer(&self) -> Result<SessionDescription, PeerError> {
        let connection = self.connection()?;
        tracing::debug!(role = %self.role, "Creating answer");
        let constraints = self.constraints;
        create_value(|done| connection.create_answer(&constraints, done)).await
    }

    /// Setzt die lokale Description (nach Codec-Rewrite)
    pub async fn set_local_description(&self, desc: &SessionDescription) -> Result<(), PeerError> {
        let connection = self.connection()?;
        let munged = munge_description(desc);
        tracing::debug!(role = %self.role, sdp_type = ?munged.sdp_type, "Setting local description");
        set_value(|done| connection.set_local_description(munged, done)).await
    }

    /// Setzt die Remote Description und wendet gepufferte Candidates an
    ///
    /// Ein gepufferter Candidate, der nicht angewendet werden kann, wird
    /// geloggt und verworfen; der Rest des Puffers läuft trotzdem durch.
    pub async fn set_remote_description(
        &self,
        desc: &SessionDescription,
    ) -> Result<(), PeerError> {
        let connection = self.connection()?;
        let munged = munge_description(desc);
        tracing::debug!(role = %self.role, sdp_type = ?munged.sdp_type, "Setting remote description");
        set_value(|done| connection.set_remote_description(munged, done)).await?;

        let mut queue = self.candidates.lock().await;
        let pending = std::mem::take(&mut queue.pending);
        if !pending.is_empty() {
            tracing::info!(role = %self.role, count = pending.len(), "Applying pending ICE candidates");
        }
        for candidate in pending {
            let label = candidate.candidate.clone();
            if let Err(e) = set_value(|done| connection.add_ice_candidate(candidate, done)).await {
                tracing::warn!(role = %self.role, candidate = %label, "Dropping pending ICE candidate: {}", e);
            }
        }
        queue.remote_description_set = true;

        Ok(())
    }

    // ========================================================================
    // ICE
    // ========================================================================

    /// Wendet einen Candidate an oder puffert ihn
    ///
    /// Ohne Remote Description landet der Candidate im Puffer und die
    /// Methode gibt [`PeerError::RemoteDescriptionPending`] zurück. Das ist
    /// kein Fehler, der Candidate wird später angewendet.
    pub async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), PeerError> {
        let connection = self.connection()?;
        let mut queue = self.candidates.lock().await;

        if !queue.remote_description_set {
            tracing::warn!(role = %self.role, candidate = %candidate.candidate, "ICE candidate postponed, no remote description");
            queue.pending.push(candidate);
            return Err(PeerError::RemoteDescriptionPending);
        }

        tracing::debug!(role = %self.role, candidate = %candidate.candidate, "Adding ICE candidate");
        let result = set_value(|done| connection.add_ice_candidate(candidate, done)).await;
        drop(queue);
        result
    }

    /// Gibt zurück, ob die Remote Description gesetzt ist
    pub async fn has_remote_description(&self) -> bool {
        self.candidates.lock().await.remote_description_set
    }

    /// Anzahl gepufferter Candidates
    pub async fn pending_candidate_count(&self) -> usize {
        self.candidates.lock().await.pending.len()
    }

    // ========================================================================
    // STATS
    // ========================================================================

    /// Letztes Stats-Sample; `None` bis zum ersten Sample
    pub fn get_stats(&self) -> watch::Receiver<Option<StatsReport>> {
        self.stats_tx.subscribe()
    }

    pub fn is_stats_running(&self) -> bool {
        self.stats_task
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    fn start_stats(&self) {
        let Some(connection) = self.connection.get().cloned() else {
            tracing::warn!(role = %self.role, "Connected before initialization, no stats");
            return;
        };

        let stats_tx = Arc::clone(&self.stats_tx);
        let interval = self.stats_interval;
        let role = self.role;

        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let (tx, rx) = oneshot::channel();
                connection.get_stats(Box::new(move |report| {
                    let _ = tx.send(report);
                }));

                match rx.await {
                    Ok(report) => {
                        tracing::trace!(role = %role, entries = report.entries.len(), "Stats sampled");
                        stats_tx.send_replace(Some(report));
                    }
                    Err(_) => tracing::debug!(role = %role, "Stats callback dropped"),
                }
            }
        });

        // Höchstens ein Stats-Task pro Verbindung
        if let Some(previous) = self.stats_task.lock().replace(task) {
            previous.abort();
        }
    }

    fn stop_stats(&self) {
        if let Some(task) = self.stats_task.lock().take() {
            task.abort();
            tracing::debug!(role = %self.role, "Stats task cancelled");
        }
    }

    // ========================================================================
    // ENGINE EVENTS
    // ========================================================================

    /// Verarbeitet ein Event der Media Engine.
    ///
    /// Muss innerhalb einer Tokio-Runtime aufgerufen werden, da ein
    /// Wechsel auf `Connected` den Stats-Task startet.
    pub fn on_engine_event(&self, event: EngineEvent) {
        let role = self.role;
        let event = match event {
            EngineEvent::IceCandidate(candidate) => {
                tracing::info!(role = %role, candidate = %candidate.candidate, "Local ICE candidate");
                PeerEvent::IceCandidate { role, candidate }
            }
            EngineEvent::TrackAdded(track) => {
                tracing::info!(role = %role, track_id = %track.track_id, kind = ?track.kind, "Remote track added");
                PeerEvent::TrackAdded { role, track }
            }
            EngineEvent::RenegotiationNeeded => {
                tracing::info!(role = %role, "Renegotiation needed");
                PeerEvent::RenegotiationNeeded { role }
            }
            EngineEvent::ConnectionStateChanged(state) => {
                tracing::info!(role = %role, ?state, "Connection state changed");
                if state == ConnectionState::Connected {
                    self.start_stats();
                } else if state.is_terminal() {
                    self.stop_stats();
                }
                PeerEvent::ConnectionStateChanged { role, state }
            }
        };

        if self.events.send(event).is_err() {
            tracing::debug!(role = %role, "No receiver for peer events");
        }
    }

    /// Stoppt Stats und schließt die Verbindung der Media Engine
    pub fn close(&self) {
        self.stop_stats();
        if let Some(connection) = self.connection.get() {
            connection.close();
        }
        tracing::info!(role = %self.role, "Peer connection closed");
    }

    fn connection(&self) -> Result<Arc<dyn MediaConnection>, PeerError> {
        self.connection
            .get()
            .cloned()
            .ok_or(PeerError::NotInitialized)
    }
}

impl Drop for PeerConnection {
    fn drop(&mut self) {
        if let Some(task) = self.stats_task.get_mut().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerConnection")
            .field("role", &self.role)
            .field("constraints", &self.constraints)
            .field("initialized", &self.connection.get().is_some())
            .field("stats_running", &self.is_stats_running())
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
