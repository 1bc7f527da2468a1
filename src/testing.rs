//! In-Memory Fakes für Media Engine, lokale Medien und System-Audio
//!
//! Completion-Callbacks werden synchron aufgerufen, außer ein
//! zurückgehaltenes set_remote_description (`defer_set_remote`).

use crate::audio::{AudioMode, SystemAudioPort};
use crate::peer::{
    CreateSdpCallback, CreateSdpResult, EngineObserver, IceCandidate, LocalMediaPort,
    MediaConnection, MediaConstraints, MediaEngineFactory, PeerError, PeerRole, SetCallback,
    SessionDescription, StatsCallback, StatsReport,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

// ============================================================================
// MEDIA CONNECTION
// ============================================================================

#[derive(Default)]
struct ConnectionLog {
    offers: VecDeque<CreateSdpResult>,
    answers: VecDeque<CreateSdpResult>,
    set_local_error: Option<String>,
    set_remote_error: Option<String>,
    defer_set_remote: bool,
    deferred_remote: Option<(SessionDescription, SetCallback)>,
    failing_candidates: Vec<String>,
    local: Vec<SessionDescription>,
    remote: Vec<SessionDescription>,
    applied: Vec<IceCandidate>,
    offer_constraints: Vec<MediaConstraints>,
    stats_requests: usize,
    closed: bool,
}

#[derive(Default)]
pub(crate) struct FakeMediaConnection {
    log: Mutex<ConnectionLog>,
}

impl FakeMediaConnection {
    /// Nächstes Ergebnis von create_offer; ohne Skript gibt es ein Offer
    pub fn script_offer(&self, result: CreateSdpResult) {
        self.log.lock().offers.push_back(result);
    }

    pub fn script_answer(&self, result: CreateSdpResult) {
        self.log.lock().answers.push_back(result);
    }

    pub fn fail_set_local(&self, message: &str) {
        self.log.lock().set_local_error = Some(message.to_string());
    }

    pub fn fail_set_remote(&self, message: &str) {
        self.log.lock().set_remote_error = Some(message.to_string());
    }

    /// Hält das nächste set_remote_description bis `complete_set_remote` an
    pub fn defer_set_remote(&self) {
        self.log.lock().defer_set_remote = true;
    }

    pub fn has_pending_remote(&self) -> bool {
        self.log.lock().deferred_remote.is_some()
    }

    /// Schließt das angehaltene set_remote_description erfolgreich ab
    pub fn complete_set_remote(&self) {
        let deferred = self.log.lock().deferred_remote.take();
        if let Some((desc, done)) = deferred {
            self.log.lock().remote.push(desc);
            done(Ok(()));
        }
    }

    pub fn fail_candidate(&self, candidate: &str) {
        self.log.lock().failing_candidates.push(candidate.to_string());
    }

    pub fn local_descriptions(&self) -> Vec<SessionDescription> {
        self.log.lock().local.clone()
    }

    pub fn remote_descriptions(&self) -> Vec<SessionDescription> {
        self.log.lock().remote.clone()
    }

    pub fn applied_candidates(&self) -> Vec<IceCandidate> {
        self.log.lock().applied.clone()
    }

    pub fn offer_constraints(&self) -> Vec<MediaConstraints> {
        self.log.lock().offer_constraints.clone()
    }

    pub fn stats_requests(&self) -> usize {
        self.log.lock().stats_requests
    }

    pub fn is_closed(&self) -> bool {
        self.log.lock().closed
    }
}

impl MediaConnection for FakeMediaConnection {
    fn create_offer(&self, constraints: &MediaConstraints, done: CreateSdpCallback) {
        let result = {
            let mut log = self.log.lock();
            log.offer_constraints.push(*constraints);
            log.offers
                .pop_front()
                .unwrap_or_else(|| Ok(Some(SessionDescription::offer("v=0\r\nfake-offer"))))
        };
        done(result);
    }

    fn create_answer(&self, _constraints: &MediaConstraints, done: CreateSdpCallback) {
        let result = self
            .log
            .lock()
            .answers
            .pop_front()
            .unwrap_or_else(|| Ok(Some(SessionDescription::answer("v=0\r\nfake-answer"))));
        done(result);
    }

    fn set_local_description(&self, desc: SessionDescription, done: SetCallback) {
        let result = {
            let mut log = self.log.lock();
            match log.set_local_error.clone() {
                Some(error) => Err(error),
                None => {
                    log.local.push(desc);
                    Ok(())
                }
            }
        };
        done(result);
    }

    fn set_remote_description(&self, desc: SessionDescription, done: SetCallback) {
        let result = {
            let mut log = self.log.lock();
            if log.defer_set_remote {
                log.defer_set_remote = false;
                log.deferred_remote = Some((desc, done));
                return;
            }
            match log.set_remote_error.clone() {
                Some(error) => Err(error),
                None => {
                    log.remote.push(desc);
                    Ok(())
                }
            }
        };
        done(result);
    }

    fn add_ice_candidate(&self, candidate: IceCandidate, done: SetCallback) {
        let result = {
            let mut log = self.log.lock();
            if log.failing_candidates.contains(&candidate.candidate) {
                Err(format!("rejected {}", candidate.candidate))
            } else {
                log.applied.push(candidate);
                Ok(())
            }
        };
        done(result);
    }

    fn get_stats(&self, done: StatsCallback) {
        self.log.lock().stats_requests += 1;
        let mut entries = serde_json::Map::new();
        entries.insert("transport".into(), serde_json::json!({ "bytesSent": 0 }));
        done(StatsReport::new(entries));
    }

    fn close(&self) {
        self.log.lock().closed = true;
    }
}

// ============================================================================
// ENGINE FACTORY
// ============================================================================

#[derive(Default)]
pub(crate) struct FakeEngineFactory {
    connections: Mutex<HashMap<PeerRole, Arc<FakeMediaConnection>>>,
    observers: Mutex<HashMap<PeerRole, EngineObserver>>,
    fail_with: Mutex<Option<PeerError>>,
}

impl FakeEngineFactory {
    pub fn connection(&self, role: PeerRole) -> Option<Arc<FakeMediaConnection>> {
        self.connections.lock().get(&role).cloned()
    }

    pub fn observer(&self, role: PeerRole) -> Option<EngineObserver> {
        self.observers.lock().get(&role).cloned()
    }

    pub fn fail_with(&self, error: PeerError) {
        *self.fail_with.lock() = Some(error);
    }
}

#[async_trait]
impl MediaEngineFactory for FakeEngineFactory {
    async fn create_connection(
        &self,
        role: PeerRole,
        observer: EngineObserver,
    ) -> Result<Arc<dyn MediaConnection>, PeerError> {
        if let Some(error) = self.fail_with.lock().clone() {
            return Err(error);
        }

        let connection = Arc::new(FakeMediaConnection::default());
        self.connections.lock().insert(role, Arc::clone(&connection));
        self.observers.lock().insert(role, observer);
        Ok(connection)
    }
}

// ============================================================================
// LOCAL MEDIA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MediaCall {
    Camera(bool),
    Microphone(bool),
    Flip,
}

#[derive(Default)]
pub(crate) struct FakeLocalMedia {
    calls: Mutex<Vec<MediaCall>>,
}

impl FakeLocalMedia {
    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.lock().clone()
    }
}

impl LocalMediaPort for FakeLocalMedia {
    fn set_camera_enabled(&self, enabled: bool) {
        self.calls.lock().push(MediaCall::Camera(enabled));
    }

    fn set_microphone_enabled(&self, enabled: bool) {
        self.calls.lock().push(MediaCall::Microphone(enabled));
    }

    fn flip_camera(&self) {
        self.calls.lock().push(MediaCall::Flip);
    }
}

// ============================================================================
// SYSTEM AUDIO
// ============================================================================

/// Schreibende Aufrufe auf den System Audio Port
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AudioCall {
    SetMuted(bool),
    RequestFocus,
    SetMode(AudioMode),
    SetSpeakerphone(bool),
    AbandonFocus,
}

#[derive(Default)]
struct AudioLog {
    earpiece: bool,
    speakerphone: bool,
    wired: bool,
    bluetooth: Option<String>,
    mode: AudioMode,
    muted: bool,
    speaker_on: bool,
    presence_queries: usize,
    calls: Vec<AudioCall>,
}

#[derive(Default)]
pub(crate) struct FakeAudioPort {
    log: Mutex<AudioLog>,
}

impl FakeAudioPort {
    /// Telefon mit Earpiece und Lautsprecher
    pub fn phone() -> Self {
        Self {
            log: Mutex::new(AudioLog {
                earpiece: true,
                speakerphone: true,
                ..Default::default()
            }),
        }
    }

    pub fn set_bluetooth(&self, name: Option<&str>) {
        self.log.lock().bluetooth = name.map(str::to_string);
    }

    pub fn set_wired(&self, attached: bool) {
        self.log.lock().wired = attached;
    }

    /// Verfügbarkeit des Lautsprechers, nicht dessen Zustand
    pub fn set_speakerphone(&self, available: bool) {
        self.log.lock().speakerphone = available;
    }

    /// Setzt den Systemzustand, ohne ihn als Aufruf zu protokollieren
    pub fn preset(&self, mode: AudioMode, muted: bool, speaker_on: bool) {
        let mut log = self.log.lock();
        log.mode = mode;
        log.muted = muted;
        log.speaker_on = speaker_on;
    }

    pub fn presence_queries(&self) -> usize {
        self.log.lock().presence_queries
    }

    pub fn calls(&self) -> Vec<AudioCall> {
        self.log.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().calls.clear();
    }
}

impl SystemAudioPort for FakeAudioPort {
    fn has_earpiece(&self) -> bool {
        let mut log = self.log.lock();
        log.presence_queries += 1;
        log.earpiece
    }

    fn has_speakerphone(&self) -> bool {
        let mut log = self.log.lock();
        log.presence_queries += 1;
        log.speakerphone
    }

    fn bluetooth_headset(&self) -> Option<String> {
        let mut log = self.log.lock();
        log.presence_queries += 1;
        log.bluetooth.clone()
    }

    fn is_wired_headset_attached(&self) -> bool {
        let mut log = self.log.lock();
        log.presence_queries += 1;
        log.wired
    }

    fn audio_mode(&self) -> AudioMode {
        self.log.lock().mode
    }

    fn set_audio_mode(&self, mode: AudioMode) {
        let mut log = self.log.lock();
        log.mode = mode;
        log.calls.push(AudioCall::SetMode(mode));
    }

    fn is_microphone_muted(&self) -> bool {
        self.log.lock().muted
    }

    fn set_microphone_muted(&self, muted: bool) {
        let mut log = self.log.lock();
        log.muted = muted;
        log.calls.push(AudioCall::SetMuted(muted));
    }

    fn is_speakerphone_on(&self) -> bool {
        self.log.lock().speaker_on
    }

    fn set_speakerphone_on(&self, on: bool) {
        let mut log = self.log.lock();
        log.speaker_on = on;
        log.calls.push(AudioCall::SetSpeakerphone(on));
    }

    fn request_audio_focus(&self) -> bool {
        self.log.lock().calls.push(AudioCall::RequestFocus);
        true
    }

    fn abandon_audio_focus(&self) {
        self.log.lock().calls.push(AudioCall::AbandonFocus);
    }
}
