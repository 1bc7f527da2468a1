//! Audio Routing Engine
//!
//! [`AudioSwitch`] verwaltet die Geräteauswahl und den Audio-Zustand über
//! den Lebenszyklus eines Anrufs:
//!
//! ```text
//! Stopped --start--> Started --activate--> Activated
//!    ^                  |  ^                   |
//!    +------stop--------+  +----deactivate-----+
//! ```
//!
//! Die ausgewählte Route ist immer das vom Benutzer gewählte Gerät (falls
//! noch vorhanden) oder das erste verfügbare Gerät in Präferenzreihenfolge.

use super::device::{AudioDevice, AudioDeviceKind};
use super::port::{AudioMode, SavedAudioState, SystemAudioPort};
use super::registry::AudioDeviceRegistry;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Eingebaute Präferenzreihenfolge
pub const DEFAULT_PREFERENCES: [AudioDeviceKind; 4] = [
    AudioDeviceKind::BluetoothHeadset,
    AudioDeviceKind::WiredHeadset,
    AudioDeviceKind::Earpiece,
    AudioDeviceKind::Speakerphone,
];

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioSwitchError {
    #[error("Audio switch must be started before it can be activated")]
    InvalidLifecycleState,

    #[error("Duplicate audio device preference: {0}")]
    DuplicatePreference(AudioDeviceKind),
}

// ============================================================================
// STATE
// ============================================================================

/// Lebenszyklus der Routing Engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioSwitchState {
    Stopped,
    Started,
    Activated,
}

/// Wird bei jeder Änderung der Geräteliste oder Auswahl aufgerufen
pub type AudioDeviceChangeListener =
    Arc<dyn Fn(&[AudioDevice], Option<&AudioDevice>) + Send + Sync>;

struct RoutingState {
    lifecycle: AudioSwitchState,
    registry: AudioDeviceRegistry,
    available: Vec<AudioDevice>,
    user_selected: Option<AudioDevice>,
    selected: Option<AudioDevice>,
    saved: Option<SavedAudioState>,
    listener: Option<AudioDeviceChangeListener>,
}

/// Ausstehende Listener-Benachrichtigung, wird nach dem Lock ausgeliefert
struct DeviceChange {
    listener: AudioDeviceChangeListener,
    devices: Vec<AudioDevice>,
    selected: Option<AudioDevice>,
}

impl DeviceChange {
    fn dispatch(self) {
        (self.listener)(&self.devices, self.selected.as_ref());
    }
}

// ============================================================================
// PREFERENCES
// ============================================================================

/// Baut die effektive Präferenzreihenfolge
///
/// Die übergebene Liste wird als Präfix vor die Standardreihenfolge
/// gesetzt; die übrigen Standardeinträge behalten ihre relative
/// Reihenfolge. Leere Liste oder exakt die Standardreihenfolge ergeben
/// die Standardreihenfolge.
pub fn resolve_preferences(
    preferred: &[AudioDeviceKind],
) -> Result<Vec<AudioDeviceKind>, AudioSwitchError> {
    let mut seen = HashSet::new();
    if let Some(duplicate) = preferred.iter().find(|kind| !seen.insert(**kind)) {
        return Err(AudioSwitchError::DuplicatePreference(*duplicate));
    }

    if preferred.is_empty() || preferred == DEFAULT_PREFERENCES.as_slice() {
        return Ok(DEFAULT_PREFERENCES.to_vec());
    }

    let mut result: Vec<AudioDeviceKind> = DEFAULT_PREFERENCES
        .iter()
        .filter(|kind| !preferred.contains(kind))
        .copied()
        .collect();
    for (index, kind) in preferred.iter().enumerate() {
        result.insert(index, *kind);
    }
    Ok(result)
}

// ============================================================================
// AUDIO SWITCH
// ============================================================================

pub struct AudioSwitch {
    port: Arc<dyn SystemAudioPort>,
    preferences: Vec<AudioDeviceKind>,
    state: Mutex<RoutingState>,
}

impl AudioSwitch {
    /// Erstellt die Routing Engine; schlägt bei doppelten Präferenzen fehl
    pub fn new(
        port: Arc<dyn SystemAudioPort>,
        preferred: &[AudioDeviceKind],
    ) -> Result<Self, AudioSwitchError> {
        let preferences = resolve_preferences(preferred)?;
        tracing::debug!(?preferences, "Audio switch created");

        Ok(Self {
            state: Mutex::new(RoutingState {
                lifecycle: AudioSwitchState::Stopped,
                registry: AudioDeviceRegistry::new(Arc::clone(&port)),
                available: Vec::new(),
                user_selected: None,
                selected: None,
                saved: None,
                listener: None,
            }),
            port,
            preferences,
        })
    }

    /// Installiert den Listener und liest die Geräte ein
    ///
    /// Ist die Engine schon gestartet, wird nur der Listener ersetzt.
    pub fn start(&self, listener: AudioDeviceChangeListener) {
        let change = {
            let mut state = self.state.lock();
            state.listener = Some(listener);
            match state.lifecycle {
                AudioSwitchState::Stopped => {
                    let change = self.enumerate_locked(&mut state);
                    state.lifecycle = AudioSwitchState::Started;
                    tracing::info!("Audio switch started");
                    change
                }
                AudioSwitchState::Started | AudioSwitchState::Activated => None,
            }
        };

        if let Some(change) = change {
            change.dispatch();
        }
    }

    /// Deaktiviert falls nötig und entfernt den Listener
    pub fn stop(&self) {
        let mut state = self.state.lock();
        match state.lifecycle {
            AudioSwitchState::Activated => {
                self.deactivate_locked(&mut state);
                Self::close_listener(&mut state);
            }
            AudioSwitchState::Started => Self::close_listener(&mut state),
            AudioSwitchState::Stopped => {}
        }
    }

    /// Übernimmt das Audio-System für den Anruf
    ///
    /// Sichert Mode/Mute/Speakerphone, hebt Mute auf, fordert Audio Focus
    /// an und routet auf das ausgewählte Gerät. Erneuter Aufruf im
    /// aktivierten Zustand wendet nur das Routing erneut an.
    pub fn activate(&self) -> Result<(), AudioSwitchError> {
        let mut state = self.state.lock();
        self.activate_locked(&mut state)
    }

    /// Stellt den bei `activate()` gesicherten Zustand wieder her
    pub fn deactivate(&self) {
        let mut state = self.state.lock();
        self.deactivate_locked(&mut state);
    }

    /// Setzt (oder löscht mit `None`) die Auswahl des Benutzers
    pub fn select_device(&self, device: Option<AudioDevice>) {
        let change = {
            let mut state = self.state.lock();
            if state.selected == device {
                return;
            }
            tracing::info!(device = ?device, "User selected audio device");
            state.user_selected = device;
            self.enumerate_locked(&mut state)
        };

        if let Some(change) = change {
            change.dispatch();
        }
    }

    /// Liest die Geräte neu ein, z.B. nach einer Hotplug-Meldung des Systems
    pub fn enumerate_devices(&self) {
        let change = {
            let mut state = self.state.lock();
            self.enumerate_locked(&mut state)
        };

        if let Some(change) = change {
            change.dispatch();
        }
    }

    pub fn state(&self) -> AudioSwitchState {
        self.state.lock().lifecycle
    }

    pub fn available_devices(&self) -> Vec<AudioDevice> {
        self.state.lock().available.clone()
    }

    pub fn selected_device(&self) -> Option<AudioDevice> {
        self.state.lock().selected.clone()
    }

    pub fn preferences(&self) -> &[AudioDeviceKind] {
        &self.preferences
    }

    // ========================================================================
    // PRIVATE METHODS
    // ========================================================================

    fn activate_locked(&self, state: &mut RoutingState) -> Result<(), AudioSwitchError> {
        match state.lifecycle {
            AudioSwitchState::Started => {
                state.saved = Some(SavedAudioState {
                    mode: self.port.audio_mode(),
                    microphone_muted: self.port.is_microphone_muted(),
                    speakerphone_on: self.port.is_speakerphone_on(),
                });

                // WebRTC braucht ein offenes Mikrofon
                self.port.set_microphone_muted(false);
                if !self.port.request_audio_focus() {
                    tracing::warn!("Audio focus request was denied");
                }
                self.port.set_audio_mode(AudioMode::InCommunication);

                self.route(state.selected.as_ref());
                state.lifecycle = AudioSwitchState::Activated;
                tracing::info!(selected = ?state.selected, "Audio switch activated");
                Ok(())
            }
            AudioSwitchState::Activated => {
                self.route(state.selected.as_ref());
                Ok(())
            }
            AudioSwitchState::Stopped => Err(AudioSwitchError::InvalidLifecycleState),
        }
    }

    fn deactivate_locked(&self, state: &mut RoutingState) {
        if state.lifecycle != AudioSwitchState::Activated {
            return;
        }

        if let Some(saved) = state.saved.take() {
            self.port.set_audio_mode(saved.mode);
            self.port.set_microphone_muted(saved.microphone_muted);
            self.port.set_speakerphone_on(saved.speakerphone_on);
        }
        self.port.abandon_audio_focus();
        state.lifecycle = AudioSwitchState::Started;
        tracing::info!("Audio switch deactivated");
    }

    fn close_listener(state: &mut RoutingState) {
        state.listener = None;
        state.lifecycle = AudioSwitchState::Stopped;
        tracing::info!("Audio switch stopped");
    }

    fn enumerate_locked(&self, state: &mut RoutingState) -> Option<DeviceChange> {
        let old_devices = std::mem::take(&mut state.available);
        let old_selected = state.selected.clone();

        state.available = state.registry.scan(&self.preferences);

        if let Some(user) = &state.user_selected {
            if !state.available.contains(user) {
                tracing::debug!(device = %user, "User selected device no longer available");
                state.user_selected = None;
            }
        }

        state.selected = state
            .user_selected
            .clone()
            .or_else(|| state.available.first().cloned());

        if state.lifecycle == AudioSwitchState::Activated {
            self.route(state.selected.as_ref());
        }

        if state.available == old_devices && state.selected == old_selected {
            return None;
        }

        tracing::debug!(devices = ?state.available, selected = ?state.selected, "Audio devices changed");
        state.listener.clone().map(|listener| DeviceChange {
            listener,
            devices: state.available.clone(),
            selected: state.selected.clone(),
        })
    }

    /// Der einzige gerätespezifische Effekt: Speakerphone an oder aus
    // TODO: Bluetooth-Routing (nur Speakerphone aus) auf echten Geräten verifizieren
    fn route(&self, device: Option<&AudioDevice>) {
        let Some(device) = device else {
            return;
        };

        let speakerphone = match device {
            AudioDevice::Speakerphone(_) => true,
            AudioDevice::BluetoothHeadset(_)
            | AudioDevice::WiredHeadset(_)
            | AudioDevice::Earpiece(_) => false,
        };
        self.port.set_speakerphone_on(speakerphone);
    }
}

impl std::fmt::Debug for AudioSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AudioSwitch")
            .field("state", &state.lifecycle)
            .field("preferences", &self.preferences)
            .field("available", &state.available)
            .field("selected", &state.selected)
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{AudioCall, FakeAudioPort};

    type Notifications = Arc<Mutex<Vec<(Vec<AudioDevice>, Option<AudioDevice>)>>>;

    fn recording_listener() -> (AudioDeviceChangeListener, Notifications) {
        let seen: Notifications = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: AudioDeviceChangeListener =
            Arc::new(move |devices: &[AudioDevice], selected: Option<&AudioDevice>| {
            sink.lock().push((devices.to_vec(), selected.cloned()));
        });
        (listener, seen)
    }

    fn started_switch(port: &Arc<FakeAudioPort>) -> (AudioSwitch, Notifications) {
        let switch = AudioSwitch::new(port.clone(), &[]).unwrap();
        let (listener, seen) = recording_listener();
        switch.start(listener);
        (switch, seen)
    }

    #[test]
    fn test_speakerphone_preference_is_prefix() {
        assert_eq!(
            resolve_preferences(&[AudioDeviceKind::Speakerphone]).unwrap(),
            vec![
                AudioDeviceKind::Speakerphone,
                AudioDeviceKind::BluetoothHeadset,
                AudioDeviceKind::WiredHeadset,
                AudioDeviceKind::Earpiece,
            ]
        );
    }

    #[test]
    fn test_empty_and_default_preferences() {
        assert_eq!(resolve_preferences(&[]).unwrap(), DEFAULT_PREFERENCES.to_vec());
        assert_eq!(
            resolve_preferences(&DEFAULT_PREFERENCES).unwrap(),
            DEFAULT_PREFERENCES.to_vec()
        );
    }

    #[test]
    fn test_multi_entry_prefix() {
        assert_eq!(
            resolve_preferences(&[AudioDeviceKind::Earpiece, AudioDeviceKind::BluetoothHeadset])
                .unwrap(),
            vec![
                AudioDeviceKind::Earpiece,
                AudioDeviceKind::BluetoothHeadset,
                AudioDeviceKind::WiredHeadset,
                AudioDeviceKind::Speakerphone,
            ]
        );
    }

    #[test]
    fn test_duplicate_preference_fails_before_enumeration() {
        let port = Arc::new(FakeAudioPort::phone());
        let result = AudioSwitch::new(
            port.clone(),
            &[AudioDeviceKind::Earpiece, AudioDeviceKind::Earpiece],
        );

        assert_eq!(
            result.unwrap_err(),
            AudioSwitchError::DuplicatePreference(AudioDeviceKind::Earpiece)
        );
        assert_eq!(port.presence_queries(), 0);
    }

    #[test]
    fn test_start_enumerates_and_notifies() {
        let port = Arc::new(FakeAudioPort::phone());
        let (switch, seen) = started_switch(&port);

        assert_eq!(switch.state(), AudioSwitchState::Started);
        assert_eq!(
            switch.available_devices(),
            vec![AudioDevice::earpiece(), AudioDevice::speakerphone()]
        );
        assert_eq!(switch.selected_device(), Some(AudioDevice::earpiece()));
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_user_selection_overrides_preference() {
        let port = Arc::new(FakeAudioPort::phone());
        let (switch, seen) = started_switch(&port);

        switch.select_device(Some(AudioDevice::speakerphone()));
        assert_eq!(switch.selected_device(), Some(AudioDevice::speakerphone()));
        assert_eq!(seen.lock().len(), 2);

        // Gleiche Auswahl erneut: keine Benachrichtigung
        switch.select_device(Some(AudioDevice::speakerphone()));
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_wired_headset_replaces_earpiece() {
        let port = Arc::new(FakeAudioPort::phone());
        let (switch, seen) = started_switch(&port);
        assert_eq!(switch.selected_device(), Some(AudioDevice::earpiece()));

        port.set_wired(true);
        switch.enumerate_devices();

        assert!(!switch.available_devices().contains(&AudioDevice::earpiece()));
        assert_eq!(switch.selected_device(), Some(AudioDevice::wired_headset()));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1],
            (
                vec![AudioDevice::wired_headset(), AudioDevice::speakerphone()],
                Some(AudioDevice::wired_headset())
            )
        );
    }

    #[test]
    fn test_unchanged_enumeration_is_silent() {
        let port = Arc::new(FakeAudioPort::phone());
        let (switch, seen) = started_switch(&port);

        switch.enumerate_devices();
        switch.enumerate_devices();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_vanished_user_selection_is_cleared() {
        let port = Arc::new(FakeAudioPort::phone());
        port.set_bluetooth(Some("Headset"));
        let (switch, _seen) = started_switch(&port);

        switch.select_device(Some(AudioDevice::speakerphone()));
        port.set_speakerphone(false);
        switch.enumerate_devices();

        assert_eq!(
            switch.selected_device(),
            Some(AudioDevice::bluetooth_headset(Some("Headset")))
        );
    }

    #[test]
    fn test_activate_when_stopped_has_no_side_effects() {
        let port = Arc::new(FakeAudioPort::phone());
        let switch = AudioSwitch::new(port.clone(), &[]).unwrap();

        assert_eq!(
            switch.activate().unwrap_err(),
            AudioSwitchError::InvalidLifecycleState
        );
        assert!(port.calls().is_empty());
        assert_eq!(switch.state(), AudioSwitchState::Stopped);
    }

    #[test]
    fn test_activate_applies_audio_state() {
        let port = Arc::new(FakeAudioPort::phone());
        port.preset(AudioMode::Normal, true, true);
        let (switch, _seen) = started_switch(&port);

        switch.activate().unwrap();

        assert_eq!(switch.state(), AudioSwitchState::Activated);
        assert_eq!(
            port.calls(),
            vec![
                AudioCall::SetMuted(false),
                AudioCall::RequestFocus,
                AudioCall::SetMode(AudioMode::InCommunication),
                AudioCall::SetSpeakerphone(false),
            ]
        );
    }

    #[test]
    fn test_deactivate_restores_snapshot() {
        let port = Arc::new(FakeAudioPort::phone());
        port.preset(AudioMode::Ringtone, true, true);
        let (switch, _seen) = started_switch(&port);

        switch.activate().unwrap();
        // Zwischenzeitliche Änderungen durch andere
        port.preset(AudioMode::InCall, false, false);
        switch.deactivate();

        assert_eq!(switch.state(), AudioSwitchState::Started);
        assert_eq!(port.audio_mode(), AudioMode::Ringtone);
        assert!(port.is_microphone_muted());
        assert!(port.is_speakerphone_on());
        assert_eq!(port.calls().last(), Some(&AudioCall::AbandonFocus));
    }

    #[test]
    fn test_reactivate_reapplies_routing() {
        let port = Arc::new(FakeAudioPort::phone());
        let (switch, _seen) = started_switch(&port);
        switch.activate().unwrap();
        port.clear_calls();

        switch.select_device(Some(AudioDevice::speakerphone()));
        assert_eq!(port.calls(), vec![AudioCall::SetSpeakerphone(true)]);

        port.clear_calls();
        switch.activate().unwrap();
        assert_eq!(port.calls(), vec![AudioCall::SetSpeakerphone(true)]);
    }

    #[test]
    fn test_bluetooth_routes_without_speakerphone() {
        let port = Arc::new(FakeAudioPort::phone());
        port.set_bluetooth(Some("Pixel Buds"));
        let (switch, _seen) = started_switch(&port);

        switch.activate().unwrap();
        assert_eq!(port.calls().last(), Some(&AudioCall::SetSpeakerphone(false)));
    }

    #[test]
    fn test_stop_from_activated_deactivates_and_clears_listener() {
        let port = Arc::new(FakeAudioPort::phone());
        let (switch, seen) = started_switch(&port);
        switch.activate().unwrap();

        switch.stop();
        assert_eq!(switch.state(), AudioSwitchState::Stopped);
        assert!(port.calls().contains(&AudioCall::AbandonFocus));

        // Ohne Listener keine Benachrichtigung mehr
        port.set_wired(true);
        switch.enumerate_devices();
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_start_twice_only_replaces_listener() {
        let port = Arc::new(FakeAudioPort::phone());
        let (switch, first) = started_switch(&port);
        let (listener, second) = recording_listener();

        switch.start(listener);
        assert!(second.lock().is_empty());

        switch.select_device(Some(AudioDevice::speakerphone()));
        assert_eq!(first.lock().len(), 1);
        assert_eq!(second.lock().len(), 1);
    }
}
