//! Desktop System Audio Port
//!
//! Verwendet cpal für die Geräteabfrage. Desktop-Systeme haben weder
//! Earpiece noch einen OS-weiten Audio-Modus, daher werden Modus, Mute,
//! Speakerphone und Focus hier nur im Speicher gehalten.

use super::device::AudioDeviceKind;
use super::port::{AudioMode, SystemAudioPort};
use cpal::traits::{DeviceTrait, HostTrait};
use parking_lot::Mutex;

/// Namensbestandteile, an denen Bluetooth-Ausgabegeräte erkannt werden
const BLUETOOTH_HINTS: [&str; 4] = ["bluetooth", "airpods", "buds", "hands-free"];

/// Namensbestandteile für kabelgebundene Headsets
const WIRED_HINTS: [&str; 3] = ["headset", "headphone", "kopfhörer"];

/// Ordnet einen Ausgabegeräte-Namen einer Geräteklasse zu
pub fn classify_output_device(name: &str) -> Option<AudioDeviceKind> {
    let lower = name.to_lowercase();
    if BLUETOOTH_HINTS.iter().any(|hint| lower.contains(hint)) {
        Some(AudioDeviceKind::BluetoothHeadset)
    } else if WIRED_HINTS.iter().any(|hint| lower.contains(hint)) {
        Some(AudioDeviceKind::WiredHeadset)
    } else {
        None
    }
}

#[derive(Debug, Default)]
struct DesktopAudioState {
    mode: AudioMode,
    microphone_muted: bool,
    speakerphone_on: bool,
    has_focus: bool,
}

/// System Audio Port für Windows/macOS/Linux
#[derive(Debug, Default)]
pub struct DesktopAudioPort {
    state: Mutex<DesktopAudioState>,
}

impl DesktopAudioPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Namen aller Ausgabegeräte des Default-Hosts
    fn output_device_names() -> Vec<String> {
        let host = cpal::default_host();
        match host.output_devices() {
            Ok(devices) => devices.filter_map(|d| d.name().ok()).collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate output devices: {}", e);
                Vec::new()
            }
        }
    }

    pub fn has_focus(&self) -> bool {
        self.state.lock().has_focus
    }
}

impl SystemAudioPort for DesktopAudioPort {
    fn has_earpiece(&self) -> bool {
        false
    }

    fn has_speakerphone(&self) -> bool {
        cpal::default_host().default_output_device().is_some()
    }

    fn bluetooth_headset(&self) -> Option<String> {
        Self::output_device_names()
            .into_iter()
            .find(|name| classify_output_device(name) == Some(AudioDeviceKind::BluetoothHeadset))
    }

    fn is_wired_headset_attached(&self) -> bool {
        Self::output_device_names()
            .iter()
            .any(|name| classify_output_device(name) == Some(AudioDeviceKind::WiredHeadset))
    }

    fn audio_mode(&self) -> AudioMode {
        self.state.lock().mode
    }

    fn set_audio_mode(&self, mode: AudioMode) {
        self.state.lock().mode = mode;
    }

    fn is_microphone_muted(&self) -> bool {
        self.state.lock().microphone_muted
    }

    fn set_microphone_muted(&self, muted: bool) {
        self.state.lock().microphone_muted = muted;
        tracing::debug!("Microphone muted: {}", muted);
    }

    fn is_speakerphone_on(&self) -> bool {
        self.state.lock().speakerphone_on
    }

    fn set_speakerphone_on(&self, on: bool) {
        self.state.lock().speakerphone_on = on;
        tracing::debug!("Speakerphone on: {}", on);
    }

    fn request_audio_focus(&self) -> bool {
        self.state.lock().has_focus = true;
        true
    }

    fn abandon_audio_focus(&self) {
        self.state.lock().has_focus = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_output_device() {
        assert_eq!(
            classify_output_device("AirPods Pro"),
            Some(AudioDeviceKind::BluetoothHeadset)
        );
        assert_eq!(
            classify_output_device("Headset (WH-1000XM4 Hands-Free)"),
            Some(AudioDeviceKind::BluetoothHeadset)
        );
        assert_eq!(
            classify_output_device("Headphones (Realtek Audio)"),
            Some(AudioDeviceKind::WiredHeadset)
        );
        assert_eq!(classify_output_device("Speakers (Realtek Audio)"), None);
    }

    #[test]
    fn test_state_is_kept_in_memory() {
        let port = DesktopAudioPort::new();
        assert_eq!(port.audio_mode(), AudioMode::Normal);

        port.set_audio_mode(AudioMode::InCommunication);
        port.set_microphone_muted(true);
        port.set_speakerphone_on(true);
        assert!(port.request_audio_focus());

        assert_eq!(port.audio_mode(), AudioMode::InCommunication);
        assert!(port.is_microphone_muted());
        assert!(port.is_speakerphone_on());
        assert!(port.has_focus());

        port.abandon_audio_focus();
        assert!(!port.has_focus());
        assert!(!port.has_earpiece());
    }
}
