//! Session State und Events für die Präsentationsschicht

use crate::audio::AudioDevice;
use crate::peer::{ConnectionState, PeerRole};
use serde::{Deserialize, Serialize};

/// Gesamtzustand des Anrufs, vom Aufrufer abgeleitet und veröffentlicht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Offline,
    Creating,
    Ready,
    Active,
    Impossible,
}

/// Zustand der lokalen Capture-Quellen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMediaState {
    pub camera_enabled: bool,
    pub microphone_enabled: bool,
    pub front_camera: bool,
}

impl Default for CallMediaState {
    fn default() -> Self {
        Self {
            camera_enabled: true,
            microphone_enabled: true,
            front_camera: true,
        }
    }
}

/// Events an die UI
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Geräteliste oder Auswahl des Audio-Routings hat sich geändert
    AudioDevicesChanged {
        devices: Vec<AudioDevice>,
        selected: Option<AudioDevice>,
    },

    ConnectionStateChanged {
        role: PeerRole,
        state: ConnectionState,
    },

    /// Verhandlung auch nach allen Versuchen fehlgeschlagen
    ConnectionFailed { role: PeerRole, error: String },
}
