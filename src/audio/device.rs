//! Audio-Ausgabegeräte
//!
//! [`AudioDevice`] ist ein unveränderlicher Wert. Gleichheit gilt über die
//! Variante plus Anzeigename, so dass zwei Bluetooth-Headsets mit
//! unterschiedlichem Namen verschiedene Geräte sind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// DEVICE KIND
// ============================================================================

/// Geräteklasse, Grundlage der Präferenzreihenfolge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioDeviceKind {
    BluetoothHeadset,
    WiredHeadset,
    Earpiece,
    Speakerphone,
}

impl AudioDeviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioDeviceKind::BluetoothHeadset => "bluetooth",
            AudioDeviceKind::WiredHeadset => "wired",
            AudioDeviceKind::Earpiece => "earpiece",
            AudioDeviceKind::Speakerphone => "speaker",
        }
    }
}

impl fmt::Display for AudioDeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioDeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bluetooth" | "bluetooth_headset" => Ok(AudioDeviceKind::BluetoothHeadset),
            "wired" | "wired_headset" => Ok(AudioDeviceKind::WiredHeadset),
            "earpiece" => Ok(AudioDeviceKind::Earpiece),
            "speaker" | "speakerphone" => Ok(AudioDeviceKind::Speakerphone),
            other => Err(format!("unknown audio device kind '{}'", other)),
        }
    }
}

// ============================================================================
// AUDIO DEVICE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum AudioDevice {
    BluetoothHeadset(String),
    WiredHeadset(String),
    Earpiece(String),
    Speakerphone(String),
}

impl AudioDevice {
    /// Bluetooth-Headset; ohne Namen heißt es "Bluetooth"
    pub fn bluetooth_headset(name: Option<&str>) -> Self {
        AudioDevice::BluetoothHeadset(name.unwrap_or("Bluetooth").to_string())
    }

    pub fn wired_headset() -> Self {
        AudioDevice::WiredHeadset("Wired Headset".to_string())
    }

    pub fn earpiece() -> Self {
        AudioDevice::Earpiece("Earpiece".to_string())
    }

    pub fn speakerphone() -> Self {
        AudioDevice::Speakerphone("Speakerphone".to_string())
    }

    pub fn kind(&self) -> AudioDeviceKind {
        match self {
            AudioDevice::BluetoothHeadset(_) => AudioDeviceKind::BluetoothHeadset,
            AudioDevice::WiredHeadset(_) => AudioDeviceKind::WiredHeadset,
            AudioDevice::Earpiece(_) => AudioDeviceKind::Earpiece,
            AudioDevice::Speakerphone(_) => AudioDeviceKind::Speakerphone,
        }
    }

    /// Anzeigename
    pub fn name(&self) -> &str {
        match self {
            AudioDevice::BluetoothHeadset(name)
            | AudioDevice::WiredHeadset(name)
            | AudioDevice::Earpiece(name)
            | AudioDevice::Speakerphone(name) => name,
        }
    }
}

impl fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
