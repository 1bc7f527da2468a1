//! Audio Device Registry
//!
//! Fragt den System Audio Port nach vorhandenen Geräten und baut daraus
//! die Geräteliste in Präferenzreihenfolge.

use super::device::{AudioDevice, AudioDeviceKind};
use super::port::SystemAudioPort;
use std::sync::Arc;

/// Verfügbarkeit der Geräteklassen beim letzten Scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceAvailability {
    pub earpiece: bool,
    pub speakerphone: bool,
    pub wired_headset: bool,
    pub bluetooth_headset: bool,
}

pub struct AudioDeviceRegistry {
    port: Arc<dyn SystemAudioPort>,
    availability: DeviceAvailability,
}

impl AudioDeviceRegistry {
    pub fn new(port: Arc<dyn SystemAudioPort>) -> Self {
        Self {
            port,
            availability: DeviceAvailability::default(),
        }
    }

    /// Liest die Geräte neu ein, sortiert nach `preferences`
    ///
    /// Ein angeschlossenes Wired Headset verdrängt das Earpiece, egal wie
    /// die beiden in der Präferenzliste stehen.
    pub fn scan(&mut self, preferences: &[AudioDeviceKind]) -> Vec<AudioDevice> {
        let wired = self.port.is_wired_headset_attached();
        let bluetooth = self.port.bluetooth_headset();
        let earpiece = self.port.has_earpiece();
        let speakerphone = self.port.has_speakerphone();

        self.availability = DeviceAvailability {
            earpiece: earpiece && !wired,
            speakerphone,
            wired_headset: wired,
            bluetooth_headset: bluetooth.is_some(),
        };

        preferences
            .iter()
            .filter_map(|kind| match kind {
                AudioDeviceKind::BluetoothHeadset => bluetooth
                    .as_deref()
                    .map(|name| AudioDevice::bluetooth_headset(Some(name))),
                AudioDeviceKind::WiredHeadset => wired.then(AudioDevice::wired_headset),
                AudioDeviceKind::Earpiece => (earpiece && !wired).then(AudioDevice::earpiece),
                AudioDeviceKind::Speakerphone => speakerphone.then(AudioDevice::speakerphone),
            })
            .collect()
    }

    pub fn availability(&self) -> DeviceAvailability {
        self.availability
    }
}

impl std::fmt::Debug for AudioDeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDeviceRegistry")
            .field("availability", &self.availability)
            .finish()
    }
}
