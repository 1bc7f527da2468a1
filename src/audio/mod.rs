//! Audio Module - Geräteauswahl und Audio-Routing
//!
//! Dieses Modul verwaltet:
//! - Verfügbare Ausgabegeräte (Bluetooth, Wired, Earpiece, Speakerphone)
//! - Präferenzreihenfolge und Benutzerauswahl
//! - Audio-Zustand über den Anruf (Focus, Mute, Speakerphone)

mod desktop;
mod device;
mod port;
mod registry;
mod switch;

pub use desktop::{classify_output_device, DesktopAudioPort};
pub use device::{AudioDevice, AudioDeviceKind};
pub use port::{AudioMode, SavedAudioState, SystemAudioPort};
pub use registry::{AudioDeviceRegistry, DeviceAvailability};
pub use switch::{
    resolve_preferences, AudioDeviceChangeListener, AudioSwitch, AudioSwitchError,
    AudioSwitchState, DEFAULT_PREFERENCES,
};
