//! System Audio Port
//!
//! Hardware- bzw. OS-Abfragen und Audio-Zustand. Die Routing Engine ist
//! der einzige Aufrufer der setzenden Methoden.

/// Audio-Modus des Systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioMode {
    #[default]
    Normal,
    Ringtone,
    InCall,
    InCommunication,
}

/// Zustand, der bei `activate()` gesichert und bei `deactivate()`
/// wiederhergestellt wird
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedAudioState {
    pub mode: AudioMode,
    pub microphone_muted: bool,
    pub speakerphone_on: bool,
}

pub trait SystemAudioPort: Send + Sync {
    // Geräte
    fn has_earpiece(&self) -> bool;
    fn has_speakerphone(&self) -> bool;
    /// Name des verbundenen Bluetooth-Headsets, falls vorhanden
    fn bluetooth_headset(&self) -> Option<String>;
    fn is_wired_headset_attached(&self) -> bool;

    // Zustand
    fn audio_mode(&self) -> AudioMode;
    fn set_audio_mode(&self, mode: AudioMode);
    fn is_microphone_muted(&self) -> bool;
    fn set_microphone_muted(&self, muted: bool);
    fn is_speakerphone_on(&self) -> bool;
    fn set_speakerphone_on(&self, on: bool);

    // Focus
    /// Fordert Audio Focus an; `false` wenn das System ablehnt
    fn request_audio_focus(&self) -> bool;
    fn abandon_audio_focus(&self);
}
