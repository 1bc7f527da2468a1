//! Session Module - Orchestrierung eines Anrufs
//!
//! Dieses Modul verwaltet:
//! - Publisher- und Subscriber-Verbindung
//! - Weiterleitung von Signaling-Nachrichten und Peer Events
//! - Audio-Aktivierung im Takt des Session State
//! - Kamera/Mikrofon-Steuerung

mod error;
mod manager;
mod state;

pub use error::SessionError;
pub use manager::SessionManager;
pub use state::{CallMediaState, SessionEvent, SessionState};
