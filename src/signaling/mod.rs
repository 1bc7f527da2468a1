//! Signaling Module - Nachrichten zwischen den Peers
//!
//! Dieses Modul definiert:
//! - Eingehende und ausgehende SDP/ICE-Nachrichten
//! - Die Rollen-Zuordnung zwischen Absender und lokaler Verbindung
//!

mod messages;

pub use messages::SignalingMessage;
