//! Message Types für den Signaling Port
//!
//! Der Transport selbst liegt außerhalb der Bibliothek. Er liefert bereits
//! geparste Nachrichten und nimmt ausgehende Nachrichten entgegen; die
//! serde-Repräsentation ist für Transporte gedacht, die JSON sprechen.

use crate::peer::{IceCandidate, PeerRole, SdpType, SessionDescription};
use serde::{Deserialize, Serialize};

// ============================================================================
// SIGNALING MESSAGES
// ============================================================================

/// Offer, Answer oder ICE Candidate einer Verbindung.
///
/// `role` ist immer die Rolle der Verbindung auf Seite des Absenders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalingMessage {
    /// SDP Offer
    Offer { role: PeerRole, sdp: String },

    /// SDP Answer
    Answer { role: PeerRole, sdp: String },

    /// ICE Candidate
    IceCandidate {
        role: PeerRole,
        candidate: IceCandidate,
    },
}

impl SignalingMessage {
    /// Verpackt eine lokale Description; Pranswer und Rollback werden
    /// nicht signalisiert
    pub fn from_description(role: PeerRole, desc: &SessionDescription) -> Option<Self> {
        match desc.sdp_type {
            SdpType::Offer => Some(SignalingMessage::Offer {
                role,
                sdp: desc.sdp.clone(),
            }),
            SdpType::Answer => Some(SignalingMessage::Answer {
                role,
                sdp: desc.sdp.clone(),
            }),
            SdpType::PrAnswer | SdpType::Rollback => None,
        }
    }

    pub fn role(&self) -> PeerRole {
        match self {
            SignalingMessage::Offer { role, .. }
            | SignalingMessage::Answer { role, .. }
            | SignalingMessage::IceCandidate { role, .. } => *role,
        }
    }

    /// Rolle der lokalen Verbindung, die diese eingehende Nachricht verarbeitet
    pub fn target_role(&self) -> PeerRole {
        self.role().counterpart()
    }

    pub fn session_description(&self) -> Option<SessionDescription> {
        match self {
            SignalingMessage::Offer { sdp, .. } => Some(SessionDescription::offer(sdp.clone())),
            SignalingMessage::Answer { sdp, .. } => Some(SessionDescription::answer(sdp.clone())),
            SignalingMessage::IceCandidate { .. } => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
