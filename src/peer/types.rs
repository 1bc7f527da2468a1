//! Gemeinsame Typen für die Peer-Verhandlung
//!
//! SDP, ICE Candidates, Verbindungsstatus und Stats so, wie sie zwischen
//! Negotiation Engine, Media Engine und Signaling ausgetauscht werden.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PEER ROLE
// ============================================================================

/// Rolle einer Verbindung innerhalb einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    /// Sendet die lokalen Tracks
    Publisher,
    /// Empfängt die Tracks der Gegenseite
    Subscriber,
}

impl PeerRole {
    /// Gibt die Rolle zurück, mit der die Gegenseite dieselbe Verhandlung führt
    pub fn counterpart(self) -> Self {
        match self {
            PeerRole::Publisher => PeerRole::Subscriber,
            PeerRole::Subscriber => PeerRole::Publisher,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeerRole::Publisher => "publisher",
            PeerRole::Subscriber => "subscriber",
        }
    }
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SESSION DESCRIPTION
// ============================================================================

/// Typ einer Session Description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    PrAnswer,
    Answer,
    Rollback,
}

/// SDP Offer oder Answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

// ============================================================================
// ICE CANDIDATE
// ============================================================================

/// ICE Candidate im JSON-Format der Browser-API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>, sdp_mid: Option<String>, sdp_mline_index: Option<u16>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid,
            sdp_mline_index,
        }
    }
}

// ============================================================================
// CONSTRAINTS
// ============================================================================

/// Optionen für create_offer / create_answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub offer_to_receive_audio: bool,
    pub offer_to_receive_video: bool,
    pub ice_restart: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            offer_to_receive_audio: true,
            offer_to_receive_video: true,
            ice_restart: false,
        }
    }
}

// ============================================================================
// CONNECTION STATE
// ============================================================================

/// Verbindungsstatus wie von der Media Engine gemeldet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl ConnectionState {
    /// Verbindung ist beendet oder unterbrochen
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConnectionState::Disconnected | ConnectionState::Failed | ConnectionState::Closed
        )
    }
}

// ============================================================================
// TRACKS & STATS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Eingehender Track der Gegenseite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub track_id: String,
    pub stream_id: String,
    pub kind: TrackKind,
}

/// Ein Stats-Sample der Media Engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    /// Zeitpunkt der Abfrage (Unix-Millisekunden)
    pub timestamp_ms: i64,
    pub entries: serde_json::Map<String, serde_json::Value>,
}

impl StatsReport {
    pub fn new(entries: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_counterpart() {
        assert_eq!(PeerRole::Publisher.counterpart(), PeerRole::Subscriber);
        assert_eq!(PeerRole::Subscriber.counterpart(), PeerRole::Publisher);
    }

    #[test]
    fn test_ice_candidate_json_uses_browser_field_names() {
        let candidate = IceCandidate::new("candidate:1 1 udp 1 10.0.0.1 5000 typ host", Some("0".into()), Some(0));
        let json = serde_json::to_value(&candidate).unwrap();

        assert_eq!(json["sdpMid"], "0");
        assert_eq!(json["sdpMLineIndex"], 0);

        let parsed: IceCandidate =
            serde_json::from_str(r#"{"candidate":"candidate:2"}"#).unwrap();
        assert_eq!(parsed.sdp_mid, None);
        assert_eq!(parsed.sdp_mline_index, None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ConnectionState::Failed.is_terminal());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Disconnected.is_terminal());
        assert!(!ConnectionState::Connected.is_terminal());
    }
}
