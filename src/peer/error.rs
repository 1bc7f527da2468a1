//! Fehler der Negotiation Engine

use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerError {
    /// Die Media Engine hat eine SDP/ICE-Operation abgelehnt
    #[error("Negotiation failed: {0}")]
    NegotiationFailed(String),

    /// Erfolg gemeldet, aber keine Description geliefert
    #[error("Media engine returned no session description")]
    EmptyResult,

    /// Candidate wurde gepuffert, kein echter Fehler
    #[error("Remote description is not set, candidate buffered")]
    RemoteDescriptionPending,

    #[error("Peer connection is not initialized")]
    NotInitialized,

    #[error("Peer connection is already initialized")]
    AlreadyInitialized,

    #[error("Failed to create peer connection: {0}")]
    ConnectionSetup(String),
}

impl PeerError {
    /// `true` wenn die Operation nur aufgeschoben wurde
    pub fn is_deferred(&self) -> bool {
        matches!(self, PeerError::RemoteDescriptionPending)
    }
}
