//! Peer Module - Offer/Answer-Verhandlung über die Media Engine
//!
//! Dieses Modul verwaltet:
//! - SDP Offer/Answer mit Codec-Rewrite
//! - Pufferung von ICE Candidates bis zur Remote Description
//! - Periodische Stats während einer bestehenden Verbindung
//! - Den webrtc-basierten Media Engine Adapter

mod completion;
mod connection;
mod error;
mod port;
mod sdp;
mod types;
mod webrtc_engine;

pub use connection::{PeerConnection, PeerEvent, DEFAULT_STATS_INTERVAL};
pub use error::PeerError;
pub use port::{
    CreateSdpCallback, CreateSdpResult, EngineEvent, EngineObserver, LocalMediaPort,
    MediaConnection, MediaEngineFactory, SetCallback, StatsCallback,
};
pub use sdp::{munge_codecs, munge_description};
pub use types::{
    ConnectionState, IceCandidate, MediaConstraints, PeerRole, RemoteTrack, SdpType,
    SessionDescription, StatsReport, TrackKind,
};
pub use webrtc_engine::{WebRtcConnection, WebRtcEngine};
