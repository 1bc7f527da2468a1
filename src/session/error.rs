use crate::audio::AudioSwitchError;
use crate::config::ConfigError;
use crate::peer::PeerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioSwitchError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Signaling channel closed")]
    SignalingClosed,

    #[error("Session loop is already running")]
    AlreadyRunning,
}
