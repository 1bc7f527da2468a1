//! Pulse Call Core - Verhandlung und Audio-Routing für Echtzeit-Anrufe
//!
//! Der Kern eines Call-Clients mit:
//! - Offer/Answer und ICE-Candidate-Pufferung je Verbindung
//! - Audio-Geräteauswahl und Audio-Zustand über den Anruf
//! - Orchestrierung von Publisher- und Subscriber-Verbindung
//!
//! Media Engine, System-Audio und Signaling-Transport sind austauschbare
//! Ports. Für Desktop-Hosts liegen Adapter auf Basis von `webrtc` und
//! `cpal` bei.
//!
//! ```no_run
//! use call_core::audio::DesktopAudioPort;
//! use call_core::config::CallConfig;
//! use call_core::peer::{LocalMediaPort, WebRtcEngine};
//! use call_core::session::{SessionManager, SessionState};
//! use std::sync::Arc;
//!
//! struct NoCamera;
//!
//! impl LocalMediaPort for NoCamera {
//!     fn set_camera_enabled(&self, _enabled: bool) {}
//!     fn set_microphone_enabled(&self, _enabled: bool) {}
//!     fn flip_camera(&self) {}
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! call_core::logging::init_tracing(&call_core::logging::DEFAULT_DIRECTIVES).ok();
//!
//! let config = CallConfig::from_env()?;
//! let engine = WebRtcEngine::new(&config);
//! let (outbound_tx, _outbound_rx) = tokio::sync::mpsc::channel(64);
//! let (_inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(64);
//!
//! let session = Arc::new(
//!     SessionManager::new(
//!         config,
//!         &engine,
//!         Arc::new(DesktopAudioPort::new()),
//!         Arc::new(NoCamera),
//!         outbound_tx,
//!     )
//!     .await?,
//! );
//! session.spawn(inbound_rx)?;
//! session.on_session_screen_ready();
//! session.publish_session_state(SessionState::Active)?;
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod config;
pub mod logging;
pub mod peer;
pub mod session;
pub mod signaling;

#[cfg(test)]
mod testing;

pub use audio::{AudioDevice, AudioDeviceKind, AudioSwitch, AudioSwitchError};
pub use config::{CallConfig, ConfigError};
pub use peer::{PeerConnection, PeerError, PeerEvent, PeerRole};
pub use session::{SessionError, SessionEvent, SessionManager, SessionState};
pub use signaling::SignalingMessage;
