//! Brücke von Completion-Callbacks zu async
//!
//! Jede Operation der Media Engine suspendiert den aufrufenden Task, bis
//! der Callback feuert. Auf welchem Thread das passiert, spielt keine
//! Rolle: das Ergebnis läuft über einen oneshot-Channel zurück.

use super::error::PeerError;
use super::port::{CreateSdpCallback, CreateSdpResult, SetCallback};
use super::types::SessionDescription;
use tokio::sync::oneshot;

const DROPPED: &str = "completion callback dropped";

/// Führt eine create-Operation aus und wartet auf die Description
pub(crate) async fn create_value<F>(call: F) -> Result<SessionDescription, PeerError>
where
    F: FnOnce(CreateSdpCallback),
{
    let (tx, rx) = oneshot::channel::<CreateSdpResult>();
    call(Box::new(move |result| {
        let _ = tx.send(result);
    }));

    match rx.await {
        Ok(Ok(Some(desc))) => Ok(desc),
        Ok(Ok(None)) => Err(PeerError::EmptyResult),
        Ok(Err(message)) => Err(PeerError::NegotiationFailed(message)),
        Err(_) => Err(PeerError::NegotiationFailed(DROPPED.to_string())),
    }
}

/// Führt eine set/add-Operation aus und wartet auf die Bestätigung
pub(crate) async fn set_value<F>(call: F) -> Result<(), PeerError>
where
    F: FnOnce(SetCallback),
{
    let (tx, rx) = oneshot::channel::<Result<(), String>>();
    call(Box::new(move |result| {
        let _ = tx.send(result);
    }));

    match rx.await {
        Ok(result) => result.map_err(PeerError::NegotiationFailed),
        Err(_) => Err(PeerError::NegotiationFailed(DROPPED.to_string())),
    }
}
