//! SDP Kompatibilitäts-Rewrite
//!
//! Die Gegenseite erwartet Codec-Namen in Großschreibung (`VP8`, `VP9`,
//! `H264`). Lokale wie entfernte Descriptions laufen vor dem Anwenden
//! durch [`munge_codecs`].

use super::types::SessionDescription;

/// Codec-Tokens und ihre kanonische Schreibweise
const CODEC_NAMES: [(&str, &str); 3] = [("vp9", "VP9"), ("vp8", "VP8"), ("h264", "H264")];

/// Schreibt kleingeschriebene Codec-Tokens im SDP-Body groß
pub fn munge_codecs(sdp: &str) -> String {
    CODEC_NAMES
        .iter()
        .fold(sdp.to_string(), |body, (lower, upper)| body.replace(lower, upper))
}

/// Wendet [`munge_codecs`] auf eine Description an, der Typ bleibt erhalten
pub fn munge_description(desc: &SessionDescription) -> SessionDescription {
    SessionDescription {
        sdp_type: desc.sdp_type,
        sdp: munge_codecs(&desc.sdp),
    }
}
