//! Tracing-Initialisierung
//!
//! Die Bibliothek loggt nur über `tracing`. Einen Subscriber installiert
//! ausschließlich die Anwendung, z.B. über [`init_tracing`].

use tracing_subscriber::EnvFilter;

/// Standard-Direktiven, `RUST_LOG` hat Vorrang
pub const DEFAULT_DIRECTIVES: [&str; 2] = ["call_core=debug", "webrtc=warn"];

/// Baut den Filter aus `RUST_LOG` plus Standard-Direktiven
pub fn build_filter(default_filter: &[&str]) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    let mut filter = EnvFilter::from_default_env();
    for directive in default_filter {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

/// Installiert einen globalen fmt-Subscriber
///
/// Schlägt fehl, wenn bereits ein Subscriber installiert ist oder eine
/// Direktive nicht parsebar ist.
pub fn init_tracing(default_filter: &[&str]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_filter)?)
        .try_init()?;

    tracing::info!("Tracing initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        assert!(build_filter(&DEFAULT_DIRECTIVES).is_ok());
        assert!(build_filter(&["call_core=loud"]).is_err());
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_tracing(&DEFAULT_DIRECTIVES);
        assert!(init_tracing(&DEFAULT_DIRECTIVES).is_err());
    }
}
