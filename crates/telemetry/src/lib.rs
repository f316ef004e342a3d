//! Tracing bootstrap honoring the configured log format and filter.

use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

use biblio_kernel::settings::{LogFormat, TelemetrySettings};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter directive so operators can
/// raise verbosity without touching config files.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.filter.clone()));

    let result = match settings.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
    };

    result.map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_not_reentrant() {
        let settings = TelemetrySettings::default();
        // First call wins; a second call reports the conflict instead of panicking.
        let first = init(&settings);
        let second = init(&settings);
        assert!(first.is_ok() || second.is_err());
    }
}
