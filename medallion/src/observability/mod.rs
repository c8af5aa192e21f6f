//! Process-wide logging setup.

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::errors::{MedallionError, Result};

/// Installs the global `tracing` subscriber described by `config`.
///
/// `RUST_LOG`, when set, takes precedence over `config.filter`. Returns
/// `false` if a global subscriber was already installed.
pub fn init_tracing(config: &LogConfig) -> Result<bool> {
    let filter = build_filter(config)?;
    let installed = if config.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
    };
    Ok(installed.is_ok())
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| {
            MedallionError::Config(format!("invalid log filter '{}': {e}", config.filter))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_accepts_directives() {
        let config = LogConfig {
            filter: "info,medallion=debug".to_string(),
            json: false,
        };
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_second_init_reports_existing_subscriber() {
        let config = LogConfig::default();
        let _ = init_tracing(&config).unwrap();
        assert!(!init_tracing(&config).unwrap());
    }
}
