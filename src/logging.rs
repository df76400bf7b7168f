//! Advisory Vault - Logging Setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;
use crate::error::{VaultError, VaultResult};

/// `RUST_LOG` wins over the configured level
fn build_filter(config: &LogConfig) -> VaultResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| VaultError::Config(format!("invalid log level '{}': {}", config.level, e))),
    }
}

/// Install the global subscriber. Logs go to stderr so command output
/// stays clean.
pub fn init(config: &LogConfig) -> VaultResult<()> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| VaultError::Config(format!("logging already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directives() {
        let config = LogConfig {
            level: "advisory_vault=debug,warn".into(),
            json: false,
        };
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default();
        let _ = init(&config);
        assert!(matches!(init(&config), Err(VaultError::Config(_))));
    }
}
