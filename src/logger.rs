//! Tracing subscriber setup driven by [`config::Logger`].

use std::sync::OnceLock;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{self, LogFormat};

static INIT: OnceLock<bool> = OnceLock::new();

/// Builds the filter directive: `RUST_LOG` wins, then `override_filter`,
/// then this crate at the configured level.
#[must_use]
pub fn filter_directive(config: &config::Logger) -> String {
    if let Ok(directive) = std::env::var(EnvFilter::DEFAULT_ENV) {
        if !directive.trim().is_empty() {
            return directive;
        }
    }
    config
        .override_filter
        .clone()
        .unwrap_or_else(|| format!("gist_topics={}", config.level))
}

/// Installs the global subscriber once. Later calls report whether the
/// first one succeeded and change nothing.
pub fn init(config: &config::Logger) -> bool {
    *INIT.get_or_init(|| {
        if !config.enable {
            return false;
        }
        let filter = EnvFilter::try_new(filter_directive(config))
            .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));
        let builder = fmt().with_env_filter(filter).with_target(true);

        let installed = match config.format {
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        installed.is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::filter_directive;
    use crate::config::{self, LogLevel};

    #[test]
    fn override_filter_replaces_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let logger = config::Logger {
            level: LogLevel::Debug,
            ..config::Logger::default()
        };
        assert!(filter_directive(&logger).ends_with("gist_topics=debug"));

        let logger = config::Logger {
            override_filter: Some("gist_topics=trace,tera=warn".to_string()),
            ..logger
        };
        assert_eq!(filter_directive(&logger), "gist_topics=trace,tera=warn");
    }
}
