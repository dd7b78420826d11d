//! Logging and tracing initialization.
//!
//! Logs go to stderr; stdout is reserved for command summaries.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Logging switches given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOverrides {
    /// Force the `debug` level.
    pub verbose: bool,

    /// Force JSON output.
    pub json: bool,
}

impl LoggingConfig {
    /// Apply command-line switches on top of the configured settings.
    pub fn with_overrides(mut self, overrides: LogOverrides) -> Self {
        if overrides.verbose {
            self.level = "debug".to_string();
        }
        if overrides.json {
            self.json = true;
        }
        self
    }
}

/// Initialize the global tracing subscriber with the given configuration.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

/// Run `f` with a warn-level stderr subscriber on the current thread.
///
/// Covers the window before [`init_logging`], while the configuration that
/// decides the real subscriber is still being loaded.
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = fmt::Subscriber::builder()
        .with_max_level(LevelFilter::WARN)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_raise_level_and_switch_format() {
        let base = LoggingConfig::default();

        let verbose = base.clone().with_overrides(LogOverrides {
            verbose: true,
            json: false,
        });
        assert_eq!(verbose.level, "debug");
        assert!(!verbose.json);

        let json = base.clone().with_overrides(LogOverrides {
            verbose: false,
            json: true,
        });
        assert_eq!(json.level, "info");
        assert!(json.json);

        assert_eq!(base.clone().with_overrides(LogOverrides::default()), base);
    }

    #[test]
    fn test_bootstrap_subscriber_sees_warnings_only() {
        let (warn, debug) = with_bootstrap_logging(|| {
            (
                tracing::enabled!(tracing::Level::WARN),
                tracing::enabled!(tracing::Level::DEBUG),
            )
        });
        assert!(warn);
        assert!(!debug);
    }
}
