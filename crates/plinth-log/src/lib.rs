// Plinth Logging
// Thin configuration layer over the tracing subscriber stack

use std::io;
use std::sync::{Arc, Mutex, Once, PoisonError};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::Dispatch;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

// Re-export the underlying facade so downstream crates emit events without
// their own dependency edge
pub use tracing;

//-----------------------------------------------------------------------------
// Configuration
//-----------------------------------------------------------------------------

/// Output format for emitted log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line human-readable output.
    Compact,
    /// One JSON object per event, for log shippers.
    Json,
}

/// Declarative subscriber configuration.
///
/// Deserializes from the application's config file; absent fields fall back
/// to their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive string, e.g. `"info"` or `"my_crate=debug,warn"`.
    /// A `RUST_LOG` environment variable takes precedence when set.
    pub filter: String,
    /// Output format for emitted events.
    pub format: LogFormat,
    /// Whether to colorize human-readable output.
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Replace the filter directive string.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Replace the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

//-----------------------------------------------------------------------------
// Subscriber Construction
//-----------------------------------------------------------------------------

/// Builds a subscriber from the given configuration and returns it as a
/// dispatch handle.
///
/// The handle is an explicitly constructed value, not process-global state:
/// callers decide whether to install it globally via [`init`] or scope it
/// with `tracing::dispatcher::with_default`, which keeps tests and embedded
/// uses independent of each other.
///
/// # Arguments
///
/// * `config`: Filter, format and ansi settings. The filter falls back to
///             the `RUST_LOG` environment variable when that is set.
///
/// # Returns
///
/// * `Result<Dispatch>`: The dispatch handle, or an `anyhow::Error` when the
///   filter directives do not parse.
pub fn build(config: &LogConfig) -> Result<Dispatch> {
    build_with_writer(config, io::stdout)
}

/// Builds a subscriber like [`build`], but routes formatted output through
/// the given writer. Tests pair this with [`Capture`].
pub fn build_with_writer<W>(config: &LogConfig, writer: W) -> Result<Dispatch>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))?;

    let subscriber = Registry::default().with(env_filter);

    let dispatch = match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_target(true)
                .with_level(true)
                .with_ansi(config.ansi)
                .with_writer(writer);
            Dispatch::new(subscriber.with(fmt_layer))
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_target(true)
                .with_level(true)
                .with_ansi(config.ansi)
                .with_writer(writer);
            Dispatch::new(subscriber.with(fmt_layer))
        }
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_level(true)
                .with_writer(writer);
            Dispatch::new(subscriber.with(json_layer))
        }
    };

    Ok(dispatch)
}

/// Build a subscriber from the configuration and install it as the global
/// default. Fails if another subscriber was installed earlier.
pub fn init(config: &LogConfig) -> Result<()> {
    let dispatch = build(config)?;
    tracing::dispatcher::set_global_default(dispatch)?;
    Ok(())
}

//-----------------------------------------------------------------------------
// Test Support
//-----------------------------------------------------------------------------

static INIT: Once = Once::new();

/// Initialize test logging with debug level (called once per test run)
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = install_test_subscriber("debug");
    });
}

fn install_test_subscriber(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let fmt_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_level(true)
        .with_test_writer(); // Use test writer for better test output

    tracing::dispatcher::set_global_default(Dispatch::new(
        Registry::default().with(env_filter).with(fmt_layer),
    ))?;
    Ok(())
}

/// In-memory sink that captures formatted log output for verification.
///
/// Clones share one buffer, so a test can keep a handle while the
/// subscriber writes through another.
#[derive(Clone, Default)]
pub struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    /// Create a new empty capture buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Check if the captured output contains the specified text.
    pub fn contains(&self, text: &str) -> bool {
        self.contents().contains(text)
    }

    /// Discard everything captured so far.
    pub fn clear(&self) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl io::Write for Capture {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

//-----------------------------------------------------------------------------
// Tests
//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.filter, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.ansi);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: LogConfig = serde_json::from_str(r#"{"format": "json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "info");

        let config: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_bad_filter_directives_are_reported() {
        let config = LogConfig::default().with_filter("no=such=level");
        assert!(build(&config).is_err());
    }

    #[test]
    fn test_scoped_dispatch_captures_events() {
        let capture = Capture::new();
        let config = LogConfig {
            filter: "debug".to_string(),
            format: LogFormat::Compact,
            ansi: false,
        };
        let dispatch = build_with_writer(&config, capture.clone()).unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!(job = "reindex", "job finished");
        });

        assert!(capture.contains("job finished"));
        assert!(capture.contains("reindex"));
    }

    #[test]
    fn test_filter_directives_apply() {
        let capture = Capture::new();
        let config = LogConfig {
            filter: "warn".to_string(),
            format: LogFormat::Compact,
            ansi: false,
        };
        let dispatch = build_with_writer(&config, capture.clone()).unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::debug!("below the threshold");
            tracing::warn!("above the threshold");
        });

        assert!(!capture.contains("below the threshold"));
        assert!(capture.contains("above the threshold"));
    }

    #[test]
    fn test_json_format_emits_fields() {
        let capture = Capture::new();
        let config = LogConfig {
            filter: "info".to_string(),
            format: LogFormat::Json,
            ansi: false,
        };
        let dispatch = build_with_writer(&config, capture.clone()).unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!(code = 7, "structured line");
        });

        assert!(capture.contains(r#""message":"structured line""#));
        assert!(capture.contains(r#""code":7"#));
    }

    #[test]
    fn test_capture_clears() {
        let capture = Capture::new();
        let config = LogConfig {
            filter: "info".to_string(),
            format: LogFormat::Compact,
            ansi: false,
        };
        let dispatch = build_with_writer(&config, capture.clone()).unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("before the clear");
        });
        assert!(capture.contains("before the clear"));

        capture.clear();
        assert!(capture.contents().is_empty());
    }

    #[test]
    fn test_init_logging() {
        // These should not panic when called multiple times
        init_test_logging();
        init_test_logging();
    }
}
