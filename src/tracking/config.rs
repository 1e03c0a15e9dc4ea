//! Tracker options, environment overrides, and config file support.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: builder methods on [`TrackingOptions`]
//! 2. **Environment variables**: `DEFERRED_TRACK_*`
//! 3. **Config file**: a TOML `[tracking]` table (requires `config-file` feature)
//! 4. **Defaults**: [`TrackingOptions::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `DEFERRED_TRACK_ALL_REJECTIONS` | `bool` | `all_rejections` |
//! | `DEFERRED_TRACK_WHITELIST` | comma-separated class names | `whitelist` |

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, ErrorKind};
use crate::value::{ErrorClass, UnknownErrorClass, Value};

/// Error classes eligible for the fast grace period.
pub const DEFAULT_WHITELIST: [ErrorClass; 3] = [
    ErrorClass::ReferenceError,
    ErrorClass::TypeError,
    ErrorClass::RangeError,
];

/// Grace period for rejections matching [`DEFAULT_WHITELIST`].
pub const FAST_GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Grace period for every other rejection.
pub const SLOW_GRACE_PERIOD: Duration = Duration::from_millis(2000);

/// Environment variable name for `all_rejections`.
pub const ENV_ALL_REJECTIONS: &str = "DEFERRED_TRACK_ALL_REJECTIONS";
/// Environment variable name for the reporting whitelist.
pub const ENV_WHITELIST: &str = "DEFERRED_TRACK_WHITELIST";

/// A reporting callback: receives the display id and the rejection reason.
pub type ReportCallback = Arc<dyn Fn(u64, &Value) -> Result<(), Value> + Send + Sync>;

/// Errors raised while reading tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A boolean setting could not be parsed.
    #[error("invalid value for {field}: expected bool (true/false/1/0/yes/no/on/off), got {value:?}")]
    InvalidBool {
        /// Setting name.
        field: String,
        /// Raw value.
        value: String,
    },
    /// A whitelist entry names no known error class.
    #[error("invalid value for {field}: {source}")]
    UnknownClass {
        /// Setting name.
        field: String,
        /// The unparseable entry.
        #[source]
        source: UnknownErrorClass,
    },
    /// The config file could not be read.
    #[error("failed to read config file {path}: {message}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },
    /// The config file is not valid TOML for this schema.
    #[error("failed to parse TOML config: {0}")]
    Toml(String),
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::InvalidConfiguration).with_message(err.to_string())
    }
}

/// Options for [`RejectionTracker::enable`](super::RejectionTracker::enable).
#[derive(Clone)]
pub struct TrackingOptions {
    /// Report every unhandled rejection regardless of its class.
    pub all_rejections: bool,
    /// Error classes reported when their timer fires.
    pub whitelist: Vec<ErrorClass>,
    /// Grace period for rejections matching [`DEFAULT_WHITELIST`].
    pub fast_grace: Duration,
    /// Grace period for all other rejections.
    pub slow_grace: Duration,
    on_unhandled: Option<ReportCallback>,
    on_handled: Option<ReportCallback>,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            all_rejections: false,
            whitelist: DEFAULT_WHITELIST.to_vec(),
            fast_grace: FAST_GRACE_PERIOD,
            slow_grace: SLOW_GRACE_PERIOD,
            on_unhandled: None,
            on_handled: None,
        }
    }
}

impl TrackingOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default options with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut options = Self::default();
        apply_env_overrides(&mut options)?;
        Ok(options)
    }

    /// Sets whether every rejection is reported.
    #[must_use]
    pub fn all_rejections(mut self, value: bool) -> Self {
        self.all_rejections = value;
        self
    }

    /// Replaces the reporting whitelist.
    #[must_use]
    pub fn whitelist(mut self, classes: impl IntoIterator<Item = ErrorClass>) -> Self {
        self.whitelist = classes.into_iter().collect();
        self
    }

    /// Sets the fast grace period.
    #[must_use]
    pub fn fast_grace(mut self, period: Duration) -> Self {
        self.fast_grace = period;
        self
    }

    /// Sets the slow grace period.
    #[must_use]
    pub fn slow_grace(mut self, period: Duration) -> Self {
        self.slow_grace = period;
        self
    }

    /// Replaces default console output for unhandled reports.
    #[must_use]
    pub fn on_unhandled<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &Value) -> Result<(), Value> + Send + Sync + 'static,
    {
        self.on_unhandled = Some(Arc::new(f));
        self
    }

    /// Replaces default console output for handled notices.
    #[must_use]
    pub fn on_handled<F>(mut self, f: F) -> Self
    where
        F: Fn(u64, &Value) -> Result<(), Value> + Send + Sync + 'static,
    {
        self.on_handled = Some(Arc::new(f));
        self
    }

    pub(crate) fn unhandled_callback(&self) -> Option<&ReportCallback> {
        self.on_unhandled.as_ref()
    }

    pub(crate) fn handled_callback(&self) -> Option<&ReportCallback> {
        self.on_handled.as_ref()
    }

    /// True if `reason` is an error of a class in `list`.
    pub(crate) fn matches(reason: &Value, list: &[ErrorClass]) -> bool {
        reason.as_error().is_some_and(|err| err.matches_any(list))
    }

    /// Grace period before an unwaited rejection of `reason` is examined.
    ///
    /// Chosen against [`DEFAULT_WHITELIST`], not the configured whitelist.
    #[must_use]
    pub fn grace_period_for(&self, reason: &Value) -> Duration {
        if Self::matches(reason, &DEFAULT_WHITELIST) {
            self.fast_grace
        } else {
            self.slow_grace
        }
    }

    /// True if `reason` is reported once its grace period expires.
    #[must_use]
    pub fn should_report(&self, reason: &Value) -> bool {
        self.all_rejections || Self::matches(reason, &self.whitelist)
    }
}

impl fmt::Debug for TrackingOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingOptions")
            .field("all_rejections", &self.all_rejections)
            .field("whitelist", &self.whitelist)
            .field("fast_grace", &self.fast_grace)
            .field("slow_grace", &self.slow_grace)
            .field("on_unhandled", &self.on_unhandled.is_some())
            .field("on_handled", &self.on_handled.is_some())
            .finish()
    }
}

/// Apply environment variable overrides to [`TrackingOptions`].
///
/// Only variables that are set are applied.
///
/// # Errors
///
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(options: &mut TrackingOptions) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_ALL_REJECTIONS) {
        options.all_rejections = parse_bool(ENV_ALL_REJECTIONS, &val)?;
    }
    if let Some(val) = read_env(ENV_WHITELIST) {
        options.whitelist = parse_class_list(ENV_WHITELIST, val.split(','))?;
    }
    Ok(())
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_bool(field: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            field: field.to_string(),
            value: val.to_string(),
        }),
    }
}

/// Parses class names, skipping blank entries.
fn parse_class_list<'a>(
    field: &str,
    entries: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<ErrorClass>, ConfigError> {
    entries
        .into_iter()
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            entry
                .parse::<ErrorClass>()
                .map_err(|source| ConfigError::UnknownClass {
                    field: field.to_string(),
                    source,
                })
        })
        .collect()
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable tracker configuration.
///
/// ```toml
/// [tracking]
/// all_rejections = false
/// whitelist = ["TypeError", "RangeError"]
/// fast_grace_ms = 100
/// slow_grace_ms = 2000
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct TrackingTomlConfig {
    /// Tracker settings.
    #[serde(default)]
    pub tracking: TrackingToml,
}

/// `[tracking]` section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct TrackingToml {
    /// Report every rejection.
    pub all_rejections: Option<bool>,
    /// Class names eligible for reporting.
    pub whitelist: Option<Vec<String>>,
    /// Fast grace period in milliseconds.
    pub fast_grace_ms: Option<u64>,
    /// Slow grace period in milliseconds.
    pub slow_grace_ms: Option<u64>,
}

#[cfg(feature = "config-file")]
impl TrackingTomlConfig {
    /// Parses a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] on malformed input.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Toml(e.to_string()))
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Toml`] on malformed input.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Applies the fields that are present to `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownClass`] for an unrecognized whitelist
    /// entry; `options` is left unchanged in that case.
    pub fn apply_to(&self, options: &mut TrackingOptions) -> Result<(), ConfigError> {
        let whitelist = match &self.tracking.whitelist {
            Some(names) => Some(parse_class_list(
                "tracking.whitelist",
                names.iter().map(String::as_str),
            )?),
            None => None,
        };
        if let Some(v) = self.tracking.all_rejections {
            options.all_rejections = v;
        }
        if let Some(v) = whitelist {
            options.whitelist = v;
        }
        if let Some(ms) = self.tracking.fast_grace_ms {
            options.fast_grace = Duration::from_millis(ms);
        }
        if let Some(ms) = self.tracking.slow_grace_ms {
            options.slow_grace = Duration::from_millis(ms);
        }
        Ok(())
    }
}
