//! `strand` global configuration options.
//!
//! See [`Config`] for the list of options.

use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard};

/// The environment variable overriding [`Config::offset64_threshold`].
pub const LARGE_STRINGS_THRESHOLD_ENV: &str = "STRAND_LARGE_STRINGS_THRESHOLD";

/// The environment variable overriding [`Config::large_strings_enabled`].
pub const LARGE_STRINGS_ENABLED_ENV: &str = "STRAND_LARGE_STRINGS_ENABLED";

/// The default offset64 threshold: the largest value representable by a 32-bit signed offset.
pub const DEFAULT_OFFSET64_THRESHOLD: i64 = i32::MAX as i64;

/// Global configuration options for the `strand` crate.
///
/// Retrieve the global [`Config`] with [`global_config`].
/// It is resolved once, from the environment, on first use.
///
/// ## Offset64 Threshold
/// > default: [`DEFAULT_OFFSET64_THRESHOLD`] (`2147483647`), environment: [`LARGE_STRINGS_THRESHOLD_ENV`]
///
/// The size in bytes above which a strings column should use `int64` offsets rather than `int32` offsets.
///
/// The environment value must be a non-negative integer.
/// A malformed value is ignored with a warning and the default is used instead.
///
/// The threshold is advisory: it is consulted by column building code before the offsets are allocated.
///
/// ## Large Strings Enabled
/// > default: `true`, environment: [`LARGE_STRINGS_ENABLED_ENV`]
///
/// If `false`, building a strings column whose size exceeds the offset64 threshold fails instead of switching to `int64` offsets.
///
/// The environment value is one of `1`, `true`, `on`, `yes`, `0`, `false`, `off`, `no` (case insensitive).
/// A malformed value is ignored with a warning and the default is used instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    offset64_threshold: i64,
    large_strings_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            offset64_threshold: DEFAULT_OFFSET64_THRESHOLD,
            large_strings_enabled: true,
        }
    }
}

impl Config {
    /// Resolve a configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| {
            std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
        })
    }

    /// Resolve a configuration from `lookup`, which maps an environment variable name to its value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = lookup(LARGE_STRINGS_THRESHOLD_ENV) {
            match parse_threshold(&value) {
                Some(threshold) => config.offset64_threshold = threshold,
                None => log::warn!(
                    "Ignoring invalid {LARGE_STRINGS_THRESHOLD_ENV} value `{value}`, using the default of {DEFAULT_OFFSET64_THRESHOLD} bytes."
                ),
            }
        }
        if let Some(value) = lookup(LARGE_STRINGS_ENABLED_ENV) {
            match parse_enabled(&value) {
                Some(enabled) => config.large_strings_enabled = enabled,
                None => log::warn!(
                    "Ignoring invalid {LARGE_STRINGS_ENABLED_ENV} value `{value}`, large strings remain enabled."
                ),
            }
        }
        config
    }

    /// Get the [offset64 threshold](#offset64-threshold) configuration.
    #[must_use]
    pub fn offset64_threshold(&self) -> i64 {
        self.offset64_threshold
    }

    /// Set the [offset64 threshold](#offset64-threshold) configuration.
    pub fn set_offset64_threshold(&mut self, threshold: i64) -> &mut Self {
        self.offset64_threshold = threshold;
        self
    }

    /// Set the [offset64 threshold](#offset64-threshold) configuration.
    #[must_use]
    pub fn with_offset64_threshold(mut self, threshold: i64) -> Self {
        self.offset64_threshold = threshold;
        self
    }

    /// Get the [large strings enabled](#large-strings-enabled) configuration.
    #[must_use]
    pub fn large_strings_enabled(&self) -> bool {
        self.large_strings_enabled
    }

    /// Set the [large strings enabled](#large-strings-enabled) configuration.
    pub fn set_large_strings_enabled(&mut self, enabled: bool) -> &mut Self {
        self.large_strings_enabled = enabled;
        self
    }

    /// Set the [large strings enabled](#large-strings-enabled) configuration.
    #[must_use]
    pub fn with_large_strings_enabled(mut self, enabled: bool) -> Self {
        self.large_strings_enabled = enabled;
        self
    }
}

fn parse_threshold(value: &str) -> Option<i64> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|threshold| *threshold >= 0)
}

fn parse_enabled(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

fn config_lock() -> &'static RwLock<Config> {
    resolve_once(&CONFIG, Config::from_env)
}

/// Runs `resolve` at most once per `cell`, even when first use is concurrent.
fn resolve_once(
    cell: &OnceLock<RwLock<Config>>,
    resolve: impl FnOnce() -> Config,
) -> &RwLock<Config> {
    cell.get_or_init(|| RwLock::new(resolve()))
}

/// Returns a reference to the global `strand` configuration.
///
/// The configuration is resolved from the environment on first use and is not affected by later changes to the environment.
#[must_use]
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    config_lock().read().unwrap_or_else(PoisonError::into_inner)
}

/// Resolve the global configuration from the environment again.
///
/// This is intended for tests that change the environment.
pub fn reset_global_config() {
    let config = Config::from_env();
    *config_lock().write().unwrap_or_else(PoisonError::into_inner) = config;
}
