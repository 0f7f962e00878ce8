//! Driver diagnostics.
//!
//! The driver narrates a small set of events: connect/close, teardown
//! failures on drop paths, and panicking event listeners. Nothing is
//! written unless the `SQLITEKIT_LOG` environment variable selects a
//! verbosity:
//!
//! ```text
//! SQLITEKIT_LOG=debug   lifecycle narration and everything below
//! SQLITEKIT_LOG=warn    recoverable problems (swallowed drop errors)
//! SQLITEKIT_LOG=error   teardown failures only
//! SQLITEKIT_LOG=off     nothing (the default)
//! ```
//!
//! `1`/`true` are accepted as synonyms for `debug`. Use the `log_debug!`,
//! `log_warn!` and `log_error!` macros; they forward `format_args!` to
//! [`log`] so disabled levels cost one atomic load and no formatting.

use std::env;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Verbosity threshold. A message is written when its level is at or
/// below the configured threshold, so the variants are ordered from
/// silent to chatty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Nothing is written.
    Off = 0,
    /// Failures the driver had to swallow (teardown on drop).
    Error = 1,
    /// Recoverable problems worth knowing about.
    Warn = 2,
    /// Lifecycle narration (connect, close, rollback-on-drop).
    Debug = 3,
}

impl LogLevel {
    /// Interpret a `SQLITEKIT_LOG` value. Unrecognized input is `None`.
    #[must_use]
    pub fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "0" | "false" => Some(Self::Off),
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "debug" | "1" | "true" => Some(Self::Debug),
            _ => None,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Error,
            2 => Self::Warn,
            3 => Self::Debug,
            _ => Self::Off,
        }
    }

    /// Tag written in front of each message.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Sentinel meaning "environment not consulted yet".
const UNSET: u8 = u8::MAX;

static THRESHOLD: AtomicU8 = AtomicU8::new(UNSET);

fn threshold() -> LogLevel {
    let raw = THRESHOLD.load(Ordering::Relaxed);
    if raw != UNSET {
        return LogLevel::from_u8(raw);
    }
    let level = env::var("SQLITEKIT_LOG")
        .ok()
        .and_then(|v| LogLevel::from_env_value(&v))
        .unwrap_or(LogLevel::Off);
    THRESHOLD.store(level as u8, Ordering::Relaxed);
    level
}

/// Override the threshold, ignoring the environment from now on.
pub fn set_log_level(level: LogLevel) {
    THRESHOLD.store(level as u8, Ordering::Relaxed);
}

/// Whether a message at `level` would currently be written.
#[must_use]
pub fn enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= threshold()
}

/// Write one diagnostic line to stderr. Use the macros instead; they
/// supply the module path and defer formatting.
pub fn log(level: LogLevel, target: &str, message: fmt::Arguments<'_>) {
    if enabled(level) {
        eprintln!("sqlitekit[{level}] {target}: {message}");
    }
}

/// Narrate a lifecycle event.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log(
            $crate::logging::LogLevel::Debug,
            module_path!(),
            format_args!($($arg)*),
        )
    };
}

/// Report a recoverable problem.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log(
            $crate::logging::LogLevel::Warn,
            module_path!(),
            format_args!($($arg)*),
        )
    };
}

/// Report a swallowed failure.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log(
            $crate::logging::LogLevel::Error,
            module_path!(),
            format_args!($($arg)*),
        )
    };
}
