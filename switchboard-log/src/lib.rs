//! Switchboard Logging
//!
//! Structured logging for the Switchboard dispatcher, controlled through
//! `SWITCHBOARD_*` environment variables.
//!
//! # Usage
//!
//! ```rust
//! use switchboard_log::{debug, info, warn, error, trace};
//!
//! debug!("Routing request");
//! info!("Registered {} handlers", 12);
//! warn!("Accept header did not match any formatter");
//! error!("Handler faulted");
//!
//! let key = "Calculator/Add";
//! debug!(target: "switchboard::router", "Resolved {}", key);
//! ```
//!
//! # Environment Variables
//!
//! - `SWITCHBOARD_DEBUG=1` - Enable debug logging
//! - `SWITCHBOARD_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `SWITCHBOARD_LOG_FORMAT=pretty|json|compact` - Output format
//! - `SWITCHBOARD_LOG_COLOR=1|0` - Enable/disable colors
//! - `SWITCHBOARD_LOG_TIMESTAMPS=1|0` - Include timestamps

use once_cell::sync::OnceCell;
use std::env;
use std::io::{IsTerminal, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Get level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }

    #[cfg(feature = "color")]
    fn colored(&self) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Level::Trace => "TRACE".magenta(),
            Level::Debug => "DEBUG".blue(),
            Level::Info => "INFO".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERROR".red().bold(),
            Level::Off => "OFF".white(),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<log::Level> for Level {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => Level::Trace,
            log::Level::Debug => Level::Debug,
            log::Level::Info => Level::Info,
            log::Level::Warn => Level::Warn,
            log::Level::Error => Level::Error,
        }
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human readable, one field per column
    Pretty,
    /// Short single-line format
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

// ============================================================================
// Global Configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: OnceCell<LogConfig> = OnceCell::new();

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Read configuration from `SWITCHBOARD_*` environment variables.
    pub fn from_env() -> Self {
        let debug = env_flag("SWITCHBOARD_DEBUG").unwrap_or(false);

        let level = env::var("SWITCHBOARD_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("SWITCHBOARD_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Format::Json);

        let color = env_flag("SWITCHBOARD_LOG_COLOR").unwrap_or_else(|| {
            env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        });

        let timestamps = env_flag("SWITCHBOARD_LOG_TIMESTAMPS").unwrap_or(true);

        Self {
            debug,
            level,
            format,
            color,
            timestamps,
        }
    }

    fn apply(&self) {
        DEBUG_ENABLED.store(self.debug, Ordering::SeqCst);
        LOG_LEVEL.store(self.level as u8, Ordering::SeqCst);
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Initialize logging from the environment.
///
/// Called lazily by the first log line; calling it eagerly fixes the
/// configuration before any request is served.
pub fn init() {
    config();
}

/// Initialize logging with an explicit configuration.
///
/// Returns `false` if logging was already initialized; the existing
/// configuration is kept in that case.
pub fn init_with(config: LogConfig) -> bool {
    let mut installed = false;
    CONFIG.get_or_init(|| {
        installed = true;
        config.apply();
        config
    });
    installed
}

/// Check if debug logging is enabled.
#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Check if a log level is enabled.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Get current log level.
pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set log level at runtime.
pub fn set_level(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Enable or disable debug mode at runtime.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// Get the active configuration.
pub fn config() -> &'static LogConfig {
    CONFIG.get_or_init(|| {
        let config = LogConfig::from_env();
        config.apply();
        config
    })
}

// ============================================================================
// Log Output
// ============================================================================

#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    let config = config();
    if !is_level_enabled(level) {
        return;
    }

    let mut stderr = std::io::stderr().lock();
    let _ = match config.format {
        Format::Pretty => write_pretty(&mut stderr, level, target, message, config),
        Format::Compact => write_compact(&mut stderr, level, target, message, config),
        Format::Json => write_json(&mut stderr, level, target, message),
    };
}

fn write_pretty(
    out: &mut impl Write,
    level: Level,
    target: &str,
    message: &str,
    config: &LogConfig,
) -> std::io::Result<()> {
    if config.timestamps {
        write!(out, "{} ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))?;
    }

    #[cfg(feature = "color")]
    if config.color {
        write!(out, "{:5} ", level.colored())?;
    } else {
        write!(out, "{:5} ", level.as_str())?;
    }
    #[cfg(not(feature = "color"))]
    write!(out, "{:5} ", level.as_str())?;

    if !target.is_empty() {
        write!(out, "[{}] ", target)?;
    }
    writeln!(out, "{}", message)
}

fn write_compact(
    out: &mut impl Write,
    level: Level,
    target: &str,
    message: &str,
    config: &LogConfig,
) -> std::io::Result<()> {
    if config.timestamps {
        write!(out, "{} ", chrono::Local::now().format("%H:%M:%S"))?;
    }
    write!(out, "{} ", level.as_str().chars().next().unwrap_or('?'))?;
    if !target.is_empty() {
        write!(out, "{}: ", target)?;
    }
    writeln!(out, "{}", message)
}

#[cfg(feature = "json")]
fn write_json(out: &mut impl Write, level: Level, target: &str, message: &str) -> std::io::Result<()> {
    #[derive(serde::Serialize)]
    struct Line<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let line = Line {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
    };
    match serde_json::to_string(&line) {
        Ok(json) => writeln!(out, "{}", json),
        Err(_) => Ok(()),
    }
}

#[cfg(not(feature = "json"))]
fn write_json(out: &mut impl Write, level: Level, target: &str, message: &str) -> std::io::Result<()> {
    writeln!(
        out,
        r#"{{"timestamp":"{}","level":"{}","target":{:?},"message":{:?}}}"#,
        chrono::Utc::now().to_rfc3339(),
        level.as_str(),
        target,
        message
    )
}

// ============================================================================
// `log` crate bridge
// ============================================================================

/// Forwards records emitted through the `log` facade to Switchboard output.
pub struct LogBridge;

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        is_level_enabled(metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            log(
                record.level().into(),
                record.target(),
                &record.args().to_string(),
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static BRIDGE: LogBridge = LogBridge;

/// Install [`LogBridge`] as the global `log` logger.
pub fn install_log_bridge() -> Result<(), log::SetLoggerError> {
    log::set_logger(&BRIDGE)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

// ============================================================================
// Macros
// ============================================================================

/// Log a trace message.
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a debug message.
///
/// Enabled by `SWITCHBOARD_DEBUG=1` or `SWITCHBOARD_LOG_LEVEL=debug`.
///
/// # Example
///
/// ```rust
/// use switchboard_log::debug;
///
/// let key = "Orders/List";
/// debug!("Dispatching {}", key);
/// debug!(target: "switchboard::pipeline", "Binder returned {} values", 2);
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a warning message.
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an error message.
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, module_path!(), &format!($($arg)+));
        }
    };
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Builds a `tracing` subscriber from the Switchboard log configuration,
    //! so `tracing` events emitted by the dispatcher share its level and format.

    use super::*;

    fn filter_directive(level: Level) -> &'static str {
        match level {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }

    /// Create a tracing subscriber that respects the Switchboard config.
    ///
    /// `RUST_LOG` takes precedence over `SWITCHBOARD_LOG_LEVEL` when set.
    pub fn subscriber() -> Box<dyn tracing::Subscriber + Send + Sync> {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let config = config();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directive(config.level)));

        match config.format {
            Format::Json => Box::new(
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json()),
            ),
            Format::Compact => Box::new(
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact().with_ansi(config.color)),
            ),
            Format::Pretty => Box::new(
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().with_ansi(config.color)),
            ),
        }
    }

    /// Install [`subscriber`] as the global default.
    pub fn init() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
        tracing::subscriber::set_global_default(subscriber())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("debug".parse::<Level>(), Ok(Level::Debug));
        assert_eq!("DEBUG".parse::<Level>(), Ok(Level::Debug));
        assert_eq!("warning".parse::<Level>(), Ok(Level::Warn));
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("pretty".parse::<Format>(), Ok(Format::Pretty));
        assert_eq!("Compact".parse::<Format>(), Ok(Format::Compact));
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_off_is_never_enabled() {
        assert!(!is_level_enabled(Level::Off));
    }

    #[test]
    fn test_from_log_level() {
        assert_eq!(Level::from(log::Level::Warn), Level::Warn);
        assert_eq!(Level::from(log::Level::Trace), Level::Trace);
    }

    #[test]
    fn test_compact_line() {
        let config = LogConfig {
            timestamps: false,
            ..LogConfig::default()
        };
        let mut out = Vec::new();
        write_compact(&mut out, Level::Warn, "switchboard::router", "no route", &config).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "W switchboard::router: no route\n");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_line() {
        let mut out = Vec::new();
        write_json(&mut out, Level::Error, "pipeline", "fault").unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["level"], "ERROR");
        assert_eq!(parsed["target"], "pipeline");
        assert_eq!(parsed["message"], "fault");
    }

    #[test]
    fn test_macros_compile() {
        trace!("trace message");
        debug!("debug message");
        info!("info message");
        warn!("warn message");
        error!("error message");
        debug!(target: "test", "with target {}", 1);
    }
}
