//! Structured logging for depcache
//!
//! Library code logs through `tracing` with structured fields so runs can be
//! grepped or shipped to a log pipeline as JSON.
//!
//! # Log Format Conventions
//!
//! - `operation`: the pipeline step ("configure", "build", "install", "link", ...)
//! - `status`: the result ("success", "skipped", "miss", "error")
//! - `signature`: the toolchain signature of the run
//! - `path`: the filesystem path the event concerns
//!
//! # Examples
//!
//! ```rust
//! use tracing::info;
//!
//! let signature = "3f9a1c0b7d2e";
//! info!(
//!     operation = "build",
//!     status = "skipped",
//!     signature = %signature,
//!     "existing install found"
//! );
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Formatter that shows "depcache" instead of the full module path
struct DepcacheFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for DepcacheFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        // Write timestamp
        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6fZ")
        )?;

        // Level, tagged with the tool name
        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m", // Red
                tracing::Level::WARN => "\x1b[33m",  // Yellow
                tracing::Level::INFO => "\x1b[32m",  // Green
                tracing::Level::DEBUG => "\x1b[34m", // Blue
                tracing::Level::TRACE => "\x1b[35m", // Magenta
            };
            write!(writer, "{}{:5}(depcache)\x1b[0m: ", level_style, meta.level())?;
        } else {
            write!(writer, "{:5}(depcache): ", meta.level())?;
        }

        // Write fields and message
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format (default for development)
    Pretty,
    /// Compact format (for CI/production)
    Compact,
    /// JSON format (for log aggregation systems)
    Json,
}

impl LogFormat {
    /// Parse from `DEPCACHE_LOG_FORMAT`
    pub fn from_env() -> Self {
        match std::env::var("DEPCACHE_LOG_FORMAT")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ => {
                // Default: pretty for dev, compact for production/CI
                if std::env::var("CI").is_ok() {
                    Self::Compact
                } else {
                    Self::Pretty
                }
            }
        }
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "debug", "info", "warn")
/// - `DEPCACHE_LOG_FORMAT`: Set format ("pretty", "compact", "json")
/// - `CI`: If set, defaults to compact format
///
/// A `log_level` from the config file is used when `RUST_LOG` is unset.
/// Calling this twice is harmless; the second subscriber is discarded.
pub fn init(default_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = LogFormat::from_env();

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(DepcacheFormatter { with_ansi: true })
                        .with_writer(io::stderr),
                )
                .try_init()
                .ok();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(DepcacheFormatter { with_ansi: false })
                        .with_writer(io::stderr),
                )
                .try_init()
                .ok();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_ansi(false)
                        .with_writer(io::stderr)
                        .json(),
                )
                .try_init()
                .ok();
        }
    }
}

/// Standard field names for consistent logging
pub mod fields {
    pub const OPERATION: &str = "operation";
    pub const STATUS: &str = "status";
    pub const SIGNATURE: &str = "signature";
    pub const VERSION: &str = "version";
    pub const PATH: &str = "path";
}

/// Pipeline steps
pub mod operations {
    pub const PROBE: &str = "probe";
    pub const SIGNATURE: &str = "signature";
    pub const LINK: &str = "link";
    pub const LOCK: &str = "lock";
    pub const INVALIDATE: &str = "invalidate";
    pub const CONFIGURE: &str = "configure";
    pub const BUILD: &str = "build";
    pub const INSTALL: &str = "install";
    pub const NORMALIZE: &str = "normalize";
    pub const STAMP: &str = "stamp";
    pub const CLEAN: &str = "clean";
}

/// Status values for consistent logging
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const SKIPPED: &str = "skipped";
    pub const MISS: &str = "miss";
    pub const ERROR: &str = "error";
}
