//! Logging bootstrap for restmodel.
//!
//! Internal diagnostics are emitted with `tracing` macros. This module only
//! installs a subscriber when asked to, controlled by environment variables.
//!
//! # Environment Variables
//!
//! - `RESTMODEL_DEBUG=true` - Enable debug logging
//! - `RESTMODEL_LOG_LEVEL=debug|info|warn|error|trace` - Set specific log level
//! - `RESTMODEL_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use restmodel_core::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `RESTMODEL_DEBUG`.
///
/// Returns `true` if `RESTMODEL_DEBUG` is set to "true", "1", or "yes" (case-insensitive).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("RESTMODEL_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `RESTMODEL_LOG_LEVEL`.
///
/// Defaults to "debug" if `RESTMODEL_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("RESTMODEL_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `RESTMODEL_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("RESTMODEL_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Initialize the restmodel logging system.
///
/// Subsequent calls are no-ops. Without the `tracing-subscriber` feature
/// nothing is installed and events go to whatever subscriber the
/// application set up.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("RESTMODEL_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(format!(
                "restmodel={},restmodel_core={},restmodel_http={}",
                level, level, level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            // try_init: the host application may already own the global subscriber
            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "restmodel logging initialized"
                );
            }
        }
    });
}

/// Initialize logging with a specific level.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call this early in your program before
/// spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: only meant to be called at program startup before threads are spawned.
    unsafe {
        env::set_var("RESTMODEL_LOG_LEVEL", level);
    }
    init();
}
