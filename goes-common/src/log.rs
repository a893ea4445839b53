//! Timestamped stderr logging.
//!
//! PID 1 has no syslog to talk to; the console is the only log sink, so
//! everything goes to stderr with a UTC timestamp, a level and a component
//! tag. Use through the `log_info!`/`log_warn!`/`log_error!` macros.

use std::fmt;

/// Current UTC time, millisecond precision, RFC 3339 shaped.
pub fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

pub fn emit(level: &str, tag: &str, args: fmt::Arguments<'_>) {
    eprintln!("[{}] [{level}] [{tag}] {args}", timestamp());
}

#[macro_export]
macro_rules! log_info {
    ($tag:expr, $($arg:tt)*) => {
        $crate::log::emit("INFO", $tag, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($tag:expr, $($arg:tt)*) => {
        $crate::log::emit("WARN", $tag, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($tag:expr, $($arg:tt)*) => {
        $crate::log::emit("ERROR", $tag, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_is_utc_rfc3339() {
        let ts = timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.find('T'), Some(10));
    }

    #[test]
    fn macros_accept_format_args() {
        // Smoke test: must compile and not panic.
        crate::log_info!("test", "value={}", 42);
        crate::log_warn!("test", "plain");
        crate::log_error!("test", "{} and {}", "a", "b");
    }
}
