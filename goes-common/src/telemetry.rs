//! Telemetry recording for boot operations.

use crate::log;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::LazyLock;
use std::time::Duration;

static BOOT_OPS_LOG: LazyLock<String> = LazyLock::new(|| {
    std::env::var("GOES_BOOT_OPS_LOG").unwrap_or_else(|_| "/run/goes-boot-ops.jsonl".to_string())
});

/// Path to the boot operations log file (JSONL format).
pub fn boot_ops_log() -> &'static str {
    &BOOT_OPS_LOG
}

#[derive(Serialize)]
struct BootOpEntry {
    ts: String,
    op: String,
    duration_ms: u64,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Record a boot operation to the telemetry log.
///
/// Appends a JSONL entry to `/run/goes-boot-ops.jsonl` (override with
/// `GOES_BOOT_OPS_LOG`). `/run` is tmpfs from the first moments of boot, so
/// the records survive the root switch without touching the target disk.
pub fn record_boot_op(op: &str, duration: Duration, success: bool, error: Option<&str>) {
    let entry = BootOpEntry {
        ts: log::timestamp(),
        op: op.to_string(),
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        success,
        error: error.map(String::from),
    };

    let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(boot_ops_log())
    else {
        return; // Silently fail if can't open log
    };

    let Ok(json) = serde_json::to_string(&entry) else {
        return;
    };

    let _ = writeln!(file, "{json}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_jsonl_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boot-ops.jsonl");
        // SAFETY: set before the LazyLock sink path is first touched, and no
        // other test in this crate reads it.
        unsafe {
            std::env::set_var("GOES_BOOT_OPS_LOG", &path);
        }

        record_boot_op("mount_root", Duration::from_millis(12), true, None);
        record_boot_op("recovery_fetch", Duration::from_secs(1), false, Some("timed out"));

        let raw = std::fs::read_to_string(boot_ops_log()).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["op"], "mount_root");
        assert_eq!(first["duration_ms"], 12);
        assert_eq!(first["success"], true);
        assert!(first.get("error").is_none());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["error"], "timed out");
    }
}
