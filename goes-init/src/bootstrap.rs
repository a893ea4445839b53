//! Virtual filesystem priming.
//!
//! Runs once, before any other logic, and strictly best-effort: a missing
//! mountpoint or a failed mount is logged and skipped. Whether the
//! resulting environment is usable is decided later by the pivot sequence.

use crate::ops::MountOps;
use crate::skeleton::create_dir_with_mode;
use goes_common::log_warn;
use std::os::unix::fs::symlink;
use std::path::Path;

const LOG_TAG: &str = "boot:bootstrap";

struct VirtualMount {
    dir: &'static str,
    source: &'static str,
    fstype: &'static str,
    mode: u32,
}

const VIRTUAL_MOUNTS: &[VirtualMount] = &[
    VirtualMount {
        dir: "dev",
        source: "devtmpfs",
        fstype: "devtmpfs",
        mode: 0o755,
    },
    VirtualMount {
        dir: "dev/pts",
        source: "devpts",
        fstype: "devpts",
        mode: 0o755,
    },
    VirtualMount {
        dir: "proc",
        source: "proc",
        fstype: "proc",
        mode: 0o555,
    },
    VirtualMount {
        dir: "sys",
        source: "sysfs",
        fstype: "sysfs",
        mode: 0o555,
    },
    VirtualMount {
        dir: "run",
        source: "tmpfs",
        fstype: "tmpfs",
        mode: 0o755,
    },
];

struct StdStreamLink {
    target: &'static str,
    link: &'static str,
}

const STD_STREAM_LINKS: &[StdStreamLink] = &[
    StdStreamLink {
        target: "../proc/self/fd/0",
        link: "dev/stdin",
    },
    StdStreamLink {
        target: "../proc/self/fd/1",
        link: "dev/stdout",
    },
    StdStreamLink {
        target: "../proc/self/fd/2",
        link: "dev/stderr",
    },
];

/// Create and mount the kernel pseudo-filesystems under `root` and wire the
/// standard-stream device symlinks. `root` is `/` in production.
pub fn prime_virtual_filesystems(root: &Path, ops: &dyn MountOps) {
    for mnt in VIRTUAL_MOUNTS {
        let dir = root.join(mnt.dir);
        if dir.symlink_metadata().is_err() {
            if let Err(e) = create_dir_with_mode(&dir, mnt.mode) {
                log_warn!(LOG_TAG, "mkdir {}: {e}", dir.display());
                continue;
            }
        }
        if let Err(e) = ops.mount_virtual(mnt.fstype, mnt.source, &dir) {
            log_warn!(LOG_TAG, "mount {} on {}: {e}", mnt.source, dir.display());
        }
    }

    for ln in STD_STREAM_LINKS {
        let link = root.join(ln.link);
        if link.symlink_metadata().is_ok() {
            continue;
        }
        if let Err(e) = symlink(ln.target, &link) {
            log_warn!(LOG_TAG, "link {} -> {}: {e}", link.display(), ln.target);
        }
    }
}
